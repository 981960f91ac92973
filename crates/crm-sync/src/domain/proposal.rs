//! Proposal Entity
//!
//! A priced offer made to one client. Status moves freely between the three
//! board columns; there is no forward-only pipeline.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::amount::Amount;
use super::entity::Entity;
use super::user::UserId;

/// Board column a proposal sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProposalStatus {
    #[default]
    #[serde(rename = "Aberto")]
    Open,
    #[serde(rename = "Em negociação")]
    Negotiating,
    #[serde(rename = "Fechado")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Status inválido: {0}")]
pub struct UnknownStatus(pub String);

impl ProposalStatus {
    /// Board order
    pub const ALL: [ProposalStatus; 3] = [
        ProposalStatus::Open,
        ProposalStatus::Negotiating,
        ProposalStatus::Closed,
    ];

    /// Wire value stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Open => "Aberto",
            ProposalStatus::Negotiating => "Em negociação",
            ProposalStatus::Closed => "Fechado",
        }
    }

    /// Open and negotiating proposals are still in play
    pub fn is_active(&self) -> bool {
        !matches!(self, ProposalStatus::Closed)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ProposalStatus::Open => 0,
            ProposalStatus::Negotiating => 1,
            ProposalStatus::Closed => 2,
        }
    }
}

impl FromStr for ProposalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base proposal row, exactly as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub user_id: UserId,
    pub client_id: String,
    pub title: String,
    pub amount: Amount,
    #[serde(default)]
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client fields joined onto a proposal for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
}

/// Read-only projection: a proposal plus its client summary
///
/// This is what the proposal store holds. It is never written back; inserts
/// and updates go through `NewProposal` and `ProposalPatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalWithClient {
    #[serde(flatten)]
    pub proposal: Proposal,
    /// Absent when the join found nothing, e.g. after the client was deleted
    #[serde(rename = "clients", default)]
    pub client: Option<ClientSummary>,
}

impl ProposalWithClient {
    pub fn new(proposal: Proposal, client: Option<ClientSummary>) -> Self {
        Self { proposal, client }
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.name.as_str())
    }
}

impl Deref for ProposalWithClient {
    type Target = Proposal;

    fn deref(&self) -> &Proposal {
        &self.proposal
    }
}

impl Entity for ProposalWithClient {
    type New = NewProposal;
    type Patch = ProposalPatch;

    const TABLE: &'static str = "proposals";
    const SELECT: &'static str = "*,clients(id,name,email,company)";
    const ENRICHED: bool = true;

    fn id(&self) -> &str {
        &self.proposal.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.proposal.created_at
    }
}

/// Insert payload for a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProposal {
    pub client_id: String,
    pub title: String,
    pub amount: Amount,
    #[serde(default)]
    pub status: ProposalStatus,
}

impl NewProposal {
    pub fn new(client_id: impl Into<String>, title: impl Into<String>, amount: Amount) -> Self {
        Self {
            client_id: client_id.into(),
            title: title.into(),
            amount,
            status: ProposalStatus::default(),
        }
    }
}

/// Partial update for a proposal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProposalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProposalStatus>,
}

impl ProposalPatch {
    /// Patch that only moves the proposal to another column
    pub fn status(status: ProposalStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl From<NewProposal> for ProposalPatch {
    fn from(new: NewProposal) -> Self {
        Self {
            client_id: Some(new.client_id),
            title: Some(new.title),
            amount: Some(new.amount),
            status: Some(new.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enriched_row() -> serde_json::Value {
        json!({
            "id": "p1",
            "user_id": "u1",
            "client_id": "c1",
            "title": "Site",
            "amount": "1000",
            "status": "Em negociação",
            "created_at": "2025-01-02T10:00:00Z",
            "updated_at": "2025-01-02T10:00:00Z",
            "clients": {"id": "c1", "name": "Ana", "email": "ana@x.com", "company": null}
        })
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(ProposalStatus::default(), ProposalStatus::Open);
        assert_eq!(ProposalStatus::Negotiating.as_str(), "Em negociação");
        assert_eq!("Fechado".parse::<ProposalStatus>(), Ok(ProposalStatus::Closed));
        assert_eq!(
            "Perdido".parse::<ProposalStatus>(),
            Err(UnknownStatus("Perdido".to_string()))
        );
        assert!(ProposalStatus::Negotiating.is_active());
        assert!(!ProposalStatus::Closed.is_active());
    }

    #[test]
    fn test_enriched_row_round_trip_keeps_join_key() {
        let proposal: ProposalWithClient = serde_json::from_value(enriched_row()).unwrap();
        assert_eq!(proposal.id(), "p1");
        assert_eq!(proposal.status, ProposalStatus::Negotiating);
        assert_eq!(proposal.client_name(), Some("Ana"));

        let value = serde_json::to_value(&proposal).unwrap();
        assert_eq!(value["clients"]["name"], "Ana");
        assert_eq!(value["amount"], "1000");
    }

    #[test]
    fn test_bare_row_has_no_client() {
        let mut row = enriched_row();
        row.as_object_mut().unwrap().remove("clients");
        let proposal: ProposalWithClient = serde_json::from_value(row).unwrap();
        assert!(proposal.client.is_none());
    }

    #[test]
    fn test_status_patch() {
        let patch = ProposalPatch::status(ProposalStatus::Closed);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"status": "Fechado"}));
    }
}
