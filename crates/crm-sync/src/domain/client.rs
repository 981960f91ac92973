//! Client Entity
//!
//! A customer of the freelancer. Owned by exactly one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::proposal::ClientSummary;
use super::user::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Set by the server on insert; never changes
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Whether a non-empty company is on file
    pub fn has_company(&self) -> bool {
        self.company.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// The subset of fields shown next to a proposal
    pub fn summary(&self) -> ClientSummary {
        ClientSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            company: self.company.clone(),
        }
    }
}

impl Entity for Client {
    type New = NewClient;
    type Patch = ClientPatch;

    const TABLE: &'static str = "clients";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Insert payload for a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewClient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a client
///
/// Optional columns use `Option<Option<_>>`: `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl From<NewClient> for ClientPatch {
    /// Full replacement of every editable field, as submitted by the edit form
    fn from(new: NewClient) -> Self {
        Self {
            name: Some(new.name),
            email: Some(new.email),
            phone: Some(new.phone),
            company: Some(new.company),
            notes: Some(new.notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_from_row() {
        let row = json!({
            "id": "c1",
            "user_id": "u1",
            "name": "Ana",
            "email": "ana@x.com",
            "phone": null,
            "created_at": "2025-01-02T10:00:00Z"
        });
        let client: Client = serde_json::from_value(row).unwrap();
        assert_eq!(client.id(), "c1");
        assert_eq!(client.user_id, UserId::new("u1"));
        assert!(client.company.is_none());
        assert!(!client.has_company());
    }

    #[test]
    fn test_empty_company_does_not_count() {
        let mut client: Client = serde_json::from_value(json!({
            "id": "c1", "user_id": "u1", "name": "Ana", "email": "ana@x.com",
            "company": "", "created_at": "2025-01-02T10:00:00Z"
        }))
        .unwrap();
        assert!(!client.has_company());
        client.company = Some("Acme".to_string());
        assert!(client.has_company());
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = ClientPatch {
            name: Some("Ana Maria".to_string()),
            company: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"name": "Ana Maria", "company": null})
        );
    }
}
