//! Aggregates shown on the dashboard cards

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Client, ProposalStatus, ProposalWithClient};

/// How many clients the "recent" list shows
pub const RECENT_CLIENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub total: usize,
    pub with_company: usize,
    /// Newest first, at most `RECENT_CLIENTS`
    pub recent: Vec<Client>,
}

impl ClientStats {
    /// `snapshot` must be newest first, as the store keeps it
    pub fn from_snapshot(snapshot: &[Client]) -> Self {
        Self {
            total: snapshot.len(),
            with_company: snapshot.iter().filter(|c| c.has_company()).count(),
            recent: snapshot.iter().take(RECENT_CLIENTS).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalStats {
    pub total: usize,
    /// Open or negotiating
    pub active: usize,
    pub closed: usize,
    pub total_revenue: Decimal,
    pub closed_revenue: Decimal,
    /// Closed over total, in percent; 0 for an empty snapshot
    pub conversion_rate: f64,
}

impl ProposalStats {
    pub fn from_snapshot(snapshot: &[ProposalWithClient]) -> Self {
        let total = snapshot.len();
        let active = snapshot.iter().filter(|p| p.status.is_active()).count();
        let closed = snapshot
            .iter()
            .filter(|p| p.status == ProposalStatus::Closed)
            .count();
        let total_revenue: Decimal = snapshot.iter().map(|p| p.amount.value()).sum();
        let closed_revenue: Decimal = snapshot
            .iter()
            .filter(|p| p.status == ProposalStatus::Closed)
            .map(|p| p.amount.value())
            .sum();

        Self {
            total,
            active,
            closed,
            total_revenue,
            closed_revenue,
            conversion_rate: conversion_rate(closed, total),
        }
    }
}

fn conversion_rate(closed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = Decimal::from(closed as u64) * Decimal::ONE_HUNDRED / Decimal::from(total as u64);
    rate.to_f64().unwrap_or(0.0)
}

/// Overview across both stores
///
/// Revenue here counts closed proposals only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_clients: usize,
    pub total_proposals: usize,
    pub active_proposals: usize,
    pub closed_proposals: usize,
    pub revenue: Decimal,
    pub conversion_rate: f64,
}

impl DashboardStats {
    pub fn from_snapshots(clients: &[Client], proposals: &[ProposalWithClient]) -> Self {
        let proposal_stats = ProposalStats::from_snapshot(proposals);
        Self {
            total_clients: clients.len(),
            total_proposals: proposal_stats.total,
            active_proposals: proposal_stats.active,
            closed_proposals: proposal_stats.closed,
            revenue: proposal_stats.closed_revenue,
            conversion_rate: proposal_stats.conversion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Proposal, UserId};
    use chrono::{Duration, Utc};

    fn proposal(id: &str, amount: u32, status: ProposalStatus) -> ProposalWithClient {
        let now = Utc::now();
        ProposalWithClient::new(
            Proposal {
                id: id.to_string(),
                user_id: UserId::new("u1"),
                client_id: "c1".to_string(),
                title: id.to_string(),
                amount: Amount::from(amount),
                status,
                created_at: now,
                updated_at: now,
            },
            None,
        )
    }

    fn client(id: &str, minutes_ago: i64, company: Option<&str>) -> Client {
        Client {
            id: id.to_string(),
            user_id: UserId::new("u1"),
            name: id.to_string(),
            email: format!("{}@x.com", id),
            phone: None,
            company: company.map(str::to_string),
            notes: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_empty_snapshot_has_zero_conversion() {
        let stats = ProposalStats::from_snapshot(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.conversion_rate, 0.0);
        assert!(!stats.conversion_rate.is_nan());
        assert_eq!(stats.total_revenue, Decimal::ZERO);
    }

    #[test]
    fn test_proposal_stats_split_by_status() {
        let snapshot = vec![
            proposal("p1", 1000, ProposalStatus::Open),
            proposal("p2", 500, ProposalStatus::Negotiating),
            proposal("p3", 250, ProposalStatus::Closed),
            proposal("p4", 250, ProposalStatus::Closed),
        ];
        let stats = ProposalStats::from_snapshot(&snapshot);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.closed, 2);
        assert_eq!(stats.total_revenue, Decimal::from(2000));
        assert_eq!(stats.closed_revenue, Decimal::from(500));
        assert_eq!(stats.conversion_rate, 50.0);
    }

    #[test]
    fn test_conversion_rate_one_third() {
        assert!((conversion_rate(1, 3) - 33.333333).abs() < 1e-4);
    }

    #[test]
    fn test_client_stats_recent_and_company() {
        let snapshot: Vec<Client> = (0..7)
            .map(|i| {
                let company = if i % 2 == 0 { Some("Acme") } else { Some("") };
                client(&format!("c{}", i), i, company)
            })
            .collect();
        let stats = ClientStats::from_snapshot(&snapshot);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.with_company, 4);
        let recent: Vec<&str> = stats.recent.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(recent, vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn test_dashboard_counts_closed_revenue_only() {
        let clients = vec![client("c1", 0, None)];
        let proposals = vec![
            proposal("p1", 1000, ProposalStatus::Open),
            proposal("p2", 300, ProposalStatus::Closed),
        ];
        let stats = DashboardStats::from_snapshots(&clients, &proposals);
        assert_eq!(stats.total_clients, 1);
        assert_eq!(stats.total_proposals, 2);
        assert_eq!(stats.revenue, Decimal::from(300));
        assert_eq!(stats.conversion_rate, 50.0);
    }
}
