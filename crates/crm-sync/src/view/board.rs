//! Status columns of the proposal board

use std::str::FromStr;

use crate::domain::{ProposalStatus, ProposalWithClient};

/// Proposals split into the three fixed status columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBoard {
    columns: [Vec<ProposalWithClient>; 3],
}

impl StatusBoard {
    /// Members of one column in snapshot order; possibly empty
    pub fn column(&self, status: ProposalStatus) -> &[ProposalWithClient] {
        &self.columns[status.index()]
    }

    /// Columns in board order, empty ones included
    pub fn iter(&self) -> impl Iterator<Item = (ProposalStatus, &[ProposalWithClient])> {
        ProposalStatus::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn group_by_status(snapshot: &[ProposalWithClient]) -> StatusBoard {
    let mut board = StatusBoard::default();
    for proposal in snapshot {
        board.columns[proposal.status.index()].push(proposal.clone());
    }
    board
}

/// Where a dragged card was released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Column(ProposalStatus),
    Card(String),
}

impl DropTarget {
    /// Column ids are status values; anything else is taken as a card id
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match ProposalStatus::from_str(raw) {
            Ok(status) => DropTarget::Column(status),
            Err(_) => DropTarget::Card(raw.to_string()),
        })
    }
}

/// New status for the dragged proposal, or `None` when nothing should change
///
/// A card target stands for the column that card sits in. Unknown ids and
/// drops onto the current status resolve to `None`.
pub fn resolve_drop(
    snapshot: &[ProposalWithClient],
    dragged_id: &str,
    target: &DropTarget,
) -> Option<ProposalStatus> {
    let dragged = snapshot.iter().find(|p| p.id == dragged_id)?;
    let status = match target {
        DropTarget::Column(status) => *status,
        DropTarget::Card(id) => snapshot.iter().find(|p| &p.id == id)?.status,
    };
    (status != dragged.status).then_some(status)
}
