//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! No I/O happens here.

mod amount;
mod client;
mod entity;
mod profile;
mod proposal;
mod user;

pub use amount::{Amount, AmountError};
pub use client::{Client, ClientPatch, NewClient};
pub use entity::Entity;
pub use profile::{Profile, ProfilePatch};
pub use proposal::{
    ClientSummary, NewProposal, Proposal, ProposalPatch, ProposalStatus, ProposalWithClient,
    UnknownStatus,
};
pub use user::{AuthUser, UserId};
