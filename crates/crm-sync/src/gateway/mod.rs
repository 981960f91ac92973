//! Remote Gateway
//!
//! Every remote read and write goes through here. Requests are built from an
//! `OwnerScope`, so the owner filter can never be left out.

mod memory;
mod postgrest;
mod traits;

pub use memory::{MemoryBackend, Operation};
pub use postgrest::PostgrestGateway;
pub use traits::{OwnerScope, ProfileGateway, RemoteGateway};
