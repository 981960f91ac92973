//! Form Controller
//!
//! Schemas turn raw field text into typed payloads or per-field messages;
//! the controller owns the edit state around one schema.

mod controller;
mod schema;
mod schemas;

pub use controller::{FormController, Submission};
pub use schema::{FieldErrors, FormSchema};
pub use schemas::{
    ClientForm, ClientValues, Credentials, ProfileForm, ProfileValues, ProposalForm,
    ProposalValues, SignInForm, SignInValues,
};
