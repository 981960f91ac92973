//! UI Components
//!
//! Dashboard widgets. Every component reads from the app store and writes
//! through the hook handles in `AppContext`.

mod client_form;
mod client_list;
mod dashboard;
mod delete_confirm_button;
mod form_field;
mod profile_panel;
mod proposal_board;
mod proposal_form;
mod sign_in_form;

pub use client_form::ClientFormPanel;
pub use client_list::ClientList;
pub use dashboard::Dashboard;
pub use delete_confirm_button::DeleteConfirmButton;
pub use form_field::FormField;
pub use profile_panel::ProfilePanel;
pub use proposal_board::ProposalBoard;
pub use proposal_form::ProposalFormPanel;
pub use sign_in_form::SignInForm;
