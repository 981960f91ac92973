//! Edit state around one form schema

use std::future::Future;

use tracing::debug;

use super::schema::{FieldErrors, FormSchema};
use crate::error::{SyncError, SyncResult};

/// A validated payload, tagged with what it should do
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<O> {
    Create(O),
    Update { id: String, payload: O },
}

pub struct FormController<S: FormSchema> {
    values: S::Values,
    errors: FieldErrors,
    top_error: Option<String>,
    submitting: bool,
    editing: Option<String>,
}

impl<S: FormSchema> Default for FormController<S> {
    fn default() -> Self {
        Self {
            values: S::Values::default(),
            errors: FieldErrors::new(),
            top_error: None,
            submitting: false,
            editing: None,
        }
    }
}

impl<S: FormSchema> FormController<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &S::Values {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut S::Values {
        &mut self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }

    /// Message of the last failed submit
    pub fn top_error(&self) -> Option<&str> {
        self.top_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Id of the entity being edited; `None` for a create form
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Switch the form to `source`, or back to a blank create form
    ///
    /// Nothing from the previous target survives the switch.
    pub fn edit(&mut self, source: Option<&S::Source>) {
        match source {
            Some(source) => {
                self.values = S::from_source(source);
                self.editing = S::source_id(source);
            }
            None => {
                self.values = S::Values::default();
                self.editing = None;
            }
        }
        self.errors = FieldErrors::new();
        self.top_error = None;
    }

    /// Run the schema, recording per-field messages
    pub fn validate(&mut self) -> Result<S::Output, FieldErrors> {
        match S::validate(&self.values) {
            Ok(output) => {
                self.errors = FieldErrors::new();
                Ok(output)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// First half of a submit: validate and mark the form busy
    ///
    /// Fails without side effects beyond the field messages when the values
    /// are invalid or a submit is already running.
    pub fn begin_submit(&mut self) -> SyncResult<Submission<S::Output>> {
        if self.submitting {
            return Err(SyncError::mutation("Envio em andamento"));
        }
        let payload = self.validate().map_err(SyncError::Validation)?;
        self.submitting = true;
        self.top_error = None;
        Ok(match &self.editing {
            Some(id) => Submission::Update {
                id: id.clone(),
                payload,
            },
            None => Submission::Create(payload),
        })
    }

    /// Second half of a submit: success resets the form, failure keeps the
    /// values and shows the message
    pub fn finish_submit<T>(&mut self, result: &SyncResult<T>) {
        self.submitting = false;
        match result {
            Ok(_) => self.edit(None),
            Err(SyncError::Validation(errors)) => self.errors = errors.clone(),
            Err(err) => {
                debug!(error = %err, "submit failed");
                self.top_error = Some(err.message());
            }
        }
    }

    /// Validate, then hand the payload to `send`
    ///
    /// `send` is never called for invalid values.
    pub async fn submit<T, F, Fut>(&mut self, send: F) -> SyncResult<T>
    where
        F: FnOnce(Submission<S::Output>) -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let submission = self.begin_submit()?;
        let result = send(submission).await;
        self.finish_submit(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Client, UserId};
    use crate::form::{ClientForm, ClientValues};
    use chrono::Utc;
    use std::cell::Cell;

    fn ana() -> Client {
        Client {
            id: "c1".to_string(),
            user_id: UserId::new("u1"),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            phone: None,
            company: Some("Acme".to_string()),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn fill(form: &mut FormController<ClientForm>) {
        *form.values_mut() = ClientValues {
            name: "Bia".to_string(),
            email: "bia@x.com".to_string(),
            ..Default::default()
        };
    }

    #[tokio::test]
    async fn test_invalid_values_never_reach_send() {
        let mut form: FormController<ClientForm> = FormController::new();
        let called = Cell::new(false);

        let result = form
            .submit(|_| async {
                called.set(true);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(SyncError::Validation(_))));
        assert!(!called.get());
        assert!(form.field_error("name").is_some());
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_values() {
        let mut form: FormController<ClientForm> = FormController::new();
        fill(&mut form);

        let result: SyncResult<()> = form
            .submit(|_| async { Err(SyncError::mutation("duplicate key")) })
            .await;

        assert!(result.is_err());
        assert_eq!(form.top_error(), Some("duplicate key"));
        assert_eq!(form.values().name, "Bia");
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_success_resets_to_defaults() {
        let mut form: FormController<ClientForm> = FormController::new();
        fill(&mut form);

        let sent = form
            .submit(|submission| async move { Ok(submission) })
            .await
            .unwrap();

        match sent {
            Submission::Create(new) => assert_eq!(new.name, "Bia"),
            other => panic!("expected a create, got {:?}", other),
        }
        assert_eq!(form.values(), &ClientValues::default());
        assert!(form.top_error().is_none());
    }

    #[test]
    fn test_edit_prepopulates_and_clear_resets() {
        let mut form: FormController<ClientForm> = FormController::new();
        form.edit(Some(&ana()));
        assert_eq!(form.values().company, "Acme");
        assert_eq!(form.editing(), Some("c1"));

        form.edit(None);
        assert_eq!(form.values(), &ClientValues::default());
        assert_eq!(form.editing(), None);
    }

    #[test]
    fn test_edit_submission_carries_id() {
        let mut form: FormController<ClientForm> = FormController::new();
        form.edit(Some(&ana()));
        let submission = form.begin_submit().unwrap();
        assert!(matches!(submission, Submission::Update { ref id, .. } if id == "c1"));
        assert!(form.is_submitting());

        assert!(form.begin_submit().is_err());
        form.finish_submit(&Ok::<(), SyncError>(()));
        assert_eq!(form.editing(), None);
    }
}
