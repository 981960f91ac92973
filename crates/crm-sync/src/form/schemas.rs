//! The product's forms: client, proposal, profile and sign-in

use std::str::FromStr;

use super::schema::{is_email, is_http_url, is_uuid, min_chars, optional, FieldErrors, FormSchema};
use crate::domain::{
    Amount, AmountError, Client, NewClient, NewProposal, Profile, ProfilePatch, ProposalStatus,
    ProposalWithClient,
};

const NAME_TOO_SHORT: &str = "Nome deve ter pelo menos 2 caracteres";
const INVALID_EMAIL: &str = "Email inválido";

// ========================
// Client
// ========================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientValues {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub notes: String,
}

pub struct ClientForm;

impl FormSchema for ClientForm {
    type Values = ClientValues;
    type Source = Client;
    type Output = NewClient;

    fn from_source(client: &Client) -> ClientValues {
        ClientValues {
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone().unwrap_or_default(),
            company: client.company.clone().unwrap_or_default(),
            notes: client.notes.clone().unwrap_or_default(),
        }
    }

    fn source_id(client: &Client) -> Option<String> {
        Some(client.id.clone())
    }

    fn validate(values: &ClientValues) -> Result<NewClient, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !min_chars(&values.name, 2) {
            errors.insert("name", NAME_TOO_SHORT);
        }
        if !is_email(&values.email) {
            errors.insert("email", INVALID_EMAIL);
        }
        errors.finish(NewClient {
            name: values.name.clone(),
            email: values.email.clone(),
            phone: optional(&values.phone),
            company: optional(&values.company),
            notes: optional(&values.notes),
        })
    }
}

// ========================
// Proposal
// ========================

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalValues {
    pub title: String,
    /// Decimal text, `.` as separator
    pub amount: String,
    /// Wire value of the status
    pub status: String,
    pub client_id: String,
}

impl Default for ProposalValues {
    fn default() -> Self {
        Self {
            title: String::new(),
            amount: String::new(),
            status: ProposalStatus::default().as_str().to_string(),
            client_id: String::new(),
        }
    }
}

pub struct ProposalForm;

impl FormSchema for ProposalForm {
    type Values = ProposalValues;
    type Source = ProposalWithClient;
    type Output = NewProposal;

    fn from_source(proposal: &ProposalWithClient) -> ProposalValues {
        ProposalValues {
            title: proposal.title.clone(),
            amount: proposal.amount.to_string(),
            status: proposal.status.as_str().to_string(),
            client_id: proposal.client_id.clone(),
        }
    }

    fn source_id(proposal: &ProposalWithClient) -> Option<String> {
        Some(proposal.id.clone())
    }

    fn validate(values: &ProposalValues) -> Result<NewProposal, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !min_chars(&values.title, 2) {
            errors.insert("title", "Título deve ter pelo menos 2 caracteres");
        }
        let amount = match Amount::from_str(values.amount.trim()) {
            Ok(amount) => amount,
            Err(AmountError::Negative(_)) => {
                errors.insert("amount", "Valor deve ser positivo");
                Amount::ZERO
            }
            Err(AmountError::Malformed(_)) => {
                errors.insert("amount", "Valor deve ser um número");
                Amount::ZERO
            }
        };
        let status = ProposalStatus::from_str(&values.status).unwrap_or_else(|_| {
            errors.insert("status", "Status inválido");
            ProposalStatus::default()
        });
        if !is_uuid(&values.client_id) {
            errors.insert("client_id", "ID do cliente inválido");
        }
        errors.finish(NewProposal {
            client_id: values.client_id.clone(),
            title: values.title.clone(),
            amount,
            status,
        })
    }
}

// ========================
// Profile
// ========================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileValues {
    pub full_name: String,
    pub avatar_url: String,
    pub company: String,
    pub phone: String,
    pub bio: String,
    pub website: String,
}

pub struct ProfileForm;

impl FormSchema for ProfileForm {
    type Values = ProfileValues;
    type Source = Profile;
    type Output = ProfilePatch;

    fn from_source(profile: &Profile) -> ProfileValues {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        ProfileValues {
            full_name: text(&profile.full_name),
            avatar_url: text(&profile.avatar_url),
            company: text(&profile.company),
            phone: text(&profile.phone),
            bio: text(&profile.bio),
            website: text(&profile.website),
        }
    }

    fn source_id(profile: &Profile) -> Option<String> {
        Some(profile.id.to_string())
    }

    /// Every field is written back; empty ones clear the column
    fn validate(values: &ProfileValues) -> Result<ProfilePatch, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !min_chars(&values.full_name, 2) {
            errors.insert("full_name", NAME_TOO_SHORT);
        }
        if !values.avatar_url.is_empty() && !is_http_url(&values.avatar_url) {
            errors.insert("avatar_url", "URL inválida");
        }
        errors.finish(ProfilePatch {
            full_name: Some(optional(&values.full_name)),
            avatar_url: Some(optional(&values.avatar_url)),
            company: Some(optional(&values.company)),
            phone: Some(optional(&values.phone)),
            bio: Some(optional(&values.bio)),
            website: Some(optional(&values.website)),
        })
    }
}

// ========================
// Sign-in
// ========================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignInValues {
    pub email: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

pub struct SignInForm;

impl FormSchema for SignInForm {
    type Values = SignInValues;
    type Source = Credentials;
    type Output = Credentials;

    fn from_source(credentials: &Credentials) -> SignInValues {
        SignInValues {
            email: credentials.email.clone(),
            password: String::new(),
        }
    }

    fn source_id(_: &Credentials) -> Option<String> {
        None
    }

    fn validate(values: &SignInValues) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !is_email(&values.email) {
            errors.insert("email", INVALID_EMAIL);
        }
        if !min_chars(&values.password, 6) {
            errors.insert("password", "Senha deve ter pelo menos 6 caracteres");
        }
        errors.finish(Credentials {
            email: values.email.clone(),
            password: values.password.clone(),
        })
    }
}
