//! REST gateway against the hosted store
//!
//! Speaks the PostgREST dialect: filters as query parameters, JSON bodies,
//! `Prefer: return=representation` so writes answer with the stored row.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::traits::{OwnerScope, ProfileGateway, RemoteGateway};
use crate::config::SupabaseConfig;
use crate::domain::{AuthUser, Entity, Profile, ProfilePatch};
use crate::error::{SyncError, SyncResult};

const PROFILES: &str = "profiles";

#[derive(Debug, Clone)]
pub struct PostgrestGateway {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl PostgrestGateway {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn request(&self, method: Method, table: &str, scope: &OwnerScope) -> RequestBuilder {
        let token = scope.access_token().unwrap_or(&self.config.anon_key);
        self.http
            .request(method, self.config.rest_url(table))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .header("X-Client-Info", &self.config.client_info)
            .header("Accept-Profile", &self.config.schema)
            .header("Content-Profile", &self.config.schema)
    }

    async fn rows<R: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<Vec<R>> {
        let response = request.send().await?;
        read_rows(response).await
    }
}

#[async_trait(?Send)]
impl<T: Entity> RemoteGateway<T> for PostgrestGateway {
    async fn select(&self, scope: &OwnerScope) -> SyncResult<Vec<T>> {
        let request = self
            .request(Method::GET, T::TABLE, scope)
            .query(&list_query(T::SELECT, scope));
        self.rows(request).await
    }

    async fn fetch(&self, scope: &OwnerScope, id: &str) -> SyncResult<Option<T>> {
        let request = self
            .request(Method::GET, T::TABLE, scope)
            .query(&row_query(T::SELECT, scope, id));
        let rows: Vec<T> = self.rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, scope: &OwnerScope, new: &T::New) -> SyncResult<T> {
        let body = with_owner(new, scope)?;
        let request = self
            .request(Method::POST, T::TABLE, scope)
            .query(&[("select", T::SELECT)])
            .header("Prefer", "return=representation")
            .json(&body);
        single(self.rows(request).await?, T::TABLE)
    }

    async fn update(&self, scope: &OwnerScope, id: &str, patch: &T::Patch) -> SyncResult<T> {
        let request = self
            .request(Method::PATCH, T::TABLE, scope)
            .query(&row_query(T::SELECT, scope, id))
            .header("Prefer", "return=representation")
            .json(patch);
        single(self.rows(request).await?, T::TABLE)
    }

    async fn delete(&self, scope: &OwnerScope, id: &str) -> SyncResult<()> {
        let response = self
            .request(Method::DELETE, T::TABLE, scope)
            .query(&[("user_id", scope.owner_filter()), ("id", format!("eq.{}", id))])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(SyncError::Transport(error_message(status.as_u16(), &body)));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ProfileGateway for PostgrestGateway {
    async fn fetch(&self, scope: &OwnerScope) -> SyncResult<Option<Profile>> {
        let request = self
            .request(Method::GET, PROFILES, scope)
            .query(&profile_query(scope));
        let rows: Vec<Profile> = self.rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, scope: &OwnerScope, user: &AuthUser) -> SyncResult<Profile> {
        if &user.id != scope.user() {
            return Err(SyncError::Unauthenticated);
        }
        let seed = Profile::seed(user, Utc::now());
        let request = self
            .request(Method::POST, PROFILES, scope)
            .header("Prefer", "return=representation")
            .json(&seed);
        single(self.rows(request).await?, PROFILES)
    }

    async fn update(&self, scope: &OwnerScope, patch: &ProfilePatch) -> SyncResult<Profile> {
        let mut body = serde_json::to_value(patch)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        let request = self
            .request(Method::PATCH, PROFILES, scope)
            .query(&profile_query(scope))
            .header("Prefer", "return=representation")
            .json(&body);
        single(self.rows(request).await?, PROFILES)
    }
}

/// Owner's rows, newest first
pub(crate) fn list_query(select: &str, scope: &OwnerScope) -> Vec<(&'static str, String)> {
    vec![
        ("select", select.to_string()),
        ("user_id", scope.owner_filter()),
        ("order", "created_at.desc".to_string()),
    ]
}

/// One row of the owner by id
pub(crate) fn row_query(select: &str, scope: &OwnerScope, id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("select", select.to_string()),
        ("user_id", scope.owner_filter()),
        ("id", format!("eq.{}", id)),
    ]
}

fn profile_query(scope: &OwnerScope) -> Vec<(&'static str, String)> {
    vec![("select", "*".to_string()), ("id", scope.owner_filter())]
}

/// Serialize an insert payload and stamp the owner onto it
pub(crate) fn with_owner<P: Serialize>(payload: &P, scope: &OwnerScope) -> SyncResult<Value> {
    match serde_json::to_value(payload)? {
        Value::Object(mut fields) => {
            fields.insert(
                "user_id".to_string(),
                Value::String(scope.user().as_str().to_string()),
            );
            Ok(Value::Object(fields))
        }
        other => Err(SyncError::Decode(format!(
            "insert payload must be an object, got {}",
            other
        ))),
    }
}

async fn read_rows<R: DeserializeOwned>(response: Response) -> SyncResult<Vec<R>> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = error_message(status.as_u16(), &body);
        warn!(status = status.as_u16(), %message, "remote request failed");
        return Err(SyncError::Transport(message));
    }
    Ok(serde_json::from_str(&body)?)
}

fn single<R>(rows: Vec<R>, table: &str) -> SyncResult<R> {
    rows.into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound(format!("{} row", table)))
}

/// The server's `message` field when the error body carries one
pub(crate) fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("request failed with status {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewClient, UserId};

    fn scope() -> OwnerScope {
        OwnerScope::new(UserId::new("u1")).with_token("jwt")
    }

    #[test]
    fn test_list_query_always_filters_by_owner() {
        let query = list_query("*,clients(id,name,email,company)", &scope());
        assert_eq!(
            query,
            vec![
                ("select", "*,clients(id,name,email,company)".to_string()),
                ("user_id", "eq.u1".to_string()),
                ("order", "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_row_query_filters_by_owner_and_id() {
        let query = row_query("*", &scope(), "c9");
        assert!(query.contains(&("user_id", "eq.u1".to_string())));
        assert!(query.contains(&("id", "eq.c9".to_string())));
    }

    #[test]
    fn test_with_owner_injects_user_id() {
        let body = with_owner(&NewClient::new("Ana", "ana@x.com"), &scope()).unwrap();
        assert_eq!(body["user_id"], "u1");
        assert_eq!(body["name"], "Ana");
        assert!(body.get("company").is_none());
    }

    #[test]
    fn test_with_owner_rejects_non_objects() {
        assert!(matches!(with_owner(&42, &scope()), Err(SyncError::Decode(_))));
    }

    #[test]
    fn test_error_message_prefers_server_message() {
        let body = r#"{"code":"23503","message":"violates foreign key constraint"}"#;
        assert_eq!(error_message(409, body), "violates foreign key constraint");
        assert_eq!(error_message(502, "<html>bad gateway</html>"), "request failed with status 502");
        assert_eq!(error_message(500, r#"{"message":""}"#), "request failed with status 500");
    }

    #[test]
    fn test_single_reports_missing_row() {
        let rows: Vec<u8> = Vec::new();
        assert_eq!(
            single(rows, "proposals"),
            Err(SyncError::NotFound("proposals row".to_string()))
        );
    }
}
