//! Auth boundary
//!
//! The current identity is a watch channel: hooks keep a receiver and react
//! to every change, including the change to "nobody signed in".

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::SupabaseConfig;
use crate::domain::AuthUser;
use crate::error::{SyncError, SyncResult};
use crate::gateway::OwnerScope;

/// Renew this long before the access token runs out
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A signed-in user and the bearer token for their requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: Option<String>,
    /// Exchanged for a new access token before `expires_at`
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn new(user: AuthUser) -> Self {
        Self {
            user,
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_refresh(mut self, refresh_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self.expires_at = Some(expires_at);
        self
    }

    /// How long to wait before renewing, as of `now`
    ///
    /// `None` when the session cannot be renewed. Zero once inside the margin.
    pub fn refresh_delay_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.refresh_token.as_ref()?;
        let expires_at = self.expires_at?;
        let left = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
        Some(left.saturating_sub(REFRESH_MARGIN))
    }

    pub fn refresh_delay(&self) -> Option<Duration> {
        self.refresh_delay_at(Utc::now())
    }

    /// Request scope for this session
    pub fn scope(&self) -> OwnerScope {
        let scope = OwnerScope::new(self.user.id.clone());
        match &self.access_token {
            Some(token) => scope.with_token(token.clone()),
            None => scope,
        }
    }
}

/// Create the identity channel, starting signed out
pub fn auth_channel() -> (AuthHandle, AuthWatch) {
    let (sender, receiver) = watch::channel(None);
    (
        AuthHandle {
            sender: Arc::new(sender),
        },
        AuthWatch { receiver },
    )
}

/// Publishing side of the identity channel
#[derive(Debug, Clone)]
pub struct AuthHandle {
    sender: Arc<watch::Sender<Option<AuthSession>>>,
}

impl AuthHandle {
    pub fn sign_in(&self, session: AuthSession) {
        info!(user = %session.user.id, "signed in");
        self.sender.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if self.sender.send_replace(None).is_some() {
            info!("signed out");
        }
    }

    /// Take over the tokens of a renewed session
    ///
    /// Receivers are notified, but the user stays the same so hooks keep
    /// their channels. Ignored when signed out or signed in as someone else.
    pub fn refresh_token(&self, renewed: &AuthSession) {
        self.sender.send_if_modified(|current| match current {
            Some(session)
                if session.user.id == renewed.user.id
                    && (session.access_token != renewed.access_token
                        || session.refresh_token != renewed.refresh_token
                        || session.expires_at != renewed.expires_at) =>
            {
                session.access_token = renewed.access_token.clone();
                session.refresh_token = renewed.refresh_token.clone();
                session.expires_at = renewed.expires_at;
                true
            }
            _ => false,
        });
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.sender.borrow().clone()
    }

    pub fn watch(&self) -> AuthWatch {
        AuthWatch {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving side of the identity channel
#[derive(Debug, Clone)]
pub struct AuthWatch {
    receiver: watch::Receiver<Option<AuthSession>>,
}

impl AuthWatch {
    /// The identity right now, marking it as seen
    pub fn current(&mut self) -> Option<AuthSession> {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next identity change
    ///
    /// Returns `None` once the publishing side is gone.
    pub async fn changed(&mut self) -> Option<Option<AuthSession>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

// ========================
// Password sign-in
// ========================

#[derive(Debug, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds; preferred over `expires_in` when present
    #[serde(default)]
    expires_at: Option<i64>,
    user: RemoteUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let mut user = AuthUser::new(self.user.id, self.user.email.unwrap_or_default());
        if let Some(metadata) = self.user.user_metadata {
            user.full_name = metadata.full_name.filter(|name| !name.is_empty());
            user.avatar_url = metadata.avatar_url.filter(|url| !url.is_empty());
        }
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| self.expires_in.map(|secs| now + chrono::Duration::seconds(secs)));

        let mut session = AuthSession::new(user).with_token(self.access_token);
        session.refresh_token = self.refresh_token.filter(|token| !token.is_empty());
        session.expires_at = expires_at;
        session
    }
}

/// Email + password sign-in against the hosted auth endpoint
#[derive(Debug, Clone)]
pub struct PasswordAuth {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl PasswordAuth {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthSession> {
        let url = format!("{}/auth/v1/token", self.config.url);
        let response = self
            .http
            .request(Method::POST, url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.anon_key)
            .header("X-Client-Info", &self.config.client_info)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = auth_error(status.as_u16(), &body);
            warn!(%message, "sign-in rejected");
            return Err(SyncError::Transport(message));
        }
        parse_session(&body, Utc::now())
    }

    /// Exchange the session's refresh token for a new access token
    ///
    /// A rejected refresh token is `Unauthenticated`; the session is over.
    pub async fn refresh(&self, session: &AuthSession) -> SyncResult<AuthSession> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(SyncError::Unauthenticated);
        };
        let url = format!("{}/auth/v1/token", self.config.url);
        let response = self
            .http
            .request(Method::POST, url)
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.config.anon_key)
            .header("X-Client-Info", &self.config.client_info)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if matches!(status.as_u16(), 400 | 401) {
            warn!(message = %auth_error(status.as_u16(), &body), "refresh token rejected");
            return Err(SyncError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(SyncError::Transport(auth_error(status.as_u16(), &body)));
        }
        let renewed = parse_session(&body, Utc::now())?;
        info!(user = %renewed.user.id, "access token renewed");
        Ok(renewed)
    }

    /// Revoke the session's token on the server
    pub async fn sign_out(&self, session: &AuthSession) -> SyncResult<()> {
        let Some(token) = session.access_token.as_deref() else {
            return Ok(());
        };
        let response = self
            .http
            .request(Method::POST, format!("{}/auth/v1/logout", self.config.url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(SyncError::Transport(auth_error(status.as_u16(), &body)));
        }
        Ok(())
    }
}

pub(crate) fn parse_session(body: &str, now: DateTime<Utc>) -> SyncResult<AuthSession> {
    let response: TokenResponse = serde_json::from_str(body)?;
    Ok(response.into_session(now))
}

fn auth_error(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| format!("auth request failed with status {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn session(user: &str) -> AuthSession {
        AuthSession::new(AuthUser::new(user, format!("{}@x.com", user))).with_token("t1")
    }

    #[test]
    fn test_scope_carries_user_and_token() {
        let scope = session("u1").scope();
        assert_eq!(scope.user(), &UserId::new("u1"));
        assert_eq!(scope.access_token(), Some("t1"));
    }

    #[tokio::test]
    async fn test_watch_sees_sign_in_and_sign_out() {
        let (auth, mut watch) = auth_channel();
        assert_eq!(watch.current(), None);

        auth.sign_in(session("u1"));
        assert_eq!(watch.changed().await, Some(Some(session("u1"))));

        auth.sign_out();
        assert_eq!(watch.changed().await, Some(None));

        drop(auth);
        assert_eq!(watch.changed().await, None);
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_token_keeps_user() {
        let (auth, mut watch) = auth_channel();
        auth.sign_in(session("u1").with_refresh("r1", at(1_000)));
        watch.current();

        let renewed = session("u1").with_token("t2").with_refresh("r2", at(4_600));
        auth.refresh_token(&renewed);
        let refreshed = watch.changed().await.flatten().unwrap();
        assert_eq!(refreshed.user.id, UserId::new("u1"));
        assert_eq!(refreshed.access_token.as_deref(), Some("t2"));
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r2"));
        assert_eq!(refreshed.expires_at, Some(at(4_600)));
    }

    #[test]
    fn test_refresh_token_without_session_is_ignored() {
        let (auth, _watch) = auth_channel();
        auth.refresh_token(&session("u1").with_token("t2"));
        assert_eq!(auth.current(), None);
    }

    #[test]
    fn test_refresh_token_for_other_user_is_ignored() {
        let (auth, _watch) = auth_channel();
        auth.sign_in(session("u1"));
        auth.refresh_token(&session("u2").with_token("t2"));
        assert_eq!(auth.current().unwrap().access_token.as_deref(), Some("t1"));
    }

    #[test]
    fn test_refresh_delay_keeps_a_margin() {
        let renewable = session("u1").with_refresh("r1", at(3_600));
        assert_eq!(renewable.refresh_delay_at(at(0)), Some(Duration::from_secs(3_540)));
        assert_eq!(renewable.refresh_delay_at(at(3_570)), Some(Duration::ZERO));
        assert_eq!(renewable.refresh_delay_at(at(9_000)), Some(Duration::ZERO));
        assert_eq!(session("u1").refresh_delay_at(at(0)), None);
    }

    #[test]
    fn test_parse_session_reads_metadata() {
        let body = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "user": {
                "id": "u1",
                "email": "ana@x.com",
                "user_metadata": {"full_name": "Ana", "avatar_url": ""}
            }
        }"#;
        let parsed = parse_session(body, at(0)).unwrap();
        assert_eq!(parsed.user.full_name.as_deref(), Some("Ana"));
        assert_eq!(parsed.user.avatar_url, None);
        assert_eq!(parsed.access_token.as_deref(), Some("jwt"));
        assert_eq!(parsed.refresh_token, None);
        assert_eq!(parsed.refresh_delay_at(at(0)), None);
    }

    #[test]
    fn test_parse_session_reads_refresh_fields() {
        let body = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {"id": "u1", "email": "ana@x.com"}
        }"#;
        let parsed = parse_session(body, at(1_000)).unwrap();
        assert_eq!(parsed.refresh_token.as_deref(), Some("r1"));
        assert_eq!(parsed.expires_at, Some(at(4_600)));

        let absolute = r#"{
            "access_token": "jwt",
            "expires_in": 3600,
            "expires_at": 5000,
            "refresh_token": "r1",
            "user": {"id": "u1"}
        }"#;
        let parsed = parse_session(absolute, at(1_000)).unwrap();
        assert_eq!(parsed.expires_at, Some(at(5_000)));
    }

    #[test]
    fn test_auth_error_message() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(auth_error(400, body), "Invalid login credentials");
        assert_eq!(auth_error(503, ""), "auth request failed with status 503");
    }
}
