//! Hosted Backend Configuration
//!
//! Project URL and anon key for the hosted store, plus the endpoints derived
//! from them.

use crate::error::{SyncError, SyncResult};

pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_CLIENT_INFO: &str = "freelcrm@1.0.0";
pub const DEFAULT_AVATAR_BUCKET: &str = "avatars";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL without trailing slash
    pub url: String,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
    pub schema: String,
    /// Value of the `X-Client-Info` header
    pub client_info: String,
    pub avatar_bucket: String,
}

impl SupabaseConfig {
    pub fn new(url: &str, anon_key: &str) -> SyncResult<Self> {
        let url = url.trim().trim_end_matches('/');
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(SyncError::config(format!(
                "SUPABASE_URL must be an http(s) URL, got '{}'",
                url
            )));
        }
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(SyncError::config("SUPABASE_ANON_KEY must not be empty"));
        }

        Ok(Self {
            url: url.to_string(),
            anon_key: anon_key.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            client_info: DEFAULT_CLIENT_INFO.to_string(),
            avatar_bucket: DEFAULT_AVATAR_BUCKET.to_string(),
        })
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY`, loading `.env` first if present
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> SyncResult<Self> {
        let _ = dotenvy::dotenv();
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| SyncError::config("SUPABASE_URL is not set"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| SyncError::config("SUPABASE_ANON_KEY is not set"))?;
        Self::new(&url, &anon_key)
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    pub fn storage_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, bucket, path)
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = SupabaseConfig::new("https://demo.supabase.co/", "anon").unwrap();
        assert_eq!(config.url, "https://demo.supabase.co");
        assert_eq!(config.schema, "public");
        assert_eq!(config.client_info, "freelcrm@1.0.0");
    }

    #[test]
    fn test_new_rejects_bad_values() {
        assert!(matches!(
            SupabaseConfig::new("demo.supabase.co", "anon"),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            SupabaseConfig::new("https://demo.supabase.co", "  "),
            Err(SyncError::Config(_))
        ));
    }

    // The only test touching these variables, so it cannot race another
    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_from_env_reads_and_validates() {
        std::env::set_var("SUPABASE_URL", "https://env.supabase.co/");
        std::env::set_var("SUPABASE_ANON_KEY", "env-anon");
        let config = SupabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "https://env.supabase.co");
        assert_eq!(config.anon_key, "env-anon");

        std::env::set_var("SUPABASE_URL", "ftp://env.supabase.co");
        assert!(matches!(SupabaseConfig::from_env(), Err(SyncError::Config(_))));

        std::env::remove_var("SUPABASE_URL");
        match SupabaseConfig::from_env() {
            Err(SyncError::Config(message)) => assert!(message.contains("SUPABASE_URL")),
            other => panic!("expected a config error, got {:?}", other),
        }
        std::env::remove_var("SUPABASE_ANON_KEY");
    }

    #[test]
    fn test_endpoints() {
        let config = SupabaseConfig::new("https://demo.supabase.co", "anon").unwrap();
        assert_eq!(config.rest_url("clients"), "https://demo.supabase.co/rest/v1/clients");
        assert_eq!(
            config.storage_object_url("avatars", "u1/1.png"),
            "https://demo.supabase.co/storage/v1/object/avatars/u1/1.png"
        );
        assert_eq!(
            config.public_object_url("avatars", "u1/1.png"),
            "https://demo.supabase.co/storage/v1/object/public/avatars/u1/1.png"
        );
    }
}
