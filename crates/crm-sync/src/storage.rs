//! File storage boundary
//!
//! Only the profile avatar is stored. Objects live under the owner's folder
//! and are served from a public URL.

use async_trait::async_trait;
use reqwest::Method;
use tracing::{info, warn};

use crate::config::SupabaseConfig;
use crate::domain::UserId;
use crate::error::{SyncError, SyncResult};
use crate::gateway::OwnerScope;

const CACHE_CONTROL: &str = "max-age=3600";

#[async_trait(?Send)]
pub trait FileStorage {
    /// Store `bytes` at `path` (overwriting) and return the public URL
    async fn upload(
        &self,
        scope: &OwnerScope,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<String>;
}

/// Object path for a new avatar: `<user_id>/<unix_millis>.<ext>`
///
/// The extension is whatever follows the last dot of the file name; a name
/// without a dot is used as the extension as a whole.
pub fn avatar_path(user: &UserId, file_name: &str, unix_millis: i64) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or(file_name);
    format!("{}/{}.{}", user, unix_millis, ext)
}

/// Storage API of the hosted backend
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    config: SupabaseConfig,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig) -> Self {
        let bucket = config.avatar_bucket.clone();
        Self {
            http: reqwest::Client::new(),
            config,
            bucket,
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        self.config.public_object_url(&self.bucket, path)
    }
}

#[async_trait(?Send)]
impl FileStorage for SupabaseStorage {
    async fn upload(
        &self,
        scope: &OwnerScope,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<String> {
        let token = scope.access_token().unwrap_or(&self.config.anon_key);
        let response = self
            .http
            .request(Method::POST, self.config.storage_object_url(&self.bucket, path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .header("x-upsert", "true")
            .header("cache-control", CACHE_CONTROL)
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = storage_error(status.as_u16(), &body);
            warn!(%path, %message, "upload failed");
            return Err(SyncError::Transport(message));
        }

        info!(%path, "object uploaded");
        Ok(self.public_url(path))
    }
}

fn storage_error(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("upload failed with status {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_path_uses_last_extension() {
        let user = UserId::new("u1");
        assert_eq!(avatar_path(&user, "me.final.png", 1700000000000), "u1/1700000000000.png");
        assert_eq!(avatar_path(&user, "avatar", 5), "u1/5.avatar");
    }

    #[test]
    fn test_public_url_points_at_bucket() {
        let config = SupabaseConfig::new("https://demo.supabase.co", "anon").unwrap();
        let storage = SupabaseStorage::new(config);
        assert_eq!(
            storage.public_url("u1/5.png"),
            "https://demo.supabase.co/storage/v1/object/public/avatars/u1/5.png"
        );
    }

    #[test]
    fn test_storage_error_reads_message_or_error() {
        assert_eq!(storage_error(400, r#"{"error":"Bucket not found"}"#), "Bucket not found");
        assert_eq!(storage_error(413, r#"{"message":"Payload too large"}"#), "Payload too large");
        assert_eq!(storage_error(500, ""), "upload failed with status 500");
    }
}
