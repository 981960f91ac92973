//! Profile hook: the signed-in user's own profile row

use std::rc::Rc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::AuthSession;
use crate::domain::{Profile, ProfilePatch};
use crate::error::{SyncError, SyncResult};
use crate::gateway::ProfileGateway;
use crate::storage::{avatar_path, FileStorage};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub profile: Option<Profile>,
    pub loading: bool,
    pub saving: bool,
    pub error: Option<String>,
}

pub struct ProfileHook {
    gateway: Rc<dyn ProfileGateway>,
    storage: Rc<dyn FileStorage>,
    session: Option<AuthSession>,
    profile: Option<Profile>,
    loading: bool,
    saving: bool,
    error: Option<String>,
}

impl ProfileHook {
    pub fn new(gateway: Rc<dyn ProfileGateway>, storage: Rc<dyn FileStorage>) -> Self {
        Self {
            gateway,
            storage,
            session: None,
            profile: None,
            loading: true,
            saving: false,
            error: None,
        }
    }

    pub fn state(&self) -> ProfileState {
        ProfileState {
            profile: self.profile.clone(),
            loading: self.loading,
            saving: self.saving,
            error: self.error.clone(),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub async fn set_user(&mut self, session: Option<&AuthSession>) {
        let same_user = matches!(
            (&self.session, session),
            (Some(current), Some(next)) if current.user.id == next.user.id
        );
        self.session = session.cloned();
        if same_user {
            return;
        }

        self.profile = None;
        self.error = None;
        if self.session.is_none() {
            self.loading = false;
            return;
        }
        let _ = self.refetch().await;
    }

    /// Read the profile, creating it from the auth metadata on first use
    pub async fn refetch(&mut self) -> SyncResult<Profile> {
        let session = self.session.clone().ok_or(SyncError::Unauthenticated)?;
        let scope = session.scope();
        self.loading = true;
        let result = match self.gateway.fetch(&scope).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => {
                info!(user = %session.user.id, "creating first profile");
                self.gateway.create(&scope, &session.user).await
            }
            Err(err) => Err(err),
        }
        .map_err(SyncError::into_load);
        self.loading = false;
        self.settle(&result);
        result
    }

    pub async fn update(&mut self, patch: &ProfilePatch) -> SyncResult<Profile> {
        let session = self.session.clone().ok_or(SyncError::Unauthenticated)?;
        self.saving = true;
        let result = self
            .gateway
            .update(&session.scope(), patch)
            .await
            .map_err(SyncError::into_mutation);
        self.saving = false;
        self.settle(&result);
        result
    }

    /// Store the image under the owner's folder, then point the profile at it
    pub async fn upload_avatar(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<String> {
        let session = self.session.clone().ok_or(SyncError::Unauthenticated)?;
        let scope = session.scope();
        let path = avatar_path(scope.user(), file_name, Utc::now().timestamp_millis());

        self.saving = true;
        let uploaded = self
            .storage
            .upload(&scope, &path, bytes, content_type)
            .await
            .map_err(SyncError::into_mutation);
        let url = match uploaded {
            Ok(url) => url,
            Err(err) => {
                self.saving = false;
                self.fail(&err);
                return Err(err);
            }
        };

        self.update(&ProfilePatch::avatar(url.clone())).await?;
        Ok(url)
    }

    fn settle(&mut self, result: &SyncResult<Profile>) {
        match result {
            Ok(profile) => {
                self.profile = Some(profile.clone());
                self.error = None;
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: &SyncError) {
        warn!(error = %err, "profile call failed");
        self.error = Some(err.message());
    }
}
