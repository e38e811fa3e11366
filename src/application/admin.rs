use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::payload::Envelope;
use crate::application::repos::{AdminsRepo, RepoError};
use crate::application::views::AdminView;
use crate::cache::{CacheKey, CacheTrigger, ReadThrough};
use crate::infra::auth::{TokenError, TokenIssuer};

const SOURCE: &str = "gemstore::application::admin";

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("Passcode is required")]
    MissingPasscode,
    #[error("Invalid passcode")]
    InvalidPasscode,
    #[error("Admin token is required")]
    MissingToken,
    #[error("Invalid admin token")]
    InvalidToken(#[source] TokenError),
    #[error("Admin not found")]
    NotFound,
    #[error("failed to issue session token: {0}")]
    Issue(#[source] TokenError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    #[serde(flatten)]
    pub admin: AdminView,
    pub token: String,
}

#[derive(Clone)]
pub struct AdminService {
    admins: Arc<dyn AdminsRepo>,
    tokens: TokenIssuer,
    reads: ReadThrough,
    trigger: CacheTrigger,
}

impl AdminService {
    pub fn new(
        admins: Arc<dyn AdminsRepo>,
        tokens: TokenIssuer,
        reads: ReadThrough,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            admins,
            tokens,
            reads,
            trigger,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn login(&self, code: Option<&str>) -> Result<AdminSession, AdminAuthError> {
        let code = code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or(AdminAuthError::MissingPasscode)?;

        let admin = self
            .admins
            .find_admin_by_passcode(code)
            .await?
            .ok_or(AdminAuthError::InvalidPasscode)?;

        let token = self.tokens.issue(admin.id).map_err(AdminAuthError::Issue)?;
        self.trigger.admin_session_changed(admin.id).await;

        info!(target: SOURCE, admin_id = %admin.id, "admin session opened");
        Ok(AdminSession {
            admin: AdminView {
                id: admin.id,
                owner: admin.owner,
            },
            token,
        })
    }

    /// Logging out always succeeds; a valid token also drops the cached
    /// admin payload.
    pub async fn logout(&self, token: Option<&str>) {
        match token.map(|token| self.tokens.verify(token)) {
            Some(Ok(admin_id)) => {
                self.trigger.admin_session_changed(admin_id).await;
                info!(target: SOURCE, admin_id = %admin_id, "admin session closed");
            }
            Some(Err(err)) => debug!(target: SOURCE, error = %err, "logout with unusable token"),
            None => {}
        }
    }

    /// Verify a session token and return the admin id it carries.
    pub fn authorize(&self, token: Option<&str>) -> Result<Uuid, AdminAuthError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AdminAuthError::MissingToken)?;
        self.tokens
            .verify(token)
            .map_err(AdminAuthError::InvalidToken)
    }

    pub async fn current_admin(&self, token: Option<&str>) -> Result<String, AdminAuthError> {
        let admin_id = self.authorize(token)?;
        self.reads
            .fetch(&CacheKey::admin(admin_id), || async {
                let admin = self
                    .admins
                    .find_admin_by_id(admin_id)
                    .await?
                    .ok_or(AdminAuthError::NotFound)?;
                let view = AdminView {
                    id: admin.id,
                    owner: admin.owner,
                };
                Ok(Envelope::ok("Fetched admin data successfully", view).encode()?)
            })
            .await
    }
}
