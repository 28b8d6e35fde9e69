//! Browser session state
//!
//! Every browser gets a session on its first request. It is then either
//! anonymous, waiting on a callback (a pending OAuth state is stored), or
//! authenticated. The authenticated fields are written
//! together as one [`XeroSession`] value so a half-populated login can never
//! be read back.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::xero::jwt::{self, Claims};
use crate::xero::{Tenant, TokenSet, XeroError};

use super::error::AppError;

const PENDING_STATE_KEY: &str = "xero.pending_state";
const XERO_SESSION_KEY: &str = "xero.session";
const STARTED_AT_KEY: &str = "xero.started_at";

/// Everything stored for an authenticated browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XeroSession {
    pub decoded_id_token: Claims,
    pub decoded_access_token: Claims,
    pub token_set: TokenSet,
    pub all_tenants: Vec<Tenant>,
    pub active_tenant: Tenant,
}

impl XeroSession {
    /// Build the session from a fresh token set and tenant list
    pub fn establish(token_set: TokenSet, tenants: Vec<Tenant>) -> Result<Self, XeroError> {
        let decoded_id_token = jwt::decode_claims(&token_set.id_token)?;
        let decoded_access_token = jwt::decode_claims(&token_set.access_token)?;
        let active_tenant = default_tenant(&tenants)
            .cloned()
            .ok_or_else(|| XeroError::Decode("no tenants authorized".to_string()))?;

        Ok(Self {
            decoded_id_token,
            decoded_access_token,
            token_set,
            all_tenants: tenants,
            active_tenant,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.active_tenant.tenant_id
    }
}

/// Default selection policy: the first tenant listed by the provider
pub fn default_tenant(tenants: &[Tenant]) -> Option<&Tenant> {
    tenants.first()
}

/// Middleware that records when a browser's session started
///
/// An empty session is never saved, so without this the cookie would only be
/// issued once a handler writes something.
pub async fn start_session(session: Session, request: Request, next: Next) -> Response {
    match session.get::<DateTime<Utc>>(STARTED_AT_KEY).await {
        Ok(Some(_)) => {}
        Ok(None) => match session.insert(STARTED_AT_KEY, Utc::now()).await {
            Ok(()) => tracing::debug!("New browser session"),
            Err(e) => tracing::error!(error = %e, "Failed to start session"),
        },
        Err(e) => tracing::error!(error = %e, "Failed to load session"),
    }
    next.run(request).await
}

/// Typed access to the request's session
pub struct SessionHandle(Session);

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(SessionHandle)
    }
}

impl SessionHandle {
    /// Remember the state sent with a consent redirect
    pub async fn begin_authorization(&self, oauth_state: &str) -> Result<(), AppError> {
        self.0.insert(PENDING_STATE_KEY, oauth_state).await?;
        Ok(())
    }

    /// Consume the pending state, if any
    pub async fn take_pending_state(&self) -> Result<Option<String>, AppError> {
        Ok(self.0.remove::<String>(PENDING_STATE_KEY).await?)
    }

    /// Store a completed login under a fresh session id
    pub async fn establish(&self, xero: &XeroSession) -> Result<(), AppError> {
        self.0.cycle_id().await?;
        self.0.insert(XERO_SESSION_KEY, xero).await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<XeroSession>, AppError> {
        Ok(self.0.get::<XeroSession>(XERO_SESSION_KEY).await?)
    }

    /// The authenticated session, or [`AppError::NotAuthenticated`]
    pub async fn require(&self) -> Result<XeroSession, AppError> {
        self.load().await?.ok_or(AppError::NotAuthenticated)
    }
}
