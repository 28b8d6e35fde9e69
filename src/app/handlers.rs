//! Route handlers

use axum::{
    extract::{Query, State},
    http::Uri,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::xero::XeroError;

use super::error::{AppError, found};
use super::pages::{AccountsPage, AccountsTable, IndexPage, OrganisationPage, render};
use super::router::AppState;
use super::session::{SessionHandle, XeroSession};

/// Where a completed login lands
const AFTER_LOGIN_PATH: &str = "/accounts";

/// Generate a random OAuth state value (122 bits from the OS RNG)
fn generate_state() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compare the returned state with the one issued, in constant time
fn verify_state(expected: Option<&str>, received: Option<&str>) -> Result<(), AppError> {
    let expected = expected
        .ok_or_else(|| AppError::InvalidRequest("no authorization in progress".to_string()))?;
    let received =
        received.ok_or_else(|| AppError::InvalidRequest("callback has no state".to_string()))?;

    if bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest("state mismatch".to_string()))
    }
}

/// GET /
pub async fn index() -> Result<Html<String>, AppError> {
    render(&IndexPage {})
}

/// GET /connect
///
/// Sends the browser to the Xero consent page. The state is only stored once
/// the URL was built, so a failure leaves no pending authorization behind.
pub async fn connect(
    State(state): State<AppState>,
    session: SessionHandle,
) -> Result<Response, AppError> {
    let oauth_state = generate_state();
    let consent_url = state
        .xero
        .build_consent_url(&oauth_state)
        .map_err(AppError::Upstream)?;

    session.begin_authorization(&oauth_state).await?;
    tracing::info!("Redirecting to Xero consent page");
    tracing::debug!(consent_url = %consent_url, "Consent URL built");

    Ok(found(&consent_url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    state: Option<String>,
}

/// GET /callback
pub async fn callback(
    State(state): State<AppState>,
    session: SessionHandle,
    uri: Uri,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let pending = session.take_pending_state().await?;
    verify_state(pending.as_deref(), params.state.as_deref())?;

    let token_set = state
        .xero
        .exchange_callback(&uri.to_string())
        .await
        .map_err(AppError::from_callback)?;

    let tenants = state
        .xero
        .update_tenants(&token_set)
        .await
        .map_err(AppError::from_callback)?;

    let xero_session =
        XeroSession::establish(token_set, tenants).map_err(AppError::from_callback)?;
    session.establish(&xero_session).await?;

    tracing::info!(
        tenant_count = xero_session.all_tenants.len(),
        tenant_id = %xero_session.tenant_id(),
        "Xero login successful"
    );

    Ok(found(AFTER_LOGIN_PATH))
}

/// GET /accounts
pub async fn accounts(State(state): State<AppState>, session: SessionHandle) -> Response {
    match render_accounts(&state, &session).await {
        Ok(page) => page.into_response(),
        Err(e) => e.into_login_redirect(),
    }
}

async fn render_accounts(
    state: &AppState,
    session: &SessionHandle,
) -> Result<Html<String>, AppError> {
    let xero_session = session.require().await?;
    let records = state
        .xero
        .get_accounts(&xero_session.token_set, xero_session.tenant_id())
        .await?;

    tracing::info!(
        tenant_id = %xero_session.tenant_id(),
        count = records.len(),
        "Fetched accounts"
    );

    render(&AccountsPage {
        table: AccountsTable::from_records(&records),
    })
}

/// GET /organisation
pub async fn organisation(State(state): State<AppState>, session: SessionHandle) -> Response {
    match render_organisation(&state, &session).await {
        Ok(page) => page.into_response(),
        Err(e) => e.into_login_redirect(),
    }
}

async fn render_organisation(
    state: &AppState,
    session: &SessionHandle,
) -> Result<Html<String>, AppError> {
    let xero_session = session.require().await?;

    // Expiry is reported, not acted on; a rejected token surfaces below.
    if xero_session.token_set.is_expired() {
        tracing::info!("token expired");
    } else {
        tracing::info!("token valid");
    }

    let organisation = state
        .xero
        .get_organisations(&xero_session.token_set, xero_session.tenant_id())
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            AppError::Upstream(XeroError::Decode("no organisation returned".to_string()))
        })?;

    render(&OrganisationPage {
        name: organisation.name,
    })
}
