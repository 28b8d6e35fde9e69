//! Web router configuration

use std::sync::Arc;

use anyhow::anyhow;
use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{Key, SameSite, time::Duration},
};

use crate::assets;
use crate::model::config::Config;
use crate::xero::XeroApi;

use super::handlers;
use super::session::start_session;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "xero.sid";

/// Shared state for route handlers
#[derive(Clone)]
pub struct AppState {
    pub xero: Arc<dyn XeroApi>,
}

impl AppState {
    pub fn new(xero: impl XeroApi + 'static) -> Self {
        Self {
            xero: Arc::new(xero),
        }
    }
}

/// Cookie signing and expiry for the session layer
pub struct SessionSettings {
    pub key: Key,
    pub ttl_minutes: i64,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let key = match &config.session_secret {
            Some(secret) => Key::try_from(secret.as_slice())
                .map_err(|e| anyhow!("Invalid SESSION_SECRET: {}", e))?,
            None => {
                tracing::warn!("SESSION_SECRET not set, signing session cookies with a random key");
                Key::generate()
            }
        };

        Ok(Self {
            key,
            ttl_minutes: config.session_ttl_minutes,
        })
    }
}

/// CORS middleware layer
///
/// Allows any origin, method and header.
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the web router
///
/// # Endpoints
/// - `GET /` - Landing page
/// - `GET /connect` - Redirect to the Xero consent page
/// - `GET /callback` - OAuth redirect target
/// - `GET /accounts` - Chart of accounts of the active tenant
/// - `GET /organisation` - Organisation name of the active tenant
///
/// Anything else is looked up in the embedded `public/` files.
pub fn create_router<Store>(state: AppState, store: Store, settings: SessionSettings) -> Router
where
    Store: SessionStore + Clone,
{
    // Not marked Secure so the demo works over plain http://localhost.
    let session_layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(false)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(settings.ttl_minutes)))
        .with_signed(settings.key);

    Router::new()
        .route("/", get(handlers::index))
        .route("/connect", get(handlers::connect))
        .route("/callback", get(handlers::callback))
        .route("/accounts", get(handlers::accounts))
        .route("/organisation", get(handlers::organisation))
        .fallback(assets::static_handler)
        .layer(middleware::from_fn(start_session))
        .layer(session_layer)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
