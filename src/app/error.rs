//! Route-layer error type
//!
//! Failures are classified for logging only. The browser sees one of two
//! things: the apology text with `200 OK`, or a redirect back to the consent
//! flow.

use std::fmt;

use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::xero::XeroError;

/// The single message shown for every failure that is not a redirect
pub const APOLOGY: &str = "Sorry, something went wrong";

/// Where unauthenticated requests are sent
pub const LOGIN_PATH: &str = "/connect";

/// Handler errors
#[derive(Debug)]
pub enum AppError {
    /// No populated session, or the provider rejected its token
    NotAuthenticated,

    /// The request itself is unusable (state mismatch, provider error, no code)
    InvalidRequest(String),

    /// An upstream call failed
    Upstream(XeroError),

    /// The session store failed to load or save
    Session(String),

    /// A page failed to render
    Render(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotAuthenticated => write!(f, "Not authenticated"),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::Upstream(e) => write!(f, "Upstream failure: {}", e),
            AppError::Session(msg) => write!(f, "Session store error: {}", msg),
            AppError::Render(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Classify a failure during the OAuth callback
    ///
    /// A rejected client here means misconfiguration, not an expired login,
    /// so it is never turned into a redirect back to the consent flow.
    pub fn from_callback(e: XeroError) -> Self {
        match e {
            XeroError::Callback(msg) => AppError::InvalidRequest(msg),
            other => AppError::Upstream(other),
        }
    }

    fn log(&self) {
        match self {
            AppError::NotAuthenticated => tracing::debug!("Not authenticated"),
            AppError::InvalidRequest(_) => tracing::warn!(error = %self, "Rejected request"),
            _ => tracing::error!(error = %self, "Request failed"),
        }
    }

    /// Response for pages that need a login
    ///
    /// Every failure sends the browser back through the consent flow.
    pub fn into_login_redirect(self) -> Response {
        self.log();
        found(LOGIN_PATH)
    }
}

/// Resource calls: a refused token means the login is gone
impl From<XeroError> for AppError {
    fn from(e: XeroError) -> Self {
        if e.is_unauthorized() {
            AppError::NotAuthenticated
        } else {
            AppError::Upstream(e)
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AppError::Session(e.to_string())
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Render(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        match self {
            AppError::NotAuthenticated => found(LOGIN_PATH),
            _ => (StatusCode::OK, Html(APOLOGY)).into_response(),
        }
    }
}

/// `302 Found` redirect
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_unauthorized_resource_call_is_not_authenticated() {
        let err: AppError = XeroError::Unauthorized {
            operation: "accounts",
            status: 401,
        }
        .into();
        assert!(matches!(err, AppError::NotAuthenticated));
    }

    #[test]
    fn test_other_resource_failure_is_upstream() {
        let err: AppError = XeroError::Status {
            operation: "accounts",
            status: 503,
            body: String::new(),
        }
        .into();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_callback_classification() {
        let rejected = AppError::from_callback(XeroError::Unauthorized {
            operation: "token exchange",
            status: 401,
        });
        assert!(matches!(rejected, AppError::Upstream(_)));

        let bad = AppError::from_callback(XeroError::Callback("missing code".to_string()));
        assert!(matches!(bad, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_not_authenticated_response_redirects() {
        let response = AppError::NotAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/connect");
    }

    #[tokio::test]
    async fn test_failures_share_one_apology_page() {
        let errors = [
            AppError::InvalidRequest("state mismatch".to_string()),
            AppError::Upstream(XeroError::Config("no scopes configured".to_string())),
            AppError::Session("store down".to_string()),
            AppError::Render("template".to_string()),
        ];
        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::LOCATION).is_none());
            assert_eq!(body_text(response).await, APOLOGY);
        }
    }

    #[test]
    fn test_login_redirect_for_any_failure() {
        let errors = [
            AppError::NotAuthenticated,
            AppError::Upstream(XeroError::Status {
                operation: "organisation",
                status: 500,
                body: String::new(),
            }),
            AppError::Session("store down".to_string()),
        ];
        for err in errors {
            let response = err.into_login_redirect();
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(response.headers()[header::LOCATION], "/connect");
        }
    }
}
