//! Xero API client
//!
//! Talks to the identity service (consent, token exchange, connections) and
//! to the accounting API on behalf of one tenant at a time.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};

use crate::model::config::Config;

use super::XeroApi;
use super::error::XeroError;
use super::types::{
    AccountsEnvelope, Organisation, OrganisationsEnvelope, Record, Tenant, TokenResponse, TokenSet,
};

const AUTHORIZE_URL: &str = "https://login.xero.com/identity/connect/authorize";
const TOKEN_URL: &str = "https://identity.xero.com/connect/token";
const CONNECTIONS_URL: &str = "https://api.xero.com/connections";
const ACCOUNTING_URL: &str = "https://api.xero.com/api.xro/2.0/";

/// Upstream endpoint locations
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize: Url,
    pub token: Url,
    pub connections: Url,
    /// Accounting API base, must end with `/`
    pub accounting: Url,
}

impl Endpoints {
    pub fn xero() -> anyhow::Result<Self> {
        Ok(Self {
            authorize: AUTHORIZE_URL.parse()?,
            token: TOKEN_URL.parse()?,
            connections: CONNECTIONS_URL.parse()?,
            accounting: ACCOUNTING_URL.parse()?,
        })
    }
}

/// Pre-configured Xero client
pub struct XeroClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
    scopes: Vec<String>,
    endpoints: Endpoints,
}

impl XeroClient {
    pub fn new(config: &Config, http: Client) -> anyhow::Result<Self> {
        Ok(Self::with_endpoints(config, http, Endpoints::xero()?))
    }

    pub fn with_endpoints(config: &Config, http: Client, endpoints: Endpoints) -> Self {
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            endpoints,
        }
    }

    /// Requested scopes, space-delimited
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    fn accounting_url(&self, resource: &str) -> Result<Url, XeroError> {
        self.endpoints
            .accounting
            .join(resource)
            .map_err(|e| {
                XeroError::Config(format!("bad accounting URL for {}: {}", resource, e))
            })
    }

    async fn get_accounting(
        &self,
        operation: &'static str,
        resource: &str,
        token_set: &TokenSet,
        tenant_id: &str,
    ) -> Result<reqwest::Response, XeroError> {
        let url = self.accounting_url(resource)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&token_set.access_token)
            .header("xero-tenant-id", tenant_id)
            .header("Accept", "application/json")
            .send()
            .await?;
        ensure_success(response, operation).await
    }
}

/// Pass successful responses through, classify the rest
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, XeroError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(XeroError::Unauthorized {
            operation,
            status: status.as_u16(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(XeroError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl XeroApi for XeroClient {
    fn build_consent_url(&self, state: &str) -> Result<String, XeroError> {
        if self.scopes.is_empty() {
            return Err(XeroError::Config("no scopes configured".to_string()));
        }

        let mut url = self.endpoints.authorize.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scope())
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn exchange_callback(&self, callback_url: &str) -> Result<TokenSet, XeroError> {
        let url = self
            .redirect_uri
            .join(callback_url)
            .map_err(|e| XeroError::Callback(format!("unparseable callback URL: {}", e)))?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            let description = params
                .get("error_description")
                .map(String::as_str)
                .unwrap_or("no description");
            return Err(XeroError::Callback(format!("{}: {}", error, description)));
        }

        let code = params
            .get("code")
            .filter(|c| !c.is_empty())
            .ok_or_else(|| XeroError::Callback("missing authorization code".to_string()))?;

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.endpoints.token.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&form)
            .send()
            .await?;
        let response = ensure_success(response, "token exchange").await?;

        let body: TokenResponse = response.json().await?;
        body.into_token_set(Utc::now())
    }

    async fn fetch_tenants(&self, token_set: &TokenSet) -> Result<Vec<Tenant>, XeroError> {
        let response = self
            .http
            .get(self.endpoints.connections.clone())
            .bearer_auth(&token_set.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = ensure_success(response, "connections").await?;
        Ok(response.json().await?)
    }

    async fn get_accounts(
        &self,
        token_set: &TokenSet,
        tenant_id: &str,
    ) -> Result<Vec<Record>, XeroError> {
        let response = self
            .get_accounting("accounts", "Accounts", token_set, tenant_id)
            .await?;
        let envelope: AccountsEnvelope = response.json().await?;
        Ok(envelope.accounts)
    }

    async fn get_organisations(
        &self,
        token_set: &TokenSet,
        tenant_id: &str,
    ) -> Result<Vec<Organisation>, XeroError> {
        let response = self
            .get_accounting("organisation", "Organisation", token_set, tenant_id)
            .await?;
        let envelope: OrganisationsEnvelope = response.json().await?;
        Ok(envelope.organisations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Form, Json, Router,
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
        routing::{get, post},
    };
    use chrono::Duration;
    use serde_json::json;

    use crate::model::config::TlsBackend;

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "CLIENT_ID" => Some("client-abc".to_string()),
            "CLIENT_SECRET" => Some("secret-xyz".to_string()),
            "REDIRECT_URI" => Some("http://localhost:3000/callback".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn token_set(access_token: &str) -> TokenSet {
        TokenSet {
            id_token: "id".to_string(),
            access_token: access_token.to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            scope: None,
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    /// Serve a stand-in for the identity and accounting endpoints
    async fn spawn_upstream() -> Endpoints {
        async fn token(
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> impl IntoResponse {
            // base64("client-abc:secret-xyz")
            let basic = "Basic Y2xpZW50LWFiYzpzZWNyZXQteHl6";
            let authorized = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                == Some(basic);
            if !authorized || form.get("code").map(String::as_str) != Some("good-code") {
                return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})))
                    .into_response();
            }
            Json(json!({
                "id_token": "h.e30.s",
                "access_token": "live-token",
                "expires_in": 1800,
                "token_type": "Bearer",
                "refresh_token": "r",
                "scope": "openid accounting.settings"
            }))
            .into_response()
        }

        fn bearer_ok(headers: &HeaderMap) -> bool {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                == Some("Bearer live-token")
        }

        async fn connections(headers: HeaderMap) -> impl IntoResponse {
            if !bearer_ok(&headers) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            Json(json!([
                {"id": "c1", "tenantId": "t1", "tenantType": "ORGANISATION", "tenantName": "First"},
                {"id": "c2", "tenantId": "t2", "tenantType": "ORGANISATION", "tenantName": "Second"}
            ]))
            .into_response()
        }

        async fn accounts(headers: HeaderMap) -> impl IntoResponse {
            if !bearer_ok(&headers) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            match headers.get("xero-tenant-id").and_then(|v| v.to_str().ok()) {
                Some("t1") => Json(json!({"Accounts": [
                    {"AccountID": "a1", "Code": "200", "Name": "Sales"},
                    {"AccountID": "a2", "Code": "400", "Name": "Advertising"}
                ]}))
                .into_response(),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "unknown tenant").into_response(),
            }
        }

        async fn organisation(headers: HeaderMap) -> impl IntoResponse {
            if !bearer_ok(&headers) {
                return StatusCode::FORBIDDEN.into_response();
            }
            Json(json!({"Organisations": [
                {"OrganisationID": "o1", "Name": "Demo Company (NZ)", "BaseCurrency": "NZD"}
            ]}))
            .into_response()
        }

        let app = Router::new()
            .route("/connect/token", post(token))
            .route("/connections", get(connections))
            .route("/api.xro/2.0/Accounts", get(accounts))
            .route("/api.xro/2.0/Organisation", get(organisation));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Endpoints {
            authorize: "https://login.example.test/authorize".parse().unwrap(),
            token: format!("{base}/connect/token").parse().unwrap(),
            connections: format!("{base}/connections").parse().unwrap(),
            accounting: format!("{base}/api.xro/2.0/").parse().unwrap(),
        }
    }

    async fn client() -> XeroClient {
        let http = crate::http_client::build_client(None, 5, TlsBackend::Rustls).unwrap();
        XeroClient::with_endpoints(&test_config(), http, spawn_upstream().await)
    }

    #[test]
    fn test_default_endpoints_parse() {
        let endpoints = Endpoints::xero().unwrap();
        assert_eq!(
            endpoints.accounting.join("Accounts").unwrap().as_str(),
            "https://api.xero.com/api.xro/2.0/Accounts"
        );
    }

    #[test]
    fn test_build_consent_url() {
        let http = Client::new();
        let client = XeroClient::new(&test_config(), http).unwrap();
        let url: Url = client.build_consent_url("st-1").unwrap().parse().unwrap();

        assert_eq!(url.host_str(), Some("login.xero.com"));
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-abc");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/callback");
        assert_eq!(params["state"], "st-1");
        assert_eq!(params["scope"], client.scope());
        assert!(params["scope"].starts_with("offline_access openid profile email"));
    }

    #[test]
    fn test_consent_url_without_scopes_is_config_error() {
        let mut config = test_config();
        config.scopes.clear();
        let client = XeroClient::new(&config, Client::new()).unwrap();
        assert!(matches!(
            client.build_consent_url("st-1"),
            Err(XeroError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_callback_and_resources() {
        let client = client().await;

        let tokens = client
            .exchange_callback("/callback?code=good-code&state=st-1&scope=openid")
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "live-token");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
        assert!(!tokens.is_expired());

        let tenants = client.fetch_tenants(&tokens).await.unwrap();
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].tenant_id, "t1");

        let accounts = client.get_accounts(&tokens, "t1").await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1]["Name"], "Advertising");

        let orgs = client.get_organisations(&tokens, "t1").await.unwrap();
        assert_eq!(orgs[0].name, "Demo Company (NZ)");
        assert_eq!(orgs[0].base_currency.as_deref(), Some("NZD"));
    }

    #[tokio::test]
    async fn test_update_tenants_attaches_organisation() {
        let client = client().await;
        let tenants = client
            .update_tenants(&token_set("live-token"))
            .await
            .unwrap();

        assert_eq!(tenants.len(), 2);
        for tenant in &tenants {
            let org = tenant.org_data.as_ref().unwrap();
            assert_eq!(org.name, "Demo Company (NZ)");
        }
    }

    #[tokio::test]
    async fn test_exchange_callback_rejected_code() {
        let client = client().await;
        let err = client
            .exchange_callback("/callback?code=stale-code")
            .await
            .unwrap_err();
        assert!(matches!(err, XeroError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_exchange_callback_provider_error() {
        let client = client().await;
        let err = client
            .exchange_callback("/callback?error=access_denied&error_description=user+cancelled")
            .await
            .unwrap_err();
        match err {
            XeroError::Callback(msg) => assert_eq!(msg, "access_denied: user cancelled"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_callback_missing_code() {
        let client = client().await;
        let err = client.exchange_callback("/callback").await.unwrap_err();
        assert!(matches!(err, XeroError::Callback(_)));
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let client = client().await;
        let stale = token_set("stale-token");

        assert!(client.fetch_tenants(&stale).await.unwrap_err().is_unauthorized());
        assert!(client.get_accounts(&stale, "t1").await.unwrap_err().is_unauthorized());
        assert!(client.get_organisations(&stale, "t1").await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_server_error_is_not_unauthorized() {
        let client = client().await;
        let err = client
            .get_accounts(&token_set("live-token"), "missing")
            .await
            .unwrap_err();
        assert!(!err.is_unauthorized());
        assert!(matches!(err, XeroError::Status { status: 500, .. }));
    }
}
