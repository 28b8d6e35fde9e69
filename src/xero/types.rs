//! Xero identity and accounting data types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::XeroError;

/// One accounting record, key order preserved as returned
pub type Record = Map<String, Value>;

/// Token set issued by the identity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Whether the access token has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Token endpoint response body
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;

impl TokenResponse {
    /// Convert to a token set, anchoring expiry at `now`
    ///
    /// An id token is required: the `openid` scope is always requested and the
    /// session keeps the decoded identity.
    pub fn into_token_set(self, now: DateTime<Utc>) -> Result<TokenSet, XeroError> {
        let id_token = self
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| XeroError::Decode("token response has no id_token".to_string()))?;

        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        Ok(TokenSet {
            id_token,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: self.scope,
            expires_at: now + Duration::seconds(expires_in),
        })
    }
}

/// An organisation connection the user authorized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Connection id
    pub id: String,
    pub tenant_id: String,
    pub tenant_type: String,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub auth_event_id: Option<String>,
    #[serde(default)]
    pub created_date_utc: Option<String>,
    #[serde(default)]
    pub updated_date_utc: Option<String>,
    /// Organisation record, attached by [`crate::xero::XeroApi::update_tenants`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_data: Option<Organisation>,
}

/// Organisation summary from the accounting API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organisation {
    #[serde(rename = "OrganisationID", default)]
    pub organisation_id: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "LegalName", default)]
    pub legal_name: Option<String>,
    #[serde(rename = "CountryCode", default)]
    pub country_code: Option<String>,
    #[serde(rename = "BaseCurrency", default)]
    pub base_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountsEnvelope {
    #[serde(rename = "Accounts", default)]
    pub accounts: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganisationsEnvelope {
    #[serde(rename = "Organisations", default)]
    pub organisations: Vec<Organisation>,
}
