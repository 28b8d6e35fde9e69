//! Xero API client module
//!
//! The route layer depends only on [`XeroApi`]; [`XeroClient`] is the
//! implementation that talks to Xero over HTTPS.

mod client;
pub mod error;
pub mod jwt;
pub mod types;

use async_trait::async_trait;

pub use client::XeroClient;
pub use error::XeroError;
pub use types::{Organisation, Record, Tenant, TokenSet};

/// Tenant type of an accounting organisation connection
pub const ORGANISATION_TENANT: &str = "ORGANISATION";

/// Operations the web layer needs from the accounting provider
#[async_trait]
pub trait XeroApi: Send + Sync {
    /// Authorize URL the browser is sent to for consent
    fn build_consent_url(&self, state: &str) -> Result<String, XeroError>;

    /// Exchange the code carried by the callback request URL for tokens
    async fn exchange_callback(&self, callback_url: &str) -> Result<TokenSet, XeroError>;

    /// Organisations the token set is authorized for
    async fn fetch_tenants(&self, token_set: &TokenSet) -> Result<Vec<Tenant>, XeroError>;

    /// Connections with the organisation record of each organisation tenant attached
    async fn update_tenants(&self, token_set: &TokenSet) -> Result<Vec<Tenant>, XeroError> {
        let mut tenants = self.fetch_tenants(token_set).await?;
        for tenant in tenants
            .iter_mut()
            .filter(|t| t.tenant_type == ORGANISATION_TENANT)
        {
            let organisations = self.get_organisations(token_set, &tenant.tenant_id).await?;
            tenant.org_data = organisations.into_iter().next();
        }
        Ok(tenants)
    }

    /// Chart of accounts of one tenant
    async fn get_accounts(
        &self,
        token_set: &TokenSet,
        tenant_id: &str,
    ) -> Result<Vec<Record>, XeroError>;

    /// Organisation details of one tenant
    async fn get_organisations(
        &self,
        token_set: &TokenSet,
        tenant_id: &str,
    ) -> Result<Vec<Organisation>, XeroError>;
}
