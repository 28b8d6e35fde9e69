//! Browser-facing web app
//!
//! Landing page, the Xero OAuth round trip and the two pages that read
//! accounting data for the logged-in tenant.

mod error;
mod handlers;
mod pages;
mod router;
mod session;

pub use router::{AppState, SessionSettings, create_router};
