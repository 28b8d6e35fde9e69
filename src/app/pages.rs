//! HTML pages

use askama::Template;
use axum::response::Html;
use serde_json::Value;

use crate::xero::Record;

use super::error::AppError;

/// Landing page with the link that starts the OAuth flow
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {}

#[derive(Template)]
#[template(path = "accounts.html")]
pub struct AccountsPage {
    pub table: AccountsTable,
}

#[derive(Template)]
#[template(path = "organisation.html")]
pub struct OrganisationPage {
    pub name: String,
}

/// Render a template into an HTML response body
pub fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}

/// Tabular view of account records
///
/// Columns are the keys of the first record, in order. Every row is read
/// through those columns: a key the row lacks renders as an empty cell and
/// keys the first record lacks are not shown.
#[derive(Debug, Default, PartialEq)]
pub struct AccountsTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl AccountsTable {
    pub fn from_records(records: &[Record]) -> Self {
        let columns: Vec<String> = match records.first() {
            Some(first) => first.keys().cloned().collect(),
            None => return Self::default(),
        };

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| cell_text(record.get(column)))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        // numbers and booleans print bare, arrays and objects as compact JSON
        Some(other) => other.to_string(),
    }
}
