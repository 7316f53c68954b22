//! Record commands: list, save, delete, selected, select
//!
//! Output shapes:
//!
//! | command  | stdout                                  |
//! |----------|-----------------------------------------|
//! | list     | `{"data": [...]}`                       |
//! | save     | `{"ok": true, "record": .., "metafield": ..}` |
//! | delete   | `{"ok": true}`                          |
//! | selected | `{"ok": true, "selected": .., "items": ..}` |
//! | select   | `{"ok": true, "selected": ".."}`        |
//!
//! A repository failure prints `{"ok": false, "status": .., "error": ..}`
//! before the command fails. `status` is the HTTP status an endpoint would
//! answer with; upstream failures keep the platform's status and body.

use anyhow::Result;
use serde::Serialize;

use super::open_repository;
use crate::cli::Context;
use crate::core::types::{
    CustomerId, ListedRecord, MeasurementRecord, RecordDraft, SelectionItems, Selected,
};
use crate::metadata::MetadataEntry;
use crate::repository::RepositoryError;
use crate::ui::output;

#[derive(Serialize)]
struct ListResponse<'a> {
    data: &'a [ListedRecord],
}

#[derive(Serialize)]
struct SaveResponse<'a> {
    ok: bool,
    record: &'a MeasurementRecord,
    metafield: &'a MetadataEntry,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Serialize)]
struct SelectedResponse<'a> {
    ok: bool,
    selected: &'a Selected,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a SelectionItems>,
}

fn error_response(err: &RepositoryError) -> serde_json::Value {
    let message = match err {
        RepositoryError::UpstreamRequestFailed { body, .. } => body.clone(),
        other => other.to_string(),
    };
    serde_json::json!({ "ok": false, "status": err.status(), "error": message })
}

/// Print the failure as a response body, then hand it back to the caller.
fn failed(err: RepositoryError) -> anyhow::Error {
    if let Err(e) = output::print_json(&error_response(&err)) {
        tracing::debug!(error = %e, "could not print error response");
    }
    err.into()
}

/// Reject a missing or malformed customer id before anything else runs.
fn customer(raw: Option<&str>) -> Result<&str, RepositoryError> {
    CustomerId::from_option(raw)?;
    Ok(raw.unwrap_or_default())
}

/// List a customer's records.
pub async fn list(ctx: &Context, customer_id: Option<&str>) -> Result<()> {
    let customer_id = customer(customer_id).map_err(failed)?;
    let repo = open_repository(ctx)?;

    let items = repo.list(customer_id).await.map_err(failed)?;
    output::print_json(&ListResponse { data: &items })
}

/// Save a record.
pub async fn save(ctx: &Context, customer_id: Option<&str>, draft: RecordDraft) -> Result<()> {
    let customer_id = customer(customer_id).map_err(failed)?;
    let repo = open_repository(ctx)?;

    let saved = repo.save(customer_id, draft).await.map_err(failed)?;
    output::print_json(&SaveResponse {
        ok: true,
        record: &saved.record,
        metafield: &saved.metafield,
    })
}

/// Delete a record.
pub async fn delete(ctx: &Context, customer_id: Option<&str>, id: &str) -> Result<()> {
    let customer_id = customer(customer_id).map_err(failed)?;
    let repo = open_repository(ctx)?;

    if !repo.delete(customer_id, id).await.map_err(failed)? {
        output::warn(format!("no record with id '{}'", id.trim()), ctx.verbosity);
    }
    output::print_json(&OkResponse { ok: true })
}

/// Show the selected record.
pub async fn selected(ctx: &Context, customer_id: Option<&str>) -> Result<()> {
    let customer_id = customer(customer_id).map_err(failed)?;
    let repo = open_repository(ctx)?;

    let report = repo.get_selected(customer_id).await.map_err(failed)?;
    output::print_json(&SelectedResponse {
        ok: true,
        selected: &report.selected,
        items: report.items.as_ref(),
    })
}

/// Point the selection at a record.
pub async fn select(ctx: &Context, customer_id: Option<&str>, id: &str) -> Result<()> {
    let customer_id = customer(customer_id).map_err(failed)?;
    let repo = open_repository(ctx)?;

    let selected = Selected::Id(repo.select(customer_id, id).await.map_err(failed)?);
    output::print_json(&SelectedResponse {
        ok: true,
        selected: &selected,
        items: None,
    })
}
