//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Record commands (list, save, delete, selected, select) are async
//! because they talk to the platform. `dispatch` builds a tokio runtime
//! for them; the local commands (auth, config, completion) run without one.
//!
//! Each record command validates the customer id first, then opens the
//! repository, so a bad invocation fails before configuration, secrets or
//! the network are touched.

mod auth;
mod completion;
mod config_cmd;
mod records;

pub use auth::auth;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use records::{delete, list, save, select, selected};

use std::future::Future;

use anyhow::{Context as _, Result};
use tracing::debug;

use super::args::{Command, ConfigAction};
use super::Context;
use crate::core::config::Config;
use crate::core::types::RecordDraft;
use crate::metadata::{create_client, resolve_shop};
use crate::repository::{MeasurementRepository, RepositoryError, RepositoryOptions};
use crate::secrets;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::List { customer } => block_on(records::list(ctx, customer.customer_id.as_deref())),
        Command::Save {
            customer,
            id,
            label,
            values,
        } => {
            let draft = RecordDraft { id, label, values };
            block_on(records::save(ctx, customer.customer_id.as_deref(), draft))
        }
        Command::Delete { customer, id } => {
            block_on(records::delete(ctx, customer.customer_id.as_deref(), &id))
        }
        Command::Selected { customer } => {
            block_on(records::selected(ctx, customer.customer_id.as_deref()))
        }
        Command::Select { customer, id } => {
            block_on(records::select(ctx, customer.customer_id.as_deref(), &id))
        }
        Command::Auth {
            token,
            status,
            logout,
        } => auth::auth(ctx, token.as_deref(), status, logout),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Run an async command on a fresh multi-threaded runtime.
fn block_on<F>(future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(future)
}

/// Load configuration, resolve shop and credential, and build the repository.
pub(crate) fn open_repository(ctx: &Context) -> Result<MeasurementRepository> {
    let config = Config::load().context("Failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        debug!(path = %path.display(), "loaded configuration");
    }

    let shop = resolve_shop(&config, ctx.shop.as_deref())
        .ok_or(RepositoryError::MissingParameter("shop"))?;

    let store = secrets::create_store(config.secrets_provider())
        .context("Failed to initialize secret store")?;
    let (token, source) =
        secrets::resolve_admin_token(store.as_ref()).context("Failed to read admin token")?;
    debug!(%shop, token_source = %source, layout = %config.layout(), "opening repository");

    let client = create_client(&config, &shop, token)?;
    Ok(MeasurementRepository::new(
        client,
        RepositoryOptions::from_config(&config),
    ))
}
