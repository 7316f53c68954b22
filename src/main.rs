use std::process::ExitCode;

use measurekeep::repository::RepositoryError;
use measurekeep::{cli, ui::output};

fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            exit_code(&e)
        }
    }
}

/// Bad input exits 2, like clap's usage errors; anything else exits 1.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<RepositoryError>() {
        Some(e) if e.is_client_error() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
