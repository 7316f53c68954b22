//! ui::prompts
//!
//! Interactive prompts.

use std::io::{self, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input required but not in interactive mode")]
    NotInteractive,

    #[error("no input given")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Prompt for a value without echoing it.
///
/// Leading and trailing whitespace is stripped; blank input is an error.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }

    eprint!("{}: ", message);
    io::stderr().flush()?;

    let value = rpassword::read_password()?;
    let value = value.trim();
    if value.is_empty() {
        return Err(PromptError::Empty);
    }
    Ok(value.to_string())
}
