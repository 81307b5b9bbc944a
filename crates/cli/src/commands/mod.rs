//! Subcommand implementations.
//!
//! Every command writes its result to `out` as pretty-printed JSON so the
//! output can be piped into `jq`.

pub mod lifecycle;
pub mod orders;

use std::io::Write;
use std::path::PathBuf;

use orderdesk_client::OrderError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// The order API call failed or was refused locally.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Draft file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    ReadDraft {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Draft file is not a valid order draft.
    #[error("Invalid order draft in {}: {source}", .path.display())]
    ParseDraft {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Result could not be written.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// Result could not be encoded.
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
