//! Command implementations.
//!
//! Every command writes one JSON document to stdout.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod wishlist;

use std::io::{self, Write};

use serde::Serialize;
use shopfront_storefront::backend::BackendError;
use shopfront_storefront::cart::CartError;
use shopfront_storefront::checkout::ValidationError;
use shopfront_storefront::config::ConfigError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Write `value` to stdout as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
