//! Receipt object storage.

pub mod error;
pub mod service;

pub use error::ReceiptError;
pub use service::{ReceiptStore, sanitize_filename};
