//! Receipt store over an OpenDAL filesystem operator.
//!
//! Receipts are opaque to the rest of the system: the expense row only
//! keeps the URL this store hands back. Deletion exists solely as the
//! compensating action when the enclosing submission fails.

use opendal::{Operator, services};
use uuid::Uuid;

use super::error::ReceiptError;

/// Default receipt size limit: 5 MiB.
pub const DEFAULT_MAX_RECEIPT_BYTES: u64 = 5 * 1024 * 1024;

/// Store for receipt files, rooted at the configured upload directory.
#[derive(Clone)]
pub struct ReceiptStore {
    operator: Operator,
    max_file_size: u64,
}

impl ReceiptStore {
    /// Creates a store rooted at `root` with the given size limit.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::Configuration` if the operator cannot be
    /// built.
    pub fn new(root: &str, max_file_size: u64) -> Result<Self, ReceiptError> {
        let builder = services::Fs::default().root(root);
        let operator = Operator::new(builder)
            .map_err(|e| ReceiptError::Configuration(e.to_string()))?
            .finish();

        Ok(Self {
            operator,
            max_file_size,
        })
    }

    /// Validates size and media type against the receipt policy:
    /// `image/*` and `application/pdf`, up to the configured limit.
    ///
    /// # Errors
    ///
    /// Returns `FileTooLarge` or `UnsupportedMediaType`.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), ReceiptError> {
        if size > self.max_file_size {
            return Err(ReceiptError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        if !is_accepted_media_type(content_type) {
            return Err(ReceiptError::UnsupportedMediaType(content_type.to_string()));
        }

        Ok(())
    }

    /// Builds the storage key for a receipt.
    ///
    /// Format: `{company_id}/{expense_id}/{sanitized_filename}`
    #[must_use]
    pub fn object_key(company_id: Uuid, expense_id: Uuid, filename: &str) -> String {
        format!(
            "{company_id}/{expense_id}/{}",
            sanitize_filename(filename)
        )
    }

    /// Writes receipt bytes and returns the opaque URL to persist.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::Io` if the write fails.
    pub async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<String, ReceiptError> {
        self.operator
            .write(key, bytes)
            .await
            .map_err(|e| ReceiptError::Io(e.to_string()))?;

        Ok(format!("/receipts/{key}"))
    }

    /// Removes a stored receipt. Missing objects are not an error so the
    /// compensator can run after partial failures.
    ///
    /// # Errors
    ///
    /// Returns `ReceiptError::Io` if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), ReceiptError> {
        self.operator
            .delete(key)
            .await
            .map_err(|e| ReceiptError::Io(e.to_string()))
    }

    /// Extracts the storage key back out of a persisted receipt URL.
    #[must_use]
    pub fn key_from_url(url: &str) -> Option<&str> {
        url.strip_prefix("/receipts/")
    }
}

fn is_accepted_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/") || essence == "application/pdf"
}

/// Replaces path separators and control characters in a filename.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "receipt".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ReceiptStore {
        let dir = std::env::temp_dir().join(format!("claimflow-receipts-{}", Uuid::new_v4()));
        ReceiptStore::new(dir.to_str().unwrap(), DEFAULT_MAX_RECEIPT_BYTES).unwrap()
    }

    #[test]
    fn test_validate_accepts_images_and_pdf() {
        let store = store();
        assert!(store.validate("image/png", 1024).is_ok());
        assert!(store.validate("image/jpeg", 1024).is_ok());
        assert!(store.validate("application/pdf", 1024).is_ok());
        assert!(store.validate("application/pdf; charset=binary", 1024).is_ok());
    }

    #[test]
    fn test_validate_rejects_other_types() {
        let store = store();
        assert!(matches!(
            store.validate("text/html", 1024),
            Err(ReceiptError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            store.validate("application/zip", 1024),
            Err(ReceiptError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let store = store();
        let err = store
            .validate("image/png", DEFAULT_MAX_RECEIPT_BYTES + 1)
            .unwrap_err();
        assert!(matches!(err, ReceiptError::FileTooLarge { .. }));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("taxi receipt.pdf"), "taxi_receipt.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename(""), "receipt");
    }

    #[test]
    fn test_key_round_trip() {
        let company = Uuid::new_v4();
        let expense = Uuid::new_v4();
        let key = ReceiptStore::object_key(company, expense, "scan.png");
        assert_eq!(key, format!("{company}/{expense}/scan.png"));

        let url = format!("/receipts/{key}");
        assert_eq!(ReceiptStore::key_from_url(&url), Some(key.as_str()));
        assert_eq!(ReceiptStore::key_from_url("https://elsewhere"), None);
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let store = store();
        let key = ReceiptStore::object_key(Uuid::new_v4(), Uuid::new_v4(), "r.pdf");

        let url = store.save(&key, b"%PDF-1.4".to_vec()).await.unwrap();
        assert!(url.ends_with("r.pdf"));

        store.delete(&key).await.unwrap();
    }
}
