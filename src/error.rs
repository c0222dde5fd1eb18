use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Ingestion ─────────────────────────────────────────────────────────────
    /// A row of the uploaded file failed required-field or integer-parse
    /// checks. Aborts ingestion for the whole file; nothing starts.
    #[error("Malformed record at row {row}: {message}")]
    MalformedRecord { row: u64, message: String },

    // ── Catalog ───────────────────────────────────────────────────────────────
    /// The remote catalog could not be resolved. Aborts the run before any
    /// submission is attempted.
    #[error("Catalog fetch failed: {message}")]
    CatalogFetchFailed { message: String },

    // ── Order submission ──────────────────────────────────────────────────────
    /// The remote API rejected one order submission. Local to that
    /// submission; siblings in the same window continue independently.
    #[error("Order submission failed with status {status}: {body}")]
    OrderSubmissionFailed { status: u16, body: String },

    // ── Run lifecycle ─────────────────────────────────────────────────────────
    /// A run is already active for this account. Stop it before starting
    /// another.
    #[error("A run is already active for account {account}")]
    RunAlreadyActive { account: String },

    #[error("Unknown account: {account}")]
    UnknownAccount { account: String },

    // ── Network ───────────────────────────────────────────────────────────────
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_row_number() {
        let err = AppError::MalformedRecord {
            row: 7,
            message: "missing Phone".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("row 7"));
        assert!(msg.contains("missing Phone"));
    }

    #[test]
    fn display_names_the_account_for_duplicate_runs() {
        let err = AppError::RunAlreadyActive {
            account: "acme".into(),
        };
        assert!(err.to_string().contains("acme"));
    }
}
