use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("catalog error: {0}")]
    Catalog(#[from] sqlx::Error),

    #[error("search backend error: {0}")]
    Search(#[from] reqwest::Error),

    #[error("bulk submission rejected by {index}: {detail}")]
    BulkRejected { index: String, detail: String },

    #[error("unable to provision index {index}: status {status}")]
    Provision {
        index: String,
        status: reqwest::StatusCode,
    },

    #[error("state storage error: {0}")]
    State(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    StateFormat(#[from] serde_json::Error),

    #[error("data integrity error: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    /// Whether retrying the same operation can reasonably succeed.
    ///
    /// Connection-level failures and server-side 5xx responses are
    /// retried under the owning component's deadline; everything else
    /// (malformed data, rejected batches, local I/O) aborts the tick
    /// immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            EtlError::Catalog(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut
            ),
            EtlError::Search(err) => {
                err.is_connect()
                    || err.is_timeout()
                    || err
                        .status()
                        .is_some_and(|status| status.is_server_error())
            }
            // Provisioning keeps knocking until its startup deadline;
            // the backend may simply not be up yet.
            EtlError::Provision { .. } => true,
            _ => false,
        }
    }
}
