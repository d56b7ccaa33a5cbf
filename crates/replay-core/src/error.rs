use thiserror::Error;

use crate::domain::RecordId;

/// Which backend call a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status={status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode rows: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Fatal error of the replay loop. Nothing here is retried.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("{op} on table={table} failed: {source}")]
    Store {
        op: Operation,
        table: String,
        #[source]
        source: StoreError,
    },

    /// Insert into live succeeded but the staging delete did not.
    /// `pending_ids` now exist in both tables.
    #[error("partial move: {} rows inserted into {live} but not deleted from {staging}: {source}", pending_ids.len())]
    PartialMove {
        staging: String,
        live: String,
        pending_ids: Vec<RecordId>,
        #[source]
        source: StoreError,
    },
}

impl ReplayError {
    pub fn store(op: Operation, table: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            op,
            table: table.into(),
            source,
        }
    }

    /// The backend call that failed.
    pub fn operation(&self) -> Operation {
        match self {
            ReplayError::Store { op, .. } => *op,
            ReplayError::PartialMove { .. } => Operation::Delete,
        }
    }
}
