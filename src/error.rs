use thiserror::Error;

/// Errors surfaced by the data-access layer.
///
/// Only the missing-table case is ever recovered internally (project
/// creation provisions the table and retries once); everything else
/// propagates to the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// A statement ran against a table that has not been provisioned yet.
    #[error("table {0} does not exist")]
    MissingTable(String),

    /// The gateway rejected a request for any other reason.
    #[error("gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    /// The write transaction was mined but reverted on the ledger.
    #[error("transaction {hash} reverted: {message}")]
    Txn { hash: String, message: String },

    /// A statement template could not be rendered against its bound values.
    #[error("statement error: {0}")]
    Statement(String),

    /// A skill entry contains the comma delimiter and would corrupt the
    /// encoded column on the way back out.
    #[error("skill {0:?} contains the ',' delimiter")]
    SkillDelimiter(String),

    #[error("unknown project status {0:?}")]
    Status(String),

    #[error("milestone index {index} out of range for {len} milestones")]
    MilestoneIndex { index: usize, len: usize },

    /// A guarded milestone write lost a concurrent update race. The caller
    /// owns the retry of the whole read-modify-write cycle.
    #[error("milestone update lost to a concurrent write, retry the update")]
    UpdateConflict,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
