use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] tally_ledger::LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node tasks did not stop within the shutdown grace period")]
    ShutdownTimeout,
}
