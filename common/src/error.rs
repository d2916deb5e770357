use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored settings record truncated ({len} of {expected} bytes)")]
    Truncated { len: usize, expected: usize },
    #[error("stored settings record of {len} bytes exceeds the {budget} byte budget")]
    OverBudget { len: usize, budget: usize },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },
    #[error("malformed command payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
