use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Player not mounted")]
    NotMounted,

    #[error("Player call timed out: {0}")]
    Timeout(String),
}

impl BridgeError {
    /// Returns `true` when retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::OperationFailed(_) | BridgeError::NotMounted | BridgeError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
