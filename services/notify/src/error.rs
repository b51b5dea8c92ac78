/// Notify service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum NotifyServiceError {
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("invalid source schema name: {0}")]
    InvalidSchemaName(String),
    #[error("mail delivery failed: {0}")]
    Delivery(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl NotifyServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRecipient(_) => "INVALID_RECIPIENT",
            Self::InvalidSchemaName(_) => "INVALID_SCHEMA_NAME",
            Self::Delivery(_) => "DELIVERY",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
