use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Payload decode error: {0}")]
    PayloadDecodeError(String),

    #[error("Store write error: {0}")]
    StoreWriteError(anyhow::Error),

    #[error("Store read error: {0}")]
    StoreReadError(anyhow::Error),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Invalid broker configuration: {0}")]
    InvalidBrokerConfig(String),

    #[error("Invalid processor configuration: {0}")]
    InvalidProcessorConfig(String),
}
