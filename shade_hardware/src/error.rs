use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,
    #[error("transport timeout after {0} ms")]
    Timeout(u64),
    #[error("device rejected dp {dp}")]
    Rejected { dp: u8 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
