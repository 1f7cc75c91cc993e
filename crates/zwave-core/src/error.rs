//! Error taxonomy shared by the serial, cc and driver crates.
//!
//! Grounded on the teacher's `zwave-serial::error`/`zwave-driver::error`
//! split (both use `thiserror`), expanded to name every kind spec.md §7
//! enumerates rather than the teacher's narrower serial-only set.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("byte received out of frame")]
    OutOfFrame,
    #[error("timed out waiting for the length byte")]
    ReadAbortTimeout,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport write returned 0 bytes")]
    WriteShort,
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AckError {
    #[error("controller responded with NAK")]
    NakReceived,
    #[error("controller responded with CAN")]
    CanReceived,
    #[error("timed out waiting for ACK")]
    AckTimeout,
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("timed out waiting for a reply")]
    TimeoutNoReply,
    #[error("exceeded the maximum number of send attempts")]
    MaxAttemptsExceeded,
}

#[derive(Debug, Error)]
pub enum SendDataError {
    #[error("no route to node")]
    NoRoute,
    #[error("no acknowledgement from node")]
    NoAck,
    #[error("network busy")]
    NetworkBusy,
    #[error("network not idle")]
    NetworkNotIdle,
    #[error("transmission could not be verified")]
    TransmitVerified,
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node failed after repeated transmission errors")]
    NodeFailed,
    #[error("node reported a local reset")]
    NodeReset,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("this controller is not the primary controller")]
    NotPrimary,
    #[error("this controller is not a secondary controller")]
    NotSecondary,
    #[error("this controller is not the SUC")]
    NotSUC,
    #[error("this controller does not support bridge functions")]
    NotBridge,
    #[error("controller is busy with another command")]
    Busy,
    #[error("controller function is disabled")]
    Disabled,
    #[error("controller queue overflow")]
    Overflow,
    #[error("button not found")]
    ButtonNotFound,
    #[error("node not found")]
    NodeNotFound,
}

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("failed to generate a nonce")]
    NonceGenerationFailed,
    #[error("failed to decrypt or authenticate an encrypted frame")]
    DecryptionFailed,
    #[error("failed to set up the security keys")]
    KeySetupFailed,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("resource not found")]
    NotFound,
    #[error("DNS lookup failed: {0}")]
    DomainError(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("acknowledgement error: {0}")]
    Ack(#[from] AckError),
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("send data error: {0}")]
    SendData(#[from] SendDataError),
    #[error("node error: {0}")]
    Node(#[from] NodeError),
    #[error("controller error: {0}")]
    Controller(#[from] ControllerError),
    #[error("security error: {0}")]
    Security(#[from] SecurityError),
    #[error("device database error: {0}")]
    Db(#[from] DbError),
    #[error("the controller reported an unsupported library type")]
    UnsupportedController,
    #[error("cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
