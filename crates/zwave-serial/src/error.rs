#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Serialport(#[from] serialport::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
