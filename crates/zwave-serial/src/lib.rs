pub mod command;
pub mod error;
pub mod frame;
pub mod function_type;
pub mod transport;

pub mod prelude {
    pub use crate::command::{Message, TransmitOptions};
    pub use crate::error::{Error, Result};
    pub use crate::frame::{DataFrame, FrameType, ParseOutcome, RawFrame};
    pub use crate::function_type::FunctionType;
    pub use crate::transport::{Transport, WaitResult};
}
