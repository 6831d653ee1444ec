pub mod heartbeat;
pub mod message;

pub use heartbeat::Heartbeat;
pub use message::{Message, MessageStatus, MessageType, Transition, UNKNOWN_ERROR};
