//! Wire framing and message encode/decode for the distributed
//! coordinator/helper/client protocol (§5).

pub mod command;
pub mod framing;
pub mod message;
pub mod timeouts;

pub use command::CommandId;
pub use framing::{MAGIC, MAX_PAYLOAD_BYTES, encode_frame, try_decode_frame};

pub mod prelude {
    pub use super::command::CommandId;
    pub use super::framing::{MAGIC, MAX_PAYLOAD_BYTES, encode_frame, try_decode_frame};
    pub use super::message::*;
    pub use super::timeouts;
}
