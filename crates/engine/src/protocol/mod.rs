//! Client/server wire protocol: closed message enums and the framing codec.

pub mod codec;
pub mod messages;

pub use codec::{decode, encode, read_message, write_message, ProtocolError, MAX_FRAME};
pub use messages::{
    ActionKind, ChunkPayload, ClientMessage, PlayerState, RequestBody, ResponseBody, ServerMessage,
    PROTOCOL_VERSION,
};
