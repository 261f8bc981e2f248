//! MySQL client/server protocol.
//!
//! Every packet is carried in one or more envelopes:
//!
//! ```text
//! +-----------------+----------+-------------------+
//! | length (3, LE)  | sequence | payload (length)  |
//! +-----------------+----------+-------------------+
//! ```
//!
//! Sequence number starts at 0 for every command and wraps at 256.
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_packets.html>
mod column_type;
mod error;

pub mod envelope;
pub mod frontend;
pub mod backend;

pub use column_type::ColumnType;
pub use error::ProtocolError;
pub use envelope::{Envelope, EnvelopeDecoder, EnvelopeEncoder, Envelopes, envelopes};
pub use frontend::FrontendProtocol;
pub use backend::{
    BackendProtocol, Capabilities, ColumnFlags, ColumnMetadata, OkPacket, ServerError,
    ServerStatus,
};
