//! MySQL Command Messages
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_command_phase.html>
use bytes::{BufMut, BytesMut};

use crate::codec::Parameter;

/// Write a command message to `buf`.
///
/// Written bytes is the logical packet, envelope framing is done by the transport.
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut BytesMut) {
    // command byte
    const PREFIX: usize = 1;

    let size_hint = msg.size_hint();
    buf.reserve(PREFIX + size_hint);

    let offset = buf.len();
    buf.put_u8(F::COMMAND);

    msg.encode(&mut *buf);

    assert_eq!(
        buf.len() - offset,
        PREFIX + size_hint,
        "Command message body size not equal to size hint"
    );
}

/// A type which can be encoded into mysql command message.
pub trait FrontendProtocol {
    /// Command byte.
    const COMMAND: u8;

    /// Size of the body, excluding the command byte.
    fn size_hint(&self) -> usize;

    /// Write the body of the message.
    ///
    /// The length of body written must be equal to the
    /// length returned by [`size_hint`][FrontendProtocol::size_hint].
    fn encode(self, buf: impl BufMut);
}

/// Tells the server that the client wants it to close the connection.
pub struct Quit;

impl FrontendProtocol for Quit {
    const COMMAND: u8 = 0x01;

    fn size_hint(&self) -> usize { 0 }

    fn encode(self, _: impl BufMut) { }
}

/// Send the server a text-based query that is executed immediately.
pub struct Query<'a> {
    /// The query string, no terminator.
    pub sql: &'a str,
}

impl FrontendProtocol for Query<'_> {
    const COMMAND: u8 = 0x03;

    fn size_hint(&self) -> usize {
        self.sql.len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_slice(self.sql.as_bytes());
    }
}

/// Check if the server is alive.
pub struct Ping;

impl FrontendProtocol for Ping {
    const COMMAND: u8 = 0x0E;

    fn size_hint(&self) -> usize { 0 }

    fn encode(self, _: impl BufMut) { }
}

/// Creates a prepared statement for the passed query string.
pub struct StmtPrepare<'a> {
    pub sql: &'a str,
}

impl FrontendProtocol for StmtPrepare<'_> {
    const COMMAND: u8 = 0x16;

    fn size_hint(&self) -> usize {
        self.sql.len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_slice(self.sql.as_bytes());
    }
}

/// Asks the server to execute a prepared statement.
pub struct StmtExecute<'a> {
    pub statement_id: u32,
    /// Must be exactly the number of parameters of the statement.
    pub params: &'a [Parameter],
}

impl StmtExecute<'_> {
    /// `CURSOR_TYPE_NO_CURSOR`
    const FLAGS: u8 = 0;
    /// Always 1.
    const ITERATION_COUNT: u32 = 1;
    /// Parameter types follow.
    const NEW_PARAMS_BOUND: u8 = 1;
    const UNSIGNED_FLAG: u8 = 0x80;

    fn null_bitmap_len(&self) -> usize {
        self.params.len().div_ceil(8)
    }
}

impl FrontendProtocol for StmtExecute<'_> {
    const COMMAND: u8 = 0x17;

    fn size_hint(&self) -> usize {
        let head = 4 + 1 + 4;
        if self.params.is_empty() {
            return head;
        }
        head
            + self.null_bitmap_len()
            + 1
            + self.params.len() * 2
            + self.params.iter().map(Parameter::binary_len).sum::<usize>()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32_le(self.statement_id);
        buf.put_u8(Self::FLAGS);
        buf.put_u32_le(Self::ITERATION_COUNT);

        if self.params.is_empty() {
            return;
        }

        let mut bitmap = vec![0u8; self.null_bitmap_len()];
        for (i, param) in self.params.iter().enumerate() {
            if param.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        buf.put_slice(&bitmap);

        buf.put_u8(Self::NEW_PARAMS_BOUND);
        for param in self.params {
            buf.put_u8(param.column_type() as u8);
            buf.put_u8(if param.is_unsigned() { Self::UNSIGNED_FLAG } else { 0 });
        }

        for param in self.params {
            param.write_binary(&mut buf);
        }
    }
}

/// Deallocates a prepared statement, no response is sent back.
pub struct StmtClose {
    pub statement_id: u32,
}

impl FrontendProtocol for StmtClose {
    const COMMAND: u8 = 0x19;

    fn size_hint(&self) -> usize { 4 }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32_le(self.statement_id);
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::*;
    use crate::{Value, codec::Codecs};

    #[test]
    fn query() {
        let mut buf = BytesMut::new();
        write(Query { sql: "SELECT 1" }, &mut buf);
        assert_eq!(&buf[..], b"\x03SELECT 1");
    }

    #[test]
    fn stmt_execute() {
        let codecs = Codecs::default();
        let params = [
            codecs.encode(Value::I8(5)).unwrap(),
            codecs.encode(Value::Null).unwrap(),
            codecs.encode(Value::U16(0x0102)).unwrap(),
        ];

        let mut buf = BytesMut::new();
        write(StmtExecute { statement_id: 7, params: &params }, &mut buf);

        assert_eq!(
            &buf[..],
            &[
                0x17, 7, 0, 0, 0, 0, 1, 0, 0, 0,
                // null bitmap
                0b010,
                // new params bound
                1,
                // types
                1, 0, 6, 0, 2, 0x80,
                // values
                5, 2, 1,
            ]
        );
    }

    #[test]
    fn stmt_execute_no_params() {
        let mut buf = BytesMut::new();
        write(StmtExecute { statement_id: 1, params: &[] }, &mut buf);
        assert_eq!(buf.len(), 10);
    }
}
