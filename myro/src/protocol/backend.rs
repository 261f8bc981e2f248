//! MySQL Server Packets
//!
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_response_packets.html>
use bytes::{Buf, Bytes};
use std::fmt;

use super::{ColumnType, ProtocolError, envelope::MAX_PAYLOAD_SIZE};
use crate::ext::BytesExt;

/// `OK` packet header.
pub const OK_HEADER: u8 = 0x00;
/// `EOF` packet header, also `OK` packet header when it terminates a result set.
pub const EOF_HEADER: u8 = 0xFE;
/// `ERR` packet header.
pub const ERR_HEADER: u8 = 0xFF;
/// `LOCAL INFILE` request header.
pub const LOCAL_INFILE_HEADER: u8 = 0xFB;

/// A type that can be decoded from a server packet.
pub trait BackendProtocol: Sized {
    fn decode(packet: Bytes) -> Result<Self, ProtocolError>;
}

macro_rules! malformed {
    ($name:literal, $expr:expr) => {
        match $expr {
            Some(ok) => ok,
            None => return Err(ProtocolError::malformed($name)),
        }
    };
}

/// Try a `Buf::try_get_*` operation, malformed packet on failure.
macro_rules! get {
    ($name:literal, $buf:ident.$method:ident()) => {
        malformed!($name, $buf.$method().ok())
    };
}

/// Negotiated capabilities relevant to command phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities(u32);

impl Capabilities {
    /// `CLIENT_DEPRECATE_EOF`, result sets are terminated by `OK` instead of `EOF`.
    pub const DEPRECATE_EOF: u32 = 1 << 24;

    pub const fn new(flags: u32) -> Capabilities {
        Self(flags)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub const fn deprecate_eof(&self) -> bool {
        self.contains(Self::DEPRECATE_EOF)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self(Self::DEPRECATE_EOF)
    }
}

/// Server status flags.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStatus(u16);

impl ServerStatus {
    pub const IN_TRANS: u16 = 0x0001;
    pub const AUTOCOMMIT: u16 = 0x0002;
    pub const MORE_RESULTS_EXISTS: u16 = 0x0008;

    pub const fn new(flags: u16) -> ServerStatus {
        Self(flags)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn in_transaction(&self) -> bool {
        self.0 & Self::IN_TRANS != 0
    }

    pub const fn autocommit(&self) -> bool {
        self.0 & Self::AUTOCOMMIT != 0
    }

    pub const fn more_results(&self) -> bool {
        self.0 & Self::MORE_RESULTS_EXISTS != 0
    }
}

impl fmt::Debug for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerStatus")
            .field("in_transaction", &self.in_transaction())
            .field("autocommit", &self.autocommit())
            .field("more_results", &self.more_results())
            .finish()
    }
}

/// Returns `true` if `packet` terminates a row stream.
pub fn is_result_end(packet: &[u8], capabilities: Capabilities) -> bool {
    match packet.first() {
        Some(&EOF_HEADER) if capabilities.deprecate_eof() => packet.len() < MAX_PAYLOAD_SIZE,
        Some(&EOF_HEADER) => packet.len() < 9,
        _ => false,
    }
}

/// Signals successful completion of a command.
#[derive(Debug)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: ServerStatus,
    pub warnings: u16,
    pub info: String,
}

impl BackendProtocol for OkPacket {
    fn decode(mut packet: Bytes) -> Result<Self, ProtocolError> {
        match get!("OK", packet.try_get_u8()) {
            OK_HEADER | EOF_HEADER => {}
            found => return Err(ProtocolError::unexpected(found, "OK")),
        }
        let affected_rows = malformed!("OK", packet.try_get_lenenc_int());
        let last_insert_id = malformed!("OK", packet.try_get_lenenc_int());
        let status = ServerStatus(get!("OK", packet.try_get_u16_le()));
        let warnings = get!("OK", packet.try_get_u16_le());
        let info = String::from_utf8_lossy(&packet).into_owned();
        Ok(Self { affected_rows, last_insert_id, status, warnings, info })
    }
}

/// Legacy result set terminator.
#[derive(Debug)]
pub struct EofPacket {
    pub warnings: u16,
    pub status: ServerStatus,
}

impl BackendProtocol for EofPacket {
    fn decode(mut packet: Bytes) -> Result<Self, ProtocolError> {
        match get!("EOF", packet.try_get_u8()) {
            EOF_HEADER => {}
            found => return Err(ProtocolError::unexpected(found, "EOF")),
        }
        let warnings = get!("EOF", packet.try_get_u16_le());
        let status = ServerStatus(get!("EOF", packet.try_get_u16_le()));
        Ok(Self { warnings, status })
    }
}

/// Error returned by the server.
pub struct ServerError {
    code: u16,
    sql_state: String,
    message: String,
}

impl ServerError {
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Five characters SQL state, empty when server did not send one.
    pub fn sql_state(&self) -> &str {
        &self.sql_state
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl BackendProtocol for ServerError {
    fn decode(mut packet: Bytes) -> Result<Self, ProtocolError> {
        match get!("ERR", packet.try_get_u8()) {
            ERR_HEADER => {}
            found => return Err(ProtocolError::unexpected(found, "ERR")),
        }
        let code = get!("ERR", packet.try_get_u16_le());
        let sql_state = match packet.first() {
            Some(b'#') => {
                packet.advance(1);
                let state = malformed!("ERR", packet.try_split_to(5));
                String::from_utf8_lossy(&state).into_owned()
            }
            _ => String::new(),
        };
        let message = String::from_utf8_lossy(&packet).into_owned();
        Ok(Self { code, sql_state, message })
    }
}

impl std::error::Error for ServerError { }

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR {}", self.code)?;
        if !self.sql_state.is_empty() {
            write!(f, " ({})", self.sql_state)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl fmt::Debug for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Column definition flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnFlags(u16);

impl ColumnFlags {
    pub const NOT_NULL: u16 = 1;
    pub const UNSIGNED: u16 = 32;
    pub const BINARY: u16 = 128;

    pub const fn new(flags: u16) -> ColumnFlags {
        Self(flags)
    }

    pub const fn is_not_null(&self) -> bool {
        self.0 & Self::NOT_NULL != 0
    }

    pub const fn is_unsigned(&self) -> bool {
        self.0 & Self::UNSIGNED != 0
    }

    pub const fn is_binary(&self) -> bool {
        self.0 & Self::BINARY != 0
    }
}

/// Character set number of `binary`.
pub const BINARY_CHARSET: u16 = 63;

/// Column definition of a result set or prepared statement parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub charset: u16,
    pub length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnMetadata {
    /// Create metadata with only name and type, mainly for testing.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> ColumnMetadata {
        Self {
            schema: String::new(),
            table: String::new(),
            name: name.into(),
            charset: 0,
            length: 0,
            column_type,
            flags: ColumnFlags::default(),
            decimals: 0,
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = ColumnFlags::new(flags);
        self
    }

    pub fn with_charset(mut self, charset: u16) -> Self {
        self.charset = charset;
        self
    }

    /// Column holds raw bytes rather than text.
    pub fn is_binary(&self) -> bool {
        self.charset == BINARY_CHARSET
    }
}

impl BackendProtocol for ColumnMetadata {
    fn decode(mut packet: Bytes) -> Result<Self, ProtocolError> {
        let mut string = || {
            let bytes = malformed!("ColumnDefinition", packet.try_get_lenenc_bytes());
            Ok::<_, ProtocolError>(String::from_utf8_lossy(&bytes).into_owned())
        };

        let _catalog = string()?;
        let schema = string()?;
        let table = string()?;
        let _org_table = string()?;
        let name = string()?;
        let _org_name = string()?;

        // length of fixed length fields, always 0x0c
        let _ = malformed!("ColumnDefinition", packet.try_get_lenenc_int());
        let charset = get!("ColumnDefinition", packet.try_get_u16_le());
        let length = get!("ColumnDefinition", packet.try_get_u32_le());
        let tag = get!("ColumnDefinition", packet.try_get_u8());
        let column_type = malformed!("ColumnDefinition", ColumnType::from_u8(tag));
        let flags = ColumnFlags(get!("ColumnDefinition", packet.try_get_u16_le()));
        let decimals = get!("ColumnDefinition", packet.try_get_u8());

        Ok(Self { schema, table, name, charset, length, column_type, flags, decimals })
    }
}

/// First packet of result set.
#[derive(Debug)]
pub struct ColumnCount(pub u64);

impl BackendProtocol for ColumnCount {
    fn decode(mut packet: Bytes) -> Result<Self, ProtocolError> {
        match packet.first() {
            Some(&LOCAL_INFILE_HEADER) => {
                Err(ProtocolError::unexpected(LOCAL_INFILE_HEADER, "ColumnCount"))
            }
            _ => Ok(Self(malformed!("ColumnCount", packet.try_get_lenenc_int()))),
        }
    }
}

/// Response of `COM_STMT_PREPARE`.
#[derive(Debug)]
pub struct PrepareOk {
    pub statement_id: u32,
    pub columns: u16,
    pub params: u16,
    pub warnings: u16,
}

impl BackendProtocol for PrepareOk {
    fn decode(mut packet: Bytes) -> Result<Self, ProtocolError> {
        match get!("PrepareOk", packet.try_get_u8()) {
            OK_HEADER => {}
            found => return Err(ProtocolError::unexpected(found, "PrepareOk")),
        }
        let statement_id = get!("PrepareOk", packet.try_get_u32_le());
        let columns = get!("PrepareOk", packet.try_get_u16_le());
        let params = get!("PrepareOk", packet.try_get_u16_le());
        // reserved filler
        let _ = get!("PrepareOk", packet.try_get_u8());
        // warning count may be absent
        let warnings = packet.try_get_u16_le().unwrap_or(0);
        Ok(Self { statement_id, columns, params, warnings })
    }
}

/// Split a text protocol row into column values, `None` is `NULL`.
pub fn decode_text_row(mut packet: Bytes, columns: usize) -> Result<Vec<Option<Bytes>>, ProtocolError> {
    let mut values = Vec::with_capacity(columns);
    for _ in 0..columns {
        if packet.first() == Some(&LOCAL_INFILE_HEADER) {
            packet.advance(1);
            values.push(None);
        } else {
            values.push(Some(malformed!("TextRow", packet.try_get_lenenc_bytes())));
        }
    }
    Ok(values)
}

/// Split a binary protocol row into column values, `None` is `NULL`.
///
/// Temporal values keep their length byte.
pub fn decode_binary_row(
    mut packet: Bytes,
    columns: &[ColumnMetadata],
) -> Result<Vec<Option<Bytes>>, ProtocolError> {
    // null bitmap offset of binary row
    const OFFSET: usize = 2;

    match get!("BinaryRow", packet.try_get_u8()) {
        OK_HEADER => {}
        found => return Err(ProtocolError::unexpected(found, "BinaryRow")),
    }

    let bitmap = malformed!("BinaryRow", packet.try_split_to((columns.len() + 7 + OFFSET) / 8));
    let mut values = Vec::with_capacity(columns.len());

    for (i, column) in columns.iter().enumerate() {
        let bit = i + OFFSET;
        if bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
            values.push(None);
            continue;
        }

        let value = match column.column_type {
            ColumnType::Null => Bytes::new(),
            ColumnType::Date
            | ColumnType::Time
            | ColumnType::DateTime
            | ColumnType::Timestamp => {
                let len = usize::from(*malformed!("BinaryRow", packet.first()));
                malformed!("BinaryRow", packet.try_split_to(1 + len))
            }
            ty => match ty.binary_width() {
                Some(width) => malformed!("BinaryRow", packet.try_split_to(width)),
                None => malformed!("BinaryRow", packet.try_get_lenenc_bytes()),
            },
        };
        values.push(Some(value));
    }

    Ok(values)
}
