use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    ext::{BufMutExt, lenenc_int_len},
    protocol::ColumnType,
};

/// Encoded, type tagged statement parameter.
///
/// Created by [`Codecs::encode`][super::Codecs::encode], it knows its wire type and can
/// serialize itself in binary protocol or as SQL literal in text protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    column_type: ColumnType,
    unsigned: bool,
    value: ParamValue,
}

/// Floats are stored as bits so parameter can be hashed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ParamValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(u32),
    Double(u64),
    Text(String),
    Bytes(Bytes),
    #[cfg(feature = "time")]
    Date(time::Date),
    #[cfg(feature = "time")]
    Time(time::Time),
    #[cfg(feature = "time")]
    DateTime(time::PrimitiveDateTime),
}

impl Parameter {
    pub(crate) fn null() -> Parameter {
        Self::new(ColumnType::Null, false, ParamValue::Null)
    }

    /// Signed integer, `column_type` decide the binary width.
    pub(crate) fn int(column_type: ColumnType, value: i64) -> Parameter {
        Self::new(column_type, false, ParamValue::Int(value))
    }

    /// Unsigned integer, `column_type` decide the binary width.
    pub(crate) fn uint(column_type: ColumnType, value: u64) -> Parameter {
        Self::new(column_type, true, ParamValue::UInt(value))
    }

    pub(crate) fn float(value: f32) -> Parameter {
        Self::new(ColumnType::Float, false, ParamValue::Float(value.to_bits()))
    }

    pub(crate) fn double(value: f64) -> Parameter {
        Self::new(ColumnType::Double, false, ParamValue::Double(value.to_bits()))
    }

    pub(crate) fn text(value: String) -> Parameter {
        Self::new(ColumnType::VarString, false, ParamValue::Text(value))
    }

    pub(crate) fn bytes(value: Bytes) -> Parameter {
        Self::new(ColumnType::Blob, false, ParamValue::Bytes(value))
    }

    #[cfg(feature = "time")]
    pub(crate) fn date(value: time::Date) -> Parameter {
        Self::new(ColumnType::Date, false, ParamValue::Date(value))
    }

    #[cfg(feature = "time")]
    pub(crate) fn time(value: time::Time) -> Parameter {
        Self::new(ColumnType::Time, false, ParamValue::Time(value))
    }

    #[cfg(feature = "time")]
    pub(crate) fn datetime(value: time::PrimitiveDateTime) -> Parameter {
        Self::new(ColumnType::DateTime, false, ParamValue::DateTime(value))
    }

    fn new(column_type: ColumnType, unsigned: bool, value: ParamValue) -> Parameter {
        Self { column_type, unsigned, value }
    }

    /// Wire type tag.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, ParamValue::Null)
    }

    /// Length of binary protocol representation.
    pub fn binary_len(&self) -> usize {
        match &self.value {
            ParamValue::Null => 0,
            ParamValue::Int(_) | ParamValue::UInt(_) => self.int_width(),
            ParamValue::Float(_) => 4,
            ParamValue::Double(_) => 8,
            ParamValue::Text(s) => lenenc_int_len(s.len() as u64) + s.len(),
            ParamValue::Bytes(b) => lenenc_int_len(b.len() as u64) + b.len(),
            #[cfg(feature = "time")]
            ParamValue::Date(_) => 1 + 4,
            #[cfg(feature = "time")]
            ParamValue::Time(t) => 1 + micro_len(t.microsecond(), 8),
            #[cfg(feature = "time")]
            ParamValue::DateTime(dt) => 1 + micro_len(dt.microsecond(), 7),
        }
    }

    fn int_width(&self) -> usize {
        self.column_type.binary_width().unwrap_or(8)
    }

    /// Write binary protocol representation.
    pub fn write_binary(&self, buf: &mut impl BufMut) {
        match &self.value {
            ParamValue::Null => {}
            &ParamValue::Int(v) => match self.int_width() {
                1 => buf.put_i8(v as i8),
                2 => buf.put_i16_le(v as i16),
                4 => buf.put_i32_le(v as i32),
                _ => buf.put_i64_le(v),
            },
            &ParamValue::UInt(v) => match self.int_width() {
                1 => buf.put_u8(v as u8),
                2 => buf.put_u16_le(v as u16),
                4 => buf.put_u32_le(v as u32),
                _ => buf.put_u64_le(v),
            },
            &ParamValue::Float(bits) => buf.put_u32_le(bits),
            &ParamValue::Double(bits) => buf.put_u64_le(bits),
            ParamValue::Text(s) => buf.put_lenenc_bytes(s.as_bytes()),
            ParamValue::Bytes(b) => buf.put_lenenc_bytes(b),
            #[cfg(feature = "time")]
            ParamValue::Date(date) => {
                buf.put_u8(4);
                put_date(buf, date);
            }
            #[cfg(feature = "time")]
            ParamValue::Time(t) => {
                let micro = t.microsecond();
                buf.put_u8(micro_len(micro, 8) as u8);
                // is_negative, days
                buf.put_u8(0);
                buf.put_u32_le(0);
                buf.put_u8(t.hour());
                buf.put_u8(t.minute());
                buf.put_u8(t.second());
                if micro != 0 {
                    buf.put_u32_le(micro);
                }
            }
            #[cfg(feature = "time")]
            ParamValue::DateTime(dt) => {
                let micro = dt.microsecond();
                buf.put_u8(micro_len(micro, 7) as u8);
                put_date(buf, &dt.date());
                buf.put_u8(dt.hour());
                buf.put_u8(dt.minute());
                buf.put_u8(dt.second());
                if micro != 0 {
                    buf.put_u32_le(micro);
                }
            }
        }
    }

    /// Binary protocol representation.
    pub fn binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.binary_len());
        self.write_binary(&mut buf);
        buf.freeze()
    }

    /// Write SQL literal for text protocol.
    pub fn write_text(&self, writer: &mut ParameterWriter) {
        match &self.value {
            ParamValue::Null => writer.write_null(),
            &ParamValue::Int(v) => writer.write_int(v),
            &ParamValue::UInt(v) => writer.write_uint(v),
            &ParamValue::Float(bits) => writer.write_raw(&f32::from_bits(bits).to_string()),
            &ParamValue::Double(bits) => writer.write_raw(&f64::from_bits(bits).to_string()),
            ParamValue::Text(s) => writer.write_str(s),
            ParamValue::Bytes(b) => writer.write_bytes(b),
            #[cfg(feature = "time")]
            ParamValue::Date(date) => {
                writer.write_raw(&format!("'{}'", super::time::format_date(date)))
            }
            #[cfg(feature = "time")]
            ParamValue::Time(t) => writer.write_raw(&format!("'{}'", super::time::format_time(t))),
            #[cfg(feature = "time")]
            ParamValue::DateTime(dt) => writer.write_raw(&format!(
                "'{} {}'",
                super::time::format_date(&dt.date()),
                super::time::format_time(&dt.time()),
            )),
        }
    }

    /// SQL literal for text protocol.
    pub fn text_literal(&self) -> String {
        let mut writer = ParameterWriter::new();
        self.write_text(&mut writer);
        writer.into_string()
    }
}

#[cfg(feature = "time")]
fn micro_len(micro: u32, len: usize) -> usize {
    match micro {
        0 => len,
        _ => len + 4,
    }
}

#[cfg(feature = "time")]
fn put_date(buf: &mut impl BufMut, date: &time::Date) {
    buf.put_u16_le(date.year() as u16);
    buf.put_u8(date.month().into());
    buf.put_u8(date.day());
}

/// SQL text sink for text protocol parameter.
///
/// Strings are quoted and escaped, bytes are written as hex literal.
#[derive(Debug, Default)]
pub struct ParameterWriter {
    sql: String,
}

impl ParameterWriter {
    pub fn new() -> ParameterWriter {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> ParameterWriter {
        Self { sql: String::with_capacity(capacity) }
    }

    pub fn write_null(&mut self) {
        self.sql.push_str("NULL");
    }

    pub fn write_int(&mut self, value: i64) {
        self.sql.push_str(itoa::Buffer::new().format(value));
    }

    pub fn write_uint(&mut self, value: u64) {
        self.sql.push_str(itoa::Buffer::new().format(value));
    }

    /// Write without quoting or escaping.
    pub fn write_raw(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Write quoted and escaped string literal.
    pub fn write_str(&mut self, value: &str) {
        self.sql.reserve(value.len() + 2);
        self.sql.push('\'');
        for ch in value.chars() {
            match ch {
                '\0' => self.sql.push_str("\\0"),
                '\n' => self.sql.push_str("\\n"),
                '\r' => self.sql.push_str("\\r"),
                '\\' => self.sql.push_str("\\\\"),
                '\'' => self.sql.push_str("\\'"),
                '"' => self.sql.push_str("\\\""),
                '\x1a' => self.sql.push_str("\\Z"),
                ch => self.sql.push(ch),
            }
        }
        self.sql.push('\'');
    }

    /// Write hex literal.
    pub fn write_bytes(&mut self, value: &[u8]) {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        self.sql.reserve(value.len() * 2 + 3);
        self.sql.push_str("x'");
        for &b in value {
            self.sql.push(HEX[usize::from(b >> 4)].into());
            self.sql.push(HEX[usize::from(b & 0xF)].into());
        }
        self.sql.push('\'');
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn into_string(self) -> String {
        self.sql
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashSet,
        hash::{BuildHasher, RandomState},
    };

    use bytes::Bytes;

    use super::{Parameter, ParameterWriter};
    use crate::protocol::ColumnType;

    #[test]
    fn tiny_int() {
        let param = Parameter::int(ColumnType::Tiny, 5);
        assert_eq!(param.column_type(), ColumnType::Tiny);
        assert_eq!(&param.binary()[..], &[0x05]);
        assert_eq!(param.text_literal(), "5");
        assert!(!param.is_unsigned());
    }

    #[test]
    fn unsigned_width() {
        let param = Parameter::uint(ColumnType::LongLong, u64::MAX);
        assert_eq!(param.binary_len(), 8);
        assert_eq!(&param.binary()[..], &[0xFF; 8]);
        assert_eq!(param.text_literal(), "18446744073709551615");
    }

    #[test]
    fn string_literal() {
        let param = Parameter::text("it's a \"quote\" \\ \n".into());
        assert_eq!(param.text_literal(), r#"'it\'s a \"quote\" \\ \n'"#);
        assert_eq!(&param.binary()[..], b"\x12it's a \"quote\" \\ \n");
    }

    #[test]
    fn bytes_literal() {
        let param = Parameter::bytes(Bytes::from_static(&[0x00, 0xAB, 0x10]));
        assert_eq!(param.text_literal(), "x'00ab10'");
        assert_eq!(param.column_type(), ColumnType::Blob);
    }

    #[test]
    fn null_literal() {
        let param = Parameter::null();
        assert!(param.is_null());
        assert_eq!(param.binary_len(), 0);
        assert_eq!(param.text_literal(), "NULL");
    }

    #[test]
    fn structural_eq() {
        let state = RandomState::new();
        assert_eq!(Parameter::double(1.5), Parameter::double(1.5));
        assert_ne!(Parameter::int(ColumnType::Tiny, 1), Parameter::int(ColumnType::Short, 1));
        assert_eq!(
            state.hash_one(Parameter::int(ColumnType::Long, 7)),
            state.hash_one(Parameter::int(ColumnType::Long, 7)),
        );

        let set = [Parameter::float(1.0), Parameter::float(1.0), Parameter::null()]
            .into_iter()
            .collect::<HashSet<_>>();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn writer_sequence() {
        let mut writer = ParameterWriter::with_capacity(16);
        writer.write_raw("(");
        writer.write_int(-1);
        writer.write_raw(",");
        writer.write_str("a");
        writer.write_raw(")");
        assert_eq!(writer.as_str(), "(-1,'a')");
    }
}
