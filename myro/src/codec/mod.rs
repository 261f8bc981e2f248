//! Codec registry.
//!
//! A [`Codecs`] registry holds an ordered list of [`Codec`]. Encoding picks the first codec
//! that accepts the host [`Value`], decoding picks the first codec that handles the column type
//! and accepts the requested [`Target`].
//!
//! ```
//! use myro::{Value, codec::Codecs, protocol::ColumnType};
//!
//! let codecs = Codecs::default();
//! let param = codecs.encode(Value::I8(5)).unwrap();
//!
//! assert_eq!(param.column_type(), ColumnType::Tiny);
//! assert_eq!(&param.binary()[..], &[5]);
//! assert_eq!(param.text_literal(), "5");
//! ```
use bytes::{Buf, Bytes};
use std::{
    fmt,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use crate::{
    Result, Value,
    common::verbose,
    protocol::{ColumnMetadata, ColumnType},
    row::DecodeError,
};

mod parameter;
#[cfg(feature = "time")]
mod time;
#[cfg(feature = "json")]
mod json;

pub use parameter::{Parameter, ParameterWriter};
#[cfg(feature = "json")]
pub use json::Json;

/// The host type requested when decoding a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// The natural [`Value`] of the column.
    Value,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    #[cfg(feature = "time")]
    Date,
    #[cfg(feature = "time")]
    Time,
    #[cfg(feature = "time")]
    DateTime,
    #[cfg(feature = "json")]
    Json,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Value => "Value",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String",
            Self::Bytes => "Bytes",
            #[cfg(feature = "time")]
            Self::Date => "time::Date",
            #[cfg(feature = "time")]
            Self::Time => "time::Time",
            #[cfg(feature = "time")]
            Self::DateTime => "time::PrimitiveDateTime",
            #[cfg(feature = "json")]
            Self::Json => "serde_json::Value",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stateless conversion strategy between host values and column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    Null,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    UnsignedLong,
    Float,
    Double,
    String,
    Blob,
    #[cfg(feature = "time")]
    Date,
    #[cfg(feature = "time")]
    Time,
    #[cfg(feature = "time")]
    DateTime,
    #[cfg(feature = "json")]
    Json,
}

impl Codec {
    /// All codecs in priority order, primitives first.
    pub fn defaults() -> Vec<Codec> {
        #[allow(unused_mut)]
        let mut codecs = vec![
            Self::Null,
            Self::Bool,
            Self::Byte,
            Self::Short,
            Self::Int,
            Self::Long,
            Self::UnsignedByte,
            Self::UnsignedShort,
            Self::UnsignedInt,
            Self::UnsignedLong,
            Self::Float,
            Self::Double,
            Self::String,
            Self::Blob,
        ];
        #[cfg(feature = "time")]
        codecs.extend([Self::Date, Self::Time, Self::DateTime]);
        #[cfg(feature = "json")]
        codecs.push(Self::Json);
        codecs
    }

    /// Host type this codec decodes into.
    pub fn target(&self) -> Target {
        match self {
            Self::Null => Target::Value,
            Self::Bool => Target::Bool,
            Self::Byte => Target::I8,
            Self::Short => Target::I16,
            Self::Int => Target::I32,
            Self::Long => Target::I64,
            Self::UnsignedByte => Target::U8,
            Self::UnsignedShort => Target::U16,
            Self::UnsignedInt => Target::U32,
            Self::UnsignedLong => Target::U64,
            Self::Float => Target::F32,
            Self::Double => Target::F64,
            Self::String => Target::String,
            Self::Blob => Target::Bytes,
            #[cfg(feature = "time")]
            Self::Date => Target::Date,
            #[cfg(feature = "time")]
            Self::Time => Target::Time,
            #[cfg(feature = "time")]
            Self::DateTime => Target::DateTime,
            #[cfg(feature = "json")]
            Self::Json => Target::Json,
        }
    }

    /// Returns `true` if this codec encodes `value`.
    pub fn can_encode(&self, value: &Value) -> bool {
        if out_of_range(value).is_some() {
            return false;
        }
        match (self, value) {
            (Self::Null, Value::Null)
            | (Self::Bool, Value::Bool(_))
            | (Self::Byte, Value::I8(_))
            | (Self::Short, Value::I16(_))
            | (Self::Int, Value::I32(_))
            | (Self::Long, Value::I64(_))
            | (Self::UnsignedByte, Value::U8(_))
            | (Self::UnsignedShort, Value::U16(_))
            | (Self::UnsignedInt, Value::U32(_))
            | (Self::UnsignedLong, Value::U64(_))
            | (Self::Float, Value::F32(_))
            | (Self::Double, Value::F64(_))
            | (Self::String, Value::String(_))
            | (Self::Blob, Value::Bytes(_)) => true,
            #[cfg(feature = "time")]
            (Self::Date, Value::Date(_))
            | (Self::Time, Value::Time(_))
            | (Self::DateTime, Value::DateTime(_)) => true,
            #[cfg(feature = "json")]
            (Self::Json, Value::Json(_)) => true,
            _ => false,
        }
    }

    /// Encode `value`, returns it back if this codec does not accept it.
    pub fn encode(&self, value: Value) -> Result<Parameter, Value> {
        if out_of_range(&value).is_some() {
            return Err(value);
        }
        let param = match (self, value) {
            (Self::Null, Value::Null) => Parameter::null(),
            (Self::Bool, Value::Bool(v)) => Parameter::int(ColumnType::Tiny, v.into()),
            (Self::Byte, Value::I8(v)) => Parameter::int(ColumnType::Tiny, v.into()),
            (Self::Short, Value::I16(v)) => Parameter::int(ColumnType::Short, v.into()),
            (Self::Int, Value::I32(v)) => Parameter::int(ColumnType::Long, v.into()),
            (Self::Long, Value::I64(v)) => Parameter::int(ColumnType::LongLong, v),
            (Self::UnsignedByte, Value::U8(v)) => Parameter::uint(ColumnType::Tiny, v.into()),
            (Self::UnsignedShort, Value::U16(v)) => Parameter::uint(ColumnType::Short, v.into()),
            (Self::UnsignedInt, Value::U32(v)) => Parameter::uint(ColumnType::Long, v.into()),
            (Self::UnsignedLong, Value::U64(v)) => Parameter::uint(ColumnType::LongLong, v),
            (Self::Float, Value::F32(v)) => Parameter::float(v),
            (Self::Double, Value::F64(v)) => Parameter::double(v),
            (Self::String, Value::String(v)) => Parameter::text(v),
            (Self::Blob, Value::Bytes(v)) => Parameter::bytes(v),
            #[cfg(feature = "time")]
            (Self::Date, Value::Date(v)) => Parameter::date(v),
            #[cfg(feature = "time")]
            (Self::Time, Value::Time(v)) => Parameter::time(v),
            #[cfg(feature = "time")]
            (Self::DateTime, Value::DateTime(v)) => Parameter::datetime(v),
            #[cfg(feature = "json")]
            (Self::Json, Value::Json(v)) => json::encode(&v),
            (_, value) => return Err(value),
        };
        Ok(param)
    }

    /// Returns `true` if `column_type` is in this codec wire type set.
    pub fn handles(&self, column_type: ColumnType) -> bool {
        use ColumnType as T;
        match self {
            Self::Null => column_type == T::Null,
            Self::Bool => column_type.is_integer() || column_type == T::Bit,
            Self::Byte
            | Self::Short
            | Self::Int
            | Self::Long
            | Self::UnsignedByte
            | Self::UnsignedShort
            | Self::UnsignedInt
            | Self::UnsignedLong => column_type.is_integer(),
            Self::Float => column_type == T::Float,
            Self::Double => matches!(column_type, T::Float | T::Double | T::Decimal | T::NewDecimal),
            Self::String | Self::Blob => column_type.is_string(),
            #[cfg(feature = "time")]
            Self::Date => column_type == T::Date,
            #[cfg(feature = "time")]
            Self::Time => column_type == T::Time,
            #[cfg(feature = "time")]
            Self::DateTime => matches!(column_type, T::Date | T::DateTime | T::Timestamp),
            #[cfg(feature = "json")]
            Self::Json => matches!(
                column_type,
                T::Json | T::VarChar | T::VarString | T::String | T::Blob
                    | T::TinyBlob | T::MediumBlob | T::LongBlob
            ),
        }
    }

    /// Returns `true` if this codec decodes `column` into `target`.
    ///
    /// [`Target::Value`] is accepted by the codec of the column natural type.
    pub fn can_decode(&self, column: &ColumnMetadata, target: Target) -> bool {
        match target {
            Target::Value => self.is_natural(column),
            target => self.target() == target,
        }
    }

    fn is_natural(&self, column: &ColumnMetadata) -> bool {
        use ColumnType as T;
        let ty = column.column_type;
        let unsigned = column.flags.is_unsigned();
        match self {
            Self::Null => ty == T::Null,
            Self::Bool => false,
            Self::Byte => ty == T::Tiny && !unsigned,
            Self::Short => matches!(ty, T::Short | T::Year) && !unsigned,
            Self::Int => matches!(ty, T::Int24 | T::Long) && !unsigned,
            Self::Long => ty == T::LongLong && !unsigned,
            Self::UnsignedByte => ty == T::Tiny && unsigned,
            Self::UnsignedShort => matches!(ty, T::Short | T::Year) && unsigned,
            Self::UnsignedInt => matches!(ty, T::Int24 | T::Long) && unsigned,
            Self::UnsignedLong => ty == T::LongLong && unsigned,
            Self::Float => ty == T::Float,
            Self::Double => ty == T::Double,
            Self::String => match ty {
                T::Decimal | T::NewDecimal | T::Enum | T::Set => true,
                T::Json => !cfg!(feature = "json"),
                T::Bit | T::Geometry => false,
                _ => !column.is_binary(),
            },
            Self::Blob => match ty {
                T::Bit | T::Geometry => true,
                T::Decimal | T::NewDecimal | T::Enum | T::Set | T::Json => false,
                _ => column.is_binary(),
            },
            #[cfg(feature = "time")]
            Self::Date => ty == T::Date,
            #[cfg(feature = "time")]
            Self::Time => ty == T::Time,
            #[cfg(feature = "time")]
            Self::DateTime => matches!(ty, T::DateTime | T::Timestamp),
            #[cfg(feature = "json")]
            Self::Json => ty == T::Json,
        }
    }

    /// Decode one column value, consuming exactly the column bytes.
    pub fn decode(&self, buf: &mut Bytes, column: &ColumnMetadata, binary: bool) -> Result<Value, DecodeError> {
        macro_rules! narrow {
            ($ty:ty => $variant:ident) => {{
                let int = read_integer(buf, column, binary)?;
                <$ty>::try_from(int)
                    .map(Value::$variant)
                    .map_err(|_| DecodeError::OutOfRange { target: stringify!($ty) })
            }};
        }

        match self {
            Self::Null => Ok(Value::Null),
            Self::Bool => Ok(Value::Bool(read_integer(buf, column, binary)? != 0)),
            Self::Byte => narrow!(i8 => I8),
            Self::Short => narrow!(i16 => I16),
            Self::Int => narrow!(i32 => I32),
            Self::Long => narrow!(i64 => I64),
            Self::UnsignedByte => narrow!(u8 => U8),
            Self::UnsignedShort => narrow!(u16 => U16),
            Self::UnsignedInt => narrow!(u32 => U32),
            Self::UnsignedLong => narrow!(u64 => U64),
            Self::Float => match binary {
                true => get(buf.try_get_f32_le(), column).map(Value::F32),
                false => parse_text(buf, column).map(Value::F32),
            },
            Self::Double => match (binary, column.column_type) {
                (true, ColumnType::Float) => get(buf.try_get_f32_le(), column).map(|v| Value::F64(v.into())),
                (true, ColumnType::Double) => get(buf.try_get_f64_le(), column).map(Value::F64),
                _ => parse_text(buf, column).map(Value::F64),
            },
            Self::String => {
                let bytes = buf.split_to(buf.len());
                Ok(Value::String(String::from_utf8(bytes.into())?))
            }
            Self::Blob => Ok(Value::Bytes(buf.split_to(buf.len()))),
            #[cfg(feature = "time")]
            Self::Date => time::decode_date(buf, column, binary),
            #[cfg(feature = "time")]
            Self::Time => time::decode_time(buf, column, binary),
            #[cfg(feature = "time")]
            Self::DateTime => time::decode_datetime(buf, column, binary),
            #[cfg(feature = "json")]
            Self::Json => json::decode(buf),
        }
    }
}

fn get<T, E>(result: Result<T, E>, column: &ColumnMetadata) -> Result<T, DecodeError> {
    result.map_err(|_| DecodeError::malformed(column.column_type))
}

/// Parse the whole buffer as text literal.
fn parse_text<T: FromStr>(buf: &mut Bytes, column: &ColumnMetadata) -> Result<T, DecodeError> {
    let value = get(std::str::from_utf8(buf)?.parse::<T>(), column)?;
    buf.clear();
    Ok(value)
}

/// Read any integer column, widened to `i128`.
fn read_integer(buf: &mut Bytes, column: &ColumnMetadata, binary: bool) -> Result<i128, DecodeError> {
    use ColumnType as T;

    if column.column_type == T::Bit {
        // big endian bytes in both protocol
        let bytes = buf.split_to(buf.len());
        if bytes.len() > 8 {
            return Err(DecodeError::malformed(T::Bit));
        }
        return Ok(bytes.iter().fold(0i128, |acc, &b| (acc << 8) | i128::from(b)));
    }

    if !binary {
        return parse_text(buf, column);
    }

    let unsigned = column.flags.is_unsigned();
    let int = match column.column_type {
        T::Tiny if unsigned => buf.try_get_u8().map(i128::from),
        T::Tiny => buf.try_get_i8().map(i128::from),
        T::Short | T::Year if unsigned => buf.try_get_u16_le().map(i128::from),
        T::Short | T::Year => buf.try_get_i16_le().map(i128::from),
        T::Int24 | T::Long if unsigned => buf.try_get_u32_le().map(i128::from),
        T::Int24 | T::Long => buf.try_get_i32_le().map(i128::from),
        T::LongLong if unsigned => buf.try_get_u64_le().map(i128::from),
        T::LongLong => buf.try_get_i64_le().map(i128::from),
        ty => return Err(DecodeError::malformed(ty)),
    };
    get(int, column)
}

/// An ordered set of [`Codec`], first match wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Codecs {
    codecs: Vec<Codec>,
}

impl Codecs {
    /// Create registry with given priority order.
    pub fn new(codecs: impl Into<Vec<Codec>>) -> Codecs {
        Self { codecs: codecs.into() }
    }

    /// Process wide default registry.
    pub fn shared() -> Arc<Codecs> {
        static SHARED: LazyLock<Arc<Codecs>> = LazyLock::new(|| Arc::new(Codecs::default()));
        SHARED.clone()
    }

    pub fn codecs(&self) -> &[Codec] {
        &self.codecs
    }

    /// Find the codec that encode `value`.
    pub fn encoder(&self, value: &Value) -> Option<Codec> {
        self.codecs.iter().copied().find(|codec| codec.can_encode(value))
    }

    /// Find the codec that decode `column` into `target`.
    pub fn decoder(&self, column: &ColumnMetadata, target: Target) -> Option<Codec> {
        self.codecs
            .iter()
            .copied()
            .find(|codec| codec.handles(column.column_type) && codec.can_decode(column, target))
    }

    /// Encode `value` with the first codec that accepts it.
    pub fn encode(&self, value: Value) -> Result<Parameter, UnsupportedError> {
        let unsupported = |value: &Value| match out_of_range(value) {
            Some(reason) => UnsupportedError::OutOfRange { value: value.type_name(), reason },
            None => UnsupportedError::Encode { value: value.type_name() },
        };
        match self.encoder(&value) {
            Some(codec) => codec.encode(value).map_err(|value| unsupported(&value)),
            None => Err(unsupported(&value)),
        }
    }

    /// Decode one column value from `buf`.
    pub fn decode(
        &self,
        buf: &mut Bytes,
        column: &ColumnMetadata,
        target: Target,
        binary: bool,
    ) -> Result<Value> {
        let Some(codec) = self.decoder(column, target) else {
            return Err(UnsupportedError::Decode { column: column.column_type, target }.into());
        };
        verbose!(?codec, column = %column.name, binary, "decode");
        Ok(codec.decode(buf, column, binary)?)
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new(Codec::defaults())
    }
}

/// Returns why `value` has no wire representation.
fn out_of_range(value: &Value) -> Option<&'static str> {
    match value {
        Value::F32(v) if !v.is_finite() => Some("float must be finite"),
        Value::F64(v) if !v.is_finite() => Some("float must be finite"),
        #[cfg(feature = "time")]
        Value::Date(v) if !(0..=9999).contains(&v.year()) => Some("year must be in 0..=9999"),
        #[cfg(feature = "time")]
        Value::DateTime(v) if !(0..=9999).contains(&v.year()) => Some("year must be in 0..=9999"),
        _ => None,
    }
}

/// An error when no codec accepts the requested conversion.
pub enum UnsupportedError {
    Encode {
        value: &'static str,
    },
    /// Value has no representation in any wire type.
    OutOfRange {
        value: &'static str,
        reason: &'static str,
    },
    Decode {
        column: ColumnType,
        target: Target,
    },
}

impl std::error::Error for UnsupportedError { }

impl fmt::Display for UnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode { value } => write!(f, "unsupported type, no codec encode `{value}`"),
            Self::OutOfRange { value, reason } => write!(f, "unsupported `{value}` value, {reason}"),
            Self::Decode { column, target } => {
                write!(f, "unsupported conversion, no codec decode `{column}` into `{target}`")
            }
        }
    }
}

impl fmt::Debug for UnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
