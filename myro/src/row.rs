//! Row operation.
//!
//! - [`Row`]
//! - [`FromRow`]
//! - [`Decode`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use bytes::Bytes;
use std::{borrow::Cow, fmt, str::Utf8Error, string::FromUtf8Error, sync::Arc};

use crate::{
    Result, Value,
    codec::{Codecs, Target},
    ext::FmtExt,
    protocol::{ColumnMetadata, ColumnType},
};

/// A result set row.
///
/// Column values are kept in wire format and decoded on access through the registry.
pub struct Row {
    columns: Arc<[ColumnMetadata]>,
    values: Vec<Option<Bytes>>,
    binary: bool,
    codecs: Arc<Codecs>,
}

impl Row {
    pub(crate) fn new(
        columns: Arc<[ColumnMetadata]>,
        values: Vec<Option<Bytes>>,
        binary: bool,
        codecs: Arc<Codecs>,
    ) -> Row {
        debug_assert_eq!(columns.len(), values.len(), "row length mismatch with column length");
        Self { columns, values, binary, codecs }
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Returns `true` if row is in binary protocol format.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Returns raw column value, [`None`] if value is `NULL`.
    pub fn raw<I: Index>(&self, idx: I) -> Result<Option<&Bytes>, DecodeError> {
        let nth = idx.position(&self.columns)?;
        match self.values.get(nth) {
            Some(value) => Ok(value.as_ref()),
            None => Err(DecodeError::IndexOutOfBounds(nth)),
        }
    }

    /// Try get and decode column.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R> {
        let nth = idx.position(&self.columns)?;
        let (Some(column), Some(value)) = (self.columns.get(nth), self.values.get(nth)) else {
            return Err(DecodeError::IndexOutOfBounds(nth).into());
        };

        let value = match value {
            Some(bytes) => self.codecs.decode(&mut bytes.clone(), column, R::TARGET, self.binary)?,
            None => Value::Null,
        };

        Ok(R::from_value(value)?)
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D> {
        D::from_row(self)
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (i, column) in self.columns.iter().enumerate() {
            dbg.key(&column.name);
            match self.try_get::<_, Value>(i) {
                Ok(value) => dbg.value(&value),
                Err(_) => match self.values.get(i) {
                    Some(Some(raw)) => dbg.value(&raw.lossy()),
                    _ => dbg.value(&format_args!("NULL")),
                },
            };
        }
        dbg.finish()
    }
}

/// Result of one statement execution.
#[derive(Debug, Default)]
pub struct QueryResult {
    /// Result set columns, empty for statement that does not return result set.
    pub columns: Arc<[ColumnMetadata]>,
    /// Returned rows, empty for statement that does not return result set.
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub warnings: u16,
}

impl QueryResult {
    /// Returns `true` if the result comes from a result set instead of an `OK` packet.
    pub fn is_result_set(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Decode every row using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<Vec<D>> {
        self.rows.into_iter().map(Row::decode).collect()
    }
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self> {
        Ok(())
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: Decode),*
        {
            fn from_row(row: Row) -> Result<Self> {
                Ok((
                    $(row.try_get($i)?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);

/// A type that can be constructed from decoded [`Value`].
pub trait Decode: Sized {
    /// Target requested to the codec registry.
    const TARGET: Target;

    /// Try convert decoded value into self.
    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

impl Decode for Value {
    const TARGET: Target = Target::Value;

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: Decode> Decode for Option<T> {
    const TARGET: Target = T::TARGET;

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

macro_rules! decode {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl Decode for $ty {
                const TARGET: Target = Target::$variant;

                fn from_value(value: Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::$variant(v) => Ok(v.into()),
                        Value::Null => Err(DecodeError::Null),
                        other => Err(DecodeError::Mismatch {
                            found: other.type_name(),
                            target: Target::$variant,
                        }),
                    }
                }
            }
        )*
    };
}

decode! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Bytes => Bytes,
    Vec<u8> => Bytes,
}

#[cfg(feature = "time")]
decode! {
    time::Date => Date,
    time::Time => Time,
    time::PrimitiveDateTime => DateTime,
}

#[cfg(feature = "json")]
decode! {
    serde_json::Value => Json,
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the nth column.
    fn position(self, columns: &[ColumnMetadata]) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, columns: &[ColumnMetadata]) -> Result<usize, DecodeError> {
        match self < columns.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, columns: &[ColumnMetadata]) -> Result<usize, DecodeError> {
        columns
            .iter()
            .position(|column| column.name == self)
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

/// An error when decoding row value.
pub enum DecodeError {
    /// Server returns non utf8 string.
    Utf8(Utf8Error),
    /// Column requested not found.
    ColumnNotFound(Cow<'static,str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Decoded value is not the requested type.
    Mismatch {
        found: &'static str,
        target: Target,
    },
    /// Column bytes does not match the column type layout.
    Malformed {
        column: ColumnType,
    },
    /// Value does not fit in requested type.
    OutOfRange {
        target: &'static str,
    },
    /// Value is null.
    Null,
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::error::Error),
}

impl DecodeError {
    pub(crate) fn malformed(column: ColumnType) -> DecodeError {
        Self::Malformed { column }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::Utf8(e) => write!(f, "{e}"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::Mismatch { found, target } => write!(f, "expected `{target}` found `{found}`"),
            Self::Malformed { column } => write!(f, "malformed `{column}` value"),
            Self::OutOfRange { target } => write!(f, "value out of range of `{target}`"),
            Self::Null => write!(f, "unexpected NULL value"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

from!(<Utf8Error>e => Self::Utf8(e));
from!(<FromUtf8Error>e => Self::Utf8(e.utf8_error()));
#[cfg(feature = "json")]
from!(<serde_json::error::Error>e => Self::Json(e));

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use std::sync::Arc;

    use super::*;
    use crate::{codec::Codecs, protocol::ColumnFlags};

    fn row() -> Row {
        let columns: Arc<[ColumnMetadata]> = Arc::new([
            ColumnMetadata::new("id", ColumnType::Long).with_flags(ColumnFlags::NOT_NULL),
            ColumnMetadata::new("name", ColumnType::VarString).with_charset(33),
            ColumnMetadata::new("deleted", ColumnType::Tiny),
        ]);
        let values = vec![Some(Bytes::from_static(b"420")), Some(Bytes::from_static(b"Foo")), None];
        Row::new(columns, values, false, Codecs::shared())
    }

    #[test]
    fn try_get() {
        let row = row();
        assert_eq!(row.len(), 3);
        assert_eq!(row.try_get::<_, i32>(0).unwrap(), 420);
        assert_eq!(row.try_get::<_, i64>("id").unwrap(), 420);
        assert_eq!(row.try_get::<_, String>("name").unwrap(), "Foo");
        assert_eq!(row.try_get::<_, Option<i8>>("deleted").unwrap(), None);
        assert_eq!(row.try_get::<_, Value>(1).unwrap(), Value::String("Foo".into()));
    }

    #[test]
    fn try_get_error() {
        let row = row();
        assert!(row.try_get::<_, i8>("deleted").is_err());
        assert!(row.try_get::<_, i32>("missing").is_err());
        assert!(row.try_get::<_, i32>(3).is_err());
        assert!(row.raw(2).unwrap().is_none());
    }

    #[test]
    fn from_row() {
        let (id, name, deleted) = row().decode::<(u32, String, Option<bool>)>().unwrap();
        assert_eq!(id, 420);
        assert_eq!(name, "Foo");
        assert_eq!(deleted, None);
    }

    #[test]
    fn debug() {
        let dbg = format!("{:?}", row());
        assert!(dbg.contains("\"id\": I32(420)"));
        assert!(dbg.contains("\"deleted\": Null"));
    }
}
