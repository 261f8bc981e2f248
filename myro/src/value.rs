//! Host value representation.
use bytes::Bytes;

/// A host value which can be encoded into [`Parameter`][crate::codec::Parameter] or
/// decoded from a column.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    #[cfg(feature = "time")]
    Date(time::Date),
    #[cfg(feature = "time")]
    Time(time::Time),
    #[cfg(feature = "time")]
    DateTime(time::PrimitiveDateTime),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
}

impl Value {
    /// Rust type name of the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            #[cfg(feature = "time")]
            Self::Date(_) => "time::Date",
            #[cfg(feature = "time")]
            Self::Time(_) => "time::Time",
            #[cfg(feature = "time")]
            Self::DateTime(_) => "time::PrimitiveDateTime",
            #[cfg(feature = "json")]
            Self::Json(_) => "serde_json::Value",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A type that can be bound as statement parameter.
pub trait Encode {
    fn encode(self) -> Value;
}

impl Encode for Value {
    fn encode(self) -> Value {
        self
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(self) -> Value {
        match self {
            Some(value) => value.encode(),
            None => Value::Null,
        }
    }
}

macro_rules! encode {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl Encode for $ty {
                fn encode(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

encode! {
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
}

#[cfg(feature = "time")]
encode! {
    time::Date => Date,
    time::Time => Time,
    time::PrimitiveDateTime => DateTime,
}

#[cfg(feature = "json")]
encode! {
    serde_json::Value => Json,
}

impl Encode for &str {
    fn encode(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl Encode for &String {
    fn encode(self) -> Value {
        Value::String(self.clone())
    }
}

impl Encode for Vec<u8> {
    fn encode(self) -> Value {
        Value::Bytes(self.into())
    }
}

impl Encode for &[u8] {
    fn encode(self) -> Value {
        Value::Bytes(Bytes::copy_from_slice(self))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        value.encode()
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        value.encode()
    }
}
