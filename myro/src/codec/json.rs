//! [`serde_json`] integration.
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use super::{Parameter, Target};
use crate::{Decode, Encode, Value, row::DecodeError};

/// Decode and encode json value through [`serde`].
///
/// # Panics
///
/// Note that when performing [`Encode`], if [`Serialize`] implementation decide
/// to fail, it will panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Encode for Json<T> {
    fn encode(self) -> Value {
        Value::Json(serde_json::to_value(&self.0).expect("failed to serialize json value"))
    }
}

impl<T: DeserializeOwned> Decode for Json<T> {
    const TARGET: Target = Target::Json;

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Json(json) => Ok(Json(serde_json::from_value(json)?)),
            Value::Null => Err(DecodeError::Null),
            other => Err(DecodeError::Mismatch { found: other.type_name(), target: Target::Json }),
        }
    }
}

pub(crate) fn encode(value: &serde_json::Value) -> Parameter {
    Parameter::text(value.to_string())
}

pub(crate) fn decode(buf: &mut Bytes) -> Result<Value, DecodeError> {
    let json = serde_json::from_slice(buf)?;
    buf.clear();
    Ok(Value::Json(json))
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Foo {
        id: i32,
    }

    #[test]
    fn decode_json() {
        let mut buf = Bytes::from_static(br#"{"id":420}"#);
        let value = decode(&mut buf).unwrap();
        assert!(buf.is_empty());
        let Json(foo) = Json::<Foo>::from_value(value).unwrap();
        assert_eq!(foo, Foo { id: 420 });
    }

    #[test]
    fn encode_json() {
        let param = encode(&serde_json::json!({ "a": "b'c" }));
        assert_eq!(param.text_literal(), r#"'{\"a\":\"b\'c\"}'"#);
    }
}
