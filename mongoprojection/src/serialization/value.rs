use crate::{
    expr::Type,
    serialization::{Decoder, DocumentDecoder},
};
use bson::{spec::ElementType, Bson};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum DecodeError {
    #[error("expected a value of type {expected}, found {found:?}")]
    TypeMismatch { expected: Type, found: ElementType },
    #[error("missing element '{element}' while decoding {type_name}")]
    MissingElement { type_name: String, element: String },
    #[error("constructor parameter '{parameter}' of {type_name} is not a declared member")]
    UnknownCreatorParameter { type_name: String, parameter: String },
    #[error("{value} is out of range for {ty}")]
    OutOfRange { value: String, ty: Type },
}

/// A decoded value. Composite values carry their constructor arguments in
/// constructor order.
#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal128(bson::Decimal128),
    String(String),
    DateTime(bson::DateTime),
    ObjectId(bson::oid::ObjectId),
    Binary(Vec<u8>),
    Document(bson::Document),
    Array(Vec<Value>),
    Composite(Composite),
}

#[derive(PartialEq, Debug, Clone)]
pub struct Composite {
    pub type_name: String,
    pub arguments: Vec<(String, Value)>,
}

impl Composite {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

fn mismatch<T>(expected: &Type, found: &Bson) -> Result<T> {
    Err(DecodeError::TypeMismatch {
        expected: expected.clone(),
        found: found.element_type(),
    })
}

fn out_of_range<T>(value: impl ToString, ty: &Type) -> Result<T> {
    Err(DecodeError::OutOfRange {
        value: value.to_string(),
        ty: ty.clone(),
    })
}

fn integral_f64(d: f64) -> Option<i64> {
    if d.fract() == 0.0 && d >= i64::MIN as f64 && d <= i64::MAX as f64 {
        Some(d as i64)
    } else {
        None
    }
}

impl Decoder {
    pub fn decode(&self, value: &Bson) -> Result<Value> {
        match self {
            Decoder::Value(ty) => decode_scalar(ty, value),
            Decoder::Nullable(inner) => match value {
                Bson::Null | Bson::Undefined => Ok(Value::Null),
                _ => inner.decode(value),
            },
            Decoder::Array(item) => match value {
                Bson::Array(items) => Ok(Value::Array(
                    items
                        .iter()
                        .map(|i| item.decode(i))
                        .collect::<Result<Vec<_>>>()?,
                )),
                _ => mismatch(&Type::array(Type::Document), value),
            },
            Decoder::Document(d) => d.decode(value),
        }
    }
}

impl DocumentDecoder {
    /// Reads every constructor parameter's element and fills the arguments
    /// in constructor order.
    pub fn decode(&self, value: &Bson) -> Result<Value> {
        let document = match value {
            Bson::Document(d) => d,
            Bson::Null => return Ok(Value::Null),
            _ => return mismatch(&Type::class(self.type_name()), value),
        };
        let arguments = self
            .creator()
            .iter()
            .map(|parameter| {
                let member =
                    self.member(parameter)
                        .ok_or_else(|| DecodeError::UnknownCreatorParameter {
                            type_name: self.type_name().to_string(),
                            parameter: parameter.clone(),
                        })?;
                let element = document.get(&member.element_name).ok_or_else(|| {
                    DecodeError::MissingElement {
                        type_name: self.type_name().to_string(),
                        element: member.element_name.clone(),
                    }
                })?;
                Ok((parameter.clone(), member.decoder.decode(element)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Composite(Composite {
            type_name: self.type_name().to_string(),
            arguments,
        }))
    }
}

fn decode_scalar(ty: &Type, value: &Bson) -> Result<Value> {
    Ok(match (ty, value) {
        (Type::Boolean, Bson::Boolean(b)) => Value::Boolean(*b),
        (Type::Int32 | Type::Enum(_), Bson::Int32(i)) => Value::Int32(*i),
        (Type::Int32 | Type::Enum(_), Bson::Int64(l)) => match i32::try_from(*l) {
            Ok(i) => Value::Int32(i),
            Err(_) => return out_of_range(l, ty),
        },
        (Type::Int32, Bson::Double(d)) => match integral_f64(*d).map(i32::try_from) {
            Some(Ok(i)) => Value::Int32(i),
            _ => return out_of_range(d, ty),
        },
        (Type::Int64, Bson::Int32(i)) => Value::Int64(i64::from(*i)),
        (Type::Int64, Bson::Int64(l)) => Value::Int64(*l),
        (Type::Int64, Bson::Double(d)) => match integral_f64(*d) {
            Some(l) => Value::Int64(l),
            None => return out_of_range(d, ty),
        },
        (Type::Double, Bson::Double(d)) => Value::Double(*d),
        (Type::Double, Bson::Int32(i)) => Value::Double(f64::from(*i)),
        (Type::Double, Bson::Int64(l)) => Value::Double(*l as f64),
        (Type::Decimal128, Bson::Decimal128(d)) => Value::Decimal128(*d),
        (Type::String, Bson::String(s)) => Value::String(s.clone()),
        (Type::DateTime, Bson::DateTime(d)) => Value::DateTime(*d),
        (Type::ObjectId, Bson::ObjectId(o)) => Value::ObjectId(*o),
        (Type::Binary, Bson::Binary(b)) => Value::Binary(b.bytes.clone()),
        (Type::Document, Bson::Document(d)) => Value::Document(d.clone()),
        _ => return mismatch(ty, value),
    })
}
