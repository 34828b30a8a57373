//! Literal values carried by `Literal` nodes and option defaults.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::ast::types::{ArrayType, Type, TypeRef};

/// A typed constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A NULL of the given type.
    Null(TypeRef),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Double(f64),
    String(SmolStr),
    Bytes(Vec<u8>),
    /// Days since the epoch.
    Date(i32),
    Json(SmolStr),
    Array {
        ty: TypeRef,
        elements: Vec<Value>,
    },
    Struct {
        ty: TypeRef,
        fields: Vec<Value>,
    },
    Enum {
        ty: TypeRef,
        number: i32,
    },
}

impl Value {
    pub fn null(ty: TypeRef) -> Self {
        Value::Null(ty)
    }

    pub fn string(s: impl Into<SmolStr>) -> Self {
        Value::String(s.into())
    }

    /// Returns the type of this value.
    pub fn ty(&self) -> TypeRef {
        match self {
            Value::Null(ty) => ty.clone(),
            Value::Bool(_) => Arc::new(Type::Bool),
            Value::Int32(_) => Arc::new(Type::Int32),
            Value::Int64(_) => Arc::new(Type::Int64),
            Value::Uint32(_) => Arc::new(Type::Uint32),
            Value::Uint64(_) => Arc::new(Type::Uint64),
            Value::Double(_) => Arc::new(Type::Double),
            Value::String(_) => Arc::new(Type::String),
            Value::Bytes(_) => Arc::new(Type::Bytes),
            Value::Date(_) => Arc::new(Type::Date),
            Value::Json(_) => Arc::new(Type::Json),
            Value::Array { ty, .. } | Value::Struct { ty, .. } | Value::Enum { ty, .. } => {
                ty.clone()
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Returns the value as an `i64` if it is a non-null integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Uint32(v) => Some(i64::from(*v)),
            Value::Uint64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is a non-null number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Checks that nested element and field values agree with the
    /// declared container type.
    pub fn is_internally_consistent(&self) -> bool {
        match self {
            Value::Array { ty, elements } => match ty.as_ref() {
                Type::Array(ArrayType { element_type }) => elements
                    .iter()
                    .all(|e| e.ty().equals(element_type) && e.is_internally_consistent()),
                _ => false,
            },
            Value::Struct { ty, fields } => match ty.as_struct() {
                Some(st) => {
                    st.fields.len() == fields.len()
                        && st
                            .fields
                            .iter()
                            .zip(fields)
                            .all(|(f, v)| v.ty().equals(&f.ty) && v.is_internally_consistent())
                }
                None => false,
            },
            Value::Enum { ty, number } => match ty.as_ref() {
                Type::Enum(e) => e.values.iter().any(|(_, n)| n == number),
                _ => false,
            },
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Date(d) => write!(f, "DATE({d})"),
            Value::Json(j) => write!(f, "JSON '{j}'"),
            Value::Array { elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Value::Struct { fields, .. } => {
                write!(f, "{{")?;
                for (i, e) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "}}")
            }
            Value::Enum { number, .. } => write!(f, "ENUM({number})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::types;

    #[test]
    fn value_types() {
        assert!(Value::Int64(5).ty().is_int64());
        assert!(Value::null(types::string()).ty().is_string());
        assert_eq!(Value::Int64(5).to_string(), "5");
        assert_eq!(Value::string("a").to_string(), "\"a\"");
    }

    #[test]
    fn array_consistency() {
        let good = Value::Array {
            ty: types::array(types::int64()),
            elements: vec![Value::Int64(1), Value::Int64(2)],
        };
        assert!(good.is_internally_consistent());
        let bad = Value::Array {
            ty: types::array(types::int64()),
            elements: vec![Value::string("x")],
        };
        assert!(!bad.is_internally_consistent());
    }

    #[test]
    fn integer_conversion() {
        assert_eq!(Value::Uint64(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int32(-3).as_i64(), Some(-3));
        assert_eq!(Value::Int64(50).as_f64(), Some(50.0));
    }
}
