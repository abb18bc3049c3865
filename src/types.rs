//! Data types of the source language (spec §3.1).

use crate::error::CodeGenError;
use std::fmt;

/// A scalar or array data type. Arrays carry their element type and a fixed
/// size (`-1` means "not yet known" — see [`DataType::array_is_unsized`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Bool,
    Void,
    Float,
    Double,
    String,
    Null,
    Array(Box<DataType>, i64),
}

impl DataType {
    /// `true` for the sentinel "size not yet known" marker the symbol-table
    /// collaborator may return. `irgen` must not silently default this away
    /// (spec §9, open question on the dynamic-size sentinel).
    pub fn array_is_unsized(&self) -> bool {
        matches!(self, DataType::Array(_, size) if *size < 0)
    }

    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Array(elem, _) => Some(elem),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(..))
    }

    /// The C type this data type lowers to (spec §4.3.2 point 1). An array
    /// whose element type has no C representation (another array, `Void`,
    /// `Null`) is a malformed-input condition, not a bug in codegen itself,
    /// so it is reported rather than panicked on (spec §9, open question on
    /// temp type recovery — the same discipline applies here).
    pub fn c_type(&self) -> Result<&'static str, CodeGenError> {
        Ok(match self {
            DataType::Int => "int64_t",
            DataType::Bool => "bool",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "char*",
            DataType::Void => "void",
            DataType::Null => "void*",
            DataType::Array(elem, _) => match elem.as_ref() {
                DataType::Int => "int64_t*",
                DataType::Bool => "bool*",
                DataType::Float => "float*",
                DataType::Double => "double*",
                DataType::String => "char**",
                other => {
                    return Err(CodeGenError::logic(format!(
                        "unsupported array element type {other}"
                    )))
                }
            },
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Bool => write!(f, "bool"),
            DataType::Void => write!(f, "void"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::String => write!(f, "string"),
            DataType::Null => write!(f, "null"),
            DataType::Array(elem, size) => {
                if *size < 0 {
                    write!(f, "{elem}[]")
                } else {
                    write!(f, "{elem}[{size}]")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_c_type_maps_element() {
        let ty = DataType::Array(Box::new(DataType::Int), 3);
        assert_eq!(ty.c_type().unwrap(), "int64_t*");
    }

    #[test]
    fn array_of_array_is_rejected() {
        let ty = DataType::Array(Box::new(DataType::Array(Box::new(DataType::Int), 2)), 3);
        assert!(ty.c_type().is_err());
    }

    #[test]
    fn unsized_array_is_detected() {
        let ty = DataType::Array(Box::new(DataType::Int), -1);
        assert!(ty.array_is_unsized());
        let ty = DataType::Array(Box::new(DataType::Int), 5);
        assert!(!ty.array_is_unsized());
    }

    #[test]
    fn display_renders_readable_form() {
        assert_eq!(DataType::Int.to_string(), "int");
        assert_eq!(
            DataType::Array(Box::new(DataType::Bool), 2).to_string(),
            "bool[2]"
        );
    }
}
