//! The symbol/type-table collaborator (spec §4.1, input contract).
//!
//! Semantic analysis itself is out of scope (spec §1); `irgen` only needs
//! answers to two questions about names already known to be valid. This
//! module sketches that contract as a trait plus a minimal in-memory
//! implementation usable for tests and small embedders — a real compiler
//! would back this with its own symbol table.

use crate::types::DataType;
use std::collections::HashMap;

/// Read-only view into the type-checker's symbol table.
///
/// Implementations must already have validated every name `irgen` will ask
/// about; `irgen` does not re-derive types, it only consults this table.
pub trait SymbolTable {
    /// The declared size of `name` if it is an array, `-1` if `name` is not
    /// an array, or `-1` if the size is genuinely unknown (spec §9 — this
    /// return value must not be silently treated as a literal size by the
    /// caller).
    fn array_size_of(&self, name: &str) -> i64;

    /// The data type of `name`.
    fn type_of(&self, name: &str) -> DataType;
}

/// A simple in-memory symbol table, backed by two maps. Sufficient for
/// tests and for embedding a type-checker that already resolved everything
/// into flat tables.
#[derive(Debug, Clone, Default)]
pub struct StaticSymbolTable {
    types: HashMap<String, DataType>,
    array_sizes: HashMap<String, i64>,
}

impl StaticSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.types.insert(name.into(), data_type);
        self
    }

    pub fn with_array(
        mut self,
        name: impl Into<String>,
        element_type: DataType,
        size: i64,
    ) -> Self {
        let name = name.into();
        self.array_sizes.insert(name.clone(), size);
        self.types
            .insert(name, DataType::Array(Box::new(element_type), size));
        self
    }
}

impl SymbolTable for StaticSymbolTable {
    fn array_size_of(&self, name: &str) -> i64 {
        self.array_sizes.get(name).copied().unwrap_or(-1)
    }

    fn type_of(&self, name: &str) -> DataType {
        self.types.get(name).cloned().unwrap_or(DataType::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_array_var_reports_size_negative_one() {
        let table = StaticSymbolTable::new().with_var("x", DataType::Int);
        assert_eq!(table.array_size_of("x"), -1);
        assert_eq!(table.type_of("x"), DataType::Int);
    }

    #[test]
    fn array_var_reports_declared_size() {
        let table = StaticSymbolTable::new().with_array("a", DataType::Int, 3);
        assert_eq!(table.array_size_of("a"), 3);
        assert_eq!(
            table.type_of("a"),
            DataType::Array(Box::new(DataType::Int), 3)
        );
    }
}
