//! Compiler configuration (builder pattern, mirroring the teacher's
//! `CompilerConfig`/`ExternalBuiltin` shape in spirit): controls which
//! passes run and what external declarations codegen must forward-declare.

use crate::types::DataType;
use serde::Deserialize;
use std::path::PathBuf;

/// Which passes run between IR generation and code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    /// Skip the peephole pass; codegen sees the generator's raw IR.
    O0,
    /// Run the peephole pass once (spec §4.2 requires idempotence, not
    /// iteration to a fixpoint, so there is no O2/O3 distinction to make in
    /// this pass — levels above O1 are accepted for CLI-compatibility with
    /// the wider toolchain but behave identically to O1 here).
    #[default]
    O1,
    O2,
    O3,
}

impl OptimizationLevel {
    pub fn runs_peephole(self) -> bool {
        !matches!(self, OptimizationLevel::O0)
    }
}

/// An externally-declared source-language function (spec §4.3.1's "FFI
/// forward declarations"). Only the declaration surface is in scope;
/// resolving the backing symbol at link time is external (spec §1).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternFunctionDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<DataType>,
    pub returns: DataType,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ExternManifest {
    #[serde(default)]
    functions: Vec<ExternFunctionDecl>,
}

/// Top-level compiler configuration.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub optimization_level: OptimizationLevel,
    pub extern_functions: Vec<ExternFunctionDecl>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_extern_function(mut self, decl: ExternFunctionDecl) -> Self {
        self.extern_functions.push(decl);
        self
    }

    /// Parse a TOML manifest of the form:
    ///
    /// ```toml
    /// [[functions]]
    /// name = "sqrt"
    /// params = ["Double"]
    /// returns = "Double"
    /// ```
    pub fn load_extern_manifest(mut self, path: &ManifestPath) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("reading FFI manifest {}: {e}", path.display()))?;
        let manifest: ExternManifest = toml::from_str(&text)
            .map_err(|e| format!("parsing FFI manifest {}: {e}", path.display()))?;
        self.extern_functions.extend(manifest.functions);
        Ok(self)
    }
}

// `DataType` needs to round-trip through TOML for the manifest above. We
// only need the scalar cases an FFI signature can name; arrays are not
// valid FFI parameter types in this language.
impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "Int" => Ok(DataType::Int),
            "Bool" => Ok(DataType::Bool),
            "Void" => Ok(DataType::Void),
            "Float" => Ok(DataType::Float),
            "Double" => Ok(DataType::Double),
            "String" => Ok(DataType::String),
            "Null" => Ok(DataType::Null),
            other => Err(serde::de::Error::custom(format!(
                "unsupported FFI data type '{other}' (expected one of Int, Bool, Void, Float, Double, String, Null)"
            ))),
        }
    }
}

/// Path to an FFI manifest file, kept as a distinct type from a bare
/// `PathBuf` only so call sites read clearly; no behavior beyond `Deref`.
pub type ManifestPath = PathBuf;
