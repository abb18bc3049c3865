//! Runtime helper and FFI forward declarations (spec §4.3.1, §6).
//!
//! The runtime helper signatures are fixed by the output contract; they are
//! listed here as a single data-driven table rather than inline `writeln!`
//! calls so the header section reads as one place to look.

use crate::config::ExternFunctionDecl;
use crate::error::CodeGenError;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// One runtime helper's C forward declaration.
pub struct RuntimeDecl {
    pub decl: &'static str,
}

/// The fixed runtime helper set codegen may call into (spec §6).
pub static RUNTIME_DECLARATIONS: LazyLock<Vec<RuntimeDecl>> = LazyLock::new(|| {
    vec![
        RuntimeDecl {
            decl: "char* tl_concat(const char*, const char*);",
        },
        RuntimeDecl {
            decl: "int64_t tl_strlen(const char*);",
        },
        RuntimeDecl {
            decl: "char* tl_substr(const char*, int64_t, int64_t);",
        },
        RuntimeDecl {
            decl: "int64_t tl_strcmp(const char*, const char*);",
        },
        RuntimeDecl {
            decl: "char* tl_char_at(const char*, int64_t);",
        },
    ]
});

/// Emits the fixed runtime helper declarations.
pub fn emit_runtime_decls(out: &mut String) -> Result<(), CodeGenError> {
    for decl in RUNTIME_DECLARATIONS.iter() {
        writeln!(out, "{}", decl.decl)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Emits one forward declaration per externally-declared source function
/// (spec §4.3.1, §6 — discovery of these is external; codegen only emits
/// the call site and the declaration).
pub fn emit_extern_decls(
    out: &mut String,
    externs: &[ExternFunctionDecl],
) -> Result<(), CodeGenError> {
    if externs.is_empty() {
        return Ok(());
    }
    for decl in externs {
        let params = decl
            .params
            .iter()
            .map(|t| t.c_type())
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params
        };
        writeln!(out, "{} {}({});", decl.returns.c_type()?, decl.name, params)?;
    }
    writeln!(out)?;
    Ok(())
}
