//! IR to C code generation (spec §4.3): emits a single translation unit —
//! header, forward declarations, function bodies, `main` entry.

mod instructions;
mod program;
mod runtime;
mod state;

pub use program::generate_program;
