//! coral-gen - lowers a validated [`coral_sem::TypedAst`] to LLVM IR.
//!
//! Every closure, the top-level program included, compiles to one LLVM
//! function under a single uniform calling convention so every call site
//! shares one signature; see [`codegen`] for the lowering itself, [`types`]
//! for the representation choices (boxed vs. unboxed), and [`runtime`] for
//! the fixed ABI surface `coral-runtime` implements.

pub mod codegen;
pub mod error;
pub mod runtime;
pub mod types;

pub use codegen::CodeGen;
pub use error::{CodeGenError, Result};
pub use runtime::RuntimeFns;
pub use types::{ObjectTag, Repr, TypeMapper};
