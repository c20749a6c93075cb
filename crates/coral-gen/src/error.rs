//! Error types for LLVM code generation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeGenError {
    /// An `inkwell`/LLVM-C API call failed or returned a builder error.
    #[error("LLVM operation failed: {0}")]
    LlvmOperationFailed(String),

    /// A runtime or user function referenced by name wasn't declared.
    #[error("Function '{0}' not found")]
    FunctionNotFound(String),

    /// An operand arrived in a representation codegen can't lower for the
    /// operator it feeds - should be unreachable once `coral_sem::analysis`
    /// has run, so seeing this means a validation gap.
    #[error("Invalid operand type: {0}")]
    InvalidOperandType(String),

    /// Module verification (`Module::verify`) rejected the generated IR.
    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    /// Internal error - indicates a bug in the generator itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CodeGenError>;
