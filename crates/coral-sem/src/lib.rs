//! coral-sem - scope resolution, type inference, and semantic validation.
//!
//! Turns a surface [`coral_ast::Term`] tree into a fully typed tree: every
//! binding resolved, every node's type narrowed to a fixed point, and every
//! statically-typed position either confirmed or wrapped in a runtime
//! [`typed_ast::NodeKind::TypeCheck`]. `coral-gen` lowers the result
//! directly to LLVM IR; this crate never touches codegen concerns.
//!
//! Pipeline: [`build::build_program`] -> [`infer::infer_program`] -> [`analysis::validate`].

pub mod analysis;
pub mod build;
pub mod infer;
pub mod scope;
pub mod typed_ast;
pub mod types;

pub use analysis::ValidationError;
pub use build::{build_program, BuildError};
pub use infer::{infer_program, InferError};
pub use scope::{Scope, ScopeCapture, ScopeError, ScopeId, ScopeTree, ScopeVar, ScopeVarId};
pub use typed_ast::{NodeId, NodeKind, TypedAst, TypedNode};
pub use types::{Type, TypeKind};

/// Everything that can go wrong turning a surface AST into a validated,
/// fully typed one.
#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Infer(#[from] InferError),
    #[error(transparent)]
    Validate(#[from] ValidationError),
}

impl SemanticError {
    pub fn diagnostic_code(&self) -> coral_util::DiagnosticCode {
        use coral_util::DiagnosticCode;
        match self {
            SemanticError::Build(BuildError::Scope(ScopeError::AlreadyDeclared(_))) => {
                DiagnosticCode::E_IDENT_REDECLARED
            }
            SemanticError::Build(BuildError::Scope(ScopeError::Undefined(_))) => {
                DiagnosticCode::E_IDENT_UNDEFINED
            }
            SemanticError::Build(BuildError::Scope(ScopeError::UnderscoreReference)) => {
                DiagnosticCode::E_IDENT_UNDERSCORE_REF
            }
            SemanticError::Infer(InferError::Diverged(_)) => DiagnosticCode::E_CODEGEN_FIXEDPOINT_DIVERGED,
            SemanticError::Validate(ValidationError::ConditionNotBoolean { .. }) => {
                DiagnosticCode::E_TYPE_NON_BOOLEAN_COND
            }
            SemanticError::Validate(ValidationError::FirstNotTuple { .. }) => {
                DiagnosticCode::E_TYPE_NON_TUPLE_OPERAND
            }
            SemanticError::Validate(ValidationError::SecondNotTuple { .. }) => {
                DiagnosticCode::E_TYPE_NON_TUPLE_OPERAND
            }
            SemanticError::Validate(ValidationError::OperandNotInteger { .. })
            | SemanticError::Validate(ValidationError::OperandNotBoolean { .. }) => {
                DiagnosticCode::E_TYPE_INCOMPATIBLE_OPERANDS
            }
        }
    }
}

/// Runs the whole pipeline over one parsed file, returning the typed arena,
/// its scope tree, and the root node ready for codegen.
pub fn analyze(file: &coral_ast::File) -> Result<(TypedAst, ScopeTree, NodeId), SemanticError> {
    let (mut ast, mut scopes, _root_scope, root) = build_program(file)?;
    infer_program(&mut scopes, &mut ast, root)?;
    analysis::validate(&mut ast, root)?;
    Ok((ast, scopes, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_ast::{Location, Term};

    #[test]
    fn analyzes_a_trivial_program() {
        let file = coral_ast::File {
            name: "t".into(),
            expression: Term::Int {
                value: 1,
                location: Location::dummy(),
            },
            location: None,
        };
        let (ast, _scopes, root) = analyze(&file).unwrap();
        assert_eq!(*ast.ty(root), Type::Integer);
    }
}
