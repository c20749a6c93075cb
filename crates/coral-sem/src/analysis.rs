//! Semantic validation and coercion insertion (post-inference).
//!
//! Runs once, after the inference fixed point has settled: walks the typed
//! tree looking for positions that demand a concrete kind - a `Conditional`
//! condition, a `First`/`Second` operand, a statically-typed function body -
//! and either accepts the node's inferred type outright (if it's already
//! static and matches) or wraps it in a [`NodeKind::TypeCheck`], deferred to
//! a runtime tag check at codegen time. A position whose inferred type is a
//! concrete kind other than the one required is a hard error: no coercion
//! would make it correct.

use crate::typed_ast::{NodeId, NodeKind, TypedAst};
use crate::types::Type;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("condition of `if` must be Boolean, found {found}")]
    ConditionNotBoolean { node: NodeId, found: Type },
    #[error("`first` requires a Tuple, found {found}")]
    FirstNotTuple { node: NodeId, found: Type },
    #[error("`second` requires a Tuple, found {found}")]
    SecondNotTuple { node: NodeId, found: Type },
    #[error("arithmetic/comparison operand must be Integer, found {found}")]
    OperandNotInteger { node: NodeId, found: Type },
    #[error("logical operand must be Boolean, found {found}")]
    OperandNotBoolean { node: NodeId, found: Type },
}

/// Walks the whole tree inserting [`NodeKind::TypeCheck`] wrappers wherever
/// a statically-typed position receives a non-static operand, and rejecting
/// positions whose operand is a statically incompatible concrete kind.
pub fn validate(ast: &mut TypedAst, root: NodeId) -> Result<(), ValidationError> {
    walk(ast, root)
}

fn walk(ast: &mut TypedAst, node: NodeId) -> Result<(), ValidationError> {
    let kind = ast.node(node).kind.clone();
    match kind {
        NodeKind::BoolLit(_) | NodeKind::IntLit(_) | NodeKind::StringLit(_) | NodeKind::Reference(_) => {}

        NodeKind::Tuple { first, second } => {
            walk(ast, first)?;
            walk(ast, second)?;
        }

        NodeKind::First(value) => {
            walk(ast, value)?;
            require_kind(ast, value, &Type::tuple_any(), |found| {
                ValidationError::FirstNotTuple { node, found }
            })?;
        }
        NodeKind::Second(value) => {
            walk(ast, value)?;
            require_kind(ast, value, &Type::tuple_any(), |found| {
                ValidationError::SecondNotTuple { node, found }
            })?;
        }
        NodeKind::Print(value) => walk(ast, value)?,

        NodeKind::Binary { op, lhs, rhs } => {
            walk(ast, lhs)?;
            walk(ast, rhs)?;
            use coral_ast::BinaryOp::*;
            match op {
                // `+` stays dynamic when it can't be pinned to Integer or
                // String at compile time; codegen dispatches on the tag.
                Add | Eq | Neq => {}
                Sub | Mul | Div | Rem | Lt | Lte | Gt | Gte => {
                    require_kind(ast, lhs, &Type::Integer, |found| {
                        ValidationError::OperandNotInteger { node, found }
                    })?;
                    require_kind(ast, rhs, &Type::Integer, |found| {
                        ValidationError::OperandNotInteger { node, found }
                    })?;
                }
                And | Or => {
                    require_kind(ast, lhs, &Type::Boolean, |found| {
                        ValidationError::OperandNotBoolean { node, found }
                    })?;
                    require_kind(ast, rhs, &Type::Boolean, |found| {
                        ValidationError::OperandNotBoolean { node, found }
                    })?;
                }
            }
        }

        NodeKind::Conditional {
            condition,
            then,
            otherwise,
        } => {
            walk(ast, condition)?;
            require_kind(ast, condition, &Type::Boolean, |found| {
                ValidationError::ConditionNotBoolean { node, found }
            })?;
            walk(ast, then)?;
            walk(ast, otherwise)?;
        }

        NodeKind::Function { body, .. } => walk(ast, body)?,

        NodeKind::Let { value, next, .. } => {
            walk(ast, value)?;
            walk(ast, next)?;
        }

        NodeKind::Call { callee, arguments } => {
            walk(ast, callee)?;
            for arg in arguments {
                walk(ast, arg)?;
            }
        }

        NodeKind::TypeCheck { value, .. } => walk(ast, value)?,
    }
    Ok(())
}

/// If `node`'s inferred type isn't already `expected`'s kind, either wraps
/// it in a runtime [`NodeKind::TypeCheck`] (when the type is non-static,
/// i.e. could still be `expected` at runtime) or reports `on_mismatch`
/// (when it's a concrete, statically incompatible kind).
fn require_kind(
    ast: &mut TypedAst,
    node: NodeId,
    expected: &Type,
    on_mismatch: impl FnOnce(Type) -> ValidationError,
) -> Result<(), ValidationError> {
    let found = ast.ty(node).clone();
    if found.kind() == expected.kind() {
        return Ok(());
    }
    if found.is_static() {
        return Err(on_mismatch(found));
    }
    wrap_with_type_check(ast, node, expected.clone());
    Ok(())
}

/// Splices a [`NodeKind::TypeCheck`] node in between `node` and its parent,
/// taking over `node`'s old parent slot.
fn wrap_with_type_check(ast: &mut TypedAst, node: NodeId, expected: Type) {
    let parent = ast.parent(node);
    let scope = ast.node(node).scope;
    let location = ast.node(node).location.clone();
    let check = ast.push(
        NodeKind::TypeCheck {
            value: node,
            expected: expected.clone(),
        },
        expected,
        scope,
        location,
    );
    ast.set_parent(node, check);
    if let Some(parent) = parent {
        ast.set_parent(check, parent);
        retarget_child(ast, parent, node, check);
    }
}

/// Rewrites whichever child slot of `parent` pointed at `old` to point at
/// `new` instead, after `old` has been spliced behind a `TypeCheck`.
fn retarget_child(ast: &mut TypedAst, parent: NodeId, old: NodeId, new: NodeId) {
    let mut kind = ast.node(parent).kind.clone();
    match &mut kind {
        NodeKind::First(v) | NodeKind::Second(v) | NodeKind::Print(v) => {
            if *v == old {
                *v = new;
            }
        }
        NodeKind::Tuple { first, second } => {
            if *first == old {
                *first = new;
            }
            if *second == old {
                *second = new;
            }
        }
        NodeKind::Binary { lhs, rhs, .. } => {
            if *lhs == old {
                *lhs = new;
            }
            if *rhs == old {
                *rhs = new;
            }
        }
        NodeKind::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if *condition == old {
                *condition = new;
            }
            if *then == old {
                *then = new;
            }
            if *otherwise == old {
                *otherwise = new;
            }
        }
        NodeKind::Function { body, .. } => {
            if *body == old {
                *body = new;
            }
        }
        NodeKind::Let { value, next, .. } => {
            if *value == old {
                *value = new;
            }
            if *next == old {
                *next = new;
            }
        }
        NodeKind::Call { callee, arguments } => {
            if *callee == old {
                *callee = new;
            }
            for arg in arguments.iter_mut() {
                if *arg == old {
                    *arg = new;
                }
            }
        }
        NodeKind::TypeCheck { value, .. } => {
            if *value == old {
                *value = new;
            }
        }
        NodeKind::BoolLit(_) | NodeKind::IntLit(_) | NodeKind::StringLit(_) | NodeKind::Reference(_) => {}
    }
    ast.node_mut(parent).kind = kind;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_program;
    use crate::infer::infer_program;
    use coral_ast::{Location, Term};

    fn loc() -> Location {
        Location::dummy()
    }

    fn build_and_infer(expr: Term) -> (TypedAst, NodeId) {
        let file = coral_ast::File {
            name: "t".into(),
            expression: expr,
            location: None,
        };
        let (mut ast, mut scopes, _root_scope, root) = build_program(&file).unwrap();
        infer_program(&mut scopes, &mut ast, root).unwrap();
        (ast, root)
    }

    #[test]
    fn boolean_condition_needs_no_wrapping() {
        let expr = Term::If {
            condition: Box::new(Term::Bool { value: true, location: loc() }),
            then: Box::new(Term::Int { value: 1, location: loc() }),
            otherwise: Box::new(Term::Int { value: 2, location: loc() }),
            location: loc(),
        };
        let (mut ast, root) = build_and_infer(expr);
        assert!(validate(&mut ast, root).is_ok());
    }

    #[test]
    fn integer_condition_is_a_hard_error() {
        let expr = Term::If {
            condition: Box::new(Term::Int { value: 1, location: loc() }),
            then: Box::new(Term::Int { value: 1, location: loc() }),
            otherwise: Box::new(Term::Int { value: 2, location: loc() }),
            location: loc(),
        };
        let (mut ast, root) = build_and_infer(expr);
        assert!(matches!(
            validate(&mut ast, root),
            Err(ValidationError::ConditionNotBoolean { .. })
        ));
    }

    #[test]
    fn first_of_a_concrete_tuple_needs_no_wrapping() {
        let expr = Term::First {
            value: Box::new(Term::Tuple {
                first: Box::new(Term::Int { value: 1, location: loc() }),
                second: Box::new(Term::Int { value: 2, location: loc() }),
                location: loc(),
            }),
            location: loc(),
        };
        let (mut ast, root) = build_and_infer(expr);
        assert!(validate(&mut ast, root).is_ok());
    }

    #[test]
    fn first_of_an_integer_is_a_hard_error() {
        let expr = Term::First {
            value: Box::new(Term::Int { value: 1, location: loc() }),
            location: loc(),
        };
        let (mut ast, root) = build_and_infer(expr);
        assert!(matches!(
            validate(&mut ast, root),
            Err(ValidationError::FirstNotTuple { .. })
        ));
    }
}
