//! Builds a [`TypedAst`] + [`ScopeTree`] from a surface [`coral_ast::Term`]
//! tree in a single top-down pass, the Rust analogue of the reference
//! builder that walks the parser's term dict and emits typed expression
//! nodes with parent pointers patched in after the fact.
//!
//! Two points diverge from a literal port, both following the documented
//! contract rather than an incidental property of the original:
//!
//! - A `let` only declares its binding *before* building the value when the
//!   value is itself a function bound to a name other than `_` (so the
//!   function can call itself); every other `let` builds the value first and
//!   declares afterward. The original declares unconditionally up front.
//! - `if`/`else` branches each get their own child scope, so a binding
//!   introduced in one arm can't leak into the other.

use coral_ast::Term;

use crate::scope::{ScopeError, ScopeId, ScopeTree, ScopeVarId};
use crate::typed_ast::{NodeId, NodeKind, TypedAst};
use crate::types::Type;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// Builds the whole program, returning the arena, the scope tree, the root
/// scope, and the root node.
pub fn build_program(file: &coral_ast::File) -> Result<(TypedAst, ScopeTree, ScopeId, NodeId), BuildError> {
    let (mut scopes, root_scope) = ScopeTree::new();
    let mut ast = TypedAst::new();
    let root = build(&file.expression, root_scope, &mut scopes, &mut ast)?;
    ast.root = Some(root);
    Ok((ast, scopes, root_scope, root))
}

fn build(
    term: &Term,
    scope: ScopeId,
    scopes: &mut ScopeTree,
    ast: &mut TypedAst,
) -> Result<NodeId, BuildError> {
    let loc = term.location().clone();
    let id = match term {
        Term::Int { value, .. } => ast.push(NodeKind::IntLit(*value), Type::Integer, scope, loc),
        Term::Str { value, .. } => {
            ast.push(NodeKind::StringLit(value.clone()), Type::String, scope, loc)
        }
        Term::Bool { value, .. } => ast.push(NodeKind::BoolLit(*value), Type::Boolean, scope, loc),
        Term::Var { text, .. } => {
            let var = scopes.resolve(scope, text)?;
            ast.push(NodeKind::Reference(var), Type::Any, scope, loc)
        }
        Term::Tuple { first, second, .. } => {
            let first_id = build(first, scope, scopes, ast)?;
            let second_id = build(second, scope, scopes, ast)?;
            let tuple = ast.push(
                NodeKind::Tuple {
                    first: first_id,
                    second: second_id,
                },
                Type::tuple_any(),
                scope,
                loc,
            );
            ast.set_parent(first_id, tuple);
            ast.set_parent(second_id, tuple);
            tuple
        }
        Term::First { value, .. } => {
            let value_id = build(value, scope, scopes, ast)?;
            let node = ast.push(NodeKind::First(value_id), Type::Any, scope, loc);
            ast.set_parent(value_id, node);
            node
        }
        Term::Second { value, .. } => {
            let value_id = build(value, scope, scopes, ast)?;
            let node = ast.push(NodeKind::Second(value_id), Type::Any, scope, loc);
            ast.set_parent(value_id, node);
            node
        }
        Term::Print { value, .. } => {
            let value_id = build(value, scope, scopes, ast)?;
            let node = ast.push(NodeKind::Print(value_id), Type::Any, scope, loc);
            ast.set_parent(value_id, node);
            node
        }
        Term::Binary { lhs, op, rhs, .. } => {
            let lhs_id = build(lhs, scope, scopes, ast)?;
            let rhs_id = build(rhs, scope, scopes, ast)?;
            let node = ast.push(
                NodeKind::Binary {
                    op: *op,
                    lhs: lhs_id,
                    rhs: rhs_id,
                },
                Type::Any,
                scope,
                loc,
            );
            ast.set_parent(lhs_id, node);
            ast.set_parent(rhs_id, node);
            node
        }
        Term::Call { callee, arguments, .. } => {
            let callee_id = build(callee, scope, scopes, ast)?;
            let mut arg_ids = Vec::with_capacity(arguments.len());
            for arg in arguments {
                arg_ids.push(build(arg, scope, scopes, ast)?);
            }
            let node = ast.push(
                NodeKind::Call {
                    callee: callee_id,
                    arguments: arg_ids.clone(),
                },
                Type::Any,
                scope,
                loc,
            );
            ast.set_parent(callee_id, node);
            for arg_id in arg_ids {
                ast.set_parent(arg_id, node);
            }
            node
        }
        Term::If {
            condition,
            then,
            otherwise,
            ..
        } => {
            let condition_id = build(condition, scope, scopes, ast)?;
            let then_scope = scopes.child_of(scope);
            let then_id = build(then, then_scope, scopes, ast)?;
            let otherwise_scope = scopes.child_of(scope);
            let otherwise_id = build(otherwise, otherwise_scope, scopes, ast)?;
            let node = ast.push(
                NodeKind::Conditional {
                    condition: condition_id,
                    then: then_id,
                    otherwise: otherwise_id,
                },
                Type::Any,
                scope,
                loc,
            );
            ast.set_parent(condition_id, node);
            ast.set_parent(then_id, node);
            ast.set_parent(otherwise_id, node);
            node
        }
        Term::Function { parameters, value, .. } => {
            build_function(parameters, value, scope, scopes, ast, None, loc)?
        }
        Term::Let {
            name, value, next, ..
        } => {
            let is_self_recursive_fn =
                name.text != "_" && matches!(value.as_ref(), Term::Function { .. });

            let (value_id, binding) = if is_self_recursive_fn {
                let binding = scopes.declare(scope, &name.text, Type::Any)?;
                let value_id = match value.as_ref() {
                    Term::Function { parameters, value, .. } => build_function(
                        parameters,
                        value,
                        scope,
                        scopes,
                        ast,
                        binding,
                        value.location().clone(),
                    )?,
                    _ => unreachable!(),
                };
                (value_id, binding)
            } else {
                let value_id = build(value, scope, scopes, ast)?;
                let binding = scopes.declare(scope, &name.text, Type::Any)?;
                (value_id, binding)
            };

            let next_id = build(next, scope, scopes, ast)?;
            let node = ast.push(
                NodeKind::Let {
                    binding,
                    value: value_id,
                    next: next_id,
                },
                Type::Any,
                scope,
                loc,
            );
            ast.set_parent(value_id, node);
            ast.set_parent(next_id, node);
            node
        }
    };
    Ok(id)
}

fn build_function(
    parameters: &[coral_ast::term::Parameter],
    body: &Term,
    scope: ScopeId,
    scopes: &mut ScopeTree,
    ast: &mut TypedAst,
    binding: Option<ScopeVarId>,
    loc: coral_ast::Location,
) -> Result<NodeId, BuildError> {
    let func_scope = scopes.child_of(scope);
    let mut param_vars = Vec::with_capacity(parameters.len());
    for param in parameters {
        param_vars.push(scopes.declare(func_scope, &param.text, Type::Any)?);
    }
    let body_id = build(body, func_scope, scopes, ast)?;
    let node = ast.push(
        NodeKind::Function {
            params: param_vars,
            body: body_id,
            binding,
        },
        Type::Function(vec![Type::Any; parameters.len()], Box::new(Type::Any)),
        scope,
        loc,
    );
    ast.set_parent(body_id, node);
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_ast::{Location, Parameter};

    fn loc() -> Location {
        Location::dummy()
    }

    #[test]
    fn builds_literal() {
        let file = coral_ast::File {
            name: "t".into(),
            expression: Term::Int {
                value: 42,
                location: loc(),
            },
            location: None,
        };
        let (ast, _scopes, _root_scope, root) = build_program(&file).unwrap();
        assert!(matches!(ast.node(root).kind, NodeKind::IntLit(42)));
    }

    #[test]
    fn non_recursive_let_builds_value_before_declaring() {
        // `let x = x; x` must fail: the value's `x` isn't in scope yet.
        let file = coral_ast::File {
            name: "t".into(),
            expression: Term::Let {
                name: Parameter {
                    text: "x".into(),
                    location: loc(),
                },
                value: Box::new(Term::Var {
                    text: "x".into(),
                    location: loc(),
                }),
                next: Box::new(Term::Var {
                    text: "x".into(),
                    location: loc(),
                }),
                location: loc(),
            },
            location: None,
        };
        assert!(build_program(&file).is_err());
    }

    #[test]
    fn recursive_function_let_can_reference_itself() {
        let file = coral_ast::File {
            name: "t".into(),
            expression: Term::Let {
                name: Parameter {
                    text: "f".into(),
                    location: loc(),
                },
                value: Box::new(Term::Function {
                    parameters: vec![],
                    value: Box::new(Term::Var {
                        text: "f".into(),
                        location: loc(),
                    }),
                    location: loc(),
                }),
                next: Box::new(Term::Var {
                    text: "f".into(),
                    location: loc(),
                }),
                location: loc(),
            },
            location: None,
        };
        let (ast, _scopes, _root_scope, root) = build_program(&file).unwrap();
        match &ast.node(root).kind {
            NodeKind::Let { binding, .. } => assert!(binding.is_some()),
            other => panic!("expected Let, got {other:?}"),
        }
    }

    #[test]
    fn underscore_binding_cannot_be_referenced() {
        let file = coral_ast::File {
            name: "t".into(),
            expression: Term::Let {
                name: Parameter {
                    text: "_".into(),
                    location: loc(),
                },
                value: Box::new(Term::Int {
                    value: 1,
                    location: loc(),
                }),
                next: Box::new(Term::Var {
                    text: "_".into(),
                    location: loc(),
                }),
                location: loc(),
            },
            location: None,
        };
        assert!(build_program(&file).is_err());
    }

    #[test]
    fn if_branches_get_isolated_scopes() {
        let file = coral_ast::File {
            name: "t".into(),
            expression: Term::If {
                condition: Box::new(Term::Bool {
                    value: true,
                    location: loc(),
                }),
                then: Box::new(Term::Let {
                    name: Parameter {
                        text: "y".into(),
                        location: loc(),
                    },
                    value: Box::new(Term::Int {
                        value: 1,
                        location: loc(),
                    }),
                    next: Box::new(Term::Var {
                        text: "y".into(),
                        location: loc(),
                    }),
                    location: loc(),
                }),
                otherwise: Box::new(Term::Var {
                    text: "y".into(),
                    location: loc(),
                }),
                location: loc(),
            },
            location: None,
        };
        assert!(build_program(&file).is_err());
    }
}
