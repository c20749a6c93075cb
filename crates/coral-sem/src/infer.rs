//! Bidirectional type inference over the typed AST.
//!
//! Every node accepts a *supertype* - the tightest type the surrounding
//! context can accept - and returns the type it actually inferred, which is
//! always `lowers_any` of the supertype. A full pass over the tree is run
//! to a fixed point: each [`crate::scope::ScopeVar`] tracks whether its type
//! changed this round, and the driver repeats the pass until a round leaves
//! every var unchanged. `if`/`else` arms feed their type back into an
//! enclosing function's return type as they're inferred, which is what lets
//! a self-recursive function's return type stabilize without a second pass
//! over the call site.

use crate::scope::ScopeTree;
use crate::typed_ast::{NodeId, NodeKind, TypedAst};
use crate::types::Type;

#[derive(Debug, Clone, thiserror::Error)]
pub enum InferError {
    #[error("type inference did not reach a fixed point after {0} rounds")]
    Diverged(usize),
}

/// Runs the fixed-point inference loop over the whole program.
pub fn infer_program(
    scopes: &mut ScopeTree,
    ast: &mut TypedAst,
    root: NodeId,
) -> Result<(), InferError> {
    let cap = ast.len().saturating_mul(4).max(64);
    let mut rounds = 0usize;
    loop {
        scopes.clear_dirty_flags();
        infer(scopes, ast, root, &Type::Any);
        if !scopes.any_dirty() {
            return Ok(());
        }
        rounds += 1;
        if rounds > cap {
            return Err(InferError::Diverged(rounds));
        }
    }
}

/// Infers `node`'s type against `supertype`, updating the node and any
/// [`crate::scope::ScopeVar`]s it touches in place, and returns the result.
pub fn infer(scopes: &mut ScopeTree, ast: &mut TypedAst, node: NodeId, supertype: &Type) -> Type {
    let kind = ast.node(node).kind.clone();
    let result = match kind {
        NodeKind::BoolLit(_) => Type::Boolean.lower(supertype),
        NodeKind::IntLit(_) => Type::Integer.lower(supertype),
        NodeKind::StringLit(_) => Type::String.lower(supertype),

        NodeKind::Reference(var) => {
            let current = scopes.var(var).ty.clone();
            let narrowed = current.lower(supertype);
            scopes.var_mut(var).may_change(narrowed);
            scopes.var(var).ty.clone()
        }

        NodeKind::Tuple { first, second } => {
            let supertuple = Type::tuple_any().lower(supertype);
            match supertuple {
                Type::Tuple(first_super, second_super) => {
                    let first_ty = infer(scopes, ast, first, &first_super);
                    let second_ty = infer(scopes, ast, second, &second_super);
                    Type::Tuple(Box::new(first_ty), Box::new(second_ty))
                }
                undefined => undefined,
            }
        }

        NodeKind::First(value) => {
            let probe = Type::Tuple(Box::new(supertype.clone()), Box::new(Type::Any));
            match infer(scopes, ast, value, &probe) {
                Type::Tuple(first, _) => *first,
                _ => Type::Undefined,
            }
        }
        NodeKind::Second(value) => {
            let probe = Type::Tuple(Box::new(Type::Any), Box::new(supertype.clone()));
            match infer(scopes, ast, value, &probe) {
                Type::Tuple(_, second) => *second,
                _ => Type::Undefined,
            }
        }

        NodeKind::Print(value) => infer(scopes, ast, value, supertype),

        NodeKind::Binary { op, lhs, rhs } => infer_binary(scopes, ast, op, lhs, rhs, supertype),

        NodeKind::Conditional {
            condition,
            then,
            otherwise,
        } => {
            infer(scopes, ast, condition, &Type::Boolean);
            let then_ty = infer(scopes, ast, then, supertype);
            propagate_return(scopes, ast, node, &then_ty);
            let otherwise_ty = infer(scopes, ast, otherwise, supertype);
            propagate_return(scopes, ast, node, &otherwise_ty);
            then_ty.union(&otherwise_ty)
        }

        NodeKind::Function { params, body, .. } => {
            infer_function(scopes, ast, node, &params, body, supertype)
        }

        NodeKind::Let {
            binding,
            value,
            next,
        } => {
            let binding_ty = match binding {
                Some(var) => scopes.var(var).ty.clone(),
                None => Type::Any,
            };
            let value_ty = infer(scopes, ast, value, &binding_ty);
            if let Some(var) = binding {
                let current = scopes.var(var).ty.clone();
                let narrowed = current.lower(&value_ty);
                scopes.var_mut(var).may_change(narrowed);
            }
            infer(scopes, ast, next, supertype)
        }

        NodeKind::Call { callee, arguments } => infer_call(scopes, ast, callee, &arguments, supertype),

        NodeKind::TypeCheck { value, expected } => {
            infer(scopes, ast, value, &expected);
            expected.lower(supertype)
        }
    };
    ast.set_ty(node, result.clone());
    result
}

fn infer_binary(
    scopes: &mut ScopeTree,
    ast: &mut TypedAst,
    op: coral_ast::BinaryOp,
    lhs: NodeId,
    rhs: NodeId,
    supertype: &Type,
) -> Type {
    use coral_ast::BinaryOp::*;

    match op {
        Add => {
            let addends = Type::union_of([Type::Integer, Type::String]);
            let lhs_ty = infer(scopes, ast, lhs, &addends);
            let rhs_ty = infer(scopes, ast, rhs, &addends);
            let addop = addends.lower(supertype);
            if matches!(addop, Type::Undefined)
                || matches!(lhs_ty, Type::Undefined | Type::Union(_))
                || matches!(rhs_ty, Type::Undefined | Type::Union(_))
            {
                addop
            } else if matches!(lhs_ty, Type::Integer) && matches!(rhs_ty, Type::Integer) {
                Type::Integer
            } else {
                Type::String
            }
        }
        Sub | Mul | Div | Rem => {
            let lhs_ty = infer(scopes, ast, lhs, &Type::Integer);
            let rhs_ty = infer(scopes, ast, rhs, &Type::Integer);
            fixed_result_with_fallback(Type::Integer, supertype, &lhs_ty, &rhs_ty)
        }
        Lt | Lte | Gt | Gte => {
            let lhs_ty = infer(scopes, ast, lhs, &Type::Integer);
            let rhs_ty = infer(scopes, ast, rhs, &Type::Integer);
            fixed_result_with_fallback(Type::Boolean, supertype, &lhs_ty, &rhs_ty)
        }
        And | Or => {
            let lhs_ty = infer(scopes, ast, lhs, &Type::Boolean);
            let rhs_ty = infer(scopes, ast, rhs, &Type::Boolean);
            fixed_result_with_fallback(Type::Boolean, supertype, &lhs_ty, &rhs_ty)
        }
        Eq | Neq => {
            let comparable = Type::union_of([Type::Boolean, Type::Integer, Type::String]);
            let lhs_ty = infer(scopes, ast, lhs, &comparable);
            let rhs_super = if lhs_ty.is_static() { lhs_ty.clone() } else { comparable };
            let rhs_ty = infer(scopes, ast, rhs, &rhs_super);
            fixed_result_with_fallback(Type::Boolean, supertype, &lhs_ty, &rhs_ty)
        }
    }
}

/// `resultType.lower(supertype)`, except Undefined propagation from either
/// operand or from the lowering itself falls back to `result_type` as-is.
fn fixed_result_with_fallback(
    result_type: Type,
    supertype: &Type,
    lhs_ty: &Type,
    rhs_ty: &Type,
) -> Type {
    let lowered = result_type.lower(supertype);
    if matches!(lowered, Type::Undefined)
        || matches!(lhs_ty, Type::Undefined)
        || matches!(rhs_ty, Type::Undefined)
    {
        result_type
    } else {
        lowered
    }
}

fn infer_function(
    scopes: &mut ScopeTree,
    ast: &mut TypedAst,
    node: NodeId,
    params: &[Option<crate::scope::ScopeVarId>],
    body: NodeId,
    supertype: &Type,
) -> Type {
    let current = ast.ty(node).clone();
    let lowered = current.lower(supertype);
    match &lowered {
        Type::Function(param_supers, return_super) if param_supers.len() == params.len() => {
            for (var, param_super) in params.iter().zip(param_supers.iter()) {
                if let Some(var) = var {
                    let cur = scopes.var(*var).ty.clone();
                    let narrowed = cur.lower(param_super);
                    scopes.var_mut(*var).may_change(narrowed);
                }
            }
            let body_result = infer(scopes, ast, body, return_super);
            let actual_params: Vec<Type> = params
                .iter()
                .zip(param_supers.iter())
                .map(|(v, param_super)| match v {
                    Some(v) => scopes.var(*v).ty.clone(),
                    // `_` binds nothing to narrow; its slot stays whatever
                    // the supertype already demanded.
                    None => param_super.clone(),
                })
                .collect();
            let new_signature = Type::Function(actual_params, Box::new(body_result));
            let lowered_again = new_signature.lower(supertype);
            if matches!(lowered_again, Type::Function(..)) {
                return lowered_again;
            }
            lowered
        }
        _ => lowered,
    }
}

/// Forwards a tail `if`/`else` branch's inferred type up to the nearest
/// enclosing function, walking transparently through `let`/`if` parents.
fn propagate_return(scopes: &mut ScopeTree, ast: &mut TypedAst, from: NodeId, new_return: &Type) {
    let mut cursor = ast.parent(from);
    while let Some(id) = cursor {
        match &ast.node(id).kind {
            NodeKind::Let { .. } | NodeKind::Conditional { .. } => cursor = ast.parent(id),
            NodeKind::Function { .. } => {
                typecheck_return(scopes, ast, id, new_return);
                return;
            }
            _ => return,
        }
    }
}

/// Refines a named function's own return type and, if it's bound to a name
/// (self-recursion), the binding's type too - without touching the body.
fn typecheck_return(scopes: &mut ScopeTree, ast: &mut TypedAst, func_node: NodeId, new_return: &Type) {
    let binding = match &ast.node(func_node).kind {
        NodeKind::Function { binding, .. } => *binding,
        _ => return,
    };
    let current = ast.ty(func_node).clone();
    let params = match &current {
        Type::Function(params, _) => params.clone(),
        _ => return,
    };
    let candidate = Type::Function(params, Box::new(new_return.clone()));
    let lowered = current.lower(&candidate);
    if matches!(lowered, Type::Function(..)) {
        ast.set_ty(func_node, lowered.clone());
        if let Some(var) = binding {
            let cur = scopes.var(var).ty.clone();
            let narrowed = cur.lower(&lowered);
            scopes.var_mut(var).may_change(narrowed);
        }
    }
}

fn infer_call(
    scopes: &mut ScopeTree,
    ast: &mut TypedAst,
    callee: NodeId,
    arguments: &[NodeId],
    supertype: &Type,
) -> Type {
    let callee_peek = ast.ty(callee).clone();
    let arg_supers: Vec<Type> = match &callee_peek {
        Type::Function(params, _) if params.len() == arguments.len() => params.clone(),
        _ => vec![Type::Any; arguments.len()],
    };
    let arg_results: Vec<Type> = arguments
        .iter()
        .zip(arg_supers.iter())
        .map(|(arg, arg_super)| infer(scopes, ast, *arg, arg_super))
        .collect();
    let expected_signature = Type::Function(arg_results, Box::new(supertype.clone()));
    let signature = infer(scopes, ast, callee, &expected_signature);
    match signature {
        Type::Function(_, ret) => *ret,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_program;
    use coral_ast::{Location, Parameter, Term};

    fn loc() -> Location {
        Location::dummy()
    }

    fn run(expr: Term) -> (TypedAst, ScopeTree, NodeId) {
        let file = coral_ast::File {
            name: "t".into(),
            expression: expr,
            location: None,
        };
        let (mut ast, mut scopes, _root_scope, root) = build_program(&file).unwrap();
        infer_program(&mut scopes, &mut ast, root).unwrap();
        (ast, scopes, root)
    }

    #[test]
    fn literal_infers_its_own_type() {
        let (ast, _scopes, root) = run(Term::Int {
            value: 1,
            location: loc(),
        });
        assert_eq!(*ast.ty(root), Type::Integer);
    }

    #[test]
    fn addition_of_two_integers_is_integer() {
        let expr = Term::Binary {
            lhs: Box::new(Term::Int { value: 1, location: loc() }),
            op: coral_ast::BinaryOp::Add,
            rhs: Box::new(Term::Int { value: 2, location: loc() }),
            location: loc(),
        };
        let (ast, _scopes, root) = run(expr);
        assert_eq!(*ast.ty(root), Type::Integer);
    }

    #[test]
    fn addition_of_two_strings_is_string() {
        let expr = Term::Binary {
            lhs: Box::new(Term::Str { value: "a".into(), location: loc() }),
            op: coral_ast::BinaryOp::Add,
            rhs: Box::new(Term::Str { value: "b".into(), location: loc() }),
            location: loc(),
        };
        let (ast, _scopes, root) = run(expr);
        assert_eq!(*ast.ty(root), Type::String);
    }

    #[test]
    fn comparison_is_boolean() {
        let expr = Term::Binary {
            lhs: Box::new(Term::Int { value: 1, location: loc() }),
            op: coral_ast::BinaryOp::Lt,
            rhs: Box::new(Term::Int { value: 2, location: loc() }),
            location: loc(),
        };
        let (ast, _scopes, root) = run(expr);
        assert_eq!(*ast.ty(root), Type::Boolean);
    }

    #[test]
    fn conditional_unions_branch_types() {
        let expr = Term::If {
            condition: Box::new(Term::Bool { value: true, location: loc() }),
            then: Box::new(Term::Int { value: 1, location: loc() }),
            otherwise: Box::new(Term::Str { value: "x".into(), location: loc() }),
            location: loc(),
        };
        let (ast, _scopes, root) = run(expr);
        match ast.ty(root) {
            Type::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn self_recursive_function_converges_on_integer_return() {
        // let fib = fn (n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib
        let body = Term::If {
            condition: Box::new(Term::Binary {
                lhs: Box::new(Term::Var { text: "n".into(), location: loc() }),
                op: coral_ast::BinaryOp::Lt,
                rhs: Box::new(Term::Int { value: 2, location: loc() }),
                location: loc(),
            }),
            then: Box::new(Term::Var { text: "n".into(), location: loc() }),
            otherwise: Box::new(Term::Binary {
                lhs: Box::new(Term::Call {
                    callee: Box::new(Term::Var { text: "fib".into(), location: loc() }),
                    arguments: vec![Term::Binary {
                        lhs: Box::new(Term::Var { text: "n".into(), location: loc() }),
                        op: coral_ast::BinaryOp::Sub,
                        rhs: Box::new(Term::Int { value: 1, location: loc() }),
                        location: loc(),
                    }],
                    location: loc(),
                }),
                op: coral_ast::BinaryOp::Add,
                rhs: Box::new(Term::Call {
                    callee: Box::new(Term::Var { text: "fib".into(), location: loc() }),
                    arguments: vec![Term::Binary {
                        lhs: Box::new(Term::Var { text: "n".into(), location: loc() }),
                        op: coral_ast::BinaryOp::Sub,
                        rhs: Box::new(Term::Int { value: 2, location: loc() }),
                        location: loc(),
                    }],
                    location: loc(),
                }),
                location: loc(),
            }),
            location: loc(),
        };
        let expr = Term::Let {
            name: Parameter { text: "fib".into(), location: loc() },
            value: Box::new(Term::Function {
                parameters: vec![Parameter { text: "n".into(), location: loc() }],
                value: Box::new(body),
                location: loc(),
            }),
            next: Box::new(Term::Var { text: "fib".into(), location: loc() }),
            location: loc(),
        };
        let (ast, _scopes, root) = run(expr);
        match ast.ty(root) {
            Type::Function(params, ret) => {
                assert_eq!(params.as_slice(), &[Type::Integer]);
                assert_eq!(**ret, Type::Integer);
            }
            other => panic!("expected Function(Integer)->Integer, got {other:?}"),
        }
    }

    #[test]
    fn tuple_access_round_trips() {
        let expr = Term::First {
            value: Box::new(Term::Tuple {
                first: Box::new(Term::Int { value: 1, location: loc() }),
                second: Box::new(Term::Bool { value: true, location: loc() }),
                location: loc(),
            }),
            location: loc(),
        };
        let (ast, _scopes, root) = run(expr);
        assert_eq!(*ast.ty(root), Type::Integer);
    }
}
