//! The typed AST: an arena of nodes carrying a mutable [`Type`], built once
//! from a [`coral_ast::Term`] tree and then refined in place by the
//! inference fixed point.
//!
//! Nodes reference each other by [`NodeId`] rather than by pointer or
//! `Box`, so the tree can record parent pointers (needed by return-type
//! propagation) without a cycle. A node's parent is set retroactively after
//! the parent itself is pushed, mirroring how the reference builder
//! constructs a child with no parent and patches it in once the enclosing
//! node exists.

use coral_ast::{BinaryOp, Location};
use coral_util::define_idx;

use crate::scope::ScopeId;
use crate::types::Type;

define_idx!(NodeId);

#[derive(Debug, Clone)]
pub enum NodeKind {
    BoolLit(bool),
    IntLit(i64),
    StringLit(String),
    /// A use of a binding; resolves to the [`crate::scope::ScopeVarId`] it refers to.
    Reference(crate::scope::ScopeVarId),
    Tuple {
        first: NodeId,
        second: NodeId,
    },
    First(NodeId),
    Second(NodeId),
    Print(NodeId),
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Conditional {
        condition: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    Function {
        /// One slot per declared parameter, in order; `None` where the
        /// parameter is `_` and binds nothing. Kept positional (rather than
        /// filtered) so the slot index always matches the call-site argument
        /// index regardless of how many parameters are `_`.
        params: Vec<Option<crate::scope::ScopeVarId>>,
        body: NodeId,
        /// Set when the function was bound by a named (self-recursive) `let`.
        binding: Option<crate::scope::ScopeVarId>,
    },
    Let {
        binding: Option<crate::scope::ScopeVarId>,
        value: NodeId,
        next: NodeId,
    },
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    /// Inserted by semantic validation when a statically-typed position is
    /// fed a non-static operand; checked and unboxed at codegen time.
    TypeCheck {
        value: NodeId,
        expected: Type,
    },
}

#[derive(Debug, Clone)]
pub struct TypedNode {
    pub kind: NodeKind,
    pub ty: Type,
    pub parent: Option<NodeId>,
    pub scope: ScopeId,
    pub location: Location,
}

/// Owns every [`TypedNode`] for one compilation unit.
pub struct TypedAst {
    nodes: coral_util::IndexVec<NodeId, TypedNode>,
    pub root: Option<NodeId>,
}

impl Default for TypedAst {
    fn default() -> Self {
        TypedAst {
            nodes: coral_util::IndexVec::new(),
            root: None,
        }
    }
}

impl TypedAst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a freshly built node with no parent yet; the caller patches
    /// `set_parent` in once the enclosing node has been pushed too.
    pub fn push(&mut self, kind: NodeKind, ty: Type, scope: ScopeId, location: Location) -> NodeId {
        self.nodes.push(TypedNode {
            kind,
            ty,
            parent: None,
            scope,
            location,
        })
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child].parent = Some(parent);
    }

    pub fn node(&self, id: NodeId) -> &TypedNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TypedNode {
        &mut self.nodes[id]
    }

    pub fn ty(&self, id: NodeId) -> &Type {
        &self.nodes[id].ty
    }

    pub fn set_ty(&mut self, id: NodeId, ty: Type) {
        self.nodes[id].ty = ty;
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
