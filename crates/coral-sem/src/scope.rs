//! Lexical scoping: write-once bindings, parent-chain resolution, and
//! capture tracking for closures.
//!
//! Mirrors `TypeScope`/`ScopeVar`/`ScopeCapture` from the reference
//! implementation: `declare` fails on redeclaration in the same scope,
//! `resolve` walks the parent chain and records a stable capture index the
//! first time a name is found outside the current scope.

use coral_util::define_idx;
use indexmap::IndexMap;

use crate::types::Type;

define_idx!(ScopeId);
define_idx!(ScopeVarId);

/// A named write-once binding with a mutable current type and a dirty flag
/// consulted by the inference fixed point.
#[derive(Debug, Clone)]
pub struct ScopeVar {
    pub name: String,
    pub ty: Type,
    /// Position among this scope's locals, in declaration order.
    pub local_index: usize,
    pub dirty: bool,
}

impl ScopeVar {
    /// Updates the type if it changed (by equality), setting the dirty flag.
    pub fn may_change(&mut self, new_type: Type) {
        if new_type != self.ty {
            self.ty = new_type;
            self.dirty = true;
        }
    }
}

/// Records that a function scope captured a name from an ancestor scope.
#[derive(Debug, Clone)]
pub struct ScopeCapture {
    pub var: ScopeVarId,
    /// Number of scope hops from the capturing scope to the declaring scope.
    pub distance: u32,
    /// Stable index among this scope's captures, in first-reference order.
    pub capture_index: usize,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub locals: IndexMap<String, ScopeVarId>,
    pub nonlocals: IndexMap<String, ScopeCapture>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopeError {
    #[error("identifier '{0}' has already been declared")]
    AlreadyDeclared(String),
    #[error("identifier '{0}' is not defined")]
    Undefined(String),
    #[error("'_' cannot be referenced, it introduces no binding")]
    UnderscoreReference,
}

/// Owns every [`Scope`] and [`ScopeVar`] for one compilation as flat arenas,
/// so references between them are stable indices rather than owning pointers.
#[derive(Default)]
pub struct ScopeTree {
    scopes: coral_util::IndexVec<ScopeId, Scope>,
    vars: coral_util::IndexVec<ScopeVarId, ScopeVar>,
}

impl ScopeTree {
    pub fn new() -> (Self, ScopeId) {
        let mut tree = ScopeTree {
            scopes: coral_util::IndexVec::new(),
            vars: coral_util::IndexVec::new(),
        };
        let root = tree.scopes.push(Scope {
            parent: None,
            locals: IndexMap::new(),
            nonlocals: IndexMap::new(),
        });
        (tree, root)
    }

    pub fn child_of(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            locals: IndexMap::new(),
            nonlocals: IndexMap::new(),
        })
    }

    /// Declares `name` in `scope`. `_` is never declared and yields `None`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: Type,
    ) -> Result<Option<ScopeVarId>, ScopeError> {
        if name == "_" {
            return Ok(None);
        }
        if self.scopes[scope].locals.contains_key(name) {
            return Err(ScopeError::AlreadyDeclared(name.to_string()));
        }
        let local_index = self.scopes[scope].locals.len();
        let id = self.vars.push(ScopeVar {
            name: name.to_string(),
            ty,
            local_index,
            dirty: false,
        });
        self.scopes[scope].locals.insert(name.to_string(), id);
        Ok(Some(id))
    }

    /// Resolves `name` starting at `scope`: locals, then recorded captures,
    /// then the parent chain (recording a new capture on first cross-scope hit).
    pub fn resolve(&mut self, scope: ScopeId, name: &str) -> Result<ScopeVarId, ScopeError> {
        if name == "_" {
            return Err(ScopeError::UnderscoreReference);
        }
        if let Some(&id) = self.scopes[scope].locals.get(name) {
            return Ok(id);
        }
        if let Some(capture) = self.scopes[scope].nonlocals.get(name) {
            return Ok(capture.var);
        }
        let (var, distance) = self.reflookup(scope, name, 0)?;
        let capture_index = self.scopes[scope].nonlocals.len();
        self.scopes[scope].nonlocals.insert(
            name.to_string(),
            ScopeCapture {
                var,
                distance,
                capture_index,
            },
        );
        Ok(var)
    }

    fn reflookup(
        &self,
        scope: ScopeId,
        name: &str,
        distance: u32,
    ) -> Result<(ScopeVarId, u32), ScopeError> {
        if let Some(&id) = self.scopes[scope].locals.get(name) {
            return Ok((id, distance));
        }
        match self.scopes[scope].parent {
            Some(parent) => self.reflookup(parent, name, distance + 1),
            None => Err(ScopeError::Undefined(name.to_string())),
        }
    }

    /// Retrieves a var visible from `scope` without recording a capture;
    /// used when re-reading a binding already known to be in scope.
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<ScopeVarId> {
        if let Some(&id) = self.scopes[scope].locals.get(name) {
            return Some(id);
        }
        self.scopes[scope]
            .parent
            .and_then(|parent| self.get(parent, name))
    }

    pub fn var(&self, id: ScopeVarId) -> &ScopeVar {
        &self.vars[id]
    }

    pub fn var_mut(&mut self, id: ScopeVarId) -> &mut ScopeVar {
        &mut self.vars[id]
    }

    pub fn captures(&self, scope: ScopeId) -> impl Iterator<Item = &ScopeCapture> {
        self.scopes[scope].nonlocals.values()
    }

    /// All ScopeVars, flat, in declaration order - the list the fixed-point
    /// driver walks after each full inference pass.
    pub fn all_var_ids(&self) -> impl Iterator<Item = ScopeVarId> + '_ {
        self.vars.indices()
    }

    pub fn clear_dirty_flags(&mut self) {
        for var in self.vars.as_mut_slice() {
            var.dirty = false;
        }
    }

    pub fn any_dirty(&self) -> bool {
        self.vars.as_slice().iter().any(|v| v.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_then_resolve_same_scope() {
        let (mut tree, root) = ScopeTree::new();
        let id = tree.declare(root, "x", Type::Integer).unwrap().unwrap();
        assert_eq!(tree.resolve(root, "x").unwrap(), id);
    }

    #[test]
    fn redeclaration_is_an_error() {
        let (mut tree, root) = ScopeTree::new();
        tree.declare(root, "x", Type::Integer).unwrap();
        assert!(matches!(
            tree.declare(root, "x", Type::Integer),
            Err(ScopeError::AlreadyDeclared(_))
        ));
    }

    #[test]
    fn underscore_never_declares() {
        let (mut tree, root) = ScopeTree::new();
        assert_eq!(tree.declare(root, "_", Type::Integer).unwrap(), None);
        assert!(matches!(
            tree.resolve(root, "_"),
            Err(ScopeError::UnderscoreReference)
        ));
    }

    #[test]
    fn resolves_through_parent_and_records_capture() {
        let (mut tree, root) = ScopeTree::new();
        let outer = tree.declare(root, "x", Type::Integer).unwrap().unwrap();
        let child = tree.child_of(root);
        let resolved = tree.resolve(child, "x").unwrap();
        assert_eq!(resolved, outer);
        let captures: Vec<_> = tree.captures(child).collect();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].var, outer);
        assert_eq!(captures[0].distance, 1);
    }

    #[test]
    fn repeated_capture_reuses_same_index() {
        let (mut tree, root) = ScopeTree::new();
        tree.declare(root, "x", Type::Integer).unwrap();
        let child = tree.child_of(root);
        let first = tree.resolve(child, "x").unwrap();
        let second = tree.resolve(child, "x").unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.captures(child).count(), 1);
    }

    #[test]
    fn undefined_name_is_an_error() {
        let (mut tree, root) = ScopeTree::new();
        assert!(matches!(
            tree.resolve(root, "missing"),
            Err(ScopeError::Undefined(_))
        ));
    }

    #[test]
    fn fixed_point_dirty_tracking() {
        let (mut tree, root) = ScopeTree::new();
        let id = tree.declare(root, "x", Type::Any).unwrap().unwrap();
        tree.clear_dirty_flags();
        assert!(!tree.any_dirty());
        tree.var_mut(id).may_change(Type::Integer);
        assert!(tree.any_dirty());
        tree.clear_dirty_flags();
        assert!(!tree.any_dirty());
    }
}
