//! The native type lattice: Any/Undefined/Boolean/Integer/String/Tuple/Function/Union.
//!
//! `union` widens, `lower` narrows (a.k.a. intersect). Any and Undefined are
//! absorbing elements; the precedence below mirrors the reference semantics
//! bit for bit, including the asymmetry where the left-hand operand's
//! Any/Undefined-ness takes priority over the right's.

use indexmap::IndexMap;

/// The tag distinguishing a [`Type`]'s shape, used as the key of a [`Type::Union`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    Any,
    Undefined,
    Boolean,
    Integer,
    String,
    Tuple,
    Function,
    Union,
}

/// A type in the native lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Undefined,
    Boolean,
    Integer,
    String,
    Tuple(Box<Type>, Box<Type>),
    Function(Vec<Type>, Box<Type>),
    /// Members are keyed by kind; never contains Any, Undefined, or Union.
    Union(IndexMap<TypeKind, Type>),
}

impl Type {
    pub fn tuple_any() -> Type {
        Type::Tuple(Box::new(Type::Any), Box::new(Type::Any))
    }

    pub fn union_of(members: impl IntoIterator<Item = Type>) -> Type {
        let mut map = IndexMap::new();
        for member in members {
            map.insert(member.kind(), member);
        }
        Type::Union(map)
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Any => TypeKind::Any,
            Type::Undefined => TypeKind::Undefined,
            Type::Boolean => TypeKind::Boolean,
            Type::Integer => TypeKind::Integer,
            Type::String => TypeKind::String,
            Type::Tuple(..) => TypeKind::Tuple,
            Type::Function(..) => TypeKind::Function,
            Type::Union(..) => TypeKind::Union,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Type::Any | Type::Undefined | Type::Union(_) => false,
            Type::Boolean | Type::Integer | Type::String => true,
            Type::Tuple(first, second) => first.is_static() && second.is_static(),
            Type::Function(params, ret) => ret.is_static() && params.iter().all(Type::is_static),
        }
    }

    /// True iff `lower(self, other)` contains no Any operand at any depth.
    pub fn lowers_any(&self, other: &Type) -> bool {
        !self.lower(other).contains_any()
    }

    fn contains_any(&self) -> bool {
        match self {
            Type::Any => true,
            Type::Undefined | Type::Boolean | Type::Integer | Type::String => false,
            Type::Tuple(first, second) => first.contains_any() || second.contains_any(),
            Type::Function(params, ret) => {
                ret.contains_any() || params.iter().any(Type::contains_any)
            }
            Type::Union(members) => members.values().any(Type::contains_any),
        }
    }

    /// Widen this type with `other`. Absorbing: the left operand wins if it
    /// is Any or Undefined, otherwise the right operand wins if it is.
    pub fn union(&self, other: &Type) -> Type {
        if matches!(self, Type::Any | Type::Undefined) {
            return self.clone();
        }
        if matches!(other, Type::Any | Type::Undefined) {
            return other.clone();
        }
        if let Type::Union(_) = other {
            return other.union(self);
        }
        if let Type::Function(..) = self {
            return self.union_function(other);
        }
        if let Type::Function(..) = other {
            return other.union(self);
        }
        match (self, other) {
            (Type::Tuple(a1, a2), Type::Tuple(b1, b2)) => {
                Type::Tuple(Box::new(a1.union(b1)), Box::new(a2.union(b2)))
            }
            (a, b) if a.kind() != b.kind() => Type::union_of([a.clone(), b.clone()]),
            (a, _) => a.clone(),
        }
    }

    fn union_function(&self, other: &Type) -> Type {
        let (params, ret) = match self {
            Type::Function(p, r) => (p, r),
            _ => unreachable!(),
        };
        match other {
            Type::Function(other_params, other_ret) => {
                if params.len() != other_params.len() {
                    return Type::Undefined;
                }
                let merged = params
                    .iter()
                    .zip(other_params.iter())
                    .map(|(p, q)| p.union(q))
                    .collect();
                Type::Function(merged, Box::new(ret.union(other_ret)))
            }
            _ => Type::union_of([self.clone(), other.clone()]),
        }
    }

    /// Narrow (intersect) this type with `other`.
    pub fn lower(&self, other: &Type) -> Type {
        if matches!(self, Type::Undefined) {
            return self.clone();
        }
        if matches!(other, Type::Undefined) {
            return other.clone();
        }
        if matches!(self, Type::Any) {
            return other.clone();
        }
        if matches!(other, Type::Any) {
            return self.clone();
        }
        if let Type::Union(_) = other {
            return other.lower(self);
        }
        match self {
            Type::Union(members) => lower_union(members, other),
            Type::Function(params, ret) => lower_function(params, ret, other),
            Type::Tuple(a1, a2) => match other {
                Type::Tuple(b1, b2) => Type::Tuple(Box::new(a1.lower(b1)), Box::new(a2.lower(b2))),
                _ => Type::Undefined,
            },
            _ if self.kind() != other.kind() => Type::Undefined,
            _ => self.clone(),
        }
    }
}

fn lower_union(members: &IndexMap<TypeKind, Type>, other: &Type) -> Type {
    if let Type::Union(other_members) = other {
        let mut intersection = IndexMap::new();
        for (kind, member) in members {
            if let Some(other_member) = other_members.get(kind) {
                intersection.insert(*kind, member.lower(other_member));
            }
        }
        if intersection.is_empty() {
            Type::Undefined
        } else {
            Type::Union(intersection)
        }
    } else {
        match members.get(&other.kind()) {
            Some(member) => member.lower(other),
            None => Type::Undefined,
        }
    }
}

fn lower_function(params: &[Type], ret: &Type, other: &Type) -> Type {
    match other {
        Type::Function(other_params, other_ret) => {
            if params.len() != other_params.len() {
                return Type::Undefined;
            }
            let merged = params
                .iter()
                .zip(other_params.iter())
                .map(|(p, q)| p.lower(q))
                .collect();
            Type::Function(merged, Box::new(ret.lower(other_ret)))
        }
        _ => Type::Undefined,
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::Undefined => write!(f, "Undefined"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Integer => write!(f, "Integer"),
            Type::String => write!(f, "String"),
            Type::Tuple(a, b) => write!(f, "Tuple<{a}, {b}>"),
            Type::Function(params, ret) => {
                write!(f, "Function((")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "),{ret})")
            }
            Type::Union(members) => {
                for (i, member) in members.values().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_absorbs_on_union() {
        assert_eq!(Type::Any.union(&Type::Integer), Type::Any);
        assert_eq!(Type::Integer.union(&Type::Any), Type::Any);
    }

    #[test]
    fn undefined_absorbs_on_union() {
        assert_eq!(Type::Undefined.union(&Type::Integer), Type::Undefined);
        assert_eq!(Type::Integer.union(&Type::Undefined), Type::Undefined);
    }

    #[test]
    fn any_is_identity_on_lower() {
        assert_eq!(Type::Any.lower(&Type::Integer), Type::Integer);
        assert_eq!(Type::Integer.lower(&Type::Any), Type::Integer);
    }

    #[test]
    fn undefined_absorbs_on_lower() {
        assert_eq!(Type::Undefined.lower(&Type::Integer), Type::Undefined);
        assert_eq!(Type::Integer.lower(&Type::Undefined), Type::Undefined);
    }

    #[test]
    fn same_type_lower_is_identity() {
        assert_eq!(Type::Integer.lower(&Type::Integer), Type::Integer);
    }

    #[test]
    fn distinct_concrete_kinds_union_to_a_union() {
        let u = Type::Integer.union(&Type::String);
        match u {
            Type::Union(members) => {
                assert_eq!(members.len(), 2);
                assert!(members.contains_key(&TypeKind::Integer));
                assert!(members.contains_key(&TypeKind::String));
            }
            other => panic!("expected Union, got {other:?}"),
        }
    }

    #[test]
    fn distinct_concrete_kinds_lower_to_undefined() {
        assert_eq!(Type::Integer.lower(&Type::String), Type::Undefined);
    }

    #[test]
    fn tuple_combines_pointwise() {
        let a = Type::Tuple(Box::new(Type::Any), Box::new(Type::Integer));
        let b = Type::Tuple(Box::new(Type::Boolean), Box::new(Type::Any));
        let merged = a.lower(&b);
        assert_eq!(
            merged,
            Type::Tuple(Box::new(Type::Boolean), Box::new(Type::Integer))
        );
    }

    #[test]
    fn function_arity_mismatch_lowers_to_undefined() {
        let f1 = Type::Function(vec![Type::Integer], Box::new(Type::Integer));
        let f2 = Type::Function(vec![Type::Integer, Type::Integer], Box::new(Type::Integer));
        assert_eq!(f1.lower(&f2), Type::Undefined);
    }

    #[test]
    fn is_static_table() {
        assert!(!Type::Any.is_static());
        assert!(!Type::Undefined.is_static());
        assert!(Type::Boolean.is_static());
        assert!(Type::Integer.is_static());
        assert!(Type::String.is_static());
        assert!(Type::Tuple(Box::new(Type::Integer), Box::new(Type::Integer)).is_static());
        assert!(!Type::Tuple(Box::new(Type::Any), Box::new(Type::Integer)).is_static());
        assert!(!Type::union_of([Type::Integer, Type::String]).is_static());
    }

    #[test]
    fn lower_law_holds() {
        // lower(A, union(A, B)) == A
        let a = Type::Integer;
        let b = Type::String;
        let u = a.union(&b);
        assert_eq!(a.lower(&u), a);
    }

    #[test]
    fn union_law_holds() {
        // union(A, lower(A, B)) == A
        let a = Type::Integer;
        let b = Type::Integer;
        let l = a.lower(&b);
        assert_eq!(a.union(&l), a);
    }

    #[test]
    fn lowers_any_detects_any_at_depth() {
        let tuple_with_any = Type::Tuple(Box::new(Type::Any), Box::new(Type::Integer));
        assert!(!Type::tuple_any().lowers_any(&tuple_with_any));
        assert!(Type::Integer.lowers_any(&Type::Integer));
    }
}
