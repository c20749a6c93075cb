//! coral-util - core utilities shared by every compiler crate.
//!
//! Provides string interning, typed arena indices, source spans and
//! diagnostics, and the `DefId` identity type used by the typed AST.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level};
pub use error::{DiagnosticError, IndexVecError, SourceMapError, SymbolError};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;

// Re-export commonly used hashing types so downstream crates standardize on
// the same fast, non-DoS-resistant maps used for identifier-keyed tables.
pub use rustc_hash::{FxHashMap, FxHashSet};

/// Macro to define a typed arena index in one line.
///
/// ```
/// coral_util::define_idx!(NodeId);
/// let mut nodes: coral_util::IndexVec<NodeId, &str> = coral_util::IndexVec::new();
/// let id = nodes.push("root");
/// assert_eq!(nodes[id], "root");
/// ```
#[macro_export]
macro_rules! define_idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
