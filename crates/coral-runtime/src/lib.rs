//! coral-runtime - the boxed `%Object` ABI `coral-gen` compiles calls into.
//!
//! No tracing collector: every `%Object` carries a manual refcount, bumped
//! on capture and tuple construction and released in one batch when the
//! owning closure's generated function returns (see `coral-gen`'s per-frame
//! `gc_list`). This is coarser than a precise per-binding free - an object
//! extracted from a tuple or read out of a capture lives exactly as long as
//! its containing frame - but it matches the ABI's flat, non-tracing
//! contract without needing a full escape analysis.

mod object;
pub mod ops;

pub use object::{FunctionPayload, Object, ObjectTag, StringPayload, TuplePayload};
