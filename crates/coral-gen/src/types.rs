//! Maps [`coral_sem::Type`] onto LLVM representations.
//!
//! Two representations exist side by side:
//!
//! - **Unboxed**: a bare `i1`/`i64` register, used wherever a node's static
//!   type is concretely `Boolean` or `Integer`. No allocation, no refcount.
//! - **Boxed**: a pointer to a heap `%Object` (tag + refcount + payload),
//!   used for `String`/`Tuple`/`Function` and anywhere the static type is
//!   `Any`/`Undefined`/a `Union` - i.e. whenever the value's shape isn't
//!   known until runtime.
//!
//! Every dynamic boundary (call argument, call return, tuple slot, `print`
//! operand) is boxed; this is the "specializing" part of the generator -
//! arithmetic on two statically-`Integer` operands never leaves unboxed
//! `i64` registers.

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, IntType, PointerType, StructType};
use inkwell::AddressSpace;

use coral_sem::{Type, TypeKind};

/// How a value of a given static [`Type`] is represented in generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// `i1`.
    Boolean,
    /// `i64`.
    Integer,
    /// `ptr` to a heap `%Object`.
    Boxed,
}

impl Repr {
    pub fn of(ty: &Type) -> Repr {
        match ty.kind() {
            TypeKind::Boolean => Repr::Boolean,
            TypeKind::Integer => Repr::Integer,
            _ => Repr::Boxed,
        }
    }

    pub fn is_boxed(self) -> bool {
        matches!(self, Repr::Boxed)
    }
}

/// Runtime tag values written into `%Object.tag`, matching `coral-runtime`'s
/// `ObjectTag` repr exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum ObjectTag {
    Undefined = 0,
    Boolean = 1,
    Integer = 2,
    String = 3,
    Tuple = 4,
    Function = 5,
}

impl ObjectTag {
    /// The tag a runtime [`NodeKind::TypeCheck`] checks against: only
    /// concrete kinds reach validation as an `expected` type, never
    /// `Any`/`Undefined`/`Union`.
    pub fn of(ty: &Type) -> ObjectTag {
        match ty.kind() {
            TypeKind::Boolean => ObjectTag::Boolean,
            TypeKind::Integer => ObjectTag::Integer,
            TypeKind::String => ObjectTag::String,
            TypeKind::Tuple => ObjectTag::Tuple,
            TypeKind::Function => ObjectTag::Function,
            other => panic!("no object tag for non-concrete type kind {other:?}"),
        }
    }
}

pub struct TypeMapper<'ctx> {
    pub context: &'ctx Context,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context }
    }

    pub fn i64_type(&self) -> IntType<'ctx> {
        self.context.i64_type()
    }

    pub fn i1_type(&self) -> IntType<'ctx> {
        self.context.bool_type()
    }

    pub fn i8_type(&self) -> IntType<'ctx> {
        self.context.i8_type()
    }

    pub fn ptr_type(&self) -> PointerType<'ctx> {
        self.context.ptr_type(AddressSpace::default())
    }

    /// `%Object = type { i8 tag, i64 refcount, i64 payload }`. `payload`
    /// holds an unboxed `Integer`/`Boolean` directly, or a pointer (as
    /// `i64`) to the `String`/`Tuple`/`Function` heap payload.
    pub fn object_struct(&self) -> StructType<'ctx> {
        if let Some(ty) = self.context.get_struct_type("Object") {
            return ty;
        }
        let ty = self.context.opaque_struct_type("Object");
        ty.set_body(
            &[
                self.i8_type().into(),
                self.i64_type().into(),
                self.i64_type().into(),
            ],
            false,
        );
        ty
    }

    /// `%Tuple = type { ptr first, ptr second }`, both `%Object*`.
    pub fn tuple_struct(&self) -> StructType<'ctx> {
        if let Some(ty) = self.context.get_struct_type("Tuple") {
            return ty;
        }
        let ty = self.context.opaque_struct_type("Tuple");
        ty.set_body(&[self.ptr_type().into(), self.ptr_type().into()], false);
        ty
    }

    /// `%Function = type { ptr code, ptr env, i64 arity }`. `code` is the
    /// uniform dynamic entry point `ptr (*)(ptr env, ptr args, i64 argc)`.
    pub fn function_struct(&self) -> StructType<'ctx> {
        if let Some(ty) = self.context.get_struct_type("Function") {
            return ty;
        }
        let ty = self.context.opaque_struct_type("Function");
        ty.set_body(
            &[self.ptr_type().into(), self.ptr_type().into(), self.i64_type().into()],
            false,
        );
        ty
    }

    pub fn basic_type_for(&self, repr: Repr) -> BasicTypeEnum<'ctx> {
        match repr {
            Repr::Boolean => self.i1_type().into(),
            Repr::Integer => self.i64_type().into(),
            Repr::Boxed => self.ptr_type().into(),
        }
    }
}
