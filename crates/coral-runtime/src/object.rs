//! The `%Object`/`%Tuple`/`%Function` layouts, mirrored exactly from
//! `coral-gen`'s `TypeMapper`: a tagged, refcounted header whose payload is
//! either an inline scalar or a pointer to a variant-specific allocation.

use std::ffi::c_void;

#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTag {
    Undefined = 0,
    Boolean = 1,
    Integer = 2,
    String = 3,
    Tuple = 4,
    Function = 5,
}

impl ObjectTag {
    pub fn from_i8(v: i8) -> ObjectTag {
        match v {
            0 => ObjectTag::Undefined,
            1 => ObjectTag::Boolean,
            2 => ObjectTag::Integer,
            3 => ObjectTag::String,
            4 => ObjectTag::Tuple,
            5 => ObjectTag::Function,
            other => panic!("corrupt object tag {other}"),
        }
    }
}

/// `%Object = { i8 tag, i64 refcount, i64 payload }`.
#[repr(C)]
pub struct Object {
    pub tag: i8,
    pub refcount: i64,
    pub payload: i64,
}

/// Heap payload for a boxed string: owns its byte buffer.
#[repr(C)]
pub struct StringPayload {
    pub len: i64,
    pub data: *mut u8,
}

/// `%Tuple = { ptr first, ptr second }`.
#[repr(C)]
pub struct TuplePayload {
    pub first: *mut Object,
    pub second: *mut Object,
}

/// `%Function = { ptr code, ptr env, i64 arity }`, plus the capture count
/// needed to release `env` on decref (not part of the LLVM-visible struct,
/// since generated code never reads it directly).
#[repr(C)]
pub struct FunctionPayload {
    pub code: *mut c_void,
    pub env: *mut *mut Object,
    pub arity: i64,
    pub n_captures: i64,
}

pub type ClosureFn = unsafe extern "C" fn(*mut c_void, *mut *mut Object, i64) -> *mut Object;

/// Allocates through `libc::malloc` rather than Rust's global allocator:
/// objects cross the boundary into generated native code, which has no way
/// to call back into Rust's allocator to free them.
pub(crate) unsafe fn libc_alloc<T>() -> *mut T {
    let ptr = libc::malloc(std::mem::size_of::<T>()) as *mut T;
    assert!(!ptr.is_null(), "out of memory");
    ptr
}

pub(crate) unsafe fn alloc_object(tag: ObjectTag, payload: i64) -> *mut Object {
    let ptr: *mut Object = libc_alloc();
    (*ptr).tag = tag as i8;
    (*ptr).refcount = 1;
    (*ptr).payload = payload;
    ptr
}

pub(crate) unsafe fn free_object(obj: *mut Object) {
    libc::free(obj as *mut c_void);
}

pub(crate) unsafe fn string_payload(obj: *mut Object) -> *mut StringPayload {
    (*obj).payload as *mut StringPayload
}

pub(crate) unsafe fn tuple_payload(obj: *mut Object) -> *mut TuplePayload {
    (*obj).payload as *mut TuplePayload
}

pub(crate) unsafe fn function_payload(obj: *mut Object) -> *mut FunctionPayload {
    (*obj).payload as *mut FunctionPayload
}

pub(crate) unsafe fn string_bytes<'a>(obj: *mut Object) -> &'a [u8] {
    let p = string_payload(obj);
    if (*p).len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts((*p).data, (*p).len as usize)
    }
}
