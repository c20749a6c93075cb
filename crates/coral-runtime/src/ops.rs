//! The `#[no_mangle] extern "C" fn coral_*` symbols `coral-gen` declares and
//! calls, implementing boxing/unboxing, tuple and closure construction,
//! tagged dynamic dispatch for `+`/`==`, printing, and the two runtime traps
//! (`TypeCheck` failure, operator kind mismatch).

use std::ffi::c_void;

use crate::object::{
    alloc_object, free_object, function_payload, libc_alloc, string_bytes, string_payload,
    tuple_payload, ClosureFn, FunctionPayload, Object, ObjectTag, StringPayload, TuplePayload,
};

#[no_mangle]
pub unsafe extern "C" fn coral_box_int(value: i64) -> *mut Object {
    alloc_object(ObjectTag::Integer, value)
}

#[no_mangle]
pub unsafe extern "C" fn coral_box_bool(value: bool) -> *mut Object {
    alloc_object(ObjectTag::Boolean, value as i64)
}

#[no_mangle]
pub unsafe extern "C" fn coral_box_string(data: *const u8, len: i64) -> *mut Object {
    let buf = if len > 0 {
        let buf = libc::malloc(len as usize) as *mut u8;
        assert!(!buf.is_null(), "out of memory");
        std::ptr::copy_nonoverlapping(data, buf, len as usize);
        buf
    } else {
        std::ptr::null_mut()
    };
    let payload: *mut StringPayload = libc_alloc();
    (*payload).len = len;
    (*payload).data = buf;
    alloc_object(ObjectTag::String, payload as i64)
}

#[no_mangle]
pub unsafe extern "C" fn coral_unbox_int(obj: *mut Object) -> i64 {
    (*obj).payload
}

#[no_mangle]
pub unsafe extern "C" fn coral_unbox_bool(obj: *mut Object) -> bool {
    (*obj).payload != 0
}

#[no_mangle]
pub unsafe extern "C" fn coral_object_tag(obj: *mut Object) -> i8 {
    (*obj).tag
}

#[no_mangle]
pub unsafe extern "C" fn coral_incref(obj: *mut Object) {
    if !obj.is_null() {
        (*obj).refcount += 1;
    }
}

/// Releases one reference, freeing `obj` and recursively decref-ing whatever
/// it owns once the count reaches zero.
#[no_mangle]
pub unsafe extern "C" fn coral_decref(obj: *mut Object) {
    if obj.is_null() {
        return;
    }
    (*obj).refcount -= 1;
    if (*obj).refcount > 0 {
        return;
    }
    match ObjectTag::from_i8((*obj).tag) {
        ObjectTag::String => {
            let payload = string_payload(obj);
            if !(*payload).data.is_null() {
                libc::free((*payload).data as *mut c_void);
            }
            libc::free(payload as *mut c_void);
        }
        ObjectTag::Tuple => {
            let payload = tuple_payload(obj);
            coral_decref((*payload).first);
            coral_decref((*payload).second);
            libc::free(payload as *mut c_void);
        }
        ObjectTag::Function => {
            let payload = function_payload(obj);
            for i in 0..(*payload).n_captures {
                coral_decref(*(*payload).env.offset(i as isize));
            }
            if !(*payload).env.is_null() {
                libc::free((*payload).env as *mut c_void);
            }
            libc::free(payload as *mut c_void);
        }
        ObjectTag::Boolean | ObjectTag::Integer | ObjectTag::Undefined => {}
    }
    free_object(obj);
}

#[no_mangle]
pub unsafe extern "C" fn coral_string_concat(a: *mut Object, b: *mut Object) -> *mut Object {
    let a_bytes = string_bytes(a);
    let b_bytes = string_bytes(b);
    let len = (a_bytes.len() + b_bytes.len()) as i64;
    let buf = if len > 0 {
        let buf = libc::malloc(len as usize) as *mut u8;
        assert!(!buf.is_null(), "out of memory");
        std::ptr::copy_nonoverlapping(a_bytes.as_ptr(), buf, a_bytes.len());
        std::ptr::copy_nonoverlapping(b_bytes.as_ptr(), buf.add(a_bytes.len()), b_bytes.len());
        buf
    } else {
        std::ptr::null_mut()
    };
    let payload: *mut StringPayload = libc_alloc();
    (*payload).len = len;
    (*payload).data = buf;
    alloc_object(ObjectTag::String, payload as i64)
}

#[no_mangle]
pub unsafe extern "C" fn coral_string_eq(a: *mut Object, b: *mut Object) -> bool {
    string_bytes(a) == string_bytes(b)
}

/// `+` when neither operand was pinned to `Integer` or `String` at compile
/// time: inspects both tags and dispatches, or traps if they still
/// disagree at runtime. An Integer paired with a String stringifies the
/// integer and concatenates, matching the lattice's `Integer|String`
/// fallback for `+`.
#[no_mangle]
pub unsafe extern "C" fn coral_dynamic_add(a: *mut Object, b: *mut Object) -> *mut Object {
    match (ObjectTag::from_i8((*a).tag), ObjectTag::from_i8((*b).tag)) {
        (ObjectTag::Integer, ObjectTag::Integer) => {
            coral_box_int((*a).payload + (*b).payload)
        }
        (ObjectTag::String, ObjectTag::String) => coral_string_concat(a, b),
        (ObjectTag::Integer, ObjectTag::String) => {
            let lhs = box_int_as_string((*a).payload);
            let result = coral_string_concat(lhs, b);
            coral_decref(lhs);
            result
        }
        (ObjectTag::String, ObjectTag::Integer) => {
            let rhs = box_int_as_string((*b).payload);
            let result = coral_string_concat(a, rhs);
            coral_decref(rhs);
            result
        }
        _ => coral_operator_kind_mismatch(),
    }
}

unsafe fn box_int_as_string(value: i64) -> *mut Object {
    let text = value.to_string();
    coral_box_string(text.as_ptr(), text.len() as i64)
}

/// `==`/`!=` when the operands aren't statically the same concrete kind.
/// Values of differing runtime tags simply compare unequal.
#[no_mangle]
pub unsafe extern "C" fn coral_dynamic_eq(a: *mut Object, b: *mut Object) -> bool {
    let (ta, tb) = (ObjectTag::from_i8((*a).tag), ObjectTag::from_i8((*b).tag));
    if ta != tb {
        return false;
    }
    match ta {
        ObjectTag::Boolean | ObjectTag::Integer => (*a).payload == (*b).payload,
        ObjectTag::String => string_bytes(a) == string_bytes(b),
        ObjectTag::Tuple => {
            let (pa, pb) = (tuple_payload(a), tuple_payload(b));
            coral_dynamic_eq((*pa).first, (*pb).first) && coral_dynamic_eq((*pa).second, (*pb).second)
        }
        ObjectTag::Function => std::ptr::eq(a, b),
        ObjectTag::Undefined => true,
    }
}

#[no_mangle]
pub unsafe extern "C" fn coral_tuple_new(first: *mut Object, second: *mut Object) -> *mut Object {
    coral_incref(first);
    coral_incref(second);
    let payload: *mut TuplePayload = libc_alloc();
    (*payload).first = first;
    (*payload).second = second;
    alloc_object(ObjectTag::Tuple, payload as i64)
}

#[no_mangle]
pub unsafe extern "C" fn coral_tuple_first(obj: *mut Object) -> *mut Object {
    (*tuple_payload(obj)).first
}

#[no_mangle]
pub unsafe extern "C" fn coral_tuple_second(obj: *mut Object) -> *mut Object {
    (*tuple_payload(obj)).second
}

#[no_mangle]
pub unsafe extern "C" fn coral_function_new(code: *mut c_void, arity: i64, n_captures: i64) -> *mut Object {
    let env: *mut *mut Object = if n_captures > 0 {
        libc::calloc(n_captures as usize, std::mem::size_of::<*mut Object>()) as *mut *mut Object
    } else {
        std::ptr::null_mut()
    };
    let payload: *mut FunctionPayload = libc_alloc();
    (*payload).code = code;
    (*payload).env = env;
    (*payload).arity = arity;
    (*payload).n_captures = n_captures;
    alloc_object(ObjectTag::Function, payload as i64)
}

#[no_mangle]
pub unsafe extern "C" fn coral_function_set_capture(obj: *mut Object, index: i64, value: *mut Object) {
    coral_incref(value);
    let payload = function_payload(obj);
    *(*payload).env.offset(index as isize) = value;
}

#[no_mangle]
pub unsafe extern "C" fn coral_function_get_capture(env: *mut *mut Object, index: i64) -> *mut Object {
    *env.offset(index as isize)
}

#[no_mangle]
pub unsafe extern "C" fn coral_function_call(
    callee: *mut Object,
    args: *mut *mut Object,
    argc: i64,
) -> *mut Object {
    let payload = function_payload(callee);
    if (*payload).arity != argc {
        eprintln!(
            "runtime error: closure expects {} argument(s), called with {}",
            (*payload).arity,
            argc
        );
        std::process::exit(1);
    }
    let code: ClosureFn = std::mem::transmute((*payload).code);
    code((*payload).env as *mut c_void, args, argc)
}

#[no_mangle]
pub unsafe extern "C" fn coral_print_object(obj: *mut Object) {
    print_value(obj);
    println!();
}

unsafe fn print_value(obj: *mut Object) {
    match ObjectTag::from_i8((*obj).tag) {
        ObjectTag::Undefined => print!("undefined"),
        ObjectTag::Boolean => print!("{}", (*obj).payload != 0),
        ObjectTag::Integer => print!("{}", (*obj).payload),
        ObjectTag::String => {
            let bytes = string_bytes(obj);
            print!("{}", String::from_utf8_lossy(bytes));
        }
        ObjectTag::Tuple => {
            let payload = tuple_payload(obj);
            print!("(");
            print_value((*payload).first);
            print!(", ");
            print_value((*payload).second);
            print!(")");
        }
        ObjectTag::Function => print!("<#closure>"),
    }
}

/// A runtime [`coral_sem::NodeKind::TypeCheck`] found a value whose tag
/// doesn't match what static analysis could only narrow down to "possibly
/// this kind". Unrecoverable: the program has no meaningful next step.
#[no_mangle]
pub unsafe extern "C" fn coral_type_check_failed(obj: *mut Object, expected: i8) -> ! {
    eprintln!(
        "runtime type error: expected tag {:?}, found {:?}",
        ObjectTag::from_i8(expected),
        ObjectTag::from_i8((*obj).tag)
    );
    std::process::exit(1);
}

/// `coral_dynamic_add` found two operands whose runtime tags still don't
/// admit `+` (e.g. a Tuple and a Boolean).
#[no_mangle]
pub unsafe extern "C" fn coral_operator_kind_mismatch() -> ! {
    eprintln!("runtime type error: incompatible operand kinds for `+`");
    std::process::exit(1);
}
