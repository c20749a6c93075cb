//! Declares the fixed runtime ABI (`coral-runtime`'s exported symbols) as
//! external functions in the generated module, the way the teacher
//! declared its GC entry points before lowering any instructions.

use inkwell::module::{Linkage, Module};
use inkwell::values::FunctionValue;

use crate::types::TypeMapper;

/// Every runtime entry point the generator ever calls into, declared once
/// per module and handed out by name.
pub struct RuntimeFns<'ctx> {
    pub box_int: FunctionValue<'ctx>,
    pub box_bool: FunctionValue<'ctx>,
    pub box_string: FunctionValue<'ctx>,
    pub unbox_int: FunctionValue<'ctx>,
    pub unbox_bool: FunctionValue<'ctx>,
    pub object_tag: FunctionValue<'ctx>,
    pub incref: FunctionValue<'ctx>,
    pub decref: FunctionValue<'ctx>,
    pub string_concat: FunctionValue<'ctx>,
    pub string_eq: FunctionValue<'ctx>,
    /// `+` where neither operand is statically pinned to Integer or String;
    /// inspects both tags at runtime and dispatches or traps.
    pub dynamic_add: FunctionValue<'ctx>,
    /// `==`/`!=` where the operands aren't statically the same concrete kind.
    pub dynamic_eq: FunctionValue<'ctx>,
    pub tuple_new: FunctionValue<'ctx>,
    pub tuple_first: FunctionValue<'ctx>,
    pub tuple_second: FunctionValue<'ctx>,
    pub function_new: FunctionValue<'ctx>,
    pub function_set_capture: FunctionValue<'ctx>,
    pub function_get_capture: FunctionValue<'ctx>,
    pub function_call: FunctionValue<'ctx>,
    pub print_object: FunctionValue<'ctx>,
    pub type_check_failed: FunctionValue<'ctx>,
    pub operator_kind_mismatch: FunctionValue<'ctx>,
}

impl<'ctx> RuntimeFns<'ctx> {
    pub fn declare(module: &Module<'ctx>, types: &TypeMapper<'ctx>) -> Self {
        let ptr = types.ptr_type();
        let i64t = types.i64_type();
        let i1 = types.i1_type();
        let i8 = types.i8_type();
        let void = types.context.void_type();

        let mut decl = |name: &str, fn_type: inkwell::types::FunctionType<'ctx>| -> FunctionValue<'ctx> {
            module
                .get_function(name)
                .unwrap_or_else(|| module.add_function(name, fn_type, Some(Linkage::External)))
        };

        RuntimeFns {
            box_int: decl("coral_box_int", ptr.fn_type(&[i64t.into()], false)),
            box_bool: decl("coral_box_bool", ptr.fn_type(&[i1.into()], false)),
            box_string: decl(
                "coral_box_string",
                ptr.fn_type(&[ptr.into(), i64t.into()], false),
            ),
            unbox_int: decl("coral_unbox_int", i64t.fn_type(&[ptr.into()], false)),
            unbox_bool: decl("coral_unbox_bool", i1.fn_type(&[ptr.into()], false)),
            object_tag: decl("coral_object_tag", i8.fn_type(&[ptr.into()], false)),
            incref: decl("coral_incref", void.fn_type(&[ptr.into()], false)),
            decref: decl("coral_decref", void.fn_type(&[ptr.into()], false)),
            string_concat: decl("coral_string_concat", ptr.fn_type(&[ptr.into(), ptr.into()], false)),
            string_eq: decl("coral_string_eq", i1.fn_type(&[ptr.into(), ptr.into()], false)),
            dynamic_add: decl("coral_dynamic_add", ptr.fn_type(&[ptr.into(), ptr.into()], false)),
            dynamic_eq: decl("coral_dynamic_eq", i1.fn_type(&[ptr.into(), ptr.into()], false)),
            tuple_new: decl("coral_tuple_new", ptr.fn_type(&[ptr.into(), ptr.into()], false)),
            tuple_first: decl("coral_tuple_first", ptr.fn_type(&[ptr.into()], false)),
            tuple_second: decl("coral_tuple_second", ptr.fn_type(&[ptr.into()], false)),
            function_new: decl(
                "coral_function_new",
                ptr.fn_type(&[ptr.into(), i64t.into(), i64t.into()], false),
            ),
            function_set_capture: decl(
                "coral_function_set_capture",
                void.fn_type(&[ptr.into(), i64t.into(), ptr.into()], false),
            ),
            function_get_capture: decl(
                "coral_function_get_capture",
                ptr.fn_type(&[ptr.into(), i64t.into()], false),
            ),
            function_call: decl(
                "coral_function_call",
                ptr.fn_type(&[ptr.into(), ptr.into(), i64t.into()], false),
            ),
            print_object: decl("coral_print_object", void.fn_type(&[ptr.into()], false)),
            type_check_failed: decl(
                "coral_type_check_failed",
                void.fn_type(&[ptr.into(), i8.into()], false),
            ),
            operator_kind_mismatch: decl(
                "coral_operator_kind_mismatch",
                void.fn_type(&[], false),
            ),
        }
    }
}
