//! Lowers a validated [`coral_sem::TypedAst`] directly to LLVM IR.
//!
//! Every closure - the top-level program included - compiles to one LLVM
//! function sharing a single uniform signature, `ptr (ptr env, ptr args, i64
//! argc)`, taking boxed `%Object*` arguments and returning a boxed result.
//! Because every call site therefore has matching argument/return types,
//! the generator can mark a call in return position with LLVM's `tail`
//! hint unconditionally - it never needs `musttail`'s stricter signature
//! match to stay safe.
//!
//! Inside a function body, arithmetic and comparisons on operands already
//! proven `Integer`/`Boolean` by [`coral_sem::analysis`] run entirely in
//! unboxed `i64`/`i1` registers; values only cross the `%Object` boundary
//! at call arguments/returns, tuple construction, and `print`.

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::IntPredicate;

use coral_ast::BinaryOp;
use coral_sem::{NodeId, NodeKind, ScopeTree, ScopeVarId, Type, TypedAst};

use crate::error::{CodeGenError, Result};
use crate::runtime::RuntimeFns;
use crate::types::{Repr, TypeMapper};

/// Per-function compilation state: the value of every in-scope
/// [`ScopeVarId`], and the list of boxed temporaries to release when the
/// function returns.
struct FnCtx<'ctx> {
    function: FunctionValue<'ctx>,
    env_ptr: PointerValue<'ctx>,
    vars: coral_util::FxHashMap<ScopeVarId, BasicValueEnum<'ctx>>,
    gc_list: Vec<PointerValue<'ctx>>,
}

pub struct CodeGen<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    types: TypeMapper<'ctx>,
    runtime: RuntimeFns<'ctx>,
    closure_count: usize,
}

impl<'ctx> CodeGen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let types = TypeMapper::new(context);
        let runtime = RuntimeFns::declare(&module, &types);
        CodeGen {
            context,
            module,
            builder: context.create_builder(),
            types,
            runtime,
            closure_count: 0,
        }
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    pub fn verify(&self) -> Result<()> {
        self.module
            .verify()
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))
    }

    /// The uniform closure signature: `ptr (ptr env, ptr args, i64 argc)`.
    fn closure_fn_type(&self) -> inkwell::types::FunctionType<'ctx> {
        let ptr = self.types.ptr_type();
        let i64t = self.types.i64_type();
        ptr.fn_type(&[ptr.into(), ptr.into(), i64t.into()], false)
    }

    /// Compiles the whole program into `coral_main() -> i32`, whose body
    /// evaluates `root` for its `print` side effects.
    pub fn compile_program(&mut self, ast: &TypedAst, scopes: &ScopeTree, root: NodeId) -> Result<FunctionValue<'ctx>> {
        let i32_type = self.context.i32_type();
        let fn_type = i32_type.fn_type(&[], false);
        let main_fn = self.module.add_function("coral_main", fn_type, None);
        let entry = self.context.append_basic_block(main_fn, "entry");
        self.builder.position_at_end(entry);

        let env_ptr = self.types.ptr_type().const_null();
        let mut fnctx = FnCtx {
            function: main_fn,
            env_ptr,
            vars: Default::default(),
            gc_list: Vec::new(),
        };

        self.lower(&mut fnctx, ast, scopes, root, false)?;
        self.release_gc_list(&fnctx);
        self.builder.build_return(Some(&i32_type.const_int(0, false)))
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        Ok(main_fn)
    }

    fn release_gc_list(&self, fnctx: &FnCtx<'ctx>) {
        for obj in &fnctx.gc_list {
            let _ = self
                .builder
                .build_call(self.runtime.decref, &[(*obj).into()], "");
        }
    }

    /// Lowers `node`, returning its value in the representation
    /// [`Repr::of`] its inferred type calls for. `tail` is true when this
    /// node occupies the return position of the enclosing function (i.e.
    /// is reached only by walking through `let`/`if` tails), which is the
    /// one piece of context that survives through otherwise-unrelated node
    /// kinds so a `Call` several `let`/`if` layers down can still mark
    /// itself as a tail call.
    fn lower(
        &mut self,
        fnctx: &mut FnCtx<'ctx>,
        ast: &TypedAst,
        scopes: &ScopeTree,
        node: NodeId,
        tail: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        let ty = ast.ty(node).clone();
        match &ast.node(node).kind {
            NodeKind::BoolLit(b) => Ok(self.types.i1_type().const_int(*b as u64, false).into()),
            NodeKind::IntLit(n) => Ok(self.types.i64_type().const_int(*n as u64, true).into()),
            NodeKind::StringLit(s) => self.lower_string_literal(s),

            NodeKind::Reference(var) => fnctx
                .vars
                .get(var)
                .copied()
                .ok_or_else(|| CodeGenError::Internal(format!("unbound scope var {var:?} at codegen time"))),

            NodeKind::Tuple { first, second } => {
                let first_id = *first;
                let second_id = *second;
                let first_val = self.lower(fnctx, ast, scopes, first_id, false)?;
                let second_val = self.lower(fnctx, ast, scopes, second_id, false)?;
                let first_obj = self.box_value(fnctx, first_val, ast.ty(first_id))?;
                let second_obj = self.box_value(fnctx, second_val, ast.ty(second_id))?;
                let call = self.builder.build_call(
                    self.runtime.tuple_new,
                    &[first_obj.into(), second_obj.into()],
                    "tuple",
                ).map_err(llvm_err)?;
                let obj = basic_ptr(call)?;
                fnctx.gc_list.push(obj.into_pointer_value());
                Ok(obj)
            }

            NodeKind::First(value) => {
                let inner = self.lower(fnctx, ast, scopes, *value, false)?;
                let obj = self.box_value(fnctx, inner, ast.ty(*value))?;
                let call = self
                    .builder
                    .build_call(self.runtime.tuple_first, &[obj.into()], "first")
                    .map_err(llvm_err)?;
                self.unbox_to(basic_ptr(call)?, &ty)
            }
            NodeKind::Second(value) => {
                let inner = self.lower(fnctx, ast, scopes, *value, false)?;
                let obj = self.box_value(fnctx, inner, ast.ty(*value))?;
                let call = self
                    .builder
                    .build_call(self.runtime.tuple_second, &[obj.into()], "second")
                    .map_err(llvm_err)?;
                self.unbox_to(basic_ptr(call)?, &ty)
            }

            NodeKind::Print(value) => {
                let value_id = *value;
                let inner = self.lower(fnctx, ast, scopes, value_id, false)?;
                let obj = self.box_value(fnctx, inner, ast.ty(value_id))?;
                self.builder
                    .build_call(self.runtime.print_object, &[obj.into()], "")
                    .map_err(llvm_err)?;
                Ok(inner)
            }

            NodeKind::Binary { op, lhs, rhs } => self.lower_binary(fnctx, ast, scopes, *op, *lhs, *rhs, &ty),

            NodeKind::Conditional { condition, then, otherwise } => {
                self.lower_conditional(fnctx, ast, scopes, *condition, *then, *otherwise, &ty, tail)
            }

            NodeKind::Function { params, body, binding } => {
                self.lower_function_literal(fnctx, ast, scopes, node, params, *body, *binding)
            }

            NodeKind::Let { binding, value, next } => {
                let value_id = *value;
                let next_id = *next;
                let val = self.lower(fnctx, ast, scopes, value_id, false)?;
                if let Some(var) = binding {
                    fnctx.vars.insert(*var, val);
                }
                self.lower(fnctx, ast, scopes, next_id, tail)
            }

            NodeKind::Call { callee, arguments } => {
                self.lower_call(fnctx, ast, scopes, *callee, arguments, &ty, tail)
            }

            NodeKind::TypeCheck { value, expected } => {
                let value_id = *value;
                let expected = expected.clone();
                let inner = self.lower(fnctx, ast, scopes, value_id, false)?;
                let obj = self.box_value(fnctx, inner, ast.ty(value_id))?;
                let tag = self.builder.build_call(self.runtime.object_tag, &[obj.into()], "tag").map_err(llvm_err)?;
                let tag_val = basic_int(tag)?.into_int_value();
                let expected_tag = self.types.i8_type().const_int(crate::types::ObjectTag::of(&expected) as u64, false);
                let matches = self
                    .builder
                    .build_int_compare(IntPredicate::EQ, tag_val, expected_tag, "tagmatch")
                    .map_err(llvm_err)?;
                let fail_block = self.context.append_basic_block(fnctx.function, "typecheck.fail");
                let ok_block = self.context.append_basic_block(fnctx.function, "typecheck.ok");
                self.builder
                    .build_conditional_branch(matches, ok_block, fail_block)
                    .map_err(llvm_err)?;
                self.builder.position_at_end(fail_block);
                self.builder
                    .build_call(self.runtime.type_check_failed, &[obj.into(), expected_tag.into()], "")
                    .map_err(llvm_err)?;
                self.builder.build_unreachable().map_err(llvm_err)?;
                self.builder.position_at_end(ok_block);
                self.unbox_to(obj, &ty)
            }
        }
    }

    fn lower_string_literal(&mut self, s: &str) -> Result<BasicValueEnum<'ctx>> {
        let global = self
            .builder
            .build_global_string_ptr(s, "str")
            .map_err(llvm_err)?;
        let ptr = global.as_pointer_value();
        let len = self.types.i64_type().const_int(s.len() as u64, false);
        let call = self
            .builder
            .build_call(self.runtime.box_string, &[ptr.into(), len.into()], "boxed_str")
            .map_err(llvm_err)?;
        basic_ptr(call)
    }

    fn lower_binary(
        &mut self,
        fnctx: &mut FnCtx<'ctx>,
        ast: &TypedAst,
        scopes: &ScopeTree,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        result_ty: &Type,
    ) -> Result<BasicValueEnum<'ctx>> {
        use BinaryOp::*;
        match op {
            Sub | Mul | Div | Rem => {
                let l = self.lower(fnctx, ast, scopes, lhs, false)?.into_int_value();
                let r = self.lower(fnctx, ast, scopes, rhs, false)?.into_int_value();
                let v = match op {
                    Sub => self.builder.build_int_sub(l, r, "sub"),
                    Mul => self.builder.build_int_mul(l, r, "mul"),
                    Div => self.builder.build_int_signed_div(l, r, "div"),
                    Rem => self.builder.build_int_signed_rem(l, r, "rem"),
                    _ => unreachable!(),
                }
                .map_err(llvm_err)?;
                Ok(v.into())
            }
            Lt | Lte | Gt | Gte => {
                let l = self.lower(fnctx, ast, scopes, lhs, false)?.into_int_value();
                let r = self.lower(fnctx, ast, scopes, rhs, false)?.into_int_value();
                let pred = match op {
                    Lt => IntPredicate::SLT,
                    Lte => IntPredicate::SLE,
                    Gt => IntPredicate::SGT,
                    Gte => IntPredicate::SGE,
                    _ => unreachable!(),
                };
                let v = self.builder.build_int_compare(pred, l, r, "cmp").map_err(llvm_err)?;
                Ok(v.into())
            }
            And | Or => {
                let l = self.lower(fnctx, ast, scopes, lhs, false)?.into_int_value();
                let r = self.lower(fnctx, ast, scopes, rhs, false)?.into_int_value();
                let v = match op {
                    And => self.builder.build_and(l, r, "and"),
                    Or => self.builder.build_or(l, r, "or"),
                    _ => unreachable!(),
                }
                .map_err(llvm_err)?;
                Ok(v.into())
            }
            Eq | Neq => {
                let lhs_ty = ast.ty(lhs).clone();
                let rhs_ty = ast.ty(rhs).clone();
                let l = self.lower(fnctx, ast, scopes, lhs, false)?;
                let r = self.lower(fnctx, ast, scopes, rhs, false)?;
                let eq = if lhs_ty.is_static() && rhs_ty.is_static() && lhs_ty.kind() == rhs_ty.kind() {
                    self.same_kind_eq(&lhs_ty, l, r)?
                } else {
                    let lo = self.box_value(fnctx, l, &lhs_ty)?;
                    let ro = self.box_value(fnctx, r, &rhs_ty)?;
                    let call = self
                        .builder
                        .build_call(self.runtime.dynamic_eq, &[lo.into(), ro.into()], "dyneq")
                        .map_err(llvm_err)?;
                    basic_int(call)?.into_int_value()
                };
                let v = if matches!(op, Neq) {
                    self.builder.build_not(eq, "neq").map_err(llvm_err)?
                } else {
                    eq
                };
                Ok(v.into())
            }
            Add => {
                let lhs_ty = ast.ty(lhs).clone();
                let rhs_ty = ast.ty(rhs).clone();
                let l = self.lower(fnctx, ast, scopes, lhs, false)?;
                let r = self.lower(fnctx, ast, scopes, rhs, false)?;
                if matches!(lhs_ty, Type::Integer) && matches!(rhs_ty, Type::Integer) {
                    let v = self
                        .builder
                        .build_int_add(l.into_int_value(), r.into_int_value(), "add")
                        .map_err(llvm_err)?;
                    return Ok(v.into());
                }
                if matches!(lhs_ty, Type::String) && matches!(rhs_ty, Type::String) {
                    let lo = self.box_value(fnctx, l, &lhs_ty)?;
                    let ro = self.box_value(fnctx, r, &rhs_ty)?;
                    let call = self
                        .builder
                        .build_call(self.runtime.string_concat, &[lo.into(), ro.into()], "concat")
                        .map_err(llvm_err)?;
                    return basic_ptr(call);
                }
                let lo = self.box_value(fnctx, l, &lhs_ty)?;
                let ro = self.box_value(fnctx, r, &rhs_ty)?;
                let call = self
                    .builder
                    .build_call(self.runtime.dynamic_add, &[lo.into(), ro.into()], "dynadd")
                    .map_err(llvm_err)?;
                let boxed = basic_ptr(call)?;
                self.unbox_to(boxed, result_ty)
            }
        }
    }

    fn same_kind_eq(
        &mut self,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
    ) -> Result<inkwell::values::IntValue<'ctx>> {
        match ty {
            Type::Integer | Type::Boolean => self
                .builder
                .build_int_compare(IntPredicate::EQ, l.into_int_value(), r.into_int_value(), "eq")
                .map_err(llvm_err),
            Type::String => {
                let call = self
                    .builder
                    .build_call(self.runtime.string_eq, &[l.into(), r.into()], "streq")
                    .map_err(llvm_err)?;
                Ok(basic_int(call)?.into_int_value())
            }
            _ => Err(CodeGenError::InvalidOperandType(format!(
                "no direct equality for {ty}"
            ))),
        }
    }

    fn lower_conditional(
        &mut self,
        fnctx: &mut FnCtx<'ctx>,
        ast: &TypedAst,
        scopes: &ScopeTree,
        condition: NodeId,
        then: NodeId,
        otherwise: NodeId,
        result_ty: &Type,
        tail: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        let cond_val = self.lower(fnctx, ast, scopes, condition, false)?.into_int_value();
        let then_block = self.context.append_basic_block(fnctx.function, "if.then");
        let else_block = self.context.append_basic_block(fnctx.function, "if.else");
        let merge_block = self.context.append_basic_block(fnctx.function, "if.merge");

        self.builder
            .build_conditional_branch(cond_val, then_block, else_block)
            .map_err(llvm_err)?;

        self.builder.position_at_end(then_block);
        let then_val_raw = self.lower(fnctx, ast, scopes, then, tail)?;
        let then_val = self.coerce(fnctx, then_val_raw, ast.ty(then), result_ty)?;
        let then_end = self.builder.get_insert_block().unwrap();
        self.builder.build_unconditional_branch(merge_block).map_err(llvm_err)?;

        self.builder.position_at_end(else_block);
        let else_val_raw = self.lower(fnctx, ast, scopes, otherwise, tail)?;
        let else_val = self.coerce(fnctx, else_val_raw, ast.ty(otherwise), result_ty)?;
        let else_end = self.builder.get_insert_block().unwrap();
        self.builder.build_unconditional_branch(merge_block).map_err(llvm_err)?;

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(self.types.basic_type_for(Repr::of(result_ty)), "if.result")
            .map_err(llvm_err)?;
        phi.add_incoming(&[(&then_val, then_end), (&else_val, else_end)]);
        Ok(phi.as_basic_value())
    }

    /// Brings a branch's value to the representation the merge point (or
    /// any other shared use) expects, boxing it if needed.
    fn coerce(
        &mut self,
        fnctx: &mut FnCtx<'ctx>,
        val: BasicValueEnum<'ctx>,
        from: &Type,
        to: &Type,
    ) -> Result<BasicValueEnum<'ctx>> {
        match (Repr::of(from), Repr::of(to)) {
            (a, b) if a == b => Ok(val),
            (_, Repr::Boxed) => self.box_value(fnctx, val, from),
            (Repr::Boxed, Repr::Integer) => self.unbox_to(val, &Type::Integer),
            (Repr::Boxed, Repr::Boolean) => self.unbox_to(val, &Type::Boolean),
            _ => Ok(val),
        }
    }

    fn box_value(&mut self, fnctx: &mut FnCtx<'ctx>, val: BasicValueEnum<'ctx>, ty: &Type) -> Result<BasicValueEnum<'ctx>> {
        match Repr::of(ty) {
            Repr::Boxed => Ok(val),
            Repr::Integer => {
                let call = self
                    .builder
                    .build_call(self.runtime.box_int, &[val.into()], "box_int")
                    .map_err(llvm_err)?;
                let obj = basic_ptr(call)?;
                fnctx.gc_list.push(obj.into_pointer_value());
                Ok(obj)
            }
            Repr::Boolean => {
                let call = self
                    .builder
                    .build_call(self.runtime.box_bool, &[val.into()], "box_bool")
                    .map_err(llvm_err)?;
                let obj = basic_ptr(call)?;
                fnctx.gc_list.push(obj.into_pointer_value());
                Ok(obj)
            }
        }
    }

    fn unbox_to(&mut self, obj: BasicValueEnum<'ctx>, ty: &Type) -> Result<BasicValueEnum<'ctx>> {
        match Repr::of(ty) {
            Repr::Boxed => Ok(obj),
            Repr::Integer => {
                let call = self
                    .builder
                    .build_call(self.runtime.unbox_int, &[obj.into()], "unbox_int")
                    .map_err(llvm_err)?;
                basic_int(call)
            }
            Repr::Boolean => {
                let call = self
                    .builder
                    .build_call(self.runtime.unbox_bool, &[obj.into()], "unbox_bool")
                    .map_err(llvm_err)?;
                basic_int(call)
            }
        }
    }

    fn lower_function_literal(
        &mut self,
        fnctx: &mut FnCtx<'ctx>,
        ast: &TypedAst,
        scopes: &ScopeTree,
        node: NodeId,
        params: &[Option<ScopeVarId>],
        body: NodeId,
        binding: Option<ScopeVarId>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let func_scope = ast.node(body).scope;
        let captures: Vec<_> = scopes.captures(func_scope).cloned().collect();
        let param_types: Vec<Type> = match ast.ty(node) {
            Type::Function(params, _) => params.clone(),
            _ => vec![Type::Any; params.len()],
        };

        let code_fn = self.compile_closure_body(ast, scopes, params, &param_types, body, binding, &captures)?;

        let code_ptr = code_fn.as_global_value().as_pointer_value();
        let arity = self.types.i64_type().const_int(params.len() as u64, false);
        let n_captures = self.types.i64_type().const_int(captures.len() as u64, false);
        let call = self
            .builder
            .build_call(self.runtime.function_new, &[code_ptr.into(), arity.into(), n_captures.into()], "closure")
            .map_err(llvm_err)?;
        let function_obj = basic_ptr(call)?;
        fnctx.gc_list.push(function_obj.into_pointer_value());

        for capture in &captures {
            let value = *fnctx.vars.get(&capture.var).ok_or_else(|| {
                CodeGenError::Internal(format!("capture of unbound var {:?} at node {node:?}", capture.var))
            })?;
            let var_ty = scopes.var(capture.var).ty.clone();
            let boxed = self.box_value(fnctx, value, &var_ty)?;
            let idx = self.types.i64_type().const_int(capture.capture_index as u64, false);
            self.builder
                .build_call(
                    self.runtime.function_set_capture,
                    &[function_obj.into(), idx.into(), boxed.into()],
                    "",
                )
                .map_err(llvm_err)?;
        }

        Ok(function_obj)
    }

    fn compile_closure_body(
        &mut self,
        ast: &TypedAst,
        scopes: &ScopeTree,
        params: &[Option<ScopeVarId>],
        param_types: &[Type],
        body: NodeId,
        binding: Option<ScopeVarId>,
        captures: &[coral_sem::ScopeCapture],
    ) -> Result<FunctionValue<'ctx>> {
        self.closure_count += 1;
        let name = format!("closure_{}", self.closure_count);
        let fn_type = self.closure_fn_type();
        let function = self.module.add_function(&name, fn_type, Some(Linkage::Internal));

        let saved_block = self.builder.get_insert_block();

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let env_ptr = function.get_nth_param(0).unwrap().into_pointer_value();
        let args_ptr = function.get_nth_param(1).unwrap().into_pointer_value();

        let mut fnctx = FnCtx {
            function,
            env_ptr,
            vars: Default::default(),
            gc_list: Vec::new(),
        };

        for (i, var) in params.iter().enumerate() {
            let slot = unsafe {
                self.builder
                    .build_gep(
                        self.types.ptr_type(),
                        args_ptr,
                        &[self.types.i64_type().const_int(i as u64, false)],
                        "arg_slot",
                    )
                    .map_err(llvm_err)?
            };
            let boxed = self
                .builder
                .build_load(self.types.ptr_type(), slot, "arg")
                .map_err(llvm_err)?;
            // `_` params still occupy an argument slot (so later positional
            // args don't shift) but bind nothing; only unbox into a local
            // when there's a var to hold it.
            if let Some(var) = var {
                let native = self.unbox_to(boxed, &param_types[i])?;
                fnctx.vars.insert(*var, native);
            }
        }

        for capture in captures {
            let idx = self.types.i64_type().const_int(capture.capture_index as u64, false);
            let call = self
                .builder
                .build_call(self.runtime.function_get_capture, &[env_ptr.into(), idx.into()], "capture")
                .map_err(llvm_err)?;
            let boxed = basic_ptr(call)?;
            let var_ty = scopes.var(capture.var).ty.clone();
            let native = self.unbox_to(boxed, &var_ty)?;
            fnctx.vars.insert(capture.var, native);
        }

        if let Some(self_var) = binding {
            // The binding itself resolves to the closure object, but that
            // object is only materialized by the *caller* of this literal;
            // recursive calls inside the body look it up through the
            // capture list like any other name, so nothing extra is needed
            // here beyond leaving it absent if uncaptured (a function that
            // never calls itself has no such capture).
            let _ = self_var;
        }

        let result = self.lower(&mut fnctx, ast, scopes, body, true)?;
        let result_ty = ast.ty(body).clone();
        let boxed_result = self.box_value(&mut fnctx, result, &result_ty)?;
        self.release_gc_list_except(&fnctx, boxed_result.into_pointer_value());
        self.builder.build_return(Some(&boxed_result)).map_err(llvm_err)?;

        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }

        Ok(function)
    }

    fn release_gc_list_except(&self, fnctx: &FnCtx<'ctx>, keep: PointerValue<'ctx>) {
        for obj in &fnctx.gc_list {
            if *obj != keep {
                let _ = self
                    .builder
                    .build_call(self.runtime.decref, &[(*obj).into()], "");
            }
        }
    }

    fn lower_call(
        &mut self,
        fnctx: &mut FnCtx<'ctx>,
        ast: &TypedAst,
        scopes: &ScopeTree,
        callee: NodeId,
        arguments: &[NodeId],
        result_ty: &Type,
        tail: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        let callee_val = self.lower(fnctx, ast, scopes, callee, false)?;
        let callee_obj = self.box_value(fnctx, callee_val, ast.ty(callee))?;

        let argc = arguments.len();
        let array_ty = self.types.ptr_type().array_type(argc.max(1) as u32);
        let args_slot = self
            .builder
            .build_alloca(array_ty, "call_args")
            .map_err(llvm_err)?;

        for (i, arg) in arguments.iter().enumerate() {
            let val = self.lower(fnctx, ast, scopes, *arg, false)?;
            let boxed = self.box_value(fnctx, val, ast.ty(*arg))?;
            let slot = unsafe {
                self.builder
                    .build_gep(
                        array_ty,
                        args_slot,
                        &[
                            self.types.i64_type().const_int(0, false),
                            self.types.i64_type().const_int(i as u64, false),
                        ],
                        "arg_slot",
                    )
                    .map_err(llvm_err)?
            };
            self.builder.build_store(slot, boxed).map_err(llvm_err)?;
        }

        let argc_val = self.types.i64_type().const_int(argc as u64, false);
        let call = self
            .builder
            .build_call(
                self.runtime.function_call,
                &[callee_obj.into(), args_slot.into(), argc_val.into()],
                "call",
            )
            .map_err(llvm_err)?;
        if tail {
            call.set_tail_call(true);
        }
        let boxed_result = basic_ptr(call)?;
        self.unbox_to(boxed_result, result_ty)
    }
}

fn llvm_err<E: std::fmt::Display>(e: E) -> CodeGenError {
    CodeGenError::LlvmOperationFailed(e.to_string())
}

fn basic_ptr<'ctx>(call: inkwell::values::CallSiteValue<'ctx>) -> Result<BasicValueEnum<'ctx>> {
    call.try_as_basic_value()
        .left()
        .ok_or_else(|| CodeGenError::Internal("expected a basic value from call".into()))
}

fn basic_int<'ctx>(call: inkwell::values::CallSiteValue<'ctx>) -> Result<BasicValueEnum<'ctx>> {
    basic_ptr(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_ast::{BinaryOp as Op, File, Location, Parameter, Term};
    use inkwell::context::Context;

    fn loc() -> Location {
        Location::dummy()
    }

    fn param(text: &str) -> Parameter {
        Parameter {
            text: text.into(),
            location: loc(),
        }
    }

    fn int(value: i64) -> Term {
        Term::Int { value, location: loc() }
    }

    fn var(text: &str) -> Term {
        Term::Var { text: text.into(), location: loc() }
    }

    fn binary(op: Op, lhs: Term, rhs: Term) -> Term {
        Term::Binary { lhs: Box::new(lhs), op, rhs: Box::new(rhs), location: loc() }
    }

    fn call(callee: Term, arguments: Vec<Term>) -> Term {
        Term::Call { callee: Box::new(callee), arguments, location: loc() }
    }

    fn let_(name: &str, value: Term, next: Term) -> Term {
        Term::Let { name: param(name), value: Box::new(value), next: Box::new(next), location: loc() }
    }

    fn function(parameters: Vec<&str>, value: Term) -> Term {
        Term::Function { parameters: parameters.into_iter().map(param).collect(), value: Box::new(value), location: loc() }
    }

    fn compile(expression: Term) -> String {
        let file = File { name: "test".into(), expression, location: None };
        let (ast, scopes, root) = coral_sem::analyze(&file).expect("well-typed program");
        let context = Context::create();
        let mut codegen = CodeGen::new(&context, "test");
        codegen
            .compile_program(&ast, &scopes, root)
            .expect("codegen succeeds");
        codegen.verify().expect("module verifies");
        codegen.module().print_to_string().to_string()
    }

    #[test]
    fn every_closure_shares_the_uniform_dynamic_signature() {
        let expr = let_(
            "id",
            function(vec!["x"], var("x")),
            call(var("id"), vec![int(1)]),
        );
        let ir = compile(expr);
        assert!(ir.contains("ptr @closure_1(ptr %0, ptr %1, i64 %2)"));
        assert!(ir.contains("define i32 @coral_main()"));
    }

    #[test]
    fn self_recursive_tail_position_call_is_marked_for_tail_call_elimination() {
        let body = Term::If {
            condition: Box::new(binary(Op::Eq, var("n"), int(0))),
            then: Box::new(int(0)),
            otherwise: Box::new(call(var("loop"), vec![binary(Op::Sub, var("n"), int(1))])),
            location: loc(),
        };
        let expr = let_("loop", function(vec!["n"], body), call(var("loop"), vec![int(10)]));
        let ir = compile(expr);
        assert!(
            ir.contains("tail call"),
            "expected a tail-marked call in return position, got:\n{ir}"
        );
    }

    #[test]
    fn non_tail_position_call_is_not_marked() {
        let expr = let_(
            "id",
            function(vec!["x"], var("x")),
            binary(Op::Add, call(var("id"), vec![int(1)]), int(1)),
        );
        let ir = compile(expr);
        assert!(!ir.contains("tail call"));
    }

    #[test]
    fn tuple_construction_appends_to_the_gc_list_and_releases_it_on_return() {
        let expr = Term::Tuple {
            first: Box::new(int(1)),
            second: Box::new(int(2)),
            location: loc(),
        };
        let ir = compile(expr);
        assert!(ir.contains("coral_tuple_new"));
        assert!(ir.contains("coral_decref"));
    }

    #[test]
    fn integer_arithmetic_on_statically_known_integers_stays_unboxed() {
        let expr = binary(Op::Add, int(1), int(2));
        let ir = compile(expr);
        assert!(ir.contains("add i64"));
        assert!(!ir.contains("coral_dynamic_add"));
    }

    #[test]
    fn integer_plus_string_dispatches_to_the_dynamic_runtime_helper() {
        let expr = binary(Op::Add, int(1), Term::Str { value: "x".into(), location: loc() });
        let ir = compile(expr);
        assert!(ir.contains("coral_dynamic_add"));
    }
}
