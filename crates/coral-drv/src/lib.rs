//! coral-drv - the `coral` command-line driver.
//!
//! Reads a JSON AST file, runs it through `coral-sem` and `coral-gen`, and
//! either prints the resulting LLVM IR or JIT-executes it by linking
//! `coral-runtime`'s ABI symbols into the execution engine.

use std::path::PathBuf;

use clap::Parser;
use inkwell::context::Context;
use inkwell::execution_engine::ExecutionEngine;
use inkwell::module::Module;
use inkwell::targets::{InitializationConfig, Target};
use inkwell::OptimizationLevel;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `coral <file> [--parse] [--emit-llvm] [--verify-llvm]`
#[derive(Parser, Debug)]
#[command(name = "coral")]
#[command(author, version, about = "Compiles and runs a rinha JSON AST")]
struct Cli {
    /// Input file: a JSON AST by default, or source text with `--parse`.
    file: PathBuf,

    /// Treat `file` as rinha source text rather than a JSON AST.
    ///
    /// No parser crate ships with this build, so this flag always fails
    /// with a clear diagnostic instead of silently misreading source text
    /// as JSON.
    #[arg(long)]
    parse: bool,

    /// Print the generated LLVM IR to stdout and exit without running it.
    #[arg(long)]
    emit_llvm: bool,

    /// Run the LLVM IR verifier, then print the verified IR and exit
    /// without running it.
    #[arg(long)]
    verify_llvm: bool,
}

/// Parses CLI flags and runs the requested pipeline stage.
pub fn run() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.parse {
        anyhow::bail!(
            "source parsing is not part of this build: pass a JSON AST file without --parse"
        );
    }

    tracing::debug!(file = %cli.file.display(), "reading JSON AST");
    let file = coral_ast::ingest_file(&cli.file)?;

    tracing::debug!(name = %file.name, "running semantic analysis");
    let (ast, scopes, root) = coral_sem::analyze(&file).map_err(|err| {
        render_semantic_error(&err);
        anyhow::anyhow!("semantic analysis failed")
    })?;

    tracing::debug!("lowering to LLVM IR");
    let context = Context::create();
    let mut codegen = coral_gen::CodeGen::new(&context, &file.name);
    codegen
        .compile_program(&ast, &scopes, root)
        .map_err(|err| anyhow::anyhow!("code generation failed: {err}"))?;

    if cli.verify_llvm {
        codegen.verify().map_err(|err| {
            render_verify_error(&err);
            anyhow::anyhow!("LLVM verification failed")
        })?;
        print!("{}", codegen.module().print_to_string().to_string());
        return Ok(());
    }

    if cli.emit_llvm {
        print!("{}", codegen.module().print_to_string().to_string());
        return Ok(());
    }

    tracing::debug!("starting JIT execution");
    run_jit(codegen.module())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RINHA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

fn render_semantic_error(err: &coral_sem::SemanticError) {
    eprintln!("error[{}]: {}", err.diagnostic_code().as_str(), err);
}

fn render_verify_error(err: &coral_gen::CodeGenError) {
    eprintln!(
        "error[{}]: {}",
        coral_util::DiagnosticCode::E_IR_VERIFY_FAILED.as_str(),
        err
    );
}

/// Runs the compiled module's `coral_main` under an MCJIT execution engine,
/// linking `coral-runtime`'s ABI symbols in by address so the generator's
/// external declarations resolve without relying on the host's dynamic
/// symbol table.
fn run_jit(module: &Module) -> anyhow::Result<()> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|err| anyhow::anyhow!("failed to initialize native target: {err}"))?;

    let engine = module
        .create_jit_execution_engine(OptimizationLevel::None)
        .map_err(|err| anyhow::anyhow!("failed to create JIT execution engine: {err}"))?;

    register_runtime_symbols(module, &engine);

    let main_fn = unsafe {
        engine
            .get_function::<unsafe extern "C" fn() -> i32>("coral_main")
            .map_err(|err| anyhow::anyhow!("coral_main not found in compiled module: {err}"))?
    };

    unsafe { main_fn.call() };
    Ok(())
}

fn register_runtime_symbols(module: &Module, engine: &ExecutionEngine) {
    use coral_runtime::ops::*;

    macro_rules! map {
        ($name:literal, $addr:expr) => {
            if let Some(f) = module.get_function($name) {
                engine.add_global_mapping(&f, $addr as usize);
            }
        };
    }

    map!("coral_box_int", coral_box_int);
    map!("coral_box_bool", coral_box_bool);
    map!("coral_box_string", coral_box_string);
    map!("coral_unbox_int", coral_unbox_int);
    map!("coral_unbox_bool", coral_unbox_bool);
    map!("coral_object_tag", coral_object_tag);
    map!("coral_incref", coral_incref);
    map!("coral_decref", coral_decref);
    map!("coral_string_concat", coral_string_concat);
    map!("coral_string_eq", coral_string_eq);
    map!("coral_dynamic_add", coral_dynamic_add);
    map!("coral_dynamic_eq", coral_dynamic_eq);
    map!("coral_tuple_new", coral_tuple_new);
    map!("coral_tuple_first", coral_tuple_first);
    map!("coral_tuple_second", coral_tuple_second);
    map!("coral_function_new", coral_function_new);
    map!("coral_function_set_capture", coral_function_set_capture);
    map!("coral_function_get_capture", coral_function_get_capture);
    map!("coral_function_call", coral_function_call);
    map!("coral_print_object", coral_print_object);
    map!("coral_type_check_failed", coral_type_check_failed);
    map!("coral_operator_kind_mismatch", coral_operator_kind_mismatch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_minimal_invocation() {
        let cli = Cli::parse_from(["coral", "program.json"]);
        assert_eq!(cli.file, PathBuf::from("program.json"));
        assert!(!cli.parse);
        assert!(!cli.emit_llvm);
        assert!(!cli.verify_llvm);
    }

    #[test]
    fn cli_parses_all_flags() {
        let cli = Cli::parse_from([
            "coral",
            "program.json",
            "--emit-llvm",
            "--verify-llvm",
            "--parse",
        ]);
        assert!(cli.parse);
        assert!(cli.emit_llvm);
        assert!(cli.verify_llvm);
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
