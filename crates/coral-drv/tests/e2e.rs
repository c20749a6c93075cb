//! End-to-end tests driving the built `coral` binary against JSON AST
//! fixtures covering the calibration scenarios from the language guide.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/e2e/fixtures")
        .join(name)
}

fn coral() -> Command {
    Command::new(env!("CARGO_BIN_EXE_coral"))
}

#[test]
fn arithmetic_precedence_and_integer_division() {
    coral()
        .arg(fixture("scenario1_arithmetic.json"))
        .assert()
        .success()
        .stdout(predicate::eq("0\n"));
}

#[test]
fn boolean_and_string_equality_print_as_true_false() {
    coral()
        .arg(fixture("scenario2_bool_and_string_eq.json"))
        .assert()
        .success()
        .stdout(predicate::eq("true\nfalse\n"));
}

#[test]
fn integer_plus_string_stringifies_and_concatenates() {
    coral()
        .arg(fixture("scenario3_int_string_concat.json"))
        .assert()
        .success()
        .stdout(predicate::eq("100foofoo200\n"));
}

#[test]
fn self_recursive_function_computes_fibonacci() {
    coral()
        .arg(fixture("scenario4_fib_recursive.json"))
        .assert()
        .success()
        .stdout(predicate::eq("55\n"));
}

#[test]
fn tail_recursive_accumulator_does_not_overflow_the_stack() {
    coral()
        .arg(fixture("scenario5_tail_call.json"))
        .assert()
        .success()
        .stdout(predicate::eq("1836311903\n"));
}

#[test]
fn tuple_branches_of_an_if_unify_to_a_common_type() {
    coral()
        .arg(fixture("scenario6_tuple_conditional.json"))
        .assert()
        .success()
        .stdout(predicate::eq("1\n"));
}

#[test]
fn emit_llvm_prints_ir_without_running_it() {
    coral()
        .arg(fixture("scenario1_arithmetic.json"))
        .arg("--emit-llvm")
        .assert()
        .success()
        .stdout(predicate::str::contains("define"))
        .stdout(predicate::str::contains("coral_main"));
}

#[test]
fn verify_llvm_prints_verified_ir() {
    coral()
        .arg(fixture("scenario4_fib_recursive.json"))
        .arg("--verify-llvm")
        .assert()
        .success()
        .stdout(predicate::str::contains("define"));
}

#[test]
fn parse_flag_rejects_source_text_with_a_clear_diagnostic() {
    coral()
        .arg(fixture("scenario1_arithmetic.json"))
        .arg("--parse")
        .assert()
        .failure()
        .stderr(predicate::str::contains("source parsing is not part of this build"));
}

#[test]
fn missing_file_fails_with_nonzero_exit() {
    coral()
        .arg(fixture("does_not_exist.json"))
        .assert()
        .failure();
}
