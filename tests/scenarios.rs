// ABOUTME: End-to-end program scenarios driven through the public crate API

use sst::env::Environment;
use sst::eval::{Interpreter, Io};
use sst::loader::FsModuleLoader;
use sst::scheduler::RealClock;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct CapturingIo {
    lines: Mutex<Vec<String>>,
    tokens: Mutex<VecDeque<String>>,
}

impl CapturingIo {
    fn new(tokens: &[&str]) -> Arc<Self> {
        Arc::new(CapturingIo {
            lines: Mutex::new(Vec::new()),
            tokens: Mutex::new(tokens.iter().map(|s| s.to_string()).collect()),
        })
    }
}

impl Io for CapturingIo {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
    fn next_token(&self) -> Option<String> {
        self.tokens.lock().unwrap().pop_front()
    }
}

fn run_source(source: &str) -> Vec<String> {
    run_source_with_input(source, &[])
}

fn run_source_with_input(source: &str, tokens: &[&str]) -> Vec<String> {
    let io = CapturingIo::new(tokens);
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::default()),
        io.clone(),
        Arc::new(RealClock),
    );
    let program = sst::parser::parse(source).expect("program parses");
    sst::eval::run(&interp, &program).expect("program runs");
    io.lines.lock().unwrap().clone()
}

#[test]
fn integer_division_floors_toward_negative_infinity() {
    assert_eq!(run_source("num a = 7 / 2; output(a);"), vec!["3"]);
    assert_eq!(run_source("num a = -7 / 2; output(a);"), vec!["-4"]);
}

#[test]
fn float_division_is_exact() {
    assert_eq!(run_source("fl a = 7 / 2.0; output(a);"), vec!["3.5"]);
}

#[test]
fn while_loop_with_break_and_continue() {
    let out = run_source(
        "num i = 0; \
         while (i < 10): \
           i = i + 1; \
           if (i == 2): continue; end; \
           if (i == 5): break; end; \
           output(i); \
         end;",
    );
    assert_eq!(out, vec!["1", "3", "4"]);
}

#[test]
fn records_carry_methods_and_mutate_their_own_fields() {
    let out = run_source(
        "newtype Counter: num n; \
           func bump(): n = n + 1; return n; end; \
         end; \
         Counter c = {0}; \
         output(c.bump()); \
         output(c.bump()); \
         output(c.n);",
    );
    assert_eq!(out, vec!["1", "2", "2"]);
}

#[test]
fn recursive_function_computes_fibonacci() {
    assert_eq!(
        run_source(
            "func fib(num n): \
               if (n <= 1): return n; end; \
               return fib(n - 1) + fib(n - 2); \
             end; \
             output(fib(10));"
        ),
        vec!["55"]
    );
}

#[test]
fn string_and_list_size_via_member_call() {
    let out = run_source(
        r#"str s = "hello"; output(s.size()); li xs = [1, 2, 3]; output(xs.size());"#,
    );
    assert_eq!(out, vec!["5", "3"]);
}

#[test]
fn input_builtin_coerces_against_declared_type() {
    let out = run_source_with_input("num a = 0; input(a); output(a * 2);", &["21"]);
    assert_eq!(out, vec!["42"]);
}

#[test]
fn and_or_short_circuit_and_yield_the_last_evaluated_operand() {
    let out = run_source(
        "num n = 0; \
         num a = 0 and n; \
         num b = 1 or n; \
         output(a); \
         output(b);",
    );
    assert_eq!(out, vec!["0", "1"]);
}

#[test]
fn exec_evaluates_source_against_the_calling_environment() {
    assert_eq!(
        run_source(r#"num a = 1; exec("a = a + 41;"); output(a);"#),
        vec!["42"]
    );
}

#[test]
fn error_builtin_terminates_the_program() {
    let io = CapturingIo::new(&[]);
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::default()),
        io,
        Arc::new(RealClock),
    );
    let program = sst::parser::parse(r#"output(1); error("fatal"); output(2);"#).unwrap();
    assert!(sst::eval::run(&interp, &program).is_err());
}
