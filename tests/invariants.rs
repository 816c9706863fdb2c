// ABOUTME: Tests for the interpreter's documented cross-cutting invariants

use sst::env::Environment;
use sst::eval::{Interpreter, Io};
use sst::lexer::{Lexer, Token};
use sst::loader::FsModuleLoader;
use sst::scheduler::RealClock;
use sst::value::Value;
use std::sync::{Arc, Mutex};

struct CapturingIo {
    lines: Mutex<Vec<String>>,
}

impl CapturingIo {
    fn new() -> Arc<Self> {
        Arc::new(CapturingIo {
            lines: Mutex::new(Vec::new()),
        })
    }
}

impl Io for CapturingIo {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
    fn next_token(&self) -> Option<String> {
        None
    }
}

fn run_source(source: &str) -> Vec<String> {
    let io = CapturingIo::new();
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

/// A parameter's prior value (or absence) is restored on return, but any
/// other name the callee reassigned through the live, shared environment
/// persists past the call.
#[test]
fn call_frame_restore_is_keyed_not_wholesale() {
    let out = run_source(
        "num shared = 0; \
         num x = 10; \
         func f(num x): shared = shared + 1; x = x * 100; return x; end; \
         num result = f(x); \
         output(result); \
         output(x); \
         output(shared);",
    );
    assert_eq!(out, vec!["1000", "10", "1"]);
}

/// A name that did not exist before a call is removed on return, not left
/// behind with a leftover value: referencing it afterward is undefined.
#[test]
fn locals_introduced_inside_a_call_do_not_leak_to_the_caller() {
    let io = CapturingIo::new();
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::default()),
        io,
        Arc::new(RealClock),
    );
    let program = sst::parser::parse(
        "func f(): num scratch = 42; return scratch; end; \
         num r = f(); \
         output(scratch);",
    )
    .unwrap();
    assert!(sst::eval::run(&interp, &program).is_err());
}

/// `and`/`or` never evaluate their right-hand side when the left side
/// already determines the result.
#[test]
fn short_circuit_boolean_operators_skip_the_unevaluated_side() {
    let out = run_source(
        "num calls = 0; \
         func sideEffect(): calls = calls + 1; return true; end; \
         bool a = false and sideEffect(); \
         bool b = true or sideEffect(); \
         output(calls);",
    );
    assert_eq!(out, vec!["0"]);
}

/// Division and modulo by zero on integers are fatal, not a panic or `inf`.
#[test]
fn integer_division_by_zero_is_a_user_facing_error() {
    let io = CapturingIo::new();
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::default()),
        io,
        Arc::new(RealClock),
    );
    let program = sst::parser::parse("num a = 1 / 0;").unwrap();
    assert!(sst::eval::run(&interp, &program).is_err());
}

/// Two independent top-level `newtype` declarations both land in the same
/// registry regardless of declaration order.
#[test]
fn multiple_newtypes_coexist_in_one_registry() {
    let out = run_source(
        "newtype A: num x; end; \
         newtype B: num y; end; \
         A a = {1}; \
         B b = {2}; \
         output(a.x); \
         output(b.y);",
    );
    assert_eq!(out, vec!["1", "2"]);
}

/// `use` isolates a module's own top-level variables and functions from the
/// importing program: they only reach it bundled inside the returned
/// `Value::Module`, accessed by member lookup.
#[test]
fn use_isolates_the_module_env_but_exposes_its_bindings_as_a_module_value() {
    let dir = std::env::temp_dir().join("sst_invariants_use_isolation");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(&dir.join("greeting.sst"), "str name = \"world\";").unwrap();

    let io = CapturingIo::new();
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::new(&dir)),
        io.clone(),
        Arc::new(RealClock),
    );
    let program =
        sst::parser::parse("use greeting; output(greeting.name);").expect("program parses");
    sst::eval::run(&interp, &program).expect("program runs");
    assert_eq!(io.lines.lock().unwrap().clone(), vec!["world"]);

    let io = CapturingIo::new();
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::new(&dir)),
        io,
        Arc::new(RealClock),
    );
    let program = sst::parser::parse("use greeting; output(name);").unwrap();
    assert!(sst::eval::run(&interp, &program).is_err());
}

/// A `newtype` declared inside a `use`-loaded module registers in the
/// shared, global type registry, so the importer can coerce against it by
/// name without qualifying it through the module value.
#[test]
fn newtype_declared_inside_a_used_module_is_visible_to_the_importer() {
    let dir = std::env::temp_dir().join("sst_invariants_use_shared_types");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        &dir.join("shapes.sst"),
        "newtype Point: num x; num y; end;",
    )
    .unwrap();

    let io = CapturingIo::new();
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::new(&dir)),
        io.clone(),
        Arc::new(RealClock),
    );
    let program = sst::parser::parse("use shapes; Point p = {3, 4}; output(p.x + p.y);").unwrap();
    sst::eval::run(&interp, &program).expect("program runs");
    assert_eq!(io.lines.lock().unwrap().clone(), vec!["7"]);
}

/// Renders a token back to source text so it can be fed through the lexer
/// a second time. Only has to roundtrip well-formed-program tokens.
fn token_text(token: &Token) -> String {
    match token {
        Token::Ident(s) => s.clone(),
        Token::Int(n) => n.to_string(),
        Token::Float(f) => f.to_string(),
        Token::Str(s) => format!("\"{}\"", s),
        Token::Semicolon => ";".to_string(),
        Token::Symbol(s) => s.clone(),
        Token::Eof => String::new(),
    }
}

/// Re-lexing a well-formed program's token text yields the same sequence of
/// token kinds as the original lex (structural stability).
#[test]
fn relexing_a_programs_token_text_yields_the_same_token_kinds() {
    let source = "newtype Counter: num n; \
           func bump(): n = n + 1; return n; end; \
         end; \
         Counter c = {0}; \
         num total = 0; \
         while (total < 3): \
           total = total + c.bump(); \
           if (total == 2): continue; end; \
           output(total); \
         end;";

    let original = Lexer::new(source).tokenize().expect("source lexes");
    let rendered = original
        .iter()
        .map(token_text)
        .collect::<Vec<_>>()
        .join(" ");
    let relexed = Lexer::new(&rendered).tokenize().expect("rendered text lexes");

    assert_eq!(original.len(), relexed.len());
    for (a, b) in original.iter().zip(relexed.iter()) {
        assert_eq!(
            std::mem::discriminant(a),
            std::mem::discriminant(b),
            "token kind mismatch: {:?} vs {:?}",
            a,
            b
        );
    }
}

/// A record's key set is always a superset of its declared type's fields,
/// and every declared method name maps to a `Function` value in the record.
#[test]
fn record_keys_cover_declared_fields_and_methods_map_to_functions() {
    let io = CapturingIo::new();
    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::default()),
        io,
        Arc::new(RealClock),
    );
    let program = sst::parser::parse(
        "newtype Counter: num n; \
           func bump(): n = n + 1; return n; end; \
         end; \
         Counter c = {0};",
    )
    .unwrap();
    sst::eval::run(&interp, &program).expect("program runs");

    let guard = interp.env.lock_bindings();
    let record = guard.get("c").expect("c is bound");
    let Value::Record(fields) = record else {
        panic!("expected a record, got {:?}", record);
    };

    assert!(fields.contains_key("n"), "declared field 'n' missing");
    assert!(matches!(fields.get("n"), Some(Value::Int(0))));

    let method = fields.get("bump").expect("declared method 'bump' missing");
    assert!(
        matches!(method, Value::Function(_)),
        "method 'bump' should map to a Function, got {:?}",
        method
    );
}
