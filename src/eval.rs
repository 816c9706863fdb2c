// ABOUTME: The tree-walking evaluator: statement execution, expression evaluation, scheduler wiring

use crate::ast::{BinOp, Expr, Literal, Stmt, UnOp};
use crate::env::{CallFrame, Environment, TypeDef};
use crate::error::{Flow, Result, SstError};
use crate::loader::ModuleLoader;
use crate::parser;
use crate::scheduler::{self, Clock};
use crate::value::{FunctionValue, Value};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use std::io::BufRead;
use std::sync::{Arc, Mutex};

/// The program's input/output channels, abstracted the way the language
/// treats them: a line-oriented `write_line` and a whitespace-tokenized
/// `next_token` reader, both independent of any particular transport.
pub trait Io: Send + Sync {
    fn write_line(&self, line: &str);
    fn next_token(&self) -> Option<String>;
}

/// Reads from process stdin, writes to process stdout.
pub struct StdIo {
    pending: Mutex<VecDeque<String>>,
}

impl Default for StdIo {
    fn default() -> Self {
        StdIo {
            pending: Mutex::new(VecDeque::new()),
        }
    }
}

impl Io for StdIo {
    fn write_line(&self, line: &str) {
        println!("{}", line);
    }

    fn next_token(&self) -> Option<String> {
        loop {
            if let Some(tok) = self.pending.lock().unwrap().pop_front() {
                return Some(tok);
            }
            let mut line = String::new();
            let n = std::io::stdin().lock().read_line(&mut line).ok()?;
            if n == 0 {
                return None;
            }
            let mut pending = self.pending.lock().unwrap();
            pending.extend(line.split_whitespace().map(|s| s.to_string()));
        }
    }
}

/// Process-wide interpreter state: the environment, the module loader, the
/// I/O channels, and the clock `always` workers sleep against.
pub struct Interpreter {
    pub env: Arc<Environment>,
    pub loader: Arc<dyn ModuleLoader>,
    pub io: Arc<dyn Io>,
    pub clock: Arc<dyn Clock>,
}

impl Interpreter {
    pub fn new(
        env: Arc<Environment>,
        loader: Arc<dyn ModuleLoader>,
        io: Arc<dyn Io>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Interpreter {
            env,
            loader,
            io,
            clock,
        })
    }
}

/// Runs a whole program: each top-level statement acquires and releases the
/// environment lock on its own. A separate free function (rather than a
/// method) because reaching an `always` block needs its own `Arc` handle to
/// hand to the spawned worker thread, and `&Arc<Self>` is not an allowed
/// method receiver.
pub fn run(interp: &Arc<Interpreter>, program: &[Stmt]) -> Result<()> {
    tracing::debug!(statements = program.len(), "script start");
    for stmt in program {
        exec_top_level(interp, stmt)?;
    }
    tracing::debug!("script end");
    Ok(())
}

/// Executes one statement as its own critical section. Used both by `run`
/// and by each iteration of an `always` worker, so main-thread and worker
/// statements interleave at per-statement granularity.
fn exec_top_level(interp: &Arc<Interpreter>, stmt: &Stmt) -> Result<()> {
    let mut guard = interp.env.lock_bindings();
    match exec_stmt(interp, stmt, &mut guard)? {
        None => Ok(()),
        Some(flow) => Err(SstError::StrayControlFlow(flow_name(&flow))),
    }
}

fn exec_block(
    interp: &Arc<Interpreter>,
    stmts: &[Stmt],
    env: &mut HashMap<String, Value>,
) -> Result<Option<Flow>> {
    for stmt in stmts {
        if let Some(flow) = exec_stmt(interp, stmt, env)? {
            return Ok(Some(flow));
        }
    }
    Ok(None)
}

fn exec_stmt(
    interp: &Arc<Interpreter>,
    stmt: &Stmt,
    env: &mut HashMap<String, Value>,
) -> Result<Option<Flow>> {
    match stmt {
        Stmt::Use(name) => {
            exec_use(interp, name, env)?;
            Ok(None)
        }
        Stmt::NewType {
            name,
            fields,
            methods,
        } => {
            let def = Arc::new(TypeDef {
                name: name.clone(),
                fields: fields.clone(),
                methods: methods.clone(),
            });
            interp
                .env
                .types
                .lock()
                .expect("type registry mutex poisoned")
                .insert(name.clone(), def);
            env.insert(name.clone(), Value::Type(name.clone()));
            Ok(None)
        }
        Stmt::FuncDecl(decl) => {
            let func = Value::Function(Arc::new(FunctionValue {
                decl: Arc::clone(decl),
                captured_env: env.clone(),
            }));
            env.insert(decl.name.clone(), func);
            Ok(None)
        }
        Stmt::VarDecl {
            type_name,
            name,
            init,
        } => {
            let value = interp.eval_expr(init, env)?;
            let types = interp.env.types.lock().expect("type registry mutex poisoned");
            let coerced = coerce(value, type_name, &types)?;
            drop(types);
            env.insert(name.clone(), coerced);
            Ok(None)
        }
        Stmt::If {
            cond,
            then_branch,
            elifs,
            else_branch,
        } => {
            if interp.eval_expr(cond, env)?.is_truthy() {
                return exec_block(interp, then_branch, env);
            }
            for (elif_cond, elif_body) in elifs {
                if interp.eval_expr(elif_cond, env)?.is_truthy() {
                    return exec_block(interp, elif_body, env);
                }
            }
            if let Some(else_body) = else_branch {
                return exec_block(interp, else_body, env);
            }
            Ok(None)
        }
        Stmt::While { cond, body } => {
            while interp.eval_expr(cond, env)?.is_truthy() {
                match exec_block(interp, body, env)? {
                    None | Some(Flow::Continue) => continue,
                    Some(Flow::Break) => break,
                    Some(Flow::Return(v)) => return Ok(Some(Flow::Return(v))),
                }
            }
            Ok(None)
        }
        Stmt::Return(expr) => {
            let value = match expr {
                Some(e) => interp.eval_expr(e, env)?,
                None => Value::Nil,
            };
            Ok(Some(Flow::Return(value)))
        }
        Stmt::Break => Ok(Some(Flow::Break)),
        Stmt::Continue => Ok(Some(Flow::Continue)),
        Stmt::ExprStmt(expr) => {
            interp.eval_expr(expr, env)?;
            Ok(None)
        }
        Stmt::Always { interval, body } => {
            exec_always(interp, interval, body, env)?;
            Ok(None)
        }
    }
}

fn exec_use(interp: &Arc<Interpreter>, name: &str, env: &mut HashMap<String, Value>) -> Result<()> {
    tracing::trace!(module = name, "module load start");
    let source = interp.loader.load(name)?;
    let program = parser::parse(&source)?;

    // The module's own variables and functions are isolated; its `newtype`
    // declarations register in the shared, global type registry.
    let mut module_env: HashMap<String, Value> = HashMap::new();
    for stmt in &program {
        if let Some(flow) = exec_stmt(interp, stmt, &mut module_env)? {
            return Err(SstError::StrayControlFlow(flow_name(&flow)));
        }
    }

    let module: IndexMap<String, Value> = module_env.into_iter().collect();
    tracing::debug!(module = name, "module loaded");
    env.insert(name.to_string(), Value::Module(Arc::new(module)));
    Ok(())
}

fn exec_always(
    interp: &Arc<Interpreter>,
    interval: &Expr,
    body: &Arc<Vec<Stmt>>,
    env: &mut HashMap<String, Value>,
) -> Result<()> {
    let interval_value = interp.eval_expr(interval, env)?;
    let seconds = match interval_value {
        Value::Int(n) => n as f64,
        Value::Float(f) => f,
        other => {
            return Err(SstError::type_error(
                "always",
                "num or fl",
                other.type_name(),
            ))
        }
    };

    tracing::debug!(interval = seconds, "always worker spawn");
    let worker_interp = Arc::clone(interp);
    let body = Arc::clone(body);
    scheduler::schedule(seconds, Arc::clone(&interp.clock), move || {
        for stmt in body.iter() {
            if let Err(e) = exec_top_level(&worker_interp, stmt) {
                tracing::error!(error = %e, "always block iteration failed");
                break;
            }
        }
    });
    Ok(())
}

fn flow_name(flow: &Flow) -> &'static str {
    match flow {
        Flow::Return(_) => "return",
        Flow::Break => "break",
        Flow::Continue => "continue",
    }
}

impl Interpreter {
    fn eval_expr(&self, expr: &Expr, env: &mut HashMap<String, Value>) -> Result<Value> {
        match expr {
            Expr::Literal(Literal::Int(n)) => Ok(Value::Int(*n)),
            Expr::Literal(Literal::Float(n)) => Ok(Value::Float(*n)),
            Expr::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
            Expr::Literal(Literal::Str(s)) => Ok(Value::Str(s.clone())),
            Expr::Ident(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| SstError::undefined(name.clone())),
            Expr::Assign(lhs, rhs) => {
                let Expr::Ident(name) = lhs.as_ref() else {
                    return Err(SstError::type_error(
                        "=",
                        "identifier",
                        "non-identifier expression",
                    ));
                };
                let value = self.eval_expr(rhs, env)?;
                env.insert(name.clone(), value.clone());
                Ok(value)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval_expr(operand, env)?;
                match op {
                    UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnOp::Neg => match value {
                        Value::Int(n) => Ok(Value::Int(-n)),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(SstError::type_error("-", "num or fl", other.type_name())),
                    },
                }
            }
            Expr::Binary(BinOp::And, lhs, rhs) => {
                let left = self.eval_expr(lhs, env)?;
                if !left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                let left = self.eval_expr(lhs, env)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let left = self.eval_expr(lhs, env)?;
                let right = self.eval_expr(rhs, env)?;
                eval_binop(*op, left, right)
            }
            Expr::ListLit(elems) | Expr::RecordLit(elems) => {
                let mut values = Vec::with_capacity(elems.len());
                for e in elems {
                    values.push(self.eval_expr(e, env)?);
                }
                Ok(Value::List(values))
            }
            Expr::Index(obj, index) => {
                let obj_val = self.eval_expr(obj, env)?;
                let index_val = self.eval_expr(index, env)?;
                let i = match index_val {
                    Value::Int(n) => n,
                    other => return Err(SstError::type_error("[]", "num", other.type_name())),
                };
                match obj_val {
                    Value::List(items) => index_into(&items, i)
                        .cloned()
                        .ok_or_else(|| SstError::user(format!("index {} out of range", i))),
                    Value::Str(s) => {
                        let chars: Vec<char> = s.chars().collect();
                        index_into(&chars, i)
                            .map(|c| Value::Str(c.to_string()))
                            .ok_or_else(|| SstError::user(format!("index {} out of range", i)))
                    }
                    other => Err(SstError::no_such_member(other.type_name(), "[]")),
                }
            }
            Expr::Member(obj, name) => {
                let obj_val = self.eval_expr(obj, env)?;
                match obj_val {
                    Value::Record(fields) => fields
                        .get(name)
                        .cloned()
                        .ok_or_else(|| SstError::no_such_member("record", name.clone())),
                    Value::Module(module) => module
                        .get(name)
                        .cloned()
                        .ok_or_else(|| SstError::no_such_member("module", name.clone())),
                    other => Err(SstError::no_such_member(other.type_name(), name.clone())),
                }
            }
            Expr::Call(callee, args) => {
                if let Expr::Ident(name) = callee.as_ref() {
                    match name.as_str() {
                        "output" => return self.builtin_output(args, env),
                        "input" => return self.builtin_input(args, env),
                        "error" => return self.builtin_error(args, env),
                        "exec" => return self.builtin_exec(args, env),
                        _ => {}
                    }
                }
                let callee_val = self.eval_expr(callee, env)?;
                match callee_val {
                    Value::Function(func) => self.call_function(&func, args, env),
                    other => Err(SstError::type_error("call", "function", other.type_name())),
                }
            }
            Expr::MemberCall(obj, name, args) => self.eval_member_call(obj, name, args, env),
        }
    }

    fn call_function(
        &self,
        func: &Arc<FunctionValue>,
        args: &[Expr],
        env: &mut HashMap<String, Value>,
    ) -> Result<Value> {
        if args.len() != func.decl.params.len() {
            return Err(SstError::arity(
                func.decl.name.clone(),
                func.decl.params.len(),
                args.len(),
            ));
        }

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg, env)?);
        }

        // Closure fallbacks only fill in names the live environment doesn't
        // already have; a name the live environment does have keeps
        // resolving to its current value and is never overlaid, so writes
        // to it during the call are writes straight through to the caller.
        let mut overlay: HashMap<String, Value> = func
            .captured_env
            .iter()
            .filter(|(name, _)| !env.contains_key(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        {
            let types = self.env.types.lock().expect("type registry mutex poisoned");
            for ((param_type, param_name), value) in func.decl.params.iter().zip(arg_values) {
                let coerced = coerce(value, param_type, &types)?;
                overlay.insert(param_name.clone(), coerced);
            }
        }

        let frame = CallFrame::enter(env, overlay);
        let flow = exec_block_no_arc(self, &func.decl.body, env);
        frame.exit(env);

        match flow? {
            Some(Flow::Return(value)) => Ok(value),
            Some(Flow::Break) => Err(SstError::StrayControlFlow("break")),
            Some(Flow::Continue) => Err(SstError::StrayControlFlow("continue")),
            None => Ok(Value::Nil),
        }
    }

    fn eval_member_call(
        &self,
        obj: &Expr,
        name: &str,
        args: &[Expr],
        env: &mut HashMap<String, Value>,
    ) -> Result<Value> {
        if name == "size" && args.is_empty() {
            let obj_val = self.eval_expr(obj, env)?;
            return match obj_val {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                other => Err(SstError::no_such_member(other.type_name(), "size")),
            };
        }

        let obj_val = self.eval_expr(obj, env)?;
        let Value::Record(fields) = obj_val else {
            return Err(SstError::no_such_member(obj_val.type_name(), name));
        };
        let method = match fields.get(name) {
            Some(Value::Function(f)) => Arc::clone(f),
            _ => return Err(SstError::no_such_member("record", name)),
        };
        if args.len() != method.decl.params.len() {
            return Err(SstError::arity(
                method.decl.name.clone(),
                method.decl.params.len(),
                args.len(),
            ));
        }

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg, env)?);
        }

        let field_names: Vec<String> = fields
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Function(_)))
            .map(|(k, _)| k.clone())
            .collect();

        // Fields always shadow, regardless of what's already live, since a
        // method must see its own instance's data; closure fallbacks only
        // fill in names the live environment doesn't already have.
        let mut overlay: HashMap<String, Value> = method
            .captured_env
            .iter()
            .filter(|(name, _)| !env.contains_key(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for field_name in &field_names {
            overlay.insert(field_name.clone(), fields[field_name.as_str()].clone());
        }
        {
            let types = self.env.types.lock().expect("type registry mutex poisoned");
            for ((param_type, param_name), value) in method.decl.params.iter().zip(arg_values) {
                let coerced = coerce(value, param_type, &types)?;
                overlay.insert(param_name.clone(), coerced);
            }
        }

        let frame = CallFrame::enter(env, overlay);
        let flow = exec_block_no_arc(self, &method.decl.body, env);

        let mut updated_fields = fields.clone();
        for field_name in &field_names {
            if let Some(value) = env.get(field_name) {
                updated_fields.insert(field_name.clone(), value.clone());
            }
        }
        frame.exit(env);

        if let Expr::Ident(obj_name) = obj {
            env.insert(obj_name.clone(), Value::Record(updated_fields));
        }

        match flow? {
            Some(Flow::Return(value)) => Ok(value),
            Some(Flow::Break) => Err(SstError::StrayControlFlow("break")),
            Some(Flow::Continue) => Err(SstError::StrayControlFlow("continue")),
            None => Ok(Value::Nil),
        }
    }

    fn builtin_output(&self, args: &[Expr], env: &mut HashMap<String, Value>) -> Result<Value> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.eval_expr(arg, env)?.to_string());
        }
        self.io.write_line(&parts.join(" "));
        Ok(Value::Nil)
    }

    fn builtin_input(&self, args: &[Expr], env: &mut HashMap<String, Value>) -> Result<Value> {
        let mut targets = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expr::Ident(name) => targets.push(name.clone()),
                _ => {
                    return Err(SstError::type_error(
                        "input",
                        "identifier",
                        "non-identifier expression",
                    ))
                }
            }
        }

        for name in targets {
            let token = self
                .io
                .next_token()
                .ok_or_else(|| SstError::io("unexpected end of input"))?;
            let value = match env.get(&name) {
                Some(Value::Int(_)) => token
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| SstError::coercion(token.clone(), "num"))?,
                Some(Value::Float(_)) => token
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| SstError::coercion(token.clone(), "fl"))?,
                Some(Value::Bool(_)) => Value::Bool(matches!(token.as_str(), "true" | "1")),
                _ => Value::Str(token),
            };
            env.insert(name, value);
        }
        Ok(Value::Nil)
    }

    fn builtin_error(&self, args: &[Expr], env: &mut HashMap<String, Value>) -> Result<Value> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.eval_expr(arg, env)?.to_string());
        }
        Err(SstError::user(parts.join(" ")))
    }

    fn builtin_exec(&self, args: &[Expr], env: &mut HashMap<String, Value>) -> Result<Value> {
        if args.len() != 1 {
            return Err(SstError::arity("exec", 1, args.len()));
        }
        let source_val = self.eval_expr(&args[0], env)?;
        let Value::Str(source) = source_val else {
            return Err(SstError::type_error("exec", "str", source_val.type_name()));
        };
        let program = parser::parse(&source)?;
        match exec_block_no_arc(self, &program, env)? {
            Some(Flow::Return(value)) => Ok(value),
            Some(Flow::Break) => Err(SstError::StrayControlFlow("break")),
            Some(Flow::Continue) => Err(SstError::StrayControlFlow("continue")),
            None => Ok(Value::Nil),
        }
    }
}

/// Walks a statement body against a plain `&Interpreter` rather than the
/// `Arc`-carrying path `exec_block` uses. Function and method bodies (and
/// `exec`'s dynamically-parsed source) reach this helper; `always` is
/// rejected here rather than threaded through, since spawning a worker
/// needs its own owned `Arc<Interpreter>` handle that a nested call frame
/// does not have on hand.
fn exec_block_no_arc(
    interp: &Interpreter,
    stmts: &[Stmt],
    env: &mut HashMap<String, Value>,
) -> Result<Option<Flow>> {
    for stmt in stmts {
        if let Some(flow) = exec_stmt_no_arc(interp, stmt, env)? {
            return Ok(Some(flow));
        }
    }
    Ok(None)
}

fn exec_stmt_no_arc(
    interp: &Interpreter,
    stmt: &Stmt,
    env: &mut HashMap<String, Value>,
) -> Result<Option<Flow>> {
    match stmt {
        Stmt::Always { .. } => Err(SstError::user(
            "'always' is only valid as a top-level statement",
        )),
        Stmt::Use(name) => {
            let source = interp.loader.load(name)?;
            let program = parser::parse(&source)?;
            let mut module_env: HashMap<String, Value> = HashMap::new();
            for s in &program {
                if let Some(flow) = exec_stmt_no_arc(interp, s, &mut module_env)? {
                    return Err(SstError::StrayControlFlow(flow_name(&flow)));
                }
            }
            let module: IndexMap<String, Value> = module_env.into_iter().collect();
            env.insert(name.clone(), Value::Module(Arc::new(module)));
            Ok(None)
        }
        Stmt::NewType {
            name,
            fields,
            methods,
        } => {
            let def = Arc::new(TypeDef {
                name: name.clone(),
                fields: fields.clone(),
                methods: methods.clone(),
            });
            interp
                .env
                .types
                .lock()
                .expect("type registry mutex poisoned")
                .insert(name.clone(), def);
            env.insert(name.clone(), Value::Type(name.clone()));
            Ok(None)
        }
        Stmt::FuncDecl(decl) => {
            let func = Value::Function(Arc::new(FunctionValue {
                decl: Arc::clone(decl),
                captured_env: env.clone(),
            }));
            env.insert(decl.name.clone(), func);
            Ok(None)
        }
        Stmt::VarDecl {
            type_name,
            name,
            init,
        } => {
            let value = interp.eval_expr(init, env)?;
            let types = interp.env.types.lock().expect("type registry mutex poisoned");
            let coerced = coerce(value, type_name, &types)?;
            drop(types);
            env.insert(name.clone(), coerced);
            Ok(None)
        }
        Stmt::If {
            cond,
            then_branch,
            elifs,
            else_branch,
        } => {
            if interp.eval_expr(cond, env)?.is_truthy() {
                return exec_block_no_arc(interp, then_branch, env);
            }
            for (elif_cond, elif_body) in elifs {
                if interp.eval_expr(elif_cond, env)?.is_truthy() {
                    return exec_block_no_arc(interp, elif_body, env);
                }
            }
            if let Some(else_body) = else_branch {
                return exec_block_no_arc(interp, else_body, env);
            }
            Ok(None)
        }
        Stmt::While { cond, body } => {
            while interp.eval_expr(cond, env)?.is_truthy() {
                match exec_block_no_arc(interp, body, env)? {
                    None | Some(Flow::Continue) => continue,
                    Some(Flow::Break) => break,
                    Some(Flow::Return(v)) => return Ok(Some(Flow::Return(v))),
                }
            }
            Ok(None)
        }
        Stmt::Return(expr) => {
            let value = match expr {
                Some(e) => interp.eval_expr(e, env)?,
                None => Value::Nil,
            };
            Ok(Some(Flow::Return(value)))
        }
        Stmt::Break => Ok(Some(Flow::Break)),
        Stmt::Continue => Ok(Some(Flow::Continue)),
        Stmt::ExprStmt(expr) => {
            interp.eval_expr(expr, env)?;
            Ok(None)
        }
    }
}

fn index_into<T>(items: &[T], i: i64) -> Option<&T> {
    if i < 0 {
        return None;
    }
    items.get(i as usize)
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn eval_binop(op: BinOp, left: Value, right: Value) -> Result<Value> {
    use BinOp::*;
    match op {
        Eq => Ok(Value::Bool(values_equal(&left, &right))),
        NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        Lt | LtEq | Gt | GtEq => compare(op, left, right),
        Add | Sub | Mul | Div | Mod => arithmetic(op, left, right),
        And | Or => unreachable!("and/or are short-circuited before reaching eval_binop"),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn compare(op: BinOp, left: Value, right: Value) -> Result<Value> {
    let (Some(a), Some(b)) = (as_f64(&left), as_f64(&right)) else {
        return Err(SstError::type_error(
            "comparison",
            "num or fl",
            format!("{}/{}", left.type_name(), right.type_name()),
        ));
    };
    let result = match op {
        BinOp::Lt => a < b,
        BinOp::LtEq => a <= b,
        BinOp::Gt => a > b,
        BinOp::GtEq => a >= b,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), _) | (Value::Float(_), _) if as_f64(right).is_some() => {
            as_f64(left) == as_f64(right)
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => false,
    }
}

fn arithmetic(op: BinOp, left: Value, right: Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinOp::Add => Ok(Value::Int(a + b)),
            BinOp::Sub => Ok(Value::Int(a - b)),
            BinOp::Mul => Ok(Value::Int(a * b)),
            BinOp::Div => {
                if b == 0 {
                    Err(SstError::user("division by zero"))
                } else {
                    Ok(Value::Int(floor_div(a, b)))
                }
            }
            BinOp::Mod => {
                if b == 0 {
                    Err(SstError::user("division by zero"))
                } else {
                    Ok(Value::Int(a - floor_div(a, b) * b))
                }
            }
            _ => unreachable!(),
        },
        (l, r) => {
            let (Some(a), Some(b)) = (as_f64(&l), as_f64(&r)) else {
                return Err(SstError::type_error(
                    format!("{:?}", op),
                    "num or fl",
                    format!("{}/{}", l.type_name(), r.type_name()),
                ));
            };
            match op {
                BinOp::Add => Ok(Value::Float(a + b)),
                BinOp::Sub => Ok(Value::Float(a - b)),
                BinOp::Mul => Ok(Value::Float(a * b)),
                BinOp::Div => {
                    if b == 0.0 {
                        Err(SstError::user("division by zero"))
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                BinOp::Mod => {
                    if b == 0.0 {
                        Err(SstError::user("division by zero"))
                    } else {
                        Ok(Value::Float(a % b))
                    }
                }
                _ => unreachable!(),
            }
        }
    }
}

/// Coerces `value` to the shape named by `type_name`: a built-in type
/// (`num`/`fl`/`str`/`bool`/`li`) or a registered `newtype`.
fn coerce(value: Value, type_name: &str, types: &HashMap<String, Arc<TypeDef>>) -> Result<Value> {
    match type_name {
        "num" => match value {
            Value::Int(n) => Ok(Value::Int(n)),
            Value::Float(f) => Ok(Value::Int(f as i64)),
            Value::Bool(b) => Ok(Value::Int(if b { 1 } else { 0 })),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| SstError::coercion(s, "num")),
            other => Err(SstError::type_error(
                "num",
                "num-coercible value",
                other.type_name(),
            )),
        },
        "fl" => match value {
            Value::Float(f) => Ok(Value::Float(f)),
            Value::Int(n) => Ok(Value::Float(n as f64)),
            Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| SstError::coercion(s, "fl")),
            other => Err(SstError::type_error(
                "fl",
                "fl-coercible value",
                other.type_name(),
            )),
        },
        "str" => Ok(Value::Str(value.to_string())),
        "bool" => Ok(Value::Bool(value.is_truthy())),
        "li" => match value {
            Value::List(items) => Ok(Value::List(items)),
            other => Err(SstError::type_error("li", "li", other.type_name())),
        },
        _ => coerce_to_record(value, type_name, types),
    }
}

fn coerce_to_record(
    value: Value,
    type_name: &str,
    types: &HashMap<String, Arc<TypeDef>>,
) -> Result<Value> {
    let def = types
        .get(type_name)
        .ok_or_else(|| SstError::undefined(type_name.to_string()))?;

    match value {
        Value::Record(fields) => Ok(Value::Record(fields)),
        Value::List(items) => {
            if items.len() != def.fields.len() {
                return Err(SstError::arity(
                    type_name.to_string(),
                    def.fields.len(),
                    items.len(),
                ));
            }
            let mut record = IndexMap::new();
            for ((field_type, field_name), item) in def.fields.iter().zip(items) {
                record.insert(field_name.clone(), coerce(item, field_type, types)?);
            }
            for method in &def.methods {
                record.insert(
                    method.name.clone(),
                    Value::Function(Arc::new(FunctionValue {
                        decl: Arc::clone(method),
                        captured_env: HashMap::new(),
                    })),
                );
            }
            Ok(Value::Record(record))
        }
        other => Err(SstError::type_error(
            type_name,
            "record literal",
            other.type_name(),
        )),
    }
}
