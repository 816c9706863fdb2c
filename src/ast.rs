// ABOUTME: Abstract syntax tree produced by the parser and consumed by the evaluator

use std::sync::Arc;

/// A `(declared_type_name, name)` pair: a function parameter or a `newtype`
/// field declaration.
pub type TypedName = (String, String);

#[derive(Debug, Clone)]
pub enum Stmt {
    Use(String),
    NewType {
        name: String,
        fields: Vec<TypedName>,
        methods: Vec<Arc<FuncDecl>>,
    },
    FuncDecl(Arc<FuncDecl>),
    VarDecl {
        type_name: String,
        name: String,
        init: Expr,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        elifs: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Always {
        interval: Expr,
        body: Arc<Vec<Stmt>>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    ExprStmt(Expr),
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<TypedName>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Assign(Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Member(Box<Expr>, String),
    MemberCall(Box<Expr>, String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    ListLit(Vec<Expr>),
    RecordLit(Vec<Expr>),
}
