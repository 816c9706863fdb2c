// ABOUTME: Recursive-descent parser turning a token stream into a program (list of statements)

use crate::ast::{BinOp, Expr, FuncDecl, Literal, Stmt, TypedName, UnOp};
use crate::error::{Result, SstError};
use crate::lexer::{Lexer, Token};
use std::sync::Arc;

const STMT_KEYWORDS: &[&str] = &[
    "use", "newtype", "func", "always", "if", "while", "return", "break", "continue",
];

pub fn parse(source: &str) -> Result<Vec<Stmt>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn at_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == word)
    }

    fn at_symbol(&self, sym: &str) -> bool {
        matches!(self.peek(), Token::Symbol(s) if s == sym)
    }

    fn expect_ident(&mut self, word: &str) -> Result<()> {
        if self.at_ident(word) {
            self.advance();
            Ok(())
        } else {
            Err(SstError::parse(format!(
                "expected '{}', found {:?}",
                word,
                self.peek()
            )))
        }
    }

    fn expect_any_ident(&mut self) -> Result<String> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            other => Err(SstError::parse(format!(
                "expected an identifier, found {:?}",
                other
            ))),
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<()> {
        if self.at_symbol(sym) {
            self.advance();
            Ok(())
        } else {
            Err(SstError::parse(format!(
                "expected '{}', found {:?}",
                sym,
                self.peek()
            )))
        }
    }

    fn expect_semicolon(&mut self) -> Result<()> {
        match self.advance() {
            Token::Semicolon => Ok(()),
            other => Err(SstError::parse(format!("expected ';', found {:?}", other))),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !matches!(self.peek(), Token::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    /// Parses statements until the next token is one of `terminators`
    /// (without consuming it).
    fn parse_block(&mut self, terminators: &[&str]) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            if let Token::Ident(word) = self.peek() {
                if terminators.contains(&word.as_str()) {
                    break;
                }
            }
            if matches!(self.peek(), Token::Eof) {
                return Err(SstError::parse("unexpected end of input, missing 'end;'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            Token::Ident(w) if w == "use" => self.parse_use(),
            Token::Ident(w) if w == "newtype" => self.parse_newtype(),
            Token::Ident(w) if w == "func" => Ok(Stmt::FuncDecl(Arc::new(self.parse_funcdecl()?))),
            Token::Ident(w) if w == "always" => self.parse_always(),
            Token::Ident(w) if w == "if" => self.parse_if(),
            Token::Ident(w) if w == "while" => self.parse_while(),
            Token::Ident(w) if w == "return" => self.parse_return(),
            Token::Ident(w) if w == "break" => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Break)
            }
            Token::Ident(w) if w == "continue" => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Continue)
            }
            Token::Ident(w)
                if !STMT_KEYWORDS.contains(&w.as_str()) && self.looks_like_var_decl() =>
            {
                self.parse_var_decl()
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_semicolon()?;
                Ok(Stmt::ExprStmt(expr))
            }
        }
    }

    /// 2-token lookahead: `IDENT IDENT '='` is a variable declaration.
    fn looks_like_var_decl(&self) -> bool {
        matches!(self.peek(), Token::Ident(_))
            && matches!(self.peek_at(1), Token::Ident(_))
            && self.peek_at(2) == &Token::Symbol("=".to_string())
    }

    fn parse_use(&mut self) -> Result<Stmt> {
        self.advance(); // 'use'
        let name = self.expect_any_ident()?;
        self.expect_semicolon()?;
        Ok(Stmt::Use(name))
    }

    fn parse_var_decl(&mut self) -> Result<Stmt> {
        let type_name = self.expect_any_ident()?;
        let name = self.expect_any_ident()?;
        self.expect_symbol("=")?;
        let init = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(Stmt::VarDecl {
            type_name,
            name,
            init,
        })
    }

    fn parse_newtype(&mut self) -> Result<Stmt> {
        self.advance(); // 'newtype'
        let name = self.expect_any_ident()?;
        self.expect_symbol(":")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.at_ident("end") {
            if matches!(self.peek(), Token::Eof) {
                return Err(SstError::parse(
                    "unexpected end of input in 'newtype', missing 'end;'",
                ));
            }
            if self.at_ident("func") {
                methods.push(Arc::new(self.parse_funcdecl()?));
            } else {
                let field_type = self.expect_any_ident()?;
                let field_name = self.expect_any_ident()?;
                self.expect_semicolon()?;
                fields.push((field_type, field_name));
            }
        }
        self.expect_ident("end")?;
        self.expect_semicolon()?;
        Ok(Stmt::NewType {
            name,
            fields,
            methods,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<TypedName>> {
        self.expect_symbol("(")?;
        let mut params = Vec::new();
        while !self.at_symbol(")") {
            let type_name = self.expect_any_ident()?;
            let name = self.expect_any_ident()?;
            params.push((type_name, name));
            if self.at_symbol(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_symbol(")")?;
        Ok(params)
    }

    fn parse_funcdecl(&mut self) -> Result<FuncDecl> {
        self.advance(); // 'func'
        let name = self.expect_any_ident()?;
        let params = self.parse_params()?;
        self.expect_symbol(":")?;
        let body = self.parse_block(&["end"])?;
        self.expect_ident("end")?;
        self.expect_semicolon()?;
        Ok(FuncDecl { name, params, body })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.advance(); // 'if'
        self.expect_symbol("(")?;
        let cond = self.parse_expr()?;
        self.expect_symbol(")")?;
        self.expect_symbol(":")?;
        let then_branch = self.parse_block(&["elif", "else", "end"])?;

        let mut elifs = Vec::new();
        while self.at_ident("elif") {
            self.advance();
            self.expect_symbol("(")?;
            let elif_cond = self.parse_expr()?;
            self.expect_symbol(")")?;
            self.expect_symbol(":")?;
            let elif_body = self.parse_block(&["elif", "else", "end"])?;
            elifs.push((elif_cond, elif_body));
        }

        let else_branch = if self.at_ident("else") {
            self.advance();
            self.expect_symbol(":")?;
            Some(self.parse_block(&["end"])?)
        } else {
            None
        };

        self.expect_ident("end")?;
        self.expect_semicolon()?;
        Ok(Stmt::If {
            cond,
            then_branch,
            elifs,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        self.advance(); // 'while'
        self.expect_symbol("(")?;
        let cond = self.parse_expr()?;
        self.expect_symbol(")")?;
        self.expect_symbol(":")?;
        let body = self.parse_block(&["end"])?;
        self.expect_ident("end")?;
        self.expect_semicolon()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_always(&mut self) -> Result<Stmt> {
        self.advance(); // 'always'
        self.expect_symbol("(")?;
        let interval = self.parse_expr()?;
        self.expect_symbol(")")?;
        self.expect_symbol(":")?;
        let body = self.parse_block(&["end"])?;
        self.expect_ident("end")?;
        self.expect_semicolon()?;
        Ok(Stmt::Always {
            interval,
            body: Arc::new(body),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        self.advance(); // 'return'
        if matches!(self.peek(), Token::Semicolon) {
            self.advance();
            return Ok(Stmt::Return(None));
        }
        let expr = self.parse_expr()?;
        self.expect_semicolon()?;
        Ok(Stmt::Return(Some(expr)))
    }

    fn parse_comma_separated(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut elems = Vec::new();
        while !self.at_symbol(close) {
            elems.push(self.parse_expr()?);
            if self.at_symbol(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_symbol(close)?;
        Ok(elems)
    }

    // ---- expression grammar, lowest to highest precedence ----

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let lhs = self.parse_or()?;
        if self.at_symbol("=") {
            self.advance();
            let rhs = self.parse_assignment()?;
            return Ok(Expr::Assign(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at_ident("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.at_ident("and") {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Symbol(s) if s == ">" => BinOp::Gt,
                Token::Symbol(s) if s == "<" => BinOp::Lt,
                Token::Symbol(s) if s == ">=" => BinOp::GtEq,
                Token::Symbol(s) if s == "<=" => BinOp::LtEq,
                Token::Symbol(s) if s == "==" => BinOp::Eq,
                Token::Symbol(s) if s == "!=" => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Symbol(s) if s == "+" => BinOp::Add,
                Token::Symbol(s) if s == "-" => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Symbol(s) if s == "*" => BinOp::Mul,
                Token::Symbol(s) if s == "/" => BinOp::Div,
                Token::Symbol(s) if s == "%" => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.at_symbol("-") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnOp::Neg, Box::new(operand)));
        }
        if self.at_symbol("+") {
            self.advance();
            return self.parse_unary();
        }
        if self.at_ident("not") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnOp::Not, Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_symbol("(") {
                self.advance();
                let args = self.parse_comma_separated(")")?;
                expr = Expr::Call(Box::new(expr), args);
            } else if self.at_symbol(".") {
                self.advance();
                let name = self.expect_any_ident()?;
                if self.at_symbol("(") {
                    self.advance();
                    let args = self.parse_comma_separated(")")?;
                    expr = Expr::MemberCall(Box::new(expr), name, args);
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.at_symbol("[") {
                self.advance();
                let index = self.parse_expr()?;
                self.expect_symbol("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Ident(w) if w == "true" => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Token::Ident(w) if w == "false" => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(n)))
            }
            Token::Float(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(n)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Token::Symbol(s) if s == "[" => {
                self.advance();
                let elems = self.parse_comma_separated("]")?;
                Ok(Expr::ListLit(elems))
            }
            Token::Symbol(s) if s == "{" => {
                self.advance();
                let elems = self.parse_comma_separated("}")?;
                Ok(Expr::RecordLit(elems))
            }
            Token::Symbol(s) if s == "(" => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            other => Err(SstError::parse(format!(
                "expected an expression, found {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_var_decl() {
        let prog = parse("num a = 7 / 2;").unwrap();
        assert!(matches!(prog.as_slice(), [Stmt::VarDecl { .. }]));
    }

    #[test]
    fn parses_while_with_break_continue_body() {
        let prog = parse("num i = 0; while (i < 3): output(i); i = i + 1; end;").unwrap();
        assert_eq!(prog.len(), 2);
        assert!(matches!(prog[1], Stmt::While { .. }));
    }

    #[test]
    fn parses_if_elif_else() {
        let prog =
            parse("if (a > 0): output(1); elif (a < 0): output(2); else: output(3); end;")
                .unwrap();
        match &prog[0] {
            Stmt::If {
                elifs, else_branch, ..
            } => {
                assert_eq!(elifs.len(), 1);
                assert!(else_branch.is_some());
            }
            _ => panic!("expected If"),
        }
    }

    #[test]
    fn parses_newtype_with_fields_and_method() {
        let prog = parse("newtype P: num x; num y; func sum(): return x + y; end; end;").unwrap();
        match &prog[0] {
            Stmt::NewType {
                name,
                fields,
                methods,
            } => {
                assert_eq!(name, "P");
                assert_eq!(fields.len(), 2);
                assert_eq!(methods.len(), 1);
                assert_eq!(methods[0].name, "sum");
            }
            _ => panic!("expected NewType"),
        }
    }

    #[test]
    fn parses_record_literal_and_member_call() {
        let prog = parse("P p = {3, 4}; output(p.sum());").unwrap();
        assert!(matches!(
            prog[0],
            Stmt::VarDecl {
                init: Expr::RecordLit(_),
                ..
            }
        ));
    }

    #[test]
    fn parses_recursive_function() {
        let prog =
            parse("func f(num n): if (n <= 1): return n; end; return f(n-1) + f(n-2); end;")
                .unwrap();
        assert!(matches!(prog[0], Stmt::FuncDecl(_)));
    }

    #[test]
    fn parses_index_and_size_member_call() {
        let prog = parse("str s = \"hello\"; output(s.size());").unwrap();
        assert_eq!(prog.len(), 2);
    }

    #[test]
    fn missing_end_is_parse_error() {
        assert!(parse("while (true): output(1);").is_err());
    }

    #[test]
    fn assignment_is_right_associative_and_generic_at_parse_time() {
        // runtime rejects a non-Ident LHS; the parser itself just builds the node
        let prog = parse("a = b = 1;").unwrap();
        assert!(matches!(prog[0], Stmt::ExprStmt(Expr::Assign(..))));
    }

    #[test]
    fn and_or_short_circuit_tree_shape() {
        let prog = parse("x = a and b or c;").unwrap();
        match &prog[0] {
            Stmt::ExprStmt(Expr::Assign(_, rhs)) => {
                assert!(matches!(**rhs, Expr::Binary(BinOp::Or, _, _)));
            }
            _ => panic!("expected assignment"),
        }
    }
}
