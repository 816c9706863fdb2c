// ABOUTME: Single-pass byte scanner turning SST source text into a token stream

use crate::error::{Result, SstError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Semicolon,
    Symbol(String),
    Eof,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    _source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            _source: source,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_end = token == Token::Eof;
            tokens.push(token);
            if at_end {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => break,
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        if c.is_ascii_digit() {
            return self.read_number();
        }

        if c == '_' || c.is_alphabetic() {
            return Ok(self.read_ident());
        }

        if c == '"' {
            return self.read_string();
        }

        if c == ';' {
            self.advance();
            return Ok(Token::Semicolon);
        }

        if matches!(c, '>' | '<' | '=' | '!') && self.peek_at(1) == Some('=') {
            self.advance();
            self.advance();
            return Ok(Token::Symbol(format!("{}=", c)));
        }

        self.advance();
        Ok(Token::Symbol(c.to_string()))
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }
        Token::Ident(self.chars[start..self.pos].iter().collect())
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut dot_count = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' {
                dot_count += 1;
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match dot_count {
            0 => text
                .parse::<i64>()
                .map(Token::Int)
                .map_err(|e| SstError::lex(format!("malformed integer '{}': {}", text, e))),
            1 => text
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|e| SstError::lex(format!("malformed number '{}': {}", text, e))),
            _ => Err(SstError::lex(format!(
                "malformed number '{}': more than one decimal point",
                text
            ))),
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // opening quote
        let mut content = String::new();
        loop {
            match self.advance() {
                None => return Err(SstError::lex("unterminated string literal")),
                Some('"') => break,
                Some('\\') => {
                    // Verbatim lookahead: consume the escaped character as-is,
                    // without interpreting it, so an escaped quote does not
                    // end the string early.
                    content.push('\\');
                    if let Some(next) = self.advance() {
                        content.push(next);
                    }
                }
                Some(c) => content.push(c),
            }
        }
        Ok(Token::Str(content))
    }
}
