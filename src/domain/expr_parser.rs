//! Expression parser.
//!
//! Recursive descent parser for the arithmetic grammar. Converts text to a raw
//! `Node` tree with error messages carrying the character offset. Whether the
//! tree is *allowed* is decided later by the validator; this parser accepts a
//! slightly larger language so disallowed constructs get a precise diagnosis.
//!
//! Precedence, loosest first:
//! comparison chain, `+ -`, `* / // %`, unary `- +`, power `^`/`**`
//! (right-associative), postfix call/attribute/subscript, primary.

use crate::domain::error::ParseError;
use crate::domain::expr::{BinaryOp, CompareOp, Keyword, Node, UnaryOp};

/// Nesting beyond this many levels fails instead of recursing further.
pub const MAX_NESTING: usize = 100;

const TOO_COMPLEX: &str = "expression too complex";

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            nesting: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(ch) => format!("'{}'", ch),
            None => "end of input".to_string(),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.error(TOO_COMPLEX));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn peek_identifier(&self) -> Option<&'a str> {
        let rest = self.remaining();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, ch)) if ch.is_alphabetic() || ch == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        Some(&rest[..end])
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        match self.peek_identifier() {
            Some(ident) => {
                self.pos += ident.len();
                Ok(ident.to_string())
            }
            None => Err(self.error(format!("expected identifier, found {}", self.found()))),
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let mut digits = 0;
        let mut has_dot = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            self.pos = start;
            return Err(self.error("expected number"));
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            let mut exp_digits = 0;
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    exp_digits += 1;
                    self.advance();
                } else {
                    break;
                }
            }
            if exp_digits == 0 {
                self.pos = mark;
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_string(&mut self, quote: char) -> Result<Node, ParseError> {
        let start = self.pos;
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(ch) if ch == quote => return Ok(Node::Str(value)),
                Some('\\') => {
                    if let Some(escaped) = self.advance() {
                        value.push(escaped);
                    }
                }
                Some(ch) => value.push(ch),
                None => {
                    return Err(ParseError {
                        message: "unterminated string literal".to_string(),
                        position: start,
                    })
                }
            }
        }
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        let left = self.parse_additive()?;
        let mut comparisons = Vec::new();

        loop {
            self.skip_whitespace();
            let op = if self.consume_exact(">=") {
                CompareOp::Ge
            } else if self.consume_exact("<=") {
                CompareOp::Le
            } else if self.consume_exact("==") {
                CompareOp::Eq
            } else if self.consume_exact("!=") {
                CompareOp::Ne
            } else if self.consume_exact(">") {
                CompareOp::Gt
            } else if self.consume_exact("<") {
                CompareOp::Lt
            } else {
                break;
            };
            let right = self.parse_additive()?;
            comparisons.push((op, right));
        }

        self.leave();
        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Node::Compare {
                left: Box::new(left),
                comparisons,
            })
        }
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let rest = self.remaining();
            let op = if rest.starts_with("**") {
                break;
            } else if self.consume_exact("//") {
                BinaryOp::FloorDiv
            } else if self.consume_exact("*") {
                BinaryOp::Mul
            } else if self.consume_exact("/") {
                BinaryOp::Div
            } else if self.consume_exact("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        self.skip_whitespace();
        let op = match self.peek() {
            Some('-') => UnaryOp::Neg,
            Some('+') => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(Node::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_postfix()?;
        self.skip_whitespace();
        if self.consume_exact("**") || self.consume_exact("^") {
            self.enter()?;
            let exponent = self.parse_unary()?;
            self.leave();
            return Ok(Node::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('(') => {
                    self.advance();
                    node = self.parse_call(node)?;
                }
                Some('.') => {
                    self.advance();
                    let attr = self.parse_identifier()?;
                    node = Node::Attribute {
                        value: Box::new(node),
                        attr,
                    };
                }
                Some('[') => {
                    self.advance();
                    let index = self.parse_comparison()?;
                    self.expect_char(']')?;
                    node = Node::Subscript {
                        value: Box::new(node),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// Parses call arguments after the opening parenthesis.
    fn parse_call(&mut self, callee: Node) -> Result<Node, ParseError> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.advance();
        } else {
            loop {
                self.skip_whitespace();
                let arg_start = self.pos;
                let keyword = self.peek_identifier().and_then(|ident| {
                    let after = self.remaining()[ident.len()..].trim_start();
                    (after.starts_with('=') && !after.starts_with("==")).then_some(ident)
                });

                if let Some(name) = keyword {
                    self.pos += name.len();
                    self.expect_char('=')?;
                    if keywords.iter().any(|k| k.name == name) {
                        return Err(ParseError {
                            message: format!("keyword argument repeated: '{}'", name),
                            position: arg_start,
                        });
                    }
                    let value = self.parse_comparison()?;
                    keywords.push(Keyword {
                        name: name.to_string(),
                        value,
                    });
                } else {
                    let value = self.parse_comparison()?;
                    if !keywords.is_empty() {
                        return Err(ParseError {
                            message: "positional argument follows keyword argument".to_string(),
                            position: arg_start,
                        });
                    }
                    args.push(value);
                }

                self.skip_whitespace();
                match self.peek() {
                    Some(',') => {
                        self.advance();
                    }
                    Some(')') => {
                        self.advance();
                        break;
                    }
                    _ => {
                        return Err(
                            self.error(format!("expected ',' or ')', found {}", self.found()))
                        )
                    }
                }
            }
        }

        Ok(Node::Call {
            callee: Box::new(callee),
            args,
            keywords,
        })
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() => Ok(Node::Number(self.parse_number()?)),
            Some('.') => {
                let next = self.remaining().chars().nth(1);
                if next.is_some_and(|c| c.is_ascii_digit()) {
                    Ok(Node::Number(self.parse_number()?))
                } else {
                    Err(self.error("unexpected '.'"))
                }
            }
            Some(quote @ ('\'' | '"')) => self.parse_string(quote),
            Some('(') => {
                self.advance();
                let inner = self.parse_comparison()?;
                self.expect_char(')')?;
                Ok(inner)
            }
            Some('[') => {
                self.advance();
                let mut items = Vec::new();
                self.skip_whitespace();
                if self.peek() == Some(']') {
                    self.advance();
                    return Ok(Node::List(items));
                }
                loop {
                    items.push(self.parse_comparison()?);
                    self.skip_whitespace();
                    match self.peek() {
                        Some(',') => {
                            self.advance();
                        }
                        Some(']') => {
                            self.advance();
                            break;
                        }
                        _ => {
                            return Err(self
                                .error(format!("expected ',' or ']', found {}", self.found())))
                        }
                    }
                }
                Ok(Node::List(items))
            }
            Some(_) if self.peek_identifier().is_some() => {
                Ok(Node::Name(self.parse_identifier()?))
            }
            Some(ch) => Err(self.error(format!("unexpected '{}'", ch))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse(&mut self) -> Result<Node, ParseError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Err(self.error("empty expression"));
        }
        let node = self.parse_comparison()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after expression: '{}'",
                self.remaining()
            )));
        }
        Ok(node)
    }
}

pub fn parse(input: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// True when the parser gave up because of nesting rather than syntax.
pub fn is_nesting_limit(err: &ParseError) -> bool {
    err.message == TOO_COMPLEX
}
