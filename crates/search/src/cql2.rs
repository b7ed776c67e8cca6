//! CQL2 property filtering
//!
//! Filter expressions arrive in cql2-text or cql2-json form. Compilation is
//! an injected capability: [`Cql2Compiler`] turns an expression plus a field
//! map into a plain predicate over a document's JSON, and deployments with a
//! full CQL2 engine can inject it at that seam. [`BasicCql2`] is the built-in
//! compiler for the comparison subset: `=`, `<>`, `<`, `<=`, `>`, `>=`,
//! `IS NULL`, `BETWEEN`, `IN`, and `AND`/`OR`/`NOT` combinators.
//!
//! Query validation is eager (a bad expression fails the search), evaluation
//! is forgiving (a missing or incomparable property makes the comparison
//! false, never an error).

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// A filter expression as received from the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Cql2Expression {
    /// cql2-text form
    Text(String),
    /// cql2-json form
    Json(Value),
}

/// Why an expression could not be compiled
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Cql2Error {
    /// The expression could not be parsed
    #[error("cannot parse filter: {0}")]
    Parse(String),

    /// The expression uses an operation this compiler does not implement
    #[error("unsupported filter operation: {0}")]
    Unsupported(String),
}

/// How queryable names map onto a document's JSON
///
/// STAC queryables are flat names; where they live depends on the document
/// kind being filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMap {
    /// Items: `id`, `geometry`, `bbox` and `collection` are top-level,
    /// everything else lives under `properties`
    Item,
    /// Collections: `bbox` is the first declared extent box, everything else
    /// is top-level
    Collection,
}

impl FieldMap {
    /// Resolve one queryable name against a document
    pub fn lookup<'a>(&self, document: &'a Value, property: &str) -> Option<&'a Value> {
        match self {
            FieldMap::Item => match property {
                "id" | "geometry" | "bbox" | "collection" => document.get(property),
                _ => document.get("properties")?.get(property),
            },
            FieldMap::Collection => match property {
                "bbox" => document.pointer("/extent/spatial/bbox/0"),
                _ => document.get(property),
            },
        }
    }
}

/// A compiled filter: a pure predicate over one document's JSON
pub type Cql2Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Compiles filter expressions into document predicates
pub trait Cql2Compiler: Send + Sync {
    /// Compile `expression` for documents whose queryables follow `fields`
    fn compile(
        &self,
        expression: &Cql2Expression,
        fields: FieldMap,
    ) -> Result<Cql2Predicate, Cql2Error>;
}

/// Built-in compiler for the comparison subset of CQL2
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicCql2;

impl Cql2Compiler for BasicCql2 {
    fn compile(
        &self,
        expression: &Cql2Expression,
        fields: FieldMap,
    ) -> Result<Cql2Predicate, Cql2Error> {
        let expr = match expression {
            Cql2Expression::Json(value) => parse_json(value)?,
            Cql2Expression::Text(text) => parse_text(text)?,
        };
        Ok(Box::new(move |document| expr.eval(document, fields)))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Cmp(CmpOp, Operand, Operand),
    IsNull(Operand),
    Between(Operand, Operand, Operand),
    In(Operand, Vec<Operand>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Property(String),
    Literal(Value),
}

impl Operand {
    fn resolve<'a>(&'a self, document: &'a Value, fields: FieldMap) -> Option<&'a Value> {
        match self {
            Operand::Property(name) => fields.lookup(document, name),
            Operand::Literal(value) => Some(value),
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

impl Expr {
    /// Two-valued evaluation: a missing or incomparable operand makes the
    /// enclosing comparison false.
    fn eval(&self, document: &Value, fields: FieldMap) -> bool {
        match self {
            Expr::And(terms) => terms.iter().all(|t| t.eval(document, fields)),
            Expr::Or(terms) => terms.iter().any(|t| t.eval(document, fields)),
            Expr::Not(term) => !term.eval(document, fields),
            Expr::Cmp(op, left, right) => {
                let (Some(left), Some(right)) = (
                    left.resolve(document, fields),
                    right.resolve(document, fields),
                ) else {
                    return false;
                };
                match op {
                    CmpOp::Eq => left == right,
                    CmpOp::Ne => left != right,
                    _ => match compare(left, right) {
                        Some(ordering) => match op {
                            CmpOp::Lt => ordering.is_lt(),
                            CmpOp::Le => ordering.is_le(),
                            CmpOp::Gt => ordering.is_gt(),
                            CmpOp::Ge => ordering.is_ge(),
                            CmpOp::Eq | CmpOp::Ne => unreachable!(),
                        },
                        None => false,
                    },
                }
            }
            Expr::IsNull(operand) => match operand.resolve(document, fields) {
                None => true,
                Some(value) => value.is_null(),
            },
            Expr::Between(operand, low, high) => {
                let (Some(value), Some(low), Some(high)) = (
                    operand.resolve(document, fields),
                    low.resolve(document, fields),
                    high.resolve(document, fields),
                ) else {
                    return false;
                };
                matches!(compare(value, low), Some(o) if o.is_ge())
                    && matches!(compare(value, high), Some(o) if o.is_le())
            }
            Expr::In(operand, candidates) => {
                let Some(value) = operand.resolve(document, fields) else {
                    return false;
                };
                candidates
                    .iter()
                    .any(|c| c.resolve(document, fields) == Some(value))
            }
        }
    }
}

// === cql2-json ===

fn parse_json(value: &Value) -> Result<Expr, Cql2Error> {
    let op = value
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| Cql2Error::Parse("expected an object with an \"op\" field".to_string()))?;
    let args = value
        .get("args")
        .and_then(Value::as_array)
        .ok_or_else(|| Cql2Error::Parse(format!("operation {op} is missing \"args\"")))?;

    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(Cql2Error::Parse(format!(
                "operation {op} takes {expected} arguments, got {}",
                args.len()
            )))
        }
    };

    match op {
        "and" | "or" => {
            if args.is_empty() {
                return Err(Cql2Error::Parse(format!("operation {op} needs arguments")));
            }
            let terms = args.iter().map(parse_json).collect::<Result<Vec<_>, _>>()?;
            Ok(if op == "and" {
                Expr::And(terms)
            } else {
                Expr::Or(terms)
            })
        }
        "not" => {
            arity(1)?;
            Ok(Expr::Not(Box::new(parse_json(&args[0])?)))
        }
        "=" | "<>" | "<" | "<=" | ">" | ">=" => {
            arity(2)?;
            let op = match op {
                "=" => CmpOp::Eq,
                "<>" => CmpOp::Ne,
                "<" => CmpOp::Lt,
                "<=" => CmpOp::Le,
                ">" => CmpOp::Gt,
                _ => CmpOp::Ge,
            };
            Ok(Expr::Cmp(op, json_operand(&args[0])?, json_operand(&args[1])?))
        }
        "isNull" => {
            arity(1)?;
            Ok(Expr::IsNull(json_operand(&args[0])?))
        }
        "between" => {
            arity(3)?;
            Ok(Expr::Between(
                json_operand(&args[0])?,
                json_operand(&args[1])?,
                json_operand(&args[2])?,
            ))
        }
        "in" => {
            arity(2)?;
            let candidates = args[1]
                .as_array()
                .ok_or_else(|| Cql2Error::Parse("in expects an array of candidates".to_string()))?
                .iter()
                .map(json_operand)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::In(json_operand(&args[0])?, candidates))
        }
        other => Err(Cql2Error::Unsupported(other.to_string())),
    }
}

fn json_operand(value: &Value) -> Result<Operand, Cql2Error> {
    if let Some(property) = value.get("property").and_then(Value::as_str) {
        return Ok(Operand::Property(property.to_string()));
    }
    if value.is_object() {
        return Err(Cql2Error::Unsupported(
            "only property references and plain literals are supported as operands".to_string(),
        ));
    }
    Ok(Operand::Literal(value.clone()))
}

// === cql2-text ===

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Cmp(CmpOp),
    LParen,
    RParen,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>, Cql2Error> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Cmp(CmpOp::Eq));
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Cmp(CmpOp::Ne));
                    }
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Cmp(CmpOp::Le));
                    }
                    _ => tokens.push(Token::Cmp(CmpOp::Lt)),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Ge));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                }
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => {
                            // Doubled quote is an escaped quote
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                                value.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                        None => {
                            return Err(Cql2Error::Parse("unterminated string".to_string()));
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let mut literal = String::new();
                literal.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || d == '-' || d == '+'
                    {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number: f64 = literal
                    .parse()
                    .map_err(|_| Cql2Error::Parse(format!("bad number literal: {literal}")))?;
                tokens.push(Token::Num(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == ':' || d == '.' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(Cql2Error::Parse(format!("unexpected character: {other}")));
            }
        }
    }
    Ok(tokens)
}

struct TextParser {
    tokens: Vec<Token>,
    at: usize,
}

impl TextParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.at).cloned();
        if token.is_some() {
            self.at += 1;
        }
        token
    }

    fn keyword(&mut self, word: &str) -> bool {
        if let Some(Token::Ident(ident)) = self.peek() {
            if ident.eq_ignore_ascii_case(word) {
                self.at += 1;
                return true;
            }
        }
        false
    }

    fn expect_keyword(&mut self, word: &str) -> Result<(), Cql2Error> {
        if self.keyword(word) {
            Ok(())
        } else {
            Err(Cql2Error::Parse(format!("expected {word}")))
        }
    }

    fn or_expr(&mut self) -> Result<Expr, Cql2Error> {
        let first = self.and_expr()?;
        if !self.keyword("OR") {
            return Ok(first);
        }
        let mut terms = vec![first, self.and_expr()?];
        while self.keyword("OR") {
            terms.push(self.and_expr()?);
        }
        Ok(Expr::Or(terms))
    }

    fn and_expr(&mut self) -> Result<Expr, Cql2Error> {
        let first = self.unary_expr()?;
        if !self.keyword("AND") {
            return Ok(first);
        }
        let mut terms = vec![first, self.unary_expr()?];
        while self.keyword("AND") {
            terms.push(self.unary_expr()?);
        }
        Ok(Expr::And(terms))
    }

    fn unary_expr(&mut self) -> Result<Expr, Cql2Error> {
        if self.keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.unary_expr()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let inner = self.or_expr()?;
            if self.advance() != Some(Token::RParen) {
                return Err(Cql2Error::Parse("expected )".to_string()));
            }
            return Ok(inner);
        }
        self.predicate()
    }

    fn predicate(&mut self) -> Result<Expr, Cql2Error> {
        let left = self.operand()?;

        if let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.advance();
            let right = self.operand()?;
            return Ok(Expr::Cmp(op, left, right));
        }
        if self.keyword("IS") {
            let negated = self.keyword("NOT");
            self.expect_keyword("NULL")?;
            let test = Expr::IsNull(left);
            return Ok(if negated {
                Expr::Not(Box::new(test))
            } else {
                test
            });
        }
        if self.keyword("BETWEEN") {
            let low = self.operand()?;
            self.expect_keyword("AND")?;
            let high = self.operand()?;
            return Ok(Expr::Between(left, low, high));
        }
        if self.keyword("IN") {
            if self.advance() != Some(Token::LParen) {
                return Err(Cql2Error::Parse("expected ( after IN".to_string()));
            }
            let mut candidates = vec![self.operand()?];
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                candidates.push(self.operand()?);
            }
            if self.advance() != Some(Token::RParen) {
                return Err(Cql2Error::Parse("expected ) after IN list".to_string()));
            }
            return Ok(Expr::In(left, candidates));
        }
        Err(Cql2Error::Parse(
            "expected a comparison after operand".to_string(),
        ))
    }

    fn operand(&mut self) -> Result<Operand, Cql2Error> {
        match self.advance() {
            Some(Token::Str(value)) => Ok(Operand::Literal(Value::String(value))),
            Some(Token::Num(value)) => {
                let number = serde_json::Number::from_f64(value)
                    .ok_or_else(|| Cql2Error::Parse("non-finite number literal".to_string()))?;
                Ok(Operand::Literal(Value::Number(number)))
            }
            Some(Token::Ident(ident)) => {
                if ident.eq_ignore_ascii_case("true") {
                    Ok(Operand::Literal(Value::Bool(true)))
                } else if ident.eq_ignore_ascii_case("false") {
                    Ok(Operand::Literal(Value::Bool(false)))
                } else {
                    Ok(Operand::Property(ident))
                }
            }
            other => Err(Cql2Error::Parse(format!("expected an operand, got {other:?}"))),
        }
    }
}

fn parse_text(text: &str) -> Result<Expr, Cql2Error> {
    let mut parser = TextParser {
        tokens: tokenize(text)?,
        at: 0,
    };
    let expr = parser.or_expr()?;
    if parser.peek().is_some() {
        return Err(Cql2Error::Parse("trailing tokens after expression".to_string()));
    }
    Ok(expr)
}
