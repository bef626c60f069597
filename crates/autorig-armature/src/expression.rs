//! Driver expression language.
//!
//! Expressions are arithmetic over numbers and named variables:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | identifier | '(' expr ')'
//! ```
//!
//! Expressions are parsed once when a driver is attached and evaluated on
//! every pose evaluation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Error type for driver expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    /// A variable is not bound.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    /// Invalid syntax.
    #[error("syntax error: {0}")]
    SyntaxError(String),
    /// Division by zero during evaluation.
    #[error("division by zero")]
    DivisionByZero,
    /// The expression ended where an operand was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent part: 1e-3, 2.5E+4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| {
                    ExpressionError::SyntaxError(format!("invalid number '{}'", text))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ExpressionError::SyntaxError(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Variable(String),
    Negate(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(node),
            };
            self.pos += 1;
            let rhs = self.term()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(node),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Node, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Node::Negate(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Node, ExpressionError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Node::Number(value)),
            Some(Token::Ident(name)) => Ok(Node::Variable(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExpressionError::SyntaxError(format!(
                        "expected ')', found {:?}",
                        other
                    ))),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExpressionError::SyntaxError(format!(
                "unexpected token {:?}",
                other
            ))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

fn collect_variables<'a>(node: &'a Node, out: &mut BTreeSet<&'a str>) {
    match node {
        Node::Number(_) => {}
        Node::Variable(name) => {
            out.insert(name.as_str());
        }
        Node::Negate(inner) => collect_variables(inner, out),
        Node::Binary(_, lhs, rhs) => {
            collect_variables(lhs, out);
            collect_variables(rhs, out);
        }
    }
}

fn eval_node<F>(node: &Node, lookup: &F) -> Result<f64, ExpressionError>
where
    F: Fn(&str) -> Option<f64>,
{
    match node {
        Node::Number(value) => Ok(*value),
        Node::Variable(name) => {
            lookup(name).ok_or_else(|| ExpressionError::UnknownVariable(name.clone()))
        }
        Node::Negate(inner) => Ok(-eval_node(inner, lookup)?),
        Node::Binary(op, lhs, rhs) => {
            let a = eval_node(lhs, lookup)?;
            let b = eval_node(rhs, lookup)?;
            match op {
                BinaryOp::Add => Ok(a + b),
                BinaryOp::Sub => Ok(a - b),
                BinaryOp::Mul => Ok(a * b),
                BinaryOp::Div => {
                    if b == 0.0 {
                        Err(ExpressionError::DivisionByZero)
                    } else {
                        Ok(a / b)
                    }
                }
            }
        }
    }
}

/// A parsed driver expression.
///
/// Serialized as its source text and re-parsed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parses an expression.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExpressionError::SyntaxError("empty expression".to_string()));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.expr()?;
        if let Some(extra) = parser.peek() {
            return Err(ExpressionError::SyntaxError(format!(
                "unexpected trailing token {:?}",
                extra
            )));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Returns the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the names of all referenced variables, sorted.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = BTreeSet::new();
        collect_variables(&self.root, &mut out);
        out.into_iter().collect()
    }

    /// Evaluates the expression, resolving variables through `lookup`.
    pub fn evaluate<F>(&self, lookup: F) -> Result<f64, ExpressionError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        eval_node(&self.root, &lookup)
    }
}

impl TryFrom<String> for Expression {
    type Error = ExpressionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Expression> for String {
    fn from(expression: Expression) -> Self {
        expression.source
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str, var: f64) -> Result<f64, ExpressionError> {
        Expression::parse(source)?.evaluate(|name| (name == "var").then_some(var))
    }

    #[test]
    fn test_precedence_and_unary() {
        assert_eq!(eval("1-var", 0.25).unwrap(), 0.75);
        assert_eq!(eval("-var + 1", 0.25).unwrap(), 0.75);
        assert_eq!(eval("1.0*1.5*var", 2.0).unwrap(), 3.0);
        assert_eq!(eval("2*(1+var)", 1.0).unwrap(), 4.0);
        assert_eq!(eval("--var", 3.0).unwrap(), 3.0);
        assert_eq!(eval("1e-1*var", 10.0).unwrap(), 1.0);
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(eval("8/2/2", 0.0).unwrap(), 2.0);
        assert_eq!(eval("5-2-1", 0.0).unwrap(), 2.0);
    }

    #[test]
    fn test_torsion_expression() {
        let expr = Expression::parse("-1/6*var_first + 1/6*var_last").unwrap();
        assert_eq!(expr.variables(), vec!["var_first", "var_last"]);
        let value = expr
            .evaluate(|name| match name {
                "var_first" => Some(0.0),
                "var_last" => Some(0.6),
                _ => None,
            })
            .unwrap();
        assert!((value - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_errors() {
        assert_eq!(Expression::parse("1+").unwrap_err(), ExpressionError::UnexpectedEnd);
        assert_eq!(Expression::parse("(1+2").unwrap_err(), ExpressionError::UnexpectedEnd);
        assert!(matches!(
            Expression::parse("sin(var)").unwrap_err(),
            ExpressionError::SyntaxError(_)
        ));
        assert!(matches!(
            Expression::parse("var % 2").unwrap_err(),
            ExpressionError::SyntaxError(_)
        ));
        assert!(matches!(
            Expression::parse("   ").unwrap_err(),
            ExpressionError::SyntaxError(_)
        ));
        assert_eq!(eval("1/var", 0.0).unwrap_err(), ExpressionError::DivisionByZero);
        assert_eq!(
            Expression::parse("other").unwrap().evaluate(|_| None).unwrap_err(),
            ExpressionError::UnknownVariable("other".to_string())
        );
    }

    #[test]
    fn test_serde_uses_source_text() {
        let expr = Expression::parse("1-var").unwrap();
        let json = serde_json::to_string(&expr).unwrap();
        assert_eq!(json, "\"1-var\"");
        let back: Expression = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
        assert!(serde_json::from_str::<Expression>("\"1+\"").is_err());
    }
}
