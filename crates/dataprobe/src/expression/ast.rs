//! Expression tree, recursive-descent parser and row evaluation.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! comparison := additive (("==" | "!=" | "<" | "<=" | ">" | ">=") additive)*
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/" | "%") unary)*
//! unary      := "-" unary | "+" unary | power
//! power      := atom ("**" unary)?
//! atom       := number | column | "(" comparison ")"
//! ```

use super::ExpressionError;
use super::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        let truth = |cond: bool| if cond { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            // Result takes the sign of the divisor.
            BinaryOp::Rem => a - b * (a / b).floor(),
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Eq => truth(a == b),
            BinaryOp::NotEq => truth(a != b),
            BinaryOp::Lt => truth(a < b),
            BinaryOp::LtEq => truth(a <= b),
            BinaryOp::Gt => truth(a > b),
            BinaryOp::GtEq => truth(a >= b),
        }
    }
}

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Column(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Column names referenced, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_columns(out),
            Expr::Binary(_, l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
        }
    }

    /// Evaluate for one row. Missing operands propagate as `None`, and so do
    /// non-finite intermediate results.
    pub fn eval(&self, lookup: &impl Fn(&str) -> Option<f64>) -> Option<f64> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Column(name) => lookup(name)?,
            Expr::Neg(inner) => -inner.eval(lookup)?,
            Expr::Binary(op, l, r) => op.apply(l.eval(lookup)?, r.eval(lookup)?),
        };
        value.is_finite().then_some(value)
    }
}

/// Deepest nesting accepted, counted both as parser recursion (parentheses,
/// unary signs, exponents) and as height of the resulting tree.
pub const MAX_DEPTH: usize = 256;

/// Parse a token stream into an expression.
pub fn parse(tokens: &[Token]) -> Result<Expr, ExpressionError> {
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let (expr, _) = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::UnexpectedToken(token.describe())),
    }
}

/// A parsed subtree and its height.
type Parsed = (Expr, usize);

fn binary(op: BinaryOp, (left, lh): Parsed, (right, rh): Parsed) -> Result<Parsed, ExpressionError> {
    let height = lh.max(rh) + 1;
    if height > MAX_DEPTH {
        return Err(ExpressionError::TooDeep(MAX_DEPTH));
    }
    Ok((Expr::Binary(op, Box::new(left), Box::new(right)), height))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn comparison(&mut self) -> Result<Parsed, ExpressionError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::GtEq) => BinaryOp::GtEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = binary(op, left, right)?;
        }
    }

    fn additive(&mut self) -> Result<Parsed, ExpressionError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right)?;
        }
    }

    fn term(&mut self) -> Result<Parsed, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right)?;
        }
    }

    // Every parenthesised group and exponent passes through here, so this is
    // where recursion is bounded.
    fn unary(&mut self) -> Result<Parsed, ExpressionError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let parsed = self.signed();
        self.depth -= 1;
        parsed
    }

    fn signed(&mut self) -> Result<Parsed, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let (inner, height) = self.unary()?;
                if height >= MAX_DEPTH {
                    return Err(ExpressionError::TooDeep(MAX_DEPTH));
                }
                Ok((Expr::Neg(Box::new(inner)), height + 1))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Parsed, ExpressionError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Power) {
            self.pos += 1;
            let exponent = self.unary()?;
            return binary(BinaryOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Parsed, ExpressionError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok((Expr::Number(*n), 1)),
            Some(Token::Ident(name)) => Ok((Expr::Column(name.clone()), 1)),
            Some(Token::LParen) => {
                let inner = self.comparison()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExpressionError::UnexpectedToken(other.describe())),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExpressionError::UnexpectedToken(other.describe())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
