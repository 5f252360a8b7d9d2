//! Fee condition language
//!
//! A condition gates whether a fee rule applies. It is either one of the
//! literals (`sempre`/`true`/`1`, `nunca`/`false`/`0`) or a small
//! arithmetic-comparison expression over the placeholder `preco` (alias
//! `valor`), which stands for the product's total cost:
//!
//! ```text
//! condition  := additive ( cmp_op additive )*
//! cmp_op     := ">" | "<" | ">=" | "<=" | "==" | "!="
//! additive   := term ( ("+" | "-") term )*
//! term       := unary ( ("*" | "/") unary )*
//! unary      := ("+" | "-") unary | primary
//! primary    := NUMBER | "preco" | "valor" | "(" condition ")"
//! ```
//!
//! Nothing else is accepted: no function calls, no other identifiers.
//! A comparison chain such as `10 < preco <= 50` holds when every adjacent
//! pair holds. A bare arithmetic value is true when it is non-zero.
//!
//! Conditions are bounded: at most [`MAX_TOKENS`] tokens and at most
//! [`MAX_NESTING`] levels of parentheses and unary signs.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ConditionError;

type Result<T> = std::result::Result<T, ConditionError>;

const TRUE_LITERALS: [&str; 3] = ["sempre", "true", "1"];
const FALSE_LITERALS: [&str; 3] = ["nunca", "false", "0"];
const PLACEHOLDERS: [&str; 2] = ["preco", "valor"];

/// Deepest nesting of parentheses and unary signs accepted
pub const MAX_NESTING: usize = 64;

/// Most tokens a condition may contain
pub const MAX_TOKENS: usize = 256;

/// Parse and evaluate `condition` against `total_cost`
pub fn evaluate_condition(condition: &str, total_cost: Decimal) -> Result<bool> {
    ConditionExpr::parse(condition)?.evaluate(total_cost)
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    fn holds(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply(self, lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
        let out = match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Sub => lhs.checked_sub(rhs),
            ArithOp::Mul => lhs.checked_mul(rhs),
            ArithOp::Div => {
                if rhs.is_zero() {
                    return Err(ConditionError::DivisionByZero);
                }
                lhs.checked_div(rhs)
            }
        };
        out.ok_or(ConditionError::Overflow)
    }

    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Decimal),
    /// The total cost being tested
    Placeholder,
    Neg(Box<Expr>),
    Binary { op: ArithOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Compare { first: Box<Expr>, rest: Vec<(CmpOp, Expr)> },
}

/// Intermediate value; comparisons produce booleans that behave as 0/1 in arithmetic
#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Number(Decimal),
    Bool(bool),
}

impl Value {
    fn number(self) -> Decimal {
        match self {
            Value::Number(n) => n,
            Value::Bool(true) => Decimal::ONE,
            Value::Bool(false) => Decimal::ZERO,
        }
    }

    fn truthy(self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            Value::Bool(b) => b,
        }
    }
}

impl Expr {
    fn eval(&self, total_cost: Decimal) -> Result<Value> {
        match self {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Placeholder => Ok(Value::Number(total_cost)),
            Expr::Neg(inner) => Ok(Value::Number(-inner.eval(total_cost)?.number())),
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(total_cost)?.number();
                let r = rhs.eval(total_cost)?.number();
                op.apply(l, r).map(Value::Number)
            }
            Expr::Compare { first, rest } => {
                let mut lhs = first.eval(total_cost)?.number();
                for (op, expr) in rest {
                    let rhs = expr.eval(total_cost)?.number();
                    if !op.holds(lhs, rhs) {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Placeholder => write!(f, "preco"),
            Expr::Neg(inner) => write!(f, "-{}", Operand(inner)),
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "({} {} {})", Operand(lhs), op.symbol(), Operand(rhs))
            }
            Expr::Compare { first, rest } => {
                write!(f, "{}", Operand(first))?;
                for (op, expr) in rest {
                    write!(f, " {} {}", op.symbol(), Operand(expr))?;
                }
                Ok(())
            }
        }
    }
}

/// An expression in operand position; comparisons there need their own parentheses
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Compare { .. } => write!(f, "({})", self.0),
            expr => write!(f, "{expr}"),
        }
    }
}

/// A validated fee condition
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Always,
    Never,
    Expr(Expr),
}

impl ConditionExpr {
    /// Canonicalize (trim, lowercase) and parse a condition
    pub fn parse(condition: &str) -> Result<Self> {
        let canonical = condition.trim().to_lowercase();
        if canonical.is_empty() {
            return Err(ConditionError::Empty);
        }
        if TRUE_LITERALS.contains(&canonical.as_str()) {
            return Ok(ConditionExpr::Always);
        }
        if FALSE_LITERALS.contains(&canonical.as_str()) {
            return Ok(ConditionExpr::Never);
        }

        let tokens = tokenize(&canonical)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
        let expr = parser.condition()?;
        if let Some(tok) = parser.peek() {
            return Err(ConditionError::UnexpectedToken {
                found: tok.kind.to_string(),
                offset: tok.offset,
            });
        }
        Ok(ConditionExpr::Expr(expr))
    }

    /// Evaluate against the total cost
    pub fn evaluate(&self, total_cost: Decimal) -> Result<bool> {
        match self {
            ConditionExpr::Always => Ok(true),
            ConditionExpr::Never => Ok(false),
            ConditionExpr::Expr(expr) => Ok(expr.eval(total_cost)?.truthy()),
        }
    }

    /// Whether the condition depends on the total cost at all
    pub fn references_cost(&self) -> bool {
        fn walk(expr: &Expr) -> bool {
            match expr {
                Expr::Number(_) => false,
                Expr::Placeholder => true,
                Expr::Neg(inner) => walk(inner),
                Expr::Binary { lhs, rhs, .. } => walk(lhs) || walk(rhs),
                Expr::Compare { first, rest } => walk(first) || rest.iter().any(|(_, e)| walk(e)),
            }
        }
        match self {
            ConditionExpr::Expr(expr) => walk(expr),
            _ => false,
        }
    }
}

impl FromStr for ConditionExpr {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpr::Always => write!(f, "sempre"),
            ConditionExpr::Never => write!(f, "nunca"),
            ConditionExpr::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(Decimal),
    Placeholder,
    Arith(ArithOp),
    Cmp(CmpOp),
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Placeholder => write!(f, "preco"),
            TokenKind::Arith(op) => write!(f, "{:?}", op.symbol()),
            TokenKind::Cmp(op) => write!(f, "{:?}", op.symbol()),
            TokenKind::LParen => write!(f, "\"(\""),
            TokenKind::RParen => write!(f, "\")\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        if tokens.len() >= MAX_TOKENS {
            return Err(ConditionError::TooLong(MAX_TOKENS));
        }
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let mut literal = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '.' {
                    literal.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = Decimal::from_str(&literal)
                .map_err(|_| ConditionError::InvalidNumber(literal.clone()))?;
            tokens.push(Token { kind: TokenKind::Number(value), offset });
            continue;
        }

        if ch.is_alphabetic() || ch == '_' {
            let mut ident = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if !PLACEHOLDERS.contains(&ident.as_str()) {
                return Err(ConditionError::UnknownIdentifier(ident));
            }
            tokens.push(Token { kind: TokenKind::Placeholder, offset });
            continue;
        }

        chars.next();
        let next_is_eq = matches!(chars.peek(), Some(&(_, '=')));
        let kind = match ch {
            '+' => TokenKind::Arith(ArithOp::Add),
            '-' => TokenKind::Arith(ArithOp::Sub),
            '*' => TokenKind::Arith(ArithOp::Mul),
            '/' => TokenKind::Arith(ArithOp::Div),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '>' | '<' | '=' | '!' => {
                let op = match (ch, next_is_eq) {
                    ('>', true) => CmpOp::Ge,
                    ('<', true) => CmpOp::Le,
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    ('>', false) => CmpOp::Gt,
                    ('<', false) => CmpOp::Lt,
                    _ => return Err(ConditionError::UnexpectedChar { ch, offset }),
                };
                if next_is_eq {
                    chars.next();
                }
                TokenKind::Cmp(op)
            }
            _ => return Err(ConditionError::UnexpectedChar { ch, offset }),
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
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

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(ConditionError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn condition(&mut self) -> Result<Expr> {
        let first = self.additive()?;
        let mut rest = Vec::new();
        while let Some(Token { kind: TokenKind::Cmp(op), .. }) = self.peek() {
            let op = *op;
            self.pos += 1;
            rest.push((op, self.additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare { first: Box::new(first), rest })
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token { kind: TokenKind::Arith(op @ (ArithOp::Add | ArithOp::Sub)), .. }) =
            self.peek()
        {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token { kind: TokenKind::Arith(op @ (ArithOp::Mul | ArithOp::Div)), .. }) =
            self.peek()
        {
            let op = *op;
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token { kind: TokenKind::Arith(ArithOp::Sub), .. }) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.nested(Self::unary)?)))
            }
            Some(Token { kind: TokenKind::Arith(ArithOp::Add), .. }) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let tok = self.next().ok_or(ConditionError::UnexpectedEnd)?;
        match &tok.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Placeholder => Ok(Expr::Placeholder),
            TokenKind::LParen => {
                let inner = self.nested(Self::condition)?;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(ConditionError::UnexpectedToken {
                        found: other.kind.to_string(),
                        offset: other.offset,
                    }),
                    None => Err(ConditionError::UnexpectedEnd),
                }
            }
            other => Err(ConditionError::UnexpectedToken {
                found: other.to_string(),
                offset: tok.offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_literals() {
        for lit in ["sempre", "TRUE", " 1 ", "Sempre"] {
            assert!(evaluate_condition(lit, dec!(10)).unwrap(), "{lit}");
        }
        for lit in ["nunca", "False", "0"] {
            assert!(!evaluate_condition(lit, dec!(10)).unwrap(), "{lit}");
        }
    }

    #[test]
    fn test_simple_comparisons() {
        assert!(evaluate_condition("preco > 30", dec!(40)).unwrap());
        assert!(!evaluate_condition("preco > 50", dec!(40)).unwrap());
        assert!(evaluate_condition("PRECO <= 40", dec!(40)).unwrap());
        assert!(evaluate_condition("valor >= 40.00", dec!(40)).unwrap());
        assert!(evaluate_condition("preco == 40", dec!(40.0)).unwrap());
        assert!(evaluate_condition("preco != 41", dec!(40)).unwrap());
        assert!(evaluate_condition("preco < 100", dec!(99.99)).unwrap());
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert!(evaluate_condition("preco * 2 + 1 > 80", dec!(40)).unwrap());
        assert!(!evaluate_condition("preco * (2 + 1) < 100", dec!(40)).unwrap());
        assert!(evaluate_condition("-preco < 0", dec!(40)).unwrap());
        assert!(evaluate_condition("preco / 4 == 10", dec!(40)).unwrap());
        assert!(evaluate_condition("preco - 10 - 10 == 20", dec!(40)).unwrap());
    }

    #[test]
    fn test_chained_comparison() {
        assert!(evaluate_condition("10 < preco <= 50", dec!(40)).unwrap());
        assert!(!evaluate_condition("10 < preco <= 50", dec!(60)).unwrap());
        assert!(!evaluate_condition("50 < preco < 10", dec!(40)).unwrap());
    }

    #[test]
    fn test_bare_value_truthiness() {
        assert!(evaluate_condition("preco", dec!(40)).unwrap());
        assert!(!evaluate_condition("preco", dec!(0)).unwrap());
        assert!(!evaluate_condition("preco - 40", dec!(40)).unwrap());
    }

    #[test]
    fn test_parenthesized_comparison() {
        assert!(evaluate_condition("(preco > 10) == 1", dec!(40)).unwrap());
        assert!(evaluate_condition("(preco > 100) + 1 == 1", dec!(40)).unwrap());
    }

    #[test]
    fn test_rejects_identifiers_and_calls() {
        assert_eq!(
            evaluate_condition("__import__('os')", dec!(1)),
            Err(ConditionError::UnknownIdentifier("__import__".to_string()))
        );
        assert!(matches!(
            evaluate_condition("preco > abs(1)", dec!(1)),
            Err(ConditionError::UnknownIdentifier(_))
        ));
        assert!(matches!(
            evaluate_condition("preco > 1 and preco < 5", dec!(1)),
            Err(ConditionError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn test_malformed_expressions() {
        assert_eq!(evaluate_condition("   ", dec!(1)), Err(ConditionError::Empty));
        assert_eq!(evaluate_condition("preco >", dec!(1)), Err(ConditionError::UnexpectedEnd));
        assert_eq!(evaluate_condition("(preco > 1", dec!(1)), Err(ConditionError::UnexpectedEnd));
        assert!(matches!(
            evaluate_condition("preco > 1)", dec!(1)),
            Err(ConditionError::UnexpectedToken { offset: 9, .. })
        ));
        assert!(matches!(
            evaluate_condition("preco = 1", dec!(1)),
            Err(ConditionError::UnexpectedChar { ch: '=', .. })
        ));
        assert!(matches!(
            evaluate_condition("preco > 1.2.3", dec!(1)),
            Err(ConditionError::InvalidNumber(_))
        ));
        assert!(matches!(
            evaluate_condition("preco > 1 ; 2", dec!(1)),
            Err(ConditionError::UnexpectedChar { ch: ';', .. })
        ));
        assert!(matches!(
            evaluate_condition("preco 1", dec!(1)),
            Err(ConditionError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            evaluate_condition("preco / 0 > 1", dec!(10)),
            Err(ConditionError::DivisionByZero)
        );
        assert_eq!(
            evaluate_condition("1 / (preco - 10) > 1", dec!(10)),
            Err(ConditionError::DivisionByZero)
        );
    }

    #[test]
    fn test_parse_once_evaluate_many() {
        let cond: ConditionExpr = "preco >= 79".parse().unwrap();
        assert!(cond.references_cost());
        assert!(!cond.evaluate(dec!(78.99)).unwrap());
        assert!(cond.evaluate(dec!(79)).unwrap());
        assert!(cond.evaluate(dec!(1000)).unwrap());
        assert!(!ConditionExpr::parse("sempre").unwrap().references_cost());
        assert!(!ConditionExpr::parse("2 > 1").unwrap().references_cost());
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        for text in [
            "preco * 2 + 1 > 80",
            "(preco > 10) + 1 == 2",
            "-(preco > 1) < 0",
            "(preco > 10) == 1",
            "10 < preco <= 50",
            "-(preco - 5) * 2 < 0",
        ] {
            let cond = ConditionExpr::parse(text).unwrap();
            let reparsed = ConditionExpr::parse(&cond.to_string()).unwrap();
            assert_eq!(cond, reparsed, "{text} displayed as {cond}");
            for cost in [dec!(0), dec!(1), dec!(10), dec!(40)] {
                assert_eq!(cond.evaluate(cost), reparsed.evaluate(cost), "{text} at {cost}");
            }
        }
    }

    #[test]
    fn test_nested_comparison_keeps_parentheses() {
        let cond = ConditionExpr::parse("(preco > 10) + 1 == 2").unwrap();
        assert_eq!(cond.to_string(), "((preco > 10) + 1) == 2");
        assert!(cond.evaluate(dec!(40)).unwrap());
        assert!(!cond.evaluate(dec!(5)).unwrap());

        let cond = ConditionExpr::parse("-(preco > 1) < 0").unwrap();
        assert_eq!(cond.to_string(), "-(preco > 1) < 0");
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}preco{} > 1", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(evaluate_condition(&at_limit, dec!(2)).unwrap());

        let too_deep =
            format!("{}preco{} > 1", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(
            evaluate_condition(&too_deep, dec!(2)),
            Err(ConditionError::TooDeep(MAX_NESTING))
        );

        let signs = format!("{}preco > 1", "-".repeat(MAX_NESTING + 1));
        assert_eq!(evaluate_condition(&signs, dec!(2)), Err(ConditionError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn test_token_limit() {
        let deep = format!("{}preco{} > 1", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate_condition(&deep, dec!(2)), Err(ConditionError::TooLong(MAX_TOKENS)));

        let long_sum = format!("preco{} > 1", " + 1".repeat(100_000));
        assert_eq!(
            evaluate_condition(&long_sum, dec!(2)),
            Err(ConditionError::TooLong(MAX_TOKENS))
        );
    }
}
