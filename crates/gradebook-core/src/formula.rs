//! Formula parsing and evaluation.
//!
//! Formulas are untrusted teacher input. They are parsed into a small AST by a
//! recursive-descent parser and evaluated by walking the tree; nothing is ever
//! executed. Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | IDENT | '(' expr ')'
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::binding::Bindings;
use crate::error::FormulaError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Maximum nesting of parentheses and unary operators.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of tokens in one formula. Bounds the height of the parsed
/// tree, and with it the recursion of evaluation and drop.
pub const MAX_TOKENS: usize = 1024;

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

/// Parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate against a set of variable bindings.
    pub fn eval(&self, bindings: &Bindings) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Variable(name) => {
                bindings
                    .get(name)
                    .copied()
                    .ok_or_else(|| FormulaError::UnknownVariable { name: name.clone() })
            }
            Expr::Neg(inner) => Ok(-inner.eval(bindings)?),
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(bindings)?;
                let r = rhs.eval(bindings)?;
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => Ok(l * r),
                    BinaryOp::Div => {
                        if r == 0.0 {
                            Err(FormulaError::DivisionByZero)
                        } else {
                            Ok(l / r)
                        }
                    }
                }
            }
        }
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                out.insert(name.as_str());
            }
            Expr::Neg(inner) => inner.collect_variables(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Neg(inner) => write!(f, "(-{inner})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.position).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::syntax(
                self.position(),
                format!("expression nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(TokenKind::Minus) => {
                self.advance();
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(TokenKind::Plus) => {
                self.advance();
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let position = self.position();
        match self.advance() {
            Some(Token {
                kind: TokenKind::Number(n),
                ..
            }) => Ok(Expr::Number(n)),
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => {
                if matches!(self.peek(), Some(TokenKind::LParen)) {
                    return Err(FormulaError::syntax(
                        position,
                        format!("function calls are not supported ('{name}(')"),
                    ));
                }
                Ok(Expr::Variable(name))
            }
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {
                self.enter()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(FormulaError::syntax(
                        other.position,
                        format!("expected ')' but found {}", other.kind.describe()),
                    )),
                    None => Err(FormulaError::syntax(self.end, "missing closing ')'")),
                }
            }
            Some(other) => Err(FormulaError::syntax(
                other.position,
                format!("unexpected {}", other.kind.describe()),
            )),
            None => Err(FormulaError::syntax(position, "unexpected end of formula")),
        }
    }
}

/// A parsed, reusable formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    ast: Expr,
}

impl Formula {
    /// Parse formula text.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(FormulaError::syntax(0, "formula is empty"));
        }
        if let Some(token) = tokens.get(MAX_TOKENS) {
            return Err(FormulaError::syntax(
                token.position,
                format!("formula longer than {MAX_TOKENS} tokens"),
            ));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            end: source.chars().count(),
        };
        let ast = parser.expr()?;
        if let Some(token) = parser.advance() {
            return Err(FormulaError::syntax(
                token.position,
                format!("unexpected {} after end of expression", token.kind.describe()),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// The original formula text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed expression tree.
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Identifiers the formula references, sorted.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.ast.collect_variables(&mut out);
        out
    }

    /// Evaluate against the given bindings. Non-finite results are errors.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, FormulaError> {
        let value = self.ast.eval(bindings)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(formula: &str, bindings: &Bindings) -> Result<f64, FormulaError> {
    Formula::parse(formula)?.evaluate(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, f64)]) -> Bindings {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn weighted_sum() {
        let value = evaluate("N1*0.4+N2*0.6", &vars(&[("N1", 8.0), ("N2", 10.0)])).unwrap();
        assert!(approx(value, 9.2), "got {value}");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = evaluate("N1/N2", &vars(&[("N1", 5.0), ("N2", 0.0)])).unwrap_err();
        assert_eq!(err, FormulaError::DivisionByZero);
    }

    #[test]
    fn precedence_and_associativity() {
        let b = Bindings::new();
        assert!(approx(evaluate("2+3*4", &b).unwrap(), 14.0));
        assert!(approx(evaluate("(2+3)*4", &b).unwrap(), 20.0));
        assert!(approx(evaluate("10-4-3", &b).unwrap(), 3.0));
        assert!(approx(evaluate("24/4/3", &b).unwrap(), 2.0));
        assert!(approx(evaluate("8/2*4", &b).unwrap(), 16.0));
    }

    #[test]
    fn signed_numbers() {
        let b = vars(&[("N1", 4.0)]);
        assert!(approx(evaluate("-2.5 + N1", &b).unwrap(), 1.5));
        assert!(approx(evaluate("N1 * -1", &b).unwrap(), -4.0));
        assert!(approx(evaluate("--N1", &b).unwrap(), 4.0));
        assert!(approx(evaluate("+N1", &b).unwrap(), 4.0));
    }

    #[test]
    fn unknown_variable() {
        let err = evaluate("N1 + N3", &vars(&[("N1", 1.0), ("N2", 2.0)])).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownVariable { name: "N3".into() }
        );
    }

    #[test]
    fn syntax_errors() {
        let b = Bindings::new();
        for bad in ["", "   ", "N1 +", "(N1", "N1)", "N1 N2", "* 2", "N1 ** 2", "max(N1)"] {
            assert!(
                matches!(evaluate(bad, &b), Err(FormulaError::SyntaxError { .. })),
                "expected syntax error for {bad:?}"
            );
        }
    }

    #[test]
    fn function_call_reports_position() {
        let err = Formula::parse("1 + abs(N1)").unwrap_err();
        assert!(matches!(err, FormulaError::SyntaxError { position: 4, .. }));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            Formula::parse(&deep),
            Err(FormulaError::SyntaxError { .. })
        ));
        let ok = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(Formula::parse(&ok).is_ok());
    }

    #[test]
    fn long_flat_chains_are_rejected() {
        let b = vars(&[("N1", 0.0)]);
        let sum = vec!["N1"; 20_000].join("+");
        assert!(matches!(
            evaluate(&sum, &b),
            Err(FormulaError::SyntaxError { .. })
        ));
        let product = vec!["N1"; 20_000].join("*");
        assert!(matches!(
            Formula::parse(&product),
            Err(FormulaError::SyntaxError { .. })
        ));

        let within = vec!["N1"; MAX_TOKENS / 2].join("+");
        assert_eq!(evaluate(&within, &b).unwrap(), 0.0);
    }

    #[test]
    fn long_chain_runs_on_a_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(1024 * 1024)
            .spawn(|| {
                let b = vars(&[("N1", 1.0)]);
                let within = vec!["N1"; MAX_TOKENS / 2].join("+");
                let too_long = vec!["N1"; 200_000].join("+");
                (evaluate(&within, &b), evaluate(&too_long, &b))
            })
            .unwrap();
        let (within, too_long) = handle.join().unwrap();
        assert_eq!(within.unwrap(), (MAX_TOKENS / 2) as f64);
        assert!(matches!(too_long, Err(FormulaError::SyntaxError { .. })));
    }

    #[test]
    fn overflow_is_non_finite() {
        let err = evaluate("1e308", &Bindings::new());
        assert!(err.is_err(), "exponent notation is not part of the grammar");
        let big = "9".repeat(300);
        let err = evaluate(&format!("{big} * {big} * {big}"), &Bindings::new()).unwrap_err();
        assert_eq!(err, FormulaError::NonFinite);
    }

    #[test]
    fn variables_are_collected() {
        let formula = Formula::parse("(prova + N2) / 2 - prova").unwrap();
        let names: Vec<&str> = formula.variables().into_iter().collect();
        assert_eq!(names, vec!["N2", "prova"]);
        assert_eq!(formula.source(), "(prova + N2) / 2 - prova");
    }

    #[test]
    fn ast_display_is_fully_parenthesized() {
        let formula: Formula = "1 + 2 * -N1".parse().unwrap();
        assert_eq!(formula.ast().to_string(), "(1 + (2 * (-N1)))");
    }

    #[test]
    fn parse_once_evaluate_many() {
        let formula = Formula::parse("(N1 + N2) / 2").unwrap();
        assert!(approx(formula.evaluate(&vars(&[("N1", 6.0), ("N2", 8.0)])).unwrap(), 7.0));
        assert!(approx(formula.evaluate(&vars(&[("N1", 0.0), ("N2", 5.0)])).unwrap(), 2.5));
    }
}
