//! Recursive-descent parser producing an untyped syntax tree.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons (including
//! `in`, `not in`, `contains`, `startsWith`, `endsWith`, `matches`),
//! `+ -`, `* / %`, unary `-`, method calls.

use super::lexer::{tokenize, Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Contains => "contains",
            BinaryOp::StartsWith => "startsWith",
            BinaryOp::EndsWith => "endsWith",
            BinaryOp::Matches => "matches",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Expr>),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Method {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

/// Parse failure at a byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source).map_err(|e| ParseError {
        offset: e.offset,
        message: e.message,
    })?;

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
    };

    if parser.tokens.is_empty() {
        return Err(parser.error("empty expression"));
    }

    let expr = parser.or()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(format!("unexpected '{token}'")));
    }

    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(found) => self.error(format!("expected '{token}', found '{found}'")),
            None => self.error(format!("expected '{token}' before end of expression")),
        })
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not()?;
        while self.eat(&Token::And) {
            let right = self.not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Not) {
            let operand = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;

        let op = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Eq), _) => BinaryOp::Eq,
            (Some(Token::Ne), _) => BinaryOp::Ne,
            (Some(Token::Lt), _) => BinaryOp::Lt,
            (Some(Token::Le), _) => BinaryOp::Le,
            (Some(Token::Gt), _) => BinaryOp::Gt,
            (Some(Token::Ge), _) => BinaryOp::Ge,
            (Some(Token::In), _) => BinaryOp::In,
            (Some(Token::Not), Some(Token::In)) => {
                self.pos += 1;
                BinaryOp::NotIn
            }
            (Some(Token::Contains), _) => BinaryOp::Contains,
            (Some(Token::StartsWith), _) => BinaryOp::StartsWith,
            (Some(Token::EndsWith), _) => BinaryOp::EndsWith,
            (Some(Token::Matches), _) => BinaryOp::Matches,
            _ => return Ok(left),
        };
        self.pos += 1;

        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
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
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        while self.eat(&Token::Dot) {
            let name = match self.advance() {
                Some(Token::Ident(name)) => name,
                _ => return Err(self.error("expected method name after '.'")),
            };
            self.expect(&Token::LParen)?;
            let args = self.arguments(&Token::RParen)?;

            expr = Expr::Method {
                receiver: Box::new(expr),
                name,
                args,
            };
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset_error = self.error("expected a value");
        let Some(token) = self.advance() else {
            return Err(ParseError {
                message: "unexpected end of expression".to_string(),
                ..offset_error
            });
        };

        match token {
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Int(v) => Ok(Expr::Int(v)),
            Token::Float(v) => Ok(Expr::Float(v)),
            Token::Str(v) => Ok(Expr::Str(v)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments(&Token::RParen)?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                let expr = self.or()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => Ok(Expr::List(self.arguments(&Token::RBracket)?)),
            other => Err(ParseError {
                message: format!("unexpected '{other}'"),
                ..offset_error
            }),
        }
    }

    /// Comma separated expressions up to and including `close`
    fn arguments(&mut self, close: &Token) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }

        loop {
            args.push(self.or()?);
            if self.eat(close) {
                return Ok(args);
            }
            self.expect(&Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a or b and c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Or,
                ident("a"),
                Box::new(Expr::Binary(BinaryOp::And, ident("b"), ident("c")))
            )
        );
    }

    #[test]
    fn test_not_in() {
        let expr = parse("\"en\" not in Languages").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::NotIn,
                Box::new(Expr::Str("en".into())),
                ident("Languages")
            )
        );
    }

    #[test]
    fn test_not_applies_to_comparison() {
        let expr = parse("not Year < 2000").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary(UnaryOp::Not, inner) if matches!(*inner, Expr::Binary(BinaryOp::Lt, _, _))
        ));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Int(1)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Int(3))
                ))
            )
        );
    }

    #[test]
    fn test_calls_methods_and_lists() {
        let expr = parse("Now().AddDays(-30)").unwrap();
        assert!(matches!(expr, Expr::Method { ref name, ref args, .. } if name == "AddDays" && args.len() == 1));

        let expr = parse("Network in [\"Netflix\", \"HBO\"]").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary(BinaryOp::In, _, list) if matches!(*list, Expr::List(ref items) if items.len() == 2)
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("Year <").is_err());
        assert!(parse("(Year < 2000").is_err());
        assert!(parse("Year < 2000 2001").is_err());
        assert!(parse("Date.").is_err());
        assert!(parse("[1, 2").is_err());
    }

    #[test]
    fn test_error_offset_points_at_problem() {
        let err = parse("Year < 2000 )").unwrap_err();
        assert_eq!(err.offset, 12);
    }
}
