//! Tokenizer for filter rules.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,

    And,
    Or,
    Not,
    In,
    Contains,
    StartsWith,
    EndsWith,
    Matches,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{v}"),
            Token::Float(v) => write!(f, "{v}"),
            Token::Str(v) => write!(f, "{v:?}"),
            Token::Ident(v) => write!(f, "{v}"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::In => f.write_str("in"),
            Token::Contains => f.write_str("contains"),
            Token::StartsWith => f.write_str("startsWith"),
            Token::EndsWith => f.write_str("endsWith"),
            Token::Matches => f.write_str("matches"),
            Token::Eq => f.write_str("=="),
            Token::Ne => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::Comma => f.write_str(","),
            Token::Dot => f.write_str("."),
        }
    }
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Lexing failure at a byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub offset: usize,
    pub message: String,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let error = |offset: usize, message: String| LexError { offset, message };

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let at = |token: Token| Spanned { token, offset };

        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('!', _) => (Token::Not, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('.', next) if !next.is_some_and(|d| d.is_ascii_digit()) => (Token::Dot, 1),
            ('"' | '\'', _) => {
                let (value, consumed) = lex_string(&chars[i..], c)
                    .ok_or_else(|| error(offset, "unterminated string literal".to_string()))?;
                tokens.push(at(Token::Str(value)));
                i += consumed;
                continue;
            }
            (c, _) if c.is_ascii_digit() || c == '.' => {
                let end = chars[i..]
                    .iter()
                    .position(|&(_, c)| !(c.is_ascii_digit() || c == '.' || c == '_'))
                    .map_or(chars.len(), |n| i + n);
                let text: String = chars[i..end]
                    .iter()
                    .map(|&(_, c)| c)
                    .filter(|&c| c != '_')
                    .collect();

                let token = if text.contains('.') {
                    text.parse()
                        .map(Token::Float)
                        .map_err(|_| error(offset, format!("invalid number '{text}'")))?
                } else {
                    text.parse()
                        .map(Token::Int)
                        .map_err(|_| error(offset, format!("invalid number '{text}'")))?
                };
                tokens.push(at(token));
                i = end;
                continue;
            }
            (c, _) if c.is_alphabetic() || c == '_' => {
                let end = chars[i..]
                    .iter()
                    .position(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
                    .map_or(chars.len(), |n| i + n);
                let word: String = chars[i..end].iter().map(|&(_, c)| c).collect();

                let token = match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" => Token::True,
                    "false" => Token::False,
                    "contains" => Token::Contains,
                    "startsWith" => Token::StartsWith,
                    "endsWith" => Token::EndsWith,
                    "matches" => Token::Matches,
                    _ => Token::Ident(word),
                };
                tokens.push(at(token));
                i = end;
                continue;
            }
            (c, _) => return Err(error(offset, format!("unexpected character '{c}'"))),
        };

        tokens.push(Spanned { token, offset });
        i += width;
    }

    Ok(tokens)
}

/// Lex a quoted string starting at `chars[0]`; returns the value and chars consumed
fn lex_string(chars: &[(usize, char)], quote: char) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut i = 1;

    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '\\' => {
                let escaped = chars.get(i + 1)?.1;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Some((value, i + 1)),
            c => {
                value.push(c);
                i += 1;
            }
        }
    }

    None
}
