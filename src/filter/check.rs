//! Name resolution and static type checking.
//!
//! Every identifier is resolved against the fixed attribute schema of a
//! `MediaItem` and every operator is checked for operand types, so a rule
//! that compiles can only fail at run time on arithmetic or a dynamic regex.

use std::fmt;

use regex::Regex;

use super::parser::{BinaryOp, Expr, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int,
    Float,
    Str,
    Date,
    List(Box<Type>),
}

impl Type {
    fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Whether values of the two types can be compared for equality
    fn comparable_with(&self, other: &Type) -> bool {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Type::List(a), Type::List(b)) => a.comparable_with(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::Str => f.write_str("string"),
            Type::Date => f.write_str("date"),
            Type::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// Record attributes visible to rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Provider,
    TvdbId,
    TmdbId,
    ImdbId,
    Slug,
    Title,
    Date,
    Year,
    Runtime,
    Countries,
    Network,
    Status,
    Genres,
    Languages,
    Summary,
    Character,
}

impl Attribute {
    pub const ALL: [Attribute; 16] = [
        Attribute::Provider,
        Attribute::TvdbId,
        Attribute::TmdbId,
        Attribute::ImdbId,
        Attribute::Slug,
        Attribute::Title,
        Attribute::Date,
        Attribute::Year,
        Attribute::Runtime,
        Attribute::Countries,
        Attribute::Network,
        Attribute::Status,
        Attribute::Genres,
        Attribute::Languages,
        Attribute::Summary,
        Attribute::Character,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Provider => "Provider",
            Attribute::TvdbId => "TvdbId",
            Attribute::TmdbId => "TmdbId",
            Attribute::ImdbId => "ImdbId",
            Attribute::Slug => "Slug",
            Attribute::Title => "Title",
            Attribute::Date => "Date",
            Attribute::Year => "Year",
            Attribute::Runtime => "Runtime",
            Attribute::Countries => "Countries",
            Attribute::Network => "Network",
            Attribute::Status => "Status",
            Attribute::Genres => "Genres",
            Attribute::Languages => "Languages",
            Attribute::Summary => "Summary",
            Attribute::Character => "Character",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    pub fn ty(&self) -> Type {
        match self {
            Attribute::Date => Type::Date,
            Attribute::Year | Attribute::Runtime => Type::Int,
            Attribute::Countries | Attribute::Genres | Attribute::Languages => {
                Type::List(Box::new(Type::Str))
            }
            _ => Type::Str,
        }
    }
}

/// Free functions callable from rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Now,
    Len,
    Lower,
    Upper,
}

/// Methods callable on date values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Year,
    Month,
    Day,
    Unix,
    AddDays,
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrTest {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Static(Regex),
    Dynamic(Box<Node>),
}

/// Resolved, type-checked expression
#[derive(Debug, Clone)]
pub enum Node {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Node>),
    Attr(Attribute),
    Not(Box<Node>),
    Neg(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare(Compare, Box<Node>, Box<Node>),
    Arith(Arith, Box<Node>, Box<Node>),
    Concat(Box<Node>, Box<Node>),
    /// Membership in a list
    InList {
        negated: bool,
        needle: Box<Node>,
        list: Box<Node>,
    },
    /// Substring test
    InStr {
        negated: bool,
        needle: Box<Node>,
        haystack: Box<Node>,
    },
    StrTest(StrTest, Box<Node>, Box<Node>),
    Matches(Box<Node>, Pattern),
    Call(Function, Vec<Node>),
    Method(Method, Box<Node>, Vec<Node>),
}

/// Failure found while checking a rule
#[derive(Debug, Clone, PartialEq)]
pub enum CheckError {
    UnknownAttribute(String),
    UnknownFunction(String),
    Type(String),
}

pub fn check(expr: &Expr) -> Result<(Node, Type), CheckError> {
    match expr {
        Expr::Bool(v) => Ok((Node::Bool(*v), Type::Bool)),
        Expr::Int(v) => Ok((Node::Int(*v), Type::Int)),
        Expr::Float(v) => Ok((Node::Float(*v), Type::Float)),
        Expr::Str(v) => Ok((Node::Str(v.clone()), Type::Str)),

        Expr::Ident(name) => {
            let attr = Attribute::from_name(name)
                .ok_or_else(|| CheckError::UnknownAttribute(name.clone()))?;
            Ok((Node::Attr(attr), attr.ty()))
        }

        Expr::List(items) => check_list(items),

        Expr::Unary(UnaryOp::Not, operand) => {
            let (node, ty) = check(operand)?;
            expect(&ty, &Type::Bool, "not")?;
            Ok((Node::Not(Box::new(node)), Type::Bool))
        }

        Expr::Unary(UnaryOp::Neg, operand) => {
            let (node, ty) = check(operand)?;
            if !ty.is_numeric() {
                return Err(type_error(format!("cannot negate {ty}")));
            }
            Ok((Node::Neg(Box::new(node)), ty))
        }

        Expr::Binary(op, left, right) => check_binary(*op, left, right),

        Expr::Call { name, args } => check_call(name, args),

        Expr::Method {
            receiver,
            name,
            args,
        } => check_method(receiver, name, args),
    }
}

fn check_list(items: &[Expr]) -> Result<(Node, Type), CheckError> {
    let mut nodes = Vec::with_capacity(items.len());
    let mut element: Option<Type> = None;

    for item in items {
        let (node, ty) = check(item)?;
        element = match element {
            None => Some(ty),
            Some(prev) if prev == ty => Some(prev),
            Some(prev) if prev.is_numeric() && ty.is_numeric() => Some(Type::Float),
            Some(prev) => {
                return Err(type_error(format!(
                    "list mixes {prev} and {ty} elements"
                )))
            }
        };
        nodes.push(node);
    }

    let element = element.unwrap_or(Type::Str);
    Ok((Node::List(nodes), Type::List(Box::new(element))))
}

fn check_binary(op: BinaryOp, left: &Expr, right: &Expr) -> Result<(Node, Type), CheckError> {
    let (l, lt) = check(left)?;
    let (r, rt) = check(right)?;
    let (l, r) = (Box::new(l), Box::new(r));
    let mismatch = || {
        type_error(format!(
            "operator '{}' cannot be applied to {lt} and {rt}",
            op.symbol()
        ))
    };

    match op {
        BinaryOp::And | BinaryOp::Or => {
            expect(&lt, &Type::Bool, op.symbol())?;
            expect(&rt, &Type::Bool, op.symbol())?;
            let node = if op == BinaryOp::And {
                Node::And(l, r)
            } else {
                Node::Or(l, r)
            };
            Ok((node, Type::Bool))
        }

        BinaryOp::Eq | BinaryOp::Ne => {
            if !lt.comparable_with(&rt) {
                return Err(mismatch());
            }
            let cmp = if op == BinaryOp::Eq { Compare::Eq } else { Compare::Ne };
            Ok((Node::Compare(cmp, l, r), Type::Bool))
        }

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordered = (lt.is_numeric() && rt.is_numeric())
                || (lt == rt && matches!(lt, Type::Str | Type::Date));
            if !ordered {
                return Err(mismatch());
            }
            let cmp = match op {
                BinaryOp::Lt => Compare::Lt,
                BinaryOp::Le => Compare::Le,
                BinaryOp::Gt => Compare::Gt,
                _ => Compare::Ge,
            };
            Ok((Node::Compare(cmp, l, r), Type::Bool))
        }

        BinaryOp::In | BinaryOp::NotIn => {
            let negated = op == BinaryOp::NotIn;
            match &rt {
                Type::List(element) if lt.comparable_with(element) => Ok((
                    Node::InList {
                        negated,
                        needle: l,
                        list: r,
                    },
                    Type::Bool,
                )),
                Type::Str if lt == Type::Str => Ok((
                    Node::InStr {
                        negated,
                        needle: l,
                        haystack: r,
                    },
                    Type::Bool,
                )),
                _ => Err(mismatch()),
            }
        }

        BinaryOp::Contains => match &lt {
            Type::List(element) if rt.comparable_with(element) => Ok((
                Node::InList {
                    negated: false,
                    needle: r,
                    list: l,
                },
                Type::Bool,
            )),
            Type::Str if rt == Type::Str => {
                Ok((Node::StrTest(StrTest::Contains, l, r), Type::Bool))
            }
            _ => Err(mismatch()),
        },

        BinaryOp::StartsWith | BinaryOp::EndsWith => {
            if lt != Type::Str || rt != Type::Str {
                return Err(mismatch());
            }
            let test = if op == BinaryOp::StartsWith {
                StrTest::StartsWith
            } else {
                StrTest::EndsWith
            };
            Ok((Node::StrTest(test, l, r), Type::Bool))
        }

        BinaryOp::Matches => {
            if lt != Type::Str || rt != Type::Str {
                return Err(mismatch());
            }
            let pattern = match *r {
                Node::Str(source) => Pattern::Static(
                    Regex::new(&source)
                        .map_err(|e| type_error(format!("invalid regular expression: {e}")))?,
                ),
                other => Pattern::Dynamic(Box::new(other)),
            };
            Ok((Node::Matches(l, pattern), Type::Bool))
        }

        BinaryOp::Add if lt == Type::Str && rt == Type::Str => {
            Ok((Node::Concat(l, r), Type::Str))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            if !lt.is_numeric() || !rt.is_numeric() {
                return Err(mismatch());
            }
            let ty = if lt == Type::Int && rt == Type::Int {
                Type::Int
            } else {
                Type::Float
            };
            let arith = match op {
                BinaryOp::Add => Arith::Add,
                BinaryOp::Sub => Arith::Sub,
                BinaryOp::Mul => Arith::Mul,
                BinaryOp::Div => Arith::Div,
                _ => Arith::Rem,
            };
            Ok((Node::Arith(arith, l, r), ty))
        }
    }
}

fn check_call(name: &str, args: &[Expr]) -> Result<(Node, Type), CheckError> {
    let checked = args.iter().map(check).collect::<Result<Vec<_>, _>>()?;
    let (nodes, types): (Vec<Node>, Vec<Type>) = checked.into_iter().unzip();

    let (function, ty) = match (name, types.as_slice()) {
        ("Now", []) => (Function::Now, Type::Date),
        ("len", [Type::Str | Type::List(_)]) => (Function::Len, Type::Int),
        ("lower", [Type::Str]) => (Function::Lower, Type::Str),
        ("upper", [Type::Str]) => (Function::Upper, Type::Str),
        ("Now" | "len" | "lower" | "upper", _) => {
            return Err(type_error(format!(
                "invalid arguments to {name}({})",
                join_types(&types)
            )))
        }
        _ => return Err(CheckError::UnknownFunction(name.to_string())),
    };

    Ok((Node::Call(function, nodes), ty))
}

fn check_method(receiver: &Expr, name: &str, args: &[Expr]) -> Result<(Node, Type), CheckError> {
    let (recv, recv_ty) = check(receiver)?;
    if recv_ty != Type::Date {
        return Err(type_error(format!("{recv_ty} has no method {name}()")));
    }

    let checked = args.iter().map(check).collect::<Result<Vec<_>, _>>()?;
    let (nodes, types): (Vec<Node>, Vec<Type>) = checked.into_iter().unzip();

    let (method, ty) = match (name, types.as_slice()) {
        ("Year", []) => (Method::Year, Type::Int),
        ("Month", []) => (Method::Month, Type::Int),
        ("Day", []) => (Method::Day, Type::Int),
        ("Unix", []) => (Method::Unix, Type::Int),
        ("AddDays", [Type::Int]) => (Method::AddDays, Type::Date),
        ("Before", [Type::Date]) => (Method::Before, Type::Bool),
        ("After", [Type::Date]) => (Method::After, Type::Bool),
        ("Year" | "Month" | "Day" | "Unix" | "AddDays" | "Before" | "After", _) => {
            return Err(type_error(format!(
                "invalid arguments to {name}({})",
                join_types(&types)
            )))
        }
        _ => return Err(CheckError::UnknownFunction(format!("date.{name}"))),
    };

    Ok((Node::Method(method, Box::new(recv), nodes), ty))
}

fn expect(found: &Type, wanted: &Type, context: &str) -> Result<(), CheckError> {
    if found == wanted {
        Ok(())
    } else {
        Err(type_error(format!(
            "'{context}' expects {wanted}, found {found}"
        )))
    }
}

fn type_error(message: String) -> CheckError {
    CheckError::Type(message)
}

fn join_types(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse;

    fn type_of(source: &str) -> Result<Type, CheckError> {
        check(&parse(source).unwrap()).map(|(_, ty)| ty)
    }

    #[test]
    fn test_attribute_types() {
        assert_eq!(type_of("Year").unwrap(), Type::Int);
        assert_eq!(type_of("Genres").unwrap(), Type::List(Box::new(Type::Str)));
        assert_eq!(type_of("Date").unwrap(), Type::Date);
        assert_eq!(type_of("Date.AddDays(7)").unwrap(), Type::Date);
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(
            type_of("Rating > 5").unwrap_err(),
            CheckError::UnknownAttribute("Rating".to_string())
        );
        assert_eq!(
            type_of("exec(\"rm\")").unwrap_err(),
            CheckError::UnknownFunction("exec".to_string())
        );
    }

    #[test]
    fn test_operand_types_are_checked() {
        assert!(type_of("Title > 5").is_err());
        assert!(type_of("Year and true").is_err());
        assert!(type_of("5 in Genres").is_err());
        assert!(type_of("Runtime startsWith \"1\"").is_err());
        assert!(type_of("Date.Before(5)").is_err());
        assert!(type_of("Title.Year()").is_err());
        assert!(type_of("[1, \"a\"]").is_err());
        assert!(type_of("Title matches \"(\"").is_err());
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(type_of("Runtime * 1.5").unwrap(), Type::Float);
        assert_eq!(type_of("Runtime / 2").unwrap(), Type::Int);
        assert_eq!(type_of("Runtime > 1.5").unwrap(), Type::Bool);
        assert_eq!(type_of("Year in [1999, 2000.0]").unwrap(), Type::Bool);
    }
}
