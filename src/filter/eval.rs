//! Evaluation of checked rules against a record.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Days, Utc};
use regex::Regex;

use super::check::{Arith, Attribute, Compare, Function, Method, Node, Pattern, StrTest};
use crate::domain::MediaItem;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(DateTime<Utc>),
    List(Vec<Value>),
}

/// Read-only view a rule is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub item: &'a MediaItem,
    pub now: DateTime<Utc>,
}

impl<'a> Scope<'a> {
    fn attribute(&self, attr: Attribute) -> Value {
        let item = self.item;
        let strings = |values: &[String]| Value::List(values.iter().cloned().map(Value::Str).collect());

        match attr {
            Attribute::Provider => Value::Str(item.provider.clone()),
            Attribute::TvdbId => Value::Str(item.tvdb_id.clone()),
            Attribute::TmdbId => Value::Str(item.tmdb_id.clone()),
            Attribute::ImdbId => Value::Str(item.imdb_id.clone()),
            Attribute::Slug => Value::Str(item.slug.clone()),
            Attribute::Title => Value::Str(item.title.clone()),
            Attribute::Date => Value::Date(item.date),
            Attribute::Year => Value::Int(i64::from(item.year())),
            Attribute::Runtime => Value::Int(i64::from(item.runtime)),
            Attribute::Countries => strings(&item.countries),
            Attribute::Network => Value::Str(item.network.clone()),
            Attribute::Status => Value::Str(item.status.clone()),
            Attribute::Genres => strings(&item.genres),
            Attribute::Languages => strings(&item.languages),
            Attribute::Summary => Value::Str(item.summary.clone()),
            Attribute::Character => Value::Str(item.character.clone().unwrap_or_default()),
        }
    }
}

pub fn eval(node: &Node, scope: &Scope<'_>) -> Result<Value, String> {
    match node {
        Node::Bool(v) => Ok(Value::Bool(*v)),
        Node::Int(v) => Ok(Value::Int(*v)),
        Node::Float(v) => Ok(Value::Float(*v)),
        Node::Str(v) => Ok(Value::Str(v.clone())),
        Node::List(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Node::Attr(attr) => Ok(scope.attribute(*attr)),

        Node::Not(operand) => Ok(Value::Bool(!eval_bool(operand, scope)?)),
        Node::Neg(operand) => match eval(operand, scope)? {
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(unexpected("number", &other)),
        },

        Node::And(left, right) => {
            Ok(Value::Bool(eval_bool(left, scope)? && eval_bool(right, scope)?))
        }
        Node::Or(left, right) => {
            Ok(Value::Bool(eval_bool(left, scope)? || eval_bool(right, scope)?))
        }

        Node::Compare(cmp, left, right) => {
            let (l, r) = (eval(left, scope)?, eval(right, scope)?);
            let result = match cmp {
                Compare::Eq => values_equal(&l, &r),
                Compare::Ne => !values_equal(&l, &r),
                ordering => {
                    let order = compare(&l, &r).ok_or_else(|| {
                        format!("cannot order {} and {}", kind(&l), kind(&r))
                    })?;
                    match ordering {
                        Compare::Lt => order == Ordering::Less,
                        Compare::Le => order != Ordering::Greater,
                        Compare::Gt => order == Ordering::Greater,
                        _ => order != Ordering::Less,
                    }
                }
            };
            Ok(Value::Bool(result))
        }

        Node::Arith(op, left, right) => arith(*op, eval(left, scope)?, eval(right, scope)?),

        Node::Concat(left, right) => {
            let mut l = eval_str(left, scope)?;
            l.push_str(&eval_str(right, scope)?);
            Ok(Value::Str(l))
        }

        Node::InList {
            negated,
            needle,
            list,
        } => {
            let needle = eval(needle, scope)?;
            let found = match eval(list, scope)? {
                Value::List(items) => items.iter().any(|item| values_equal(&needle, item)),
                other => return Err(unexpected("list", &other)),
            };
            Ok(Value::Bool(found != *negated))
        }

        Node::InStr {
            negated,
            needle,
            haystack,
        } => {
            let needle = eval_str(needle, scope)?;
            let haystack = eval_str(haystack, scope)?;
            Ok(Value::Bool(haystack.contains(&needle) != *negated))
        }

        Node::StrTest(test, left, right) => {
            let l = eval_str(left, scope)?;
            let r = eval_str(right, scope)?;
            Ok(Value::Bool(match test {
                StrTest::Contains => l.contains(&r),
                StrTest::StartsWith => l.starts_with(&r),
                StrTest::EndsWith => l.ends_with(&r),
            }))
        }

        Node::Matches(subject, pattern) => {
            let subject = eval_str(subject, scope)?;
            let matched = match pattern {
                Pattern::Static(regex) => regex.is_match(&subject),
                Pattern::Dynamic(source) => {
                    let source = eval_str(source, scope)?;
                    Regex::new(&source)
                        .map_err(|e| format!("invalid regular expression: {e}"))?
                        .is_match(&subject)
                }
            };
            Ok(Value::Bool(matched))
        }

        Node::Call(function, args) => call(*function, args, scope),

        Node::Method(method, receiver, args) => {
            let date = match eval(receiver, scope)? {
                Value::Date(date) => date,
                other => return Err(unexpected("date", &other)),
            };
            call_method(*method, date, args, scope)
        }
    }
}

pub fn eval_bool(node: &Node, scope: &Scope<'_>) -> Result<bool, String> {
    match eval(node, scope)? {
        Value::Bool(v) => Ok(v),
        other => Err(unexpected("bool", &other)),
    }
}

fn eval_str(node: &Node, scope: &Scope<'_>) -> Result<String, String> {
    match eval(node, scope)? {
        Value::Str(v) => Ok(v),
        other => Err(unexpected("string", &other)),
    }
}

fn call(function: Function, args: &[Node], scope: &Scope<'_>) -> Result<Value, String> {
    let args = args
        .iter()
        .map(|arg| eval(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;

    match (function, args.as_slice()) {
        (Function::Now, []) => Ok(Value::Date(scope.now)),
        (Function::Len, [Value::Str(s)]) => Ok(Value::Int(s.chars().count() as i64)),
        (Function::Len, [Value::List(items)]) => Ok(Value::Int(items.len() as i64)),
        (Function::Lower, [Value::Str(s)]) => Ok(Value::Str(s.to_lowercase())),
        (Function::Upper, [Value::Str(s)]) => Ok(Value::Str(s.to_uppercase())),
        (function, _) => Err(format!("invalid arguments to {function:?}")),
    }
}

fn call_method(
    method: Method,
    date: DateTime<Utc>,
    args: &[Node],
    scope: &Scope<'_>,
) -> Result<Value, String> {
    match method {
        Method::Year => Ok(Value::Int(i64::from(date.year()))),
        Method::Month => Ok(Value::Int(i64::from(date.month()))),
        Method::Day => Ok(Value::Int(i64::from(date.day()))),
        Method::Unix => Ok(Value::Int(date.timestamp())),
        Method::AddDays => {
            let days = match args.first().map(|arg| eval(arg, scope)).transpose()? {
                Some(Value::Int(days)) => days,
                _ => return Err("AddDays expects an int".to_string()),
            };
            let shifted = if days >= 0 {
                date.checked_add_days(Days::new(days.unsigned_abs()))
            } else {
                date.checked_sub_days(Days::new(days.unsigned_abs()))
            };
            shifted
                .map(Value::Date)
                .ok_or_else(|| "date out of range".to_string())
        }
        Method::Before | Method::After => {
            let other = match args.first().map(|arg| eval(arg, scope)).transpose()? {
                Some(Value::Date(other)) => other,
                _ => return Err("expected a date argument".to_string()),
            };
            Ok(Value::Bool(if method == Method::Before {
                date < other
            } else {
                date > other
            }))
        }
    }
}

fn arith(op: Arith, left: Value, right: Value) -> Result<Value, String> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => {
            let result = match op {
                Arith::Add => l.checked_add(r),
                Arith::Sub => l.checked_sub(r),
                Arith::Mul => l.checked_mul(r),
                Arith::Div | Arith::Rem if r == 0 => return Err("division by zero".to_string()),
                Arith::Div => l.checked_div(r),
                Arith::Rem => l.checked_rem(r),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string())
        }
        (l, r) => {
            let (l, r) = (as_float(&l)?, as_float(&r)?);
            if matches!(op, Arith::Div | Arith::Rem) && r == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Float(match op {
                Arith::Add => l + r,
                Arith::Sub => l - r,
                Arith::Mul => l * r,
                Arith::Div => l / r,
                Arith::Rem => l % r,
            }))
        }
    }
}

fn as_float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        other => Err(unexpected("number", other)),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            compare(left, right) == Some(Ordering::Equal)
        }
        (Value::List(l), Value::List(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (l, r) => l == r,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        (Value::Date(l), Value::Date(r)) => Some(l.cmp(r)),
        (l, r) => as_float(l).ok()?.partial_cmp(&as_float(r).ok()?),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Str(_) => "string",
        Value::Date(_) => "date",
        Value::List(_) => "list",
    }
}

fn unexpected(wanted: &str, found: &Value) -> String {
    format!("expected {wanted}, found {}", kind(found))
}
