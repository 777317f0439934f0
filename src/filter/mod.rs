//! Filter rules: small boolean expressions evaluated against media records.
//!
//! Rules are compiled once, up front. Compilation resolves every attribute,
//! checks operand types and requires a boolean result, so a broken rule
//! fails at startup instead of silently letting items through.
//!
//! ```text
//! Runtime < 30
//! "Reality" in Genres or Network == "YouTube"
//! Date.After(Now().AddDays(-30)) and not ("en" in Languages)
//! Title matches "(?i)christmas"
//! ```
//!
//! Attributes: `Provider`, `TvdbId`, `TmdbId`, `ImdbId`, `Slug`, `Title`,
//! `Date`, `Year`, `Runtime`, `Countries`, `Network`, `Status`, `Genres`,
//! `Languages`, `Summary`, `Character`. Functions: `Now()`, `len(x)`,
//! `lower(s)`, `upper(s)`; dates support `Year()`, `Month()`, `Day()`,
//! `Unix()`, `AddDays(n)`, `Before(d)` and `After(d)`.

mod check;
mod eval;
mod lexer;
mod parser;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::MediaItem;
use check::{CheckError, Node, Type};
use eval::Scope;

pub use check::Attribute;

/// Errors raised while compiling or evaluating a rule
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Syntax error in rule '{rule}' at offset {offset}: {message}")]
    Syntax {
        rule: String,
        offset: usize,
        message: String,
    },

    #[error("Unknown attribute '{name}' in rule '{rule}'")]
    UnknownAttribute { rule: String, name: String },

    #[error("Unknown function '{name}' in rule '{rule}'")]
    UnknownFunction { rule: String, name: String },

    #[error("Type error in rule '{rule}': {message}")]
    Type { rule: String, message: String },

    #[error("Rule '{rule}' must evaluate to bool, found {found}")]
    NotBoolean { rule: String, found: String },

    #[error("Failed evaluating rule '{rule}': {message}")]
    Evaluation { rule: String, message: String },
}

/// One compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    source: String,
    node: Node,
}

impl Rule {
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        let rule = source.to_string();

        let expr = parser::parse(source).map_err(|e| ExpressionError::Syntax {
            rule: rule.clone(),
            offset: e.offset,
            message: e.message,
        })?;

        let (node, ty) = check::check(&expr).map_err(|e| match e {
            CheckError::UnknownAttribute(name) => ExpressionError::UnknownAttribute {
                rule: rule.clone(),
                name,
            },
            CheckError::UnknownFunction(name) => ExpressionError::UnknownFunction {
                rule: rule.clone(),
                name,
            },
            CheckError::Type(message) => ExpressionError::Type {
                rule: rule.clone(),
                message,
            },
        })?;

        if ty != Type::Bool {
            return Err(ExpressionError::NotBoolean {
                rule,
                found: ty.to_string(),
            });
        }

        Ok(Self { source: rule, node })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `item` with an explicit "now"
    pub fn evaluate_at(&self, item: &MediaItem, now: DateTime<Utc>) -> Result<bool, ExpressionError> {
        let scope = Scope { item, now };
        eval::eval_bool(&self.node, &scope).map_err(|message| ExpressionError::Evaluation {
            rule: self.source.clone(),
            message,
        })
    }
}

/// Ordered set of compiled rules
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    rules: Vec<Rule>,
}

impl FilterRules {
    /// Compile every rule; the first failure aborts
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Self, ExpressionError> {
        let rules = sources
            .iter()
            .map(|source| Rule::compile(source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether any rule matches `item`.
    ///
    /// Rules run in order and the first match wins. An evaluation failure is
    /// returned as an error; callers treat it as a match.
    pub fn matches(&self, item: &MediaItem) -> Result<bool, ExpressionError> {
        self.matches_at(item, Utc::now())
    }

    pub fn matches_at(&self, item: &MediaItem, now: DateTime<Utc>) -> Result<bool, ExpressionError> {
        for rule in &self.rules {
            if rule.evaluate_at(item, now)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;
    use chrono::TimeZone;

    fn item(year: i32) -> MediaItem {
        let date = Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap();
        MediaItem::new("tmdb", MediaType::Movie, "Title", date)
    }

    #[test]
    fn test_year_rule() {
        let rules = FilterRules::compile(&["Year < 2000"]).unwrap();
        assert!(rules.matches(&item(1999)).unwrap());
        assert!(!rules.matches(&item(2001)).unwrap());
    }

    #[test]
    fn test_no_rules_never_match() {
        let rules = FilterRules::compile::<&str>(&[]).unwrap();
        assert!(rules.is_empty());
        assert!(!rules.matches(&item(1999)).unwrap());
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = FilterRules::compile(&["Year > 3000", "Year < 2000", "Runtime / 0 > 1"]).unwrap();
        assert!(rules.matches(&item(1999)).unwrap());
        // Nothing matched before the failing rule
        assert!(rules.matches(&item(2001)).is_err());
    }

    #[test]
    fn test_compile_failures() {
        assert!(matches!(
            FilterRules::compile(&["Year <"]),
            Err(ExpressionError::Syntax { .. })
        ));
        assert!(matches!(
            FilterRules::compile(&["Rating > 5"]),
            Err(ExpressionError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            FilterRules::compile(&["Year + 1"]),
            Err(ExpressionError::NotBoolean { .. })
        ));
        assert!(matches!(
            FilterRules::compile(&["Title > 1"]),
            Err(ExpressionError::Type { .. })
        ));
        assert!(matches!(
            FilterRules::compile(&["Year < 2000", "system(\"ls\")"]),
            Err(ExpressionError::UnknownFunction { .. })
        ));
    }
}
