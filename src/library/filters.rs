//! Rule-backed ignore/accept decisions for a library.

use crate::domain::MediaItem;
use crate::filter::{ExpressionError, FilterRules};

/// Compiled ignore and accept rule sets
#[derive(Debug, Clone, Default)]
pub struct LibraryFilters {
    ignores: FilterRules,
    accepts: FilterRules,
}

impl LibraryFilters {
    /// Compile both rule sets; any bad rule fails construction
    pub fn new<I: AsRef<str>, A: AsRef<str>>(
        ignores: &[I],
        accepts: &[A],
    ) -> Result<Self, ExpressionError> {
        Ok(Self {
            ignores: FilterRules::compile(ignores)?,
            accepts: FilterRules::compile(accepts)?,
        })
    }

    /// Whether any ignore rule matches
    pub fn should_ignore(&self, item: &MediaItem) -> Result<bool, ExpressionError> {
        self.ignores.matches(item)
    }

    /// Whether any accept rule matches. No search path consults this yet.
    pub fn should_accept(&self, item: &MediaItem) -> Result<bool, ExpressionError> {
        self.accepts.matches(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;
    use chrono::{TimeZone, Utc};

    fn show(network: &str) -> MediaItem {
        let date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut item = MediaItem::new("trakt", MediaType::Show, "Show", date);
        item.network = network.to_string();
        item
    }

    #[test]
    fn test_ignore_and_accept_are_independent() {
        let filters =
            LibraryFilters::new(&["Network == \"YouTube\""], &["Network == \"HBO\""]).unwrap();

        assert!(filters.should_ignore(&show("YouTube")).unwrap());
        assert!(!filters.should_accept(&show("YouTube")).unwrap());
        assert!(filters.should_accept(&show("HBO")).unwrap());
        assert!(!filters.should_ignore(&show("HBO")).unwrap());
    }

    #[test]
    fn test_bad_rule_fails_construction() {
        assert!(LibraryFilters::new(&["Network =="], &[] as &[&str]).is_err());
        assert!(LibraryFilters::new(&[] as &[&str], &["Bogus"]).is_err());
    }
}
