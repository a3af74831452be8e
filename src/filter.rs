//! Selector parsing and the name-filter predicate consumed by
//! [`crate::registration`] when assembling the root suite.

/// `Selector := Identifier ('/' Identifier)?` — a bare class name, or a
/// class name and method name separated by one `/`. Two or more `/`
/// segments is malformed and the selector is discarded by
/// [`Selector::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    pub class: String,
    pub method: Option<String>,
}

impl Selector {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('/');
        let class = parts.next()?;
        if class.is_empty() {
            return None;
        }
        let method = match parts.next() {
            None => None,
            Some(m) if !m.is_empty() && parts.next().is_none() => Some(m.to_string()),
            _ => return None, // a second '/' makes this malformed
        };
        Some(Selector {
            class: class.to_string(),
            method,
        })
    }
}

/// Either "run everything" or a set of selectors naming exactly which
/// classes/methods to run.
#[derive(Clone, Debug)]
pub enum Filter {
    All,
    Selected(Vec<Selector>),
}

impl Filter {
    /// Parses command-line selector strings. Malformed selectors are
    /// dropped silently (per spec.md §6); if every selector turns out
    /// malformed, falls back to [`Filter::All`] rather than matching
    /// nothing.
    pub fn parse(raw: &[String]) -> Self {
        if raw.is_empty() {
            return Filter::All;
        }
        let selectors: Vec<Selector> = raw.iter().filter_map(|s| Selector::parse(s)).collect();
        if selectors.is_empty() {
            Filter::All
        } else {
            Filter::Selected(selectors)
        }
    }

    /// Whether `(class, method)` survives this filter: the selector set
    /// must contain either `{class}` or `{class, method}`.
    pub fn includes(&self, class: &str, method: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Selected(selectors) => selectors.iter().any(|s| {
                s.class == class && s.method.as_deref().is_none_or(|m| m == method)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_class_name_parses_with_no_method() {
        let s = Selector::parse("MyTests").unwrap();
        assert_eq!(s.class, "MyTests");
        assert_eq!(s.method, None);
    }

    #[test]
    fn class_and_method_parse() {
        let s = Selector::parse("MyTests/testFoo").unwrap();
        assert_eq!(s.class, "MyTests");
        assert_eq!(s.method.as_deref(), Some("testFoo"));
    }

    #[test]
    fn two_or_more_slashes_is_malformed() {
        assert!(Selector::parse("MyTests/testFoo/extra").is_none());
    }

    #[test]
    fn empty_string_is_malformed() {
        assert!(Selector::parse("").is_none());
    }

    #[test]
    fn no_selectors_means_run_everything() {
        assert!(matches!(Filter::parse(&[]), Filter::All));
    }

    #[test]
    fn class_only_selector_includes_every_method_of_that_class() {
        let filter = Filter::parse(&["A".to_string()]);
        assert!(filter.includes("A", "t1"));
        assert!(filter.includes("A", "t2"));
        assert!(!filter.includes("B", "t1"));
    }

    #[test]
    fn class_slash_method_selector_includes_only_that_method() {
        let filter = Filter::parse(&["A/t1".to_string()]);
        assert!(filter.includes("A", "t1"));
        assert!(!filter.includes("A", "t2"));
    }

    #[test]
    fn filter_idempotence() {
        let filter = Filter::parse(&["A/t1".to_string(), "B".to_string()]);
        let once = filter.includes("A", "t1");
        let twice = filter.includes("A", "t1");
        assert_eq!(once, twice);
    }

    #[test]
    fn all_malformed_selectors_fall_back_to_running_everything() {
        let filter = Filter::parse(&["a/b/c".to_string()]);
        assert!(matches!(filter, Filter::All));
    }
}
