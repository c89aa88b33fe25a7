use std::fmt;
use std::sync::Arc;

/// An interned-by-value identifier. Equality and hashing are by string
/// content, matching `mania/types.py`'s `Symbol` (a thin wrapper over a
/// Python string used as a dict key). Cloning is cheap (bumps an `Arc`
/// refcount) rather than cheap-by-pointer-identity, since nothing in this
/// spec relies on a global interner deduplicating symbol text.
#[derive(Clone, Eq)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the reserved field-access symbol `::`, and for any symbol
    /// made up solely of colons.
    pub fn is_colon_literal(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c == ':')
    }

    /// Splits on `:`, rejecting identifiers that mix colon and non-colon
    /// segments with an empty segment (e.g. `a::b`, `:a`, `a:`).
    pub fn colon_segments(&self) -> Option<Vec<&str>> {
        if !self.0.contains(':') || self.is_colon_literal() {
            return None;
        }
        let parts: Vec<&str> = self.0.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(parts)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(Arc::from(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_content() {
        assert_eq!(Symbol::new("foo"), Symbol::new("foo"));
        assert_ne!(Symbol::new("foo"), Symbol::new("bar"));
    }

    #[test]
    fn colon_literal_detection() {
        assert!(Symbol::new("::").is_colon_literal());
        assert!(Symbol::new(":").is_colon_literal());
        assert!(!Symbol::new("a:b").is_colon_literal());
    }

    #[test]
    fn colon_segments_rejects_empty_parts() {
        assert_eq!(Symbol::new("a:b:c").colon_segments(), Some(vec!["a", "b", "c"]));
        assert_eq!(Symbol::new("a::b").colon_segments(), None);
        assert_eq!(Symbol::new(":a").colon_segments(), None);
        assert_eq!(Symbol::new("a:").colon_segments(), None);
        assert_eq!(Symbol::new("abc").colon_segments(), None);
    }
}
