use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Prefix reserved for internal κ-argument symbols.
pub const KARG_PREFIX: &str = "karg$";

/// A textual identifier with cheap clones and hashable identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(Arc::from(name.into().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Internal formal argument of a κ-variable, e.g. `karg$v#2`.
    ///
    /// The original name is recoverable via [`Symbol::tidy`].
    pub fn karg(orig: &str, idx: usize) -> Self {
        Symbol::new(format!("{KARG_PREFIX}{orig}#{idx}"))
    }

    pub fn is_karg(&self) -> bool {
        self.0.starts_with(KARG_PREFIX)
    }

    /// Normalise for external reporting: strip the `karg$` prefix and the
    /// `#<n>` disambiguating suffix. Identity on every other symbol.
    pub fn tidy(&self) -> Symbol {
        match self.0.strip_prefix(KARG_PREFIX) {
            None => self.clone(),
            Some(rest) => {
                let orig = match rest.rsplit_once('#') {
                    Some((orig, idx)) if idx.chars().all(|c| c.is_ascii_digit()) => orig,
                    _ => rest,
                };
                Symbol::new(orig)
            }
        }
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
        Symbol::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_strips_karg_prefix_and_suffix() {
        assert_eq!(Symbol::karg("v", 0).tidy(), Symbol::new("v"));
        assert_eq!(Symbol::karg("x", 12).tidy(), Symbol::new("x"));
    }

    #[test]
    fn tidy_is_identity_on_user_symbols() {
        for name in ["x", "foo_bar", "n#notanum", "karg"] {
            assert_eq!(Symbol::new(name).tidy(), Symbol::new(name));
        }
    }

    #[test]
    fn tidy_without_suffix_strips_only_prefix() {
        assert_eq!(Symbol::new("karg$v").tidy(), Symbol::new("v"));
    }

    #[test]
    fn karg_symbols_are_recognised() {
        assert!(Symbol::karg("v", 3).is_karg());
        assert!(!Symbol::new("v").is_karg());
    }

    #[test]
    fn symbols_with_equal_text_are_equal() {
        assert_eq!(Symbol::new("a"), Symbol::from("a"));
        assert_eq!(Symbol::from(String::from("a")).to_string(), "a");
    }
}
