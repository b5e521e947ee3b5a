//! Name and symbol validation for group registration.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::NameRules;

/// Regex for valid names: letters, digits, spaces and a few punctuation marks.
static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.\-'&+#()]*$").unwrap_or_else(|_| unreachable!())
});

/// Regex for valid symbols: letters, digits, hyphens and underscores.
static SYMBOL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|_| unreachable!()));

/// The naming service consulted when a group registers.
pub trait NameValidator: Send + Sync {
    /// Accept or reject a proposed name.
    fn validate_name(&self, name: &str) -> Result<(), String>;

    /// Accept or reject a proposed symbol.
    fn validate_symbol(&self, symbol: &str) -> Result<(), String>;
}

/// Length and character-set checks driven by [`NameRules`].
#[derive(Debug, Clone, Default)]
pub struct BasicNameValidator {
    rules: NameRules,
}

impl BasicNameValidator {
    /// Create a validator with the given limits.
    #[must_use]
    pub const fn new(rules: NameRules) -> Self {
        Self { rules }
    }
}

fn check(value: &str, max: usize, regex: &Regex, allowed: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    let len = value.chars().count();
    if len > max {
        return Err(format!("length {len} exceeds maximum {max}"));
    }
    if !regex.is_match(value) {
        return Err(format!("must contain only {allowed}"));
    }
    Ok(())
}

impl NameValidator for BasicNameValidator {
    fn validate_name(&self, name: &str) -> Result<(), String> {
        check(
            name,
            self.rules.max_name_length,
            &NAME_REGEX,
            "letters, digits, spaces and _.-'&+#()",
        )
    }

    fn validate_symbol(&self, symbol: &str) -> Result<(), String> {
        check(
            symbol,
            self.rules.max_symbol_length,
            &SYMBOL_REGEX,
            "letters, digits, hyphens and underscores",
        )
    }
}
