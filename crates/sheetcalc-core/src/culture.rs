//! Culture used for text comparison and text-to-number conversion

use std::cmp::Ordering;

/// Comparison and conversion rules of a locale.
///
/// Text comparison is case-insensitive, as spreadsheet comparison operators
/// are. The decimal and group separators drive conversion of text to numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Culture {
    /// Culture name (e.g. "en-US")
    pub name: String,
    /// Decimal separator used when reading numbers from text
    pub decimal_separator: char,
    /// Group (thousands) separator, ignored when reading numbers from text
    pub group_separator: char,
}

impl Culture {
    /// The invariant culture (`.` decimals, `,` groups)
    pub fn invariant() -> Self {
        Self {
            name: String::new(),
            decimal_separator: '.',
            group_separator: ',',
        }
    }

    /// Create a culture with custom separators
    pub fn new<S: Into<String>>(name: S, decimal_separator: char, group_separator: char) -> Self {
        Self {
            name: name.into(),
            decimal_separator,
            group_separator,
        }
    }

    /// Compare two strings the way spreadsheet comparison operators do
    pub fn compare_text(&self, left: &str, right: &str) -> Ordering {
        let left = left.chars().flat_map(char::to_lowercase);
        let right = right.chars().flat_map(char::to_lowercase);
        left.cmp(right)
    }

    /// Check two strings for equality ignoring case
    pub fn text_equals(&self, left: &str, right: &str) -> bool {
        self.compare_text(left, right) == Ordering::Equal
    }

    /// Parse text as a number using this culture's separators.
    ///
    /// Leading/trailing whitespace is ignored and a trailing `%` divides by 100.
    /// Returns `None` for anything that is not a plain number.
    pub fn parse_number(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (body, scale) = match text.strip_suffix('%') {
            Some(body) => (body.trim_end(), 0.01),
            None => (text, 1.0),
        };

        let normalized: String = body
            .chars()
            .filter(|&c| c != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();

        normalized
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| n * scale)
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}
