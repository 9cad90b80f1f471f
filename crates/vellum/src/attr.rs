//! Attribute micro-grammar.
//!
//! Component attributes come in three shapes:
//!
//! ```text
//! "0.5"                              scalar
//! "10 20"  /  "10, 20"               positional list
//! "src: image.png; texture: frame1"  record
//! ```
//!
//! Everything here is pure: no state, no allocation beyond the returned values.

/// Split a positional list on runs of spaces and commas.
///
/// Empty items are dropped, so leading or trailing separators are harmless.
pub fn split_list(data: &str) -> Vec<&str> {
    data.split([' ', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse the leading number of a string, ignoring whatever follows it.
///
/// `"12px"` parses as `12.0`, `" .5"` as `0.5`. Returns `None` when the string
/// does not start with a number.
pub fn parse_number(value: &str) -> Option<f32> {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    // Optional exponent, only consumed when well-formed.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Parse every item of a positional list as a number. Items that are not
/// numbers become `NaN` so positions in the list are preserved.
pub fn parse_floats(data: &str) -> Vec<f32> {
    split_list(data)
        .into_iter()
        .map(|item| parse_number(item).unwrap_or(f32::NAN))
        .collect()
}

/// Interpret a boolean-ish attribute. Only the literal `"false"` counts as
/// false; a bare attribute (empty value) is true.
pub fn parse_flag(value: &str) -> bool {
    value.trim() != "false"
}

/// A parsed `key: value; key2: value2` record.
///
/// Keys keep their declaration order. Declaring a key twice keeps the last
/// value in the position of the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    /// Parse a record string.
    ///
    /// Each `;`-separated piece is split on its first `:`; both sides are
    /// trimmed. A piece with no `:` becomes a key with an empty value.
    pub fn parse(data: &str) -> Self {
        let mut record = Self::default();
        for piece in data.split(';') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (key, value) = match piece.split_once(':') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (piece, ""),
            };
            if key.is_empty() {
                continue;
            }
            record.insert(key, value);
        }
        record
    }

    /// Get the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get a non-empty value for a key.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Get a value as a number, if present and numeric.
    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(parse_number)
    }

    /// Get a value as a number, falling back to `default` when absent or not
    /// numeric.
    pub fn f32_or(&self, key: &str, default: f32) -> f32 {
        self.get_f32(key).unwrap_or(default)
    }

    /// Returns `true` if the key was declared (even with an empty value).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Set a value, replacing any existing value for the key.
    pub fn insert(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_splits_on_spaces_and_commas() {
        assert_eq!(split_list("10 20"), vec!["10", "20"]);
        assert_eq!(split_list(" 10,  20 ,30 "), vec!["10", "20", "30"]);
        assert!(split_list("   ").is_empty());
    }

    #[test]
    fn number_prefix() {
        assert_eq!(parse_number("0.5"), Some(0.5));
        assert_eq!(parse_number("12px"), Some(12.0));
        assert_eq!(parse_number(" -.25"), Some(-0.25));
        assert_eq!(parse_number("1e2"), Some(100.0));
        assert_eq!(parse_number("3e"), Some(3.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn floats_keep_positions() {
        let values = parse_floats("1 x 3");
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 3.0);
    }

    #[test]
    fn record_parses_pairs_in_order() {
        let record = Record::parse("src: image.png; texture: frame1");
        assert_eq!(record.get("src"), Some("image.png"));
        assert_eq!(record.get("texture"), Some("frame1"));
        let keys: Vec<_> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["src", "texture"]);
    }

    #[test]
    fn record_value_may_contain_colons() {
        let record = Record::parse("src: http://example.com/a.png");
        assert_eq!(record.get("src"), Some("http://example.com/a.png"));
    }

    #[test]
    fn record_last_declaration_wins() {
        let record = Record::parse("a: 1; b: 2; a: 3;");
        assert_eq!(record.get("a"), Some("3"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn record_bare_key_and_defaults() {
        let record = Record::parse("loop; dur: 250");
        assert!(record.contains("loop"));
        assert_eq!(record.get("loop"), Some(""));
        assert_eq!(record.get_non_empty("loop"), None);
        assert_eq!(record.f32_or("dur", 1000.0), 250.0);
        assert_eq!(record.f32_or("delay", 5.0), 5.0);
    }

    #[test]
    fn flag_only_false_is_false() {
        assert!(!parse_flag("false"));
        assert!(parse_flag("true"));
        assert!(parse_flag(""));
    }
}
