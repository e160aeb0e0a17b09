//! Runtime values for the interpreter
//!
//! A value is a number, a string or a tuple. Conversions never mutate a
//! value in place: each one produces a new value or reports that the
//! conversion is not possible.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Separator between tuple items in an index key
pub const TUPLE_INDEX_DELIM: char = '\u{1F}';
/// Opens a nested tuple in an index key
pub const TUPLE_INDEX_START: char = '\u{02}';
/// Closes a nested tuple in an index key
pub const TUPLE_INDEX_END: char = '\u{03}';

/// Runtime value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    /// Signed integer
    Number(i64),
    /// Owned text
    String(String),
    /// Ordered list of values (multi-value returns, array literals)
    Tuple(Vec<Value>),
}

/// Base type of a value, also used to pick a variable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    Number,
    String,
    Tuple,
}

impl ValueType {
    /// Type selected by a variable or function name prefix (`$` or `%`)
    pub fn from_sigil(name: &str) -> Self {
        match name.chars().next() {
            Some('$') => ValueType::String,
            Some('%') => ValueType::Tuple,
            _ => ValueType::Number,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Tuple => "tuple",
        }
    }
}

/// Parse a decimal integer the way scripts expect it
///
/// Leading and trailing spaces are ignored, a single sign is allowed and
/// an empty string is zero. Anything else is rejected, including digits
/// that do not fit an `i64`.
pub fn parse_number(text: &str) -> Option<i64> {
    let trimmed = text.trim_matches(|c| c == ' ' || c == '\t');
    if trimmed.is_empty() {
        return Some(0);
    }
    let (negative, digits) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // accumulated negated so that i64::MIN fits
    let mut num: i64 = 0;
    for b in digits.bytes() {
        num = num.checked_mul(10)?.checked_sub(i64::from(b - b'0'))?;
    }
    if negative { Some(num) } else { num.checked_neg() }
}

impl Value {
    /// Empty value of the given type
    pub fn default_of(ty: ValueType) -> Self {
        match ty {
            ValueType::Number => Value::Number(0),
            ValueType::String => Value::String(String::new()),
            ValueType::Tuple => Value::Tuple(Vec::new()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Tuple(_) => ValueType::Tuple,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    /// Numeric interpretation, if there is an unambiguous one
    pub fn to_number(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_number(s),
            Value::Tuple(items) => match items.as_slice() {
                [] => Some(0),
                [single] => single.to_number(),
                _ => None,
            },
        }
    }

    /// True when the value converts to a number
    pub fn is_numeric(&self) -> bool {
        self.to_number().is_some()
    }

    /// Truth value of a number-convertible value
    pub fn as_bool(&self) -> Option<bool> {
        self.to_number().map(|n| n != 0)
    }

    /// String form: plain decimal for numbers, display form for tuples
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Tuple items; scalars become a single-item tuple
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Value::Tuple(items) => items,
            scalar => vec![scalar],
        }
    }

    /// Convert to the requested type, `None` when impossible
    pub fn convert(self, ty: ValueType) -> Option<Value> {
        match ty {
            ValueType::Number => self.to_number().map(Value::Number),
            ValueType::String => Some(Value::String(self.into_text())),
            ValueType::Tuple => Some(Value::Tuple(self.into_items())),
        }
    }

    /// Key used by the associative index of a variable
    ///
    /// Strings are upper-cased, tuples are flattened with control
    /// separators so that distinct tuples never share a key.
    pub fn index_key(&self) -> String {
        let mut key = String::new();
        self.append_index_key(&mut key);
        key.to_uppercase()
    }

    fn append_index_key(&self, out: &mut String) {
        match self {
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::String(s) => out.push_str(s),
            Value::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(TUPLE_INDEX_DELIM);
                    }
                    if let Value::Tuple(_) = item {
                        out.push(TUPLE_INDEX_START);
                        item.append_index_key(out);
                        out.push(TUPLE_INDEX_END);
                    } else {
                        item.append_index_key(out);
                    }
                }
            }
        }
    }

    /// Compare two values with automatic conversion
    ///
    /// Mixed number/string pairs compare numerically when the string is
    /// numeric and as text otherwise. Tuples compare item by item; when
    /// all shared items are equal the shorter tuple is the smaller one.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let delta = x.compare(y);
                    if delta != Ordering::Equal {
                        return delta;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Number(n), Value::String(s)) => match parse_number(s) {
                Some(m) => n.cmp(&m),
                None => n.to_string().as_str().cmp(s.as_str()),
            },
            (Value::String(_), Value::Number(_)) => other.compare(self).reverse(),
            (Value::Tuple(_), Value::Number(n)) => match self.to_number() {
                Some(m) => m.cmp(n),
                None => self.to_string().cmp(&n.to_string()),
            },
            (Value::Number(_), Value::Tuple(_)) => other.compare(self).reverse(),
            (Value::Tuple(_), Value::String(s)) => self.to_string().as_str().cmp(s.as_str()),
            (Value::String(_), Value::Tuple(_)) => other.compare(self).reverse(),
        }
    }

    /// `true` or `false` as the scripting language spells them
    pub fn from_bool(flag: bool) -> Self {
        Value::Number(i64::from(flag))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match item {
                        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''"))?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Number(42)), "42");
        assert_eq!(format!("{}", Value::from("it's")), "it's");
        let tuple = Value::Tuple(vec![
            Value::Number(1),
            Value::from("it's"),
            Value::Tuple(vec![Value::Number(-2)]),
        ]);
        assert_eq!(format!("{tuple}"), "(1,'it''s',(-2))");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("  42 "), Some(42));
        assert_eq!(parse_number("-7"), Some(-7));
        assert_eq!(parse_number("+3"), Some(3));
        assert_eq!(parse_number(""), Some(0));
        assert_eq!(parse_number("   "), Some(0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("12a"), None);
        assert_eq!(parse_number("1 2"), None);
        assert_eq!(parse_number("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_number("9223372036854775807"), Some(i64::MAX));
    }

    #[test]
    fn test_overflowing_digits_stay_text() {
        assert_eq!(parse_number("9223372036854775808"), None);
        assert_eq!(parse_number("99999999999999999999"), None);
        let big = Value::from("99999999999999999999");
        assert!(!big.is_numeric());
        assert_eq!(big.to_number(), None);
        assert_eq!(big.to_text(), "99999999999999999999");
    }

    #[test]
    fn test_number_string_round_trip() {
        for n in [0i64, 1, -1, 42, -9000, i64::MAX, i64::MIN + 1] {
            let text = Value::Number(n).into_text();
            assert_eq!(Value::String(text).to_number(), Some(n));
        }
        assert_eq!(Value::from("-0").to_number().map(|n| n.to_string()), Some("0".to_string()));
        assert_eq!(Value::from("+0").to_number().map(|n| n.to_string()), Some("0".to_string()));
    }

    #[test]
    fn test_tuple_to_number() {
        assert_eq!(Value::Tuple(vec![]).to_number(), Some(0));
        assert_eq!(Value::Tuple(vec![Value::from("5")]).to_number(), Some(5));
        assert_eq!(Value::Tuple(vec![Value::Number(1), Value::Number(2)]).to_number(), None);
    }

    #[test]
    fn test_convert() {
        assert_eq!(Value::from("12").convert(ValueType::Number), Some(Value::Number(12)));
        assert_eq!(Value::from("x").convert(ValueType::Number), None);
        assert_eq!(
            Value::Number(3).convert(ValueType::Tuple),
            Some(Value::Tuple(vec![Value::Number(3)]))
        );
        assert_eq!(Value::Number(3).convert(ValueType::String), Some(Value::from("3")));
    }

    #[test]
    fn test_compare_mixed() {
        assert_eq!(Value::Number(10).compare(&Value::from("9")), Ordering::Greater);
        // non-numeric text compares as strings
        assert_eq!(Value::Number(10).compare(&Value::from("9a")), Ordering::Less);
        assert_eq!(Value::from("abc").compare(&Value::from("abd")), Ordering::Less);
        let short = Value::Tuple(vec![Value::Number(1)]);
        let long = Value::Tuple(vec![Value::Number(1), Value::Number(0)]);
        assert_eq!(short.compare(&long), Ordering::Less);
        assert_eq!(Value::Tuple(vec![Value::Number(4)]).compare(&Value::Number(4)), Ordering::Equal);
    }

    #[test]
    fn test_index_key() {
        assert_eq!(Value::from("Key").index_key(), "KEY");
        let tuple = Value::Tuple(vec![Value::Number(1), Value::Tuple(vec![Value::from("a")])]);
        assert_eq!(tuple.index_key(), "1\u{1F}\u{02}A\u{03}");
    }

    #[test]
    fn test_sigil() {
        assert_eq!(ValueType::from_sigil("$name"), ValueType::String);
        assert_eq!(ValueType::from_sigil("%name"), ValueType::Tuple);
        assert_eq!(ValueType::from_sigil("name"), ValueType::Number);
    }
}
