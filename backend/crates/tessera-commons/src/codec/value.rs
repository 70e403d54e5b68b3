use std::collections::BTreeMap;
use std::fmt;

/// Decimal number kept as validated text.
///
/// Token amounts routinely exceed 64 bits, so numbers are never routed
/// through a binary float or integer on their way to the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(String);

impl Decimal {
    /// Parse decimal text: optional `-`, digits, optional fraction.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (unsigned, None),
        };
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(int_part) || frac_part.is_some_and(|f| !digits(f)) {
            return None;
        }
        Some(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! decimal_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Decimal {
                fn from(value: $t) -> Self {
                    Decimal(value.to_string())
                }
            }

            impl From<$t> for LogicalValue {
                fn from(value: $t) -> Self {
                    LogicalValue::Number(Decimal::from(value))
                }
            }
        )*
    };
}

decimal_from_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

/// A typed field value on a logical record, keyed by long names when nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalValue {
    String(String),
    Number(Decimal),
    Bool(bool),
    List(Vec<LogicalValue>),
    Map(BTreeMap<String, LogicalValue>),
}

impl LogicalValue {
    pub fn kind(&self) -> &'static str {
        match self {
            LogicalValue::String(_) => "string",
            LogicalValue::Number(_) => "number",
            LogicalValue::Bool(_) => "bool",
            LogicalValue::List(_) => "list",
            LogicalValue::Map(_) => "map",
        }
    }
}

impl From<String> for LogicalValue {
    fn from(value: String) -> Self {
        LogicalValue::String(value)
    }
}

impl From<&str> for LogicalValue {
    fn from(value: &str) -> Self {
        LogicalValue::String(value.to_string())
    }
}

impl From<&String> for LogicalValue {
    fn from(value: &String) -> Self {
        LogicalValue::String(value.clone())
    }
}

impl From<Decimal> for LogicalValue {
    fn from(value: Decimal) -> Self {
        LogicalValue::Number(value)
    }
}

impl From<&Decimal> for LogicalValue {
    fn from(value: &Decimal) -> Self {
        LogicalValue::Number(value.clone())
    }
}

impl From<bool> for LogicalValue {
    fn from(value: bool) -> Self {
        LogicalValue::Bool(value)
    }
}

impl From<BTreeMap<String, LogicalValue>> for LogicalValue {
    fn from(value: BTreeMap<String, LogicalValue>) -> Self {
        LogicalValue::Map(value)
    }
}

impl From<Vec<LogicalValue>> for LogicalValue {
    fn from(value: Vec<LogicalValue>) -> Self {
        LogicalValue::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse() {
        assert!(Decimal::parse("1000000000000000000000000").is_some());
        assert!(Decimal::parse("-12.50").is_some());
        assert!(Decimal::parse("").is_none());
        assert!(Decimal::parse("1e10").is_none());
        assert!(Decimal::parse("1.").is_none());
        assert!(Decimal::parse(".5").is_none());
    }

    #[test]
    fn test_large_amount_keeps_precision() {
        let wei = Decimal::from(u128::MAX);
        assert_eq!(wei.as_str(), "340282366920938463463374607431768211455");
        assert_eq!(wei.to_u128(), Some(u128::MAX));
        assert_eq!(wei.to_u64(), None);
    }
}
