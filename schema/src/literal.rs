use serde::Serialize;

use std::cmp::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Largest magnitude, in seconds, a `google.protobuf.Duration` can hold (about 10,000 years).
pub const DURATION_SECONDS_MAX: i64 = 315_576_000_000;

/// A constant attached to a rule or an option.
///
/// Literals are what end up on the right-hand side of an option assignment in
/// the rendered file. Aggregates (durations, timestamps, CEL constraints) use
/// [Message](#variant.Message) with their fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Ident(String),
    List(Vec<Literal>),
    Message(Vec<(String, Literal)>),
}

impl Literal {
    /// A `google.protobuf.Duration` shaped aggregate. Seconds beyond `i64`
    /// saturate; [in_duration_range](#method.in_duration_range) reports them.
    pub fn duration(value: Duration) -> Literal {
        let seconds = i64::try_from(value.as_secs()).unwrap_or(i64::MAX);
        Literal::Message(vec![
            ("seconds".to_string(), Literal::Int(seconds)),
            ("nanos".to_string(), Literal::Int(value.subsec_nanos() as i64)),
        ])
    }

    /// A `google.protobuf.Timestamp` shaped aggregate.
    pub fn timestamp(seconds: i64, nanos: i32) -> Literal {
        Literal::Message(vec![
            ("seconds".to_string(), Literal::Int(seconds)),
            ("nanos".to_string(), Literal::Int(nanos as i64)),
        ])
    }

    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other literal kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Literal::Bool(value) => value,
            _ => false,
        }
    }

    /// A convenience method to extract the text out of a [String](#variant.String)
    /// or an [Ident](#variant.Ident). Returns `""` for other literal kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Literal::String(ref value) | Literal::Ident(ref value) => value.as_str(),
            _ => "",
        }
    }

    /// A convenience method to get the items out of a [List](#variant.List).
    /// Returns an empty slice for other literal kinds.
    pub fn as_list(&self) -> &[Literal] {
        match *self {
            Literal::List(ref items) => items.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to extract a field out of a [Message](#variant.Message).
    pub fn get(&self, name: &str) -> Option<&Literal> {
        match *self {
            Literal::Message(ref fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// `false` for a `{seconds, nanos}` aggregate whose seconds a
    /// `google.protobuf.Duration` cannot hold. Other literals pass.
    pub fn in_duration_range(&self) -> bool {
        match self.get("seconds").and_then(Literal::to_i128) {
            Some(seconds) => seconds.abs() <= DURATION_SECONDS_MAX as i128,
            None => true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Int(_) | Literal::UInt(_) | Literal::Float(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Literal::Float(_))
    }

    /// Orders two literals when they are comparable.
    ///
    /// Numbers compare across signedness and width, floats by IEEE order,
    /// strings and bytes lexicographically, and `{seconds, nanos}` aggregates
    /// chronologically. Everything else is incomparable.
    pub fn compare(&self, other: &Literal) -> Option<Ordering> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Some(a.cmp(b)),
            (Literal::UInt(a), Literal::UInt(b)) => Some(a.cmp(b)),
            (Literal::Int(a), Literal::UInt(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Literal::UInt(a), Literal::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Literal::Float(a), b) if b.is_numeric() => a.partial_cmp(&b.to_f64()?),
            (a, Literal::Float(b)) if a.is_numeric() => a.to_f64()?.partial_cmp(b),
            (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
            (Literal::Bytes(a), Literal::Bytes(b)) => Some(a.cmp(b)),
            (Literal::Message(_), Literal::Message(_)) => {
                let a = (self.get("seconds")?.to_i128()?, self.get("nanos")?.to_i128()?);
                let b = (other.get("seconds")?.to_i128()?, other.get("nanos")?.to_i128()?);
                Some(a.cmp(&b))
            }
            _ => None,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match *self {
            Literal::Int(value) => Some(value as f64),
            Literal::UInt(value) => Some(value as f64),
            Literal::Float(value) => Some(value),
            _ => None,
        }
    }

    fn to_i128(&self) -> Option<i128> {
        match *self {
            Literal::Int(value) => Some(value as i128),
            Literal::UInt(value) => Some(value as i128),
            _ => None,
        }
    }
}

macro_rules! literal_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Literal {
                fn from(value: $ty) -> Self {
                    Literal::$variant(value as $target)
                }
            }
        )*
    };
}

literal_from! {
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<Vec<u8>> for Literal {
    fn from(value: Vec<u8>) -> Self {
        Literal::Bytes(value)
    }
}

impl From<&[u8]> for Literal {
    fn from(value: &[u8]) -> Self {
        Literal::Bytes(value.to_vec())
    }
}

impl From<Duration> for Literal {
    fn from(value: Duration) -> Self {
        Literal::duration(value)
    }
}

impl From<SystemTime> for Literal {
    fn from(value: SystemTime) -> Self {
        match value.duration_since(UNIX_EPOCH) {
            Ok(after) => Literal::timestamp(
                i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
                after.subsec_nanos() as i32,
            ),
            Err(before) => {
                let before = before.duration();
                let mut seconds = -i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                let mut nanos = before.subsec_nanos() as i32;
                if nanos > 0 {
                    seconds -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                Literal::timestamp(seconds, nanos)
            }
        }
    }
}
