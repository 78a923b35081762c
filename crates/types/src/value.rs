//! The vote value domain and the round phases.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A vote value.
///
/// Only `Zero` and `One` are terminal decided values; `Undecided` is the
/// marker a node reports when neither binary value reached a majority in
/// the report phase.
///
/// On the wire, `Zero`/`One` serialize as the JSON numbers `0`/`1` and
/// `Undecided` as the string `"?"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Zero,
    One,
    Undecided,
}

impl Value {
    /// Dense index for tally arrays: `Zero = 0`, `One = 1`, `Undecided = 2`.
    pub fn index(self) -> usize {
        match self {
            Value::Zero => 0,
            Value::One => 1,
            Value::Undecided => 2,
        }
    }

    /// Whether this is one of the two terminal values.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Value::Undecided)
    }

    /// Map a bit to its value.
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Value::One
        } else {
            Value::Zero
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Zero => f.write_str("0"),
            Value::One => f.write_str("1"),
            Value::Undecided => f.write_str("?"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Zero => serializer.serialize_u64(0),
            Value::One => serializer.serialize_u64(1),
            Value::Undecided => serializer.serialize_str("?"),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl Visitor<'_> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("0, 1, or \"?\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
                match v {
                    0 => Ok(Value::Zero),
                    1 => Ok(Value::One),
                    other => Err(E::invalid_value(de::Unexpected::Unsigned(other), &self)),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
                match v {
                    0 => Ok(Value::Zero),
                    1 => Ok(Value::One),
                    other => Err(E::invalid_value(de::Unexpected::Signed(other), &self)),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
                match v {
                    "?" => Ok(Value::Undecided),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// The two broadcast phases of a round.
///
/// Every round performs a `Report` broadcast (each node reports its current
/// value) followed by a `Propose` broadcast (each node proposes the value
/// it saw a strict majority report, or `Undecided`).
///
/// Wire form: `"R"` / `"P"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "R")]
    Report,
    #[serde(rename = "P")]
    Propose,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Report => f.write_str("R"),
            Phase::Propose => f.write_str("P"),
        }
    }
}
