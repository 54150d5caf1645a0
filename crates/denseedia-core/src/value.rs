//! # Value Typing
//!
//! Classification of element values into a closed set of kinds, and the
//! conversion between a typed [`Value`] and its JSON payload.
//!
//! - `classify` maps untyped JSON to a [`ValueKind`] with a fixed, ordered
//!   sequence of tests (bool before numbers, integers before floats)
//! - `Value::to_payload` / `Value::from_payload` are the serialize /
//!   deserialize pair; `from_payload(v.kind(), &v.to_payload()?) == v`
//! - Kind codes and tags are frozen: historical versions depend on them

use crate::types::{DenseError, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// VALUE KIND
// =============================================================================

/// Classification tag of a stored value.
///
/// Declaration order is the persisted encoding (postcard variant index)
/// and matches [`ValueKind::code`]. Never reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "str")]
    String,
    #[serde(rename = "datetime")]
    DateTime,
}

impl ValueKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::String,
        Self::DateTime,
    ];

    /// Stable integer code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bool => 1,
            Self::Int => 2,
            Self::Float => 3,
            Self::String => 4,
            Self::DateTime => 5,
        }
    }

    /// Inverse of [`ValueKind::code`].
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Stable string tag used on the wire.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "str",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag().to_ascii_uppercase())
    }
}

impl FromStr for ValueKind {
    type Err = DenseError;

    /// Case-insensitive; accepts the tags plus `string` for `str`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "string" => Ok(Self::String),
            other => Self::ALL
                .into_iter()
                .find(|k| k.tag() == other)
                .ok_or_else(|| DenseError::InvalidInput(format!("unknown value type '{}'", s))),
        }
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A typed element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(Timestamp),
}

impl Value {
    /// The classification tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::DateTime(_) => ValueKind::DateTime,
        }
    }

    /// Canonical JSON representation.
    ///
    /// Date-times become ISO-8601 strings with second precision; NaN and
    /// infinities have no JSON form and are rejected.
    pub fn to_payload(&self) -> Result<serde_json::Value, DenseError> {
        Ok(match self {
            Self::None => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number(Number::from(*i)),
            Self::Float(f) => serde_json::Value::Number(
                Number::from_f64(*f)
                    .ok_or_else(|| DenseError::UnsupportedType(format!("non-finite float {}", f)))?,
            ),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::DateTime(ts) => serde_json::Value::String(ts.to_string()),
        })
    }

    /// Rebuild a value of the declared `kind` from its JSON payload.
    ///
    /// `Float` also accepts integral numbers; `DateTime` requires an
    /// ISO-8601 string. Any other mismatch is rejected.
    pub fn from_payload(kind: ValueKind, payload: &serde_json::Value) -> Result<Self, DenseError> {
        use serde_json::Value as Json;

        let value = match (kind, payload) {
            (ValueKind::None, Json::Null) => Some(Self::None),
            (ValueKind::Bool, Json::Bool(b)) => Some(Self::Bool(*b)),
            (ValueKind::Int, Json::Number(n)) => n.as_i64().map(Self::Int),
            (ValueKind::Float, Json::Number(n)) => n.as_f64().map(Self::Float),
            (ValueKind::String, Json::String(s)) => Some(Self::String(s.clone())),
            (ValueKind::DateTime, Json::String(s)) => s.parse().ok().map(Self::DateTime),
            _ => None,
        };

        value.ok_or_else(|| {
            DenseError::InvalidInput(format!(
                "type '{}' and value {} are not compatible",
                kind.tag(),
                payload
            ))
        })
    }

    /// Infer the kind of untyped JSON input and build the value.
    pub fn from_untyped(payload: &serde_json::Value) -> Result<Self, DenseError> {
        let kind = classify(payload)?;
        Self::from_payload(kind, payload)
    }

    /// Convert command-line text into a value of the requested kind.
    ///
    /// Booleans are true for `1` and `true` (any case), false otherwise;
    /// `None` ignores the text.
    pub fn parse_as(kind: ValueKind, text: &str) -> Result<Self, DenseError> {
        let invalid = |e: &dyn fmt::Display| {
            DenseError::InvalidInput(format!("cannot read '{}' as {}: {}", text, kind.tag(), e))
        };
        match kind {
            ValueKind::None => Ok(Self::None),
            ValueKind::Bool => Ok(Self::Bool(matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "1" | "true"
            ))),
            ValueKind::Int => text.trim().parse().map(Self::Int).map_err(|e| invalid(&e)),
            ValueKind::Float => {
                let f: f64 = text.trim().parse().map_err(|e| invalid(&e))?;
                if f.is_finite() {
                    Ok(Self::Float(f))
                } else {
                    Err(DenseError::UnsupportedType(format!("non-finite float {}", f)))
                }
            }
            ValueKind::String => Ok(Self::String(text.to_string())),
            ValueKind::DateTime => text.parse().map(Self::DateTime),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::DateTime(ts) => write!(f, "{}", ts),
        }
    }
}

/// Serializes as the canonical payload, without the kind tag.
impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_payload()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify untyped JSON input.
///
/// Order matters: null, bool, integer, float, string. Strings are never
/// guessed as dates. Arrays, objects and integers beyond `i64` are rejected.
pub fn classify(value: &serde_json::Value) -> Result<ValueKind, DenseError> {
    use serde_json::Value as Json;

    match value {
        Json::Null => Ok(ValueKind::None),
        Json::Bool(_) => Ok(ValueKind::Bool),
        Json::Number(n) if n.is_i64() => Ok(ValueKind::Int),
        Json::Number(n) if n.is_f64() => Ok(ValueKind::Float),
        Json::String(_) => Ok(ValueKind::String),
        other => Err(DenseError::UnsupportedType(describe(other))),
    }
}

fn describe(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(_) => "array".to_string(),
        serde_json::Value::Object(_) => "object".to_string(),
        other => format!("integer out of range ({})", other),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_checks_bool_before_numbers() {
        assert_eq!(classify(&json!(true)).expect("bool"), ValueKind::Bool);
        assert_eq!(classify(&json!(1)).expect("int"), ValueKind::Int);
        assert_eq!(classify(&json!(-3)).expect("int"), ValueKind::Int);
        assert_eq!(classify(&json!(4.5)).expect("float"), ValueKind::Float);
        assert_eq!(classify(&json!(null)).expect("null"), ValueKind::None);
        assert_eq!(classify(&json!("x")).expect("str"), ValueKind::String);
    }

    #[test]
    fn classify_never_guesses_dates() {
        assert_eq!(
            classify(&json!("2020-01-01T00:00:00")).expect("str"),
            ValueKind::String
        );
    }

    #[test]
    fn classify_rejects_containers_and_huge_integers() {
        assert!(matches!(
            classify(&json!([1, 2])),
            Err(DenseError::UnsupportedType(_))
        ));
        assert!(matches!(
            classify(&json!({"a": 1})),
            Err(DenseError::UnsupportedType(_))
        ));
        assert!(matches!(
            classify(&json!(u64::MAX)),
            Err(DenseError::UnsupportedType(_))
        ));
    }

    #[test]
    fn round_trip_every_kind() {
        let samples = vec![
            Value::None,
            Value::Bool(false),
            Value::Int(-42),
            Value::Float(4.5),
            Value::String("Dune".to_string()),
            Value::DateTime("2021-06-01T12:30:00".parse().expect("ts")),
        ];
        for value in samples {
            let payload = value.to_payload().expect("serialize");
            let back = Value::from_payload(value.kind(), &payload).expect("deserialize");
            assert_eq!(back, value);
        }
    }

    #[test]
    fn datetime_payload_is_iso_string() {
        let v = Value::DateTime("2021-06-01T12:30:00.999".parse().expect("ts"));
        assert_eq!(v.to_payload().expect("payload"), json!("2021-06-01T12:30:00"));
    }

    #[test]
    fn float_accepts_integral_payload() {
        let v = Value::from_payload(ValueKind::Float, &json!(3)).expect("float");
        assert_eq!(v, Value::Float(3.0));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        for (kind, payload) in [
            (ValueKind::Int, json!("5")),
            (ValueKind::Int, json!(5.5)),
            (ValueKind::Bool, json!(1)),
            (ValueKind::None, json!("")),
            (ValueKind::DateTime, json!("not a date")),
            (ValueKind::String, json!(null)),
        ] {
            assert!(
                matches!(
                    Value::from_payload(kind, &payload),
                    Err(DenseError::InvalidInput(_))
                ),
                "{} / {} should be rejected",
                kind,
                payload
            );
        }
    }

    #[test]
    fn non_finite_float_has_no_payload() {
        assert!(matches!(
            Value::Float(f64::NAN).to_payload(),
            Err(DenseError::UnsupportedType(_))
        ));
    }

    #[test]
    fn kind_codes_are_frozen() {
        let codes: Vec<u8> = ValueKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5]);
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_code(kind.code()), Some(kind));
            assert_eq!(kind.tag().parse::<ValueKind>().expect("tag"), kind);
        }
        assert_eq!(ValueKind::from_code(6), None);
    }

    #[test]
    fn kind_postcard_encoding_matches_code() {
        for kind in ValueKind::ALL {
            let bytes = postcard::to_allocvec(&kind).expect("encode");
            assert_eq!(bytes, vec![kind.code()]);
        }
    }

    #[test]
    fn kind_serde_uses_tags() {
        assert_eq!(
            serde_json::to_string(&ValueKind::String).expect("json"),
            "\"str\""
        );
        assert_eq!(
            serde_json::from_str::<ValueKind>("\"datetime\"").expect("json"),
            ValueKind::DateTime
        );
    }

    #[test]
    fn parse_as_follows_cli_rules() {
        assert_eq!(
            Value::parse_as(ValueKind::Bool, "TRUE").expect("bool"),
            Value::Bool(true)
        );
        assert_eq!(
            Value::parse_as(ValueKind::Bool, "yes").expect("bool"),
            Value::Bool(false)
        );
        assert_eq!(
            Value::parse_as(ValueKind::Int, " 12 ").expect("int"),
            Value::Int(12)
        );
        assert_eq!(
            Value::parse_as(ValueKind::None, "whatever").expect("none"),
            Value::None
        );
        assert!(Value::parse_as(ValueKind::Int, "4.5").is_err());
        assert!(Value::parse_as(ValueKind::Float, "inf").is_err());
    }

    #[test]
    fn display_kind_is_uppercase_tag() {
        assert_eq!(ValueKind::Int.to_string(), "INT");
        assert_eq!(ValueKind::String.to_string(), "STR");
    }
}
