use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// Opaque identifier of a telephony call.
///
/// The server may use strings or any JSON number (including fractions and
/// integers past `i64::MAX`); the original JSON form is preserved so a
/// `subscribe` echoes back exactly what the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallId {
    Number(Number),
    Text(String),
}

impl CallId {
    /// Name of the narrowcast event channel for this call (`call_<id>`).
    pub fn channel(&self) -> String {
        format!("call_{self}")
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallId::Number(n) => write!(f, "{n}"),
            CallId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        CallId::Text(value.to_string())
    }
}

impl From<String> for CallId {
    fn from(value: String) -> Self {
        CallId::Text(value)
    }
}

impl From<i64> for CallId {
    fn from(value: i64) -> Self {
        CallId::Number(value.into())
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        CallId::Number(value.into())
    }
}

impl From<u32> for CallId {
    fn from(value: u32) -> Self {
        CallId::Number(value.into())
    }
}

impl From<Number> for CallId {
    fn from(value: Number) -> Self {
        CallId::Number(value)
    }
}

/// Handle identifying one callback registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_id_channel_name() {
        assert_eq!(CallId::from("c1").channel(), "call_c1");
        assert_eq!(CallId::from(42_i64).channel(), "call_42");
    }

    #[test]
    fn call_id_deserializes_string_and_number() {
        let text: CallId = serde_json::from_str(r#""abc-123""#).unwrap();
        assert_eq!(text, CallId::Text("abc-123".into()));

        let number: CallId = serde_json::from_str("9001").unwrap();
        assert_eq!(number, CallId::from(9001_i64));
    }

    #[test]
    fn call_id_accepts_any_json_number() {
        let fractional: CallId = serde_json::from_str("1.5").unwrap();
        assert_eq!(fractional.channel(), "call_1.5");
        assert_eq!(serde_json::to_string(&fractional).unwrap(), "1.5");

        let huge: CallId = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(huge, CallId::from(u64::MAX));
        assert_eq!(huge.channel(), "call_18446744073709551615");
    }

    #[test]
    fn call_id_keeps_json_form() {
        assert_eq!(serde_json::to_string(&CallId::from(7_u32)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&CallId::from("7")).unwrap(), r#""7""#);
    }

    #[test]
    fn call_id_rejects_objects() {
        let result: Result<CallId, _> = serde_json::from_str(r#"{"id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(3);
        assert_eq!(id.to_string(), "sub-3");
        assert_eq!(id.get(), 3);
    }

    #[test]
    fn subscription_ids_order_by_value() {
        assert!(SubscriptionId::new(1) < SubscriptionId::new(2));
    }
}
