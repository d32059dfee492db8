//! Zermelo API types and data structures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw appointment as returned by `api/v2/appointments`.
///
/// Fields this client does not interpret are kept in `extra` and written
/// back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Start time, epoch seconds
    pub start: i64,
    /// End time, epoch seconds
    pub end: i64,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub teachers: Vec<String>,
    /// Serialized as `0`/`1`; the API has sent both numbers and booleans.
    #[serde(default, with = "flag")]
    pub cancelled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Appointment {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            subjects: Vec::new(),
            teachers: Vec::new(),
            cancelled: false,
            extra: Map::new(),
        }
    }
}

/// An appointment annotated for display. See [`crate::grid::GridProcessor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    /// `dd/mm/yyyy H:mm` in the display time zone
    pub start_date: String,
    pub end_date: String,
    /// 1-based lesson period
    pub hour: u32,
}

impl GridEntry {
    /// Look up a field by its wire name, including passthrough fields.
    pub fn field(&self, name: &str) -> Option<Value> {
        let a = &self.appointment;
        match name {
            "start" => Some(Value::from(a.start)),
            "end" => Some(Value::from(a.end)),
            "subjects" => Some(Value::from(a.subjects.clone())),
            "teachers" => Some(Value::from(a.teachers.clone())),
            "cancelled" => Some(Value::Bool(a.cancelled)),
            "start_date" => Some(Value::from(self.start_date.clone())),
            "end_date" => Some(Value::from(self.end_date.clone())),
            "hour" => Some(Value::from(self.hour)),
            other => a.extra.get(other).cloned(),
        }
    }

    pub fn into_appointment(self) -> Appointment {
        self.appointment
    }
}

/// An announcement as returned by `api/v2/announcements`. Passed through as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a successful `api/v2/oauth/token` exchange (not enveloped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `0`/`1` flags that may also arrive as booleans or numeric strings.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
            Value::String(s) => match s.trim() {
                "" | "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                other => Err(D::Error::custom(format!("invalid flag value: {}", other))),
            },
            other => Err(D::Error::custom(format!("invalid flag value: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_deserialization() {
        let json = r#"{
            "id": 42,
            "start": 1700000000,
            "end": 1700003000,
            "subjects": ["ne", "en"],
            "teachers": ["abc"],
            "locations": ["101"],
            "cancelled": true
        }"#;
        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(appointment.start, 1700000000);
        assert_eq!(appointment.subjects, vec!["ne", "en"]);
        assert!(appointment.cancelled);
        assert_eq!(appointment.extra["id"], 42);
        assert_eq!(appointment.extra["locations"][0], "101");
    }

    #[test]
    fn test_cancelled_accepts_numbers_and_strings() {
        for (raw, expected) in [("1", true), ("0", false), ("\"1\"", true), ("null", false)] {
            let json = format!(r#"{{"start": 1, "end": 2, "cancelled": {}}}"#, raw);
            let appointment: Appointment = serde_json::from_str(&json).unwrap();
            assert_eq!(appointment.cancelled, expected, "input {}", raw);
        }
    }

    #[test]
    fn test_missing_optional_fields() {
        let appointment: Appointment = serde_json::from_str(r#"{"start": 1, "end": 2}"#).unwrap();
        assert!(appointment.subjects.is_empty());
        assert!(!appointment.cancelled);
    }

    #[test]
    fn test_grid_entry_serializes_flat() {
        let mut appointment = Appointment::new(100, 200);
        appointment.cancelled = true;
        appointment
            .extra
            .insert("locations".to_string(), serde_json::json!(["101"]));

        let entry = GridEntry {
            appointment,
            start_date: "01/01/2024 8:30".to_string(),
            end_date: "01/01/2024 9:20".to_string(),
            hour: 1,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["start"], 100);
        assert_eq!(value["cancelled"], 1);
        assert_eq!(value["locations"][0], "101");
        assert_eq!(value["hour"], 1);
        assert_eq!(value["start_date"], "01/01/2024 8:30");
    }

    #[test]
    fn test_grid_entry_field_lookup() {
        let mut appointment = Appointment::new(100, 200);
        appointment.teachers = vec!["abc".to_string()];
        appointment
            .extra
            .insert("groups".to_string(), serde_json::json!(["4a"]));
        let entry = GridEntry {
            appointment,
            start_date: String::new(),
            end_date: String::new(),
            hour: 3,
        };

        assert_eq!(entry.field("teachers"), Some(serde_json::json!(["abc"])));
        assert_eq!(entry.field("groups"), Some(serde_json::json!(["4a"])));
        assert_eq!(entry.field("hour"), Some(serde_json::json!(3)));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_token_response() {
        let json = r#"{"access_token": "abc", "token_type": "bearer", "expires_in": 57600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, Some(57600));
    }
}
