use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A slot boundary as the backend sends it. Some endpoints serialize
/// `LocalTime` as `"HH:MM:SS"`, others as `{hour, minute, second, nano}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTime {
    Text(String),
    Parts(TimeParts),
    Other(Value),
}

// Only a JSON object may become `Parts`; a derived struct would also accept
// a sequence such as `[9, 30]`.
impl<'de> Deserialize<'de> for RawTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(text) => RawTime::Text(text),
            object @ Value::Object(_) => match TimeParts::deserialize(&object) {
                Ok(parts) => RawTime::Parts(parts),
                Err(_) => RawTime::Other(object),
            },
            other => RawTime::Other(other),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeParts {
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub second: Option<u32>,
    #[serde(default)]
    pub nano: Option<u32>,
}

impl RawTime {
    /// Minute precision; seconds are dropped. Never fails, bad input is None.
    pub fn normalize(&self) -> Option<NaiveTime> {
        match self {
            RawTime::Text(text) => parse_clock(text),
            RawTime::Parts(parts) => NaiveTime::from_hms_opt(parts.hour, parts.minute, 0),
            RawTime::Other(_) => None,
        }
    }
}

pub fn normalize_time(raw: Option<&RawTime>) -> Option<NaiveTime> {
    raw.and_then(RawTime::normalize)
}

/// Canonical "HH:MM" rendering.
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn format_time(time: Option<NaiveTime>) -> Option<String> {
    time.map(format_hhmm)
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let mut fields = text.trim().split(':');
    let hour = digits(fields.next()?)?;
    let minute = digits(fields.next()?)?;
    if let Some(seconds) = fields.next() {
        // "09:30:00" and "09:30:00.000" both occur
        let whole = seconds.split('.').next().unwrap_or_default();
        digits(whole)?;
    }
    if fields.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn digits(field: &str) -> Option<u32> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
