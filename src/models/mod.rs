pub mod appointment;
pub mod blog;
pub mod consultant;
pub mod schedule;
pub mod slot;
pub mod time;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const NOT_UPDATED: &str = "Not updated";

// Backend records are loosely typed. A field that does not fit its expected
// shape becomes None instead of failing the whole record.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Identifiers arrive as JSON numbers or numeric strings depending on the
/// endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl RawId {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawId::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            RawId::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    /// String form used when comparing ids from different endpoints.
    pub fn normalized(&self) -> Option<String> {
        match self.as_i64() {
            Some(id) => Some(id.to_string()),
            None => match self {
                RawId::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            },
        }
    }
}

/// String form of an id typed by a user, comparable with [`RawId::normalized`].
pub fn normalize_id(text: &str) -> String {
    match text.trim().parse::<i64>() {
        Ok(id) => id.to_string(),
        Err(_) => text.trim().to_string(),
    }
}

pub(crate) fn id_of(raw: &Option<RawId>) -> Option<i64> {
    raw.as_ref().and_then(RawId::as_i64)
}

pub(crate) fn text_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Splits a comma separated backend field, dropping blank items.
pub fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "lenient")]
        count: Option<u32>,
        #[serde(default, deserialize_with = "lenient")]
        id: Option<RawId>,
    }

    #[test]
    fn lenient_field_degrades_to_none() {
        let record: Record = serde_json::from_value(json!({"count": "many", "id": true})).unwrap();
        assert_eq!(record.count, None);
        assert_eq!(record.id, None);

        let record: Record = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.count, None);
    }

    #[test]
    fn raw_id_normalizes_numbers_and_strings() {
        let number: RawId = serde_json::from_value(json!(5)).unwrap();
        let text: RawId = serde_json::from_value(json!(" 5 ")).unwrap();
        let float: RawId = serde_json::from_value(json!(5.0)).unwrap();
        assert_eq!(number.normalized(), Some("5".to_string()));
        assert_eq!(text.normalized(), Some("5".to_string()));
        assert_eq!(float.as_i64(), Some(5));

        let opaque: RawId = serde_json::from_value(json!("c-12")).unwrap();
        assert_eq!(opaque.as_i64(), None);
        assert_eq!(opaque.normalized(), Some("c-12".to_string()));
    }

    #[test]
    fn typed_ids_compare_with_wire_ids() {
        let wire: RawId = serde_json::from_value(json!(5)).unwrap();
        assert_eq!(Some(normalize_id(" 05 ")), wire.normalized());
        assert_eq!(normalize_id("c-12"), "c-12");
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(
            split_list(Some("anxiety, , family ,")),
            vec!["anxiety".to_string(), "family".to_string()]
        );
        assert!(split_list(None).is_empty());
    }
}
