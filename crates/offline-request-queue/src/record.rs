//! The unit of work held by the queue.

use crate::OutboxError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Request method. `Post` creates, `Delete` deletes, `Get` reads and
/// `Put`/`Patch` update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Reads are never deferred; everything else may be queued.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }

    /// Whether replay runs an existence probe first.
    pub fn needs_existence_probe(&self) -> bool {
        matches!(self, Self::Post | Self::Delete)
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = OutboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(OutboxError::InvalidMethod(s.to_string())),
        }
    }
}

/// A request captured for later replay.
///
/// Records are immutable once built. The on-disk field names (`url`,
/// `data`, `objInfo`) match the format earlier clients already persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(rename = "url")]
    target: String,
    method: RequestMethod,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(rename = "data", default)]
    payload: Value,
    #[serde(
        rename = "objInfo",
        default,
        deserialize_with = "deserialize_object_hint",
        skip_serializing_if = "Option::is_none"
    )]
    object_hint: Option<String>,
}

/// Accepts the hint as a string or a bare number (numeric ids).
fn deserialize_object_hint<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "objInfo must be a string or number, got {}",
            other
        ))),
    }
}

impl RequestRecord {
    pub fn new(method: RequestMethod, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method,
            headers: BTreeMap::new(),
            payload: Value::Null,
            object_hint: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_object_hint(mut self, hint: impl Into<String>) -> Self {
        self.object_hint = Some(hint.into());
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn object_hint(&self) -> Option<&str> {
        self.object_hint.as_deref()
    }

    /// Body to put on the wire. DELETE and GET never carry one, and a null
    /// payload means "no body".
    pub fn body(&self) -> Option<&Value> {
        match self.method {
            RequestMethod::Get | RequestMethod::Delete => None,
            _ if self.payload.is_null() => None,
            _ => Some(&self.payload),
        }
    }

    /// Address probed before replay to see whether the effect already landed.
    ///
    /// CREATE probes `{target}/{object_hint}` and needs a hint; DELETE probes
    /// the target itself. Other methods are never probed.
    pub fn existence_probe_address(&self) -> Option<String> {
        match self.method {
            RequestMethod::Post => self
                .object_hint
                .as_deref()
                .map(|hint| format!("{}/{}", self.target.trim_end_matches('/'), hint)),
            RequestMethod::Delete => Some(self.target.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!("post".parse::<RequestMethod>().unwrap(), RequestMethod::Post);
        assert_eq!("Delete".parse::<RequestMethod>().unwrap(), RequestMethod::Delete);
        assert_eq!("PATCH".parse::<RequestMethod>().unwrap(), RequestMethod::Patch);
        assert!(matches!(
            "TRACE".parse::<RequestMethod>(),
            Err(OutboxError::InvalidMethod(m)) if m == "TRACE"
        ));
    }

    #[test]
    fn test_method_classification() {
        assert!(!RequestMethod::Get.is_mutating());
        assert!(RequestMethod::Post.is_mutating());
        assert!(RequestMethod::Put.is_mutating());
        assert!(RequestMethod::Delete.is_mutating());

        assert!(RequestMethod::Post.needs_existence_probe());
        assert!(RequestMethod::Delete.needs_existence_probe());
        assert!(!RequestMethod::Put.needs_existence_probe());
        assert!(!RequestMethod::Patch.needs_existence_probe());
    }

    #[test]
    fn test_create_probe_address_appends_hint() {
        let record = RequestRecord::new(RequestMethod::Post, "https://api.test/clocks")
            .with_object_hint("42");
        assert_eq!(
            record.existence_probe_address().as_deref(),
            Some("https://api.test/clocks/42")
        );

        let trailing = RequestRecord::new(RequestMethod::Post, "https://api.test/clocks/")
            .with_object_hint("42");
        assert_eq!(
            trailing.existence_probe_address().as_deref(),
            Some("https://api.test/clocks/42")
        );
    }

    #[test]
    fn test_create_without_hint_has_no_probe() {
        let record = RequestRecord::new(RequestMethod::Post, "https://api.test/clocks");
        assert_eq!(record.existence_probe_address(), None);
    }

    #[test]
    fn test_delete_probes_target() {
        let record = RequestRecord::new(RequestMethod::Delete, "https://api.test/teams/3")
            .with_object_hint("ignored");
        assert_eq!(
            record.existence_probe_address().as_deref(),
            Some("https://api.test/teams/3")
        );
    }

    #[test]
    fn test_update_is_not_probed() {
        let record = RequestRecord::new(RequestMethod::Put, "https://api.test/users/1");
        assert_eq!(record.existence_probe_address(), None);
    }

    #[test]
    fn test_body_rules() {
        let create = RequestRecord::new(RequestMethod::Post, "u").with_payload(json!({"a": 1}));
        assert_eq!(create.body(), Some(&json!({"a": 1})));

        let delete = RequestRecord::new(RequestMethod::Delete, "u").with_payload(json!({"a": 1}));
        assert_eq!(delete.body(), None);

        let empty = RequestRecord::new(RequestMethod::Put, "u");
        assert_eq!(empty.body(), None);
    }

    #[test]
    fn test_serialized_field_names() {
        let record = RequestRecord::new(RequestMethod::Post, "https://api.test/users")
            .with_header("Authorization", "Bearer t")
            .with_payload(json!({"username": "ada"}))
            .with_object_hint("7");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "https://api.test/users",
                "method": "POST",
                "headers": {"Authorization": "Bearer t"},
                "data": {"username": "ada"},
                "objInfo": "7"
            })
        );
    }

    #[test]
    fn test_deserialize_numeric_object_hint_and_missing_fields() {
        let record: RequestRecord = serde_json::from_value(json!({
            "url": "https://api.test/clocks",
            "method": "POST",
            "objInfo": 12
        }))
        .unwrap();

        assert_eq!(record.object_hint(), Some("12"));
        assert!(record.headers().is_empty());
        assert!(record.payload().is_null());
    }

    #[test]
    fn test_deserialize_rejects_object_hint_of_wrong_shape() {
        let result = serde_json::from_value::<RequestRecord>(json!({
            "url": "u",
            "method": "DELETE",
            "objInfo": {"id": 1}
        }));
        assert!(result.is_err());
    }
}
