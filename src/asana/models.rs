//! Asana records as the export consumes them
//!
//! Tasks and attachments keep the full JSON record returned by the API so
//! that exports contain every requested field, not only the handful the
//! exporter itself reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub gid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Task {
    pub gid: String,
    pub name: String,
    pub html_notes: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Attachment {
    pub gid: String,
    pub name: String,
    pub download_url: Option<String>,
    pub host: Option<String>,
    pub raw: Value,
}

/// One page of a list endpoint
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
pub struct NextPage {
    pub offset: String,
}

impl Attachment {
    pub fn is_external(&self) -> bool {
        self.host.as_deref() == Some("external")
    }
}

fn required_str(record: &Value, field: &str, kind: &str) -> Result<String, String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("{kind} record is missing string field '{field}'"))
}

fn optional_str(record: &Value, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl TryFrom<Value> for Task {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Ok(Self {
            gid: required_str(&raw, "gid", "task")?,
            name: optional_str(&raw, "name").unwrap_or_default(),
            html_notes: optional_str(&raw, "html_notes"),
            raw,
        })
    }
}

impl From<Task> for Value {
    fn from(task: Task) -> Self {
        task.raw
    }
}

impl TryFrom<Value> for Attachment {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Ok(Self {
            gid: required_str(&raw, "gid", "attachment")?,
            name: optional_str(&raw, "name").unwrap_or_default(),
            download_url: optional_str(&raw, "download_url"),
            host: optional_str(&raw, "host"),
            raw,
        })
    }
}

impl From<Attachment> for Value {
    fn from(attachment: Attachment) -> Self {
        attachment.raw
    }
}
