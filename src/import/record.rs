//! Task records written to the database

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of an exported task that is imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_number: u64,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl TaskRecord {
    /// Build a record from a task as exported from Asana
    pub fn from_exported(task_number: u64, task: &Value) -> Result<Self> {
        let fields = task.as_object().ok_or_else(|| {
            Error::InvalidRecord(format!("task #{task_number} is not a JSON object"))
        })?;

        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            task_number,
            title: text("name").unwrap_or_default(),
            description: text("notes").unwrap_or_default(),
            assignee: fields
                .get("assignee")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            project: fields
                .get("projects")
                .and_then(Value::as_array)
                .and_then(|projects| projects.first())
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Acknowledgement returned for a created record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    /// Database reference of the new document
    pub reference: String,
    /// Write timestamp in microseconds
    pub timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_task() {
        let task = json!({
            "gid": "1201",
            "name": "Migrate billing",
            "notes": "Move invoices to the new system",
            "assignee": {"gid": "9", "name": "Robin"},
            "projects": [{"gid": "1", "name": "Finance"}, {"gid": "2", "name": "Ops"}]
        });

        let record = TaskRecord::from_exported(3, &task).unwrap();
        assert_eq!(
            record,
            TaskRecord {
                task_number: 3,
                title: "Migrate billing".into(),
                description: "Move invoices to the new system".into(),
                assignee: Some("Robin".into()),
                project: Some("Finance".into()),
            }
        );
    }

    #[test]
    fn test_sparse_task() {
        let task = json!({"gid": "1", "name": "Untitled", "assignee": null, "projects": []});
        let record = TaskRecord::from_exported(0, &task).unwrap();
        assert_eq!(record.description, "");
        assert_eq!(record.assignee, None);
        assert_eq!(record.project, None);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = TaskRecord::from_exported(4, &json!("just a string")).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }

    #[test]
    fn test_serialized_field_names() {
        let record = TaskRecord {
            task_number: 1,
            title: "T".into(),
            description: "D".into(),
            assignee: None,
            project: Some("P".into()),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"taskNumber": 1, "title": "T", "description": "D", "project": "P"})
        );
    }
}
