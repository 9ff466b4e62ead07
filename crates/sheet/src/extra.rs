//! Small wire objects that travel inside the main entities.

use crate::error::Result;
use crate::schema::{Entity, LoadOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Hyperlink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sight_id: Option<i64>,
}

/// A contact entry, used both as a column option and as a cell object value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One predecessor of a task row in a dependency-enabled sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Predecessor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_number: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_critical_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AutoNumberFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_path_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_summary_tasks: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_permissions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Workspace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Envelope returned by create, update and delete calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationResult {
    pub failed_items: Vec<JsonValue>,
    pub message: Option<String>,
    pub result: Option<JsonValue>,
    pub result_code: Option<i64>,
    pub version: Option<i64>,
}

impl OperationResult {
    pub const SUCCESS: &'static str = "SUCCESS";

    /// Whether the server reported `SUCCESS`
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message.as_deref() == Some(Self::SUCCESS)
    }

    /// The object echoed back by the server, loaded as `E`
    pub fn object<E: Entity>(&self, opts: &LoadOptions) -> Result<Option<E>> {
        self.result
            .clone()
            .filter(JsonValue::is_object)
            .map(|value| E::load(value, opts))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_result_from_json() {
        let result: OperationResult = serde_json::from_value(json!({
            "message": "SUCCESS",
            "resultCode": 0,
            "result": {"id": 7, "name": "Sheet"}
        }))
        .unwrap();
        assert!(result.is_success());
        assert_eq!(result.result_code, Some(0));
        assert!(result.failed_items.is_empty());

        let sheet: crate::Sheet = result.object(&LoadOptions::strict()).unwrap().unwrap();
        assert_eq!(sheet.id, Some(7));
        assert_eq!(sheet.name, "Sheet");
    }

    #[test]
    fn test_predecessor_type_rename() {
        let pred: Predecessor =
            serde_json::from_value(json!({"rowId": 1, "type": "FS"})).unwrap();
        assert_eq!(pred.kind.as_deref(), Some("FS"));
        assert_eq!(serde_json::to_value(&pred).unwrap(), json!({"rowId": 1, "type": "FS"}));
    }
}
