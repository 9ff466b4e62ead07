use crate::error::Result;
use crate::extra::Hyperlink;
use crate::schema::{field, Entity, LoadOptions, Schema};
use crate::value::{CellValue, ObjectValue};
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// One column/value pair within a row
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub column_id: Option<i64>,
    /// Report-scoped column id; preferred over `column_id` when present
    pub virtual_column_id: Option<i64>,
    pub column_type: Option<String>,
    pub conditional_format: Option<String>,
    pub display_value: Option<String>,
    pub format: Option<String>,
    pub formula: Option<String>,
    pub hyperlink: Option<Hyperlink>,
    pub image: Option<JsonValue>,
    pub link_in_from_cell: Option<JsonValue>,
    pub links_out_to_cells: Option<Vec<JsonValue>>,
    pub object_value: Option<ObjectValue>,
    pub override_validation: Option<bool>,
    pub strict: bool,
    pub value: Option<CellValue>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            column_id: None,
            virtual_column_id: None,
            column_type: None,
            conditional_format: None,
            display_value: None,
            format: None,
            formula: None,
            hyperlink: None,
            image: None,
            link_in_from_cell: None,
            links_out_to_cells: None,
            object_value: None,
            override_validation: None,
            strict: true,
            value: None,
        }
    }
}

impl Cell {
    /// A plain value cell for the given column
    pub fn new(column_id: i64, value: impl Into<CellValue>) -> Self {
        Self {
            column_id: Some(column_id),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A formula cell for the given column
    pub fn with_formula(column_id: i64, formula: impl Into<String>) -> Self {
        Self {
            column_id: Some(column_id),
            formula: Some(formula.into()),
            ..Self::default()
        }
    }

    /// A multi-select cell; the options travel as an object value
    pub fn multi_picklist<I, S>(column_id: i64, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column_id: Some(column_id),
            object_value: Some(ObjectValue::MultiPicklist(
                values.into_iter().map(Into::into).collect(),
            )),
            ..Self::default()
        }
    }

    /// Id used to match this cell to its column
    #[must_use]
    pub fn column_key(&self) -> Option<i64> {
        self.virtual_column_id.or(self.column_id)
    }

    /// Whether the cell carries anything worth sending on a write
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.value.is_some() || self.formula.is_some() || self.object_value.is_some()
    }
}

fn load_value(value: JsonValue, _opts: &LoadOptions) -> Result<Option<CellValue>> {
    Ok(CellValue::from_json(value))
}

fn dump_value(value: &Option<CellValue>) -> Option<JsonValue> {
    value.as_ref().map(CellValue::to_json)
}

fn load_object_value(value: JsonValue, _opts: &LoadOptions) -> Result<Option<ObjectValue>> {
    Ok(Some(ObjectValue::from_json(value)))
}

fn dump_object_value(value: &Option<ObjectValue>) -> Option<JsonValue> {
    value.as_ref().map(ObjectValue::to_json)
}

impl Entity for Cell {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Cell>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "Cell",
                vec![
                    field!(Cell: "columnId" => column_id),
                    field!(Cell: "virtualColumnId" => virtual_column_id),
                    field!(Cell: "columnType" => column_type),
                    field!(Cell: "conditionalFormat" => conditional_format),
                    field!(Cell: "displayValue" => display_value),
                    field!(Cell: "format" => format),
                    field!(Cell: "formula" => formula),
                    field!(Cell: "hyperlink" => hyperlink),
                    field!(Cell: "image" => image),
                    field!(Cell: "linkInFromCell" => link_in_from_cell),
                    field!(Cell: "linksOutToCells" => links_out_to_cells),
                    field!(Cell: "objectValue" => object_value, with load_object_value, dump_object_value),
                    field!(Cell: "overrideValidation" => override_validation),
                    field!(Cell: "strict" => strict),
                    field!(Cell: "value" => value, with load_value, dump_value),
                ],
            )
        })
    }
}

/// Wire fields of a cell sent on row add/update
pub const CELL_WRITE_FIELDS: &[&str] = &[
    "columnId",
    "formula",
    "value",
    "hyperlink",
    "linkInFromCell",
    "strict",
    "format",
    "image",
    "objectValue",
    "overrideValidation",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_cell() {
        let cell = Cell::load(
            json!({"columnId": 5, "value": "ACME", "displayValue": "ACME"}),
            &LoadOptions::strict(),
        )
        .unwrap();
        assert_eq!(cell.column_id, Some(5));
        assert_eq!(cell.value, Some(CellValue::Text("ACME".into())));
        assert!(cell.strict);
    }

    #[test]
    fn test_load_report_cell_prefers_virtual_id() {
        let cell = Cell::load(
            json!({"columnId": 5, "virtualColumnId": 500, "value": 3}),
            &LoadOptions::strict(),
        )
        .unwrap();
        assert_eq!(cell.column_key(), Some(500));
        assert_eq!(cell.value, Some(CellValue::Number(3.0)));
    }

    #[test]
    fn test_load_multi_picklist_object_value() {
        let cell = Cell::load(
            json!({
                "columnId": 7,
                "objectValue": {"objectType": "MULTI_PICKLIST", "values": ["napalm", "nornir"]}
            }),
            &LoadOptions::strict(),
        )
        .unwrap();
        assert!(cell.value.is_none());
        assert_eq!(
            cell.object_value.as_ref().and_then(ObjectValue::as_multi_picklist),
            Some(&["napalm".to_string(), "nornir".to_string()][..])
        );
    }

    #[test]
    fn test_dump_write_fields() {
        let cell = Cell::multi_picklist(7, ["netmiko"]);
        assert_eq!(
            cell.dump(Some(CELL_WRITE_FIELDS)),
            json!({
                "columnId": 7,
                "strict": true,
                "objectValue": {"objectType": "MULTI_PICKLIST", "values": ["netmiko"]}
            })
        );
    }

    #[test]
    fn test_has_content() {
        assert!(Cell::new(1, "x").has_content());
        assert!(Cell::with_formula(1, "=SUM([a]1:[a]3)").has_content());
        assert!(!Cell::default().has_content());
    }
}
