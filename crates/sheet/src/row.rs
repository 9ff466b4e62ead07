use crate::cell::{Cell, CELL_WRITE_FIELDS};
use crate::column::{Column, ColumnRef, ColumnType, Columns};
use crate::error::{Result, SheetError};
use crate::schema::{dump_list, field, load_list, Entity, Schema};
use crate::value::CellValue;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Cell access shared by sheet rows and report rows
pub trait CellLookup {
    /// Find the cell for a column through the row's lookup tables
    fn cell(&self, column: ColumnRef<'_>) -> Result<&Cell>;

    /// Rebuild the lookup tables against the owning aggregate's columns
    fn rebuild_lookup(&mut self, columns: Columns<'_>);
}

/// One row of a sheet or report
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub id: Option<i64>,
    pub sheet_id: Option<i64>,
    pub access_level: Option<String>,
    pub attachments: Vec<JsonValue>,
    cells: Vec<Cell>,
    pub columns: Vec<Column>,
    pub conditional_format: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<JsonValue>,
    pub discussions: Vec<JsonValue>,
    pub expanded: Option<bool>,
    pub filtered_out: Option<bool>,
    pub format: Option<String>,
    pub in_critical_path: Option<bool>,
    pub locked: Option<bool>,
    pub locked_for_user: Option<bool>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<JsonValue>,
    /// 1-based position assigned by the server
    pub num: Option<i64>,
    pub permalink: Option<String>,
    pub version: Option<i64>,

    // Location specifiers: write-only placement directives for add/update.
    pub parent_id: Option<i64>,
    pub sibling_id: Option<i64>,
    pub above: Option<bool>,
    pub indent: Option<i64>,
    pub outdent: Option<i64>,
    pub to_bottom: Option<bool>,
    pub to_top: Option<bool>,

    title_lookup: IndexMap<String, usize>,
    id_lookup: HashMap<i64, usize>,
    // Text already reported as unparsable, by column id.
    rejected: HashMap<i64, (ColumnType, String)>,
}

impl Row {
    /// A new row holding the given cells
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to cell contents. Changing a cell's column id leaves the
    /// lookups stale until the next rebuild.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Append a cell. It becomes reachable by title/id after the next rebuild.
    pub fn push_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Replace all cells and drop the now meaningless lookups
    pub fn set_cells(&mut self, cells: Vec<Cell>) {
        self.cells = cells;
        self.title_lookup.clear();
        self.id_lookup.clear();
        self.rejected.clear();
    }

    /// Find a cell by column title or column id
    ///
    /// # Examples
    ///
    /// ```
    /// use gridlink_sheet::{Aggregate, LoadOptions, Sheet};
    /// use serde_json::json;
    ///
    /// let sheet = Sheet::from_json(json!({
    ///     "name": "People",
    ///     "columns": [{"id": 1, "title": "Full Name", "type": "TEXT_NUMBER"}],
    ///     "rows": [{"id": 10, "rowNumber": 1, "cells": [{"columnId": 1, "value": "Bob Lee"}]}]
    /// }), &LoadOptions::default()).unwrap();
    ///
    /// let row = &sheet.rows()[0];
    /// assert_eq!(row.get_cell("Full Name").unwrap().column_id, Some(1));
    /// assert_eq!(row.get_cell(1_i64).unwrap().value.as_ref().and_then(|v| v.as_str()), Some("Bob Lee"));
    /// ```
    pub fn get_cell<'a>(&self, column: impl Into<ColumnRef<'a>>) -> Result<&Cell> {
        self.cell(column.into())
    }

    pub fn get_cell_mut<'a>(&mut self, column: impl Into<ColumnRef<'a>>) -> Result<&mut Cell> {
        let column = column.into();
        let pos = self.position(column)?;
        self.cells
            .get_mut(pos)
            .ok_or_else(|| SheetError::CellNotFound {
                key: column.to_string(),
            })
    }

    /// Current value of the cell for a column
    pub fn value<'a>(&self, column: impl Into<ColumnRef<'a>>) -> Result<Option<&CellValue>> {
        self.get_cell(column).map(|cell| cell.value.as_ref())
    }

    /// Column title to current value for every cell reachable by title
    #[must_use]
    pub fn as_mapping(&self) -> IndexMap<String, Option<CellValue>> {
        self.title_lookup
            .iter()
            .filter_map(|(title, &pos)| {
                self.cells
                    .get(pos)
                    .map(|cell| (title.clone(), cell.value.clone()))
            })
            .collect()
    }

    fn position(&self, column: ColumnRef<'_>) -> Result<usize> {
        let pos = match column {
            ColumnRef::Title(title) => self.title_lookup.get(title),
            ColumnRef::Id(id) => self.id_lookup.get(&id),
        };
        pos.copied().ok_or_else(|| SheetError::CellNotFound {
            key: column.to_string(),
        })
    }

    /// Payload for adding this row
    #[must_use]
    pub fn add_payload(&self) -> JsonValue {
        self.write_payload(ROW_ADD_FIELDS)
    }

    /// Payload for updating this row
    #[must_use]
    pub fn update_payload(&self) -> JsonValue {
        self.write_payload(ROW_UPDATE_FIELDS)
    }

    // Only cells with something to write are sent.
    fn write_payload(&self, fields: &[&str]) -> JsonValue {
        let mut payload = self.dump(Some(fields));
        let cells: Vec<JsonValue> = self
            .cells
            .iter()
            .filter(|cell| cell.has_content())
            .map(|cell| cell.dump(Some(CELL_WRITE_FIELDS)))
            .collect();
        if let Some(map) = payload.as_object_mut() {
            map.insert("cells".to_string(), JsonValue::Array(cells));
        }
        payload
    }
}

impl CellLookup for Row {
    fn cell(&self, column: ColumnRef<'_>) -> Result<&Cell> {
        let pos = self.position(column)?;
        self.cells.get(pos).ok_or_else(|| SheetError::CellNotFound {
            key: column.to_string(),
        })
    }

    fn rebuild_lookup(&mut self, columns: Columns<'_>) {
        self.title_lookup.clear();
        self.id_lookup.clear();
        let previous = std::mem::take(&mut self.rejected);

        for (pos, cell) in self.cells.iter_mut().enumerate() {
            let Some(column_id) = cell.column_key() else {
                continue;
            };
            let Some(column) = columns.find(ColumnRef::Id(column_id)) else {
                continue;
            };

            if let Some(column_type) = &column.column_type {
                cell.value = match cell.value.take() {
                    Some(CellValue::Text(raw)) if column_type.is_temporal() => {
                        let seen = previous
                            .get(&column_id)
                            .is_some_and(|(kind, text)| kind == column_type && *text == raw);
                        let value = if seen {
                            CellValue::Text(raw)
                        } else {
                            CellValue::Text(raw).coerce(column_type)
                        };
                        if let CellValue::Text(text) = &value {
                            self.rejected
                                .insert(column_id, (column_type.clone(), text.clone()));
                        }
                        Some(value)
                    }
                    Some(value) => Some(value.coerce(column_type)),
                    None if *column_type == ColumnType::Checkbox => Some(CellValue::Bool(false)),
                    None => None,
                };
            }

            self.id_lookup.insert(column_id, pos);
            if let Some(title) = &column.title {
                self.title_lookup.insert(title.clone(), pos);
            }
        }
    }
}

impl Entity for Row {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Row>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "Row",
                vec![
                    field!(Row: "id" => id),
                    field!(Row: "sheetId" => sheet_id),
                    field!(Row: "accessLevel" => access_level),
                    field!(Row: "attachments" => attachments),
                    field!(Row: "cells" => cells, with load_list, dump_list),
                    field!(Row: "columns" => columns, with load_list, dump_list),
                    field!(Row: "conditionalFormat" => conditional_format),
                    field!(Row: "createdAt" => created_at),
                    field!(Row: "createdBy" => created_by),
                    field!(Row: "discussions" => discussions),
                    field!(Row: "expanded" => expanded),
                    field!(Row: "filteredOut" => filtered_out),
                    field!(Row: "format" => format),
                    field!(Row: "inCriticalPath" => in_critical_path),
                    field!(Row: "locked" => locked),
                    field!(Row: "lockedForUser" => locked_for_user),
                    field!(Row: "modifiedAt" => modified_at),
                    field!(Row: "modifiedBy" => modified_by),
                    field!(Row: "rowNumber" => num),
                    field!(Row: "permalink" => permalink),
                    field!(Row: "version" => version),
                    field!(Row: write_only "parentId" => parent_id),
                    field!(Row: write_only "siblingId" => sibling_id),
                    field!(Row: write_only "above" => above),
                    field!(Row: write_only "indent" => indent),
                    field!(Row: write_only "outdent" => outdent),
                    field!(Row: write_only "toBottom" => to_bottom),
                    field!(Row: write_only "toTop" => to_top),
                ],
            )
        })
    }
}

const ROW_ADD_FIELDS: &[&str] = &[
    "parentId",
    "siblingId",
    "above",
    "indent",
    "outdent",
    "toBottom",
    "toTop",
    "expanded",
    "format",
    "locked",
];

const ROW_UPDATE_FIELDS: &[&str] = &[
    "id",
    "parentId",
    "above",
    "indent",
    "outdent",
    "toBottom",
    "toTop",
    "expanded",
    "format",
    "locked",
];
