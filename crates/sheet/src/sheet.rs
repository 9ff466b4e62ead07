//! Sheet and report aggregates.
//!
//! Both own an ordered column list and an ordered row list plus the derived
//! lookups over them (columns by id/title, rows by number/id) and the
//! registered indexes. The shared behavior lives on the [`Aggregate`] trait;
//! [`Sheet`] adds the structural edits and payload builders used for writes.

use crate::cell::Cell;
use crate::column::{Column, ColumnIndex, ColumnRef, ColumnType, Columns, COLUMN_CREATE_FIELDS};
use crate::error::{Result, SheetError};
use crate::extra::{UserPermissions, UserSettings, Workspace};
use crate::index::{IndexSet, IndexSpec, RowFilter};
use crate::row::{CellLookup, Row};
use crate::schema::{dump_list, field, load_list, Entity, LoadOptions, Schema};
use crate::value::CellValue;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Columns, rows and everything derived from them
#[derive(Debug, Clone, Default)]
pub struct Grid {
    columns: Vec<Column>,
    rows: Vec<Row>,
    column_index: ColumnIndex,
    by_num: HashMap<i64, usize>,
    by_id: HashMap<i64, usize>,
    indexes: IndexSet,
}

impl Grid {
    fn column_view(&self) -> Columns<'_> {
        Columns::new(&self.columns, &self.column_index)
    }

    // Column lookups, every row's cell lookups and the row maps.
    fn refresh_lookups(&mut self) {
        self.column_index = ColumnIndex::build(&self.columns);
        let columns = Columns::new(&self.columns, &self.column_index);

        self.by_num.clear();
        self.by_id.clear();
        for (pos, row) in self.rows.iter_mut().enumerate() {
            row.rebuild_lookup(columns);
            if let Some(num) = row.num {
                self.by_num.insert(num, pos);
            }
            if let Some(id) = row.id {
                self.by_id.insert(id, pos);
            }
        }
    }

    /// Rebuild all lookups, then re-scan registered indexes.
    ///
    /// Indexes that can no longer be built are dropped and the error returned.
    fn refresh(&mut self) -> Result<()> {
        self.refresh_lookups();
        if let Err(e) = self.indexes.rescan(&self.rows) {
            self.indexes.clear();
            return Err(e);
        }
        Ok(())
    }
}

/// How to pick a single row
#[derive(Debug, Clone, Copy)]
pub enum RowLookup<'a> {
    /// 1-based row number assigned by the server
    Number(i64),
    Id(i64),
    /// Equality filter answered by a unique index
    Filter(&'a RowFilter),
}

impl<'a> From<&'a RowFilter> for RowLookup<'a> {
    fn from(filter: &'a RowFilter) -> Self {
        RowLookup::Filter(filter)
    }
}

/// Behavior shared by sheets and reports
pub trait Aggregate {
    fn grid(&self) -> &Grid;
    fn grid_mut(&mut self) -> &mut Grid;

    fn columns(&self) -> &[Column] {
        &self.grid().columns
    }

    fn rows(&self) -> &[Row] {
        &self.grid().rows
    }

    /// Mutable row access. Index keys are not tracked; call
    /// [`reindex`](Aggregate::reindex) after changing cell values.
    fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.grid_mut().rows
    }

    fn get_column<'a>(&self, column: impl Into<ColumnRef<'a>>) -> Result<&Column>
    where
        Self: Sized,
    {
        self.grid().column_view().get(column.into())
    }

    /// Find one row by number, id, or through a unique index
    fn get_row<'a>(&self, lookup: impl Into<RowLookup<'a>>) -> Result<Option<&Row>>
    where
        Self: Sized,
    {
        let grid = self.grid();
        let pos = match lookup.into() {
            RowLookup::Number(num) => grid.by_num.get(&num).copied(),
            RowLookup::Id(id) => grid.by_id.get(&id).copied(),
            RowLookup::Filter(filter) => grid.indexes.find_one(filter)?,
        };
        Ok(pos.and_then(|pos| grid.rows.get(pos)))
    }

    /// All rows matching `filter`, in row order
    fn get_rows(&self, filter: &RowFilter) -> Result<Vec<&Row>> {
        let grid = self.grid();
        Ok(grid
            .indexes
            .find_all(filter)?
            .into_iter()
            .filter_map(|pos| grid.rows.get(pos))
            .collect())
    }

    /// Register indexes and (re)build every registered index over the rows
    ///
    /// # Examples
    ///
    /// ```
    /// use gridlink_sheet::{Aggregate, IndexSpec, LoadOptions, RowFilter, Sheet};
    /// use serde_json::json;
    ///
    /// let mut sheet = Sheet::from_json(json!({
    ///     "name": "Contacts",
    ///     "columns": [
    ///         {"id": 1, "title": "Email", "type": "TEXT_NUMBER"},
    ///         {"id": 2, "title": "Company", "type": "TEXT_NUMBER"}
    ///     ],
    ///     "rows": [
    ///         {"id": 10, "rowNumber": 1, "cells": [
    ///             {"columnId": 1, "value": "bob@acme.com"}, {"columnId": 2, "value": "ACME"}]},
    ///         {"id": 11, "rowNumber": 2, "cells": [
    ///             {"columnId": 1, "value": "ann@acme.com"}, {"columnId": 2, "value": "ACME"}]}
    ///     ]
    /// }), &LoadOptions::default()).unwrap();
    ///
    /// sheet.build_index([IndexSpec::unique(["Email"]), IndexSpec::non_unique(["Company"])]).unwrap();
    ///
    /// let ann = sheet.get_row(&RowFilter::new().with("Email", "ann@acme.com")).unwrap().unwrap();
    /// assert_eq!(ann.id, Some(11));
    /// assert_eq!(sheet.get_rows(&RowFilter::new().with("Company", "ACME")).unwrap().len(), 2);
    /// ```
    fn build_index<I>(&mut self, specs: I) -> Result<()>
    where
        Self: Sized,
        I: IntoIterator<Item = IndexSpec>,
    {
        let grid = self.grid_mut();
        grid.indexes.build(specs, &grid.rows)
    }

    /// Rebuild lookups and re-scan indexes after in-place row edits
    fn reindex(&mut self) -> Result<()> {
        self.grid_mut().refresh()
    }

    fn indexes(&self) -> &IndexSet {
        &self.grid().indexes
    }

    /// Column title to value, one mapping per row
    fn as_list(&self) -> Vec<IndexMap<String, Option<CellValue>>> {
        self.rows().iter().map(Row::as_mapping).collect()
    }
}

/// A sheet as returned by the API, or one being prepared for creation
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub id: Option<i64>,
    pub name: String,
    pub access_level: Option<String>,
    pub permalink: Option<String>,
    pub favorite: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub version: Option<i64>,
    pub total_row_count: Option<i64>,
    pub effective_attachment_options: Vec<String>,
    pub gantt_enabled: Option<bool>,
    pub read_only: Option<bool>,
    pub dependencies_enabled: Option<bool>,
    pub resource_management_enabled: Option<bool>,
    pub cell_image_upload_enabled: Option<bool>,
    pub user_settings: Option<UserSettings>,
    pub user_permissions: Option<UserPermissions>,
    pub has_summary_fields: Option<bool>,
    pub is_multi_picklist_enabled: Option<bool>,
    pub workspace: Option<Workspace>,
    grid: Grid,
}

// Metadata carried by both sheets and reports.
macro_rules! metadata_fields {
    ($ty:ty) => {
        vec![
            field!($ty: "id" => id),
            field!($ty: "name" => name),
            field!($ty: "accessLevel" => access_level),
            field!($ty: "permalink" => permalink),
            field!($ty: "favorite" => favorite),
            field!($ty: "createdAt" => created_at),
            field!($ty: "modifiedAt" => modified_at),
            field!($ty: "version" => version),
            field!($ty: "totalRowCount" => total_row_count),
            field!($ty: "effectiveAttachmentOptions" => effective_attachment_options),
            field!($ty: "ganttEnabled" => gantt_enabled),
            field!($ty: "readOnly" => read_only),
            field!($ty: "dependenciesEnabled" => dependencies_enabled),
            field!($ty: "resourceManagementEnabled" => resource_management_enabled),
            field!($ty: "cellImageUploadEnabled" => cell_image_upload_enabled),
            field!($ty: "userSettings" => user_settings),
            field!($ty: "userPermissions" => user_permissions),
            field!($ty: "hasSummaryFields" => has_summary_fields),
            field!($ty: "isMultiPicklistEnabled" => is_multi_picklist_enabled),
            field!($ty: "workspace" => workspace),
            field!($ty: "columns" => grid.columns, with load_list, dump_list),
            field!($ty: "rows" => grid.rows, with load_list, dump_list),
        ]
    };
}

impl Sheet {
    /// An empty sheet with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder for sheets about to be created. Drops registered indexes.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.grid.columns = columns;
        self.grid.indexes.clear();
        self.grid.refresh_lookups();
        self
    }

    /// Parse a full sheet object and wire its rows to its columns
    pub fn from_json(value: JsonValue, opts: &LoadOptions) -> Result<Self> {
        Self::load(value, opts)
    }

    pub fn set_columns(&mut self, columns: Vec<Column>) -> Result<()> {
        self.grid.columns = columns;
        self.grid.refresh()
    }

    pub fn set_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        self.grid.rows = rows;
        self.grid.refresh()
    }

    pub fn push_row(&mut self, row: Row) -> Result<()> {
        self.grid.rows.push(row);
        self.grid.refresh()
    }

    /// A cell holding `value` for the column titled `title`
    pub fn make_cell(&self, title: &str, value: impl Into<CellValue>) -> Result<Cell> {
        let column = self.get_column(title)?;
        if column.column_type == Some(ColumnType::MultiPicklist) {
            return Err(SheetError::InvalidArgument(format!(
                "column '{title}' is a multi-picklist, use make_multi_picklist_cell"
            )));
        }
        Ok(Cell::new(column_id(column)?, value))
    }

    /// A multi-select cell for the column titled `title`
    pub fn make_multi_picklist_cell<I, S>(&self, title: &str, values: I) -> Result<Cell>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = self.get_column(title)?;
        Ok(Cell::multi_picklist(column_id(column)?, values))
    }

    /// One cell per `(title, value)` pair, in order
    pub fn make_cells<I, K, V>(&self, fields: I) -> Result<Vec<Cell>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<CellValue>,
    {
        fields
            .into_iter()
            .map(|(title, value)| self.make_cell(title.as_ref(), value))
            .collect()
    }

    /// Payload for creating this sheet together with its columns
    #[must_use]
    pub fn create_payload(&self) -> JsonValue {
        let columns: Vec<JsonValue> = self
            .grid
            .columns
            .iter()
            .map(|column| column.dump(Some(COLUMN_CREATE_FIELDS)))
            .collect();
        json!({"name": self.name, "columns": columns})
    }
}

fn column_id(column: &Column) -> Result<i64> {
    column.id.ok_or_else(|| {
        SheetError::InvalidArgument(format!(
            "column {:?} does not have an id",
            column.title.as_deref().unwrap_or_default()
        ))
    })
}

impl Aggregate for Sheet {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

impl Entity for Sheet {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Sheet>> = OnceLock::new();
        SCHEMA.get_or_init(|| Schema::new("Sheet", metadata_fields!(Sheet)))
    }

    fn finish_load(&mut self) -> Result<()> {
        tracing::debug!(
            "Loaded sheet '{}' with {} columns and {} rows",
            self.name,
            self.grid.columns.len(),
            self.grid.rows.len()
        );
        self.grid.refresh()
    }
}

/// A read-only report spanning one or more source sheets.
///
/// Report columns and cells carry virtual ids which take precedence over the
/// source sheet ids for every lookup.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub id: Option<i64>,
    pub name: String,
    pub access_level: Option<String>,
    pub permalink: Option<String>,
    pub favorite: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub version: Option<i64>,
    pub total_row_count: Option<i64>,
    pub effective_attachment_options: Vec<String>,
    pub gantt_enabled: Option<bool>,
    pub read_only: Option<bool>,
    pub dependencies_enabled: Option<bool>,
    pub resource_management_enabled: Option<bool>,
    pub cell_image_upload_enabled: Option<bool>,
    pub user_settings: Option<UserSettings>,
    pub user_permissions: Option<UserPermissions>,
    pub has_summary_fields: Option<bool>,
    pub is_multi_picklist_enabled: Option<bool>,
    pub workspace: Option<Workspace>,
    /// Partial sheets the report draws rows from
    pub source_sheets: Vec<Sheet>,
    grid: Grid,
}

impl Report {
    pub fn from_json(value: JsonValue, opts: &LoadOptions) -> Result<Self> {
        Self::load(value, opts)
    }
}

impl Aggregate for Report {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

impl Entity for Report {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Report>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let mut fields = metadata_fields!(Report);
            fields.push(field!(Report: "sourceSheets" => source_sheets, with load_list, dump_list));
            Schema::new("Report", fields)
        })
    }

    fn finish_load(&mut self) -> Result<()> {
        tracing::debug!(
            "Loaded report '{}' with {} rows from {} source sheets",
            self.name,
            self.grid.rows.len(),
            self.source_sheets.len()
        );
        self.grid.refresh()
    }
}
