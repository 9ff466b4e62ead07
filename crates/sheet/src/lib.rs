//! Sheet/Report model for gridlink
//!
//! Maps the spreadsheet API's JSON resources to typed objects and answers
//! row queries locally through composite indexes, so a fetched sheet can be
//! searched by any combination of column values without going back to the
//! server.
//!
//! # Examples
//!
//! ## Loading a sheet
//!
//! ```
//! use gridlink_sheet::{Aggregate, LoadOptions, RowLookup, Sheet};
//! use serde_json::json;
//!
//! let sheet = Sheet::from_json(json!({
//!     "id": 1,
//!     "name": "People",
//!     "columns": [
//!         {"id": 11, "title": "Full Name", "type": "TEXT_NUMBER", "primary": true},
//!         {"id": 12, "title": "Birth date", "type": "DATE"}
//!     ],
//!     "rows": [
//!         {"id": 100, "rowNumber": 1, "cells": [
//!             {"columnId": 11, "value": "Bob Lee"},
//!             {"columnId": 12, "value": "1990-01-01"}
//!         ]}
//!     ]
//! }), &LoadOptions::default()).unwrap();
//!
//! let row = sheet.get_row(RowLookup::Number(1)).unwrap().unwrap();
//! assert!(row.value("Birth date").unwrap().unwrap().as_date().is_some());
//! ```
//!
//! ## Querying through indexes
//!
//! ```
//! use gridlink_sheet::{Aggregate, IndexSpec, LoadOptions, RowFilter, Sheet, SheetError};
//! use serde_json::json;
//!
//! let mut sheet = Sheet::from_json(json!({
//!     "name": "Contacts",
//!     "columns": [
//!         {"id": 1, "title": "Company", "type": "TEXT_NUMBER"},
//!         {"id": 2, "title": "Email", "type": "TEXT_NUMBER"}
//!     ],
//!     "rows": [
//!         {"id": 10, "rowNumber": 1, "cells": [
//!             {"columnId": 1, "value": "ACME"}, {"columnId": 2, "value": "bob@acme.com"}]}
//!     ]
//! }), &LoadOptions::default()).unwrap();
//!
//! // Querying before building an index is an error
//! let by_company = RowFilter::new().with("Company", "ACME");
//! assert!(matches!(sheet.get_rows(&by_company), Err(SheetError::IndexNotFound { .. })));
//!
//! sheet.build_index([IndexSpec::non_unique(["Company"])]).unwrap();
//! assert_eq!(sheet.get_rows(&by_company).unwrap().len(), 1);
//!
//! // A non-unique index only answers get_rows
//! assert!(matches!(sheet.get_row(&by_company), Err(SheetError::IndexNotUnique { .. })));
//! ```
//!
//! # Value coercion
//!
//! When a row is wired to its sheet's columns, cell values are coerced by
//! column type: DATE and DATETIME strings become [`chrono`] values and an
//! empty CHECKBOX cell reads as `false`. Strings that fail to parse are kept
//! as text and logged.

mod cell;
mod column;
mod error;
mod extra;
mod index;
mod row;
mod schema;
mod sheet;
mod value;

/// Re-export cell types.
pub use cell::{Cell, CELL_WRITE_FIELDS};
/// Re-export column types.
pub use column::{Column, ColumnIndex, ColumnRef, ColumnType, Columns, COLUMN_CREATE_FIELDS};
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export auxiliary wire objects.
pub use extra::{
    AutoNumberFormat, Contact, Hyperlink, OperationResult, Predecessor, UserPermissions,
    UserSettings, Workspace,
};
/// Re-export index engine types.
pub use index::{Index, IndexKey, IndexSet, IndexSpec, RowFilter};
/// Re-export row types.
pub use row::{CellLookup, Row};
/// Re-export the load/dump machinery.
pub use schema::{Entity, Field, LoadOptions, Schema};
/// Re-export aggregates.
pub use sheet::{Aggregate, Grid, Report, RowLookup, Sheet};
/// Re-export value types.
pub use value::{parse_date, parse_datetime, CellValue, ObjectValue};
