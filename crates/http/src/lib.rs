//! # gridlink-http
//!
//! Async client for the spreadsheet API.
//!
//! Fetches sheets and reports as [`gridlink_sheet`] aggregates, writes
//! sheets and rows back, and maps API failures to [`ApiError`]. Every request
//! carries the configured bearer token; JSON is the only wire format.

mod client;
mod config;
mod crud;
mod error;

pub use client::Client;
pub use config::{
    ClientConfig, DEFAULT_API_ROOT, ENV_API_ROOT, ENV_STRICT_VALIDATION, ENV_TOKEN,
};
pub use crud::{
    Crud, ObjectRef, Reports, Resource, Sheets, SortCriterion, MAX_ROWS_TO_DELETE,
    REPORT_PAGE_SIZE,
};
pub use error::{ApiError, ApiErrorBody, ApiResult};
