//! Remote operations on sheets and reports

use crate::client::Client;
use crate::error::{ApiError, ApiResult};
use gridlink_sheet::{
    Aggregate, ColumnRef, Entity, IndexSpec, OperationResult, Report, Row, Sheet,
};
use serde_json::{json, Value as JsonValue};
use std::marker::PhantomData;

/// Largest number of row ids the API accepts in one delete request
pub const MAX_ROWS_TO_DELETE: usize = 450;

/// Page size used when fetching reports
pub const REPORT_PAGE_SIZE: usize = 10_000;

/// A top-level object reachable under its own endpoint
pub trait Resource: Entity + Aggregate {
    /// Name used in error messages
    const KIND: &'static str;
    /// Collection endpoint, e.g. `/sheets`
    const ENDPOINT: &'static str;
    /// Whether full fetches come back in pages
    const PAGINATED: bool;

    fn object_id(&self) -> Option<i64>;
    fn set_object_id(&mut self, id: i64);
    fn object_name(&self) -> &str;
}

impl Resource for Sheet {
    const KIND: &'static str = "Sheet";
    const ENDPOINT: &'static str = "/sheets";
    const PAGINATED: bool = false;

    fn object_id(&self) -> Option<i64> {
        self.id
    }

    fn set_object_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn object_name(&self) -> &str {
        &self.name
    }
}

impl Resource for Report {
    const KIND: &'static str = "Report";
    const ENDPOINT: &'static str = "/reports";
    const PAGINATED: bool = true;

    fn object_id(&self) -> Option<i64> {
        self.id
    }

    fn set_object_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn object_name(&self) -> &str {
        &self.name
    }
}

/// How to address a remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef<'a> {
    Id(i64),
    Name(&'a str),
}

impl<'a> From<&'a str> for ObjectRef<'a> {
    fn from(name: &'a str) -> Self {
        ObjectRef::Name(name)
    }
}

impl<'a> From<&'a String> for ObjectRef<'a> {
    fn from(name: &'a String) -> Self {
        ObjectRef::Name(name)
    }
}

impl From<i64> for ObjectRef<'_> {
    fn from(id: i64) -> Self {
        ObjectRef::Id(id)
    }
}

/// One sort key for [`Sheets::sort_rows`]
#[derive(Debug, Clone, Copy)]
pub struct SortCriterion<'a> {
    pub column: ColumnRef<'a>,
    pub descending: bool,
}

impl<'a> SortCriterion<'a> {
    pub fn ascending(column: impl Into<ColumnRef<'a>>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn descending(column: impl Into<ColumnRef<'a>>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Operations on one kind of resource
#[derive(Debug, Clone)]
pub struct Crud<'a, R> {
    client: &'a Client,
    _resource: PhantomData<R>,
}

pub type Sheets<'a> = Crud<'a, Sheet>;
pub type Reports<'a> = Crud<'a, Report>;

impl<'a, R: Resource> Crud<'a, R> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    /// All objects of this kind. The API returns partial objects here
    /// (sheets come without columns or rows).
    pub async fn list(&self) -> ApiResult<Vec<R>> {
        let response = self
            .client
            .get_json(R::ENDPOINT, &[("includeAll", "true".to_string())])
            .await?;
        let JsonValue::Object(mut body) = response else {
            return Err(ApiError::UnexpectedResponse(format!(
                "GET {} did not return an object",
                R::ENDPOINT
            )));
        };
        let Some(JsonValue::Array(items)) = body.remove("data") else {
            return Err(ApiError::UnexpectedResponse(format!(
                "GET {} does not contain key 'data'",
                R::ENDPOINT
            )));
        };

        let opts = self.client.load_options();
        items
            .into_iter()
            .map(|item| {
                tracing::debug!("Creating a {} object from data: {}", R::KIND, item);
                R::load(item, &opts).map_err(ApiError::from)
            })
            .collect()
    }

    /// Id of the object with the given name
    pub async fn get_id(&self, name: &str) -> ApiResult<i64> {
        let found = self
            .list()
            .await?
            .into_iter()
            .find(|obj| obj.object_name() == name);
        match found {
            Some(obj) => obj.object_id().ok_or_else(|| {
                ApiError::UnexpectedResponse(format!(
                    "{} object with the name '{}' does not have an id",
                    R::KIND,
                    name
                ))
            }),
            None => Err(ApiError::ObjectNotFound {
                kind: R::KIND,
                name: name.to_string(),
            }),
        }
    }

    async fn resolve(&self, object: ObjectRef<'_>) -> ApiResult<i64> {
        match object {
            ObjectRef::Id(id) => Ok(id),
            ObjectRef::Name(name) => self.get_id(name).await,
        }
    }

    /// The full object, columns and rows included
    pub async fn get<'n>(&self, object: impl Into<ObjectRef<'n>>) -> ApiResult<R> {
        let id = self.resolve(object.into()).await?;
        let endpoint = format!("{}/{}", R::ENDPOINT, id);
        let data = if R::PAGINATED {
            self.fetch_pages(&endpoint).await?
        } else {
            self.client.get_json(&endpoint, &full_object_query()).await?
        };

        tracing::debug!("Creating a {} object {} from data", R::KIND, id);
        let mut obj = R::load(data, &self.client.load_options())?;
        if obj.object_id().is_none() {
            obj.set_object_id(id);
        }
        Ok(obj)
    }

    /// The full object with the given indexes already built
    pub async fn get_indexed<'n, I>(
        &self,
        object: impl Into<ObjectRef<'n>>,
        specs: I,
    ) -> ApiResult<R>
    where
        I: IntoIterator<Item = IndexSpec>,
    {
        let mut obj = self.get(object).await?;
        obj.build_index(specs)?;
        Ok(obj)
    }

    // Keeps requesting pages until the rows declared by the first page have
    // all arrived, then hands back one object holding every row.
    async fn fetch_pages(&self, endpoint: &str) -> ApiResult<JsonValue> {
        let mut page = 1;
        let mut data = self.client.get_json(endpoint, &page_query(page)).await?;
        let total = data
            .get("totalRowCount")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| {
                ApiError::UnexpectedResponse(format!(
                    "GET {endpoint} does not contain key 'totalRowCount'"
                ))
            })?;
        let mut rows = take_rows(&mut data);

        while (rows.len() as u64) < total {
            page += 1;
            let mut next = self.client.get_json(endpoint, &page_query(page)).await?;
            let page_rows = take_rows(&mut next);
            if page_rows.is_empty() {
                tracing::warn!(
                    "Page {} of {} is empty after {} of {} rows, stopping",
                    page,
                    endpoint,
                    rows.len(),
                    total
                );
                break;
            }
            rows.extend(page_rows);
        }

        if let Some(map) = data.as_object_mut() {
            map.insert("rows".to_string(), JsonValue::Array(rows));
        }
        Ok(data)
    }
}

fn full_object_query() -> Vec<(&'static str, String)> {
    vec![
        ("level", "2".to_string()),
        ("include", "objectValue".to_string()),
    ]
}

fn page_query(page: usize) -> Vec<(&'static str, String)> {
    let mut query = full_object_query();
    query.push(("pageSize", REPORT_PAGE_SIZE.to_string()));
    if page > 1 {
        query.push(("page", page.to_string()));
    }
    query
}

fn take_rows(data: &mut JsonValue) -> Vec<JsonValue> {
    match data.get_mut("rows").map(JsonValue::take) {
        Some(JsonValue::Array(rows)) => rows,
        _ => Vec::new(),
    }
}

fn operation_result(response: JsonValue) -> ApiResult<OperationResult> {
    if response.is_null() {
        return Err(ApiError::UnexpectedResponse(
            "empty body where an operation result was expected".to_string(),
        ));
    }
    Ok(serde_json::from_value(response)?)
}

impl Sheets<'_> {
    /// Create a sheet with its columns
    pub async fn create(&self, sheet: &Sheet) -> ApiResult<OperationResult> {
        let result = self
            .client
            .post_json(Sheet::ENDPOINT, &sheet.create_payload())
            .await?;
        operation_result(result)
    }

    /// Rename a sheet. Only the name is sent.
    pub async fn update(&self, sheet: &Sheet) -> ApiResult<OperationResult> {
        let id = sheet_id(sheet)?;
        let endpoint = format!("{}/{}", Sheet::ENDPOINT, id);
        let result = self
            .client
            .put_json(&endpoint, &json!({"name": sheet.name}))
            .await?;
        operation_result(result)
    }

    pub async fn delete<'n>(
        &self,
        object: impl Into<ObjectRef<'n>>,
    ) -> ApiResult<OperationResult> {
        let id = self.resolve(object.into()).await?;
        let endpoint = format!("{}/{}", Sheet::ENDPOINT, id);
        operation_result(self.client.delete_json(&endpoint, &[]).await?)
    }

    /// Add one row. The row needs a location specifier or a row number.
    pub async fn add_row(&self, sheet_id: i64, row: &Row) -> ApiResult<OperationResult> {
        let result = self
            .client
            .post_json(&rows_endpoint(sheet_id), &row.add_payload())
            .await?;
        operation_result(result)
    }

    pub async fn add_rows(&self, sheet_id: i64, rows: &[Row]) -> ApiResult<OperationResult> {
        let payload = JsonValue::Array(rows.iter().map(Row::add_payload).collect());
        let result = self
            .client
            .post_json(&rows_endpoint(sheet_id), &payload)
            .await?;
        operation_result(result)
    }

    pub async fn update_row(&self, sheet_id: i64, row: &Row) -> ApiResult<OperationResult> {
        let result = self
            .client
            .put_json(&rows_endpoint(sheet_id), &row.update_payload())
            .await?;
        operation_result(result)
    }

    pub async fn update_rows(&self, sheet_id: i64, rows: &[Row]) -> ApiResult<OperationResult> {
        let payload = JsonValue::Array(rows.iter().map(Row::update_payload).collect());
        let result = self
            .client
            .put_json(&rows_endpoint(sheet_id), &payload)
            .await?;
        operation_result(result)
    }

    pub async fn delete_row(&self, sheet_id: i64, row_id: i64) -> ApiResult<OperationResult> {
        self.delete_rows(sheet_id, &[row_id]).await
    }

    /// Delete rows by id, [`MAX_ROWS_TO_DELETE`] ids per request.
    ///
    /// Stops at the first chunk the server does not report as `SUCCESS`;
    /// chunks already sent stay deleted.
    pub async fn delete_rows(&self, sheet_id: i64, row_ids: &[i64]) -> ApiResult<OperationResult> {
        if row_ids.is_empty() {
            return Err(ApiError::InvalidArgument(
                "at least one row id is required".to_string(),
            ));
        }

        let endpoint = rows_endpoint(sheet_id);
        let mut last = OperationResult::default();
        for chunk in row_ids.chunks(MAX_ROWS_TO_DELETE) {
            let ids = chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            last = operation_result(self.client.delete_json(&endpoint, &[("ids", ids)]).await?)?;
            if !last.is_success() {
                return Err(ApiError::OperationFailed(
                    last.message.clone().unwrap_or_default(),
                ));
            }
        }
        Ok(last)
    }

    /// Sort rows remotely and return the sheet as the server now has it
    pub async fn sort_rows(&self, sheet: &Sheet, order: &[SortCriterion<'_>]) -> ApiResult<Sheet> {
        let id = sheet_id(sheet)?;
        let criteria = order
            .iter()
            .map(|criterion| -> ApiResult<JsonValue> {
                let column = sheet.get_column(criterion.column)?;
                let column_id = column.id.ok_or_else(|| {
                    ApiError::InvalidArgument(format!(
                        "column {} does not have an id",
                        criterion.column
                    ))
                })?;
                let direction = if criterion.descending {
                    "DESCENDING"
                } else {
                    "ASCENDING"
                };
                Ok(json!({"columnId": column_id, "direction": direction}))
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let endpoint = format!("{}/{}/sort", Sheet::ENDPOINT, id);
        let response = self
            .client
            .post_json(&endpoint, &json!({"sortCriteria": criteria}))
            .await?;
        Ok(Sheet::from_json(response, &self.client.load_options())?)
    }
}

fn sheet_id(sheet: &Sheet) -> ApiResult<i64> {
    sheet.id.ok_or_else(|| {
        ApiError::InvalidArgument(format!("sheet '{}' does not have an id", sheet.name))
    })
}

fn rows_endpoint(sheet_id: i64) -> String {
    format!("{}/{}/rows", Sheet::ENDPOINT, sheet_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query() {
        let first = page_query(1);
        assert!(first.contains(&("pageSize", "10000".to_string())));
        assert!(!first.iter().any(|(key, _)| *key == "page"));
        assert!(page_query(3).contains(&("page", "3".to_string())));
    }

    #[test]
    fn test_take_rows() {
        let mut data = json!({"rows": [{"id": 1}], "totalRowCount": 1});
        assert_eq!(take_rows(&mut data).len(), 1);
        assert!(take_rows(&mut json!({})).is_empty());
    }

    #[test]
    fn test_operation_result_needs_a_body() {
        assert!(matches!(
            operation_result(JsonValue::Null),
            Err(ApiError::UnexpectedResponse(_))
        ));
        assert!(operation_result(json!({"message": "SUCCESS", "resultCode": 0}))
            .unwrap()
            .is_success());
    }

    #[test]
    fn test_object_ref_conversions() {
        assert_eq!(ObjectRef::from(5_i64), ObjectRef::Id(5));
        assert_eq!(ObjectRef::from("Budget"), ObjectRef::Name("Budget"));
    }
}
