use crate::error::{Result, SheetError};
use crate::extra::{AutoNumberFormat, Contact};
use crate::schema::{field, Entity, Schema};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Declared type of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    TextNumber,
    Picklist,
    Checkbox,
    Date,
    DateTime,
    AbstractDateTime,
    ContactList,
    MultiContactList,
    Duration,
    Predecessor,
    MultiPicklist,
    /// A type this library does not know about yet
    Other(String),
}

impl ColumnType {
    /// Whether text values in columns of this type are parsed into dates
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::DateTime | ColumnType::AbstractDateTime
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::TextNumber => "TEXT_NUMBER",
            ColumnType::Picklist => "PICKLIST",
            ColumnType::Checkbox => "CHECKBOX",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::AbstractDateTime => "ABSTRACT_DATETIME",
            ColumnType::ContactList => "CONTACT_LIST",
            ColumnType::MultiContactList => "MULTI_CONTACT_LIST",
            ColumnType::Duration => "DURATION",
            ColumnType::Predecessor => "PREDECESSOR",
            ColumnType::MultiPicklist => "MULTI_PICKLIST",
            ColumnType::Other(s) => s,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> ColumnType {
        match s {
            "TEXT_NUMBER" => ColumnType::TextNumber,
            "PICKLIST" => ColumnType::Picklist,
            "CHECKBOX" => ColumnType::Checkbox,
            "DATE" => ColumnType::Date,
            "DATETIME" => ColumnType::DateTime,
            "ABSTRACT_DATETIME" => ColumnType::AbstractDateTime,
            "CONTACT_LIST" => ColumnType::ContactList,
            "MULTI_CONTACT_LIST" => ColumnType::MultiContactList,
            "DURATION" => ColumnType::Duration,
            "PREDECESSOR" => ColumnType::Predecessor,
            "MULTI_PICKLIST" => ColumnType::MultiPicklist,
            other => ColumnType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ColumnType::parse(&s))
    }
}

/// Schema metadata for one sheet or report position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub id: Option<i64>,
    /// Report-scoped id; preferred over `id` for lookups when present
    pub virtual_id: Option<i64>,
    pub sheet_name_column: Option<bool>,
    pub system_column_type: Option<String>,
    pub column_type: Option<ColumnType>,
    pub auto_number_format: Option<AutoNumberFormat>,
    pub contact_options: Option<Vec<Contact>>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub hidden: Option<bool>,
    pub index: Option<i64>,
    pub locked: Option<bool>,
    pub locked_for_user: Option<bool>,
    pub options: Option<Vec<String>>,
    pub primary: Option<bool>,
    pub symbol: Option<String>,
    pub tags: Option<Vec<String>>,
    pub title: Option<String>,
    pub validation: Option<bool>,
    pub version: Option<i64>,
    pub width: Option<i64>,
}

impl Column {
    /// Create a column definition for a new sheet
    pub fn new(title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            title: Some(title.into()),
            column_type: Some(column_type),
            ..Self::default()
        }
    }

    /// Mark the column as the sheet's primary column
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = Some(true);
        self
    }

    /// Set picklist options
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Id used to match cells to this column
    #[must_use]
    pub fn key(&self) -> Option<i64> {
        self.virtual_id.or(self.id)
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }
}

impl Entity for Column {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Column>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "Column",
                vec![
                    field!(Column: "id" => id),
                    field!(Column: "virtualId" => virtual_id),
                    field!(Column: "sheetNameColumn" => sheet_name_column),
                    field!(Column: "systemColumnType" => system_column_type),
                    field!(Column: "type" => column_type),
                    field!(Column: "autoNumberFormat" => auto_number_format),
                    field!(Column: "contactOptions" => contact_options),
                    field!(Column: "description" => description),
                    field!(Column: "format" => format),
                    field!(Column: "hidden" => hidden),
                    field!(Column: "index" => index),
                    field!(Column: "locked" => locked),
                    field!(Column: "lockedForUser" => locked_for_user),
                    field!(Column: "options" => options),
                    field!(Column: "primary" => primary),
                    field!(Column: "symbol" => symbol),
                    field!(Column: "tags" => tags),
                    field!(Column: "title" => title),
                    field!(Column: "validation" => validation),
                    field!(Column: "version" => version),
                    field!(Column: "width" => width),
                ],
            )
        })
    }
}

/// Wire fields sent when a sheet is created together with its columns
pub const COLUMN_CREATE_FIELDS: &[&str] = &[
    "primary",
    "title",
    "type",
    "autoNumberFormat",
    "options",
    "symbol",
    "systemColumnType",
    "width",
];

/// How to address a column (or a cell through its column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Title(&'a str),
    Id(i64),
}

impl fmt::Display for ColumnRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Title(title) => write!(f, "'{title}'"),
            ColumnRef::Id(id) => write!(f, "#{id}"),
        }
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(title: &'a str) -> Self {
        ColumnRef::Title(title)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(title: &'a String) -> Self {
        ColumnRef::Title(title)
    }
}

impl From<i64> for ColumnRef<'_> {
    fn from(id: i64) -> Self {
        ColumnRef::Id(id)
    }
}

/// Column lookups by id and by title.
///
/// Titles are not guaranteed unique; the last column with a given title wins.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    by_id: HashMap<i64, usize>,
    by_title: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn build(columns: &[Column]) -> Self {
        let mut index = Self::default();
        for (pos, column) in columns.iter().enumerate() {
            let Some(key) = column.key() else {
                continue;
            };
            index.by_id.insert(key, pos);

            let Some(title) = &column.title else {
                continue;
            };
            if index.by_title.insert(title.clone(), pos).is_some() {
                tracing::info!("Column with the title '{}' is already present in the index", title);
            }
        }
        index
    }

    /// Position of a column in the owning column list
    pub fn position(&self, column: ColumnRef<'_>) -> Option<usize> {
        match column {
            ColumnRef::Title(title) => self.by_title.get(title).copied(),
            ColumnRef::Id(id) => self.by_id.get(&id).copied(),
        }
    }
}

/// Borrowed view over a column list and its lookups
#[derive(Debug, Clone, Copy)]
pub struct Columns<'a> {
    columns: &'a [Column],
    index: &'a ColumnIndex,
}

impl<'a> Columns<'a> {
    pub fn new(columns: &'a [Column], index: &'a ColumnIndex) -> Self {
        Self { columns, index }
    }

    pub fn find(&self, column: ColumnRef<'_>) -> Option<&'a Column> {
        self.index
            .position(column)
            .and_then(|pos| self.columns.get(pos))
    }

    pub fn get(&self, column: ColumnRef<'_>) -> Result<&'a Column> {
        self.find(column).ok_or_else(|| SheetError::ColumnNotFound {
            key: column.to_string(),
        })
    }

    pub fn as_slice(&self) -> &'a [Column] {
        self.columns
    }
}
