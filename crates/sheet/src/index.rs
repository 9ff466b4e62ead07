//! Composite secondary indexes over a row collection.
//!
//! An index is registered for a set of column titles and maps the tuple of
//! those columns' cell values to a row position (unique index) or to every
//! matching row position in row order (non-unique index). Queries must name
//! exactly the column set of a registered index; indexes are never combined.

use crate::column::ColumnRef;
use crate::error::{Result, SheetError};
use crate::row::CellLookup;
use crate::value::CellValue;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

/// Tuple of cell values, one per index column in canonical column order.
/// `None` stands for a cell without a value.
pub type IndexKey = Vec<Option<CellValue>>;

/// Description of one index to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    columns: Vec<String>,
    unique: bool,
    strict: bool,
}

impl IndexSpec {
    pub fn new<I, S>(columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
            strict: false,
        }
    }

    /// An index where every key maps to a single row
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns, true)
    }

    /// An index where every key maps to all matching rows
    pub fn non_unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns, false)
    }

    /// Fail the build on a duplicate key instead of letting the later row
    /// replace the earlier one. Only meaningful for unique indexes.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    // Sorted so that a spec and a filter naming the same columns always meet.
    fn canonical(mut self) -> Result<Self> {
        if self.columns.is_empty() {
            return Err(SheetError::InvalidArgument(
                "an index needs at least one column".to_string(),
            ));
        }
        self.columns.sort();
        if self.columns.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(SheetError::InvalidArgument(format!(
                "index columns must be distinct: {:?}",
                self.columns
            )));
        }
        Ok(self)
    }
}

/// Equality filter: column title to expected value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    terms: BTreeMap<String, Option<CellValue>>,
}

impl RowFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column` to hold `value`
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.terms.insert(column.into(), Some(value.into()));
        self
    }

    /// Require `column` to hold no value
    #[must_use]
    pub fn with_empty(mut self, column: impl Into<String>) -> Self {
        self.terms.insert(column.into(), None);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    // Titles come out sorted, values in the same order.
    fn split(&self) -> (Vec<String>, IndexKey) {
        self.terms
            .iter()
            .map(|(title, value)| (title.clone(), value.clone()))
            .unzip()
    }
}

impl<K, V> FromIterator<(K, V)> for RowFilter
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(RowFilter::new(), |filter, (column, value)| {
                filter.with(column, value)
            })
    }
}

#[derive(Debug, Clone)]
enum Entries {
    Unique(HashMap<IndexKey, usize>),
    NonUnique(HashMap<IndexKey, Vec<usize>>),
}

/// A built index: its spec plus key to row-position entries
#[derive(Debug, Clone)]
pub struct Index {
    spec: IndexSpec,
    entries: Entries,
}

impl Index {
    fn empty(spec: IndexSpec) -> Self {
        let entries = if spec.unique {
            Entries::Unique(HashMap::new())
        } else {
            Entries::NonUnique(HashMap::new())
        };
        Self { spec, entries }
    }

    fn insert(&mut self, key: IndexKey, pos: usize) -> Result<()> {
        match &mut self.entries {
            Entries::Unique(map) => {
                if self.spec.strict && map.contains_key(&key) {
                    return Err(SheetError::DuplicateIndexKey {
                        columns: self.spec.columns.clone(),
                        key: format_key(&key),
                    });
                }
                if let Some(previous) = map.insert(key, pos) {
                    tracing::debug!(
                        "Row at position {} replaced row at position {} in unique index {:?}",
                        pos,
                        previous,
                        self.spec.columns
                    );
                }
            }
            Entries::NonUnique(map) => map.entry(key).or_default().push(pos),
        }
        Ok(())
    }

    #[must_use]
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Unique(map) => map.len(),
            Entries::NonUnique(map) => map.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row positions stored under `key`, in row order
    #[must_use]
    pub fn positions(&self, key: &[Option<CellValue>]) -> &[usize] {
        match &self.entries {
            Entries::Unique(map) => map.get(key).map(std::slice::from_ref).unwrap_or_default(),
            Entries::NonUnique(map) => map.get(key).map(Vec::as_slice).unwrap_or_default(),
        }
    }
}

fn format_key(key: &[Option<CellValue>]) -> String {
    let parts: Vec<String> = key
        .iter()
        .map(|value| match value {
            Some(value) => format!("{value:?}"),
            None => "None".to_string(),
        })
        .collect();
    format!("({})", parts.join(", "))
}

/// All indexes registered on one aggregate
#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    indexes: IndexMap<Vec<String>, Index>,
}

impl IndexSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `specs` (replacing any index over the same columns) and
    /// rebuild every registered index from `rows`.
    ///
    /// Either all indexes are rebuilt or, on error, the set is left untouched.
    pub fn build<R, I>(&mut self, specs: I, rows: &[R]) -> Result<()>
    where
        R: CellLookup,
        I: IntoIterator<Item = IndexSpec>,
    {
        let mut registered: IndexMap<Vec<String>, IndexSpec> = self
            .indexes
            .iter()
            .map(|(columns, index)| (columns.clone(), index.spec.clone()))
            .collect();
        for spec in specs {
            let spec = spec.canonical()?;
            registered.insert(spec.columns.clone(), spec);
        }
        self.indexes = scan(registered.into_values(), rows)?;
        Ok(())
    }

    /// Rebuild the registered indexes from `rows`
    pub fn rescan<R: CellLookup>(&mut self, rows: &[R]) -> Result<()> {
        if self.indexes.is_empty() {
            return Ok(());
        }
        let specs: Vec<IndexSpec> = self.specs().cloned().collect();
        self.indexes = scan(specs, rows)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.indexes.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn specs(&self) -> impl Iterator<Item = &IndexSpec> {
        self.indexes.values().map(|index| &index.spec)
    }

    /// The index over exactly these columns, in any order
    #[must_use]
    pub fn get<S: AsRef<str>>(&self, columns: &[S]) -> Option<&Index> {
        let mut columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        columns.sort();
        self.indexes.get(&columns)
    }

    fn resolve(&self, filter: &RowFilter) -> Result<(&Index, IndexKey)> {
        if filter.is_empty() {
            return Err(SheetError::InvalidArgument(
                "a filter needs at least one column".to_string(),
            ));
        }
        let (columns, key) = filter.split();
        match self.indexes.get(&columns) {
            Some(index) => Ok((index, key)),
            None => Err(SheetError::IndexNotFound { columns }),
        }
    }

    /// Position of the row matching `filter` through a unique index
    pub fn find_one(&self, filter: &RowFilter) -> Result<Option<usize>> {
        let (index, key) = self.resolve(filter)?;
        if !index.spec.unique {
            return Err(SheetError::IndexNotUnique {
                columns: index.spec.columns.clone(),
            });
        }
        Ok(index.positions(&key).first().copied())
    }

    /// Positions of all rows matching `filter`, through either kind of index
    pub fn find_all(&self, filter: &RowFilter) -> Result<Vec<usize>> {
        let (index, key) = self.resolve(filter)?;
        Ok(index.positions(&key).to_vec())
    }
}

fn scan<R, I>(specs: I, rows: &[R]) -> Result<IndexMap<Vec<String>, Index>>
where
    R: CellLookup,
    I: IntoIterator<Item = IndexSpec>,
{
    let mut indexes: IndexMap<Vec<String>, Index> = specs
        .into_iter()
        .map(|spec| (spec.columns.clone(), Index::empty(spec)))
        .collect();

    for (pos, row) in rows.iter().enumerate() {
        for index in indexes.values_mut() {
            let key = index
                .spec
                .columns
                .iter()
                .map(|title| {
                    row.cell(ColumnRef::Title(title))
                        .map(|cell| cell.value.clone())
                })
                .collect::<Result<IndexKey>>()?;
            index.insert(key, pos)?;
        }
    }
    Ok(indexes)
}
