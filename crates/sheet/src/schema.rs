//! Declarative wire mapping.
//!
//! Every entity describes itself as a table of fields, each pairing a wire
//! name with a loader and a dumper. A single generic routine walks that table
//! in both directions, so entity modules never hand-write (de)serialization.

use crate::error::{Result, SheetError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// Options that control how wire objects are turned into entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Reject fields the schema does not know instead of skipping them
    pub strict_validation: bool,
}

impl LoadOptions {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_validation: true,
        }
    }

    #[must_use]
    pub fn lenient() -> Self {
        Self {
            strict_validation: false,
        }
    }
}

pub type Loader<T> = fn(&mut T, JsonValue, &LoadOptions) -> Result<()>;
pub type Dumper<T> = fn(&T) -> Option<JsonValue>;

/// One row of an entity's mapping table
pub struct Field<T> {
    wire: &'static str,
    load: Option<Loader<T>>,
    dump: Dumper<T>,
}

impl<T> Field<T> {
    pub fn new(wire: &'static str, load: Loader<T>, dump: Dumper<T>) -> Self {
        Self {
            wire,
            load: Some(load),
            dump,
        }
    }

    /// A field that is sent to the server but never read back
    pub fn write_only(wire: &'static str, dump: Dumper<T>) -> Self {
        Self {
            wire,
            load: None,
            dump,
        }
    }

    pub fn wire(&self) -> &'static str {
        self.wire
    }
}

/// Mapping table for one entity type
pub struct Schema<T> {
    entity: &'static str,
    fields: Vec<Field<T>>,
    by_wire: HashMap<&'static str, usize>,
}

impl<T> Schema<T> {
    pub fn new(entity: &'static str, fields: Vec<Field<T>>) -> Self {
        let by_wire = fields
            .iter()
            .enumerate()
            .map(|(pos, field)| (field.wire, pos))
            .collect();
        Self {
            entity,
            fields,
            by_wire,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field<T>> {
        self.fields.iter()
    }

    /// Populate `target` from a JSON object.
    ///
    /// `null` leaves the field at its default. Unknown keys are an error in
    /// strict mode and skipped otherwise.
    pub fn load_into(&self, target: &mut T, value: JsonValue, opts: &LoadOptions) -> Result<()> {
        let JsonValue::Object(map) = value else {
            return Err(SheetError::Parse(format!(
                "expected a JSON object for {}",
                self.entity
            )));
        };

        for (key, raw) in map {
            let Some(field) = self.by_wire.get(key.as_str()).map(|&pos| &self.fields[pos]) else {
                if opts.strict_validation {
                    return Err(SheetError::UnknownField {
                        entity: self.entity,
                        field: key,
                    });
                }
                tracing::debug!("Skipping unknown field '{}' of {}", key, self.entity);
                continue;
            };
            let Some(load) = field.load else {
                continue;
            };
            if raw.is_null() {
                continue;
            }
            load(target, raw, opts).map_err(|e| match e {
                SheetError::Parse(message) => SheetError::InvalidField {
                    entity: self.entity,
                    field: field.wire,
                    message,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// Render `source` as a JSON object, skipping absent values.
    ///
    /// When `only` is given, just the listed wire names are emitted.
    pub fn dump(&self, source: &T, only: Option<&[&str]>) -> JsonValue {
        let mut map = Map::new();
        for field in &self.fields {
            if let Some(only) = only {
                if !only.contains(&field.wire) {
                    continue;
                }
            }
            if let Some(value) = (field.dump)(source) {
                map.insert(field.wire.to_string(), value);
            }
        }
        JsonValue::Object(map)
    }
}

/// An object that can be loaded from and dumped to the wire through its schema
pub trait Entity: Default + Sized + 'static {
    fn schema() -> &'static Schema<Self>;

    /// Runs once every field has been loaded
    fn finish_load(&mut self) -> Result<()> {
        Ok(())
    }

    fn load(value: JsonValue, opts: &LoadOptions) -> Result<Self> {
        let mut obj = Self::default();
        Self::schema().load_into(&mut obj, value, opts)?;
        obj.finish_load()?;
        Ok(obj)
    }

    fn dump(&self, only: Option<&[&str]>) -> JsonValue {
        Self::schema().dump(self, only)
    }
}

/// Decode a field through serde.
pub fn decode<T: DeserializeOwned>(value: JsonValue) -> Result<T> {
    serde_json::from_value(value).map_err(|e| SheetError::Parse(e.to_string()))
}

/// Encode a field through serde; `null` counts as absent.
pub fn encode<T: Serialize>(value: &T) -> Option<JsonValue> {
    serde_json::to_value(value).ok().filter(|v| !v.is_null())
}

/// Load a nested array of entities.
pub fn load_list<E: Entity>(value: JsonValue, opts: &LoadOptions) -> Result<Vec<E>> {
    match value {
        JsonValue::Array(items) => items.into_iter().map(|item| E::load(item, opts)).collect(),
        other => Err(SheetError::Parse(format!("expected an array, got {other}"))),
    }
}

/// Dump a nested array of entities in full.
pub fn dump_list<E: Entity>(items: &[E]) -> Option<JsonValue> {
    Some(JsonValue::Array(
        items.iter().map(|item| item.dump(None)).collect(),
    ))
}

/// Build a [`Field`] for a struct member.
///
/// `field!(Cell: "columnId" => column_id)` goes through serde;
/// `with load, dump` plugs in custom codecs; `write_only` fields are dumped
/// but ignored when loading.
macro_rules! field {
    ($ty:ty: $wire:literal => $($path:ident).+) => {
        $crate::schema::Field::new(
            $wire,
            |obj: &mut $ty, value: serde_json::Value, _opts: &$crate::schema::LoadOptions| {
                obj.$($path).+ = $crate::schema::decode(value)?;
                Ok(())
            },
            |obj: &$ty| $crate::schema::encode(&obj.$($path).+),
        )
    };
    ($ty:ty: $wire:literal => $($path:ident).+, with $load:path, $dump:path) => {
        $crate::schema::Field::new(
            $wire,
            |obj: &mut $ty, value: serde_json::Value, opts: &$crate::schema::LoadOptions| {
                obj.$($path).+ = $load(value, opts)?;
                Ok(())
            },
            |obj: &$ty| $dump(&obj.$($path).+),
        )
    };
    ($ty:ty: write_only $wire:literal => $($path:ident).+) => {
        $crate::schema::Field::write_only($wire, |obj: &$ty| {
            $crate::schema::encode(&obj.$($path).+)
        })
    };
}

pub(crate) use field;
