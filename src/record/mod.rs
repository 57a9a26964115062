pub mod schema;

use std::sync::Arc;
use log::trace;
use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;
use crate::core::{DbError, FieldMap, Result, Value};

pub use schema::{ID_COLUMN, RecordSchema, SchemaConfig};

/// One row held in memory.
///
/// Declared properties live in fixed slots ordered like the schema's
/// declarations; anything else lands in an insertion-ordered extras list.
/// Stored values are raw: casts run on every [`get`](Self::get) and never
/// write back.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    id: Value,
    slots: Vec<Value>,
    extras: FieldMap,
}

impl Record {
    /// Builds a record from key/value data. Unknown keys become extras.
    ///
    /// UUID variants get a fresh v4 identifier when `data` has no `id` key.
    /// An explicit `id` is kept as given, `Null` included, so hydrated rows
    /// never gain an identity the store does not have.
    pub fn new<I, K, V>(schema: Arc<RecordSchema>, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Self {
            slots: vec![Value::Null; schema.declared_properties().len()],
            schema,
            id: Value::Null,
            extras: Vec::new(),
        };

        let mut has_id = false;
        for (name, value) in data {
            let name: String = name.into();
            has_id |= name == ID_COLUMN;
            record.set(&name, value.into());
        }

        if record.schema.uses_uuid_ids() && !has_id {
            let id = Uuid::new_v4().to_string();
            trace!("generated id {} for new '{}' record", id, record.schema.name());
            record.id = Value::Text(id);
        }

        record
    }

    pub fn empty(schema: Arc<RecordSchema>) -> Self {
        Self::new(schema, std::iter::empty::<(String, Value)>())
    }

    /// Builds a record from a JSON object.
    pub fn from_json(schema: Arc<RecordSchema>, json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(Self::new(schema, map)),
            other => Err(DbError::TypeMismatch(format!(
                "Record data must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<Value>) {
        self.id = id.into();
    }

    /// Reads a property, applying its declared cast.
    pub fn get(&self, name: &str) -> Result<Value> {
        let raw = self.get_raw(name)?;
        if !self.schema.is_declared(name) {
            return Ok(raw.clone());
        }

        match self.schema.cast_for(name) {
            Some(kind) => kind.apply(name, raw),
            None => Ok(raw.clone()),
        }
    }

    /// Reads the stored value without casting.
    pub fn get_raw(&self, name: &str) -> Result<&Value> {
        if name == ID_COLUMN {
            return Ok(&self.id);
        }

        if let Some(idx) = self.schema.property_index(name) {
            return Ok(&self.slots[idx]);
        }

        self.extras
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .ok_or_else(|| DbError::UnknownProperty(name.to_string(), self.schema.name().to_string()))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();

        if name == ID_COLUMN {
            self.id = value;
            return;
        }

        if let Some(idx) = self.schema.property_index(name) {
            self.slots[idx] = value;
            return;
        }

        match self.extras.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.extras.push((name.to_string(), value)),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get_raw(name).is_ok()
    }

    pub fn extras(&self) -> &[(String, Value)] {
        &self.extras
    }

    /// `id`, then declared properties, then extras; values uncast.
    pub fn to_array(&self) -> FieldMap {
        let mut fields = Vec::with_capacity(1 + self.slots.len() + self.extras.len());
        fields.push((ID_COLUMN.to_string(), self.id.clone()));
        fields.extend(
            self.schema
                .declared_properties()
                .iter()
                .cloned()
                .zip(self.slots.iter().cloned()),
        );
        fields.extend(self.extras.iter().cloned());
        fields
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| DbError::ExecutionError(format!("Record serialization failed: {}", e)))
    }

    pub fn uses_uuid(&self) -> bool {
        self.schema.uses_uuid_ids()
    }

    pub fn uuid_columns(&self) -> &[String] {
        self.schema.uuid_columns()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.to_array();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (name, value) in &fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
