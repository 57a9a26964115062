use std::collections::BTreeMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::core::{CastKind, DbError, Result};

/// Name of the identity column every record carries.
pub const ID_COLUMN: &str = "id";

/// Describes one record variant: its declared properties, read casts and
/// UUID behaviour.
///
/// # Examples
///
/// ```
/// use tablegate::{CastKind, RecordSchema};
///
/// let users = RecordSchema::new("user")
///     .property("name")
///     .property("age")
///     .cast("age", CastKind::Int)
///     .uses_uuid(true)
///     .uuid_column("team_id")
///     .into_shared();
///
/// assert!(users.is_uuid_column("id"));
/// assert!(users.is_uuid_column("team_id"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    properties: Vec<String>,
    casts: BTreeMap<String, CastKind>,
    uses_uuid: bool,
    uuid_columns: Vec<String>,
}

impl RecordSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: Vec::new(),
            casts: BTreeMap::new(),
            uses_uuid: false,
            uuid_columns: Vec::new(),
        }
    }

    /// Declares a property. `id` and repeated names are ignored.
    pub fn property(mut self, name: &str) -> Self {
        if name != ID_COLUMN && !self.properties.iter().any(|p| p == name) {
            self.properties.push(name.to_string());
        }
        self
    }

    pub fn properties<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, |schema, name| schema.property(name))
    }

    pub fn cast(mut self, name: &str, kind: CastKind) -> Self {
        self.casts.insert(name.to_string(), kind);
        self
    }

    pub fn uses_uuid(mut self, uses_uuid: bool) -> Self {
        self.uses_uuid = uses_uuid;
        self
    }

    /// Declares an additional column stored as binary UUID.
    pub fn uuid_column(mut self, name: &str) -> Self {
        if name != ID_COLUMN && !self.uuid_columns.iter().any(|c| c == name) {
            self.uuid_columns.push(name.to_string());
        }
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Loads a schema from its JSON configuration form.
    ///
    /// ```
    /// use tablegate::RecordSchema;
    ///
    /// let schema = RecordSchema::from_json(r#"{
    ///     "name": "post",
    ///     "properties": ["title", "published"],
    ///     "casts": { "published": "bool" }
    /// }"#).unwrap();
    /// assert_eq!(schema.declared_properties().len(), 2);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchemaConfig = serde_json::from_str(json)
            .map_err(|e| DbError::ParseError(format!("Invalid schema config: {}", e)))?;
        Self::try_from(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared properties in declaration order, excluding `id`.
    pub fn declared_properties(&self) -> &[String] {
        &self.properties
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p == name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        name == ID_COLUMN || self.property_index(name).is_some()
    }

    pub fn cast_for(&self, name: &str) -> Option<CastKind> {
        self.casts.get(name).copied()
    }

    pub fn casts(&self) -> &BTreeMap<String, CastKind> {
        &self.casts
    }

    pub fn uses_uuid_ids(&self) -> bool {
        self.uses_uuid
    }

    pub fn uuid_columns(&self) -> &[String] {
        &self.uuid_columns
    }

    /// True for every column whose values cross the store boundary as binary.
    pub fn is_uuid_column(&self, name: &str) -> bool {
        if name == ID_COLUMN {
            return self.uses_uuid;
        }
        self.uuid_columns.iter().any(|c| c == name)
    }
}

/// Serializable configuration form of a [`RecordSchema`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub casts: BTreeMap<String, String>,
    #[serde(default)]
    pub uses_uuid: bool,
    #[serde(default)]
    pub uuid_columns: Vec<String>,
}

impl TryFrom<SchemaConfig> for RecordSchema {
    type Error = DbError;

    fn try_from(config: SchemaConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(DbError::ParseError("Schema name cannot be empty".into()));
        }

        let mut schema = RecordSchema::new(&config.name)
            .properties(config.properties.iter().map(String::as_str))
            .uses_uuid(config.uses_uuid);

        for (property, tag) in &config.casts {
            if !schema.is_declared(property) {
                return Err(DbError::ParseError(format!(
                    "Cast declared for undeclared property '{}'",
                    property
                )));
            }
            schema = schema.cast(property, tag.parse()?);
        }

        for column in &config.uuid_columns {
            schema = schema.uuid_column(column);
        }

        Ok(schema)
    }
}

impl From<&RecordSchema> for SchemaConfig {
    fn from(schema: &RecordSchema) -> Self {
        Self {
            name: schema.name.clone(),
            properties: schema.properties.clone(),
            casts: schema
                .casts
                .iter()
                .map(|(name, kind)| (name.clone(), kind.to_string()))
                .collect(),
            uses_uuid: schema.uses_uuid,
            uuid_columns: schema.uuid_columns.clone(),
        }
    }
}
