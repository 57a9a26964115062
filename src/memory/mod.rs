//! In-memory [`DbInterface`] implementation.
//!
//! Understands the SQL subset the table gateway emits plus hand-written
//! predicates of the same shape. Intended for tests and embedded use.

pub mod ast;
pub mod config;
pub mod eval;
pub mod parser;
pub mod pattern;
pub mod storage;

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};
use log::debug;
use lru::LruCache;
use uuid::Uuid;
use crate::core::{DbError, Result, Value};
use crate::interface::DbInterface;
use crate::result::QueryResult;
use ast::{ParsedStatement, Statement};
use parser::SqlParserAdapter;
use storage::Storage;

pub use config::MemoryConfig;
pub use storage::TableDef;

pub struct MemoryDb {
    config: MemoryConfig,
    storage: RwLock<Storage>,
    parser: SqlParserAdapter,
    statements: Option<Mutex<LruCache<String, Arc<ParsedStatement>>>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::build(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MemoryConfig) -> Self {
        let statements = NonZeroUsize::new(config.statement_cache_capacity)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));

        Self {
            config,
            storage: RwLock::new(Storage::new()),
            parser: SqlParserAdapter::new(),
            statements,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn define_table(&self, def: TableDef) -> Result<()> {
        debug!(
            "[{}] define table '{}' ({})",
            self.config.database,
            def.name(),
            def.column_names().join(", ")
        );
        self.storage.write()?.define(def)
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        debug!("[{}] drop table '{}'", self.config.database, name);
        self.storage.write()?.drop_table(name)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.storage.read()?.row_count(table)
    }

    fn prepare(&self, sql: &str) -> Result<Arc<ParsedStatement>> {
        let Some(statements) = &self.statements else {
            return self.parser.parse(sql).map(Arc::new);
        };

        if let Some(parsed) = statements.lock()?.get(sql) {
            debug!("[{}] statement cache hit", self.config.database);
            return Ok(Arc::clone(parsed));
        }

        debug!("[{}] statement cache miss: {}", self.config.database, sql);
        let parsed = Arc::new(self.parser.parse(sql)?);
        statements.lock()?.put(sql.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl DbInterface for MemoryDb {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let parsed = self.prepare(sql)?;

        if params.len() != parsed.param_count {
            return Err(DbError::ExecutionError(format!(
                "Statement expects {} parameters, got {}",
                parsed.param_count,
                params.len()
            )));
        }

        match &parsed.statement {
            Statement::Select(stmt) => self.storage.read()?.select(stmt, params),
            Statement::Insert(stmt) => self.storage.write()?.insert(stmt, params),
            Statement::Update(stmt) => self.storage.write()?.update(stmt, params),
            Statement::Delete(stmt) => self.storage.write()?.delete(stmt, params),
        }
    }

    fn insert_id(&self) -> Result<i64> {
        Ok(self.storage.read()?.last_insert_id())
    }

    fn uuid_to_bin(&self, uuid: &str) -> Result<Value> {
        let parsed = Uuid::parse_str(uuid)
            .map_err(|e| DbError::MalformedUuid(format!("'{}': {}", uuid, e)))?;

        let mut bytes = *parsed.as_bytes();
        if self.config.swap_uuid_time {
            bytes = swap_time_fields(bytes);
        }
        Ok(Value::Bytes(bytes.to_vec()))
    }

    fn bin_to_uuid(&self, bin: &Value) -> Result<String> {
        let raw = bin.as_bytes().ok_or_else(|| {
            DbError::MalformedUuid(format!("expected 16 bytes, got {} {}", bin.type_name(), bin))
        })?;
        let mut bytes: [u8; 16] = raw
            .try_into()
            .map_err(|_| DbError::MalformedUuid(format!("expected 16 bytes, got {}", raw.len())))?;

        if self.config.swap_uuid_time {
            bytes = unswap_time_fields(bytes);
        }
        Ok(Uuid::from_bytes(bytes).hyphenated().to_string())
    }
}

/// time_low | time_mid | time_hi  ->  time_hi | time_mid | time_low
fn swap_time_fields(b: [u8; 16]) -> [u8; 16] {
    let mut out = b;
    out[0..2].copy_from_slice(&b[6..8]);
    out[2..4].copy_from_slice(&b[4..6]);
    out[4..8].copy_from_slice(&b[0..4]);
    out
}

fn unswap_time_fields(b: [u8; 16]) -> [u8; 16] {
    let mut out = b;
    out[0..4].copy_from_slice(&b[4..8]);
    out[4..6].copy_from_slice(&b[2..4]);
    out[6..8].copy_from_slice(&b[0..2]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "6ccd780c-baba-1026-9564-5b8c656024db";

    fn users() -> MemoryDb {
        let db = MemoryDb::new();
        db.define_table(TableDef::new("users").auto_increment("id").column("name"))
            .unwrap();
        db
    }

    #[test]
    fn test_uuid_round_trip() {
        let db = MemoryDb::new();
        let bin = db.uuid_to_bin(SAMPLE).unwrap();
        assert_eq!(bin.as_bytes().map(<[u8]>::len), Some(16));
        assert_eq!(db.bin_to_uuid(&bin).unwrap(), SAMPLE);
    }

    #[test]
    fn test_swapped_uuid_layout() {
        let db = MemoryDb::with_config(MemoryConfig::default().swap_uuid_time(true)).unwrap();
        let bin = db.uuid_to_bin(SAMPLE).unwrap();

        // MySQL: UUID_TO_BIN('6ccd780c-baba-1026-9564-5b8c656024db', 1)
        let expected = Uuid::parse_str("1026baba-6ccd-780c-9564-5b8c656024db").unwrap();
        assert_eq!(bin, Value::Bytes(expected.as_bytes().to_vec()));
        assert_eq!(db.bin_to_uuid(&bin).unwrap(), SAMPLE);
    }

    #[test]
    fn test_malformed_uuid() {
        let db = MemoryDb::new();
        assert!(matches!(db.uuid_to_bin("not-a-uuid"), Err(DbError::MalformedUuid(_))));
        assert!(matches!(
            db.bin_to_uuid(&Value::Bytes(vec![1, 2, 3])),
            Err(DbError::MalformedUuid(_))
        ));
        assert!(matches!(
            db.bin_to_uuid(&Value::Text(SAMPLE.into())),
            Err(DbError::MalformedUuid(_))
        ));
    }

    #[test]
    fn test_param_count_checked() {
        let db = users();
        let err = db
            .execute("SELECT * FROM users WHERE id = ?", &[])
            .unwrap_err();
        assert!(matches!(err, DbError::ExecutionError(_)));
    }

    #[test]
    fn test_insert_id_and_cache_disabled() {
        let db = MemoryDb::with_config(MemoryConfig::default().statement_cache_capacity(0)).unwrap();
        db.define_table(TableDef::new("users").auto_increment("id").column("name"))
            .unwrap();

        for name in ["a", "b"] {
            db.execute("INSERT INTO users (name) VALUES (?)", &[Value::from(name)])
                .unwrap();
        }
        assert_eq!(db.insert_id().unwrap(), 2);
        assert_eq!(db.row_count("users").unwrap(), 2);
    }

    #[test]
    fn test_cached_statement_reused() {
        let db = users();
        let sql = "INSERT INTO users (name) VALUES (?)";
        db.execute(sql, &[Value::from("a")]).unwrap();

        let first = db.prepare(sql).unwrap();
        let second = db.prepare(sql).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_table() {
        let db = MemoryDb::new();
        assert!(matches!(
            db.execute("SELECT * FROM ghosts", &[]),
            Err(DbError::TableNotFound(_))
        ));
        assert!(MemoryDb::with_config(MemoryConfig::new("")).is_err());
    }
}
