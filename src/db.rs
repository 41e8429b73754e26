use crate::entity::EntityRef;
use crate::error::{Result, SeoError};
use crate::models::{
    MetadataRecord, NewMetadataRecord, NewRegisteredDefault, RegisteredModelDefault,
};
use crate::store::{MetadataStore, RecordFilter, ViewNameFilter};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const RECORD_COLUMNS: &str = "id, view_name, entity_type, entity_id, lang_code, has_parameters, \
                              path, title, description, priority";

const DEFAULT_COLUMNS: &str = "id, entity_type, lang_code, title, description";

/// SQLite-backed metadata store.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and make sure the tables exist.
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                view_name TEXT,
                entity_type TEXT,
                entity_id INTEGER,
                lang_code TEXT NOT NULL,
                has_parameters INTEGER NOT NULL DEFAULT 0,
                path TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                priority INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_metadata_records_path
                ON metadata_records (path);
            CREATE INDEX IF NOT EXISTS idx_metadata_records_entity
                ON metadata_records (entity_type, entity_id);
            CREATE TABLE IF NOT EXISTS registered_defaults (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type TEXT NOT NULL,
                lang_code TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT ''
            );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SeoError::LockPoisoned)
    }

    fn query_records(&self, sql: &str, values: Vec<Value>) -> Result<Vec<MetadataRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MetadataRecord> {
    let entity_type: Option<String> = row.get(2)?;
    let entity_id: Option<i64> = row.get(3)?;
    Ok(MetadataRecord {
        id: row.get(0)?,
        view_name: row.get(1)?,
        entity: entity_type
            .zip(entity_id)
            .map(|(type_tag, id)| EntityRef { type_tag, id }),
        lang_code: row.get(4)?,
        has_parameters: row.get::<_, i64>(5)? != 0,
        path: row.get(6)?,
        title: row.get(7)?,
        description: row.get(8)?,
        priority: row.get(9)?,
    })
}

fn default_from_row(row: &Row<'_>) -> rusqlite::Result<RegisteredModelDefault> {
    Ok(RegisteredModelDefault {
        id: row.get(0)?,
        type_tag: row.get(1)?,
        lang_code: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
    })
}

impl MetadataStore for Database {
    fn get_record(&self, id: i64) -> Result<Option<MetadataRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM metadata_records WHERE id = ?1"),
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn records_by_path(&self, path: &str, lang_codes: &[&str]) -> Result<Vec<MetadataRecord>> {
        if lang_codes.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; lang_codes.len()].join(", ");
        let mut values = vec![Value::Text(path.to_string())];
        values.extend(lang_codes.iter().map(|code| Value::Text(code.to_string())));
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM metadata_records
                 WHERE path = ? AND lang_code IN ({placeholders})
                 ORDER BY id"
            ),
            values,
        )
    }

    fn abstract_records(
        &self,
        lang_code: &str,
        min_priority: i64,
    ) -> Result<Vec<MetadataRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM metadata_records
                 WHERE has_parameters = 1 AND lang_code = ? AND priority >= ?
                 ORDER BY priority DESC, id"
            ),
            vec![Value::Text(lang_code.to_string()), Value::Integer(min_priority)],
        )
    }

    fn records_for_entity(
        &self,
        entity: &EntityRef,
        lang_code: Option<&str>,
    ) -> Result<Vec<MetadataRecord>> {
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM metadata_records
             WHERE entity_type = ? AND entity_id = ?"
        );
        let mut values = vec![
            Value::Text(entity.type_tag.clone()),
            Value::Integer(entity.id),
        ];
        if let Some(lang_code) = lang_code {
            sql.push_str(" AND lang_code = ?");
            values.push(Value::Text(lang_code.to_string()));
        }
        sql.push_str(" ORDER BY id");
        self.query_records(&sql, values)
    }

    fn unbound_records(&self, lang_code: &str) -> Result<Vec<MetadataRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM metadata_records
                 WHERE entity_type IS NULL AND lang_code = ?
                 ORDER BY id"
            ),
            vec![Value::Text(lang_code.to_string())],
        )
    }

    fn view_record_exists(&self, view_name: &str, lang_code: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM metadata_records WHERE view_name = ?1 AND lang_code = ?2",
            params![view_name, lang_code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<MetadataRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(lang_code) = &filter.lang_code {
            clauses.push("lang_code = ?");
            values.push(Value::Text(lang_code.clone()));
        }
        if let Some(has_parameters) = filter.has_parameters {
            clauses.push("has_parameters = ?");
            values.push(Value::Integer(has_parameters as i64));
        }
        match filter.has_entity {
            Some(true) => clauses.push("entity_type IS NOT NULL"),
            Some(false) => clauses.push("entity_type IS NULL"),
            None => {}
        }
        match &filter.view_name {
            ViewNameFilter::Any => {}
            ViewNameFilter::Missing => clauses.push("view_name IS NULL"),
            ViewNameFilter::Named(name) => {
                clauses.push("LOWER(view_name) = LOWER(?)");
                values.push(Value::Text(name.clone()));
            }
        }
        if let Some(entity_type) = &filter.entity_type {
            clauses.push("entity_type = ?");
            values.push(Value::Text(entity_type.clone()));
        }
        if let Some(search) = &filter.search {
            clauses.push("(path LIKE ? OR view_name LIKE ?)");
            let pattern = format!("%{}%", search);
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }

        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM metadata_records");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY path, lang_code, id");
        self.query_records(&sql, values)
    }

    fn view_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT view_name FROM metadata_records
             WHERE view_name IS NOT NULL
             ORDER BY view_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn create_record(&self, record: &NewMetadataRecord) -> Result<MetadataRecord> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO metadata_records
                (view_name, entity_type, entity_id, lang_code, has_parameters,
                 path, title, description, priority)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.view_name,
                record.entity.as_ref().map(|e| e.type_tag.as_str()),
                record.entity.as_ref().map(|e| e.id),
                record.lang_code,
                record.has_parameters,
                record.path,
                record.title,
                record.description,
                record.priority,
            ],
        )?;

        Ok(MetadataRecord {
            id: conn.last_insert_rowid(),
            view_name: record.view_name.clone(),
            entity: record.entity.clone(),
            lang_code: record.lang_code.clone(),
            has_parameters: record.has_parameters,
            path: record.path.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            priority: record.priority,
        })
    }

    fn update_record(&self, record: &MetadataRecord) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE metadata_records SET
                view_name = ?1, entity_type = ?2, entity_id = ?3, lang_code = ?4,
                has_parameters = ?5, path = ?6, title = ?7, description = ?8,
                priority = ?9
             WHERE id = ?10",
            params![
                record.view_name,
                record.entity.as_ref().map(|e| e.type_tag.as_str()),
                record.entity.as_ref().map(|e| e.id),
                record.lang_code,
                record.has_parameters,
                record.path,
                record.title,
                record.description,
                record.priority,
                record.id,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    fn delete_record(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected =
            conn.execute("DELETE FROM metadata_records WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    fn delete_records_for_entity(&self, entity: &EntityRef) -> Result<usize> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM metadata_records WHERE entity_type = ?1 AND entity_id = ?2",
            params![entity.type_tag, entity.id],
        )?;
        Ok(rows_affected)
    }

    fn registered_defaults(
        &self,
        type_tag: &str,
        lang_code: Option<&str>,
    ) -> Result<Vec<RegisteredModelDefault>> {
        let conn = self.conn()?;
        let mut sql =
            format!("SELECT {DEFAULT_COLUMNS} FROM registered_defaults WHERE entity_type = ?");
        let mut values = vec![Value::Text(type_tag.to_string())];
        if let Some(lang_code) = lang_code {
            sql.push_str(" AND lang_code = ?");
            values.push(Value::Text(lang_code.to_string()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let defaults = stmt
            .query_map(params_from_iter(values.iter()), default_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(defaults)
    }

    fn registered_types(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT entity_type FROM registered_defaults ORDER BY entity_type",
        )?;
        let types = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(types)
    }

    fn create_registered_default(
        &self,
        default: &NewRegisteredDefault,
    ) -> Result<RegisteredModelDefault> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO registered_defaults (entity_type, lang_code, title, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                default.type_tag,
                default.lang_code,
                default.title,
                default.description
            ],
        )?;

        Ok(RegisteredModelDefault {
            id: conn.last_insert_rowid(),
            type_tag: default.type_tag.clone(),
            lang_code: default.lang_code.clone(),
            title: default.title.clone(),
            description: default.description.clone(),
        })
    }

    fn update_registered_default(&self, default: &RegisteredModelDefault) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE registered_defaults
             SET entity_type = ?1, lang_code = ?2, title = ?3, description = ?4
             WHERE id = ?5",
            params![
                default.type_tag,
                default.lang_code,
                default.title,
                default.description,
                default.id
            ],
        )?;
        Ok(rows_affected > 0)
    }

    fn delete_registered_default(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected =
            conn.execute("DELETE FROM registered_defaults WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }
}
