// Tag registry - which media path each tag identifier points at
// One SQLite file, two tables: `meta` (schema version) and `music` (bindings)

use crate::error::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

pub const SCHEMA_VERSION: &str = "1.0";

pub struct TagRegistry {
    conn: Connection,
}

impl TagRegistry {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let registry = Self { conn };
        registry.initialize_tables()?;
        Ok(registry)
    }

    pub fn in_memory() -> Result<Self> {
        let registry = Self { conn: Connection::open_in_memory()? };
        registry.initialize_tables()?;
        Ok(registry)
    }

    fn initialize_tables(&self) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'meta')",
            [],
            |row| row.get(0),
        )?;

        if !exists {
            info!("Creating database...");
            let tx = self.conn.unchecked_transaction()?;
            tx.execute_batch(
                "CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT);
                 CREATE TABLE music (uuid TEXT PRIMARY KEY, path TEXT NOT NULL);",
            )?;
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('version', ?1)",
                params![SCHEMA_VERSION],
            )?;
            tx.commit()?;
            info!("Done.");
            return Ok(());
        }

        // Older registries stored the version as a REAL
        let version: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                Ok(match row.get::<_, Value>(0)? {
                    Value::Text(s) => s,
                    Value::Real(f) => format!("{:.1}", f),
                    Value::Integer(i) => format!("{}.0", i),
                    _ => String::new(),
                })
            })
            .optional()?;
        match version.as_deref() {
            Some(SCHEMA_VERSION) => debug!("Registry schema version {}", SCHEMA_VERSION),
            Some(other) => warn!("Registry schema version {} is not {}, continuing anyway", other, SCHEMA_VERSION),
            None => warn!("Registry has no schema version marker"),
        }
        Ok(())
    }

    /// Media path bound to `id`, normalized.
    pub fn lookup(&self, id: &str) -> Result<PathBuf> {
        let path: Option<String> = self
            .conn
            .query_row("SELECT path FROM music WHERE uuid = ?1", params![id], |row| row.get(0))
            .optional()?;

        match path {
            Some(p) => {
                let path = normalize_path(Path::new(&p));
                info!("Found {}", path.display());
                Ok(path)
            }
            None => Err(Error::NoPath { id: id.to_string() }),
        }
    }

    /// Binds `id` to `path`. Both must contain something other than whitespace.
    pub fn insert(&self, id: &str, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if is_blank(id) || is_blank(&path_str) {
            return Err(Error::InvalidEntry {
                id: id.to_string(),
                path: path_str.into_owned(),
            });
        }

        self.conn.execute(
            "INSERT INTO music (uuid, path) VALUES (?1, ?2)",
            params![id, path_str.as_ref()],
        )?;
        debug!("Committed {} -> {}", id, path_str);
        Ok(())
    }

    /// Removing an unknown id succeeds.
    pub fn delete(&self, id: &str) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM music WHERE uuid = ?1", params![id])?;
        debug!("Deleted {} row(s) for {}", removed, id);
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<PathBuf>> {
        Ok(self.list_entries()?.into_iter().map(|(_, path)| path).collect())
    }

    pub fn list_entries(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut stmt = self.conn.prepare("SELECT uuid, path FROM music ORDER BY path")?;
        let entries = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let path: String = row.get(1)?;
                Ok((id, normalize_path(Path::new(&path))))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Lexical normalization: drops `.`, folds `..` into its parent and strips
/// trailing separators. Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
