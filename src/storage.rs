use crate::types::{OutageInterval, StoredInterval};
use chrono::NaiveDate;
use chrono_tz::Tz;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Chave do histórico de intervalos.
pub const INTERVALS_KEY: &str = "intervals";
/// Chave da data do último relatório semanal enviado.
pub const LAST_REPORT_DATE_KEY: &str = "stats_last_sent_date";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Mapa chave-valor persistente. Os valores são documentos JSON.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Store em arquivo sqlite. Abre uma conexão por operação e a fecha ao final.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        // Garante que o arquivo e a tabela existem já na inicialização
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection = Connection::open(&self.path)?;
        connection.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(connection)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Acesso tipado ao histórico de intervalos e à data do último relatório.
///
/// Todos os timestamps lidos são convertidos para o fuso `tz`.
pub struct IntervalStore<S> {
    kv: S,
    tz: Tz,
}

impl<S: KeyValueStore> IntervalStore<S> {
    pub fn new(kv: S, tz: Tz) -> Self {
        Self { kv, tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Lê o histórico completo; vazio se a chave ainda não existe.
    pub fn load_intervals(&self) -> Result<Vec<OutageInterval>, StoreError> {
        let Some(raw) = self.kv.get(INTERVALS_KEY)? else {
            return Ok(Vec::new());
        };
        let stored: Vec<StoredInterval> = serde_json::from_str(&raw)?;
        Ok(stored
            .iter()
            .map(|interval| OutageInterval::from_stored(interval, &self.tz))
            .collect())
    }

    /// Substitui o histórico inteiro.
    pub fn save_intervals(&self, intervals: &[OutageInterval]) -> Result<(), StoreError> {
        let stored: Vec<StoredInterval> = intervals.iter().map(OutageInterval::to_stored).collect();
        let raw = serde_json::to_string(&stored)?;
        self.kv.set(INTERVALS_KEY, &raw)
    }

    pub fn load_last_report_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        match self.kv.get(LAST_REPORT_DATE_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save_last_report_date(&self, date: NaiveDate) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&date)?;
        self.kv.set(LAST_REPORT_DATE_KEY, &raw)
    }
}
