#![deny(warnings)]

//! Persistence layer: durable named parameter sets (presets) in SQLite.
//!
//! The backtest consumes presets through the [`PresetStore`] trait and treats
//! the store as authoritative. Parameters are stored as JSON text so new fields
//! with serde defaults load from older rows.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sim_core::{ParameterSet, Preset, PresetId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// Returns the default SQLite URL used for local presets.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/presets.db"
}

/// Whether a URL names an in-memory database.
pub fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a pool for `url`, creating the database file if needed, and apply
/// migrations.
///
/// In-memory databases live as long as their connection, so they get a single
/// connection that is never recycled.
pub async fn init_db(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url {url}"))?
        .create_if_missing(true);
    let pool_options = if is_memory_url(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };
    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open {url}"))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to apply migrations")?;
    debug!(url, "preset database ready");
    Ok(pool)
}

/// Durable store of named parameter sets.
#[allow(async_fn_in_trait)]
pub trait PresetStore {
    /// All presets, newest first.
    async fn list(&self) -> Result<Vec<Preset>>;
    /// Persist `parameters` under `name`.
    async fn create(&self, name: &str, parameters: &ParameterSet) -> Result<Preset>;
    /// Remove a preset. Unknown ids are an error.
    async fn delete(&self, id: PresetId) -> Result<()>;
}

/// [`PresetStore`] backed by an SQLite pool.
#[derive(Clone, Debug)]
pub struct SqlitePresetStore {
    pool: SqlitePool,
}

impl SqlitePresetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(init_db(url).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct PresetRow {
    id: i64,
    name: String,
    parameters: String,
    created_at: String,
}

impl PresetRow {
    fn into_preset(self) -> Result<Preset> {
        let parameters: ParameterSet = serde_json::from_str(&self.parameters)
            .with_context(|| format!("preset {} has unreadable parameters", self.id))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("preset {} has an invalid timestamp", self.id))?
            .with_timezone(&Utc);
        Ok(Preset {
            id: PresetId(self.id),
            name: self.name,
            parameters,
            created_at,
        })
    }
}

impl PresetStore for SqlitePresetStore {
    async fn list(&self) -> Result<Vec<Preset>> {
        let rows = sqlx::query_as::<_, PresetRow>(
            "SELECT id, name, parameters, created_at FROM presets ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list presets")?;
        let mut presets = rows
            .into_iter()
            .map(PresetRow::into_preset)
            .collect::<Result<Vec<_>>>()?;
        // Timestamps are compared parsed; RFC 3339 text with and without
        // fractional seconds does not sort chronologically. Stable, so equal
        // instants keep the id order.
        presets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(presets)
    }

    async fn create(&self, name: &str, parameters: &ParameterSet) -> Result<Preset> {
        let name = name.trim();
        if name.is_empty() {
            bail!("preset name must not be empty");
        }
        let parameters = parameters.renamed(name);
        let json = serde_json::to_string(&parameters)?;
        let created_at = Utc::now();
        let id = sqlx::query("INSERT INTO presets (name, parameters, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(&json)
            .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to save preset {name:?}"))?
            .last_insert_rowid();
        info!(id, name, "preset saved");
        Ok(Preset {
            id: PresetId(id),
            name: name.to_string(),
            parameters,
            created_at,
        })
    }

    async fn delete(&self, id: PresetId) -> Result<()> {
        let affected = sqlx::query("DELETE FROM presets WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete preset {id}"))?
            .rows_affected();
        if affected == 0 {
            bail!("preset {id} not found");
        }
        info!(%id, "preset deleted");
        Ok(())
    }
}
