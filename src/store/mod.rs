//! SQLite-backed datastore for usage accounting and run records
//!
//! Two tables, both append-leaning:
//! - `usage_log`: write-once cost/usage rows, used only for reporting.
//! - `runs`: CI run records created on dispatch and mutated only by
//!   polling. Terminal records never move backwards.
//!
//! The connection sits behind a `Mutex`; every operation is a single short
//! statement, so contention is not a concern here.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;

/// Run lifecycle status: `queued -> running -> (done|failed|cancelled)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses never transition again
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Position in the lifecycle; updates never move a record to a lower rank
    const fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Done | Self::Failed | Self::Cancelled => 2,
        }
    }
}

/// A usage row about to be written
#[derive(Debug, Clone)]
pub struct NewUsageRow {
    pub route: String,
    pub provider: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
    pub cost_local: f64,
    pub currency: String,
    pub status: String,
}

/// Per-provider usage aggregate for reporting
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub provider: String,
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// A tracked CI run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: String,
    pub workflow: String,
    pub status: RunStatus,
    pub progress: u8,
    pub log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<u64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Thread-safe handle to the gateway datastore
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and apply the schema
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self, GatewayError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, GatewayError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS usage_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                prompt_tokens INTEGER NOT NULL,
                completion_tokens INTEGER NOT NULL,
                cost_usd REAL NOT NULL,
                cost_local REAL NOT NULL,
                currency TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_usage_provider ON usage_log(provider);
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                workflow TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL,
                log TEXT NOT NULL DEFAULT '[]',
                external_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append a usage row. Rows are write-once; there is no update path.
    pub fn insert_usage(&self, row: &NewUsageRow) -> Result<i64, GatewayError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO usage_log
                (route, provider, model, prompt_tokens, completion_tokens,
                 cost_usd, cost_local, currency, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.route,
                row.provider,
                row.model,
                row.prompt_tokens,
                row.completion_tokens,
                row.cost_usd,
                row.cost_local,
                row.currency,
                row.status,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Per-provider usage totals
    pub fn usage_summary(&self) -> Result<Vec<UsageSummary>, GatewayError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT provider, COUNT(*), SUM(prompt_tokens), SUM(completion_tokens), SUM(cost_usd)
             FROM usage_log GROUP BY provider ORDER BY provider",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UsageSummary {
                provider: row.get(0)?,
                requests: row.get(1)?,
                prompt_tokens: row.get(2)?,
                completion_tokens: row.get(3)?,
                cost_usd: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Create a fresh run record in `queued` at 10%, remembering which
    /// workflow it was dispatched for.
    pub fn create_run(&self, workflow: &str, first_log_line: &str) -> Result<RunRecord, GatewayError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let log = vec![first_log_line.to_string()];
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs (id, workflow, status, progress, log, external_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
            params![
                id,
                workflow,
                RunStatus::Queued.as_str(),
                10,
                serde_json::to_string(&log).unwrap_or_else(|_| "[]".to_string()),
                now,
            ],
        )?;
        Ok(RunRecord {
            id,
            workflow: workflow.to_string(),
            status: RunStatus::Queued,
            progress: 10,
            log,
            external_id: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch a run record by id
    pub fn get_run(&self, id: &str) -> Result<Option<RunRecord>, GatewayError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, workflow, status, progress, log, external_id, created_at, updated_at
             FROM runs WHERE id = ?1",
            params![id],
            row_to_run,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Remember which external CI run backs this record
    pub fn bind_external(&self, id: &str, external_id: u64) -> Result<(), GatewayError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs SET external_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, external_id as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Mirror externally-observed state onto a run record.
    ///
    /// Transitions are monotonic: a terminal record stays put and a running
    /// record never regresses to `queued`, whatever the poll reported.
    pub fn update_run(
        &self,
        id: &str,
        status: RunStatus,
        progress: u8,
        log_line: Option<&str>,
    ) -> Result<RunRecord, GatewayError> {
        let current = self
            .get_run(id)?
            .ok_or_else(|| GatewayError::NotFound(format!("run {id}")))?;
        if current.status.is_terminal() || status.rank() < current.status.rank() {
            debug!(
                run = id,
                status = current.status.as_str(),
                reported = status.as_str(),
                "ignoring backwards run transition"
            );
            return Ok(current);
        }

        let mut log = current.log;
        if let Some(line) = log_line {
            log.push(line.to_string());
        }
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs SET status = ?2, progress = ?3, log = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                id,
                status.as_str(),
                progress,
                serde_json::to_string(&log).unwrap_or_else(|_| "[]".to_string()),
                now,
            ],
        )?;
        Ok(RunRecord {
            id: current.id,
            workflow: current.workflow,
            status,
            progress,
            log,
            external_id: current.external_id,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, GatewayError> {
        self.conn
            .lock()
            .map_err(|_| GatewayError::Storage("datastore mutex poisoned".to_string()))
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let status_raw: String = row.get(2)?;
    let log_raw: String = row.get(4)?;
    let external_id: Option<i64> = row.get(5)?;
    Ok(RunRecord {
        id: row.get(0)?,
        workflow: row.get(1)?,
        status: RunStatus::parse(&status_raw).unwrap_or(RunStatus::Queued),
        progress: row.get(3)?,
        log: serde_json::from_str(&log_raw).unwrap_or_default(),
        external_id: external_id.map(|v| v as u64),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
