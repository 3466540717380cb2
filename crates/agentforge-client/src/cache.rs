use std::path::Path;
use std::sync::Mutex;

use agentforge_core::{Agent, AgentId, AgentIdentity, AgentRepository, ClientId, ForgeError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

/// An agent parked locally because the repository was unreachable.
#[derive(Debug, Clone)]
pub struct CachedAgent {
    /// Identity key: client id for drafts, server id otherwise.
    pub key: String,
    pub agent: Agent,
    pub reason: String,
    pub cached_at: DateTime<Utc>,
}

/// Outcome of replaying the cache against the repository.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Cache key and the server id it now lives under.
    pub synced: Vec<(String, AgentId)>,
    /// Cache key and the error that kept it cached.
    pub failed: Vec<(String, String)>,
}

/// Local durable cache used when a save cannot reach the repository.
pub struct FallbackCache {
    conn: Mutex<Connection>,
}

impl FallbackCache {
    /// Open or create the cache database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| ForgeError::Database(format!("Failed to open fallback cache: {}", e)))?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ForgeError::Database(format!("Failed to open fallback cache: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;

             CREATE TABLE IF NOT EXISTS cached_agents (
                 key TEXT PRIMARY KEY,
                 agent_json TEXT NOT NULL,
                 reason TEXT NOT NULL DEFAULT '',
                 cached_at TEXT NOT NULL
             );",
        )
        .map_err(|e| ForgeError::Database(format!("Failed to initialize cache schema: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| ForgeError::Database(e.to_string()))
    }

    /// Store (or replace) an agent under its identity key. Returns the key.
    pub fn put(&self, agent: &Agent, reason: &str) -> Result<String> {
        let key = agent.identity.key().to_string();
        let json = serde_json::to_string(agent)?;
        self.conn()?
            .execute(
                "INSERT INTO cached_agents (key, agent_json, reason, cached_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                     agent_json = excluded.agent_json,
                     reason = excluded.reason,
                     cached_at = excluded.cached_at",
                params![key, json, reason, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ForgeError::Database(format!("Failed to cache agent: {}", e)))?;
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Result<Option<CachedAgent>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT key, agent_json, reason, cached_at FROM cached_agents WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| ForgeError::Database(e.to_string()))?;
        row.map(decode).transpose()
    }

    /// All cached agents, oldest first.
    pub fn list(&self) -> Result<Vec<CachedAgent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT key, agent_json, reason, cached_at FROM cached_agents ORDER BY cached_at")
            .map_err(|e| ForgeError::Database(format!("Failed to prepare query: {}", e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| ForgeError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let row = row.map_err(|e| ForgeError::Database(e.to_string()))?;
            entries.push(decode(row)?);
        }
        Ok(entries)
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM cached_agents WHERE key = ?1", params![key])
            .map_err(|e| ForgeError::Database(format!("Failed to remove cached agent: {}", e)))?;
        Ok(deleted > 0)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM cached_agents", [], |row| row.get(0))
            .map_err(|e| ForgeError::Database(e.to_string()))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replay every cached agent against `repo`.
    ///
    /// Persisted agents are updated under their server id; drafts are created
    /// and adopt the id the repository assigns. Accepted entries leave the
    /// cache; rejected ones stay for the next attempt.
    pub async fn flush(&self, repo: &dyn AgentRepository) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        for entry in self.list()? {
            let outcome = match entry.agent.id() {
                Some(id) => repo.update(id, &entry.agent).await,
                None => repo.create(&entry.agent).await,
            };
            match outcome {
                Ok(saved) => {
                    let Some(id) = saved.id().cloned() else {
                        report
                            .failed
                            .push((entry.key, "repository returned no id".to_string()));
                        continue;
                    };
                    self.remove(&entry.key)?;
                    info!(key = %entry.key, agent_id = %id, "Cached agent synced");
                    report.synced.push((entry.key, id));
                }
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "Cached agent still not accepted");
                    report.failed.push((entry.key, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

fn decode((key, json, reason, cached_at): (String, String, String, String)) -> Result<CachedAgent> {
    let mut agent: Agent = serde_json::from_str(&json)?;
    // Drafts carry no id on the wire; keep the placeholder they were cached under.
    if agent.identity.is_draft() {
        agent.identity = AgentIdentity::Draft(ClientId::from(key.as_str()));
    }
    Ok(CachedAgent {
        key,
        agent,
        reason,
        cached_at: DateTime::parse_from_rfc3339(&cached_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
