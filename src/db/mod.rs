//! Database module - SQLite history of solved plans

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::model::SolveStatus;
use crate::plan::Plan;

/// Objective noise tolerated before a new plan counts as worse
pub const REGRESSION_TOLERANCE: f64 = 1e-6;

/// Saved plan record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlan {
    pub id: Option<i64>,
    pub date: DateTime<Utc>,
    pub fingerprint: String, // Catalog hash the plan was solved from
    pub objective_kind: String,
    pub status: SolveStatus,
    pub objective: f64,
    pub plan: Plan,
}

impl StoredPlan {
    pub fn new(fingerprint: String, plan: Plan) -> Self {
        Self {
            id: None,
            date: Utc::now(),
            fingerprint,
            objective_kind: plan.objective_kind.clone(),
            status: plan.status,
            objective: plan.objective,
            plan,
        }
    }
}

/// Raw `plans` row, plan JSON not yet parsed
struct PlanRow {
    id: i64,
    date: String,
    fingerprint: String,
    objective_kind: String,
    objective: f64,
    plan: String,
}

impl PlanRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            fingerprint: row.get(2)?,
            objective_kind: row.get(3)?,
            objective: row.get(4)?,
            plan: row.get(5)?,
        })
    }

    fn into_stored(self) -> Result<StoredPlan> {
        let id = self.id;
        let plan = Plan::from_json(&self.plan).with_context(|| format!("Stored plan {id} is corrupt"))?;
        Ok(StoredPlan {
            id: Some(id),
            date: DateTime::parse_from_rfc3339(&self.date)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            fingerprint: self.fingerprint,
            objective_kind: self.objective_kind,
            status: plan.status,
            objective: self.objective,
            plan,
        })
    }
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("Failed to open database {path}"))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                objective_kind TEXT NOT NULL,
                status TEXT NOT NULL,
                objective REAL NOT NULL,
                plan TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS plans_by_catalog ON plans (fingerprint, objective_kind)",
            [],
        )?;
        Ok(())
    }

    /// Add new plan record
    pub fn add_plan(&self, stored: &StoredPlan) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO plans (date, fingerprint, objective_kind, status, objective, plan) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stored.date.to_rfc3339(),
                stored.fingerprint,
                stored.objective_kind,
                stored.status.as_str(),
                stored.objective,
                stored.plan.to_json()?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get all plans, newest first
    pub fn get_plans(&self) -> Result<Vec<StoredPlan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, fingerprint, objective_kind, objective, plan FROM plans ORDER BY date DESC, id DESC",
        )?;

        let rows = stmt.query_map([], PlanRow::from_row)?.collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(PlanRow::into_stored).collect()
    }

    pub fn get_plan(&self, id: i64) -> Result<Option<StoredPlan>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, fingerprint, objective_kind, objective, plan FROM plans WHERE id = ?1",
                params![id],
                PlanRow::from_row,
            )
            .optional()?;
        row.map(PlanRow::into_stored).transpose()
    }

    /// Lowest stored objective for a catalog and objective kind, counting
    /// only solved plans
    pub fn best_objective(&self, fingerprint: &str, objective_kind: &str) -> Result<Option<f64>> {
        let best = self
            .conn
            .query_row(
                "SELECT MIN(objective) FROM plans
                 WHERE fingerprint = ?1 AND objective_kind = ?2 AND status IN ('optimal', 'feasible')",
                params![fingerprint, objective_kind],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()?;
        Ok(best.flatten())
    }

    /// Best stored objective when `stored` does worse than it on the same
    /// catalog and objective kind
    pub fn regression(&self, stored: &StoredPlan) -> Result<Option<f64>> {
        let best = self.best_objective(&stored.fingerprint, &stored.objective_kind)?;
        Ok(best.filter(|&best| stored.objective > best + REGRESSION_TOLERANCE))
    }
}
