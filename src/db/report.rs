//! Backtest report rows

use crate::db::Database;
use crate::error::ArbResult;
use chrono::Utc;
use rusqlite::{params, Result as SqlResult, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub id: Option<i64>,
    /// Identifies every report written by one invocation
    pub run_id: String,
    pub pipeline: String,
    pub symbol: String,
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub trades: i64,
    pub cumulative_profit: f64,
    pub cumulative_profit_normalized: f64,
    pub elapsed_minutes: Option<f64>,
    pub unit: String,
    pub created_at: String,
}

const COLUMNS: &str = "id, run_id, pipeline, symbol, buy_exchange, sell_exchange, trades,
    cumulative_profit, cumulative_profit_normalized, elapsed_minutes, unit, created_at";

impl BacktestReport {
    /// Parse a row from the database
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(BacktestReport {
            id: Some(row.get(0)?),
            run_id: row.get(1)?,
            pipeline: row.get(2)?,
            symbol: row.get(3)?,
            buy_exchange: row.get(4)?,
            sell_exchange: row.get(5)?,
            trades: row.get(6)?,
            cumulative_profit: row.get(7)?,
            cumulative_profit_normalized: row.get(8)?,
            elapsed_minutes: row.get(9)?,
            unit: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    /// Insert the report, stamping `created_at` when it is empty
    pub fn insert(&self, db: &Database) -> ArbResult<i64> {
        let created_at = if self.created_at.is_empty() {
            Utc::now().to_rfc3339()
        } else {
            self.created_at.clone()
        };

        let conn = db.lock()?;
        conn.execute(
            "INSERT INTO backtest_reports (
                run_id, pipeline, symbol, buy_exchange, sell_exchange, trades,
                cumulative_profit, cumulative_profit_normalized, elapsed_minutes, unit, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                self.run_id,
                self.pipeline,
                self.symbol,
                self.buy_exchange,
                self.sell_exchange,
                self.trades,
                self.cumulative_profit,
                self.cumulative_profit_normalized,
                self.elapsed_minutes,
                self.unit,
                created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All reports of one run, best normalized profit first
    pub fn list_by_run(db: &Database, run_id: &str) -> ArbResult<Vec<Self>> {
        let conn = db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM backtest_reports WHERE run_id = ?1
             ORDER BY cumulative_profit_normalized DESC",
            COLUMNS
        ))?;

        let rows = stmt.query_map(params![run_id], |row| Self::from_row(row))?;
        Ok(rows.collect::<SqlResult<Vec<_>>>()?)
    }

    /// Most recent reports across all runs
    pub fn list_recent(db: &Database, limit: usize) -> ArbResult<Vec<Self>> {
        let conn = db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM backtest_reports ORDER BY id DESC LIMIT ?1",
            COLUMNS
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| Self::from_row(row))?;
        Ok(rows.collect::<SqlResult<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(run_id: &str, pipeline: &str, normalized: f64) -> BacktestReport {
        BacktestReport {
            id: None,
            run_id: run_id.to_string(),
            pipeline: pipeline.to_string(),
            symbol: "BTC/EUR".to_string(),
            buy_exchange: "kraken".to_string(),
            sell_exchange: "bitstamp".to_string(),
            trades: 3,
            cumulative_profit: 30.0,
            cumulative_profit_normalized: normalized,
            elapsed_minutes: Some(120.0),
            unit: "fiat".to_string(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_report_insert_and_list() {
        let db = Database::new_in_memory().unwrap();
        db.run_migrations().unwrap();

        report("run-1", "BTC_EUR_kraken_bitstamp", 50.0).insert(&db).unwrap();
        report("run-1", "ETH_EUR_kraken_bitstamp", 80.0).insert(&db).unwrap();
        report("run-2", "BTC_EUR_kraken_bitstamp", 10.0).insert(&db).unwrap();

        let run = BacktestReport::list_by_run(&db, "run-1").unwrap();
        assert_eq!(run.len(), 2);
        assert_eq!(run[0].pipeline, "ETH_EUR_kraken_bitstamp");
        assert!(!run[0].created_at.is_empty());

        let recent = BacktestReport::list_recent(&db, 1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].run_id, "run-2");
    }
}
