use crate::detection::DetectionKind;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const DATABASE_FILE: &str = "detections.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: u64,
    pub kind: DetectionKind,
    pub input: String,
    pub is_phishing: bool,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: u64,
    pub log_id: u64,
    pub is_correct: bool,
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindStats {
    pub phishing: u64,
    pub safe: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub total_scans: u64,
    pub phishing_detected: u64,
    pub average_confidence: f64,
    pub by_kind: BTreeMap<DetectionKind, KindStats>,
    pub feedback_total: u64,
    pub feedback_correct: u64,
    pub first_scan: Option<DateTime<Utc>>,
    pub last_scan: Option<DateTime<Utc>>,
}

impl GlobalStats {
    /// Share of feedback entries that confirmed the verdict, if any feedback exists.
    pub fn feedback_accuracy(&self) -> Option<f64> {
        if self.feedback_total == 0 {
            None
        } else {
            Some(self.feedback_correct as f64 / self.feedback_total as f64)
        }
    }
}

/// Receives every verdict produced at the application boundary.
pub trait DetectionSink {
    fn record(
        &self,
        kind: DetectionKind,
        input: &str,
        is_phishing: bool,
        confidence: f64,
    ) -> Result<u64>;
}

/// SQLite-backed log of detections and user feedback. Ids are assigned by the database,
/// so several handles on the same file never hand out the same id.
pub struct DetectionLog {
    db_path: PathBuf,
    conn: Mutex<Connection>,
    truncate_chars: usize,
}

impl DetectionLog {
    pub fn new(dir: impl Into<PathBuf>, truncate_chars: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        let db_path = dir.join(DATABASE_FILE);
        let conn = Self::init_database(&db_path)?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
            truncate_chars,
        })
    }

    fn init_database(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).with_context(|| {
            format!("Failed to open detection database: {}", db_path.display())
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS detection_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                input TEXT NOT NULL,
                is_phishing INTEGER NOT NULL,
                confidence REAL NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                log_id INTEGER NOT NULL REFERENCES detection_logs(id),
                is_correct INTEGER NOT NULL,
                comments TEXT,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("detection log connection lock poisoned"))
    }

    /// All detections, oldest first.
    pub fn records(&self) -> Result<Vec<DetectionRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, input, is_phishing, confidence, timestamp
             FROM detection_logs ORDER BY id",
        )?;
        let records = stmt
            .query_map([], detection_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Most recent detections first.
    pub fn recent(&self, limit: usize) -> Result<Vec<DetectionRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, input, is_phishing, confidence, timestamp
             FROM detection_logs ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], detection_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn feedback(&self) -> Result<Vec<FeedbackRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, log_id, is_correct, comments, timestamp FROM feedback ORDER BY id",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(FeedbackRecord {
                    id: row.get::<_, i64>(0)? as u64,
                    log_id: row.get::<_, i64>(1)? as u64,
                    is_correct: row.get(2)?,
                    comments: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn record_feedback(
        &self,
        log_id: u64,
        is_correct: bool,
        comments: Option<String>,
    ) -> Result<u64> {
        let log_id = i64::try_from(log_id).map_err(|_| anyhow!("No detection with id {log_id}"))?;
        let conn = self.connection()?;
        let known = conn
            .query_row(
                "SELECT id FROM detection_logs WHERE id = ?1",
                params![log_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if known.is_none() {
            bail!("No detection with id {log_id}");
        }

        conn.execute(
            "INSERT INTO feedback (log_id, is_correct, comments, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![log_id, is_correct, comments, Utc::now()],
        )?;
        let id = conn.last_insert_rowid() as u64;
        log::info!("Recorded feedback for detection {log_id} (correct: {is_correct})");
        Ok(id)
    }

    pub fn stats(&self) -> Result<GlobalStats> {
        let conn = self.connection()?;
        let mut stats = GlobalStats::default();
        let mut confidence_sum = 0.0;

        let mut stmt = conn.prepare(
            "SELECT kind, is_phishing, COUNT(*), SUM(confidence), MIN(timestamp), MAX(timestamp)
             FROM detection_logs GROUP BY kind, is_phishing",
        )?;
        let groups = stmt
            .query_map([], |row| {
                Ok((
                    kind_from_row(row, 0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, i64>(2)? as u64,
                    row.get::<_, f64>(3)?,
                    row.get::<_, DateTime<Utc>>(4)?,
                    row.get::<_, DateTime<Utc>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (kind, is_phishing, count, confidence, first, last) in groups {
            stats.total_scans += count;
            confidence_sum += confidence;
            let kind_stats = stats.by_kind.entry(kind).or_default();
            if is_phishing {
                stats.phishing_detected += count;
                kind_stats.phishing += count;
            } else {
                kind_stats.safe += count;
            }
            stats.first_scan = Some(stats.first_scan.map_or(first, |t| t.min(first)));
            stats.last_scan = Some(stats.last_scan.map_or(last, |t| t.max(last)));
        }
        if stats.total_scans > 0 {
            stats.average_confidence = confidence_sum / stats.total_scans as f64;
        }

        let (total, correct) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_correct), 0) FROM feedback",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        stats.feedback_total = total as u64;
        stats.feedback_correct = correct as u64;
        Ok(stats)
    }

    /// Clears detections and feedback.
    pub fn reset(&self) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM feedback", [])?;
        tx.execute("DELETE FROM detection_logs", [])?;
        tx.commit()?;
        log::info!("Detection log cleared: {}", self.db_path.display());
        Ok(())
    }

    fn truncate(&self, input: &str) -> String {
        input.chars().take(self.truncate_chars).collect()
    }
}

impl DetectionSink for DetectionLog {
    fn record(
        &self,
        kind: DetectionKind,
        input: &str,
        is_phishing: bool,
        confidence: f64,
    ) -> Result<u64> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO detection_logs (kind, input, is_phishing, confidence, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kind.to_string(),
                self.truncate(input),
                is_phishing,
                confidence,
                Utc::now()
            ],
        )?;
        let id = conn.last_insert_rowid() as u64;
        log::debug!("Logged {} detection {} (phishing: {})", kind, id, is_phishing);
        Ok(id)
    }
}

fn detection_from_row(row: &Row<'_>) -> rusqlite::Result<DetectionRecord> {
    Ok(DetectionRecord {
        id: row.get::<_, i64>(0)? as u64,
        kind: kind_from_row(row, 1)?,
        input: row.get(2)?,
        is_phishing: row.get(3)?,
        confidence: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

fn kind_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DetectionKind> {
    let kind: String = row.get(idx)?;
    kind.parse()
        .map_err(|e: anyhow::Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_record_assigns_increasing_ids() {
        let dir = tempdir().unwrap();
        let log = DetectionLog::new(dir.path(), 100).unwrap();
        assert_eq!(log.record(DetectionKind::Url, "http://a", true, 0.9).unwrap(), 1);
        assert_eq!(log.record(DetectionKind::Email, "hi", false, 0.1).unwrap(), 2);

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, 2);
        assert_eq!(recent[1].kind, DetectionKind::Url);
        assert_eq!(log.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_input_is_truncated() {
        let dir = tempdir().unwrap();
        let log = DetectionLog::new(dir.path(), 5).unwrap();
        log.record(DetectionKind::Email, "héllo world", false, 0.1)
            .unwrap();
        assert_eq!(log.records().unwrap()[0].input, "héllo");
    }

    #[test]
    fn test_stats_aggregate_by_kind() {
        let dir = tempdir().unwrap();
        let log = DetectionLog::new(dir.path(), 100).unwrap();
        log.record(DetectionKind::Url, "http://a", true, 1.0).unwrap();
        log.record(DetectionKind::Url, "https://b", false, 0.2).unwrap();
        log.record(DetectionKind::Email, "prize", true, 0.9).unwrap();

        let stats = log.stats().unwrap();
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.phishing_detected, 2);
        assert!((stats.average_confidence - 0.7).abs() < 1e-9);
        assert_eq!(
            stats.by_kind[&DetectionKind::Url],
            KindStats {
                phishing: 1,
                safe: 1
            }
        );
        assert_eq!(stats.by_kind[&DetectionKind::Email].phishing, 1);
        assert!(stats.first_scan.is_some());
        assert!(stats.first_scan <= stats.last_scan);
        assert_eq!(stats.feedback_accuracy(), None);
    }

    #[test]
    fn test_feedback_requires_known_detection() {
        let dir = tempdir().unwrap();
        let log = DetectionLog::new(dir.path(), 100).unwrap();
        assert!(log.record_feedback(7, true, None).is_err());

        let id = log.record(DetectionKind::Url, "http://a", true, 0.9).unwrap();
        log.record_feedback(id, true, Some("spot on".to_string()))
            .unwrap();
        log.record_feedback(id, false, None).unwrap();

        let feedback = log.feedback().unwrap();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].log_id, id);
        assert_eq!(feedback[0].comments.as_deref(), Some("spot on"));

        let stats = log.stats().unwrap();
        assert_eq!(stats.feedback_total, 2);
        assert_eq!(stats.feedback_accuracy(), Some(0.5));
    }

    #[test]
    fn test_handles_on_same_database_share_ids() {
        let dir = tempdir().unwrap();
        let first = DetectionLog::new(dir.path(), 100).unwrap();
        let second = DetectionLog::new(dir.path(), 100).unwrap();
        let a = first.record(DetectionKind::Url, "http://a", true, 0.9).unwrap();
        let b = second.record(DetectionKind::Url, "http://b", false, 0.1).unwrap();
        assert_ne!(a, b);
        second.record_feedback(a, true, None).unwrap();
        assert_eq!(first.stats().unwrap().feedback_total, 1);
    }

    #[test]
    fn test_concurrent_writers_get_unique_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();
        DetectionLog::new(&path, 100).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let path = path.clone();
                thread::spawn(move || {
                    let log = DetectionLog::new(path, 100).unwrap();
                    (0..50)
                        .map(|i| {
                            log.record(DetectionKind::Email, &format!("{worker}-{i}"), false, 0.1)
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<u64> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        let unique: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(unique.len(), 200);

        let log = DetectionLog::new(&path, 100).unwrap();
        assert_eq!(log.stats().unwrap().total_scans, 200);
    }

    #[test]
    fn test_reset_clears_everything() {
        let dir = tempdir().unwrap();
        let log = DetectionLog::new(dir.path(), 100).unwrap();
        let id = log.record(DetectionKind::Url, "http://a", true, 0.9).unwrap();
        log.record_feedback(id, true, None).unwrap();
        log.reset().unwrap();
        assert_eq!(log.stats().unwrap(), GlobalStats::default());
        assert!(log.recent(10).unwrap().is_empty());
    }
}
