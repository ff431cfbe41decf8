use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::models::{Lap, LapType, StreamPoint};

/// Sport types considered runnable activities when listing
const RUN_SPORTS: [&str; 2] = ["Run", "Trail Run"];

/// Activity row enriched with totals from its last stream point
#[derive(Debug, Clone)]
pub struct ActivitySummary {
    pub activity_id: i64,
    pub name: Option<String>,
    pub sport_type: Option<String>,
    pub start_date_local: Option<NaiveDateTime>,
    pub duration_min: Option<f64>,
    pub distance_km: Option<f64>,
}

/// Database connection and management
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA journal_mode=WAL")?;
        self.conn.execute_batch("PRAGMA synchronous=NORMAL")?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                activity_id INTEGER PRIMARY KEY,
                name TEXT,
                sport_type TEXT,
                start_date_local TEXT,
                streams_status TEXT
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS stream_points (
                activity_id INTEGER NOT NULL,
                idx INTEGER NOT NULL,
                time_s INTEGER,
                distance_m REAL,
                velocity_m_s REAL,
                heartrate_bpm INTEGER,
                grade REAL,
                PRIMARY KEY (activity_id, idx)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS laps_auto (
                activity_id INTEGER NOT NULL,
                lap_type TEXT NOT NULL,
                lap_index INTEGER NOT NULL,
                start_idx INTEGER NOT NULL,
                end_idx INTEGER NOT NULL,
                start_time_s INTEGER,
                end_time_s INTEGER,
                duration_s INTEGER NOT NULL,
                distance_m REAL,
                pace_s_per_km REAL,
                avg_hr REAL,
                avg_grade REAL,
                PRIMARY KEY (activity_id, lap_type, lap_index)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_laps_auto_act ON laps_auto(activity_id)",
            [],
        )?;

        Ok(())
    }

    /// Insert or update an activity row
    pub fn upsert_activity(
        &self,
        activity_id: i64,
        name: &str,
        sport_type: &str,
        start_date_local: Option<NaiveDateTime>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO activities (activity_id, name, sport_type, start_date_local, streams_status)
            VALUES (?1, ?2, ?3, ?4, NULL)
            ON CONFLICT(activity_id) DO UPDATE SET
                name = excluded.name,
                sport_type = excluded.sport_type,
                start_date_local = excluded.start_date_local
            "#,
            params![activity_id, name, sport_type, start_date_local],
        )?;
        Ok(())
    }

    /// Replace the stored stream for an activity and mark its streams usable
    pub fn store_stream_points(&mut self, activity_id: i64, points: &[StreamPoint]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM stream_points WHERE activity_id = ?1",
            params![activity_id],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO stream_points
                    (activity_id, idx, time_s, distance_m, velocity_m_s, heartrate_bpm, grade)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for point in points {
                stmt.execute(params![
                    activity_id,
                    point.idx as i64,
                    point.time_s,
                    point.distance_m,
                    point.velocity_m_s,
                    point.heartrate_bpm,
                    point.grade,
                ])?;
            }
        }
        tx.execute(
            "UPDATE activities SET streams_status = 'OK' WHERE activity_id = ?1",
            params![activity_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Load the full ordered stream for one activity
    pub fn load_stream_points(&self, activity_id: i64) -> Result<Vec<StreamPoint>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT idx, time_s, distance_m, velocity_m_s, heartrate_bpm, grade
            FROM stream_points
            WHERE activity_id = ?1
            ORDER BY idx ASC
            "#,
        )?;

        let points = stmt
            .query_map(params![activity_id], |row| {
                Ok(StreamPoint {
                    idx: row.get::<_, i64>(0)? as usize,
                    time_s: row.get(1)?,
                    distance_m: row.get(2)?,
                    velocity_m_s: row.get(3)?,
                    heartrate_bpm: row.get(4)?,
                    grade: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(points)
    }

    /// Recent runnable activities with usable streams, newest first.
    /// Totals come from each activity's last stream point.
    pub fn list_recent_activities(&self, limit: usize) -> Result<Vec<ActivitySummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT activity_id, name, sport_type, start_date_local
            FROM activities
            WHERE sport_type IN (?1, ?2) AND streams_status = 'OK'
            ORDER BY start_date_local DESC
            LIMIT ?3
            "#,
        )?;

        let activities = stmt
            .query_map(
                params![RUN_SPORTS[0], RUN_SPORTS[1], limit as i64],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<NaiveDateTime>>(3)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(activities.len());
        for (activity_id, name, sport_type, start_date_local) in activities {
            let last: Option<(Option<i64>, Option<f64>)> = self
                .conn
                .query_row(
                    r#"
                    SELECT time_s, distance_m
                    FROM stream_points
                    WHERE activity_id = ?1
                    ORDER BY idx DESC
                    LIMIT 1
                    "#,
                    params![activity_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (time_s, distance_m) = last.unwrap_or((None, None));
            out.push(ActivitySummary {
                activity_id,
                name,
                sport_type,
                start_date_local,
                duration_min: time_s.map(|t| t as f64 / 60.0),
                distance_km: distance_m.map(|d| d / 1000.0),
            });
        }

        Ok(out)
    }

    /// Replace all structural laps for an activity in a single transaction.
    ///
    /// Always deletes the four structural types before inserting, so an
    /// empty slice clears stale rows and reruns are idempotent.
    pub fn replace_structural_laps(&mut self, activity_id: i64, laps: &[Lap]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            DELETE FROM laps_auto
            WHERE activity_id = ?1
              AND lap_type IN ('WARMUP', 'EFFORT', 'RECUP', 'COOLDOWN')
            "#,
            params![activity_id],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO laps_auto (
                    activity_id, lap_type, lap_index, start_idx, end_idx,
                    start_time_s, end_time_s, duration_s, distance_m,
                    pace_s_per_km, avg_hr, avg_grade
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for lap in laps {
                stmt.execute(params![
                    lap.activity_id,
                    lap.lap_type.as_str(),
                    lap.lap_index,
                    lap.start_idx as i64,
                    lap.end_idx as i64,
                    lap.start_time_s,
                    lap.end_time_s,
                    lap.duration_s,
                    lap.distance_m,
                    lap.pace_s_per_km,
                    lap.avg_hr,
                    lap.avg_grade,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored structural laps for an activity, in stream order
    pub fn load_laps(&self, activity_id: i64) -> Result<Vec<Lap>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT activity_id, lap_type, lap_index, start_idx, end_idx,
                   start_time_s, end_time_s, duration_s, distance_m,
                   pace_s_per_km, avg_hr, avg_grade
            FROM laps_auto
            WHERE activity_id = ?1
            ORDER BY start_idx ASC
            "#,
        )?;

        let laps = stmt
            .query_map(params![activity_id], |row| {
                let lap_type: String = row.get(1)?;
                let lap_type = lap_type.parse::<LapType>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?;
                Ok(Lap {
                    activity_id: row.get(0)?,
                    lap_type,
                    lap_index: row.get(2)?,
                    start_idx: row.get::<_, i64>(3)? as usize,
                    end_idx: row.get::<_, i64>(4)? as usize,
                    start_time_s: row.get(5)?,
                    end_time_s: row.get(6)?,
                    duration_s: row.get(7)?,
                    distance_m: row.get(8)?,
                    pace_s_per_km: row.get(9)?,
                    avg_hr: row.get(10)?,
                    avg_grade: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(laps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_points(n: usize) -> Vec<StreamPoint> {
        (0..n)
            .map(|i| StreamPoint {
                idx: i,
                time_s: Some(i as i64),
                distance_m: Some(i as f64 * 3.0),
                velocity_m_s: Some(3.0),
                heartrate_bpm: if i % 7 == 0 { None } else { Some(145) },
                grade: Some(0.5),
            })
            .collect()
    }

    fn sample_lap(activity_id: i64, lap_type: LapType, lap_index: u32) -> Lap {
        Lap {
            activity_id,
            lap_type,
            lap_index,
            start_idx: 0,
            end_idx: 10,
            start_time_s: Some(0),
            end_time_s: Some(10),
            duration_s: 10,
            distance_m: Some(30.0),
            pace_s_per_km: Some(333.3),
            avg_hr: Some(150.0),
            avg_grade: None,
        }
    }

    #[test]
    fn test_stream_points_round_trip() {
        let (_dir, mut db) = test_db();
        let points = sample_points(50);

        db.store_stream_points(7, &points).unwrap();
        let loaded = db.load_stream_points(7).unwrap();

        assert_eq!(loaded, points);
    }

    #[test]
    fn test_load_missing_activity_is_empty() {
        let (_dir, db) = test_db();
        assert!(db.load_stream_points(99).unwrap().is_empty());
    }

    #[test]
    fn test_replace_laps_is_idempotent() {
        let (_dir, mut db) = test_db();
        let laps = vec![
            sample_lap(3, LapType::Warmup, 1),
            sample_lap(3, LapType::Effort, 1),
        ];

        db.replace_structural_laps(3, &laps).unwrap();
        db.replace_structural_laps(3, &laps).unwrap();

        let stored = db.load_laps(3).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_replace_with_empty_clears() {
        let (_dir, mut db) = test_db();
        db.replace_structural_laps(3, &[sample_lap(3, LapType::Effort, 1)])
            .unwrap();

        db.replace_structural_laps(3, &[]).unwrap();
        assert!(db.load_laps(3).unwrap().is_empty());
    }

    #[test]
    fn test_replace_leaves_other_activities_alone() {
        let (_dir, mut db) = test_db();
        db.replace_structural_laps(1, &[sample_lap(1, LapType::Effort, 1)])
            .unwrap();
        db.replace_structural_laps(2, &[sample_lap(2, LapType::Effort, 1)])
            .unwrap();

        db.replace_structural_laps(1, &[]).unwrap();
        assert!(db.load_laps(1).unwrap().is_empty());
        assert_eq!(db.load_laps(2).unwrap().len(), 1);
    }

    #[test]
    fn test_list_recent_activities() {
        let (_dir, mut db) = test_db();
        let date = |s: &str| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
        };

        db.upsert_activity(1, "Morning intervals", "Run", Some(date("2026-07-01 08:00:00")))
            .unwrap();
        db.upsert_activity(2, "Trail long run", "Trail Run", Some(date("2026-07-03 09:00:00")))
            .unwrap();
        db.upsert_activity(3, "Spin", "Ride", Some(date("2026-07-04 18:00:00")))
            .unwrap();

        db.store_stream_points(1, &sample_points(120)).unwrap();
        db.store_stream_points(2, &sample_points(240)).unwrap();
        db.store_stream_points(3, &sample_points(60)).unwrap();

        let recent = db.list_recent_activities(10).unwrap();

        // Rides are excluded; newest run first
        let ids: Vec<i64> = recent.iter().map(|a| a.activity_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(recent[0].duration_min, Some(239.0 / 60.0));
        assert_eq!(recent[1].distance_km, Some(119.0 * 3.0 / 1000.0));
    }
}
