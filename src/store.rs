use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};
use crate::models::{
    Application, FinalResult, FollowUpTracker, Interaction, InteractionKind, Interview,
    InterviewMode, InterviewStatus, RoundOutcome,
};

/// Everything the engine needs to rebuild its in-memory state.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub applications: Vec<Application>,
    pub interviews: Vec<Interview>,
}

/// Abstract storage port. The engine mutates in memory first and then
/// calls one of these; which backend sits behind the trait is resolved
/// once at startup.
pub trait Store {
    fn load(&self) -> Result<Snapshot>;
    fn save_application(&self, app: &Application, is_new: bool) -> Result<()>;
    fn delete_application(&self, id: &str) -> Result<()>;
    fn save_interview(&self, interview: &Interview, is_new: bool) -> Result<()>;
    fn delete_interview(&self, id: &str) -> Result<()>;
    /// Bulk replace, used by import.
    fn replace_all(&self, apps: &[Application], interviews: &[Interview]) -> Result<()>;
}

// --- SQLite backend ---

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> PathBuf {
        // XDG data directory, or the working directory as a fallback.
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "pursuit") {
            proj_dirs.data_dir().join("pursuit.db")
        } else {
            PathBuf::from("pursuit.db")
        }
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id TEXT PRIMARY KEY,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                contact TEXT,
                via_vendor INTEGER NOT NULL DEFAULT 0,
                vendor_name TEXT,
                opportunity_type TEXT,
                work_mode TEXT,
                city TEXT,
                expected_salary INTEGER,
                notice_period TEXT,
                skills TEXT NOT NULL DEFAULT '[]',
                description TEXT,
                current_stage INTEGER NOT NULL,
                final_result TEXT,
                created_at TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                fu_active INTEGER NOT NULL DEFAULT 0,
                fu_attempts INTEGER NOT NULL DEFAULT 0,
                fu_last_follow_up TEXT,
                fu_next_reminder TEXT,
                fu_deadline_days INTEGER,
                fu_context TEXT
            );

            CREATE TABLE IF NOT EXISTS interactions (
                id TEXT PRIMARY KEY,
                application_id TEXT NOT NULL REFERENCES applications(id),
                kind TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                at TEXT NOT NULL,
                interview_id TEXT,
                seq INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS interviews (
                id TEXT PRIMARY KEY,
                application_id TEXT NOT NULL REFERENCES applications(id),
                round INTEGER NOT NULL,
                kind TEXT NOT NULL,
                mode TEXT NOT NULL,
                scheduled_at TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                location TEXT,
                interviewer TEXT,
                prep_notes TEXT,
                status TEXT NOT NULL,
                round_outcome TEXT NOT NULL,
                reminder_minutes INTEGER NOT NULL,
                reminder_sent INTEGER NOT NULL DEFAULT 0,
                outcome_notes TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_interactions_app ON interactions(application_id);
            CREATE INDEX IF NOT EXISTS idx_interviews_app ON interviews(application_id);
            "#,
        )?;
        Ok(())
    }

    fn insert_application(&self, app: &Application, replace: bool) -> Result<()> {
        let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
        let sql = format!(
            "{verb} INTO applications (
                id, company, role, contact, via_vendor, vendor_name,
                opportunity_type, work_mode, city, expected_salary,
                notice_period, skills, description, current_stage,
                final_result, created_at, last_updated,
                fu_active, fu_attempts, fu_last_follow_up, fu_next_reminder,
                fu_deadline_days, fu_context
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                      ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)"
        );
        self.conn.execute(
            &sql,
            params![
                app.id,
                app.company,
                app.role,
                app.contact,
                app.via_vendor as i64,
                app.vendor_name,
                app.opportunity_type,
                app.work_mode,
                app.city,
                app.expected_salary,
                app.notice_period,
                serde_json::to_string(&app.skills)?,
                app.description,
                i64::from(app.current_stage),
                app.final_result.map(|r| r.to_string()),
                app.created_at.to_rfc3339(),
                app.last_updated.to_rfc3339(),
                app.follow_up.is_active as i64,
                i64::from(app.follow_up.attempts),
                app.follow_up.last_follow_up_at.map(|t| t.to_rfc3339()),
                app.follow_up.next_reminder_at.map(|t| t.to_rfc3339()),
                app.follow_up.hr_deadline_days,
                app.follow_up.waiting_context,
            ],
        )?;

        // Interactions are append-only in memory; rewriting the child rows
        // wholesale keeps the upsert simple.
        self.conn.execute(
            "DELETE FROM interactions WHERE application_id = ?1",
            [&app.id],
        )?;
        for (seq, interaction) in app.interactions.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO interactions (id, application_id, kind, notes, at, interview_id, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    interaction.id,
                    app.id,
                    interaction.kind.as_str(),
                    interaction.notes,
                    interaction.at.to_rfc3339(),
                    interaction.interview_id,
                    seq as i64,
                ],
            )?;
        }
        Ok(())
    }

    fn insert_interview(&self, iv: &Interview, replace: bool) -> Result<()> {
        let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
        let sql = format!(
            "{verb} INTO interviews (
                id, application_id, round, kind, mode, scheduled_at,
                duration_minutes, location, interviewer, prep_notes, status,
                round_outcome, reminder_minutes, reminder_sent, outcome_notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                      ?13, ?14, ?15, ?16)"
        );
        self.conn.execute(
            &sql,
            params![
                iv.id,
                iv.application_id,
                i64::from(iv.round),
                iv.kind,
                iv.mode.to_string(),
                iv.scheduled_at.to_rfc3339(),
                i64::from(iv.duration_minutes),
                iv.location,
                iv.interviewer,
                iv.prep_notes,
                iv.status.to_string(),
                iv.round_outcome.as_str(),
                i64::from(iv.reminder_minutes),
                iv.reminder_sent as i64,
                iv.outcome_notes,
                iv.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_interactions(&self, application_id: &str) -> Result<Vec<Interaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, notes, at, interview_id FROM interactions
             WHERE application_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map([application_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut interactions = Vec::new();
        for row in rows {
            let (id, kind, notes, at, interview_id) = row?;
            interactions.push(Interaction {
                id,
                kind: InteractionKind::parse(&kind)
                    .ok_or_else(|| TrackerError::Storage(format!("unknown interaction kind '{kind}'")))?,
                notes,
                at: parse_ts(&at)?,
                interview_id,
            });
        }
        Ok(interactions)
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrackerError::Storage(format!("bad timestamp '{s}': {e}")))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(&s)).transpose()
}

impl Store for SqliteStore {
    fn load(&self) -> Result<Snapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT id, company, role, contact, via_vendor, vendor_name,
                    opportunity_type, work_mode, city, expected_salary,
                    notice_period, skills, description, current_stage,
                    final_result, created_at, last_updated,
                    fu_active, fu_attempts, fu_last_follow_up, fu_next_reminder,
                    fu_deadline_days, fu_context
             FROM applications ORDER BY created_at",
        )?;
        #[allow(clippy::type_complexity)]
        let rows: Vec<(
            String,
            String,
            String,
            Option<String>,
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<i64>,
            Option<String>,
            String,
            Option<String>,
            i64,
            Option<String>,
            String,
            String,
            i64,
            i64,
            Option<String>,
            Option<String>,
            Option<i64>,
            Option<String>,
        )> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                    row.get(11)?,
                    row.get(12)?,
                    row.get(13)?,
                    row.get(14)?,
                    row.get(15)?,
                    row.get(16)?,
                    row.get(17)?,
                    row.get(18)?,
                    row.get(19)?,
                    row.get(20)?,
                    row.get(21)?,
                    row.get(22)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut applications = Vec::with_capacity(rows.len());
        for row in rows {
            let (
                id,
                company,
                role,
                contact,
                via_vendor,
                vendor_name,
                opportunity_type,
                work_mode,
                city,
                expected_salary,
                notice_period,
                skills,
                description,
                current_stage,
                final_result,
                created_at,
                last_updated,
                fu_active,
                fu_attempts,
                fu_last,
                fu_next,
                fu_deadline,
                fu_context,
            ) = row;

            let interactions = self.load_interactions(&id)?;
            let final_result = match final_result {
                Some(s) => Some(FinalResult::parse(&s).ok_or_else(|| {
                    TrackerError::Storage(format!("unknown final result '{s}'"))
                })?),
                None => None,
            };
            applications.push(Application {
                id,
                company,
                role,
                contact,
                via_vendor: via_vendor != 0,
                vendor_name,
                opportunity_type,
                work_mode,
                city,
                expected_salary,
                notice_period,
                skills: serde_json::from_str(&skills)?,
                description,
                current_stage: current_stage as u8,
                final_result,
                created_at: parse_ts(&created_at)?,
                last_updated: parse_ts(&last_updated)?,
                interactions,
                follow_up: FollowUpTracker {
                    is_active: fu_active != 0,
                    attempts: fu_attempts as u32,
                    last_follow_up_at: parse_opt_ts(fu_last)?,
                    next_reminder_at: parse_opt_ts(fu_next)?,
                    hr_deadline_days: fu_deadline,
                    waiting_context: fu_context,
                },
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, round, kind, mode, scheduled_at,
                    duration_minutes, location, interviewer, prep_notes,
                    status, round_outcome, reminder_minutes, reminder_sent,
                    outcome_notes, created_at
             FROM interviews ORDER BY scheduled_at",
        )?;
        #[allow(clippy::type_complexity)]
        let iv_rows: Vec<(
            String,
            String,
            i64,
            String,
            String,
            String,
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            String,
            i64,
            i64,
            Option<String>,
            String,
        )> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                    row.get(11)?,
                    row.get(12)?,
                    row.get(13)?,
                    row.get(14)?,
                    row.get(15)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut interviews = Vec::with_capacity(iv_rows.len());
        for (
            id,
            application_id,
            round,
            kind,
            mode,
            scheduled_at,
            duration_minutes,
            location,
            interviewer,
            prep_notes,
            status,
            round_outcome,
            reminder_minutes,
            reminder_sent,
            outcome_notes,
            created_at,
        ) in iv_rows
        {
            interviews.push(Interview {
                id,
                application_id,
                round: round as u32,
                kind,
                mode: InterviewMode::parse(&mode)
                    .ok_or_else(|| TrackerError::Storage(format!("unknown mode '{mode}'")))?,
                scheduled_at: parse_ts(&scheduled_at)?,
                duration_minutes: duration_minutes as u32,
                location,
                interviewer,
                prep_notes,
                status: InterviewStatus::parse(&status)
                    .ok_or_else(|| TrackerError::Storage(format!("unknown status '{status}'")))?,
                round_outcome: RoundOutcome::parse(&round_outcome).ok_or_else(|| {
                    TrackerError::Storage(format!("unknown outcome '{round_outcome}'"))
                })?,
                reminder_minutes: reminder_minutes as u32,
                reminder_sent: reminder_sent != 0,
                outcome_notes,
                created_at: parse_ts(&created_at)?,
            });
        }

        Ok(Snapshot {
            applications,
            interviews,
        })
    }

    fn save_application(&self, app: &Application, is_new: bool) -> Result<()> {
        self.insert_application(app, !is_new)
    }

    fn delete_application(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM interactions WHERE application_id = ?1", [id])?;
        self.conn.execute("DELETE FROM applications WHERE id = ?1", [id])?;
        Ok(())
    }

    fn save_interview(&self, interview: &Interview, is_new: bool) -> Result<()> {
        self.insert_interview(interview, !is_new)
    }

    fn delete_interview(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM interviews WHERE id = ?1", [id])?;
        Ok(())
    }

    fn replace_all(&self, apps: &[Application], interviews: &[Interview]) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM interactions; DELETE FROM interviews; DELETE FROM applications;",
        )?;
        for app in apps {
            self.insert_application(app, false)?;
        }
        for iv in interviews {
            self.insert_interview(iv, false)?;
        }
        Ok(())
    }
}

// --- In-memory backend (test fake) ---

/// Storage fake for tests: keeps the last-saved snapshot and can be told
/// to fail, to exercise the optimistic-write contract.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    inner: std::cell::RefCell<Snapshot>,
    fail_writes: std::cell::Cell<bool>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.get() {
            Err(TrackerError::Storage("simulated write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl Store for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        let inner = self.inner.borrow();
        Ok(Snapshot {
            applications: inner.applications.clone(),
            interviews: inner.interviews.clone(),
        })
    }

    fn save_application(&self, app: &Application, is_new: bool) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.borrow_mut();
        if let Some(existing) = inner.applications.iter_mut().find(|a| a.id == app.id) {
            *existing = app.clone();
        } else if is_new {
            inner.applications.push(app.clone());
        } else {
            return Err(TrackerError::Storage(format!(
                "update of unknown application '{}'",
                app.id
            )));
        }
        Ok(())
    }

    fn delete_application(&self, id: &str) -> Result<()> {
        self.check()?;
        self.inner.borrow_mut().applications.retain(|a| a.id != id);
        Ok(())
    }

    fn save_interview(&self, interview: &Interview, is_new: bool) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.borrow_mut();
        if let Some(existing) = inner.interviews.iter_mut().find(|iv| iv.id == interview.id) {
            *existing = interview.clone();
        } else if is_new {
            inner.interviews.push(interview.clone());
        } else {
            return Err(TrackerError::Storage(format!(
                "update of unknown interview '{}'",
                interview.id
            )));
        }
        Ok(())
    }

    fn delete_interview(&self, id: &str) -> Result<()> {
        self.check()?;
        self.inner.borrow_mut().interviews.retain(|iv| iv.id != id);
        Ok(())
    }

    fn replace_all(&self, apps: &[Application], interviews: &[Interview]) -> Result<()> {
        self.check()?;
        *self.inner.borrow_mut() = Snapshot {
            applications: apps.to_vec(),
            interviews: interviews.to_vec(),
        };
        Ok(())
    }
}
