use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::error::{Result, TrackerError};
use crate::models::{
    Interview, InterviewDraft, InterviewMode, InterviewStatus, InterviewUpdate, RoundOutcome,
};
use uuid::Uuid;

const DEFAULT_DURATION_MINUTES: u32 = 60;
const DEFAULT_REMINDER_MINUTES: u32 = 30;

/// In-memory store of interview rounds with validation and the temporal
/// query surface. Owned by the engine; persistence happens one level up
/// through the storage port.
#[derive(Debug, Default)]
pub struct InterviewService {
    interviews: Vec<Interview>,
}

impl InterviewService {
    pub fn new(interviews: Vec<Interview>) -> Self {
        Self { interviews }
    }

    pub fn all(&self) -> &[Interview] {
        &self.interviews
    }

    pub fn get(&self, id: &str) -> Option<&Interview> {
        self.interviews.iter().find(|iv| iv.id == id)
    }

    /// Create a round for `application_id`. The round number is always
    /// max existing + 1 for that application; deleted rounds leave gaps
    /// that are never refilled.
    pub fn schedule(
        &mut self,
        application_id: &str,
        draft: InterviewDraft,
        now: DateTime<Utc>,
    ) -> Result<Interview> {
        let mut errors = Vec::new();
        if application_id.trim().is_empty() {
            errors.push("application reference is required".to_string());
        }
        if draft.scheduled_at.is_none() {
            errors.push("scheduled time is required".to_string());
        }
        if draft.kind.as_deref().map_or(true, |k| k.trim().is_empty()) {
            errors.push("interview type is required".to_string());
        }
        if draft.mode.is_none() {
            errors.push("interview mode is required".to_string());
        }
        if !errors.is_empty() {
            return Err(TrackerError::Validation(errors));
        }

        let interview = Interview {
            id: Uuid::new_v4().to_string(),
            application_id: application_id.to_string(),
            round: self.next_round_number(application_id),
            kind: draft.kind.unwrap_or_default().trim().to_string(),
            mode: draft.mode.unwrap_or(InterviewMode::Video),
            scheduled_at: draft.scheduled_at.unwrap_or(now),
            duration_minutes: draft.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            location: draft.location,
            interviewer: draft.interviewer,
            prep_notes: draft.prep_notes,
            status: InterviewStatus::Scheduled,
            round_outcome: RoundOutcome::Pending,
            reminder_minutes: draft.reminder_minutes.unwrap_or(DEFAULT_REMINDER_MINUTES),
            reminder_sent: false,
            outcome_notes: None,
            created_at: now,
        };
        self.interviews.push(interview.clone());
        Ok(interview)
    }

    /// Apply edits. Identity fields (id, application, round, created_at)
    /// cannot be changed through this path.
    pub fn update(&mut self, id: &str, update: InterviewUpdate) -> Result<Interview> {
        let iv = self
            .interviews
            .iter_mut()
            .find(|iv| iv.id == id)
            .ok_or_else(|| TrackerError::not_found("interview", id))?;

        if let Some(at) = update.scheduled_at {
            iv.scheduled_at = at;
        }
        if let Some(kind) = update.kind {
            iv.kind = kind;
        }
        if let Some(mode) = update.mode {
            iv.mode = mode;
        }
        if let Some(minutes) = update.duration_minutes {
            iv.duration_minutes = minutes;
        }
        if update.location.is_some() {
            iv.location = update.location;
        }
        if update.interviewer.is_some() {
            iv.interviewer = update.interviewer;
        }
        if update.prep_notes.is_some() {
            iv.prep_notes = update.prep_notes;
        }
        if let Some(status) = update.status {
            iv.status = status;
        }
        if let Some(minutes) = update.reminder_minutes {
            iv.reminder_minutes = minutes;
        }
        Ok(iv.clone())
    }

    /// Mark the round completed with its outcome. Used by the engine's
    /// set-round-outcome operation.
    pub fn complete_round(
        &mut self,
        id: &str,
        outcome: RoundOutcome,
        notes: Option<String>,
    ) -> Result<Interview> {
        let iv = self
            .interviews
            .iter_mut()
            .find(|iv| iv.id == id)
            .ok_or_else(|| TrackerError::not_found("interview", id))?;
        iv.status = InterviewStatus::Completed;
        iv.round_outcome = outcome;
        iv.outcome_notes = notes;
        Ok(iv.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Interview> {
        let pos = self
            .interviews
            .iter()
            .position(|iv| iv.id == id)
            .ok_or_else(|| TrackerError::not_found("interview", id))?;
        Ok(self.interviews.remove(pos))
    }

    /// Explicit cascade for application deletion. Returns the removed
    /// rounds so the caller can delete them from storage too.
    pub fn remove_for_application(&mut self, application_id: &str) -> Vec<Interview> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.interviews)
            .into_iter()
            .partition(|iv| iv.application_id == application_id);
        self.interviews = kept;
        removed
    }

    // --- Round numbering ---

    pub fn next_round_number(&self, application_id: &str) -> u32 {
        self.latest_round(application_id).map_or(1, |iv| iv.round + 1)
    }

    pub fn latest_round(&self, application_id: &str) -> Option<&Interview> {
        self.interviews
            .iter()
            .filter(|iv| iv.application_id == application_id)
            .max_by_key(|iv| iv.round)
    }

    // --- Temporal queries ---

    /// All rounds for one application, chronological.
    pub fn for_application(&self, application_id: &str) -> Vec<&Interview> {
        let mut rounds: Vec<&Interview> = self
            .interviews
            .iter()
            .filter(|iv| iv.application_id == application_id)
            .collect();
        rounds.sort_by_key(|iv| iv.scheduled_at);
        rounds
    }

    /// Still-scheduled rounds in the future, soonest first.
    pub fn upcoming(&self, now: DateTime<Utc>, limit: Option<usize>) -> Vec<&Interview> {
        let mut rounds: Vec<&Interview> = self
            .interviews
            .iter()
            .filter(|iv| iv.status == InterviewStatus::Scheduled && iv.scheduled_at > now)
            .collect();
        rounds.sort_by_key(|iv| iv.scheduled_at);
        if let Some(limit) = limit {
            rounds.truncate(limit);
        }
        rounds
    }

    /// Rounds with `from <= scheduled_at < to`, chronological.
    pub fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&Interview> {
        let mut rounds: Vec<&Interview> = self
            .interviews
            .iter()
            .filter(|iv| iv.scheduled_at >= from && iv.scheduled_at < to)
            .collect();
        rounds.sort_by_key(|iv| iv.scheduled_at);
        rounds
    }

    pub fn on_day(&self, day: NaiveDate) -> Vec<&Interview> {
        let from = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        self.in_range(from, from + Duration::days(1))
    }

    pub fn today(&self, now: DateTime<Utc>) -> Vec<&Interview> {
        self.on_day(now.date_naive())
    }

    /// Rounds in the ISO week containing `now` (Monday through Sunday).
    pub fn in_week(&self, now: DateTime<Utc>) -> Vec<&Interview> {
        let week = now.date_naive().week(Weekday::Mon);
        let from = week.first_day().and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        self.in_range(from, from + Duration::days(7))
    }

    pub fn in_month(&self, now: DateTime<Utc>) -> Vec<&Interview> {
        let date = now.date_naive();
        self.interviews_in_month(date.year(), date.month())
    }

    fn interviews_in_month(&self, year: i32, month: u32) -> Vec<&Interview> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)
            .unwrap_or_default()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let to = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap_or_default()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        self.in_range(from, to)
    }

    /// Rounds whose reminder window is open: scheduled, not yet
    /// reminded, and `now` within [scheduled - lead, scheduled).
    pub fn needs_reminder(&self, now: DateTime<Utc>) -> Vec<&Interview> {
        self.interviews
            .iter()
            .filter(|iv| {
                iv.status == InterviewStatus::Scheduled
                    && !iv.reminder_sent
                    && now < iv.scheduled_at
                    && now >= iv.scheduled_at - Duration::minutes(i64::from(iv.reminder_minutes))
            })
            .collect()
    }

    pub fn mark_reminder_sent(&mut self, id: &str) -> Result<()> {
        let iv = self
            .interviews
            .iter_mut()
            .find(|iv| iv.id == id)
            .ok_or_else(|| TrackerError::not_found("interview", id))?;
        iv.reminder_sent = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    fn draft(at: DateTime<Utc>) -> InterviewDraft {
        InterviewDraft {
            scheduled_at: Some(at),
            kind: Some("technical".into()),
            mode: Some(InterviewMode::Video),
            ..Default::default()
        }
    }

    #[test]
    fn schedule_rejects_missing_fields() {
        let mut svc = InterviewService::default();
        let err = svc
            .schedule("app-1", InterviewDraft::default(), fixed_now())
            .unwrap_err();
        match err {
            TrackerError::Validation(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| e.contains("scheduled time")));
                assert!(errors.iter().any(|e| e.contains("type")));
                assert!(errors.iter().any(|e| e.contains("mode")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(svc.all().is_empty());
    }

    #[test]
    fn rounds_number_sequentially_per_application() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        let a1 = svc.schedule("app-a", draft(now), now).unwrap();
        let a2 = svc.schedule("app-a", draft(now), now).unwrap();
        let b1 = svc.schedule("app-b", draft(now), now).unwrap();
        assert_eq!(a1.round, 1);
        assert_eq!(a2.round, 2);
        assert_eq!(b1.round, 1);
    }

    #[test]
    fn next_round_skips_gaps() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(svc.schedule("app-a", draft(now), now).unwrap().id);
        }
        // Delete round 3; numbering must continue at 5, not refill the gap.
        svc.delete(&ids[2]).unwrap();
        assert_eq!(svc.next_round_number("app-a"), 5);
        assert_eq!(svc.latest_round("app-a").unwrap().round, 4);
    }

    #[test]
    fn upcoming_excludes_past_and_non_scheduled() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        svc.schedule("app-a", draft(now - Duration::days(1)), now).unwrap();
        let future = svc.schedule("app-a", draft(now + Duration::days(1)), now).unwrap();
        let cancelled = svc.schedule("app-a", draft(now + Duration::days(2)), now).unwrap();
        svc.update(
            &cancelled.id,
            InterviewUpdate {
                status: Some(InterviewStatus::Cancelled),
                ..Default::default()
            },
        )
        .unwrap();

        let upcoming = svc.upcoming(now, None);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, future.id);

        assert!(svc.upcoming(now, Some(0)).is_empty());
    }

    #[test]
    fn day_week_month_queries_slice_the_calendar() {
        let mut svc = InterviewService::default();
        // Monday June 2, 2025.
        let now = fixed_now();
        svc.schedule("a", draft(now + Duration::hours(3)), now).unwrap();
        svc.schedule("a", draft(now + Duration::days(4)), now).unwrap();
        svc.schedule("a", draft(now + Duration::days(10)), now).unwrap();
        svc.schedule("a", draft(now + Duration::days(40)), now).unwrap();

        assert_eq!(svc.today(now).len(), 1);
        assert_eq!(svc.in_week(now).len(), 2);
        assert_eq!(svc.in_month(now).len(), 3);
        assert_eq!(svc.on_day((now + Duration::days(4)).date_naive()).len(), 1);
    }

    #[test]
    fn reminder_window_is_half_open() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        let at = now + Duration::minutes(20);
        let iv = svc
            .schedule(
                "app-a",
                InterviewDraft {
                    reminder_minutes: Some(30),
                    ..draft(at)
                },
                now,
            )
            .unwrap();

        // Inside the lead window.
        assert_eq!(svc.needs_reminder(now).len(), 1);
        // Before the window opens.
        assert!(svc.needs_reminder(now - Duration::minutes(15)).is_empty());
        // At the scheduled instant the window has closed.
        assert!(svc.needs_reminder(at).is_empty());

        svc.mark_reminder_sent(&iv.id).unwrap();
        assert!(svc.needs_reminder(now).is_empty());
    }

    #[test]
    fn cascade_removes_only_owned_rounds() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        svc.schedule("app-a", draft(now), now).unwrap();
        svc.schedule("app-a", draft(now), now).unwrap();
        svc.schedule("app-b", draft(now), now).unwrap();

        let removed = svc.remove_for_application("app-a");
        assert_eq!(removed.len(), 2);
        assert_eq!(svc.all().len(), 1);
        assert_eq!(svc.all()[0].application_id, "app-b");
    }

    #[test]
    fn update_cannot_change_identity() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        let iv = svc.schedule("app-a", draft(now), now).unwrap();
        let updated = svc
            .update(
                &iv.id,
                InterviewUpdate {
                    kind: Some("managerial".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, iv.id);
        assert_eq!(updated.application_id, "app-a");
        assert_eq!(updated.round, 1);
        assert_eq!(updated.kind, "managerial");
    }

    #[test]
    fn complete_round_stores_outcome() {
        let mut svc = InterviewService::default();
        let now = fixed_now();
        let iv = svc.schedule("app-a", draft(now), now).unwrap();
        let done = svc
            .complete_round(&iv.id, RoundOutcome::Cleared, Some("strong round".into()))
            .unwrap();
        assert_eq!(done.status, InterviewStatus::Completed);
        assert_eq!(done.round_outcome, RoundOutcome::Cleared);
        assert_eq!(done.outcome_notes.as_deref(), Some("strong round"));
    }
}
