use chrono::{DateTime, Duration, Utc};

use crate::models::Application;

/// Wait periods and the ghosting threshold. Defaults match the usual
/// "nudge after 3 days, then every 5, give up after 3 tries" cadence.
#[derive(Debug, Clone)]
pub struct FollowUpConfig {
    /// Days to wait after tracking starts before the first nudge.
    pub initial_wait_days: i64,
    /// Days between subsequent nudges.
    pub subsequent_wait_days: i64,
    /// Attempts at which an application becomes a ghosting candidate.
    pub max_attempts: u32,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            initial_wait_days: 3,
            subsequent_wait_days: 5,
            max_attempts: 3,
        }
    }
}

/// A due nudge, as reported by `check_reminders`. Pure data; acting on
/// it (or dismissing it) is the caller's business.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub application_id: String,
    pub company: String,
    pub role: String,
    pub context: Option<String>,
    pub attempts: u32,
    pub is_ghost_candidate: bool,
    /// Whole days since the reminder came due.
    pub days_overdue: i64,
}

/// Decides when a follow-up nudge is due per application and detects
/// likely ghosting. Delivery is someone else's problem.
///
/// The mutating operations (`start_tracking`, `record_follow_up`, ...)
/// advance the clock; `check_reminders` never does, so it is safe to
/// call on any polling interval without double-firing.
#[derive(Debug, Clone, Default)]
pub struct FollowUpService {
    config: FollowUpConfig,
}

impl FollowUpService {
    pub fn new(config: FollowUpConfig) -> Self {
        Self { config }
    }

    /// Begin waiting on `context`. Resets the attempt counter and arms
    /// the reminder at now + (override or the default initial wait).
    pub fn start_tracking(
        &self,
        app: &mut Application,
        context: &str,
        hr_deadline_days: Option<i64>,
        now: DateTime<Utc>,
    ) {
        let wait = hr_deadline_days.unwrap_or(self.config.initial_wait_days);
        let tracker = &mut app.follow_up;
        tracker.is_active = true;
        tracker.attempts = 0;
        tracker.last_follow_up_at = None;
        tracker.next_reminder_at = Some(now + Duration::days(wait));
        tracker.hr_deadline_days = hr_deadline_days;
        tracker.waiting_context = Some(context.to_string());
    }

    /// Record that a nudge was sent. Pushes the next reminder forward by
    /// the subsequent-wait period. Returns true once attempts has reached
    /// the ghosting threshold; enforcement is left to the caller.
    pub fn record_follow_up(&self, app: &mut Application, now: DateTime<Utc>) -> bool {
        let tracker = &mut app.follow_up;
        tracker.attempts += 1;
        tracker.last_follow_up_at = Some(now);
        tracker.next_reminder_at = Some(now + Duration::days(self.config.subsequent_wait_days));
        tracker.attempts >= self.config.max_attempts
    }

    /// HR responded: zero the attempt counter. The wait clock and the
    /// waiting context stay untouched; a response resets the ghosting
    /// counter, not what we are waiting for.
    pub fn record_hr_response(&self, app: &mut Application) {
        let tracker = &mut app.follow_up;
        tracker.attempts = 0;
        tracker.last_follow_up_at = None;
    }

    /// Stop nagging. Deactivates tracking and clears the due-date.
    pub fn stop_tracking(&self, app: &mut Application) {
        let tracker = &mut app.follow_up;
        tracker.is_active = false;
        tracker.next_reminder_at = None;
    }

    /// Same mutation as `stop_tracking`; named for the user gesture of
    /// dismissing a nudge without touching anything else.
    pub fn dismiss_nudge(&self, app: &mut Application) {
        self.stop_tracking(app);
    }

    pub fn is_ghost_candidate(&self, app: &Application) -> bool {
        app.follow_up.attempts >= self.config.max_attempts
    }

    /// Pure query: every application with an active tracker whose
    /// `next_reminder_at` has passed. No side effects, re-entrant.
    pub fn check_reminders(&self, apps: &[Application], now: DateTime<Utc>) -> Vec<Reminder> {
        let mut due = Vec::new();
        for app in apps {
            let tracker = &app.follow_up;
            if !tracker.is_active {
                continue;
            }
            let Some(at) = tracker.next_reminder_at else {
                continue;
            };
            if at > now {
                continue;
            }
            due.push(Reminder {
                application_id: app.id.clone(),
                company: app.company.clone(),
                role: app.role.clone(),
                context: tracker.waiting_context.clone(),
                attempts: tracker.attempts,
                is_ghost_candidate: tracker.attempts >= self.config.max_attempts,
                days_overdue: (now - at).num_days(),
            });
        }
        due
    }
}
