use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage code of the terminal "Closed" stage.
pub const CLOSED: u8 = 0;
/// First stage assigned to a freshly created application.
pub const INITIAL: u8 = 1;
/// Screening: entering starts follow-up tracking, leaving stops it.
pub const SCREENING: u8 = 3;
/// Interviewing: scheduling a round from stages 1..=4 advances here.
pub const INTERVIEWING: u8 = 5;
/// Offer stage.
pub const OFFER: u8 = 6;

/// Hint returned from a stage transition telling the caller which prompt
/// to show next. The engine never presents UI; it only signals intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    PromptDetails,
    StartFollowup,
    ScheduleInterview,
    PromptResult,
    PromptCloseReason,
}

/// One row of the pipeline table. Data only; the registry has no
/// behavior beyond lookup.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub code: u8,
    pub name: &'static str,
    pub action: Option<StageAction>,
}

/// The fixed pipeline. Single source of truth for valid stage codes;
/// stage names must never be hardcoded anywhere else. Stage 0 is the
/// universal terminal stage.
pub const STAGES: &[Stage] = &[
    Stage { code: 0, name: "Closed", action: Some(StageAction::PromptCloseReason) },
    Stage { code: 1, name: "Opportunity Received", action: Some(StageAction::PromptDetails) },
    Stage { code: 2, name: "In Discussion", action: None },
    Stage { code: 3, name: "Screening", action: Some(StageAction::StartFollowup) },
    Stage { code: 4, name: "Shortlisted", action: Some(StageAction::ScheduleInterview) },
    Stage { code: 5, name: "Interviewing", action: None },
    Stage { code: 6, name: "Offer Stage", action: Some(StageAction::PromptResult) },
];

pub fn get(code: u8) -> Option<&'static Stage> {
    STAGES.iter().find(|s| s.code == code)
}

pub fn is_valid(code: u8) -> bool {
    get(code).is_some()
}

/// Display name for a code; unknown codes render as "Stage <n>" so that
/// log lines stay readable even on bad data.
pub fn name(code: u8) -> String {
    match get(code) {
        Some(stage) => stage.name.to_string(),
        None => format!("Stage {code}"),
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_all_codes_once() {
        for code in 0..=6u8 {
            assert!(is_valid(code), "stage {code} missing");
        }
        assert!(!is_valid(7));
        let mut codes: Vec<u8> = STAGES.iter().map(|s| s.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), STAGES.len());
    }

    #[test]
    fn action_mapping_matches_pipeline() {
        assert_eq!(get(CLOSED).unwrap().action, Some(StageAction::PromptCloseReason));
        assert_eq!(get(SCREENING).unwrap().action, Some(StageAction::StartFollowup));
        assert_eq!(get(OFFER).unwrap().action, Some(StageAction::PromptResult));
        assert_eq!(get(2).unwrap().action, None);
        assert_eq!(get(INTERVIEWING).unwrap().action, None);
    }

    #[test]
    fn unknown_code_gets_fallback_name() {
        assert_eq!(name(42), "Stage 42");
        assert_eq!(name(CLOSED), "Closed");
    }
}
