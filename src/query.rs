use crate::models::{Application, FinalResult};

/// Result bucket used in filters. Applications without a final result
/// fall into the synthetic `InProgress` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultBucket {
    InProgress,
    Result(FinalResult),
}

impl ResultBucket {
    pub fn matches(self, app: &Application) -> bool {
        match self {
            Self::InProgress => app.final_result.is_none(),
            Self::Result(r) => app.final_result == Some(r),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s == "in_progress" {
            return Some(Self::InProgress);
        }
        FinalResult::parse(s).map(Self::Result)
    }
}

/// Combined filter. Empty sets mean "no constraint on that axis";
/// all populated axes must match.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Case-insensitive substring over company, role, contact and skills.
    pub search: Option<String>,
    pub stages: Vec<u8>,
    pub types: Vec<String>,
    pub locations: Vec<String>,
    pub results: Vec<ResultBucket>,
}

impl Filter {
    pub fn matches(&self, app: &Application) -> bool {
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let mut haystacks = vec![app.company.to_lowercase(), app.role.to_lowercase()];
            if let Some(contact) = &app.contact {
                haystacks.push(contact.to_lowercase());
            }
            haystacks.extend(app.skills.iter().map(|s| s.to_lowercase()));
            if !haystacks.iter().any(|h| h.contains(&needle)) {
                return false;
            }
        }
        if !self.stages.is_empty() && !self.stages.contains(&app.current_stage) {
            return false;
        }
        if !self.types.is_empty() {
            let matched = app
                .opportunity_type
                .as_deref()
                .is_some_and(|t| self.types.iter().any(|wanted| wanted.eq_ignore_ascii_case(t)));
            if !matched {
                return false;
            }
        }
        if !self.locations.is_empty() {
            let matched = app
                .city
                .as_deref()
                .is_some_and(|c| self.locations.iter().any(|wanted| wanted.eq_ignore_ascii_case(c)));
            if !matched {
                return false;
            }
        }
        if !self.results.is_empty() && !self.results.iter().any(|b| b.matches(app)) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Company,
    Role,
    Stage,
    Created,
    Updated,
    Salary,
}

impl SortColumn {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "company" => Some(Self::Company),
            "role" => Some(Self::Role),
            "stage" => Some(Self::Stage),
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "salary" => Some(Self::Salary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub column: SortColumn,
    pub ascending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        // Freshest activity first, matching the default list view.
        Self {
            column: SortColumn::Updated,
            ascending: false,
        }
    }
}

/// Filter then sort, returning clones in presentation order.
pub fn apply(apps: &[Application], filter: &Filter, sort: Sort) -> Vec<Application> {
    let mut matched: Vec<Application> = apps.iter().filter(|a| filter.matches(a)).cloned().collect();
    matched.sort_by(|a, b| {
        let ordering = match sort.column {
            SortColumn::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
            SortColumn::Role => a.role.to_lowercase().cmp(&b.role.to_lowercase()),
            SortColumn::Stage => a.current_stage.cmp(&b.current_stage),
            SortColumn::Created => a.created_at.cmp(&b.created_at),
            SortColumn::Updated => a.last_updated.cmp(&b.last_updated),
            SortColumn::Salary => a.expected_salary.cmp(&b.expected_salary),
        };
        if sort.ascending { ordering } else { ordering.reverse() }
    });
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationDraft;
    use chrono::{Duration, Utc};

    fn app(company: &str, role: &str, stage: u8) -> Application {
        let mut app = ApplicationDraft {
            company: company.into(),
            role: role.into(),
            skills: vec!["rust".into()],
            city: Some("Berlin".into()),
            opportunity_type: Some("full_time".into()),
            ..Default::default()
        }
        .into_application(Utc::now(), 1);
        app.current_stage = stage;
        app
    }

    #[test]
    fn search_covers_company_role_and_skills() {
        let apps = vec![app("Acme", "Backend Engineer", 1), app("Globex", "Designer", 2)];
        let filter = Filter {
            search: Some("RUST".into()),
            ..Default::default()
        };
        // Both carry the "rust" skill tag.
        assert_eq!(apply(&apps, &filter, Sort::default()).len(), 2);

        let filter = Filter {
            search: Some("acme".into()),
            ..Default::default()
        };
        let hits = apply(&apps, &filter, Sort::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].company, "Acme");
    }

    #[test]
    fn in_progress_bucket_matches_unresolved_apps() {
        let mut closed = app("Acme", "Engineer", 0);
        closed.final_result = Some(FinalResult::Rejected);
        let open = app("Globex", "Engineer", 3);
        let apps = vec![closed, open];

        let filter = Filter {
            results: vec![ResultBucket::InProgress],
            ..Default::default()
        };
        let hits = apply(&apps, &filter, Sort::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].company, "Globex");

        let filter = Filter {
            results: vec![ResultBucket::Result(FinalResult::Rejected)],
            ..Default::default()
        };
        assert_eq!(apply(&apps, &filter, Sort::default())[0].company, "Acme");
    }

    #[test]
    fn stage_and_type_filters_combine() {
        let apps = vec![app("Acme", "Engineer", 3), app("Globex", "Engineer", 5)];
        let filter = Filter {
            stages: vec![3],
            types: vec!["full_time".into()],
            ..Default::default()
        };
        let hits = apply(&apps, &filter, Sort::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].company, "Acme");
    }

    #[test]
    fn sort_direction_toggles() {
        let mut a = app("Acme", "Engineer", 1);
        let mut b = app("Globex", "Engineer", 2);
        a.last_updated = Utc::now() - Duration::days(1);
        b.last_updated = Utc::now();
        let apps = vec![a, b];

        let newest_first = apply(&apps, &Filter::default(), Sort::default());
        assert_eq!(newest_first[0].company, "Globex");

        let oldest_first = apply(
            &apps,
            &Filter::default(),
            Sort {
                column: SortColumn::Updated,
                ascending: true,
            },
        );
        assert_eq!(oldest_first[0].company, "Acme");
    }
}
