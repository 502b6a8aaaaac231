mod analytics;
mod engine;
mod error;
mod followup;
mod interviews;
mod models;
mod query;
mod stages;
mod store;
mod tui;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use engine::{Engine, SuggestedAction};
use models::{
    ApplicationDraft, FinalResult, InteractionKind, InterviewDraft, InterviewMode, InterviewStatus,
    InterviewUpdate, RoundOutcome,
};
use query::{Filter, ResultBucket, Sort, SortColumn};
use store::SqliteStore;

#[derive(Parser)]
#[command(name = "pursuit")]
#[command(about = "Job application tracker - pipeline stages, interviews, follow-up nudges")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add a job application
    Add {
        /// Company name
        company: String,

        /// Role / position title
        role: String,

        /// Contact person or address
        #[arg(short, long)]
        contact: Option<String>,

        /// Vendor company, when the opportunity came via a staffing vendor
        #[arg(long)]
        vendor: Option<String>,

        /// Opportunity type (full_time, contract, ...)
        #[arg(short = 't', long = "type")]
        opportunity_type: Option<String>,

        /// Work mode (remote, hybrid, office)
        #[arg(short = 'm', long)]
        work_mode: Option<String>,

        /// City
        #[arg(long)]
        city: Option<String>,

        /// Expected salary
        #[arg(short, long)]
        salary: Option<i64>,

        /// Notice period
        #[arg(long)]
        notice: Option<String>,

        /// Comma-separated skill tags
        #[arg(long)]
        skills: Option<String>,

        /// Job description text
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Replace the descriptive fields of an application
    Edit {
        /// Application id (a unique prefix is enough)
        id: String,

        /// Company name
        company: String,

        /// Role / position title
        role: String,

        /// Contact person or address
        #[arg(short, long)]
        contact: Option<String>,

        /// Vendor company, when the opportunity came via a staffing vendor
        #[arg(long)]
        vendor: Option<String>,

        /// Opportunity type (full_time, contract, ...)
        #[arg(short = 't', long = "type")]
        opportunity_type: Option<String>,

        /// Work mode (remote, hybrid, office)
        #[arg(short = 'm', long)]
        work_mode: Option<String>,

        /// City
        #[arg(long)]
        city: Option<String>,

        /// Expected salary
        #[arg(short, long)]
        salary: Option<i64>,

        /// Notice period
        #[arg(long)]
        notice: Option<String>,

        /// Comma-separated skill tags
        #[arg(long)]
        skills: Option<String>,

        /// Job description text
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List applications
    List {
        /// Substring search over company, role, contact and skills
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by stage code (repeatable)
        #[arg(long)]
        stage: Vec<u8>,

        /// Filter by result (offered, accepted, rejected, declined,
        /// ghosted, withdrawn, in_progress)
        #[arg(short, long)]
        result: Option<String>,

        /// Sort column (company, role, stage, created, updated, salary)
        #[arg(long, default_value = "updated")]
        sort: String,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },

    /// Show one application in full
    Show {
        /// Application id (a unique prefix is enough)
        id: String,
    },

    /// Move an application to another pipeline stage
    Stage {
        /// Application id (a unique prefix is enough)
        id: String,

        /// Target stage code (see `pursuit stages`)
        stage: u8,
    },

    /// List the pipeline stages and their codes
    Stages,

    /// Close an application
    Close {
        /// Application id (a unique prefix is enough)
        id: String,

        /// Reason (rejected, declined, ghosted, withdrawn)
        reason: String,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Close an application as ghosted
    Ghosted {
        /// Application id (a unique prefix is enough)
        id: String,
    },

    /// Record, accept, or decline an offer
    Offer {
        #[command(subcommand)]
        command: OfferCommands,
    },

    /// Log an interaction
    Log {
        /// Application id (a unique prefix is enough)
        id: String,

        /// Kind (hr_called, followed_up, document_received, note)
        kind: String,

        /// Free-text notes
        notes: String,

        /// Also move to this stage in the same operation
        #[arg(long)]
        stage: Option<u8>,
    },

    /// Remove an interaction from the log
    Unlog {
        /// Application id (a unique prefix is enough)
        id: String,

        /// Interaction id (a unique prefix is enough)
        interaction: String,
    },

    /// Manage interview rounds
    Interview {
        #[command(subcommand)]
        command: InterviewCommands,
    },

    /// Follow-up reminders
    Followup {
        #[command(subcommand)]
        command: FollowupCommands,
    },

    /// Delete an application (cascades its interviews)
    Delete {
        /// Application id (a unique prefix is enough)
        id: String,
    },

    /// Show aggregate statistics
    Stats,

    /// Export all applications as a JSON array
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import applications from a JSON array (replaces the collection)
    Import {
        /// File previously produced by export
        file: PathBuf,
    },

    /// Browse applications interactively
    Browse,
}

#[derive(Subcommand)]
enum OfferCommands {
    /// An offer came in; the application stays open
    Record {
        /// Application id (a unique prefix is enough)
        id: String,
    },

    /// Accept the offer
    Accept {
        /// Application id (a unique prefix is enough)
        id: String,
    },

    /// Decline the offer (closes the application)
    Decline {
        /// Application id (a unique prefix is enough)
        id: String,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum InterviewCommands {
    /// Schedule a round
    Schedule {
        /// Application id (a unique prefix is enough)
        id: String,

        /// When, as "YYYY-MM-DD HH:MM" (UTC) or RFC 3339
        #[arg(long)]
        at: String,

        /// Category (technical, hr, managerial, ...)
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Mode (video, onsite, phone)
        #[arg(short, long)]
        mode: String,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Meeting link or address
        #[arg(short, long)]
        location: Option<String>,

        /// Interviewer name
        #[arg(short, long)]
        interviewer: Option<String>,

        /// Preparation notes
        #[arg(long)]
        prep: Option<String>,

        /// Reminder lead time in minutes
        #[arg(long)]
        reminder: Option<u32>,
    },

    /// Edit a scheduled round
    Reschedule {
        /// Interview id (a unique prefix is enough)
        id: String,

        /// New time, as "YYYY-MM-DD HH:MM" (UTC) or RFC 3339
        #[arg(long)]
        at: Option<String>,

        /// Mode (video, onsite, phone)
        #[arg(short, long)]
        mode: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Meeting link or address
        #[arg(short, long)]
        location: Option<String>,

        /// Interviewer name
        #[arg(short, long)]
        interviewer: Option<String>,

        /// New status (scheduled, cancelled, rescheduled)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Record the outcome of a round
    Outcome {
        /// Interview id (a unique prefix is enough)
        id: String,

        /// cleared or not_cleared
        outcome: String,

        /// Post-interview notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List rounds for an application
    List {
        /// Application id (a unique prefix is enough)
        id: String,
    },

    /// Show upcoming rounds
    Upcoming {
        /// Number of rounds to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show today's rounds
    Today,

    /// Show this week's rounds (Monday through Sunday)
    Week,

    /// Show this month's rounds
    Month,

    /// Print due reminders and latch them so they fire once
    Remind,

    /// Delete a round
    Delete {
        /// Interview id (a unique prefix is enough)
        id: String,
    },
}

#[derive(Subcommand)]
enum FollowupCommands {
    /// Show all due follow-up nudges
    Check,

    /// Dismiss the nudge for one application
    Dismiss {
        /// Application id (a unique prefix is enough)
        id: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        let store = SqliteStore::open_default()?;
        println!("Database initialized at {}", store.path().display());
        return Ok(());
    }

    let store = SqliteStore::open_default().context("Failed to open database")?;
    let mut engine = Engine::new(Box::new(store)).context("Failed to load data")?;

    match cli.command {
        Commands::Init => unreachable!(),

        Commands::Add {
            company,
            role,
            contact,
            vendor,
            opportunity_type,
            work_mode,
            city,
            salary,
            notice,
            skills,
            description,
        } => {
            let draft = ApplicationDraft {
                company,
                role,
                contact,
                via_vendor: vendor.is_some(),
                vendor_name: vendor,
                opportunity_type,
                work_mode,
                city,
                expected_salary: salary,
                notice_period: notice,
                skills: skills
                    .map(|s| s.split(',').map(|t| t.trim().to_string()).collect())
                    .unwrap_or_default(),
                description,
            };
            let app = engine.create_application(draft)?;
            println!(
                "Added application {} ({} - {})",
                short(&app.id),
                app.company,
                app.role
            );
        }

        Commands::Edit {
            id,
            company,
            role,
            contact,
            vendor,
            opportunity_type,
            work_mode,
            city,
            salary,
            notice,
            skills,
            description,
        } => {
            let id = resolve_app(&engine, &id)?;
            let draft = ApplicationDraft {
                company,
                role,
                contact,
                via_vendor: vendor.is_some(),
                vendor_name: vendor,
                opportunity_type,
                work_mode,
                city,
                expected_salary: salary,
                notice_period: notice,
                skills: skills
                    .map(|s| s.split(',').map(|t| t.trim().to_string()).collect())
                    .unwrap_or_default(),
                description,
            };
            engine.update_application(&id, draft)?;
            println!("Updated.");
        }

        Commands::List {
            search,
            stage,
            result,
            sort,
            asc,
        } => {
            let mut filter = Filter {
                search,
                stages: stage,
                ..Default::default()
            };
            if let Some(r) = result {
                let bucket =
                    ResultBucket::parse(&r).ok_or_else(|| anyhow!("Unknown result '{r}'"))?;
                filter.results.push(bucket);
            }
            let column =
                SortColumn::parse(&sort).ok_or_else(|| anyhow!("Unknown sort column '{sort}'"))?;
            let apps = engine.query(
                &filter,
                Sort {
                    column,
                    ascending: asc,
                },
            );

            if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<10} {:<20} {:<24} {:<22} {:<12}",
                    "ID", "STAGE", "COMPANY", "ROLE", "RESULT"
                );
                println!("{}", "-".repeat(90));
                for app in apps {
                    let result = app
                        .final_result
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "in progress".to_string());
                    println!(
                        "{:<10} {:<20} {:<24} {:<22} {:<12}",
                        short(&app.id),
                        truncate(&stages::name(app.current_stage), 18),
                        truncate(&app.company, 22),
                        truncate(&app.role, 20),
                        result
                    );
                }
            }
        }

        Commands::Show { id } => {
            let id = resolve_app(&engine, &id)?;
            let app = engine.get(&id).ok_or_else(|| anyhow!("not found"))?;
            println!("Application {}", short(&app.id));
            println!("Company: {}", app.company);
            println!("Role: {}", app.role);
            if let Some(contact) = &app.contact {
                println!("Contact: {contact}");
            }
            if app.via_vendor {
                println!("Via vendor: {}", app.vendor_name.as_deref().unwrap_or("?"));
            }
            println!("Stage: {}", stages::name(app.current_stage));
            if let Some(result) = app.final_result {
                println!("Result: {result}");
            }
            if let Some(sub) = engine.interview_sub_status(&app.id) {
                println!("Interviews: {sub}");
            }
            if let Some(city) = &app.city {
                println!("City: {city}");
            }
            if let Some(salary) = app.expected_salary {
                println!("Expected salary: {salary}");
            }
            if !app.skills.is_empty() {
                println!("Skills: {}", app.skills.join(", "));
            }
            let fu = &app.follow_up;
            if fu.is_active {
                println!(
                    "Follow-up: waiting on '{}', {} attempt(s), next nudge {}",
                    fu.waiting_context.as_deref().unwrap_or("?"),
                    fu.attempts,
                    fu.next_reminder_at
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            println!("Created: {}", app.created_at.format("%Y-%m-%d %H:%M"));
            println!("Updated: {}", app.last_updated.format("%Y-%m-%d %H:%M"));

            let rounds = engine.interviews_for(&app.id);
            if !rounds.is_empty() {
                println!("\nRounds:");
                for iv in rounds {
                    println!(
                        "  {} Round {} - {} ({}) {} [{}] {}",
                        short(&iv.id),
                        iv.round,
                        iv.kind,
                        iv.mode,
                        iv.scheduled_at.format("%Y-%m-%d %H:%M"),
                        iv.status,
                        iv.round_outcome
                    );
                }
            }
            if !app.interactions.is_empty() {
                println!("\nLog:");
                for i in &app.interactions {
                    println!("  {} [{}] {}", i.at.format("%Y-%m-%d %H:%M"), i.kind, i.notes);
                }
            }
        }

        Commands::Stage { id, stage } => {
            let id = resolve_app(&engine, &id)?;
            let action = engine.move_to_stage(&id, stage)?;
            if stage != stages::CLOSED {
                println!("Moved to {}.", stages::name(stage));
            }
            if let Some(action) = action {
                println!("{}", action_hint(action));
            }
        }

        Commands::Stages => {
            let counts = engine.stage_counts();
            println!("{:<6} {:<22} {:>6}", "CODE", "STAGE", "APPS");
            println!("{}", "-".repeat(36));
            for (code, count) in counts {
                println!("{:<6} {:<22} {:>6}", code, stages::name(code), count);
            }
        }

        Commands::Close { id, reason, notes } => {
            let id = resolve_app(&engine, &id)?;
            let reason = FinalResult::parse(&reason)
                .filter(|r| r.is_close_reason())
                .ok_or_else(|| {
                    anyhow!("Reason must be one of: rejected, declined, ghosted, withdrawn")
                })?;
            engine.close_application(&id, reason, notes.as_deref())?;
            println!("Closed as {reason}.");
        }

        Commands::Ghosted { id } => {
            let id = resolve_app(&engine, &id)?;
            engine.mark_as_ghosted(&id)?;
            println!("Closed as ghosted.");
        }

        Commands::Offer { command } => match command {
            OfferCommands::Record { id } => {
                let id = resolve_app(&engine, &id)?;
                engine.record_offer(&id)?;
                println!("Offer recorded.");
            }
            OfferCommands::Accept { id } => {
                let id = resolve_app(&engine, &id)?;
                engine.accept_offer(&id)?;
                println!("Offer accepted. Congratulations!");
            }
            OfferCommands::Decline { id, notes } => {
                let id = resolve_app(&engine, &id)?;
                engine.decline_offer(&id, notes.as_deref())?;
                println!("Offer declined, application closed.");
            }
        },

        Commands::Log {
            id,
            kind,
            notes,
            stage,
        } => {
            let id = resolve_app(&engine, &id)?;
            let kind = InteractionKind::parse(&kind).ok_or_else(|| {
                anyhow!("Kind must be one of: hr_called, followed_up, document_received, note")
            })?;
            engine.add_interaction(&id, kind, &notes, stage)?;
            println!("Logged.");
        }

        Commands::Unlog { id, interaction } => {
            let id = resolve_app(&engine, &id)?;
            let full = engine
                .get(&id)
                .map(|app| {
                    app.interactions
                        .iter()
                        .map(|i| i.id.clone())
                        .filter(|iid| iid.starts_with(&interaction))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            match full.as_slice() {
                [] => return Err(anyhow!("No interaction matches '{interaction}'")),
                [one] => {
                    engine.remove_interaction(&id, one)?;
                    println!("Removed.");
                }
                many => {
                    return Err(anyhow!(
                        "'{interaction}' is ambiguous ({} matches); use more characters",
                        many.len()
                    ));
                }
            }
        }

        Commands::Interview { command } => match command {
            InterviewCommands::Schedule {
                id,
                at,
                kind,
                mode,
                duration,
                location,
                interviewer,
                prep,
                reminder,
            } => {
                let id = resolve_app(&engine, &id)?;
                let mode = InterviewMode::parse(&mode)
                    .ok_or_else(|| anyhow!("Mode must be one of: video, onsite, phone"))?;
                let draft = InterviewDraft {
                    scheduled_at: Some(parse_when(&at)?),
                    kind: Some(kind),
                    mode: Some(mode),
                    duration_minutes: duration,
                    location,
                    interviewer,
                    prep_notes: prep,
                    reminder_minutes: reminder,
                };
                let iv = engine.schedule_interview(&id, draft)?;
                println!(
                    "Scheduled round {} ({}) for {}.",
                    iv.round,
                    short(&iv.id),
                    iv.scheduled_at.format("%Y-%m-%d %H:%M")
                );
            }

            InterviewCommands::Reschedule {
                id,
                at,
                mode,
                duration,
                location,
                interviewer,
                status,
            } => {
                let id = resolve_interview(&engine, &id)?;
                let mode = match mode {
                    Some(m) => Some(
                        InterviewMode::parse(&m)
                            .ok_or_else(|| anyhow!("Mode must be one of: video, onsite, phone"))?,
                    ),
                    None => None,
                };
                let status = match status {
                    Some(s) => Some(InterviewStatus::parse(&s).ok_or_else(|| {
                        anyhow!("Status must be one of: scheduled, completed, cancelled, rescheduled")
                    })?),
                    None => None,
                };
                let at = match at {
                    Some(s) => Some(parse_when(&s)?),
                    None => None,
                };
                let update = InterviewUpdate {
                    scheduled_at: at,
                    mode,
                    duration_minutes: duration,
                    location,
                    interviewer,
                    status,
                    ..Default::default()
                };
                let iv = engine.update_interview(&id, update)?;
                println!(
                    "Round {} now at {} [{}].",
                    iv.round,
                    iv.scheduled_at.format("%Y-%m-%d %H:%M"),
                    iv.status
                );
            }

            InterviewCommands::Outcome { id, outcome, notes } => {
                let id = resolve_interview(&engine, &id)?;
                let outcome = RoundOutcome::parse(&outcome)
                    .filter(|o| *o != RoundOutcome::Pending)
                    .ok_or_else(|| anyhow!("Outcome must be cleared or not_cleared"))?;
                match engine.set_round_outcome(&id, outcome, notes)? {
                    SuggestedAction::ScheduleNextOrOffer => {
                        println!("Round cleared. Schedule the next round or move to Offer Stage.");
                    }
                    SuggestedAction::CloseRejected => {
                        println!("Round not cleared. Consider closing as rejected.");
                    }
                }
            }

            InterviewCommands::List { id } => {
                let id = resolve_app(&engine, &id)?;
                let rounds = engine.interviews_for(&id);
                if rounds.is_empty() {
                    println!("No rounds scheduled.");
                } else {
                    print_interview_table(&rounds);
                }
            }

            InterviewCommands::Upcoming { limit } => {
                let rounds = engine.upcoming_interviews(Utc::now(), Some(limit));
                if rounds.is_empty() {
                    println!("Nothing coming up.");
                } else {
                    print_interview_table(&rounds);
                }
            }

            InterviewCommands::Today => {
                let rounds = engine.todays_interviews(Utc::now());
                if rounds.is_empty() {
                    println!("No interviews today.");
                } else {
                    print_interview_table(&rounds);
                }
            }

            InterviewCommands::Week => {
                let rounds = engine.weeks_interviews(Utc::now());
                if rounds.is_empty() {
                    println!("No interviews this week.");
                } else {
                    print_interview_table(&rounds);
                }
            }

            InterviewCommands::Month => {
                let rounds = engine.months_interviews(Utc::now());
                if rounds.is_empty() {
                    println!("No interviews this month.");
                } else {
                    print_interview_table(&rounds);
                }
            }

            InterviewCommands::Remind => {
                let now = Utc::now();
                let due: Vec<(String, String, chrono::DateTime<Utc>)> = engine
                    .due_interview_reminders(now)
                    .into_iter()
                    .map(|iv| (iv.id.clone(), iv.kind.clone(), iv.scheduled_at))
                    .collect();
                if due.is_empty() {
                    println!("No reminders due.");
                } else {
                    for (id, kind, at) in due {
                        println!("Reminder: {} interview at {}", kind, at.format("%H:%M"));
                        engine.mark_interview_reminder_sent(&id)?;
                    }
                }
            }

            InterviewCommands::Delete { id } => {
                let id = resolve_interview(&engine, &id)?;
                engine.delete_interview(&id)?;
                println!("Deleted.");
            }
        },

        Commands::Followup { command } => match command {
            FollowupCommands::Check => {
                let reminders = engine.check_follow_up_reminders(Utc::now());
                if reminders.is_empty() {
                    println!("No follow-ups due.");
                } else {
                    println!(
                        "{:<10} {:<22} {:<20} {:<18} {:>6} {:>8}",
                        "ID", "COMPANY", "ROLE", "WAITING ON", "TRIES", "OVERDUE"
                    );
                    println!("{}", "-".repeat(90));
                    for r in reminders {
                        let ghost = if r.is_ghost_candidate { " (ghost?)" } else { "" };
                        println!(
                            "{:<10} {:<22} {:<20} {:<18} {:>6} {:>7}d{}",
                            short(&r.application_id),
                            truncate(&r.company, 20),
                            truncate(&r.role, 18),
                            truncate(r.context.as_deref().unwrap_or("-"), 16),
                            r.attempts,
                            r.days_overdue,
                            ghost
                        );
                    }
                }
            }

            FollowupCommands::Dismiss { id } => {
                let id = resolve_app(&engine, &id)?;
                engine.dismiss_follow_up_nudge(&id)?;
                println!("Dismissed.");
            }
        },

        Commands::Delete { id } => {
            let id = resolve_app(&engine, &id)?;
            engine.delete_application(&id)?;
            println!("Deleted.");
        }

        Commands::Stats => {
            let stats = engine.analytics(Utc::now());
            println!("By stage:");
            for (code, count) in &stats.stage_counts {
                println!("  {:<22} {}", stages::name(*code), count);
            }
            println!("\nBy result:");
            for (label, count) in &stats.result_counts {
                println!("  {label:<22} {count}");
            }
            println!("\nSuccess rate:  {:.0}%", stats.success_rate * 100.0);
            println!("Response rate: {:.0}%", stats.response_rate * 100.0);
            println!("\nApplications per week:");
            for (week, count) in &stats.weekly_created {
                println!("  {:<10} {}", week, "#".repeat(*count));
            }
        }

        Commands::Export { output } => {
            let json = engine.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "Exported {} application(s) to {}.",
                        engine.applications().len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }

        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let count = engine.import_json(&json)?;
            println!("Imported {count} application(s).");
        }

        Commands::Browse => {
            tui::run_browse(&mut engine)?;
        }
    }

    Ok(())
}

fn action_hint(action: stages::StageAction) -> &'static str {
    match action {
        stages::StageAction::PromptDetails => "Tip: fill in the opportunity details.",
        stages::StageAction::StartFollowup => "Follow-up tracking started.",
        stages::StageAction::ScheduleInterview => "Tip: schedule an interview round.",
        stages::StageAction::PromptResult => "Tip: record the offer outcome.",
        stages::StageAction::PromptCloseReason => {
            "Closing needs a reason; use `pursuit close <id> <reason>`."
        }
    }
}

/// Accepts "YYYY-MM-DD HH:MM" (read as UTC) or a full RFC 3339 stamp.
fn parse_when(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .map(|t| t.and_utc())
        .map_err(|_| anyhow!("Could not parse '{s}'; use \"YYYY-MM-DD HH:MM\" or RFC 3339"))
}

/// Resolve a possibly-shortened application id to the full one.
fn resolve_app(engine: &Engine, prefix: &str) -> Result<String> {
    let matches: Vec<&str> = engine
        .applications()
        .iter()
        .map(|a| a.id.as_str())
        .filter(|id| id.starts_with(prefix))
        .collect();
    match matches.len() {
        0 => Err(anyhow!("No application matches '{prefix}'")),
        1 => Ok(matches[0].to_string()),
        n => Err(anyhow!(
            "'{prefix}' is ambiguous ({n} matches); use more characters"
        )),
    }
}

fn resolve_interview(engine: &Engine, prefix: &str) -> Result<String> {
    let matches: Vec<&str> = engine
        .interview_service()
        .all()
        .iter()
        .map(|iv| iv.id.as_str())
        .filter(|id| id.starts_with(prefix))
        .collect();
    match matches.len() {
        0 => Err(anyhow!("No interview matches '{prefix}'")),
        1 => Ok(matches[0].to_string()),
        n => Err(anyhow!(
            "'{prefix}' is ambiguous ({n} matches); use more characters"
        )),
    }
}

fn print_interview_table(rounds: &[&models::Interview]) {
    println!(
        "{:<10} {:<10} {:<6} {:<14} {:<8} {:<17} {:<12} {:<12}",
        "ID", "APP", "ROUND", "TYPE", "MODE", "WHEN", "STATUS", "OUTCOME"
    );
    println!("{}", "-".repeat(95));
    for iv in rounds {
        println!(
            "{:<10} {:<10} {:<6} {:<14} {:<8} {:<17} {:<12} {:<12}",
            short(&iv.id),
            short(&iv.application_id),
            iv.round,
            truncate(&iv.kind, 12),
            iv.mode.to_string(),
            iv.scheduled_at.format("%Y-%m-%d %H:%M").to_string(),
            iv.status.to_string(),
            iv.round_outcome.to_string()
        );
    }
}

/// First 8 characters of a UUID are plenty for display.
fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
