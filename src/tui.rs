use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::engine::Engine;
use crate::models::{Application, FinalResult};
use crate::query::{Filter, Sort};
use crate::stages;

struct AppState {
    ids: Vec<String>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current_id(&self) -> Option<&str> {
        self.ids.get(self.selected).map(String::as_str)
    }

    fn next(&mut self) {
        if !self.ids.is_empty() && self.selected < self.ids.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

pub fn run_browse(engine: &mut Engine) -> Result<()> {
    let ids: Vec<String> = engine
        .query(&Filter::default(), Sort::default())
        .into_iter()
        .map(|a| a.id)
        .collect();
    if ids.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(ids);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, engine);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    engine: &mut Engine,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, engine, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                // Digit keys move to that stage; moving to 0 needs a close
                // reason so it is not offered here.
                KeyCode::Char(c @ '1'..='9') => {
                    let stage = c as u8 - b'0';
                    if stages::is_valid(stage) {
                        if let Some(id) = state.current_id() {
                            let id = id.to_string();
                            let _ = engine.move_to_stage(&id, stage);
                        }
                    }
                }
                KeyCode::Char('g') => {
                    if let Some(id) = state.current_id() {
                        let id = id.to_string();
                        let _ = engine.mark_as_ghosted(&id);
                    }
                }
                KeyCode::Char('x') => {
                    if let Some(id) = state.current_id() {
                        let id = id.to_string();
                        let _ = engine.close_application(&id, FinalResult::Rejected, None);
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = state.current_id() {
                        let id = id.to_string();
                        let _ = engine.dismiss_follow_up_nudge(&id);
                    }
                }
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, engine: &Engine, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(frame.area());

    // Left panel: application list
    let items: Vec<ListItem> = state
        .ids
        .iter()
        .map(|id| {
            let Some(app) = engine.get(id) else {
                return ListItem::new("?");
            };
            let icon = match app.final_result {
                Some(FinalResult::Offered | FinalResult::Accepted) => "+",
                Some(FinalResult::Ghosted) => "~",
                Some(_) => "x",
                None if app.follow_up.is_active => "*",
                None => " ",
            };
            let company = if app.company.len() > 22 {
                format!("{}...", &app.company[..19])
            } else {
                app.company.clone()
            };
            ListItem::new(format!(
                "{} [{}] {} | {}",
                icon,
                app.current_stage,
                company,
                truncate(&app.role, 20)
            ))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Applications ({}) ", state.ids.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: application detail
    let detail = build_detail(state, engine);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  1-6:stage  g:ghosted x:rejected d:dismiss nudge  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn build_detail(state: &AppState, engine: &Engine) -> Text<'static> {
    let Some(app) = state.current_id().and_then(|id| engine.get(id)) else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        app.company.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(app.role.clone()));
    if let Some(contact) = &app.contact {
        lines.push(Line::from(format!("Contact: {contact}")));
    }
    if app.via_vendor {
        lines.push(Line::from(format!(
            "Via vendor: {}",
            app.vendor_name.as_deref().unwrap_or("?")
        )));
    }

    lines.push(Line::from(Span::styled(
        format!("Stage: {}", stages::name(app.current_stage)),
        stage_style(app),
    )));
    if let Some(result) = app.final_result {
        lines.push(Line::from(format!("Result: {result}")));
    }
    if let Some(sub) = engine.interview_sub_status(&app.id) {
        lines.push(Line::from(format!("Interviews: {sub}")));
    }

    if let Some(city) = &app.city {
        lines.push(Line::from(format!("City: {city}")));
    }
    if let Some(salary) = app.expected_salary {
        lines.push(Line::from(format!("Expected salary: {salary}")));
    }
    if !app.skills.is_empty() {
        lines.push(Line::from(format!("Skills: {}", app.skills.join(", "))));
    }

    if app.follow_up.is_active {
        let fu = &app.follow_up;
        lines.push(Line::from(Span::styled(
            format!(
                "Waiting on '{}', {} attempt(s), next nudge {}",
                fu.waiting_context.as_deref().unwrap_or("?"),
                fu.attempts,
                fu.next_reminder_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
            Style::default().fg(Color::Yellow),
        )));
    }

    lines.push(Line::from(""));

    // Interview rounds
    let rounds = engine.interviews_for(&app.id);
    if !rounds.is_empty() {
        lines.push(Line::from(Span::styled(
            "ROUNDS",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for iv in rounds {
            lines.push(Line::from(format!(
                "  {} Round {} - {} ({}) [{}] {}",
                iv.scheduled_at.format("%Y-%m-%d %H:%M"),
                iv.round,
                iv.kind,
                iv.mode,
                iv.status,
                iv.round_outcome
            )));
        }
        lines.push(Line::from(""));
    }

    // Interaction log, newest last
    if !app.interactions.is_empty() {
        lines.push(Line::from(Span::styled(
            "LOG",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for i in &app.interactions {
            lines.push(Line::from(format!(
                "  {} [{}] {}",
                i.at.format("%Y-%m-%d %H:%M"),
                i.kind,
                i.notes
            )));
        }
        lines.push(Line::from(""));
    }

    if let Some(text) = &app.description {
        lines.push(Line::from(Span::styled(
            "DESCRIPTION",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(text, 70).lines() {
            lines.push(Line::from(format!("  {line}")));
        }
    }

    Text::from(lines)
}

fn stage_style(app: &Application) -> Style {
    match app.current_stage {
        stages::CLOSED => Style::default().fg(Color::DarkGray),
        stages::SCREENING => Style::default().fg(Color::Yellow),
        stages::INTERVIEWING => Style::default().fg(Color::Cyan),
        stages::OFFER => Style::default().fg(Color::Green),
        _ => Style::default(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
