use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::HashSet;
use std::io::stdout;

use crate::db::Database;
use crate::models::Candidate;
use crate::profile;

struct AppState {
    candidates: Vec<Candidate>,
    selected: usize,
    scroll_offset: u16,
    picked: HashSet<String>,
    message: Option<String>,
    now: DateTime<Utc>,
}

impl AppState {
    fn new(candidates: Vec<Candidate>, now: DateTime<Utc>) -> Self {
        Self {
            candidates,
            selected: 0,
            scroll_offset: 0,
            picked: HashSet::new(),
            message: None,
            now,
        }
    }

    fn current(&self) -> Option<&Candidate> {
        self.candidates.get(self.selected)
    }

    fn next(&mut self) {
        if !self.candidates.is_empty() && self.selected < self.candidates.len() - 1 {
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

    fn toggle_pick(&mut self) {
        let Some(id) = self.current().map(|c| c.id.clone()) else { return };
        if !self.picked.remove(&id) {
            self.picked.insert(id);
        }
    }

    /// Ids to act on: the picked set, or the highlighted candidate if
    /// nothing is picked.
    fn targets(&self) -> Vec<String> {
        if self.picked.is_empty() {
            self.current().map(|c| vec![c.id.clone()]).unwrap_or_default()
        } else {
            self.candidates
                .iter()
                .filter(|c| self.picked.contains(&c.id))
                .map(|c| c.id.clone())
                .collect()
        }
    }

    fn drop_candidates(&mut self, ids: &[String]) {
        self.candidates.retain(|c| !ids.contains(&c.id));
        for id in ids {
            self.picked.remove(id);
        }
        if self.selected >= self.candidates.len() {
            self.selected = self.candidates.len().saturating_sub(1);
        }
        self.scroll_offset = 0;
    }

    /// Failed adds stay in the list so they can be retried.
    fn add_to_pipeline(&mut self, db: &Database) {
        let mut added = 0;
        let mut done = Vec::new();
        let mut failed = 0;
        for id in self.targets() {
            match db.add_to_pipeline(&id) {
                Ok(inserted) => {
                    if inserted {
                        added += 1;
                    }
                    done.push(id);
                }
                Err(_) => failed += 1,
            }
        }
        self.drop_candidates(&done);
        self.message = Some(if failed == 0 {
            format!("Added {} to pipeline", added)
        } else {
            format!("Added {} to pipeline, {} failed", added, failed)
        });
    }

    fn hide(&mut self) {
        let ids = self.targets();
        self.drop_candidates(&ids);
        self.message = Some(format!("Hid {}", ids.len()));
    }
}

pub fn run_browse(db: &Database, candidates: Vec<Candidate>, now: DateTime<Utc>) -> Result<()> {
    if candidates.is_empty() {
        println!("No candidates match.");
        return Ok(());
    }

    let mut state = AppState::new(candidates, now);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

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
                KeyCode::Char(' ') => state.toggle_pick(),
                KeyCode::Char('a') => state.add_to_pipeline(db),
                KeyCode::Char('x') => state.hide(),
                _ => {}
            }
            if state.candidates.is_empty() {
                break;
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(frame.area());

    // Left panel: candidate list
    let items: Vec<ListItem> = state
        .candidates
        .iter()
        .map(|c| {
            let mark = if state.picked.contains(&c.id) { "[x]" } else { "[ ]" };
            ListItem::new(format!(
                "{} {} | {:.1}* | {}",
                mark,
                profile::truncate(&c.name, 22),
                c.rating,
                profile::truncate(&c.profession, 20)
            ))
        })
        .collect();

    let title = if state.picked.is_empty() {
        format!(" Experts ({}) ", state.candidates.len())
    } else {
        format!(" Experts ({}, {} selected) ", state.candidates.len(), state.picked.len())
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: profile
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Profile "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let footer = match &state.message {
        Some(msg) => format!(" {}  |  space:select a:add to pipeline x:hide q:quit", msg),
        None => " j/k:navigate  J/K:scroll  space:select  a:add to pipeline  x:hide  q:quit".to_string(),
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn section<'a>(lines: &mut Vec<Line<'a>>, title: &'a str) {
    lines.push(Line::from(Span::styled(
        title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(c) = state.current() else {
        return Text::raw("No candidate selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        c.name.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if !c.profession.is_empty() || !c.company.is_empty() {
        lines.push(Line::from(format!("{} at {}", c.profession, c.company)));
    }
    if !c.geography.is_empty() {
        lines.push(Line::from(c.geography.as_str()));
    }
    lines.push(Line::from(Span::styled(
        format!("Rating: {:.1} ({} reviews)", c.rating, c.reviews.len()),
        Style::default().fg(Color::Yellow),
    )));
    if let Some(email) = &c.email {
        lines.push(Line::from(format!("Email: {}", email)));
    }
    if let Some(link) = &c.linkedin_link {
        lines.push(Line::from(format!("LinkedIn: {}", link)));
    }
    lines.push(Line::from(""));

    if let Some(desc) = &c.description {
        for line in textwrap::fill(desc, 70).lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::from(""));
    }

    for (title, education) in [("Experience", false), ("Education", true)] {
        let records = profile::history(c, education, state.now);
        if records.is_empty() {
            continue;
        }
        section(&mut lines, title);
        for record in records {
            for (i, text) in profile::history_lines(record, state.now).into_iter().enumerate() {
                let style = if i == 0 { Style::default().fg(Color::Cyan) } else { Style::default() };
                lines.push(Line::from(Span::styled(format!("  {}", text), style)));
            }
        }
        lines.push(Line::from(""));
    }

    let topics: Vec<&str> = c.conversation_topics().collect();
    if !topics.is_empty() {
        section(&mut lines, "Conversation topics");
        for line in textwrap::fill(&topics.join(", "), 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    let groups = profile::question_groups(c);
    if !groups.is_empty() {
        section(&mut lines, "Project questions");
        for (project, questions) in groups {
            lines.push(Line::from(Span::styled(
                format!("  {}", project),
                Style::default().fg(Color::Cyan),
            )));
            for q in questions {
                lines.push(Line::from(format!("    Q: {}", q.question)));
                if let Some(answer) = &q.answer {
                    for line in textwrap::fill(answer, 66).lines() {
                        lines.push(Line::from(format!("       {}", line)));
                    }
                }
            }
        }
        lines.push(Line::from(""));
    }

    if !c.reviews.is_empty() {
        section(&mut lines, "Reviews");
        for review in &c.reviews {
            let rating = review.rating.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string());
            let comment = review.comment.as_deref().unwrap_or("");
            lines.push(Line::from(format!("  {}  {}", rating, comment)));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ids: &[&str]) -> AppState {
        let candidates = ids
            .iter()
            .map(|id| Candidate { id: id.to_string(), name: id.to_uppercase(), ..Default::default() })
            .collect();
        AppState::new(candidates, Utc::now())
    }

    #[test]
    fn targets_fall_back_to_highlighted() {
        let mut s = state(&["a", "b", "c"]);
        s.next();
        assert_eq!(s.targets(), vec!["b".to_string()]);

        s.toggle_pick();
        s.next();
        s.toggle_pick();
        assert_eq!(s.targets(), vec!["b".to_string(), "c".to_string()]);

        s.toggle_pick();
        assert_eq!(s.targets(), vec!["b".to_string()]);
    }

    #[test]
    fn hide_keeps_selection_in_bounds() {
        let mut s = state(&["a", "b", "c"]);
        s.next();
        s.next();
        s.hide();
        assert_eq!(s.candidates.len(), 2);
        assert_eq!(s.selected, 1);
        assert_eq!(s.current().map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn add_to_pipeline_removes_from_view() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let mut s = state(&["a", "b"]);
        db.import_candidates(&s.candidates).unwrap();

        s.toggle_pick();
        s.add_to_pipeline(&db);

        assert!(db.is_in_pipeline("a").unwrap());
        assert!(!db.is_in_pipeline("b").unwrap());
        assert_eq!(s.candidates.len(), 1);
        assert!(s.picked.is_empty());
        assert_eq!(s.message.as_deref(), Some("Added 1 to pipeline"));
    }

    #[test]
    fn failed_pipeline_add_stays_in_view() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let mut s = state(&["a", "ghost", "b"]);
        db.import_candidates(&[s.candidates[0].clone(), s.candidates[2].clone()]).unwrap();

        s.toggle_pick();
        s.next();
        s.toggle_pick();
        s.add_to_pipeline(&db);

        let ids: Vec<&str> = s.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ghost", "b"]);
        assert!(db.is_in_pipeline("a").unwrap());
        assert_eq!(s.message.as_deref(), Some("Added 1 to pipeline, 1 failed"));
    }
}
