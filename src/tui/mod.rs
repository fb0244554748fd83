//! TUI module - Terminal browser for saved plans with ratatui

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};
use std::io::{Stdout, stdout};

use crate::db::{Database, StoredPlan};
use crate::plan::{Plan, day_label};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Right-hand pane contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detail {
    Schedule,
    Coverage,
}

/// App state for TUI
pub struct App {
    db: Database,
    plans: Vec<StoredPlan>,
    selected: TableState,
    detail: Detail,
    should_quit: bool,
}

impl App {
    pub fn new(db: Database) -> Result<Self> {
        let plans = db.get_plans()?;
        let mut selected = TableState::default();
        if !plans.is_empty() {
            selected.select(Some(0));
        }
        Ok(Self {
            db,
            plans,
            selected,
            detail: Detail::Schedule,
            should_quit: false,
        })
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }

        restore_terminal()?;
        Ok(())
    }

    fn current(&self) -> Option<&StoredPlan> {
        self.selected.selected().and_then(|i| self.plans.get(i))
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
            .split(area);

        // Header
        let header = Paragraph::new("supersplit - Weekly superset planner")
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(48), Constraint::Min(30)])
            .split(chunks[1]);

        // History table
        let rows: Vec<Row> = self
            .plans
            .iter()
            .map(|p| {
                Row::new(vec![
                    Cell::from(p.id.map(|id| id.to_string()).unwrap_or_default()),
                    Cell::from(p.date.format("%Y-%m-%d %H:%M").to_string()),
                    Cell::from(p.objective_kind.clone()),
                    Cell::from(format!("{:.3}", p.objective)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(17),
                Constraint::Length(14),
                Constraint::Min(8),
            ],
        )
        .header(Row::new(vec!["#", "Date", "Objective", "Value"]).style(Style::default().bold()))
        .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title("Plans"));

        frame.render_stateful_widget(table, body[0], &mut self.selected);

        match (self.current(), self.detail) {
            (Some(stored), Detail::Schedule) => frame.render_widget(schedule_table(&stored.plan), body[1]),
            (Some(stored), Detail::Coverage) => frame.render_widget(coverage_table(&stored.plan), body[1]),
            (None, _) => {
                let empty = Paragraph::new("No saved plans yet. Run `supersplit solve --save`.")
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(empty, body[1]);
            }
        }

        // Footer
        let footer = Paragraph::new("q: quit | ↑/↓: select | tab: schedule/coverage | r: refresh")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('r') => self.refresh()?,
                KeyCode::Down | KeyCode::Char('j') => self.step(1),
                KeyCode::Up | KeyCode::Char('k') => self.step(-1),
                KeyCode::Tab => {
                    self.detail = match self.detail {
                        Detail::Schedule => Detail::Coverage,
                        Detail::Coverage => Detail::Schedule,
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        self.plans = self.db.get_plans()?;
        let selected = match self.selected.selected() {
            _ if self.plans.is_empty() => None,
            Some(i) => Some(i.min(self.plans.len() - 1)),
            None => Some(0),
        };
        self.selected.select(selected);
        Ok(())
    }

    fn step(&mut self, delta: isize) {
        if self.plans.is_empty() {
            return;
        }
        let last = self.plans.len() - 1;
        let current = self.selected.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        self.selected.select(Some(next));
    }
}

/// Day rows of every category in a plan
fn schedule_table(plan: &Plan) -> Table<'static> {
    let width = plan
        .categories
        .iter()
        .flat_map(|c| c.schedule.days.iter().map(Vec::len))
        .max()
        .unwrap_or(0);

    let mut rows = Vec::new();
    for category in &plan.categories {
        for (d, day) in category.schedule.days.iter().enumerate() {
            let mut cells = vec![Cell::from(day_label(&category.id, d))];
            cells.extend(
                day.iter()
                    .map(|s| Cell::from(Text::from(vec![Line::from(s.first.clone()), Line::from(s.second.clone())]))),
            );
            rows.push(Row::new(cells).height(2));
        }
    }

    let mut widths = vec![Constraint::Length(10)];
    widths.extend(std::iter::repeat_n(Constraint::Min(20), width));
    let mut header = vec!["Day".to_string()];
    header.extend((1..=width).map(|i| format!("Superset {i}")));

    let conflicts = plan.total_conflicts();
    let footer = if conflicts == 0 {
        "conflict-free".to_string()
    } else {
        format!("{conflicts} shared exercises within a day")
    };

    Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().bold()))
        .footer(Row::new(vec![footer]).style(Style::default().fg(Color::DarkGray)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Schedule ({})", plan.status)),
        )
}

/// Coverage against target per muscle, shortfalls highlighted
fn coverage_table(plan: &Plan) -> Table<'static> {
    let rows: Vec<Row> = plan
        .coverage
        .iter()
        .map(|c| {
            let style = if c.shortfall() > 0.0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(c.muscle.clone()),
                Cell::from(format!("{:.1}", c.target)),
                Cell::from(format!("{:.2}", c.covered)),
                Cell::from(format!("{:+.2}", c.deviation())),
            ])
            .style(style)
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Min(8),
        ],
    )
    .header(Row::new(vec!["Muscle", "Target", "Covered", "Diff"]).style(Style::default().bold()))
    .footer(
        Row::new(vec![
            "Total shortfall".to_string(),
            String::new(),
            String::new(),
            format!("{:.3}", plan.total_shortfall()),
        ])
        .style(Style::default().fg(Color::DarkGray)),
    )
    .block(Block::default().borders(Borders::ALL).title("Coverage"))
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
