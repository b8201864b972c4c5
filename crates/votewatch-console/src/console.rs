//! Interactive terminal monitor.
//!
//! Shows the tally and membership tables with their raw JSON, the
//! last-update time and the error region, and hosts the vote form.
//!
//! Launch with `votewatch watch` (the default command).

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use votewatch_protocol::PresentationCategory;

use crate::render::{PeerRow, PollView, StatusView, TallyRow};
use crate::state::VoteForm;
use crate::{RefreshCoordinator, VoteSubmitter};

/// Snapshot of display state for one frame.
struct ConsoleSnapshot {
    origin: String,
    error: String,
    last_update: Option<String>,
    poll: Option<PollView>,
    status: Option<StatusView>,
    vote_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputField {
    PollId,
    Option,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleAction {
    None,
    Edited,
    Submit,
    RefreshNow,
    Quit,
}

struct MonitorConsole {
    coordinator: Arc<RefreshCoordinator>,
    submitter: Arc<VoteSubmitter>,
    /// Local copy of the input fields; pushed to the shared state on edit.
    form: VoteForm,
    focus: InputField,
    /// Cursor position, in characters, within the focused field.
    cursor_pos: usize,
}

impl MonitorConsole {
    async fn new(coordinator: Arc<RefreshCoordinator>, submitter: Arc<VoteSubmitter>) -> Self {
        let form = coordinator.state().read().await.form.clone();
        let cursor_pos = form.option.chars().count();
        Self {
            coordinator,
            submitter,
            form,
            focus: InputField::Option,
            cursor_pos,
        }
    }

    async fn snapshot(&self) -> ConsoleSnapshot {
        let state = self.coordinator.state().read().await;
        ConsoleSnapshot {
            origin: state.origin.clone(),
            error: state.error.clone(),
            last_update: state
                .last_update
                .map(|ts| ts.format("%H:%M:%S").to_string()),
            poll: state.poll.clone(),
            status: state.status.clone(),
            vote_in_flight: state.vote_in_flight(),
        }
    }

    async fn sync_form(&self) {
        self.coordinator.state().write().await.form = self.form.clone();
    }

    fn submit(&self) {
        if self.submitter.is_submitting() {
            return;
        }
        let submitter = Arc::clone(&self.submitter);
        tokio::spawn(async move {
            submitter.submit_from_form().await;
        });
    }

    fn refresh_now(&self) {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.refresh_all().await;
        });
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            InputField::PollId => &mut self.form.poll_id,
            InputField::Option => &mut self.form.option,
        }
    }

    fn field(&self) -> &str {
        match self.focus {
            InputField::PollId => &self.form.poll_id,
            InputField::Option => &self.form.option,
        }
    }

    fn render(&self, frame: &mut Frame, snap: &ConsoleSnapshot) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(8),    // Tables + raw JSON
                Constraint::Length(3), // Error
                Constraint::Length(5), // Vote form
            ])
            .split(frame.area());

        self.render_header(frame, outer[0], snap);
        self.render_main_area(frame, outer[1], snap);
        self.render_error(frame, outer[2], snap);
        self.render_form(frame, outer[3], snap);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" votewatch ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let updated = snap
            .last_update
            .as_deref()
            .map(|t| format!("Last update: {t}"))
            .unwrap_or_else(|| "Last update: never".to_string());

        let line = Line::from(vec![
            Span::styled("  Origin: ", Style::default().fg(Color::Gray)),
            Span::styled(snap.origin.as_str(), Style::default().fg(Color::White)),
            Span::styled("  |  ", Style::default().fg(Color::Gray)),
            Span::styled(updated, Style::default().fg(Color::Green)),
        ]);

        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn render_main_area(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        self.render_tally(frame, left[0], snap);
        self.render_membership(frame, left[1], snap);
        render_raw(
            frame,
            right[0],
            " Poll JSON ",
            snap.poll.as_ref().map(|p| p.raw_json.as_str()),
        );
        render_raw(
            frame,
            right[1],
            " Status JSON ",
            snap.status.as_ref().map(|s| s.raw_json.as_str()),
        );
    }

    fn render_tally(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let title = match &snap.poll {
            Some(p) => format!(" Poll {} ({} votes) ", p.poll_id, p.total_votes),
            None => " Poll ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));

        let Some(poll) = &snap.poll else {
            frame.render_widget(waiting(block), area);
            return;
        };

        let rows: Vec<Row> = poll
            .rows
            .iter()
            .map(|row| match row {
                TallyRow::Entry { option, count } => Row::new(vec![
                    Cell::from(Span::styled(
                        format!("  {option}"),
                        Style::default().fg(Color::White),
                    )),
                    Cell::from(Span::styled(
                        count.to_string(),
                        Style::default().fg(Color::Cyan),
                    )),
                ]),
                TallyRow::Placeholder(msg) => placeholder_row(msg),
            })
            .collect();

        let table = Table::new(rows, [Constraint::Percentage(70), Constraint::Percentage(30)])
            .block(block)
            .header(
                Row::new(vec!["  Option", "Votes"])
                    .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
            );
        frame.render_widget(table, area);
    }

    fn render_membership(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let title = match snap.status.as_ref().and_then(|s| s.node.as_deref()) {
            Some(node) => format!(" Cluster (via {node}) "),
            None => " Cluster ".to_string(),
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue));

        let Some(status) = &snap.status else {
            frame.render_widget(waiting(block), area);
            return;
        };

        let rows: Vec<Row> = status
            .rows
            .iter()
            .map(|row| match row {
                PeerRow::Entry {
                    peer,
                    state,
                    category,
                    last_seen,
                } => Row::new(vec![
                    Cell::from(Span::styled(
                        format!("  {peer}"),
                        Style::default().fg(Color::White),
                    )),
                    Cell::from(Span::styled(
                        state.clone(),
                        Style::default()
                            .fg(category_color(*category))
                            .add_modifier(Modifier::BOLD),
                    )),
                    Cell::from(Span::styled(
                        last_seen.clone().unwrap_or_else(|| "-".to_string()),
                        Style::default().fg(Color::DarkGray),
                    )),
                ]),
                PeerRow::Placeholder(msg) => placeholder_row(msg),
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(50),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ],
        )
        .block(block)
        .header(
            Row::new(vec!["  Peer", "State", "Last seen"])
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        );
        frame.render_widget(table, area);
    }

    fn render_error(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let (text, color) = if snap.error.is_empty() {
            ("  No errors".to_string(), Color::DarkGray)
        } else {
            (format!("  {}", snap.error), Color::Red)
        };
        let block = Block::default()
            .title(" Error ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if snap.error.is_empty() {
                Color::DarkGray
            } else {
                Color::Red
            }));
        let paragraph = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(color))))
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_form(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" Vote (Tab = switch field, Enter = submit, F5 = refresh, Esc = quit) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));

        let field_style = |field: InputField| {
            if self.focus == field {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            }
        };

        let button = if snap.vote_in_flight {
            Span::styled("[ submitting... ]", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(
                "[ Vote ]",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )
        };

        let lines = vec![
            Line::from(vec![
                Span::styled("  Poll ID: ", Style::default().fg(Color::Gray)),
                Span::styled(self.form.poll_id.as_str(), field_style(InputField::PollId)),
            ]),
            Line::from(vec![
                Span::styled("  Option:  ", Style::default().fg(Color::Gray)),
                Span::styled(self.form.option.as_str(), field_style(InputField::Option)),
            ]),
            Line::from(vec![Span::raw("  "), button]),
        ];

        frame.render_widget(Paragraph::new(lines).block(block), area);

        let row = match self.focus {
            InputField::PollId => 0,
            InputField::Option => 1,
        };
        let cursor_x = cursor_column(area, self.cursor_pos);
        let cursor_y = area.y.saturating_add(1 + row);
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    /// Handle one key press.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> ConsoleAction {
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                return ConsoleAction::Quit
            }
            (KeyCode::Enter, _) => return ConsoleAction::Submit,
            (KeyCode::F(5), _) => return ConsoleAction::RefreshNow,
            (KeyCode::Tab, _) | (KeyCode::BackTab, _) | (KeyCode::Up, _) | (KeyCode::Down, _) => {
                self.focus = match self.focus {
                    InputField::PollId => InputField::Option,
                    InputField::Option => InputField::PollId,
                };
                self.cursor_pos = self.field().chars().count();
            }
            (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                let at = self.cursor_pos;
                let field = self.field_mut();
                let idx = byte_index(field, at);
                field.insert(idx, c);
                self.cursor_pos += 1;
                return ConsoleAction::Edited;
            }
            (KeyCode::Backspace, _) => {
                if self.cursor_pos > 0 {
                    let at = self.cursor_pos - 1;
                    let field = self.field_mut();
                    let idx = byte_index(field, at);
                    field.remove(idx);
                    self.cursor_pos -= 1;
                    return ConsoleAction::Edited;
                }
            }
            (KeyCode::Delete, _) => {
                let at = self.cursor_pos;
                if at < self.field().chars().count() {
                    let field = self.field_mut();
                    let idx = byte_index(field, at);
                    field.remove(idx);
                    return ConsoleAction::Edited;
                }
            }
            (KeyCode::Left, _) => {
                self.cursor_pos = self.cursor_pos.saturating_sub(1);
            }
            (KeyCode::Right, _) => {
                if self.cursor_pos < self.field().chars().count() {
                    self.cursor_pos += 1;
                }
            }
            (KeyCode::Home, _) => {
                self.cursor_pos = 0;
            }
            (KeyCode::End, _) => {
                self.cursor_pos = self.field().chars().count();
            }
            _ => {}
        }
        ConsoleAction::None
    }
}

fn byte_index(s: &str, char_pos: usize) -> usize {
    s.char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn category_color(category: PresentationCategory) -> Color {
    match category {
        PresentationCategory::Alive => Color::Green,
        PresentationCategory::Suspect => Color::Yellow,
        PresentationCategory::Dead => Color::Red,
        PresentationCategory::Unknown => Color::DarkGray,
    }
}

fn placeholder_row(msg: &str) -> Row<'static> {
    Row::new(vec![Cell::from(Span::styled(
        format!("  {msg}"),
        Style::default().fg(Color::DarkGray),
    ))])
}

fn waiting(block: Block<'_>) -> Paragraph<'_> {
    Paragraph::new(Line::from(Span::styled(
        "  Waiting for first refresh...",
        Style::default().fg(Color::DarkGray),
    )))
    .block(block)
}

/// Column of the input cursor, kept inside the form's right border.
fn cursor_column(area: Rect, pos: usize) -> u16 {
    let offset = u16::try_from(pos).unwrap_or(u16::MAX);
    area.x
        .saturating_add(13)
        .saturating_add(offset)
        .min(area.right().saturating_sub(2))
}

fn render_raw(frame: &mut Frame, area: Rect, title: &str, raw: Option<&str>) {
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let text = raw.unwrap_or("");
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    console: &mut MonitorConsole,
) -> Result<(), anyhow::Error> {
    let tick_rate = Duration::from_millis(100);

    loop {
        let snapshot = console.snapshot().await;
        terminal.draw(|frame| console.render(frame, &snapshot))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                match console.handle_key(key_event.code, key_event.modifiers) {
                    ConsoleAction::Quit => break,
                    ConsoleAction::Edited => console.sync_form().await,
                    ConsoleAction::Submit => console.submit(),
                    ConsoleAction::RefreshNow => console.refresh_now(),
                    ConsoleAction::None => {}
                }
            }
        }
    }

    Ok(())
}

/// Run the interactive monitor until the operator quits.
///
/// The refresh loop is expected to be running already; the console only
/// reads the shared state and triggers votes or manual refreshes.
pub async fn run_console(
    coordinator: Arc<RefreshCoordinator>,
    submitter: Arc<VoteSubmitter>,
) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!(
            "The console requires a terminal (TTY); use `votewatch snapshot` instead."
        ));
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut console = MonitorConsole::new(coordinator, submitter).await;

    let result = event_loop(&mut terminal, &mut console).await;
    restore_terminal(&mut terminal)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_error, FakeBackend};
    use crate::UiState;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use serde_json::json;

    async fn console_with(backend: FakeBackend) -> (Arc<FakeBackend>, MonitorConsole) {
        let backend = Arc::new(backend);
        let state = UiState::new("http://127.0.0.1:8000", "p1");
        let gate = state.submit_gate.clone();
        let coordinator = Arc::new(RefreshCoordinator::new(backend.clone(), state.shared()));
        let submitter = Arc::new(VoteSubmitter::new(Arc::clone(&coordinator), gate));
        (backend, MonitorConsole::new(coordinator, submitter).await)
    }

    fn buffer_lines(buf: &Buffer) -> Vec<String> {
        let area = buf.area;
        (0..area.height)
            .map(|y| (0..area.width).map(|x| buf[(x, y)].symbol()).collect())
            .collect()
    }

    async fn draw(console: &MonitorConsole) -> Vec<String> {
        let snapshot = console.snapshot().await;
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal
            .draw(|frame| console.render(frame, &snapshot))
            .unwrap();
        buffer_lines(terminal.backend().buffer())
    }

    fn line_of(lines: &[String], needle: &str) -> usize {
        lines
            .iter()
            .position(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("'{needle}' not on screen:\n{}", lines.join("\n")))
    }

    #[tokio::test]
    async fn draws_tables_in_render_order() {
        let (_backend, console) = console_with(FakeBackend::new(
            json!({"counts": {"banana": 2, "apple": 5}}),
            json!({"node": "node1", "peers": [
                {"peer": "10.0.0.2:7000", "state": "Suspect"},
                {"peer": "10.0.0.1:7000", "state": "ALIVE"},
            ]}),
        ))
        .await;
        console.coordinator.refresh_all().await;

        let lines = draw(&console).await;
        assert!(line_of(&lines, "apple") < line_of(&lines, "banana"));
        assert!(line_of(&lines, "10.0.0.2:7000") < line_of(&lines, "10.0.0.1:7000"));
        line_of(&lines, "Suspect");
        line_of(&lines, "via node1");
        line_of(&lines, "Origin: http://127.0.0.1:8000");
        line_of(&lines, "No errors");
        assert!(!lines.iter().any(|l| l.contains("Last update: never")));
    }

    #[tokio::test]
    async fn draws_placeholders_and_error() {
        let (backend, console) =
            console_with(FakeBackend::new(json!({"counts": {}}), json!({"peers": []}))).await;
        console.coordinator.refresh_all().await;
        let lines = draw(&console).await;
        line_of(&lines, "(no votes yet)");
        line_of(&lines, "(no peers configured)");

        backend.set_status(Err(http_error(500, "Internal Server Error", "gossip stalled")));
        console.coordinator.refresh_all().await;
        let lines = draw(&console).await;
        line_of(&lines, "500 Internal Server Error: gossip stalled");
        line_of(&lines, "(no votes yet)");
    }

    #[tokio::test]
    async fn submit_button_reflects_gate() {
        let (_backend, console) =
            console_with(FakeBackend::new(json!({}), json!({"peers": []}))).await;
        line_of(&draw(&console).await, "[ Vote ]");

        let guard = console
            .coordinator
            .state()
            .read()
            .await
            .submit_gate
            .try_acquire()
            .unwrap();
        line_of(&draw(&console).await, "submitting...");
        drop(guard);
        line_of(&draw(&console).await, "[ Vote ]");
    }

    #[tokio::test]
    async fn editing_updates_focused_field() {
        let (_backend, mut console) =
            console_with(FakeBackend::new(json!({}), json!({"peers": []}))).await;

        for c in "yés".chars() {
            assert_eq!(
                console.handle_key(KeyCode::Char(c), KeyModifiers::NONE),
                ConsoleAction::Edited
            );
        }
        console.handle_key(KeyCode::Left, KeyModifiers::NONE);
        console.handle_key(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(console.form.option, "ys");

        console.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        console.handle_key(KeyCode::Char('2'), KeyModifiers::NONE);
        assert_eq!(console.form.poll_id, "p12");

        console.sync_form().await;
        assert_eq!(console.coordinator.state().read().await.form.option, "ys");

        assert_eq!(
            console.handle_key(KeyCode::Enter, KeyModifiers::NONE),
            ConsoleAction::Submit
        );
        assert_eq!(
            console.handle_key(KeyCode::F(5), KeyModifiers::NONE),
            ConsoleAction::RefreshNow
        );
        assert_eq!(
            console.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            ConsoleAction::Quit
        );
    }

    #[tokio::test]
    async fn modified_chars_do_not_edit() {
        let (_backend, mut console) =
            console_with(FakeBackend::new(json!({}), json!({"peers": []}))).await;

        console.handle_key(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(
            console.handle_key(KeyCode::Char('a'), KeyModifiers::CONTROL),
            ConsoleAction::None
        );
        assert_eq!(
            console.handle_key(KeyCode::Char('x'), KeyModifiers::ALT),
            ConsoleAction::None
        );
        assert_eq!(console.form.option, "A");
        assert_eq!(console.cursor_pos, 1);
    }

    #[test]
    fn cursor_stays_inside_form() {
        let area = Rect::new(0, 34, 120, 6);
        assert_eq!(cursor_column(area, 0), 13);
        assert_eq!(cursor_column(area, 200), 118);
        assert_eq!(cursor_column(area, 100_000), 118);
        assert_eq!(cursor_column(Rect::new(u16::MAX - 4, 0, 4, 6), 5), u16::MAX - 2);
    }

    #[tokio::test]
    async fn long_input_still_draws() {
        let (_backend, mut console) =
            console_with(FakeBackend::new(json!({}), json!({"peers": []}))).await;
        console.form.option = "x".repeat(70_000);
        console.cursor_pos = 70_000;
        line_of(&draw(&console).await, "[ Vote ]");
    }
}
