//! Terminal front end for the session picker.

use std::{io, path::PathBuf, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use cxresume_picker::{Mode, PickerDecision, PickerOp, PickerSession, PreviewState};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Share of the screen height given to the session list.
const LIST_PERCENT: u16 = 35;
const LIST_MIN_ROWS: u16 = 8;

/// Restores the terminal even when the picker loop fails.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Run the picker until the user decides.
///
/// # Errors
/// Returns error if the terminal cannot be driven.
pub async fn run_picker(session: &mut PickerSession, dir_filter: Option<PathBuf>) -> io::Result<PickerDecision> {
    if let Some(decision) = session.start(dir_filter).await {
        return Ok(decision);
    }

    let mut guard = TerminalGuard::enter()?;
    let decision = event_loop(&mut guard.terminal, session).await;
    session.close();
    decision
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut PickerSession,
) -> io::Result<PickerDecision> {
    loop {
        while let Some(ev) = session.try_next_event() {
            session.handle_event(ev).await;
        }

        terminal.draw(|f| ui(f, session))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if let Some(op) = key_to_op(&key, session.mode()) {
            if let Some(decision) = session.apply(op).await {
                return Ok(decision);
            }
        }
    }
}

/// Translate a key press into a picker operation for the current mode.
#[must_use]
pub fn key_to_op(key: &KeyEvent, mode: &Mode) -> Option<PickerOp> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(PickerOp::Dismiss),
            _ => None,
        };
    }

    match mode {
        Mode::Editing { .. } => match key.code {
            KeyCode::Esc => Some(PickerOp::CancelEdit),
            KeyCode::Enter => Some(PickerOp::SubmitEdit),
            KeyCode::Backspace => Some(PickerOp::EditBackspace),
            KeyCode::Char(c) => Some(PickerOp::EditInput(c)),
            _ => None,
        },
        Mode::Browsing => match key.code {
            KeyCode::Up => Some(PickerOp::Move(-1)),
            KeyCode::Down => Some(PickerOp::Move(1)),
            KeyCode::PageUp => Some(PickerOp::Move(-10)),
            KeyCode::PageDown => Some(PickerOp::Move(10)),
            KeyCode::Home => Some(PickerOp::SelectFirst),
            KeyCode::End => Some(PickerOp::SelectLast),
            KeyCode::Left => Some(PickerOp::PrevPage),
            KeyCode::Right => Some(PickerOp::NextPage),
            KeyCode::Char('j') => Some(PickerOp::ScrollPreview(1)),
            KeyCode::Char('k') => Some(PickerOp::ScrollPreview(-1)),
            KeyCode::Enter => Some(PickerOp::Resume),
            KeyCode::Char('n') => Some(PickerOp::StartNew),
            KeyCode::Char('-') => Some(PickerOp::BeginEdit),
            KeyCode::Char('c') => Some(PickerOp::CopyId),
            KeyCode::Char('f') => Some(PickerOp::ToggleFullView),
            KeyCode::Char('q') | KeyCode::Esc => Some(PickerOp::Dismiss),
            _ => None,
        },
    }
}

fn key_hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Yellow)),
        Span::raw(format!(" {action}  ")),
    ]
}

fn header(session: &PickerSession) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = [
        key_hint("↑/↓", "select"),
        key_hint("←/→", "page"),
        key_hint("Enter", "resume"),
        key_hint("n", "new"),
        key_hint("-", "options"),
        key_hint("c", "copy id"),
        key_hint("j/k", "scroll"),
        key_hint("f", "full view"),
        key_hint("q", "quit"),
    ]
    .into_iter()
    .flatten()
    .collect();

    let options = session.edited_args().trim();
    if !options.is_empty() {
        spans.push(Span::raw("Options: "));
        spans.push(Span::styled(options.to_string(), Style::default().fg(Color::Magenta)));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(session.page_info(), Style::default().fg(Color::DarkGray)));
    Line::from(spans)
}

fn list_height(area: Rect) -> u16 {
    (area.height * LIST_PERCENT / 100).max(LIST_MIN_ROWS)
}

fn ui(f: &mut Frame, session: &PickerSession) {
    let area = f.area();
    let chunks = if session.full_view() {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area)
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(list_height(area)), Constraint::Min(3)])
            .split(area)
    };

    render_sessions(f, session, chunks[0]);
    render_preview(f, session, chunks[1]);

    if let Mode::Editing { buffer } = session.mode() {
        render_editor(f, buffer, area);
    }
}

fn render_sessions(f: &mut Frame, session: &PickerSession, area: Rect) {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Codex Sessions ");
    if let Some(notice) = session.notice() {
        block = block.title_bottom(Line::styled(format!(" {notice} "), Style::default().fg(Color::Yellow)));
    }
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    f.render_widget(Paragraph::new(header(session)), chunks[0]);

    if session.full_view() {
        return;
    }

    let items: Vec<ListItem> = session
        .rows()
        .into_iter()
        .map(|row| {
            ListItem::new(Line::from(vec![
                Span::styled(row.time, Style::default().fg(Color::Gray)),
                Span::raw(" | "),
                Span::styled(row.working_dir, Style::default().fg(Color::Cyan)),
                Span::raw(" | "),
                Span::styled(row.id, Style::default().fg(Color::Magenta)),
            ]))
        })
        .collect();
    let list = List::new(items)
        .highlight_style(Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(session.selected()));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_preview(f: &mut Frame, session: &PickerSession, area: Rect) {
    let pane = session.preview();
    let style = match pane.state {
        PreviewState::Failed(_) => Style::default().fg(Color::Red),
        PreviewState::Loading => Style::default().fg(Color::DarkGray),
        PreviewState::Empty | PreviewState::Ready(_) => Style::default(),
    };
    let lines: Vec<Line> = pane
        .lines()
        .into_iter()
        .map(|l| Line::styled(l, style))
        .collect();
    let scroll = u16::try_from(pane.scroll).unwrap_or(u16::MAX);

    let preview = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title(" Dialog Preview (recent, chronological) "),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(preview, area);
}

fn render_editor(f: &mut Frame, buffer: &str, area: Rect) {
    let [popup] = Layout::horizontal([Constraint::Percentage(80)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::vertical([Constraint::Length(3)]).flex(Flex::Center).areas(popup);

    let input = Paragraph::new(buffer)
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Extra Codex options (Enter to apply, Esc to cancel) "),
        );
    f.render_widget(Clear, popup);
    f.render_widget(input, popup);

    let width = u16::try_from(buffer.chars().count()).unwrap_or(u16::MAX);
    f.set_cursor_position((
        popup.x.saturating_add(width).saturating_add(1).min(popup.right().saturating_sub(2)),
        popup.y + 1,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn editing() -> Mode {
        Mode::Editing { buffer: String::new() }
    }

    #[test]
    fn browsing_keys() {
        let mode = Mode::Browsing;
        assert_eq!(key_to_op(&press(KeyCode::Down), &mode), Some(PickerOp::Move(1)));
        assert_eq!(key_to_op(&press(KeyCode::PageUp), &mode), Some(PickerOp::Move(-10)));
        assert_eq!(key_to_op(&press(KeyCode::Right), &mode), Some(PickerOp::NextPage));
        assert_eq!(key_to_op(&press(KeyCode::End), &mode), Some(PickerOp::SelectLast));
        assert_eq!(key_to_op(&press(KeyCode::Char('k')), &mode), Some(PickerOp::ScrollPreview(-1)));
        assert_eq!(key_to_op(&press(KeyCode::Enter), &mode), Some(PickerOp::Resume));
        assert_eq!(key_to_op(&press(KeyCode::Char('n')), &mode), Some(PickerOp::StartNew));
        assert_eq!(key_to_op(&press(KeyCode::Char('-')), &mode), Some(PickerOp::BeginEdit));
        assert_eq!(key_to_op(&press(KeyCode::Char('c')), &mode), Some(PickerOp::CopyId));
        assert_eq!(key_to_op(&press(KeyCode::Char('f')), &mode), Some(PickerOp::ToggleFullView));
        assert_eq!(key_to_op(&press(KeyCode::Char('x')), &mode), None);
    }

    #[test]
    fn dismissal_keys() {
        for key in [press(KeyCode::Char('q')), press(KeyCode::Esc), ctrl('c')] {
            assert_eq!(key_to_op(&key, &Mode::Browsing), Some(PickerOp::Dismiss));
        }
        assert_eq!(key_to_op(&ctrl('c'), &editing()), Some(PickerOp::Dismiss));
        assert_eq!(key_to_op(&ctrl('x'), &Mode::Browsing), None);
    }

    #[test]
    fn editor_keys_capture_text() {
        let mode = editing();
        assert_eq!(key_to_op(&press(KeyCode::Char('q')), &mode), Some(PickerOp::EditInput('q')));
        assert_eq!(
            key_to_op(&KeyEvent::new(KeyCode::Char('M'), KeyModifiers::SHIFT), &mode),
            Some(PickerOp::EditInput('M'))
        );
        assert_eq!(key_to_op(&press(KeyCode::Backspace), &mode), Some(PickerOp::EditBackspace));
        assert_eq!(key_to_op(&press(KeyCode::Enter), &mode), Some(PickerOp::SubmitEdit));
        assert_eq!(key_to_op(&press(KeyCode::Esc), &mode), Some(PickerOp::CancelEdit));
        assert_eq!(key_to_op(&press(KeyCode::Up), &mode), None);
    }

    #[test]
    fn list_height_has_a_floor() {
        assert_eq!(list_height(Rect::new(0, 0, 80, 10)), LIST_MIN_ROWS);
        assert_eq!(list_height(Rect::new(0, 0, 80, 100)), 35);
    }
}
