/// Ratatui-based TUI for Backster.
///
/// Architecture:
///   main thread:    event loop: crossterm keyboard events + mpsc UiEvent drain
///   session task:   tokio::spawn: fetches the session token once, reports back
///   exchange task:  tokio::spawn per dispatch: reports the outcome via UiEvent
///
/// All conversation state lives in the `ConversationController` held by
/// `AppState` and is only touched from this loop, so transitions never
/// interleave.
///
/// Layout:
///   ┌────────────────────────────────────────────────┐
///   │  conversation history (scrollable, Min(0))     │
///   ├────────────────────────────────────────────────┤
///   │  status bar (1 line)                           │
///   ├────────────────────────────────────────────────┤
///   │  input box / employment picker                 │
///   └────────────────────────────────────────────────┘
pub mod render;
pub mod chat;
pub mod overlays;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use crate::client::{AnsweringService, ExchangeResponse, HttpAnsweringService};
use crate::config::ResolvedConfig;
use crate::controller::{ConversationController, ExchangeRequest, RequestSeq};
use crate::conversation::EmploymentType;
use crate::error::DispatchFailure;
use crate::session::{self, Session};

// ── UiEvent, typed events from background tasks → TUI ───────────────────────

#[derive(Debug)]
pub enum UiEvent {
    /// Startup token fetch finished; an absent session means chat stays off
    SessionResolved(Session),
    /// A chat exchange finished, failed, or its task went away
    ExchangeSettled {
        seq: RequestSeq,
        outcome: Result<ExchangeResponse, DispatchFailure>,
    },
}

// ── Mode, TUI modal state ────────────────────────────────────────────────────

/// Whether the citation browser is showing is read from the controller's
/// `CitationBrowser`, not tracked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Employment picker replaces the input box
    Onboarding,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Connecting,
    Ready,
    Unavailable,
}

// ── AppState ──────────────────────────────────────────────────────────────────

pub struct AppState {
    pub chat: ConversationController,
    pub session_status: SessionStatus,
    pub profile: String,
    pub cursor: usize,        // byte offset in input
    pub mode: Mode,
    pub scroll: usize,        // lines scrolled up in history
    pub picker_selected: usize,
    pub citation_scroll: usize,
    pub spinner_tick: u32,
    pub show_timestamps: bool,
}

impl AppState {
    pub fn new(resolved: &ResolvedConfig, service: Arc<dyn AnsweringService>) -> Self {
        let chat = ConversationController::new(service, Session::absent(), resolved.park)
            .restore_draft_on_failure(resolved.restore_draft_on_failure);
        Self {
            chat,
            session_status: SessionStatus::Connecting,
            profile: resolved.profile_name.clone(),
            cursor: 0,
            mode: Mode::Onboarding,
            scroll: 0,
            picker_selected: 0,
            citation_scroll: 0,
            spinner_tick: 0,
            show_timestamps: resolved.show_timestamps,
        }
    }

    /// Failures stay silent here: they only reach the log file.
    pub fn apply_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::SessionResolved(session) => {
                self.session_status = if session.is_established() {
                    SessionStatus::Ready
                } else {
                    SessionStatus::Unavailable
                };
                self.chat.set_session(session);
            }
            UiEvent::ExchangeSettled { seq, outcome } => {
                let input_was_empty = self.chat.input().is_empty();
                if !self.chat.settle(seq, outcome) {
                    return;
                }
                // A restored draft puts the cursor at its end
                if input_was_empty {
                    self.cursor = self.chat.input().len();
                }
                self.scroll = 0;
            }
        }
    }
}

// ── Terminal setup / teardown ─────────────────────────────────────────────────

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

// ── Main TUI run loop ─────────────────────────────────────────────────────────

pub async fn run(resolved: ResolvedConfig) -> Result<()> {
    let service: Arc<dyn AnsweringService> = Arc::new(HttpAnsweringService::new(
        resolved.endpoint.clone(),
        resolved.referer.clone(),
        resolved.timeout,
    )?);

    let mut terminal = setup_terminal()?;

    // Panic hook: restore terminal before printing panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        orig_hook(info);
    }));

    let result = event_loop(&mut terminal, resolved, service).await;

    restore_terminal(&mut terminal);
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    resolved: ResolvedConfig,
    service: Arc<dyn AnsweringService>,
) -> Result<()> {
    let mut state = AppState::new(&resolved, Arc::clone(&service));

    // Channel: background tasks → TUI
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();

    // Session token, fetched once
    {
        let service = Arc::clone(&service);
        let key = resolved.key.clone();
        let tx = ui_tx.clone();
        tokio::spawn(async move {
            let session = session::establish(service.as_ref(), key.as_deref()).await;
            let _ = tx.send(UiEvent::SessionResolved(session));
        });
    }

    let mut crossterm_events = EventStream::new();
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(120));

    // Splash screen
    terminal.draw(|f| render::draw_splash(f, &state))?;
    tokio::time::sleep(tokio::time::Duration::from_millis(900)).await;
    terminal.draw(|f| render::draw(f, &state))?;

    loop {
        tokio::select! {
            // ── Animation tick ────────────────────────────────────────────────
            _ = ticker.tick() => {
                if state.chat.snapshot().is_in_flight() {
                    state.spinner_tick = state.spinner_tick.wrapping_add(1);
                    terminal.draw(|f| render::draw(f, &state))?;
                }
            }

            // ── Drain UI events from background tasks ─────────────────────────
            Some(ev) = ui_rx.recv() => {
                state.apply_event(ev);
                terminal.draw(|f| render::draw(f, &state))?;
            }

            // ── Keyboard/resize events ────────────────────────────────────────
            Some(Ok(ev)) = crossterm_events.next() => {
                if let Event::Key(key) = ev {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let keep = handle_key(key, &mut state, &ui_tx)?;
                    if !keep { break; }
                }
                terminal.draw(|f| render::draw(f, &state))?;
            }
        }
    }

    tracing::info!(messages = state.chat.snapshot().conversation.log.len(), "leaving chat");
    Ok(())
}

// ── Key handler ───────────────────────────────────────────────────────────────

fn handle_key(
    key: KeyEvent,
    state: &mut AppState,
    ui_tx: &mpsc::UnboundedSender<UiEvent>,
) -> Result<bool> {
    // Ctrl+C quits from anywhere
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(false);
    }

    match state.mode {
        Mode::Onboarding => Ok(handle_onboarding_key(key, state)),
        Mode::Normal if state.chat.snapshot().citations.is_visible() => {
            handle_browser_key(key, state);
            Ok(true)
        }
        Mode::Normal => Ok(handle_normal_key(key, state, ui_tx)),
    }
}

fn handle_onboarding_key(key: KeyEvent, state: &mut AppState) -> bool {
    let count = EmploymentType::ALL.len();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            state.picker_selected = (state.picker_selected + count - 1) % count;
        }
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
            state.picker_selected = (state.picker_selected + 1) % count;
        }
        KeyCode::Enter => {
            let kind = EmploymentType::ALL[state.picker_selected.min(count - 1)];
            state.chat.classify(kind);
            state.mode = Mode::Normal;
            state.scroll = 0;
        }
        KeyCode::Esc => return false,
        _ => {}
    }
    true
}

fn handle_browser_key(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => {
            state.chat.citations_mut().next();
            state.citation_scroll = 0;
        }
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => {
            state.chat.citations_mut().previous();
            state.citation_scroll = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            state.citation_scroll = state.citation_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.citation_scroll = state.citation_scroll.saturating_sub(1);
        }
        KeyCode::PageDown => {
            state.citation_scroll = state.citation_scroll.saturating_add(20);
        }
        KeyCode::PageUp => {
            state.citation_scroll = state.citation_scroll.saturating_sub(20);
        }
        KeyCode::Esc | KeyCode::Char('q') => {
            state.chat.citations_mut().close();
        }
        _ => {}
    }
}

fn handle_normal_key(
    key: KeyEvent,
    state: &mut AppState,
    ui_tx: &mpsc::UnboundedSender<UiEvent>,
) -> bool {
    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) => return false,
        // Ctrl+O: open sources for the latest answer
        (KeyModifiers::CONTROL, KeyCode::Char('o')) => {
            if state.chat.open_citations() {
                state.citation_scroll = 0;
            } else {
                tracing::debug!("citation browser not opened: no sources for the latest answer");
            }
        }
        (KeyModifiers::NONE, KeyCode::Enter) => {
            submit_input(state, ui_tx);
        }
        (KeyModifiers::NONE, KeyCode::Backspace) => {
            input_backspace(state.chat.input_mut(), &mut state.cursor);
        }
        (KeyModifiers::NONE, KeyCode::Delete) => {
            input_delete_forward(state.chat.input_mut(), &mut state.cursor);
        }
        // Ctrl+Backspace / Ctrl+W: delete word before cursor
        (KeyModifiers::CONTROL, KeyCode::Backspace) | (KeyModifiers::CONTROL, KeyCode::Char('w')) => {
            input_delete_word(state.chat.input_mut(), &mut state.cursor);
        }
        (KeyModifiers::NONE, KeyCode::Left) => {
            state.cursor = prev_char_boundary(state.chat.input(), state.cursor);
        }
        (KeyModifiers::NONE, KeyCode::Right) => {
            state.cursor = next_char_boundary(state.chat.input(), state.cursor);
        }
        (KeyModifiers::CONTROL, KeyCode::Left) => {
            state.cursor = word_left(state.chat.input(), state.cursor);
        }
        (KeyModifiers::CONTROL, KeyCode::Right) => {
            state.cursor = word_right(state.chat.input(), state.cursor);
        }
        (_, KeyCode::Home) | (KeyModifiers::CONTROL, KeyCode::Char('a')) => {
            state.cursor = 0;
        }
        (_, KeyCode::End) | (KeyModifiers::CONTROL, KeyCode::Char('e')) => {
            state.cursor = state.chat.input().len();
        }
        (_, KeyCode::PageUp) => {
            state.scroll = state.scroll.saturating_add(10);
        }
        (_, KeyCode::PageDown) => {
            state.scroll = state.scroll.saturating_sub(10);
        }
        (_, KeyCode::Up) => {
            state.scroll = state.scroll.saturating_add(1);
        }
        (_, KeyCode::Down) => {
            state.scroll = state.scroll.saturating_sub(1);
        }
        (KeyModifiers::NONE, KeyCode::Char(c)) | (KeyModifiers::SHIFT, KeyCode::Char(c)) => {
            let at = state.cursor.min(state.chat.input().len());
            state.chat.input_mut().insert(at, c);
            state.cursor = at + c.len_utf8();
        }
        _ => {}
    }
    true
}

// ── Exchange launcher ─────────────────────────────────────────────────────────

/// Run the dispatch preconditions against the controller and, when
/// accepted, spawn the exchange. A rejected submit leaves the input as typed.
fn submit_input(state: &mut AppState, ui_tx: &mpsc::UnboundedSender<UiEvent>) {
    let request = match state.chat.submit() {
        Ok(request) => request,
        Err(_) => return,
    };
    state.cursor = 0;
    state.scroll = 0;

    launch_exchange(state.chat.service(), request, ui_tx.clone());
}

fn launch_exchange(
    service: Arc<dyn AnsweringService>,
    request: ExchangeRequest,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
) {
    tokio::spawn(async move {
        let pending = PendingExchange::new(request.seq, ui_tx);
        let outcome = service.chat(&request).await;
        pending.settle(outcome);
    });
}

/// Reports exactly one `ExchangeSettled` for its request. If the task is
/// dropped or panics before settling, the report is `Abandoned`.
struct PendingExchange {
    seq: RequestSeq,
    tx: mpsc::UnboundedSender<UiEvent>,
    settled: bool,
}

impl PendingExchange {
    fn new(seq: RequestSeq, tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { seq, tx, settled: false }
    }

    fn settle(mut self, outcome: Result<ExchangeResponse, DispatchFailure>) {
        self.settled = true;
        let _ = self.tx.send(UiEvent::ExchangeSettled { seq: self.seq, outcome });
    }
}

impl Drop for PendingExchange {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.tx.send(UiEvent::ExchangeSettled {
                seq: self.seq,
                outcome: Err(DispatchFailure::Abandoned),
            });
        }
    }
}

// ── Input editing helpers ─────────────────────────────────────────────────────

/// Remove the character immediately before the cursor (UTF-8 safe).
fn input_backspace(input: &mut String, cursor: &mut usize) {
    if *cursor == 0 {
        return;
    }
    let prev = prev_char_boundary(input, *cursor);
    input.drain(prev..*cursor);
    *cursor = prev;
}

/// Delete the character at the cursor position.
fn input_delete_forward(input: &mut String, cursor: &mut usize) {
    if *cursor >= input.len() {
        return;
    }
    let next = next_char_boundary(input, *cursor);
    input.drain(*cursor..next);
}

/// Delete the word immediately before the cursor (stops at whitespace boundary).
fn input_delete_word(input: &mut String, cursor: &mut usize) {
    if *cursor == 0 {
        return;
    }
    let start = word_left(input, *cursor);
    input.drain(start..*cursor);
    *cursor = start;
}

fn prev_char_boundary(s: &str, pos: usize) -> usize {
    s[..pos.min(s.len())]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    s[pos..]
        .chars()
        .next()
        .map(|c| pos + c.len_utf8())
        .unwrap_or(s.len())
}

/// Start of the previous word (skip trailing spaces, then the word).
fn word_left(s: &str, pos: usize) -> usize {
    let head = &s[..pos.min(s.len())];
    let trimmed = head.trim_end();
    trimmed
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0)
}

/// Just past the end of the next word.
fn word_right(s: &str, pos: usize) -> usize {
    let pos = pos.min(s.len());
    let tail = &s[pos..];
    let skipped = tail.len() - tail.trim_start().len();
    let rest = &tail[skipped..];
    let word = rest.find(char::is_whitespace).unwrap_or(rest.len());
    pos + skipped + word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::{CitationSet, ExternalMarkup};
    use crate::client::testing::ScriptedService;
    use crate::config::{ConfigFile, Overrides};
    use crate::conversation::Role;
    use crate::session::SessionToken;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn state_with(service: Arc<dyn AnsweringService>, restore: bool) -> AppState {
        let mut resolved = ResolvedConfig::resolve(&ConfigFile::default(), &Overrides::default());
        resolved.restore_draft_on_failure = restore;
        AppState::new(&resolved, service)
    }

    fn fresh_state() -> AppState {
        state_with(Arc::new(ScriptedService::with_token("tok")), false)
    }

    /// Session established and onboarding done, in Normal mode.
    fn chatting(service: Arc<dyn AnsweringService>, restore: bool) -> AppState {
        let mut state = state_with(service, restore);
        state.apply_event(UiEvent::SessionResolved(Session::with_token(SessionToken::new("tok"))));
        state.chat.classify(EmploymentType::Permanent);
        state.mode = Mode::Normal;
        state
    }

    fn type_text(state: &mut AppState, text: &str, tx: &mpsc::UnboundedSender<UiEvent>) {
        for c in text.chars() {
            handle_key(key(KeyCode::Char(c)), state, tx).unwrap();
        }
    }

    fn answer(text: &str, docs: &[(&str, &str)]) -> ExchangeResponse {
        let labels = docs.iter().map(|(l, _)| l.to_string()).collect();
        let bodies = docs.iter().map(|(_, b)| ExternalMarkup::new(*b)).collect();
        ExchangeResponse {
            text: text.to_string(),
            citations: CitationSet::new(labels, bodies),
        }
    }

    /// Draw one frame into an in-memory terminal and return its text.
    fn rendered(state: &AppState) -> String {
        let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render::draw(f, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn log_len(state: &AppState) -> usize {
        state.chat.snapshot().conversation.log.len()
    }

    #[test]
    fn test_starts_in_onboarding_with_seed() {
        let state = fresh_state();
        assert_eq!(state.mode, Mode::Onboarding);
        assert_eq!(state.session_status, SessionStatus::Connecting);
        assert_eq!(log_len(&state), 1);
    }

    #[test]
    fn test_picker_classifies_and_enters_normal_mode() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = fresh_state();

        handle_key(key(KeyCode::Down), &mut state, &tx).unwrap();
        handle_key(key(KeyCode::Enter), &mut state, &tx).unwrap();

        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(
            state.chat.snapshot().conversation.classification(),
            Some(EmploymentType::Seasonal)
        );
        assert_eq!(log_len(&state), 3);
    }

    #[tokio::test]
    async fn test_enter_dispatches_and_settles_through_channel() {
        let scripted = Arc::new(ScriptedService::with_token("tok").answer("Svar", &[("Doc A", "<p>x</p>")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = chatting(scripted.clone(), false);

        type_text(&mut state, "Var parkerar jag?", &tx);
        handle_key(key(KeyCode::Enter), &mut state, &tx).unwrap();

        assert!(state.chat.input().is_empty());
        assert_eq!(state.cursor, 0);
        assert!(state.chat.snapshot().is_in_flight());
        assert_eq!(log_len(&state), 4);

        let ev = rx.recv().await.unwrap();
        state.apply_event(ev);

        assert!(!state.chat.snapshot().is_in_flight());
        assert_eq!(log_len(&state), 5);
        assert_eq!(scripted.requests()[0].query_text, "Var parkerar jag?");

        handle_key(ctrl('o'), &mut state, &tx).unwrap();
        assert!(state.chat.snapshot().citations.is_visible());
        // Esc closes the browser instead of quitting
        assert!(handle_key(key(KeyCode::Esc), &mut state, &tx).unwrap());
        assert_eq!(state.mode, Mode::Normal);
        assert!(!state.chat.snapshot().citations.is_visible());
    }

    #[tokio::test]
    async fn test_enter_while_in_flight_spawns_no_second_exchange() {
        let scripted = Arc::new(ScriptedService::with_token("tok").hanging());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = chatting(scripted.clone(), false);

        type_text(&mut state, "första", &tx);
        handle_key(key(KeyCode::Enter), &mut state, &tx).unwrap();
        tokio::task::yield_now().await;
        let after_first = log_len(&state);

        type_text(&mut state, "andra", &tx);
        handle_key(key(KeyCode::Enter), &mut state, &tx).unwrap();
        tokio::task::yield_now().await;

        assert_eq!(scripted.chat_calls(), 1);
        assert_eq!(after_first, 4);
        assert_eq!(log_len(&state), after_first);
        assert_eq!(state.chat.input(), "andra");
        assert!(state.chat.snapshot().is_in_flight());
    }

    #[test]
    fn test_enter_without_session_keeps_draft() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = fresh_state();
        state.apply_event(UiEvent::SessionResolved(Session::absent()));
        assert_eq!(state.session_status, SessionStatus::Unavailable);
        assert!(!rendered(&state).contains('⚠'));

        handle_key(key(KeyCode::Enter), &mut state, &tx).unwrap();
        type_text(&mut state, "hej", &tx);
        handle_key(key(KeyCode::Enter), &mut state, &tx).unwrap();

        assert_eq!(state.chat.input(), "hej");
        assert_eq!(log_len(&state), 3);
    }

    #[test]
    fn test_failed_exchange_settles_without_bot_message() {
        let mut state = chatting(Arc::new(ScriptedService::with_token("tok")), false);
        state.chat.set_input("fråga");
        let request = state.chat.submit().unwrap();

        state.apply_event(UiEvent::ExchangeSettled {
            seq: request.seq,
            outcome: Err(DispatchFailure::Status(403)),
        });

        assert!(!state.chat.snapshot().is_in_flight());
        assert_eq!(state.chat.snapshot().conversation.log.last().unwrap().role, Role::User);
        let screen = rendered(&state);
        assert!(!screen.contains('✗'), "{screen}");
        assert!(!screen.contains("gått ut"), "{screen}");
        assert!(state.chat.input().is_empty());
    }

    #[test]
    fn test_failed_exchange_restores_draft_when_enabled() {
        let mut state = chatting(Arc::new(ScriptedService::with_token("tok")), true);
        state.chat.set_input("fråga");
        let request = state.chat.submit().unwrap();

        state.apply_event(UiEvent::ExchangeSettled {
            seq: request.seq,
            outcome: Err(DispatchFailure::Transport("reset".into())),
        });
        assert_eq!(state.chat.input(), "fråga");
        assert_eq!(state.cursor, "fråga".len());
    }

    #[test]
    fn test_stale_settlement_is_ignored() {
        let mut state = chatting(Arc::new(ScriptedService::with_token("tok")), false);
        let before = state.chat.snapshot().clone();
        state.apply_event(UiEvent::ExchangeSettled {
            seq: RequestSeq(42),
            outcome: Ok(answer("sent", &[])),
        });
        assert_eq!(state.chat.snapshot(), &before);
    }

    #[tokio::test]
    async fn test_pending_exchange_reports_abandoned_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(PendingExchange::new(RequestSeq(7), tx));
        match rx.recv().await.unwrap() {
            UiEvent::ExchangeSettled { seq, outcome } => {
                assert_eq!(seq, RequestSeq(7));
                assert_eq!(outcome.unwrap_err(), DispatchFailure::Abandoned);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settled_pending_exchange_reports_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        PendingExchange::new(RequestSeq(1), tx).settle(Ok(answer("ok", &[])));
        assert!(matches!(rx.recv().await, Some(UiEvent::ExchangeSettled { outcome: Ok(_), .. })));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_browser_keys_cycle_and_close() {
        let mut state = chatting(Arc::new(ScriptedService::with_token("tok")), false);
        state.chat.set_input("fråga");
        let request = state.chat.submit().unwrap();
        state.chat.settle(request.seq, Ok(answer("Svar", &[("A", "<p>a</p>"), ("B", "<p>b</p>")])));
        assert!(state.chat.open_citations());

        handle_browser_key(key(KeyCode::Char('l')), &mut state);
        assert_eq!(state.chat.snapshot().citations.set().cursor(), 1);
        handle_browser_key(key(KeyCode::Right), &mut state);
        assert_eq!(state.chat.snapshot().citations.set().cursor(), 0);
        handle_browser_key(key(KeyCode::Char('h')), &mut state);
        assert_eq!(state.chat.snapshot().citations.set().cursor(), 1);
        handle_browser_key(key(KeyCode::Char('q')), &mut state);
        assert!(!state.chat.snapshot().citations.is_visible());
        assert_eq!(state.chat.snapshot().citations.set().len(), 2);
    }

    #[test]
    fn test_ctrl_o_without_answer_stays_normal() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = chatting(Arc::new(ScriptedService::with_token("tok")), false);
        handle_key(ctrl('o'), &mut state, &tx).unwrap();
        assert!(!state.chat.snapshot().citations.is_visible());
    }

    #[test]
    fn test_ctrl_c_quits_from_onboarding() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = fresh_state();
        assert!(!handle_key(ctrl('c'), &mut state, &tx).unwrap());
    }

    #[test]
    fn test_typing_inserts_at_cursor() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = chatting(Arc::new(ScriptedService::with_token("tok")), false);
        type_text(&mut state, "hej", &tx);
        handle_key(key(KeyCode::Home), &mut state, &tx).unwrap();
        type_text(&mut state, "å", &tx);
        assert_eq!(state.chat.input(), "åhej");
        assert_eq!(state.cursor, "å".len());
    }

    #[test]
    fn test_input_editing_is_utf8_safe() {
        let mut input = "hej då".to_string();
        let mut cursor = input.len();
        input_backspace(&mut input, &mut cursor);
        assert_eq!(input, "hej d");
        assert_eq!(prev_char_boundary("å", 2), 0);
        assert_eq!(next_char_boundary("åb", 0), 2);
    }

    #[test]
    fn test_word_motion() {
        let s = "var ligger  personalingången";
        assert_eq!(word_left(s, s.len()), 12);
        assert_eq!(word_left(s, 12), 4);
        assert_eq!(word_right(s, 3), 10);
        let mut input = s.to_string();
        let mut cursor = input.len();
        input_delete_word(&mut input, &mut cursor);
        assert_eq!(input, "var ligger  ");
    }
}
