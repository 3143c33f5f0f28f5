use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;

use crate::llm::CompletionClient;
use crate::prompt;
use crate::session::{Session, MAX_PRODUCTS, MIN_PRODUCTS};

/// Which input widget currently receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ApiKey,
    Count,
    Name(usize),
    Terms(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// What the output pane shows. Exactly one of these at a time; the
/// credential prompt is derived from the session instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputView {
    None,
    Comparison(String),
    Warning(String),
    Error(String),
}

pub struct App {
    pub session: Session,
    pub focus: Focus,
    pub popup: Popup,
    pub output: OutputView,
    pub result_scroll: u16,

    /// True from submit until the completion call resolves. All key input
    /// is dropped while set; there is no cancellation.
    pub busy: bool,

    // Two-stage request handoff: submit() composes and parks the prompt
    // here, the first tick() after it only arms the request, the second
    // performs the call. The event loop draws between ticks, so the armed
    // stage guarantees one frame with the busy indicator before the await
    // blocks the loop.
    pending_prompt: Option<String>,
    request_armed: bool,
    request_started: Option<Instant>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    client: Box<dyn CompletionClient>,
}

impl App {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self {
            session: Session::default(),
            focus: Focus::ApiKey,
            popup: Popup::None,
            output: OutputView::None,
            result_scroll: 0,
            busy: false,
            pending_prompt: None,
            request_armed: false,
            request_started: None,
            status_message: None,
            status_message_time: None,
            client,
        }
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Focus order for Tab cycling. Without a credential the form is
    /// disabled, so only the sidebar fields are reachable.
    fn focus_ring(&self) -> Vec<Focus> {
        let mut ring = vec![Focus::ApiKey, Focus::Count];
        if self.session.has_credential() {
            for i in 0..self.session.product_count {
                ring.push(Focus::Name(i));
                ring.push(Focus::Terms(i));
            }
        }
        ring
    }

    fn focus_next(&mut self) {
        let ring = self.focus_ring();
        let pos = ring.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = ring[(pos + 1) % ring.len()];
    }

    fn focus_prev(&mut self) {
        let ring = self.focus_ring();
        let pos = ring.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = ring[pos.checked_sub(1).unwrap_or(ring.len() - 1)];
    }

    /// Drop focus back to the sidebar when it points at a column that no
    /// longer exists (after shrinking) or at a disabled form.
    fn clamp_focus(&mut self) {
        let valid = match self.focus {
            Focus::ApiKey | Focus::Count => true,
            Focus::Name(i) | Focus::Terms(i) => {
                self.session.has_credential() && i < self.session.product_count
            }
        };
        if !valid {
            self.focus = Focus::Count;
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // One request at a time: ignore everything until it resolves.
        if self.busy {
            return Ok(());
        }

        if self.popup == Popup::Help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::F(1) | KeyCode::Enter | KeyCode::Char('q')
            ) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::F(1) => self.popup = Popup::Help,
            KeyCode::F(2) => self.submit(),

            KeyCode::Tab => self.focus_next(),
            KeyCode::BackTab => self.focus_prev(),

            KeyCode::PageDown => {
                if matches!(self.output, OutputView::Comparison(_)) {
                    self.result_scroll = self.result_scroll.saturating_add(5);
                }
            }
            KeyCode::PageUp => {
                self.result_scroll = self.result_scroll.saturating_sub(5);
            }

            _ => self.handle_field_key(key),
        }
        Ok(())
    }

    fn handle_field_key(&mut self, key: KeyEvent) {
        match self.focus {
            Focus::ApiKey => match key.code {
                KeyCode::Char(c) => self.session.api_key.push(c),
                KeyCode::Backspace => {
                    self.session.api_key.pop();
                    self.clamp_focus();
                }
                KeyCode::Enter => self.focus_next(),
                _ => {}
            },
            Focus::Count => match key.code {
                KeyCode::Up | KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.adjust_count(1);
                }
                KeyCode::Down | KeyCode::Left | KeyCode::Char('-') => {
                    self.adjust_count(-1);
                }
                _ => {}
            },
            Focus::Name(i) => match key.code {
                KeyCode::Char(c) => {
                    if let Some(entry) = self.session.entries.get_mut(i) {
                        entry.name.push(c);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(entry) = self.session.entries.get_mut(i) {
                        entry.name.pop();
                    }
                }
                // Enter on the name drops into the terms box below it
                KeyCode::Enter => self.focus = Focus::Terms(i),
                _ => {}
            },
            Focus::Terms(i) => match key.code {
                KeyCode::Char(c) => {
                    if let Some(entry) = self.session.entries.get_mut(i) {
                        entry.terms.push(c);
                    }
                }
                KeyCode::Enter => {
                    if let Some(entry) = self.session.entries.get_mut(i) {
                        entry.terms.push('\n');
                    }
                }
                KeyCode::Backspace => {
                    if let Some(entry) = self.session.entries.get_mut(i) {
                        entry.terms.pop();
                    }
                }
                _ => {}
            },
        }
    }

    fn adjust_count(&mut self, delta: isize) {
        let current = self.session.product_count as isize;
        let next = (current + delta).clamp(MIN_PRODUCTS as isize, MAX_PRODUCTS as isize);
        if next != current {
            self.session.set_product_count(next as usize);
            self.clamp_focus();
            self.set_status(format!("Comparing {} products", next));
        }
    }

    /// Validate the form and park the composed prompt for the next tick.
    /// Never performs I/O itself.
    fn submit(&mut self) {
        if !self.session.has_credential() {
            self.set_status("Enter your API key first");
            return;
        }

        if let Some(i) = self.session.first_blank_entry() {
            self.output = OutputView::Warning(format!(
                "Product {} has no policy terms yet. Paste terms into every open column, \
                 or reduce the product count in the sidebar.",
                i + 1
            ));
            return;
        }

        let prompt = prompt::compose(&self.session.entries);
        tracing::info!(
            products = self.session.product_count,
            prompt_len = prompt.len(),
            "submitting comparison"
        );

        self.pending_prompt = Some(prompt);
        self.request_started = Some(Instant::now());
        self.busy = true;
    }

    pub async fn tick(&mut self) -> Result<()> {
        // Stage one: a submission from this iteration's key handling is
        // only armed here, so the loop draws the busy frame before the
        // call happens.
        if self.pending_prompt.is_some() && !self.request_armed {
            self.request_armed = true;
            return Ok(());
        }

        // Stage two: perform the parked completion call. The await blocks
        // the event loop until the service answers; the busy frame is on
        // screen and a second submission cannot start in the meantime.
        if let Some(prompt) = self.pending_prompt.take() {
            self.request_armed = false;
            let api_key = self.session.api_key.clone();
            let result = self.client.complete(&api_key, &prompt).await;
            let elapsed = self.request_started.take().map(|t| t.elapsed());
            self.busy = false;

            match result {
                Ok(text) => {
                    self.result_scroll = 0;
                    self.output = OutputView::Comparison(text);
                    if let Some(d) = elapsed {
                        self.set_status(format!("Comparison ready in {:.1}s", d.as_secs_f64()));
                    }
                }
                Err(e) => {
                    tracing::debug!("completion request failed: {}", e);
                    self.output =
                        OutputView::Error(format!("Request failed (check your API key): {}", e));
                }
            }
        }

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionError;
    use async_trait::async_trait;
    use crossterm::event::KeyModifiers;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    enum StubReply {
        Text(String),
        Error(String),
    }

    struct StubClient {
        reply: StubReply,
        calls: Arc<AtomicUsize>,
        last_prompt: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _key: &str, prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match &self.reply {
                StubReply::Text(t) => Ok(t.clone()),
                StubReply::Error(e) => Err(CompletionError::Service(e.clone())),
            }
        }
    }

    fn stubbed_app(reply: StubReply) -> (App, Arc<AtomicUsize>, Arc<Mutex<Option<String>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_prompt = Arc::new(Mutex::new(None));
        let app = App::new(Box::new(StubClient {
            reply,
            calls: calls.clone(),
            last_prompt: last_prompt.clone(),
        }));
        (app, calls, last_prompt)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn fill_session(app: &mut App) {
        app.session.api_key = "AIza-test".to_string();
        for (i, entry) in app.session.entries.iter_mut().enumerate() {
            entry.terms = format!("terms for product {}", i + 1);
        }
    }

    #[tokio::test]
    async fn test_blank_terms_block_submission() {
        let (mut app, calls, _) = stubbed_app(StubReply::Text("T".to_string()));
        app.session.api_key = "AIza-test".to_string();
        app.session.entries[0].terms = "only the first column is filled".to_string();

        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();

        assert!(matches!(app.output, OutputView::Warning(_)));
        assert!(!app.busy);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_renders_text_verbatim() {
        let (mut app, calls, _) = stubbed_app(StubReply::Text("T".to_string()));
        fill_session(&mut app);

        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        assert!(app.busy);

        // First tick only arms the request; the call happens on the second
        app.tick().await.unwrap();
        assert!(app.busy);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        app.tick().await.unwrap();
        assert!(!app.busy);
        assert_eq!(app.output, OutputView::Comparison("T".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_busy_frame_rendered_before_call() {
        let (mut app, calls, _) =
            stubbed_app(StubReply::Text("| Product | Coverage |".to_string()));
        fill_session(&mut app);

        let backend = ratatui::backend::TestBackend::new(100, 30);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();

        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The frame the event loop draws between the two ticks must carry
        // the busy indicator
        terminal.draw(|f| crate::ui::draw(f, &app)).unwrap();
        let content: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("Analyzing 3 policies"));

        app.tick().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        terminal.draw(|f| crate::ui::draw(f, &app)).unwrap();
        let content: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(!content.contains("Analyzing 3 policies"));
        assert!(content.contains("| Product | Coverage |"));
    }

    #[tokio::test]
    async fn test_failure_renders_error_message() {
        let (mut app, _, _) = stubbed_app(StubReply::Error("E".to_string()));
        fill_session(&mut app);

        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();
        app.tick().await.unwrap();

        match &app.output {
            OutputView::Error(msg) => assert!(msg.contains("E")),
            other => panic!("expected error banner, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_input_ignored_while_busy() {
        let (mut app, calls, _) = stubbed_app(StubReply::Text("T".to_string()));
        fill_session(&mut app);

        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        // A second submit while the request is outstanding must be dropped,
        // whether it arrives before the arming tick or between the ticks
        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();
        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();
        app.tick().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shrinking_drops_trailing_entries_from_prompt() {
        let (mut app, _, last_prompt) = stubbed_app(StubReply::Text("T".to_string()));
        app.session.set_product_count(4);
        fill_session(&mut app);

        app.session.set_product_count(2);
        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();
        app.tick().await.unwrap();

        let prompt = last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("terms for product 1"));
        assert!(prompt.contains("terms for product 2"));
        assert!(!prompt.contains("terms for product 3"));
        assert!(!prompt.contains("terms for product 4"));
    }

    #[tokio::test]
    async fn test_missing_credential_disables_submission() {
        let (mut app, calls, _) = stubbed_app(StubReply::Text("T".to_string()));
        for entry in app.session.entries.iter_mut() {
            entry.terms = "filled".to_string();
        }

        app.handle_key(key(KeyCode::F(2))).await.unwrap();
        app.tick().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.output, OutputView::None);
    }

    #[tokio::test]
    async fn test_focus_ring_without_credential_stays_in_sidebar() {
        let (mut app, _, _) = stubbed_app(StubReply::Text("T".to_string()));

        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, Focus::Count);
        app.handle_key(key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, Focus::ApiKey);
    }

    #[tokio::test]
    async fn test_focus_ring_covers_every_column() {
        let (mut app, _, _) = stubbed_app(StubReply::Text("T".to_string()));
        app.session.api_key = "AIza-test".to_string();

        let mut seen = Vec::new();
        for _ in 0..(2 + 2 * app.session.product_count) {
            app.handle_key(key(KeyCode::Tab)).await.unwrap();
            seen.push(app.focus);
        }
        for i in 0..app.session.product_count {
            assert!(seen.contains(&Focus::Name(i)));
            assert!(seen.contains(&Focus::Terms(i)));
        }
        // Full cycle lands back on the first field
        assert_eq!(app.focus, Focus::ApiKey);
    }

    #[tokio::test]
    async fn test_typed_text_lands_in_focused_slot_only() {
        let (mut app, _, _) = stubbed_app(StubReply::Text("T".to_string()));
        app.session.api_key = "AIza-test".to_string();

        app.focus = Focus::Terms(1);
        app.handle_key(key(KeyCode::Char('h'))).await.unwrap();
        app.handle_key(key(KeyCode::Char('i'))).await.unwrap();
        app.handle_key(key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.session.entries[1].terms, "hi\n");
        assert!(app.session.entries[0].terms.is_empty());
        assert!(app.session.entries[2].terms.is_empty());
    }

    #[tokio::test]
    async fn test_count_adjustment_clamps_and_resizes() {
        let (mut app, _, _) = stubbed_app(StubReply::Text("T".to_string()));
        app.focus = Focus::Count;

        for _ in 0..10 {
            app.handle_key(key(KeyCode::Up)).await.unwrap();
        }
        assert_eq!(app.session.product_count, MAX_PRODUCTS);
        assert_eq!(app.session.entries.len(), MAX_PRODUCTS);

        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down)).await.unwrap();
        }
        assert_eq!(app.session.product_count, MIN_PRODUCTS);
        assert_eq!(app.session.entries.len(), MIN_PRODUCTS);
    }

    #[tokio::test]
    async fn test_shrink_pulls_focus_out_of_dropped_column() {
        let (mut app, _, _) = stubbed_app(StubReply::Text("T".to_string()));
        app.session.api_key = "AIza-test".to_string();
        app.session.set_product_count(4);

        // Focus the last column, then shrink below it
        app.focus = Focus::Terms(3);
        app.session.set_product_count(2);
        app.clamp_focus();

        assert_eq!(app.focus, Focus::Count);
    }
}
