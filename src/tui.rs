use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event as CrosstermEvent, EventStream,
    KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enter the alternate screen with raw mode and bracketed paste.
pub fn init() -> io::Result<Tui> {
    execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)?;
    enable_raw_mode()?;
    Terminal::new(CrosstermBackend::new(io::stdout()))
}

pub fn restore() -> io::Result<()> {
    execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen)?;
    disable_raw_mode()
}

/// Map a raw terminal event to the app's vocabulary. Key releases and
/// repeats, mouse and focus events are dropped.
fn translate(event: CrosstermEvent) -> Option<Event> {
    match event {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Paste(text) => Some(Event::Paste(text)),
        CrosstermEvent::Resize(..) => Some(Event::Resize),
        _ => None,
    }
}

/// Background task feeding terminal input plus tick/render beats into one channel.
pub struct EventHandler {
    events: mpsc::UnboundedReceiver<Event>,
    shutdown: CancellationToken,
    pump: JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration, render_rate: Duration) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let pump = tokio::spawn(pump(tx, shutdown.clone(), tick_rate, render_rate));

        Self {
            events,
            shutdown,
            pump,
        }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.events.recv().await
    }
}

async fn pump(
    tx: UnboundedSender<Event>,
    shutdown: CancellationToken,
    tick_rate: Duration,
    render_rate: Duration,
) {
    let mut input = EventStream::new();
    let mut ticks = interval(tick_rate);
    let mut frames = interval(render_rate);

    if tx.send(Event::Init).is_err() {
        return;
    }

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticks.tick() => Event::Tick,
            _ = frames.tick() => Event::Render,
            Some(Ok(raw)) = input.next() => match translate(raw) {
                Some(event) => event,
                None => continue,
            },
        };
        // receiver gone: the app loop has exited
        if tx.send(event).is_err() {
            return;
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

    fn key(kind: KeyEventKind) -> CrosstermEvent {
        CrosstermEvent::Key(KeyEvent {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn only_key_presses_pass_through() {
        assert!(matches!(translate(key(KeyEventKind::Press)), Some(Event::Key(_))));
        assert!(translate(key(KeyEventKind::Release)).is_none());
        assert!(translate(key(KeyEventKind::Repeat)).is_none());
    }

    #[test]
    fn paste_and_resize_are_forwarded() {
        assert!(matches!(
            translate(CrosstermEvent::Paste("hi".into())),
            Some(Event::Paste(text)) if text == "hi"
        ));
        assert!(matches!(
            translate(CrosstermEvent::Resize(80, 24)),
            Some(Event::Resize)
        ));
        assert!(translate(CrosstermEvent::FocusGained).is_none());
    }
}
