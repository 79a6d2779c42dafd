use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Terminal-side input to the app loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Sent once, before any other event
    Init,
    Tick,
    Render,
    Key(KeyEvent),
    /// Bracketed paste; goes straight into the composer
    Paste(String),
    Resize,
}

impl Event {
    /// Ctrl+C quits from anywhere, including the composer.
    pub fn is_quit(&self) -> bool {
        matches!(
            self,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ctrl_c_quits() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let plain_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(ctrl_c.is_quit());
        assert!(!plain_c.is_quit());
        assert!(!Event::Paste("c".into()).is_quit());
    }
}
