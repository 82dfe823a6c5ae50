//! Admin-panel reveal gesture.
//!
//! A fixed number of clicks landing inside a deadline window reveals
//! the hidden admin form; a click after the deadline starts a fresh
//! count. Lives outside the submission workflow: input plumbing, not
//! upload logic.

use std::time::{Duration, Instant};

/// Counter-with-deadline state machine for the reveal gesture.
#[derive(Debug)]
pub struct RevealGesture {
    required_clicks: u32,
    window: Duration,
    count: u32,
    deadline: Option<Instant>,
    revealed: bool,
}

impl RevealGesture {
    pub fn new(required_clicks: u32, window: Duration) -> Self {
        Self {
            required_clicks: required_clicks.max(1),
            window,
            count: 0,
            deadline: None,
            revealed: false,
        }
    }

    /// The stock gesture: a double click within 400 ms.
    pub fn double_click() -> Self {
        Self::new(2, Duration::from_millis(400))
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Record a click now; returns whether the panel is revealed.
    pub fn click(&mut self) -> bool {
        self.click_at(Instant::now())
    }

    /// Record a click at an explicit instant.
    pub fn click_at(&mut self, now: Instant) -> bool {
        if self.revealed {
            return true;
        }
        match self.deadline {
            Some(deadline) if now <= deadline => self.count += 1,
            _ => {
                self.count = 1;
                self.deadline = Some(now + self.window);
            }
        }
        if self.count >= self.required_clicks {
            self.revealed = true;
            self.deadline = None;
        }
        self.revealed
    }

    /// Hide the panel again and forget any partial count.
    pub fn hide(&mut self) {
        self.revealed = false;
        self.count = 0;
        self.deadline = None;
    }
}

impl Default for RevealGesture {
    fn default() -> Self {
        Self::double_click()
    }
}
