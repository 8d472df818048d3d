//! Focus/break countdown. The host drives it with one `tick()` per second.
//!
//! `tick()` and `skip()` both need `&mut self`, and each transition moves the
//! timer into the next session before returning, so a finished focus interval
//! yields exactly one [`FocusCompletion`] no matter which path ended it.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Focus,
    Break,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Focus => "focus",
            SessionMode::Break => "break",
        }
    }

    fn next(self) -> Self {
        match self {
            SessionMode::Focus => SessionMode::Break,
            SessionMode::Break => SessionMode::Focus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDurations {
    pub focus_secs: u32,
    pub break_secs: u32,
}

impl SessionDurations {
    pub fn from_minutes(focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            focus_secs: focus_minutes.saturating_mul(60),
            break_secs: break_minutes.saturating_mul(60),
        }
    }

    fn for_mode(self, mode: SessionMode) -> u32 {
        match mode {
            SessionMode::Focus => self.focus_secs,
            SessionMode::Break => self.break_secs,
        }
    }
}

impl Default for SessionDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5)
    }
}

/// A focus interval that should be appended to the focus log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusCompletion {
    pub session: u64,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTransition {
    pub from: SessionMode,
    pub to: SessionMode,
    pub completion: Option<FocusCompletion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    durations: SessionDurations,
    mode: SessionMode,
    seconds_left: u32,
    running: bool,
    session: u64,
}

impl FocusTimer {
    pub fn new(durations: SessionDurations) -> Self {
        Self {
            durations,
            mode: SessionMode::Focus,
            seconds_left: durations.focus_secs,
            running: false,
            session: 1,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stops the countdown; `seconds_left` is kept so `start()` resumes.
    pub fn close(&mut self) {
        self.running = false;
    }

    /// Restarts the current session from its full duration, stopped.
    pub fn reset(&mut self) {
        self.running = false;
        self.seconds_left = self.durations.for_mode(self.mode);
    }

    pub fn tick(&mut self) -> Option<SessionTransition> {
        if !self.running {
            return None;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left > 0 {
            return None;
        }
        Some(self.transition())
    }

    /// Ends the current session early. Leaving focus records only the seconds
    /// actually spent; a skip before the first second records nothing.
    pub fn skip(&mut self) -> SessionTransition {
        self.transition()
    }

    fn elapsed(&self) -> u32 {
        self.durations
            .for_mode(self.mode)
            .saturating_sub(self.seconds_left)
    }

    fn transition(&mut self) -> SessionTransition {
        let from = self.mode;
        let completion = match from {
            SessionMode::Focus => Some(self.elapsed())
                .filter(|elapsed| *elapsed > 0)
                .map(|duration_secs| FocusCompletion {
                    session: self.session,
                    duration_secs,
                }),
            SessionMode::Break => None,
        };

        self.mode = from.next();
        self.seconds_left = self.durations.for_mode(self.mode);
        self.running = false;
        if self.mode == SessionMode::Focus {
            self.session += 1;
        }

        SessionTransition {
            from,
            to: self.mode,
            completion,
        }
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
