use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::time::Duration;

use crate::console;

/// User commands picked up between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Generate and send new colors and brightness
    ChangeSettings,
    /// Stop the animation and exit
    Terminate,
}

/// Non-blocking source of user commands
pub trait InputSource {
    /// Return at most one pending event without waiting
    fn poll(&mut self) -> Result<Option<InputEvent>>;
}

/// Used when no terminal is attached; Ctrl-C still arrives as a signal
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self) -> Result<Option<InputEvent>> {
        Ok(None)
    }
}

/// Keyboard in raw mode. The terminal is restored when this is dropped.
pub struct Keyboard {
    _private: (),
}

impl Keyboard {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;
        console::set_raw_mode(true);
        Ok(Keyboard { _private: () })
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        match terminal::disable_raw_mode() {
            Ok(()) => console::set_raw_mode(false),
            Err(e) => errln!("Warning: Failed to restore terminal: {}", e),
        }
    }
}

impl InputSource for Keyboard {
    fn poll(&mut self) -> Result<Option<InputEvent>> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(input) = map_key(key) {
                    return Ok(Some(input));
                }
            }
        }
        Ok(None)
    }
}

/// Space changes settings; q, Esc and Ctrl-C quit
fn map_key(key: KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(InputEvent::ChangeSettings),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputEvent::Terminate)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(InputEvent::Terminate),
        _ => None,
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Plays back one scripted poll result per tick
    pub struct ScriptedInput {
        pub polls: VecDeque<Option<InputEvent>>,
    }

    impl ScriptedInput {
        pub fn new(polls: Vec<Option<InputEvent>>) -> Self {
            ScriptedInput {
                polls: polls.into_iter().collect(),
            }
        }
    }

    impl InputSource for ScriptedInput {
        fn poll(&mut self) -> Result<Option<InputEvent>> {
            Ok(self.polls.pop_front().flatten())
        }
    }
}
