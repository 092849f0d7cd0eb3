//! Single-line option prompt that blocks the main list.

use crate::controller::Key;

/// Result of feeding a key to a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Still waiting for a resolving key.
    Pending,
    /// The option at this index was chosen.
    Confirmed(usize),
    /// Dismissed without choosing.
    Cancelled,
}

/// A question with a row of options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    question: String,
    options: Vec<String>,
    selected: usize,
}

impl Prompt {
    /// New prompt with the first option selected.
    pub fn new(question: impl Into<String>, options: &[&str]) -> Self {
        Self {
            question: question.into(),
            options: options.iter().map(|option| (*option).to_string()).collect(),
            selected: 0,
        }
    }

    /// Text shown before the options.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Option labels, left to right.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Index of the highlighted option.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Apply one key. Any outcome other than `Pending` ends the prompt.
    pub fn handle_key(&mut self, key: Key) -> PromptOutcome {
        match key {
            Key::Left | Key::Char('h') => {
                self.selected = self.selected.saturating_sub(1);
            }
            Key::Right | Key::Char('l') => {
                if self.selected + 1 < self.options.len() {
                    self.selected += 1;
                }
            }
            Key::Enter => return PromptOutcome::Confirmed(self.selected),
            Key::Esc => return PromptOutcome::Cancelled,
            Key::Char(c) => {
                if let Some(index) = self.shortcut(c) {
                    return PromptOutcome::Confirmed(index);
                }
            }
            _ => {}
        }
        PromptOutcome::Pending
    }

    fn shortcut(&self, c: char) -> Option<usize> {
        let wanted = c.to_lowercase().next()?;
        self.options.iter().position(|option| {
            option
                .chars()
                .next()
                .and_then(|first| first.to_lowercase().next())
                == Some(wanted)
        })
    }
}
