//! Prompters that answer without a terminal.

use std::sync::{Arc, Mutex};

use trellis_core::{application::ports::Prompter, error::TrellisResult};

/// Answers every confirmation the same way and remembers the questions.
///
/// `FixedPrompter::defaults()` behaves like `--yes`: it is not interactive
/// and takes each question's default.
#[derive(Debug, Clone, Default)]
pub struct FixedPrompter {
    answer: Option<bool>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl FixedPrompter {
    /// Non-interactive; every question gets its default answer.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Interactive; every question gets `answer`.
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Prompter for FixedPrompter {
    fn confirm(&self, question: &str, default: bool) -> TrellisResult<bool> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        Ok(self.answer.unwrap_or(default))
    }

    fn is_interactive(&self) -> bool {
        self.answer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_question() {
        let prompter = FixedPrompter::defaults();
        assert!(!prompter.is_interactive());
        assert!(prompter.confirm("continue?", true).unwrap());
        assert!(!prompter.confirm("recreate?", false).unwrap());
        assert_eq!(prompter.questions().len(), 2);
    }

    #[test]
    fn fixed_answers_override_defaults() {
        let prompter = FixedPrompter::answering(true);
        assert!(prompter.is_interactive());
        assert!(prompter.confirm("overwrite?", false).unwrap());
    }
}
