//! Notification and interaction traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of progress, prompts or audit sinks.

use crate::types::StepResult;

/// Sink for human-readable audit notes emitted by mutating operations
///
/// Notes are purely observational: nothing depends on their delivery.
pub trait Notifier {
    /// Record one note
    fn note(&mut self, message: &str);
}

/// Notifier that drops every note
pub struct NoNotes;

impl Notifier for NoNotes {
    fn note(&mut self, _message: &str) {}
}

/// Notifier that keeps notes in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteBuffer {
    notes: Vec<String>,
}

impl NoteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes recorded so far, in order
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Whether any note contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.notes.iter().any(|note| note.contains(needle))
    }

    /// Take the recorded notes, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notes)
    }
}

impl Notifier for NoteBuffer {
    fn note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }
}

/// Notifier that forwards notes to the `log` facade at info level
pub struct LogNotes;

impl Notifier for LogNotes {
    fn note(&mut self, message: &str) {
        log::info!("{message}");
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called when starting a batch of steps
    fn on_batch_start(&mut self, count: usize);

    /// Called when starting a single step
    fn on_step_start(&mut self, id: &str, description: &str);

    /// Called when a step completes
    fn on_step_complete(&mut self, id: &str, result: &StepResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_step_start(&mut self, _id: &str, _description: &str) {}
    fn on_step_complete(&mut self, _id: &str, _result: &StepResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_buffer_records_in_order() {
        let mut buffer = NoteBuffer::new();
        buffer.note("Created Object: deals");
        buffer.note("Idempotent Object: found existing deals");

        assert_eq!(buffer.notes().len(), 2);
        assert!(buffer.contains("Idempotent"));
        assert_eq!(buffer.drain()[0], "Created Object: deals");
        assert!(buffer.notes().is_empty());
    }

    #[test]
    fn test_auto_callbacks() {
        assert!(AutoConfirm.confirm("Apply?").unwrap());
        assert!(!AutoDecline.confirm("Apply?").unwrap());
    }
}
