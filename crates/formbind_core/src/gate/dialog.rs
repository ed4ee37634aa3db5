//! Confirmation prompt and notice seam.

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::cell::{Cell, RefCell};

/// Answer to a yes/no confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResponse {
    Yes,
    No,
}

/// Modal UI collaborator.
pub trait Dialogs {
    /// Asks a yes/no question; resolves once the user answers.
    fn confirm(&self, title: &str, message: &str) -> LocalBoxFuture<'static, ConfirmResponse>;
    /// Shows an informational notice.
    fn alert(&self, title: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Confirm,
    Alert,
}

/// One prompt shown through `ScriptedDialogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
}

/// Dialogs that answer every confirmation with a preset response and keep
/// a transcript of what was shown.
#[derive(Debug)]
pub struct ScriptedDialogs {
    answer: Cell<ConfirmResponse>,
    prompts: RefCell<Vec<Prompt>>,
}

impl ScriptedDialogs {
    pub fn answering(answer: ConfirmResponse) -> Self {
        Self {
            answer: Cell::new(answer),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn set_answer(&self, answer: ConfirmResponse) {
        self.answer.set(answer);
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.borrow().clone()
    }

    pub fn count(&self, kind: PromptKind) -> usize {
        self.prompts
            .borrow()
            .iter()
            .filter(|prompt| prompt.kind == kind)
            .count()
    }

    fn record(&self, kind: PromptKind, title: &str, message: &str) {
        self.prompts.borrow_mut().push(Prompt {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ScriptedDialogs {
    fn default() -> Self {
        Self::answering(ConfirmResponse::Yes)
    }
}

impl Dialogs for ScriptedDialogs {
    fn confirm(&self, title: &str, message: &str) -> LocalBoxFuture<'static, ConfirmResponse> {
        self.record(PromptKind::Confirm, title, message);
        future::ready(self.answer.get()).boxed_local()
    }

    fn alert(&self, title: &str, message: &str) {
        self.record(PromptKind::Alert, title, message);
    }
}
