//! Single-fire completion shared by the response handle and the callback.
//!
//! The embedded framework can finish a request in two ways: a terminal write
//! on the response, or the completion callback. Both feed the same one-shot
//! channel and the first one wins. Later attempts are dropped with a debug
//! log.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use super::outbound::OutboundResponse;

/// How a request was resolved by the embedded framework.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// A terminal end produced a response.
    Finished(OutboundResponse),
    /// The callback reported an error before any terminal end.
    Failed(String),
    /// The callback fired without an error and without a response.
    Unhandled,
}

impl Resolution {
    fn kind(&self) -> &'static str {
        match self {
            Resolution::Finished(_) => "finished",
            Resolution::Failed(_) => "failed",
            Resolution::Unhandled => "unhandled",
        }
    }
}

#[derive(Clone)]
pub(crate) struct Completion {
    sender: Arc<Mutex<Option<oneshot::Sender<Resolution>>>>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Resolution>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (completion, rx)
    }

    /// Resolve the request. Returns `false` when it was already resolved or
    /// the adapter stopped waiting.
    pub(crate) fn resolve(&self, resolution: Resolution) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let kind = resolution.kind();
        match sender {
            Some(tx) => {
                if tx.send(resolution).is_err() {
                    tracing::debug!(kind, "Adapter no longer waiting, discarding completion");
                    return false;
                }
                true
            }
            None => {
                tracing::debug!(kind, "Request already resolved, discarding completion");
                false
            }
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Completion callback handed to the embedded dispatch function.
///
/// Calling it signals that the embedded framework is done with the request.
/// With an error it resolves a 500 JSON error; without one it means nothing
/// handled the request.
#[derive(Clone, Debug)]
pub struct Next {
    completion: Completion,
}

impl Next {
    pub(crate) fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// Signal completion without an error.
    pub fn finish(&self) {
        self.completion.resolve(Resolution::Unhandled);
    }

    /// Signal completion with an error.
    pub fn fail(&self, error: impl fmt::Display) {
        let message = error.to_string();
        tracing::warn!(error = %message, "Embedded dispatch reported an error");
        self.completion.resolve(Resolution::Failed(message));
    }

    /// Callback shape of the embedded framework: `next()` or `next(err)`.
    pub fn call<E: fmt::Display>(&self, error: Option<E>) {
        match error {
            Some(e) => self.fail(e),
            None => self.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_resolution_wins() {
        let (completion, mut rx) = Completion::channel();
        assert!(!completion.is_resolved());

        assert!(completion.resolve(Resolution::Failed("boom".into())));
        assert!(!completion.resolve(Resolution::Unhandled));
        assert!(completion.is_resolved());

        match rx.try_recv() {
            Ok(Resolution::Failed(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_after_receiver_dropped() {
        let (completion, rx) = Completion::channel();
        drop(rx);
        assert!(!completion.resolve(Resolution::Unhandled));
    }

    #[test]
    fn test_next_call_shapes() {
        let (completion, mut rx) = Completion::channel();
        let next = Next::new(completion);
        next.call(None::<&str>);
        next.call(Some("late"));
        assert!(matches!(rx.try_recv(), Ok(Resolution::Unhandled)));
    }
}
