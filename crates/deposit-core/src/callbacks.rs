//! Named lifecycle hooks that let external code react to actor operations.
//!
//! Handlers are fire-and-forget: errors and panics are logged and counted but
//! never unwind the operation that triggered them.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::error::CallbackError;
use crate::model::{FileSet, FileSetId, User};

/// Lifecycle events a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackEvent {
    /// A file set was attached to a work.
    AfterCreateFileset,
    /// A relation was reverted to an earlier revision.
    AfterRevertContent,
    /// A file set was removed.
    AfterDestroy,
    /// File set metadata was updated.
    AfterUpdateMetadata,
}

impl CallbackEvent {
    /// Machine-friendly name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AfterCreateFileset => "after_create_fileset",
            Self::AfterRevertContent => "after_revert_content",
            Self::AfterDestroy => "after_destroy",
            Self::AfterUpdateMetadata => "after_update_metadata",
        }
    }
}

/// Subject passed to handlers.
#[derive(Debug, Clone, Copy)]
pub enum CallbackSubject<'a> {
    /// Snapshot of the file set.
    FileSet(&'a FileSet),
    /// Bare identifier, used once the file set no longer exists.
    FileSetId(FileSetId),
}

impl CallbackSubject<'_> {
    /// Identifier of the subject, if one is known.
    #[must_use]
    pub const fn file_set_id(&self) -> Option<FileSetId> {
        match self {
            Self::FileSet(file_set) => file_set.id,
            Self::FileSetId(id) => Some(*id),
        }
    }
}

/// Arguments delivered to a handler.
#[derive(Debug, Clone, Copy)]
pub struct CallbackContext<'a> {
    /// Event being dispatched.
    pub event: CallbackEvent,
    /// Subject of the event.
    pub subject: CallbackSubject<'a>,
    /// Acting user.
    pub user: &'a User,
    /// Event-specific extra argument (e.g. the revision id for reverts).
    pub extra: Option<&'a str>,
}

/// Registered handler signature.
pub type CallbackHandler =
    Arc<dyn Fn(&CallbackContext<'_>) -> Result<(), CallbackError> + Send + Sync>;

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackReport {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Injectable registry of lifecycle handlers.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    handlers: Arc<RwLock<HashMap<CallbackEvent, Vec<CallbackHandler>>>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut events: Vec<_> = handlers.keys().map(|event| event.as_str()).collect();
        events.sort_unstable();
        formatter
            .debug_struct("CallbackRegistry")
            .field("events", &events)
            .finish()
    }
}

impl CallbackRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event`; handlers run in registration order.
    pub fn set<F>(&self, event: CallbackEvent, handler: F)
    where
        F: Fn(&CallbackContext<'_>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Whether at least one handler is registered for `event`.
    #[must_use]
    pub fn is_set(&self, event: CallbackEvent) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Invoke every handler registered for `event`.
    pub fn run(
        &self,
        event: CallbackEvent,
        subject: CallbackSubject<'_>,
        user: &User,
        extra: Option<&str>,
    ) -> CallbackReport {
        // Clone the handler list so handlers may register further handlers.
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned()
            .unwrap_or_default();

        let context = CallbackContext {
            event,
            subject,
            user,
            extra,
        };
        let mut report = CallbackReport::default();
        for handler in handlers {
            report.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| handler(&context))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(
                        error = %err,
                        event = event.as_str(),
                        file_set_id = ?subject.file_set_id(),
                        "lifecycle callback failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    warn!(
                        event = event.as_str(),
                        file_set_id = ?subject.file_set_id(),
                        "lifecycle callback panicked"
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn handlers_receive_context_in_order() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            registry.set(CallbackEvent::AfterRevertContent, move |ctx| {
                seen.lock()
                    .unwrap()
                    .push(format!("{tag}:{}:{}", ctx.user.user_key, ctx.extra.unwrap_or("")));
                Ok(())
            });
        }

        let id = FileSetId::generate();
        let report = registry.run(
            CallbackEvent::AfterRevertContent,
            CallbackSubject::FileSetId(id),
            &User::new("u"),
            Some("version1"),
        );

        assert_eq!(report, CallbackReport { invoked: 2, failed: 0 });
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:u:version1", "second:u:version1"]
        );
    }

    #[test]
    fn failures_and_panics_are_contained() {
        let registry = CallbackRegistry::new();
        registry.set(CallbackEvent::AfterDestroy, |ctx| {
            Err(CallbackError::Failed {
                event: ctx.event.as_str(),
                detail: "index offline".into(),
            })
        });
        registry.set(CallbackEvent::AfterDestroy, |_| panic!("handler bug"));
        registry.set(CallbackEvent::AfterDestroy, |_| Ok(()));

        let report = registry.run(
            CallbackEvent::AfterDestroy,
            CallbackSubject::FileSetId(FileSetId::generate()),
            &User::new("u"),
            None,
        );
        assert_eq!(report, CallbackReport { invoked: 3, failed: 2 });
    }

    #[test]
    fn unregistered_events_are_noops() {
        let registry = CallbackRegistry::new();
        assert!(!registry.is_set(CallbackEvent::AfterCreateFileset));
        let file_set = FileSet::new();
        let report = registry.run(
            CallbackEvent::AfterCreateFileset,
            CallbackSubject::FileSet(&file_set),
            &User::new("u"),
            None,
        );
        assert_eq!(report, CallbackReport::default());
    }
}
