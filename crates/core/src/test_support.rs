//! Test helpers shared across the crate's unit tests.

use crate::notify::{Notification, NotificationKind, Notifier};
use std::cell::RefCell;

/// Records every notification it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    seen: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.seen.borrow().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.seen.borrow().iter().map(|n| n.message.clone()).collect()
    }

    pub(crate) fn count(&self, kind: NotificationKind) -> usize {
        self.seen.borrow().iter().filter(|n| n.kind == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.borrow_mut().push(notification);
    }
}
