use engine_logging::{engine_error, engine_info, engine_warn};

/// Lifetime of non-error notifications unless configured otherwise.
pub const DEFAULT_AUTO_DISMISS_MS: u64 = 10_000;

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    /// `None` means the notification stays until dismissed.
    pub auto_dismiss_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notifications {
    auto_dismiss_ms: u64,
    next_id: NotificationId,
    items: Vec<Notification>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_DISMISS_MS)
    }
}

impl Notifications {
    pub(crate) fn new(auto_dismiss_ms: u64) -> Self {
        Self {
            auto_dismiss_ms,
            next_id: 0,
            items: Vec::new(),
        }
    }

    /// Every notification is mirrored to the log.
    pub(crate) fn push(&mut self, message: impl Into<String>, severity: Severity) -> NotificationId {
        let message = message.into();
        match severity {
            Severity::Error => engine_error!("{}", message),
            Severity::Warning => engine_warn!("{}", message),
            Severity::Info | Severity::Success => engine_info!("{}", message),
        }
        self.next_id += 1;
        let auto_dismiss_ms = match severity {
            Severity::Error => None,
            _ => Some(self.auto_dismiss_ms),
        };
        self.items.push(Notification {
            id: self.next_id,
            message,
            severity,
            auto_dismiss_ms,
        });
        self.next_id
    }

    pub(crate) fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Counts down the remaining lifetime and drops expired entries. Returns
    /// whether anything was dropped.
    pub(crate) fn age(&mut self, elapsed_ms: u64) -> bool {
        let before = self.items.len();
        self.items.retain_mut(|item| match item.auto_dismiss_ms.as_mut() {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(elapsed_ms);
                *remaining > 0
            }
            None => true,
        });
        self.items.len() != before
    }

    pub(crate) fn items(&self) -> &[Notification] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_never_auto_dismiss() {
        let mut notes = Notifications::new(100);
        notes.push("boom", Severity::Error);
        notes.push("ok", Severity::Success);

        notes.age(1_000_000);
        assert_eq!(notes.items().len(), 1);
        assert_eq!(notes.items()[0].message, "boom");
        assert_eq!(notes.items()[0].auto_dismiss_ms, None);
    }

    #[test]
    fn aging_counts_down() {
        let mut notes = Notifications::new(100);
        let id = notes.push("hello", Severity::Info);
        notes.age(40);
        assert_eq!(notes.items()[0].auto_dismiss_ms, Some(60));
        notes.age(60);
        assert!(notes.items().is_empty());
        assert!(!notes.dismiss(id));
    }

    #[test]
    fn aging_reports_only_removals() {
        let mut notes = Notifications::new(100);
        notes.push("hello", Severity::Info);
        assert!(!notes.age(40));
        assert!(!notes.age(59));
        assert!(notes.age(1));
        assert!(!notes.age(100));
    }
}
