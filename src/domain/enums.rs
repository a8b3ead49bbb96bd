use serde::{Deserialize, Serialize};

/// Tracking state of a single task row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkState {
    Idle,
    Working,
}

impl WorkState {
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Working)
    }
}

/// Whether the controller is in the middle of a start/stop flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Busy,
}

/// Task filters that hide rows from the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Tasks due after today
    Future,
    /// Tasks with a recurrence rule
    Recurring,
}

impl FilterKind {
    /// Storage key holding the on/off state
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Future => "chronolog.hideFuture",
            Self::Recurring => "chronolog.hideRecurring",
        }
    }

    /// Class put on matching task rows while the filter is on
    pub fn task_class(&self) -> &'static str {
        match self {
            Self::Future => "chronolog-future-task",
            Self::Recurring => "chronolog-recurring-task",
        }
    }

    /// Class put on the document root while the filter is on
    pub fn root_class(&self) -> &'static str {
        match self {
            Self::Future => "chronolog-hide-future",
            Self::Recurring => "chronolog-hide-recurring",
        }
    }

    /// Toolbar button label for the given state
    pub fn button_label(&self, on: bool) -> &'static str {
        match (self, on) {
            (Self::Future, false) => "Hide upcoming",
            (Self::Future, true) => "Show upcoming",
            (Self::Recurring, false) => "Hide recurring",
            (Self::Recurring, true) => "Show recurring",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Future => "future",
            Self::Recurring => "recurring",
        }
    }

    pub fn all() -> &'static [FilterKind] {
        &[FilterKind::Future, FilterKind::Recurring]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "future" | "upcoming" => Some(Self::Future),
            "recurring" => Some(Self::Recurring),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_kind_from_name() {
        assert_eq!(FilterKind::from_name("future"), Some(FilterKind::Future));
        assert_eq!(FilterKind::from_name("Upcoming"), Some(FilterKind::Future));
        assert_eq!(FilterKind::from_name("RECURRING"), Some(FilterKind::Recurring));
        assert_eq!(FilterKind::from_name("overdue"), None);
    }

    #[test]
    fn test_filter_kind_keys_are_distinct() {
        assert_ne!(
            FilterKind::Future.storage_key(),
            FilterKind::Recurring.storage_key()
        );
        assert_eq!(FilterKind::Future.button_label(true), "Show upcoming");
        assert_eq!(FilterKind::Recurring.button_label(false), "Hide recurring");
    }

    #[test]
    fn test_work_state_is_working() {
        assert!(WorkState::Working.is_working());
        assert!(!WorkState::Idle.is_working());
    }
}
