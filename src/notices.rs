//! Operator-facing notices raised by the installer.
//!
//! Rendering is the host's business; the installer only queues them.

use serde::Serialize;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl AdminNotice {
    /// Notice shown when the table still does not exist after a create attempt.
    pub fn table_creation_failed(table_name: &str, db_user: &str, db_name: &str) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: format!(
                "{} table creation failed. Does the {} user have CREATE privileges on the {} database?",
                table_name, db_user, db_name
            ),
        }
    }
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait NoticeSink: Send + Sync {
    fn add_notice(&self, notice: AdminNotice);
}

/// In-memory sink the host drains after each installer run.
#[derive(Debug, Default)]
pub struct NoticeQueue {
    notices: Mutex<Vec<AdminNotice>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<AdminNotice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeSink for NoticeQueue {
    fn add_notice(&self, notice: AdminNotice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => {
                warn!("Notice queue lock was poisoned, recovering");
                poisoned.into_inner().push(notice);
            }
        }
    }
}
