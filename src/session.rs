//! Session state shared by the views: the connected account and the
//! current status message.

use serde::Serialize;
use std::fmt;

use crate::chain::Address;

/// How a status message is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    /// Transient banner
    Warning,
    /// Blocking notice, used for failed writes
    Alert,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

/// Account and status for one running client
#[derive(Debug, Clone, Default)]
pub struct Session {
    account: Option<Address>,
    status: Option<StatusMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    /// Record the connected account. There is no way back to `None`.
    pub fn set_account(&mut self, account: Address) {
        self.account = Some(account);
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Replace the status message
    pub fn set_status(&mut self, severity: Severity, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            severity,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.set_status(Severity::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.set_status(Severity::Warning, text);
    }

    pub fn alert(&mut self, text: impl Into<String>) {
        self.set_status(Severity::Alert, text);
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}
