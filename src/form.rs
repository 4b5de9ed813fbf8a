//! Proposal Form
//!
//! Collects a title and description and tracks the create-and-wait flow:
//!
//! ```text
//! Idle --begin--> Submitting --settle(ok)--> Idle (draft cleared)
//!                            --settle(err)-> Idle (draft kept)
//! ```
//!
//! `begin` hands out a [`SubmitTicket`], and only one can be outstanding.

use thiserror::Error;

use crate::chain::Address;

/// Why a submission cannot start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Connect a wallet before submitting a proposal.")]
    NotConnected,

    #[error("Enter a proposal title.")]
    MissingTitle,

    #[error("Enter a proposal description.")]
    MissingDescription,

    #[error("A proposal is already being submitted.")]
    Busy,
}

/// Unsubmitted form input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
}

impl ProposalDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Both fields are non-empty after trimming
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
}

/// Proof that a submission is in flight; consumed by [`ProposalForm::settle`]
#[derive(Debug)]
pub struct SubmitTicket {
    pub signer: Address,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProposalForm {
    draft: ProposalDraft,
    state: FormState,
}

impl ProposalForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &ProposalDraft {
        &self.draft
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == FormState::Submitting
    }

    /// Submit control enablement
    ///
    /// Disabled only without an account or while a create is in flight.
    /// Empty fields are reported by [`ProposalForm::begin`] instead.
    pub fn can_submit(&self, account: Option<Address>) -> bool {
        account.is_some() && !self.is_busy()
    }

    pub fn validate(&self, account: Option<Address>) -> Result<Address, FormError> {
        if self.is_busy() {
            return Err(FormError::Busy);
        }
        let signer = account.ok_or(FormError::NotConnected)?;
        if self.draft.title.trim().is_empty() {
            return Err(FormError::MissingTitle);
        }
        if self.draft.description.trim().is_empty() {
            return Err(FormError::MissingDescription);
        }
        Ok(signer)
    }

    /// `Idle -> Submitting`
    pub fn begin(&mut self, account: Option<Address>) -> Result<SubmitTicket, FormError> {
        let signer = self.validate(account)?;
        self.state = FormState::Submitting;
        Ok(SubmitTicket {
            signer,
            title: self.draft.title.trim().to_string(),
            description: self.draft.description.trim().to_string(),
        })
    }

    /// `Submitting -> Idle`; the draft is cleared only on success
    pub fn settle(&mut self, ticket: SubmitTicket, success: bool) {
        drop(ticket);
        self.state = FormState::Idle;
        if success {
            self.draft.clear();
        }
    }
}
