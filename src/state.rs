//! Submission lifecycle within a release
//!
//! ```text
//! NOT_VALIDATED -> QUEUED -> VALIDATING -> VALID | INVALID | ERROR
//!       ^            |            |            |
//!       +-- cancel --+-- cancel --+--- reset --+
//! VALID -> SIGNED_OFF
//! ```
//!
//! Transitions are only legal while the owning release is open; the check
//! lives on [`crate::release::Release::transition`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    #[default]
    NotValidated,
    Queued,
    Validating,
    Valid,
    Invalid,
    Error,
    SignedOff,
}

impl SubmissionState {
    pub fn name(self) -> &'static str {
        match self {
            SubmissionState::NotValidated => "NOT_VALIDATED",
            SubmissionState::Queued => "QUEUED",
            SubmissionState::Validating => "VALIDATING",
            SubmissionState::Valid => "VALID",
            SubmissionState::Invalid => "INVALID",
            SubmissionState::Error => "ERROR",
            SubmissionState::SignedOff => "SIGNED_OFF",
        }
    }

    /// Queued or validating
    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmissionState::Queued | SubmissionState::Validating)
    }

    /// Outcome of a finished validation run
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            SubmissionState::Valid | SubmissionState::Invalid | SubmissionState::Error
        )
    }

    /// Target state of `transition`, or `None` when it is illegal from here.
    pub fn next(self, transition: Transition) -> Option<SubmissionState> {
        use SubmissionState::*;

        match (self, transition) {
            (NotValidated, Transition::Queue) => Some(Queued),
            (Queued, Transition::Start) => Some(Validating),
            (Queued | Validating, Transition::Cancel) => Some(NotValidated),
            (Validating, Transition::Complete { has_errors: false }) => Some(Valid),
            (Validating, Transition::Complete { has_errors: true }) => Some(Invalid),
            (Queued | Validating, Transition::Fail) => Some(Error),
            (Valid | Invalid | Error, Transition::Reset) => Some(NotValidated),
            (Valid, Transition::SignOff) => Some(SignedOff),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Triggers that move a submission between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Operator enqueued the project
    Queue,
    /// Scheduler admitted the project into a slot
    Start,
    /// Operator cancelled a queued or running validation
    Cancel,
    /// Validation run finished normally
    Complete { has_errors: bool },
    /// Validation run terminated without being cancelled
    Fail,
    /// Operator reset a finished validation
    Reset,
    SignOff,
}

impl Transition {
    /// Verb used in error messages
    pub fn action(self) -> &'static str {
        match self {
            Transition::Queue => "enqueue",
            Transition::Start => "start validation of",
            Transition::Cancel => "cancel validation of",
            Transition::Complete { .. } => "complete validation of",
            Transition::Fail => "fail validation of",
            Transition::Reset => "reset",
            Transition::SignOff => "sign off",
        }
    }

    /// Transition resolving a run to `state`, if `state` is a run outcome
    pub fn resolving_to(state: SubmissionState) -> Option<Transition> {
        match state {
            SubmissionState::Valid => Some(Transition::Complete { has_errors: false }),
            SubmissionState::Invalid => Some(Transition::Complete { has_errors: true }),
            SubmissionState::Error => Some(Transition::Fail),
            SubmissionState::NotValidated => Some(Transition::Cancel),
            _ => None,
        }
    }
}
