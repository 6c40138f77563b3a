use serde::Serialize;
use std::fmt;

use dep_core::{CoreError, CoreResult, EnvironmentProfile, ErrorKind};
use dep_order::{assemble, EnrollmentEnvelope, Order};

use crate::response::{interpret, EnrollmentResult, Outcome};
use crate::transport::EnrollmentTransport;

/// Where a single submission is in its lifecycle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    Built,
    Assembled,
    Submitted,
    Accepted,
    PartiallyAccepted,
    Rejected,
    TransportFailed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Accepted
                | SubmissionState::PartiallyAccepted
                | SubmissionState::Rejected
                | SubmissionState::TransportFailed
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Built => "BUILT",
            SubmissionState::Assembled => "ASSEMBLED",
            SubmissionState::Submitted => "SUBMITTED",
            SubmissionState::Accepted => "ACCEPTED",
            SubmissionState::PartiallyAccepted => "PARTIALLY_ACCEPTED",
            SubmissionState::Rejected => "REJECTED",
            SubmissionState::TransportFailed => "TRANSPORT_FAILED",
        };
        f.write_str(name)
    }
}

impl From<Outcome> for SubmissionState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Accepted => SubmissionState::Accepted,
            Outcome::PartiallyAccepted => SubmissionState::PartiallyAccepted,
            Outcome::Rejected => SubmissionState::Rejected,
        }
    }
}

/// Drives one order through Built → Assembled → Submitted → terminal.
///
/// Terminal states are final; there is no path back to `Submitted`.
pub struct Submission {
    state: SubmissionState,
    order: Order,
    envelope: Option<EnrollmentEnvelope>,
    result: Option<EnrollmentResult>,
}

impl Submission {
    pub fn new(order: Order) -> Self {
        Self {
            state: SubmissionState::Built,
            order,
            envelope: None,
            result: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn envelope(&self) -> Option<&EnrollmentEnvelope> {
        self.envelope.as_ref()
    }

    pub fn result(&self) -> Option<&EnrollmentResult> {
        self.result.as_ref()
    }

    /// Transition: Built → Assembled
    pub fn assemble(&mut self, transaction_id: impl Into<String>) -> CoreResult<&EnrollmentEnvelope> {
        self.expect_state(SubmissionState::Built, SubmissionState::Assembled)?;

        let envelope = assemble(transaction_id, self.order.clone())?;
        self.state = SubmissionState::Assembled;
        Ok(self.envelope.insert(envelope))
    }

    /// Transition: Assembled → Submitted → {Accepted | PartiallyAccepted | Rejected | TransportFailed}
    ///
    /// Errors are returned unchanged after the state has been recorded. A
    /// configuration failure happens before anything is sent, so the
    /// submission stays `Assembled`.
    pub async fn submit(
        &mut self,
        transport: &dyn EnrollmentTransport,
        profile: &EnvironmentProfile,
    ) -> CoreResult<&EnrollmentResult> {
        self.expect_state(SubmissionState::Assembled, SubmissionState::Submitted)?;
        let envelope = self.envelope.as_ref().ok_or_else(|| CoreError::InvalidTransition {
            from: self.state.to_string(),
            to: SubmissionState::Submitted.to_string(),
        })?;

        self.state = SubmissionState::Submitted;

        let interpreted = match transport.submit(envelope, profile).await {
            Ok(response) => interpret(&response.body),
            Err(err) => Err(err),
        };

        match interpreted {
            Ok(result) => {
                self.state = result.outcome.into();
                tracing::info!(
                    "Submission {} is {}",
                    envelope.transaction_id(),
                    self.state
                );
                Ok(self.result.insert(result))
            }
            Err(err) => {
                self.state = match err.kind() {
                    ErrorKind::Configuration => SubmissionState::Assembled,
                    ErrorKind::Transport => SubmissionState::TransportFailed,
                    _ => SubmissionState::Rejected,
                };
                tracing::warn!(
                    "Submission {} is {}: {}",
                    envelope.transaction_id(),
                    self.state,
                    err
                );
                Err(err)
            }
        }
    }

    fn expect_state(&self, expected: SubmissionState, to: SubmissionState) -> CoreResult<()> {
        if self.state != expected {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}
