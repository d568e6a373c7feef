//! Conversation state machine for leads.
//!
//! Transitions are validated against a fixed table; anything else is an
//! `InvalidTransition` error and leaves the lead untouched.

use crate::error::LeadgateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a lead is in the qualification conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadState {
    /// First inbound message seen, no reply sent yet.
    New,
    /// Created reactively from our own outbound message; the bot stays silent.
    Existing,
    /// Welcome menu sent, waiting for a 1/2/3 selection.
    ChooseOption,
    /// Blank form template sent.
    FormSent,
    /// At least one form response received, fragment incomplete.
    FormInProgress,
    /// All five form fields captured.
    FormCompleted,
    /// Handed to a human operator; the bot stays silent.
    ManualIntervention,
    /// Partnership track; handled by an operator.
    Partnership,
}

impl LeadState {
    /// Canonical storage form, as persisted in the `leads` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Existing => "EXISTING",
            Self::ChooseOption => "CHOOSE_OPTION",
            Self::FormSent => "FORM_SENT",
            Self::FormInProgress => "FORM_IN_PROGRESS",
            Self::FormCompleted => "FORM_COMPLETED",
            Self::ManualIntervention => "MANUAL_INTERVENTION",
            Self::Partnership => "PARTNERSHIP",
        }
    }

    /// Whether the bot may auto-reply to a lead in this state.
    ///
    /// EXISTING, MANUAL_INTERVENTION, FORM_COMPLETED and PARTNERSHIP leads
    /// still get their inbound messages logged, but the bot stays silent
    /// (FORM_COMPLETED and PARTNERSHIP escalate instead of conversing).
    pub fn reply_allowed(&self) -> bool {
        matches!(
            self,
            Self::New | Self::ChooseOption | Self::FormSent | Self::FormInProgress
        )
    }

    /// Transitions allowed out of this state.
    fn allowed_targets(&self) -> &'static [LeadState] {
        match self {
            Self::New => &[Self::ChooseOption, Self::ManualIntervention],
            Self::Existing => &[],
            Self::ChooseOption => &[
                Self::FormSent,
                Self::Partnership,
                Self::ManualIntervention,
            ],
            Self::FormSent => &[Self::FormInProgress, Self::ManualIntervention],
            Self::FormInProgress => &[
                Self::FormCompleted,
                Self::FormSent,
                Self::ManualIntervention,
            ],
            Self::FormCompleted => &[Self::ManualIntervention, Self::Partnership],
            Self::ManualIntervention => &[
                Self::New,
                Self::ChooseOption,
                Self::FormSent,
                Self::Partnership,
            ],
            Self::Partnership => &[Self::ManualIntervention],
        }
    }
}

impl fmt::Display for LeadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LeadState {
    type Error = LeadgateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for LeadState {
    type Err = LeadgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "EXISTING" => Ok(Self::Existing),
            "CHOOSE_OPTION" => Ok(Self::ChooseOption),
            "FORM_SENT" => Ok(Self::FormSent),
            "FORM_IN_PROGRESS" => Ok(Self::FormInProgress),
            "FORM_COMPLETED" => Ok(Self::FormCompleted),
            "MANUAL_INTERVENTION" => Ok(Self::ManualIntervention),
            "PARTNERSHIP" => Ok(Self::Partnership),
            other => Err(LeadgateError::Store(format!("unknown lead state: {other}"))),
        }
    }
}

/// Check whether `from -> to` appears in the transition table.
pub fn valid_transition(from: LeadState, to: LeadState) -> bool {
    from.allowed_targets().contains(&to)
}

/// Validate a transition, returning the new state or `InvalidTransition`.
///
/// The caller's state is never mutated here; a failed attempt leaves the
/// lead exactly where it was.
pub fn attempt_transition(from: LeadState, to: LeadState) -> Result<LeadState, LeadgateError> {
    if valid_transition(from, to) {
        Ok(to)
    } else {
        Err(LeadgateError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LeadState::*;

    #[test]
    fn test_every_allowed_pair() {
        let allowed = [
            (New, ChooseOption),
            (New, ManualIntervention),
            (ChooseOption, FormSent),
            (ChooseOption, Partnership),
            (ChooseOption, ManualIntervention),
            (FormSent, FormInProgress),
            (FormSent, ManualIntervention),
            (FormInProgress, FormCompleted),
            (FormInProgress, FormSent),
            (FormInProgress, ManualIntervention),
            (FormCompleted, ManualIntervention),
            (FormCompleted, Partnership),
            (ManualIntervention, New),
            (ManualIntervention, ChooseOption),
            (ManualIntervention, FormSent),
            (ManualIntervention, Partnership),
            (Partnership, ManualIntervention),
        ];
        for (from, to) in allowed {
            assert!(valid_transition(from, to), "{from} -> {to} should be allowed");
            assert_eq!(attempt_transition(from, to).unwrap(), to);
        }
    }

    #[test]
    fn test_existing_is_terminal() {
        for to in [
            New,
            ChooseOption,
            FormSent,
            FormInProgress,
            FormCompleted,
            ManualIntervention,
            Partnership,
        ] {
            assert!(!valid_transition(Existing, to));
        }
    }

    #[test]
    fn test_forbidden_pairs_error() {
        for (from, to) in [
            (New, FormSent),
            (New, FormCompleted),
            (ChooseOption, FormCompleted),
            (FormSent, FormCompleted),
            (FormCompleted, FormSent),
            (Partnership, ChooseOption),
        ] {
            let err = attempt_transition(from, to).unwrap_err();
            assert!(matches!(
                err,
                LeadgateError::InvalidTransition { from: f, to: t } if f == from && t == to
            ));
        }
    }

    #[test]
    fn test_reply_allowed_only_in_active_states() {
        assert!(New.reply_allowed());
        assert!(ChooseOption.reply_allowed());
        assert!(FormSent.reply_allowed());
        assert!(FormInProgress.reply_allowed());

        assert!(!Existing.reply_allowed());
        assert!(!FormCompleted.reply_allowed());
        assert!(!ManualIntervention.reply_allowed());
        assert!(!Partnership.reply_allowed());
    }

    #[test]
    fn test_round_trip_storage_form() {
        for state in [
            New,
            Existing,
            ChooseOption,
            FormSent,
            FormInProgress,
            FormCompleted,
            ManualIntervention,
            Partnership,
        ] {
            assert_eq!(state.as_str().parse::<LeadState>().unwrap(), state);
        }
    }

    #[test]
    fn test_unknown_state_rejected() {
        assert!("DELETED".parse::<LeadState>().is_err());
    }
}
