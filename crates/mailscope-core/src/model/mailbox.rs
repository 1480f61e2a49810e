//! Mailbox-existence probe payload and verdict rules.

use serde::{Deserialize, Serialize};

/// Outcome of the RCPT checks against the recipient's exchanger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxVerdict {
    Deliverable,
    Undeliverable,
    /// The domain accepts any local part; existence cannot be determined.
    CatchAll,
    Unknown,
}

impl MailboxVerdict {
    /// Decide from the target's RCPT reply code and, if it was sent, the reply
    /// code for a random local part at the same domain.
    pub fn from_codes(target: u16, random: Option<u16>) -> Self {
        let accepted = |code: u16| (200..300).contains(&code);
        let rejected = |code: u16| (500..600).contains(&code);
        match (target, random) {
            (t, Some(r)) if accepted(t) && accepted(r) => Self::CatchAll,
            (t, Some(r)) if accepted(t) && rejected(r) => Self::Deliverable,
            (t, _) if rejected(t) => Self::Undeliverable,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for MailboxVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Deliverable => "deliverable",
            Self::Undeliverable => "undeliverable",
            Self::CatchAll => "catch_all",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// What the probe saw on the exchanger that accepted the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxProbeResult {
    pub email: String,
    pub mx_host: String,
    pub verdict: MailboxVerdict,
    pub target_code: u16,
    pub target_reply: String,
    pub catch_all_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catch_all_code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_accepted_is_catch_all() {
        assert_eq!(MailboxVerdict::from_codes(250, Some(250)), MailboxVerdict::CatchAll);
    }

    #[test]
    fn test_target_accepted_random_rejected_is_deliverable() {
        assert_eq!(MailboxVerdict::from_codes(250, Some(550)), MailboxVerdict::Deliverable);
    }

    #[test]
    fn test_target_rejected_is_undeliverable() {
        assert_eq!(MailboxVerdict::from_codes(550, None), MailboxVerdict::Undeliverable);
        assert_eq!(MailboxVerdict::from_codes(553, Some(250)), MailboxVerdict::Undeliverable);
    }

    #[test]
    fn test_transient_codes_are_unknown() {
        assert_eq!(MailboxVerdict::from_codes(451, None), MailboxVerdict::Unknown);
        assert_eq!(MailboxVerdict::from_codes(250, Some(450)), MailboxVerdict::Unknown);
        assert_eq!(MailboxVerdict::from_codes(250, None), MailboxVerdict::Unknown);
    }

    #[test]
    fn test_display_matches_serialization() {
        let json = serde_json::to_value(MailboxVerdict::CatchAll).unwrap();
        assert_eq!(json, MailboxVerdict::CatchAll.to_string());
    }
}
