//! Decides whether a stored message warrants an automated reply, and with
//! what prompt.
//!
//! Two reserved sender names pass internal instructions through the chat
//! transport instead of human content: the welcome sentinel (fires the
//! persona introduction) and the command sentinel (its message body is used
//! verbatim as the prompt). Neither is ever persisted as a human message.

/// Display name the automated reply is stored under.
pub const AI_SENDER_NAME: &str = "AI Consultant";

/// Sentinel sender announcing a room entry; the message body carries the
/// human display name to greet.
pub const WELCOME_SENTINEL: &str = "SYSTEM_WELCOME";

/// Sentinel sender for hidden UI instructions; the message body is the
/// prompt itself.
pub const COMMAND_SENTINEL: &str = "SYSTEM_COMMAND";

/// Keywords that address the consultant in ordinary chat. Matching is
/// case-insensitive and substring-based: a keyword embedded inside another
/// word still counts.
pub const DEFAULT_TRIGGER_KEYWORDS: &[&str] =
    &["@ai", "ai consultant", "consultant", "hey ai", "execute option"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Reply with this fully composed prompt (sentinel paths carry their own
    /// prompts and skip context assembly).
    Reply { prompt: String },
    /// Reply through the addressed path: assemble room context first.
    Addressed,
    /// Store silently.
    Silent,
}

#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    keywords: Vec<String>,
    solo_room_auto_reply: bool,
}

impl TriggerPolicy {
    pub fn new(keywords: Vec<String>, solo_room_auto_reply: bool) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            solo_room_auto_reply,
        }
    }

    pub fn with_defaults(solo_room_auto_reply: bool) -> Self {
        Self::new(
            DEFAULT_TRIGGER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            solo_room_auto_reply,
        )
    }

    pub fn solo_room_auto_reply(&self) -> bool {
        self.solo_room_auto_reply
    }

    /// Evaluate a message. `distinct_human_senders` is only consulted for the
    /// solo-occupancy rule; pass `None` when it was not (or could not be)
    /// counted, which disables that rule for this message.
    pub fn evaluate(
        &self,
        sender_name: &str,
        message: &str,
        distinct_human_senders: Option<u32>,
    ) -> Verdict {
        if sender_name == WELCOME_SENTINEL {
            return Verdict::Reply {
                prompt: welcome_prompt(message),
            };
        }

        if sender_name == COMMAND_SENTINEL {
            return Verdict::Reply {
                prompt: message.to_string(),
            };
        }

        let lowered = message.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return Verdict::Addressed;
        }

        if self.solo_room_auto_reply
            && matches!(distinct_human_senders, Some(n) if n <= 1)
        {
            return Verdict::Addressed;
        }

        Verdict::Silent
    }
}

pub fn is_sentinel(sender_name: &str) -> bool {
    sender_name == WELCOME_SENTINEL || sender_name == COMMAND_SENTINEL
}

fn welcome_prompt(display_name: &str) -> String {
    format!(
        "You are an expert Strategic Consultant. The user '{}' has just entered the 'War Room'. \
         Give them a very short, professional, high-energy welcome message.",
        display_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TriggerPolicy {
        TriggerPolicy::with_defaults(false)
    }

    #[test]
    fn welcome_sentinel_always_replies_with_the_name_interpolated() {
        let verdict = policy().evaluate(WELCOME_SENTINEL, "Alice", Some(5));
        match verdict {
            Verdict::Reply { prompt } => {
                assert!(prompt.contains("'Alice'"));
                assert!(prompt.contains("Strategic Consultant"));
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn command_sentinel_uses_the_body_verbatim() {
        let verdict = policy().evaluate(COMMAND_SENTINEL, "Summarize option B risks.", None);
        assert_eq!(
            verdict,
            Verdict::Reply {
                prompt: "Summarize option B risks.".to_string()
            }
        );
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let p = policy();
        assert_eq!(p.evaluate("bob", "Hey AI, thoughts?", Some(5)), Verdict::Addressed);
        assert_eq!(p.evaluate("bob", "ask the CONSULTANT", Some(5)), Verdict::Addressed);
        // No tokenization: embedded keyword still matches.
        assert_eq!(p.evaluate("bob", "we hired paraconsultants", Some(5)), Verdict::Addressed);
    }

    #[test]
    fn plain_chat_in_a_busy_room_is_silent() {
        assert_eq!(policy().evaluate("bob", "lunch at noon?", Some(3)), Verdict::Silent);
    }

    #[test]
    fn solo_occupancy_replies_only_when_enabled() {
        let solo_on = TriggerPolicy::with_defaults(true);
        assert_eq!(solo_on.evaluate("bob", "anyone here?", Some(1)), Verdict::Addressed);
        assert_eq!(solo_on.evaluate("bob", "anyone here?", Some(2)), Verdict::Silent);

        let solo_off = TriggerPolicy::with_defaults(false);
        assert_eq!(solo_off.evaluate("bob", "anyone here?", Some(1)), Verdict::Silent);
    }

    #[test]
    fn uncounted_rooms_never_trip_the_solo_rule() {
        let solo_on = TriggerPolicy::with_defaults(true);
        assert_eq!(solo_on.evaluate("bob", "anyone here?", None), Verdict::Silent);
    }
}
