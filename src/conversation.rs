//! Conversation log and onboarding gate.
//!
//! The log is append-only: messages get an ordinal equal to their position
//! and are never edited or removed. The gate starts in
//! `AwaitingClassification` and moves to `Active` exactly once, carrying the
//! chosen employment type so a classification exists iff the gate is open.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UnknownEmploymentType;

pub const SEED_MESSAGE: &str =
    "Hej! Jag är Backster, din digitala kollega. Innan vi börjar: vilken anställningsform har du?";

pub const ACKNOWLEDGEMENT: &str = "Tack, vad kan jag hjälpa dig med idag?";

// ── Message ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Bot,
    User,
}

/// Which part of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Seed greeting, the classification label, and its acknowledgement
    Onboarding,
    /// A dispatched query or the answer to one
    Exchange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub ordinal: usize,
    pub origin: Origin,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// True for answers produced by a real dispatch.
    pub fn is_answer(&self) -> bool {
        self.role == Role::Bot && self.origin == Origin::Exchange
    }
}

// ── ConversationLog ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    /// A log holding only the seed greeting.
    pub fn seeded() -> Self {
        let mut log = Self { messages: Vec::new() };
        log.push(Role::Bot, SEED_MESSAGE, Origin::Onboarding);
        log
    }

    pub(crate) fn push(&mut self, role: Role, text: impl Into<String>, origin: Origin) -> usize {
        let ordinal = self.messages.len();
        self.messages.push(Message {
            role,
            text: text.into(),
            ordinal,
            origin,
            sent_at: Utc::now(),
        });
        ordinal
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn get(&self, ordinal: usize) -> Option<&Message> {
        self.messages.get(ordinal)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Ordinal of the most recent dispatch answer, if any.
    pub fn last_answer(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_answer)
    }
}

// ── EmploymentType ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "Tillsvidare")]
    Permanent,
    #[serde(rename = "Säsong/Visstid")]
    Seasonal,
}

impl EmploymentType {
    pub const ALL: [EmploymentType; 2] = [EmploymentType::Permanent, EmploymentType::Seasonal];

    /// The label the answering service expects, also shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            EmploymentType::Permanent => "Tillsvidare",
            EmploymentType::Seasonal => "Säsong/Visstid",
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EmploymentType {
    type Err = UnknownEmploymentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "tillsvidare" | "permanent" => Ok(EmploymentType::Permanent),
            "säsong/visstid" | "säsong" | "visstid" | "seasonal" => Ok(EmploymentType::Seasonal),
            _ => Err(UnknownEmploymentType(s.to_string())),
        }
    }
}

// ── Onboarding gate ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Onboarding {
    AwaitingClassification,
    Active(EmploymentType),
}

// ── ConversationState ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub log: ConversationLog,
    pub onboarding: Onboarding,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            log: ConversationLog::seeded(),
            onboarding: Onboarding::AwaitingClassification,
        }
    }
}

impl ConversationState {
    pub fn classification(&self) -> Option<EmploymentType> {
        match self.onboarding {
            Onboarding::Active(kind) => Some(kind),
            Onboarding::AwaitingClassification => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.onboarding, Onboarding::Active(_))
    }

    /// Open the gate. Both onboarding messages and the stage change land in
    /// the returned snapshot together; from `Active` this returns an
    /// unchanged copy.
    pub fn classify(&self, kind: EmploymentType) -> Self {
        if self.is_active() {
            tracing::debug!(requested = %kind, "classify ignored: gate already active");
            return self.clone();
        }
        let mut next = self.clone();
        next.log.push(Role::User, kind.label(), Origin::Onboarding);
        next.log.push(Role::Bot, ACKNOWLEDGEMENT, Origin::Onboarding);
        next.onboarding = Onboarding::Active(kind);
        tracing::info!(classification = %kind, "onboarding complete");
        next
    }
}
