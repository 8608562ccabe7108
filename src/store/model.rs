//! Domain records — mailbox connections, leads, email threads, messages.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// No recent engagement.
    Cold,
    /// Fresh contact, worth attention.
    Warm,
    /// Actively engaged.
    Hot,
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::Warm
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cold => write!(f, "cold"),
            Self::Warm => write!(f, "warm"),
            Self::Hot => write!(f, "hot"),
        }
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cold" => Ok(Self::Cold),
            "warm" => Ok(Self::Warm),
            "hot" => Ok(Self::Hot),
            _ => Err(format!("Unknown lead status: {}", s)),
        }
    }
}

/// Lifecycle status of an email thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Active,
    Archived,
    Closed,
}

impl Default for ThreadStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for ThreadStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown thread status: {}", s)),
        }
    }
}

/// Whether a message left the mailbox or arrived in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Inbound
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// Delivery status of a stored message.
///
/// The sync pipeline only writes `Sent` (both directions record delivered
/// mail); `Draft` rows are written by the drafting surface and consumed by
/// the action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Draft,
    Sent,
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::Sent
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Sent => write!(f, "sent"),
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            _ => Err(format!("Unknown message status: {}", s)),
        }
    }
}

/// A contact reconciled out of inbox traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub user_id: String,
    /// Lowercased; unique per user.
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub status: LeadStatus,
    /// Most recent contact anchor (see the recency pass).
    pub last_contacted_at: Option<DateTime<Utc>>,
    /// Whole days between now and `last_contacted_at`, recomputed after sync.
    pub days_since_contact: Option<i64>,
    pub ai_suggestion: Option<String>,
    pub has_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(user_id: &str, email: &str, name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            email: email.to_lowercase(),
            name: Some(name.to_string()),
            company: None,
            status: LeadStatus::Warm,
            last_contacted_at: None,
            days_since_contact: None,
            ai_suggestion: None,
            has_draft: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_company(mut self, company: Option<String>) -> Self {
        self.company = company;
        self
    }

    pub fn with_last_contacted(mut self, at: DateTime<Utc>) -> Self {
        self.last_contacted_at = Some(at);
        self
    }

    /// True when the stored name is effectively unknown and may be
    /// backfilled from an incoming display name.
    pub fn name_is_placeholder(&self) -> bool {
        match self.name.as_deref() {
            None => true,
            Some(n) => n.trim().is_empty() || n == "Unknown",
        }
    }
}

/// One provider conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailThread {
    pub id: String,
    pub user_id: String,
    /// Provider-side thread id; unique per user.
    pub provider_thread_id: String,
    pub subject: String,
    /// Set once at creation from the newest message's sender; never
    /// rewritten when the thread is touched by later syncs.
    pub lead_id: Option<String>,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailThread {
    pub fn new(user_id: &str, provider_thread_id: &str, subject: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider_thread_id: provider_thread_id.to_string(),
            subject: subject.to_string(),
            lead_id: None,
            status: ThreadStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_lead(mut self, lead_id: Option<String>) -> Self {
        self.lead_id = lead_id;
        self
    }
}

/// One email row, synced or drafted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub user_id: String,
    pub thread_id: String,
    pub lead_id: Option<String>,
    pub direction: Direction,
    pub from_email: String,
    pub to_email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub status: MessageStatus,
    pub is_ai_draft: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    /// Provider message id; dedup key together with user and thread.
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredMessage {
    /// A draft authored inside the product (no provider id yet).
    pub fn draft(user_id: &str, thread_id: &str, subject: &str, body_text: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            thread_id: thread_id.to_string(),
            lead_id: None,
            direction: Direction::Outbound,
            from_email: String::new(),
            to_email: String::new(),
            subject: subject.to_string(),
            body_text: body_text.to_string(),
            body_html: None,
            status: MessageStatus::Draft,
            is_ai_draft: false,
            sent_at: None,
            received_at: None,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_lead(mut self, lead_id: Option<String>) -> Self {
        self.lead_id = lead_id;
        self
    }

    pub fn with_ai_draft(mut self, is_ai_draft: bool) -> Self {
        self.is_ai_draft = is_ai_draft;
        self
    }
}

/// A linked mailbox. The row doubles as the credential store: the sync
/// pipeline reads tokens from here and never refreshes them itself.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub mailbox_email: String,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Sticky failure note from the last run; cleared on success.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(user_id: &str, mailbox_email: &str, access_token: SecretString) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider: "gmail".to_string(),
            mailbox_email: mailbox_email.to_lowercase(),
            access_token,
            refresh_token: None,
            last_synced_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_refresh_token(mut self, token: Option<SecretString>) -> Self {
        self.refresh_token = token;
        self
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.expose_secret().trim().is_empty()
    }
}
