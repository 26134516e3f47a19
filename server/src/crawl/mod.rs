//! Crawl queue (C6, spec §4.7) and crawl client (C8, spec §4.9).

pub mod client;
pub mod pipeline;
pub mod queue;

pub use client::SourceClient;
pub use pipeline::run_crawl;
pub use queue::CrawlQueue;

/// Credentials forwarded to the source site (spec §6 "the password is
/// forwarded as the source-site password when crawling").
#[derive(Debug, Clone)]
pub struct SourceCredentials {
    pub username: String,
    pub password: String,
}

/// `{storageKey, credentials, days}` (spec §4.7 "Job").
#[derive(Debug, Clone)]
pub struct CrawlPayload {
    pub storage_key: String,
    pub credentials: SourceCredentials,
    pub days: u32,
}

/// One crawl phase (spec §6 "SSE event payloads").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    LoginAndList,
    FoundLinks,
    Processing,
    Done,
}

/// Queue/progress/terminal events (spec §4.7 "Listener attach", §6 "SSE
/// event payloads"). Tagged so it serializes directly as an SSE event name.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CrawlEvent {
    Queue {
        #[serde(rename = "aheadCount")]
        ahead_count: usize,
    },
    Progress {
        phase: CrawlPhase,
        #[serde(rename = "matchesTotal")]
        matches_total: usize,
        #[serde(rename = "processedMatches")]
        processed_matches: usize,
        #[serde(rename = "quizzesAdded")]
        quizzes_added: usize,
        #[serde(rename = "lastPositionId", skip_serializing_if = "Option::is_none")]
        last_position_id: Option<String>,
    },
    Done {
        added: usize,
        total: usize,
        #[serde(rename = "matchesTotal")]
        matches_total: usize,
    },
    Error {
        error: String,
    },
}

impl CrawlEvent {
    /// Whether this event closes the listener stream (spec §4.7).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlEvent::Done { .. } | CrawlEvent::Error { .. })
    }

    /// SSE event name (spec §6 "SSE event payloads": `queue`, `progress`,
    /// `done`, `error`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CrawlEvent::Queue { .. } => "queue",
            CrawlEvent::Progress { .. } => "progress",
            CrawlEvent::Done { .. } => "done",
            CrawlEvent::Error { .. } => "error",
        }
    }
}
