use foundation::time::Millis;
use runtime::retry::Backoff;
use serde::Deserialize;

/// Retry settings shared by every candidate of a plan.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrySettings {
    /// Attempts per candidate (including the first).
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Ordered candidate URLs for one logical asset.
///
/// Each candidate gets up to `max_retries` attempts before the next one is
/// tried, so a plan never makes more than `candidates * max_retries`
/// attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    candidates: Vec<String>,
    max_retries: u32,
    backoff: Backoff,
}

impl FetchPlan {
    pub fn new(primary: impl Into<String>) -> Self {
        let settings = RetrySettings::default();
        let mut plan = Self {
            candidates: Vec::new(),
            max_retries: settings.max_retries,
            backoff: Backoff::new(settings.base_delay_ms),
        };
        plan.push_candidate(primary.into());
        plan
    }

    /// Appends a fallback candidate. Blank URLs and exact duplicates of an
    /// existing candidate are ignored.
    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.push_candidate(url.into());
        self
    }

    pub fn with_retries(mut self, settings: RetrySettings) -> Self {
        self.max_retries = settings.max_retries.max(1);
        self.backoff = Backoff::new(settings.base_delay_ms);
        self
    }

    fn push_candidate(&mut self, url: String) {
        let url = url.trim().to_string();
        if url.is_empty() || self.candidates.contains(&url) {
            return;
        }
        self.candidates.push(url);
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn max_attempts(&self) -> u32 {
        self.candidates.len() as u32 * self.max_retries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { bytes: usize },
    /// Transient failure; the candidate may be tried again.
    Retryable(String),
    /// The candidate cannot succeed; remaining retries are skipped.
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt {
    pub url: String,
    /// 1-based within its candidate.
    pub attempt_number: u32,
    pub started_at: Millis,
    pub outcome: AttemptOutcome,
}
