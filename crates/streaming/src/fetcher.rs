use runtime::clock::Clock;
use runtime::sleep::Sleeper;
use thiserror::Error;

use crate::plan::{AttemptOutcome, FetchAttempt, FetchPlan};
use crate::transport::{Transport, percent};

/// The single resolved result of a [`ResourceFetcher::resolve`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub url: String,
    /// Index into the plan's candidates (0 = primary).
    pub candidate: usize,
    pub bytes: Vec<u8>,
    pub attempts: Vec<FetchAttempt>,
}

impl Artifact {
    pub fn from_fallback(&self) -> bool {
        self.candidate > 0
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// Every candidate of a plan ran out of attempts.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "all {} candidate(s) exhausted after {} attempt(s){}",
    .candidates.len(),
    .attempts.len(),
    last_failure(.attempts)
)]
pub struct FetchExhausted {
    pub candidates: Vec<String>,
    pub attempts: Vec<FetchAttempt>,
}

fn last_failure(attempts: &[FetchAttempt]) -> String {
    match attempts.last().map(|last| (&last.url, &last.outcome)) {
        Some((url, AttemptOutcome::Retryable(reason) | AttemptOutcome::Fatal(reason))) => {
            format!("; last error from {url}: {reason}")
        }
        _ => String::new(),
    }
}

/// Resolves a [`FetchPlan`] into exactly one artifact or one terminal error.
///
/// Candidates are tried in order. A retryable failure waits
/// `backoff.delay_for(attempt)` before the next attempt; a fatal failure
/// skips the rest of that candidate's attempts. Callers must not run two
/// resolutions for the same logical asset concurrently.
pub struct ResourceFetcher<T, S, C> {
    transport: T,
    sleeper: S,
    clock: C,
}

impl<T, S, C> ResourceFetcher<T, S, C>
where
    T: Transport,
    S: Sleeper,
    C: Clock,
{
    pub fn new(transport: T, sleeper: S, clock: C) -> Self {
        Self {
            transport,
            sleeper,
            clock,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `on_progress` fires with a 0-100 value only when the transport
    /// reports a total size; it never repeats or decreases within one call.
    pub async fn resolve(
        &self,
        plan: &FetchPlan,
        mut on_progress: Option<&mut dyn FnMut(u8)>,
    ) -> Result<Artifact, FetchExhausted> {
        let mut attempts: Vec<FetchAttempt> = Vec::new();
        let mut last_pct: Option<u8> = None;

        for (candidate, url) in plan.candidates().iter().enumerate() {
            for attempt_number in 1..=plan.max_retries() {
                let started_at = self.clock.now();
                let result = {
                    let mut report = |loaded: u64, total: Option<u64>| {
                        let Some(pct) = percent(loaded, total) else {
                            return;
                        };
                        if last_pct.is_some_and(|prev| pct <= prev) {
                            return;
                        }
                        last_pct = Some(pct);
                        if let Some(cb) = on_progress.as_mut() {
                            cb(pct);
                        }
                    };
                    self.transport.fetch(url, &mut report).await
                };

                match result {
                    Ok(bytes) => {
                        log::info!(
                            "fetched {url} ({} bytes) on attempt {attempt_number}",
                            bytes.len()
                        );
                        attempts.push(FetchAttempt {
                            url: url.clone(),
                            attempt_number,
                            started_at,
                            outcome: AttemptOutcome::Success { bytes: bytes.len() },
                        });
                        return Ok(Artifact {
                            url: url.clone(),
                            candidate,
                            bytes,
                            attempts,
                        });
                    }
                    Err(err) if err.is_retryable() => {
                        attempts.push(FetchAttempt {
                            url: url.clone(),
                            attempt_number,
                            started_at,
                            outcome: AttemptOutcome::Retryable(err.to_string()),
                        });
                        let delay = plan.backoff().delay_for(attempt_number);
                        log::debug!(
                            "fetch {url} attempt {attempt_number}/{} failed: {err}; backing off {delay}ms",
                            plan.max_retries()
                        );
                        self.sleeper.sleep(delay).await;
                    }
                    Err(err) => {
                        log::warn!("fetch {url} failed permanently: {err}; skipping candidate");
                        attempts.push(FetchAttempt {
                            url: url.clone(),
                            attempt_number,
                            started_at,
                            outcome: AttemptOutcome::Fatal(err.to_string()),
                        });
                        break;
                    }
                }
            }
            if candidate + 1 < plan.candidates().len() {
                log::warn!("candidate {url} exhausted; trying fallback");
            }
        }

        let exhausted = FetchExhausted {
            candidates: plan.candidates().to_vec(),
            attempts,
        };
        log::error!("{exhausted}");
        Err(exhausted)
    }
}
