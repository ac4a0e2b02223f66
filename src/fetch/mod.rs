pub mod extract;
pub mod retry;
pub mod transport;

use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;
use crate::models::{CharacterRecord, DamageRecord};
use retry::{next_step, Outcome, RetryPolicy, Step};
use transport::{ReqwestTransport, Transport};

/// Body of a successful fetch plus how it was obtained.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: String,
    pub attempts: u32,
    /// Delays slept between attempts, in order.
    pub backoffs: Vec<Duration>,
}

/// Fetches a profile page with retry/backoff and pulls the total damage out of it.
#[derive(Debug, Clone)]
pub struct DamageFetcher<T = ReqwestTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl DamageFetcher<ReqwestTransport> {
    pub fn with_policy(policy: RetryPolicy) -> Self {
        DamageFetcher::new(ReqwestTransport::new(), policy)
    }
}

impl<T: Transport> DamageFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        DamageFetcher { transport, policy }
    }

    /// Run the attempt state machine until success or a terminal failure.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut attempt = 0u32;
        let mut backoffs = Vec::new();
        loop {
            debug!(url, attempt, "requesting page");
            let result = self.transport.get(url, self.policy.timeout).await;
            match next_step(&self.policy, attempt, Outcome::classify(result)) {
                Step::Done(body) => {
                    return Ok(FetchedPage {
                        body,
                        attempts: attempt + 1,
                        backoffs,
                    })
                }
                Step::Retry { next, delay } => {
                    debug!(
                        url,
                        attempt = next,
                        max_retries = self.policy.max_retries,
                        "transient failure, backing off {:.2}s",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    backoffs.push(delay);
                    attempt = next;
                }
                Step::Fail(e) => return Err(e),
            }
        }
    }

    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.fetch_page(url).await?.body)
    }

    pub async fn fetch_damage(&self, url: &str) -> Result<String, FetchError> {
        let html = self.fetch_html(url).await?;
        extract::total_damage(&html)
    }

    pub async fn fetch_character_damage(
        &self,
        url: &str,
        record: &CharacterRecord,
    ) -> Result<DamageRecord, FetchError> {
        let damage = self.fetch_damage(url).await?;
        Ok(DamageRecord::from_record(record, damage))
    }
}
