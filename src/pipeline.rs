use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::fetch::transport::Transport;
use crate::fetch::DamageFetcher;
use crate::models::{CharacterRecord, DamageRecord, Snapshot};
use crate::parser;

pub const NAME_PLACEHOLDER: &str = "{name}";

/// Substitute the percent-encoded name into every `{name}` of `template`.
pub fn render_url(template: &str, name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, &urlencoding::encode(name))
}

/// Parse OCR text into a fresh snapshot, keeping at most `max_members` characters.
pub fn capture_snapshot(raw_text: &str, screenshot: Option<PathBuf>, max_members: usize) -> Snapshot {
    let mut characters = parser::parse_records(raw_text);
    if characters.len() > max_members {
        warn!(
            "Parsed {} characters, keeping the first {}",
            characters.len(),
            max_members
        );
        characters.truncate(max_members);
    }
    if characters.is_empty() {
        warn!("No characters recognised; recapture with the party list visible");
    }
    info!("Captured {} characters", characters.len());
    Snapshot::capture(characters, screenshot)
}

pub struct FetchFailure {
    pub name: String,
    pub error: FetchError,
}

pub struct FetchSummary {
    pub damages: Vec<DamageRecord>,
    pub failures: Vec<FetchFailure>,
}

/// Fetch damage for every record, at most `concurrency` at a time.
/// Results keep input order; one character failing does not stop the others.
pub async fn fetch_damages<T>(
    fetcher: Arc<DamageFetcher<T>>,
    template: &str,
    records: &[CharacterRecord],
    concurrency: usize,
) -> FetchSummary
where
    T: Transport + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let handles: Vec<_> = records
        .iter()
        .cloned()
        .map(|record| {
            let fetcher = Arc::clone(&fetcher);
            let sem = Arc::clone(&semaphore);
            let pb = pb.clone();
            let url = render_url(template, &record.name);
            let name = record.name.clone();
            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                let result = fetcher.fetch_character_damage(&url, &record).await;
                pb.inc(1);
                result
            });
            (name, handle)
        })
        .collect();

    let mut damages = Vec::new();
    let mut failures = Vec::new();
    for (name, handle) in handles {
        let result = handle.await.unwrap_or_else(|e| {
            pb.inc(1);
            Err(FetchError::Aborted {
                reason: e.to_string(),
            })
        });
        match result {
            Ok(d) => {
                info!("{}: {}", d.name, d.damage);
                damages.push(d);
            }
            Err(error) => {
                warn!("Fetch failed for {}: {}", name, error);
                failures.push(FetchFailure { name, error });
            }
        }
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} characters ({} ok, {} failed)",
        records.len(),
        damages.len(),
        failures.len()
    );
    FetchSummary { damages, failures }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::fetch::retry::RetryPolicy;
    use crate::error::TransportError;
    use crate::fetch::testing::MapTransport;
    use crate::fetch::transport::{HttpResponse, Transport};

    const TEMPLATE: &str = "https://example.test/character?name={name}";

    #[test]
    fn render_url_encodes_name() {
        assert_eq!(render_url(TEMPLATE, "Alpha"), "https://example.test/character?name=Alpha");
        assert_eq!(
            render_url(TEMPLATE, "보리"),
            "https://example.test/character?name=%EB%B3%B4%EB%A6%AC"
        );
        assert_eq!(render_url("x/{name}/{name}", "a b"), "x/a%20b/a%20b");
    }

    #[test]
    fn capture_truncates_to_party_size() {
        let text = "A Warrior 1\nB Mage 2\nC Priest 3\n";
        let snap = capture_snapshot(text, None, 2);
        let names: Vec<_> = snap.characters().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(snap.screenshot().is_none());
    }

    #[tokio::test]
    async fn ocr_text_to_damages() {
        let snap = capture_snapshot(
            "Alpha Warrior 12345\nBeta Mage 67890\n",
            Some(PathBuf::from("artifacts/raid_snapshot.png")),
            12,
        );
        let transport = MapTransport::new([
            (render_url(TEMPLATE, "Alpha"), HttpResponse::new(200, "<div>총딜 12.3조</div>")),
            (render_url(TEMPLATE, "Beta"), HttpResponse::new(200, "<div>총딜 845억</div>")),
        ]);
        let fetcher = Arc::new(DamageFetcher::new(transport, RetryPolicy::default()));

        let summary = fetch_damages(fetcher, TEMPLATE, snap.characters(), 2).await;
        assert!(summary.failures.is_empty());

        let next = snap.superseded_by(summary.damages);
        assert_eq!(next.characters(), snap.characters());
        let fame: Vec<_> = next.characters().iter().map(|c| c.fame).collect();
        assert_eq!(fame, vec![Some(12345), Some(67890)]);
        let dmg: Vec<_> = next.damages().iter().map(|d| d.damage.as_str()).collect();
        assert_eq!(dmg, vec!["12.3조", "845억"]);
    }

    #[tokio::test]
    async fn failure_does_not_abort_others() {
        let records = vec![
            CharacterRecord::new("Ghost", None, None),
            CharacterRecord::new("Beta", Some("Mage"), None),
            CharacterRecord::new("Blank", None, None),
        ];
        let transport = MapTransport::new([
            (render_url(TEMPLATE, "Beta"), HttpResponse::new(200, "<div>총딜 845억</div>")),
            (render_url(TEMPLATE, "Blank"), HttpResponse::new(200, "<div>nothing</div>")),
        ]);
        let policy = RetryPolicy {
            timeout: Duration::from_secs(1),
            max_retries: 0,
            backoff_base: Duration::ZERO,
        };
        let fetcher = Arc::new(DamageFetcher::new(transport, policy));

        let summary = fetch_damages(fetcher, TEMPLATE, &records, 1).await;
        assert_eq!(summary.damages.len(), 1);
        assert_eq!(summary.damages[0].name, "Beta");
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].name, "Ghost");
        assert_matches!(summary.failures[0].error, FetchError::ClientError { status: 404 });
        assert_eq!(summary.failures[1].name, "Blank");
        assert_matches!(summary.failures[1].error, FetchError::DamageNotFound);
    }

    /// Panics for one URL, serves a damage page for every other.
    struct PanickingTransport {
        bad_url: String,
    }

    impl Transport for PanickingTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, TransportError> {
            if url == self.bad_url {
                panic!("transport blew up for {}", url);
            }
            Ok(HttpResponse::new(200, "<div>총딜 845억</div>"))
        }
    }

    #[tokio::test]
    async fn panicked_task_is_reported_as_failure() {
        let records = vec![
            CharacterRecord::new("Alpha", None, None),
            CharacterRecord::new("Crash", None, None),
            CharacterRecord::new("Beta", None, None),
        ];
        let transport = PanickingTransport {
            bad_url: render_url(TEMPLATE, "Crash"),
        };
        let fetcher = Arc::new(DamageFetcher::new(transport, RetryPolicy::default()));

        let summary = fetch_damages(fetcher, TEMPLATE, &records, 2).await;
        assert_eq!(summary.damages.len() + summary.failures.len(), records.len());
        let ok: Vec<_> = summary.damages.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(ok, vec!["Alpha", "Beta"]);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].name, "Crash");
        assert_matches!(summary.failures[0].error, FetchError::Aborted { .. });
    }
}
