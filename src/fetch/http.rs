//! HTTP text fetching on top of [`with_retry`] and [`resolve`].

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::fetch::error::{FetchError, MirrorError};
use crate::fetch::mirror::{MirrorSource, SourceKind, SourceOrder, resolve};
use crate::fetch::retry::with_retry;
use crate::fetch::urls::mirror_urls;
use crate::policies::RetryPolicy;

/// GETs `url` as text, retrying transient failures per `policy`.
///
/// Non-success statuses become [`FetchError::Status`] (5xx retryable, the rest fatal).
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
    token: &CancellationToken,
) -> Result<String, FetchError> {
    with_retry(url, policy, token, || get_text(client.get(url))).await
}

async fn get_text(request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            code: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// GETs `url` from the official host and its mirror in `order`, each with retry.
///
/// The candidate list comes from [`mirror_urls`]; each candidate is an
/// independent [`MirrorSource`] with no stagger.
pub async fn fetch_text_mirrored(
    client: &reqwest::Client,
    url: &str,
    order: SourceOrder,
    policy: RetryPolicy,
    token: &CancellationToken,
) -> Result<String, MirrorError> {
    let candidates = mirror_urls(url, order)
        .into_iter()
        .map(|candidate| {
            let kind = if candidate == url {
                SourceKind::Official
            } else {
                SourceKind::Bmclapi
            };
            (kind, candidate)
        })
        .collect();

    resolve(&text_sources(client, candidates, policy), token).await
}

fn text_sources(
    client: &reqwest::Client,
    candidates: Vec<(SourceKind, String)>,
    policy: RetryPolicy,
) -> Vec<MirrorSource<String>> {
    candidates
        .into_iter()
        .map(|(kind, candidate)| {
            let client = client.clone();
            let candidate: Arc<str> = Arc::from(candidate);
            MirrorSource::new(Duration::ZERO, kind, move |token: CancellationToken| {
                let client = client.clone();
                let candidate = candidate.clone();
                async move {
                    fetch_text(&client, &candidate, &policy, &token)
                        .await
                        .map(Some)
                }
            })
        })
        .collect()
}
