//! # Mirror failover.
//!
//! [`resolve`] walks an ordered list of [`MirrorSource`]s **sequentially**:
//!
//! ```text
//! for source in sources:
//!     check token ─► sleep(source.delay) ─► check token
//!     provider(token) ──Ok(Some(v))──► return v           (later sources never run)
//!                     ├─Ok(None)─────► miss, next source
//!                     ├─Err(Canceled)► MirrorError::Canceled
//!                     └─Err(e)───────► remember e, next source
//! none succeeded ─► Exhausted { last error } | NoSource
//! ```
//!
//! Sources never run concurrently. The delay of a source staggers preference:
//! a small delay on the preferred source and a larger one on the fallback.
//! When everything fails, the **last** error is surfaced, not the first.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::fetch::error::{FetchError, MirrorError};

/// Diagnostic tag of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// The authoritative upstream (Mojang, Forge, Fabric...).
    Official,
    /// The BMCLAPI mirror.
    Bmclapi,
}

impl SourceKind {
    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Official => "Official",
            SourceKind::Bmclapi => "BMCLAPI",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which source a download should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceOrder {
    /// Try the official source first, the mirror second.
    #[default]
    OfficialFirst,
    /// Try the mirror first, the official source second.
    MirrorFirst,
}

/// Boxed source body: receives the caller's token, yields a value, a miss, or an error.
pub type Provider<T> =
    Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<Option<T>, FetchError>> + Send + Sync>;

/// One candidate source in a failover list.
pub struct MirrorSource<T> {
    /// Pause before this source is attempted.
    pub delay: Duration,
    /// Diagnostic tag.
    pub kind: SourceKind,
    provider: Provider<T>,
}

impl<T> MirrorSource<T> {
    /// Creates a source from an async closure.
    pub fn new<F, Fut>(delay: Duration, kind: SourceKind, provider: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, FetchError>> + Send + 'static,
    {
        Self {
            delay,
            kind,
            provider: Box::new(move |token| Box::pin(provider(token))),
        }
    }
}

impl<T> fmt::Debug for MirrorSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorSource")
            .field("delay", &self.delay)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Tries `sources` in order and returns the first value produced.
pub async fn resolve<T>(
    sources: &[MirrorSource<T>],
    token: &CancellationToken,
) -> Result<T, MirrorError> {
    let mut last: Option<(SourceKind, FetchError)> = None;

    for source in sources {
        if token.is_cancelled() {
            return Err(MirrorError::Canceled);
        }
        if !source.delay.is_zero() {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(MirrorError::Canceled),
                _ = tokio::time::sleep(source.delay) => {}
            }
        }
        if token.is_cancelled() {
            return Err(MirrorError::Canceled);
        }

        let attempt = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(MirrorError::Canceled),
            res = (source.provider)(token.clone()) => res,
        };
        match attempt {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::debug!(source = %source.kind, "source returned nothing");
            }
            Err(FetchError::Canceled) => return Err(MirrorError::Canceled),
            Err(e) => {
                tracing::debug!(source = %source.kind, error = %e, "source failed");
                last = Some((source.kind, e));
            }
        }
    }

    match last {
        Some((kind, cause)) => Err(MirrorError::Exhausted { kind, cause }),
        None => Err(MirrorError::NoSource),
    }
}

/// Builds the two-source list for `order` with the standard stagger.
///
/// - `OfficialFirst`: official after 5ms, mirror after a further 35ms.
/// - `MirrorFirst`: mirror after 30ms, official after a further 90ms.
pub fn staggered_sources<T, O, OFut, M, MFut>(
    order: SourceOrder,
    official: O,
    mirror: M,
) -> Vec<MirrorSource<T>>
where
    O: Fn(CancellationToken) -> OFut + Send + Sync + 'static,
    OFut: Future<Output = Result<Option<T>, FetchError>> + Send + 'static,
    M: Fn(CancellationToken) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = Result<Option<T>, FetchError>> + Send + 'static,
{
    let ms = Duration::from_millis;
    match order {
        SourceOrder::OfficialFirst => vec![
            MirrorSource::new(ms(5), SourceKind::Official, official),
            MirrorSource::new(ms(35), SourceKind::Bmclapi, mirror),
        ],
        SourceOrder::MirrorFirst => vec![
            MirrorSource::new(ms(30), SourceKind::Bmclapi, mirror),
            MirrorSource::new(ms(90), SourceKind::Official, official),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    use crate::error::TaskError;
    use crate::fetch::retry::with_retry;
    use crate::policies::RetryPolicy;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn source(
        log: &Log,
        name: &'static str,
        delay_ms: u64,
        result: fn() -> Result<Option<&'static str>, FetchError>,
    ) -> MirrorSource<&'static str> {
        let log = log.clone();
        MirrorSource::new(
            Duration::from_millis(delay_ms),
            SourceKind::Official,
            move |_token: CancellationToken| {
                log.lock().unwrap().push(name);
                std::future::ready(result())
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn official_404_falls_through_to_mirror() {
        let log = Log::default();
        let sources = staggered_sources(
            SourceOrder::OfficialFirst,
            {
                let log = log.clone();
                move |_t: CancellationToken| {
                    log.lock().unwrap().push("official");
                    std::future::ready(Err(FetchError::Status { code: 404 }))
                }
            },
            {
                let log = log.clone();
                move |_t: CancellationToken| {
                    log.lock().unwrap().push("mirror");
                    std::future::ready(Ok(Some("ok")))
                }
            },
        );

        let started = Instant::now();
        let value = resolve(&sources, &CancellationToken::new()).await.unwrap();

        assert_eq!(value, "ok");
        assert_eq!(*log.lock().unwrap(), vec!["official", "mirror"]);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(40) && elapsed < Duration::from_millis(45));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_skips_the_rest() {
        let log = Log::default();
        let sources = vec![
            source(&log, "a", 0, || Err(FetchError::Status { code: 500 })),
            source(&log, "b", 1, || Ok(Some("b"))),
            source(&log, "c", 1, || Ok(Some("c"))),
        ];

        assert_eq!(resolve(&sources, &CancellationToken::new()).await.unwrap(), "b");
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn all_failing_surfaces_last_error() {
        let log = Log::default();
        let sources = vec![
            source(&log, "a", 0, || Err(FetchError::Status { code: 500 })),
            source(&log, "b", 0, || Err(FetchError::Status { code: 404 })),
        ];

        match resolve(&sources, &CancellationToken::new()).await {
            Err(MirrorError::Exhausted {
                cause: FetchError::Status { code },
                ..
            }) => assert_eq!(code, 404),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_or_all_missing_is_no_source() {
        let log = Log::default();
        let empty: Vec<MirrorSource<&'static str>> = Vec::new();
        assert!(matches!(
            resolve(&empty, &CancellationToken::new()).await,
            Err(MirrorError::NoSource)
        ));

        let misses = vec![source(&log, "a", 0, || Ok(None)), source(&log, "b", 0, || Ok(None))];
        assert!(matches!(
            resolve(&misses, &CancellationToken::new()).await,
            Err(MirrorError::NoSource)
        ));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_stagger_skips_provider() {
        let log = Log::default();
        let sources = vec![source(&log, "slow", 1_000, || Ok(Some("late")))];
        let token = CancellationToken::new();
        let trip = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trip.cancel();
        });

        assert!(matches!(resolve(&sources, &token).await, Err(MirrorError::Canceled)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_a_resolve_stops_on_a_fatal_last_cause() {
        let log = Log::default();
        let sources = vec![source(&log, "official", 0, || Err(FetchError::Status { code: 404 }))];
        let token = CancellationToken::new();
        let (sources_ref, token_ref) = (&sources, &token);

        let res: Result<&str, TaskError> =
            with_retry("version-manifest", &RetryPolicy::default(), &token, move || async move {
                resolve(sources_ref, token_ref).await.map_err(TaskError::from)
            })
            .await;

        assert_eq!(res.unwrap_err().as_label(), "task_fatal");
        assert_eq!(*log.lock().unwrap(), vec!["official"]);
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_a_resolve_repeats_on_a_transient_last_cause() {
        let log = Log::default();
        let sources = vec![source(&log, "official", 0, || Err(FetchError::Status { code: 503 }))];
        let token = CancellationToken::new();

        let res = with_retry("version-manifest", &RetryPolicy::default(), &token, || {
            resolve(&sources, &token)
        })
        .await;

        assert!(matches!(res, Err(MirrorError::Exhausted { .. })));
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn mirror_first_order() {
        let sources = staggered_sources(
            SourceOrder::MirrorFirst,
            |_t: CancellationToken| std::future::ready(Ok(Some(1))),
            |_t: CancellationToken| std::future::ready(Ok(Some(2))),
        );
        let kinds: Vec<_> = sources.iter().map(|s| (s.kind, s.delay)).collect();
        assert_eq!(
            kinds,
            vec![
                (SourceKind::Bmclapi, Duration::from_millis(30)),
                (SourceKind::Official, Duration::from_millis(90)),
            ]
        );
    }
}
