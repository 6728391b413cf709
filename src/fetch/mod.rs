//! # Network work: retry, mirror failover and HTTP helpers.
//!
//! - [`with_retry`] retries a block with exponential backoff, classifying
//!   errors through [`Retryable`].
//! - [`resolve`] tries an ordered list of [`MirrorSource`]s sequentially.
//! - [`mirror_urls`] maps official download URLs onto the BMCLAPI mirror.
//! - [`fetch_text`] / [`fetch_text_mirrored`] put the pieces together over `reqwest`.

mod error;
mod http;
mod mirror;
mod retry;
mod urls;

pub use error::{FetchError, MirrorError};
pub use http::{fetch_text, fetch_text_mirrored};
pub use mirror::{MirrorSource, Provider, SourceKind, SourceOrder, resolve, staggered_sources};
pub use retry::{Retryable, with_retry};
pub use urls::{BMCLAPI_ASSETS, BMCLAPI_LIBRARIES, BMCLAPI_MAVEN, BMCLAPI_ROOT, mirror_urls, to_mirror};
