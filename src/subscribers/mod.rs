//! # Event subscribers for the task system.
//!
//! ## Architecture
//! ```text
//! TaskSystem / runner / TaskHandle ── publish(Event) ──► Bus
//!                                                          │
//!                                               subscriber listener
//!                                                          │
//!                                                  SubscriberSet::emit
//!                                           ┌──────────────┼──────────────┐
//!                                           ▼              ▼              ▼
//!                                       LogWriter      progress UI      custom
//! ```

mod embedded;
mod subscribe;
mod subscriber_set;

pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
