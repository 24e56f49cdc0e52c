//! kumajala — translation core for French into West-African languages
//! (bété, baoulé, mooré, agni).
//!
//! Requests resolve through three tiers: an in-process LRU cache, a durable
//! translation store, and a generative fallback with retry and backoff.
//! Results produced by the fallback are persisted and cached so the slow
//! path runs at most once per phrase. On top of that sit a batch
//! orchestrator with partial-failure tolerance and cancellation, and a
//! speech service with a bounded audio cache.

pub mod ai;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod lang;
pub mod metrics;
pub mod resolver;
pub mod service;
pub mod store;
pub mod tts;

pub use batch::{BatchOptions, BatchOrchestrator, BatchReport};
pub use config::Config;
pub use error::{TranslateError, TranslateResult};
pub use lang::{supported_languages, TargetLanguage};
pub use resolver::{Resolution, TranslationResolver};
pub use service::{init_tracing, KumajalaService};
pub use store::{Origin, TranslationEntry};
