//! Model registry.
//!
//! Resolves short model names (`sonnet`, `gpt-4o`, …) to a concrete
//! `{id, provider, max_tokens, label}` tuple. The Core Service uses this to
//! pick an adapter and a wire-level model id; it never holds ambient,
//! pre-authenticated provider instances — callers supply their own API key
//! per request (see [`crate::build_provider`]).
//!
//! The registry is seeded with a built-in baseline table and can be
//! refreshed from provider discovery APIs on a TTL, gated by the
//! `MODEL_DISCOVERY_ENABLED` environment variable. A failed or disabled
//! refresh leaves the baseline (or the last good snapshot) untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Which wire shape a resolved model speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderShape {
    Anthropic,
    OpenAiCompat,
}

/// A concrete, provider-resolved model.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub id: String,
    pub provider: ProviderShape,
    pub max_tokens: u32,
    pub label: String,
}

/// An immutable snapshot of the registry's short-name -> model table.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    models: HashMap<String, ResolvedModel>,
}

impl RegistrySnapshot {
    fn baseline() -> Self {
        let entries = [
            ResolvedModel {
                id: "claude-sonnet-4-20250514".into(),
                provider: ProviderShape::Anthropic,
                max_tokens: 8_192,
                label: "Claude Sonnet 4".into(),
            },
            ResolvedModel {
                id: "claude-opus-4-20250514".into(),
                provider: ProviderShape::Anthropic,
                max_tokens: 8_192,
                label: "Claude Opus 4".into(),
            },
            ResolvedModel {
                id: "gpt-4o".into(),
                provider: ProviderShape::OpenAiCompat,
                max_tokens: 16_384,
                label: "GPT-4o".into(),
            },
            ResolvedModel {
                id: "gpt-4o-mini".into(),
                provider: ProviderShape::OpenAiCompat,
                max_tokens: 16_384,
                label: "GPT-4o mini".into(),
            },
        ];

        let short_names = ["sonnet", "opus", "gpt-4o", "gpt-4o-mini"];

        let mut models = HashMap::new();
        for (short_name, model) in short_names.into_iter().zip(entries) {
            models.insert(short_name.to_string(), model);
        }
        Self { models }
    }

    pub fn resolve(&self, short_name: &str) -> Option<ResolvedModel> {
        self.models.get(short_name).cloned()
    }

    pub fn list(&self) -> Vec<(&str, &ResolvedModel)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

/// Process-wide registry of resolvable models, refreshed on a TTL.
///
/// Readers take a cheap clone of an `Arc<RegistrySnapshot>` guarded by a
/// `parking_lot::RwLock`, matching the concurrency model's "process-wide,
/// refreshed on a TTL; readers get a snapshot copy" rule.
pub struct ModelRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    last_refresh: RwLock<Option<Instant>>,
    ttl: Duration,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::baseline())),
            last_refresh: RwLock::new(None),
            ttl: Duration::from_secs(3600),
        }
    }

    pub fn resolve(&self, short_name: &str) -> Option<ResolvedModel> {
        self.snapshot.read().resolve(short_name)
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.read().clone()
    }

    fn discovery_enabled() -> bool {
        std::env::var("MODEL_DISCOVERY_ENABLED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// Refresh the registry if the TTL has elapsed and discovery is enabled.
    /// Discovery failures are logged and leave the prior snapshot untouched;
    /// this never returns an error to the caller.
    pub async fn maybe_refresh(&self) {
        if !Self::discovery_enabled() {
            return;
        }

        let due = {
            let last = self.last_refresh.read();
            match *last {
                Some(t) => t.elapsed() >= self.ttl,
                None => true,
            }
        };
        if !due {
            return;
        }

        match self.discover().await {
            Ok(fresh) => {
                *self.snapshot.write() = Arc::new(fresh);
                *self.last_refresh.write() = Some(Instant::now());
                tracing::info!("model registry refreshed from provider discovery");
            }
            Err(e) => {
                tracing::warn!(error = %crate::util::mask_secrets(&e.to_string()), "model discovery failed, keeping prior snapshot");
                *self.last_refresh.write() = Some(Instant::now());
            }
        }
    }

    /// Placeholder discovery call. No provider discovery endpoint is wired
    /// up yet; this always fails so `maybe_refresh` falls back to the
    /// baseline snapshot until a concrete discovery source is implemented.
    async fn discover(&self) -> lc_domain::error::Result<RegistrySnapshot> {
        Err(lc_domain::error::Error::Other(
            "model discovery not yet implemented".into(),
        ))
    }
}
