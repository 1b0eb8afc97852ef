use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use tot_llm::{CancelToken, Gateway};

use crate::entry::{CacheEntry, CachePayload, dot, l2_normalize};

/// Per-namespace cache statistics, grounded in the teacher's
/// `IndexCacheStats` (`aigent-memory::index`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct Namespace {
    entries: VecDeque<CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Semantic Cache (C2): a process-wide, vector-indexed key→value store with
/// cosine-similarity lookup, threshold-gated hits, and FIFO eviction per
/// namespace (`spec.md` §4.2).
///
/// Reads take a per-namespace read lock (concurrent lookups are safe);
/// writes take the same namespace's write lock (insertions are serialized
/// per namespace, not globally) — the `tokio::sync::RwLock` family the
/// teacher already depends on via `tokio`, rather than introducing a new
/// locking crate.
pub struct SemanticCache {
    gateway: Gateway,
    embed_model_tag: String,
    similarity_threshold: f32,
    max_entries: usize,
    namespaces: RwLock<HashMap<String, Arc<RwLock<Namespace>>>>,
}

impl SemanticCache {
    pub fn new(
        gateway: Gateway,
        embed_model_tag: impl Into<String>,
        similarity_threshold: f64,
        max_entries: usize,
    ) -> Self {
        Self {
            gateway,
            embed_model_tag: embed_model_tag.into(),
            similarity_threshold: similarity_threshold as f32,
            max_entries,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    async fn namespace_handle(&self, namespace: &str) -> Arc<RwLock<Namespace>> {
        if let Some(existing) = self.namespaces.read().await.get(namespace) {
            return existing.clone();
        }
        let mut guard = self.namespaces.write().await;
        guard.entry(namespace.to_string()).or_default().clone()
    }

    /// Embed `query_text`, search `namespace` for the nearest entry, and
    /// return its payload and similarity only if it clears
    /// `similarity_threshold`. Embedding failures (or an absent namespace)
    /// are *not* fatal — they fall through to `None`, and the caller falls
    /// back to direct computation (`spec.md` §4.2).
    #[instrument(skip(self, cancel), fields(namespace))]
    pub async fn lookup(
        &self,
        namespace: &str,
        query_text: &str,
        cancel: &CancelToken,
    ) -> Option<(CachePayload, f64)> {
        let embedding = match self.gateway.embed(&[query_text.to_string()], &self.embed_model_tag, cancel).await {
            Ok(mut vectors) => l2_normalize(vectors.pop()?),
            Err(err) => {
                debug!(error = %err, "cache lookup embedding failed, treating as miss");
                return None;
            }
        };

        let handle = {
            let guard = self.namespaces.read().await;
            guard.get(namespace)?.clone()
        };

        let mut ns = handle.write().await;
        let best = ns
            .entries
            .iter()
            .map(|entry| (dot(&entry.vector, &embedding), entry))
            .max_by(|(a, _), (b, _)| a.total_cmp(b));

        match best {
            Some((similarity, entry)) if similarity >= self.similarity_threshold => {
                ns.hits += 1;
                Some((entry.payload.clone(), similarity as f64))
            }
            _ => {
                ns.misses += 1;
                None
            }
        }
    }

    /// Embed `key_text`, insert `payload` into `namespace`'s index, and
    /// evict the oldest entry if this insertion pushes the namespace over
    /// `max_entries` (FIFO, `spec.md` §4.2/§8). A no-op if embedding fails.
    #[instrument(skip(self, payload, cancel), fields(namespace))]
    pub async fn insert(
        &self,
        namespace: &str,
        key_text: &str,
        payload: CachePayload,
        cancel: &CancelToken,
    ) {
        let embedding = match self.gateway.embed(&[key_text.to_string()], &self.embed_model_tag, cancel).await {
            Ok(mut vectors) => match vectors.pop() {
                Some(vector) => l2_normalize(vector),
                None => return,
            },
            Err(err) => {
                debug!(error = %err, "cache insert embedding failed, skipping insert");
                return;
            }
        };

        let handle = self.namespace_handle(namespace).await;
        let mut ns = handle.write().await;
        ns.entries.push_back(CacheEntry { vector: embedding, namespace: namespace.to_string(), payload });
        while ns.entries.len() > self.max_entries {
            ns.entries.pop_front();
        }
    }

    pub async fn stats(&self, namespace: &str) -> CacheStats {
        let handle = {
            let guard = self.namespaces.read().await;
            match guard.get(namespace) {
                Some(handle) => handle.clone(),
                None => return CacheStats::default(),
            }
        };
        let ns = handle.read().await;
        CacheStats { len: ns.entries.len(), hits: ns.hits, misses: ns.misses }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc as StdArc;
    use tot_llm::MockBackend;

    fn gateway(dim: usize) -> (Gateway, StdArc<MockBackend>) {
        let backend = StdArc::new(MockBackend::new(dim));
        (Gateway::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn insert_then_lookup_same_key_hits() {
        let (gateway, _backend) = gateway(8);
        let cache = SemanticCache::new(gateway, "mock-embed", 0.95, 10);
        let cancel = CancelToken::new();

        cache.insert("propose", "identical key", json!(["a", "b"]), &cancel).await;
        let result = cache.lookup("propose", "identical key", &cancel).await;

        let (payload, similarity) = result.expect("expected cache hit");
        assert_eq!(payload, json!(["a", "b"]));
        assert!(similarity >= 0.95);
    }

    #[tokio::test]
    async fn lookup_on_empty_namespace_misses() {
        let (gateway, _backend) = gateway(8);
        let cache = SemanticCache::new(gateway, "mock-embed", 0.95, 10);
        let cancel = CancelToken::new();

        assert!(cache.lookup("propose", "never inserted", &cancel).await.is_none());
    }

    #[tokio::test]
    async fn unrelated_query_misses_below_threshold() {
        let (gateway, _backend) = gateway(8);
        let cache = SemanticCache::new(gateway, "mock-embed", 0.95, 10);
        let cancel = CancelToken::new();

        cache.insert("propose", "make 24 from 4 6 7 8", json!(["x"]), &cancel).await;
        let result = cache.lookup("propose", "completely different unrelated text", &cancel).await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn fifo_eviction_drops_oldest_entry() {
        let (gateway, _backend) = gateway(8);
        let cache = SemanticCache::new(gateway, "mock-embed", 0.9, 2);
        let cancel = CancelToken::new();

        cache.insert("propose", "first", json!(1), &cancel).await;
        cache.insert("propose", "second", json!(2), &cancel).await;
        cache.insert("propose", "third", json!(3), &cancel).await;

        let stats = cache.stats("propose").await;
        assert_eq!(stats.len, 2);
        assert!(cache.lookup("propose", "first", &cancel).await.is_none());
        assert!(cache.lookup("propose", "third", &cancel).await.is_some());
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let (gateway, _backend) = gateway(8);
        let cache = SemanticCache::new(gateway, "mock-embed", 0.95, 10);
        let cancel = CancelToken::new();

        cache.insert("propose", "shared text", json!("propose-value"), &cancel).await;
        assert!(cache.lookup("evaluate", "shared text", &cancel).await.is_none());
    }

    #[tokio::test]
    async fn stats_count_hits_and_misses() {
        let (gateway, _backend) = gateway(8);
        let cache = SemanticCache::new(gateway, "mock-embed", 0.95, 10);
        let cancel = CancelToken::new();

        cache.insert("propose", "key", json!(1), &cancel).await;
        let _ = cache.lookup("propose", "key", &cancel).await;
        let _ = cache.lookup("propose", "other", &cancel).await;

        let stats = cache.stats("propose").await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
