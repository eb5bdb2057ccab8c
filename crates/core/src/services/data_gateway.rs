use chrono::Utc;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::api::ApiResponse;
use crate::models::cache::{ttl_for, ResponseCache};
use crate::models::settings::Settings;
use crate::providers::traits::UpstreamSource;
use crate::storage::keys;
use crate::storage::store::Store;

/// Build the normalized cache key for a request: endpoint plus its params
/// sorted by name, so parameter order at call sites never splits entries.
pub fn cache_key(module: &str, action: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort();
    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{module}/{action}?{}", query.join("&"))
}

/// The response cache behind a lock, paired with the store that mirrors it.
///
/// Every write persists the entire mapping synchronously; the entry count
/// is capped, so the blob stays small. Reads may drop expired or failed
/// entries in memory; those removals ride along with the next write.
/// Overlapping async writers interleave last-write-wins, which is safe:
/// entries are idempotent re-fetches of the same key.
#[derive(Clone)]
pub struct SharedCache {
    inner: Arc<Mutex<ResponseCache>>,
    store: Store,
}

impl SharedCache {
    pub fn new(cache: ResponseCache, store: Store) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResponseCache> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn read(&self, key: &str) -> Option<ApiResponse> {
        self.lock().read_at(key, Utc::now())
    }

    pub fn write(&self, key: &str, payload: ApiResponse, ttl: Duration) {
        let mut cache = self.lock();
        cache.write_at(key, payload, ttl, Utc::now());
        self.store.save(keys::RESPONSE_CACHE, &*cache);
    }

    /// Drop all entries under a key prefix and persist the shrunken map.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut cache = self.lock();
        let removed = cache.invalidate_prefix(prefix);
        if removed > 0 {
            self.store.save(keys::RESPONSE_CACHE, &*cache);
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// The single entry point for every data-dependent view.
///
/// Composes cache lookup, the ordered direct-upstream chain, backend
/// fallback and cache population. `fetch` resolves to a payload in all
/// circumstances; errors never cross this boundary. Callers check the
/// payload's `success` discriminant.
pub struct DataGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
    cache: SharedCache,
    sources: Vec<Box<dyn UpstreamSource>>,
}

impl DataGateway {
    pub fn new(
        settings: &Settings,
        cache: SharedCache,
        sources: Vec<Box<dyn UpstreamSource>>,
    ) -> Result<Self, CoreError> {
        let client = Client::builder()
            .build()
            .map_err(|e| CoreError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.api_base.clone(),
            timeout: Duration::from_secs(settings.backend_timeout_secs),
            cache,
            sources,
        })
    }

    /// Handle on the shared cache, for call sites that invalidate
    /// explicitly (e.g. after a sector is newly confirmed empty).
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Fetch `(module, action)` with the given query params.
    ///
    /// Order: cache (unless `force`), then each registered upstream source
    /// that claims the pair, then the backend. Successful payloads are
    /// written through; `success: false` payloads are returned to the
    /// caller but never cached.
    pub async fn fetch(
        &self,
        module: &str,
        action: &str,
        params: &[(&str, &str)],
        force: bool,
    ) -> ApiResponse {
        let key = cache_key(module, action, params);

        if !force {
            if let Some(hit) = self.cache.read(&key) {
                debug!(key = %key, "cache hit");
                return hit;
            }
        }

        for source in self.sources.iter().filter(|s| s.handles(module, action)) {
            match source.fetch(params).await {
                Ok(payload) if payload.success => {
                    self.cache.write(&key, payload.clone(), ttl_for(module, action));
                    return payload;
                }
                Ok(_) => {
                    warn!(source = source.name(), key = %key, "source returned failure payload; falling back");
                }
                Err(e) => {
                    warn!(source = source.name(), key = %key, error = %e, "source failed; falling back");
                }
            }
        }

        let payload = self.backend_fetch(module, action, params).await;
        if payload.success {
            self.cache.write(&key, payload.clone(), ttl_for(module, action));
        }
        payload
    }

    /// Issue the backend request, normalizing every failure mode into a
    /// `{success: false, message}` payload.
    async fn backend_fetch(&self, module: &str, action: &str, params: &[(&str, &str)]) -> ApiResponse {
        let mut query: Vec<(&str, &str)> = vec![("module", module), ("action", action)];
        query.extend_from_slice(params);

        let result = self
            .client
            .get(&self.base_url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return ApiResponse::failure("request timed out");
            }
            Err(e) => {
                return ApiResponse::failure(format!("network error: {e}"));
            }
        };

        if !resp.status().is_success() {
            return ApiResponse::failure(format!("backend returned HTTP {}", resp.status()));
        }

        match resp.json::<ApiResponse>().await {
            Ok(payload) => payload,
            Err(e) => ApiResponse::failure(format!("invalid backend response: {e}")),
        }
    }
}
