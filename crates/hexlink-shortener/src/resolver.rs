use async_trait::async_trait;
use hexlink_core::{ReadStore, ShortKey, Shortener, ShortenerError, Store, UrlMapping};
use hexlink_deriver::KeyDeriver;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use typed_builder::TypedBuilder;

/// Number of candidate keys tried before giving up on a long URL.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How a free key is claimed once a lookup found it absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain `put` after the lookup. Two different URLs racing to the same
    /// key can overwrite each other.
    Upsert,
    /// `put_if_absent` after the lookup; a lost race is re-read and treated
    /// as either the same mapping or a collision.
    #[default]
    IfAbsent,
}

/// Configures a [`MappingResolver`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct ResolverSettings {
    /// Candidate keys tried per `create`: the URL itself, then the URL with
    /// `1`, `2`, ... appended.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    #[builder(default)]
    pub write_mode: WriteMode,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of trying to write a mapping to a key the lookup saw as free.
enum Claim {
    Created,
    AlreadyMapped,
    Collision,
}

/// Creates and resolves short-key mappings against an injected store.
///
/// The resolver holds no state of its own between calls; clones share the
/// same store and deriver, so one instance can serve any number of
/// concurrent callers.
#[derive(Debug)]
pub struct MappingResolver<S, D> {
    store: Arc<S>,
    deriver: Arc<D>,
    settings: ResolverSettings,
}

impl<S, D> Clone for MappingResolver<S, D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            deriver: Arc::clone(&self.deriver),
            settings: self.settings,
        }
    }
}

impl<S: Store, D: KeyDeriver> MappingResolver<S, D> {
    /// Creates a resolver with the default settings.
    pub fn new(store: S, deriver: D) -> Self {
        Self::with_settings(store, deriver, ResolverSettings::default())
    }

    pub fn with_settings(store: S, deriver: D, settings: ResolverSettings) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(deriver), settings)
    }

    /// Creates a resolver over a store and deriver that are shared elsewhere.
    pub fn from_shared(store: Arc<S>, deriver: Arc<D>, settings: ResolverSettings) -> Self {
        Self {
            store,
            deriver,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> ResolverSettings {
        self.settings
    }

    /// The hashed input for the given attempt: the URL itself first,
    /// then the URL with the decimal attempt counter appended.
    fn candidate_input(long_url: &str, attempt: u32) -> Cow<'_, str> {
        if attempt == 0 {
            Cow::Borrowed(long_url)
        } else {
            Cow::Owned(format!("{long_url}{attempt}"))
        }
    }

    async fn claim(&self, mapping: &UrlMapping) -> Result<Claim, ShortenerError> {
        match self.settings.write_mode {
            WriteMode::Upsert => {
                self.store.put(mapping).await?;
                Ok(Claim::Created)
            }
            WriteMode::IfAbsent => {
                if self.store.put_if_absent(mapping).await? {
                    return Ok(Claim::Created);
                }

                // Another writer took the key between our lookup and write.
                match self.store.get(&mapping.id).await? {
                    Some(existing) if existing.long_url == mapping.long_url => {
                        debug!(key = %mapping.id, "lost write race to an identical mapping");
                        Ok(Claim::AlreadyMapped)
                    }
                    Some(_) => {
                        warn!(key = %mapping.id, "lost write race to a different long URL");
                        Ok(Claim::Collision)
                    }
                    None => {
                        warn!(key = %mapping.id, "key vanished after a refused conditional write");
                        Ok(Claim::Collision)
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<S: Store, D: KeyDeriver> Shortener for MappingResolver<S, D> {
    async fn create(&self, long_url: &str) -> Result<ShortKey, ShortenerError> {
        let max_attempts = self.settings.max_attempts;
        let mut attempts = 0;

        while attempts < max_attempts {
            let input = Self::candidate_input(long_url, attempts);
            let key = self.deriver.derive(&input);
            debug!(key = %key, attempt = attempts, "checking candidate key");

            match self.store.get(&key).await? {
                None => {
                    let mapping = UrlMapping::new(key, long_url);
                    match self.claim(&mapping).await? {
                        Claim::Created => {
                            info!(key = %mapping.id, long_url, "created short key");
                            return Ok(mapping.id);
                        }
                        Claim::AlreadyMapped => {
                            info!(key = %mapping.id, long_url, "short key already exists for this URL");
                            return Ok(mapping.id);
                        }
                        Claim::Collision => {}
                    }
                }
                Some(existing) if existing.long_url == long_url => {
                    info!(key = %key, long_url, "short key already exists for this URL");
                    return Ok(key);
                }
                Some(_) => {
                    warn!(key = %key, long_url, "collision: key maps to a different long URL");
                }
            }

            attempts += 1;
        }

        error!(attempts = max_attempts, long_url, "unable to find a free short key");
        Err(ShortenerError::KeySpaceExhausted {
            attempts: max_attempts,
        })
    }

    async fn resolve(&self, key: &str) -> Result<Option<String>, ShortenerError> {
        let Ok(key) = ShortKey::new(key) else {
            trace!(key, "malformed short key, nothing to look up");
            return Ok(None);
        };

        trace!(key = %key, "resolving short key");
        match self.store.get(&key).await? {
            Some(mapping) => {
                debug!(key = %key, long_url = %mapping.long_url, "resolved short key");
                Ok(Some(mapping.long_url))
            }
            None => {
                debug!(key = %key, "short key not found");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlink_core::store::Result as StoreResult;
    use hexlink_core::StorageError;
    use hexlink_deriver::{DeriverSettings, DigestAlgorithm, DigestDeriver};
    use hexlink_storage::InMemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Wraps an in-memory store and counts every call.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        gets: AtomicUsize,
        puts: AtomicUsize,
        conditional_puts: AtomicUsize,
    }

    impl CountingStore {
        async fn seeded(entries: &[(&str, &str)]) -> Self {
            let store = Self::default();
            for (key, url) in entries {
                seed(&store.inner, ShortKey::new_unchecked(*key), url).await;
            }
            store
        }

        fn gets(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }

        fn writes(&self) -> usize {
            self.puts.load(Ordering::SeqCst) + self.conditional_puts.load(Ordering::SeqCst)
        }
    }

    async fn seed(store: &InMemoryStore, key: ShortKey, url: &str) {
        store.put(&UrlMapping::new(key, url)).await.unwrap();
    }

    #[async_trait]
    impl ReadStore for CountingStore {
        async fn get(&self, key: &ShortKey) -> StoreResult<Option<UrlMapping>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }
    }

    #[async_trait]
    impl Store for CountingStore {
        async fn put(&self, mapping: &UrlMapping) -> StoreResult<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(mapping).await
        }

        async fn put_if_absent(&self, mapping: &UrlMapping) -> StoreResult<bool> {
            self.conditional_puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put_if_absent(mapping).await
        }
    }

    /// Lets a "concurrent writer" land between the lookup and the write.
    #[derive(Default)]
    struct RacingStore {
        inner: InMemoryStore,
        pending: Mutex<HashMap<String, String>>,
    }

    impl RacingStore {
        fn with_pending(key: &str, url: &str) -> Self {
            let store = Self::default();
            store
                .pending
                .lock()
                .unwrap()
                .insert(key.to_string(), url.to_string());
            store
        }
    }

    #[async_trait]
    impl ReadStore for RacingStore {
        async fn get(&self, key: &ShortKey) -> StoreResult<Option<UrlMapping>> {
            self.inner.get(key).await
        }
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn put(&self, mapping: &UrlMapping) -> StoreResult<()> {
            self.inner.put(mapping).await
        }

        async fn put_if_absent(&self, mapping: &UrlMapping) -> StoreResult<bool> {
            let racer = self.pending.lock().unwrap().remove(mapping.id.as_str());
            if let Some(url) = racer {
                self.inner
                    .put(&UrlMapping::new(mapping.id.clone(), url))
                    .await?;
            }
            self.inner.put_if_absent(mapping).await
        }
    }

    /// A store whose backend is down.
    struct DownStore;

    #[async_trait]
    impl ReadStore for DownStore {
        async fn get(&self, _key: &ShortKey) -> StoreResult<Option<UrlMapping>> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl Store for DownStore {
        async fn put(&self, _mapping: &UrlMapping) -> StoreResult<()> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }

        async fn put_if_absent(&self, _mapping: &UrlMapping) -> StoreResult<bool> {
            Err(StorageError::Unavailable("connection refused".to_string()))
        }
    }

    /// Maps inputs to fixed keys so collisions can be laid out by hand.
    struct TableDeriver(HashMap<&'static str, &'static str>);

    impl KeyDeriver for TableDeriver {
        fn derive(&self, input: &str) -> ShortKey {
            ShortKey::new_unchecked(self.0.get(input).copied().unwrap_or("000000"))
        }
    }

    fn resolver(store: CountingStore) -> MappingResolver<CountingStore, DigestDeriver> {
        MappingResolver::new(store, DigestDeriver::md5())
    }

    fn upsert_resolver(store: CountingStore) -> MappingResolver<CountingStore, DigestDeriver> {
        let settings = ResolverSettings::builder()
            .write_mode(WriteMode::Upsert)
            .build();
        MappingResolver::with_settings(store, DigestDeriver::md5(), settings)
    }

    #[tokio::test]
    async fn create_on_empty_store_writes_once() {
        for service in [
            resolver(CountingStore::default()),
            upsert_resolver(CountingStore::default()),
        ] {
            let key = service.create("https://www.example.com").await.unwrap();

            assert_eq!(key.as_str(), "e149be");
            assert_eq!(service.store().writes(), 1);

            let stored = service.store().inner.get(&key).await.unwrap().unwrap();
            assert_eq!(stored, UrlMapping::new(key, "https://www.example.com"));
        }
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let service = resolver(CountingStore::default());

        let first = service.create("https://www.example.com").await.unwrap();
        let second = service.create("https://www.example.com").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.store().writes(), 1);
        assert_eq!(service.store().inner.len(), 1);
    }

    #[tokio::test]
    async fn collision_perturbs_with_attempt_counter() {
        let store = CountingStore::seeded(&[("3f94b0", "https://www.example.com")]).await;
        let service = resolver(store);

        let key = service.create("https://www.example.com/abc").await.unwrap();

        assert_eq!(key.as_str(), "7eebb0");
        assert_eq!(service.store().writes(), 1);
        assert_eq!(service.store().gets(), 2);

        // The colliding mapping is left untouched.
        let original = service
            .store()
            .inner
            .get(&ShortKey::new_unchecked("3f94b0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(original.long_url, "https://www.example.com");
    }

    #[tokio::test]
    async fn repeated_collision_on_same_key_keeps_perturbing() {
        let deriver = TableDeriver(HashMap::from([
            ("https://a.example", "aaaaaa"),
            ("https://a.example1", "aaaaaa"),
            ("https://a.example2", "bbbbbb"),
        ]));
        let store = CountingStore::seeded(&[("aaaaaa", "https://b.example")]).await;
        let service = MappingResolver::new(store, deriver);

        let key = service.create("https://a.example").await.unwrap();

        assert_eq!(key.as_str(), "bbbbbb");
        assert_eq!(service.store().gets(), 3);
        assert_eq!(service.store().writes(), 1);
    }

    #[tokio::test]
    async fn perturbed_key_already_mapped_to_same_url_is_reused() {
        let store = CountingStore::seeded(&[
            ("3f94b0", "https://www.example.com"),
            ("7eebb0", "https://www.example.com/abc"),
        ])
        .await;
        let service = resolver(store);

        let key = service.create("https://www.example.com/abc").await.unwrap();

        assert_eq!(key.as_str(), "7eebb0");
        assert_eq!(service.store().writes(), 0);
    }

    #[tokio::test]
    async fn exhaustion_after_five_collisions() {
        let deriver = DigestDeriver::md5();
        let url = "https://www.example.com/abc";
        let store = CountingStore::default();
        for attempt in 0..DEFAULT_MAX_ATTEMPTS {
            let input = if attempt == 0 {
                url.to_string()
            } else {
                format!("{url}{attempt}")
            };
            seed(&store.inner, deriver.derive(&input), "https://somewhere.else").await;
        }
        let service = resolver(store);

        let err = service.create(url).await.unwrap_err();

        assert!(matches!(
            err,
            ShortenerError::KeySpaceExhausted { attempts: 5 }
        ));
        assert_eq!(service.store().writes(), 0);
        assert_eq!(service.store().gets(), 5);
    }

    #[tokio::test]
    async fn max_attempts_is_configurable() {
        let store = CountingStore::seeded(&[("3f94b0", "https://www.example.com")]).await;
        let settings = ResolverSettings::builder().max_attempts(1).build();
        let service = MappingResolver::with_settings(store, DigestDeriver::md5(), settings);

        let err = service.create("https://www.example.com/abc").await.unwrap_err();
        assert!(matches!(
            err,
            ShortenerError::KeySpaceExhausted { attempts: 1 }
        ));

        let service = MappingResolver::with_settings(
            CountingStore::default(),
            DigestDeriver::md5(),
            ResolverSettings::builder().max_attempts(0).build(),
        );
        let err = service.create("https://www.example.com").await.unwrap_err();
        assert!(matches!(
            err,
            ShortenerError::KeySpaceExhausted { attempts: 0 }
        ));
        assert_eq!(service.store().gets(), 0);
    }

    #[tokio::test]
    async fn lost_race_to_same_url_returns_key() {
        let store = RacingStore::with_pending("e149be", "https://www.example.com");
        let service = MappingResolver::new(store, DigestDeriver::md5());

        let key = service.create("https://www.example.com").await.unwrap();
        assert_eq!(key.as_str(), "e149be");
    }

    #[tokio::test]
    async fn lost_race_to_other_url_moves_to_next_candidate() {
        let store = RacingStore::with_pending("3f94b0", "https://www.example.com");
        let service = MappingResolver::new(store, DigestDeriver::md5());

        let key = service.create("https://www.example.com/abc").await.unwrap();
        assert_eq!(key.as_str(), "7eebb0");

        let winner = service
            .store()
            .get(&ShortKey::new_unchecked("3f94b0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.long_url, "https://www.example.com");
    }

    #[tokio::test]
    async fn resolve_returns_stored_url() {
        let service = resolver(CountingStore::default());
        service.create("https://www.example.com").await.unwrap();

        let url = service.resolve("e149be").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://www.example.com"));
    }

    #[tokio::test]
    async fn resolve_unknown_key_is_absent() {
        let service = resolver(CountingStore::default());

        assert!(service.resolve("abcdef").await.unwrap().is_none());
        assert_eq!(service.store().gets(), 1);
        assert_eq!(service.store().writes(), 0);
    }

    #[tokio::test]
    async fn resolve_malformed_key_is_absent() {
        let service = resolver(CountingStore::default());

        assert!(service.resolve("doesNotExist").await.unwrap().is_none());
        assert_eq!(service.store().writes(), 0);
    }

    #[tokio::test]
    async fn widest_sha256_key_round_trips() {
        let settings = DeriverSettings::builder()
            .algorithm(DigestAlgorithm::Sha256)
            .key_bytes(DigestAlgorithm::Sha256.output_len())
            .build();
        let deriver = DigestDeriver::new(settings).unwrap();
        let service = MappingResolver::new(CountingStore::default(), deriver);

        let key = service.create("https://www.example.com").await.unwrap();
        assert_eq!(key.as_str().len(), 64);

        let resolved = service.resolve(key.as_str()).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("https://www.example.com"));

        let again = service.create("https://www.example.com").await.unwrap();
        assert_eq!(again, key);
        assert_eq!(service.store().writes(), 1);
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let service = MappingResolver::new(DownStore, DigestDeriver::md5());

        let err = service.create("https://www.example.com").await.unwrap_err();
        assert!(matches!(
            err,
            ShortenerError::StoreUnavailable(StorageError::Unavailable(_))
        ));

        let err = service.resolve("e149be").await.unwrap_err();
        assert!(matches!(err, ShortenerError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn clones_share_the_store() {
        let service = resolver(CountingStore::default());
        let clone = service.clone();

        let key = clone.create("https://www.example.com").await.unwrap();
        let url = service.resolve(key.as_str()).await.unwrap();

        assert_eq!(url.as_deref(), Some("https://www.example.com"));
    }

    #[tokio::test]
    async fn concurrent_creates_converge_on_one_key() {
        let service = resolver(CountingStore::default());
        let mut handles = vec![];

        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.create("https://www.example.com").await.unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_str(), "e149be");
        }
        assert_eq!(service.store().inner.len(), 1);
    }
}
