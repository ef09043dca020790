//! Codec registry and provider
//!
//! [`CodecRegistry`] is the cache: one codec per [`CodecKey`], built on first
//! use and never evicted. [`CodecProvider`] is the handle codecs and callers
//! resolve through; it pairs a registry with the reader options used for
//! one-shot decoding.
//!
//! # Concurrency
//!
//! - Lookups go through a sharded `DashMap` and never take a global lock
//! - Construction runs outside any map lock
//! - Insertion is insert-if-absent: when two threads build the same key, the
//!   first stored codec wins and the other is discarded
//!
//! # Recursive types
//!
//! While a key is under construction on the current thread, a nested request
//! for the same key receives a [`LazyCodec`] that looks the finished codec up
//! on each call.

use crate::codec::{Codable, Codec};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docwire_core::{CodecError, CodecResult};
use docwire_wire::{ReaderOptions, TaggedReader, TaggedWriter, WireType};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::{FxHashSet, FxHasher};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use tracing::{debug, warn};

type FxBuild = BuildHasherDefault<FxHasher>;
type StoredCodec = Arc<dyn Any + Send + Sync>;

// ============================================================================
// CodecKey
// ============================================================================

/// Identity of a requested codec shape: base type plus optional type argument
///
/// `Vec<i32>` and `Vec<String>` share a base (`Vec<()>`) but differ in the
/// argument. Equality and hashing ignore the display name.
#[derive(Clone, Copy)]
pub struct CodecKey {
    base: TypeId,
    argument: Option<TypeId>,
    name: &'static str,
}

impl CodecKey {
    /// Key for a non-generic type
    pub fn of<T: 'static>() -> Self {
        CodecKey {
            base: TypeId::of::<T>(),
            argument: None,
            name: std::any::type_name::<T>(),
        }
    }

    /// Key for a generic container.
    ///
    /// `Raw` is the container instantiated at `()`, `Arg` its element type and
    /// `name` the full type name for diagnostics.
    pub fn generic<Raw: 'static, Arg: 'static>(name: &'static str) -> Self {
        CodecKey {
            base: TypeId::of::<Raw>(),
            argument: Some(TypeId::of::<Arg>()),
            name,
        }
    }

    /// Type name for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if this key carries a type argument
    pub fn is_generic(&self) -> bool {
        self.argument.is_some()
    }
}

impl PartialEq for CodecKey {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.argument == other.argument
    }
}

impl Eq for CodecKey {}

impl Hash for CodecKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.argument.hash(state);
    }
}

impl fmt::Debug for CodecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodecKey({})", self.name)
    }
}

impl fmt::Display for CodecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// CodecRegistry
// ============================================================================

static SHARED: Lazy<Arc<CodecRegistry>> = Lazy::new(|| Arc::new(CodecRegistry::new()));

/// Process-lifetime codec cache
pub struct CodecRegistry {
    codecs: DashMap<CodecKey, StoredCodec, FxBuild>,
    /// Keys under construction, per thread
    building: Mutex<FxHashSet<(ThreadId, CodecKey)>>,
}

impl CodecRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        CodecRegistry {
            codecs: DashMap::with_hasher(FxBuild::default()),
            building: Mutex::new(FxHashSet::default()),
        }
    }

    /// The process-wide default registry
    pub fn shared() -> Arc<CodecRegistry> {
        Arc::clone(&SHARED)
    }

    /// Number of cached codecs
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Check if no codec has been cached yet
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Check if a codec is cached for `T`
    pub fn contains<T: Codable>(&self) -> bool {
        self.codecs.contains_key(&T::codec_key())
    }

    /// Install `codec` for `T`, replacing any cached codec
    pub fn register<T: Codable>(&self, codec: Arc<dyn Codec<T>>) {
        let key = T::codec_key();
        let stored: StoredCodec = Arc::new(codec);
        if self.codecs.insert(key, stored).is_some() {
            debug!(key = %key, "replaced cached codec with registered codec");
        } else {
            debug!(key = %key, "registered codec");
        }
    }

    fn lookup<T: 'static>(&self, key: &CodecKey) -> CodecResult<Option<Arc<dyn Codec<T>>>> {
        match self.codecs.get(key) {
            Some(stored) => downcast::<T>(key, stored.value()).map(Some),
            None => Ok(None),
        }
    }

    fn insert_if_absent<T: 'static>(
        &self,
        key: CodecKey,
        codec: Arc<dyn Codec<T>>,
    ) -> CodecResult<Arc<dyn Codec<T>>> {
        match self.codecs.entry(key) {
            Entry::Occupied(existing) => {
                warn!(key = %key, "discarding codec built concurrently for cached key");
                downcast::<T>(&key, existing.get())
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Arc::clone(&codec)));
                debug!(key = %key, "constructed and cached codec");
                Ok(codec)
            }
        }
    }

    /// Mark `key` as under construction on `thread`.
    ///
    /// Returns `false` if it already was.
    fn begin(&self, thread: ThreadId, key: CodecKey) -> bool {
        self.building.lock().insert((thread, key))
    }

    fn finish(&self, thread: ThreadId, key: CodecKey) {
        self.building.lock().remove(&(thread, key));
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("cached", &self.codecs.len())
            .finish()
    }
}

fn downcast<T: 'static>(key: &CodecKey, stored: &StoredCodec) -> CodecResult<Arc<dyn Codec<T>>> {
    stored
        .downcast_ref::<Arc<dyn Codec<T>>>()
        .cloned()
        .ok_or_else(|| {
            CodecError::resolution(
                key.name(),
                format!(
                    "cached codec does not produce {}",
                    std::any::type_name::<T>()
                ),
            )
        })
}

/// Clears the in-progress mark even when construction fails
struct BuildGuard<'a> {
    registry: &'a CodecRegistry,
    thread: ThreadId,
    key: CodecKey,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.registry.finish(self.thread, self.key);
    }
}

// ============================================================================
// CodecProvider
// ============================================================================

/// Resolves codecs by type, building and caching them on first use
#[derive(Clone, Debug)]
pub struct CodecProvider {
    registry: Arc<CodecRegistry>,
    options: ReaderOptions,
}

impl CodecProvider {
    /// Provider over a fresh, private registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(CodecRegistry::new()))
    }

    /// Provider over the process-wide registry
    pub fn shared() -> Self {
        Self::with_registry(CodecRegistry::shared())
    }

    /// Provider over an existing registry
    pub fn with_registry(registry: Arc<CodecRegistry>) -> Self {
        CodecProvider {
            registry,
            options: ReaderOptions::default(),
        }
    }

    /// Set the reader options used by one-shot decoding
    pub fn with_reader_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    /// The backing registry
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Reader options for one-shot decoding
    pub fn reader_options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Resolve the codec for `T`.
    ///
    /// Returns the cached codec if present; otherwise builds it (resolving
    /// element codecs recursively), caches it and returns the cached entry.
    pub fn get<T: Codable>(&self) -> CodecResult<Arc<dyn Codec<T>>> {
        let key = T::codec_key();
        if let Some(codec) = self.registry.lookup::<T>(&key)? {
            return Ok(codec);
        }

        let thread = std::thread::current().id();
        if !self.registry.begin(thread, key) {
            debug!(key = %key, "recursive codec request, deferring resolution");
            return Ok(Arc::new(LazyCodec::<T>::new(&self.registry, key)));
        }

        let built = {
            let _guard = BuildGuard {
                registry: &self.registry,
                thread,
                key,
            };
            T::build_codec(self)
        };
        self.registry.insert_if_absent(key, built?)
    }
}

impl Default for CodecProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LazyCodec
// ============================================================================

/// Stand-in for a codec that was still under construction when requested
pub struct LazyCodec<T> {
    registry: Weak<CodecRegistry>,
    key: CodecKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> LazyCodec<T> {
    fn new(registry: &Arc<CodecRegistry>, key: CodecKey) -> Self {
        LazyCodec {
            registry: Arc::downgrade(registry),
            key,
            _marker: PhantomData,
        }
    }

    fn resolve(&self) -> CodecResult<Arc<dyn Codec<T>>> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| CodecError::resolution(self.key.name(), "registry was dropped"))?;
        registry
            .lookup::<T>(&self.key)?
            .ok_or_else(|| CodecError::resolution(self.key.name(), "codec construction did not complete"))
    }
}

impl<T: 'static> Codec<T> for LazyCodec<T> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<T> {
        self.resolve()?.decode(reader)
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &T) -> CodecResult<()> {
        self.resolve()?.encode(writer, value)
    }

    fn supported_types(&self) -> &[WireType] {
        &[]
    }
}
