//! Handler registry.
//!
//! A [`HandlerTable`] maps [`TypeKey`]s to [`Handler`]s. Lookups first try the exact
//! key, then the fallback table computed when the table was built: for every key with
//! registered ancestors ([`Overrides::inherit`]), the handler of the closest ancestor
//! that has one. A value whose key resolves to nothing is an error. There is no
//! catch-all handler.
//!
//! Tables are built by a [`HandlerRegistry`], which merges caller [`Overrides`] over
//! the default handlers and memoizes the result per distinct override set. Lookups of
//! built tables take a shared read lock. Builds of one override set are serialized, so
//! concurrent first use builds exactly one table. Writers hold an `Arc<HandlerTable>`
//! and never touch the locks.
//!
//! ## Examples
//!
//! ```rust
//! use serde_transit::{HandlerRegistry, Overrides, TypeKey, Value};
//! use std::sync::Arc;
//!
//! let registry = HandlerRegistry::new();
//! let overrides = Overrides::new()
//!     .handler(TypeKey::from_static("shape"), Arc::new(serde_transit::handler::StringHandler))
//!     .inherit(TypeKey::from_static("circle"), TypeKey::from_static("shape"));
//!
//! let table = registry.table(&overrides).unwrap();
//! let again = registry.table(&overrides).unwrap();
//! assert!(Arc::ptr_eq(&table, &again));
//!
//! let ancestors: Vec<_> = table.ancestors(&TypeKey::from_static("circle")).collect();
//! assert_eq!(ancestors, vec![&TypeKey::from_static("shape")]);
//! ```

use crate::handler::{default_registrations, Handler, HandlerAware};
use crate::{Error, Result, TypeKey, Value};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// A handler as registered under one key.
#[derive(Clone)]
pub struct Registration {
    handler: Arc<dyn Handler>,
    aware: Option<Arc<dyn HandlerAware>>,
}

impl Registration {
    pub fn plain<H: Handler + 'static>(handler: Arc<H>) -> Self {
        Registration {
            handler,
            aware: None,
        }
    }

    /// A handler that each table binds to itself while it is built.
    pub fn aware<H: HandlerAware + 'static>(handler: Arc<H>) -> Self {
        Registration {
            handler: handler.clone(),
            aware: Some(handler as Arc<dyn HandlerAware>),
        }
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.handler) as *const () as usize
    }
}

/// Caller-supplied handlers and type hierarchy, merged over the defaults.
///
/// Two `Overrides` are the same override set when they register the same handler
/// instances (by `Arc` identity) under the same keys and declare the same parents.
///
/// # Examples
///
/// ```rust
/// use serde_transit::{handler::IntegerHandler, Overrides, TypeKey};
/// use std::sync::Arc;
///
/// let overrides = Overrides::new()
///     .handler(TypeKey::from_static("counter"), Arc::new(IntegerHandler))
///     .inherit(TypeKey::from_static("tally"), TypeKey::from_static("counter"));
/// assert_eq!(overrides.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Overrides {
    handlers: IndexMap<TypeKey, Registration>,
    parents: IndexMap<TypeKey, TypeKey>,
}

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `key`, replacing any earlier registration.
    #[must_use]
    pub fn handler<H: Handler + 'static>(mut self, key: TypeKey, handler: Arc<H>) -> Self {
        self.handlers.insert(key, Registration::plain(handler));
        self
    }

    /// Registers a handler that needs the finished table.
    #[must_use]
    pub fn aware_handler<H: HandlerAware + 'static>(mut self, key: TypeKey, handler: Arc<H>) -> Self {
        self.handlers.insert(key, Registration::aware(handler));
        self
    }

    /// Declares `parent` as the next type to try when `child` has no handler.
    #[must_use]
    pub fn inherit(mut self, child: TypeKey, parent: TypeKey) -> Self {
        self.parents.insert(child, parent);
        self
    }

    /// Number of handler registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.parents.is_empty()
    }

    fn memo_key(&self) -> OverrideKey {
        let mut handlers: Vec<_> = self
            .handlers
            .iter()
            .map(|(key, reg)| (key.clone(), reg.identity()))
            .collect();
        handlers.sort();
        let mut parents: Vec<_> = self
            .parents
            .iter()
            .map(|(child, parent)| (child.clone(), parent.clone()))
            .collect();
        parents.sort();
        OverrideKey { handlers, parents }
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("parents", &self.parents)
            .finish()
    }
}

// Pointer identities stay valid because each memo entry keeps its `Overrides`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OverrideKey {
    handlers: Vec<(TypeKey, usize)>,
    parents: Vec<(TypeKey, TypeKey)>,
}

/// An immutable mapping from type keys to handlers.
pub struct HandlerTable {
    handlers: HashMap<TypeKey, Arc<dyn Handler>>,
    parents: HashMap<TypeKey, TypeKey>,
    fallbacks: HashMap<TypeKey, Arc<dyn Handler>>,
}

impl HandlerTable {
    fn assemble(
        registrations: IndexMap<TypeKey, Registration>,
        parents: HashMap<TypeKey, TypeKey>,
    ) -> Result<Arc<HandlerTable>> {
        check_acyclic(&parents)?;

        // Aware registrations are bound to this table; the registered instance itself
        // is never stored, so it can be shared between override sets.
        let table = Arc::new_cyclic(|this: &Weak<HandlerTable>| {
            let handlers: HashMap<TypeKey, Arc<dyn Handler>> = registrations
                .iter()
                .map(|(key, reg)| {
                    let handler = match &reg.aware {
                        Some(aware) => aware.bind(Weak::clone(this)),
                        None => Arc::clone(&reg.handler),
                    };
                    (key.clone(), handler)
                })
                .collect();

            let mut fallbacks = HashMap::new();
            for child in parents.keys() {
                if handlers.contains_key(child) {
                    continue;
                }
                let found = std::iter::successors(parents.get(child), |key| parents.get(*key))
                    .find_map(|ancestor| handlers.get(ancestor));
                if let Some(handler) = found {
                    fallbacks.insert(child.clone(), Arc::clone(handler));
                }
            }

            HandlerTable {
                handlers,
                parents,
                fallbacks,
            }
        });
        Ok(table)
    }

    /// Resolves the handler for `value` by its type key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHandler`] when neither the key nor any ancestor has a handler.
    pub fn resolve(&self, value: &Value) -> Result<&dyn Handler> {
        self.resolve_key(value.type_key())
    }

    /// Resolves the handler registered for `key` or its closest registered ancestor.
    pub fn resolve_key(&self, key: &TypeKey) -> Result<&dyn Handler> {
        self.handlers
            .get(key)
            .or_else(|| self.fallbacks.get(key))
            .map(|handler| &**handler)
            .ok_or_else(|| Error::no_handler(key.as_str()))
    }

    /// Iterates over the ancestors of `key`, closest first.
    pub fn ancestors<'a>(&'a self, key: &TypeKey) -> impl Iterator<Item = &'a TypeKey> + 'a {
        std::iter::successors(self.parents.get(key), move |k| self.parents.get(*k))
    }

    /// Whether a handler is registered for exactly `key`.
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.handlers.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("HandlerTable")
            .field("handlers", &keys)
            .field("parents", &self.parents)
            .finish()
    }
}

fn check_acyclic(parents: &HashMap<TypeKey, TypeKey>) -> Result<()> {
    for start in parents.keys() {
        let mut seen = HashSet::from([start]);
        let mut current = start;
        while let Some(parent) = parents.get(current) {
            if !seen.insert(parent) {
                return Err(Error::cyclic_hierarchy(parent.as_str()));
            }
            current = parent;
        }
    }
    Ok(())
}

/// Builds and memoizes handler tables, one per distinct override set.
///
/// # Examples
///
/// ```rust
/// use serde_transit::{HandlerRegistry, Value};
///
/// let table = HandlerRegistry::global().default_table().unwrap();
/// let handler = table.resolve(&Value::from(1)).unwrap();
/// assert_eq!(handler.tag(&Value::from(1)), Some("i"));
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    tables: RwLock<HashMap<OverrideKey, Arc<Slot>>>,
    builds: AtomicUsize,
}

// One memo entry. `overrides` keeps the registered handlers alive for as long as their
// pointers are part of the key. `build` serializes builds of this set only.
struct Slot {
    table: OnceLock<Arc<HandlerTable>>,
    build: Mutex<()>,
    overrides: Overrides,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the crate's convenience functions.
    pub fn global() -> &'static HandlerRegistry {
        static GLOBAL: OnceLock<HandlerRegistry> = OnceLock::new();
        GLOBAL.get_or_init(HandlerRegistry::new)
    }

    /// Returns the table for `overrides`, building it on first use.
    ///
    /// Built tables are served under a shared read lock. A build holds a lock private
    /// to its override set, so it never delays lookups or builds of other sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclicHierarchy`] if the declared parents form a cycle.
    pub fn table(&self, overrides: &Overrides) -> Result<Arc<HandlerTable>> {
        let key = overrides.memo_key();
        if let Some(table) = self.tables.read().get(&key).and_then(|slot| slot.table.get()) {
            tracing::trace!(overrides = overrides.len(), "reusing memoized handler table");
            return Ok(Arc::clone(table));
        }

        let slot = Arc::clone(self.tables.write().entry(key).or_insert_with(|| {
            Arc::new(Slot {
                table: OnceLock::new(),
                build: Mutex::new(()),
                overrides: overrides.clone(),
            })
        }));

        let _building = slot.build.lock();
        if let Some(table) = slot.table.get() {
            tracing::trace!(overrides = overrides.len(), "reusing memoized handler table");
            return Ok(Arc::clone(table));
        }

        let overrides = &slot.overrides;
        tracing::debug!(
            overrides = overrides.handlers.len(),
            parents = overrides.parents.len(),
            "building handler table"
        );
        let mut registrations: IndexMap<TypeKey, Registration> =
            default_registrations().into_iter().collect();
        for (key, registration) in &overrides.handlers {
            registrations.insert(key.clone(), registration.clone());
        }
        let parents = overrides
            .parents
            .iter()
            .map(|(child, parent)| (child.clone(), parent.clone()))
            .collect();

        let table = HandlerTable::assemble(registrations, parents)?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::clone(slot.table.get_or_init(|| table)))
    }

    /// The table of default handlers.
    pub fn default_table(&self) -> Result<Arc<HandlerTable>> {
        self.table(&Overrides::default())
    }

    /// How many tables this registry has built.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tables", &self.tables.read().len())
            .field("builds", &self.build_count())
            .finish()
    }
}
