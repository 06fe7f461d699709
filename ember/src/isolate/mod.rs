//! Liveness tracking for logic-context instances ("isolates").
//!
//! Work that outlives a request (decodes, platform replies) captures a
//! [`Continuation`] instead of a direct reference into logic state. The
//! continuation resolves its owner through the [`IsolateRegistry`] by id when
//! it is finally invoked, so a torn-down isolate simply makes it a no-op.

pub mod natives;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::trace;
use parking_lot::Mutex;

use crate::framework::util::HashMap;
use crate::painting::image::ImageDecoder;
use crate::runtime::TaskRunners;
use crate::window::WindowScope;

pub use natives::{NativeClosure, NativeTable, NativeValue};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IsolateId(u64);

impl IsolateId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IsolateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "isolate#{}", self.0)
    }
}

pub type ScopeFn<'a> = Box<dyn FnOnce(&mut WindowScope<'_>) + 'a>;

/// Whatever currently hosts a running isolate. `enter` runs `f` with a scope
/// bound to isolate `id` and returns `false` when that isolate is not (or no
/// longer) hosted here.
pub trait IsolateHost: Send + Sync {
    fn enter(&self, id: IsolateId, f: ScopeFn<'_>) -> bool;
}

pub struct IsolateRegistry {
    next: AtomicU64,
    hosts: Mutex<HashMap<IsolateId, Weak<dyn IsolateHost>>>,
}

impl Default for IsolateRegistry {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
            hosts: Mutex::new(HashMap::default()),
        }
    }
}

impl IsolateRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, host: Weak<dyn IsolateHost>) -> IsolateId {
        let id = IsolateId(self.next.fetch_add(1, Ordering::Relaxed));
        self.hosts.lock().insert(id, host);
        id
    }

    pub fn unregister(&self, id: IsolateId) -> bool {
        self.hosts.lock().remove(&id).is_some()
    }

    pub fn lookup(&self, id: IsolateId) -> Option<Arc<dyn IsolateHost>> {
        self.hosts.lock().get(&id).and_then(Weak::upgrade)
    }

    pub fn is_alive(&self, id: IsolateId) -> bool {
        self.lookup(id).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.hosts
            .lock()
            .values()
            .filter(|host| host.strong_count() > 0)
            .count()
    }
}

/// Per-isolate services, the equivalent of "the current isolate" for code
/// running inside a [`WindowScope`].
#[derive(Clone)]
pub struct IsolateState {
    id: IsolateId,
    registry: Arc<IsolateRegistry>,
    runners: TaskRunners,
    decoder: Arc<dyn ImageDecoder>,
    natives: Arc<NativeTable>,
}

impl IsolateState {
    pub fn new(
        id: IsolateId,
        registry: Arc<IsolateRegistry>,
        runners: TaskRunners,
        decoder: Arc<dyn ImageDecoder>,
        natives: Arc<NativeTable>,
    ) -> Self {
        Self {
            id,
            registry,
            runners,
            decoder,
            natives,
        }
    }

    pub fn id(&self) -> IsolateId {
        self.id
    }

    pub fn registry(&self) -> &Arc<IsolateRegistry> {
        &self.registry
    }

    pub fn runners(&self) -> &TaskRunners {
        &self.runners
    }

    pub fn decoder(&self) -> &Arc<dyn ImageDecoder> {
        &self.decoder
    }

    pub fn natives(&self) -> &Arc<NativeTable> {
        &self.natives
    }

    pub fn continuation<T, F>(&self, callback: F) -> Continuation<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut WindowScope<'_>, T) + Send + 'static,
    {
        Continuation::new(self.id, self.registry.clone(), callback)
    }
}

type ContinuationFn<T> = Box<dyn FnOnce(&mut WindowScope<'_>, T) + Send>;

/// Callback into logic state captured at request time.
pub struct Continuation<T> {
    owner: IsolateId,
    registry: Arc<IsolateRegistry>,
    callback: ContinuationFn<T>,
}

impl<T: Send + 'static> Continuation<T> {
    pub fn new<F>(
        owner: IsolateId,
        registry: Arc<IsolateRegistry>,
        callback: F,
    ) -> Self
    where
        F: FnOnce(&mut WindowScope<'_>, T) + Send + 'static,
    {
        Self {
            owner,
            registry,
            callback: Box::new(callback),
        }
    }

    pub fn owner(&self) -> IsolateId {
        self.owner
    }

    /// Runs the callback inside its owner's scope. Must be called from UI
    /// while no window is borrowed. Returns `false`, dropping the callback,
    /// when the owner is gone.
    pub fn invoke(self, value: T) -> bool {
        let Continuation {
            owner,
            registry,
            callback,
        } = self;

        let Some(host) = registry.lookup(owner) else {
            trace!("dropping continuation for departed {}", owner);
            return false;
        };

        let entered = host.enter(
            owner,
            Box::new(move |scope: &mut WindowScope<'_>| callback(scope, value)),
        );
        if !entered {
            trace!("{} is no longer hosted; continuation dropped", owner);
        }
        entered
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHost {
        entered: Mutex<Vec<IsolateId>>,
    }

    impl IsolateHost for CountingHost {
        fn enter(&self, id: IsolateId, _f: ScopeFn<'_>) -> bool {
            self.entered.lock().push(id);
            true
        }
    }

    #[test]
    fn ids_are_stable_and_lookup_fails_after_unregister() {
        let registry = IsolateRegistry::new();
        let host: Arc<dyn IsolateHost> = Arc::new(CountingHost {
            entered: Mutex::new(Vec::new()),
        });

        let first = registry.register(Arc::downgrade(&host));
        let second = registry.register(Arc::downgrade(&host));
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
        assert!(registry.is_alive(first));

        assert!(registry.unregister(first));
        assert!(!registry.is_alive(first));
        assert!(!registry.unregister(first));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn dropped_host_counts_as_departed() {
        let registry = IsolateRegistry::new();
        let host: Arc<dyn IsolateHost> = Arc::new(CountingHost {
            entered: Mutex::new(Vec::new()),
        });
        let id = registry.register(Arc::downgrade(&host));

        drop(host);
        assert!(registry.lookup(id).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn continuation_for_departed_owner_is_dropped() {
        let registry = IsolateRegistry::new();
        let host = Arc::new(CountingHost {
            entered: Mutex::new(Vec::new()),
        });
        let dyn_host: Arc<dyn IsolateHost> = host.clone();
        let id = registry.register(Arc::downgrade(&dyn_host));

        let live = Continuation::new(id, registry.clone(), |_, _: u8| {});
        assert!(live.invoke(1));
        assert_eq!(*host.entered.lock(), vec![id]);

        registry.unregister(id);
        let late = Continuation::new(id, registry.clone(), |_, _: u8| {});
        assert!(!late.invoke(2));
        assert_eq!(host.entered.lock().len(), 1);
    }
}
