use std::cell::{Cell, Ref, RefCell, RefMut};
use std::future::Future;
use std::rc::Rc;

use tokio::task::LocalSet;
use tracing::{debug, warn};
use url::Url;

use crate::bridge::{Bridge, NativeHost};
use crate::dom::{Document, MutationRecord};
use crate::guard::{ArtifactKind, InstallRegistry};
use crate::scripts::badge::ActionSurface;

mod events;

pub use events::{DispatchOutcome, EventHandler, EventKind, ListenerTarget, PageEvent, Phase};

use events::ListenerTable;

/// Observer batches delivered per flush before giving up on convergence.
const MAX_OBSERVER_ROUNDS: usize = 16;

pub type MutationCallback = Rc<dyn Fn(&Rc<Page>, &[MutationRecord])>;
type ReadyCallback = Box<dyn FnOnce(&Rc<Page>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Complete,
}

pub struct PageBuilder {
    url: Url,
    host: Option<Rc<dyn NativeHost>>,
    action: Option<Rc<ActionSurface>>,
    ready_state: ReadyState,
}

impl PageBuilder {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            host: None,
            action: None,
            ready_state: ReadyState::Complete,
        }
    }

    pub fn host(mut self, host: Rc<dyn NativeHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// The page's `chrome.action`-shaped badge surface, when it has one.
    pub fn action_surface(mut self, action: Rc<ActionSurface>) -> Self {
        self.action = Some(action);
        self
    }

    /// Starts the page before `DOMContentLoaded`.
    pub fn loading(mut self) -> Self {
        self.ready_state = ReadyState::Loading;
        self
    }

    pub fn build(self) -> Rc<Page> {
        Rc::new(Page {
            url: self.url,
            document: RefCell::new(Document::new()),
            registry: RefCell::new(InstallRegistry::default()),
            observers: RefCell::new(Vec::new()),
            listeners: RefCell::new(ListenerTable::default()),
            bridge: Bridge::new(self.host),
            tasks: LocalSet::new(),
            action: self.action,
            ready_state: Cell::new(self.ready_state),
            ready_callbacks: RefCell::new(Vec::new()),
        })
    }
}

/// One page lifetime. Everything runs on one thread; bridge continuations
/// go to the page's own task set, which runs while [`Page::run_until`] is
/// being awaited.
pub struct Page {
    url: Url,
    document: RefCell<Document>,
    registry: RefCell<InstallRegistry>,
    observers: RefCell<Vec<MutationCallback>>,
    listeners: RefCell<ListenerTable>,
    bridge: Bridge,
    tasks: LocalSet,
    action: Option<Rc<ActionSurface>>,
    ready_state: Cell<ReadyState>,
    ready_callbacks: RefCell<Vec<ReadyCallback>>,
}

impl Page {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Mutable document access. Never hold the guard across a handler call
    /// or an await.
    pub fn dom(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    pub fn dom_ref(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn action_surface(&self) -> Option<Rc<ActionSurface>> {
        self.action.clone()
    }

    /// Runs `setup` unless `kind` was already installed in this page
    /// lifetime, then marks it installed.
    pub fn install_once<T>(
        self: &Rc<Self>,
        kind: ArtifactKind,
        setup: impl FnOnce(&Rc<Page>) -> T,
    ) -> Option<T> {
        if self.registry.borrow().is_installed(kind) {
            debug!(target = "guard", artifact = %kind, "already installed, skipping");
            return None;
        }
        let installed = setup(self);
        self.registry.borrow_mut().mark(kind);
        debug!(target = "guard", artifact = %kind, "installed");
        Some(installed)
    }

    pub fn is_installed(&self, kind: ArtifactKind) -> bool {
        self.registry.borrow().is_installed(kind)
    }

    pub fn installed(&self) -> Vec<ArtifactKind> {
        self.registry.borrow().installed().collect()
    }

    /// Registers a child-list observer on the whole document.
    pub fn observe_mutations<F>(&self, callback: F)
    where
        F: Fn(&Rc<Page>, &[MutationRecord]) + 'static,
    {
        self.observers.borrow_mut().push(Rc::new(callback));
    }

    /// Delivers queued mutation records to every observer, batch after
    /// batch, until observers stop producing new mutations. Returns the number
    /// of batches delivered.
    pub fn flush_mutations(self: &Rc<Self>) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_OBSERVER_ROUNDS {
            let batch = self.document.borrow_mut().take_records();
            if batch.is_empty() {
                return delivered;
            }
            let observers: Vec<MutationCallback> = self.observers.borrow().clone();
            for observer in observers {
                observer(self, &batch);
            }
            delivered += 1;
        }
        if self.document.borrow().has_pending_records() {
            warn!(
                target = "injector",
                rounds = MAX_OBSERVER_ROUNDS,
                "mutation observers did not settle"
            );
        }
        delivered
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    /// Runs `callback` now if the document is ready, otherwise at
    /// [`Page::finish_loading`].
    pub fn when_ready<F>(self: &Rc<Self>, callback: F)
    where
        F: FnOnce(&Rc<Page>) + 'static,
    {
        match self.ready_state.get() {
            ReadyState::Complete => callback(self),
            ReadyState::Loading => self.ready_callbacks.borrow_mut().push(Box::new(callback)),
        }
    }

    /// Fires `DOMContentLoaded`.
    pub fn finish_loading(self: &Rc<Self>) {
        if self.ready_state.replace(ReadyState::Complete) == ReadyState::Complete {
            return;
        }
        let callbacks = std::mem::take(&mut *self.ready_callbacks.borrow_mut());
        for callback in callbacks {
            callback(self);
        }
        self.flush_mutations();
    }

    /// Queues a continuation on the page's task set. Nothing needs to be
    /// running yet; the task starts the next time the set is driven.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.tasks.spawn_local(future);
    }

    /// Drives the page's task set until `future` completes.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.tasks.run_until(future).await
    }
}
