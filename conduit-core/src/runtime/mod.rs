//! Scheduler Runtime
//!
//! The runtime owns everything a tick needs (the lifecycle store, the path
//! index, the registry and the dependency graph) behind one lock, and runs
//! exactly one tick per event.
//!
//! # Event flow
//!
//! 1. An event arrives: user prop change, initial render, layout change,
//!    explicit request, or completion.
//! 2. The event's instances are bound and appended to `requested`.
//! 3. The scheduler computes a batch from a fresh snapshot.
//! 4. The batch is applied before the lock is released, so ticks never
//!    interleave.
//!
//! Executor bookkeeping (`transition`) mutates the store without a tick:
//! moving an instance between in-flight bins changes no readiness.
//!
//! For async hosts, [`Dispatcher`] serializes events through a channel.

mod dispatcher;

use parking_lot::Mutex;

use crate::callback::{CallbackDefinition, CallbackInstance, CallbackRegistry, ExecutionMeta};
use crate::config::SchedulerConfig;
use crate::error::{RegistryError, StoreError};
use crate::graph::DependencyGraph;
use crate::layout::{Address, ComponentId, PathIndex};
use crate::lifecycle::{Batch, Bin, Entry, InstanceKey, LifecycleStore, Snapshot};
use crate::scheduler::{LayoutView, Scheduler};
use crate::trigger::Triggers;

pub use dispatcher::{Dispatcher, DispatcherHandle};

/// Result of one event.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// The applied batch.
    pub batch: Batch,
    /// Everything in `prioritized` after the batch, ready for the executor.
    pub prioritized: Vec<Entry>,
    /// Store revision after the batch.
    pub revision: u64,
}

#[derive(Debug)]
struct State {
    store: LifecycleStore,
    paths: PathIndex,
    registry: CallbackRegistry,
    graph: DependencyGraph,
}

/// Synchronous owner of the scheduling state.
#[derive(Debug)]
pub struct SchedulerRuntime {
    scheduler: Scheduler,
    state: Mutex<State>,
}

impl SchedulerRuntime {
    /// Create a runtime over a registry and an initial layout.
    pub fn new(config: SchedulerConfig, registry: CallbackRegistry, paths: PathIndex) -> Self {
        let graph = DependencyGraph::build(&registry);
        Self {
            scheduler: Scheduler::new(config),
            state: Mutex::new(State {
                store: LifecycleStore::new(),
                paths,
                registry,
                graph,
            }),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        self.scheduler.config()
    }

    /// Register another callback definition and rebuild the graph.
    pub fn register(&self, definition: CallbackDefinition) -> Result<(), RegistryError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.registry.register(definition)?;
        state.graph = DependencyGraph::build(&state.registry);
        Ok(())
    }

    /// Append explicit requests and tick.
    pub fn request(
        &self,
        instances: impl IntoIterator<Item = CallbackInstance>,
    ) -> Result<TickReport, StoreError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let view = LayoutView::new(&state.paths, &state.registry);
        let bound: Vec<_> = instances
            .into_iter()
            .map(|instance| view.bind(instance.clone()).unwrap_or(instance))
            .collect();
        state.store.request_all(bound);
        self.tick_locked(state)
    }

    /// Fire the callbacks reading `changed` and tick.
    pub fn prop_changed(&self, changed: &[Address]) -> Result<TickReport, StoreError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let view = LayoutView::new(&state.paths, &state.registry);
        let fired = Triggers::new(&state.graph, view).prop_change(changed);
        state.store.request_all(fired);
        self.tick_locked(state)
    }

    /// Fire the initial callbacks of the current layout and tick.
    pub fn initial_layout(&self) -> Result<TickReport, StoreError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let view = LayoutView::new(&state.paths, &state.registry);
        let fired = Triggers::new(&state.graph, view).initial_layout();
        state.store.request_all(fired);
        self.tick_locked(state)
    }

    /// Replace the path index and tick, pruning or rebinding whatever the
    /// new layout invalidates.
    ///
    /// Components missing from the old index get their initial callbacks,
    /// bound only to the new components.
    pub fn set_layout(&self, paths: PathIndex) -> Result<TickReport, StoreError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let added: Vec<ComponentId> = paths
            .ids()
            .filter(|id| !state.paths.contains(id))
            .cloned()
            .collect();
        state.paths = paths;

        let view = LayoutView::new(&state.paths, &state.registry);
        let fired = Triggers::new(&state.graph, view).layout_added(&added);
        state.store.request_all(fired);
        self.tick_locked(state)
    }

    /// Move an instance between in-flight bins.
    pub fn transition(&self, key: InstanceKey, from: Bin, to: Bin) -> Result<(), StoreError> {
        self.state.lock().store.transition(key, from, to)
    }

    /// Retire an executing or watched instance that wrote `updated`, fire
    /// its follow-ups, and tick.
    pub fn complete(&self, key: InstanceKey, updated: &[Address]) -> Result<TickReport, StoreError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let instance = state
            .store
            .get(key)
            .map(|(_, instance)| instance.clone())
            .ok_or(StoreError::UnknownInstance(key))?;
        let meta = ExecutionMeta::for_completion(&instance, updated.iter().cloned());
        let parent = state.store.complete(key, meta)?;

        let view = LayoutView::new(&state.paths, &state.registry);
        let follow_ups = Triggers::new(&state.graph, view).completion(&parent, updated);
        tracing::debug!(instance = %parent, follow_ups = follow_ups.len(), "callback completed");
        state.store.request_all(follow_ups);
        self.tick_locked(state)
    }

    /// Tick without a new event.
    pub fn tick(&self) -> Result<TickReport, StoreError> {
        let mut guard = self.state.lock();
        self.tick_locked(&mut guard)
    }

    /// Copy of the current lifecycle state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().store.snapshot()
    }

    fn tick_locked(&self, state: &mut State) -> Result<TickReport, StoreError> {
        let view = LayoutView::new(&state.paths, &state.registry);
        let batch = self.scheduler.tick(&view, &state.store.snapshot());

        if let Err(error) = state.store.apply(&batch) {
            tracing::warn!(%error, "batch not applied");
            return Err(error);
        }

        let prioritized = state
            .store
            .entries(Bin::Prioritized)
            .map(|(key, instance)| Entry {
                key,
                instance: instance.clone(),
            })
            .collect();
        Ok(TickReport {
            batch,
            prioritized,
            revision: state.store.revision(),
        })
    }
}
