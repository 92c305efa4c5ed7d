//! Async front end.
//!
//! A single consumer task owns the runtime's event stream. Callers send
//! commands over a bounded channel and await the tick report on a one-shot
//! reply, so events from any number of tasks are applied one at a time in
//! arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{SchedulerRuntime, TickReport};
use crate::callback::CallbackInstance;
use crate::error::{DispatchError, StoreError};
use crate::layout::{Address, PathIndex};
use crate::lifecycle::{Bin, InstanceKey, Snapshot};

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

enum Command {
    Request(Vec<CallbackInstance>, Reply<TickReport>),
    PropChanged(Vec<Address>, Reply<TickReport>),
    InitialLayout(Reply<TickReport>),
    SetLayout(PathIndex, Reply<TickReport>),
    Transition {
        key: InstanceKey,
        from: Bin,
        to: Bin,
        reply: Reply<()>,
    },
    Complete {
        key: InstanceKey,
        updated: Vec<Address>,
        reply: Reply<TickReport>,
    },
    Snapshot(oneshot::Sender<Snapshot>),
}

/// The consumer task.
pub struct Dispatcher {
    runtime: Arc<SchedulerRuntime>,
    commands: mpsc::Receiver<Command>,
}

impl Dispatcher {
    /// Spawn a dispatcher for `runtime` on the current tokio runtime.
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn(runtime: Arc<SchedulerRuntime>) -> (DispatcherHandle, JoinHandle<()>) {
        let (sender, commands) = mpsc::channel(runtime.config().queue_capacity.max(1));
        let dispatcher = Self { runtime, commands };
        let task = tokio::spawn(dispatcher.run());
        (DispatcherHandle { sender }, task)
    }

    async fn run(mut self) {
        tracing::info!("dispatcher started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        tracing::info!("dispatcher stopped");
    }

    fn handle(&self, command: Command) {
        let runtime = &self.runtime;
        // A dropped reply only means the caller stopped waiting.
        match command {
            Command::Request(instances, reply) => {
                let _ = reply.send(runtime.request(instances));
            }
            Command::PropChanged(changed, reply) => {
                let _ = reply.send(runtime.prop_changed(&changed));
            }
            Command::InitialLayout(reply) => {
                let _ = reply.send(runtime.initial_layout());
            }
            Command::SetLayout(paths, reply) => {
                let _ = reply.send(runtime.set_layout(paths));
            }
            Command::Transition {
                key,
                from,
                to,
                reply,
            } => {
                let _ = reply.send(runtime.transition(key, from, to));
            }
            Command::Complete {
                key,
                updated,
                reply,
            } => {
                let _ = reply.send(runtime.complete(key, &updated));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(runtime.snapshot());
            }
        }
    }
}

/// Cloneable sender side of a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<Command>,
}

impl DispatcherHandle {
    async fn call<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, DispatchError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| DispatchError::Closed)?;
        let result = response.await.map_err(|_| DispatchError::Closed)?;
        Ok(result?)
    }

    /// Append explicit requests.
    pub async fn request(
        &self,
        instances: Vec<CallbackInstance>,
    ) -> Result<TickReport, DispatchError> {
        self.call(|reply| Command::Request(instances, reply)).await
    }

    /// Report user changes.
    pub async fn prop_changed(&self, changed: Vec<Address>) -> Result<TickReport, DispatchError> {
        self.call(|reply| Command::PropChanged(changed, reply)).await
    }

    /// Fire the initial callbacks of the current layout.
    pub async fn initial_layout(&self) -> Result<TickReport, DispatchError> {
        self.call(Command::InitialLayout).await
    }

    /// Replace the layout, firing initial calls for new components.
    pub async fn set_layout(&self, paths: PathIndex) -> Result<TickReport, DispatchError> {
        self.call(|reply| Command::SetLayout(paths, reply)).await
    }

    /// Move an in-flight instance.
    pub async fn transition(
        &self,
        key: InstanceKey,
        from: Bin,
        to: Bin,
    ) -> Result<(), DispatchError> {
        self.call(|reply| Command::Transition {
            key,
            from,
            to,
            reply,
        })
        .await
    }

    /// Retire an instance that wrote `updated`.
    pub async fn complete(
        &self,
        key: InstanceKey,
        updated: Vec<Address>,
    ) -> Result<TickReport, DispatchError> {
        self.call(|reply| Command::Complete {
            key,
            updated,
            reply,
        })
        .await
    }

    /// Copy of the current lifecycle state.
    pub async fn snapshot(&self) -> Result<Snapshot, DispatchError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| DispatchError::Closed)?;
        response.await.map_err(|_| DispatchError::Closed)
    }
}
