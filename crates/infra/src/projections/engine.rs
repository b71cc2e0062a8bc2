//! Projection engine: keeps the read model in step with the event store.
//!
//! - Subscribes to the store and projects every live event on a spawned task
//! - Replays the log snapshot taken at start, off the async workers
//! - Contains every per-event error or panic; the engine stays subscribed

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use happyfactory_events::{Event, Subscriber, SubscriberError, SubscriptionToken, panic_message};

use crate::config::ProjectionConfig;
use crate::event::DomainEvent;
use crate::event_store::EventStore;
use crate::read_model::ReadModelStore;

use super::handlers::{ProjectionOutcome, apply_event};
use super::replay::{ReplayHandle, ReplayReport};
use super::ProjectionError;

/// Lifecycle state of a [`ProjectionEngine`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl core::fmt::Display for ProjectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ProjectionState::Stopped => "stopped",
            ProjectionState::Starting => "starting",
            ProjectionState::Running => "running",
            ProjectionState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Counters of per-event outcomes since construction.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionStats {
    pub applied: u64,
    pub skipped: u64,
    pub ignored: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    applied: AtomicU64,
    skipped: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, result: &Result<ProjectionOutcome, ProjectionError>) {
        let counter = match result {
            Ok(ProjectionOutcome::Applied) => &self.applied,
            Ok(ProjectionOutcome::Skipped) => &self.skipped,
            Ok(ProjectionOutcome::Ignored) => &self.ignored,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ProjectionStats {
        ProjectionStats {
            applied: self.applied.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: ProjectionState,
    subscription: Option<SubscriptionToken>,
}

struct EngineInner<S, R> {
    config: ProjectionConfig,
    store: S,
    read_model: R,
    runtime: Handle,
    lifecycle: Mutex<Lifecycle>,
    counters: Counters,
}

impl<S, R> EngineInner<S, R>
where
    S: EventStore<DomainEvent> + 'static,
    R: ReadModelStore + 'static,
{
    fn apply(&self, event: &DomainEvent) -> Result<ProjectionOutcome, ProjectionError> {
        let result = catch_unwind(AssertUnwindSafe(|| apply_event(&self.read_model, event)))
            .unwrap_or_else(|payload| Err(ProjectionError::Panicked(panic_message(&*payload))));
        self.counters.record(&result);
        result
    }

    /// Apply and log; never propagates. Returns whether the event projected cleanly.
    fn project(&self, event: &DomainEvent) -> bool {
        match self.apply(event) {
            Ok(_) => true,
            Err(err) => {
                error!(
                    projection = %self.config.name,
                    event_type = event.event_type(),
                    error = %err,
                    "error projecting event"
                );
                false
            }
        }
    }

    fn replay(&self, events: Vec<DomainEvent>) -> ReplayReport {
        info!(projection = %self.config.name, count = events.len(), "replaying existing events into read model");

        let mut report = ReplayReport::default();
        for event in &events {
            if self.project(event) {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            projection = %self.config.name,
            succeeded = report.succeeded,
            failed = report.failed,
            "replay finished"
        );
        report
    }

    fn set_state(&self, state: ProjectionState) -> Result<(), ProjectionError> {
        let mut lifecycle = self.lifecycle.lock().map_err(|_| ProjectionError::Poisoned)?;
        lifecycle.state = state;
        Ok(())
    }
}

/// Store subscriber that hands each live event to a spawned task.
struct LiveSubscriber<S, R> {
    engine: Weak<EngineInner<S, R>>,
}

impl<S, R> Subscriber<DomainEvent> for LiveSubscriber<S, R>
where
    S: EventStore<DomainEvent> + 'static,
    R: ReadModelStore + 'static,
{
    fn on_event(&self, event: &DomainEvent) -> Result<(), SubscriberError> {
        let Some(engine) = self.engine.upgrade() else {
            return Ok(());
        };
        let event = event.clone();
        let runtime = engine.runtime.clone();
        runtime.spawn(async move {
            engine.project(&event);
        });
        Ok(())
    }
}

/// Subscribes to an [`EventStore`] and projects its events into a [`ReadModelStore`].
///
/// Live delivery is fire-and-forget: the store's callback returns as soon as a
/// task is spawned on the runtime captured at construction, so events appended
/// concurrently may be projected out of order.
pub struct ProjectionEngine<S, R>
where
    S: EventStore<DomainEvent> + 'static,
    R: ReadModelStore + 'static,
{
    inner: Arc<EngineInner<S, R>>,
}

impl<S, R> ProjectionEngine<S, R>
where
    S: EventStore<DomainEvent> + 'static,
    R: ReadModelStore + 'static,
{
    pub fn new(store: S, read_model: R, runtime: Handle, config: ProjectionConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                read_model,
                runtime,
                lifecycle: Mutex::new(Lifecycle {
                    state: ProjectionState::Stopped,
                    subscription: None,
                }),
                counters: Counters::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn read_model(&self) -> &R {
        &self.inner.read_model
    }

    pub fn state(&self) -> ProjectionState {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    pub fn stats(&self) -> ProjectionStats {
        self.inner.counters.snapshot()
    }

    /// Subscribe to the store, then replay the log snapshot in the background.
    ///
    /// Events appended between subscribing and taking the snapshot are seen by
    /// both paths.
    pub fn start(&self) -> Result<ReplayHandle, ProjectionError> {
        {
            let mut lifecycle = self.inner.lifecycle.lock().map_err(|_| ProjectionError::Poisoned)?;
            if lifecycle.state != ProjectionState::Stopped {
                return Err(ProjectionError::InvalidState {
                    action: "start",
                    state: lifecycle.state,
                });
            }
            lifecycle.state = ProjectionState::Starting;
        }
        info!(projection = %self.inner.config.name, "projection engine starting and subscribing to event store");

        let history = match self.subscribe_and_snapshot() {
            Ok(history) => history,
            Err(err) => {
                self.inner.set_state(ProjectionState::Stopped)?;
                return Err(err);
            }
        };

        let engine = Arc::clone(&self.inner);
        let join = self.inner.runtime.spawn_blocking(move || engine.replay(history));
        Ok(ReplayHandle::new(join))
    }

    fn subscribe_and_snapshot(&self) -> Result<Vec<DomainEvent>, ProjectionError> {
        let subscriber: Arc<dyn Subscriber<DomainEvent>> = Arc::new(LiveSubscriber {
            engine: Arc::downgrade(&self.inner),
        });
        let token = self.inner.store.subscribe(subscriber)?;

        let history = if self.inner.config.replay_on_start {
            match self.inner.store.get_all() {
                Ok(history) => history,
                Err(err) => {
                    if let Err(unsub_err) = self.inner.store.unsubscribe(token) {
                        warn!(
                            projection = %self.inner.config.name,
                            error = %unsub_err,
                            "failed to unsubscribe after snapshot error"
                        );
                    }
                    return Err(err.into());
                }
            }
        } else {
            Vec::new()
        };

        let mut lifecycle = self.inner.lifecycle.lock().map_err(|_| ProjectionError::Poisoned)?;
        lifecycle.subscription = Some(token);
        lifecycle.state = ProjectionState::Running;
        Ok(history)
    }

    /// Unsubscribe from the store. In-flight tasks are not cancelled.
    pub fn stop(&self) -> Result<(), ProjectionError> {
        let token = {
            let mut lifecycle = self.inner.lifecycle.lock().map_err(|_| ProjectionError::Poisoned)?;
            match lifecycle.state {
                ProjectionState::Stopped => return Ok(()),
                ProjectionState::Running => {
                    lifecycle.state = ProjectionState::Stopping;
                    lifecycle.subscription.take()
                }
                state => {
                    return Err(ProjectionError::InvalidState { action: "stop", state });
                }
            }
        };
        info!(projection = %self.inner.config.name, "projection engine stopping and unsubscribing from event store");

        let unsubscribed = match token {
            Some(token) => self.inner.store.unsubscribe(token).map(|_| ()),
            None => Ok(()),
        };
        self.inner.set_state(ProjectionState::Stopped)?;
        unsubscribed.map_err(Into::into)
    }

    /// Project one event synchronously, counting its outcome.
    pub fn apply(&self, event: &DomainEvent) -> Result<ProjectionOutcome, ProjectionError> {
        self.inner.apply(event)
    }

    /// Clear the read model and re-apply the full log on the calling thread.
    ///
    /// Only a stopped engine can rebuild; the lifecycle stays locked until the
    /// replay finishes, so `start` cannot subscribe halfway through.
    pub fn rebuild(&self) -> Result<ReplayReport, ProjectionError> {
        let lifecycle = self.inner.lifecycle.lock().map_err(|_| ProjectionError::Poisoned)?;
        if lifecycle.state != ProjectionState::Stopped {
            return Err(ProjectionError::InvalidState {
                action: "rebuild",
                state: lifecycle.state,
            });
        }

        let events = self.inner.store.get_all()?;
        self.inner.read_model.clear();
        let report = self.inner.replay(events);
        drop(lifecycle);
        Ok(report)
    }
}

impl<S, R> Drop for ProjectionEngine<S, R>
where
    S: EventStore<DomainEvent> + 'static,
    R: ReadModelStore + 'static,
{
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            error!(projection = %self.inner.config.name, error = %err, "failed to stop projection engine on drop");
        }
    }
}

impl<S, R> core::fmt::Debug for ProjectionEngine<S, R>
where
    S: EventStore<DomainEvent> + 'static,
    R: ReadModelStore + 'static,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProjectionEngine")
            .field("name", &self.inner.config.name)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
