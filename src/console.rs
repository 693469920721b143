use std::time::Duration;

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{
    client::{self, Backend},
    config::PollFailure,
    model::{DemoUser, Event, EventType, Notification},
    poll::{PollUpdate, Poller},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// A transient acknowledgment of an event submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: &'static str,
}

impl Toast {
    pub fn for_submission(result: &Result<(), client::Error>) -> Self {
        match result {
            Ok(()) => Self {
                kind: ToastKind::Success,
                message: "Event triggered!",
            },
            Err(_) => Self {
                kind: ToastKind::Error,
                message: "Failed to trigger event",
            },
        }
    }
}

/// Everything the console shows. Selections are plain fields, the snapshot
/// only changes through [`ConsoleState::apply_poll`].
#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub event_type: EventType,
    pub source: DemoUser,
    pub target: DemoUser,
    notifications: Vec<Notification>,
    generation: u64,
    poll_failure: PollFailure,
}

impl ConsoleState {
    pub fn new(poll_failure: PollFailure) -> Self {
        Self {
            event_type: EventType::Like,
            source: DemoUser::Alice,
            target: DemoUser::Bob,
            notifications: Vec::new(),
            generation: 0,
            poll_failure,
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// The event the form would submit right now.
    pub fn event(&self) -> Event {
        Event::new(self.event_type, self.source, self.target)
    }

    /// Only updates from this poll schedule are applied from now on.
    pub fn expect_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Replaces the snapshot with the outcome of a read. Returns whether the
    /// snapshot changed.
    pub fn apply_poll(&mut self, update: PollUpdate) -> bool {
        if update.generation != self.generation {
            debug!(
                user = %update.target,
                generation = update.generation,
                current = self.generation,
                "Dropping stale poll update"
            );
            return false;
        }

        let notifications = match update.outcome {
            Ok(notifications) => notifications,
            Err(_) if self.poll_failure == PollFailure::Keep => return false,
            Err(_) => Vec::new(),
        };

        if notifications == self.notifications {
            return false;
        }
        self.notifications = notifications;
        true
    }
}

/// Owns the console state together with the tasks feeding it.
pub struct Console {
    state: ConsoleState,
    poller: Poller,
    backend: Backend,
    runtime: Handle,
    toasts: async_channel::Sender<Toast>,
}

impl Console {
    pub fn new(
        backend: Backend,
        poll_interval: Duration,
        poll_failure: PollFailure,
        runtime: Handle,
        updates: async_channel::Sender<PollUpdate>,
        toasts: async_channel::Sender<Toast>,
    ) -> Self {
        let poller = Poller::new(
            backend.clone(),
            poll_interval,
            runtime.clone(),
            updates,
        );

        Self {
            state: ConsoleState::new(poll_failure),
            poller,
            backend,
            runtime,
            toasts,
        }
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    /// Starts polling the initial target.
    pub fn mount(&mut self) {
        self.restart_polling();
    }

    /// Stops polling and closes both channels, which ends the UI loops
    /// draining them.
    pub fn shutdown(&mut self) {
        self.poller.shutdown();
        self.toasts.close();
    }

    pub fn select_event_type(&mut self, event_type: EventType) {
        self.state.event_type = event_type;
    }

    pub fn select_source_user(&mut self, user: DemoUser) {
        self.state.source = user;
    }

    pub fn select_target_user(&mut self, user: DemoUser) {
        if self.state.target == user {
            return;
        }

        self.state.target = user;
        self.restart_polling();
    }

    pub fn apply_poll(&mut self, update: PollUpdate) -> bool {
        self.state.apply_poll(update)
    }

    /// Posts the currently selected event. The outcome is reported as a
    /// [`Toast`], the snapshot is left alone.
    pub fn submit_event(&self) -> JoinHandle<()> {
        let event = self.state.event();
        let backend = self.backend.clone();
        let toasts = self.toasts.clone();

        self.runtime.spawn(async move {
            let result = backend.submit_event(&event).await;
            match &result {
                Ok(()) => info!(
                    kind = %event.kind,
                    from = %event.source_user_id,
                    to = %event.target_user_id,
                    "Event triggered"
                ),
                Err(error) => error!(%error, "Error triggering event"),
            }

            if toasts.send(Toast::for_submission(&result)).await.is_err() {
                debug!("Toast receiver is gone");
            }
        })
    }

    fn restart_polling(&mut self) {
        let generation = self.poller.retarget(self.state.target);
        self.state.expect_generation(generation);
    }
}
