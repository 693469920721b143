//! Repeating notification reads for the currently selected target user.
//!
//! Every retarget cancels the previous task and bumps a generation counter.
//! Updates carry the generation they were scheduled under, so the console can
//! drop anything a superseded task still manages to deliver.

use std::time::Duration;

use tokio::{runtime::Handle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::{
    client::{self, Backend},
    model::{DemoUser, Notification},
};

/// The result of one read, tagged with the schedule that produced it.
#[derive(Debug)]
pub struct PollUpdate {
    pub generation: u64,
    pub target: DemoUser,
    pub outcome: Result<Vec<Notification>, client::Error>,
}

struct Active {
    target: DemoUser,
    cancel: CancellationToken,
}

pub struct Poller {
    backend: Backend,
    interval: Duration,
    runtime: Handle,
    tx: async_channel::Sender<PollUpdate>,
    generation: u64,
    active: Option<Active>,
}

impl Poller {
    pub fn new(
        backend: Backend,
        interval: Duration,
        runtime: Handle,
        tx: async_channel::Sender<PollUpdate>,
    ) -> Self {
        Self { backend, interval, runtime, tx, generation: 0, active: None }
    }

    /// Stops polling the previous target and starts polling `target`, with an
    /// immediate first read. Returns the generation of the new schedule.
    pub fn retarget(&mut self, target: DemoUser) -> u64 {
        self.stop();

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();

        debug!(user = %target, generation, "Scheduling notification polling");

        self.runtime.spawn(run(
            self.backend.clone(),
            target,
            generation,
            self.interval,
            cancel.clone(),
            self.tx.clone(),
        ));
        self.active = Some(Active { target, cancel });

        generation
    }

    /// Cancels the running schedule, if any.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            trace!(user = %active.target, "Cancelling notification polling");
            active.cancel.cancel();
        }
    }

    /// Cancels the running schedule and closes the update channel, so the
    /// receiving side sees the end of the stream.
    pub fn shutdown(&mut self) {
        self.stop();
        self.tx.close();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn target(&self) -> Option<DemoUser> {
        self.active.as_ref().map(|active| active.target)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[tracing::instrument(
    skip_all,
    fields(user = %target, generation = generation)
)]
async fn run(
    backend: Backend,
    target: DemoUser,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
    tx: async_channel::Sender<PollUpdate>,
) {
    // The first tick completes immediately.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = refresh_notifications(&backend, target) => outcome,
        };

        // The schedule may have been superseded while the read was in flight.
        if cancel.is_cancelled() {
            break;
        }

        let update = PollUpdate { generation, target, outcome };
        if tx.send(update).await.is_err() {
            debug!("Console is gone, stopping");
            break;
        }
    }

    trace!("Notification polling stopped");
}

/// One read of the feed for `target`. Failures are logged here and handed on
/// so the console can apply its failure policy.
pub async fn refresh_notifications(
    backend: &Backend,
    target: DemoUser,
) -> Result<Vec<Notification>, client::Error> {
    let outcome = backend.fetch_notifications(target).await;

    match &outcome {
        Ok(notifications) => {
            trace!(count = notifications.len(), "Fetched notifications");
        }
        Err(error) => {
            error!(%error, "Error fetching notifications");
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mockito::Server;
    use reqwest::Url;
    use serde_json::json;

    use super::*;

    const LONG: Duration = Duration::from_secs(60);
    const SHORT: Duration = Duration::from_millis(100);

    fn poller(
        server: &Server,
        interval: Duration,
    ) -> (Poller, async_channel::Receiver<PollUpdate>) {
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        let backend = Backend::new(base).unwrap();
        let (tx, rx) = async_channel::unbounded();
        (Poller::new(backend, interval, Handle::current(), tx), rx)
    }

    async fn next(rx: &async_channel::Receiver<PollUpdate>) -> PollUpdate {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no poll update in time")
            .expect("poll channel closed")
    }

    #[tokio::test]
    async fn retarget_reads_immediately_once() {
        let mut server = Server::new_async().await;
        let alice = server
            .mock("GET", "/notifications/user1")
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;
        let bob = server
            .mock("GET", "/notifications/user2")
            .with_body(
                json!([{
                    "notificationId": "1",
                    "type": "like",
                    "content": "hi",
                    "timestamp": "2024-01-01T00:00:00Z",
                }])
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let (mut poller, rx) = poller(&server, LONG);

        assert_eq!(poller.retarget(DemoUser::Alice), 1);
        let update = next(&rx).await;
        assert_eq!((update.generation, update.target), (1, DemoUser::Alice));
        assert!(update.outcome.unwrap().is_empty());

        assert_eq!(poller.retarget(DemoUser::Bob), 2);
        let update = next(&rx).await;
        assert_eq!((update.generation, update.target), (2, DemoUser::Bob));
        assert_eq!(update.outcome.unwrap().len(), 1);
        assert_eq!(poller.target(), Some(DemoUser::Bob));
        assert_eq!(poller.generation(), 2);

        alice.assert_async().await;
        bob.assert_async().await;
    }

    #[tokio::test]
    async fn retarget_stops_reads_for_previous_target() {
        let mut server = Server::new_async().await;
        let alice = server
            .mock("GET", "/notifications/user1")
            .with_body("[]")
            .create_async()
            .await;
        let _bob = server
            .mock("GET", "/notifications/user2")
            .with_body("[]")
            .create_async()
            .await;

        let (mut poller, rx) = poller(&server, SHORT);

        poller.retarget(DemoUser::Alice);
        assert_eq!(next(&rx).await.target, DemoUser::Alice);
        assert_eq!(next(&rx).await.target, DemoUser::Alice);

        poller.retarget(DemoUser::Bob);
        alice.remove_async().await;
        let silent = server
            .mock("GET", "/notifications/user1")
            .with_body("[]")
            .expect(0)
            .create_async()
            .await;

        for _ in 0..3 {
            let update = next(&rx).await;
            assert_eq!((update.generation, update.target), (2, DemoUser::Bob));
        }

        silent.assert_async().await;
    }

    #[tokio::test]
    async fn superseded_in_flight_read_is_dropped() {
        let mut server = Server::new_async().await;
        let _alice = server
            .mock("GET", "/notifications/user1")
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(300));
                w.write_all(b"[]")
            })
            .create_async()
            .await;
        let _bob = server
            .mock("GET", "/notifications/user2")
            .with_body("[]")
            .create_async()
            .await;

        let (mut poller, rx) = poller(&server, LONG);

        poller.retarget(DemoUser::Alice);
        tokio::time::sleep(Duration::from_millis(50)).await;
        poller.retarget(DemoUser::Bob);

        let update = next(&rx).await;
        assert_eq!((update.generation, update.target), (2, DemoUser::Bob));

        // Give the slow read time to finish; nothing else may arrive.
        let late =
            tokio::time::timeout(Duration::from_millis(600), rx.recv()).await;
        assert!(late.is_err(), "unexpected update: {late:?}");
    }

    #[tokio::test]
    async fn failures_are_delivered_not_raised() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/notifications/user2")
            .with_status(502)
            .create_async()
            .await;

        let (mut poller, rx) = poller(&server, LONG);
        poller.retarget(DemoUser::Bob);

        let update = next(&rx).await;
        assert!(matches!(update.outcome, Err(client::Error::Status(_))));
    }

    #[tokio::test]
    async fn dropping_the_poller_ends_the_schedule() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/notifications/user1")
            .with_body("[]")
            .create_async()
            .await;

        let (mut poller, rx) = poller(&server, SHORT);
        poller.retarget(DemoUser::Alice);
        next(&rx).await;
        drop(poller);

        // Once the task exits every sender is gone and the channel closes.
        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
