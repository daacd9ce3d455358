//! Broadcast hub
//!
//! One coordination task owns the subscriber set outright. Everything else
//! talks to it through `HubHandle`, which only queues events:
//!
//! - `join`: add a subscriber with its own bounded outbound queue
//! - `leave`: remove a subscriber; leaving twice is a no-op
//! - `deliver`: `try_send` to every subscriber; a full or closed queue gets
//!   the subscriber dropped on the spot, with no retry
//!
//! A second task reads the process-wide `ChangeFeed` subscription and feeds
//! `deliver` events. If that subscription terminates the reader stops for
//! good; the coordination task keeps serving join/leave.

use crate::error::{Error, Result};
use crate::feed::{ChangeFeed, ChangeMessage};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifier of a live subscriber
pub type SubscriberId = Uuid;

/// Default outbound queue length per subscriber
const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Default queue length between the feed reader and the coordination task
const DEFAULT_DELIVERY_BUFFER: usize = 1024;

/// Hub sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Messages buffered per subscriber before it counts as too slow
    pub subscriber_buffer: usize,
    /// Messages buffered between the feed reader and the coordination task
    pub delivery_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            delivery_buffer: DEFAULT_DELIVERY_BUFFER,
        }
    }
}

impl HubConfig {
    fn validate(&self) -> Result<()> {
        if self.subscriber_buffer == 0 || self.delivery_buffer == 0 {
            return Err(Error::Configuration(
                "hub buffers must hold at least one message".to_string(),
            ));
        }
        Ok(())
    }
}

/// Membership events, handled ahead of deliveries
#[derive(Debug)]
enum Control {
    Join {
        id: SubscriberId,
        outbound: mpsc::Sender<ChangeMessage>,
    },
    Leave {
        id: SubscriberId,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle to a running hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    control: mpsc::UnboundedSender<Control>,
    deliveries: mpsc::Sender<ChangeMessage>,
    subscriber_buffer: usize,
}

impl HubHandle {
    /// Register a new subscriber.
    ///
    /// The returned `Subscription` leaves the hub when dropped, so a
    /// connection task cannot leak its membership however it ends.
    #[must_use]
    pub fn join(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (outbound, receiver) = mpsc::channel(self.subscriber_buffer);

        if self.control.send(Control::Join { id, outbound }).is_err() {
            warn!(subscriber_id = %id, "Hub is not running, subscriber will receive nothing");
        }

        Subscription {
            id,
            receiver,
            control: self.control.clone(),
        }
    }

    /// Remove a subscriber. Unknown or already-removed ids are ignored.
    pub fn leave(&self, id: SubscriberId) {
        let _ = self.control.send(Control::Leave { id });
    }

    /// Queue a message for fan-out, waiting if the delivery queue is full
    ///
    /// # Errors
    ///
    /// Returns `Error::SubscriptionTerminated` if the hub has stopped.
    pub async fn deliver(&self, message: ChangeMessage) -> Result<()> {
        self.deliveries
            .send(message)
            .await
            .map_err(|_| Error::terminated("broadcast hub stopped"))
    }

    /// Number of live subscribers, `None` if the hub has stopped
    pub async fn subscriber_count(&self) -> Option<usize> {
        let (reply, rx) = oneshot::channel();
        self.control.send(Control::Count { reply }).ok()?;
        rx.await.ok()
    }

    /// Whether the coordination task is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.control.is_closed()
    }
}

/// Membership in the hub plus the subscriber's outbound queue
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<ChangeMessage>,
    control: mpsc::UnboundedSender<Control>,
}

impl Subscription {
    /// Subscriber id
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message for this subscriber. `None` once the hub has dropped it,
    /// either because it was too slow or because the hub stopped.
    pub async fn recv(&mut self) -> Option<ChangeMessage> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Leave { id: self.id });
    }
}

/// Task handles of a spawned hub
#[derive(Debug)]
pub struct HubTasks {
    /// Coordination loop
    pub coordinator: JoinHandle<()>,
    /// Change-feed reader; resolves to the terminal error if the feed broke
    pub feed_reader: JoinHandle<Result<()>>,
}

/// The coordination loop and the subscriber set it owns
pub struct BroadcastHub {
    subscribers: HashMap<SubscriberId, mpsc::Sender<ChangeMessage>>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    deliveries_rx: mpsc::Receiver<ChangeMessage>,
}

impl BroadcastHub {
    /// Create a hub that is not yet running, with no feed attached
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if a buffer size is zero.
    pub fn new(config: HubConfig) -> Result<(Self, HubHandle)> {
        config.validate()?;

        let (control, control_rx) = mpsc::unbounded_channel();
        let (deliveries, deliveries_rx) = mpsc::channel(config.delivery_buffer);

        let hub = Self {
            subscribers: HashMap::new(),
            control_rx,
            deliveries_rx,
        };
        let handle = HubHandle {
            control,
            deliveries,
            subscriber_buffer: config.subscriber_buffer,
        };
        Ok((hub, handle))
    }

    /// Subscribe to the feed once and start both tasks
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a zero buffer size and
    /// `Error::StoreUnavailable` if the feed subscription cannot be opened.
    pub async fn spawn(
        feed: ChangeFeed,
        config: HubConfig,
        cancel: CancellationToken,
    ) -> Result<(HubHandle, HubTasks)> {
        let (hub, handle) = Self::new(config)?;
        let stream = feed.subscribe().await?;
        info!(topic = %feed.topic(), "Broadcast hub subscribed to change feed");

        let coordinator = tokio::spawn(hub.run(cancel.clone()));
        let feed_reader = tokio::spawn(read_feed(stream, handle.clone(), cancel));

        Ok((handle, HubTasks {
            coordinator,
            feed_reader,
        }))
    }

    /// Run the coordination loop until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Broadcast hub shutting down");
                    break;
                }

                Some(control) = self.control_rx.recv() => self.handle_control(control),

                Some(message) = self.deliveries_rx.recv() => self.deliver(&message),

                else => break,
            }
        }

        debug!(subscribers = self.subscribers.len(), "Broadcast hub stopped");
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Join { id, outbound } => {
                self.subscribers.insert(id, outbound);
                debug!(subscriber_id = %id, subscribers = self.subscribers.len(), "Subscriber joined");
            }
            Control::Leave { id } => {
                if self.subscribers.remove(&id).is_some() {
                    debug!(subscriber_id = %id, subscribers = self.subscribers.len(), "Subscriber left");
                }
            }
            Control::Count { reply } => {
                let _ = reply.send(self.subscribers.len());
            }
        }
    }

    fn deliver(&mut self, message: &ChangeMessage) {
        self.subscribers.retain(|id, outbound| match outbound.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(subscriber_id = %id, "Subscriber queue full, disconnecting");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(subscriber_id = %id, "Subscriber gone, removing");
                false
            }
        });
        debug!(
            pixel = %message.pixel(),
            subscribers = self.subscribers.len(),
            "Change delivered"
        );
    }
}

/// Turn feed items into `deliver` events until the feed terminates
async fn read_feed(
    mut stream: crate::feed::ChangeStream,
    handle: HubHandle,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            item = stream.next() => item,
        };

        match item {
            Some(Ok(message)) => {
                if handle.deliver(message).await.is_err() {
                    return Ok(());
                }
            }
            Some(Err(e)) => {
                error!(error = %e, "Change feed terminated, live updates stopped");
                return Err(e);
            }
            None => {
                let e = Error::terminated("change feed ended");
                error!(error = %e, "Change feed terminated, live updates stopped");
                return Err(e);
            }
        }
    }
}
