pub mod options;
pub mod payload;
pub mod registry;
pub mod statistics;
pub mod stream;

use self::{
    options::{ClientId, ConnectOptions},
    payload::PayloadGenerator,
    registry::{ConnectionRegistry, Entry, Snapshot},
    statistics::{Counts, Stats},
    stream::{ConnectionGuard, EventStream},
};

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{
    sync::{
        mpsc::{Sender, channel, error::TrySendError},
        watch,
    },
    time::{Instant, MissedTickBehavior, interval_at},
};

#[derive(Debug)]
pub enum Error {
    Serialize(serde_json::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

pub trait ServiceHandler: Send + Sync {
    /// connection opened
    ///
    /// Triggered after the stream has been registered. `replaced` tells
    /// whether an entry with the same client id was overwritten, the stream
    /// behind that entry stays open and keeps receiving its own events until
    /// it is closed.
    #[allow(unused_variables)]
    fn on_connected(&self, id: &str, interval: i64, replaced: bool) {}

    /// connection closed
    ///
    /// Triggered once per stream when it goes away: the client closed it, a
    /// write to it failed, or it was disconnected on the server side. `found`
    /// is false when the registry entry had already been removed or now
    /// belongs to a newer stream with the same client id.
    #[allow(unused_variables)]
    fn on_disconnected(&self, id: &str, remaining: usize, found: bool) {}

    /// frame dropped
    ///
    /// The client does not read fast enough and its buffer is full, the
    /// frame of this tick was discarded.
    #[allow(unused_variables)]
    fn on_dropped_frame(&self, id: &str) {}

    /// payload generation failed, the tick is skipped.
    #[allow(unused_variables)]
    fn on_payload_error(&self, id: &str, error: &Error) {}
}

pub struct ServiceOptions<T> {
    pub generator: Arc<dyn PayloadGenerator>,
    /// Interval used when a client does not request a valid one, in
    /// milliseconds.
    pub default_interval: i64,
    /// Number of frames a slow client may have pending before frames are
    /// dropped.
    pub buffer_size: usize,
    pub handler: T,
}

/// An opened connection.
pub struct Connection<T>
where
    T: ServiceHandler + Clone + 'static,
{
    pub id: ClientId,
    pub interval: i64,
    pub connection: u64,
    pub stream: EventStream<T>,
}

/// Push service.
///
/// Owns the connection registry and spawns one push task per connection.
/// Cloning is cheap, all clones share the same registry.
#[derive(Clone)]
pub struct Service<T> {
    registry: Arc<ConnectionRegistry>,
    generator: Arc<dyn PayloadGenerator>,
    closed: Arc<watch::Sender<bool>>,
    default_interval: i64,
    buffer_size: usize,
    handler: T,
}

impl<T> Service<T>
where
    T: ServiceHandler + Clone + 'static,
{
    /// Create push service.
    pub fn new(options: ServiceOptions<T>) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::default()),
            closed: Arc::new(watch::channel(false).0),
            generator: options.generator,
            default_interval: options.default_interval,
            buffer_size: options.buffer_size.max(1),
            handler: options.handler,
        }
    }

    /// Open a stream for a client.
    ///
    /// The client id and the interval are resolved from the raw options, the
    /// stream is registered under the id, replacing any previous entry, and
    /// its push task is started. The first event is sent one interval after
    /// the connection is opened.
    ///
    /// This must be called from within a Tokio runtime.
    pub fn connect(&self, options: ConnectOptions<'_>) -> Connection<T> {
        let id = ClientId::resolve(options.client_id);
        let interval = options::parse_interval(options.update_interval, self.default_interval);
        let connection = self.registry.next_connection();
        let counts = Arc::new(Counts::default());
        let released = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = channel(self.buffer_size);

        let handle = tokio::spawn(self.clone().push(
            id.clone(),
            connection,
            interval,
            sender,
            counts.clone(),
            released.clone(),
        ));

        let replaced = self
            .registry
            .insert(
                id.clone(),
                Entry {
                    connected_at: Instant::now(),
                    task: handle.abort_handle(),
                    released: released.clone(),
                    connection,
                    interval,
                    counts,
                },
            )
            .is_some();

        self.handler.on_connected(id.as_str(), interval, replaced);

        Connection {
            stream: EventStream {
                receiver,
                guard: ConnectionGuard {
                    service: self.clone(),
                    task: handle.abort_handle(),
                    id: id.clone(),
                    connection,
                    released,
                },
            },
            id,
            interval,
            connection,
        }
    }

    /// Disconnect a client from the server side.
    ///
    /// Stops the push task of the registered stream and removes the entry,
    /// the stream then ends. Returns false if no entry was registered under
    /// the id, which is not an error.
    pub fn disconnect(&self, id: &str) -> bool {
        let Some(entry) = self.registry.remove(id) else {
            return false;
        };

        entry.task.abort();
        if !entry.released.swap(true, Ordering::AcqRel) {
            self.handler.on_disconnected(id, self.registry.len(), true);
        }

        true
    }

    /// Release the entry of a stream that went away.
    ///
    /// Does nothing if the connection was already released, either by its
    /// push task or by a server side disconnect.
    pub(crate) fn release(&self, id: &ClientId, connection: u64, released: &AtomicBool) -> bool {
        if released.swap(true, Ordering::AcqRel) {
            return false;
        }

        let found = self.registry.remove_if(id.as_str(), connection).is_some();
        self.handler
            .on_disconnected(id.as_str(), self.registry.len(), found);

        found
    }

    /// Stop every push task and empty the registry.
    ///
    /// Streams that are still open end, including streams whose entry was
    /// replaced by a newer connection. Connections opened afterwards end
    /// immediately. Returns the number of entries that were removed.
    pub fn shutdown(&self) -> usize {
        self.closed.send_replace(true);

        let entries = self.registry.drain();
        for (_, entry) in &entries {
            entry.task.abort();
        }

        entries.len()
    }

    pub fn get(&self, id: &str) -> Option<Snapshot> {
        self.registry.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.registry.ids()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn payload_kind(&self) -> &'static str {
        self.generator.kind()
    }

    pub fn get_handler(&self) -> &T {
        &self.handler
    }

    async fn push(
        self,
        id: ClientId,
        connection: u64,
        interval: i64,
        sender: Sender<String>,
        counts: Arc<Counts>,
        released: Arc<AtomicBool>,
    ) {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return;
        }

        let period = options::period(interval);
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => (),
                _ = closed.changed() => break,
            }

            let payload = match self.generator.generate() {
                Ok(it) => it,
                Err(e) => {
                    self.handler.on_payload_error(id.as_str(), &e);
                    continue;
                }
            };

            let size = payload.len();
            match sender.try_send(payload) {
                Ok(()) => {
                    counts.add(&Stats::SendFrames(1));
                    counts.add(&Stats::SendBytes(size));
                }
                Err(TrySendError::Full(_)) => {
                    counts.add(&Stats::DroppedFrames(1));
                    self.handler.on_dropped_frame(id.as_str());
                }
                Err(TrySendError::Closed(_)) => {
                    self.release(&id, connection, &released);
                    break;
                }
            }
        }
    }
}
