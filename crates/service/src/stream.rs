use std::{
    pin::Pin,
    sync::{Arc, atomic::AtomicBool},
    task::{Context, Poll},
};

use tokio::{sync::mpsc::Receiver, task::AbortHandle};
use tokio_stream::Stream;

use crate::{Service, ServiceHandler, options::ClientId};

/// Ties the lifetime of a push task to the lifetime of its stream.
///
/// Dropping the guard is the close notification: the push task is stopped
/// and the registry entry is released if it still belongs to this
/// connection.
pub(crate) struct ConnectionGuard<T>
where
    T: ServiceHandler + Clone + 'static,
{
    pub(crate) service: Service<T>,
    pub(crate) id: ClientId,
    pub(crate) connection: u64,
    pub(crate) task: AbortHandle,
    pub(crate) released: Arc<AtomicBool>,
}

impl<T> Drop for ConnectionGuard<T>
where
    T: ServiceHandler + Clone + 'static,
{
    fn drop(&mut self) {
        self.task.abort();
        self.service
            .release(&self.id, self.connection, &self.released);
    }
}

/// The payloads pushed to one connection, one item per event.
///
/// The stream ends when the push task stops, either because the client was
/// disconnected from the server side or because the service was shut down.
pub struct EventStream<T>
where
    T: ServiceHandler + Clone + 'static,
{
    pub(crate) receiver: Receiver<String>,
    pub(crate) guard: ConnectionGuard<T>,
}

impl<T> EventStream<T>
where
    T: ServiceHandler + Clone + 'static,
{
    pub fn id(&self) -> &ClientId {
        &self.guard.id
    }
}

// Nothing in the stream is structurally pinned.
impl<T> Unpin for EventStream<T> where T: ServiceHandler + Clone + 'static {}

impl<T> Stream for EventStream<T>
where
    T: ServiceHandler + Clone + 'static,
{
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
