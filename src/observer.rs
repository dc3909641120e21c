use service::{Error, ServiceHandler};

/// Logs what happens to connections.
#[derive(Debug, Default, Clone)]
pub struct Observer;

impl ServiceHandler for Observer {
    fn on_connected(&self, id: &str, interval: i64, replaced: bool) {
        log::info!(
            "client connected: id={:?}, interval={}ms, replaced={}",
            id,
            interval,
            replaced
        );
    }

    /// The entry may already be gone when a stream closes, after a server
    /// side disconnect or when a newer stream took over the client id, that
    /// is expected and only worth a debug line.
    fn on_disconnected(&self, id: &str, remaining: usize, found: bool) {
        if found {
            log::info!("client disconnected: id={:?}, remaining={}", id, remaining);
        } else {
            log::debug!(
                "client stream closed without entry: id={:?}, remaining={}",
                id,
                remaining
            );
        }
    }

    fn on_dropped_frame(&self, id: &str) {
        log::warn!("client is not reading, frame dropped: id={:?}", id);
    }

    fn on_payload_error(&self, id: &str, error: &Error) {
        log::error!("failed to generate payload: id={:?}, err={}", id, error);
    }
}
