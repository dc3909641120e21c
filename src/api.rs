use std::{convert::Infallible, future::Future, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header::CONNECTION},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};

use serde::Deserialize;
use serde_json::json;
use service::{Service, options::ConnectOptions};
use tokio::net::TcpListener;
use tokio_stream::StreamExt;

use crate::{config::Config, observer::Observer};

/// The response header carrying the client id a stream was registered under.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

struct AppState {
    config: Arc<Config>,
    service: Service<Observer>,
    uptime: Instant,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionQuery {
    client_id: String,
}

/// The value of a query parameter.
///
/// A parameter given several times yields all of its values joined with
/// `,`, so `clientId=a&clientId=b` is the client id `a,b`.
fn query_value(query: &[(String, String)], key: &str) -> Option<String> {
    let values = query
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect::<Vec<_>>();

    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// Open a push stream.
///
/// The client id and the update interval come from the query string, both
/// are optional and never cause an error response. Idle streams get a
/// keep-alive comment now and then, so a peer that went away is noticed
/// even when its update interval is long.
async fn connect(Query(query): Query<Vec<(String, String)>>, State(state): State<Arc<AppState>>) -> Response {
    let client_id = query_value(&query, "clientId");
    let update_interval = query_value(&query, "updateInterval");

    let connection = state.service.connect(ConnectOptions {
        client_id: client_id.as_deref(),
        update_interval: update_interval.as_deref(),
    });

    let id = HeaderValue::from_str(connection.id.as_str()).ok();
    let events = connection
        .stream
        .map(|payload| Ok::<_, Infallible>(Event::default().data(payload)));

    let mut res = Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response();

    let headers = res.headers_mut();
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    // Ids that cannot be expressed as a header value are still registered,
    // they are just not echoed.
    if let Some(id) = id {
        headers.insert(CLIENT_ID_HEADER, id);
    }

    res
}

/// Build the router of the http server.
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK\n" }))
        .route("/sse", get(connect))
        .route(
            "/info",
            get(|State(state): State<Arc<AppState>>| async move {
                Json(json!({
                    "software": crate::SOFTWARE,
                    "uptime": state.uptime.elapsed().as_secs(),
                    "payload": state.service.payload_kind(),
                    "update_interval": state.config.update_interval,
                    "clients": state.service.len(),
                }))
            }),
        )
        .route(
            "/session",
            get(
                |Query(query): Query<SessionQuery>, State(state): State<Arc<AppState>>| async move {
                    if let Some(session) = state.service.get(&query.client_id) {
                        Json(json!({
                            "clientId": query.client_id,
                            "interval": session.interval,
                            "uptime": session.uptime.as_secs(),
                            "send_frames": session.send_frames,
                            "send_bytes": session.send_bytes,
                            "dropped_frames": session.dropped_frames,
                        }))
                        .into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                },
            )
            .delete(
                |Query(query): Query<SessionQuery>, State(state): State<Arc<AppState>>| async move {
                    if state.service.disconnect(&query.client_id) {
                        StatusCode::OK
                    } else {
                        StatusCode::NOT_FOUND
                    }
                },
            ),
        )
        .with_state(state)
}

/// start http server
///
/// Serve the push streams and the admin endpoints on the listener until the
/// shutdown future resolves. Open streams never finish on their own, so the
/// service is shut down as part of the graceful shutdown to let them end.
///
/// Warn: the admin endpoints (`/info`, `/session`) do not contain any means
/// of authentication, anyone who can reach the server can list and
/// disconnect clients.
pub async fn start_server<F>(
    listener: TcpListener,
    config: Arc<Config>,
    service: Service<Observer>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState {
        uptime: Instant::now(),
        service: service.clone(),
        config,
    });

    log::info!("http server listening={:?}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;

            let removed = service.shutdown();
            log::info!("http server shutting down, closed streams={}", removed);
        })
        .await?;

    Ok(())
}
