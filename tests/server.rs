use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use codec::Decoder;
use reqwest::{
    Client, Response, StatusCode,
    header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
};

use serde_json::Value;
use service::Service;
use sse_push_server::{
    api::{CLIENT_ID_HEADER, start_server},
    config::Config,
    create_service,
    observer::Observer,
};

use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
    time::{sleep, timeout},
};

struct TestServer {
    addr: SocketAddr,
    service: Service<Observer>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl TestServer {
    async fn new() -> Result<Self> {
        let config = Arc::new(Config {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            ..Default::default()
        });

        let listener = TcpListener::bind(config.listen()).await?;
        let addr = listener.local_addr()?;
        let service = create_service(&config);

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(start_server(listener, config, service.clone(), async move {
            let _ = signal.await;
        }));

        Ok(Self {
            addr,
            service,
            shutdown,
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn wait_until_empty(&self) -> Result<()> {
        timeout(Duration::from_secs(5), async {
            while !self.service.is_empty() {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await?;

        Ok(())
    }
}

async fn read_event(res: &mut Response, decoder: &mut Decoder) -> Result<String> {
    loop {
        let chunk = res.chunk().await?.ok_or_else(|| anyhow!("stream ended"))?;
        if let Some(event) = decoder.decode(&chunk)?.into_iter().next() {
            return Ok(event.data);
        }
    }
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let server = TestServer::new().await?;

    let res = Client::new().get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "OK\n");
    Ok(())
}

#[tokio::test]
async fn test_stream_headers_and_first_event() -> Result<()> {
    let server = TestServer::new().await?;

    let mut res = Client::new()
        .get(server.url("/sse?clientId=abc&updateInterval=200"))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/event-stream");
    assert_eq!(res.headers()[CACHE_CONTROL], "no-cache");
    assert_eq!(res.headers()[CONNECTION], "keep-alive");
    assert_eq!(res.headers()[CLIENT_ID_HEADER], "abc");

    assert!(server.service.contains("abc"));

    let mut raw = Vec::new();
    let mut decoder = Decoder::default();
    let mut events = timeout(Duration::from_secs(2), async {
        loop {
            let chunk = res.chunk().await?.ok_or_else(|| anyhow!("stream ended"))?;
            raw.extend_from_slice(&chunk);

            let events = decoder.decode(&chunk)?;
            if !events.is_empty() {
                return Ok::<_, anyhow::Error>(events);
            }
        }
    })
    .await??;

    assert!(raw.starts_with(b"data: ["));
    assert!(raw.ends_with(b"\n\n"));
    ensure!(events.len() == 1, "expected exactly one event");

    let players: Value = serde_json::from_str(&events.remove(0).data)?;
    assert_eq!(players.as_array().map(|it| it.len()), Some(7));
    Ok(())
}

#[tokio::test]
async fn test_generated_client_id() -> Result<()> {
    let server = TestServer::new().await?;

    let res = Client::new()
        .get(server.url("/sse?updateInterval=fast"))
        .send()
        .await?;

    let id = res.headers()[CLIENT_ID_HEADER].to_str()?.to_string();
    assert!(!id.is_empty());

    let session = server
        .service
        .get(&id)
        .ok_or_else(|| anyhow!("not registered"))?;

    assert_eq!(session.interval, 5000);
    Ok(())
}

#[tokio::test]
async fn test_repeated_query_parameters() -> Result<()> {
    let server = TestServer::new().await?;
    let client = Client::new();

    let res = client
        .get(server.url("/sse?clientId=a&clientId=b&updateInterval=100"))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CLIENT_ID_HEADER], "a,b");

    let session = server
        .service
        .get("a,b")
        .ok_or_else(|| anyhow!("not registered"))?;

    assert_eq!(session.interval, 100);

    let res = client
        .get(server.url("/sse?clientId=z&updateInterval=1&updateInterval=2"))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);

    let session = server
        .service
        .get("z")
        .ok_or_else(|| anyhow!("not registered"))?;

    assert_eq!(session.interval, 1);
    Ok(())
}

#[tokio::test]
async fn test_closing_stream_releases_client() -> Result<()> {
    let server = TestServer::new().await?;

    let mut res = Client::new()
        .get(server.url("/sse?clientId=abc&updateInterval=50"))
        .send()
        .await?;

    let mut decoder = Decoder::default();
    timeout(Duration::from_secs(2), read_event(&mut res, &mut decoder)).await??;

    assert!(server.service.contains("abc"));

    drop(res);
    server.wait_until_empty().await
}

#[tokio::test]
async fn test_session_admin() -> Result<()> {
    let server = TestServer::new().await?;
    let client = Client::new();

    let mut res = client
        .get(server.url("/sse?clientId=abc&updateInterval=50"))
        .send()
        .await?;

    let mut decoder = Decoder::default();
    timeout(Duration::from_secs(2), read_event(&mut res, &mut decoder)).await??;

    let session: Value = serde_json::from_str(
        &client
            .get(server.url("/session?clientId=abc"))
            .send()
            .await?
            .text()
            .await?,
    )?;

    assert_eq!(session["clientId"], "abc");
    assert_eq!(session["interval"], 50);
    assert!(session["send_frames"].as_u64().unwrap_or_default() >= 1);

    let info: Value = serde_json::from_str(&client.get(server.url("/info")).send().await?.text().await?)?;
    assert_eq!(info["clients"], 1);
    assert_eq!(info["payload"], "roster");

    let status = client
        .delete(server.url("/session?clientId=abc"))
        .send()
        .await?
        .status();

    assert_eq!(status, StatusCode::OK);

    // The stream ends once the push task is stopped.
    timeout(Duration::from_secs(5), async {
        while res.chunk().await?.is_some() {}
        Ok::<_, anyhow::Error>(())
    })
    .await??;

    let status = client
        .delete(server.url("/session?clientId=abc"))
        .send()
        .await?
        .status();

    assert_eq!(status, StatusCode::NOT_FOUND);

    let status = client
        .get(server.url("/session?clientId=abc"))
        .send()
        .await?
        .status();

    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_graceful_shutdown_ends_streams() -> Result<()> {
    let server = TestServer::new().await?;

    let mut res = Client::new()
        .get(server.url("/sse?clientId=abc&updateInterval=100000"))
        .send()
        .await?;

    let _ = server.shutdown.send(());

    timeout(Duration::from_secs(5), async {
        while res.chunk().await?.is_some() {}
        Ok::<_, anyhow::Error>(())
    })
    .await??;

    timeout(Duration::from_secs(5), server.handle).await???;
    assert!(server.service.is_empty());
    Ok(())
}
