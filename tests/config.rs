use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Result;
use clap::Parser;
use service::payload::PayloadKind;
use sse_push_server::config::{Config, LogLevel};

#[test]
fn test_parse_command_line() -> Result<()> {
    let config = Config::try_parse_from([
        "sse-push-server",
        "--host",
        "127.0.0.1",
        "--port",
        "8080",
        "--payload",
        "timestamp",
        "--update-interval",
        "-1",
        "--buffer-size",
        "4",
        "--threads",
        "2",
        "--log-level",
        "debug",
    ])?;

    assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.port, 8080);
    assert_eq!(config.payload, PayloadKind::Timestamp);
    assert_eq!(config.update_interval, -1);
    assert_eq!(config.buffer_size, 4);
    assert_eq!(config.threads, 2);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.listen(), SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)));
    Ok(())
}

#[test]
fn test_reject_unknown_values() {
    assert!(Config::try_parse_from(["sse-push-server", "--payload", "weather"]).is_err());
    assert!(Config::try_parse_from(["sse-push-server", "--log-level", "loud"]).is_err());
    assert!(Config::try_parse_from(["sse-push-server", "--port", "70000"]).is_err());
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 4001);
    assert_eq!(config.update_interval, 5000);
    assert_eq!(config.payload, PayloadKind::Roster);
    assert_eq!(config.log_level.as_level(), log::Level::Info);
}
