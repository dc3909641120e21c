use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
};

use clap::Parser;
use service::{options::DEFAULT_UPDATE_INTERVAL, payload::PayloadKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Config {
    /// host:
    ///
    /// the address the http server binds to, both ipv4 and ipv6 are
    /// supported.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// port:
    ///
    /// the port the http server listens on.
    #[arg(long, short, env = "PORT", default_value_t = 4001)]
    pub port: u16,

    /// payload:
    ///
    /// what every event carries, `roster` sends a randomized snapshot of
    /// the player roster as json, `timestamp` sends the current time as
    /// plain text.
    #[arg(long, env = "PAYLOAD", default_value = "roster")]
    pub payload: PayloadKind,

    /// update interval:
    ///
    /// the interval in milliseconds used for clients that do not request one
    /// with the `updateInterval` query parameter.
    #[arg(
        long,
        env = "UPDATE_INTERVAL",
        default_value_t = DEFAULT_UPDATE_INTERVAL,
        allow_negative_numbers = true
    )]
    pub update_interval: i64,

    /// buffer size:
    ///
    /// the number of frames a client may have pending. Once a client that
    /// does not read fast enough has this many frames waiting, new frames
    /// for it are dropped until it catches up.
    #[arg(long, env = "BUFFER_SIZE", default_value_t = 16)]
    pub buffer_size: usize,

    /// threads:
    ///
    /// the number of worker threads of the runtime, defaults to the number
    /// of cpu cores.
    #[arg(long, env = "THREADS", default_value_t = num_cpus::get())]
    pub threads: usize,

    /// log level:
    ///
    /// one of `error`, `warn`, `info`, `debug`, `trace`.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4001,
            payload: PayloadKind::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            buffer_size: 16,
            threads: num_cpus::get(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configure from command line parameters and environment
    /// variables, command line parameters take precedence.
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn listen(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
