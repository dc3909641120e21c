#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use sse_push_server::config::Config;

fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load());
    simple_logger::init_with_level(config.log_level.as_level())?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads.max(1))
        .enable_all()
        .build()?
        .block_on(sse_push_server::startup(config))
}
