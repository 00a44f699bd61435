use std::sync::Arc;

use boombox_core::{Config, Coordinator};
use boombox_server::{init_logger, run_server};
use log::info;

#[tokio::main]
async fn main() {
    init_logger();

    info!("Starting boombox...");

    let coordinator = Arc::new(Coordinator::new(Config::default()));

    run_server(coordinator).await;
}
