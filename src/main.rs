use ops_http::{logging, OpsServer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let server = OpsServer::builder().spawn();
    info!(port = server.port(), "operational endpoints listening");

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}
