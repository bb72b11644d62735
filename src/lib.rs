pub mod cli;
pub mod error;
pub mod history;
pub mod intake;
pub mod models;
pub mod relay;
pub mod server;
pub mod session;
pub mod store;

use cli::Args;
use log::info;
use relay::LlmRelay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("LLM Service URL: {}", args.llm_service_url);
    info!("Allowed Origin: {}", args.allowed_origin);
    info!("Conversation Store URL: {}", args.store_base_url);
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let relay = Arc::new(LlmRelay::new(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, relay, args);
    server.run().await?;

    Ok(())
}
