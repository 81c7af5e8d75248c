use clap::Parser;
use log::info;
use server::network::WsServer;
use server::registry::RegistryHandle;

/// Authoritative two-player snake arena server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3001")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    // One registry for the process lifetime, threaded through every
    // connection task.
    let registry = RegistryHandle::new();
    let address = format!("{}:{}", args.host, args.port);
    let server = WsServer::new(&address, registry).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
