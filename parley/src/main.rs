use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use args::Args;
use clap::Parser;
use config::Config;
use server::ServeConfig;

mod args;
mod logger;

const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8000));

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init(&args)?;

    let config = args.config()?;

    if let Err(e) = server::serve(serve_config(&args, config)).await {
        log::error!("Server failed to start: {e}");
        std::process::exit(1);
    }

    Ok(())
}

fn serve_config(args: &Args, config: Config) -> ServeConfig {
    let listen_address = args
        .listen_address
        .or(config.server.listen_address)
        .unwrap_or(DEFAULT_LISTEN_ADDRESS);

    ServeConfig { listen_address, config }
}
