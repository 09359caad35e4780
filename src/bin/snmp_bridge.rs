//! snmp-bridge: run the agent transport with a reflector engine.
//!
//! Every datagram received on the agent port is echoed back to its sender,
//! which is enough to check bind addresses and firewall rules with
//! `nc -u` before a real engine is linked.

use clap::Parser;
use snmp_bridge::cli::args::BridgeArgs;
use snmp_bridge::{Engine, PacketBuf, ReceiveLoop, TransportContext};
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// SNMP agent transport with an echoing engine.
#[derive(Debug, Parser)]
#[command(name = "snmp-bridge", version, about)]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
}

struct Reflector;

impl Engine for Reflector {
    async fn handle(&mut self, ctx: &mut TransportContext, packet: PacketBuf, source: SocketAddr) {
        // failures are logged by the transport
        let _ = ctx.send(&packet, source.ip(), source.port()).await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.bridge.init_tracing();

    let ctx = match args.bridge.builder().open().await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    ReceiveLoop::new(ctx, Reflector)
        .with_cancel(cancel)
        .run()
        .await;
    ExitCode::SUCCESS
}
