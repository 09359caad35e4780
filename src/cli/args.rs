//! Command-line arguments for the `snmp-bridge` binary.
//!
//! Every option maps onto one [`TransportBuilder`] setting.

use clap::Parser;
use std::net::IpAddr;

use crate::packet::{DEFAULT_SEGMENT_SIZE, MAX_TRANSPORT_UNIT};
use crate::transport::{SNMP_TRAP_PORT, TRAP_SENTINEL_V4, TransportBuilder};

/// Transport options.
#[derive(Debug, Parser)]
pub struct BridgeArgs {
    /// Address the response channel binds to.
    #[arg(short = 'b', long = "bind", default_value = "0.0.0.0:161")]
    pub bind: String,

    /// Address the trap channel binds to (default: ephemeral port).
    #[arg(long = "trap-bind")]
    pub trap_bind: Option<String>,

    /// Destination port that selects the trap channel.
    #[arg(long = "trap-port", default_value_t = SNMP_TRAP_PORT)]
    pub trap_port: u16,

    /// Largest datagram payload accepted or sent, in bytes.
    #[arg(long = "mtu", default_value_t = MAX_TRANSPORT_UNIT)]
    pub mtu: usize,

    /// Trap destination rewritten to the last request's source.
    #[arg(long = "trap-sentinel", default_value_t = TRAP_SENTINEL_V4)]
    pub trap_sentinel: IpAddr,

    /// Send traps to the sentinel address as-is.
    #[arg(long = "no-trap-redirect")]
    pub no_trap_redirect: bool,

    /// Packet pool budget in bytes (default: eight transport units).
    #[arg(long = "pool-budget")]
    pub pool_budget: Option<usize>,

    /// Maximum size of one buffer chain segment, in bytes.
    #[arg(long = "segment-size", default_value_t = DEFAULT_SEGMENT_SIZE)]
    pub segment_size: usize,

    /// Address reported as the agent's local address.
    #[arg(long = "local-address")]
    pub local_address: Option<IpAddr>,

    /// Kernel receive buffer size for the response channel.
    #[arg(long = "recv-buffer")]
    pub recv_buffer: Option<usize>,

    /// Enable debug logging (snmp_bridge=debug).
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Enable trace logging (snmp_bridge=trace).
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl BridgeArgs {
    /// Build a transport builder from the arguments.
    pub fn builder(&self) -> TransportBuilder {
        let mut builder = TransportBuilder::new()
            .bind(self.bind.clone())
            .trap_port(self.trap_port)
            .max_transport_unit(self.mtu)
            .segment_size(self.segment_size)
            .recv_buffer_size(self.recv_buffer);

        builder = builder.trap_sentinel((!self.no_trap_redirect).then_some(self.trap_sentinel));
        if let Some(addr) = &self.trap_bind {
            builder = builder.trap_bind(addr.clone());
        }
        if let Some(budget) = self.pool_budget {
            builder = builder.pool_budget(budget);
        }
        if let Some(ip) = self.local_address {
            builder = builder.interface_address(ip);
        }
        builder
    }

    /// Initialize tracing based on debug/trace flags.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = if self.trace {
            "snmp_bridge=trace"
        } else if self.debug {
            "snmp_bridge=debug"
        } else {
            "snmp_bridge=info"
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .try_init();
    }
}
