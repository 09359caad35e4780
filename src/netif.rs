//! Local interface address lookup.
//!
//! The device has a single network interface. The engine asks which local
//! address a manager can reach the agent on (for example to fill the
//! agent-addr field of a v1 trap); the answer is whatever address that
//! interface has right now.

use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

/// Source of the default interface's configured address.
pub trait NetworkInterface: Send + Sync {
    /// Current address, or `None` while the interface is not attached.
    fn ip_address(&self) -> Option<IpAddr>;
}

/// Shared, updatable interface address.
///
/// The network-attach sequence usually completes after the transport is
/// built. Keep a clone of this handle and call [`attach`](Self::attach) once
/// the interface has an address; every clone sees the update.
///
/// ```rust
/// use snmp_bridge::netif::{InterfaceAddress, NetworkInterface};
///
/// let iface = InterfaceAddress::detached();
/// let view = iface.clone();
/// assert_eq!(view.ip_address(), None);
///
/// iface.attach("10.0.0.20".parse().unwrap());
/// assert_eq!(view.ip_address(), Some("10.0.0.20".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InterfaceAddress {
    addr: Arc<RwLock<Option<IpAddr>>>,
}

impl InterfaceAddress {
    /// Interface with a known address.
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr: Arc::new(RwLock::new(Some(addr))),
        }
    }

    /// Interface without an address yet.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Publish the interface address.
    pub fn attach(&self, addr: IpAddr) {
        *self.addr.write().unwrap_or_else(PoisonError::into_inner) = Some(addr);
        tracing::info!(target: "snmp_bridge::netif", { snmp.local_ip = %addr }, "interface attached");
    }

    /// Forget the interface address.
    pub fn detach(&self) {
        *self.addr.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::info!(target: "snmp_bridge::netif", "interface detached");
    }
}

impl NetworkInterface for InterfaceAddress {
    fn ip_address(&self) -> Option<IpAddr> {
        *self.addr.read().unwrap_or_else(PoisonError::into_inner)
    }
}
