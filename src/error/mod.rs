//! Error types for snmp-bridge.
//!
//! This module provides:
//!
//! - [`Error`] - The main error type covering every transport failure
//! - [`ErrorClass`] - The failure taxonomy each error belongs to
//!
//! # Error Handling
//!
//! Errors are boxed for efficiency: `Result<T> = Result<T, Box<Error>>`.
//!
//! ```rust
//! use snmp_bridge::{Error, ErrorClass, Result};
//!
//! fn report(result: Result<()>) {
//!     match result {
//!         Ok(()) => println!("sent"),
//!         Err(e) => match e.class() {
//!             ErrorClass::AddressInvalid => println!("no usable destination: {}", e),
//!             ErrorClass::PartialSend => println!("datagram truncated: {}", e),
//!             _ => println!("error: {}", e),
//!         },
//!     }
//! }
//! ```

use std::net::{IpAddr, SocketAddr};

use crate::transport::Channel;

/// Result type alias using the library's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Failure taxonomy.
///
/// Each [`Error`] belongs to exactly one class. The class decides how the
/// failure is handled: fatal startup errors abort initialization, everything
/// else drops the datagram or fails the single send that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A channel could not be opened or bound.
    FatalStartup,
    /// The receive call failed or yielded no datagram.
    TransientReceive,
    /// The packet pool could not satisfy an allocation.
    ResourceExhaustion,
    /// A copy between the chained buffer and the flat region moved the wrong
    /// number of bytes, or the payload does not fit a single datagram.
    CopyIntegrity,
    /// The destination is unusable or the trap redirect target is unknown.
    AddressInvalid,
    /// The socket accepted fewer bytes than requested.
    PartialSend,
    /// The socket rejected the send outright.
    Transport,
    /// Invalid configuration.
    Config,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FatalStartup => write!(f, "fatal-startup"),
            Self::TransientReceive => write!(f, "transient-receive"),
            Self::ResourceExhaustion => write!(f, "resource-exhaustion"),
            Self::CopyIntegrity => write!(f, "copy-integrity"),
            Self::AddressInvalid => write!(f, "address-invalid"),
            Self::PartialSend => write!(f, "partial-send"),
            Self::Transport => write!(f, "transport"),
            Self::Config => write!(f, "config"),
        }
    }
}

/// The main error type for all snmp-bridge operations.
///
/// Errors are boxed (via [`Result`]) to keep the size small on the stack.
///
/// ```
/// use snmp_bridge::{Error, ErrorClass};
///
/// fn is_drop(error: &Error) -> bool {
///     matches!(
///         error.class(),
///         ErrorClass::TransientReceive | ErrorClass::ResourceExhaustion
///     )
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Opening or binding a channel failed.
    #[error("failed to open {channel} channel on {addr}: {source}")]
    Bind {
        channel: Channel,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The receive call on a channel failed.
    #[error("receive on {channel} channel failed: {source}")]
    Receive {
        channel: Channel,
        #[source]
        source: std::io::Error,
    },

    /// A zero-length datagram arrived; treated as no datagram.
    #[error("empty datagram from {source_addr}")]
    EmptyDatagram { source_addr: SocketAddr },

    /// Payload larger than the maximum transport unit.
    #[error("payload of {len} bytes exceeds maximum transport unit of {max}")]
    Oversized { len: usize, max: usize },

    /// The packet pool could not allocate the requested bytes.
    #[error("packet allocation of {requested} bytes failed ({available} available)")]
    Allocation { requested: usize, available: usize },

    /// A buffer copy moved a different number of bytes than declared.
    #[error("buffer copy moved {copied} of {expected} bytes")]
    ShortCopy { expected: usize, copied: usize },

    /// The destination address cannot be sent to.
    #[error("invalid destination {target}")]
    InvalidDestination { target: SocketAddr },

    /// A trap was addressed to the sentinel before any request arrived.
    #[error("trap addressed to sentinel {sentinel} but no request source is known")]
    NoRedirectTarget { sentinel: IpAddr },

    /// The socket rejected the send.
    #[error("send of {len} bytes on {channel} channel to {target} failed: {source}")]
    Send {
        channel: Channel,
        target: SocketAddr,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    /// The socket accepted fewer bytes than the payload.
    #[error("send on {channel} channel to {target} incomplete: expected {expected} but {sent}")]
    PartialSend {
        channel: Channel,
        target: SocketAddr,
        expected: usize,
        sent: usize,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(Box<str>),
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// The taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Bind { .. } => ErrorClass::FatalStartup,
            Self::Receive { .. } | Self::EmptyDatagram { .. } => ErrorClass::TransientReceive,
            Self::Allocation { .. } => ErrorClass::ResourceExhaustion,
            Self::Oversized { .. } | Self::ShortCopy { .. } => ErrorClass::CopyIntegrity,
            Self::InvalidDestination { .. } | Self::NoRedirectTarget { .. } => {
                ErrorClass::AddressInvalid
            }
            Self::Send { .. } => ErrorClass::Transport,
            Self::PartialSend { .. } => ErrorClass::PartialSend,
            Self::Config(_) => ErrorClass::Config,
        }
    }
}
