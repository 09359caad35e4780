//! Managed objects exposed by the device.
//!
//! The transport does not interpret SNMP messages, but the engine linked on
//! top of it needs somewhere to read and write values. This module holds the
//! device's private MIB subtrees in a protocol-neutral form: an object is
//! addressed by OID arcs and yields an integer, and writes go through the
//! usual test-then-commit pair.

mod gpio;

pub use gpio::{DigitalInput, DigitalOutput, GpioGroup, GpioPerifMib, MemoryPin};

/// Private enterprise number the device registers its MIBs under.
pub const DEFAULT_ENTERPRISE: u32 = 26381;

/// `iso.org.dod.internet.private.enterprises`
pub const ENTERPRISES: [u32; 6] = [1, 3, 6, 1, 4, 1];

/// Access mode of a scalar instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// GET only.
    ReadOnly,
    /// GET and SET.
    ReadWrite,
}

/// Outcome of a MIB access, as carried in an SNMP error-status field.
///
/// Only the statuses the device's MIBs produce are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MibStatus {
    /// Operation completed successfully (status = 0).
    NoError,
    /// Unspecified error, including unknown instances (status = 5).
    GenErr,
    /// Object does not support modification (status = 17).
    NotWritable,
}

impl MibStatus {
    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::GenErr => 5,
            Self::NotWritable => 17,
        }
    }
}

impl std::fmt::Display for MibStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::GenErr => write!(f, "genErr"),
            Self::NotWritable => write!(f, "notWritable"),
        }
    }
}
