//! Command-line support for the `snmp-bridge` binary.

pub mod args;
