//! GPIO peripheral MIB: `enterprises.<n>.1`.
//!
//! ```text
//! .1.<id>.0   button <id>   INTEGER  read-only
//! .2.<id>.0   LED <id>      INTEGER  read-write
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Access, ENTERPRISES, MibStatus};

/// A pin that can be sampled.
pub trait DigitalInput: Send + Sync {
    /// Current level.
    fn is_high(&self) -> bool;
}

/// A pin that can be driven.
pub trait DigitalOutput: Send + Sync {
    /// Level last written.
    fn is_set_high(&self) -> bool;

    /// Drive the pin.
    fn set_level(&self, high: bool);
}

/// In-memory pin, for hosts without GPIO.
///
/// Clones share the level, so a test can keep one clone to press a button
/// or observe an LED.
#[derive(Debug, Clone, Default)]
pub struct MemoryPin(Arc<AtomicBool>);

impl MemoryPin {
    /// Create a pin at `level`.
    pub fn new(level: bool) -> Self {
        Self(Arc::new(AtomicBool::new(level)))
    }
}

impl DigitalInput for MemoryPin {
    fn is_high(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl DigitalOutput for MemoryPin {
    fn is_set_high(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set_level(&self, high: bool) {
        self.0.store(high, Ordering::Relaxed);
    }
}

/// Subtree of the GPIO MIB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioGroup {
    /// `.1`, push buttons.
    Buttons,
    /// `.2`, LEDs.
    Leds,
}

impl GpioGroup {
    fn arc(self) -> u32 {
        match self {
            Self::Buttons => 1,
            Self::Leds => 2,
        }
    }

    fn access(self) -> Access {
        match self {
            Self::Buttons => Access::ReadOnly,
            Self::Leds => Access::ReadWrite,
        }
    }
}

/// The GPIO peripheral MIB with two buttons and two LEDs.
///
/// # Example
///
/// ```rust
/// use snmp_bridge::mib::{GpioGroup, GpioPerifMib, MemoryPin, MibStatus};
///
/// let led = MemoryPin::default();
/// let mib = GpioPerifMib::new(
///     26381,
///     [MemoryPin::default(), MemoryPin::default()],
///     [led.clone(), MemoryPin::default()],
/// );
///
/// assert_eq!(mib.set_test(GpioGroup::Leds, 1), MibStatus::NoError);
/// assert_eq!(mib.set_commit(GpioGroup::Leds, 1, 42), MibStatus::NoError);
/// assert_eq!(mib.get(GpioGroup::Leds, 1), Ok(1));
/// ```
pub struct GpioPerifMib<I = MemoryPin, O = MemoryPin> {
    base: Vec<u32>,
    buttons: [I; 2],
    leds: [O; 2],
}

impl<I: DigitalInput, O: DigitalOutput> GpioPerifMib<I, O> {
    /// Create the MIB under `enterprises.<enterprise>.1`.
    pub fn new(enterprise: u32, buttons: [I; 2], leds: [O; 2]) -> Self {
        let mut base = ENTERPRISES.to_vec();
        base.extend([enterprise, 1]);
        Self {
            base,
            buttons,
            leds,
        }
    }

    /// OID of the subtree root.
    pub fn base_oid(&self) -> &[u32] {
        &self.base
    }

    /// Map an instance OID (`base.<group>.<id>.0`) to its group and id.
    pub fn resolve(&self, oid: &[u32]) -> Option<(GpioGroup, u32)> {
        let rest = oid.strip_prefix(self.base.as_slice())?;
        let group = match rest {
            [1, _, 0] => GpioGroup::Buttons,
            [2, _, 0] => GpioGroup::Leds,
            _ => return None,
        };
        Some((group, rest[1]))
    }

    /// Every instance with its OID and access mode, in lexicographic order.
    pub fn instances(&self) -> Vec<(Vec<u32>, Access)> {
        [GpioGroup::Buttons, GpioGroup::Leds]
            .into_iter()
            .flat_map(|group| {
                (1..=2).map(move |id| {
                    let mut oid = self.base.clone();
                    oid.extend([group.arc(), id, 0]);
                    (oid, group.access())
                })
            })
            .collect()
    }

    /// Read an instance: 1 for high, 0 for low.
    pub fn get(&self, group: GpioGroup, id: u32) -> Result<i32, MibStatus> {
        let level = match (group, slot(id)) {
            (GpioGroup::Buttons, Some(i)) => self.buttons[i].is_high(),
            (GpioGroup::Leds, Some(i)) => self.leds[i].is_set_high(),
            (_, None) => {
                tracing::debug!(target: "snmp_bridge::mib", { snmp.group = ?group, snmp.id = id }, "get: unknown id");
                return Err(MibStatus::GenErr);
            }
        };
        Ok(i32::from(level))
    }

    /// Check that a SET of an instance can proceed.
    pub fn set_test(&self, group: GpioGroup, id: u32) -> MibStatus {
        match (group, slot(id)) {
            (GpioGroup::Buttons, _) => MibStatus::NotWritable,
            (GpioGroup::Leds, Some(_)) => MibStatus::NoError,
            (GpioGroup::Leds, None) => {
                tracing::debug!(target: "snmp_bridge::mib", { snmp.id = id }, "set_test: unknown LED");
                MibStatus::GenErr
            }
        }
    }

    /// Write an LED. Any non-zero value turns it on.
    pub fn set_commit(&self, group: GpioGroup, id: u32, value: i32) -> MibStatus {
        match (group, slot(id)) {
            (GpioGroup::Buttons, _) => MibStatus::NotWritable,
            (GpioGroup::Leds, Some(i)) => {
                self.leds[i].set_level(value != 0);
                tracing::debug!(target: "snmp_bridge::mib", { snmp.id = id, snmp.value = value }, "LED set");
                MibStatus::NoError
            }
            (GpioGroup::Leds, None) => {
                tracing::debug!(target: "snmp_bridge::mib", { snmp.id = id }, "set_commit: unknown LED");
                MibStatus::GenErr
            }
        }
    }
}

fn slot(id: u32) -> Option<usize> {
    match id {
        1 => Some(0),
        2 => Some(1),
        _ => None,
    }
}
