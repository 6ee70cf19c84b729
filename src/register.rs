//! Register file backing every sequencer's state.
//!
//! Registers are fixed-width unsigned cells. A [`Reg`] handle is handed out on
//! allocation and is the only way rules and actions refer to a register.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::machine::MachineError;

/// Widest register the file can hold.
pub const MAX_WIDTH: u32 = 64;

/// Largest value representable in `width` bits.
pub fn max_value(width: u32) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Handle to an allocated register.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg {
    id: usize,
    name: Arc<str>,
    width: u32,
}

impl Reg {
    /// Position of this register in its register file.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Name given at allocation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    name: Arc<str>,
    width: u32,
    max: u64,
    value: u64,
}

impl Slot {
    fn accepts(&self, value: u64) -> Result<(), MachineError> {
        if value > max_value(self.width) {
            return Err(MachineError::ValueOutOfRange {
                register: self.name.to_string(),
                value,
                width: self.width,
            });
        }
        if value > self.max {
            return Err(MachineError::AboveBound {
                register: self.name.to_string(),
                value,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Ordered set of named registers and their current values.
///
/// Serializable so a machine's state can be snapshotted and restored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    slots: Vec<Slot>,
}

impl Registers {
    /// Create an empty register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated registers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocate a register of `width` bits holding `init`.
    pub fn alloc(
        &mut self,
        name: impl Into<Arc<str>>,
        width: u32,
        init: u64,
    ) -> Result<Reg, MachineError> {
        if width == 0 || width > MAX_WIDTH {
            return Err(MachineError::InvalidWidth { width });
        }
        self.alloc_bounded(name, width, init, max_value(width))
    }

    /// Allocate a register of `width` bits whose value never exceeds `max`.
    ///
    /// Writes and restored snapshots above `max` are rejected.
    pub fn alloc_bounded(
        &mut self,
        name: impl Into<Arc<str>>,
        width: u32,
        init: u64,
        max: u64,
    ) -> Result<Reg, MachineError> {
        if width == 0 || width > MAX_WIDTH {
            return Err(MachineError::InvalidWidth { width });
        }
        let name = name.into();
        if max > max_value(width) {
            return Err(MachineError::ValueOutOfRange {
                register: name.to_string(),
                value: max,
                width,
            });
        }
        let slot = Slot {
            name: name.clone(),
            width,
            max,
            value: init,
        };
        slot.accepts(init)?;
        let id = self.slots.len();
        self.slots.push(slot);
        Ok(Reg { id, name, width })
    }

    /// Current value of `reg`, or `None` if the handle belongs to another file.
    pub fn get(&self, reg: &Reg) -> Option<u64> {
        self.slot(reg).map(|slot| slot.value)
    }

    /// Current value of `reg`; unknown handles read as zero.
    pub(crate) fn value(&self, reg: &Reg) -> u64 {
        self.get(reg).unwrap_or(0)
    }

    /// Largest value `reg` may hold, or `None` for a foreign handle.
    pub fn bound(&self, reg: &Reg) -> Option<u64> {
        self.slot(reg).map(|slot| slot.max)
    }

    fn slot(&self, reg: &Reg) -> Option<&Slot> {
        self.slots
            .get(reg.id)
            .filter(|slot| slot.name == reg.name && slot.width == reg.width)
    }

    /// Check that `value` may be written to `reg`.
    pub fn check(&self, reg: &Reg, value: u64) -> Result<(), MachineError> {
        self.slot(reg)
            .ok_or_else(|| MachineError::UnknownRegister(reg.name.to_string()))?
            .accepts(value)
    }

    /// Overwrite `reg` with `value`.
    pub fn set(&mut self, reg: &Reg, value: u64) -> Result<(), MachineError> {
        self.check(reg, value)?;
        self.slots[reg.id].value = value;
        Ok(())
    }

    /// Returns `true` if `other` has the same names, widths and bounds in the
    /// same order.
    pub fn same_layout(&self, other: &Registers) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| a.name == b.name && a.width == b.width && a.max == b.max)
    }

    /// Check every held value against its register's width and bound.
    pub fn validate(&self) -> Result<(), MachineError> {
        self.slots.iter().try_for_each(|slot| slot.accepts(slot.value))
    }

    /// Iterate `(name, width, value)` for every register in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32, u64)> {
        self.slots
            .iter()
            .map(|slot| (&*slot.name, slot.width, slot.value))
    }
}
