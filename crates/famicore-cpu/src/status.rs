//! CPU status register (P) flags.
//!
//! ```text
//! 7  6  5  4  3  2  1  0
//! N  V  U  B  D  I  Z  C
//! │  │  │  │  │  │  │  └─ Carry
//! │  │  │  │  │  │  └──── Zero
//! │  │  │  │  │  └─────── Interrupt Disable
//! │  │  │  │  └────────── Decimal (latches but has no effect on the 2A03)
//! │  │  │  └───────────── Break (1 when pushed by PHP/BRK, 0 by IRQ/NMI)
//! │  │  └──────────────── Unused (reads 1, always 1 when pushed)
//! │  └─────────────────── Overflow
//! └────────────────────── Negative
//! ```

use bitflags::bitflags;

bitflags! {
    /// CPU status register flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Carry.
        const C = 1 << 0;
        /// Zero.
        const Z = 1 << 1;
        /// Interrupt disable. Gates IRQ, never NMI.
        const I = 1 << 2;
        /// Decimal mode. Latched but ignored by the NES ALU.
        const D = 1 << 3;
        /// Break. Only meaningful in stack copies of P.
        const B = 1 << 4;
        /// Unused. Reads as 1.
        const U = 1 << 5;
        /// Overflow.
        const V = 1 << 6;
        /// Negative.
        const N = 1 << 7;
    }
}

impl Status {
    /// Status after power-on or reset: I and U set.
    pub const POWER_ON: Self = Self::I.union(Self::U);

    /// Create a status register in the power-on state.
    #[must_use]
    pub const fn new() -> Self {
        Self::POWER_ON
    }

    /// Update Z and N from a result value.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.set(Self::Z, value == 0);
        self.set(Self::N, value & 0x80 != 0);
    }

    /// Byte image for a stack push. U is always set; B depends on whether the
    /// push originates from software (PHP/BRK) or an interrupt.
    #[inline]
    #[must_use]
    pub const fn to_stack_byte(self, from_software: bool) -> u8 {
        let mut value = self.bits() | Self::U.bits();
        if from_software {
            value |= Self::B.bits();
        }
        value
    }

    /// Rebuild the register from a byte pulled off the stack.
    /// B is discarded and U forced on.
    #[inline]
    #[must_use]
    pub fn from_stack_byte(value: u8) -> Self {
        Self::from_bits_truncate((value & !Self::B.bits()) | Self::U.bits())
    }
}
