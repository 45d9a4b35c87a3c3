//! 6502 disassembler.
//!
//! Formats single instructions in the conventional nestest style. Reads go
//! through [`Bus::peek`] so disassembling never perturbs hardware registers.

use crate::bus::Bus;
use crate::opcodes::{AddrMode, OPCODE_TABLE};

/// Disassemble the instruction at `addr`.
///
/// Returns the formatted text and the address of the following instruction.
pub fn disassemble(bus: &impl Bus, addr: u16) -> (String, u16) {
    let opcode = bus.peek(addr);
    let info = &OPCODE_TABLE[opcode as usize];
    let mnemonic = info.instruction.mnemonic();

    let lo = bus.peek(addr.wrapping_add(1));
    let hi = bus.peek(addr.wrapping_add(2));
    let word = u16::from_le_bytes([lo, hi]);
    let next = addr.wrapping_add(1).wrapping_add(info.mode.operand_len());

    let text = match info.mode {
        AddrMode::Implied => mnemonic.to_string(),
        AddrMode::Accumulator => format!("{mnemonic} A"),
        AddrMode::Immediate => format!("{mnemonic} #${lo:02X}"),
        AddrMode::ZeroPage => format!("{mnemonic} ${lo:02X}"),
        AddrMode::ZeroPageX => format!("{mnemonic} ${lo:02X},X"),
        AddrMode::ZeroPageY => format!("{mnemonic} ${lo:02X},Y"),
        AddrMode::Relative => {
            let target = next.wrapping_add((lo as i8) as u16);
            format!("{mnemonic} ${target:04X}")
        }
        AddrMode::Absolute => format!("{mnemonic} ${word:04X}"),
        AddrMode::AbsoluteX => format!("{mnemonic} ${word:04X},X"),
        AddrMode::AbsoluteY => format!("{mnemonic} ${word:04X},Y"),
        AddrMode::Indirect => format!("{mnemonic} (${word:04X})"),
        AddrMode::IndexedIndirect => format!("{mnemonic} (${lo:02X},X)"),
        AddrMode::IndirectIndexed => format!("{mnemonic} (${lo:02X}),Y"),
    };

    (text, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatBus {
        memory: [u8; 0x10000],
    }

    impl Bus for FlatBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.memory[addr as usize]
        }

        fn write(&mut self, addr: u16, value: u8) {
            self.memory[addr as usize] = value;
        }

        fn peek(&self, addr: u16) -> u8 {
            self.memory[addr as usize]
        }
    }

    fn bus_with(addr: u16, bytes: &[u8]) -> FlatBus {
        let mut bus = FlatBus {
            memory: [0; 0x10000],
        };
        let base = addr as usize;
        bus.memory[base..base + bytes.len()].copy_from_slice(bytes);
        bus
    }

    #[test]
    fn immediate_and_length() {
        let bus = bus_with(0x8000, &[0xA9, 0x42]);
        let (text, next) = disassemble(&bus, 0x8000);
        assert_eq!(text, "LDA #$42");
        assert_eq!(next, 0x8002);
    }

    #[test]
    fn absolute_indexed() {
        let bus = bus_with(0x8000, &[0x9D, 0x00, 0x02]);
        let (text, next) = disassemble(&bus, 0x8000);
        assert_eq!(text, "STA $0200,X");
        assert_eq!(next, 0x8003);
    }

    #[test]
    fn relative_target() {
        // BNE +$10 from $8000: target = $8002 + $10.
        let bus = bus_with(0x8000, &[0xD0, 0x10]);
        let (text, _) = disassemble(&bus, 0x8000);
        assert_eq!(text, "BNE $8012");

        // Negative offset.
        let bus = bus_with(0x8000, &[0xD0, 0xFE]);
        let (text, _) = disassemble(&bus, 0x8000);
        assert_eq!(text, "BNE $8000");
    }

    #[test]
    fn indirect_jmp() {
        let bus = bus_with(0x8000, &[0x6C, 0x34, 0x12]);
        let (text, _) = disassemble(&bus, 0x8000);
        assert_eq!(text, "JMP ($1234)");
    }

    #[test]
    fn implied_and_accumulator() {
        let bus = bus_with(0x8000, &[0xEA, 0x0A]);
        assert_eq!(disassemble(&bus, 0x8000).0, "NOP");
        assert_eq!(disassemble(&bus, 0x8001).0, "ASL A");
    }
}
