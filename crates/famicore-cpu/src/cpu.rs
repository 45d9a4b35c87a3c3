//! 6502 interpreter core.
//!
//! Instruction-level emulation: each `step` runs one whole instruction (or
//! one interrupt entry) and returns the cycles it consumed, including
//! page-crossing and branch penalties. Timing below the instruction boundary
//! is not modeled.

use crate::bus::Bus;
use crate::opcodes::{AddrMode, Instruction, OPCODE_TABLE};
use crate::status::Status;
use crate::vectors;

/// Resolved operand location for the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    /// Implied instructions carry no operand.
    None,
    /// The accumulator itself (shift/rotate register forms).
    Accumulator,
    /// An effective memory address (branch targets included).
    Address(u16),
}

/// MOS 6502 CPU as found in the NES (2A03: decimal mode disabled).
#[derive(Debug, Clone)]
pub struct Cpu {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Program counter.
    pub pc: u16,
    /// Stack pointer into $0100-$01FF.
    pub sp: u8,
    /// Status flags.
    pub status: Status,
    /// Total cycles executed since power-on.
    cycles: u64,
    /// Cycles the CPU is stalled for (DMC DMA).
    stall: u32,
    /// Edge-triggered NMI latch.
    nmi_pending: bool,
    /// Level-triggered IRQ line.
    irq_pending: bool,
}

impl Cpu {
    /// Create a CPU in power-on state. Call [`Cpu::reset`] before running.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xFD,
            status: Status::POWER_ON,
            cycles: 0,
            stall: 0,
            nmi_pending: false,
            irq_pending: false,
        }
    }

    /// Reset sequence: SP lands at $FD, I set, PC loaded from the reset
    /// vector at $FFFC. Takes 7 cycles.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.sp = 0xFD;
        self.status = Status::POWER_ON;
        self.pc = bus.read_u16(vectors::RESET);
        self.cycles += 7;
        self.stall = 0;
        self.nmi_pending = false;
        self.irq_pending = false;
    }

    /// Execute one instruction (or service a pending interrupt) and return
    /// the cycles consumed.
    pub fn step(&mut self, bus: &mut impl Bus) -> u8 {
        if self.stall > 0 {
            self.stall -= 1;
            self.cycles += 1;
            return 1;
        }

        // NMI is edge triggered: the latch clears once serviced and does not
        // re-fire until raised again.
        if self.nmi_pending {
            self.nmi_pending = false;
            return self.interrupt(bus, vectors::NMI);
        }

        // IRQ is level triggered and gated by the I flag; the system re-raises
        // the line every instruction while a source holds it.
        if self.irq_pending && !self.status.contains(Status::I) {
            return self.interrupt(bus, vectors::IRQ);
        }

        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let info = &OPCODE_TABLE[opcode as usize];
        if !info.official {
            log::trace!(
                "undefined opcode {opcode:#04X} at {:#06X} executed as NOP",
                self.pc.wrapping_sub(1)
            );
        }

        let (operand, page_crossed) = self.resolve(bus, info.mode);

        let mut cycles = info.cycles;
        if page_crossed && info.page_penalty {
            cycles += 1;
        }
        cycles += self.execute(bus, info.instruction, operand);

        self.cycles += u64::from(cycles);
        cycles
    }

    /// Run whole instructions until at least `count` cycles have elapsed.
    pub fn execute_cycles(&mut self, bus: &mut impl Bus, count: u32) {
        let target = self.cycles + u64::from(count);
        while self.cycles < target {
            self.step(bus);
        }
    }

    /// Raise the NMI line (edge triggered).
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Assert the IRQ line.
    pub fn trigger_irq(&mut self) {
        self.irq_pending = true;
    }

    /// Set the IRQ line level. Fires at every instruction boundary while the
    /// line is held and I is clear.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_pending = asserted;
    }

    /// Current IRQ line level.
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.irq_pending
    }

    /// Total cycles executed since power-on.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Account externally-consumed cycles (OAM DMA runs on the bus but stalls
    /// the CPU clock).
    pub fn add_cycles(&mut self, count: u32) {
        self.cycles += u64::from(count);
    }

    /// Stall the CPU for `count` cycles (DMC sample fetches).
    pub fn stall(&mut self, count: u32) {
        self.stall += count;
    }

    /// Serialize registers and counters.
    pub fn save_state(&self, out: &mut Vec<u8>) {
        out.push(self.a);
        out.push(self.x);
        out.push(self.y);
        out.extend_from_slice(&self.pc.to_le_bytes());
        out.push(self.sp);
        out.push(self.status.bits());
        out.extend_from_slice(&self.cycles.to_le_bytes());
        out.extend_from_slice(&self.stall.to_le_bytes());
        out.push(u8::from(self.nmi_pending));
        out.push(u8::from(self.irq_pending));
    }

    /// Restore registers and counters. Returns the bytes consumed, or `None`
    /// if the buffer is too short.
    pub fn load_state(&mut self, bytes: &[u8]) -> Option<usize> {
        const LEN: usize = 21;
        if bytes.len() < LEN {
            return None;
        }
        self.a = bytes[0];
        self.x = bytes[1];
        self.y = bytes[2];
        self.pc = u16::from_le_bytes([bytes[3], bytes[4]]);
        self.sp = bytes[5];
        self.status = Status::from_bits_truncate(bytes[6]) | Status::U;
        self.cycles = u64::from_le_bytes(bytes[7..15].try_into().ok()?);
        self.stall = u32::from_le_bytes(bytes[15..19].try_into().ok()?);
        self.nmi_pending = bytes[19] != 0;
        self.irq_pending = bytes[20] != 0;
        Some(LEN)
    }

    // ---------------------------------------------------------------------
    // Addressing
    // ---------------------------------------------------------------------

    /// Compute the operand location for `mode`, advancing PC past the operand
    /// bytes. The bool reports whether indexing crossed a page.
    fn resolve(&mut self, bus: &mut impl Bus, mode: AddrMode) -> (Operand, bool) {
        match mode {
            AddrMode::Implied => (Operand::None, false),
            AddrMode::Accumulator => (Operand::Accumulator, false),
            AddrMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (Operand::Address(addr), false)
            }
            AddrMode::ZeroPage => {
                let addr = u16::from(bus.read(self.pc));
                self.pc = self.pc.wrapping_add(1);
                (Operand::Address(addr), false)
            }
            AddrMode::ZeroPageX => {
                let base = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                (Operand::Address(u16::from(base.wrapping_add(self.x))), false)
            }
            AddrMode::ZeroPageY => {
                let base = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                (Operand::Address(u16::from(base.wrapping_add(self.y))), false)
            }
            AddrMode::Relative => {
                let offset = bus.read(self.pc) as i8;
                self.pc = self.pc.wrapping_add(1);
                let target = self.pc.wrapping_add(offset as u16);
                (Operand::Address(target), false)
            }
            AddrMode::Absolute => {
                let addr = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                (Operand::Address(addr), false)
            }
            AddrMode::AbsoluteX => {
                let base = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(u16::from(self.x));
                (Operand::Address(addr), pages_differ(base, addr))
            }
            AddrMode::AbsoluteY => {
                let base = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(u16::from(self.y));
                (Operand::Address(addr), pages_differ(base, addr))
            }
            AddrMode::Indirect => {
                let ptr = bus.read_u16(self.pc);
                self.pc = self.pc.wrapping_add(2);
                // The page-wrap read reproduces the JMP ($xxFF) hardware bug.
                let addr = bus.read_u16_wrap(ptr);
                (Operand::Address(addr), false)
            }
            AddrMode::IndexedIndirect => {
                let base = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let ptr = u16::from(base.wrapping_add(self.x));
                let addr = bus.read_u16_wrap(ptr);
                (Operand::Address(addr), false)
            }
            AddrMode::IndirectIndexed => {
                let ptr = u16::from(bus.read(self.pc));
                self.pc = self.pc.wrapping_add(1);
                let base = bus.read_u16_wrap(ptr);
                let addr = base.wrapping_add(u16::from(self.y));
                (Operand::Address(addr), pages_differ(base, addr))
            }
        }
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    /// Execute the decoded instruction. Returns extra cycles (branches only).
    #[allow(clippy::too_many_lines)]
    fn execute(&mut self, bus: &mut impl Bus, instruction: Instruction, operand: Operand) -> u8 {
        use Instruction as I;

        match instruction {
            // Loads and stores
            I::Lda => {
                self.a = self.fetch(bus, operand);
                self.status.set_zn(self.a);
            }
            I::Ldx => {
                self.x = self.fetch(bus, operand);
                self.status.set_zn(self.x);
            }
            I::Ldy => {
                self.y = self.fetch(bus, operand);
                self.status.set_zn(self.y);
            }
            I::Sta => self.store(bus, operand, self.a),
            I::Stx => self.store(bus, operand, self.x),
            I::Sty => self.store(bus, operand, self.y),

            // Transfers
            I::Tax => {
                self.x = self.a;
                self.status.set_zn(self.x);
            }
            I::Tay => {
                self.y = self.a;
                self.status.set_zn(self.y);
            }
            I::Txa => {
                self.a = self.x;
                self.status.set_zn(self.a);
            }
            I::Tya => {
                self.a = self.y;
                self.status.set_zn(self.a);
            }
            I::Tsx => {
                self.x = self.sp;
                self.status.set_zn(self.x);
            }
            I::Txs => self.sp = self.x, // no flags

            // Stack
            I::Pha => self.push(bus, self.a),
            I::Php => self.push(bus, self.status.to_stack_byte(true)),
            I::Pla => {
                self.a = self.pop(bus);
                self.status.set_zn(self.a);
            }
            I::Plp => {
                let value = self.pop(bus);
                self.status = Status::from_stack_byte(value);
            }

            // Logical
            I::And => {
                self.a &= self.fetch(bus, operand);
                self.status.set_zn(self.a);
            }
            I::Ora => {
                self.a |= self.fetch(bus, operand);
                self.status.set_zn(self.a);
            }
            I::Eor => {
                self.a ^= self.fetch(bus, operand);
                self.status.set_zn(self.a);
            }
            I::Bit => {
                let value = self.fetch(bus, operand);
                self.status.set(Status::Z, self.a & value == 0);
                self.status.set(Status::V, value & 0x40 != 0);
                self.status.set(Status::N, value & 0x80 != 0);
            }

            // Arithmetic
            I::Adc => {
                let value = self.fetch(bus, operand);
                self.adc(value);
            }
            I::Sbc => {
                // SBC is ADC of the one's complement.
                let value = self.fetch(bus, operand);
                self.adc(!value);
            }
            I::Cmp => {
                let value = self.fetch(bus, operand);
                self.compare(self.a, value);
            }
            I::Cpx => {
                let value = self.fetch(bus, operand);
                self.compare(self.x, value);
            }
            I::Cpy => {
                let value = self.fetch(bus, operand);
                self.compare(self.y, value);
            }

            // Shifts and rotates
            I::Asl => self.modify(bus, operand, |cpu, v| {
                cpu.status.set(Status::C, v & 0x80 != 0);
                v << 1
            }),
            I::Lsr => self.modify(bus, operand, |cpu, v| {
                cpu.status.set(Status::C, v & 0x01 != 0);
                v >> 1
            }),
            I::Rol => self.modify(bus, operand, |cpu, v| {
                let carry_in = u8::from(cpu.status.contains(Status::C));
                cpu.status.set(Status::C, v & 0x80 != 0);
                (v << 1) | carry_in
            }),
            I::Ror => self.modify(bus, operand, |cpu, v| {
                let carry_in = u8::from(cpu.status.contains(Status::C));
                cpu.status.set(Status::C, v & 0x01 != 0);
                (v >> 1) | (carry_in << 7)
            }),

            // Increments and decrements
            I::Inc => self.modify(bus, operand, |_, v| v.wrapping_add(1)),
            I::Dec => self.modify(bus, operand, |_, v| v.wrapping_sub(1)),
            I::Inx => {
                self.x = self.x.wrapping_add(1);
                self.status.set_zn(self.x);
            }
            I::Iny => {
                self.y = self.y.wrapping_add(1);
                self.status.set_zn(self.y);
            }
            I::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.status.set_zn(self.x);
            }
            I::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.status.set_zn(self.y);
            }

            // Jumps
            I::Jmp => {
                if let Operand::Address(addr) = operand {
                    self.pc = addr;
                }
            }
            I::Jsr => {
                if let Operand::Address(addr) = operand {
                    // Push the address of the last operand byte; RTS adds 1.
                    self.push_u16(bus, self.pc.wrapping_sub(1));
                    self.pc = addr;
                }
            }
            I::Rts => {
                self.pc = self.pop_u16(bus).wrapping_add(1);
            }
            I::Rti => {
                let value = self.pop(bus);
                self.status = Status::from_stack_byte(value);
                self.pc = self.pop_u16(bus);
            }

            // Branches
            I::Bcc => return self.branch(operand, !self.status.contains(Status::C)),
            I::Bcs => return self.branch(operand, self.status.contains(Status::C)),
            I::Bne => return self.branch(operand, !self.status.contains(Status::Z)),
            I::Beq => return self.branch(operand, self.status.contains(Status::Z)),
            I::Bpl => return self.branch(operand, !self.status.contains(Status::N)),
            I::Bmi => return self.branch(operand, self.status.contains(Status::N)),
            I::Bvc => return self.branch(operand, !self.status.contains(Status::V)),
            I::Bvs => return self.branch(operand, self.status.contains(Status::V)),

            // Flag control
            I::Clc => self.status.remove(Status::C),
            I::Sec => self.status.insert(Status::C),
            I::Cld => self.status.remove(Status::D),
            I::Sed => self.status.insert(Status::D),
            I::Cli => self.status.remove(Status::I),
            I::Sei => self.status.insert(Status::I),
            I::Clv => self.status.remove(Status::V),

            // System
            I::Brk => {
                // BRK pushes the address two past the opcode (one padding
                // byte) and a status copy with B set.
                self.push_u16(bus, self.pc.wrapping_add(1));
                self.push(bus, self.status.to_stack_byte(true));
                self.status.insert(Status::I);
                self.pc = bus.read_u16(vectors::IRQ);
            }
            I::Nop => {}
        }
        0
    }

    #[inline]
    fn fetch(&mut self, bus: &mut impl Bus, operand: Operand) -> u8 {
        match operand {
            Operand::Accumulator => self.a,
            Operand::Address(addr) => bus.read(addr),
            Operand::None => 0,
        }
    }

    #[inline]
    fn store(&mut self, bus: &mut impl Bus, operand: Operand, value: u8) {
        if let Operand::Address(addr) = operand {
            bus.write(addr, value);
        }
    }

    /// Read-modify-write dispatch shared by shifts, rotates, INC and DEC.
    /// Updates Z/N from the result; the closure handles carry.
    fn modify(
        &mut self,
        bus: &mut impl Bus,
        operand: Operand,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) {
        match operand {
            Operand::Accumulator => {
                let value = self.a;
                let result = f(self, value);
                self.a = result;
                self.status.set_zn(result);
            }
            Operand::Address(addr) => {
                let value = bus.read(addr);
                let result = f(self, value);
                bus.write(addr, result);
                self.status.set_zn(result);
            }
            Operand::None => {}
        }
    }

    fn adc(&mut self, value: u8) {
        let carry = u16::from(self.status.contains(Status::C));
        let sum = u16::from(self.a) + u16::from(value) + carry;
        let result = sum as u8;

        self.status.set(Status::C, sum > 0xFF);
        self.status
            .set(Status::V, (!(self.a ^ value) & (self.a ^ result)) & 0x80 != 0);
        self.a = result;
        self.status.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Status::C, register >= value);
        self.status.set_zn(register.wrapping_sub(value));
    }

    fn branch(&mut self, operand: Operand, taken: bool) -> u8 {
        let Operand::Address(target) = operand else {
            return 0;
        };
        if !taken {
            return 0;
        }
        // +1 for taking the branch, +1 more when the target sits on a
        // different page from the following instruction.
        let extra = if pages_differ(self.pc, target) { 2 } else { 1 };
        self.pc = target;
        extra
    }

    fn interrupt(&mut self, bus: &mut impl Bus, vector: u16) -> u8 {
        self.push_u16(bus, self.pc);
        self.push(bus, self.status.to_stack_byte(false));
        self.status.insert(Status::I);
        self.pc = bus.read_u16(vector);
        self.cycles += 7;
        7
    }

    // ---------------------------------------------------------------------
    // Stack
    // ---------------------------------------------------------------------

    fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(0x0100 | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.sp))
    }

    fn push_u16(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    fn pop_u16(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = u16::from(self.pop(bus));
        let hi = u16::from(self.pop(bus));
        (hi << 8) | lo
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn pages_differ(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}
