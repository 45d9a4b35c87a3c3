//! Opcode metadata for the official 6502 instruction set.
//!
//! The 256-entry table maps each opcode byte to its instruction, addressing
//! mode, base cycle count and page-crossing penalty flag. The 105 slots the
//! official set leaves unassigned execute as two-cycle NOPs.

/// Addressing modes of the 6502.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    /// No operand (CLC, TAX, RTS, ...).
    Implied,
    /// Operates on the accumulator (ASL A, ...).
    Accumulator,
    /// 8-bit constant follows the opcode.
    Immediate,
    /// 8-bit address into $0000-$00FF.
    ZeroPage,
    /// Zero-page address plus X, wrapping within the page.
    ZeroPageX,
    /// Zero-page address plus Y, wrapping within the page.
    ZeroPageY,
    /// Signed 8-bit branch offset.
    Relative,
    /// Full 16-bit address.
    Absolute,
    /// 16-bit address plus X.
    AbsoluteX,
    /// 16-bit address plus Y.
    AbsoluteY,
    /// JMP ($hhll); carries the page-boundary fetch bug.
    Indirect,
    /// ($ll,X): pointer in zero page indexed by X before the fetch.
    IndexedIndirect,
    /// ($ll),Y: zero-page pointer fetched, then indexed by Y.
    IndirectIndexed,
}

impl AddrMode {
    /// Operand length in bytes, excluding the opcode itself.
    #[must_use]
    pub const fn operand_len(self) -> u16 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::Relative
            | Self::IndexedIndirect
            | Self::IndirectIndexed => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }
}

/// Executable operations. Undefined opcodes decode to `Nop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)] // The variants are the 6502 mnemonics.
pub enum Instruction {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Instruction {
    /// Mnemonic for disassembly.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Adc => "ADC", Self::And => "AND", Self::Asl => "ASL",
            Self::Bcc => "BCC", Self::Bcs => "BCS", Self::Beq => "BEQ",
            Self::Bit => "BIT", Self::Bmi => "BMI", Self::Bne => "BNE",
            Self::Bpl => "BPL", Self::Brk => "BRK", Self::Bvc => "BVC",
            Self::Bvs => "BVS", Self::Clc => "CLC", Self::Cld => "CLD",
            Self::Cli => "CLI", Self::Clv => "CLV", Self::Cmp => "CMP",
            Self::Cpx => "CPX", Self::Cpy => "CPY", Self::Dec => "DEC",
            Self::Dex => "DEX", Self::Dey => "DEY", Self::Eor => "EOR",
            Self::Inc => "INC", Self::Inx => "INX", Self::Iny => "INY",
            Self::Jmp => "JMP", Self::Jsr => "JSR", Self::Lda => "LDA",
            Self::Ldx => "LDX", Self::Ldy => "LDY", Self::Lsr => "LSR",
            Self::Nop => "NOP", Self::Ora => "ORA", Self::Pha => "PHA",
            Self::Php => "PHP", Self::Pla => "PLA", Self::Plp => "PLP",
            Self::Rol => "ROL", Self::Ror => "ROR", Self::Rti => "RTI",
            Self::Rts => "RTS", Self::Sbc => "SBC", Self::Sec => "SEC",
            Self::Sed => "SED", Self::Sei => "SEI", Self::Sta => "STA",
            Self::Stx => "STX", Self::Sty => "STY", Self::Tax => "TAX",
            Self::Tay => "TAY", Self::Tsx => "TSX", Self::Txa => "TXA",
            Self::Txs => "TXS", Self::Tya => "TYA",
        }
    }
}

/// One decoded table entry.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Operation to perform.
    pub instruction: Instruction,
    /// How the operand is addressed.
    pub mode: AddrMode,
    /// Base cycle count before penalties.
    pub cycles: u8,
    /// Whether a page-crossing read adds one cycle.
    pub page_penalty: bool,
    /// True for the 151 documented opcodes.
    pub official: bool,
}

const fn op(instruction: Instruction, mode: AddrMode, cycles: u8, page_penalty: bool) -> OpcodeInfo {
    OpcodeInfo {
        instruction,
        mode,
        cycles,
        page_penalty,
        official: true,
    }
}

/// Filler for the unassigned slots: a two-cycle implied NOP.
const UNDEFINED: OpcodeInfo = OpcodeInfo {
    instruction: Instruction::Nop,
    mode: AddrMode::Implied,
    cycles: 2,
    page_penalty: false,
    official: false,
};

/// Full 256-entry decode table, indexed by opcode byte.
pub static OPCODE_TABLE: [OpcodeInfo; 256] = build_table();

#[allow(clippy::too_many_lines)]
const fn build_table() -> [OpcodeInfo; 256] {
    use AddrMode::{
        Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, IndexedIndirect,
        Indirect, IndirectIndexed, Relative, ZeroPage, ZeroPageX, ZeroPageY,
    };
    use Instruction as I;

    let mut t = [UNDEFINED; 256];

    // Load / store
    t[0xA9] = op(I::Lda, Immediate, 2, false);
    t[0xA5] = op(I::Lda, ZeroPage, 3, false);
    t[0xB5] = op(I::Lda, ZeroPageX, 4, false);
    t[0xAD] = op(I::Lda, Absolute, 4, false);
    t[0xBD] = op(I::Lda, AbsoluteX, 4, true);
    t[0xB9] = op(I::Lda, AbsoluteY, 4, true);
    t[0xA1] = op(I::Lda, IndexedIndirect, 6, false);
    t[0xB1] = op(I::Lda, IndirectIndexed, 5, true);
    t[0xA2] = op(I::Ldx, Immediate, 2, false);
    t[0xA6] = op(I::Ldx, ZeroPage, 3, false);
    t[0xB6] = op(I::Ldx, ZeroPageY, 4, false);
    t[0xAE] = op(I::Ldx, Absolute, 4, false);
    t[0xBE] = op(I::Ldx, AbsoluteY, 4, true);
    t[0xA0] = op(I::Ldy, Immediate, 2, false);
    t[0xA4] = op(I::Ldy, ZeroPage, 3, false);
    t[0xB4] = op(I::Ldy, ZeroPageX, 4, false);
    t[0xAC] = op(I::Ldy, Absolute, 4, false);
    t[0xBC] = op(I::Ldy, AbsoluteX, 4, true);
    t[0x85] = op(I::Sta, ZeroPage, 3, false);
    t[0x95] = op(I::Sta, ZeroPageX, 4, false);
    t[0x8D] = op(I::Sta, Absolute, 4, false);
    t[0x9D] = op(I::Sta, AbsoluteX, 5, false);
    t[0x99] = op(I::Sta, AbsoluteY, 5, false);
    t[0x81] = op(I::Sta, IndexedIndirect, 6, false);
    t[0x91] = op(I::Sta, IndirectIndexed, 6, false);
    t[0x86] = op(I::Stx, ZeroPage, 3, false);
    t[0x96] = op(I::Stx, ZeroPageY, 4, false);
    t[0x8E] = op(I::Stx, Absolute, 4, false);
    t[0x84] = op(I::Sty, ZeroPage, 3, false);
    t[0x94] = op(I::Sty, ZeroPageX, 4, false);
    t[0x8C] = op(I::Sty, Absolute, 4, false);

    // Register transfers
    t[0xAA] = op(I::Tax, Implied, 2, false);
    t[0xA8] = op(I::Tay, Implied, 2, false);
    t[0xBA] = op(I::Tsx, Implied, 2, false);
    t[0x8A] = op(I::Txa, Implied, 2, false);
    t[0x9A] = op(I::Txs, Implied, 2, false);
    t[0x98] = op(I::Tya, Implied, 2, false);

    // Stack
    t[0x48] = op(I::Pha, Implied, 3, false);
    t[0x08] = op(I::Php, Implied, 3, false);
    t[0x68] = op(I::Pla, Implied, 4, false);
    t[0x28] = op(I::Plp, Implied, 4, false);

    // Logical
    t[0x29] = op(I::And, Immediate, 2, false);
    t[0x25] = op(I::And, ZeroPage, 3, false);
    t[0x35] = op(I::And, ZeroPageX, 4, false);
    t[0x2D] = op(I::And, Absolute, 4, false);
    t[0x3D] = op(I::And, AbsoluteX, 4, true);
    t[0x39] = op(I::And, AbsoluteY, 4, true);
    t[0x21] = op(I::And, IndexedIndirect, 6, false);
    t[0x31] = op(I::And, IndirectIndexed, 5, true);
    t[0x09] = op(I::Ora, Immediate, 2, false);
    t[0x05] = op(I::Ora, ZeroPage, 3, false);
    t[0x15] = op(I::Ora, ZeroPageX, 4, false);
    t[0x0D] = op(I::Ora, Absolute, 4, false);
    t[0x1D] = op(I::Ora, AbsoluteX, 4, true);
    t[0x19] = op(I::Ora, AbsoluteY, 4, true);
    t[0x01] = op(I::Ora, IndexedIndirect, 6, false);
    t[0x11] = op(I::Ora, IndirectIndexed, 5, true);
    t[0x49] = op(I::Eor, Immediate, 2, false);
    t[0x45] = op(I::Eor, ZeroPage, 3, false);
    t[0x55] = op(I::Eor, ZeroPageX, 4, false);
    t[0x4D] = op(I::Eor, Absolute, 4, false);
    t[0x5D] = op(I::Eor, AbsoluteX, 4, true);
    t[0x59] = op(I::Eor, AbsoluteY, 4, true);
    t[0x41] = op(I::Eor, IndexedIndirect, 6, false);
    t[0x51] = op(I::Eor, IndirectIndexed, 5, true);
    t[0x24] = op(I::Bit, ZeroPage, 3, false);
    t[0x2C] = op(I::Bit, Absolute, 4, false);

    // Arithmetic
    t[0x69] = op(I::Adc, Immediate, 2, false);
    t[0x65] = op(I::Adc, ZeroPage, 3, false);
    t[0x75] = op(I::Adc, ZeroPageX, 4, false);
    t[0x6D] = op(I::Adc, Absolute, 4, false);
    t[0x7D] = op(I::Adc, AbsoluteX, 4, true);
    t[0x79] = op(I::Adc, AbsoluteY, 4, true);
    t[0x61] = op(I::Adc, IndexedIndirect, 6, false);
    t[0x71] = op(I::Adc, IndirectIndexed, 5, true);
    t[0xE9] = op(I::Sbc, Immediate, 2, false);
    t[0xE5] = op(I::Sbc, ZeroPage, 3, false);
    t[0xF5] = op(I::Sbc, ZeroPageX, 4, false);
    t[0xED] = op(I::Sbc, Absolute, 4, false);
    t[0xFD] = op(I::Sbc, AbsoluteX, 4, true);
    t[0xF9] = op(I::Sbc, AbsoluteY, 4, true);
    t[0xE1] = op(I::Sbc, IndexedIndirect, 6, false);
    t[0xF1] = op(I::Sbc, IndirectIndexed, 5, true);
    t[0xC9] = op(I::Cmp, Immediate, 2, false);
    t[0xC5] = op(I::Cmp, ZeroPage, 3, false);
    t[0xD5] = op(I::Cmp, ZeroPageX, 4, false);
    t[0xCD] = op(I::Cmp, Absolute, 4, false);
    t[0xDD] = op(I::Cmp, AbsoluteX, 4, true);
    t[0xD9] = op(I::Cmp, AbsoluteY, 4, true);
    t[0xC1] = op(I::Cmp, IndexedIndirect, 6, false);
    t[0xD1] = op(I::Cmp, IndirectIndexed, 5, true);
    t[0xE0] = op(I::Cpx, Immediate, 2, false);
    t[0xE4] = op(I::Cpx, ZeroPage, 3, false);
    t[0xEC] = op(I::Cpx, Absolute, 4, false);
    t[0xC0] = op(I::Cpy, Immediate, 2, false);
    t[0xC4] = op(I::Cpy, ZeroPage, 3, false);
    t[0xCC] = op(I::Cpy, Absolute, 4, false);

    // Increments and decrements
    t[0xE6] = op(I::Inc, ZeroPage, 5, false);
    t[0xF6] = op(I::Inc, ZeroPageX, 6, false);
    t[0xEE] = op(I::Inc, Absolute, 6, false);
    t[0xFE] = op(I::Inc, AbsoluteX, 7, false);
    t[0xC6] = op(I::Dec, ZeroPage, 5, false);
    t[0xD6] = op(I::Dec, ZeroPageX, 6, false);
    t[0xCE] = op(I::Dec, Absolute, 6, false);
    t[0xDE] = op(I::Dec, AbsoluteX, 7, false);
    t[0xE8] = op(I::Inx, Implied, 2, false);
    t[0xC8] = op(I::Iny, Implied, 2, false);
    t[0xCA] = op(I::Dex, Implied, 2, false);
    t[0x88] = op(I::Dey, Implied, 2, false);

    // Shifts and rotates
    t[0x0A] = op(I::Asl, Accumulator, 2, false);
    t[0x06] = op(I::Asl, ZeroPage, 5, false);
    t[0x16] = op(I::Asl, ZeroPageX, 6, false);
    t[0x0E] = op(I::Asl, Absolute, 6, false);
    t[0x1E] = op(I::Asl, AbsoluteX, 7, false);
    t[0x4A] = op(I::Lsr, Accumulator, 2, false);
    t[0x46] = op(I::Lsr, ZeroPage, 5, false);
    t[0x56] = op(I::Lsr, ZeroPageX, 6, false);
    t[0x4E] = op(I::Lsr, Absolute, 6, false);
    t[0x5E] = op(I::Lsr, AbsoluteX, 7, false);
    t[0x2A] = op(I::Rol, Accumulator, 2, false);
    t[0x26] = op(I::Rol, ZeroPage, 5, false);
    t[0x36] = op(I::Rol, ZeroPageX, 6, false);
    t[0x2E] = op(I::Rol, Absolute, 6, false);
    t[0x3E] = op(I::Rol, AbsoluteX, 7, false);
    t[0x6A] = op(I::Ror, Accumulator, 2, false);
    t[0x66] = op(I::Ror, ZeroPage, 5, false);
    t[0x76] = op(I::Ror, ZeroPageX, 6, false);
    t[0x6E] = op(I::Ror, Absolute, 6, false);
    t[0x7E] = op(I::Ror, AbsoluteX, 7, false);

    // Jumps and subroutines
    t[0x4C] = op(I::Jmp, Absolute, 3, false);
    t[0x6C] = op(I::Jmp, Indirect, 5, false);
    t[0x20] = op(I::Jsr, Absolute, 6, false);
    t[0x60] = op(I::Rts, Implied, 6, false);
    t[0x40] = op(I::Rti, Implied, 6, false);

    // Branches (+1 when taken, +1 more on page cross)
    t[0x90] = op(I::Bcc, Relative, 2, false);
    t[0xB0] = op(I::Bcs, Relative, 2, false);
    t[0xF0] = op(I::Beq, Relative, 2, false);
    t[0x30] = op(I::Bmi, Relative, 2, false);
    t[0xD0] = op(I::Bne, Relative, 2, false);
    t[0x10] = op(I::Bpl, Relative, 2, false);
    t[0x50] = op(I::Bvc, Relative, 2, false);
    t[0x70] = op(I::Bvs, Relative, 2, false);

    // Flag control
    t[0x18] = op(I::Clc, Implied, 2, false);
    t[0x38] = op(I::Sec, Implied, 2, false);
    t[0xD8] = op(I::Cld, Implied, 2, false);
    t[0xF8] = op(I::Sed, Implied, 2, false);
    t[0x58] = op(I::Cli, Implied, 2, false);
    t[0x78] = op(I::Sei, Implied, 2, false);
    t[0xB8] = op(I::Clv, Implied, 2, false);

    // System
    t[0x00] = op(I::Brk, Implied, 7, false);
    t[0xEA] = op(I::Nop, Implied, 2, false);

    t
}
