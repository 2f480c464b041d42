//! JRB16 program-byte instruction decoder.
//!
//! Programs are byte streams produced by the JRB16 assembler. Each
//! instruction is a single opcode byte, optionally followed by immediate
//! bytes (a constant, a RAM address, or a 16-bit big-endian jump target).
//!
//! Instruction decode expands the compact program bytes into the wide
//! internal opcodes consumed by the execution units: ALU bytes become a
//! family base plus a variant index that encodes the register routing,
//! jump bytes become condition opcodes in the 0x99 block.
//!
//! Byte map:
//!
//! | Range       | Meaning                               |
//! |-------------|---------------------------------------|
//! | 0x00        | nop                                   |
//! | 0x01–0x0C   | mov (packed src/dst pairs)            |
//! | 0x10–0x1F   | cmp reg, const {0, 1, -1, 255}        |
//! | 0x20–0x2F   | cmp reg, reg                          |
//! | 0x30–0x3A   | jmp cond, addr16                      |
//! | 0x40–0x4A   | jmpr cond, offset8                    |
//! | 0x50–0xBB   | ALU operations                        |
//! | 0xC0–0xCF   | load ram[reg] reg                     |
//! | 0xD0–0xD3   | load rom reg, imm                     |
//! | 0xD4–0xD7   | load ram[imm] reg                     |
//! | 0xD8–0xDB   | set rampage from reg                  |
//! | 0xE0–0xEF   | save reg → mar / ram[mar] / ram[reg] / ram[imm] |
//! | 0xF0–0xFD   | in / out port forms                   |
//! | 0xFF        | halt                                  |

use crate::alu;
use crate::jump::Cond;

/// Register index: 0 = A, 1 = B, 2 = C, 3 = D.
pub type Reg = u8;

/// Constant selector for `cmp reg, const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpConst {
    Zero,
    One,
    MinusOne,
    Max255,
}

impl CmpConst {
    pub fn value(self) -> u16 {
        match self {
            CmpConst::Zero => 0,
            CmpConst::One => 1,
            CmpConst::MinusOne => 0xFFFF,
            CmpConst::Max255 => 0x00FF,
        }
    }
}

/// An ALU program byte expanded for execution: the wide opcode plus the
/// register routing the variant bits select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluByte {
    /// Wide internal opcode (family base + variant).
    pub wide: u16,
    /// Destination register.
    pub dst: Reg,
    /// Operand A source register.
    pub a: Reg,
    /// Operand B source register (binary families only).
    pub b: Option<Reg>,
}

/// A decoded program instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Nop,
    Halt,
    Mov { dst: Reg, src: Reg },
    /// Load a small constant (0, 1, -1) into A through the ALU datapath.
    LoadConst { value: u16 },
    CmpConst { reg: Reg, konst: CmpConst },
    CmpReg { lhs: Reg, rhs: Reg },
    /// Followed by a 16-bit big-endian target address.
    Jmp { cond: Cond },
    /// Followed by a signed 8-bit offset.
    JmpRel { cond: Cond },
    /// Clear the whole flag register, enables included.
    FlagClear,
    /// Flag-control pseudo-op routed through the ALU (wide 0xBA–0xBF).
    FlagCtl { wide: u16 },
    Alu(AluByte),
    LoadRamReg { addr_reg: Reg, dst: Reg },
    /// Followed by an immediate byte.
    LoadImm { dst: Reg },
    /// Followed by an address byte.
    LoadRamImm { dst: Reg },
    SetPage { src: Reg },
    SaveMar { src: Reg },
    SaveRamMar { src: Reg },
    SaveRamReg { src: Reg },
    /// Followed by an address byte.
    SaveRamImm { src: Reg },
    In { dst: Reg },
    Out { src: Reg },
    /// Followed by an immediate byte.
    OutImm,
    /// Followed by an address byte.
    OutRamImm,
    OutRamReg { reg: Reg },
}

impl Instr {
    /// Number of immediate bytes following the opcode byte.
    pub fn imm_bytes(self) -> u8 {
        match self {
            Instr::Jmp { .. } => 2,
            Instr::JmpRel { .. }
            | Instr::LoadImm { .. }
            | Instr::LoadRamImm { .. }
            | Instr::SaveRamImm { .. }
            | Instr::OutImm
            | Instr::OutRamImm => 1,
            _ => 0,
        }
    }
}

// Ordered distinct register pairs used by the add/sub/div blocks:
// a+b, a+c, a+d, b+a, b+c, b+d, c+a, c+b, c+d, d+a, d+b, d+c.
const PAIRS: [(Reg, Reg); 12] = [
    (0, 1), (0, 2), (0, 3),
    (1, 0), (1, 2), (1, 3),
    (2, 0), (2, 1), (2, 3),
    (3, 0), (3, 1), (3, 2),
];

// Unordered pairs used by the and/or blocks: a&b, a&c, a&d, b&c, b&d, c&d.
const PAIRS_UNORDERED: [(Reg, Reg); 6] = [
    (0, 1), (0, 2), (0, 3),
    (1, 2), (1, 3), (2, 3),
];

fn unary(base: u16, r: Reg) -> Instr {
    Instr::Alu(AluByte { wide: base + u16::from(r), dst: r, a: r, b: None })
}

fn binary(base: u16, variant: u16, dst: Reg, src: Reg) -> Instr {
    Instr::Alu(AluByte { wide: base + variant, dst, a: dst, b: Some(src) })
}

/// Decode the ALU block (program bytes 0x50–0xBB).
fn decode_opp(byte: u8) -> Instr {
    match byte {
        0x50 => Instr::FlagClear,
        0x51 => Instr::FlagCtl { wide: 0xBC }, // carry off
        0x52 => Instr::FlagCtl { wide: 0xBD }, // carry on
        0x53 => Instr::FlagCtl { wide: 0xBE }, // sign off
        0x54 => Instr::FlagCtl { wide: 0xBF }, // sign on
        0x55 => Instr::LoadConst { value: 0 },
        0x56 => Instr::LoadConst { value: 1 },
        0x57 => Instr::LoadConst { value: 0xFFFF },
        0x58..=0x5B => unary(alu::OP_PASS, byte - 0x58),
        0x5C..=0x5F => unary(alu::OP_NOT, byte - 0x5C),
        0x60..=0x63 => unary(alu::OP_NEG, byte - 0x60),
        0x64..=0x67 => unary(alu::OP_INC, byte - 0x64),
        0x68..=0x6B => unary(alu::OP_DEC, byte - 0x68),
        0x6C..=0x77 => {
            let i = usize::from(byte - 0x6C);
            binary(alu::OP_ADD, i as u16, PAIRS[i].0, PAIRS[i].1)
        }
        0x78..=0x83 => {
            let i = usize::from(byte - 0x78);
            binary(alu::OP_SUB, i as u16, PAIRS[i].0, PAIRS[i].1)
        }
        0x84..=0x93 => {
            // All 16 pairs, self-products included: a*a, a*b, ... d*d.
            let i = byte - 0x84;
            binary(alu::OP_MUL_LO, u16::from(i), i / 4, i % 4)
        }
        0x94..=0x9F => {
            let i = usize::from(byte - 0x94);
            binary(alu::OP_DIV, i as u16, PAIRS[i].0, PAIRS[i].1)
        }
        0xA0..=0xA5 => {
            let i = usize::from(byte - 0xA0);
            binary(alu::OP_AND, i as u16, PAIRS_UNORDERED[i].0, PAIRS_UNORDERED[i].1)
        }
        0xA6..=0xAB => {
            let i = usize::from(byte - 0xA6);
            binary(alu::OP_OR, i as u16, PAIRS_UNORDERED[i].0, PAIRS_UNORDERED[i].1)
        }
        0xAC..=0xBB => {
            let i = byte - 0xAC;
            binary(alu::OP_MUL_HI, u16::from(i), i / 4, i % 4)
        }
        _ => Instr::Nop,
    }
}

/// Decode one program byte. Bytes outside every block decode to `Nop`
/// (the hardware treats unknown opcodes as no-ops).
pub fn decode(byte: u8) -> Instr {
    match byte {
        0x00 => Instr::Nop,
        0x01..=0x0C => {
            // src = (n-1)/3; dst skips over src.
            let n = byte - 1;
            let src = n / 3;
            let d = n % 3;
            let dst = if d >= src { d + 1 } else { d };
            Instr::Mov { dst, src }
        }
        0x10..=0x1F => {
            let reg = byte & 0x03;
            let konst = match (byte >> 2) & 0x03 {
                0 => CmpConst::Zero,
                1 => CmpConst::One,
                2 => CmpConst::MinusOne,
                _ => CmpConst::Max255,
            };
            Instr::CmpConst { reg, konst }
        }
        0x20..=0x2F => Instr::CmpReg { lhs: (byte >> 2) & 0x03, rhs: byte & 0x03 },
        0x30..=0x3A => match Cond::from_index(byte - 0x30) {
            Some(cond) => Instr::Jmp { cond },
            None => Instr::Nop,
        },
        0x40..=0x4A => match Cond::from_index(byte - 0x40) {
            Some(cond) => Instr::JmpRel { cond },
            None => Instr::Nop,
        },
        0x50..=0xBB => decode_opp(byte),
        0xC0..=0xCF => {
            let n = byte - 0xC0;
            Instr::LoadRamReg { addr_reg: n / 4, dst: n % 4 }
        }
        0xD0..=0xD3 => Instr::LoadImm { dst: byte - 0xD0 },
        0xD4..=0xD7 => Instr::LoadRamImm { dst: byte - 0xD4 },
        0xD8..=0xDB => Instr::SetPage { src: byte - 0xD8 },
        0xE0..=0xE3 => Instr::SaveMar { src: byte - 0xE0 },
        0xE4..=0xE7 => Instr::SaveRamMar { src: byte - 0xE4 },
        0xE8..=0xEB => Instr::SaveRamReg { src: byte - 0xE8 },
        0xEC..=0xEF => Instr::SaveRamImm { src: byte - 0xEC },
        0xF0..=0xF3 => Instr::In { dst: byte - 0xF0 },
        0xF4..=0xF7 => Instr::Out { src: byte - 0xF4 },
        0xF8 => Instr::OutImm,
        0xF9 => Instr::OutRamImm,
        0xFA..=0xFD => Instr::OutRamReg { reg: byte - 0xFA },
        0xFF => Instr::Halt,
        _ => Instr::Nop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alu::{self, AluOp};

    #[test]
    fn test_decode_add_a_b() {
        // Assembler vector: 0x6C = add a b → wide 0xEB, A ← A + B.
        let i = decode(0x6C);
        assert_eq!(
            i,
            Instr::Alu(AluByte { wide: alu::OP_ADD, dst: 0, a: 0, b: Some(1) })
        );
    }

    #[test]
    fn test_decode_observed_assembler_bytes() {
        assert_eq!(decode(0xD0), Instr::LoadImm { dst: 0 }); // load rom a
        assert_eq!(decode(0xD1), Instr::LoadImm { dst: 1 }); // load rom b
        assert_eq!(decode(0xD5), Instr::LoadRamImm { dst: 1 }); // load ram[n] b
        assert_eq!(decode(0xEC), Instr::SaveRamImm { src: 0 }); // save a ram[n]
        assert_eq!(decode(0xF4), Instr::Out { src: 0 }); // out a
        assert_eq!(decode(0xF5), Instr::Out { src: 1 }); // out b
        assert_eq!(decode(0x30), Instr::Jmp { cond: Cond::Always });
        assert_eq!(decode(0xFF), Instr::Halt);
    }

    #[test]
    fn test_decode_mov_pairs() {
        // 0x01..0x03: A → B, C, D
        assert_eq!(decode(0x01), Instr::Mov { dst: 1, src: 0 });
        assert_eq!(decode(0x02), Instr::Mov { dst: 2, src: 0 });
        assert_eq!(decode(0x03), Instr::Mov { dst: 3, src: 0 });
        // 0x04..0x06: B → A, C, D
        assert_eq!(decode(0x04), Instr::Mov { dst: 0, src: 1 });
        assert_eq!(decode(0x05), Instr::Mov { dst: 2, src: 1 });
        assert_eq!(decode(0x06), Instr::Mov { dst: 3, src: 1 });
        // 0x0C: D → C
        assert_eq!(decode(0x0C), Instr::Mov { dst: 2, src: 3 });
    }

    #[test]
    fn test_decode_cmp() {
        assert_eq!(decode(0x10), Instr::CmpConst { reg: 0, konst: CmpConst::Zero });
        assert_eq!(decode(0x15), Instr::CmpConst { reg: 1, konst: CmpConst::One });
        assert_eq!(decode(0x1B), Instr::CmpConst { reg: 3, konst: CmpConst::MinusOne });
        assert_eq!(decode(0x26), Instr::CmpReg { lhs: 1, rhs: 2 });
        assert_eq!(CmpConst::MinusOne.value(), 0xFFFF);
    }

    #[test]
    fn test_decode_jump_conditions() {
        assert_eq!(decode(0x31), Instr::Jmp { cond: Cond::Eq });
        assert_eq!(decode(0x32), Instr::Jmp { cond: Cond::Ne });
        assert_eq!(decode(0x3A), Instr::Jmp { cond: Cond::GeS });
        assert_eq!(decode(0x42), Instr::JmpRel { cond: Cond::Ne });
    }

    #[test]
    fn test_alu_block_families() {
        // Unary blocks route the named register to both operand and dest.
        for r in 0..4u8 {
            match decode(0x5C + r) {
                Instr::Alu(ab) => {
                    assert_eq!(alu::decode(ab.wide).unwrap().op, AluOp::Not);
                    assert_eq!(ab.dst, r);
                    assert_eq!(ab.a, r);
                    assert_eq!(ab.b, None);
                }
                other => panic!("expected ALU instr, got {:?}", other),
            }
        }
        // Subtract block: 0x78 = a-b, destination = first operand.
        match decode(0x78) {
            Instr::Alu(ab) => {
                assert_eq!(ab.wide, alu::OP_SUB);
                assert_eq!((ab.dst, ab.a, ab.b), (0, 0, Some(1)));
            }
            other => panic!("expected ALU instr, got {:?}", other),
        }
        // Multiply block matches its wide family base byte-for-byte.
        match decode(0x84) {
            Instr::Alu(ab) => {
                assert_eq!(ab.wide, alu::OP_MUL_LO);
                assert_eq!((ab.dst, ab.a, ab.b), (0, 0, Some(0)));
            }
            other => panic!("expected ALU instr, got {:?}", other),
        }
        // Multiply-high block: 0xAC..0xBB → wide 0x94 family.
        match decode(0xB1) {
            Instr::Alu(ab) => {
                assert_eq!(alu::decode(ab.wide).unwrap().op, AluOp::MulHigh);
                assert_eq!((ab.dst, ab.a, ab.b), (1, 1, Some(1)));
            }
            other => panic!("expected ALU instr, got {:?}", other),
        }
        // Divide block: 0x94 = a/b → wide 0xA4 family.
        match decode(0x94) {
            Instr::Alu(ab) => {
                assert_eq!(ab.wide, alu::OP_DIV);
                assert_eq!((ab.dst, ab.a, ab.b), (0, 0, Some(1)));
            }
            other => panic!("expected ALU instr, got {:?}", other),
        }
    }

    #[test]
    fn test_flag_control_bytes() {
        assert_eq!(decode(0x50), Instr::FlagClear);
        assert_eq!(decode(0x52), Instr::FlagCtl { wide: 0xBD });
        assert_eq!(decode(0x54), Instr::FlagCtl { wide: 0xBF });
    }

    #[test]
    fn test_imm_byte_counts() {
        assert_eq!(decode(0x30).imm_bytes(), 2);
        assert_eq!(decode(0x40).imm_bytes(), 1);
        assert_eq!(decode(0xD0).imm_bytes(), 1);
        assert_eq!(decode(0xEC).imm_bytes(), 1);
        assert_eq!(decode(0xF8).imm_bytes(), 1);
        assert_eq!(decode(0x6C).imm_bytes(), 0);
        assert_eq!(decode(0xFF).imm_bytes(), 0);
    }

    #[test]
    fn test_unknown_bytes_are_nops() {
        assert_eq!(decode(0x0D), Instr::Nop);
        assert_eq!(decode(0x3B), Instr::Nop);
        assert_eq!(decode(0xBC), Instr::Nop);
        assert_eq!(decode(0xFE), Instr::Nop);
    }
}
