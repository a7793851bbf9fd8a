/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Encoders for the RVC (compressed) instruction forms, one function per
//! mnemonic. The immediate scatter patterns follow the RVC spec
//! bit-for-bit; the form-specific field constraints are enforced here, so
//! a violation surfaces whether the instruction was written by hand or
//! produced by the compression pass.

use super::lookup_register;
use crate::ast::Reg;
use crate::errors::EncodeError;

fn require_nonzero(reg: &Reg, inst: &str, field: &str) -> Result<u32, EncodeError> {
    let value = lookup_register(reg, false)?;
    if value == 0 {
        return Err(EncodeError::Constraint(format!(
            "{} requires {} to not be x0",
            inst, field
        )));
    }
    Ok(value)
}

fn require_nonzero_imm(imm: i128, inst: &str) -> Result<(), EncodeError> {
    if imm == 0 {
        return Err(EncodeError::Constraint(format!(
            "{} requires a non-zero immediate",
            inst
        )));
    }
    Ok(())
}

fn check_shamt(imm: i128, inst: &str) -> Result<(), EncodeError> {
    if !(0..=31).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "5-bit shift amount must be between 0 (0x00) and 31 (0x1f): {}",
            imm
        )));
    }
    Ok(())
}

// c.mv, c.add (and c.jr / c.jalr / c.ebreak with a zero rs2)
fn cr_type(rd_rs1: u32, rs2: u32, opcode: u32, funct4: u32) -> u32 {
    let mut code = 0;
    code |= opcode;
    code |= rs2 << 2;
    code |= rd_rs1 << 7;
    code |= funct4 << 12;
    code
}

// c.nop, c.addi, c.li, c.lui, c.slli
fn ci_type(rd_rs1: u32, imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(-32..=31).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "6-bit immediate must be between -32 (-0x20) and 31 (0x1f): {}",
            imm
        )));
    }
    let imm = (imm as u32) & 0b11_1111;
    let imm_5 = (imm >> 5) & 0b1;
    let imm_4_0 = imm & 0b1_1111;

    let mut code = 0;
    code |= opcode;
    code |= imm_4_0 << 2;
    code |= rd_rs1 << 7;
    code |= imm_5 << 12;
    code |= funct3 << 13;
    Ok(code)
}

// CI variation: c.addi16sp
fn cia_type(imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(-512..=511).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "6-bit MO16 immediate must be between -512 (-0x200) and 511 (0x1ff): {}",
            imm
        )));
    }
    if imm % 16 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "6-bit MO16 immediate must be a multiple of 16: {}",
            imm
        )));
    }
    let imm = ((imm >> 4) as u32) & 0b11_1111;
    let imm_9 = (imm >> 5) & 0b1;
    let imm_8_4 = imm & 0b1_1111;

    let mut code = 0;
    code |= opcode;
    code |= imm_8_4 << 2;
    code |= 2 << 7; // rd/rs1 is always sp
    code |= imm_9 << 12;
    code |= funct3 << 13;
    Ok(code)
}

// CI variation: c.lwsp
fn cil_type(rd: u32, imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(0..=255).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "6-bit MO4 unsigned immediate must be between 0 (0x00) and 255 (0xff): {}",
            imm
        )));
    }
    if imm % 4 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "6-bit MO4 unsigned immediate must be a multiple of 4: {}",
            imm
        )));
    }
    let imm = ((imm >> 2) as u32) & 0b11_1111;
    let imm_7 = (imm >> 5) & 0b1;
    let imm_6_2 = imm & 0b1_1111;

    let mut code = 0;
    code |= opcode;
    code |= imm_6_2 << 2;
    code |= rd << 7;
    code |= imm_7 << 12;
    code |= funct3 << 13;
    Ok(code)
}

// c.swsp
fn css_type(rs2: u32, imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(0..=255).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "6-bit MO4 unsigned immediate must be between 0 (0x00) and 255 (0xff): {}",
            imm
        )));
    }
    if imm % 4 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "6-bit MO4 unsigned immediate must be a multiple of 4: {}",
            imm
        )));
    }
    let imm = ((imm >> 2) as u32) & 0b11_1111;
    let imm_7_6 = (imm >> 4) & 0b11;
    let imm_5_2 = imm & 0b1111;

    let mut code = 0;
    code |= opcode;
    code |= rs2 << 2;
    code |= imm_7_6 << 7;
    code |= imm_5_2 << 9;
    code |= funct3 << 13;
    Ok(code)
}

// c.addi4spn
fn ciw_type(rd: u32, imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(0..=1023).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "8-bit MO4 unsigned immediate must be between 0 (0x00) and 1023 (0x3ff): {}",
            imm
        )));
    }
    if imm % 4 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "8-bit MO4 unsigned immediate must be a multiple of 4: {}",
            imm
        )));
    }
    let imm = ((imm >> 2) as u32) & 0b1111_1111;
    let imm_9_6 = (imm >> 4) & 0b1111;
    let imm_5_4 = (imm >> 2) & 0b11;
    let imm_3 = (imm >> 1) & 0b1;
    let imm_2 = imm & 0b1;

    let mut code = 0;
    code |= opcode;
    code |= rd << 2;
    code |= imm_3 << 5;
    code |= imm_2 << 6;
    code |= imm_9_6 << 7;
    code |= imm_5_4 << 11;
    code |= funct3 << 13;
    Ok(code)
}

// c.lw / c.sw share one layout with rd and rs2 swapping the low slot
fn cl_type(rd: u32, rs1: u32, imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(0..=127).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "5-bit MO4 unsigned immediate must be between 0 (0x00) and 127 (0x7f): {}",
            imm
        )));
    }
    if imm % 4 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "5-bit MO4 unsigned immediate must be a multiple of 4: {}",
            imm
        )));
    }
    let imm = ((imm >> 2) as u32) & 0b1_1111;
    let imm_6 = (imm >> 4) & 0b1;
    let imm_5_3 = (imm >> 1) & 0b111;
    let imm_2 = imm & 0b1;

    let mut code = 0;
    code |= opcode;
    code |= rd << 2;
    code |= imm_6 << 5;
    code |= imm_2 << 6;
    code |= rs1 << 7;
    code |= imm_5_3 << 10;
    code |= funct3 << 13;
    Ok(code)
}

// c.sub, c.xor, c.or, c.and
fn ca_type(rd_rs1: u32, rs2: u32, opcode: u32, funct2: u32, funct6: u32) -> u32 {
    let mut code = 0;
    code |= opcode;
    code |= rs2 << 2;
    code |= funct2 << 5;
    code |= rd_rs1 << 7;
    code |= funct6 << 10;
    code
}

// c.beqz, c.bnez
fn cb_type(rs1: u32, imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(-256..=255).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "8-bit MO2 immediate must be between -0x100 (-256) and 0xff (255): {}",
            imm
        )));
    }
    if imm % 2 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "8-bit MO2 immediate must be a multiple of 2: {}",
            imm
        )));
    }
    let imm = ((imm >> 1) as u32) & 0b1111_1111;
    let imm_8 = (imm >> 7) & 0b1;
    let imm_7_6 = (imm >> 5) & 0b11;
    let imm_5 = (imm >> 4) & 0b1;
    let imm_4_3 = (imm >> 2) & 0b11;
    let imm_2_1 = imm & 0b11;

    let mut code = 0;
    code |= opcode;
    code |= imm_5 << 2;
    code |= imm_2_1 << 3;
    code |= imm_7_6 << 5;
    code |= rs1 << 7;
    code |= imm_4_3 << 10;
    code |= imm_8 << 12;
    code |= funct3 << 13;
    Ok(code)
}

// CB variation: c.srli, c.srai, c.andi
fn cbi_type(rd_rs1: u32, imm: i128, opcode: u32, funct2: u32, funct3: u32) -> u32 {
    let imm = (imm as u32) & 0b11_1111;
    let imm_5 = (imm >> 5) & 0b1;
    let imm_4_0 = imm & 0b1_1111;

    let mut code = 0;
    code |= opcode;
    code |= imm_4_0 << 2;
    code |= rd_rs1 << 7;
    code |= funct2 << 10;
    code |= imm_5 << 12;
    code |= funct3 << 13;
    code
}

// c.jal, c.j
fn cj_type(imm: i128, opcode: u32, funct3: u32) -> Result<u32, EncodeError> {
    if !(-2048..=2047).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "11-bit MO2 immediate must be between -0x800 (-2048) and 0x7ff (2047): {}",
            imm
        )));
    }
    if imm % 2 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "11-bit MO2 immediate must be a multiple of 2: {}",
            imm
        )));
    }
    let imm = ((imm >> 1) as u32) & 0b111_1111_1111;
    let imm_11 = (imm >> 10) & 0b1;
    let imm_10 = (imm >> 9) & 0b1;
    let imm_9_8 = (imm >> 7) & 0b11;
    let imm_7 = (imm >> 6) & 0b1;
    let imm_6 = (imm >> 5) & 0b1;
    let imm_5 = (imm >> 4) & 0b1;
    let imm_4 = (imm >> 3) & 0b1;
    let imm_3_1 = imm & 0b111;

    let mut code = 0;
    code |= opcode;
    code |= imm_5 << 2;
    code |= imm_3_1 << 3;
    code |= imm_7 << 6;
    code |= imm_6 << 7;
    code |= imm_10 << 8;
    code |= imm_9_8 << 9;
    code |= imm_4 << 11;
    code |= imm_11 << 12;
    code |= funct3 << 13;
    Ok(code)
}

pub fn c_addi4spn(rd: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd = lookup_register(rd, true)?;
    require_nonzero_imm(imm, "c.addi4spn")?;
    ciw_type(rd, imm, 0b00, 0b000)
}

pub fn c_lw(rd: &Reg, rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd = lookup_register(rd, true)?;
    let rs1 = lookup_register(rs1, true)?;
    cl_type(rd, rs1, imm, 0b00, 0b010)
}

pub fn c_sw(rs1: &Reg, rs2: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rs1 = lookup_register(rs1, true)?;
    let rs2 = lookup_register(rs2, true)?;
    cl_type(rs2, rs1, imm, 0b00, 0b110)
}

pub fn c_nop() -> u32 {
    0b0000_0000_0000_0001
}

pub fn c_addi(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = require_nonzero(rd_rs1, "c.addi", "rd/rs1")?;
    require_nonzero_imm(imm, "c.addi")?;
    ci_type(rd_rs1, imm, 0b01, 0b000)
}

pub fn c_jal(imm: i128) -> Result<u32, EncodeError> {
    cj_type(imm, 0b01, 0b001)
}

pub fn c_li(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = require_nonzero(rd_rs1, "c.li", "rd")?;
    ci_type(rd_rs1, imm, 0b01, 0b010)
}

pub fn c_addi16sp(imm: i128) -> Result<u32, EncodeError> {
    require_nonzero_imm(imm, "c.addi16sp")?;
    cia_type(imm, 0b01, 0b011)
}

/// Like `lui`, `c.lui` also accepts the unsigned upper-half spellings
/// `0xfffe0..=0xfffff` for its negative immediates.
pub fn c_lui(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = require_nonzero(rd_rs1, "c.lui", "rd")?;
    if rd_rs1 == 2 {
        return Err(EncodeError::Constraint(
            "c.lui requires rd to not be x2".to_string(),
        ));
    }
    let imm = if (0xfffe0..=0xfffff).contains(&imm) {
        imm - 0x100000
    } else {
        imm
    };
    require_nonzero_imm(imm, "c.lui")?;
    ci_type(rd_rs1, imm, 0b01, 0b011)
}

pub fn c_srli(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    check_shamt(imm, "c.srli")?;
    require_nonzero_imm(imm, "c.srli")?;
    Ok(cbi_type(rd_rs1, imm, 0b01, 0b00, 0b100))
}

pub fn c_srai(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    check_shamt(imm, "c.srai")?;
    require_nonzero_imm(imm, "c.srai")?;
    Ok(cbi_type(rd_rs1, imm, 0b01, 0b01, 0b100))
}

pub fn c_andi(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    if !(-32..=31).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "6-bit immediate must be between -32 (-0x20) and 31 (0x1f): {}",
            imm
        )));
    }
    Ok(cbi_type(rd_rs1, imm, 0b01, 0b10, 0b100))
}

pub fn c_sub(rd_rs1: &Reg, rs2: &Reg) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    let rs2 = lookup_register(rs2, true)?;
    Ok(ca_type(rd_rs1, rs2, 0b01, 0b00, 0b100011))
}

pub fn c_xor(rd_rs1: &Reg, rs2: &Reg) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    let rs2 = lookup_register(rs2, true)?;
    Ok(ca_type(rd_rs1, rs2, 0b01, 0b01, 0b100011))
}

pub fn c_or(rd_rs1: &Reg, rs2: &Reg) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    let rs2 = lookup_register(rs2, true)?;
    Ok(ca_type(rd_rs1, rs2, 0b01, 0b10, 0b100011))
}

pub fn c_and(rd_rs1: &Reg, rs2: &Reg) -> Result<u32, EncodeError> {
    let rd_rs1 = lookup_register(rd_rs1, true)?;
    let rs2 = lookup_register(rs2, true)?;
    Ok(ca_type(rd_rs1, rs2, 0b01, 0b11, 0b100011))
}

pub fn c_j(imm: i128) -> Result<u32, EncodeError> {
    cj_type(imm, 0b01, 0b101)
}

pub fn c_beqz(rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rs1 = lookup_register(rs1, true)?;
    cb_type(rs1, imm, 0b01, 0b110)
}

pub fn c_bnez(rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rs1 = lookup_register(rs1, true)?;
    cb_type(rs1, imm, 0b01, 0b111)
}

pub fn c_slli(rd_rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd_rs1 = require_nonzero(rd_rs1, "c.slli", "rd/rs1")?;
    check_shamt(imm, "c.slli")?;
    require_nonzero_imm(imm, "c.slli")?;
    ci_type(rd_rs1, imm, 0b10, 0b000)
}

pub fn c_lwsp(rd: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rd = require_nonzero(rd, "c.lwsp", "rd")?;
    cil_type(rd, imm, 0b10, 0b010)
}

pub fn c_jr(rs1: &Reg) -> Result<u32, EncodeError> {
    let rs1 = require_nonzero(rs1, "c.jr", "rs1")?;
    Ok(cr_type(rs1, 0, 0b10, 0b1000))
}

pub fn c_mv(rd_rs1: &Reg, rs2: &Reg) -> Result<u32, EncodeError> {
    let rd_rs1 = require_nonzero(rd_rs1, "c.mv", "rd")?;
    let rs2 = require_nonzero(rs2, "c.mv", "rs2")?;
    Ok(cr_type(rd_rs1, rs2, 0b10, 0b1000))
}

pub fn c_ebreak() -> u32 {
    cr_type(0, 0, 0b10, 0b1001)
}

pub fn c_jalr(rs1: &Reg) -> Result<u32, EncodeError> {
    let rs1 = require_nonzero(rs1, "c.jalr", "rs1")?;
    Ok(cr_type(rs1, 0, 0b10, 0b1001))
}

pub fn c_add(rd_rs1: &Reg, rs2: &Reg) -> Result<u32, EncodeError> {
    let rd_rs1 = require_nonzero(rd_rs1, "c.add", "rd/rs1")?;
    let rs2 = require_nonzero(rs2, "c.add", "rs2")?;
    Ok(cr_type(rd_rs1, rs2, 0b10, 0b1001))
}

pub fn c_swsp(rs2: &Reg, imm: i128) -> Result<u32, EncodeError> {
    let rs2 = lookup_register(rs2, false)?;
    css_type(rs2, imm, 0b10, 0b110)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(n: i128) -> Reg {
        Reg::Num(n)
    }

    #[test]
    fn test_c_addi4spn() {
        let cases = [
            (8, 4, 0b0000000001000000),
            (8, 1020, 0b0001111111100000),
            (15, 0x01 * 4, 0b0000000001011100),
            (15, 0xff * 4, 0b0001111111111100),
            (8, 8, 0b0000000000100000),
            (8, 12, 0b0000000001100000),
        ];
        for (rd, imm, code) in cases {
            assert_eq!(c_addi4spn(&reg(rd), imm).unwrap(), code, "c.addi4spn x{rd}, {imm}");
        }
    }

    #[test]
    fn test_c_lw() {
        let cases = [
            (8, 8, 0, 0b0100000000000000),
            (8, 8, 124, 0b0101110001100000),
            (8, 15, 0, 0b0100001110000000),
            (15, 8, 0, 0b0100000000011100),
            (15, 15, 124, 0b0101111111111100),
        ];
        for (rd, rs1, imm, code) in cases {
            assert_eq!(c_lw(&reg(rd), &reg(rs1), imm).unwrap(), code, "c.lw x{rd}, {imm}(x{rs1})");
        }
    }

    #[test]
    fn test_c_sw() {
        let cases = [
            (8, 8, 0, 0b1100000000000000),
            (8, 8, 124, 0b1101110001100000),
            (8, 15, 0, 0b1100000000011100),
            (15, 8, 0, 0b1100001110000000),
            (15, 15, 124, 0b1101111111111100),
        ];
        for (rs1, rs2, imm, code) in cases {
            assert_eq!(c_sw(&reg(rs1), &reg(rs2), imm).unwrap(), code, "c.sw x{rs2}, {imm}(x{rs1})");
        }
    }

    #[test]
    fn test_c_nop() {
        assert_eq!(c_nop(), 0b0000000000000001);
    }

    #[test]
    fn test_c_addi() {
        let cases = [
            (1, 1, 0b0000000010000101),
            (1, 31, 0b0000000011111101),
            (1, -1, 0b0001000011111101),
            (1, -32, 0b0001000010000001),
            (31, 1, 0b0000111110000101),
            (31, 31, 0b0000111111111101),
            (31, -1, 0b0001111111111101),
            (31, -32, 0b0001111110000001),
        ];
        for (rd, imm, code) in cases {
            assert_eq!(c_addi(&reg(rd), imm).unwrap(), code, "c.addi x{rd}, {imm}");
        }
    }

    #[test]
    fn test_c_jal() {
        let cases = [
            (0, 0b0010000000000001),
            (2, 0b0010000000001001),
            (4, 0b0010000000010001),
            (8, 0b0010000000100001),
            (16, 0b0010100000000001),
            (32, 0b0010000000000101),
            (64, 0b0010000010000001),
            (128, 0b0010000001000001),
            (256, 0b0010001000000001),
            (512, 0b0010010000000001),
            (1024, 0b0010000100000001),
            (2046, 0b0010111111111101),
            (-2, 0b0011111111111101),
            (-2048, 0b0011000000000001),
        ];
        for (imm, code) in cases {
            assert_eq!(c_jal(imm).unwrap(), code, "c.jal {imm}");
        }
    }

    #[test]
    fn test_c_li() {
        let cases = [
            (1, 1, 0b0100000010000101),
            (1, 31, 0b0100000011111101),
            (1, -1, 0b0101000011111101),
            (1, -32, 0b0101000010000001),
            (31, 1, 0b0100111110000101),
            (31, 31, 0b0100111111111101),
            (31, -1, 0b0101111111111101),
            (31, -32, 0b0101111110000001),
        ];
        for (rd, imm, code) in cases {
            assert_eq!(c_li(&reg(rd), imm).unwrap(), code, "c.li x{rd}, {imm}");
        }
    }

    #[test]
    fn test_c_addi16sp() {
        let cases = [
            (16, 0b0110000101000001),
            (496, 0b0110000101111101),
            (-16, 0b0111000101111101),
            (-512, 0b0111000100000001),
        ];
        for (imm, code) in cases {
            assert_eq!(c_addi16sp(imm).unwrap(), code, "c.addi16sp {imm}");
        }
    }

    #[test]
    fn test_c_lui() {
        let cases = [
            (1, 1, 0b0110000010000101),
            (1, 31, 0b0110000011111101),
            (1, -1, 0b0111000011111101),
            (1, -32, 0b0111000010000001),
            (31, 1, 0b0110111110000101),
            (31, 31, 0b0110111111111101),
            (31, -1, 0b0111111111111101),
            (31, -32, 0b0111111110000001),
        ];
        for (rd, imm, code) in cases {
            assert_eq!(c_lui(&reg(rd), imm).unwrap(), code, "c.lui x{rd}, {imm}");
        }
        // the unsigned upper-half spelling wraps to the negative value
        assert_eq!(c_lui(&reg(1), 0xfffff).unwrap(), c_lui(&reg(1), -1).unwrap());
    }

    #[test]
    fn test_c_shift_immediates() {
        let srli_cases = [
            (8, 1, 0b1000000000000101),
            (8, 31, 0b1000000001111101),
            (15, 1, 0b1000001110000101),
            (15, 31, 0b1000001111111101),
        ];
        for (rd, imm, code) in srli_cases {
            assert_eq!(c_srli(&reg(rd), imm).unwrap(), code, "c.srli x{rd}, {imm}");
        }
        let srai_cases = [
            (8, 1, 0b1000010000000101),
            (8, 31, 0b1000010001111101),
            (15, 1, 0b1000011110000101),
            (15, 31, 0b1000011111111101),
        ];
        for (rd, imm, code) in srai_cases {
            assert_eq!(c_srai(&reg(rd), imm).unwrap(), code, "c.srai x{rd}, {imm}");
        }
    }

    #[test]
    fn test_c_andi() {
        let cases = [
            (8, 1, 0b1000100000000101),
            (8, 31, 0b1000100001111101),
            (15, 1, 0b1000101110000101),
            (15, 31, 0b1000101111111101),
        ];
        for (rd, imm, code) in cases {
            assert_eq!(c_andi(&reg(rd), imm).unwrap(), code, "c.andi x{rd}, {imm}");
        }
    }

    #[test]
    fn test_c_register_arithmetic() {
        assert_eq!(c_sub(&reg(8), &reg(8)).unwrap(), 0b1000110000000001);
        assert_eq!(c_sub(&reg(15), &reg(15)).unwrap(), 0b1000111110011101);
        assert_eq!(c_xor(&reg(8), &reg(15)).unwrap(), 0b1000110000111101);
        assert_eq!(c_or(&reg(15), &reg(8)).unwrap(), 0b1000111111000001);
        assert_eq!(c_and(&reg(15), &reg(15)).unwrap(), 0b1000111111111101);
    }

    #[test]
    fn test_c_j() {
        let cases = [
            (0, 0b1010000000000001),
            (2, 0b1010000000001001),
            (1024, 0b1010000100000001),
            (2046, 0b1010111111111101),
            (-2, 0b1011111111111101),
            (-2048, 0b1011000000000001),
        ];
        for (imm, code) in cases {
            assert_eq!(c_j(imm).unwrap(), code, "c.j {imm}");
        }
    }

    #[test]
    fn test_c_branches() {
        let beqz_cases = [
            (8, 0, 0b1100000000000001),
            (8, 2, 0b1100000000001001),
            (8, 254, 0b1100110001111101),
            (15, -2, 0b1101111111111101),
            (15, -256, 0b1101001110000001),
        ];
        for (rs1, imm, code) in beqz_cases {
            assert_eq!(c_beqz(&reg(rs1), imm).unwrap(), code, "c.beqz x{rs1}, {imm}");
        }
        let bnez_cases = [
            (8, 0, 0b1110000000000001),
            (8, 128, 0b1110000001000001),
            (15, -256, 0b1111001110000001),
        ];
        for (rs1, imm, code) in bnez_cases {
            assert_eq!(c_bnez(&reg(rs1), imm).unwrap(), code, "c.bnez x{rs1}, {imm}");
        }
    }

    #[test]
    fn test_c_slli() {
        let cases = [
            (1, 1, 0b0000000010000110),
            (1, 31, 0b0000000011111110),
            (31, 1, 0b0000111110000110),
            (31, 31, 0b0000111111111110),
        ];
        for (rd, imm, code) in cases {
            assert_eq!(c_slli(&reg(rd), imm).unwrap(), code, "c.slli x{rd}, {imm}");
        }
    }

    #[test]
    fn test_c_lwsp_swsp() {
        let lwsp_cases = [
            (1, 0, 0b0100000010000010),
            (1, 252, 0b0101000011111110),
            (31, 0, 0b0100111110000010),
            (31, 252, 0b0101111111111110),
        ];
        for (rd, imm, code) in lwsp_cases {
            assert_eq!(c_lwsp(&reg(rd), imm).unwrap(), code, "c.lwsp x{rd}, {imm}");
        }
        let swsp_cases = [
            (0, 0, 0b1100000000000010),
            (0, 4, 0b1100001000000010),
            (0, 252, 0b1101111110000010),
            (31, 0, 0b1100000001111110),
        ];
        for (rs2, imm, code) in swsp_cases {
            assert_eq!(c_swsp(&reg(rs2), imm).unwrap(), code, "c.swsp x{rs2}, {imm}");
        }
    }

    #[test]
    fn test_c_jumps_and_moves() {
        assert_eq!(c_jr(&reg(1)).unwrap(), 0b1000000010000010);
        assert_eq!(c_jr(&reg(31)).unwrap(), 0b1000111110000010);
        assert_eq!(c_jalr(&reg(1)).unwrap(), 0b1001000010000010);
        assert_eq!(c_jalr(&reg(31)).unwrap(), 0b1001111110000010);
        assert_eq!(c_mv(&reg(1), &reg(31)).unwrap(), 0b1000000011111110);
        assert_eq!(c_mv(&reg(31), &reg(1)).unwrap(), 0b1000111110000110);
        assert_eq!(c_add(&reg(1), &reg(1)).unwrap(), 0b1001000010000110);
        assert_eq!(c_add(&reg(31), &reg(31)).unwrap(), 0b1001111111111110);
        assert_eq!(c_ebreak(), 0b1001000000000010);
    }

    #[test]
    fn test_c_constraints() {
        assert!(matches!(c_addi4spn(&reg(8), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_addi(&reg(0), 1), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_addi(&reg(1), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_li(&reg(0), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_addi16sp(0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_lui(&reg(0), 1), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_lui(&reg(2), 1), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_lui(&reg(1), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_srli(&reg(8), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_srai(&reg(8), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_slli(&reg(0), 1), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_slli(&reg(1), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_lwsp(&reg(0), 0), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_jr(&reg(0)), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_mv(&reg(0), &reg(2)), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_mv(&reg(1), &reg(0)), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_jalr(&reg(0)), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_add(&reg(0), &reg(2)), Err(EncodeError::Constraint(_))));
        assert!(matches!(c_add(&reg(1), &reg(0)), Err(EncodeError::Constraint(_))));
    }

    #[test]
    fn test_c_register_range() {
        // CL/CS/CA/CB/CIW forms only accept the common registers x8-x15
        assert!(matches!(c_lw(&reg(7), &reg(8), 0), Err(EncodeError::InvalidRegister(_))));
        assert!(matches!(c_sw(&reg(8), &reg(16), 0), Err(EncodeError::InvalidRegister(_))));
        assert!(matches!(c_sub(&reg(1), &reg(8)), Err(EncodeError::InvalidRegister(_))));
        assert!(matches!(c_beqz(&reg(16), 0), Err(EncodeError::InvalidRegister(_))));
        assert!(matches!(c_addi4spn(&reg(2), 4), Err(EncodeError::InvalidRegister(_))));
    }
}
