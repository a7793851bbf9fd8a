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

//! Encoders for the 32-bit RV32IMA instruction forms. Each function takes
//! operands plus the per-mnemonic parameters and returns the raw
//! instruction word; the caller packs it little-endian.

use super::lookup_register;
use crate::ast::Reg;
use crate::errors::EncodeError;

pub struct RParams {
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
}

pub struct IParams {
    pub opcode: u32,
    pub funct3: u32,
}

pub struct UParams {
    pub opcode: u32,
}

pub struct AParams {
    pub opcode: u32,
    pub funct3: u32,
    pub funct5: u32,
}

pub fn r_type(rd: &Reg, rs1: &Reg, rs2: &Reg, params: &RParams) -> Result<u32, EncodeError> {
    let rd = lookup_register(rd, false)?;
    let rs1 = lookup_register(rs1, false)?;
    let rs2 = lookup_register(rs2, false)?;

    let mut code = 0;
    code |= params.opcode;
    code |= rd << 7;
    code |= params.funct3 << 12;
    code |= rs1 << 15;
    code |= rs2 << 20;
    code |= params.funct7 << 25;
    Ok(code)
}

pub fn i_type(rd: &Reg, rs1: &Reg, imm: i128, params: &IParams) -> Result<u32, EncodeError> {
    let rd = lookup_register(rd, false)?;
    let rs1 = lookup_register(rs1, false)?;

    if !(-0x800..=0x7ff).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "12-bit immediate must be between -0x800 (-2048) and 0x7ff (2047): {}",
            imm
        )));
    }
    let imm = (imm as u32) & 0b1111_1111_1111;

    let mut code = 0;
    code |= params.opcode;
    code |= rd << 7;
    code |= params.funct3 << 12;
    code |= rs1 << 15;
    code |= imm << 20;
    Ok(code)
}

// i-type variation for JALR: the target must stay halfword-aligned
pub fn ij_type(rd: &Reg, rs1: &Reg, imm: i128, params: &IParams) -> Result<u32, EncodeError> {
    if !(-0x800..=0x7ff).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "12-bit immediate must be between -0x800 (-2048) and 0x7ff (2047): {}",
            imm
        )));
    }
    if imm % 2 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "12-bit immediate must be a multiple of 2: {}",
            imm
        )));
    }
    i_type(rd, rs1, imm, params)
}

pub fn s_type(rs1: &Reg, rs2: &Reg, imm: i128, params: &IParams) -> Result<u32, EncodeError> {
    let rs1 = lookup_register(rs1, false)?;
    let rs2 = lookup_register(rs2, false)?;

    if !(-0x800..=0x7ff).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "12-bit immediate must be between -0x800 (-2048) and 0x7ff (2047): {}",
            imm
        )));
    }
    let imm = (imm as u32) & 0b1111_1111_1111;
    let imm_11_5 = (imm >> 5) & 0b111_1111;
    let imm_4_0 = imm & 0b1_1111;

    let mut code = 0;
    code |= params.opcode;
    code |= imm_4_0 << 7;
    code |= params.funct3 << 12;
    code |= rs1 << 15;
    code |= rs2 << 20;
    code |= imm_11_5 << 25;
    Ok(code)
}

pub fn b_type(rs1: &Reg, rs2: &Reg, imm: i128, params: &IParams) -> Result<u32, EncodeError> {
    let rs1 = lookup_register(rs1, false)?;
    let rs2 = lookup_register(rs2, false)?;

    if !(-0x1000..=0xfff).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "12-bit MO2 immediate must be between -0x1000 (-4096) and 0x0fff (4095): {}",
            imm
        )));
    }
    if imm % 2 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "12-bit MO2 immediate must be a multiple of 2: {}",
            imm
        )));
    }
    let imm = ((imm >> 1) as u32) & 0b1111_1111_1111;
    let imm_12 = (imm >> 11) & 0b1;
    let imm_11 = (imm >> 10) & 0b1;
    let imm_10_5 = (imm >> 4) & 0b11_1111;
    let imm_4_1 = imm & 0b1111;

    let mut code = 0;
    code |= params.opcode;
    code |= imm_11 << 7;
    code |= imm_4_1 << 8;
    code |= params.funct3 << 12;
    code |= rs1 << 15;
    code |= rs2 << 20;
    code |= imm_10_5 << 25;
    code |= imm_12 << 31;
    Ok(code)
}

/// U-type accepts the signed range plus the unsigned upper-half spellings
/// `0x80000..=0xfffff`, which wrap to the corresponding negative values.
pub fn u_type(rd: &Reg, imm: i128, params: &UParams) -> Result<u32, EncodeError> {
    let rd = lookup_register(rd, false)?;

    if !(-0x80000..=0xfffff).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "20-bit immediate must be between -0x80000 (-524288) and 0xfffff (1048575): {}",
            imm
        )));
    }
    let imm = (imm as u32) & 0b1111_1111_1111_1111_1111;

    let mut code = 0;
    code |= params.opcode;
    code |= rd << 7;
    code |= imm << 12;
    Ok(code)
}

pub fn j_type(rd: &Reg, imm: i128, params: &UParams) -> Result<u32, EncodeError> {
    let rd = lookup_register(rd, false)?;

    if !(-0x100000..=0xfffff).contains(&imm) {
        return Err(EncodeError::OutOfRange(format!(
            "20-bit MO2 immediate must be between -0x100000 (-1048576) and 0x0fffff (1048575): {}",
            imm
        )));
    }
    if imm % 2 != 0 {
        return Err(EncodeError::NotAligned(format!(
            "20-bit MO2 immediate must be a multiple of 2: {}",
            imm
        )));
    }
    let imm = ((imm >> 1) as u32) & 0b1111_1111_1111_1111_1111;
    let imm_20 = (imm >> 19) & 0b1;
    let imm_19_12 = (imm >> 11) & 0b1111_1111;
    let imm_11 = (imm >> 10) & 0b1;
    let imm_10_1 = imm & 0b11_1111_1111;

    let mut code = 0;
    code |= params.opcode;
    code |= rd << 7;
    code |= imm_19_12 << 12;
    code |= imm_11 << 20;
    code |= imm_10_1 << 21;
    code |= imm_20 << 31;
    Ok(code)
}

pub fn fence(succ: u32, pred: u32) -> Result<u32, EncodeError> {
    if succ > 0b1111 {
        return Err(EncodeError::OutOfRange(format!(
            "invalid successor value for FENCE instruction: {}",
            succ
        )));
    }
    if pred > 0b1111 {
        return Err(EncodeError::OutOfRange(format!(
            "invalid predecessor value for FENCE instruction: {}",
            pred
        )));
    }

    // fm = 0; the imm rides in the i-type slot
    let imm = (pred << 4) | succ;
    i_type(
        &Reg::Num(0),
        &Reg::Num(0),
        imm as i128,
        &IParams { opcode: 0b0001111, funct3: 0b000 },
    )
}

pub fn a_type(
    rd: &Reg,
    rs1: &Reg,
    rs2: &Reg,
    aq: u32,
    rl: u32,
    params: &AParams,
) -> Result<u32, EncodeError> {
    if aq > 1 {
        return Err(EncodeError::OutOfRange("aq must be either 0 or 1".to_string()));
    }
    if rl > 1 {
        return Err(EncodeError::OutOfRange("rl must be either 0 or 1".to_string()));
    }

    // build aq/rl into a funct7 and defer to r_type
    let funct7 = (params.funct5 << 2) | (aq << 1) | rl;
    r_type(
        rd,
        rs1,
        rs2,
        &RParams { opcode: params.opcode, funct3: params.funct3, funct7 },
    )
}

pub fn ie_type(name: &str) -> Result<u32, EncodeError> {
    let imm = match name {
        "ecall" => 0,
        "ebreak" => 1,
        _ => return Err(EncodeError::Internal(format!("no ie-type encoder: {}", name))),
    };
    i_type(
        &Reg::Num(0),
        &Reg::Num(0),
        imm,
        &IParams { opcode: 0b1110011, funct3: 0b000 },
    )
}

// RV32I base integer set plus the M extension; the shift-immediate
// instructions are r-type with the shift amount in the rs2 field.
pub fn r_params(name: &str) -> Option<RParams> {
    let (opcode, funct3, funct7) = match name {
        "slli" => (0b0010011, 0b001, 0b0000000),
        "srli" => (0b0010011, 0b101, 0b0000000),
        "srai" => (0b0010011, 0b101, 0b0100000),
        "add" => (0b0110011, 0b000, 0b0000000),
        "sub" => (0b0110011, 0b000, 0b0100000),
        "sll" => (0b0110011, 0b001, 0b0000000),
        "slt" => (0b0110011, 0b010, 0b0000000),
        "sltu" => (0b0110011, 0b011, 0b0000000),
        "xor" => (0b0110011, 0b100, 0b0000000),
        "srl" => (0b0110011, 0b101, 0b0000000),
        "sra" => (0b0110011, 0b101, 0b0100000),
        "or" => (0b0110011, 0b110, 0b0000000),
        "and" => (0b0110011, 0b111, 0b0000000),
        "mul" => (0b0110011, 0b000, 0b0000001),
        "mulh" => (0b0110011, 0b001, 0b0000001),
        "mulhsu" => (0b0110011, 0b010, 0b0000001),
        "mulhu" => (0b0110011, 0b011, 0b0000001),
        "div" => (0b0110011, 0b100, 0b0000001),
        "divu" => (0b0110011, 0b101, 0b0000001),
        "rem" => (0b0110011, 0b110, 0b0000001),
        "remu" => (0b0110011, 0b111, 0b0000001),
        _ => return None,
    };
    Some(RParams { opcode, funct3, funct7 })
}

pub fn i_params(name: &str) -> Option<IParams> {
    let (opcode, funct3) = match name {
        "jalr" => (0b1100111, 0b000),
        "lb" => (0b0000011, 0b000),
        "lh" => (0b0000011, 0b001),
        "lw" => (0b0000011, 0b010),
        "lbu" => (0b0000011, 0b100),
        "lhu" => (0b0000011, 0b101),
        "addi" => (0b0010011, 0b000),
        "slti" => (0b0010011, 0b010),
        "sltiu" => (0b0010011, 0b011),
        "xori" => (0b0010011, 0b100),
        "ori" => (0b0010011, 0b110),
        "andi" => (0b0010011, 0b111),
        _ => return None,
    };
    Some(IParams { opcode, funct3 })
}

pub fn ie_names(name: &str) -> bool {
    matches!(name, "ecall" | "ebreak")
}

pub fn s_params(name: &str) -> Option<IParams> {
    let funct3 = match name {
        "sb" => 0b000,
        "sh" => 0b001,
        "sw" => 0b010,
        _ => return None,
    };
    Some(IParams { opcode: 0b0100011, funct3 })
}

pub fn b_params(name: &str) -> Option<IParams> {
    let funct3 = match name {
        "beq" => 0b000,
        "bne" => 0b001,
        "blt" => 0b100,
        "bge" => 0b101,
        "bltu" => 0b110,
        "bgeu" => 0b111,
        _ => return None,
    };
    Some(IParams { opcode: 0b1100011, funct3 })
}

pub fn u_params(name: &str) -> Option<UParams> {
    let opcode = match name {
        "lui" => 0b0110111,
        "auipc" => 0b0010111,
        _ => return None,
    };
    Some(UParams { opcode })
}

pub fn j_params(name: &str) -> Option<UParams> {
    match name {
        "jal" => Some(UParams { opcode: 0b1101111 }),
        _ => None,
    }
}

pub fn a_params(name: &str) -> Option<AParams> {
    let funct5 = match name {
        "lr.w" => 0b00010,
        "sc.w" => 0b00011,
        "amoswap.w" => 0b00001,
        "amoadd.w" => 0b00000,
        "amoxor.w" => 0b00100,
        "amoand.w" => 0b01100,
        "amoor.w" => 0b01000,
        "amomin.w" => 0b10000,
        "amomax.w" => 0b10100,
        "amominu.w" => 0b11000,
        "amomaxu.w" => 0b11100,
        _ => return None,
    };
    Some(AParams { opcode: 0b0101111, funct3: 0b010, funct5 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addi(rd: &Reg, rs1: &Reg, imm: i128) -> Result<u32, EncodeError> {
        i_type(rd, rs1, imm, &i_params("addi").unwrap())
    }

    #[test]
    fn test_addi_known_encoding() {
        // addi t0, zero, 1
        let code = addi(&Reg::from("t0"), &Reg::from("zero"), 1).unwrap();
        assert_eq!(code, 0x0010_0293);
    }

    #[test]
    fn test_register_symmetry() {
        for n in 0..32u32 {
            let by_name = addi(&Reg::Name(format!("x{}", n)), &Reg::from("zero"), 0).unwrap();
            let by_digit = addi(&Reg::Name(format!("{}", n)), &Reg::from("zero"), 0).unwrap();
            let by_num = addi(&Reg::Num(n as i128), &Reg::from("zero"), 0).unwrap();
            assert_eq!(by_name, by_digit);
            assert_eq!(by_name, by_num);
        }
        // ABI aliases hit the same encodings
        let alias = addi(&Reg::from("s0"), &Reg::from("zero"), 0).unwrap();
        let arch = addi(&Reg::from("x8"), &Reg::from("zero"), 0).unwrap();
        let fp = addi(&Reg::from("fp"), &Reg::from("zero"), 0).unwrap();
        assert_eq!(alias, arch);
        assert_eq!(alias, fp);
    }

    #[test]
    fn test_i_type_boundaries() {
        let zero = Reg::from("zero");
        assert!(addi(&zero, &zero, -2048).is_ok());
        assert!(addi(&zero, &zero, 2047).is_ok());
        assert!(matches!(addi(&zero, &zero, -2049), Err(EncodeError::OutOfRange(_))));
        assert!(matches!(addi(&zero, &zero, 2048), Err(EncodeError::OutOfRange(_))));
    }

    #[test]
    fn test_invalid_register() {
        let err = addi(&Reg::from("q7"), &Reg::from("zero"), 0).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidRegister(_)));
        let err = addi(&Reg::from("x32"), &Reg::from("zero"), 0).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidRegister(_)));
    }

    #[test]
    fn test_b_type_known_encoding() {
        // beq t0, zero, +12
        let code = b_type(
            &Reg::from("t0"),
            &Reg::from("zero"),
            12,
            &b_params("beq").unwrap(),
        )
        .unwrap();
        assert_eq!(code, 0x0002_8663);
    }

    #[test]
    fn test_b_type_must_be_even() {
        let err = b_type(&Reg::from("t0"), &Reg::from("zero"), 13, &b_params("beq").unwrap())
            .unwrap_err();
        assert!(matches!(err, EncodeError::NotAligned(_)));
    }

    #[test]
    fn test_j_type_known_encoding() {
        // jal zero, +12
        let code = j_type(&Reg::from("zero"), 12, &j_params("jal").unwrap()).unwrap();
        assert_eq!(code, 0x00c0_006f);
        // jal zero, -8
        let code = j_type(&Reg::from("zero"), -8, &j_params("jal").unwrap()).unwrap();
        assert_eq!(code, 0xff9f_f06f);
    }

    #[test]
    fn test_j_type_must_be_even() {
        let err = j_type(&Reg::from("zero"), 3, &j_params("jal").unwrap()).unwrap_err();
        assert!(matches!(err, EncodeError::NotAligned(_)));
    }

    #[test]
    fn test_u_type_accepts_upper_half_spelling() {
        let params = u_params("lui").unwrap();
        let unsigned = u_type(&Reg::from("a4"), 0xfffff, &params).unwrap();
        let signed = u_type(&Reg::from("a4"), -1, &params).unwrap();
        assert_eq!(unsigned, signed);
        assert!(matches!(
            u_type(&Reg::from("a4"), 0x100000, &params),
            Err(EncodeError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_jalr_must_be_even() {
        let err = ij_type(&Reg::from("x0"), &Reg::from("x1"), 1, &i_params("jalr").unwrap())
            .unwrap_err();
        assert!(matches!(err, EncodeError::NotAligned(_)));
    }

    #[test]
    fn test_fence_nibble_ranges() {
        assert!(fence(0b1111, 0b1111).is_ok());
        assert!(matches!(fence(16, 0), Err(EncodeError::OutOfRange(_))));
        assert!(matches!(fence(0, 16), Err(EncodeError::OutOfRange(_))));
    }

    #[test]
    fn test_a_type_ordering_bits() {
        let params = a_params("amoswap.w").unwrap();
        let plain = a_type(&Reg::from("a0"), &Reg::from("a1"), &Reg::from("a2"), 0, 0, &params)
            .unwrap();
        let acquire = a_type(&Reg::from("a0"), &Reg::from("a1"), &Reg::from("a2"), 1, 0, &params)
            .unwrap();
        assert_eq!(acquire, plain | (1 << 26));
        assert!(matches!(
            a_type(&Reg::from("a0"), &Reg::from("a1"), &Reg::from("a2"), 2, 0, &params),
            Err(EncodeError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_slli_shamt_rides_in_rs2() {
        // slli a4, a4, 0xa
        let code = r_type(
            &Reg::from("a4"),
            &Reg::from("a4"),
            &Reg::from("0xa"),
            &r_params("slli").unwrap(),
        )
        .unwrap();
        assert_eq!(code, 0x00a7_1713);
    }
}
