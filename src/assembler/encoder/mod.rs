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

pub mod base;
pub mod compressed;

use crate::assembler::environment::reg_value;
use crate::ast::{Imm, Item, Reg};
use crate::errors::EncodeError;

/// Resolve a register operand to its field value. Compressed forms only
/// accept the common registers x8-x15 and store them biased by -8.
pub fn lookup_register(reg: &Reg, compressed: bool) -> Result<u32, EncodeError> {
    let value = reg_value(reg).ok_or_else(|| {
        EncodeError::InvalidRegister(format!(
            "register must be a valid integer, name, or alias: {}",
            reg
        ))
    })?;
    if compressed {
        if !(8..=15).contains(&value) {
            return Err(EncodeError::InvalidRegister(format!(
                "compressed register must be between 8 and 15: {}",
                reg
            )));
        }
        // subtract 8 to get the 3-bit field value
        Ok(value - 8)
    } else {
        Ok(value)
    }
}

fn imm_value(imm: &Imm) -> Result<i128, EncodeError> {
    match imm {
        Imm::Value(value) => Ok(*value),
        Imm::Expr(_) => Err(EncodeError::Internal(
            "immediate expression reached the encoder unresolved".to_string(),
        )),
    }
}

/// Encode one instruction item into its little-endian bytes: 4 for base
/// instructions, 2 for compressed ones. Non-instruction items return
/// `None` and pass through the resolver untouched.
pub fn encode_instruction(item: &Item) -> Result<Option<Vec<u8>>, EncodeError> {
    let code = match item {
        Item::RType { name, rd, rs1, rs2, .. } => {
            let params = base::r_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no r-type params: {}", name)))?;
            base::r_type(rd, rs1, rs2, &params)?
        }
        Item::IType { name, rd, rs1, imm, .. } => {
            let params = base::i_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no i-type params: {}", name)))?;
            let value = imm_value(imm)?;
            if name == "jalr" {
                base::ij_type(rd, rs1, value, &params)?
            } else {
                base::i_type(rd, rs1, value, &params)?
            }
        }
        Item::IEType { name, .. } => base::ie_type(name)?,
        Item::SType { name, rs1, rs2, imm, .. } => {
            let params = base::s_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no s-type params: {}", name)))?;
            base::s_type(rs1, rs2, imm_value(imm)?, &params)?
        }
        Item::BType { name, rs1, rs2, imm, .. } => {
            let params = base::b_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no b-type params: {}", name)))?;
            base::b_type(rs1, rs2, imm_value(imm)?, &params)?
        }
        Item::UType { name, rd, imm, .. } => {
            let params = base::u_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no u-type params: {}", name)))?;
            base::u_type(rd, imm_value(imm)?, &params)?
        }
        Item::JType { name, rd, imm, .. } => {
            let params = base::j_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no j-type params: {}", name)))?;
            base::j_type(rd, imm_value(imm)?, &params)?
        }
        Item::Fence { succ, pred, .. } => base::fence(*succ, *pred)?,
        Item::AType { name, rd, rs1, rs2, aq, rl, .. } => {
            let params = base::a_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no a-type params: {}", name)))?;
            base::a_type(rd, rs1, rs2, *aq, *rl, &params)?
        }
        Item::ALType { name, rd, rs1, aq, rl, .. } => {
            // lr.w carries an implicit rs2 of zero
            let params = base::a_params(name)
                .ok_or_else(|| EncodeError::Internal(format!("no a-type params: {}", name)))?;
            base::a_type(rd, rs1, &Reg::Num(0), *aq, *rl, &params)?
        }

        Item::CrType { name, rd_rs1, rs2, .. } => match name.as_str() {
            "c.mv" => compressed::c_mv(rd_rs1, rs2)?,
            "c.add" => compressed::c_add(rd_rs1, rs2)?,
            _ => return Err(EncodeError::Internal(format!("no cr-type encoder: {}", name))),
        },
        Item::CrjType { name, rs1, .. } => match name.as_str() {
            "c.jr" => compressed::c_jr(rs1)?,
            "c.jalr" => compressed::c_jalr(rs1)?,
            _ => return Err(EncodeError::Internal(format!("no crj-type encoder: {}", name))),
        },
        Item::CreType { .. } => compressed::c_ebreak(),
        Item::CinType { .. } => compressed::c_nop(),
        Item::CiType { name, rd_rs1, imm, .. } => {
            let value = imm_value(imm)?;
            match name.as_str() {
                "c.addi" => compressed::c_addi(rd_rs1, value)?,
                "c.li" => compressed::c_li(rd_rs1, value)?,
                "c.slli" => compressed::c_slli(rd_rs1, value)?,
                _ => return Err(EncodeError::Internal(format!("no ci-type encoder: {}", name))),
            }
        }
        Item::CiaType { imm, .. } => compressed::c_addi16sp(imm_value(imm)?)?,
        Item::CiuType { rd_rs1, imm, .. } => compressed::c_lui(rd_rs1, imm_value(imm)?)?,
        Item::CilType { rd, imm, .. } => compressed::c_lwsp(rd, imm_value(imm)?)?,
        Item::CssType { rs2, imm, .. } => compressed::c_swsp(rs2, imm_value(imm)?)?,
        Item::CiwType { rd, imm, .. } => compressed::c_addi4spn(rd, imm_value(imm)?)?,
        Item::ClType { rd, rs1, imm, .. } => compressed::c_lw(rd, rs1, imm_value(imm)?)?,
        Item::CsType { rs1, rs2, imm, .. } => compressed::c_sw(rs1, rs2, imm_value(imm)?)?,
        Item::CaType { name, rd_rs1, rs2, .. } => match name.as_str() {
            "c.sub" => compressed::c_sub(rd_rs1, rs2)?,
            "c.xor" => compressed::c_xor(rd_rs1, rs2)?,
            "c.or" => compressed::c_or(rd_rs1, rs2)?,
            "c.and" => compressed::c_and(rd_rs1, rs2)?,
            _ => return Err(EncodeError::Internal(format!("no ca-type encoder: {}", name))),
        },
        Item::CbType { name, rs1, imm, .. } => {
            let value = imm_value(imm)?;
            match name.as_str() {
                "c.beqz" => compressed::c_beqz(rs1, value)?,
                "c.bnez" => compressed::c_bnez(rs1, value)?,
                _ => return Err(EncodeError::Internal(format!("no cb-type encoder: {}", name))),
            }
        }
        Item::CbiType { name, rd_rs1, imm, .. } => {
            let value = imm_value(imm)?;
            match name.as_str() {
                "c.srli" => compressed::c_srli(rd_rs1, value)?,
                "c.srai" => compressed::c_srai(rd_rs1, value)?,
                "c.andi" => compressed::c_andi(rd_rs1, value)?,
                _ => return Err(EncodeError::Internal(format!("no cbi-type encoder: {}", name))),
            }
        }
        Item::CjType { name, imm, .. } => {
            let value = imm_value(imm)?;
            match name.as_str() {
                "c.jal" => compressed::c_jal(value)?,
                "c.j" => compressed::c_j(value)?,
                _ => return Err(EncodeError::Internal(format!("no cj-type encoder: {}", name))),
            }
        }

        _ => return Ok(None),
    };

    let bytes = if item.size() == 2 {
        (code as u16).to_le_bytes().to_vec()
    } else {
        code.to_le_bytes().to_vec()
    };
    Ok(Some(bytes))
}
