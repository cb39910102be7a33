//! System register reads.

use super::*;
use crate::error::Error;

/// S2R: system value selector at bits 20..28.
pub(super) fn s2r(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let dest = dest_reg(insn);
    let value = match (insn >> 20) & 0xff {
        // SR_LANEID
        0 => ir.lane_id()?,
        // SR_TID.X/Y/Z
        33 | 34 | 35 => {
            let element = ((insn >> 20) & 0xff) as u32 - 33;
            let id = ir.local_invocation_id()?;
            ir.composite_extract(id, element)?
        }
        // SR_CTAID.X/Y/Z
        37 | 38 | 39 => {
            let element = ((insn >> 20) & 0xff) as u32 - 37;
            let id = ir.workgroup_id()?;
            ir.composite_extract(id, element)?
        }
        other => {
            return Err(Error::not_implemented(format!("system register {}", other)));
        }
    };
    ir.set_register(dest, value)
}
