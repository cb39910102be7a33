//! SSA construction behavior on decoded guest programs.

use tegra_shader::environment::Environment;
use tegra_shader::ir::{Opcode, Program, TextureType, Value};
use tegra_shader::{frontend, opt, Stage};

struct MockEnvironment {
    words: Vec<u64>,
    stage: Stage,
}

impl Environment for MockEnvironment {
    fn read_guest(&self, addr: u64, dest: &mut [u8]) {
        let word = self.words.get((addr / 8) as usize).copied().unwrap_or(0);
        let bytes = word.to_le_bytes();
        let len = dest.len().min(8);
        dest[..len].copy_from_slice(&bytes[..len]);
    }

    fn read_texture_type(&self, _handle: u32) -> TextureType {
        TextureType::Color2D
    }

    fn start_address(&self) -> u64 {
        0
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn local_memory_size(&self) -> u32 {
        0
    }

    fn shared_memory_size(&self) -> u32 {
        0
    }
}

const PT: u64 = 7 << 16;
const FLOW_T: u64 = 0x0f;

fn ldc_b32(dest: u64, index: u64, offset: u64) -> u64 {
    (0b1110_1111_1001_0100u64 << 48) | PT | dest | (255 << 8) | (offset << 20) | (index << 36)
}

fn iadd_reg(dest: u64, src_a: u64, src_b: u64, pred: u64) -> u64 {
    (0b0101_1100_0001_0000u64 << 48) | (pred << 16) | dest | (src_a << 8) | (src_b << 20)
}

fn mov32i(dest: u64, imm: u64) -> u64 {
    (0b0000_0001_0000_0000u64 << 48) | PT | dest | (imm << 20)
}

fn bra(addr: u64, target: u64, pred: u64, flow: u64) -> u64 {
    let offset = (target as i64 - addr as i64 - 8) as u64 & 0xff_ffff;
    (0b1110_0010_0100_0000u64 << 48) | (pred << 16) | (offset << 20) | flow
}

fn exit() -> u64 {
    (0b1110_0011_0000_0000u64 << 48) | PT | FLOW_T
}

/// Lays instructions out with a scheduling control word before every three.
fn assemble(instructions: &[u64]) -> Vec<u64> {
    let mut words = Vec::new();
    let mut source = instructions.iter();
    loop {
        words.push(0); // control word
        for _ in 0..3 {
            match source.next() {
                Some(&insn) => words.push(insn),
                None => return words,
            }
        }
    }
}

fn find_insts(program: &Program, opcode: Opcode) -> Vec<tegra_shader::ir::InstId> {
    let mut found = Vec::new();
    for block in program.rpo() {
        for &inst in program.block(block).instructions() {
            if program.inst(inst).opcode() == opcode {
                found.push(inst);
            }
        }
    }
    found
}

#[test]
fn pre_ssa_variables_are_fully_replaced() {
    let env = MockEnvironment {
        words: assemble(&[
            ldc_b32(2, 0, 0),
            ldc_b32(3, 0, 4),
            iadd_reg(4, 2, 3, 7),
            iadd_reg(5, 4, 4, 7),
            exit(),
        ]),
        stage: Stage::Compute,
    };
    let mut program = frontend::translate(&env).unwrap();
    opt::ssa_rewrite_pass(&mut program).unwrap();
    for opcode in [
        Opcode::GetRegister,
        Opcode::SetRegister,
        Opcode::GetPred,
        Opcode::SetPred,
        Opcode::GetZFlag,
        Opcode::GetGotoVariable,
    ]
    .iter()
    {
        for inst in find_insts(&program, *opcode) {
            // Reads must have been rewritten into identities; writes are
            // dead wrappers at this point
            if matches!(*opcode, Opcode::GetRegister | Opcode::GetPred | Opcode::GetZFlag) {
                panic!("unrewritten {} after SSA", program.inst(inst).opcode());
            }
        }
    }
}

#[test]
fn predicated_instruction_reaches_downstream_through_a_phi() {
    // @P0 IADD R4,R2,R3 followed by a use of R4
    let env = MockEnvironment {
        words: assemble(&[
            ldc_b32(2, 0, 0),
            ldc_b32(3, 0, 4),
            iadd_reg(4, 2, 3, 0),
            iadd_reg(5, 4, 4, 7),
            exit(),
        ]),
        stage: Stage::Compute,
    };
    let mut program = frontend::translate(&env).unwrap();
    opt::ssa_rewrite_pass(&mut program).unwrap();

    let adds = find_insts(&program, Opcode::IAdd32);
    assert_eq!(adds.len(), 2);
    let phis = find_insts(&program, Opcode::Phi);
    assert!(!phis.is_empty(), "the predicated write must merge through a phi");
    let guarded_add = adds[0];
    let phi_with_add = phis.iter().any(|&phi| {
        (0..program.inst(phi).num_args())
            .any(|index| program.arg(phi, index).resolve(&program) == Value::Inst(guarded_add))
    });
    assert!(phi_with_add, "downstream reads must see the guarded IAdd32 through the phi");
}

#[test]
fn diamond_join_gets_one_nontrivial_phi() {
    // if P0 { R2 = 2 } else { R2 = 1 }; R3 = R2 + R2
    let i1 = bra(8, 40, 0, FLOW_T);
    let i2 = mov32i(2, 1);
    let i3 = bra(24, 48, 7, FLOW_T);
    let i5 = mov32i(2, 2);
    let i6 = iadd_reg(3, 2, 2, 7);
    let env = MockEnvironment {
        words: assemble(&[i1, i2, i3, /* sched */ i5, i6, exit()]),
        stage: Stage::Compute,
    };
    let mut program = frontend::translate(&env).unwrap();
    opt::ssa_rewrite_pass(&mut program).unwrap();

    // The only surviving phi merges the two constants; simplification must
    // not have fired
    let phis: Vec<_> = find_insts(&program, Opcode::Phi)
        .into_iter()
        .filter(|&phi| program.inst(phi).num_args() > 0)
        .collect();
    assert_eq!(phis.len(), 1, "exactly one phi joins the diamond");
    let phi = phis[0];
    assert_eq!(program.inst(phi).num_args(), 2);
    let mut operands: Vec<Value> = (0..2)
        .map(|index| program.arg(phi, index).resolve(&program))
        .collect();
    operands.sort_by_key(|value| match value {
        Value::U32(imm) => *imm,
        _ => u32::max_value(),
    });
    assert_eq!(operands, vec![Value::U32(1), Value::U32(2)]);
    // Each phi operand's predecessor is a predecessor of the join block
    let join = program
        .rpo()
        .find(|&block| program.block(block).instructions().contains(&phi))
        .unwrap();
    for index in 0..2 {
        let pred = program.phi_block(phi, index).unwrap();
        assert!(program.block(join).imm_predecessors().contains(&pred));
    }
}
