//! Use-count and rewrite invariants of the instruction model.

use tegra_shader::ir::{BlockEnd, IrEmitter, Opcode, Program, Value};
use tegra_shader::Stage;

fn count_references(program: &Program, target: Value) -> u32 {
    let mut count = 0;
    for block in program.rpo() {
        for &inst in program.block(block).instructions() {
            for index in 0..program.inst(inst).num_args() {
                if program.arg(inst, index) == target {
                    count += 1;
                }
            }
        }
    }
    count
}

fn assert_use_counts_consistent(program: &Program) {
    for block in program.rpo() {
        for &inst in program.block(block).instructions() {
            let expected = count_references(program, Value::Inst(inst));
            assert_eq!(
                program.inst(inst).use_count(),
                expected,
                "use count mismatch on {}",
                program.inst(inst).opcode()
            );
        }
    }
}

fn single_block_program() -> (Program, tegra_shader::ir::BlockId) {
    let mut program = Program::new(Stage::Compute);
    let block = program.alloc_block(0);
    program.block_order = vec![block];
    (program, block)
}

#[test]
fn use_counts_track_argument_slots() {
    let (mut program, block) = single_block_program();
    let mut ir = IrEmitter::new(&mut program, block);
    let a = ir.get_cbuf_u32(0, 0).unwrap();
    let b = ir.get_cbuf_u32(0, 4).unwrap();
    let sum = ir.iadd(a, b).unwrap();
    let doubled = ir.iadd(sum, sum).unwrap();
    ir.inst(Opcode::Reference, &[doubled]).unwrap();
    program.set_block_end(block, BlockEnd::Return);
    program.compute_post_order();

    let sum_inst = sum.inst().unwrap();
    assert_eq!(program.inst(sum_inst).use_count(), 2);
    assert_use_counts_consistent(&program);
}

#[test]
fn invalidate_releases_uses() {
    let (mut program, block) = single_block_program();
    let mut ir = IrEmitter::new(&mut program, block);
    let a = ir.get_cbuf_u32(0, 0).unwrap();
    let sum = ir.iadd(a, a).unwrap();
    program.set_block_end(block, BlockEnd::Return);
    program.compute_post_order();

    let a_inst = a.inst().unwrap();
    let sum_inst = sum.inst().unwrap();
    assert_eq!(program.inst(a_inst).use_count(), 2);
    program.invalidate(sum_inst).unwrap();
    assert_eq!(program.inst(a_inst).use_count(), 0);
    assert_eq!(program.inst(sum_inst).opcode(), Opcode::Void);
}

#[test]
fn replace_uses_with_is_transparent() {
    let (mut program, block) = single_block_program();
    let mut ir = IrEmitter::new(&mut program, block);
    let a = ir.get_cbuf_u32(0, 0).unwrap();
    let user = ir.iadd(a, a).unwrap();
    program.set_block_end(block, BlockEnd::Return);
    program.compute_post_order();

    let a_inst = a.inst().unwrap();
    program.replace_uses_with(a_inst, Value::U32(42)).unwrap();
    // Readers traversing identity chains see the replacement
    assert_eq!(a.resolve(&program), Value::U32(42));
    let user_inst = user.inst().unwrap();
    assert_eq!(program.arg(user_inst, 0).resolve(&program), Value::U32(42));
    assert!(Value::Inst(a_inst).is_immediate(&program));
}

#[test]
fn argument_types_are_checked() {
    let (mut program, block) = single_block_program();
    let mut ir = IrEmitter::new(&mut program, block);
    // IAdd32 takes U32 arguments; a F32 immediate must be rejected
    let err = ir.inst(Opcode::IAdd32, &[Value::imm_f32(1.0), Value::U32(2)]);
    assert!(err.is_err());
}

#[test]
fn one_pseudo_consumer_per_kind() {
    let (mut program, block) = single_block_program();
    let mut ir = IrEmitter::new(&mut program, block);
    let a = ir.get_cbuf_u32(0, 0).unwrap();
    let sum = ir.iadd(a, a).unwrap();
    let zero = ir.get_zero_from_op(sum).unwrap();
    let sum_inst = sum.inst().unwrap();
    assert_eq!(
        program.associated_pseudo_operation(sum_inst, Opcode::GetZeroFromOp),
        zero.inst()
    );
    // A second zero consumer violates the one-per-kind invariant
    let mut ir = IrEmitter::new(&mut program, block);
    assert!(ir.get_zero_from_op(sum).is_err());
}
