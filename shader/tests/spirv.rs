//! SPIR-V back-end module structure.

use tegra_shader::backend::spirv::emit_spirv;
use tegra_shader::backend::Bindings;
use tegra_shader::ir::{BlockEnd, IrEmitter, Opcode, Program};
use tegra_shader::{opt, Profile, RuntimeInfo, Stage};

const SPIRV_MAGIC: u32 = 0x0723_0203;

fn opcode_of(word: u32) -> u32 {
    word & 0xffff
}

fn count_opcodes(words: &[u32], opcode: u32) -> usize {
    // Instruction-aligned scan from the header onward
    let mut count = 0;
    let mut index = 5;
    while index < words.len() {
        let word = words[index];
        let len = (word >> 16) as usize;
        if len == 0 {
            break;
        }
        if opcode_of(word) == opcode {
            count += 1;
        }
        index += len;
    }
    count
}

fn compile(build: impl FnOnce(&mut IrEmitter) -> Vec<tegra_shader::ir::Value>) -> Vec<u32> {
    let mut program = Program::new(Stage::Compute);
    let block = program.alloc_block(0);
    program.block_order = vec![block];
    {
        let mut ir = IrEmitter::new(&mut program, block);
        for pin in build(&mut ir) {
            ir.inst(Opcode::Reference, &[pin]).unwrap();
        }
    }
    program.set_block_end(block, BlockEnd::Return);
    program.compute_post_order();
    opt::collect_shader_info_pass(&mut program).unwrap();

    let profile = Profile::default();
    let runtime_info = RuntimeInfo::default();
    let mut bindings = Bindings::default();
    emit_spirv(&profile, &runtime_info, &mut program, &mut bindings).unwrap()
}

#[test]
fn module_has_a_valid_header_and_entry_point() {
    let words = compile(|ir| {
        let value = ir.get_cbuf_u32(0, 0).unwrap();
        vec![value]
    });
    assert_eq!(words[0], SPIRV_MAGIC);
    assert_eq!(words[1], Profile::default().supported_spirv);
    // bound is larger than every referenced id
    assert!(words[3] > 1);
    // OpEntryPoint = 15, OpFunction = 54, OpFunctionEnd = 56
    assert_eq!(count_opcodes(&words, 15), 1);
    assert!(count_opcodes(&words, 54) >= 1);
    assert_eq!(count_opcodes(&words, 54), count_opcodes(&words, 56));
    // OpMemoryModel = 14 appears exactly once
    assert_eq!(count_opcodes(&words, 14), 1);
}

#[test]
fn arithmetic_lowers_to_core_opcodes() {
    let words = compile(|ir| {
        let a = ir.get_cbuf_u32(0, 0).unwrap();
        let b = ir.get_cbuf_u32(0, 4).unwrap();
        let sum = ir.iadd(a, b).unwrap();
        vec![sum]
    });
    // OpIAdd = 128
    assert!(count_opcodes(&words, 128) >= 1);
    // One uniform block per referenced constant buffer: OpTypeStruct = 30
    assert!(count_opcodes(&words, 30) >= 1);
}

#[test]
fn local_size_execution_mode_is_declared_for_compute() {
    let words = compile(|ir| {
        let value = ir.get_cbuf_u32(0, 0).unwrap();
        vec![value]
    });
    // OpExecutionMode = 16
    assert!(count_opcodes(&words, 16) >= 1);
}

#[test]
fn conditional_flow_gets_a_selection_merge() {
    let mut program = Program::new(Stage::Compute);
    let entry = program.alloc_block(0);
    let then_block = program.alloc_block(8);
    let join = program.alloc_block(16);
    program.block_order = vec![entry, then_block, join];
    let cond = {
        let mut ir = IrEmitter::new(&mut program, entry);
        let value = ir.get_cbuf_u32(0, 0).unwrap();
        let zero = ir.imm32(0);
        let is_set = ir.inot_equal(value, zero).unwrap();
        ir.condition_ref(is_set).unwrap()
    };
    {
        let mut ir = IrEmitter::new(&mut program, then_block);
        let value = ir.get_cbuf_u32(0, 4).unwrap();
        ir.inst(Opcode::Reference, &[value]).unwrap();
    }
    program.set_block_end(
        entry,
        BlockEnd::Conditional { cond, true_block: then_block, false_block: join },
    );
    program.set_block_end(then_block, BlockEnd::Unconditional(join));
    program.set_block_end(join, BlockEnd::Return);
    program.compute_post_order();
    opt::collect_shader_info_pass(&mut program).unwrap();

    let profile = Profile::default();
    let runtime_info = RuntimeInfo::default();
    let mut bindings = Bindings::default();
    let words = emit_spirv(&profile, &runtime_info, &mut program, &mut bindings).unwrap();
    // OpSelectionMerge = 247, OpBranchConditional = 250
    assert_eq!(count_opcodes(&words, 247), 1);
    assert_eq!(count_opcodes(&words, 250), 1);
}
