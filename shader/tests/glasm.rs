//! GLASM back-end behavior.

use tegra_shader::backend::glasm::emit_glasm;
use tegra_shader::backend::Bindings;
use tegra_shader::ir::{BlockEnd, IrEmitter, Opcode, Program};
use tegra_shader::{opt, Profile, RuntimeInfo, Stage};

fn program_with<F>(build: F) -> Program
where
    F: FnOnce(&mut IrEmitter) -> Vec<tegra_shader::ir::Value>,
{
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
    program
}

fn emit(program: &mut Program) -> String {
    let profile = Profile::default();
    let runtime_info = RuntimeInfo::default();
    let mut bindings = Bindings::default();
    emit_glasm(&profile, &runtime_info, program, &mut bindings).unwrap()
}

#[test]
fn out_of_bounds_cbuf_reads_zero() {
    let mut program = program_with(|ir| {
        let value = ir.get_cbuf_u32(0, 0x20000).unwrap();
        vec![value]
    });
    let source = emit(&mut program);
    assert!(source.contains("MOV.S R0,0;"), "no guard in:\n{}", source);
    assert!(!source.contains("LDC."), "guarded load still emitted:\n{}", source);
}

#[test]
fn in_bounds_cbuf_reads_load() {
    let mut program = program_with(|ir| {
        let value = ir.get_cbuf_u32(3, 0x10).unwrap();
        vec![value]
    });
    let source = emit(&mut program);
    assert!(source.contains("LDC.U32 R0,c3[16];"), "missing load in:\n{}", source);
}

#[test]
fn bit_casts_share_the_source_register() {
    let mut program = program_with(|ir| {
        let raw = ir.get_cbuf_u32(0, 0).unwrap();
        let float = ir.bitcast_u32_f32(raw).unwrap();
        let back = ir.bitcast_f32_u32(float).unwrap();
        vec![raw, float, back]
    });
    let raw_inst;
    let float_inst;
    let back_inst;
    {
        let block = program.block_order[0];
        let loads: Vec<_> = program
            .block(block)
            .instructions()
            .iter()
            .copied()
            .filter(|&id| {
                matches!(
                    program.inst(id).opcode(),
                    Opcode::GetCbufU32 | Opcode::BitCastF32U32 | Opcode::BitCastU32F32
                )
            })
            .collect();
        raw_inst = loads[0];
        float_inst = loads[1];
        back_inst = loads[2];
    }
    let source = emit(&mut program);
    // The whole alias chain resolves to one physical register
    let raw_def = program.inst(raw_inst).definition();
    assert_eq!(program.inst(float_inst).definition(), raw_def);
    assert_eq!(program.inst(back_inst).definition(), raw_def);
    assert!(source.contains("LDC.U32"));
}

#[test]
fn precise_adds_carry_the_prec_suffix() {
    use tegra_shader::ir::{FpControl, FpRounding};
    let mut program = program_with(|ir| {
        let binding = ir.imm32(0);
        let offset = ir.imm32(0);
        let a = ir.get_float_cbuf(binding, offset).unwrap();
        let offset_b = ir.imm32(4);
        let b = ir.get_float_cbuf(binding, offset_b).unwrap();
        let control = FpControl {
            no_contraction: true,
            rounding: FpRounding::DontCare,
            fmz_mode: Default::default(),
        };
        let sum = ir.fp_add(control, a, b).unwrap();
        vec![sum]
    });
    let source = emit(&mut program);
    assert!(source.contains("ADD.F.PREC"), "missing .PREC in:\n{}", source);
}

#[test]
fn bfe_with_immediate_operands_packs_them() {
    let mut program = program_with(|ir| {
        let base = ir.get_cbuf_u32(0, 0).unwrap();
        let offset = ir.imm32(8);
        let count = ir.imm32(5);
        let field = ir.bit_field_extract(base, offset, count, false).unwrap();
        vec![field]
    });
    let source = emit(&mut program);
    assert!(source.contains("BFE.U"), "missing BFE in:\n{}", source);
    assert!(source.contains("{5,8,0,0}"), "operands not packed in:\n{}", source);
}

#[test]
fn convert_applies_rounding_suffix() {
    use tegra_shader::ir::{FmzMode, FpControl, FpRounding};
    let mut program = program_with(|ir| {
        let binding = ir.imm32(0);
        let offset = ir.imm32(0);
        let value = ir.get_float_cbuf(binding, offset).unwrap();
        let control = FpControl {
            no_contraction: false,
            rounding: FpRounding::RM,
            fmz_mode: FmzMode::DontCare,
        };
        let converted = ir.inst_flags(Opcode::ConvertS32F32, control, &[value]).unwrap();
        vec![converted]
    });
    let source = emit(&mut program);
    assert!(source.contains("CVT.S32.F32.FLR"), "missing rounding in:\n{}", source);
}

#[test]
fn dead_results_use_the_null_register() {
    let mut program = program_with(|ir| {
        // Emitted but never referenced
        let _unused = ir.get_cbuf_u32(0, 0).unwrap();
        let used = ir.get_cbuf_u32(0, 4).unwrap();
        vec![used]
    });
    let source = emit(&mut program);
    assert!(source.contains("LDC.U32 RC,c0[0];"), "dead load must target RC:\n{}", source);
}
