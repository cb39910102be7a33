//! Flow-test lowering over the CC flags.

use tegra_shader::ir::{BlockEnd, FlowTest, IrEmitter, Program, Value};
use tegra_shader::{opt, Stage};

/// Seeds the CC flags with immediates, lowers the flow test and folds the
/// ladder down to a constant.
fn evaluate(test: FlowTest, s: bool, o: bool, z: bool, c: bool) -> bool {
    let mut program = Program::new(Stage::Compute);
    let block = program.alloc_block(0);
    program.block_order = vec![block];
    let pin = {
        let mut ir = IrEmitter::new(&mut program, block);
        let s = ir.imm1(s);
        ir.set_sflag(s).unwrap();
        let o = ir.imm1(o);
        ir.set_oflag(o).unwrap();
        let z = ir.imm1(z);
        ir.set_zflag(z).unwrap();
        let c = ir.imm1(c);
        ir.set_cflag(c).unwrap();
        let result = ir.get_flow_test_result(test).unwrap();
        ir.condition_ref(result).unwrap()
    };
    program.set_block_end(block, BlockEnd::Return);
    program.compute_post_order();
    opt::ssa_rewrite_pass(&mut program).unwrap();
    opt::constant_propagation_pass(&mut program).unwrap();

    let pin_inst = pin.inst().expect("condition reference");
    match program.arg(pin_inst, 0).resolve(&program) {
        Value::U1(value) => value,
        other => panic!("flow test did not fold: {:?}", other),
    }
}

#[test]
fn leu_lowers_to_xor_or_ladder() {
    // LEU = (S ^ O) | Z
    assert_eq!(evaluate(FlowTest::LEU, true, false, false, false), true);
    assert_eq!(evaluate(FlowTest::LEU, false, true, false, false), true);
    assert_eq!(evaluate(FlowTest::LEU, false, false, false, false), false);
    assert_eq!(evaluate(FlowTest::LEU, false, false, true, false), true);
    assert_eq!(evaluate(FlowTest::LEU, true, true, false, false), false);
}

#[test]
fn basic_signed_tests() {
    // LT = (S & !Z) ^ O
    assert_eq!(evaluate(FlowTest::LT, true, false, false, false), true);
    assert_eq!(evaluate(FlowTest::LT, false, true, false, false), true);
    assert_eq!(evaluate(FlowTest::LT, true, true, false, false), false);
    // EQ = !S & Z
    assert_eq!(evaluate(FlowTest::EQ, false, false, true, false), true);
    assert_eq!(evaluate(FlowTest::EQ, true, false, true, false), false);
    // GE = !(S ^ O)
    assert_eq!(evaluate(FlowTest::GE, false, false, false, false), true);
    assert_eq!(evaluate(FlowTest::GE, true, false, false, false), false);
    assert_eq!(evaluate(FlowTest::GE, true, true, false, false), true);
}

#[test]
fn carry_based_tests() {
    // HS = C, LO = !C, HI = C & !Z, LS = Z | !C
    assert_eq!(evaluate(FlowTest::HS, false, false, false, true), true);
    assert_eq!(evaluate(FlowTest::LO, false, false, false, false), true);
    assert_eq!(evaluate(FlowTest::HI, false, false, false, true), true);
    assert_eq!(evaluate(FlowTest::HI, false, false, true, true), false);
    assert_eq!(evaluate(FlowTest::LS, false, false, true, true), true);
}

#[test]
fn constant_tests() {
    assert_eq!(evaluate(FlowTest::T, true, true, true, true), true);
    assert_eq!(evaluate(FlowTest::F, true, true, true, true), false);
}

#[test]
fn unknown_state_machine_codes_are_rejected() {
    let mut program = Program::new(Stage::Compute);
    let block = program.alloc_block(0);
    program.block_order = vec![block];
    let mut ir = IrEmitter::new(&mut program, block);
    assert!(ir.get_flow_test_result(FlowTest::CsmTa).is_err());
    // FCSM_TR is stubbed to false rather than rejected
    let stubbed = ir.get_flow_test_result(FlowTest::FcsmTr).unwrap();
    assert_eq!(stubbed, Value::U1(false));
}
