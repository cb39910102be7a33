use std::fmt;

use crate::ir::pred::Pred;

/// Flow test codes of the guest's condition system, evaluated against the
/// four CC bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FlowTest {
    F,
    LT,
    EQ,
    LE,
    GT,
    NE,
    GE,
    NUM,
    NaN,
    LTU,
    EQU,
    LEU,
    GTU,
    NEU,
    GEU,
    T,
    OFF,
    LO,
    SFF,
    LS,
    HI,
    SFT,
    HS,
    OFT,
    CsmTa,
    CsmTr,
    CsmMx,
    FcsmTa,
    FcsmTr,
    FcsmMx,
    RLE,
    RGT,
}

impl FlowTest {
    /// Decodes the 5-bit flow test field.
    pub fn decode(raw: u64) -> FlowTest {
        match raw & 0x1f {
            0 => FlowTest::F,
            1 => FlowTest::LT,
            2 => FlowTest::EQ,
            3 => FlowTest::LE,
            4 => FlowTest::GT,
            5 => FlowTest::NE,
            6 => FlowTest::GE,
            7 => FlowTest::NUM,
            8 => FlowTest::NaN,
            9 => FlowTest::LTU,
            10 => FlowTest::EQU,
            11 => FlowTest::LEU,
            12 => FlowTest::GTU,
            13 => FlowTest::NEU,
            14 => FlowTest::GEU,
            15 => FlowTest::T,
            16 => FlowTest::OFF,
            17 => FlowTest::LO,
            18 => FlowTest::SFF,
            19 => FlowTest::LS,
            20 => FlowTest::HI,
            21 => FlowTest::SFT,
            22 => FlowTest::HS,
            23 => FlowTest::OFT,
            24 => FlowTest::CsmTa,
            25 => FlowTest::CsmTr,
            26 => FlowTest::CsmMx,
            27 => FlowTest::FcsmTa,
            28 => FlowTest::FcsmTr,
            29 => FlowTest::FcsmMx,
            30 => FlowTest::RLE,
            _ => FlowTest::RGT,
        }
    }
}

impl fmt::Display for FlowTest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A predicate (possibly negated) combined with a flow test.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Condition {
    pred: Pred,
    pred_negated: bool,
    flow_test: FlowTest,
}

impl Condition {
    pub fn new(flow_test: FlowTest, pred: Pred, pred_negated: bool) -> Condition {
        Condition { pred, pred_negated, flow_test }
    }

    pub fn from_pred(pred: Pred, pred_negated: bool) -> Condition {
        Condition::new(FlowTest::T, pred, pred_negated)
    }

    pub fn always_true() -> Condition {
        Condition::from_pred(Pred::PT, false)
    }

    pub fn pred(self) -> (Pred, bool) {
        (self.pred, self.pred_negated)
    }

    pub fn flow_test(self) -> FlowTest {
        self.flow_test
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.pred_negated {
            write!(f, "!")?;
        }
        write!(f, "{}:{}", self.pred, self.flow_test)
    }
}
