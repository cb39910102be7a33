//! Opcode-specific payloads carried in an instruction's 32-bit flags word.

use crate::ir::types::Type;

/// Types that can round-trip through the flags word. At most four bytes.
pub trait InstFlags: Copy {
    fn to_raw(self) -> u32;
    fn from_raw(raw: u32) -> Self;
}

impl InstFlags for u32 {
    fn to_raw(self) -> u32 {
        self
    }
    fn from_raw(raw: u32) -> u32 {
        raw
    }
}

/// Phi nodes report `Opaque` in the opcode table; their concrete result type
/// lives in the flags word instead.
impl InstFlags for Type {
    fn to_raw(self) -> u32 {
        self.bits()
    }
    fn from_raw(raw: u32) -> Type {
        Type::from_bits_truncate(raw)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FpRounding {
    /// Any rounding the host picks.
    DontCare,
    /// Round to nearest even.
    RN,
    /// Round towards zero.
    RZ,
    /// Round towards minus infinity.
    RM,
    /// Round towards plus infinity.
    RP,
}

impl Default for FpRounding {
    fn default() -> FpRounding {
        FpRounding::DontCare
    }
}

/// Flush-to-zero behavior of a floating-point operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FmzMode {
    DontCare,
    /// Flush denorms, NaN is not propagated through multiplications by zero.
    FTZ,
    /// IEEE denorm and NaN semantics.
    None,
}

impl Default for FmzMode {
    fn default() -> FmzMode {
        FmzMode::DontCare
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FpControl {
    pub no_contraction: bool,
    pub rounding: FpRounding,
    pub fmz_mode: FmzMode,
}

impl InstFlags for FpControl {
    fn to_raw(self) -> u32 {
        let rounding = match self.rounding {
            FpRounding::DontCare => 0,
            FpRounding::RN => 1,
            FpRounding::RZ => 2,
            FpRounding::RM => 3,
            FpRounding::RP => 4,
        };
        let fmz = match self.fmz_mode {
            FmzMode::DontCare => 0,
            FmzMode::FTZ => 1,
            FmzMode::None => 2,
        };
        u32::from(self.no_contraction) | rounding << 1 | fmz << 4
    }

    fn from_raw(raw: u32) -> FpControl {
        FpControl {
            no_contraction: raw & 1 != 0,
            rounding: match (raw >> 1) & 0x7 {
                1 => FpRounding::RN,
                2 => FpRounding::RZ,
                3 => FpRounding::RM,
                4 => FpRounding::RP,
                _ => FpRounding::DontCare,
            },
            fmz_mode: match (raw >> 4) & 0x3 {
                1 => FmzMode::FTZ,
                2 => FmzMode::None,
                _ => FmzMode::DontCare,
            },
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TextureType {
    Color1D,
    ColorArray1D,
    Color2D,
    ColorArray2D,
    Color3D,
    ColorCube,
    ColorArrayCube,
    Buffer,
}

impl TextureType {
    fn to_raw(self) -> u32 {
        match self {
            TextureType::Color1D => 0,
            TextureType::ColorArray1D => 1,
            TextureType::Color2D => 2,
            TextureType::ColorArray2D => 3,
            TextureType::Color3D => 4,
            TextureType::ColorCube => 5,
            TextureType::ColorArrayCube => 6,
            TextureType::Buffer => 7,
        }
    }

    fn from_raw(raw: u32) -> TextureType {
        match raw & 0x7 {
            0 => TextureType::Color1D,
            1 => TextureType::ColorArray1D,
            2 => TextureType::Color2D,
            3 => TextureType::ColorArray2D,
            4 => TextureType::Color3D,
            5 => TextureType::ColorCube,
            6 => TextureType::ColorArrayCube,
            _ => TextureType::Buffer,
        }
    }
}

/// Storage image format, as resolved from the image descriptor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ImageFormat {
    Typeless,
    R8Uint,
    R8Sint,
    R16Uint,
    R16Sint,
    R32Uint,
    R32G32Uint,
    R32G32B32A32Uint,
}

/// Texture/image operation metadata packed into the flags word.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TextureInstInfo {
    pub descriptor_index: u32,
    pub ty: Option<TextureType>,
    pub is_depth: bool,
    pub has_bias: bool,
    pub has_lod_clamp: bool,
    pub relaxed_precision: bool,
    pub gather_component: u32,
    pub num_derivatives: u32,
}

impl InstFlags for TextureInstInfo {
    fn to_raw(self) -> u32 {
        let ty = self.ty.map(|ty| ty.to_raw() + 1).unwrap_or(0);
        (self.descriptor_index & 0xff)
            | ty << 8
            | u32::from(self.is_depth) << 12
            | u32::from(self.has_bias) << 13
            | u32::from(self.has_lod_clamp) << 14
            | u32::from(self.relaxed_precision) << 15
            | (self.gather_component & 0x3) << 16
            | (self.num_derivatives & 0x3) << 18
    }

    fn from_raw(raw: u32) -> TextureInstInfo {
        let ty_raw = (raw >> 8) & 0xf;
        TextureInstInfo {
            descriptor_index: raw & 0xff,
            ty: if ty_raw == 0 {
                None
            } else {
                Some(TextureType::from_raw(ty_raw - 1))
            },
            is_depth: raw & (1 << 12) != 0,
            has_bias: raw & (1 << 13) != 0,
            has_lod_clamp: raw & (1 << 14) != 0,
            relaxed_precision: raw & (1 << 15) != 0,
            gather_component: (raw >> 16) & 0x3,
            num_derivatives: (raw >> 18) & 0x3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fp_control_round_trips() {
        let control = FpControl {
            no_contraction: true,
            rounding: FpRounding::RM,
            fmz_mode: FmzMode::FTZ,
        };
        assert_eq!(FpControl::from_raw(control.to_raw()), control);
    }

    #[test]
    fn texture_info_round_trips() {
        let info = TextureInstInfo {
            descriptor_index: 13,
            ty: Some(TextureType::ColorArrayCube),
            is_depth: true,
            has_bias: false,
            has_lod_clamp: true,
            relaxed_precision: false,
            gather_component: 2,
            num_derivatives: 1,
        };
        assert_eq!(TextureInstInfo::from_raw(info.to_raw()), info);
    }
}
