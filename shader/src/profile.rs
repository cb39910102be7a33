//! Static host capabilities and per-draw pipeline state.

use crate::ir::AttributeType;

/// Host feature record; constant for the lifetime of the device.
#[derive(Clone, Debug)]
pub struct Profile {
    /// Highest SPIR-V version the host accepts, e.g. `0x0001_0400`.
    pub supported_spirv: u32,

    pub unified_descriptor_binding: bool,
    pub support_descriptor_aliasing: bool,
    pub support_int8: bool,
    pub support_int16: bool,
    pub support_int64: bool,
    pub support_float16: bool,
    pub support_float64: bool,
    pub support_vertex_instance_id: bool,
    pub support_derivative_control: bool,
    pub support_geometry_shader_passthrough: bool,
    pub support_viewport_index_layer_non_geometry: bool,
    pub support_typeless_image_loads: bool,
    pub support_demote_to_helper_invocation: bool,
    pub support_explicit_workgroup_layout: bool,
    /// Host subgroups are wider than the guest's 32-lane warps.
    pub warp_size_potentially_larger_than_guest: bool,

    pub lower_left_origin_mode: bool,
    /// Forces `-ffast-math`-unsafe contractions off even when the guest
    /// allows them.
    pub need_declared_frag_colors: bool,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile {
            supported_spirv: 0x0001_0300,
            unified_descriptor_binding: false,
            support_descriptor_aliasing: true,
            support_int8: true,
            support_int16: true,
            support_int64: true,
            support_float16: true,
            support_float64: true,
            support_vertex_instance_id: false,
            support_derivative_control: true,
            support_geometry_shader_passthrough: false,
            support_viewport_index_layer_non_geometry: false,
            support_typeless_image_loads: true,
            support_demote_to_helper_invocation: true,
            support_explicit_workgroup_layout: false,
            warp_size_potentially_larger_than_guest: false,
            lower_left_origin_mode: false,
            need_declared_frag_colors: false,
        }
    }
}

/// Input topology of a geometry stage.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputTopology {
    Points,
    Lines,
    LinesAdjacency,
    Triangles,
    TrianglesAdjacency,
}

/// One transform feedback varying slot.
#[derive(Copy, Clone, Debug, Default)]
pub struct TransformFeedbackVarying {
    pub buffer: u32,
    pub stride: u32,
    pub offset: u32,
    pub components: u32,
}

/// Per-draw state the shader depends on.
#[derive(Clone, Debug)]
pub struct RuntimeInfo {
    /// Attribute slots the previous stage writes, as a generic index mask.
    pub previous_stage_stores_generics: u32,
    pub generic_input_types: [AttributeType; 32],
    pub input_topology: InputTopology,
    pub convert_depth_mode: bool,
    pub force_early_z: bool,
    pub y_negate: bool,
    /// Point size to force when the pipeline draws points with no shader
    /// written size.
    pub fixed_state_point_size: Option<f32>,
    pub xfb_varyings: Vec<TransformFeedbackVarying>,
}

impl Default for RuntimeInfo {
    fn default() -> RuntimeInfo {
        RuntimeInfo {
            previous_stage_stores_generics: u32::max_value(),
            generic_input_types: [AttributeType::Float; 32],
            input_topology: InputTopology::Triangles,
            convert_depth_mode: false,
            force_early_z: false,
            y_negate: false,
            fixed_state_point_size: None,
            xfb_varyings: Vec::new(),
        }
    }
}
