//! The shader info record the Environment uses to materialize descriptor
//! tables and I/O bindings.

use crate::ir::{ImageFormat, TextureType, Type, VaryingState};

pub const MAX_CBUFS: usize = 18;
pub const MAX_NVN_BUFFERS: usize = 16;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConstantBufferDescriptor {
    pub index: u32,
    pub count: u32,
}

/// A storage buffer discovered by the global-memory pass. `cbuf_offset`
/// points at the (address, size) pair inside the owning constant buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StorageBufferDescriptor {
    pub cbuf_index: u32,
    pub cbuf_offset: u32,
    pub count: u32,
    pub is_written: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TextureDescriptor {
    pub ty: TextureType,
    pub is_depth: bool,
    pub cbuf_index: u32,
    pub cbuf_offset: u32,
    pub count: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TextureBufferDescriptor {
    pub cbuf_index: u32,
    pub cbuf_offset: u32,
    pub count: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ImageDescriptor {
    pub ty: TextureType,
    pub format: ImageFormat,
    pub is_written: bool,
    pub is_read: bool,
    pub cbuf_index: u32,
    pub cbuf_offset: u32,
    pub count: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ImageBufferDescriptor {
    pub format: ImageFormat,
    pub is_written: bool,
    pub is_read: bool,
    pub cbuf_index: u32,
    pub cbuf_offset: u32,
    pub count: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TessPrimitive {
    Isolines,
    Triangles,
    Quads,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TessSpacing {
    Equal,
    FractionalOdd,
    FractionalEven,
}

/// Everything the back-ends and the Environment need to know about a
/// translated program, filled in by the collect-info pass.
pub struct Info {
    pub constant_buffer_descriptors: Vec<ConstantBufferDescriptor>,
    pub constant_buffer_mask: u32,
    pub constant_buffer_used_sizes: [u32; MAX_CBUFS],
    pub used_constant_buffer_types: Type,

    pub storage_buffers_descriptors: Vec<StorageBufferDescriptor>,
    pub used_storage_buffer_types: Type,
    /// Which "nvn" storage slots the global-memory helpers must test.
    pub nvn_buffer_used: [bool; MAX_NVN_BUFFERS],

    pub texture_descriptors: Vec<TextureDescriptor>,
    pub texture_buffer_descriptors: Vec<TextureBufferDescriptor>,
    pub image_descriptors: Vec<ImageDescriptor>,
    pub image_buffer_descriptors: Vec<ImageBufferDescriptor>,

    pub loads: VaryingState,
    pub stores: VaryingState,
    pub passthrough: VaryingState,
    pub used_patches: [bool; 32],

    pub loads_indexed_attributes: bool,
    pub stores_indexed_attributes: bool,

    pub uses_workgroup_id: bool,
    pub uses_local_invocation_id: bool,
    pub uses_invocation_id: bool,
    pub uses_sample_id: bool,
    pub uses_is_helper_invocation: bool,
    pub uses_y_direction: bool,
    pub uses_demote_to_helper_invocation: bool,
    pub uses_subgroup_invocation_id: bool,
    pub uses_subgroup_mask: bool,
    pub uses_subgroup_vote: bool,
    pub uses_fswzadd: bool,
    pub uses_derivatives: bool,

    pub uses_fp16: bool,
    pub uses_fp64: bool,
    pub uses_int8: bool,
    pub uses_int16: bool,
    pub uses_int64: bool,
    pub uses_fp16_denorms_flush: bool,
    pub uses_fp32_denorms_flush: bool,

    pub uses_local_memory: bool,
    pub uses_shared_memory_u32x2: bool,
    pub uses_global_memory: bool,
    pub uses_global_increment: bool,
    pub uses_global_decrement: bool,
    pub uses_shared_increment: bool,
    pub uses_shared_decrement: bool,
    pub uses_atomic_f32_add: bool,
    pub uses_atomic_f16x2_add: bool,
    pub uses_atomic_f16x2_min: bool,
    pub uses_atomic_f16x2_max: bool,
    pub uses_atomic_f32x2_add: bool,
    pub uses_atomic_f32x2_min: bool,
    pub uses_atomic_f32x2_max: bool,
    pub uses_atomic_s32_min_max: bool,
    pub uses_int64_bit_atomics: bool,

    pub stores_frag_color: [bool; 8],
    pub stores_frag_depth: bool,
    pub stores_sample_mask: bool,
    pub uses_sparse_residency: bool,

    pub tess_primitive: TessPrimitive,
    pub tess_spacing: TessSpacing,
    pub tess_clockwise: bool,
}

impl Default for Info {
    fn default() -> Info {
        Info {
            constant_buffer_descriptors: Vec::new(),
            constant_buffer_mask: 0,
            constant_buffer_used_sizes: [0; MAX_CBUFS],
            used_constant_buffer_types: Type::VOID,
            storage_buffers_descriptors: Vec::new(),
            used_storage_buffer_types: Type::VOID,
            nvn_buffer_used: [false; MAX_NVN_BUFFERS],
            texture_descriptors: Vec::new(),
            texture_buffer_descriptors: Vec::new(),
            image_descriptors: Vec::new(),
            image_buffer_descriptors: Vec::new(),
            loads: VaryingState::default(),
            stores: VaryingState::default(),
            passthrough: VaryingState::default(),
            used_patches: [false; 32],
            loads_indexed_attributes: false,
            stores_indexed_attributes: false,
            uses_workgroup_id: false,
            uses_local_invocation_id: false,
            uses_invocation_id: false,
            uses_sample_id: false,
            uses_is_helper_invocation: false,
            uses_y_direction: false,
            uses_demote_to_helper_invocation: false,
            uses_subgroup_invocation_id: false,
            uses_subgroup_mask: false,
            uses_subgroup_vote: false,
            uses_fswzadd: false,
            uses_derivatives: false,
            uses_fp16: false,
            uses_fp64: false,
            uses_int8: false,
            uses_int16: false,
            uses_int64: false,
            uses_fp16_denorms_flush: false,
            uses_fp32_denorms_flush: false,
            uses_local_memory: false,
            uses_shared_memory_u32x2: false,
            uses_global_memory: false,
            uses_global_increment: false,
            uses_global_decrement: false,
            uses_shared_increment: false,
            uses_shared_decrement: false,
            uses_atomic_f32_add: false,
            uses_atomic_f16x2_add: false,
            uses_atomic_f16x2_min: false,
            uses_atomic_f16x2_max: false,
            uses_atomic_f32x2_add: false,
            uses_atomic_f32x2_min: false,
            uses_atomic_f32x2_max: false,
            uses_atomic_s32_min_max: false,
            uses_int64_bit_atomics: false,
            stores_frag_color: [false; 8],
            stores_frag_depth: false,
            stores_sample_mask: false,
            uses_sparse_residency: false,
            tess_primitive: TessPrimitive::Triangles,
            tess_spacing: TessSpacing::Equal,
            tess_clockwise: false,
        }
    }
}
