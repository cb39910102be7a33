//! Shared state of one SPIR-V emission: types, constants, resource
//! declarations and helper functions.

use spirv_headers::{BuiltIn, Capability, Decoration, Dim, ImageFormat as SpvImageFormat, Op, StorageClass};

use crate::backend::spirv::module::{push_inst, Id, Module};
use crate::error::{Error, Result};
use crate::info::MAX_CBUFS;
use crate::ir::{Attribute, AttributeType, Program, TextureType, Type, NUM_GENERICS};
use crate::profile::{Profile, RuntimeInfo};
use crate::stage::Stage;

#[derive(Copy, Clone, Default)]
pub struct VectorTypes {
    defs: [Id; 4],
}

impl VectorTypes {
    pub fn define(module: &mut Module, base: Id) -> VectorTypes {
        let mut defs = [base; 4];
        for (count, def) in defs.iter_mut().enumerate().skip(1) {
            *def = module.type_vector(base, count as u32 + 1);
        }
        VectorTypes { defs }
    }

    /// 1-based component count.
    pub fn get(&self, count: u32) -> Id {
        self.defs[count as usize - 1]
    }
}

/// One constant buffer's typed views.
#[derive(Copy, Clone, Default)]
pub struct CbufDefinition {
    pub u8_view: Id,
    pub s8_view: Id,
    pub u16_view: Id,
    pub s16_view: Id,
    pub u32_view: Id,
    pub f32_view: Id,
    pub u32x2_view: Id,
    pub u32x4_view: Id,
}

/// One storage buffer type's array/element pointers plus per-buffer ids.
#[derive(Clone, Default)]
pub struct StorageTypeDefinition {
    pub element_pointer: Id,
    pub variables: Vec<Id>,
}

pub struct TextureDefinition {
    pub variable: Id,
    pub image_type: Id,
    pub sampled_type: Id,
    pub pointer_type: Id,
    pub is_depth: bool,
}

pub struct EmitContext<'a> {
    pub module: Module,
    pub program: &'a mut Program,
    pub profile: &'a Profile,
    pub runtime_info: &'a RuntimeInfo,
    pub stage: Stage,

    pub void: Id,
    pub u1: Id,
    pub u8_type: Id,
    pub s8_type: Id,
    pub u16_type: Id,
    pub s16_type: Id,
    pub u64_type: Id,
    pub f16_type: Id,
    pub f64_type: Id,
    pub f32: VectorTypes,
    pub u32: VectorTypes,
    pub s32: VectorTypes,

    pub u32_zero: Id,
    pub f32_zero: Id,
    pub true_value: Id,
    pub false_value: Id,

    pub uniform_u32_pointer: Id,
    pub uniform_u32x2_pointer: Id,
    pub uniform_f32_pointer: Id,
    pub uniform_u32x4_pointer: Id,
    pub cbufs: [CbufDefinition; MAX_CBUFS],

    pub storage_u32: StorageTypeDefinition,
    pub storage_u32x2: StorageTypeDefinition,
    pub storage_u32x4: StorageTypeDefinition,

    pub textures: Vec<TextureDefinition>,
    pub texture_buffers: Vec<TextureDefinition>,

    pub local_memory: Id,
    pub shared_memory: Id,
    pub shared_memory_length: u32,

    pub input_generics: [Id; NUM_GENERICS],
    pub output_generics: [Id; NUM_GENERICS],
    pub input_position: Id,
    pub output_position: Id,
    pub frag_coord: Id,
    pub front_face: Id,
    pub point_coord: Id,
    pub frag_colors: [Id; 8],
    pub frag_depth: Id,
    pub vertex_index: Id,
    pub instance_index: Id,
    pub workgroup_id: Id,
    pub local_invocation_id: Id,
    pub subgroup_local_invocation_id: Id,
    pub output_point_size: Id,
    pub patches_in: [Id; 32],
    pub patches_out: [Id; 32],
    pub tess_coord: Id,

    pub load_global_func_u32: Id,
    pub load_global_func_u32x2: Id,
    pub load_global_func_u32x4: Id,
    pub write_global_func_u32: Id,
    pub write_global_func_u32x2: Id,
    pub write_global_func_u32x4: Id,
    pub increment_cas_ssbo: Id,
    pub decrement_cas_ssbo: Id,
    pub f32_add_cas: Id,
    pub increment_cas_shared: Id,
    pub decrement_cas_shared: Id,
    pub indexed_load_func: Id,
    pub indexed_store_func: Id,

    pub interfaces: Vec<Id>,
    /// Main function body words.
    pub body: Vec<u32>,
    /// Label of the SPIR-V block currently being filled; helper-emitted
    /// inner blocks (CAS loops) shift it away from the IR block's label.
    pub current_label: Id,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        profile: &'a Profile,
        runtime_info: &'a RuntimeInfo,
        program: &'a mut Program,
    ) -> Result<EmitContext<'a>> {
        let mut module = Module::new(profile.supported_spirv);
        module.add_capability(Capability::Shader);

        let void = module.type_void();
        let u1 = module.type_bool();
        let u32_base = module.type_int(32, false);
        let s32_base = module.type_int(32, true);
        let f32_base = module.type_float(32);
        let u32 = VectorTypes::define(&mut module, u32_base);
        let s32 = VectorTypes::define(&mut module, s32_base);
        let f32 = VectorTypes::define(&mut module, f32_base);
        let u32_zero = module.constant_u32(u32_base, 0);
        let f32_zero = module.constant_f32(f32_base, 0.0);
        let true_value = module.constant_bool(u1, true);
        let false_value = module.constant_bool(u1, false);

        let stage = program.stage;
        let mut ctx = EmitContext {
            module,
            program,
            profile,
            runtime_info,
            stage,
            void,
            u1,
            u8_type: Id(0),
            s8_type: Id(0),
            u16_type: Id(0),
            s16_type: Id(0),
            u64_type: Id(0),
            f16_type: Id(0),
            f64_type: Id(0),
            f32,
            u32,
            s32,
            u32_zero,
            f32_zero,
            true_value,
            false_value,
            uniform_u32_pointer: Id(0),
            uniform_u32x2_pointer: Id(0),
            uniform_f32_pointer: Id(0),
            uniform_u32x4_pointer: Id(0),
            cbufs: [CbufDefinition::default(); MAX_CBUFS],
            storage_u32: StorageTypeDefinition::default(),
            storage_u32x2: StorageTypeDefinition::default(),
            storage_u32x4: StorageTypeDefinition::default(),
            textures: Vec::new(),
            texture_buffers: Vec::new(),
            local_memory: Id(0),
            shared_memory: Id(0),
            shared_memory_length: 0,
            input_generics: [Id(0); NUM_GENERICS],
            output_generics: [Id(0); NUM_GENERICS],
            input_position: Id(0),
            output_position: Id(0),
            frag_coord: Id(0),
            front_face: Id(0),
            point_coord: Id(0),
            frag_colors: [Id(0); 8],
            frag_depth: Id(0),
            vertex_index: Id(0),
            instance_index: Id(0),
            workgroup_id: Id(0),
            local_invocation_id: Id(0),
            subgroup_local_invocation_id: Id(0),
            output_point_size: Id(0),
            patches_in: [Id(0); 32],
            patches_out: [Id(0); 32],
            tess_coord: Id(0),
            load_global_func_u32: Id(0),
            load_global_func_u32x2: Id(0),
            load_global_func_u32x4: Id(0),
            write_global_func_u32: Id(0),
            write_global_func_u32x2: Id(0),
            write_global_func_u32x4: Id(0),
            increment_cas_ssbo: Id(0),
            decrement_cas_ssbo: Id(0),
            f32_add_cas: Id(0),
            increment_cas_shared: Id(0),
            decrement_cas_shared: Id(0),
            indexed_load_func: Id(0),
            indexed_store_func: Id(0),
            interfaces: Vec::new(),
            body: Vec::new(),
            current_label: Id(0),
        };
        ctx.define_scalar_capabilities();
        ctx.define_local_memory();
        ctx.define_shared_memory()?;
        ctx.define_constant_buffers();
        ctx.define_storage_buffers();
        ctx.define_textures();
        ctx.define_inputs()?;
        ctx.define_outputs()?;
        ctx.define_global_memory_functions();
        ctx.define_cas_functions();
        Ok(ctx)
    }

    pub fn op(&mut self, op: Op, result_type: Id, operands: &[u32]) -> Id {
        let id = self.module.alloc_id();
        let mut words = vec![result_type.0, id.0];
        words.extend_from_slice(operands);
        push_inst(&mut self.body, op, &words);
        id
    }

    pub fn op_no_result(&mut self, op: Op, operands: &[u32]) {
        push_inst(&mut self.body, op, operands);
    }

    pub fn label(&mut self, id: Id) {
        push_inst(&mut self.body, Op::Label, &[id.0]);
        self.current_label = id;
    }

    pub fn const_u32(&mut self, value: u32) -> Id {
        let ty = self.u32.get(1);
        self.module.constant_u32(ty, value)
    }

    pub fn const_f32(&mut self, value: f32) -> Id {
        let ty = self.f32.get(1);
        self.module.constant_f32(ty, value)
    }

    //----------------------------------------------------------------------
    // Declarations

    fn define_scalar_capabilities(&mut self) {
        let info_uses_int8 = self.program.info.uses_int8;
        let info_uses_int16 = self.program.info.uses_int16;
        if info_uses_int8 && self.profile.support_int8 {
            self.module.add_capability(Capability::Int8);
            self.u8_type = self.module.type_int(8, false);
            self.s8_type = self.module.type_int(8, true);
        }
        if info_uses_int16 && self.profile.support_int16 {
            self.module.add_capability(Capability::Int16);
            self.u16_type = self.module.type_int(16, false);
            self.s16_type = self.module.type_int(16, true);
        }
        if self.program.info.uses_int64 && self.profile.support_int64 {
            self.module.add_capability(Capability::Int64);
            self.u64_type = self.module.type_int(64, false);
        }
        if self.program.info.uses_fp16 && self.profile.support_float16 {
            self.module.add_capability(Capability::Float16);
            self.f16_type = self.module.type_float(16);
        }
        if self.program.info.uses_fp64 && self.profile.support_float64 {
            self.module.add_capability(Capability::Float64);
            self.f64_type = self.module.type_float(64);
        }
    }

    fn define_local_memory(&mut self) {
        if self.program.local_memory_size == 0 {
            return;
        }
        let length = (self.program.local_memory_size + 3) / 4;
        let u32_type = self.u32.get(1);
        let length_const = self.const_u32(length);
        let array = self.module.type_array(u32_type, length_const);
        let pointer = self.module.type_pointer(StorageClass::Private, array);
        self.local_memory = self.module.global_variable(pointer, StorageClass::Private);
        if self.profile.supported_spirv >= 0x0001_0400 {
            self.interfaces.push(self.local_memory);
        }
    }

    fn define_shared_memory(&mut self) -> Result<()> {
        if self.program.shared_memory_size == 0 {
            return Ok(());
        }
        if self.profile.support_explicit_workgroup_layout
            && (self.program.info.uses_shared_memory_u32x2 || self.program.info.uses_int8)
        {
            self.module.add_extension("SPV_KHR_workgroup_memory_explicit_layout");
            // WorkgroupMemoryExplicitLayoutKHR; newer than the header enum
            self.module.add_capability_raw(4428);
        }
        let length = (self.program.shared_memory_size + 3) / 4;
        self.shared_memory_length = length;
        let u32_type = self.u32.get(1);
        let length_const = self.const_u32(length);
        let array = self.module.type_array(u32_type, length_const);
        let pointer = self.module.type_pointer(StorageClass::Workgroup, array);
        self.shared_memory = self.module.global_variable(pointer, StorageClass::Workgroup);
        if self.profile.supported_spirv >= 0x0001_0400 {
            self.interfaces.push(self.shared_memory);
        }
        Ok(())
    }

    /// One uniform block per constant buffer descriptor. With descriptor
    /// aliasing, each used element width gets its own typed view over the
    /// same binding; otherwise a single `uvec4[4096]` view is emitted and
    /// loads unpack from it.
    fn define_constant_buffers(&mut self) {
        if self.program.info.constant_buffer_descriptors.is_empty() {
            return;
        }
        let aliasing = self.profile.support_descriptor_aliasing;
        let used = self.program.info.used_constant_buffer_types;
        let u32_type = self.u32.get(1);
        let u32x2_type = self.u32.get(2);
        let u32x4_type = self.u32.get(4);
        let f32_type = self.f32.get(1);
        self.uniform_u32_pointer = self.module.type_pointer(StorageClass::Uniform, u32_type);
        self.uniform_u32x2_pointer = self.module.type_pointer(StorageClass::Uniform, u32x2_type);
        self.uniform_u32x4_pointer = self.module.type_pointer(StorageClass::Uniform, u32x4_type);
        self.uniform_f32_pointer = self.module.type_pointer(StorageClass::Uniform, f32_type);

        let mut binding = 0u32;
        let descriptors = self.program.info.constant_buffer_descriptors.clone();
        for desc in &descriptors {
            let mut def = CbufDefinition::default();
            if aliasing {
                if used.contains(Type::U32) {
                    def.u32_view = self.define_cbuf_view(u32_type, 4, desc.index, binding, "u32");
                }
                if used.contains(Type::F32) {
                    def.f32_view = self.define_cbuf_view(f32_type, 4, desc.index, binding, "f32");
                }
                if used.contains(Type::U32X2) {
                    def.u32x2_view =
                        self.define_cbuf_view(u32x2_type, 8, desc.index, binding, "u32x2");
                }
                if used.contains(Type::U8) && self.u8_type.is_set() {
                    let u8_type = self.u8_type;
                    let s8_type = self.s8_type;
                    def.u8_view = self.define_cbuf_view(u8_type, 1, desc.index, binding, "u8");
                    def.s8_view = self.define_cbuf_view(s8_type, 1, desc.index, binding, "s8");
                }
                if used.contains(Type::U16) && self.u16_type.is_set() {
                    let u16_type = self.u16_type;
                    let s16_type = self.s16_type;
                    def.u16_view = self.define_cbuf_view(u16_type, 2, desc.index, binding, "u16");
                    def.s16_view = self.define_cbuf_view(s16_type, 2, desc.index, binding, "s16");
                }
            } else {
                def.u32x4_view = self.define_cbuf_view(u32x4_type, 16, desc.index, binding, "u32x4");
            }
            if (desc.index as usize) < MAX_CBUFS {
                self.cbufs[desc.index as usize] = def;
            }
            binding += 1;
        }
    }

    fn define_cbuf_view(
        &mut self,
        element: Id,
        stride: u32,
        cbuf_index: u32,
        binding: u32,
        name: &str,
    ) -> Id {
        // 64 KiB window regardless of the element width
        let length = self.const_u32(0x10000 / stride);
        let array = self.module.type_array_unique(element, length);
        self.module.decorate(array, Decoration::ArrayStride, &[stride]);
        let block = self.module.type_struct(&[array]);
        self.module.decorate(block, Decoration::Block, &[]);
        self.module.member_decorate(block, 0, Decoration::Offset, &[0]);
        let pointer = self.module.type_pointer(StorageClass::Uniform, block);
        let variable = self.module.global_variable(pointer, StorageClass::Uniform);
        self.module.decorate(variable, Decoration::Binding, &[binding]);
        self.module.decorate(variable, Decoration::DescriptorSet, &[0]);
        self.module.name(variable, &format!("{}_cbuf{}_{}", self.stage.name(), cbuf_index, name));
        if self.profile.supported_spirv >= 0x0001_0400 {
            self.interfaces.push(variable);
        }
        variable
    }

    fn define_storage_buffers(&mut self) {
        if self.program.info.storage_buffers_descriptors.is_empty() {
            return;
        }
        self.module.add_extension("SPV_KHR_storage_buffer_storage_class");
        let used = if self.profile.support_descriptor_aliasing {
            self.program.info.used_storage_buffer_types
        } else {
            Type::U32
        };
        let u32_type = self.u32.get(1);
        let u32x2_type = self.u32.get(2);
        let u32x4_type = self.u32.get(4);
        if used.contains(Type::U32) || used == Type::VOID {
            self.storage_u32 = self.define_ssbos(u32_type, 4, "u32");
        }
        if used.contains(Type::U32X2) {
            self.storage_u32x2 = self.define_ssbos(u32x2_type, 8, "u32x2");
        }
        if used.contains(Type::U32X4) {
            self.storage_u32x4 = self.define_ssbos(u32x4_type, 16, "u32x4");
        }
        // The global memory fallback dispatches through the plain u32 view
        if self.storage_u32.variables.is_empty() {
            self.storage_u32 = self.define_ssbos(u32_type, 4, "u32");
        }
    }

    fn define_ssbos(&mut self, element: Id, stride: u32, name: &str) -> StorageTypeDefinition {
        let array = self.module.type_runtime_array(element);
        self.module.decorate(array, Decoration::ArrayStride, &[stride]);
        let block = self.module.type_struct(&[array]);
        self.module.decorate(block, Decoration::Block, &[]);
        self.module.member_decorate(block, 0, Decoration::Offset, &[0]);
        let pointer = self.module.type_pointer(StorageClass::StorageBuffer, block);
        let element_pointer = self.module.type_pointer(StorageClass::StorageBuffer, element);
        let mut variables = Vec::new();
        let descriptors = self.program.info.storage_buffers_descriptors.clone();
        for (index, _) in descriptors.iter().enumerate() {
            let variable = self.module.global_variable(pointer, StorageClass::StorageBuffer);
            self.module.decorate(variable, Decoration::Binding, &[index as u32]);
            self.module.decorate(variable, Decoration::DescriptorSet, &[0]);
            self.module.name(variable, &format!("ssbo{}_{}", index, name));
            if self.profile.supported_spirv >= 0x0001_0400 {
                self.interfaces.push(variable);
            }
            variables.push(variable);
        }
        StorageTypeDefinition { element_pointer, variables }
    }

    fn define_textures(&mut self) {
        let descriptors = self.program.info.texture_descriptors.clone();
        for desc in &descriptors {
            let f32_type = self.f32.get(1);
            let (dim, arrayed) = match desc.ty {
                TextureType::Color1D => (Dim::Dim1D, false),
                TextureType::ColorArray1D => (Dim::Dim1D, true),
                TextureType::Color2D => (Dim::Dim2D, false),
                TextureType::ColorArray2D => (Dim::Dim2D, true),
                TextureType::Color3D => (Dim::Dim3D, false),
                TextureType::ColorCube => (Dim::DimCube, false),
                TextureType::ColorArrayCube => (Dim::DimCube, true),
                TextureType::Buffer => (Dim::DimBuffer, false),
            };
            let image_type = self.module.type_image(
                f32_type,
                dim,
                u32::from(desc.is_depth),
                arrayed,
                false,
                1,
                SpvImageFormat::Unknown,
            );
            let sampled_type = self.module.type_sampled_image(image_type);
            let pointer_type =
                self.module.type_pointer(StorageClass::UniformConstant, sampled_type);
            let variable = self.module.global_variable(pointer_type, StorageClass::UniformConstant);
            self.module.decorate(variable, Decoration::Binding, &[self.textures.len() as u32]);
            self.module.decorate(variable, Decoration::DescriptorSet, &[0]);
            if self.profile.supported_spirv >= 0x0001_0400 {
                self.interfaces.push(variable);
            }
            self.textures.push(TextureDefinition {
                variable,
                image_type,
                sampled_type,
                pointer_type,
                is_depth: desc.is_depth,
            });
        }
        let buffer_descriptors = self.program.info.texture_buffer_descriptors.clone();
        for _desc in &buffer_descriptors {
            let f32_type = self.f32.get(1);
            let image_type = self.module.type_image(
                f32_type,
                Dim::DimBuffer,
                0,
                false,
                false,
                1,
                SpvImageFormat::Unknown,
            );
            let sampled_type = self.module.type_sampled_image(image_type);
            let pointer_type =
                self.module.type_pointer(StorageClass::UniformConstant, sampled_type);
            let variable = self.module.global_variable(pointer_type, StorageClass::UniformConstant);
            self.module.decorate(
                variable,
                Decoration::Binding,
                &[(self.textures.len() + self.texture_buffers.len()) as u32],
            );
            self.module.decorate(variable, Decoration::DescriptorSet, &[0]);
            self.texture_buffers.push(TextureDefinition {
                variable,
                image_type,
                sampled_type,
                pointer_type,
                is_depth: false,
            });
        }
    }

    fn input_variable(&mut self, ty: Id, builtin: Option<BuiltIn>) -> Id {
        let pointer = self.module.type_pointer(StorageClass::Input, ty);
        let variable = self.module.global_variable(pointer, StorageClass::Input);
        if let Some(builtin) = builtin {
            self.module.decorate(variable, Decoration::BuiltIn, &[builtin as u32]);
        }
        self.interfaces.push(variable);
        variable
    }

    fn output_variable(&mut self, ty: Id, builtin: Option<BuiltIn>) -> Id {
        let pointer = self.module.type_pointer(StorageClass::Output, ty);
        let variable = self.module.global_variable(pointer, StorageClass::Output);
        if let Some(builtin) = builtin {
            self.module.decorate(variable, Decoration::BuiltIn, &[builtin as u32]);
        }
        self.interfaces.push(variable);
        variable
    }

    fn define_inputs(&mut self) -> Result<()> {
        let f32x4 = self.f32.get(4);
        let u32x3 = self.u32.get(3);
        let loads = self.program.info.loads;
        match self.stage {
            Stage::Fragment => {
                if loads.any_component(Attribute::POSITION_X) {
                    self.frag_coord = self.input_variable(f32x4, Some(BuiltIn::FragCoord));
                }
                if loads.get(Attribute::FRONT_FACE) {
                    let u1 = self.u1;
                    self.front_face = self.input_variable(u1, Some(BuiltIn::FrontFacing));
                }
                if loads.get(Attribute::POINT_SPRITE_S) || loads.get(Attribute::POINT_SPRITE_T) {
                    let f32x2 = self.f32.get(2);
                    self.point_coord = self.input_variable(f32x2, Some(BuiltIn::PointCoord));
                }
            }
            Stage::VertexA | Stage::VertexB => {
                if loads.get(Attribute::VERTEX_ID) {
                    let s32_type = self.s32.get(1);
                    let builtin = if self.profile.support_vertex_instance_id {
                        BuiltIn::VertexId
                    } else {
                        BuiltIn::VertexIndex
                    };
                    self.vertex_index = self.input_variable(s32_type, Some(builtin));
                }
                if loads.get(Attribute::INSTANCE_ID) {
                    let s32_type = self.s32.get(1);
                    let builtin = if self.profile.support_vertex_instance_id {
                        BuiltIn::InstanceId
                    } else {
                        BuiltIn::InstanceIndex
                    };
                    self.instance_index = self.input_variable(s32_type, Some(builtin));
                }
            }
            Stage::TessellationEval => {
                let f32x3 = self.f32.get(3);
                self.tess_coord = self.input_variable(f32x3, Some(BuiltIn::TessCoord));
            }
            _ => {}
        }
        if self.program.info.uses_workgroup_id {
            self.workgroup_id = self.input_variable(u32x3, Some(BuiltIn::WorkgroupId));
        }
        if self.program.info.uses_local_invocation_id {
            self.local_invocation_id =
                self.input_variable(u32x3, Some(BuiltIn::LocalInvocationId));
        }
        if self.program.info.uses_subgroup_invocation_id {
            let u32_type = self.u32.get(1);
            self.module.add_capability(Capability::GroupNonUniform);
            self.subgroup_local_invocation_id =
                self.input_variable(u32_type, Some(BuiltIn::SubgroupLocalInvocationId));
        }
        for index in 0..NUM_GENERICS as u32 {
            if !loads.generic(index) {
                continue;
            }
            let ty = self.f32.get(4);
            let variable = self.input_variable(ty, None);
            self.module.decorate(variable, Decoration::Location, &[index]);
            if self.stage == Stage::Fragment {
                match self.runtime_info.generic_input_types[index as usize] {
                    AttributeType::SignedInt | AttributeType::UnsignedInt => {
                        self.module.decorate(variable, Decoration::Flat, &[]);
                    }
                    _ => {}
                }
            }
            self.input_generics[index as usize] = variable;
        }
        if self.stage == Stage::TessellationEval {
            let f32_type = self.f32.get(1);
            for index in 0..32 {
                if !self.program.info.used_patches[index] {
                    continue;
                }
                let pointer = self.module.type_pointer(StorageClass::Input, f32_type);
                let variable = self.module.global_variable(pointer, StorageClass::Input);
                self.module.decorate(variable, Decoration::Patch, &[]);
                self.module.decorate(variable, Decoration::Location, &[index as u32]);
                self.interfaces.push(variable);
                self.patches_in[index] = variable;
            }
        }
        if self.program.info.loads_indexed_attributes {
            self.indexed_load_func = self.define_indexed_load()?;
        }
        Ok(())
    }

    fn define_outputs(&mut self) -> Result<()> {
        let f32x4 = self.f32.get(4);
        let stores = self.program.info.stores;
        let mut used_locations = [false; NUM_GENERICS];
        match self.stage {
            Stage::VertexB | Stage::Geometry | Stage::TessellationEval => {
                if stores.any_component(Attribute::POSITION_X) {
                    self.output_position = self.output_variable(f32x4, Some(BuiltIn::Position));
                }
                if stores.get(Attribute::POINT_SIZE)
                    || self.runtime_info.fixed_state_point_size.is_some()
                {
                    let f32_type = self.f32.get(1);
                    self.output_point_size =
                        self.output_variable(f32_type, Some(BuiltIn::PointSize));
                }
            }
            Stage::Fragment => {
                let frag_stores = self.program.info.stores_frag_color;
                for (index, &stored) in frag_stores.iter().enumerate() {
                    if !stored && !self.profile.need_declared_frag_colors {
                        continue;
                    }
                    let variable = self.output_variable(f32x4, None);
                    self.module.decorate(variable, Decoration::Location, &[index as u32]);
                    self.module.name(variable, &format!("frag_color{}", index));
                    self.frag_colors[index] = variable;
                }
                if self.program.info.stores_frag_depth {
                    let f32_type = self.f32.get(1);
                    self.frag_depth = self.output_variable(f32_type, Some(BuiltIn::FragDepth));
                }
            }
            _ => {}
        }
        for index in 0..NUM_GENERICS as u32 {
            if !stores.generic(index) {
                continue;
            }
            used_locations[index as usize] = true;
            let components = stores.generic_components(index).max(1);
            let ty = self.f32.get(components);
            let variable = self.output_variable(ty, None);
            self.module.decorate(variable, Decoration::Location, &[index]);
            if components < 4 {
                // Partially used locations pack from component zero
                self.module.decorate(variable, Decoration::Component, &[0]);
            }
            self.apply_xfb(variable, index);
            self.output_generics[index as usize] = variable;
        }
        // Legacy fixed-function outputs take the lowest unused generic
        // locations
        let mut legacy = Vec::new();
        if stores.any_component(Attribute::COLOR_FRONT_DIFFUSE_R) {
            legacy.push("front_color");
        }
        for texcoord in 0..10u32 {
            let base = Attribute::new(Attribute::FIXED_FNC_TEXTURE_0_S.raw() + texcoord * 4);
            if stores.any_component(base) {
                legacy.push("texcoord");
            }
        }
        for _ in legacy {
            let location = find_next_unused_location(&used_locations)?;
            used_locations[location] = true;
            let variable = self.output_variable(f32x4, None);
            self.module.decorate(variable, Decoration::Location, &[location as u32]);
        }
        if self.stage == Stage::TessellationControl {
            let f32_type = self.f32.get(1);
            for index in 0..32 {
                if !self.program.info.used_patches[index] {
                    continue;
                }
                let pointer = self.module.type_pointer(StorageClass::Output, f32_type);
                let variable = self.module.global_variable(pointer, StorageClass::Output);
                self.module.decorate(variable, Decoration::Patch, &[]);
                self.module.decorate(variable, Decoration::Location, &[index as u32]);
                self.interfaces.push(variable);
                self.patches_out[index] = variable;
            }
        }
        if self.program.info.stores_indexed_attributes {
            self.indexed_store_func = self.define_indexed_store()?;
        }
        Ok(())
    }

    fn apply_xfb(&mut self, variable: Id, location: u32) {
        for varying in &self.runtime_info.xfb_varyings {
            if varying.components == 0 {
                continue;
            }
            // Varyings are keyed by generic location in the pipeline key
            if varying.offset / 16 != location {
                continue;
            }
            self.module.decorate(variable, Decoration::XfbBuffer, &[varying.buffer]);
            self.module.decorate(variable, Decoration::XfbStride, &[varying.stride]);
            self.module.decorate(variable, Decoration::Offset, &[varying.offset]);
        }
    }

    //----------------------------------------------------------------------
    // Helper functions

    /// Compare ladder over the masked attribute offset; one case per used
    /// input attribute.
    fn define_indexed_load(&mut self) -> Result<Id> {
        let f32_type = self.f32.get(1);
        let u32_type = self.u32.get(1);
        let func_type = self.module.type_function(f32_type, &[u32_type]);
        let func = self.module.alloc_id();
        let mut sink = Vec::new();
        push_inst(&mut sink, Op::Function, &[f32_type.0, func.0, 0, func_type.0]);
        let offset_param = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[u32_type.0, offset_param.0]);
        let entry = self.module.alloc_id();
        push_inst(&mut sink, Op::Label, &[entry.0]);

        // Word index = offset / 4, masked to the attribute range
        let shift_const = self.module.constant_u32(u32_type, 2);
        let mask_const = self.module.constant_u32(u32_type, 0xff);
        let word = self.module.alloc_id();
        push_inst(
            &mut sink,
            Op::ShiftRightLogical,
            &[u32_type.0, word.0, offset_param.0, shift_const.0],
        );
        let masked = self.module.alloc_id();
        push_inst(&mut sink, Op::BitwiseAnd, &[u32_type.0, masked.0, word.0, mask_const.0]);

        let generics = self.input_generics;
        let u1 = self.u1;
        for (index, &variable) in generics.iter().enumerate() {
            if !variable.is_set() {
                continue;
            }
            for element in 0..4u32 {
                let attr_word = 32 + index as u32 * 4 + element;
                let case_const = self.module.constant_u32(u32_type, attr_word);
                let cmp = self.module.alloc_id();
                push_inst(&mut sink, Op::IEqual, &[u1.0, cmp.0, masked.0, case_const.0]);
                let then_label = self.module.alloc_id();
                let else_label = self.module.alloc_id();
                push_inst(&mut sink, Op::SelectionMerge, &[else_label.0, 0]);
                push_inst(
                    &mut sink,
                    Op::BranchConditional,
                    &[cmp.0, then_label.0, else_label.0],
                );
                push_inst(&mut sink, Op::Label, &[then_label.0]);
                let pointer_type = self.module.type_pointer(StorageClass::Input, f32_type);
                let element_const = self.module.constant_u32(u32_type, element);
                let pointer = self.module.alloc_id();
                push_inst(
                    &mut sink,
                    Op::AccessChain,
                    &[pointer_type.0, pointer.0, variable.0, element_const.0],
                );
                let loaded = self.module.alloc_id();
                push_inst(&mut sink, Op::Load, &[f32_type.0, loaded.0, pointer.0]);
                push_inst(&mut sink, Op::ReturnValue, &[loaded.0]);
                push_inst(&mut sink, Op::Label, &[else_label.0]);
            }
        }
        let zero = self.f32_zero;
        push_inst(&mut sink, Op::ReturnValue, &[zero.0]);
        push_inst(&mut sink, Op::FunctionEnd, &[]);
        self.module.functions.extend_from_slice(&sink);
        Ok(func)
    }

    /// Symmetric store ladder over the used output attributes.
    fn define_indexed_store(&mut self) -> Result<Id> {
        let void = self.void;
        let f32_type = self.f32.get(1);
        let u32_type = self.u32.get(1);
        let func_type = self.module.type_function(void, &[u32_type, f32_type]);
        let func = self.module.alloc_id();
        let mut sink = Vec::new();
        push_inst(&mut sink, Op::Function, &[void.0, func.0, 0, func_type.0]);
        let offset_param = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[u32_type.0, offset_param.0]);
        let value_param = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[f32_type.0, value_param.0]);
        let entry = self.module.alloc_id();
        push_inst(&mut sink, Op::Label, &[entry.0]);

        let shift_const = self.module.constant_u32(u32_type, 2);
        let mask_const = self.module.constant_u32(u32_type, 0xff);
        let word = self.module.alloc_id();
        push_inst(
            &mut sink,
            Op::ShiftRightLogical,
            &[u32_type.0, word.0, offset_param.0, shift_const.0],
        );
        let masked = self.module.alloc_id();
        push_inst(&mut sink, Op::BitwiseAnd, &[u32_type.0, masked.0, word.0, mask_const.0]);

        let generics = self.output_generics;
        let u1 = self.u1;
        for (index, &variable) in generics.iter().enumerate() {
            if !variable.is_set() {
                continue;
            }
            for element in 0..4u32 {
                let attr_word = 32 + index as u32 * 4 + element;
                let case_const = self.module.constant_u32(u32_type, attr_word);
                let cmp = self.module.alloc_id();
                push_inst(&mut sink, Op::IEqual, &[u1.0, cmp.0, masked.0, case_const.0]);
                let then_label = self.module.alloc_id();
                let else_label = self.module.alloc_id();
                push_inst(&mut sink, Op::SelectionMerge, &[else_label.0, 0]);
                push_inst(
                    &mut sink,
                    Op::BranchConditional,
                    &[cmp.0, then_label.0, else_label.0],
                );
                push_inst(&mut sink, Op::Label, &[then_label.0]);
                let pointer_type = self.module.type_pointer(StorageClass::Output, f32_type);
                let element_const = self.module.constant_u32(u32_type, element);
                let pointer = self.module.alloc_id();
                push_inst(
                    &mut sink,
                    Op::AccessChain,
                    &[pointer_type.0, pointer.0, variable.0, element_const.0],
                );
                push_inst(&mut sink, Op::Store, &[pointer.0, value_param.0]);
                push_inst(&mut sink, Op::Return, &[]);
                push_inst(&mut sink, Op::Label, &[else_label.0]);
            }
        }
        push_inst(&mut sink, Op::Return, &[]);
        push_inst(&mut sink, Op::FunctionEnd, &[]);
        self.module.functions.extend_from_slice(&sink);
        Ok(func)
    }

    /// Per-width global memory helpers: read each storage buffer's
    /// (address, size) pair from its constant buffer, test containment and
    /// dispatch; unmatched addresses read zero.
    fn define_global_memory_functions(&mut self) {
        if !self.program.info.uses_global_memory || !self.profile.support_int64 {
            return;
        }
        if !self.u64_type.is_set() {
            self.module.add_capability(Capability::Int64);
            self.u64_type = self.module.type_int(64, false);
        }
        let defs: [(u32, Id, StorageTypeDefinition); 3] = [
            (2, self.u32.get(1), self.storage_u32.clone()),
            (3, self.u32.get(2), self.storage_u32x2.clone()),
            (4, self.u32.get(4), self.storage_u32x4.clone()),
        ];
        let mut loads = [Id(0); 3];
        let mut writes = [Id(0); 3];
        for (index, (shift, ty, storage)) in defs.iter().enumerate() {
            if storage.variables.is_empty() {
                continue;
            }
            loads[index] = self.define_global_load(*shift, *ty, storage);
            writes[index] = self.define_global_write(*shift, *ty, storage);
        }
        self.load_global_func_u32 = loads[0];
        self.load_global_func_u32x2 = loads[1];
        self.load_global_func_u32x4 = loads[2];
        self.write_global_func_u32 = writes[0];
        self.write_global_func_u32x2 = writes[1];
        self.write_global_func_u32x4 = writes[2];
    }

    fn global_body(
        &mut self,
        sink: &mut Vec<u32>,
        addr: Id,
        shift: u32,
        element_pointer: Id,
        storage: &StorageTypeDefinition,
        mut access: impl FnMut(&mut Module, &mut Vec<u32>, Id),
    ) {
        let u64_type = self.u64_type;
        let u32_type = self.u32.get(1);
        let u32x2_type = self.u32.get(2);
        let u1 = self.u1;
        let zero = self.u32_zero;
        let descriptors = self.program.info.storage_buffers_descriptors.clone();
        for (index, desc) in descriptors.iter().enumerate() {
            if index >= storage.variables.len()
                || !self.program.info.nvn_buffer_used.get(index).copied().unwrap_or(false)
            {
                continue;
            }
            let cbuf = self.cbufs[desc.cbuf_index as usize];
            let cbuf_var =
                if cbuf.u32x2_view.is_set() { cbuf.u32x2_view } else { cbuf.u32x4_view };
            if !cbuf_var.is_set() {
                continue;
            }
            // (addr, size) pair: address at offset/8 in the u32x2 view,
            // size two words after the address
            let addr_index = self.module.constant_u32(u32_type, desc.cbuf_offset / 8);
            let size_index = self.module.constant_u32(u32_type, desc.cbuf_offset / 4 + 2);
            let addr_ptr = self.module.alloc_id();
            push_inst(
                sink,
                Op::AccessChain,
                &[self.uniform_u32x2_pointer.0, addr_ptr.0, cbuf_var.0, zero.0, addr_index.0],
            );
            let size_ptr = self.module.alloc_id();
            push_inst(
                sink,
                Op::AccessChain,
                &[self.uniform_u32_pointer.0, size_ptr.0, cbuf_var.0, zero.0, size_index.0],
            );
            let addr_vec = self.module.alloc_id();
            push_inst(sink, Op::Load, &[u32x2_type.0, addr_vec.0, addr_ptr.0]);
            let ssbo_addr = self.module.alloc_id();
            push_inst(sink, Op::Bitcast, &[u64_type.0, ssbo_addr.0, addr_vec.0]);
            let size32 = self.module.alloc_id();
            push_inst(sink, Op::Load, &[u32_type.0, size32.0, size_ptr.0]);
            let size64 = self.module.alloc_id();
            push_inst(sink, Op::UConvert, &[u64_type.0, size64.0, size32.0]);
            let ssbo_end = self.module.alloc_id();
            push_inst(sink, Op::IAdd, &[u64_type.0, ssbo_end.0, ssbo_addr.0, size64.0]);
            let ge = self.module.alloc_id();
            push_inst(sink, Op::UGreaterThanEqual, &[u1.0, ge.0, addr.0, ssbo_addr.0]);
            let lt = self.module.alloc_id();
            push_inst(sink, Op::ULessThan, &[u1.0, lt.0, addr.0, ssbo_end.0]);
            let cond = self.module.alloc_id();
            push_inst(sink, Op::LogicalAnd, &[u1.0, cond.0, ge.0, lt.0]);
            let then_label = self.module.alloc_id();
            let else_label = self.module.alloc_id();
            push_inst(sink, Op::SelectionMerge, &[else_label.0, 0]);
            push_inst(sink, Op::BranchConditional, &[cond.0, then_label.0, else_label.0]);
            push_inst(sink, Op::Label, &[then_label.0]);
            let offset64 = self.module.alloc_id();
            push_inst(sink, Op::ISub, &[u64_type.0, offset64.0, addr.0, ssbo_addr.0]);
            let offset32 = self.module.alloc_id();
            push_inst(sink, Op::UConvert, &[u32_type.0, offset32.0, offset64.0]);
            let shift_const = self.module.constant_u32(u32_type, shift);
            let element_index = self.module.alloc_id();
            push_inst(
                sink,
                Op::ShiftRightLogical,
                &[u32_type.0, element_index.0, offset32.0, shift_const.0],
            );
            let pointer = self.module.alloc_id();
            push_inst(
                sink,
                Op::AccessChain,
                &[
                    element_pointer.0,
                    pointer.0,
                    storage.variables[index].0,
                    zero.0,
                    element_index.0,
                ],
            );
            access(&mut self.module, sink, pointer);
            push_inst(sink, Op::Label, &[else_label.0]);
        }
    }

    fn define_global_load(&mut self, shift: u32, ty: Id, storage: &StorageTypeDefinition) -> Id {
        let u64_type = self.u64_type;
        let func_type = self.module.type_function(ty, &[u64_type]);
        let func = self.module.alloc_id();
        let mut sink = Vec::new();
        push_inst(&mut sink, Op::Function, &[ty.0, func.0, 0, func_type.0]);
        let addr = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[u64_type.0, addr.0]);
        let entry = self.module.alloc_id();
        push_inst(&mut sink, Op::Label, &[entry.0]);
        let element_pointer = storage.element_pointer;
        self.global_body(&mut sink, addr, shift, element_pointer, storage, |module, sink, ptr| {
            let loaded = module.alloc_id();
            push_inst(sink, Op::Load, &[ty.0, loaded.0, ptr.0]);
            push_inst(sink, Op::ReturnValue, &[loaded.0]);
        });
        let null = self.module.constant_null(ty);
        push_inst(&mut sink, Op::ReturnValue, &[null.0]);
        push_inst(&mut sink, Op::FunctionEnd, &[]);
        self.module.functions.extend_from_slice(&sink);
        func
    }

    fn define_global_write(&mut self, shift: u32, ty: Id, storage: &StorageTypeDefinition) -> Id {
        let void = self.void;
        let u64_type = self.u64_type;
        let func_type = self.module.type_function(void, &[u64_type, ty]);
        let func = self.module.alloc_id();
        let mut sink = Vec::new();
        push_inst(&mut sink, Op::Function, &[void.0, func.0, 0, func_type.0]);
        let addr = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[u64_type.0, addr.0]);
        let data = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[ty.0, data.0]);
        let entry = self.module.alloc_id();
        push_inst(&mut sink, Op::Label, &[entry.0]);
        let element_pointer = storage.element_pointer;
        self.global_body(&mut sink, addr, shift, element_pointer, storage, |_, sink, ptr| {
            push_inst(sink, Op::Store, &[ptr.0, data.0]);
            push_inst(sink, Op::Return, &[]);
        });
        push_inst(&mut sink, Op::Return, &[]);
        push_inst(&mut sink, Op::FunctionEnd, &[]);
        self.module.functions.extend_from_slice(&sink);
        func
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CasOperation {
    Increment,
    Decrement,
    FpAdd,
    FpMin,
    FpMax,
}

impl<'a> EmitContext<'a> {
    fn define_cas_functions(&mut self) {
        let info = &self.program.info;
        let needs_ssbo_increment = info.uses_global_increment;
        let needs_ssbo_decrement = info.uses_global_decrement;
        let needs_f32_add = info.uses_atomic_f32_add;
        let needs_shared_increment = info.uses_shared_increment;
        let needs_shared_decrement = info.uses_shared_decrement;
        let u32_type = self.u32.get(1);
        let f32_type = self.f32.get(1);
        if needs_ssbo_increment {
            self.increment_cas_ssbo = self.cas_loop(CasOperation::Increment, u32_type, false);
        }
        if needs_ssbo_decrement {
            self.decrement_cas_ssbo = self.cas_loop(CasOperation::Decrement, u32_type, false);
        }
        if needs_f32_add {
            self.f32_add_cas = self.cas_loop(CasOperation::FpAdd, f32_type, false);
        }
        if needs_shared_increment {
            self.increment_cas_shared = self.cas_loop(CasOperation::Increment, u32_type, true);
        }
        if needs_shared_decrement {
            self.decrement_cas_shared = self.cas_loop(CasOperation::Decrement, u32_type, true);
        }
    }

    /// The pure computation of one CAS step, as its own function.
    fn cas_function(&mut self, operation: CasOperation, value_type: Id) -> Id {
        let func_type = self.module.type_function(value_type, &[value_type, value_type]);
        let func = self.module.alloc_id();
        let mut sink = Vec::new();
        push_inst(&mut sink, Op::Function, &[value_type.0, func.0, 0, func_type.0]);
        let op_a = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[value_type.0, op_a.0]);
        let op_b = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[value_type.0, op_b.0]);
        let entry = self.module.alloc_id();
        push_inst(&mut sink, Op::Label, &[entry.0]);
        let u1 = self.u1;
        let result = match operation {
            CasOperation::Increment => {
                let pred = self.module.alloc_id();
                push_inst(&mut sink, Op::UGreaterThanEqual, &[u1.0, pred.0, op_a.0, op_b.0]);
                let one = self.module.constant_u32(value_type, 1);
                let incr = self.module.alloc_id();
                push_inst(&mut sink, Op::IAdd, &[value_type.0, incr.0, op_a.0, one.0]);
                let zero = self.u32_zero;
                let result = self.module.alloc_id();
                push_inst(
                    &mut sink,
                    Op::Select,
                    &[value_type.0, result.0, pred.0, zero.0, incr.0],
                );
                result
            }
            CasOperation::Decrement => {
                let zero = self.module.constant_u32(value_type, 0);
                let lhs = self.module.alloc_id();
                push_inst(&mut sink, Op::IEqual, &[u1.0, lhs.0, op_a.0, zero.0]);
                let rhs = self.module.alloc_id();
                push_inst(&mut sink, Op::UGreaterThan, &[u1.0, rhs.0, op_a.0, op_b.0]);
                let pred = self.module.alloc_id();
                push_inst(&mut sink, Op::LogicalOr, &[u1.0, pred.0, lhs.0, rhs.0]);
                let one = self.module.constant_u32(value_type, 1);
                let decr = self.module.alloc_id();
                push_inst(&mut sink, Op::ISub, &[value_type.0, decr.0, op_a.0, one.0]);
                let result = self.module.alloc_id();
                push_inst(
                    &mut sink,
                    Op::Select,
                    &[value_type.0, result.0, pred.0, op_b.0, decr.0],
                );
                result
            }
            CasOperation::FpAdd => {
                let result = self.module.alloc_id();
                push_inst(&mut sink, Op::FAdd, &[value_type.0, result.0, op_a.0, op_b.0]);
                result
            }
            CasOperation::FpMin => {
                let glsl = self.module.glsl_std_450;
                let result = self.module.alloc_id();
                push_inst(
                    &mut sink,
                    Op::ExtInst,
                    &[value_type.0, result.0, glsl.0, spirv_headers::GLOp::FMin as u32, op_a.0, op_b.0],
                );
                result
            }
            CasOperation::FpMax => {
                let glsl = self.module.glsl_std_450;
                let result = self.module.alloc_id();
                push_inst(
                    &mut sink,
                    Op::ExtInst,
                    &[value_type.0, result.0, glsl.0, spirv_headers::GLOp::FMax as u32, op_a.0, op_b.0],
                );
                result
            }
        };
        push_inst(&mut sink, Op::ReturnValue, &[result.0]);
        push_inst(&mut sink, Op::FunctionEnd, &[]);
        self.module.functions.extend_from_slice(&sink);
        func
    }

    /// Compare-exchange-until-stable loop around one CAS step.
    fn cas_loop(&mut self, operation: CasOperation, value_type: Id, is_shared: bool) -> Id {
        let cas_func = self.cas_function(operation, value_type);
        let u32_type = self.u32.get(1);
        let u1 = self.u1;
        let zero = self.u32_zero;
        // Device scope for buffers, workgroup scope for shared memory
        let scope = self.module.constant_u32(u32_type, if is_shared { 2 } else { 1 });

        let func_type = if is_shared {
            self.module.type_function(value_type, &[u32_type, value_type])
        } else {
            self.module.type_function(value_type, &[u32_type, u32_type, value_type])
        };
        let func = self.module.alloc_id();
        let mut sink = Vec::new();
        push_inst(&mut sink, Op::Function, &[value_type.0, func.0, 0, func_type.0]);
        let index = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[u32_type.0, index.0]);
        let binding = if is_shared {
            Id(0)
        } else {
            let binding = self.module.alloc_id();
            push_inst(&mut sink, Op::FunctionParameter, &[u32_type.0, binding.0]);
            binding
        };
        let op_b = self.module.alloc_id();
        push_inst(&mut sink, Op::FunctionParameter, &[value_type.0, op_b.0]);
        let entry = self.module.alloc_id();
        push_inst(&mut sink, Op::Label, &[entry.0]);

        let loop_header = self.module.alloc_id();
        let continue_block = self.module.alloc_id();
        let merge_block = self.module.alloc_id();
        push_inst(&mut sink, Op::Branch, &[loop_header.0]);
        push_inst(&mut sink, Op::Label, &[loop_header.0]);
        push_inst(&mut sink, Op::LoopMerge, &[merge_block.0, continue_block.0, 0]);
        push_inst(&mut sink, Op::Branch, &[continue_block.0]);
        push_inst(&mut sink, Op::Label, &[continue_block.0]);

        let word_pointer = self.module.alloc_id();
        if is_shared {
            let pointer_type = self.module.type_pointer(StorageClass::Workgroup, u32_type);
            push_inst(
                &mut sink,
                Op::AccessChain,
                &[pointer_type.0, word_pointer.0, self.shared_memory.0, index.0],
            );
        } else {
            // The binding is compile-time constant at every call site, so
            // the pointer indexes the first storage view of that slot
            let pointer_type = self.storage_u32.element_pointer;
            let variable = self.storage_u32.variables.first().copied().unwrap_or(Id(0));
            let _ = binding;
            push_inst(
                &mut sink,
                Op::AccessChain,
                &[pointer_type.0, word_pointer.0, variable.0, zero.0, index.0],
            );
        }
        let loaded = self.module.alloc_id();
        push_inst(&mut sink, Op::Load, &[u32_type.0, loaded.0, word_pointer.0]);
        let matching = value_type == u32_type;
        let current = if matching {
            loaded
        } else {
            let cast = self.module.alloc_id();
            push_inst(&mut sink, Op::Bitcast, &[value_type.0, cast.0, loaded.0]);
            cast
        };
        let computed = self.module.alloc_id();
        push_inst(
            &mut sink,
            Op::FunctionCall,
            &[value_type.0, computed.0, cas_func.0, current.0, op_b.0],
        );
        let new_value = if matching {
            computed
        } else {
            let cast = self.module.alloc_id();
            push_inst(&mut sink, Op::Bitcast, &[u32_type.0, cast.0, computed.0]);
            cast
        };
        let atomic_res = self.module.alloc_id();
        push_inst(
            &mut sink,
            Op::AtomicCompareExchange,
            &[
                u32_type.0,
                atomic_res.0,
                word_pointer.0,
                scope.0,
                zero.0,
                zero.0,
                new_value.0,
                loaded.0,
            ],
        );
        let success = self.module.alloc_id();
        push_inst(&mut sink, Op::IEqual, &[u1.0, success.0, atomic_res.0, loaded.0]);
        push_inst(
            &mut sink,
            Op::BranchConditional,
            &[success.0, merge_block.0, loop_header.0],
        );
        push_inst(&mut sink, Op::Label, &[merge_block.0]);
        let final_value = if matching {
            atomic_res
        } else {
            let cast = self.module.alloc_id();
            push_inst(&mut sink, Op::Bitcast, &[value_type.0, cast.0, atomic_res.0]);
            cast
        };
        push_inst(&mut sink, Op::ReturnValue, &[final_value.0]);
        push_inst(&mut sink, Op::FunctionEnd, &[]);
        self.module.functions.extend_from_slice(&sink);
        func
    }
}

fn find_next_unused_location(used: &[bool; NUM_GENERICS]) -> Result<usize> {
    used.iter()
        .position(|&in_use| !in_use)
        .ok_or_else(|| Error::runtime("no free location for legacy attribute"))
}
