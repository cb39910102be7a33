//! Word-level SPIR-V module assembly.
//!
//! Logical sections are kept separate and spliced into the final stream in
//! the order the specification mandates. Ids are handed out monotonically;
//! types and scalar constants are deduplicated.

use fxhash::FxHashMap;
use spirv_headers::{AddressingModel, Capability, ExecutionModel, MemoryModel, Op, StorageClass};

pub const MAGIC: u32 = 0x0723_0203;
pub const GENERATOR: u32 = 0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct Id(pub u32);

impl Id {
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeKey {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: Id, count: u32 },
    Pointer { storage_class: u32, pointee: Id },
    Array { element: Id, length: Id },
    RuntimeArray { element: Id },
    Function { ret: Id, params: [Id; 4], num_params: u32 },
    Image { sampled: Id, dim: u32, depth: u32, arrayed: u32, ms: u32, usage: u32, format: u32 },
    SampledImage { image: Id },
}

pub struct Module {
    next_id: u32,
    version: u32,
    pub capabilities: Vec<u32>,
    pub extensions: Vec<u32>,
    pub ext_imports: Vec<u32>,
    pub memory_model: Vec<u32>,
    pub entry_points: Vec<u32>,
    pub execution_modes: Vec<u32>,
    pub debug: Vec<u32>,
    pub annotations: Vec<u32>,
    pub globals: Vec<u32>,
    pub functions: Vec<u32>,

    type_cache: FxHashMap<TypeKey, Id>,
    const_cache: FxHashMap<(Id, u64), Id>,
    struct_counter: u32,
    pub glsl_std_450: Id,
    declared_capabilities: Vec<Capability>,
}

fn opcode_word(op: Op, word_count: u32) -> u32 {
    (word_count << 16) | op as u32
}

pub fn push_inst(sink: &mut Vec<u32>, op: Op, operands: &[u32]) {
    sink.push(opcode_word(op, operands.len() as u32 + 1));
    sink.extend_from_slice(operands);
}

/// UTF-8 string packed into words with a guaranteed null terminator.
pub fn string_words(text: &str) -> Vec<u32> {
    let mut bytes: Vec<u8> = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|chunk| {
            u32::from(chunk[0])
                | u32::from(chunk[1]) << 8
                | u32::from(chunk[2]) << 16
                | u32::from(chunk[3]) << 24
        })
        .collect()
}

impl Module {
    pub fn new(version: u32) -> Module {
        let mut module = Module {
            next_id: 1,
            version,
            capabilities: Vec::new(),
            extensions: Vec::new(),
            ext_imports: Vec::new(),
            memory_model: Vec::new(),
            entry_points: Vec::new(),
            execution_modes: Vec::new(),
            debug: Vec::new(),
            annotations: Vec::new(),
            globals: Vec::new(),
            functions: Vec::new(),
            type_cache: FxHashMap::default(),
            const_cache: FxHashMap::default(),
            struct_counter: 0,
            glsl_std_450: Id(0),
            declared_capabilities: Vec::new(),
        };
        push_inst(
            &mut module.memory_model,
            Op::MemoryModel,
            &[AddressingModel::Logical as u32, MemoryModel::GLSL450 as u32],
        );
        let glsl = module.alloc_id();
        let mut words = vec![glsl.0];
        words.extend(string_words("GLSL.std.450"));
        push_inst(&mut module.ext_imports, Op::ExtInstImport, &words);
        module.glsl_std_450 = glsl;
        module
    }

    pub fn alloc_id(&mut self) -> Id {
        let id = Id(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_capability(&mut self, capability: Capability) {
        if self.declared_capabilities.contains(&capability) {
            return;
        }
        self.declared_capabilities.push(capability);
        push_inst(&mut self.capabilities, Op::Capability, &[capability as u32]);
    }

    pub fn add_extension(&mut self, name: &str) {
        push_inst(&mut self.extensions, Op::Extension, &string_words(name));
    }

    /// For capabilities newer than the generated enum.
    pub fn add_capability_raw(&mut self, capability: u32) {
        push_inst(&mut self.capabilities, Op::Capability, &[capability]);
    }

    pub fn add_entry_point(&mut self, model: ExecutionModel, main: Id, interfaces: &[Id]) {
        let mut words = vec![model as u32, main.0];
        words.extend(string_words("main"));
        words.extend(interfaces.iter().map(|id| id.0));
        push_inst(&mut self.entry_points, Op::EntryPoint, &words);
    }

    pub fn name(&mut self, target: Id, name: &str) {
        let mut words = vec![target.0];
        words.extend(string_words(name));
        push_inst(&mut self.debug, Op::Name, &words);
    }

    pub fn decorate(&mut self, target: Id, decoration: spirv_headers::Decoration, literals: &[u32]) {
        let mut words = vec![target.0, decoration as u32];
        words.extend_from_slice(literals);
        push_inst(&mut self.annotations, Op::Decorate, &words);
    }

    pub fn member_decorate(
        &mut self,
        target: Id,
        member: u32,
        decoration: spirv_headers::Decoration,
        literals: &[u32],
    ) {
        let mut words = vec![target.0, member, decoration as u32];
        words.extend_from_slice(literals);
        push_inst(&mut self.annotations, Op::MemberDecorate, &words);
    }

    fn cached_type(&mut self, key: TypeKey, build: impl FnOnce(&mut Module, Id)) -> Id {
        if let Some(&id) = self.type_cache.get(&key) {
            return id;
        }
        let id = self.alloc_id();
        build(self, id);
        self.type_cache.insert(key, id);
        id
    }

    pub fn type_void(&mut self) -> Id {
        self.cached_type(TypeKey::Void, |module, id| {
            push_inst(&mut module.globals, Op::TypeVoid, &[id.0]);
        })
    }

    pub fn type_bool(&mut self) -> Id {
        self.cached_type(TypeKey::Bool, |module, id| {
            push_inst(&mut module.globals, Op::TypeBool, &[id.0]);
        })
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> Id {
        self.cached_type(TypeKey::Int { width, signed }, |module, id| {
            push_inst(&mut module.globals, Op::TypeInt, &[id.0, width, u32::from(signed)]);
        })
    }

    pub fn type_float(&mut self, width: u32) -> Id {
        self.cached_type(TypeKey::Float { width }, |module, id| {
            push_inst(&mut module.globals, Op::TypeFloat, &[id.0, width]);
        })
    }

    pub fn type_vector(&mut self, component: Id, count: u32) -> Id {
        self.cached_type(TypeKey::Vector { component, count }, |module, id| {
            push_inst(&mut module.globals, Op::TypeVector, &[id.0, component.0, count]);
        })
    }

    pub fn type_pointer(&mut self, storage_class: StorageClass, pointee: Id) -> Id {
        let key = TypeKey::Pointer { storage_class: storage_class as u32, pointee };
        self.cached_type(key, |module, id| {
            push_inst(
                &mut module.globals,
                Op::TypePointer,
                &[id.0, storage_class as u32, pointee.0],
            );
        })
    }

    pub fn type_array(&mut self, element: Id, length: Id) -> Id {
        self.cached_type(TypeKey::Array { element, length }, |module, id| {
            push_inst(&mut module.globals, Op::TypeArray, &[id.0, element.0, length.0]);
        })
    }

    /// Arrays that get layout decorations need their own id; a decorated
    /// type must not alias an undecorated use of the same shape.
    pub fn type_array_unique(&mut self, element: Id, length: Id) -> Id {
        let id = self.alloc_id();
        push_inst(&mut self.globals, Op::TypeArray, &[id.0, element.0, length.0]);
        id
    }

    pub fn type_runtime_array(&mut self, element: Id) -> Id {
        self.cached_type(TypeKey::RuntimeArray { element }, |module, id| {
            push_inst(&mut module.globals, Op::TypeRuntimeArray, &[id.0, element.0]);
        })
    }

    pub fn type_function(&mut self, ret: Id, params: &[Id]) -> Id {
        debug_assert!(params.len() <= 4);
        let mut key_params = [Id(0); 4];
        key_params[..params.len()].copy_from_slice(params);
        let key = TypeKey::Function { ret, params: key_params, num_params: params.len() as u32 };
        self.cached_type(key, |module, id| {
            let mut words = vec![id.0, ret.0];
            words.extend(params.iter().map(|param| param.0));
            push_inst(&mut module.globals, Op::TypeFunction, &words);
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn type_image(
        &mut self,
        sampled: Id,
        dim: spirv_headers::Dim,
        depth: u32,
        arrayed: bool,
        ms: bool,
        usage: u32,
        format: spirv_headers::ImageFormat,
    ) -> Id {
        let key = TypeKey::Image {
            sampled,
            dim: dim as u32,
            depth,
            arrayed: u32::from(arrayed),
            ms: u32::from(ms),
            usage,
            format: format as u32,
        };
        self.cached_type(key, |module, id| {
            push_inst(
                &mut module.globals,
                Op::TypeImage,
                &[
                    id.0,
                    sampled.0,
                    dim as u32,
                    depth,
                    u32::from(arrayed),
                    u32::from(ms),
                    usage,
                    format as u32,
                ],
            );
        })
    }

    pub fn type_sampled_image(&mut self, image: Id) -> Id {
        self.cached_type(TypeKey::SampledImage { image }, |module, id| {
            push_inst(&mut module.globals, Op::TypeSampledImage, &[id.0, image.0]);
        })
    }

    /// Structs are never deduplicated; descriptor aliasing relies on
    /// distinct struct types per view.
    pub fn type_struct(&mut self, members: &[Id]) -> Id {
        let id = self.alloc_id();
        let mut words = vec![id.0];
        words.extend(members.iter().map(|member| member.0));
        push_inst(&mut self.globals, Op::TypeStruct, &words);
        self.struct_counter += 1;
        id
    }

    pub fn constant_u32(&mut self, ty: Id, value: u32) -> Id {
        self.constant_words(ty, &[value], u64::from(value))
    }

    pub fn constant_f32(&mut self, ty: Id, value: f32) -> Id {
        self.constant_words(ty, &[value.to_bits()], u64::from(value.to_bits()))
    }

    pub fn constant_u64(&mut self, ty: Id, value: u64) -> Id {
        self.constant_words(ty, &[value as u32, (value >> 32) as u32], value)
    }

    fn constant_words(&mut self, ty: Id, words: &[u32], key: u64) -> Id {
        if let Some(&id) = self.const_cache.get(&(ty, key)) {
            return id;
        }
        let id = self.alloc_id();
        let mut operands = vec![ty.0, id.0];
        operands.extend_from_slice(words);
        push_inst(&mut self.globals, Op::Constant, &operands);
        self.const_cache.insert((ty, key), id);
        id
    }

    pub fn constant_bool(&mut self, ty: Id, value: bool) -> Id {
        if let Some(&id) = self.const_cache.get(&(ty, 2 + u64::from(value))) {
            return id;
        }
        let id = self.alloc_id();
        let op = if value { Op::ConstantTrue } else { Op::ConstantFalse };
        push_inst(&mut self.globals, op, &[ty.0, id.0]);
        self.const_cache.insert((ty, 2 + u64::from(value)), id);
        id
    }

    pub fn constant_null(&mut self, ty: Id) -> Id {
        let id = self.alloc_id();
        push_inst(&mut self.globals, Op::ConstantNull, &[ty.0, id.0]);
        id
    }

    pub fn constant_composite(&mut self, ty: Id, members: &[Id]) -> Id {
        let id = self.alloc_id();
        let mut operands = vec![ty.0, id.0];
        operands.extend(members.iter().map(|member| member.0));
        push_inst(&mut self.globals, Op::ConstantComposite, &operands);
        id
    }

    pub fn global_variable(&mut self, pointer_type: Id, storage_class: StorageClass) -> Id {
        let id = self.alloc_id();
        push_inst(
            &mut self.globals,
            Op::Variable,
            &[pointer_type.0, id.0, storage_class as u32],
        );
        id
    }

    /// Splices the sections into the final word stream.
    pub fn assemble(&self) -> Vec<u32> {
        let mut words = vec![MAGIC, self.version, GENERATOR, self.next_id, 0];
        words.extend_from_slice(&self.capabilities);
        words.extend_from_slice(&self.extensions);
        words.extend_from_slice(&self.ext_imports);
        words.extend_from_slice(&self.memory_model);
        words.extend_from_slice(&self.entry_points);
        words.extend_from_slice(&self.execution_modes);
        words.extend_from_slice(&self.debug);
        words.extend_from_slice(&self.annotations);
        words.extend_from_slice(&self.globals);
        words.extend_from_slice(&self.functions);
        words
    }

    /// Little-endian byte serialization for callers that persist modules.
    pub fn assemble_bytes(&self) -> Vec<u8> {
        use byteorder::{ByteOrder, LittleEndian};
        let words = self.assemble();
        let mut bytes = vec![0u8; words.len() * 4];
        LittleEndian::write_u32_into(&words, &mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_type_dedup() {
        let mut module = Module::new(0x0001_0300);
        let int_a = module.type_int(32, false);
        let int_b = module.type_int(32, false);
        assert_eq!(int_a, int_b);
        let signed = module.type_int(32, true);
        assert!(signed != int_a);
        let words = module.assemble();
        assert_eq!(words[0], MAGIC);
        assert_eq!(words[1], 0x0001_0300);
    }

    #[test]
    fn string_packing_is_null_terminated() {
        let words = string_words("main");
        // 'm' 'a' 'i' 'n' 0x00 padded to two words
        assert_eq!(words.len(), 2);
        assert_eq!(words[0] & 0xff, u32::from(b'm'));
        assert_eq!(words[1] >> 24, 0);
    }
}
