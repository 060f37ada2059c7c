//! Qualified type descriptors attached to every AST node.

use super::StructId;

/// Scalar or opaque category of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
    /// Statement nodes and functions without a return value
    Void,
    /// 32-bit float scalar, or the component type of float vectors/matrices
    Float,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    UInt,
    /// Boolean
    Bool,
    /// Opaque sampler handle
    Sampler(SamplerKind),
    /// User-defined structure, field list in the struct registry
    Struct,
    /// Uniform/buffer interface block, field list in the struct registry
    InterfaceBlock,
}

/// Sampler dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DArray,
    Sampler2DShadow,
}

/// Storage/usage class of a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// Function-local value
    Temporary,
    /// File-scope value
    Global,
    /// Compile-time constant
    Const,
    /// Default-block or block uniform
    Uniform,
    /// Vertex input
    Attribute,
    /// Inter-stage input
    VaryingIn,
    /// Inter-stage output
    VaryingOut,
    /// Value parameter
    ParamIn,
    /// Output parameter
    ParamOut,
    /// Input/output parameter
    ParamInOut,
    /// Read-only parameter
    ParamConst,
    /// Stage built-in such as the fragment coordinate
    BuiltIn,
}

impl Qualifier {
    /// True for parameter qualifiers the callee may write through
    pub fn is_writable_param(self) -> bool {
        matches!(self, Qualifier::ParamOut | Qualifier::ParamInOut)
    }
}

/// Precision qualifier, carried through but not otherwise interpreted by the passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Undefined,
    Low,
    Medium,
    High,
}

/// One array dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    /// Known constant size
    Fixed(u32),
    /// Runtime-sized, only valid as the outermost dimension of a buffer member
    Unsized,
}

/// layout(...) qualifier subset carried through translation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutQualifier {
    /// location = N
    pub location: Option<u32>,
    /// binding = N
    pub binding: Option<u32>,
}

/// Memory qualifiers for image/buffer declarations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryQualifiers {
    pub readonly: bool,
    pub writeonly: bool,
    pub coherent: bool,
}

/// Qualified type descriptor.
///
/// `primary_size` is the vector component count (matrix row count),
/// `secondary_size` the matrix column count; both are 1 for scalars.
/// Array dimensions are listed outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub basic: BasicType,
    pub precision: Precision,
    pub qualifier: Qualifier,
    pub primary_size: u8,
    pub secondary_size: u8,
    pub array_sizes: Vec<ArraySize>,
    pub struct_id: Option<StructId>,
    pub layout: LayoutQualifier,
    pub memory: MemoryQualifiers,
}

impl Type {
    /// The type of statement nodes
    pub fn void() -> Self {
        Self::scalar(BasicType::Void)
    }

    /// Unqualified scalar type
    pub fn scalar(basic: BasicType) -> Self {
        Type {
            basic,
            precision: Precision::Undefined,
            qualifier: Qualifier::Temporary,
            primary_size: 1,
            secondary_size: 1,
            array_sizes: Vec::new(),
            struct_id: None,
            layout: LayoutQualifier::default(),
            memory: MemoryQualifiers::default(),
        }
    }

    /// Unqualified vector type of `size` components
    pub fn vector(basic: BasicType, size: u8) -> Self {
        debug_assert!((2..=4).contains(&size));

        Type {
            primary_size: size,
            ..Self::scalar(basic)
        }
    }

    /// Unqualified float matrix with `columns` columns of `rows` components
    pub fn matrix(columns: u8, rows: u8) -> Self {
        debug_assert!((2..=4).contains(&columns) && (2..=4).contains(&rows));

        Type {
            primary_size: rows,
            secondary_size: columns,
            ..Self::scalar(BasicType::Float)
        }
    }

    /// Structure type referencing a registered field list
    pub fn structure(id: StructId) -> Self {
        Type {
            struct_id: Some(id),
            ..Self::scalar(BasicType::Struct)
        }
    }

    /// Interface block type referencing a registered field list
    pub fn interface_block(id: StructId) -> Self {
        Type {
            struct_id: Some(id),
            ..Self::scalar(BasicType::InterfaceBlock)
        }
    }

    /// Same type with a different qualifier
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    /// Same type with an extra outermost array dimension
    pub fn with_array(mut self, size: ArraySize) -> Self {
        self.array_sizes.insert(0, size);
        self
    }

    pub fn is_array(&self) -> bool {
        !self.array_sizes.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_array() && self.primary_size == 1 && self.secondary_size == 1
    }

    pub fn is_vector(&self) -> bool {
        !self.is_array() && self.primary_size > 1 && self.secondary_size == 1
    }

    pub fn is_matrix(&self) -> bool {
        !self.is_array() && self.secondary_size > 1
    }

    /// True for sampler types, which may not be gathered into uniform blocks
    pub fn is_opaque(&self) -> bool {
        matches!(self.basic, BasicType::Sampler(_))
    }

    /// Number of scalar components of a non-array value
    pub fn component_count(&self) -> u8 {
        self.primary_size * self.secondary_size
    }

    /// Scalar type with the same basic type and qualifier
    pub fn component_type(&self) -> Type {
        Type {
            primary_size: 1,
            secondary_size: 1,
            array_sizes: Vec::new(),
            ..self.clone()
        }
    }

    /// Type of one element of an array type
    pub fn element_type(&self) -> Type {
        debug_assert!(self.is_array());

        Type {
            array_sizes: self.array_sizes[1..].to_vec(),
            ..self.clone()
        }
    }

    /// True when both types have the same basic type and dimensions,
    /// ignoring qualifiers and precision
    pub fn same_shape(&self, other: &Type) -> bool {
        self.basic == other.basic
            && self.primary_size == other.primary_size
            && self.secondary_size == other.secondary_size
            && self.array_sizes == other.array_sizes
            && self.struct_id == other.struct_id
    }
}
