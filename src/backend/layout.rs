//! Vertex and uniform layout descriptions
//!
//! A layout is an ordered list of named elements. Each backend computes its
//! own byte offsets from the same element list:
//!
//! - vertex layouts are tightly packed on every backend (offset = sum of the
//!   sizes of the previous elements);
//! - uniform layouts are packed on Direct3D and rounded up to 16-byte
//!   boundaries per element on OpenGL (std140-like).
//!
//! The element *names* are what binds data to the shader: the GL attribute
//! name, or the HLSL semantic (`TEXCOORD1` -> semantic `TEXCOORD`, index 1).

use crate::backend::context::ContextType;
use crate::backend::traits::{GraphicsError, GraphicsResult};

/// Scalar type of a layout element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Int,
    UnsignedInt,
    Float,
    /// 4x4 float matrix
    Matrix,
}

impl ElementType {
    /// Size in bytes of one `count` unit of this type
    pub fn size(&self) -> u32 {
        match self {
            ElementType::Int | ElementType::UnsignedInt | ElementType::Float => 4,
            ElementType::Matrix => 64,
        }
    }
}

/// One named element of a layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutElement {
    pub name: String,
    pub ty: ElementType,
    /// Component count (1..=4) or, for matrices, the number of matrices
    pub count: u32,
    /// Integer element holding four 8-bit channels normalized to [0, 1]
    /// (unsigned) or [-1, 1] (signed), read by the shader as a 4-float vector
    pub normalized: bool,
}

impl LayoutElement {
    pub fn new(name: impl Into<String>, ty: ElementType, count: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            count,
            normalized: false,
        }
    }

    pub fn size(&self) -> u32 {
        self.ty.size() * self.count
    }

    pub fn is_packed_normalized(&self) -> bool {
        self.normalized && matches!(self.ty, ElementType::Int | ElementType::UnsignedInt)
    }

    /// Type and component count as the shader sees them
    pub fn shader_shape(&self) -> (ElementType, u32) {
        if self.is_packed_normalized() {
            (ElementType::Float, 4)
        } else {
            (self.ty, self.count)
        }
    }

    fn validate(&self) -> GraphicsResult<()> {
        let ok = match self.ty {
            ElementType::Matrix => self.count >= 1,
            _ if self.is_packed_normalized() => self.count == 1,
            _ => (1..=4).contains(&self.count),
        };
        if ok {
            Ok(())
        } else {
            Err(GraphicsError::InvalidLayout(format!(
                "element '{}' has unsupported count {} for {:?}",
                self.name, self.count, self.ty
            )))
        }
    }
}

/// Offset rule for uniform data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Offsets accumulate element sizes (Direct3D)
    Packed,
    /// Each element starts on a 16-byte boundary (OpenGL std140)
    Std140,
}

impl Packing {
    /// Uniform packing rule of a device driving `ty`
    pub fn for_context(ty: ContextType) -> Self {
        match ty {
            ContextType::OpenGL | ContextType::OpenGLES => Packing::Std140,
            _ => Packing::Packed,
        }
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

fn element_offsets(elements: &[LayoutElement], packing: Packing) -> (Vec<u32>, u32) {
    let mut offsets = Vec::with_capacity(elements.len());
    let mut cursor = 0;
    for element in elements {
        if packing == Packing::Std140 {
            cursor = align_up(cursor, 16);
        }
        offsets.push(cursor);
        cursor += element.size();
    }
    let total = match packing {
        Packing::Packed => cursor,
        Packing::Std140 => align_up(cursor, 16),
    };
    (offsets, total)
}

/// Layout of one interleaved vertex buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    elements: Vec<LayoutElement>,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, ty: ElementType, count: u32) -> Self {
        self.elements.push(LayoutElement::new(name, ty, count));
        self
    }

    pub fn with_normalized(mut self, name: impl Into<String>, ty: ElementType, count: u32) -> Self {
        let mut element = LayoutElement::new(name, ty, count);
        element.normalized = true;
        self.elements.push(element);
        self
    }

    pub fn elements(&self) -> &[LayoutElement] {
        &self.elements
    }

    /// Byte offset of every element, in order
    pub fn offsets(&self) -> Vec<u32> {
        element_offsets(&self.elements, Packing::Packed).0
    }

    /// Size in bytes of one vertex
    pub fn stride(&self) -> u32 {
        self.elements.iter().map(LayoutElement::size).sum()
    }

    pub fn find(&self, name: &str) -> Option<&LayoutElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn validate(&self) -> GraphicsResult<()> {
        if self.elements.is_empty() {
            return Err(GraphicsError::InvalidLayout("vertex layout has no elements".into()));
        }
        self.elements.iter().try_for_each(LayoutElement::validate)
    }
}

/// Layout of a uniform (constant) buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct UniformLayout {
    elements: Vec<LayoutElement>,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, ty: ElementType, count: u32) -> Self {
        self.elements.push(LayoutElement::new(name, ty, count));
        self
    }

    pub fn elements(&self) -> &[LayoutElement] {
        &self.elements
    }

    pub fn offsets(&self, packing: Packing) -> Vec<u32> {
        element_offsets(&self.elements, packing).0
    }

    /// Total buffer size in bytes under the given packing
    pub fn size(&self, packing: Packing) -> u32 {
        element_offsets(&self.elements, packing).1
    }

    /// Index and element for a name
    pub fn find(&self, name: &str) -> Option<(usize, &LayoutElement)> {
        self.elements.iter().enumerate().find(|(_, e)| e.name == name)
    }

    pub fn validate(&self) -> GraphicsResult<()> {
        self.elements.iter().try_for_each(LayoutElement::validate)
    }
}

/// Split an element name into an HLSL semantic name and index
/// (`TEXCOORD1` -> (`TEXCOORD`, 1), `POSITION` -> (`POSITION`, 0)).
pub fn split_semantic(name: &str) -> (&str, u32) {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 || digits == name.len() {
        return (name, 0);
    }
    let (base, index) = name.split_at(name.len() - digits);
    (base, index.parse().unwrap_or(0))
}
