//! Generation-checked resource handles
//!
//! A handle is an `(index, generation)` pair. It never owns anything: the
//! device's slot table owns the backend object and a handle is only valid
//! while the slot's generation still matches.

use std::fmt;

/// Resource kind tag shared by handles, slot tables and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    SamplerState,
    Shader,
    PipelineState,
    Texture2D,
    VertexArray,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::SamplerState => "sampler state",
            ResourceKind::Shader => "shader",
            ResourceKind::PipelineState => "pipeline state",
            ResourceKind::Texture2D => "texture 2d",
            ResourceKind::VertexArray => "vertex array",
        };
        f.write_str(name)
    }
}

/// Common surface of every typed handle, used by the slot table
pub trait SlotHandle: Copy + Eq + fmt::Debug {
    const KIND: ResourceKind;

    fn from_parts(index: u16, generation: u16) -> Self;
    fn index(&self) -> u16;
    fn generation(&self) -> u16;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            index: u16,
            generation: u16,
        }

        impl SlotHandle for $name {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn from_parts(index: u16, generation: u16) -> Self {
                Self { index, generation }
            }

            fn index(&self) -> u16 {
                self.index
            }

            fn generation(&self) -> u16 {
                self.generation
            }
        }

        impl From<$name> for ResourceId {
            fn from(handle: $name) -> Self {
                ResourceId::$kind(handle)
            }
        }
    };
}

define_handle!(
    /// Handle to a vertex, index or uniform buffer
    BufferHandle => Buffer
);
define_handle!(
    /// Handle to a sampler state
    SamplerStateHandle => SamplerState
);
define_handle!(
    /// Handle to a single compiled shader stage
    ShaderHandle => Shader
);
define_handle!(
    /// Handle to a linked vertex + fragment pipeline (shader program)
    PipelineStateHandle => PipelineState
);
define_handle!(
    /// Handle to a 2D texture
    Texture2DHandle => Texture2D
);
define_handle!(
    /// Handle to a vertex array (vertex buffer + optional index buffer + layout)
    VertexArrayHandle => VertexArray
);

/// Any handle, tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Buffer(BufferHandle),
    SamplerState(SamplerStateHandle),
    Shader(ShaderHandle),
    PipelineState(PipelineStateHandle),
    Texture2D(Texture2DHandle),
    VertexArray(VertexArrayHandle),
}

impl ResourceId {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceId::Buffer(_) => ResourceKind::Buffer,
            ResourceId::SamplerState(_) => ResourceKind::SamplerState,
            ResourceId::Shader(_) => ResourceKind::Shader,
            ResourceId::PipelineState(_) => ResourceKind::PipelineState,
            ResourceId::Texture2D(_) => ResourceKind::Texture2D,
            ResourceId::VertexArray(_) => ResourceKind::VertexArray,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_compare_by_index_and_generation() {
        let a = BufferHandle::from_parts(3, 0);
        let b = BufferHandle::from_parts(3, 1);
        assert_ne!(a, b);
        assert_eq!(a, BufferHandle::from_parts(3, 0));
        assert_eq!(b.index(), 3);
        assert_eq!(b.generation(), 1);
    }

    #[test]
    fn test_resource_id_kind() {
        let id: ResourceId = ShaderHandle::from_parts(0, 0).into();
        assert_eq!(id.kind(), ResourceKind::Shader);
        assert_eq!(ResourceKind::Texture2D.to_string(), "texture 2d");
    }
}
