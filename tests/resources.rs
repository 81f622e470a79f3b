//! Owned resource wrappers over a shared device.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec4};
use rstest::rstest;

use common::{dx_desc, gl_desc, init_logging, GlCall, GlConfig, GlProbe, RecordingD3d11, RecordingGl};
use engine2d_graphics::backend::directx::DirectXDevice;
use engine2d_graphics::backend::opengl::OpenGlDevice;
use engine2d_graphics::backend::*;
use engine2d_graphics::resources::*;

const VERTEX_SHADER: &str = "#version 330 core
in vec2 a_position;
void main() { gl_Position = vec4(a_position, 0.0, 1.0); }";

const FRAGMENT_SHADER: &str = "#version 330 core
out vec4 frag;
void main() { frag = vec4(1.0); }";

type GlDevice = Rc<RefCell<OpenGlDevice<RecordingGl>>>;

/// The concrete device for inspection, plus the same device as a [`DeviceRef`]
fn gl_device() -> (GlDevice, DeviceRef, Rc<RefCell<GlProbe>>) {
    init_logging();
    let (gl, probe) = RecordingGl::new(GlConfig::desktop());
    let concrete = Rc::new(RefCell::new(OpenGlDevice::new(gl, &gl_desc(), 800, 600).unwrap()));
    let device: DeviceRef = concrete.clone();
    (concrete, device, probe)
}

fn dx_device() -> DeviceRef {
    init_logging();
    let (api, _probe) = RecordingD3d11::new();
    Rc::new(RefCell::new(DirectXDevice::new(api, &dx_desc(), 800, 600).unwrap()))
}

fn live_buffers(device: &GlDevice) -> usize {
    device.borrow().live_resources(ResourceKind::Buffer)
}

fn globals_layout() -> UniformLayout {
    UniformLayout::new()
        .with("u_time", ElementType::Float, 1)
        .with("u_offset", ElementType::Float, 2)
        .with("u_tint", ElementType::Float, 4)
        .with("u_transform", ElementType::Matrix, 1)
}

// ============================================================================
// Lifetime
// ============================================================================

#[test]
fn test_drop_releases_handle() {
    let (concrete, device, _probe) = gl_device();
    let buffer = Buffer::vertices(&device, &[0.0f32; 6]).unwrap();
    assert_eq!(buffer.size(), 24);
    assert_eq!(live_buffers(&concrete), 1);

    drop(buffer);
    assert_eq!(live_buffers(&concrete), 0);
    assert_eq!(concrete.borrow().pending_destruction(), 1);
}

#[test]
fn test_free_is_idempotent() {
    let (concrete, device, probe) = gl_device();
    let mut buffer = Buffer::new(&device, &BufferDesc::new(16, Usage::Dynamic, BufferType::Vertex)).unwrap();
    let other = Buffer::indices(&device, &[0, 1, 2]).unwrap();

    buffer.free();
    buffer.free();
    drop(buffer);
    assert_eq!(live_buffers(&concrete), 1);
    assert_eq!(concrete.borrow().pending_destruction(), 1);

    device.borrow_mut().present().unwrap();
    device.borrow_mut().present().unwrap();
    assert_eq!(probe.borrow().deleted.len(), 1);
    assert_eq!(probe.borrow().double_deletes, 0);
    drop(other);
}

#[test]
fn test_freed_wrapper_rejects_use() {
    let (_concrete, device, _probe) = gl_device();
    let mut buffer = Buffer::new(&device, &BufferDesc::new(16, Usage::Dynamic, BufferType::Vertex)).unwrap();
    buffer.write(&[0; 16]).unwrap();
    buffer.free();
    assert!(matches!(buffer.write(&[0; 16]), Err(GraphicsError::InvalidParameter(_))));
}

#[test]
fn test_drop_while_device_borrowed_is_queued() {
    let (concrete, device, _probe) = gl_device();
    let buffer = Buffer::vertices(&device, &[0u8; 8]).unwrap();

    let guard = device.borrow_mut();
    drop(buffer);
    drop(guard);
    assert_eq!(live_buffers(&concrete), 1);

    device.borrow_mut().present().unwrap();
    assert_eq!(live_buffers(&concrete), 0);
}

#[test]
fn test_use_while_device_borrowed_fails() {
    let (_concrete, device, _probe) = gl_device();
    let buffer = Buffer::new(&device, &BufferDesc::new(16, Usage::Dynamic, BufferType::Vertex)).unwrap();
    let _guard = device.borrow();
    assert!(matches!(buffer.write(&[0; 16]), Err(GraphicsError::InvalidParameter(_))));
}

#[rstest]
#[case::shared(false)]
#[case::exclusive(true)]
fn test_create_while_device_borrowed_fails(#[case] exclusive: bool) {
    let (concrete, device, _probe) = gl_device();
    let layout = VertexLayout::new().with("a_position", ElementType::Float, 2);
    let image = TextureData::checkerboard(4, [0, 0, 0, 255], [255, 255, 255, 255]);
    let in_use = |result: GraphicsResult<()>| matches!(result, Err(GraphicsError::InvalidParameter(_)));

    let (_shared, _exclusive) = if exclusive {
        (None, Some(device.borrow_mut()))
    } else {
        (Some(device.borrow()), None)
    };
    assert!(in_use(
        Buffer::new(&device, &BufferDesc::new(16, Usage::Dynamic, BufferType::Vertex)).map(drop)
    ));
    assert!(in_use(SamplerState::new(&device, SamplerDesc::default()).map(drop)));
    assert!(in_use(Shader::new(&device, ShaderStage::Vertex, VERTEX_SHADER).map(drop)));
    assert!(in_use(
        ShaderProgram::from_sources(&device, VERTEX_SHADER, FRAGMENT_SHADER, layout).map(drop)
    ));
    assert!(in_use(Texture2D::from_data(&device, &image, false).map(drop)));
    assert!(in_use(UniformBuffer::new(&device, globals_layout()).map(drop)));
    drop((_shared, _exclusive));

    assert_eq!(live_buffers(&concrete), 0);
    Buffer::new(&device, &BufferDesc::new(16, Usage::Dynamic, BufferType::Vertex)).unwrap();
}

#[test]
fn test_wrapper_outliving_device() {
    let (concrete, device, probe) = gl_device();
    let buffer = Buffer::vertices(&device, &[0u8; 8]).unwrap();
    drop(device);
    drop(concrete);
    assert!(probe.borrow().live.is_empty());

    assert!(matches!(buffer.write(&[0; 8]), Err(GraphicsError::InvalidParameter(_))));
    drop(buffer);
    assert_eq!(probe.borrow().double_deletes, 0);
}

#[test]
fn test_program_outlives_its_stages() {
    let (concrete, device, _probe) = gl_device();
    let layout = VertexLayout::new().with("a_position", ElementType::Float, 2);
    let program = ShaderProgram::from_sources(&device, VERTEX_SHADER, FRAGMENT_SHADER, layout.clone()).unwrap();

    let device_ref = concrete.borrow();
    assert_eq!(device_ref.live_resources(ResourceKind::Shader), 0);
    assert_eq!(device_ref.live_resources(ResourceKind::PipelineState), 1);
    drop(device_ref);
    assert_eq!(program.vertex_layout(), &layout);
    program.bind().unwrap();
}

// ============================================================================
// Drawing through wrappers
// ============================================================================

#[test]
fn test_vertex_array_draw() {
    let (_concrete, device, probe) = gl_device();
    let layout = VertexLayout::new().with("a_position", ElementType::Float, 2);
    let vertices = Buffer::vertices(&device, &[Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE]).unwrap();
    let indices = Buffer::indices(&device, &[0, 1, 2, 2, 1, 3]).unwrap();
    let quad = VertexArray::new(&device, &vertices, Some((&indices, IndexFormat::U16)), layout.clone()).unwrap();
    let strip = VertexArray::new(&device, &vertices, None, layout.clone()).unwrap();
    let program = ShaderProgram::from_sources(&device, VERTEX_SHADER, FRAGMENT_SHADER, layout).unwrap();
    program.bind().unwrap();

    quad.draw(PrimitiveType::TriangleList, 0, 6).unwrap();
    strip.draw(PrimitiveType::TriangleStrip, 0, 4).unwrap();

    let probe = probe.borrow();
    assert!(probe.calls.contains(&GlCall::DrawElements {
        mode: glow::TRIANGLES,
        count: 6,
        ty: glow::UNSIGNED_SHORT,
        offset: 0
    }));
    assert!(probe.calls.contains(&GlCall::DrawArrays {
        mode: glow::TRIANGLE_STRIP,
        first: 0,
        count: 4
    }));
    assert!(quad.is_indexed());
    assert!(!strip.is_indexed());
}

#[test]
fn test_texture_from_data() {
    let (concrete, device, probe) = gl_device();
    let image = TextureData::checkerboard(16, [0, 0, 0, 255], [255, 255, 255, 255]);
    let texture = Texture2D::from_data(&device, &image, true).unwrap();

    assert_eq!((texture.width(), texture.height()), (16, 16));
    assert_eq!(texture.mip_count(), 5);
    assert_eq!(texture.update(&image.data), Err(GraphicsError::StaticBufferWrite));
    assert_eq!(probe.borrow().count(|c| *c == GlCall::GenerateMipmap), 1);

    texture.bind(0).unwrap();
    drop(texture);
    assert_eq!(concrete.borrow().live_resources(ResourceKind::Texture2D), 0);
}

#[test]
fn test_sampler_update() {
    let (_concrete, device, _probe) = gl_device();
    let mut sampler = SamplerState::new(&device, SamplerDesc::default()).unwrap();
    sampler
        .update(SamplerDesc::default().with_filter(Filter::Point))
        .unwrap();
    assert_eq!(sampler.desc().filter, Filter::Point);
    sampler.bind(1).unwrap();
}

// ============================================================================
// Uniform buffers
// ============================================================================

#[rstest]
#[case::opengl(true, 112, [0, 16, 32, 48])]
#[case::direct3d(false, 92, [0, 4, 12, 28])]
fn test_uniform_offsets_follow_device(#[case] gl: bool, #[case] size: usize, #[case] offsets: [usize; 4]) {
    let device = if gl { gl_device().1 } else { dx_device() };
    let mut uniforms = UniformBuffer::new(&device, globals_layout()).unwrap();
    assert_eq!(
        uniforms.packing(),
        if gl { Packing::Std140 } else { Packing::Packed }
    );
    assert_eq!(uniforms.data().len(), size);

    uniforms.set_float("u_time", 1.5).unwrap();
    uniforms.set_vec2("u_offset", Vec2::new(2.0, 3.0)).unwrap();
    uniforms.set_vec4("u_tint", Vec4::ONE).unwrap();
    uniforms.set_mat4("u_transform", Mat4::IDENTITY).unwrap();

    let data = uniforms.data();
    let float_at = |offset: usize| f32::from_le_bytes(data[offset..offset + 4].try_into().unwrap());
    assert_eq!(float_at(offsets[0]), 1.5);
    assert_eq!(float_at(offsets[1] + 4), 3.0);
    assert_eq!(float_at(offsets[2] + 12), 1.0);
    // Column-major identity: element [1][1] is the sixth float
    assert_eq!(float_at(offsets[3] + 5 * 4), 1.0);
    assert!(uniforms.is_dirty());
    uniforms.upload().unwrap();
    assert!(!uniforms.is_dirty());
}

#[test]
fn test_uniform_setters_check_shape() {
    let (_concrete, device, _probe) = gl_device();
    let mut uniforms = UniformBuffer::new(&device, globals_layout()).unwrap();

    assert!(matches!(
        uniforms.set_float("u_offset", 1.0),
        Err(GraphicsError::InvalidParameter(_))
    ));
    assert!(matches!(
        uniforms.set_int("u_time", 1),
        Err(GraphicsError::InvalidParameter(_))
    ));
    assert!(matches!(
        uniforms.set_float("u_missing", 1.0),
        Err(GraphicsError::InvalidParameter(_))
    ));
    assert!(matches!(
        uniforms.set_bytes("u_offset", &[0; 12]),
        Err(GraphicsError::BufferOverflow {
            capacity: 8,
            requested: 12
        })
    ));
    assert!(!uniforms.is_dirty());

    uniforms.set_bytes("u_offset", &[0; 4]).unwrap();
    assert!(uniforms.is_dirty());
}

#[test]
fn test_uniform_upload_only_when_dirty() {
    let (_concrete, device, probe) = gl_device();
    let mut uniforms = UniformBuffer::new(&device, globals_layout()).unwrap();
    let uploads = |probe: &Rc<RefCell<GlProbe>>| {
        probe
            .borrow()
            .count(|c| matches!(c, GlCall::BufferSubData { len: 112, .. }))
    };

    uniforms.upload().unwrap();
    assert_eq!(uploads(&probe), 0);

    uniforms.set_float("u_time", 0.5).unwrap();
    uniforms.upload().unwrap();
    uniforms.upload().unwrap();
    assert_eq!(uploads(&probe), 1);

    uniforms.bind(0).unwrap();
    assert_eq!(
        probe.borrow().calls.last(),
        Some(&GlCall::BindBufferBase {
            target: glow::UNIFORM_BUFFER,
            index: 0,
            buffer: Some(uniforms_name(&probe)),
        })
    );
}

/// The only uniform buffer created in [`test_uniform_upload_only_when_dirty`]
fn uniforms_name(probe: &Rc<RefCell<GlProbe>>) -> u32 {
    probe
        .borrow()
        .calls
        .iter()
        .find_map(|c| match c {
            GlCall::BindBuffer {
                target: glow::COPY_WRITE_BUFFER,
                buffer: Some(name),
            } => Some(*name),
            _ => None,
        })
        .unwrap()
}
