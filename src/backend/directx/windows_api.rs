//! [`D3d11Api`] over the `windows` crate

use super::api::{D3d11Api, D3dBufferDesc, D3dSamplerDesc, D3dTextureDesc, SubresourceData};
use super::conversion::{DxgiFormat, InputElementDesc};
use crate::backend::traits::{GraphicsError, GraphicsResult};
use crate::backend::types::ShaderStage;
use std::ffi::{c_void, CString};
use windows::core::{s, PCSTR};
use windows::Win32::Foundation::{BOOL, HMODULE, HWND};
use windows::Win32::Graphics::Direct3D::Fxc::D3DCompile;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

/// Texture with the view the pixel shader samples through
pub struct WindowsTexture {
    texture: ID3D11Texture2D,
    view: ID3D11ShaderResourceView,
}

/// Hardware Direct3D 11 device with a flip-model swap chain on one window
pub struct WindowsD3d11 {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain,
}

impl WindowsD3d11 {
    /// `minor_version` 1 requests feature level 11.1 with 11.0 as fallback.
    pub fn new(hwnd: isize, width: u32, height: u32, minor_version: u32) -> GraphicsResult<Self> {
        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: width,
                Height: height,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 2,
            OutputWindow: HWND(hwnd as *mut c_void),
            Windowed: BOOL::from(true),
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            Flags: 0,
        };
        let feature_levels: &[D3D_FEATURE_LEVEL] = if minor_version >= 1 {
            &[D3D_FEATURE_LEVEL_11_1, D3D_FEATURE_LEVEL_11_0]
        } else {
            &[D3D_FEATURE_LEVEL_11_0]
        };

        let mut swap_chain = None;
        let mut device = None;
        let mut context = None;
        unsafe {
            D3D11CreateDeviceAndSwapChain(
                None::<&IDXGIAdapter>,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_FLAG::default(),
                Some(feature_levels),
                D3D11_SDK_VERSION,
                Some(&swap_chain_desc),
                Some(&mut swap_chain),
                Some(&mut device),
                None,
                Some(&mut context),
            )
        }
        .map_err(|e| GraphicsError::InitializationFailed(format!("D3D11CreateDeviceAndSwapChain: {e}")))?;

        match (device, context, swap_chain) {
            (Some(device), Some(context), Some(swap_chain)) => Ok(Self {
                device,
                context,
                swap_chain,
            }),
            _ => Err(GraphicsError::InitializationFailed(
                "D3D11CreateDeviceAndSwapChain returned no device".into(),
            )),
        }
    }
}

fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    // SAFETY: the blob owns GetBufferSize() bytes at GetBufferPointer() for
    // as long as it is alive.
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

fn created<T>(result: windows::core::Result<()>, object: Option<T>, what: &str) -> Result<T, String> {
    result.map_err(|e| format!("{what}: {e}"))?;
    object.ok_or_else(|| format!("{what} returned nothing"))
}

// SAFETY (all blocks below): plain D3D11 calls on objects owned by this
// device; pointers passed in outlive the call.
impl D3d11Api for WindowsD3d11 {
    type Buffer = ID3D11Buffer;
    type SamplerState = ID3D11SamplerState;
    type VertexShader = ID3D11VertexShader;
    type PixelShader = ID3D11PixelShader;
    type InputLayout = ID3D11InputLayout;
    type Texture = WindowsTexture;
    type RenderTargetView = ID3D11RenderTargetView;

    fn feature_level(&self) -> (u32, u32) {
        let level = unsafe { self.device.GetFeatureLevel() }.0 as u32;
        (level >> 12, (level >> 8) & 0xF)
    }

    fn create_buffer(&mut self, desc: &D3dBufferDesc, initial: Option<&[u8]>) -> Result<ID3D11Buffer, String> {
        let d3d_desc = D3D11_BUFFER_DESC {
            ByteWidth: desc.byte_width,
            Usage: D3D11_USAGE(desc.usage as i32),
            BindFlags: desc.bind_flags,
            CPUAccessFlags: desc.cpu_access_flags,
            ..Default::default()
        };
        let data = initial.map(|bytes| D3D11_SUBRESOURCE_DATA {
            pSysMem: bytes.as_ptr() as *const c_void,
            ..Default::default()
        });
        let mut buffer = None;
        let result = unsafe {
            self.device.CreateBuffer(
                &d3d_desc,
                data.as_ref().map(|d| d as *const _),
                Some(&mut buffer),
            )
        };
        created(result, buffer, "CreateBuffer")
    }

    fn write_buffer(&mut self, buffer: &ID3D11Buffer, data: &[u8]) -> Result<(), String> {
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.context
                .Map(buffer, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))
                .map_err(|e| format!("Map: {e}"))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.pData as *mut u8, data.len());
            self.context.Unmap(buffer, 0);
        }
        Ok(())
    }

    fn create_sampler_state(&mut self, desc: &D3dSamplerDesc) -> Result<ID3D11SamplerState, String> {
        let d3d_desc = D3D11_SAMPLER_DESC {
            Filter: D3D11_FILTER(desc.filter as i32),
            AddressU: D3D11_TEXTURE_ADDRESS_MODE(desc.address_u as i32),
            AddressV: D3D11_TEXTURE_ADDRESS_MODE(desc.address_v as i32),
            AddressW: D3D11_TEXTURE_ADDRESS_MODE(desc.address_w as i32),
            MipLODBias: 0.0,
            MaxAnisotropy: desc.max_anisotropy,
            ComparisonFunc: D3D11_COMPARISON_FUNC(desc.comparison_func as i32),
            BorderColor: desc.border_color,
            MinLOD: desc.min_lod,
            MaxLOD: desc.max_lod,
        };
        let mut state = None;
        let result = unsafe { self.device.CreateSamplerState(&d3d_desc, Some(&mut state)) };
        created(result, state, "CreateSamplerState")
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Vec<u8>, String> {
        let target = match stage {
            ShaderStage::Vertex => s!("vs_5_0"),
            ShaderStage::Fragment => s!("ps_5_0"),
        };
        let mut code = None;
        let mut errors = None;
        let result = unsafe {
            D3DCompile(
                source.as_ptr() as *const c_void,
                source.len(),
                PCSTR::null(),
                None,
                None::<&ID3DInclude>,
                s!("main"),
                target,
                0,
                0,
                &mut code,
                Some(&mut errors as *mut _),
            )
        };
        match (result, code) {
            (Ok(()), Some(code)) => Ok(blob_bytes(&code).to_vec()),
            (result, _) => {
                let log = errors
                    .map(|blob| String::from_utf8_lossy(blob_bytes(&blob)).into_owned())
                    .unwrap_or_else(|| format!("{:?}", result.err()));
                Err(log)
            }
        }
    }

    fn create_vertex_shader(&mut self, bytecode: &[u8]) -> Result<ID3D11VertexShader, String> {
        let mut shader = None;
        let result = unsafe { self.device.CreateVertexShader(bytecode, None::<&ID3D11ClassLinkage>, Some(&mut shader)) };
        created(result, shader, "CreateVertexShader")
    }

    fn create_pixel_shader(&mut self, bytecode: &[u8]) -> Result<ID3D11PixelShader, String> {
        let mut shader = None;
        let result = unsafe { self.device.CreatePixelShader(bytecode, None::<&ID3D11ClassLinkage>, Some(&mut shader)) };
        created(result, shader, "CreatePixelShader")
    }

    fn create_input_layout(
        &mut self,
        elements: &[InputElementDesc],
        vertex_bytecode: &[u8],
    ) -> Result<ID3D11InputLayout, String> {
        let names = elements
            .iter()
            .map(|e| CString::new(e.semantic_name.as_str()).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        let descs = elements
            .iter()
            .zip(&names)
            .map(|(e, name)| D3D11_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(name.as_ptr() as *const u8),
                SemanticIndex: e.semantic_index,
                Format: DXGI_FORMAT(e.format as i32),
                InputSlot: 0,
                AlignedByteOffset: e.aligned_byte_offset,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect::<Vec<_>>();

        let mut layout = None;
        let result = unsafe {
            self.device
                .CreateInputLayout(&descs, vertex_bytecode, Some(&mut layout))
        };
        created(result, layout, "CreateInputLayout")
    }

    fn create_texture_2d(
        &mut self,
        desc: &D3dTextureDesc,
        initial: Option<SubresourceData>,
    ) -> Result<WindowsTexture, String> {
        let d3d_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.width,
            Height: desc.height,
            MipLevels: desc.mip_levels,
            ArraySize: 1,
            Format: DXGI_FORMAT(desc.format as i32),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE(desc.usage as i32),
            BindFlags: desc.bind_flags,
            CPUAccessFlags: 0,
            MiscFlags: desc.misc_flags,
        };
        let data = initial.map(|init| D3D11_SUBRESOURCE_DATA {
            pSysMem: init.data.as_ptr() as *const c_void,
            SysMemPitch: init.row_pitch,
            SysMemSlicePitch: 0,
        });

        let mut texture = None;
        let result = unsafe {
            self.device.CreateTexture2D(
                &d3d_desc,
                data.as_ref().map(|d| d as *const _),
                Some(&mut texture),
            )
        };
        let texture = created(result, texture, "CreateTexture2D")?;

        let mut view = None;
        let result = unsafe { self.device.CreateShaderResourceView(&texture, None, Some(&mut view)) };
        let view = created(result, view, "CreateShaderResourceView")?;
        Ok(WindowsTexture { texture, view })
    }

    fn update_texture_2d(&mut self, texture: &WindowsTexture, data: SubresourceData) {
        unsafe {
            self.context.UpdateSubresource(
                &texture.texture,
                0,
                None,
                data.data.as_ptr() as *const c_void,
                data.row_pitch,
                0,
            )
        }
    }

    fn generate_mips(&mut self, texture: &WindowsTexture) {
        unsafe { self.context.GenerateMips(&texture.view) }
    }

    fn set_vertex_buffer(&mut self, buffer: Option<&ID3D11Buffer>, stride: u32) {
        let buffers = [buffer.cloned()];
        let strides = [stride];
        let offsets = [0u32];
        unsafe {
            self.context.IASetVertexBuffers(
                0,
                1,
                Some(buffers.as_ptr()),
                Some(strides.as_ptr()),
                Some(offsets.as_ptr()),
            )
        }
    }

    fn set_index_buffer(&mut self, buffer: Option<&ID3D11Buffer>, format: DxgiFormat) {
        let format = DXGI_FORMAT(format as i32);
        unsafe { self.context.IASetIndexBuffer(buffer, format, 0) }
    }

    fn set_input_layout(&mut self, layout: Option<&ID3D11InputLayout>) {
        unsafe { self.context.IASetInputLayout(layout) }
    }

    fn set_primitive_topology(&mut self, topology: u32) {
        unsafe {
            self.context
                .IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY(topology as i32))
        }
    }

    fn set_shaders(&mut self, vertex: Option<&ID3D11VertexShader>, pixel: Option<&ID3D11PixelShader>) {
        unsafe {
            self.context.VSSetShader(vertex, None);
            self.context.PSSetShader(pixel, None);
        }
    }

    fn set_constant_buffer(&mut self, slot: u32, buffer: Option<&ID3D11Buffer>) {
        let buffers = [buffer.cloned()];
        unsafe {
            self.context.VSSetConstantBuffers(slot, Some(&buffers));
            self.context.PSSetConstantBuffers(slot, Some(&buffers));
        }
    }

    fn set_texture(&mut self, slot: u32, texture: Option<&WindowsTexture>) {
        let views = [texture.map(|t| t.view.clone())];
        unsafe { self.context.PSSetShaderResources(slot, Some(&views)) }
    }

    fn set_sampler(&mut self, slot: u32, sampler: Option<&ID3D11SamplerState>) {
        let samplers = [sampler.cloned()];
        unsafe { self.context.PSSetSamplers(slot, Some(&samplers)) }
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        unsafe { self.context.Draw(vertex_count, start_vertex) }
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32) {
        unsafe { self.context.DrawIndexed(index_count, start_index, 0) }
    }

    fn create_backbuffer_view(&mut self) -> Result<ID3D11RenderTargetView, String> {
        let backbuffer: ID3D11Texture2D =
            unsafe { self.swap_chain.GetBuffer(0) }.map_err(|e| format!("GetBuffer: {e}"))?;
        let mut view = None;
        let result = unsafe {
            self.device
                .CreateRenderTargetView(&backbuffer, None, Some(&mut view))
        };
        created(result, view, "CreateRenderTargetView")
    }

    fn set_render_target(&mut self, view: Option<&ID3D11RenderTargetView>) {
        let views = view.map(|view| [Some(view.clone())]);
        unsafe {
            self.context
                .OMSetRenderTargets(views.as_ref().map(|v| v.as_slice()), None::<&ID3D11DepthStencilView>)
        }
    }

    fn clear_render_target(&mut self, view: &ID3D11RenderTargetView, color: [f32; 4]) {
        unsafe { self.context.ClearRenderTargetView(view, &color) }
    }

    fn set_viewport(&mut self, width: f32, height: f32) {
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width,
            Height: height,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe { self.context.RSSetViewports(Some(&[viewport])) }
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), String> {
        unsafe {
            self.swap_chain
                .ResizeBuffers(0, width, height, DXGI_FORMAT_UNKNOWN, DXGI_SWAP_CHAIN_FLAG(0))
        }
        .map_err(|e| format!("ResizeBuffers: {e}"))
    }

    fn present(&mut self, sync_interval: u32) -> Result<(), String> {
        unsafe { self.swap_chain.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .map_err(|e| format!("Present: {e}"))
    }
}

impl Drop for WindowsD3d11 {
    fn drop(&mut self) {
        unsafe { self.context.ClearState() };
        log::trace!("Releasing D3D11 device");
    }
}
