//! Immediate-mode OpenGL 3.3 backend on glow.
//!
//! The backend owns the `glow::Context` but not the window surface: the
//! driver keeps the glutin context current and swaps buffers after a
//! rendered tick.

use glow::HasContext;
use panosphere_core::constants::{
    CHROMA_TEXTURE_UNIT, CLEAR_COLOR, LUMA_TEXTURE_UNIT, POSITION_LOCATION, TEX_COORD_LOCATION,
};
use panosphere_core::texture::{PlaneTextureDesc, TextureAllocator};
use panosphere_core::{
    DrawCall, FrameError, GpuBackend, IndexWidth, Plane, PlaneFormat, SetupError, ShaderAssets,
    ShaderStage, SphereGeometry, TextureError,
};

struct GlMesh {
    vao: glow::NativeVertexArray,
    buffers: [glow::NativeBuffer; 3],
}

struct GlProgram {
    program: glow::NativeProgram,
    mvp: Option<glow::NativeUniformLocation>,
    luma: Option<glow::NativeUniformLocation>,
    chroma: Option<glow::NativeUniformLocation>,
}

pub struct GlTexture(glow::NativeTexture);

pub struct GlBackend {
    gl: glow::Context,
    viewport: (i32, i32),
    max_texture_size: u32,
    mesh: Option<GlMesh>,
    program: Option<GlProgram>,
}

impl GlBackend {
    /// Wrap a context that is current on the calling thread.
    pub fn new(gl: glow::Context) -> Self {
        let max_texture_size = unsafe {
            let version = gl.get_parameter_string(glow::VERSION);
            log::info!("[gl] context {version}");
            gl.enable(glow::CULL_FACE);
            gl.cull_face(glow::BACK);
            // Seen from the centre the sphere's triangles wind clockwise.
            gl.front_face(glow::CW);
            gl.disable(glow::DEPTH_TEST);
            gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE).max(0) as u32
        };
        Self {
            gl,
            viewport: (1, 1),
            max_texture_size,
            mesh: None,
            program: None,
        }
    }

    fn clear_target(&self) {
        let [r, g, b, a] = CLEAR_COLOR;
        unsafe {
            self.gl.viewport(0, 0, self.viewport.0, self.viewport.1);
            self.gl.clear_color(r as f32, g as f32, b as f32, a as f32);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn check_error(&self) -> Result<(), FrameError> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => Ok(()),
            glow::OUT_OF_MEMORY => Err(FrameError::OutOfMemory),
            code => Err(FrameError::Backend(format!("GL error 0x{code:04x}"))),
        }
    }
}

unsafe fn compile_shader(
    gl: &glow::Context,
    kind: u32,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::NativeShader, SetupError> {
    let shader = gl.create_shader(kind).map_err(|e| SetupError::ShaderCompile {
        stage: stage.label(),
        log: e,
    })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(SetupError::ShaderCompile {
            stage: stage.label(),
            log,
        });
    }
    Ok(shader)
}

unsafe fn link_program(
    gl: &glow::Context,
    vertex: &str,
    fragment: &str,
) -> Result<glow::NativeProgram, SetupError> {
    let vs = compile_shader(gl, glow::VERTEX_SHADER, ShaderStage::Vertex, vertex)?;
    let fs = match compile_shader(gl, glow::FRAGMENT_SHADER, ShaderStage::Fragment, fragment) {
        Ok(fs) => fs,
        Err(e) => {
            gl.delete_shader(vs);
            return Err(e);
        }
    };
    let program = match gl.create_program() {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(SetupError::ProgramLink(e));
        }
    };
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.link_program(program);
    let linked = gl.get_program_link_status(program);
    let log = if linked {
        String::new()
    } else {
        gl.get_program_info_log(program)
    };
    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);
    if !linked {
        gl.delete_program(program);
        return Err(SetupError::ProgramLink(log));
    }
    Ok(program)
}

fn upload_error(label: &'static str) -> impl FnOnce(String) -> SetupError {
    move |reason| SetupError::BufferAllocation { label, reason }
}

fn gl_formats(format: PlaneFormat) -> (i32, u32) {
    match format {
        PlaneFormat::R8 => (glow::R8 as i32, glow::RED),
        PlaneFormat::Rg8 => (glow::RG8 as i32, glow::RG),
    }
}

/// GL expresses the row pitch in texels, so the stride has to divide evenly.
fn unpack_row_length(stride: usize, format: PlaneFormat) -> Option<i32> {
    let texel = format.bytes_per_texel();
    if stride % texel != 0 {
        return None;
    }
    i32::try_from(stride / texel).ok()
}

impl TextureAllocator for GlBackend {
    type Texture = GlTexture;

    fn allocate_texture(&mut self, desc: &PlaneTextureDesc) -> Result<GlTexture, TextureError> {
        if desc.width > self.max_texture_size || desc.height > self.max_texture_size {
            return Err(TextureError::Allocation {
                plane: desc.plane,
                reason: format!(
                    "{}x{} exceeds GL_MAX_TEXTURE_SIZE {}",
                    desc.width, desc.height, self.max_texture_size
                ),
            });
        }
        let (internal, format) = gl_formats(desc.format);
        unsafe {
            let tex = self
                .gl
                .create_texture()
                .map_err(|reason| TextureError::Allocation {
                    plane: desc.plane,
                    reason,
                })?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                desc.width as i32,
                desc.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                None,
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(GlTexture(tex))
        }
    }

    fn write_texture(
        &mut self,
        texture: &GlTexture,
        desc: &PlaneTextureDesc,
        plane: &Plane<'_>,
    ) -> Result<(), TextureError> {
        let row_length = unpack_row_length(plane.stride, desc.format).ok_or_else(|| {
            TextureError::Allocation {
                plane: desc.plane,
                reason: format!("stride {} is not a whole number of texels", plane.stride),
            }
        })?;
        let used = plane.stride * (desc.height as usize - 1) + desc.row_bytes();
        let (_, format) = gl_formats(desc.format);
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture.0));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl
                .pixel_store_i32(glow::UNPACK_ROW_LENGTH, row_length);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                desc.width as i32,
                desc.height as i32,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(&plane.data[..used]),
            );
            self.gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: GlTexture) {
        unsafe { self.gl.delete_texture(texture.0) };
    }
}

impl GpuBackend for GlBackend {
    fn name(&self) -> &'static str {
        "gl"
    }

    fn upload_mesh(&mut self, geometry: &SphereGeometry) -> Result<(), SetupError> {
        let gl = &self.gl;
        unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(upload_error("vertex array"))?;
            let positions = gl.create_buffer().map_err(upload_error("positions"))?;
            let tex_coords = gl.create_buffer().map_err(upload_error("tex coords"))?;
            let indices = gl.create_buffer().map_err(upload_error("indices"))?;

            gl.bind_vertex_array(Some(vao));

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(positions));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                geometry.positions_bytes(),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(POSITION_LOCATION);
            gl.vertex_attrib_pointer_f32(POSITION_LOCATION, 3, glow::FLOAT, false, 12, 0);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(tex_coords));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                geometry.tex_coords_bytes(),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(TEX_COORD_LOCATION);
            gl.vertex_attrib_pointer_f32(TEX_COORD_LOCATION, 2, glow::FLOAT, false, 8, 0);

            // The element binding is VAO state.
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(indices));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                geometry.indices.as_bytes(),
                glow::STATIC_DRAW,
            );

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            self.mesh = Some(GlMesh {
                vao,
                buffers: [positions, tex_coords, indices],
            });
        }
        log::debug!(
            "[gl] mesh uploaded: {} vertices, {} indices",
            geometry.vertex_count(),
            geometry.index_count()
        );
        Ok(())
    }

    fn build_program(&mut self, shaders: &dyn ShaderAssets) -> Result<(), SetupError> {
        let vertex = shaders.glsl(ShaderStage::Vertex)?;
        let fragment = shaders.glsl(ShaderStage::Fragment)?;
        let gl = &self.gl;
        unsafe {
            let program = link_program(gl, &vertex, &fragment)?;
            let luma = gl.get_uniform_location(program, "luma_tex");
            let chroma = gl.get_uniform_location(program, "chroma_tex");
            gl.use_program(Some(program));
            gl.uniform_1_i32(luma.as_ref(), LUMA_TEXTURE_UNIT as i32);
            gl.uniform_1_i32(chroma.as_ref(), CHROMA_TEXTURE_UNIT as i32);
            gl.use_program(None);
            self.program = Some(GlProgram {
                program,
                mvp: gl.get_uniform_location(program, "mvp"),
                luma,
                chroma,
            });
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width as i32, height as i32);
    }

    fn clear(&mut self) -> Result<(), FrameError> {
        self.clear_target();
        self.check_error()
    }

    fn draw(&mut self, call: DrawCall<'_, GlTexture>) -> Result<(), FrameError> {
        let (Some(mesh), Some(program)) = (&self.mesh, &self.program) else {
            return Err(FrameError::Backend("mesh or program missing".into()));
        };
        self.clear_target();
        let index_type = match call.index_width {
            IndexWidth::U16 => glow::UNSIGNED_SHORT,
            IndexWidth::U32 => glow::UNSIGNED_INT,
        };
        let gl = &self.gl;
        unsafe {
            gl.use_program(Some(program.program));
            gl.uniform_matrix_4_f32_slice(program.mvp.as_ref(), false, &call.mvp.to_cols_array());
            gl.uniform_1_i32(program.luma.as_ref(), LUMA_TEXTURE_UNIT as i32);
            gl.uniform_1_i32(program.chroma.as_ref(), CHROMA_TEXTURE_UNIT as i32);
            gl.active_texture(glow::TEXTURE0 + LUMA_TEXTURE_UNIT);
            gl.bind_texture(glow::TEXTURE_2D, Some(call.textures.luma.0));
            gl.active_texture(glow::TEXTURE0 + CHROMA_TEXTURE_UNIT);
            gl.bind_texture(glow::TEXTURE_2D, Some(call.textures.chroma.0));
            gl.bind_vertex_array(Some(mesh.vao));
            gl.draw_elements(glow::TRIANGLES, call.index_count as i32, index_type, 0);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
        self.check_error()
    }

    fn release_mesh(&mut self) {
        unsafe {
            if let Some(mesh) = self.mesh.take() {
                self.gl.delete_vertex_array(mesh.vao);
                for buffer in mesh.buffers {
                    self.gl.delete_buffer(buffer);
                }
            }
            if let Some(program) = self.program.take() {
                self.gl.delete_program(program.program);
            }
        }
    }
}
