use crate::version::Version;
use std::ffi::{CStr, CString};
use std::io::Cursor;
use std::path::PathBuf;

pub const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";
pub const DEFAULT_VERTEX_SHADER_PATH: &str = "shaders/vert.spv";
pub const DEFAULT_FRAGMENT_SHADER_PATH: &str = "shaders/frag.spv";

/// Where a SPIR-V blob comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ShaderSource {
    /// Reads the blob and decodes it into SPIR-V words.
    pub fn load(&self) -> crate::Result<Vec<u32>> {
        match self {
            ShaderSource::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| crate::Error::ShaderRead {
                    path: path.clone(),
                    source,
                })?;
                decode_spirv(&bytes)
            }
            ShaderSource::Bytes(bytes) => decode_spirv(bytes),
        }
    }
}

pub(crate) fn decode_spirv(bytes: &[u8]) -> crate::Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(crate::PipelineError::InvalidSpirv(bytes.len()).into());
    }
    ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|_| crate::PipelineError::InvalidSpirv(bytes.len()).into())
}

/// Inputs to [`crate::GraphicsContext::bootstrap`].
///
/// Every literal the bootstrap sequence needs lives here, so the sequence itself
/// has exactly one code path per configuration.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub app_name: CString,
    pub engine_name: CString,
    pub app_version: Version,
    pub engine_version: Version,
    pub api_version: Version,

    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,

    pub vertex_shader: ShaderSource,
    pub fragment_shader: ShaderSource,

    pub enable_diagnostics: bool,
    pub validation_layers: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    pub device_extensions: Vec<CString>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            app_name: c"Hello Triangle".to_owned(),
            engine_name: c"No Engine".to_owned(),
            app_version: Version::new(1, 0, 0),
            engine_version: Version::new(1, 0, 0),
            api_version: Version::V1_0_0,
            window_title: "Vulkan".to_string(),
            window_width: 800,
            window_height: 600,
            vertex_shader: ShaderSource::Path(DEFAULT_VERTEX_SHADER_PATH.into()),
            fragment_shader: ShaderSource::Path(DEFAULT_FRAGMENT_SHADER_PATH.into()),
            enable_diagnostics: cfg!(debug_assertions),
            validation_layers: vec![VALIDATION_LAYER_NAME.to_owned()],
            instance_extensions: vec![],
            device_extensions: vec![ash::khr::swapchain::NAME.to_owned()],
        }
    }
}

impl BootstrapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, app_name: &CStr) -> Self {
        self.app_name = app_name.to_owned();
        self
    }

    pub fn engine_name(mut self, engine_name: &CStr) -> Self {
        self.engine_name = engine_name.to_owned();
        self
    }

    pub fn app_version(mut self, version: Version) -> Self {
        self.app_version = version;
        self
    }

    pub fn engine_version(mut self, version: Version) -> Self {
        self.engine_version = version;
        self
    }

    pub fn api_version(mut self, version: Version) -> Self {
        self.api_version = version;
        self
    }

    pub fn window(mut self, title: impl Into<String>, width: u32, height: u32) -> Self {
        self.window_title = title.into();
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn vertex_shader(mut self, source: ShaderSource) -> Self {
        self.vertex_shader = source;
        self
    }

    pub fn fragment_shader(mut self, source: ShaderSource) -> Self {
        self.fragment_shader = source;
        self
    }

    pub fn enable_diagnostics(mut self, enable: bool) -> Self {
        self.enable_diagnostics = enable;
        self
    }

    pub fn validation_layer(mut self, layer: &CStr) -> Self {
        self.validation_layers.push(layer.to_owned());
        self
    }

    pub fn enable_instance_extension(mut self, extension: &CStr) -> Self {
        self.instance_extensions.push(extension.to_owned());
        self
    }

    pub fn require_device_extension(mut self, extension: &CStr) -> Self {
        self.device_extensions.push(extension.to_owned());
        self
    }
}
