use crate::diagnostics;
use crate::driver::{Driver, InstanceDesc};
use crate::surface::SurfaceProvider;
use crate::system_info::SystemInfo;
use crate::version::Version;
use ash::vk;
use std::ffi::{CStr, CString};

pub const DEBUG_UTILS_EXT_NAME: &CStr = ash::ext::debug_utils::NAME;

#[derive(Debug)]
pub struct InstanceBuilder {
    // VkApplicationInfo
    app_name: CString,
    engine_name: CString,
    application_version: Version,
    engine_version: Version,
    api_version: Version,

    // VkInstanceCreateInfo
    layers: Vec<CString>,
    extensions: Vec<CString>,
    flags: vk::InstanceCreateFlags,

    enable_diagnostics: bool,
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceBuilder {
    pub fn new() -> Self {
        Self {
            app_name: CString::default(),
            engine_name: CString::default(),
            application_version: Version::new(0, 0, 0),
            engine_version: Version::new(0, 0, 0),
            api_version: Version::V1_0_0,
            layers: vec![],
            extensions: vec![],
            flags: vk::InstanceCreateFlags::empty(),
            enable_diagnostics: false,
        }
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
        self.application_version = version;
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

    /// Layers enabled only when diagnostics are on.
    pub fn validation_layers(mut self, layers: &[CString]) -> Self {
        self.layers.extend_from_slice(layers);
        self
    }

    pub fn enable_extension(mut self, extension: &CStr) -> Self {
        self.extensions.push(extension.to_owned());
        self
    }

    pub fn enable_diagnostics(mut self, enable: bool) -> Self {
        self.enable_diagnostics = enable;
        self
    }

    /// Checks layer and extension availability, then creates the instance.
    ///
    /// With diagnostics on, the validation layers and `VK_EXT_debug_utils` are
    /// enabled and a messenger descriptor is chained into the create call.
    #[tracing::instrument(skip_all)]
    pub fn build<D: Driver>(
        self,
        driver: &mut D,
        window: &dyn SurfaceProvider,
    ) -> crate::Result<vk::Instance> {
        let system_info = SystemInfo::query(driver)?;

        let mut enabled_layers: Vec<CString> = vec![];
        if self.enable_diagnostics {
            let missing = system_info.missing_layers(&self.layers);
            if !missing.is_empty() {
                return Err(crate::InstanceError::ValidationLayersUnavailable(missing).into());
            }
            enabled_layers.extend_from_slice(&self.layers);
        }

        let mut enabled_extensions = driver.surface_extensions(window)?;
        for extension in &self.extensions {
            if !enabled_extensions.contains(extension) {
                enabled_extensions.push(extension.clone());
            }
        }

        if self.enable_diagnostics
            && !enabled_extensions.iter().any(|e| e.as_c_str() == DEBUG_UTILS_EXT_NAME)
        {
            enabled_extensions.push(DEBUG_UTILS_EXT_NAME.to_owned());
        }

        let portability = cfg!(feature = "portability")
            && system_info.is_extension_available(ash::khr::portability_enumeration::NAME);
        if portability {
            enabled_extensions.push(ash::khr::portability_enumeration::NAME.to_owned());
        }

        tracing::trace!(?enabled_extensions, ?enabled_layers);

        let missing = system_info.missing_extensions(&enabled_extensions);
        if !missing.is_empty() {
            return Err(crate::InstanceError::RequestedExtensionsNotPresent(missing).into());
        }

        let flags = if portability {
            self.flags | vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            self.flags
        };

        tracing::debug!(
            app_name = ?self.app_name,
            app_version = %self.application_version,
            engine_name = ?self.engine_name,
            engine_version = %self.engine_version,
            api_version = %self.api_version,
            "Creating vkInstance with application info..."
        );

        let desc = InstanceDesc {
            app_name: self.app_name,
            app_version: self.application_version.raw(),
            engine_name: self.engine_name,
            engine_version: self.engine_version.raw(),
            api_version: self.api_version.raw(),
            flags,
            layers: enabled_layers,
            extensions: enabled_extensions,
            debug_messenger: self.enable_diagnostics.then(diagnostics::messenger_desc),
        };

        let instance = driver
            .create_instance(&desc)
            .map_err(crate::InstanceError::FailedCreateInstance)?;

        tracing::info!("Created vkInstance");
        Ok(instance)
    }
}
