use crate::driver::Driver;
use std::ffi::{CStr, CString};

/// Snapshot of instance-level layers and extensions reported by the loader.
///
/// Taken fresh for every check; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub available_layers: Vec<CString>,
    pub available_extensions: Vec<CString>,
}

impl SystemInfo {
    #[tracing::instrument(skip_all)]
    pub fn query<D: Driver>(driver: &D) -> crate::Result<Self> {
        let available_layers = driver.instance_layers()?;
        let available_extensions = driver.instance_extensions()?;

        tracing::trace!(?available_layers, "available layers");
        tracing::trace!(?available_extensions, "available extensions");

        Ok(Self {
            available_layers,
            available_extensions,
        })
    }

    pub fn is_layer_available(&self, layer: &CStr) -> bool {
        self.available_layers.iter().any(|l| l.as_c_str() == layer)
    }

    pub fn is_extension_available(&self, extension: &CStr) -> bool {
        self.available_extensions
            .iter()
            .any(|e| e.as_c_str() == extension)
    }

    /// Names from `requested` that are not among the available layers.
    pub fn missing_layers(&self, requested: &[CString]) -> Vec<String> {
        requested
            .iter()
            .filter(|layer| !self.is_layer_available(layer))
            .map(|layer| layer.to_string_lossy().into_owned())
            .collect()
    }

    /// Names from `requested` that are not among the available extensions.
    pub fn missing_extensions(&self, requested: &[CString]) -> Vec<String> {
        requested
            .iter()
            .filter(|extension| !self.is_extension_available(extension))
            .map(|extension| extension.to_string_lossy().into_owned())
            .collect()
    }
}

/// True iff every requested layer name is reported by the loader.
pub fn check_layer_support<D: Driver>(driver: &D, requested: &[CString]) -> crate::Result<bool> {
    Ok(SystemInfo::query(driver)?
        .missing_layers(requested)
        .is_empty())
}
