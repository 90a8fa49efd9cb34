use crate::driver::{DeviceDesc, Driver};
use crate::swapchain::{SurfaceSupportDetails, query_surface_support_details};
use ash::vk;
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};

/// Queue families resolved for the two roles the bootstrap needs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    pub fn graphics(&self) -> Result<u32, crate::QueueError> {
        self.graphics_family
            .ok_or(crate::QueueError::GraphicsUnavailable)
    }

    pub fn present(&self) -> Result<u32, crate::QueueError> {
        self.present_family
            .ok_or(crate::QueueError::PresentUnavailable)
    }

    /// Distinct families, ascending. One entry when both roles share a family.
    pub fn unique(&self) -> Vec<u32> {
        [self.graphics_family, self.present_family]
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Walks the queue families in index order, taking the first family with
/// graphics support and, independently, the first one that can present to
/// `surface`.
pub fn find_queue_families<D: Driver>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in (0u32..).zip(driver.queue_families(physical_device)) {
        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(index);
        }

        if indices.present_family.is_none() {
            match driver.surface_support(physical_device, index, surface) {
                Ok(true) => indices.present_family = Some(index),
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(index, %err, "Surface support query failed for queue family")
                }
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsuitable {
    IncompleteQueueFamilies(QueueFamilyIndices),
    MissingExtensions(Vec<String>),
    InadequateSurfaceSupport,
    /// A capability query the checks depend on returned an error.
    QueryFailed(vk::Result),
}

/// Capability snapshot of the selected GPU.
#[derive(Debug, Clone)]
pub struct PhysicalDevice {
    pub(crate) physical_device: vk::PhysicalDevice,
    pub name: String,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub queue_family_indices: QueueFamilyIndices,
    pub available_extensions: Vec<CString>,
    pub extensions_to_enable: Vec<CString>,
    pub surface_support: SurfaceSupportDetails,
}

impl PhysicalDevice {
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn is_extension_present(&self, extension: &CStr) -> bool {
        self.available_extensions
            .iter()
            .any(|e| e.as_c_str() == extension)
    }
}

pub struct PhysicalDeviceSelector {
    surface: vk::SurfaceKHR,
    required_extensions: Vec<CString>,
}

impl PhysicalDeviceSelector {
    pub fn new(surface: vk::SurfaceKHR) -> Self {
        Self {
            surface,
            required_extensions: vec![],
        }
    }

    pub fn add_required_extension(mut self, extension: &CStr) -> Self {
        self.required_extensions.push(extension.to_owned());
        self
    }

    pub fn add_required_extensions(mut self, extensions: &[CString]) -> Self {
        self.required_extensions.extend_from_slice(extensions);
        self
    }

    /// Cheapest checks first: queue families, then extensions, and only when
    /// the swapchain extension is there, the surface formats and present modes.
    fn evaluate<D: Driver>(
        &self,
        driver: &D,
        physical_device: vk::PhysicalDevice,
    ) -> Result<PhysicalDevice, Unsuitable> {
        let indices = find_queue_families(driver, physical_device, self.surface);
        if !indices.is_complete() {
            return Err(Unsuitable::IncompleteQueueFamilies(indices));
        }

        let available_extensions = driver
            .device_extensions(physical_device)
            .map_err(Unsuitable::QueryFailed)?;
        let missing: Vec<String> = self
            .required_extensions
            .iter()
            .filter(|required| !available_extensions.contains(required))
            .map(|required| required.to_string_lossy().into_owned())
            .collect();
        if !missing.is_empty() {
            return Err(Unsuitable::MissingExtensions(missing));
        }

        let surface_support = query_surface_support_details(driver, physical_device, self.surface)
            .map_err(|err| match err {
                crate::Error::Swapchain(crate::SwapchainError::FailedQuerySurfaceSupportDetails(
                    result,
                )) => Unsuitable::QueryFailed(result),
                _ => Unsuitable::InadequateSurfaceSupport,
            })?;
        if surface_support.formats.is_empty() || surface_support.present_modes.is_empty() {
            return Err(Unsuitable::InadequateSurfaceSupport);
        }

        let mut extensions_to_enable = self.required_extensions.clone();
        let portability_subset = ash::khr::portability_subset::NAME;
        if cfg!(feature = "portability")
            && available_extensions
                .iter()
                .any(|e| e.as_c_str() == portability_subset)
        {
            extensions_to_enable.push(portability_subset.to_owned());
        }

        Ok(PhysicalDevice {
            physical_device,
            name: driver.device_name(physical_device),
            queue_families: driver.queue_families(physical_device),
            queue_family_indices: indices,
            available_extensions,
            extensions_to_enable,
            surface_support,
        })
    }

    /// Returns the first suitable device in enumeration order. A device whose
    /// capability queries fail is skipped like any other unsuitable one.
    #[tracing::instrument(skip_all)]
    pub fn select<D: Driver>(self, driver: &D) -> crate::Result<PhysicalDevice> {
        let physical_devices = driver
            .physical_devices()
            .map_err(crate::PhysicalDeviceError::FailedToEnumeratePhysicalDevices)?;
        if physical_devices.is_empty() {
            return Err(crate::PhysicalDeviceError::NoPhysicalDevicesFound.into());
        }

        for physical_device in physical_devices {
            match self.evaluate(driver, physical_device) {
                Ok(selected) => {
                    tracing::info!(
                        name = %selected.name,
                        queue_families = ?selected.queue_family_indices,
                        "Selected physical device"
                    );
                    return Ok(selected);
                }
                Err(reason) => {
                    tracing::debug!(
                        name = %driver.device_name(physical_device),
                        ?reason,
                        "Physical device is not suitable"
                    );
                }
            }
        }

        Err(crate::PhysicalDeviceError::NoSuitableDevice.into())
    }
}

/// The logical device and the queues fetched from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub(crate) device: vk::Device,
    pub queue_family_indices: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl Device {
    pub fn handle(&self) -> vk::Device {
        self.device
    }
}

pub struct DeviceBuilder<'a> {
    physical_device: &'a PhysicalDevice,
    validation_layers: Vec<CString>,
    enable_diagnostics: bool,
}

impl<'a> DeviceBuilder<'a> {
    pub fn new(physical_device: &'a PhysicalDevice) -> Self {
        Self {
            physical_device,
            validation_layers: vec![],
            enable_diagnostics: false,
        }
    }

    pub fn validation_layers(mut self, layers: &[CString]) -> Self {
        self.validation_layers.extend_from_slice(layers);
        self
    }

    pub fn enable_diagnostics(mut self, enable: bool) -> Self {
        self.enable_diagnostics = enable;
        self
    }

    #[tracing::instrument(skip_all)]
    pub fn build<D: Driver>(self, driver: &mut D) -> crate::Result<Device> {
        let indices = self.physical_device.queue_family_indices;
        let graphics_family = indices.graphics()?;
        let present_family = indices.present()?;

        let desc = DeviceDesc {
            queue_families: indices.unique(),
            queue_priority: 1.0,
            extensions: self.physical_device.extensions_to_enable.clone(),
            layers: if self.enable_diagnostics {
                self.validation_layers
            } else {
                vec![]
            },
        };
        tracing::debug!(queue_families = ?desc.queue_families, extensions = ?desc.extensions);

        let device = driver
            .create_device(self.physical_device.physical_device, &desc)
            .map_err(crate::DeviceError::FailedCreateDevice)?;
        tracing::info!("Created vkDevice");

        // Each role gets the queue of its own family, even when they differ.
        let graphics_queue = driver.device_queue(graphics_family, 0);
        let present_queue = driver.device_queue(present_family, 0);

        Ok(Device {
            device,
            queue_family_indices: indices,
            graphics_queue,
            present_queue,
        })
    }
}
