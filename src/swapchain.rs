use crate::device::{Device, PhysicalDevice};
use crate::driver::{Driver, SwapchainDesc};
use ash::vk;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq)]
enum Priority {
    Main,
    Fallback,
}

#[derive(Debug, Clone, Copy)]
struct Format {
    inner: vk::SurfaceFormatKHR,
    priority: Priority,
}

#[derive(Debug, Clone, Copy)]
struct PresentMode {
    inner: vk::PresentModeKHR,
    priority: Priority,
}

/// What a surface offers on one physical device.
#[derive(Debug, Clone)]
pub struct SurfaceSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

pub fn query_surface_support_details<D: Driver>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> crate::Result<SurfaceSupportDetails> {
    let capabilities = driver
        .surface_capabilities(physical_device, surface)
        .map_err(crate::SwapchainError::FailedQuerySurfaceSupportDetails)?;
    let formats = driver
        .surface_formats(physical_device, surface)
        .map_err(crate::SwapchainError::FailedQuerySurfaceSupportDetails)?;
    let present_modes = driver
        .present_modes(physical_device, surface)
        .map_err(crate::SwapchainError::FailedQuerySurfaceSupportDetails)?;

    Ok(SurfaceSupportDetails {
        capabilities,
        formats,
        present_modes,
    })
}

fn default_formats() -> Vec<Format> {
    vec![
        Format {
            inner: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            priority: Priority::Main,
        },
    ]
}

fn default_present_modes() -> Vec<PresentMode> {
    vec![
        PresentMode {
            inner: vk::PresentModeKHR::MAILBOX,
            priority: Priority::Main,
        },
        PresentMode {
            inner: vk::PresentModeKHR::FIFO,
            priority: Priority::Fallback,
        },
    ]
}

fn find_desired_surface_format(
    available: &[vk::SurfaceFormatKHR],
    desired: &mut [Format],
) -> Option<vk::SurfaceFormatKHR> {
    desired.sort_by_key(|f| f.priority);
    desired.iter().map(|d| d.inner).find(|d| {
        available
            .iter()
            .any(|a| a.format == d.format && a.color_space == d.color_space)
    })
}

/// The best desired format the surface offers, else the first one it reports.
fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    desired: &mut [Format],
) -> crate::Result<vk::SurfaceFormatKHR> {
    let first = available
        .first()
        .copied()
        .ok_or(crate::SwapchainError::NoSurfaceFormats)?;
    Ok(find_desired_surface_format(available, desired).unwrap_or(first))
}

/// FIFO is the only mode every implementation must support.
fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    desired: &mut [PresentMode],
) -> vk::PresentModeKHR {
    desired.sort_by_key(|m| m.priority);
    desired
        .iter()
        .map(|d| d.inner)
        .find(|d| available.contains(d))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// A current width of `u32::MAX` means the surface takes its size from the
/// swapchain, in which case the framebuffer size is clamped into the allowed
/// range.
pub fn choose_swap_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: framebuffer.width.clamp(min.width, max.width),
        height: framebuffer.height.clamp(min.height, max.height),
    }
}

/// `requested` of 0 asks for one image more than the minimum. A
/// `max_image_count` of 0 means there is no upper bound.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, requested: u32) -> u32 {
    let mut image_count = if requested == 0 {
        capabilities.min_image_count + 1
    } else {
        requested.max(capabilities.min_image_count)
    };

    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        image_count = capabilities.max_image_count;
    }

    image_count
}

pub fn choose_composite_alpha(
    supported: vk::CompositeAlphaFlagsKHR,
) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|flag| supported.contains(*flag))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

pub struct SwapchainBuilder<'a> {
    physical_device: &'a PhysicalDevice,
    device: &'a Device,
    surface: vk::SurfaceKHR,
    desired_formats: Vec<Format>,
    desired_present_modes: Vec<PresentMode>,
    framebuffer_extent: vk::Extent2D,
    min_image_count: u32,
    image_usage_flags: vk::ImageUsageFlags,
    clipped: bool,
}

impl<'a> SwapchainBuilder<'a> {
    pub fn new(
        physical_device: &'a PhysicalDevice,
        device: &'a Device,
        surface: vk::SurfaceKHR,
    ) -> Self {
        Self {
            physical_device,
            device,
            surface,
            desired_formats: Vec::with_capacity(4),
            desired_present_modes: Vec::with_capacity(4),
            framebuffer_extent: vk::Extent2D::default(),
            min_image_count: 0,
            image_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            clipped: true,
        }
    }

    pub fn desired_format(mut self, format: vk::SurfaceFormatKHR) -> Self {
        self.desired_formats.push(Format {
            inner: format,
            priority: Priority::Main,
        });
        self
    }

    pub fn fallback_format(mut self, format: vk::SurfaceFormatKHR) -> Self {
        self.desired_formats.push(Format {
            inner: format,
            priority: Priority::Fallback,
        });
        self
    }

    pub fn desired_present_mode(mut self, present_mode: vk::PresentModeKHR) -> Self {
        self.desired_present_modes.push(PresentMode {
            inner: present_mode,
            priority: Priority::Main,
        });
        self
    }

    pub fn fallback_present_mode(mut self, present_mode: vk::PresentModeKHR) -> Self {
        self.desired_present_modes.push(PresentMode {
            inner: present_mode,
            priority: Priority::Fallback,
        });
        self
    }

    /// Pixel size of the window's framebuffer, used when the surface lets the
    /// swapchain pick its extent.
    pub fn framebuffer_extent(mut self, extent: vk::Extent2D) -> Self {
        self.framebuffer_extent = extent;
        self
    }

    /// The presentation engine may still hand out more images than this.
    pub fn desired_min_image_count(mut self, min_image_count: u32) -> Self {
        self.min_image_count = min_image_count;
        self
    }

    pub fn image_usage_flags(mut self, flags: vk::ImageUsageFlags) -> Self {
        self.image_usage_flags = flags;
        self
    }

    pub fn clipped(mut self, clipped: bool) -> Self {
        self.clipped = clipped;
        self
    }

    #[tracing::instrument(skip_all)]
    pub fn build<D: Driver>(mut self, driver: &mut D) -> crate::Result<Swapchain> {
        if self.desired_formats.is_empty() {
            self.desired_formats = default_formats();
        }
        if self.desired_present_modes.is_empty() {
            self.desired_present_modes = default_present_modes();
        }

        // Capabilities may have changed since device selection.
        let support =
            query_surface_support_details(driver, self.physical_device.handle(), self.surface)?;
        let capabilities = &support.capabilities;

        let surface_format = choose_surface_format(&support.formats, &mut self.desired_formats)?;
        let present_mode =
            choose_present_mode(&support.present_modes, &mut self.desired_present_modes);
        let extent = choose_swap_extent(capabilities, self.framebuffer_extent);
        let image_count = choose_image_count(capabilities, self.min_image_count);

        let indices = self.device.queue_family_indices;
        let graphics_family = indices.graphics()?;
        let present_family = indices.present()?;
        let (sharing_mode, queue_family_indices) = if graphics_family != present_family {
            (
                vk::SharingMode::CONCURRENT,
                vec![graphics_family, present_family],
            )
        } else {
            (vk::SharingMode::EXCLUSIVE, vec![])
        };

        tracing::debug!(
            ?surface_format,
            ?present_mode,
            ?extent,
            image_count,
            ?sharing_mode,
            "Negotiated swapchain parameters"
        );

        let desc = SwapchainDesc {
            surface: self.surface,
            min_image_count: image_count,
            surface_format,
            extent,
            image_array_layers: 1,
            image_usage: self.image_usage_flags,
            sharing_mode,
            queue_family_indices,
            pre_transform: capabilities.current_transform,
            composite_alpha: choose_composite_alpha(capabilities.supported_composite_alpha),
            present_mode,
            clipped: self.clipped,
        };

        let swapchain = driver
            .create_swapchain(&desc)
            .map_err(crate::SwapchainError::FailedCreateSwapchain)?;

        let images = match driver.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(err) => {
                driver.destroy_swapchain(swapchain);
                return Err(crate::SwapchainError::FailedGetSwapchainImages(err).into());
            }
        };

        tracing::info!(images = images.len(), "Created vkSwapchainKHR");

        Ok(Swapchain {
            swapchain,
            images,
            surface_format,
            extent,
            present_mode,
            requested_min_image_count: image_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swapchain {
    pub(crate) swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub surface_format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub requested_min_image_count: u32,
}

impl Swapchain {
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn image_format(&self) -> vk::Format {
        self.surface_format.format
    }
}
