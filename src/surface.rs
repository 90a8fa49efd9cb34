use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// The windowing layer as seen by the bootstrap sequence.
///
/// The native handles are used to pick the window-system instance extensions
/// and to create the `VkSurfaceKHR`. The framebuffer size is read once, when
/// the surface leaves the swapchain extent up to the application.
pub trait SurfaceProvider: HasDisplayHandle + HasWindowHandle {
    /// Current drawable size in pixels.
    fn framebuffer_size(&self) -> vk::Extent2D;
}
