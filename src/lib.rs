mod config;
mod context;
mod device;
mod diagnostics;
mod driver;
mod error;
mod framebuffer;
mod image_view;
mod instance;
mod pipeline;
mod render_pass;
mod surface;
mod swapchain;
mod system_info;
mod version;

pub use config::{
    BootstrapConfig, DEFAULT_FRAGMENT_SHADER_PATH, DEFAULT_VERTEX_SHADER_PATH, ShaderSource,
    VALIDATION_LAYER_NAME,
};
pub use context::GraphicsContext;
pub use device::{
    Device, DeviceBuilder, PhysicalDevice, PhysicalDeviceSelector, QueueFamilyIndices,
    Unsuitable, find_queue_families,
};
pub use diagnostics::{Category, Severity, attach, detach, vulkan_tracing_callback};
pub use driver::{
    AshDriver, ColorBlendDesc, DeviceDesc, Driver, FramebufferDesc, GraphicsPipelineDesc,
    ImageViewDesc, InstanceDesc, MessengerDesc, MultisampleDesc, RasterizationDesc,
    RenderPassDesc, ShaderStageDesc, SubpassDesc, SwapchainDesc,
};
pub use error::*;
pub use framebuffer::{create_framebuffers, destroy_framebuffers};
pub use image_view::{create_image_views, destroy_image_views};
pub use instance::{DEBUG_UTILS_EXT_NAME, InstanceBuilder};
pub use pipeline::{GraphicsPipeline, SHADER_ENTRY_POINT, create_graphics_pipeline};
pub use render_pass::create_render_pass;
pub use surface::SurfaceProvider;
pub use swapchain::{
    SurfaceSupportDetails, Swapchain, SwapchainBuilder, choose_composite_alpha,
    choose_image_count, choose_swap_extent, query_surface_support_details,
};
pub use system_info::{SystemInfo, check_layer_support};
pub use version::Version;
