//! The boundary between the bootstrap sequence and the Vulkan loader.
//!
//! Builders in this crate never call Vulkan directly. They translate their
//! inputs into the plain descriptor structs below and hand them to a [`Driver`],
//! which realizes them. [`AshDriver`] does this against the system loader.

mod ash_driver;
#[cfg(test)]
pub(crate) mod mock;

pub use ash_driver::AshDriver;

use crate::surface::SurfaceProvider;
use ash::prelude::VkResult;
use ash::vk;
use std::ffi::{CStr, CString};

#[derive(Debug, Clone)]
pub struct InstanceDesc {
    pub app_name: CString,
    pub app_version: u32,
    pub engine_name: CString,
    pub engine_version: u32,
    pub api_version: u32,
    pub flags: vk::InstanceCreateFlags,
    pub layers: Vec<CString>,
    pub extensions: Vec<CString>,
    /// Chained into instance creation so messages emitted while the instance
    /// is being created or destroyed are captured too.
    pub debug_messenger: Option<MessengerDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessengerDesc {
    pub severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    pub message_type: vk::DebugUtilsMessageTypeFlagsEXT,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDesc {
    /// One queue is requested from each listed family. Entries are unique.
    pub queue_families: Vec<u32>,
    pub queue_priority: f32,
    pub extensions: Vec<CString>,
    pub layers: Vec<CString>,
}

#[derive(Debug, Clone)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub surface_format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub image_array_layers: u32,
    pub image_usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageViewDesc {
    pub image: vk::Image,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub components: vk::ComponentMapping,
    pub subresource_range: vk::ImageSubresourceRange,
}

#[derive(Debug, Clone)]
pub struct SubpassDesc {
    pub bind_point: vk::PipelineBindPoint,
    pub color_attachments: Vec<vk::AttachmentReference>,
}

#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub subpasses: Vec<SubpassDesc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderStageDesc {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: &'static CStr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationDesc {
    pub depth_clamp_enable: bool,
    pub rasterizer_discard_enable: bool,
    pub polygon_mode: vk::PolygonMode,
    pub line_width: f32,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultisampleDesc {
    pub sample_shading_enable: bool,
    pub rasterization_samples: vk::SampleCountFlags,
    pub min_sample_shading: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ColorBlendDesc {
    pub logic_op_enable: bool,
    pub logic_op: vk::LogicOp,
    pub attachment: vk::PipelineColorBlendAttachmentState,
    pub blend_constants: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub stages: Vec<ShaderStageDesc>,
    /// Vertex bindings and attributes. Both empty while geometry lives in the
    /// vertex shader.
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart_enable: bool,
    pub viewport: vk::Viewport,
    pub scissor: vk::Rect2D,
    pub rasterization: RasterizationDesc,
    pub multisample: MultisampleDesc,
    pub color_blend: ColorBlendDesc,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
}

#[derive(Debug, Clone)]
pub struct FramebufferDesc {
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
    pub layers: u32,
}

/// Every Vulkan entry point the bootstrap sequence touches.
///
/// Instance- and device-level calls require the matching `create_*` call to
/// have succeeded first. Destroying a handle the driver never handed out is a
/// no-op.
pub trait Driver {
    fn instance_layers(&self) -> VkResult<Vec<CString>>;
    fn instance_extensions(&self) -> VkResult<Vec<CString>>;
    fn surface_extensions(&self, window: &dyn SurfaceProvider) -> crate::Result<Vec<CString>>;

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance>;
    fn destroy_instance(&mut self, instance: vk::Instance);

    /// Whether the debug-utils function table resolved on the live instance.
    fn debug_utils_supported(&self) -> bool;
    fn create_debug_messenger(
        &mut self,
        desc: &MessengerDesc,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;
    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT);

    fn create_surface(&mut self, window: &dyn SurfaceProvider) -> crate::Result<vk::SurfaceKHR>;
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String;
    fn queue_families(&self, physical_device: vk::PhysicalDevice)
    -> Vec<vk::QueueFamilyProperties>;
    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<CString>>;
    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> VkResult<vk::Device>;
    fn device_queue(&self, queue_family_index: u32, queue_index: u32) -> vk::Queue;
    fn destroy_device(&mut self, device: vk::Device);

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&mut self, view: vk::ImageView);

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass);

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn destroy_shader_module(&mut self, module: vk::ShaderModule);

    /// Creates a layout with no descriptor sets and no push constant ranges.
    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc)
    -> VkResult<vk::Pipeline>;
    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline);

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> VkResult<vk::Framebuffer>;
    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer);
}
