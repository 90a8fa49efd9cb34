use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),
    #[error("Physical device error: {0}")]
    PhysicalDevice(#[from] PhysicalDeviceError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Swapchain error: {0}")]
    Swapchain(#[from] SwapchainError),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Ash loading error: {0}")]
    Loading(#[from] ash::LoadingError),
    #[error("Window handle error: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
    #[error("Failed to read shader {path:?}: {source}")]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("Validation layers requested but not available: {0:?}")]
    ValidationLayersUnavailable(Vec<String>),
    #[error("Failed to find requested extensions: {0:?}")]
    RequestedExtensionsNotPresent(Vec<String>),
    #[error("Failed to create instance: {0}")]
    FailedCreateInstance(vk::Result),
    #[error("Failed to create debug messenger: {0}")]
    FailedCreateDebugMessenger(vk::Result),
    #[error("Failed to create window surface: {0}")]
    FailedCreateSurface(vk::Result),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum PhysicalDeviceError {
    #[error("Failed to enumerate physical devices: {0}")]
    FailedToEnumeratePhysicalDevices(vk::Result),
    #[error("No physical devices found")]
    NoPhysicalDevicesFound,
    #[error("Failed to find a suitable GPU")]
    NoSuitableDevice,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Graphics unavailable")]
    GraphicsUnavailable,
    #[error("Present unavailable")]
    PresentUnavailable,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Failed to create logical device: {0}")]
    FailedCreateDevice(vk::Result),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum SwapchainError {
    #[error("Failed query surface support details: {0}")]
    FailedQuerySurfaceSupportDetails(vk::Result),
    #[error("Surface reports no formats")]
    NoSurfaceFormats,
    #[error("Failed to create swapchain: {0}")]
    FailedCreateSwapchain(vk::Result),
    #[error("Failed to get swapchain images: {0}")]
    FailedGetSwapchainImages(vk::Result),
    #[error("Failed to create swapchain image view: {0}")]
    FailedCreateImageView(vk::Result),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Failed to create render pass: {0}")]
    FailedCreateRenderPass(vk::Result),
    #[error("SPIR-V byte length ({0}) is not a multiple of 4")]
    InvalidSpirv(usize),
    #[error("Failed to create shader module: {0}")]
    FailedCreateShaderModule(vk::Result),
    #[error("Failed to create pipeline layout: {0}")]
    FailedCreatePipelineLayout(vk::Result),
    #[error("Failed to create graphics pipeline: {0}")]
    FailedCreatePipeline(vk::Result),
    #[error("Failed to create framebuffer: {0}")]
    FailedCreateFramebuffer(vk::Result),
}

pub type Result<T> = std::result::Result<T, Error>;
