//! Scripted in-memory driver for unit tests.

use super::{
    DeviceDesc, Driver, FramebufferDesc, GraphicsPipelineDesc, ImageViewDesc, InstanceDesc,
    MessengerDesc, RenderPassDesc, SwapchainDesc,
};
use crate::surface::SurfaceProvider;
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::CString;
use std::rc::Rc;

const PHYSICAL_DEVICE_BASE: u64 = 0x1000;
const QUEUE_BASE: u64 = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
    ImageView,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Framebuffer,
}

impl Kind {
    /// Kinds that must already be gone when an object of this kind is destroyed.
    fn dependents(self) -> &'static [Kind] {
        match self {
            Kind::Instance => &[Kind::DebugMessenger, Kind::Surface, Kind::Device],
            Kind::Surface => &[Kind::Swapchain],
            Kind::Device => &[
                Kind::Swapchain,
                Kind::ImageView,
                Kind::RenderPass,
                Kind::ShaderModule,
                Kind::PipelineLayout,
                Kind::Pipeline,
                Kind::Framebuffer,
            ],
            Kind::Swapchain => &[Kind::ImageView],
            Kind::ImageView => &[Kind::Framebuffer],
            Kind::RenderPass => &[Kind::Pipeline, Kind::Framebuffer],
            Kind::PipelineLayout => &[Kind::Pipeline],
            Kind::DebugMessenger
            | Kind::ShaderModule
            | Kind::Pipeline
            | Kind::Framebuffer => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Created(Kind, u64),
    Destroyed(Kind, u64),
    /// Destroy of a handle that is not live: never created or already freed.
    StaleDestroy(Kind, u64),
    /// Destroy while a dependent object was still live.
    OutOfOrder(Kind, u64),
}

#[derive(Debug, Clone)]
pub struct MockGpu {
    pub name: String,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub present_families: Vec<u32>,
    pub extensions: Vec<CString>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Images handed out beyond the requested minimum.
    pub extra_images: u32,
    /// Returned by the device extension query instead of `extensions`.
    pub extension_query_error: Option<vk::Result>,
    /// Returned by the surface capabilities query instead of `capabilities`.
    pub surface_query_error: Option<vk::Result>,
}

impl MockGpu {
    /// Graphics and present on family 0, one BGRA8/sRGB format, FIFO only,
    /// `min_image_count = 2`, unbounded maximum, fixed 800x600 extent.
    pub fn capable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            queue_families: vec![vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            }],
            present_families: vec![0],
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 0,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            extra_images: 0,
            extension_query_error: None,
            surface_query_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockSystem {
    pub layers: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    pub surface_extensions: Vec<CString>,
    pub debug_utils: bool,
    pub gpus: Vec<MockGpu>,
    /// Fail the n-th (zero based) creation attempt of the given kind.
    pub fail: Option<(Kind, usize)>,
}

impl MockSystem {
    pub fn single_gpu() -> Self {
        Self {
            layers: vec![crate::config::VALIDATION_LAYER_NAME.to_owned()],
            instance_extensions: vec![
                ash::ext::debug_utils::NAME.to_owned(),
                ash::khr::surface::NAME.to_owned(),
                c"VK_KHR_xlib_surface".to_owned(),
            ],
            surface_extensions: vec![
                ash::khr::surface::NAME.to_owned(),
                c"VK_KHR_xlib_surface".to_owned(),
            ],
            debug_utils: true,
            gpus: vec![MockGpu::capable("Mock GPU")],
            fail: None,
        }
    }

    pub fn failing_at(mut self, kind: Kind, attempt: usize) -> Self {
        self.fail = Some((kind, attempt));
        self
    }
}

/// Everything the mock saw. Shared so tests can inspect it after the driver
/// has been moved into, and dropped with, a context.
#[derive(Debug, Default)]
pub struct Recording {
    pub events: Vec<Event>,
    pub instance: Option<InstanceDesc>,
    pub device: Option<DeviceDesc>,
    pub selected_gpu: Option<vk::PhysicalDevice>,
    pub queue_fetches: Vec<(u32, u32)>,
    pub swapchain: Option<SwapchainDesc>,
    pub image_views: Vec<ImageViewDesc>,
    pub render_pass: Option<RenderPassDesc>,
    pub shader_modules: Vec<Vec<u32>>,
    pub pipeline: Option<GraphicsPipelineDesc>,
    pub framebuffers: Vec<FramebufferDesc>,
}

impl Recording {
    pub fn created(&self, kind: Kind) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Created(k, _) if *k == kind))
            .count()
    }

    pub fn destroyed(&self, kind: Kind) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Destroyed(k, _) if *k == kind))
            .count()
    }

    /// Kinds in the order their destruction was logged, duplicates collapsed.
    pub fn destruction_order(&self) -> Vec<Kind> {
        let mut order: Vec<Kind> = vec![];
        for event in &self.events {
            if let Event::Destroyed(kind, _) = event {
                if order.last() != Some(kind) {
                    order.push(*kind);
                }
            }
        }
        order
    }

    pub fn violations(&self) -> Vec<Event> {
        self.events
            .iter()
            .copied()
            .filter(|e| matches!(e, Event::StaleDestroy(..) | Event::OutOfOrder(..)))
            .collect()
    }

    /// Handles created and never destroyed.
    pub fn leaks(&self) -> Vec<(Kind, u64)> {
        let mut live: Vec<(Kind, u64)> = vec![];
        for event in &self.events {
            match event {
                Event::Created(kind, raw) => live.push((*kind, *raw)),
                Event::Destroyed(kind, raw) => live.retain(|entry| *entry != (*kind, *raw)),
                _ => {}
            }
        }
        live
    }
}

#[derive(Debug)]
pub struct MockDriver {
    system: MockSystem,
    next_handle: u64,
    attempts: Vec<(Kind, usize)>,
    live: HashSet<(Kind, u64)>,
    swapchain_images: Vec<(u64, Vec<vk::Image>)>,
    instance_live: bool,
    recording: Rc<RefCell<Recording>>,
}

impl MockDriver {
    pub fn new(system: MockSystem) -> Self {
        Self {
            system,
            next_handle: 1,
            attempts: vec![],
            live: HashSet::new(),
            swapchain_images: vec![],
            instance_live: false,
            recording: Rc::new(RefCell::new(Recording::default())),
        }
    }

    pub fn recording(&self) -> Rc<RefCell<Recording>> {
        Rc::clone(&self.recording)
    }

    pub fn created(&self, kind: Kind) -> usize {
        self.recording.borrow().created(kind)
    }

    pub fn destroyed(&self, kind: Kind) -> usize {
        self.recording.borrow().destroyed(kind)
    }

    fn gpu(&self, physical_device: vk::PhysicalDevice) -> Option<&MockGpu> {
        let index = physical_device.as_raw().checked_sub(PHYSICAL_DEVICE_BASE)?;
        self.system.gpus.get(usize::try_from(index).ok()?)
    }

    fn should_fail(&mut self, kind: Kind) -> bool {
        let attempt = match self.attempts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, count)) => {
                *count += 1;
                *count - 1
            }
            None => {
                self.attempts.push((kind, 1));
                0
            }
        };
        self.system.fail == Some((kind, attempt))
    }

    fn create(&mut self, kind: Kind) -> VkResult<u64> {
        if self.should_fail(kind) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let raw = self.next_handle;
        self.next_handle += 1;
        self.live.insert((kind, raw));
        self.recording
            .borrow_mut()
            .events
            .push(Event::Created(kind, raw));
        Ok(raw)
    }

    fn destroy(&mut self, kind: Kind, raw: u64) {
        if raw == 0 {
            return;
        }
        let mut recording = self.recording.borrow_mut();
        if !self.live.remove(&(kind, raw)) {
            recording.events.push(Event::StaleDestroy(kind, raw));
            return;
        }
        if self
            .live
            .iter()
            .any(|(live_kind, _)| kind.dependents().contains(live_kind))
        {
            recording.events.push(Event::OutOfOrder(kind, raw));
        }
        recording.events.push(Event::Destroyed(kind, raw));
    }
}

impl Driver for MockDriver {
    fn instance_layers(&self) -> VkResult<Vec<CString>> {
        Ok(self.system.layers.clone())
    }

    fn instance_extensions(&self) -> VkResult<Vec<CString>> {
        Ok(self.system.instance_extensions.clone())
    }

    fn surface_extensions(&self, _window: &dyn SurfaceProvider) -> crate::Result<Vec<CString>> {
        Ok(self.system.surface_extensions.clone())
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance> {
        let raw = self.create(Kind::Instance)?;
        self.instance_live = true;
        self.recording.borrow_mut().instance = Some(desc.clone());
        Ok(vk::Instance::from_raw(raw))
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.destroy(Kind::Instance, instance.as_raw());
        self.instance_live = false;
    }

    fn debug_utils_supported(&self) -> bool {
        self.system.debug_utils
    }

    fn create_debug_messenger(
        &mut self,
        _desc: &MessengerDesc,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let raw = self.create(Kind::DebugMessenger)?;
        Ok(vk::DebugUtilsMessengerEXT::from_raw(raw))
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        self.destroy(Kind::DebugMessenger, messenger.as_raw());
    }

    fn create_surface(&mut self, _window: &dyn SurfaceProvider) -> crate::Result<vk::SurfaceKHR> {
        let raw = self
            .create(Kind::Surface)
            .map_err(crate::InstanceError::FailedCreateSurface)?;
        Ok(vk::SurfaceKHR::from_raw(raw))
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        self.destroy(Kind::Surface, surface.as_raw());
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        if !self.instance_live {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        Ok((0..self.system.gpus.len() as u64)
            .map(|index| vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index))
            .collect())
    }

    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
        self.gpu(physical_device)
            .map(|gpu| gpu.name.clone())
            .unwrap_or_default()
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.gpu(physical_device)
            .map(|gpu| gpu.queue_families.clone())
            .unwrap_or_default()
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let gpu = self
            .gpu(physical_device)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        Ok(gpu.present_families.contains(&queue_family_index))
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        let gpu = self
            .gpu(physical_device)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        if let Some(err) = gpu.extension_query_error {
            return Err(err);
        }
        Ok(gpu.extensions.clone())
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let gpu = self
            .gpu(physical_device)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        if let Some(err) = gpu.surface_query_error {
            return Err(err);
        }
        Ok(gpu.capabilities)
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let gpu = self
            .gpu(physical_device)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        Ok(gpu.formats.clone())
    }

    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        let gpu = self
            .gpu(physical_device)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        Ok(gpu.present_modes.clone())
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> VkResult<vk::Device> {
        let raw = self.create(Kind::Device)?;
        let mut recording = self.recording.borrow_mut();
        recording.device = Some(desc.clone());
        recording.selected_gpu = Some(physical_device);
        Ok(vk::Device::from_raw(raw))
    }

    fn device_queue(&self, queue_family_index: u32, queue_index: u32) -> vk::Queue {
        self.recording
            .borrow_mut()
            .queue_fetches
            .push((queue_family_index, queue_index));
        vk::Queue::from_raw(QUEUE_BASE + u64::from(queue_family_index))
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.destroy(Kind::Device, device.as_raw());
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let raw = self.create(Kind::Swapchain)?;
        let extra = self
            .recording
            .borrow()
            .selected_gpu
            .and_then(|pd| self.gpu(pd))
            .map_or(0, |gpu| gpu.extra_images);
        let images = (0..desc.min_image_count + extra)
            .map(|i| vk::Image::from_raw(raw * 100 + u64::from(i) + 1))
            .collect();
        self.swapchain_images.push((raw, images));
        self.recording.borrow_mut().swapchain = Some(desc.clone());
        Ok(vk::SwapchainKHR::from_raw(raw))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.swapchain_images
            .iter()
            .find(|(raw, _)| *raw == swapchain.as_raw())
            .map(|(_, images)| images.clone())
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        self.destroy(Kind::Swapchain, swapchain.as_raw());
    }

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> VkResult<vk::ImageView> {
        let raw = self.create(Kind::ImageView)?;
        self.recording.borrow_mut().image_views.push(*desc);
        Ok(vk::ImageView::from_raw(raw))
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.destroy(Kind::ImageView, view.as_raw());
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass> {
        let raw = self.create(Kind::RenderPass)?;
        self.recording.borrow_mut().render_pass = Some(desc.clone());
        Ok(vk::RenderPass::from_raw(raw))
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        self.destroy(Kind::RenderPass, render_pass.as_raw());
    }

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let raw = self.create(Kind::ShaderModule)?;
        self.recording.borrow_mut().shader_modules.push(code.to_vec());
        Ok(vk::ShaderModule::from_raw(raw))
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        self.destroy(Kind::ShaderModule, module.as_raw());
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        let raw = self.create(Kind::PipelineLayout)?;
        Ok(vk::PipelineLayout::from_raw(raw))
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        self.destroy(Kind::PipelineLayout, layout.as_raw());
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
    ) -> VkResult<vk::Pipeline> {
        let raw = self.create(Kind::Pipeline)?;
        self.recording.borrow_mut().pipeline = Some(desc.clone());
        Ok(vk::Pipeline::from_raw(raw))
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.destroy(Kind::Pipeline, pipeline.as_raw());
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> VkResult<vk::Framebuffer> {
        let raw = self.create(Kind::Framebuffer)?;
        self.recording.borrow_mut().framebuffers.push(desc.clone());
        Ok(vk::Framebuffer::from_raw(raw))
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        self.destroy(Kind::Framebuffer, framebuffer.as_raw());
    }
}

/// Window stand-in with no native handles.
#[derive(Debug, Clone, Copy)]
pub struct MockWindow {
    pub size: vk::Extent2D,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: vk::Extent2D { width, height },
        }
    }
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl SurfaceProvider for MockWindow {
    fn framebuffer_size(&self) -> vk::Extent2D {
        self.size
    }
}
