use super::{
    DeviceDesc, Driver, FramebufferDesc, GraphicsPipelineDesc, ImageViewDesc, InstanceDesc,
    MessengerDesc, RenderPassDesc, SwapchainDesc,
};
use crate::diagnostics::vulkan_tracing_callback;
use crate::surface::SurfaceProvider;
use ash::prelude::VkResult;
use ash::vk;
use ash::{ext, khr};
use std::ffi::{CStr, CString, c_char};
use std::fmt::{Debug, Formatter};

const CREATE_DEBUG_UTILS_MESSENGER: &CStr = c"vkCreateDebugUtilsMessengerEXT";

fn to_owned_names<'a>(names: impl IntoIterator<Item = &'a CStr>) -> Vec<CString> {
    names.into_iter().map(CStr::to_owned).collect()
}

fn as_ptrs(names: &[CString]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect()
}

fn messenger_create_info(desc: &MessengerDesc) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(desc.severity)
        .message_type(desc.message_type)
        .pfn_user_callback(Some(vulkan_tracing_callback))
}

/// [`Driver`] backed by the system Vulkan loader.
///
/// Holds the function tables for whatever has been created so far. Calls that
/// need a table which does not exist yet fail with
/// `ERROR_INITIALIZATION_FAILED`.
pub struct AshDriver {
    entry: ash::Entry,
    instance: Option<ash::Instance>,
    surface_fn: Option<khr::surface::Instance>,
    debug_utils_fn: Option<ext::debug_utils::Instance>,
    device: Option<ash::Device>,
    swapchain_fn: Option<khr::swapchain::Device>,
}

impl Debug for AshDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AshDriver")
            .field("instance", &self.instance.as_ref().map(|i| i.handle()))
            .field("device", &self.device.as_ref().map(|d| d.handle()))
            .field("debug_utils", &self.debug_utils_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl AshDriver {
    /// Opens the Vulkan loader library.
    #[tracing::instrument]
    pub fn load() -> crate::Result<Self> {
        tracing::trace!("Loading entry...");
        // SAFETY: the loader is kept alive by `entry` for as long as any
        // function pointer obtained from it is in use.
        let entry = unsafe { ash::Entry::load() }?;
        tracing::trace!("Entry loaded.");

        Ok(Self {
            entry,
            instance: None,
            surface_fn: None,
            debug_utils_fn: None,
            device: None,
            swapchain_fn: None,
        })
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_fn(&self) -> VkResult<&khr::surface::Instance> {
        self.surface_fn
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> VkResult<&ash::Device> {
        self.device
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn swapchain_fn(&self) -> VkResult<&khr::swapchain::Device> {
        self.swapchain_fn
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    /// Resolves the debug-utils entry points by name. The table is only built
    /// when the create function actually exists on this instance.
    fn load_debug_utils(&self, instance: &ash::Instance) -> Option<ext::debug_utils::Instance> {
        // SAFETY: the name is a valid NUL-terminated string and the instance
        // handle is live.
        let create_fn = unsafe {
            self.entry
                .get_instance_proc_addr(instance.handle(), CREATE_DEBUG_UTILS_MESSENGER.as_ptr())
        };
        create_fn.map(|_| ext::debug_utils::Instance::new(&self.entry, instance))
    }
}

impl Driver for AshDriver {
    fn instance_layers(&self) -> VkResult<Vec<CString>> {
        // SAFETY: pure query on the loader.
        let layers = unsafe { self.entry.enumerate_instance_layer_properties() }?;
        Ok(to_owned_names(
            layers.iter().filter_map(|l| l.layer_name_as_c_str().ok()),
        ))
    }

    fn instance_extensions(&self) -> VkResult<Vec<CString>> {
        // SAFETY: pure query on the loader.
        let extensions = unsafe { self.entry.enumerate_instance_extension_properties(None) }?;
        Ok(to_owned_names(
            extensions
                .iter()
                .filter_map(|e| e.extension_name_as_c_str().ok()),
        ))
    }

    fn surface_extensions(&self, window: &dyn SurfaceProvider) -> crate::Result<Vec<CString>> {
        let display_handle = window.display_handle()?.as_raw();
        let names = ash_window::enumerate_required_extensions(display_handle)?;
        // SAFETY: ash-window returns pointers to static NUL-terminated names.
        Ok(names
            .iter()
            .map(|&name| unsafe { CStr::from_ptr(name) }.to_owned())
            .collect())
    }

    fn create_instance(&mut self, desc: &InstanceDesc) -> VkResult<vk::Instance> {
        let app_info = vk::ApplicationInfo::default()
            .application_name(&desc.app_name)
            .application_version(desc.app_version)
            .engine_name(&desc.engine_name)
            .engine_version(desc.engine_version)
            .api_version(desc.api_version);

        let layer_ptrs = as_ptrs(&desc.layers);
        let extension_ptrs = as_ptrs(&desc.extensions);

        let mut instance_create_info = vk::InstanceCreateInfo::default()
            .flags(desc.flags)
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);

        let mut debug_create_info = desc.debug_messenger.as_ref().map(messenger_create_info);
        if let Some(debug_create_info) = debug_create_info.as_mut() {
            instance_create_info = instance_create_info.push_next(debug_create_info);
        }

        // SAFETY: every pointer in the create info borrows from `desc` or a
        // local that outlives this call.
        let instance = unsafe { self.entry.create_instance(&instance_create_info, None) }?;

        self.surface_fn = Some(khr::surface::Instance::new(&self.entry, &instance));
        self.debug_utils_fn = if desc.debug_messenger.is_some() {
            self.load_debug_utils(&instance)
        } else {
            None
        };
        let handle = instance.handle();
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        if let Some(live) = self.instance.take() {
            if live.handle() == instance {
                self.debug_utils_fn = None;
                self.surface_fn = None;
                // SAFETY: every child object has been destroyed by the caller.
                unsafe { live.destroy_instance(None) };
            } else {
                self.instance = Some(live);
            }
        }
    }

    fn debug_utils_supported(&self) -> bool {
        self.debug_utils_fn.is_some()
    }

    fn create_debug_messenger(
        &mut self,
        desc: &MessengerDesc,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let debug_utils = self
            .debug_utils_fn
            .as_ref()
            .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        // SAFETY: the callback is a plain function with 'static lifetime.
        unsafe { debug_utils.create_debug_utils_messenger(&messenger_create_info(desc), None) }
    }

    fn destroy_debug_messenger(&mut self, messenger: vk::DebugUtilsMessengerEXT) {
        if let Some(debug_utils) = self.debug_utils_fn.as_ref() {
            // SAFETY: messenger was created from this table.
            unsafe { debug_utils.destroy_debug_utils_messenger(messenger, None) };
        }
    }

    fn create_surface(&mut self, window: &dyn SurfaceProvider) -> crate::Result<vk::SurfaceKHR> {
        let instance = self.instance()?;
        let display_handle = window.display_handle()?.as_raw();
        let window_handle = window.window_handle()?.as_raw();
        // SAFETY: the handles come from a live window that outlives the surface.
        let surface = unsafe {
            ash_window::create_surface(&self.entry, instance, display_handle, window_handle, None)
        }
        .map_err(crate::InstanceError::FailedCreateSurface)?;
        Ok(surface)
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Some(surface_fn) = self.surface_fn.as_ref() {
            // SAFETY: the swapchain using this surface has been destroyed.
            unsafe { surface_fn.destroy_surface(surface, None) };
        }
    }

    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        // SAFETY: pure query on a live instance.
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn device_name(&self, physical_device: vk::PhysicalDevice) -> String {
        let Ok(instance) = self.instance() else {
            return String::new();
        };
        // SAFETY: physical_device was enumerated from this instance.
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        let Ok(instance) = self.instance() else {
            return vec![];
        };
        // SAFETY: physical_device was enumerated from this instance.
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) }
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        // SAFETY: queue_family_index is below the reported family count.
        unsafe {
            self.surface_fn()?.get_physical_device_surface_support(
                physical_device,
                queue_family_index,
                surface,
            )
        }
    }

    fn device_extensions(&self, physical_device: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        // SAFETY: pure query on a live instance.
        let extensions =
            unsafe { self.instance()?.enumerate_device_extension_properties(physical_device) }?;
        Ok(to_owned_names(
            extensions
                .iter()
                .filter_map(|e| e.extension_name_as_c_str().ok()),
        ))
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        // SAFETY: pure query on a live surface.
        unsafe {
            self.surface_fn()?
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        // SAFETY: pure query on a live surface.
        unsafe {
            self.surface_fn()?
                .get_physical_device_surface_formats(physical_device, surface)
        }
    }

    fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        // SAFETY: pure query on a live surface.
        unsafe {
            self.surface_fn()?
                .get_physical_device_surface_present_modes(physical_device, surface)
        }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc,
    ) -> VkResult<vk::Device> {
        let priorities = [desc.queue_priority];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = desc
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let features = vk::PhysicalDeviceFeatures::default();
        let extension_ptrs = as_ptrs(&desc.extensions);
        let layer_ptrs = as_ptrs(&desc.layers);

        // Device layers are ignored by current loaders; they are still set so
        // older implementations see the same layers as the instance.
        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_features(&features)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = self.instance()?;
        // SAFETY: every pointer in the create info outlives this call.
        let device = unsafe { instance.create_device(physical_device, &create_info, None) }?;

        let swapchain_fn = khr::swapchain::Device::new(instance, &device);
        let handle = device.handle();
        self.swapchain_fn = Some(swapchain_fn);
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, queue_family_index: u32, queue_index: u32) -> vk::Queue {
        match self.device() {
            // SAFETY: the family was listed in the device create info.
            Ok(device) => unsafe { device.get_device_queue(queue_family_index, queue_index) },
            Err(_) => vk::Queue::null(),
        }
    }

    fn destroy_device(&mut self, device: vk::Device) {
        if let Some(live) = self.device.take() {
            if live.handle() == device {
                self.swapchain_fn = None;
                // SAFETY: all device children have been destroyed by the caller.
                unsafe { live.destroy_device(None) };
            } else {
                self.device = Some(live);
            }
        }
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(desc.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.surface_format.format)
            .image_color_space(desc.surface_format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(desc.image_array_layers)
            .image_usage(desc.image_usage)
            .image_sharing_mode(desc.sharing_mode)
            .queue_family_indices(&desc.queue_family_indices)
            .pre_transform(desc.pre_transform)
            .composite_alpha(desc.composite_alpha)
            .present_mode(desc.present_mode)
            .clipped(desc.clipped)
            .old_swapchain(vk::SwapchainKHR::null());

        // SAFETY: the surface is live and every pointer outlives this call.
        unsafe { self.swapchain_fn()?.create_swapchain(&create_info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        // SAFETY: swapchain was created from this table.
        unsafe { self.swapchain_fn()?.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Ok(swapchain_fn) = self.swapchain_fn() {
            // SAFETY: the views onto the swapchain images are already gone.
            unsafe { swapchain_fn.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> VkResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(desc.image)
            .view_type(desc.view_type)
            .format(desc.format)
            .components(desc.components)
            .subresource_range(desc.subresource_range);

        // SAFETY: the image belongs to a live swapchain on this device.
        unsafe { self.device()?.create_image_view(&create_info, None) }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Ok(device) = self.device() {
            // SAFETY: no framebuffer references the view any more.
            unsafe { device.destroy_image_view(view, None) };
        }
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> VkResult<vk::RenderPass> {
        let subpasses: Vec<vk::SubpassDescription<'_>> = desc
            .subpasses
            .iter()
            .map(|subpass| {
                vk::SubpassDescription::default()
                    .pipeline_bind_point(subpass.bind_point)
                    .color_attachments(&subpass.color_attachments)
            })
            .collect();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&desc.attachments)
            .subpasses(&subpasses);

        // SAFETY: attachment references borrow from `desc`.
        unsafe { self.device()?.create_render_pass(&create_info, None) }
    }

    fn destroy_render_pass(&mut self, render_pass: vk::RenderPass) {
        if let Ok(device) = self.device() {
            // SAFETY: pipelines and framebuffers using the pass are gone.
            unsafe { device.destroy_render_pass(render_pass, None) };
        }
    }

    fn create_shader_module(&mut self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        // SAFETY: create_info holds SPIR-V words; validity is the driver's concern.
        unsafe { self.device()?.create_shader_module(&create_info, None) }
    }

    fn destroy_shader_module(&mut self, module: vk::ShaderModule) {
        if let Ok(device) = self.device() {
            // SAFETY: pipelines copy what they need from the module at creation.
            unsafe { device.destroy_shader_module(module, None) };
        }
    }

    fn create_pipeline_layout(&mut self) -> VkResult<vk::PipelineLayout> {
        let create_info = vk::PipelineLayoutCreateInfo::default();
        // SAFETY: an empty layout imposes no further requirements.
        unsafe { self.device()?.create_pipeline_layout(&create_info, None) }
    }

    fn destroy_pipeline_layout(&mut self, layout: vk::PipelineLayout) {
        if let Ok(device) = self.device() {
            // SAFETY: the pipeline built on this layout is gone.
            unsafe { device.destroy_pipeline_layout(layout, None) };
        }
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
    ) -> VkResult<vk::Pipeline> {
        let stages: Vec<vk::PipelineShaderStageCreateInfo<'_>> = desc
            .stages
            .iter()
            .map(|stage| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(stage.module)
                    .name(stage.entry_point)
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&desc.vertex_bindings)
            .vertex_attribute_descriptions(&desc.vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(desc.topology)
            .primitive_restart_enable(desc.primitive_restart_enable);

        let viewports = [desc.viewport];
        let scissors = [desc.scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let raster = &desc.rasterization;
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(raster.depth_clamp_enable)
            .rasterizer_discard_enable(raster.rasterizer_discard_enable)
            .polygon_mode(raster.polygon_mode)
            .line_width(raster.line_width)
            .cull_mode(raster.cull_mode)
            .front_face(raster.front_face)
            .depth_bias_enable(raster.depth_bias_enable);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(desc.multisample.sample_shading_enable)
            .rasterization_samples(desc.multisample.rasterization_samples)
            .min_sample_shading(desc.multisample.min_sample_shading);

        let blend_attachments = [desc.color_blend.attachment];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(desc.color_blend.logic_op_enable)
            .logic_op(desc.color_blend.logic_op)
            .attachments(&blend_attachments)
            .blend_constants(desc.color_blend.blend_constants);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(desc.layout)
            .render_pass(desc.render_pass)
            .subpass(desc.subpass)
            .base_pipeline_handle(vk::Pipeline::null())
            .base_pipeline_index(-1);

        // SAFETY: every referenced state struct is a local that outlives the call.
        let pipelines = unsafe {
            self.device()?
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        }
        .map_err(|(_, result)| result)?;

        pipelines
            .into_iter()
            .next()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn destroy_pipeline(&mut self, pipeline: vk::Pipeline) {
        if let Ok(device) = self.device() {
            // SAFETY: no command buffer is recording with this pipeline.
            unsafe { device.destroy_pipeline(pipeline, None) };
        }
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> VkResult<vk::Framebuffer> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(desc.render_pass)
            .attachments(&desc.attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(desc.layers);

        // SAFETY: the render pass and views are live on this device.
        unsafe { self.device()?.create_framebuffer(&create_info, None) }
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        if let Ok(device) = self.device() {
            // SAFETY: no work referencing the framebuffer is in flight.
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
    }
}
