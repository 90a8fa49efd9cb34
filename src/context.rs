use crate::config::BootstrapConfig;
use crate::device::{Device, DeviceBuilder, PhysicalDevice, PhysicalDeviceSelector};
use crate::diagnostics;
use crate::driver::Driver;
use crate::framebuffer::{create_framebuffers, destroy_framebuffers};
use crate::image_view::{create_image_views, destroy_image_views};
use crate::instance::InstanceBuilder;
use crate::pipeline::{GraphicsPipeline, create_graphics_pipeline};
use crate::render_pass::create_render_pass;
use crate::surface::SurfaceProvider;
use crate::swapchain::{Swapchain, SwapchainBuilder};
use ash::vk;

/// Every object the bootstrap sequence creates, owned in one place.
///
/// Handles are stored the moment they are created, so an error half way
/// through [`GraphicsContext::bootstrap`] drops a context that holds exactly
/// what was built and releases it in reverse order. The window is not owned
/// here and must outlive the context.
pub struct GraphicsContext<D: Driver> {
    driver: D,
    instance: Option<vk::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: Option<vk::SurfaceKHR>,
    physical_device: Option<PhysicalDevice>,
    device: Option<Device>,
    swapchain: Option<Swapchain>,
    image_views: Vec<vk::ImageView>,
    render_pass: Option<vk::RenderPass>,
    pipeline: Option<GraphicsPipeline>,
    framebuffers: Vec<vk::Framebuffer>,
}

impl<D: Driver> std::fmt::Debug for GraphicsContext<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("instance", &self.instance)
            .field("debug_messenger", &self.debug_messenger)
            .field("surface", &self.surface)
            .field("physical_device", &self.physical_device.as_ref().map(|pd| &pd.name))
            .field("device", &self.device)
            .field("swapchain", &self.swapchain)
            .field("image_views", &self.image_views)
            .field("render_pass", &self.render_pass)
            .field("pipeline", &self.pipeline)
            .field("framebuffers", &self.framebuffers)
            .finish()
    }
}

impl<D: Driver> GraphicsContext<D> {
    fn empty(driver: D) -> Self {
        Self {
            driver,
            instance: None,
            debug_messenger: None,
            surface: None,
            physical_device: None,
            device: None,
            swapchain: None,
            image_views: vec![],
            render_pass: None,
            pipeline: None,
            framebuffers: vec![],
        }
    }

    /// Runs the whole bring-up: instance, debug messenger, surface, GPU
    /// selection, logical device, swapchain, image views, render pass,
    /// pipeline and framebuffers.
    ///
    /// The first failure aborts the sequence. Whatever was created before it is
    /// destroyed before the error is returned.
    #[tracing::instrument(skip_all)]
    pub fn bootstrap(
        driver: D,
        window: &dyn SurfaceProvider,
        config: &BootstrapConfig,
    ) -> crate::Result<Self> {
        let mut context = Self::empty(driver);

        let mut instance_builder = InstanceBuilder::new()
            .app_name(&config.app_name)
            .engine_name(&config.engine_name)
            .app_version(config.app_version)
            .engine_version(config.engine_version)
            .api_version(config.api_version)
            .validation_layers(&config.validation_layers)
            .enable_diagnostics(config.enable_diagnostics);
        for extension in &config.instance_extensions {
            instance_builder = instance_builder.enable_extension(extension);
        }
        context.instance = Some(instance_builder.build(&mut context.driver, window)?);

        context.debug_messenger =
            diagnostics::attach(&mut context.driver, config.enable_diagnostics)?;

        let surface = context.driver.create_surface(window)?;
        context.surface = Some(surface);
        tracing::info!("Created vkSurfaceKHR");

        let physical_device = PhysicalDeviceSelector::new(surface)
            .add_required_extensions(&config.device_extensions)
            .select(&context.driver)?;

        let device = DeviceBuilder::new(&physical_device)
            .validation_layers(&config.validation_layers)
            .enable_diagnostics(config.enable_diagnostics)
            .build(&mut context.driver)?;
        context.device = Some(device);

        let swapchain = SwapchainBuilder::new(&physical_device, &device, surface)
            .framebuffer_extent(window.framebuffer_size())
            .build(&mut context.driver)?;
        context.physical_device = Some(physical_device);
        let swapchain = context.swapchain.insert(swapchain);

        context.image_views =
            create_image_views(&mut context.driver, &swapchain.images, swapchain.image_format())?;

        let render_pass = create_render_pass(&mut context.driver, swapchain.image_format())?;
        context.render_pass = Some(render_pass);

        let vertex_code = config.vertex_shader.load()?;
        let fragment_code = config.fragment_shader.load()?;
        context.pipeline = Some(create_graphics_pipeline(
            &mut context.driver,
            render_pass,
            swapchain.extent,
            &vertex_code,
            &fragment_code,
        )?);

        context.framebuffers = create_framebuffers(
            &mut context.driver,
            render_pass,
            &context.image_views,
            swapchain.extent,
        )?;

        tracing::info!("Graphics context ready");
        Ok(context)
    }

    /// Releases everything in reverse creation order. Safe to call more than
    /// once and on a partially built context.
    pub fn teardown(&mut self) {
        destroy_framebuffers(&mut self.driver, &mut self.framebuffers);
        if let Some(pipeline) = self.pipeline.take() {
            self.driver.destroy_pipeline(pipeline.pipeline);
            self.driver.destroy_pipeline_layout(pipeline.layout);
        }
        if let Some(render_pass) = self.render_pass.take() {
            self.driver.destroy_render_pass(render_pass);
        }
        destroy_image_views(&mut self.driver, &mut self.image_views);
        if let Some(swapchain) = self.swapchain.take() {
            self.driver.destroy_swapchain(swapchain.swapchain);
        }
        if let Some(device) = self.device.take() {
            self.driver.destroy_device(device.device);
        }
        self.physical_device = None;
        diagnostics::detach(&mut self.driver, self.debug_messenger.take());
        if let Some(surface) = self.surface.take() {
            self.driver.destroy_surface(surface);
        }
        if let Some(instance) = self.instance.take() {
            self.driver.destroy_instance(instance);
            tracing::debug!("Graphics context torn down");
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    pub fn debug_messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.debug_messenger
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    pub fn physical_device(&self) -> Option<&PhysicalDevice> {
        self.physical_device.as_ref()
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn render_pass(&self) -> Option<vk::RenderPass> {
        self.render_pass
    }

    pub fn pipeline(&self) -> Option<&GraphicsPipeline> {
        self.pipeline.as_ref()
    }

    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }
}

impl<D: Driver> Drop for GraphicsContext<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
