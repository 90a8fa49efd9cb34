use crate::driver::{Driver, FramebufferDesc};
use ash::vk;

/// One framebuffer per view, each binding that view to the render pass's only
/// attachment. A failure destroys the framebuffers already made in this batch.
#[tracing::instrument(skip_all)]
pub fn create_framebuffers<D: Driver>(
    driver: &mut D,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
) -> crate::Result<Vec<vk::Framebuffer>> {
    let mut framebuffers = Vec::with_capacity(views.len());
    for &view in views {
        let desc = FramebufferDesc {
            render_pass,
            attachments: vec![view],
            extent,
            layers: 1,
        };
        match driver.create_framebuffer(&desc) {
            Ok(framebuffer) => framebuffers.push(framebuffer),
            Err(err) => {
                destroy_framebuffers(driver, &mut framebuffers);
                return Err(crate::PipelineError::FailedCreateFramebuffer(err).into());
            }
        }
    }

    tracing::info!(count = framebuffers.len(), "Created framebuffers");
    Ok(framebuffers)
}

pub fn destroy_framebuffers<D: Driver>(driver: &mut D, framebuffers: &mut Vec<vk::Framebuffer>) {
    for framebuffer in framebuffers.drain(..).rev() {
        driver.destroy_framebuffer(framebuffer);
    }
}
