use crate::driver::{Driver, RenderPassDesc, SubpassDesc};
use ash::vk;

/// Single color attachment cleared on load and handed to the presentation
/// engine at the end of the pass.
pub fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    }
}

pub fn render_pass_desc(format: vk::Format) -> RenderPassDesc {
    // Attachment 0 is the fragment shader's `layout(location = 0) out`.
    let color_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };

    RenderPassDesc {
        attachments: vec![color_attachment(format)],
        subpasses: vec![SubpassDesc {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            color_attachments: vec![color_ref],
        }],
    }
}

#[tracing::instrument(skip(driver))]
pub fn create_render_pass<D: Driver>(
    driver: &mut D,
    format: vk::Format,
) -> crate::Result<vk::RenderPass> {
    let render_pass = driver
        .create_render_pass(&render_pass_desc(format))
        .map_err(crate::PipelineError::FailedCreateRenderPass)?;
    tracing::info!("Created vkRenderPass");
    Ok(render_pass)
}
