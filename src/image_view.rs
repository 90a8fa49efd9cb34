use crate::driver::{Driver, ImageViewDesc};
use ash::vk;

fn color_view(image: vk::Image, format: vk::Format) -> ImageViewDesc {
    ImageViewDesc {
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format,
        components: vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        },
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
    }
}

/// One view per image, in image order. If any view fails, the ones already
/// created in this batch are destroyed before the error is returned.
#[tracing::instrument(skip_all)]
pub fn create_image_views<D: Driver>(
    driver: &mut D,
    images: &[vk::Image],
    format: vk::Format,
) -> crate::Result<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());
    for &image in images {
        match driver.create_image_view(&color_view(image, format)) {
            Ok(view) => views.push(view),
            Err(err) => {
                destroy_image_views(driver, &mut views);
                return Err(crate::SwapchainError::FailedCreateImageView(err).into());
            }
        }
    }

    tracing::info!(count = views.len(), "Created swapchain image views");
    Ok(views)
}

/// Drains `views`, so calling it twice destroys nothing the second time.
pub fn destroy_image_views<D: Driver>(driver: &mut D, views: &mut Vec<vk::ImageView>) {
    for view in views.drain(..).rev() {
        driver.destroy_image_view(view);
    }
}
