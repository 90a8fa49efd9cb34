use crate::driver::{
    ColorBlendDesc, Driver, GraphicsPipelineDesc, MultisampleDesc, RasterizationDesc,
    ShaderStageDesc,
};
use ash::vk;
use std::ffi::CStr;

pub const SHADER_ENTRY_POINT: &CStr = c"main";

/// A pipeline and the layout it was built against. Shader modules are not
/// kept; the pipeline holds its own copy of the compiled stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

pub fn rasterization_state() -> RasterizationDesc {
    RasterizationDesc {
        depth_clamp_enable: false,
        rasterizer_discard_enable: false,
        polygon_mode: vk::PolygonMode::FILL,
        line_width: 1.0,
        cull_mode: vk::CullModeFlags::BACK,
        front_face: vk::FrontFace::CLOCKWISE,
        depth_bias_enable: false,
    }
}

pub fn multisample_state() -> MultisampleDesc {
    MultisampleDesc {
        sample_shading_enable: false,
        rasterization_samples: vk::SampleCountFlags::TYPE_1,
        min_sample_shading: 1.0,
    }
}

/// Straight alpha blending on color; alpha itself is written through.
pub fn color_blend_state() -> ColorBlendDesc {
    ColorBlendDesc {
        logic_op_enable: false,
        logic_op: vk::LogicOp::COPY,
        attachment: vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::TRUE,
            src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
            dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            color_blend_op: vk::BlendOp::ADD,
            src_alpha_blend_factor: vk::BlendFactor::ONE,
            dst_alpha_blend_factor: vk::BlendFactor::ZERO,
            alpha_blend_op: vk::BlendOp::ADD,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        },
        blend_constants: [0.0; 4],
    }
}

/// Full-extent viewport with the standard `[0, 1]` depth range and no y flip.
pub fn viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub fn scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

fn create_shader_module<D: Driver>(
    driver: &mut D,
    code: &[u32],
) -> crate::Result<vk::ShaderModule> {
    driver
        .create_shader_module(code)
        .map_err(|err| crate::PipelineError::FailedCreateShaderModule(err).into())
}

/// Builds the triangle pipeline for subpass 0 of `render_pass`.
///
/// Both shader modules are destroyed before returning, whatever the outcome.
/// On failure nothing created here outlives the call.
#[tracing::instrument(skip_all)]
pub fn create_graphics_pipeline<D: Driver>(
    driver: &mut D,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
    vertex_code: &[u32],
    fragment_code: &[u32],
) -> crate::Result<GraphicsPipeline> {
    let vertex_module = create_shader_module(driver, vertex_code)?;
    let fragment_module = match create_shader_module(driver, fragment_code) {
        Ok(module) => module,
        Err(err) => {
            driver.destroy_shader_module(vertex_module);
            return Err(err);
        }
    };

    let result = assemble(driver, render_pass, extent, vertex_module, fragment_module);

    driver.destroy_shader_module(fragment_module);
    driver.destroy_shader_module(vertex_module);

    let pipeline = result?;
    tracing::info!("Created vkPipeline");
    Ok(pipeline)
}

fn assemble<D: Driver>(
    driver: &mut D,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
    vertex_module: vk::ShaderModule,
    fragment_module: vk::ShaderModule,
) -> crate::Result<GraphicsPipeline> {
    let layout = driver
        .create_pipeline_layout()
        .map_err(crate::PipelineError::FailedCreatePipelineLayout)?;

    let desc = GraphicsPipelineDesc {
        stages: vec![
            ShaderStageDesc {
                stage: vk::ShaderStageFlags::VERTEX,
                module: vertex_module,
                entry_point: SHADER_ENTRY_POINT,
            },
            ShaderStageDesc {
                stage: vk::ShaderStageFlags::FRAGMENT,
                module: fragment_module,
                entry_point: SHADER_ENTRY_POINT,
            },
        ],
        vertex_bindings: vec![],
        vertex_attributes: vec![],
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        primitive_restart_enable: false,
        viewport: viewport(extent),
        scissor: scissor(extent),
        rasterization: rasterization_state(),
        multisample: multisample_state(),
        color_blend: color_blend_state(),
        layout,
        render_pass,
        subpass: 0,
    };

    match driver.create_graphics_pipeline(&desc) {
        Ok(pipeline) => Ok(GraphicsPipeline { pipeline, layout }),
        Err(err) => {
            driver.destroy_pipeline_layout(layout);
            Err(crate::PipelineError::FailedCreatePipeline(err).into())
        }
    }
}
