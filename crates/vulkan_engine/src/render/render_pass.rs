//! Render pass and framebuffer setup.
//!
//! A single subpass with two attachments: the swapchain color image, cleared
//! and finally transitioned for presentation, and a shared depth attachment
//! cleared each frame.

use ash::vk;

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// The renderer's only render pass and its per-swapchain-image framebuffers.
pub struct RenderPass {
    /// Render pass handle
    pub render_pass: vk::RenderPass,
    /// One framebuffer per swapchain image view
    pub framebuffers: Vec<vk::Framebuffer>,
    device: ash::Device,
}

impl RenderPass {
    /// Build the pass and a framebuffer for every swapchain image view, all
    /// sharing a single depth attachment view.
    pub fn new(
        context: &VulkanContext,
        color_format: vk::Format,
        depth_format: vk::Format,
        extent: vk::Extent2D,
        color_views: &[vk::ImageView],
        depth_view: vk::ImageView,
    ) -> VulkanResult<Self> {
        let color_attachment = vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();

        let depth_attachment = vk::AttachmentDescription::builder()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let color_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let color_refs = [color_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)
            .build();

        // Delays color writes until the acquired image is actually ready
        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build();

        let attachments = [color_attachment, depth_attachment];
        let subpasses = [subpass];
        let dependencies = [dependency];
        let pass_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let device = context.raw_device();
        let render_pass = unsafe {
            device
                .create_render_pass(&pass_info, None)
                .map_err(VulkanError::Api)?
        };

        let mut framebuffers = Vec::with_capacity(color_views.len());
        for &color_view in color_views {
            let fb_attachments = [color_view, depth_view];
            let fb_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&fb_attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer = unsafe {
                device
                    .create_framebuffer(&fb_info, None)
                    .map_err(VulkanError::Api)?
            };
            framebuffers.push(framebuffer);
        }

        log::debug!("render pass with {} framebuffers", framebuffers.len());

        Ok(Self {
            render_pass,
            framebuffers,
            device,
        })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
