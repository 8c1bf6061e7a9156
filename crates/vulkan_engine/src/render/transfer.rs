//! One-shot GPU transfer operations: staging uploads and layout transitions.
//!
//! Uploads follow the classic staging pattern. Data is written into a
//! host-visible staging buffer, a transient command buffer copies it into
//! device-local memory, and the queue is drained before the staging buffer is
//! freed. Every transfer here is synchronous; nothing in the frame loop runs
//! concurrently with an upload.

use ash::vk;

use crate::render::allocator::{BufferKey, BufferUsage, ImageKey, ResourceAllocator};
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// Pipeline barrier parameters for a supported layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier masks for the layout transitions the renderer performs.
///
/// Only three transitions ever happen: preparing an image as a copy target,
/// handing a copied texture to the fragment shader, and initializing the
/// depth attachment. Anything else is rejected.
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> VulkanResult<TransitionMasks> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => {
            Ok(TransitionMasks {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            })
        }
        _ => Err(VulkanError::UnsupportedLayoutTransition {
            old: old_layout,
            new: new_layout,
        }),
    }
}

/// Executes synchronous transfers on the graphics queue.
pub struct Transfer {
    device: ash::Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
}

impl Transfer {
    /// Create a transient command pool on the context's queue family.
    pub fn new(context: &VulkanContext) -> VulkanResult<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(context.device.queue_family);

        let device = context.raw_device();
        let command_pool = unsafe {
            device
                .create_command_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            queue: context.queue(),
            command_pool,
        })
    }

    /// Upload raw bytes into a new device-local buffer via staging.
    pub fn upload_buffer(
        &self,
        allocator: &mut ResourceAllocator,
        data: &[u8],
        usage: BufferUsage,
    ) -> VulkanResult<BufferKey> {
        let size = data.len() as vk::DeviceSize;
        let key = allocator.create_device_buffer(size, usage)?;

        let (staging, mut staging_alloc) = allocator.create_staging_buffer(size)?;
        allocator.write_allocation(&mut staging_alloc, data)?;

        let result = (|| {
            let cmd = self.begin_one_shot()?;
            let region = vk::BufferCopy::builder().size(size).build();
            unsafe {
                self.device
                    .cmd_copy_buffer(cmd, staging, allocator.buffer(key)?.buffer, &[region]);
            }
            self.submit_one_shot(cmd)
        })();
        allocator.destroy_staging_buffer(staging, staging_alloc);
        result?;

        log::debug!("uploaded {size} byte {usage:?} buffer");
        Ok(key)
    }

    /// Upload RGBA8 pixels into a new sampled texture image.
    ///
    /// The image is left in `SHADER_READ_ONLY_OPTIMAL`, ready for descriptor
    /// binding.
    pub fn upload_image(
        &self,
        allocator: &mut ResourceAllocator,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> VulkanResult<ImageKey> {
        let key = allocator.create_device_image(
            width,
            height,
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        )?;

        let size = pixels.len() as vk::DeviceSize;
        let (staging, mut staging_alloc) = allocator.create_staging_buffer(size)?;
        allocator.write_allocation(&mut staging_alloc, pixels)?;

        let result = (|| {
            self.transition_image_layout(
                allocator,
                key,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let cmd = self.begin_one_shot()?;
            let region = vk::BufferImageCopy::builder()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                })
                .build();
            unsafe {
                self.device.cmd_copy_buffer_to_image(
                    cmd,
                    staging,
                    allocator.image(key)?.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }
            self.submit_one_shot(cmd)?;

            self.transition_image_layout(
                allocator,
                key,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        })();
        allocator.destroy_staging_buffer(staging, staging_alloc);
        result?;

        log::debug!("uploaded {width}x{height} texture");
        Ok(key)
    }

    /// Create a depth attachment image and transition it to its render layout.
    pub fn create_depth_image(
        &self,
        allocator: &mut ResourceAllocator,
        width: u32,
        height: u32,
        format: vk::Format,
    ) -> VulkanResult<ImageKey> {
        let key = allocator.create_device_image(
            width,
            height,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        )?;

        self.transition_image_layout(
            allocator,
            key,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        )?;

        Ok(key)
    }

    /// Record and execute a pipeline barrier switching an image's layout.
    fn transition_image_layout(
        &self,
        allocator: &mut ResourceAllocator,
        key: ImageKey,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> VulkanResult<()> {
        let masks = transition_masks(old_layout, new_layout)?;
        let image = allocator.image(key)?;

        let aspect_mask = if new_layout == vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::COLOR
        };

        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(masks.src_access)
            .dst_access_mask(masks.dst_access)
            .build();

        let cmd = self.begin_one_shot()?;
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                masks.src_stage,
                masks.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        self.submit_one_shot(cmd)?;

        allocator.set_image_layout(key, new_layout)
    }

    /// Allocate and begin a single-use command buffer.
    fn begin_one_shot(&self) -> VulkanResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let cmd = unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?[0]
        };

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        Ok(cmd)
    }

    /// End, submit, and wait for a single-use command buffer, then free it.
    fn submit_one_shot(&self, cmd: vk::CommandBuffer) -> VulkanResult<()> {
        unsafe {
            self.device
                .end_command_buffer(cmd)
                .map_err(VulkanError::Api)?;

            let buffers = [cmd];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&buffers).build();
            self.device
                .queue_submit(self.queue, &[submit_info], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            self.device
                .queue_wait_idle(self.queue)
                .map_err(VulkanError::Api)?;

            self.device.free_command_buffers(self.command_pool, &buffers);
        }
        Ok(())
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_copy_destination_preparation() {
        let masks = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn supports_sampled_texture_handoff() {
        let masks = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn supports_depth_attachment_initialization() {
        let masks = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        )
        .unwrap();
        assert_eq!(
            masks.dst_access,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        );
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS);
    }

    #[test]
    fn rejects_unknown_transitions() {
        let result = transition_masks(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        assert!(matches!(
            result,
            Err(VulkanError::UnsupportedLayoutTransition { .. })
        ));
    }

    #[test]
    fn rejects_present_layout() {
        assert!(transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::PRESENT_SRC_KHR
        )
        .is_err());
    }
}
