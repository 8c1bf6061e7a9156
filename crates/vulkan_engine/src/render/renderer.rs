//! Frame orchestration: owns every GPU resource and drives the render loop.
//!
//! Initialization uploads all mesh and texture data, builds the swapchain and
//! pipeline, and records one command buffer per swapchain image. After that a
//! frame is: update the uniform buffer, acquire an image, submit its
//! prerecorded command buffer, present, and wait for the device to go idle.
//! The idle wait makes the single uniform buffer and prerecorded command
//! buffers safe to reuse without per-frame fences.

use std::path::Path;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Rotation3, Vector3};

use crate::assets::MeshData;
use crate::render::allocator::{BufferKey, BufferUsage, ResourceAllocator};
use crate::render::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::pipeline::{Descriptors, Pipeline};
use crate::render::render_pass::RenderPass;
use crate::render::swapchain::Swapchain;
use crate::render::sync::FrameSync;
use crate::render::transfer::Transfer;

/// Depth attachment format; universally supported for depth-only use.
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Per-frame shader constants, std140-compatible.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct UniformData {
    mvp: [[f32; 4]; 4],
}

/// A mesh resident on the GPU.
pub struct GpuMesh {
    /// Vertex buffer key
    pub vertex_buffer: BufferKey,
    /// Index buffer key (u32 indices)
    pub index_buffer: BufferKey,
    /// Number of indices to draw
    pub index_count: u32,
    /// Number of instances to draw; instancing is unused, so always 1
    pub instance_count: u32,
}

/// Indexed draw parameters for a CPU mesh: every index, a single instance.
pub fn draw_params(mesh: &MeshData) -> (u32, u32) {
    (mesh.indices.len() as u32, 1)
}

/// Perspective projection with the Y axis flipped for Vulkan clip space.
pub fn build_projection(aspect: f32) -> Matrix4<f32> {
    let mut proj = Matrix4::new_perspective(aspect, 45.0_f32.to_radians(), 0.1, 500.0);
    proj[(1, 1)] *= -1.0;
    proj
}

/// Animated model transform: the mesh orbits a point two units out while
/// spinning on its own axis, tilted upright.
pub fn build_model(elapsed: f32) -> Matrix4<f32> {
    let upright = Rotation3::from_axis_angle(&Vector3::x_axis(), 90.0_f32.to_radians());
    let orbit = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.8 * elapsed);
    let spin = Rotation3::from_axis_angle(&Vector3::z_axis(), 3.0 * elapsed);
    let offset = Matrix4::new_translation(&Vector3::new(2.0, 0.0, 0.0));

    upright.to_homogeneous() * orbit.to_homogeneous() * offset * spin.to_homogeneous()
}

/// Combined model-view-projection matrix for the current frame.
pub fn compute_mvp(view: &Matrix4<f32>, aspect: f32, elapsed: f32) -> Matrix4<f32> {
    build_projection(aspect) * view * build_model(elapsed)
}

/// Owns the Vulkan context and everything created from it.
///
/// Field order is teardown order: synchronization and pipeline state go
/// first, memory-backed resources are drained before the allocator, and the
/// context is destroyed last.
pub struct Renderer {
    sync: FrameSync,
    pipeline: Pipeline,
    descriptors: Descriptors,
    render_pass: RenderPass,
    swapchain: Swapchain,
    transfer: Transfer,
    allocator: ResourceAllocator,
    context: VulkanContext,

    device: ash::Device,
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    texture_view: vk::ImageView,
    depth_view: vk::ImageView,
    meshes: Vec<GpuMesh>,
    uniform_buffer: BufferKey,
    extent: vk::Extent2D,
}

impl Renderer {
    /// Upload the scene and build all rendering state.
    ///
    /// `meshes` are drawn in order every frame, all sharing the one texture
    /// and uniform buffer.
    pub fn new(
        context: VulkanContext,
        framebuffer_width: u32,
        framebuffer_height: u32,
        meshes: &[MeshData],
        texture_pixels: &[u8],
        texture_width: u32,
        texture_height: u32,
        vertex_shader: &Path,
        fragment_shader: &Path,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let mut allocator = ResourceAllocator::new(&context)?;
        let transfer = Transfer::new(&context)?;

        let mut gpu_meshes = Vec::with_capacity(meshes.len());
        for mesh in meshes {
            let vertex_buffer = transfer.upload_buffer(
                &mut allocator,
                bytemuck::cast_slice(&mesh.vertices),
                BufferUsage::Vertex,
            )?;
            let index_buffer = transfer.upload_buffer(
                &mut allocator,
                bytemuck::cast_slice(&mesh.indices),
                BufferUsage::Index,
            )?;
            let (index_count, instance_count) = draw_params(mesh);
            gpu_meshes.push(GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count,
                instance_count,
            });
        }
        log::info!("uploaded {} meshes", gpu_meshes.len());

        let texture =
            transfer.upload_image(&mut allocator, texture_pixels, texture_width, texture_height)?;
        let texture_view = create_image_view(
            &device,
            allocator.image(texture)?.image,
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageAspectFlags::COLOR,
        )?;

        let swapchain = Swapchain::new(&context, framebuffer_width, framebuffer_height)?;
        let extent = swapchain.extent;

        let depth_image = transfer.create_depth_image(
            &mut allocator,
            extent.width,
            extent.height,
            DEPTH_FORMAT,
        )?;
        let depth_view = create_image_view(
            &device,
            allocator.image(depth_image)?.image,
            DEPTH_FORMAT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        let render_pass = RenderPass::new(
            &context,
            swapchain.format,
            DEPTH_FORMAT,
            extent,
            &swapchain.image_views,
            depth_view,
        )?;

        let uniform_size = std::mem::size_of::<UniformData>() as vk::DeviceSize;
        let uniform_buffer = allocator.create_uniform_buffer(uniform_size)?;

        let descriptors = Descriptors::new(
            &context,
            allocator.buffer(uniform_buffer)?.buffer,
            uniform_size,
            texture_view,
        )?;

        let pipeline = Pipeline::new(
            &context,
            render_pass.render_pass,
            extent,
            descriptors.layout,
            vertex_shader,
            fragment_shader,
        )?;

        let (command_pool, command_buffers) = record_command_buffers(
            &device,
            &context,
            &allocator,
            &render_pass,
            &pipeline,
            &descriptors,
            &gpu_meshes,
            extent,
        )?;

        let sync = FrameSync::new(&context)?;

        log::info!("renderer initialized");

        Ok(Self {
            sync,
            pipeline,
            descriptors,
            render_pass,
            swapchain,
            transfer,
            allocator,
            context,
            device,
            command_pool,
            command_buffers,
            texture_view,
            depth_view,
            meshes: gpu_meshes,
            uniform_buffer,
            extent,
        })
    }

    /// Aspect ratio of the render target.
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height as f32
    }

    /// Meshes drawn each frame.
    pub fn meshes(&self) -> &[GpuMesh] {
        &self.meshes
    }

    /// Write this frame's transform into the uniform buffer.
    pub fn update_uniform(&mut self, view: &Matrix4<f32>, elapsed: f32) -> VulkanResult<()> {
        let mvp = compute_mvp(view, self.aspect_ratio(), elapsed);
        let data = UniformData { mvp: mvp.into() };

        let bytes = bytemuck::bytes_of(&data);
        let ptr = self.allocator.map_buffer(self.uniform_buffer)?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        }
        self.allocator.unmap_buffer(self.uniform_buffer)
    }

    /// Render and present one frame, then wait for the device to drain.
    pub fn draw_frame(&mut self) -> VulkanResult<()> {
        let image_index = self
            .swapchain
            .acquire_next_image(self.sync.image_available.semaphore)?;

        let wait_semaphores = [self.sync.image_available.semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.sync.render_finished.semaphore];
        let buffers = [self.command_buffers[image_index as usize]];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.device
                .queue_submit(self.context.queue(), &[submit_info], vk::Fence::null())
                .map_err(VulkanError::Api)?;
        }

        self.swapchain.present(
            self.context.queue(),
            image_index,
            self.sync.render_finished.semaphore,
        )?;

        // Drains the queue so next frame can rewrite the uniform buffer and
        // resubmit the same command buffers
        self.context.wait_idle()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.context.wait_idle();
        unsafe {
            self.device.destroy_image_view(self.texture_view, None);
            self.device.destroy_image_view(self.depth_view, None);
            self.device.destroy_command_pool(self.command_pool, None);
        }
        self.allocator.destroy_all();
        // Remaining fields drop in declaration order, context last
    }
}

fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> VulkanResult<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });
    unsafe {
        device
            .create_image_view(&view_info, None)
            .map_err(VulkanError::Api)
    }
}

/// Record one reusable command buffer per framebuffer: clear, bind the
/// pipeline and descriptor set, draw every mesh.
#[allow(clippy::too_many_arguments)]
fn record_command_buffers(
    device: &ash::Device,
    context: &VulkanContext,
    allocator: &ResourceAllocator,
    render_pass: &RenderPass,
    pipeline: &Pipeline,
    descriptors: &Descriptors,
    meshes: &[GpuMesh],
    extent: vk::Extent2D,
) -> VulkanResult<(vk::CommandPool, Vec<vk::CommandBuffer>)> {
    let pool_info =
        vk::CommandPoolCreateInfo::builder().queue_family_index(context.device.queue_family);
    let command_pool = unsafe {
        device
            .create_command_pool(&pool_info, None)
            .map_err(VulkanError::Api)?
    };

    let alloc_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(render_pass.framebuffers.len() as u32);
    let command_buffers = unsafe {
        device
            .allocate_command_buffers(&alloc_info)
            .map_err(VulkanError::Api)?
    };

    let clear_values = [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ];

    for (&cmd, &framebuffer) in command_buffers.iter().zip(&render_pass.framebuffers) {
        let begin_info = vk::CommandBufferBeginInfo::builder();
        unsafe {
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(VulkanError::Api)?;

            let pass_begin = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass.render_pass)
                .framebuffer(framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(cmd, &pass_begin, vk::SubpassContents::INLINE);
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                0,
                &[descriptors.set],
                &[],
            );

            for mesh in meshes {
                let vertex_buffer = allocator.buffer(mesh.vertex_buffer)?.buffer;
                let index_buffer = allocator.buffer(mesh.index_buffer)?.buffer;
                device.cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer], &[0]);
                device.cmd_bind_index_buffer(cmd, index_buffer, 0, vk::IndexType::UINT32);
                device.cmd_draw_indexed(cmd, mesh.index_count, mesh.instance_count, 0, 0, 0);
            }

            device.cmd_end_render_pass(cmd);
            device
                .end_command_buffer(cmd)
                .map_err(VulkanError::Api)?;
        }
    }

    Ok((command_pool, command_buffers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vertex::Vertex;
    use approx::assert_relative_eq;

    #[test]
    fn single_triangle_draws_three_indices_one_instance() {
        let mesh = MeshData {
            vertices: vec![
                Vertex {
                    position: [0.0, 0.0, 0.0],
                    color: [1.0, 1.0, 1.0],
                    tex_coord: [0.0, 0.0],
                },
                Vertex {
                    position: [1.0, 0.0, 0.0],
                    color: [1.0, 1.0, 1.0],
                    tex_coord: [1.0, 0.0],
                },
                Vertex {
                    position: [0.0, 1.0, 0.0],
                    color: [1.0, 1.0, 1.0],
                    tex_coord: [0.0, 1.0],
                },
            ],
            indices: vec![0, 1, 2],
        };
        assert_eq!(draw_params(&mesh), (3, 1));
    }

    #[test]
    fn reference_quads_draw_all_fifteen_indices() {
        assert_eq!(draw_params(&MeshData::reference_quads()), (15, 1));
    }

    #[test]
    fn projection_flips_y_for_vulkan() {
        let proj = build_projection(640.0 / 480.0);
        assert!(proj[(1, 1)] < 0.0);
    }

    #[test]
    fn model_transform_animates_over_time() {
        let a = build_model(0.0);
        let b = build_model(1.0);
        assert!(a != b);
    }

    #[test]
    fn model_keeps_orbit_radius() {
        // The mesh origin stays two units from the orbit center at any time
        for &t in &[0.0_f32, 0.7, 2.3] {
            let origin = build_model(t).transform_point(&nalgebra::Point3::origin());
            let distance = nalgebra::Vector3::new(origin.x, origin.y, origin.z).norm();
            assert_relative_eq!(distance, 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn mvp_composes_projection_view_model() {
        let view = Matrix4::identity();
        let mvp = compute_mvp(&view, 1.0, 0.0);
        let expected = build_projection(1.0) * build_model(0.0);
        assert_relative_eq!(mvp, expected, epsilon = 1e-6);
    }
}
