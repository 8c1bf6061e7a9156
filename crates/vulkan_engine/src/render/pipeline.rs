//! Shader modules, descriptor plumbing, and the fixed graphics pipeline.
//!
//! The pipeline is built once against a fixed framebuffer extent; there is no
//! dynamic state and no pipeline cache. Shader modules only live long enough
//! to create the pipeline.

use std::ffi::CStr;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use ash::util::read_spv;
use ash::vk;

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vertex::Vertex;

const SHADER_ENTRY: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// A compiled SPIR-V shader module.
pub struct ShaderModule {
    /// Shader module handle
    pub module: vk::ShaderModule,
    device: ash::Device,
}

impl ShaderModule {
    /// Load a SPIR-V binary from disk.
    pub fn from_file(context: &VulkanContext, path: &Path) -> VulkanResult<Self> {
        let mut file = File::open(path)
            .map_err(|_| VulkanError::ShaderNotFound(path.display().to_string()))?;

        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut bytes)
            .map_err(|e| VulkanError::InitializationFailed(format!("reading shader: {e}")))?;

        Self::from_bytes(context, &bytes).map_err(|e| {
            log::error!("invalid shader binary {}: {e}", path.display());
            e
        })
    }

    /// Create a module from SPIR-V bytes, validating size and alignment.
    pub fn from_bytes(context: &VulkanContext, bytes: &[u8]) -> VulkanResult<Self> {
        let words = read_spv(&mut Cursor::new(bytes))
            .map_err(|e| VulkanError::InitializationFailed(format!("malformed SPIR-V: {e}")))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
        let device = context.raw_device();
        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { module, device })
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Descriptor set layout, pool, the single descriptor set, and the texture
/// sampler it references.
pub struct Descriptors {
    /// Set layout: binding 0 uniform buffer, binding 1 combined image sampler
    pub layout: vk::DescriptorSetLayout,
    /// The one descriptor set bound every draw
    pub set: vk::DescriptorSet,
    pool: vk::DescriptorPool,
    sampler: vk::Sampler,
    device: ash::Device,
}

impl Descriptors {
    /// Allocate and write the renderer's single descriptor set.
    pub fn new(
        context: &VulkanContext,
        uniform_buffer: vk::Buffer,
        uniform_size: vk::DeviceSize,
        texture_view: vk::ImageView,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();

        let bindings = [
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
        ];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 1,
            },
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(1);
        let pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let set = unsafe {
            device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?[0]
        };

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .compare_op(vk::CompareOp::ALWAYS);
        let sampler = unsafe {
            device
                .create_sampler(&sampler_info, None)
                .map_err(VulkanError::Api)?
        };

        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: uniform_buffer,
            offset: 0,
            range: uniform_size,
        }];
        let image_info = [vk::DescriptorImageInfo {
            sampler,
            image_view: texture_view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let writes = [
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_info)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info)
                .build(),
        ];
        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }

        Ok(Self {
            layout,
            set,
            pool,
            sampler,
            device,
        })
    }
}

impl Drop for Descriptors {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_descriptor_pool(self.pool, None);
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// The graphics pipeline and its layout.
pub struct Pipeline {
    /// Pipeline handle
    pub pipeline: vk::Pipeline,
    /// Pipeline layout referencing the descriptor set layout
    pub layout: vk::PipelineLayout,
    device: ash::Device,
}

impl Pipeline {
    /// Build the fixed-function pipeline: triangle list, filled polygons, no
    /// culling, depth test and write enabled, no blending, viewport baked to
    /// the swapchain extent.
    pub fn new(
        context: &VulkanContext,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        descriptor_layout: vk::DescriptorSetLayout,
        vertex_shader: &Path,
        fragment_shader: &Path,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();

        let vert = ShaderModule::from_file(context, vertex_shader)?;
        let frag = ShaderModule::from_file(context, fragment_shader)?;

        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vert.module)
                .name(SHADER_ENTRY)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(frag.module)
                .name(SHADER_ENTRY)
                .build(),
        ];

        let binding_descriptions = [Vertex::binding_description()];
        let attribute_descriptions = Vertex::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .build()];
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::builder().attachments(&blend_attachments);

        let set_layouts = [descriptor_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        let pipeline = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| VulkanError::Api(e))?[0]
        };

        log::debug!("graphics pipeline built for {}x{}", extent.width, extent.height);

        // vert and frag drop here; the pipeline keeps its own copy of the code
        Ok(Self {
            pipeline,
            layout,
            device,
        })
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
