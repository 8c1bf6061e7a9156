//! GPU memory ownership: buffers and images backed by a VMA allocator.
//!
//! Every memory-backed Vulkan object in the renderer is created through
//! [`ResourceAllocator`] and destroyed exactly once by its teardown. Creation
//! returns typed keys ([`BufferKey`] / [`ImageKey`]); resolving a stale key is
//! a programming error reported as [`VulkanError::ResourceNotFound`], not a
//! recoverable condition.
//!
//! Teardown must only run after the GPU has finished all work referencing
//! these resources; the renderer guarantees that with a full device wait.

use ash::vk;
use slotmap::{new_key_type, SlotMap};
use vk_mem::Alloc;

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

new_key_type! {
    /// Handle to a buffer owned by the allocator.
    pub struct BufferKey;
    /// Handle to an image owned by the allocator.
    pub struct ImageKey;
}

/// What a device buffer is for. Determines its Vulkan usage bits; the
/// transfer-destination bit is added by the upload path where needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex attribute data
    Vertex,
    /// Index data
    Index,
    /// Shader-visible uniform data, host-writable every frame
    Uniform,
}

impl BufferUsage {
    pub fn flags(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }
}

/// A buffer and the allocation backing it.
pub struct GpuBuffer {
    /// Vulkan buffer handle
    pub buffer: vk::Buffer,
    /// Size in bytes
    pub size: vk::DeviceSize,
    /// Usage bits the buffer was created with
    pub usage: vk::BufferUsageFlags,
    allocation: vk_mem::Allocation,
}

/// An image and the allocation backing it.
pub struct GpuImage {
    /// Vulkan image handle
    pub image: vk::Image,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: vk::Format,
    /// Layout the image was last transitioned to
    pub layout: vk::ImageLayout,
    allocation: vk_mem::Allocation,
}

/// Owner of all memory-backed GPU resources.
pub struct ResourceAllocator {
    allocator: vk_mem::Allocator,
    buffers: SlotMap<BufferKey, GpuBuffer>,
    images: SlotMap<ImageKey, GpuImage>,
}

impl ResourceAllocator {
    /// Create the underlying VMA allocator for the context's device.
    pub fn new(context: &VulkanContext) -> VulkanResult<Self> {
        let create_info = vk_mem::AllocatorCreateInfo::new(
            &context.instance.instance,
            &context.device.device,
            context.physical_device.device,
        );
        let allocator = vk_mem::Allocator::new(create_info).map_err(VulkanError::Api)?;

        Ok(Self {
            allocator,
            buffers: SlotMap::with_key(),
            images: SlotMap::with_key(),
        })
    }

    /// Allocate a device-local buffer and register it.
    ///
    /// The buffer starts empty; the upload pipeline fills it through a
    /// staging copy (hence the transfer-destination bit).
    pub fn create_device_buffer(
        &mut self,
        size: vk::DeviceSize,
        usage: BufferUsage,
    ) -> VulkanResult<BufferKey> {
        let usage_flags = usage.flags() | vk::BufferUsageFlags::TRANSFER_DST;
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage_flags)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };

        let (buffer, allocation) = unsafe {
            self.allocator
                .create_buffer(&buffer_info, &alloc_info)
                .map_err(VulkanError::Api)?
        };

        let key = self.buffers.insert(GpuBuffer {
            buffer,
            size,
            usage: usage_flags,
            allocation,
        });
        log::debug!("created device buffer {key:?} ({size} bytes, {usage:?})");
        Ok(key)
    }

    /// Allocate a host-visible uniform buffer and register it.
    ///
    /// Mapped and rewritten by the frame loop; never staged.
    pub fn create_uniform_buffer(&mut self, size: vk::DeviceSize) -> VulkanResult<BufferKey> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::UNIFORM_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferHost,
            flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
            ..Default::default()
        };

        let (buffer, allocation) = unsafe {
            self.allocator
                .create_buffer(&buffer_info, &alloc_info)
                .map_err(VulkanError::Api)?
        };

        let key = self.buffers.insert(GpuBuffer {
            buffer,
            size,
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            allocation,
        });
        log::debug!("created uniform buffer {key:?} ({size} bytes)");
        Ok(key)
    }

    /// Allocate a device-local 2D image and register it.
    pub fn create_device_image(
        &mut self,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> VulkanResult<ImageKey> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };

        let (image, allocation) = unsafe {
            self.allocator
                .create_image(&image_info, &alloc_info)
                .map_err(VulkanError::Api)?
        };

        let key = self.images.insert(GpuImage {
            image,
            width,
            height,
            format,
            layout: vk::ImageLayout::UNDEFINED,
            allocation,
        });
        log::debug!("created image {key:?} ({width}x{height}, {format:?})");
        Ok(key)
    }

    /// Allocate an unregistered host-visible staging buffer.
    ///
    /// Staging buffers are transient; the upload pipeline destroys them with
    /// [`Self::destroy_staging_buffer`] as soon as the copy has completed.
    pub fn create_staging_buffer(
        &mut self,
        size: vk::DeviceSize,
    ) -> VulkanResult<(vk::Buffer, vk_mem::Allocation)> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let alloc_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferHost,
            flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
            ..Default::default()
        };

        unsafe {
            self.allocator
                .create_buffer(&buffer_info, &alloc_info)
                .map_err(VulkanError::Api)
        }
    }

    /// Fill a host-visible allocation: map, copy, unmap.
    pub fn write_allocation(
        &self,
        allocation: &mut vk_mem::Allocation,
        data: &[u8],
    ) -> VulkanResult<()> {
        unsafe {
            let ptr = self
                .allocator
                .map_memory(allocation)
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
            self.allocator.unmap_memory(allocation);
        }
        Ok(())
    }

    /// Destroy a transient staging buffer.
    pub fn destroy_staging_buffer(
        &mut self,
        buffer: vk::Buffer,
        mut allocation: vk_mem::Allocation,
    ) {
        unsafe {
            self.allocator.destroy_buffer(buffer, &mut allocation);
        }
    }

    /// Look up a registered buffer.
    pub fn buffer(&self, key: BufferKey) -> VulkanResult<&GpuBuffer> {
        self.buffers.get(key).ok_or(VulkanError::ResourceNotFound)
    }

    /// Look up a registered image.
    pub fn image(&self, key: ImageKey) -> VulkanResult<&GpuImage> {
        self.images.get(key).ok_or(VulkanError::ResourceNotFound)
    }

    /// Record an image's new layout after an executed transition.
    pub fn set_image_layout(&mut self, key: ImageKey, layout: vk::ImageLayout) -> VulkanResult<()> {
        let image = self
            .images
            .get_mut(key)
            .ok_or(VulkanError::ResourceNotFound)?;
        image.layout = layout;
        Ok(())
    }

    /// Map a registered host-visible buffer for writing.
    pub fn map_buffer(&mut self, key: BufferKey) -> VulkanResult<*mut u8> {
        let buffer = self
            .buffers
            .get_mut(key)
            .ok_or(VulkanError::ResourceNotFound)?;
        unsafe {
            self.allocator
                .map_memory(&mut buffer.allocation)
                .map_err(VulkanError::Api)
        }
    }

    /// Unmap a buffer previously mapped with [`Self::map_buffer`].
    pub fn unmap_buffer(&mut self, key: BufferKey) -> VulkanResult<()> {
        let buffer = self
            .buffers
            .get_mut(key)
            .ok_or(VulkanError::ResourceNotFound)?;
        unsafe {
            self.allocator.unmap_memory(&mut buffer.allocation);
        }
        Ok(())
    }

    /// Destroy every registered buffer and image.
    ///
    /// Drains the registries, so a second call iterates nothing; the caller
    /// must have waited for device idle first.
    pub fn destroy_all(&mut self) {
        for (key, mut buffer) in self.buffers.drain() {
            log::debug!("destroying buffer {key:?}");
            unsafe {
                self.allocator
                    .destroy_buffer(buffer.buffer, &mut buffer.allocation);
            }
        }
        for (key, mut image) in self.images.drain() {
            log::debug!("destroying image {key:?}");
            unsafe {
                self.allocator
                    .destroy_image(image.image, &mut image.allocation);
            }
        }
    }
}

impl Drop for ResourceAllocator {
    fn drop(&mut self) {
        // No-op if the renderer already tore down explicitly
        self.destroy_all();
        // The vk_mem::Allocator itself drops after the registries are empty
    }
}
