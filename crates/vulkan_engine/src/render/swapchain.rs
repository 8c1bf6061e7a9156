//! Swapchain creation and surface capability negotiation.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// Pick the surface format for the swapchain.
///
/// Prefers linear BGRA with an sRGB color space; falls back to whatever the
/// surface lists first. `None` only for an empty list, which a conformant
/// surface never reports.
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .copied()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_UNORM
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first().copied())
}

/// Pick the presentation mode: mailbox if available, then immediate, then
/// FIFO, which Vulkan guarantees every surface supports.
pub fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else if available.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Request one image more than the minimum, clamped to the surface maximum.
/// A maximum of zero means unbounded.
pub fn negotiate_image_count(min_count: u32, max_count: u32) -> u32 {
    let requested = min_count + 1;
    if max_count > 0 && requested > max_count {
        max_count
    } else {
        requested
    }
}

/// Clamp the window's framebuffer size to the surface limits, unless the
/// surface dictates an exact extent.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_width: u32,
    framebuffer_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: framebuffer_width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: framebuffer_height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// The swapchain, its images, and one view per image.
pub struct Swapchain {
    /// Swapchain handle
    pub swapchain: vk::SwapchainKHR,
    /// Images owned by the swapchain
    pub images: Vec<vk::Image>,
    /// One view per swapchain image
    pub image_views: Vec<vk::ImageView>,
    /// Negotiated color format
    pub format: vk::Format,
    /// Negotiated image extent
    pub extent: vk::Extent2D,
    device: ash::Device,
    loader: SwapchainLoader,
}

impl Swapchain {
    /// Create a swapchain sized to the window's framebuffer.
    pub fn new(
        context: &VulkanContext,
        framebuffer_width: u32,
        framebuffer_height: u32,
    ) -> VulkanResult<Self> {
        let physical = context.physical_device.device;
        let surface = context.surface;

        let (capabilities, formats, present_modes) = unsafe {
            (
                context
                    .surface_loader
                    .get_physical_device_surface_capabilities(physical, surface)
                    .map_err(VulkanError::Api)?,
                context
                    .surface_loader
                    .get_physical_device_surface_formats(physical, surface)
                    .map_err(VulkanError::Api)?,
                context
                    .surface_loader
                    .get_physical_device_surface_present_modes(physical, surface)
                    .map_err(VulkanError::Api)?,
            )
        };

        let surface_format = choose_surface_format(&formats).ok_or_else(|| {
            VulkanError::InitializationFailed("surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&capabilities, framebuffer_width, framebuffer_height);
        let image_count =
            negotiate_image_count(capabilities.min_image_count, capabilities.max_image_count);

        log::info!(
            "swapchain: {}x{} {:?} {:?}, {} images",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
            image_count
        );

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let loader = context.device.swapchain_loader.clone();
        let device = context.raw_device();

        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };
        let images = unsafe {
            loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe {
                device
                    .create_image_view(&view_info, None)
                    .map_err(VulkanError::Api)?
            };
            image_views.push(view);
        }

        Ok(Self {
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
            device,
            loader,
        })
    }

    /// Acquire the next presentable image, blocking until one is available.
    pub fn acquire_next_image(&self, signal: vk::Semaphore) -> VulkanResult<u32> {
        let (index, _suboptimal) = unsafe {
            self.loader
                .acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null())
                .map_err(VulkanError::Api)?
        };
        Ok(index)
    }

    /// Queue the image for presentation once `wait` is signaled.
    pub fn present(&self, queue: vk::Queue, index: u32, wait: vk::Semaphore) -> VulkanResult<()> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let indices = [index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe {
            self.loader
                .queue_present(queue, &present_info)
                .map_err(VulkanError::Api)?;
        }
        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn prefers_linear_bgra_srgb_colorspace() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [format(
            vk::Format::R16G16B16A16_SFLOAT,
            vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        )];
        assert_eq!(
            choose_surface_format(&formats).unwrap().format,
            vk::Format::R16G16B16A16_SFLOAT
        );
    }

    #[test]
    fn empty_format_list_selects_nothing() {
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn present_mode_preference_order() {
        assert_eq!(
            choose_present_mode(&[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
                vk::PresentModeKHR::IMMEDIATE,
            ]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn image_count_is_min_plus_one() {
        assert_eq!(negotiate_image_count(2, 0), 3);
        assert_eq!(negotiate_image_count(2, 8), 3);
    }

    #[test]
    fn image_count_clamps_to_maximum() {
        assert_eq!(negotiate_image_count(3, 3), 3);
        assert_eq!(negotiate_image_count(1, 1), 1);
    }

    #[test]
    fn extent_honors_exact_surface_extent() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 640,
                height: 480,
            },
            ..Default::default()
        };
        let extent = choose_extent(&caps, 1920, 1080);
        assert_eq!(extent.width, 640);
        assert_eq!(extent.height, 480);
    }

    #[test]
    fn extent_clamps_framebuffer_size() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 320,
                height: 240,
            },
            max_image_extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            ..Default::default()
        };
        let extent = choose_extent(&caps, 4096, 100);
        assert_eq!(extent.width, 1280);
        assert_eq!(extent.height, 240);
    }
}
