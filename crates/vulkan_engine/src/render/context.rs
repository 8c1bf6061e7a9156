//! Vulkan bootstrap: instance, validation plumbing, device and queue selection.
//!
//! Everything here is created once at startup and owned by [`VulkanContext`],
//! which is passed by reference to every other render component. There is no
//! ambient global device state anywhere in the crate.

use std::ffi::{CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use thiserror::Error;

use crate::render::window::Window;

/// Errors raised by the render layer.
///
/// All variants are setup-phase errors: they propagate to the application
/// entry point, which reports them and exits. None of them are retried.
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Initialization-time failure with context
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Image layout transition outside the supported table
    #[error("Unsupported image layout transition: {old:?} -> {new:?}")]
    UnsupportedLayoutTransition {
        /// Layout the image is currently in
        old: vk::ImageLayout,
        /// Layout that was requested
        new: vk::ImageLayout,
    },

    /// A resource key did not resolve; this is a programming error
    #[error("GPU resource not found for the given handle")]
    ResourceNotFound,

    /// Precompiled shader binary missing on disk
    #[error("Shader binary not found: {0}")]
    ShaderNotFound(String),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    /// Debug utilities extension (debug builds)
    #[cfg(debug_assertions)]
    debug_utils: Option<DebugUtils>,
    /// Debug messenger handle (debug builds)
    #[cfg(debug_assertions)]
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    /// Create a new Vulkan instance, with validation layers in debug builds.
    pub fn new(window: &Window, app_name: &str) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            VulkanError::InitializationFailed(format!("failed to load Vulkan: {e:?}"))
        })?;

        let app_name_cstr = CString::new(app_name).unwrap();
        let engine_name_cstr = CString::new("vulkan_engine").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        // Window system tells us which surface extensions it needs
        let required_extensions = window.required_instance_extensions().map_err(|e| {
            VulkanError::InitializationFailed(format!("failed to query instance extensions: {e}"))
        })?;

        let cstr_extensions: Vec<CString> = required_extensions
            .iter()
            .map(|ext| CString::new(ext.as_str()).unwrap())
            .collect();

        #[allow(unused_mut)]
        let mut extensions: Vec<*const i8> =
            cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();

        #[cfg(debug_assertions)]
        extensions.push(DebugUtils::name().as_ptr());

        let layer_names = if cfg!(debug_assertions) {
            vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()]
        } else {
            vec![]
        };
        let layer_names_ptrs: Vec<*const i8> =
            layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names_ptrs);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        #[cfg(debug_assertions)]
        let (debug_utils, debug_messenger) = {
            let debug_utils = DebugUtils::new(&entry, &instance);
            let messenger = Self::setup_debug_messenger(&debug_utils)?;
            (Some(debug_utils), Some(messenger))
        };

        Ok(Self {
            entry,
            instance,
            #[cfg(debug_assertions)]
            debug_utils,
            #[cfg(debug_assertions)]
            debug_messenger,
        })
    }

    #[cfg(debug_assertions)]
    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            #[cfg(debug_assertions)]
            if let (Some(debug_utils), Some(debug_messenger)) =
                (&self.debug_utils, &self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(*debug_messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Validation layer callback.
///
/// Informational, warning, and performance messages are forwarded to the log
/// and do not interrupt execution. Error-severity messages additionally return
/// `vk::TRUE`, which fails the Vulkan call that triggered them; during setup
/// that surfaces as [`VulkanError::Api`] and aborts initialization.
#[cfg(debug_assertions)]
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let callback_data = *callback_data;
    let message = CStr::from_ptr(callback_data.p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
        return vk::TRUE;
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Physical device selection result.
///
/// The renderer runs everything on a single queue family that supports both
/// graphics and presentation on the created surface.
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Index of the combined graphics + present queue family
    pub queue_family: u32,
}

impl PhysicalDeviceInfo {
    /// Select a device with a queue family that can draw and present.
    pub fn select(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        for device in devices {
            let properties = unsafe { instance.get_physical_device_properties(device) };
            let queue_families =
                unsafe { instance.get_physical_device_queue_family_properties(device) };

            let mut present_support = |index: u32| unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, index, surface)
                    .unwrap_or(false)
            };

            if let Some(queue_family) =
                find_graphics_present_family(&queue_families, &mut present_support)
            {
                if !has_swapchain_extension(instance, device)? {
                    continue;
                }
                log::info!("Selected GPU: {}", unsafe {
                    CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy()
                });
                return Ok(Self {
                    device,
                    properties,
                    queue_family,
                });
            }
        }

        Err(VulkanError::InitializationFailed(
            "no GPU with a graphics queue family that can present to the surface".to_string(),
        ))
    }
}

/// First queue family with graphics support whose index also passes the
/// presentation check.
fn find_graphics_present_family(
    queue_families: &[vk::QueueFamilyProperties],
    present_support: &mut dyn FnMut(u32) -> bool,
) -> Option<u32> {
    queue_families.iter().enumerate().find_map(|(index, family)| {
        let index = index as u32;
        (family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && present_support(index))
            .then_some(index)
    })
}

fn has_swapchain_extension(instance: &Instance, device: vk::PhysicalDevice) -> VulkanResult<bool> {
    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(device)
            .map_err(VulkanError::Api)?
    };

    Ok(extensions.iter().any(|available| {
        let name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
        name == SwapchainLoader::name()
    }))
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Combined graphics + present queue
    pub queue: vk::Queue,
    /// Index of the queue family the queue belongs to
    pub queue_family: u32,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create the logical device with a single graphics/present queue.
    pub fn new(instance: &Instance, physical: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let queue_priorities = [1.0];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(physical.queue_family)
            .queue_priorities(&queue_priorities)
            .build();

        let required_extensions = [SwapchainLoader::name().as_ptr()];

        // Anisotropic sampling is used by the texture sampler
        let device_features = vk::PhysicalDeviceFeatures::builder().sampler_anisotropy(true);

        let queue_infos = [queue_info];
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe {
            instance
                .create_device(physical.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let queue = unsafe { device.get_device_queue(physical.queue_family, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            queue,
            queue_family: physical.queue_family,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Core Vulkan state shared by all render components.
///
/// Field order matters for teardown: the logical device must be destroyed
/// before the instance.
pub struct VulkanContext {
    /// Vulkan surface for the window
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader
    pub surface_loader: Surface,
    /// Selected physical device
    pub physical_device: PhysicalDeviceInfo,
    /// Logical device and queue
    pub device: LogicalDevice,
    /// Instance and debug plumbing
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Bootstrap Vulkan against an existing window.
    pub fn new(window: &mut Window, app_name: &str) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, app_name)?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("surface creation: {e}")))?;

        let physical_device =
            PhysicalDeviceInfo::select(&instance.instance, surface, &surface_loader)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        Ok(Self {
            surface,
            surface_loader,
            physical_device,
            device,
            instance,
        })
    }

    /// Raw `ash::Device` clone for components that store their own handle.
    pub fn raw_device(&self) -> Device {
        self.device.device.clone()
    }

    /// The graphics/present queue.
    pub fn queue(&self) -> vk::Queue {
        self.device.queue
    }

    /// Block until all submitted GPU work has completed.
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .device
                .device_wait_idle()
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            self.surface_loader.destroy_surface(self.surface, None);
        }
        // Remaining fields drop in declaration order: device before instance.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn picks_first_family_with_graphics_and_present() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];

        // All families can present
        let mut all = |_: u32| true;
        assert_eq!(find_graphics_present_family(&families, &mut all), Some(1));

        // Only the last family can present
        let mut last_only = |i: u32| i == 2;
        assert_eq!(
            find_graphics_present_family(&families, &mut last_only),
            Some(2)
        );
    }

    #[test]
    fn rejects_when_no_family_can_both_draw_and_present() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::TRANSFER),
        ];

        // Presentation only available on the non-graphics family
        let mut transfer_only = |i: u32| i == 1;
        assert_eq!(
            find_graphics_present_family(&families, &mut transfer_only),
            None
        );
    }
}
