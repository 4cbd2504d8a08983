//! Vulkan instance management.
//!
//! This module handles VkInstance creation, validation layers, and the debug
//! messenger that forwards validation output to `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use renderer_rhi::instance::Instance;
//!
//! // Surface extensions normally come from the windowing layer.
//! let surface_extensions = [ash::khr::surface::NAME.as_ptr()];
//! let instance = Instance::new(c"Demo", &surface_extensions, cfg!(debug_assertions))
//!     .expect("Failed to create Vulkan instance");
//!
//! let vk_instance = instance.handle();
//! let entry = instance.entry();
//! ```

use std::ffi::{CStr, c_char};

use ash::{Entry, vk};
use tracing::{Level, debug, error, info, trace, warn};

use crate::error::RhiError;

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with optional validation layer support.
///
/// Destroys the debug messenger and the instance on drop. Every object created
/// from this instance (surface, device) must be dropped first.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils loader and messenger, present when validation is enabled
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `application_name` - Reported to the driver in `VkApplicationInfo`
    /// * `surface_extensions` - Extensions required by the window system, as
    ///   returned by `ash_window::enumerate_required_extensions`
    /// * `enable_validation` - Enables the validation layer and debug messenger
    ///   when the layer is installed
    ///
    /// # Errors
    ///
    /// Returns an error if the Vulkan library cannot be loaded, instance
    /// creation fails, or the debug messenger cannot be created.
    pub fn new(
        application_name: &CStr,
        surface_extensions: &[*const c_char],
        enable_validation: bool,
    ) -> Result<Self, RhiError> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            enable_validation && Self::is_validation_layer_available(&entry)?;
        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(application_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Chorus Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_2);

        let extensions = instance_extensions(surface_extensions, validation_available);
        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };
        info!(
            "Vulkan instance created with {} extension(s)",
            extensions.len()
        );

        let debug = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => {
                    info!("Validation layers enabled");
                    Some((debug_utils, messenger))
                }
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            debug,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug.is_some()
    }

    fn is_validation_layer_available(entry: &Entry) -> Result<bool, RhiError> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        Ok(available_layers.iter().any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        }))
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };
        debug!("Debug messenger created");
        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Collects the instance extensions: the window system's surface extensions,
/// plus debug utils when validation is on.
fn instance_extensions(
    surface_extensions: &[*const c_char],
    validation: bool,
) -> Vec<*const c_char> {
    let mut extensions = surface_extensions.to_vec();
    if validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    extensions
}

/// Maps a validation message severity onto a tracing level.
fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Level::ERROR
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Level::WARN
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Level::DEBUG
    } else {
        Level::TRACE
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    }
}

/// Forwards validation layer messages to `tracing`.
///
/// # Safety
///
/// Called by the Vulkan loader with a callback data pointer that is either
/// null or valid for the duration of the call.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };
    let kind = message_type_name(message_type);

    let level = severity_level(message_severity);
    if level == Level::ERROR {
        error!("[Vulkan {}] {}", kind, message);
    } else if level == Level::WARN {
        warn!("[Vulkan {}] {}", kind, message);
    } else if level == Level::DEBUG {
        debug!("[Vulkan {}] {}", kind, message);
    } else {
        trace!("[Vulkan {}] {}", kind, message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions_without_validation() {
        let surface = [ash::khr::surface::NAME.as_ptr()];
        let extensions = instance_extensions(&surface, false);
        assert_eq!(extensions, surface.to_vec());
    }

    #[test]
    fn test_extensions_with_validation() {
        let surface = [ash::khr::surface::NAME.as_ptr()];
        let extensions = instance_extensions(&surface, true);
        assert_eq!(extensions.len(), 2);
        assert_eq!(extensions[1], ash::ext::debug_utils::NAME.as_ptr());
    }

    #[test]
    fn test_severity_mapping() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;

        assert_eq!(severity_level(Severity::ERROR), Level::ERROR);
        assert_eq!(severity_level(Severity::WARNING), Level::WARN);
        assert_eq!(severity_level(Severity::INFO), Level::DEBUG);
        assert_eq!(severity_level(Severity::VERBOSE), Level::TRACE);
    }

    #[test]
    fn test_message_type_names() {
        assert_eq!(
            message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            "Validation"
        );
        assert_eq!(
            message_type_name(vk::DebugUtilsMessageTypeFlagsEXT::empty()),
            "Unknown"
        );
    }

    #[test]
    fn test_instance_creation_without_validation() {
        // Needs a Vulkan loader and driver; skipped otherwise.
        match Instance::new(c"test", &[], false) {
            Ok(instance) => assert!(!instance.has_validation()),
            Err(e) => eprintln!("Skipping test: Vulkan not available ({e})"),
        }
    }
}
