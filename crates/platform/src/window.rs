//! Window management using winit.
//!
//! This module provides window creation, Vulkan surface creation and the
//! [`RenderWindow`] interface the renderer consumes.

use std::ffi::c_char;
use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use renderer_core::{Error, Result, WindowConfig};

/// How long [`Window::wait_events`] parks the thread between extent polls.
const EXTENT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// What the renderer needs to know about the window it presents to.
pub trait RenderWindow {
    /// Current drawable size in pixels. Zero while minimized.
    fn extent(&self) -> vk::Extent2D;

    /// True if a resize was reported since the last [`reset_resized`].
    ///
    /// [`reset_resized`]: RenderWindow::reset_resized
    fn was_resized(&self) -> bool;

    fn reset_resized(&mut self);

    /// True once the user asked to close the window.
    fn should_close(&self) -> bool;

    /// Blocks briefly until the windowing system may have new state.
    fn wait_events(&self);
}

/// RAII wrapper for a Vulkan surface.
///
/// The caller must ensure that the Vulkan instance outlives this surface.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Get the raw Vulkan surface handle.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Surface loader for capability, format and present mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle was created by ash_window::create_surface from
        // the same instance as the loader, and is destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// A winit window plus the resize and close flags the renderer polls.
pub struct Window {
    window: Arc<WinitWindow>,
    resized: bool,
    close_requested: bool,
}

impl Window {
    /// Create a new resizable window from the `[window]` config section.
    pub fn new(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(true);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!(
            "Window created: {}x{} \"{}\"",
            config.width,
            config.height,
            config.title
        );

        Ok(Self {
            window: Arc::new(window),
            resized: false,
            close_requested: false,
        })
    }

    /// Get a reference to the underlying winit window.
    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    /// Record a resize event.
    pub fn on_resized(&mut self, width: u32, height: u32) {
        self.resized = true;
        tracing::debug!("Window resized: {}x{}", width, height);
    }

    /// Record a close request.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Request a redraw of the window.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Instance extensions needed to create a surface for this window.
    pub fn required_extensions(&self) -> Result<Vec<*const c_char>> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;
        get_required_extensions(display_handle.as_raw())
    }

    /// Create a Vulkan surface for this window.
    ///
    /// # Arguments
    /// * `entry` - The Vulkan entry point
    /// * `instance` - The Vulkan instance (must outlive the returned `Surface`)
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: the display and window handles come from a live winit
        // window, and the surface is destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }
}

impl RenderWindow for Window {
    fn extent(&self) -> vk::Extent2D {
        let size = self.window.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resized(&mut self) {
        self.resized = false;
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    // Events are delivered by the winit event loop, which cannot be pumped
    // from inside a handler, so this only yields the thread.
    fn wait_events(&self) {
        std::thread::sleep(EXTENT_POLL_INTERVAL);
    }
}

/// Get the required Vulkan extensions for surface creation on the current platform.
///
/// The returned pointers reference static strings owned by the Vulkan loader.
pub fn get_required_extensions(
    display_handle: raw_window_handle::RawDisplayHandle,
) -> Result<Vec<*const c_char>> {
    let extensions = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| Error::Vulkan(format!("Failed to enumerate required extensions: {}", e)))?;

    tracing::debug!(
        "Required Vulkan extensions for surface: {:?}",
        extensions
            .iter()
            // SAFETY: ash_window returns valid, null-terminated static strings.
            .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
            .collect::<Vec<_>>()
    );

    Ok(extensions.to_vec())
}
