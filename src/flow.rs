//! Native driver: runs a [`SceneWidget`] inside a winit window.
//!
//! The window plays the container. It is created hidden and shown when the
//! widget attaches its surface, redraw requests stand in for animation frames,
//! and `WindowEvent::Resized` is forwarded while a resize listener is
//! registered.

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    config::SceneConfig,
    error::SceneError,
    host::{FrameHandle, Host, ListenerHandle, Size},
    render::GpuGraphics,
    widget::{SceneWidget, Status},
};

pub struct WindowHost {
    window: Arc<Window>,
    supports_3d: bool,
    attached: bool,
    next_handle: u64,
    requested: Option<FrameHandle>,
    listener: Option<ListenerHandle>,
    clock: Instant,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, supports_3d: bool) -> Self {
        Self {
            window,
            supports_3d,
            attached: false,
            next_handle: 0,
            requested: None,
            listener: None,
            clock: Instant::now(),
        }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// The frame a redraw should be delivered to, if one was requested.
    pub fn take_requested(&mut self) -> Option<FrameHandle> {
        self.requested.take()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Host for WindowHost {
    fn supports_3d(&self) -> bool {
        self.supports_3d
    }

    fn container_size(&self) -> Size {
        let size = self.window.inner_size();
        Size::new(size.width, size.height)
    }

    fn attach_surface(&mut self) -> Result<(), SceneError> {
        self.window.set_visible(true);
        self.attached = true;
        Ok(())
    }

    fn detach_surface(&mut self) -> Result<(), SceneError> {
        self.window.set_visible(false);
        self.attached = false;
        Ok(())
    }

    fn surface_attached(&self) -> bool {
        self.attached
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_handle());
        self.requested = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.requested == Some(handle) {
            self.requested = None;
        }
    }

    fn add_resize_listener(&mut self) -> Result<ListenerHandle, SceneError> {
        let handle = ListenerHandle(self.next_handle());
        self.listener = Some(handle);
        Ok(handle)
    }

    fn remove_resize_listener(&mut self, handle: ListenerHandle) -> Result<(), SceneError> {
        if self.listener != Some(handle) {
            return Err(SceneError::Listener(format!(
                "listener {:?} is not registered",
                handle
            )));
        }
        self.listener = None;
        Ok(())
    }

    fn now(&self) -> Duration {
        self.clock.elapsed()
    }
}

/// Whether any wgpu adapter is available on this machine.
pub async fn probe_adapter() -> bool {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .is_ok()
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: SceneConfig,
    widget: Option<SceneWidget<WindowHost, GpuGraphics>>,
    failure: Option<SceneError>,
}

impl App {
    pub fn new(config: SceneConfig) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            widget: None,
            failure: None,
        })
    }

    pub fn status(&self) -> Option<&Status> {
        self.widget.as_ref().map(SceneWidget::status)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.widget.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title("deco-scene")
            .with_inner_size(winit::dpi::LogicalSize::new(800.0, 600.0))
            .with_visible(false);
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create a window: {}", e);
                self.failure = Some(SceneError::SurfaceAttach(e.to_string()));
                event_loop.exit();
                return;
            }
        };

        let supports_3d = self.async_runtime.block_on(probe_adapter());
        let host = WindowHost::new(window.clone(), supports_3d);
        let mut widget = SceneWidget::new(host, self.config.clone());
        let status = self.async_runtime.block_on(
            widget.mount(move |size| GpuGraphics::for_surface(window, size)),
        );
        if let Status::Error(e) = status {
            self.failure = Some(e);
            event_loop.exit();
        }
        self.widget = Some(widget);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        let Some(widget) = &mut self.widget else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                widget.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(_) => {
                if widget.host().is_listening() {
                    widget.on_resize();
                }
            }
            WindowEvent::RedrawRequested => {
                // Redraws the OS asks for on its own carry no frame handle.
                if let Some(handle) = widget.host_mut().take_requested() {
                    widget.on_frame(handle);
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _: &ActiveEventLoop) {
        if let Some(widget) = &mut self.widget {
            widget.unmount();
        }
    }
}

/// Open a window and animate `config` in it until the window is closed.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
