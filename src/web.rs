//! Browser driver: mounts a [`SceneWidget`] into a DOM element.
//!
//! The widget is owned by the [`DecorativeScene`] handle given to JavaScript.
//! Animation frame and resize callbacks reach it through a shared slot holding
//! a weak reference, so a dropped handle can never be called back into.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use instant::Instant;
use wasm_bindgen::{JsCast, prelude::*};
use web_sys::{Element, HtmlCanvasElement, WebGl2RenderingContext, WebglLoseContext};

use crate::{
    config::SceneConfig,
    error::SceneError,
    host::{FrameHandle, Host, ListenerHandle, Size},
    render::GpuGraphics,
    widget::SceneWidget,
};

/// High-DPI screens are rendered at no more than twice the CSS size.
const MAX_PIXEL_RATIO: f64 = 2.0;

type WebWidget = SceneWidget<WebHost, GpuGraphics>;
type WidgetSlot = Rc<RefCell<Option<Weak<RefCell<WebWidget>>>>>;

pub struct WebHost {
    window: web_sys::Window,
    container: Element,
    canvas: HtmlCanvasElement,
    attached: bool,
    requested: Option<FrameHandle>,
    listening: Option<ListenerHandle>,
    on_frame: Closure<dyn FnMut()>,
    on_resize: Closure<dyn FnMut()>,
    clock: Instant,
}

impl WebHost {
    fn new(container: Element, slot: &WidgetSlot) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("no global window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        let style = canvas.style();
        style.set_property("display", "block")?;
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;

        let frame_slot = slot.clone();
        let on_frame = Closure::<dyn FnMut()>::new(move || {
            with_widget(&frame_slot, |widget| {
                if let Some(handle) = widget.host_mut().take_requested() {
                    widget.on_frame(handle);
                }
            });
        });
        let resize_slot = slot.clone();
        let on_resize = Closure::<dyn FnMut()>::new(move || {
            with_widget(&resize_slot, |widget| {
                widget.host().sync_canvas_size();
                widget.on_resize();
            });
        });

        Ok(Self {
            window,
            container,
            canvas,
            attached: false,
            requested: None,
            listening: None,
            on_frame,
            on_resize,
            clock: Instant::now(),
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn take_requested(&mut self) -> Option<FrameHandle> {
        self.requested.take()
    }

    /// Match the canvas drawing buffer to the container.
    fn sync_canvas_size(&self) {
        let Size { width, height } = self.container_size().clamped();
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }
}

fn with_widget(slot: &WidgetSlot, f: impl FnOnce(&mut WebWidget)) {
    let Some(widget) = slot.borrow().as_ref().and_then(Weak::upgrade) else {
        return;
    };
    match widget.try_borrow_mut() {
        Ok(mut widget) => f(&mut widget),
        Err(_) => log::warn!("scene callback skipped, widget is busy"),
    };
}

fn js_error(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

impl Host for WebHost {
    fn supports_3d(&self) -> bool {
        // Probe on a scratch canvas so the real one keeps a fresh context.
        let probe = self
            .window
            .document()
            .and_then(|document| document.create_element("canvas").ok())
            .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
            .and_then(|canvas| canvas.get_context("webgl2").ok().flatten())
            .and_then(|context| context.dyn_into::<WebGl2RenderingContext>().ok());
        let Some(context) = probe else {
            return false;
        };
        // Browsers cap live contexts; give this one back right away.
        if let Ok(Some(extension)) = context.get_extension("WEBGL_lose_context") {
            if let Ok(lose) = extension.dyn_into::<WebglLoseContext>() {
                lose.lose_context();
            }
        }
        true
    }

    fn container_size(&self) -> Size {
        let ratio = self.window.device_pixel_ratio().min(MAX_PIXEL_RATIO);
        let scale = |css: i32| (css.max(0) as f64 * ratio).round() as u32;
        Size::new(
            scale(self.container.client_width()),
            scale(self.container.client_height()),
        )
    }

    fn attach_surface(&mut self) -> Result<(), SceneError> {
        self.sync_canvas_size();
        self.container
            .append_child(&self.canvas)
            .map_err(|e| SceneError::SurfaceAttach(js_error(e)))?;
        self.attached = true;
        Ok(())
    }

    fn detach_surface(&mut self) -> Result<(), SceneError> {
        self.attached = false;
        self.container
            .remove_child(&self.canvas)
            .map(|_| ())
            .map_err(|e| SceneError::SurfaceDetach(js_error(e)))
    }

    fn surface_attached(&self) -> bool {
        self.attached
    }

    fn request_frame(&mut self) -> FrameHandle {
        match self
            .window
            .request_animation_frame(self.on_frame.as_ref().unchecked_ref())
        {
            Ok(id) => {
                let handle = FrameHandle(id as u64);
                self.requested = Some(handle);
                handle
            }
            Err(e) => {
                log::error!("requestAnimationFrame failed: {}", js_error(e));
                // Never matches a real callback, so the loop simply stops.
                FrameHandle(u64::MAX)
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.requested == Some(handle) {
            self.requested = None;
        }
        if let Err(e) = self.window.cancel_animation_frame(handle.0 as i32) {
            log::warn!("cancelAnimationFrame failed: {}", js_error(e));
        }
    }

    fn add_resize_listener(&mut self) -> Result<ListenerHandle, SceneError> {
        self.window
            .add_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref())
            .map_err(|e| SceneError::Listener(js_error(e)))?;
        let handle = ListenerHandle(1);
        self.listening = Some(handle);
        Ok(handle)
    }

    fn remove_resize_listener(&mut self, handle: ListenerHandle) -> Result<(), SceneError> {
        if self.listening != Some(handle) {
            return Err(SceneError::Listener(format!(
                "listener {:?} is not registered",
                handle
            )));
        }
        self.listening = None;
        self.window
            .remove_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref())
            .map_err(|e| SceneError::Listener(js_error(e)))
    }

    fn now(&self) -> Duration {
        self.clock.elapsed()
    }
}

/// JavaScript handle to a mounted scene. Dropping it (`free()`) unmounts.
#[wasm_bindgen]
pub struct DecorativeScene {
    widget: Rc<RefCell<WebWidget>>,
}

#[wasm_bindgen]
impl DecorativeScene {
    /// Mount a preset (`spinning-cube` by default) into the element with id
    /// `container_id`. A scene that fails to start is still returned; its
    /// status reads `ERROR`.
    pub async fn mount(
        container_id: String,
        preset: Option<String>,
    ) -> Result<DecorativeScene, JsValue> {
        // A second mount finds the logger already installed.
        console_log::init_with_level(log::Level::Info).ok();

        let config = match preset.as_deref() {
            None => SceneConfig::default(),
            Some(name) => SceneConfig::preset(name)
                .ok_or_else(|| JsValue::from_str(&format!("unknown preset `{name}`")))?,
        };
        let container = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(&container_id))
            .ok_or_else(|| JsValue::from_str(&format!("no element with id `{container_id}`")))?;

        let slot: WidgetSlot = Rc::new(RefCell::new(None));
        let host = WebHost::new(container, &slot)?;
        let canvas = host.canvas().clone();
        let mut widget = SceneWidget::new(host, config);
        widget
            .mount(move |size| {
                GpuGraphics::for_surface(wgpu::SurfaceTarget::Canvas(canvas), size)
            })
            .await;

        let widget = Rc::new(RefCell::new(widget));
        *slot.borrow_mut() = Some(Rc::downgrade(&widget));
        Ok(DecorativeScene { widget })
    }

    /// `LOADING`, `ACTIVE` or `ERROR`.
    pub fn status(&self) -> String {
        self.widget.borrow().status().to_string()
    }

    pub fn unmount(&self) {
        self.widget.borrow_mut().unmount();
    }
}
