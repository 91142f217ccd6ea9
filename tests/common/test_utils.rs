#![allow(dead_code)]

use std::{cell::RefCell, collections::HashSet, rc::Rc, time::Duration};

use deco_scene::{
    FrameHandle, Graphics, Host, ListenerHandle, SceneError, SceneWidget, Size,
    camera::Camera,
    data_structures::scene_graph::Scene,
    resources::{GeometryId, MaterialId, geometry::GeometryDesc, material::MaterialDesc},
};

/// Everything the fake host and graphics observed, shared between them and
/// the test so it survives the widget being dropped.
#[derive(Debug, Default)]
pub(crate) struct Log {
    pub size: Size,
    pub supports_3d: bool,
    pub fail_attach: bool,
    pub fail_context: bool,
    pub fail_render: bool,
    pub fail_detach: bool,
    pub fail_add_listener: bool,
    pub fail_remove_listener: bool,
    /// Allocation fails once this many resources exist.
    pub allocation_limit: Option<usize>,

    pub children: usize,
    pub detaches: usize,
    pub next_frame: u64,
    pub pending_frames: HashSet<FrameHandle>,
    pub frame_requests: usize,
    pub listeners: HashSet<ListenerHandle>,
    pub clock: Duration,

    pub contexts_created: usize,
    pub contexts_released: usize,
    pub allocated: Vec<String>,
    pub released: Vec<String>,
    pub renders: usize,
    pub render_attempts: usize,
    pub resizes: Vec<Size>,
    /// Every host and graphics call in the order it was made.
    pub events: Vec<&'static str>,
}

impl Log {
    pub fn new(width: u32, height: u32) -> Rc<RefCell<Log>> {
        Rc::new(RefCell::new(Log {
            size: Size::new(width, height),
            supports_3d: true,
            ..Default::default()
        }))
    }

    pub fn outstanding(&self) -> usize {
        self.allocated
            .iter()
            .filter(|id| !self.released.contains(id))
            .count()
    }

    pub fn double_releases(&self) -> usize {
        let unique: HashSet<&String> = self.released.iter().collect();
        self.released.len() - unique.len()
    }
}

pub(crate) struct RecordingHost(pub Rc<RefCell<Log>>);

impl Host for RecordingHost {
    fn supports_3d(&self) -> bool {
        self.0.borrow().supports_3d
    }

    fn container_size(&self) -> Size {
        self.0.borrow().size
    }

    fn attach_surface(&mut self) -> Result<(), SceneError> {
        let mut log = self.0.borrow_mut();
        log.events.push("attach_surface");
        if log.fail_attach {
            return Err(SceneError::SurfaceAttach("container rejected the canvas".into()));
        }
        log.children += 1;
        Ok(())
    }

    fn detach_surface(&mut self) -> Result<(), SceneError> {
        let mut log = self.0.borrow_mut();
        log.events.push("detach_surface");
        if log.fail_detach {
            return Err(SceneError::SurfaceAttach("canvas already gone".into()));
        }
        log.children -= 1;
        log.detaches += 1;
        Ok(())
    }

    fn surface_attached(&self) -> bool {
        self.0.borrow().children > 0
    }

    fn request_frame(&mut self) -> FrameHandle {
        let mut log = self.0.borrow_mut();
        log.events.push("request_frame");
        log.next_frame += 1;
        log.frame_requests += 1;
        let handle = FrameHandle(log.next_frame);
        log.pending_frames.insert(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut log = self.0.borrow_mut();
        log.events.push("cancel_frame");
        log.pending_frames.remove(&handle);
    }

    fn add_resize_listener(&mut self) -> Result<ListenerHandle, SceneError> {
        let mut log = self.0.borrow_mut();
        log.events.push("add_listener");
        if log.fail_add_listener {
            return Err(SceneError::Listener("resize events unavailable".into()));
        }
        let handle = ListenerHandle(log.listeners.len() as u64 + 1);
        log.listeners.insert(handle);
        Ok(handle)
    }

    fn remove_resize_listener(&mut self, handle: ListenerHandle) -> Result<(), SceneError> {
        let mut log = self.0.borrow_mut();
        log.events.push("remove_listener");
        if log.fail_remove_listener {
            return Err(SceneError::Listener("listener already detached".into()));
        }
        if log.listeners.remove(&handle) {
            Ok(())
        } else {
            Err(SceneError::Listener("unknown listener".into()))
        }
    }

    fn now(&self) -> Duration {
        self.0.borrow().clock
    }
}

pub(crate) struct RecordingGraphics {
    log: Rc<RefCell<Log>>,
    next: u32,
}

impl RecordingGraphics {
    pub fn create(log: Rc<RefCell<Log>>) -> Result<Self, SceneError> {
        if log.borrow().fail_context {
            return Err(SceneError::ContextCreation("no adapter".into()));
        }
        log.borrow_mut().contexts_created += 1;
        Ok(Self { log, next: 0 })
    }

    fn allocate(&mut self, name: String) -> Result<(), SceneError> {
        let mut log = self.log.borrow_mut();
        log.events.push("create");
        if log.allocation_limit.is_some_and(|limit| log.allocated.len() >= limit) {
            return Err(SceneError::ResourceAllocation("out of memory".into()));
        }
        log.allocated.push(name);
        Ok(())
    }
}

impl Graphics for RecordingGraphics {
    fn create_geometry(&mut self, _: &GeometryDesc) -> Result<GeometryId, SceneError> {
        self.next += 1;
        self.allocate(format!("geometry-{}", self.next))?;
        Ok(GeometryId(self.next))
    }

    fn create_material(&mut self, _: &MaterialDesc) -> Result<MaterialId, SceneError> {
        self.next += 1;
        self.allocate(format!("material-{}", self.next))?;
        Ok(MaterialId(self.next))
    }

    fn release_geometry(&mut self, id: GeometryId) {
        let mut log = self.log.borrow_mut();
        log.events.push("release");
        log.released.push(format!("geometry-{}", id.0));
    }

    fn release_material(&mut self, id: MaterialId) {
        let mut log = self.log.borrow_mut();
        log.events.push("release");
        log.released.push(format!("material-{}", id.0));
    }

    fn resize(&mut self, size: Size) {
        self.log.borrow_mut().resizes.push(size);
    }

    fn render(&mut self, _: &Scene, _: &Camera) -> Result<(), SceneError> {
        let mut log = self.log.borrow_mut();
        log.render_attempts += 1;
        if log.fail_render {
            return Err(SceneError::RenderFailure("device lost".into()));
        }
        log.renders += 1;
        Ok(())
    }

    fn release_context(&mut self) {
        let mut log = self.log.borrow_mut();
        log.events.push("release_context");
        log.contexts_released += 1;
    }
}

pub(crate) type TestWidget = SceneWidget<RecordingHost, RecordingGraphics>;

/// Mount `config` into a recording host and return the widget with its log.
pub(crate) fn mounted(
    log: Rc<RefCell<Log>>,
    config: deco_scene::SceneConfig,
) -> TestWidget {
    let mut widget = SceneWidget::new(RecordingHost(log.clone()), config);
    futures::executor::block_on(widget.mount(|_| async move { RecordingGraphics::create(log) }));
    widget
}

/// Fire the frame the widget is waiting for, `elapsed` after the last one.
pub(crate) fn tick(widget: &mut TestWidget, log: &Rc<RefCell<Log>>, elapsed: Duration) {
    log.borrow_mut().clock += elapsed;
    if let Some(handle) = widget.pending_frame() {
        log.borrow_mut().pending_frames.remove(&handle);
        widget.on_frame(handle);
    }
}

pub(crate) fn assert_close(a: f32, b: f32, epsilon: f32) {
    assert!((a - b).abs() <= epsilon, "{a} != {b}");
}
