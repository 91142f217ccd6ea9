//! The decorative scene widget and its lifecycle.
//!
//! A [`SceneWidget`] goes through `mount` once, runs a self-rescheduling frame
//! loop while active, follows container resizes, and is torn down by
//! `unmount` (or by being dropped). Everything the widget allocates is
//! released on teardown exactly once, whichever step of mounting failed.
//!
//! ```text
//! Loading --mount ok--> Active
//!    \
//!     `--capability / context / allocation / attach failure--> Error
//! ```

use std::{cell::Cell, collections::HashMap, fmt, future::Future, rc::Rc, time::Duration};

use cgmath::Vector3;
use log::{debug, error, warn};

use crate::{
    animation::Animator,
    camera::Camera,
    config::SceneConfig,
    data_structures::{
        instance::Instance,
        scene_graph::{Light, NodeId, Scene},
    },
    error::SceneError,
    host::{FrameHandle, Host, ListenerHandle, Size},
    render::Graphics,
    resources::{ResourceLedger, geometry::GeometryDesc},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Loading,
    Active,
    Error(SceneError),
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }

    pub fn error(&self) -> Option<&SceneError> {
        match self {
            Status::Error(e) => Some(e),
            Status::Loading | Status::Active => None,
        }
    }
}

/// The label shown next to the widget on the host page.
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading => write!(f, "LOADING"),
            Status::Active => write!(f, "ACTIVE"),
            Status::Error(_) => write!(f, "ERROR"),
        }
    }
}

/// Shared flag telling every holder that the frame loop is over.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// The self-rescheduling animation loop. At most one frame is pending at any
/// time, and nothing is scheduled once the token is cancelled.
#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: Option<FrameHandle>,
    token: CancellationToken,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Ask the host for the next frame, replacing any pending one.
    pub fn schedule<H: Host>(&mut self, host: &mut H) -> Option<FrameHandle> {
        if self.token.is_cancelled() {
            return None;
        }
        if let Some(previous) = self.pending.take() {
            host.cancel_frame(previous);
        }
        let handle = host.request_frame();
        self.pending = Some(handle);
        Some(handle)
    }

    /// Consume `handle` if it is the frame this loop is waiting for.
    pub fn accept(&mut self, handle: FrameHandle) -> bool {
        if self.token.is_cancelled() || self.pending != Some(handle) {
            return false;
        }
        self.pending = None;
        true
    }

    pub fn cancel<H: Host>(&mut self, host: &mut H) {
        self.token.cancel();
        if let Some(handle) = self.pending.take() {
            host.cancel_frame(handle);
        }
    }
}

pub struct SceneWidget<H: Host, G: Graphics> {
    host: H,
    config: SceneConfig,
    graphics: Option<G>,
    scene: Option<Scene>,
    camera: Option<Camera>,
    animator: Animator,
    ledger: ResourceLedger,
    frames: FrameLoop,
    listener: Option<ListenerHandle>,
    status: Status,
    started: Duration,
    frames_rendered: u64,
    torn_down: bool,
}

impl<H: Host, G: Graphics> SceneWidget<H, G> {
    pub fn new(host: H, config: SceneConfig) -> Self {
        Self {
            host,
            config,
            graphics: None,
            scene: None,
            camera: None,
            animator: Animator::new(),
            ledger: ResourceLedger::new(),
            frames: FrameLoop::new(),
            listener: None,
            status: Status::Loading,
            started: Duration::ZERO,
            frames_rendered: 0,
            torn_down: false,
        }
    }

    /// Bring the scene up inside the host's container.
    ///
    /// `create_graphics` receives the container size and builds the rendering
    /// backend. It is only called once the host reports 3D support.
    pub async fn mount<F, Fut>(&mut self, create_graphics: F) -> Status
    where
        F: FnOnce(Size) -> Fut,
        Fut: Future<Output = Result<G, SceneError>>,
    {
        if self.status != Status::Loading || self.torn_down {
            warn!("mount ignored, widget is {}", self.status);
            return self.status.clone();
        }
        if !self.host.supports_3d() {
            return self.fail(SceneError::CapabilityUnavailable);
        }
        if let Err(e) = self.config.validate() {
            return self.fail(e);
        }

        let size = self.host.container_size();
        let mut graphics = match create_graphics(size.clamped()).await {
            Ok(graphics) => graphics,
            Err(e) => return self.fail(e),
        };

        let (scene, animator) = match build_scene(&self.config, &mut graphics, &mut self.ledger) {
            Ok(built) => built,
            Err(e) => return self.abort(graphics, e),
        };

        if let Err(e) = self.host.attach_surface() {
            return self.abort(graphics, e);
        }

        self.started = self.host.now();
        self.frames.schedule(&mut self.host);
        match self.host.add_resize_listener() {
            Ok(listener) => self.listener = Some(listener),
            Err(e) => {
                self.frames.cancel(&mut self.host);
                if let Err(detach) = self.host.detach_surface() {
                    warn!("{}", detach);
                }
                return self.abort(graphics, e);
            }
        }

        self.camera = Some(Camera::new(&self.config.camera, size));
        self.graphics = Some(graphics);
        self.scene = Some(scene);
        self.animator = animator;
        self.status = Status::Active;
        debug!(
            "scene active: {} nodes, {} resources, {} animation tracks",
            self.scene.as_ref().map_or(0, Scene::len),
            self.ledger.allocated(),
            self.animator.len()
        );
        self.status.clone()
    }

    /// Undo a partial mount: release what the ledger holds, then the context.
    fn abort(&mut self, mut graphics: G, e: SceneError) -> Status {
        self.ledger.release_all(&mut graphics);
        graphics.release_context();
        self.fail(e)
    }

    fn fail(&mut self, e: SceneError) -> Status {
        error!("scene failed to mount: {}", e);
        self.status = Status::Error(e);
        self.status.clone()
    }

    /// One animation frame: advance every motion, draw once, ask for the next
    /// frame. Handles other than the pending one are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle) {
        if !self.frames.accept(handle) {
            debug!("ignoring stale frame {:?}", handle);
            return;
        }
        let (Some(graphics), Some(scene), Some(camera)) =
            (self.graphics.as_mut(), self.scene.as_mut(), self.camera.as_ref())
        else {
            return;
        };
        let t = self.host.now().saturating_sub(self.started).as_secs_f32();
        self.animator.step(scene, t);
        match graphics.render(scene, camera) {
            Ok(()) => self.frames_rendered += 1,
            Err(e) => error!("{}", e),
        }
        self.frames.schedule(&mut self.host);
    }

    /// Follow the container's current size. Calling it twice for the same size
    /// changes nothing.
    pub fn on_resize(&mut self) {
        if self.torn_down {
            return;
        }
        let (Some(graphics), Some(camera)) = (self.graphics.as_mut(), self.camera.as_mut()) else {
            return;
        };
        let size = self.host.container_size().clamped();
        camera.set_viewport(size);
        graphics.resize(size);
    }

    /// Tear the widget down. Every step runs even if an earlier one failed,
    /// and calling it again does nothing.
    pub fn unmount(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.frames.cancel(&mut self.host);
        if let Some(listener) = self.listener.take() {
            if let Err(e) = self.host.remove_resize_listener(listener) {
                warn!("{}", e);
            }
        }
        if self.host.surface_attached() {
            if let Err(e) = self.host.detach_surface() {
                warn!("{}", e);
            }
        }
        if let Some(graphics) = self.graphics.as_mut() {
            self.ledger.release_all(graphics);
            graphics.release_context();
        }
        debug!("scene unmounted after {} frames", self.frames_rendered);
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn graphics(&self) -> Option<&G> {
        self.graphics.as_ref()
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frames.pending().is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frames.pending()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn is_unmounted(&self) -> bool {
        self.torn_down
    }
}

impl<H: Host, G: Graphics> Drop for SceneWidget<H, G> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Allocate every primitive of `config` through `ledger` and bind its motions.
/// On error the ledger holds whatever was allocated before the failure.
fn build_scene<G: Graphics>(
    config: &SceneConfig,
    graphics: &mut G,
    ledger: &mut ResourceLedger,
) -> Result<(Scene, Animator), SceneError> {
    let mut scene = Scene::new(config.background);
    let mut animator = Animator::new();

    for light in &config.lights {
        let index = scene.add_light(Light {
            kind: light.kind,
            color: light.color,
            intensity: light.intensity,
            position: light.position,
        });
        if let Some(pulse) = light.pulse {
            animator.pulse(index, pulse);
        }
    }

    let mut groups: HashMap<&str, NodeId> = HashMap::new();
    for group in &config.groups {
        let id = scene.add_group(&group.name, None, Instance::from(Vector3::from(group.position)));
        animator.spin(id, group.spin);
        groups.insert(group.name.as_str(), id);
    }

    for mesh in &config.meshes {
        let parent = mesh.group.as_deref().and_then(|name| groups.get(name).copied());
        let geometry = ledger.create_geometry(graphics, &mesh.geometry)?;
        let material = ledger.create_material(graphics, &mesh.material)?;
        let id = scene.add_mesh(
            &mesh.name,
            parent,
            Instance::from_position_euler(mesh.position, mesh.rotation),
            geometry,
            material,
        );
        animator.spin(id, mesh.spin);
    }

    if let Some(orbit) = &config.orbit {
        let pivot = scene.add_pivot(
            "orbit-pivot",
            None,
            Instance::from(Vector3::from(orbit.pivot)),
        );
        let geometry = ledger.create_geometry(graphics, &GeometryDesc::cube(orbit.size))?;
        let material = ledger.create_material(graphics, &orbit.material)?;
        let cube = scene.add_mesh(
            "orbit-cube",
            Some(pivot),
            Instance::from(orbit.path.position(0.0)),
            geometry,
            material,
        );
        animator.orbit(cube, orbit.path);
        animator.spin(cube, orbit.spin);
    }

    if let Some(ring) = &config.ring {
        // One geometry and one material for the whole ring.
        let geometry = ledger.create_geometry(graphics, &GeometryDesc::cube(ring.size))?;
        let material = ledger.create_material(graphics, &ring.material)?;
        for index in 0..ring.path.count {
            let cube = scene.add_mesh(
                &format!("ring-cube-{index}"),
                None,
                Instance::from(ring.path.position(index, 0.0)),
                geometry,
                material,
            );
            animator.ring(cube, ring.path, index);
            animator.spin(cube, ring.spin);
        }
    }

    Ok((scene, animator))
}
