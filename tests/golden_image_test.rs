#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{Log, RecordingHost};

#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn render_once(
    config: deco_scene::SceneConfig,
    width: u32,
    height: u32,
) -> image::RgbaImage {
    use deco_scene::{GpuGraphics, SceneWidget, Status};

    let log = Log::new(width, height);
    let mut widget = SceneWidget::new(RecordingHost(log.clone()), config);
    let status = futures::executor::block_on(widget.mount(GpuGraphics::headless));
    assert_eq!(status, Status::Active, "headless mount failed");

    let handle = widget.pending_frame().expect("first frame requested");
    widget.on_frame(handle);
    assert_eq!(widget.frames_rendered(), 1);

    let graphics = widget.graphics().expect("graphics while active");
    futures::executor::block_on(graphics.read_pixels()).expect("readback")
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use deco_scene::config::Color;

    let config = deco_scene::SceneConfig {
        background: Color::WHITE,
        lights: Vec::new(),
        groups: Vec::new(),
        meshes: Vec::new(),
        orbit: None,
        ring: None,
        ..Default::default()
    };
    let img = render_once(config, 320, 200);
    assert_eq!(img.dimensions(), (320, 200));
    let desired_pixel = image::Rgba([255, 255, 255, 255]);
    for pixel in img.pixels() {
        assert_eq!(*pixel, desired_pixel);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_draw_the_cube_over_the_background() {
    let img = render_once(deco_scene::SceneConfig::spinning_cube(), 400, 300);
    assert_eq!(*img.get_pixel(0, 0), image::Rgba([255, 255, 255, 255]));
    let centre = img.get_pixel(200, 150);
    assert_ne!(*centre, image::Rgba([255, 255, 255, 255]));
    // Emerald: green dominates red.
    assert!(centre[1] > centre[0]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_release_gpu_resources_on_unmount() {
    use deco_scene::{GpuGraphics, SceneConfig, SceneWidget};

    let log = Log::new(64, 64);
    let mut widget = SceneWidget::new(RecordingHost(log.clone()), SceneConfig::cyber_computer());
    futures::executor::block_on(widget.mount(GpuGraphics::headless));
    assert!(widget.graphics().unwrap().live_resources() > 0);

    widget.unmount();
    let graphics = widget.graphics().unwrap();
    assert_eq!(graphics.live_resources(), 0);
    assert!(graphics.context().is_none());
}
