use std::time::Duration;

use deco_scene::{SceneConfig, Size};

use crate::common::test_utils::{Log, assert_close, mounted, tick};

mod common;

#[test]
fn resize_follows_the_container() {
    let log = Log::new(800, 600);
    let mut widget = mounted(log.clone(), SceneConfig::spinning_cube());

    log.borrow_mut().size = Size::new(300, 600);
    widget.on_resize();

    assert_close(widget.camera().unwrap().aspect(), 0.5, 1e-6);
    assert_eq!(log.borrow().resizes, vec![Size::new(300, 600)]);
}

#[test]
fn resize_is_idempotent() {
    let log = Log::new(800, 600);
    let mut widget = mounted(log.clone(), SceneConfig::spinning_cube());
    log.borrow_mut().size = Size::new(1280, 720);

    widget.on_resize();
    let once = widget.camera().unwrap().clone();
    widget.on_resize();

    assert_eq!(widget.camera().unwrap(), &once);
    let resizes = log.borrow().resizes.clone();
    assert_eq!(resizes, vec![Size::new(1280, 720); 2]);
}

#[test]
fn collapsed_container_is_clamped() {
    let log = Log::new(800, 600);
    let mut widget = mounted(log.clone(), SceneConfig::spinning_cube());
    log.borrow_mut().size = Size::new(0, 0);
    widget.on_resize();

    let aspect = widget.camera().unwrap().aspect();
    assert!(aspect.is_finite());
    assert_close(aspect, 1.0, 1e-6);
    assert_eq!(log.borrow().resizes, vec![Size::new(1, 1)]);
}

#[test]
fn resize_between_frames_keeps_the_loop_running() {
    let log = Log::new(800, 600);
    let mut widget = mounted(log.clone(), SceneConfig::cyber_computer());
    tick(&mut widget, &log, Duration::from_millis(16));

    log.borrow_mut().size = Size::new(400, 400);
    widget.on_resize();
    tick(&mut widget, &log, Duration::from_millis(16));

    assert_eq!(log.borrow().renders, 2);
    assert_close(widget.camera().unwrap().aspect(), 1.0, 1e-6);
    assert!(widget.is_frame_pending());
}

#[test]
fn resize_after_unmount_does_nothing() {
    let log = Log::new(800, 600);
    let mut widget = mounted(log.clone(), SceneConfig::spinning_cube());
    widget.unmount();

    log.borrow_mut().size = Size::new(100, 50);
    widget.on_resize();

    assert!(log.borrow().resizes.is_empty());
    assert_close(widget.camera().unwrap().aspect(), 800.0 / 600.0, 1e-6);
}

#[test]
fn resize_before_mount_does_nothing() {
    let log = Log::new(800, 600);
    log.borrow_mut().supports_3d = false;
    let mut widget = mounted(log.clone(), SceneConfig::spinning_cube());
    widget.on_resize();
    assert!(widget.camera().is_none());
    assert!(log.borrow().resizes.is_empty());
}
