//! Opens a window showing a decorative scene.
//!
//! Usage: `deco-scene [PRESET | CONFIG.toml]`. Presets are `spinning-cube`
//! (the default) and `cyber-computer`.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use deco_scene::SceneConfig;

    let config = match std::env::args().nth(1) {
        None => SceneConfig::default(),
        Some(arg) => match SceneConfig::preset(&arg) {
            Some(config) => config,
            None => SceneConfig::load(&arg).with_context(|| {
                format!("`{arg}` is neither a preset nor a readable scene config")
            })?,
        },
    };
    deco_scene::flow::run(config)
}

#[cfg(target_arch = "wasm32")]
fn main() {}
