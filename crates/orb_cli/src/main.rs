//! Orb - render a sphere scene on the GPU and write PNG frames.
//!
//! Usage: `orb [config.json]`
//!
//! Renders the initial frame, then an optional resized frame, then one
//! frame per scripted camera command.

mod config;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use orb_core::{random_scene, Scene, SceneDescription};
use orb_render::{ComputeDevice, KernelSource, PixelBuffer, Renderer};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;

fn build_scene(config: &Config) -> Result<Scene> {
    let camera = config.camera();

    match &config.scene {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scene {:?}", path))?;
            let description: SceneDescription = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse scene {:?}", path))?;
            let scene = description.into_scene(camera);
            log::info!("Loaded {} spheres from {:?}", scene.sphere_count(), path);
            Ok(scene)
        }
        None => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let scene = random_scene(camera, &mut rng);
            log::info!(
                "Generated random scene with {} spheres (seed {})",
                scene.sphere_count(),
                config.seed
            );
            Ok(scene)
        }
    }
}

fn frame_path(dir: &Path, frame: usize) -> PathBuf {
    dir.join(format!("frame_{:04}.png", frame))
}

fn write_png(image: &PixelBuffer, path: &Path) -> Result<()> {
    let rgba = image::RgbaImage::from_raw(image.width(), image.height(), image.to_rgba8())
        .context("Pixel buffer does not match its dimensions")?;
    rgba.save(path)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn render_frame<D: ComputeDevice>(
    renderer: &mut Renderer<D>,
    scene: &Scene,
    dir: &Path,
    frame: usize,
) -> Result<()> {
    let start = Instant::now();
    let image = renderer
        .render(scene)
        .with_context(|| format!("Failed to render frame {}", frame))?;

    let path = frame_path(dir, frame);
    write_png(image, &path)?;

    log::info!(
        "Frame {} ({}x{}) written to {:?} in {:.2?}",
        frame,
        image.width(),
        image.height(),
        path,
        start.elapsed()
    );
    Ok(())
}

fn run(config: &Config) -> Result<()> {
    let mut scene = build_scene(config)?;

    let source = KernelSource::load(&config.kernel.path, &config.kernel.entry_point)
        .context("Failed to load kernel")?;
    let mut renderer = Renderer::with_wgpu(
        &source,
        config.kernel.abi,
        config.render,
        config.width,
        config.height(),
    )
    .context("Failed to initialize GPU renderer")?;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {:?}", config.output_dir))?;

    let mut frame = 0;
    render_frame(&mut renderer, &scene, &config.output_dir, frame)?;

    if let Some((width, height)) = config.resize {
        renderer.update_image_size(width, height)?;
        let camera = scene.camera().with_aspect_ratio(width as f64 / height as f64);
        scene.set_camera(camera);

        frame += 1;
        render_frame(&mut renderer, &scene, &config.output_dir, frame)?;
    }

    for command in &config.commands {
        scene.apply(*command, &config.controls);
        log::info!("Applied camera command '{}'", command);

        frame += 1;
        render_frame(&mut renderer, &scene, &config.output_dir, frame)?;
    }

    renderer.release();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting Orb");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => {
            log::info!("No config file given, using defaults");
            Config::default()
        }
    };

    run(&config)
}
