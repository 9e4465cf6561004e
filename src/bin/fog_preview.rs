//! Render the fallback scene with fog to a PNG, without a GPU.
//!
//! Usage: cargo run --release --bin fog_preview -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Fog config JSON (default: built-in defaults)
//!   --density <D>         Fog density (default: from config)
//!   --height-factor <H>   Height factor (default: from config)
//!   --time <SECONDS>      Fog time, animates the noise (default: 0)
//!   --frames <N>          Split --time into N equal frame steps (default: 1)
//!   --width <PX>          Image width (default: 960)
//!   --height <PX>         Image height (default: 540)
//!   --out <PATH>          Output file (default: fog_preview.png)

use std::time::Instant;

use brume::atmosphere::{FogConfig, FogSystem};
use brume::core::Result;
use brume::preview::PreviewScene;

fn main() {
    brume::core::logging::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = match parse_str_arg(&args, "--config") {
        Some(path) => FogConfig::from_json_file(path)?,
        None => FogConfig::default(),
    };
    let width = parse_u32_arg(&args, "--width").unwrap_or(960);
    let height = parse_u32_arg(&args, "--height").unwrap_or(540);
    let time = parse_f32_arg(&args, "--time").unwrap_or(0.0);
    let frames = parse_u32_arg(&args, "--frames").unwrap_or(1).max(1);
    let out = parse_str_arg(&args, "--out").unwrap_or_else(|| "fog_preview.png".to_string());

    let shape = config.shape;
    let mut fog = FogSystem::new(config, None)?;
    let mut scene = PreviewScene::new();
    fog.register_meshes(scene.meshes());

    if let Some(density) = parse_f32_arg(&args, "--density") {
        fog.set_density(density)?;
    }
    if let Some(height_factor) = parse_f32_arg(&args, "--height-factor") {
        fog.set_height_factor(height_factor)?;
    }
    let dt = time / frames as f32;
    for _ in 0..frames {
        fog.update(dt);
    }

    let params = fog.params();
    println!("=== Brume Fog Preview ===");
    println!("Density:       {}", params.density);
    println!("Height factor: {}", params.height_factor);
    println!("Time:          {:.3}s", params.time);
    println!("Programs:      {}", fog.registry().live_count());
    println!("Size:          {}x{}", width, height);

    let start = Instant::now();
    let image = scene.snapshot().render(width, height, &shape)?;
    log::info!("Rendered in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    image.save(&out)?;
    println!("Saved to {}", out);
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
