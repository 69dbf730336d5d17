use anyhow::{bail, Result};

use tryon_anchor::config::Config;
use tryon_anchor::pose::ReplaySource;
use tryon_anchor::scene::{RecordingOverlay, SceneSync};
use tryon_anchor::tracker::{AnchorEngine, TickOutcome};
use tryon_anchor::transform::WorldTransform;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(recording) = args.get(1) else {
        bail!("usage: {} <recording.jsonl> [config.toml]", env!("CARGO_BIN_NAME"));
    };
    let config = match args.get(2) {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(CONFIG_PATH),
    };

    println!("Anchor Replay {}", env!("GIT_VERSION"));
    println!("Recording: {}", recording);
    println!(
        "Camera: fov={}° z={} aspect={}",
        config.camera.fov_y_deg, config.camera.position_z, config.camera.aspect
    );
    println!(
        "Smooth: position={}, scale={}, rotation={}",
        config.smooth.position, config.smooth.scale, config.smooth.rotation
    );
    println!("Mirror: {}", if config.display.mirror_x { "ON" } else { "OFF" });
    println!();

    let mut engine = AnchorEngine::new(&config)?;
    let sync = SceneSync::new(config.display.clone());
    let mut node = WorldTransform::identity();
    let mut overlay = RecordingOverlay::default();
    // UIの値はティックごとに読む想定。リプレイでは設定ファイルの値で固定
    let adjustment = config.adjust;

    let mut updated = 0usize;
    let mut ticks = 0usize;
    for frame in ReplaySource::open(recording)? {
        let outcome = engine.tick(frame.as_ref(), adjustment);
        sync.apply(&outcome, frame.as_ref(), &mut node, &mut overlay);

        let t = &node;
        match outcome {
            TickOutcome::Updated { strategy, anchor_view, .. } => {
                updated += 1;
                let points = overlay.last.as_ref().map_or(0, |o| o.points.len());
                println!(
                    "#{:04} {:?} anchor=({:.1}, {:.1}) pos=[{:.3}, {:.3}, {:.3}] scale=[{:.3}, {:.3}, {:.3}] rotZ={:.3} overlay={}pt",
                    ticks,
                    strategy,
                    anchor_view.x,
                    anchor_view.y,
                    t.position.x,
                    t.position.y,
                    t.position.z,
                    t.scale.x,
                    t.scale.y,
                    t.scale.z,
                    t.rotation_z,
                    points
                );
            }
            TickOutcome::Held { reason, .. } => {
                println!("#{:04} hold ({:?})", ticks, reason);
            }
        }
        ticks += 1;
    }

    println!();
    println!("Ticks: {} (updated {}, held {})", ticks, updated, ticks - updated);
    Ok(())
}
