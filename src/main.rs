//! Grapple Swing - headless demo runner
//!
//! Usage: `grapple-swing [scene.json]`
//!
//! Loads a scene (or the built-in demo), drives the player with a scripted
//! input sequence at 60 fps and logs every event it produces.
//! Set `RUST_LOG=debug` for grapple and stun internals.

use anyhow::{Context, Result};
use grapple_swing::SceneDesc;
use grapple_swing::consts::SIM_DT;
use grapple_swing::sim::{FrameInput, PlayerEvent};

/// Frames to simulate
const SCRIPT_FRAMES: u32 = 420;

/// Scripted input for a frame: settle, walk, grapple and swing, let go, walk back
fn scripted_input(frame: u32) -> FrameInput {
    match frame {
        0..30 => FrameInput::new(0.0, false),
        30..60 => FrameInput::new(1.0, false),
        60..90 => FrameInput::new(0.0, true),
        90..210 => {
            let push = if (frame / 30) % 2 == 0 { 1.0 } else { -1.0 };
            FrameInput::new(push, true)
        }
        210..300 => FrameInput::new(0.0, false),
        _ => FrameInput::new(-1.0, false),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let scene = match std::env::args().nth(1) {
        Some(path) => SceneDesc::load(&path).with_context(|| format!("loading scene {}", path))?,
        None => SceneDesc::demo(),
    };
    let mut sim = scene
        .build()
        .with_context(|| format!("building scene '{}'", scene.name))?;
    log::info!("Grapple Swing starting scene '{}'", scene.name);

    let mut shots = 0;
    let mut latches = 0;
    let mut stuns = 0;
    for frame in 0..SCRIPT_FRAMES {
        sim.advance(SIM_DT, &scripted_input(frame));
        for event in sim.drain_events() {
            match event {
                // Per-step chatter
                PlayerEvent::WhileOnLand { .. }
                | PlayerEvent::WhileInAir { .. }
                | PlayerEvent::WhileSwinging { .. } => log::trace!("[{}] {:?}", frame, event),
                _ => {
                    log::info!("[{}] {:?}", frame, event);
                    match event {
                        PlayerEvent::GrappleShoot => shots += 1,
                        PlayerEvent::GrappleLatch => latches += 1,
                        PlayerEvent::Stun { .. } => stuns += 1,
                        _ => {}
                    }
                }
            }
        }
    }

    let body = sim.player.body();
    log::info!(
        "Done after {} physics steps: position {:?}, velocity {:?}, grapple {:?}",
        sim.tick_count,
        body.position(),
        body.velocity(),
        sim.player.grapple().phase()
    );
    println!(
        "{} frames, {} shots, {} latches, {} stuns, final position ({:.2}, {:.2})",
        SCRIPT_FRAMES,
        shots,
        latches,
        stuns,
        body.position().x,
        body.position().y
    );
    Ok(())
}
