//! # Pathway Sim
//!
//! Headless driver for the progression path engine. Plays a simulated
//! player session through `ProgressionController` and logs what a renderer
//! would draw each second.
//!
//! Usage: `pathway-sim [--frames N] [--seed S] [--width W] [--height H] [--json]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod session;

use anyhow::Result;
use clap::Parser;
use pathway_engine::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::session::Session;

/// Nominal frame time.
const FRAME_TIME: f32 = 1.0 / 60.0;

/// Headless driver for the progression path engine.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
struct Options {
    /// Frames to simulate at 60 fps
    #[arg(long, default_value_t = 1800)]
    frames: u64,
    /// Seed for the simulated session
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Viewport width in logical pixels
    #[arg(long, default_value_t = 390.0)]
    width: f32,
    /// Viewport height in logical pixels
    #[arg(long, default_value_t = 844.0)]
    height: f32,
    /// Print frame summaries as JSON lines
    #[arg(long)]
    json: bool,
}

impl Options {
    fn viewport(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("pathway=info".parse()?))
        .init();

    let options = Options::parse();
    info!("Pathway sim starting ({options:?})");

    let config = EngineConfig::load();
    let mut rng = fastrand::Rng::with_seed(options.seed);
    let mut session = Session::new();
    let source = StaticSource::new(session.achievements());

    let mut controller = ProgressionController::new(config, source)?;
    controller.set_viewport(options.viewport());
    controller.scroll_to_current_progress();

    let mut last_frame = None;
    for _ in 0..options.frames {
        if session.advance(&mut rng) {
            let list = session.achievements();
            controller.source_mut().set_achievements(list);
            controller.source_mut().set_statistics(session.statistics());
        }

        // Occasional hitches so adaptive quality has something to react to.
        let dt = if rng.f32() < 0.02 {
            FRAME_TIME * rng.f32().mul_add(3.0, 1.0)
        } else {
            FRAME_TIME
        };
        let frame = controller.update(dt, Session::signals(&mut rng));

        for event in &frame.events {
            match event {
                ProgressionEvent::Unlocked { id } => {
                    info!("Unlocked {id}");
                    if let Err(e) = controller.scroll_to_achievement(id) {
                        debug!("Could not scroll to {id}: {e}");
                    }
                }
                ProgressionEvent::CelebrationFinished { id } => debug!("Celebrated {id}"),
                other => debug!("{other:?}"),
            }
        }

        if frame.frame % 60 == 0 {
            let summary = frame.summary();
            if options.json {
                println!("{}", serde_json::to_string(&summary)?);
            } else {
                info!(
                    "frame {}: {}/{} nodes visible, scroll {:.0}, quality {:?}/{:?}",
                    summary.frame,
                    summary.visible_nodes,
                    summary.nodes,
                    summary.scroll_offset,
                    summary.particle_quality,
                    summary.graphics_quality
                );
            }
        }
        last_frame = Some(frame);
    }

    if let Some(frame) = last_frame {
        println!("{}", serde_json::to_string_pretty(&frame.summary())?);
    }
    controller.teardown();

    info!("Pathway sim finished");
    Ok(())
}
