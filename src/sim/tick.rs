//! Fixed timestep simulation loop
//!
//! Each rendered frame feeds its real delta into an accumulator that is
//! drained in fixed `SIM_DT` physics steps, then runs one variable-rate frame
//! step. Both halves are deterministic given the same sequence of inputs.

use super::events::PlayerEvent;
use super::player::PlayerOrchestrator;
use super::state::{DebugSettings, FrameInput, GamePhase};
use super::world::World;
use crate::consts::*;

/// A level plus the player moving through it
#[derive(Debug, Clone)]
pub struct Simulation {
    pub world: World,
    pub player: PlayerOrchestrator,
    pub phase: GamePhase,
    pub debug: DebugSettings,
    accumulator: f32,
    /// Physics steps run so far
    pub tick_count: u64,
}

impl Simulation {
    pub fn new(world: World, player: PlayerOrchestrator) -> Self {
        Self {
            world,
            player,
            phase: GamePhase::Playing,
            debug: DebugSettings::default(),
            accumulator: 0.0,
            tick_count: 0,
        }
    }

    /// Gameplay input is only read while playing outside god mode
    pub fn accepts_input(&self) -> bool {
        self.phase == GamePhase::Playing && !self.debug.god_mode
    }

    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            GamePhase::Playing => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Playing,
        };
        log::info!("Phase: {:?}", self.phase);
    }

    /// Advance by one rendered frame. Returns the number of physics steps run.
    pub fn advance(&mut self, frame_dt: f32, input: &FrameInput) -> u32 {
        let frame_dt = frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += frame_dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.fixed_step();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::warn!("Dropping {:.3}s of simulation time", self.accumulator);
            self.accumulator = 0.0;
        }

        let accept = self.accepts_input();
        self.player
            .frame_update(&mut self.world, *input, accept, frame_dt);
        substeps
    }

    /// One physics step: platforms first, then the player
    pub fn fixed_step(&mut self) {
        self.world.platforms.step(SIM_DT);
        self.player.fixed_update(&mut self.world, SIM_DT);
        self.tick_count += 1;
    }

    /// Put the player back in a neutral state
    pub fn reset_player(&mut self) {
        self.player.reset(&mut self.world);
        self.accumulator = 0.0;
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.player.drain_events()
    }
}
