// Beam particles and the animation loop that drives them.
//
// Each beam segment carries a handful of particles sliding from its source to
// its destination end. The whole set is rebuilt whenever the authority's beam
// list changes; particles never outlive the segment they were spawned on.
// `AnimationLoop` wraps the set in a start/stop lifecycle: it starts with play
// and stops exactly once, on the terminal transition.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::snapshot::BeamSegment;

const MIN_PER_SEGMENT: usize = 3;
const MAX_PER_SEGMENT: usize = 5;
/// Progress gained per tick, sampled uniformly per particle.
const MIN_SPEED: f64 = 0.005;
const MAX_SPEED: f64 = 0.015;

/// A point travelling along one beam segment. Endpoints are in board cell
/// coordinates (may be -1 or `board_size` for margin light sources).
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub from: (i32, i32),
    pub to: (i32, i32),
    /// Fraction of the segment covered, in `[0, 1)`.
    pub progress: f64,
    pub speed: f64,
    pub color: String,
}

impl Particle {
    /// Current position in fractional cell coordinates.
    pub fn position(&self) -> (f64, f64) {
        let (x1, y1) = (self.from.0 as f64, self.from.1 as f64);
        let (x2, y2) = (self.to.0 as f64, self.to.1 as f64);
        (
            x1 + (x2 - x1) * self.progress,
            y1 + (y2 - y1) * self.progress,
        )
    }

    fn advance(&mut self) {
        self.progress += self.speed;
        if self.progress >= 1.0 {
            self.progress = 0.0;
        }
    }
}

pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic particles for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        ParticleSystem {
            particles: Vec::new(),
            rng,
        }
    }

    /// Replace every particle with a fresh set for `beams`.
    pub fn regenerate(&mut self, beams: &[BeamSegment]) {
        self.particles.clear();
        for beam in beams {
            let count = self.rng.gen_range(MIN_PER_SEGMENT..=MAX_PER_SEGMENT);
            for _ in 0..count {
                self.particles.push(Particle {
                    from: (beam.x1, beam.y1),
                    to: (beam.x2, beam.y2),
                    progress: self.rng.gen_range(0.0..1.0),
                    speed: self.rng.gen_range(MIN_SPEED..MAX_SPEED),
                    color: beam.color.clone(),
                });
            }
        }
        debug!(
            "regenerated {} particles for {} beam segments",
            self.particles.len(),
            beams.len()
        );
    }

    pub fn advance(&mut self) {
        for particle in &mut self.particles {
            particle.advance();
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AnimationLoop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    /// Terminal. The loop never restarts.
    Stopped,
}

/// Render-cadence tick source with a one-shot lifecycle.
pub struct AnimationLoop {
    state: LoopState,
    particles: ParticleSystem,
    ticks: u64,
}

impl AnimationLoop {
    pub fn new(particles: ParticleSystem) -> Self {
        AnimationLoop {
            state: LoopState::NotStarted,
            particles,
            ticks: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Begin ticking. Returns false if already running or stopped for good.
    pub fn start(&mut self) -> bool {
        if self.state != LoopState::NotStarted {
            return false;
        }
        info!("animation loop started");
        self.state = LoopState::Running;
        true
    }

    /// Stop permanently. Returns true only for the call that stopped it.
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        info!("animation loop stopped after {} ticks", self.ticks);
        self.state = LoopState::Stopped;
        self.particles.clear();
        true
    }

    /// Beams changed; rebuild the particle set unless already torn down.
    pub fn on_beams_changed(&mut self, beams: &[BeamSegment]) {
        if self.state != LoopState::Stopped {
            self.particles.regenerate(beams);
        }
    }

    /// Advance one frame. Returns whether a repaint is due.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.particles.advance();
        self.ticks += 1;
        true
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.particles()
    }
}
