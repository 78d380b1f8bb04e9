use rand::Rng;
use veinmine_engine::gate::PlayerId;

use crate::config::EffectsConfig;
use crate::host::{Effects, Location};

/// Largest particle jitter radius, in blocks.
pub const MAX_PARTICLE_RADIUS: f64 = 16.0;

/// Sounds and particles for vein operations, resolved from config.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectPlayer {
    sounds: bool,
    completion_sound: String,
    block_sound: String,
    per_block_sound: bool,
    volume: f32,
    pitch: f32,
    particles: bool,
    particle: String,
    particle_count: u32,
    particle_radius: f64,
    per_block_particles: bool,
}

impl EffectPlayer {
    pub fn new(config: &EffectsConfig) -> Self {
        let sounds = &config.sounds;
        let particles = &config.particles;
        Self {
            sounds: sounds.enabled,
            completion_sound: sounds.completion_sound.clone(),
            block_sound: sounds.block_sound.clone(),
            per_block_sound: sounds.per_block_sound,
            volume: sounds.volume.clamp(0.0, 1.0) as f32,
            pitch: sounds.pitch.clamp(0.5, 2.0) as f32,
            particles: particles.enabled,
            particle: particles.kind.clone(),
            particle_count: particles.count.clamp(1, 20) as u32,
            particle_radius: if particles.radius.is_finite() {
                particles.radius.clamp(0.0, MAX_PARTICLE_RADIUS)
            } else {
                0.0
            },
            per_block_particles: particles.per_block,
        }
    }

    /// Effects for one broken block, if per-block effects are on.
    pub fn block_broken<R: Rng + ?Sized>(
        &self,
        effects: &mut dyn Effects,
        player: PlayerId,
        at: Location,
        rng: &mut R,
    ) {
        if self.particles && self.per_block_particles {
            self.burst(effects, player, at, rng);
        }
        if self.sounds && self.per_block_sound && !self.block_sound.is_empty() {
            effects.play_sound(player, at, &self.block_sound, self.volume, self.pitch);
        }
    }

    /// Effects played once at the player when a vein completes.
    pub fn vein_completed<R: Rng + ?Sized>(
        &self,
        effects: &mut dyn Effects,
        player: PlayerId,
        at: Location,
        rng: &mut R,
    ) {
        if self.sounds && !self.completion_sound.is_empty() {
            effects.play_sound(player, at, &self.completion_sound, self.volume, self.pitch);
        }
        if self.particles {
            self.burst(effects, player, at, rng);
        }
    }

    fn burst<R: Rng + ?Sized>(&self, effects: &mut dyn Effects, player: PlayerId, at: Location, rng: &mut R) {
        if self.particle.is_empty() {
            return;
        }
        let r = self.particle_radius;
        for _ in 0..self.particle_count {
            let jittered = Location::new(
                at.x + rng.gen_range(-r..=r),
                at.y + rng.gen_range(0.0..=r),
                at.z + rng.gen_range(-r..=r),
            );
            effects.spawn_particle(player, &self.particle, jittered);
        }
    }
}

impl Default for EffectPlayer {
    fn default() -> Self {
        Self::new(&EffectsConfig::default())
    }
}
