//! Particle-based stochastic erosion.
//!
//! Each particle is a droplet carrying water and sediment across the terrain.
//! Particles in a batch run in parallel against a read-only snapshot and record
//! their own sparse height deltas; batches are merged in particle order, so the
//! result does not depend on thread scheduling.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::climate::{lerp, ClimateInputs};
use crate::erosion::config::ParticleConfig;
use crate::error::Result;
use crate::terrain::HeightField;

/// Why a particle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Water fell below `min_water`.
    Evaporated,
    /// `max_steps` reached.
    StepLimit,
    /// Left the grid; held sediment is lost.
    OutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleState {
    Active,
    Terminated(Termination),
}

/// Heights seen by one particle: a shared snapshot plus its own writes.
#[derive(Debug)]
pub struct LocalTerrain<'a> {
    base: &'a HeightField,
    delta: HashMap<usize, f32>,
}

impl<'a> LocalTerrain<'a> {
    pub fn new(base: &'a HeightField) -> Self {
        Self {
            base,
            delta: HashMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    #[inline]
    pub fn at(&self, idx: usize) -> f32 {
        self.base.data[idx] + self.delta.get(&idx).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn add(&mut self, idx: usize, amount: f32) {
        *self.delta.entry(idx).or_insert(0.0) += amount;
    }

    /// Bilinear height at a continuous position inside `[0, w-1) × [0, h-1)`.
    pub fn sample(&self, pos: Vec2) -> f32 {
        let w = self.base.width() as usize;
        let x0 = pos.x.floor().max(0.0) as usize;
        let y0 = pos.y.floor().max(0.0) as usize;
        let x1 = (x0 + 1).min(w - 1);
        let y1 = (y0 + 1).min(self.base.height() as usize - 1);
        let tx = pos.x - x0 as f32;
        let ty = pos.y - y0 as f32;
        let top = lerp(self.at(y0 * w + x0), self.at(y0 * w + x1), tx);
        let bottom = lerp(self.at(y1 * w + x0), self.at(y1 * w + x1), tx);
        lerp(top, bottom, ty)
    }

    /// The accumulated deltas, ordered by cell index.
    pub fn into_deltas(self) -> Vec<(usize, f32)> {
        let mut out: Vec<(usize, f32)> = self.delta.into_iter().filter(|(_, d)| *d != 0.0).collect();
        out.sort_unstable_by_key(|(idx, _)| *idx);
        out
    }
}

/// One droplet.
#[derive(Debug, Clone, PartialEq)]
pub struct ErosionParticle {
    pub position: Vec2,
    pub velocity: Vec2,
    /// `x`/`z` are horizontal, `y` is vertical.
    pub momentum: Vec3,
    /// Vertical position in cell units.
    pub altitude: f32,
    pub water: f32,
    pub sediment: f32,
    pub radius: f32,
    pub strength: f32,
    /// °C
    pub temperature: f32,
    /// Mineral content in [0, 1], drives acidity.
    pub mineral: f32,
    /// Rain intensity in [0, 1], drives acidity.
    pub rain_intensity: f32,
    pub steps: u32,
}

/// Material moved by a single particle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleTrace {
    pub deltas: Vec<(usize, f32)>,
    pub steps: u32,
    pub eroded: f64,
    pub deposited: f64,
    /// Sediment carried when the particle stopped inside the grid.
    pub held_sediment: f32,
    /// Sediment carried off the grid.
    pub lost_sediment: f32,
    pub termination: Option<Termination>,
}

impl ErosionParticle {
    /// A full droplet at `position` moving along `direction` at `start_speed`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        position: Vec2,
        direction: Vec2,
        terrain: &LocalTerrain<'_>,
        config: &ParticleConfig,
        temperature: f32,
        mineral: f32,
        radius: f32,
        strength: f32,
    ) -> Self {
        let velocity = direction.normalize_or_zero() * config.start_speed;
        Self {
            position,
            velocity,
            momentum: Vec3::new(velocity.x, 0.0, velocity.y),
            altitude: terrain.sample(position) * config.height_scale,
            water: 1.0,
            sediment: 0.0,
            radius,
            strength,
            temperature,
            mineral,
            rain_intensity: config.rain_intensity.clamp(0.0, 1.0),
            steps: 0,
        }
    }

    /// Spawns a particle on a random cell above `min_spawn_height`.
    ///
    /// Returns `None` for grids too small to move on or when no valid cell is hit.
    pub fn spawn(
        rng: &mut ChaCha8Rng,
        terrain: &LocalTerrain<'_>,
        climate: &ClimateInputs,
        config: &ParticleConfig,
    ) -> Option<Self> {
        let (w, h) = (terrain.width(), terrain.height());
        if w < 3 || h < 3 {
            return None;
        }
        for _ in 0..8 {
            let cx = rng.random_range(0..w - 1);
            let cy = rng.random_range(0..h - 1);
            let idx = (cy * w + cx) as usize;
            if terrain.at(idx) < config.min_spawn_height {
                continue;
            }
            let position = Vec2::new(cx as f32 + rng.random::<f32>(), cy as f32 + rng.random::<f32>());
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let jitter = uniform(rng, -config.temperature_jitter_c, config.temperature_jitter_c);
            let mut particle = Self::new(
                position,
                Vec2::from_angle(angle),
                terrain,
                config,
                climate.temperature.at(idx) + jitter,
                uniform(rng, config.min_mineral, config.max_mineral),
                uniform(rng, config.min_radius, config.max_radius),
                uniform(rng, config.min_strength, config.max_strength),
            );
            particle.rain_intensity = (config.rain_intensity * climate.rainfall).clamp(0.0, 1.0);
            return Some(particle);
        }
        None
    }

    fn in_domain(&self, terrain: &LocalTerrain<'_>) -> bool {
        let max_x = (terrain.width() - 1) as f32;
        let max_y = (terrain.height() - 1) as f32;
        self.position.x >= 0.0 && self.position.x < max_x && self.position.y >= 0.0 && self.position.y < max_y
    }

    /// Advances one step, writing height changes into `terrain`.
    pub fn step(
        &mut self,
        terrain: &mut LocalTerrain<'_>,
        config: &ParticleConfig,
        trace: &mut ParticleTrace,
    ) -> ParticleState {
        if !self.in_domain(terrain) {
            return ParticleState::Terminated(Termination::OutOfBounds);
        }

        let kernel = Kernel::gather(terrain, self.position, self.radius);
        let gradient = kernel.gradient(terrain) * config.height_scale;

        let dt = config.dt;
        let accel = Vec3::new(-gradient.x * config.gravity, -config.gravity, -gradient.y * config.gravity);
        self.momentum += accel * dt;

        let damping = (1.0 - config.inertia * dt).max(0.0);
        self.velocity = Vec2::new(self.momentum.x, self.momentum.z) * damping;
        self.momentum.x = self.velocity.x;
        self.momentum.z = self.velocity.y;

        self.position += self.velocity * dt;
        self.altitude += self.momentum.y * dt;
        self.steps += 1;

        if !self.in_domain(terrain) {
            return ParticleState::Terminated(Termination::OutOfBounds);
        }

        self.collide(terrain, gradient, config);

        let cell = nearest_cell(terrain, self.position);
        trace.eroded += self.frost(terrain, cell, config) as f64;
        trace.eroded += self.chemical(terrain, cell, config) as f64;

        let kernel = Kernel::gather(terrain, self.position, self.radius);
        let speed = self.velocity.length();
        let capacity = if speed < config.critical_velocity {
            0.0
        } else {
            config.sediment_capacity
                * speed
                * speed
                * self.water
                * (1.0 - (-speed / config.critical_velocity).exp())
        };

        if self.sediment > capacity {
            let amount = (self.sediment - capacity) * config.deposition_rate;
            kernel.deposit(terrain, amount);
            self.sediment -= amount;
            trace.deposited += amount as f64;
        } else {
            let amount = (capacity - self.sediment) * self.strength * dt;
            let taken = kernel.erode(terrain, amount);
            self.sediment += taken;
            trace.eroded += taken as f64;
        }

        self.water *= 1.0 - config.evaporation;
        if self.water < config.min_water {
            ParticleState::Terminated(Termination::Evaporated)
        } else if self.steps >= config.max_steps {
            ParticleState::Terminated(Termination::StepLimit)
        } else {
            ParticleState::Active
        }
    }

    fn collide(&mut self, terrain: &LocalTerrain<'_>, gradient: Vec2, config: &ParticleConfig) {
        let ground = terrain.sample(self.position) * config.height_scale;
        if self.altitude >= ground {
            return;
        }
        self.altitude = ground;
        let normal = Vec3::new(-gradient.x, 1.0, -gradient.y).normalize();
        let into = self.momentum.dot(normal);
        if into < 0.0 {
            self.momentum -= (1.0 + config.restitution) * into * normal;
            self.velocity = Vec2::new(self.momentum.x, self.momentum.z);
        }
    }

    /// Freeze-thaw damage; returns the material added to the load.
    fn frost(&mut self, terrain: &mut LocalTerrain<'_>, cell: usize, config: &ParticleConfig) -> f32 {
        if self.temperature >= 0.0 || self.water <= config.frost_water_threshold {
            return 0.0;
        }
        let amount = self.temperature.abs() * self.water * 0.1 * config.frost_rate * config.dt;
        self.remove_at(terrain, cell, amount)
    }

    /// Acid dissolution; returns the material added to the load.
    fn chemical(&mut self, terrain: &mut LocalTerrain<'_>, cell: usize, config: &ParticleConfig) -> f32 {
        let acidity = lerp(7.0, 4.0, (self.rain_intensity * self.mineral).clamp(0.0, 1.0));
        let amount = (7.0 - acidity).abs() * self.mineral * 0.05 * config.chemical_rate * config.dt;
        self.remove_at(terrain, cell, amount)
    }

    fn remove_at(&mut self, terrain: &mut LocalTerrain<'_>, cell: usize, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let taken = amount.min(terrain.at(cell).max(0.0));
        terrain.add(cell, -taken);
        self.sediment += taken;
        taken
    }
}

/// Gaussian weights of the cells around a position.
struct Kernel {
    cells: Vec<(usize, Vec2, f32)>,
    total: f32,
}

impl Kernel {
    fn gather(terrain: &LocalTerrain<'_>, pos: Vec2, radius: f32) -> Self {
        let w = terrain.width() as i64;
        let h = terrain.height() as i64;
        let reach = radius.ceil() as i64;
        let cx = pos.x.round() as i64;
        let cy = pos.y.round() as i64;
        let two_r2 = 2.0 * radius * radius;

        let mut cells = Vec::with_capacity(((2 * reach + 1) * (2 * reach + 1)) as usize);
        let mut total = 0.0;
        for y in (cy - reach)..=(cy + reach) {
            for x in (cx - reach)..=(cx + reach) {
                if x < 0 || y < 0 || x >= w || y >= h {
                    continue;
                }
                let offset = Vec2::new(x as f32, y as f32) - pos;
                let d2 = offset.length_squared();
                if d2 > radius * radius {
                    continue;
                }
                let weight = (-d2 / two_r2).exp();
                cells.push(((y * w + x) as usize, offset, weight));
                total += weight;
            }
        }
        Self { cells, total }
    }

    /// Weighted least-squares slope `(dh/dx, dh/dy)` in height units per cell.
    fn gradient(&self, terrain: &LocalTerrain<'_>) -> Vec2 {
        if self.total <= 0.0 {
            return Vec2::ZERO;
        }
        let mean = self.cells.iter().map(|&(i, _, wt)| terrain.at(i) * wt).sum::<f32>() / self.total;
        let mut num = Vec2::ZERO;
        let mut den = Vec2::ZERO;
        for &(i, offset, wt) in &self.cells {
            let dh = terrain.at(i) - mean;
            num += offset * (dh * wt);
            den += offset * offset * wt;
        }
        Vec2::new(
            if den.x > f32::EPSILON { num.x / den.x } else { 0.0 },
            if den.y > f32::EPSILON { num.y / den.y } else { 0.0 },
        )
    }

    fn deposit(&self, terrain: &mut LocalTerrain<'_>, amount: f32) {
        if self.total <= 0.0 || amount <= 0.0 {
            return;
        }
        for &(i, _, wt) in &self.cells {
            terrain.add(i, amount * wt / self.total);
        }
    }

    /// Removes up to `amount`, never more than a cell holds. Returns what was taken.
    fn erode(&self, terrain: &mut LocalTerrain<'_>, amount: f32) -> f32 {
        if self.total <= 0.0 || amount <= 0.0 {
            return 0.0;
        }
        let mut taken = 0.0;
        for &(i, _, wt) in &self.cells {
            let want = amount * wt / self.total;
            let got = want.min(terrain.at(i).max(0.0));
            terrain.add(i, -got);
            taken += got;
        }
        taken
    }
}

fn nearest_cell(terrain: &LocalTerrain<'_>, pos: Vec2) -> usize {
    let w = terrain.width() as usize;
    let x = (pos.x.round().max(0.0) as usize).min(w - 1);
    let y = (pos.y.round().max(0.0) as usize).min(terrain.height() as usize - 1);
    y * w + x
}

fn uniform(rng: &mut ChaCha8Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}

/// Runs a particle to termination against `snapshot`.
pub fn simulate_particle(
    mut particle: ErosionParticle,
    snapshot: &HeightField,
    config: &ParticleConfig,
) -> ParticleTrace {
    let mut terrain = LocalTerrain::new(snapshot);
    let mut trace = ParticleTrace::default();
    let termination = loop {
        match particle.step(&mut terrain, config, &mut trace) {
            ParticleState::Active => continue,
            ParticleState::Terminated(t) => break t,
        }
    };
    match termination {
        Termination::OutOfBounds => trace.lost_sediment = particle.sediment,
        _ => trace.held_sediment = particle.sediment,
    }
    trace.steps = particle.steps;
    trace.termination = Some(termination);
    trace.deltas = terrain.into_deltas();
    trace
}

/// Totals for a particle phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSummary {
    pub spawned: u32,
    pub out_of_bounds: u32,
    pub steps: u64,
    pub eroded: f64,
    pub deposited: f64,
    pub held_sediment: f64,
    pub lost_sediment: f64,
}

/// Runs `config.count` particles over `field` in snapshot batches.
pub fn run_particles(
    field: &mut HeightField,
    climate: &ClimateInputs,
    config: &ParticleConfig,
    seed: u64,
) -> Result<ParticleSummary> {
    let mut summary = ParticleSummary::default();
    if config.count == 0 {
        return Ok(summary);
    }

    let mut snapshot = HeightField::new(field.width(), field.height())?;
    let batch = config.batch_size.max(1);
    let mut start = 0u32;
    while start < config.count {
        let end = (start + batch).min(config.count);
        snapshot.data.copy_from_slice(&field.data);

        let traces: Vec<Option<ParticleTrace>> = (start..end)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(i as u64);
                let view = LocalTerrain::new(&snapshot);
                let particle = ErosionParticle::spawn(&mut rng, &view, climate, config)?;
                Some(simulate_particle(particle, &snapshot, config))
            })
            .collect();

        for trace in traces.iter().flatten() {
            for &(idx, delta) in &trace.deltas {
                field.data[idx] += delta;
            }
            summary.spawned += 1;
            summary.steps += trace.steps as u64;
            summary.eroded += trace.eroded;
            summary.deposited += trace.deposited;
            summary.held_sediment += trace.held_sediment as f64;
            summary.lost_sediment += trace.lost_sediment as f64;
            if trace.termination == Some(Termination::OutOfBounds) {
                summary.out_of_bounds += 1;
            }
        }
        field.clamp01();

        debug!(start, end, "Merged particle batch");
        start = end;
    }
    Ok(summary)
}
