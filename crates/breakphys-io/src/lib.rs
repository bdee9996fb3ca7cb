use anyhow::{anyhow, Context, Result};
use blake3::Hasher;
use breakphys_core::{iso, Vec2, Velocity};
use breakphys_fracture::{
    AnchorGate, BreakableDesc, FractureError, FractureScene, DEFAULT_STRENGTH,
};
use breakphys_geom::{Material, Polygon, Shape};
use breakphys_world::{BodyDesc, FixtureDesc, MotionType, UserData, World, WorldSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub const SCENE_VERSION: u32 = 1;

/// Shape as written in a scene file. Points are `[x, y]` in the body frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDesc {
    Circle {
        radius: f32,
        #[serde(default)]
        center: [f32; 2],
    },
    Box {
        hx: f32,
        hy: f32,
        #[serde(default)]
        center: [f32; 2],
        #[serde(default)]
        angle: f32,
    },
    Polygon { vertices: Vec<[f32; 2]> },
}

impl ShapeDesc {
    pub fn to_shape(&self) -> Shape {
        match self {
            ShapeDesc::Circle { radius, center } => Shape::Circle { radius: *radius, center: Vec2::from(*center) },
            ShapeDesc::Box { hx, hy, center, angle } => {
                Shape::Polygon(Polygon::oriented_rect(*hx, *hy, Vec2::from(*center), *angle))
            }
            ShapeDesc::Polygon { vertices } => Shape::polygon(to_points(vertices)),
        }
    }

    fn validate(&self, at: &str) -> Result<()> {
        match self {
            ShapeDesc::Circle { radius, .. } => {
                if !(*radius > 0.0 && radius.is_finite()) {
                    return Err(anyhow!("{at}: circle radius must be positive, got {radius}"));
                }
            }
            ShapeDesc::Box { hx, hy, .. } => {
                if !(*hx > 0.0 && *hy > 0.0) {
                    return Err(anyhow!("{at}: box half extents must be positive, got ({hx}, {hy})"));
                }
            }
            ShapeDesc::Polygon { vertices } => check_loop(vertices, at)?,
        }
        Ok(())
    }
}

fn to_points(v: &[[f32; 2]]) -> Vec<Vec2> { v.iter().copied().map(Vec2::from).collect() }

fn check_loop(v: &[[f32; 2]], at: &str) -> Result<()> {
    if v.len() < 3 {
        return Err(anyhow!("{at}: polygon needs at least 3 vertices, got {}", v.len()));
    }
    if v.iter().flatten().any(|c| !c.is_finite()) {
        return Err(anyhow!("{at}: non-finite vertex"));
    }
    Ok(())
}

/// A plain body: static ground pieces or free dynamic props.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub position: [f32; 2],
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub velocity: [f32; 2],
    #[serde(default)]
    pub angular_velocity: f32,
    pub shapes: Vec<ShapeDesc>,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub user_data: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakableSpec {
    pub position: [f32; 2],
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub velocity: [f32; 2],
    #[serde(default)]
    pub angular_velocity: f32,
    /// One convex loop per part.
    pub loops: Vec<Vec<[f32; 2]>>,
    pub density: f32,
    #[serde(default = "default_strength")]
    pub strength: f32,
    #[serde(default)]
    pub anchor_gate: AnchorGate,
    #[serde(default)]
    pub user_data: Option<u64>,
}

fn default_strength() -> f32 { DEFAULT_STRENGTH }
fn default_version() -> u32 { SCENE_VERSION }
fn default_dt() -> f32 { 1.0 / 60.0 }
fn default_ticks() -> u32 { 240 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub settings: WorldSettings,
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default = "default_ticks")]
    pub ticks: u32,
    #[serde(default)]
    pub statics: Vec<BodySpec>,
    #[serde(default)]
    pub dynamics: Vec<BodySpec>,
    #[serde(default)]
    pub breakables: Vec<BreakableSpec>,
}

impl SceneDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.version != SCENE_VERSION {
            return Err(anyhow!("unsupported scene version {} (expected {SCENE_VERSION})", self.version));
        }
        if !(self.dt > 0.0 && self.dt <= 1.0) { return Err(anyhow!("dt out of range")); }
        if self.settings.velocity_iterations == 0 {
            return Err(anyhow!("settings.velocity_iterations must be at least 1"));
        }

        for (i, b) in self.statics.iter().enumerate() {
            for (j, s) in b.shapes.iter().enumerate() {
                s.validate(&format!("statics[{i}].shapes[{j}]"))?;
            }
        }
        for (i, b) in self.dynamics.iter().enumerate() {
            if !(b.material.density > 0.0) {
                return Err(anyhow!("dynamics[{i}]: density must be positive, got {}", b.material.density));
            }
            for (j, s) in b.shapes.iter().enumerate() {
                s.validate(&format!("dynamics[{i}].shapes[{j}]"))?;
            }
        }
        for (i, b) in self.breakables.iter().enumerate() {
            if !(b.density > 0.0 && b.density.is_finite()) {
                return Err(anyhow!("breakables[{i}]: density must be positive, got {}", b.density));
            }
            if !(b.strength > 0.0 && b.strength.is_finite()) {
                return Err(anyhow!("breakables[{i}]: strength must be positive, got {}", b.strength));
            }
            for (j, l) in b.loops.iter().enumerate() {
                check_loop(l, &format!("breakables[{i}].loops[{j}]"))?;
            }
        }
        Ok(())
    }

    /// Validate, then create the world and every body in file order: breakables, dynamics, statics.
    pub fn build(&self) -> Result<FractureScene> {
        self.validate()?;
        let mut world = World::new(self.settings);
        let mut breakables = Vec::with_capacity(self.breakables.len());

        for (i, spec) in self.breakables.iter().enumerate() {
            let desc = BreakableDesc {
                pose: iso(Vec2::from(spec.position), spec.angle),
                strength: spec.strength,
                anchor_gate: spec.anchor_gate,
                user_data: spec.user_data.map(UserData),
            };
            let material = Material::with_density(spec.density);
            let fixtures = spec.loops.iter().map(|l| FixtureDesc::new(Shape::polygon(to_points(l)), material));
            let b = desc.build(&mut world, fixtures).with_context(|| format!("breakables[{i}]"))?;
            world
                .set_body_vel(b.main_body(), velocity(spec.velocity, spec.angular_velocity))
                .with_context(|| format!("breakables[{i}]"))?;
            breakables.push(b);
        }
        for (i, spec) in self.dynamics.iter().enumerate() {
            add_body(&mut world, spec, MotionType::Dynamic).with_context(|| format!("dynamics[{i}]"))?;
        }
        for (i, spec) in self.statics.iter().enumerate() {
            add_body(&mut world, spec, MotionType::Static).with_context(|| format!("statics[{i}]"))?;
        }

        let mut scene = FractureScene::new(world);
        for b in breakables {
            scene.add(b);
        }
        debug!(
            bodies = scene.world.body_count(),
            fixtures = scene.world.fixture_count(),
            breakables = scene.breakables.len(),
            "scene built"
        );
        Ok(scene)
    }
}

fn velocity(lin: [f32; 2], ang: f32) -> Velocity { Velocity { lin: Vec2::from(lin), ang } }

fn add_body(world: &mut World, spec: &BodySpec, motion: MotionType) -> Result<()> {
    let body = world.create_body(BodyDesc {
        pose: iso(Vec2::from(spec.position), spec.angle),
        vel: velocity(spec.velocity, spec.angular_velocity),
        motion,
        user_data: spec.user_data.map(UserData),
    });
    for s in &spec.shapes {
        world.create_fixture(body, FixtureDesc::new(s.to_shape(), spec.material))?;
    }
    Ok(())
}

pub fn parse_scene(json: &str) -> Result<SceneDescriptor> {
    let sd: SceneDescriptor = serde_json::from_str(json).context("parse scene JSON")?;
    sd.validate()?;
    Ok(sd)
}

pub fn load_scene(path: &Path) -> Result<SceneDescriptor> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_scene(&s).with_context(|| format!("load {}", path.display()))
}

/// Stable blake3 hash of a descriptor's canonical JSON.
pub fn scene_hash(sd: &SceneDescriptor) -> Result<[u8; 32]> {
    let mut h = Hasher::new();
    h.update(b"BRKSCENEv1\0");
    h.update(&serde_json::to_vec(sd)?);
    Ok(*h.finalize().as_bytes())
}

pub fn hex32(bytes: &[u8; 32]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(64);
    for b in bytes { let _ = write!(s, "{:02x}", b); }
    s
}

/// One fracture observed while running a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct FractureLine {
    pub tick: u32,
    pub breakable: u32,
    pub fragments: usize,
    pub impulse: Vec2,
}

/// A breakable dropped from the run because its tick handler failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureLine {
    pub tick: u32,
    pub breakable: u32,
    pub error: FractureError,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ticks: u32,
    pub fractures: Vec<FractureLine>,
    pub failures: Vec<FailureLine>,
    pub intact: usize,
    pub step_hash: [u8; 32],
}

pub fn run_scene(scene: &mut FractureScene, ticks: u32, dt: f32) -> RunSummary {
    let mut fractures = Vec::new();
    let mut failures = Vec::new();
    for t in 1..=ticks {
        let report = scene.tick(dt);
        for f in report.fractured {
            info!(tick = t, breakable = f.key.0, fragments = f.fracture.fragments.len(), "fracture");
            fractures.push(FractureLine {
                tick: t,
                breakable: f.key.0,
                fragments: f.fracture.fragments.len(),
                impulse: f.fracture.impulse,
            });
        }
        for f in report.failed {
            warn!(tick = t, breakable = f.key.0, error = %f.error, "breakable failed");
            failures.push(FailureLine { tick: t, breakable: f.key.0, error: f.error });
        }
    }
    RunSummary { ticks, fractures, failures, intact: scene.breakables.len(), step_hash: scene.world.step_hash() }
}
