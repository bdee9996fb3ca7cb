//! Drop a four-piece slab on the ground and print where the fragments end up.
//!
//! `RUST_LOG=breakphys_fracture=trace cargo run -p breakphys-fracture --example shatter`

use breakphys_core::{iso, Isometry, Vec2, Velocity};
use breakphys_fracture::{BreakableBody, FractureScene};
use breakphys_geom::{Material, Shape};
use breakphys_world::{BodyDesc, FixtureDesc, World, WorldSettings};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut world = World::new(WorldSettings::default());
    let quads: Vec<Vec<Vec2>> = (0..4)
        .map(|i| {
            let x0 = -2.0 + i as f32;
            vec![Vec2::new(x0, -0.25), Vec2::new(x0 + 1.0, -0.25), Vec2::new(x0 + 1.0, 0.25), Vec2::new(x0, 0.25)]
        })
        .collect();
    let mut slab = BreakableBody::from_vertices(&mut world, iso(Vec2::new(0.0, 6.0), 0.1), &quads, 1.0)?;
    slab.set_strength(4.0)?;
    world.set_body_vel(slab.main_body(), Velocity { lin: Vec2::new(1.0, -18.0), ang: 0.0 })?;

    let ground = world.create_body(BodyDesc::fixed(Isometry { pos: Vec2::new(0.0, -1.0), angle: 0.0 }));
    world.create_fixture(ground, FixtureDesc::new(Shape::rect(30.0, 1.0), Material::default()))?;

    let mut scene = FractureScene::new(world);
    scene.add(slab);

    let mut broken = Vec::new();
    for _ in 0..240 {
        broken.extend(scene.tick(1.0 / 60.0).fractured);
    }

    for f in &broken {
        println!("breakable {:?} split into {} bodies", f.key, f.fracture.fragments.len());
        for part in f.breakable.parts() {
            let p = scene.world.body_pose(part.body)?;
            println!("  body {}  at ({:+.2}, {:+.2})  angle {:+.2}", part.body.0, p.pos.x, p.pos.y, p.angle);
        }
    }
    Ok(())
}
