use breakphys_core::{Scalar, StepStats};
use breakphys_world::World;

use crate::breakable::BreakableBody;
use crate::registry::{BreakableKey, Breakables, Failed, Fractured};

#[derive(Debug)]
pub struct TickReport {
    pub stats: StepStats,
    pub fractured: Vec<Fractured>,
    pub failed: Vec<Failed>,
}

/// A world plus the breakables living in it, ticked together.
pub struct FractureScene {
    pub world: World,
    pub breakables: Breakables,
}

impl FractureScene {
    pub fn new(world: World) -> Self { Self { world, breakables: Breakables::new() } }

    pub fn add(&mut self, b: BreakableBody) -> BreakableKey { self.breakables.insert(b) }

    /// Step the world with the registry listening, then run every breakable's tick handler.
    pub fn tick(&mut self, dt: Scalar) -> TickReport {
        let stats = self.world.step_with(dt, &mut self.breakables);
        let update = self.breakables.update(&mut self.world);
        TickReport { stats, fractured: update.fractured, failed: update.failed }
    }
}
