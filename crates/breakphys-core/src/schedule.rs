use crate::StepHasher;

/// Stages a world step runs through, in order. Recorded per tick and folded into the step hash.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepStage {
    UpdateAabbsPre = 1,
    BroadphaseSap = 2,
    Narrowphase = 3,
    IntegrateVelocities = 4,
    Solve = 5,
    PostSolve = 6,
    IntegratePositions = 7,
    UpdateAabbsPost = 8,
}

pub fn schedule_digest(stages: &[StepStage]) -> [u8; 32] {
    let mut h = StepHasher::new();
    for s in stages { h.update_bytes(&[*s as u8]); }
    h.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn digest_depends_on_order() {
        let a = schedule_digest(&[StepStage::Solve, StepStage::PostSolve]);
        let b = schedule_digest(&[StepStage::PostSolve, StepStage::Solve]);
        assert_ne!(a, b);
        assert_eq!(a, schedule_digest(&[StepStage::Solve, StepStage::PostSolve]));
    }
}
