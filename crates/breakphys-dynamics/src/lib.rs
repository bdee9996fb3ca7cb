use breakphys_core::types::{cross, cross_sv, Isometry, Vec2, Velocity};
use breakphys_core::Scalar;
use breakphys_geom::MassData;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MotionType {
    /// Never moves; infinite mass.
    Static,
    /// Moved by its velocity only; infinite mass.
    Kinematic,
    Dynamic,
}

/// Opaque tag owned by the caller, carried verbatim on bodies and fixtures.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UserData(pub u64);

/// Input descriptor when creating a body.
#[derive(Copy, Clone, Debug)]
pub struct BodyDesc {
    pub pose: Isometry,
    pub vel: Velocity,
    pub motion: MotionType,
    pub user_data: Option<UserData>,
}

impl BodyDesc {
    pub fn dynamic(pose: Isometry) -> Self {
        Self { pose, vel: Velocity::default(), motion: MotionType::Dynamic, user_data: None }
    }
    pub fn fixed(pose: Isometry) -> Self {
        Self { pose, vel: Velocity::default(), motion: MotionType::Static, user_data: None }
    }
}

/// SoA body storage with deterministic ID = index semantics.
/// Removed bodies leave a tombstone; ids are never reused.
pub struct Bodies {
    pos: Vec<Vec2>,
    angle: Vec<Scalar>,
    linvel: Vec<Vec2>,
    angvel: Vec<Scalar>,
    local_center: Vec<Vec2>,
    mass: Vec<Scalar>,
    inv_mass: Vec<Scalar>,
    inv_inertia: Vec<Scalar>,
    motion: Vec<MotionType>,
    user_data: Vec<Option<UserData>>,
    alive: Vec<bool>,
    live: usize,
}

impl Bodies {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            pos:          Vec::with_capacity(cap),
            angle:        Vec::with_capacity(cap),
            linvel:       Vec::with_capacity(cap),
            angvel:       Vec::with_capacity(cap),
            local_center: Vec::with_capacity(cap),
            mass:         Vec::with_capacity(cap),
            inv_mass:     Vec::with_capacity(cap),
            inv_inertia:  Vec::with_capacity(cap),
            motion:       Vec::with_capacity(cap),
            user_data:    Vec::with_capacity(cap),
            alive:        Vec::with_capacity(cap),
            live: 0,
        }
    }

    /// Dynamic bodies start with unit mass and no rotational inertia until fixtures are attached.
    pub fn add(&mut self, desc: BodyDesc) -> u32 {
        let dynamic = desc.motion == MotionType::Dynamic;
        self.pos.push(desc.pose.pos);
        self.angle.push(desc.pose.angle);
        self.linvel.push(if desc.motion == MotionType::Static { Vec2::ZERO } else { desc.vel.lin });
        self.angvel.push(if desc.motion == MotionType::Static { 0.0 } else { desc.vel.ang });
        self.local_center.push(Vec2::ZERO);
        self.mass.push(if dynamic { 1.0 } else { 0.0 });
        self.inv_mass.push(if dynamic { 1.0 } else { 0.0 });
        self.inv_inertia.push(0.0);
        self.motion.push(desc.motion);
        self.user_data.push(desc.user_data);
        self.alive.push(true);
        self.live += 1;

        (self.pos.len() as u32) - 1
    }

    /// Tombstone a body. Returns false if it was already gone.
    pub fn remove(&mut self, id: u32) -> bool {
        let i = id as usize;
        match self.alive.get_mut(i) {
            Some(a) if *a => {
                *a = false;
                self.linvel[i] = Vec2::ZERO;
                self.angvel[i] = 0.0;
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Slot count, including tombstones.
    #[inline] pub fn len(&self) -> usize { self.pos.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.pos.is_empty() }
    #[inline] pub fn live_count(&self) -> usize { self.live }
    #[inline] pub fn is_alive(&self, id: u32) -> bool { self.alive.get(id as usize).copied().unwrap_or(false) }

    /// Recompute mass, center of mass and inertia from attached fixture mass data.
    pub fn set_mass_data<I: IntoIterator<Item = MassData>>(&mut self, id: u32, parts: I) {
        let i = id as usize;
        if self.motion[i] != MotionType::Dynamic {
            self.mass[i] = 0.0;
            self.inv_mass[i] = 0.0;
            self.inv_inertia[i] = 0.0;
            self.local_center[i] = Vec2::ZERO;
            return;
        }

        let mut mass = 0.0f32;
        let mut center = Vec2::ZERO;
        let mut inertia = 0.0f32;
        for md in parts {
            mass += md.mass;
            center += md.center * md.mass;
            inertia += md.inertia;
        }

        let old_center = self.world_center(id);
        if mass > 0.0 {
            center /= mass;
            self.mass[i] = mass;
            self.inv_mass[i] = 1.0 / mass;
            // inertia about the center of mass
            let i_c = inertia - mass * center.dot(center);
            self.inv_inertia[i] = if i_c > 0.0 { 1.0 / i_c } else { 0.0 };
        } else {
            center = Vec2::ZERO;
            self.mass[i] = 1.0;
            self.inv_mass[i] = 1.0;
            self.inv_inertia[i] = 0.0;
        }
        self.local_center[i] = center;

        // keep the velocity of the moved center consistent with the rigid motion
        let new_center = self.world_center(id);
        self.linvel[i] += cross_sv(self.angvel[i], new_center - old_center);
    }

    pub fn integrate_velocities(&mut self, gravity: Vec2, dt: Scalar) {
        for i in 0..self.len() {
            if !self.alive[i] || self.motion[i] != MotionType::Dynamic { continue; }
            self.linvel[i] += gravity * dt;
        }
    }

    pub fn integrate_positions(&mut self, dt: Scalar) {
        for i in 0..self.len() {
            if !self.alive[i] || self.motion[i] == MotionType::Static { continue; }
            let lc = self.local_center[i];
            let c = self.pos[i] + Vec2::from_angle(self.angle[i]).rotate(lc) + self.linvel[i] * dt;
            self.angle[i] += self.angvel[i] * dt;
            self.pos[i] = c - Vec2::from_angle(self.angle[i]).rotate(lc);
        }
    }

    // -------- Accessors used by world/solver/hash --------
    #[inline] pub fn pose(&self, id: u32) -> Isometry {
        let i = id as usize;
        Isometry { pos: self.pos[i], angle: self.angle[i] }
    }
    #[inline] pub fn set_pose(&mut self, id: u32, iso: Isometry) {
        let i = id as usize;
        self.pos[i] = iso.pos;
        self.angle[i] = iso.angle;
    }

    #[inline] pub fn vel(&self, id: u32) -> Velocity {
        let i = id as usize;
        Velocity { lin: self.linvel[i], ang: self.angvel[i] }
    }
    #[inline] pub fn set_vel(&mut self, id: u32, v: Velocity) {
        let i = id as usize;
        if self.motion[i] == MotionType::Static { return; }
        self.linvel[i] = v.lin;
        self.angvel[i] = v.ang;
    }

    #[inline] pub fn world_center(&self, id: u32) -> Vec2 {
        let i = id as usize;
        self.pos[i] + Vec2::from_angle(self.angle[i]).rotate(self.local_center[i])
    }
    #[inline] pub fn local_center(&self, id: u32) -> Vec2 { self.local_center[id as usize] }

    #[inline] pub fn mass_of(&self, id: u32) -> Scalar { self.mass[id as usize] }
    #[inline] pub fn inv_mass_of(&self, id: u32) -> Scalar { self.inv_mass[id as usize] }
    #[inline] pub fn inv_inertia_of(&self, id: u32) -> Scalar { self.inv_inertia[id as usize] }
    #[inline] pub fn motion_of(&self, id: u32) -> MotionType { self.motion[id as usize] }
    #[inline] pub fn is_dynamic(&self, id: u32) -> bool { self.motion[id as usize] == MotionType::Dynamic }
    #[inline] pub fn user_data(&self, id: u32) -> Option<UserData> { self.user_data[id as usize] }
    #[inline] pub fn set_user_data(&mut self, id: u32, ud: Option<UserData>) { self.user_data[id as usize] = ud; }

    // -------- Impulses --------
    /// Linear impulse through the center of mass.
    #[inline] pub fn apply_impulse(&mut self, id: u32, j: Vec2) {
        let i = id as usize;
        let im = self.inv_mass[i];
        if im != 0.0 { self.linvel[i] += j * im; }
    }

    /// Impulse at a world point: Δv = j/m, Δω = (r × j)/I.
    pub fn apply_impulse_at(&mut self, id: u32, j: Vec2, world_point: Vec2) {
        let i = id as usize;
        if self.inv_mass[i] == 0.0 { return; }
        let r = world_point - self.world_center(id);
        self.linvel[i] += j * self.inv_mass[i];
        self.angvel[i] += self.inv_inertia[i] * cross(r, j);
    }

    /// Live ids in stable index order.
    pub fn live_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.alive.iter().enumerate().filter(|(_, a)| **a).map(|(i, _)| i as u32)
    }
}

impl Default for Bodies {
    fn default() -> Self { Self::with_capacity(0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use breakphys_core::types::iso;
    use breakphys_geom::Shape;

    #[test] fn ids_are_not_reused() {
        let mut b = Bodies::default();
        let a = b.add(BodyDesc::dynamic(Isometry::IDENTITY));
        assert!(b.remove(a));
        assert!(!b.remove(a));
        let c = b.add(BodyDesc::dynamic(Isometry::IDENTITY));
        assert_ne!(a, c);
        assert_eq!(b.live_count(), 1);
        assert_eq!(b.live_ids().collect::<Vec<_>>(), vec![c]);
    }

    #[test] fn mass_from_two_boxes() {
        let mut b = Bodies::default();
        let id = b.add(BodyDesc::dynamic(Isometry::IDENTITY));
        let left = breakphys_geom::Polygon::oriented_rect(0.5, 0.5, Vec2::new(-0.5, 0.0), 0.0);
        let right = breakphys_geom::Polygon::oriented_rect(0.5, 0.5, Vec2::new(0.5, 0.0), 0.0);
        b.set_mass_data(id, [
            Shape::Polygon(left).mass_data(1.0),
            Shape::Polygon(right).mass_data(1.0),
        ]);
        assert_relative_eq!(b.mass_of(id), 2.0, epsilon = 1e-5);
        assert_relative_eq!(b.local_center(id).length(), 0.0, epsilon = 1e-5);
        // 2 x 1 slab: I = m (w² + h²) / 12
        assert_relative_eq!(1.0 / b.inv_inertia_of(id), 2.0 * 5.0 / 12.0, epsilon = 1e-4);
    }

    #[test] fn static_bodies_ignore_impulses() {
        let mut b = Bodies::default();
        let id = b.add(BodyDesc::fixed(Isometry::IDENTITY));
        b.apply_impulse(id, Vec2::new(10.0, 0.0));
        assert_eq!(b.vel(id).lin, Vec2::ZERO);
        b.integrate_velocities(Vec2::new(0.0, -10.0), 1.0);
        assert_eq!(b.vel(id).lin, Vec2::ZERO);
    }

    #[test] fn impulse_scales_by_inverse_mass() {
        let mut b = Bodies::default();
        let id = b.add(BodyDesc::dynamic(iso(Vec2::ZERO, 0.0)));
        b.set_mass_data(id, [Shape::rect(1.0, 1.0).mass_data(1.0)]);
        b.apply_impulse(id, Vec2::new(8.0, 0.0));
        assert_relative_eq!(b.vel(id).lin.x, 2.0, epsilon = 1e-5);
    }

    #[test] fn off_center_impulse_spins() {
        let mut b = Bodies::default();
        let id = b.add(BodyDesc::dynamic(Isometry::IDENTITY));
        b.set_mass_data(id, [Shape::rect(1.0, 1.0).mass_data(1.0)]);
        b.apply_impulse_at(id, Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0));
        assert!(b.vel(id).ang > 0.0);
    }

    #[test] fn rotation_about_offset_center_keeps_center_fixed() {
        let mut b = Bodies::default();
        let id = b.add(BodyDesc::dynamic(Isometry::IDENTITY));
        let p = breakphys_geom::Polygon::oriented_rect(0.5, 0.5, Vec2::new(2.0, 0.0), 0.0);
        b.set_mass_data(id, [Shape::Polygon(p).mass_data(1.0)]);
        b.set_vel(id, Velocity { lin: Vec2::ZERO, ang: 1.0 });
        let c0 = b.world_center(id);
        b.integrate_positions(0.5);
        assert_relative_eq!((b.world_center(id) - c0).length(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(b.pose(id).angle, 0.5, epsilon = 1e-6);
    }
}
