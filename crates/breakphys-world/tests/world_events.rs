use approx::assert_relative_eq;
use breakphys_core::{iso, Isometry, SubscriptionId, Vec2, Velocity};
use breakphys_geom::{Material, Shape};
use breakphys_world::{
    BodyDesc, FixtureDesc, PostSolve, PostSolveListener, UserData, World, WorldSettings,
};

#[derive(Default)]
struct Recorder { seen: Vec<(SubscriptionId, PostSolve)> }

impl PostSolveListener for Recorder {
    fn post_solve(&mut self, sub: SubscriptionId, contact: &PostSolve) {
        self.seen.push((sub, contact.clone()));
    }
}

fn no_gravity() -> WorldSettings {
    WorldSettings { gravity: Vec2::ZERO, ..WorldSettings::default() }
}

#[test]
fn falling_box_reports_normal_from_a_to_b() {
    let mut world = World::new(WorldSettings::default());
    // box first, so its fixture is A in every pair it forms with the ground
    let boxy = world.create_body(BodyDesc::dynamic(iso(Vec2::new(0.0, 1.5), 0.0)));
    let fb = world.create_fixture(boxy, FixtureDesc::new(Shape::rect(0.5, 0.5), Material::default())).unwrap();
    let ground = world.create_body(BodyDesc::fixed(Isometry::IDENTITY));
    let fg = world.create_fixture(ground, FixtureDesc::new(Shape::rect(5.0, 0.5), Material::default())).unwrap();

    let sub = world.subscribe_post_solve();
    let mut rec = Recorder::default();
    for _ in 0..90 {
        world.step_with(1.0 / 60.0, &mut rec);
    }

    assert!(!rec.seen.is_empty());
    for (s, ev) in &rec.seen {
        assert_eq!(*s, sub);
        assert_eq!((ev.fixture_a, ev.fixture_b), (fb, fg));
        assert_eq!((ev.body_a, ev.body_b), (boxy, ground));
        assert_relative_eq!(ev.normal.y, -1.0, epsilon = 1e-4);
        for p in &ev.points {
            assert!(p.normal_impulse >= 0.0);
            // contact sits on the box's underside
            assert!(p.local_anchor_a.y < 0.0);
            // and on top of the ground
            assert!(p.local_anchor_b.y > 0.0);
        }
    }
}

#[test]
fn impact_impulse_scales_with_speed() {
    fn peak(speed: f32) -> f32 {
        let mut world = World::new(no_gravity());
        let ball = world.create_body(BodyDesc::dynamic(iso(Vec2::new(0.0, 1.02), 0.0)));
        world.create_fixture(ball, FixtureDesc::new(Shape::circle(0.5), Material::default())).unwrap();
        let ground = world.create_body(BodyDesc::fixed(Isometry::IDENTITY));
        world.create_fixture(ground, FixtureDesc::new(Shape::rect(5.0, 0.5), Material::default())).unwrap();
        world.set_body_vel(ball, Velocity { lin: Vec2::new(0.0, -speed), ang: 0.0 }).unwrap();
        world.subscribe_post_solve();

        let mut rec = Recorder::default();
        for _ in 0..10 { world.step_with(1.0 / 60.0, &mut rec); }
        rec.seen.iter()
            .flat_map(|(_, e)| e.points.iter().map(|p| p.normal_impulse))
            .fold(0.0, f32::max)
    }

    let slow = peak(2.0);
    let fast = peak(8.0);
    assert!(slow > 0.0);
    assert!(fast > 3.0 * slow);
}

#[test]
fn fixtures_on_one_body_never_touch() {
    let mut world = World::new(no_gravity());
    let b = world.create_body(BodyDesc::dynamic(Isometry::IDENTITY));
    world.create_fixture(b, FixtureDesc::new(Shape::rect(0.5, 0.5), Material::default())).unwrap();
    world.create_fixture(b, FixtureDesc::new(Shape::circle(0.6), Material::default())).unwrap();
    let stats = world.step(1.0 / 60.0);
    assert_eq!(stats.pairs_tested, 1);
    assert_eq!(stats.contacts, 0);
}

#[test]
fn user_data_survives_on_bodies_and_fixtures() {
    let mut world = World::new(no_gravity());
    let desc = BodyDesc { user_data: Some(UserData(42)), ..BodyDesc::dynamic(Isometry::IDENTITY) };
    let b = world.create_body(desc);
    let f = world
        .create_fixture(b, FixtureDesc::new(Shape::circle(1.0), Material::default()).with_user_data(Some(UserData(7))))
        .unwrap();
    assert_eq!(world.body_user_data(b).unwrap(), Some(UserData(42)));
    assert_eq!(world.fixture_user_data(f).unwrap(), Some(UserData(7)));

    let copy = world.fixture(f).unwrap().to_desc();
    assert_eq!(copy.user_data, Some(UserData(7)));
}

#[test]
fn unsubscribed_listener_hears_nothing() {
    let mut world = World::new(WorldSettings::default());
    let a = world.create_body(BodyDesc::dynamic(iso(Vec2::new(0.0, 0.95), 0.0)));
    world.create_fixture(a, FixtureDesc::new(Shape::rect(0.5, 0.5), Material::default())).unwrap();
    let g = world.create_body(BodyDesc::fixed(Isometry::IDENTITY));
    world.create_fixture(g, FixtureDesc::new(Shape::rect(5.0, 0.5), Material::default())).unwrap();

    let sub = world.subscribe_post_solve();
    assert!(world.unsubscribe_post_solve(sub));
    assert!(!world.is_subscribed(sub));

    let mut rec = Recorder::default();
    let stats = world.step_with(1.0 / 60.0, &mut rec);
    assert!(stats.contacts > 0);
    assert_eq!(stats.events, 0);
    assert!(rec.seen.is_empty());
    assert_eq!(world.last_post_solve().len(), stats.contacts as usize);
}
