//! Simulation tests through the safe wrappers.

use glam::{DVec3, Quat, Vec3};
use rphys::{
    Activation, AllHitCastRayCollector, AnyHitCastRayCollector, BodyCreationSettings, BodyId, ConstraintSettingsRef,
    ConstraintSpace, ConstraintSubType, ConstraintType, Error, MotionType, PhysicsSceneRef, PhysicsSystem, ShapeRef,
    ShapeSettingsRef, ShapeSubType, StreamType,
};

fn floor_settings() -> BodyCreationSettings {
    let floor = ShapeRef::cuboid(Vec3::new(50.0, 0.5, 50.0), 0.05)
        .expect("valid box")
        .to_const();
    BodyCreationSettings::from_shape(&floor, DVec3::ZERO, Quat::IDENTITY, MotionType::Static, 0)
}

fn ball_settings(position: DVec3) -> BodyCreationSettings {
    let ball = ShapeRef::sphere(0.5).expect("valid sphere").to_const();
    BodyCreationSettings::from_shape(&ball, position, Quat::IDENTITY, MotionType::Dynamic, 1)
}

#[test]
fn test_ball_falls() {
    let system = PhysicsSystem::new(16);
    assert!(system.gravity().y < 0.0, "default gravity should point down");

    let bodies = system.body_interface();
    bodies.create_and_add_body(&floor_settings(), Activation::DontActivate);
    let ball = bodies.create_and_add_body(&ball_settings(DVec3::new(0.0, 5.0, 0.0)), Activation::Activate);
    assert!(!ball.is_invalid());
    assert!(bodies.is_active(ball), "the ball was added active");

    for _ in 0..120 {
        system.update(1.0 / 60.0, 1);
    }

    let y = bodies.position(ball).y;
    assert!(y < 4.9, "the ball should have fallen, at y = {}", y);
    assert!(y > 0.0, "the floor should stop the ball, at y = {}", y);
}

#[test]
fn test_zero_gravity_keeps_velocity() {
    let system = PhysicsSystem::new(4);
    system.set_gravity(Vec3::ZERO);
    let mut settings = ball_settings(DVec3::ZERO);
    settings.set_linear_damping(0.0);
    let bodies = system.body_interface();
    let ball = bodies.create_and_add_body(&settings, Activation::Activate);
    bodies.set_linear_velocity(ball, Vec3::new(1.0, 0.0, 0.0));

    for _ in 0..60 {
        system.update(1.0 / 60.0, 1);
    }
    let x = bodies.position(ball).x;
    assert!((x - 1.0).abs() < 0.05, "one second at 1 m/s, got x = {}", x);
}

#[test]
fn test_body_lifecycle() {
    let system = PhysicsSystem::new(4);
    let bodies = system.body_interface();
    let mut settings = ball_settings(DVec3::new(1.0, 2.0, 3.0));
    settings.set_user_data(99);

    let id = bodies.create_body(&settings).expect("room for the body");
    assert!(!bodies.is_added(id), "create_body does not add");
    assert_eq!(system.num_bodies(), 1);

    bodies.add_body(id, Activation::DontActivate);
    assert!(bodies.is_added(id));
    assert_eq!(bodies.user_data(id), 99);
    assert_eq!(bodies.object_layer(id), 1);
    assert_eq!(bodies.motion_type(id), MotionType::Dynamic);
    assert_eq!(bodies.position(id), DVec3::new(1.0, 2.0, 3.0));
    let shape = bodies.shape(id).expect("bodies always have a shape");
    assert_eq!(shape.sub_type(), ShapeSubType::Sphere);

    bodies.remove_body(id);
    assert!(!bodies.is_added(id));
    bodies.destroy_body(id);
    assert_eq!(system.num_bodies(), 0);
}

#[test]
fn test_locks() {
    let system = PhysicsSystem::new(4);
    let id = system
        .body_interface()
        .create_and_add_body(&ball_settings(DVec3::Y), Activation::DontActivate);

    {
        let lock = system.lock_read(id);
        assert!(lock.succeeded_and_is_in_broad_phase());
        let body = lock.body().expect("the body exists");
        assert_eq!(body.id(), id);
        assert!(body.is_dynamic());
        assert!(!body.is_static());
        assert_eq!(body.position(), DVec3::Y);
    }

    {
        let mut lock = system.lock_write(id);
        assert!(lock.succeeded());
        assert!(lock.body().is_some());
        lock.release_lock();
        assert!(lock.body().is_none(), "a released lock gives no body");
    }

    let missing = system.lock_read(BodyId::INVALID);
    assert!(!missing.succeeded());
    assert!(missing.body().is_none());
    drop(missing);

    assert!(matches!(system.try_lock_read(BodyId::INVALID), Err(Error::LockFailed)));
    assert!(matches!(system.try_lock_write(BodyId::INVALID), Err(Error::LockFailed)));
    let mut found = system.try_lock_write(id).expect("the body exists");
    assert_eq!(found.body().map(|body| body.id()), Some(id));
}

#[test]
fn test_no_lock_reads_while_locked() {
    let system = PhysicsSystem::new(4);
    let id = system
        .body_interface()
        .create_and_add_body(&ball_settings(DVec3::Z), Activation::DontActivate);

    // A no-lock read does not wait for the shared lock held here.
    let held = system.lock_read(id);
    let unlocked = unsafe { system.lock_read_no_lock(id) };
    assert_eq!(unlocked.body().map(|body| body.position()), Some(DVec3::Z));
    drop(unlocked);
    drop(held);

    let mut write = unsafe { system.lock_write_no_lock(id) };
    assert!(write.succeeded_and_is_in_broad_phase());
    write.release_lock();
    assert!(write.body().is_none());
}

#[test]
fn test_ray_casts() {
    let system = PhysicsSystem::new(8);
    let bodies = system.body_interface();
    bodies.create_and_add_body(&floor_settings(), Activation::DontActivate);
    let ball = bodies.create_and_add_body(&ball_settings(DVec3::new(0.0, 3.0, 0.0)), Activation::DontActivate);

    let mut all = AllHitCastRayCollector::new();
    system
        .narrow_phase_query()
        .cast_ray(DVec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -20.0, 0.0), &mut all);
    assert_eq!(all.len(), 2, "the ray crosses the ball and the floor");
    all.sort();
    let hits = all.hits();
    assert_eq!(hits[0].body_id, ball, "the ball is nearest");
    // The ball top is at y = 3.5, 6.5 below the origin of a 20 long ray.
    assert!((hits[0].fraction - 0.325).abs() < 1e-4, "fraction {}", hits[0].fraction);
    // The floor top is at y = 0.5.
    assert!((hits[1].fraction - 0.475).abs() < 1e-3, "fraction {}", hits[1].fraction);

    let mut any = AnyHitCastRayCollector::new();
    system
        .broad_phase_query()
        .cast_ray(DVec3::new(0.0, 3.0, -5.0), Vec3::new(0.0, 0.0, 10.0), &mut any);
    assert_eq!(any.hit().map(|hit| hit.body_id), Some(ball));

    any.reset();
    system
        .narrow_phase_query()
        .cast_ray(DVec3::new(0.0, 20.0, 0.0), Vec3::new(0.0, 5.0, 0.0), &mut any);
    assert!(any.hit().is_none(), "the ray points away from every body");
}

#[test]
fn test_fixed_constraint() {
    let system = PhysicsSystem::new(4);
    let bodies = system.body_interface();
    let a = bodies.create_and_add_body(&ball_settings(DVec3::ZERO), Activation::Activate);
    let b = bodies.create_and_add_body(&ball_settings(DVec3::new(2.0, 0.0, 0.0)), Activation::Activate);

    let settings = ConstraintSettingsRef::fixed();
    settings.set_auto_detect_point(true);
    settings.set_user_data(5);

    let constraint = {
        let lock_a = system.lock_read(a);
        let lock_b = system.lock_read(b);
        settings.create(&lock_a.body().unwrap(), &lock_b.body().unwrap())
    };
    assert_eq!(constraint.constraint_type(), ConstraintType::TwoBodyConstraint);
    assert_eq!(constraint.sub_type(), ConstraintSubType::Fixed);
    assert_eq!(constraint.body1(), a);
    assert_eq!(constraint.body2(), b);
    assert_eq!(constraint.user_data(), 5);

    system.add_constraint(&constraint);
    assert_eq!(system.num_constraints(), 1);
    assert_eq!(constraint.ref_count(), 2, "the system holds a reference");

    let rebuilt = constraint.settings();
    assert_eq!(rebuilt.space(), ConstraintSpace::LocalToBodyCom);
    assert_eq!(rebuilt.sub_type(), ConstraintSubType::Fixed);

    for _ in 0..30 {
        system.update(1.0 / 60.0, 1);
    }
    let distance = bodies.position(a).distance(bodies.position(b));
    assert!((distance - 2.0).abs() < 0.1, "the bodies should stay 2 apart, got {}", distance);

    system.remove_constraint(&constraint);
    assert_eq!(system.num_constraints(), 0);
    assert_eq!(constraint.ref_count(), 1);
}

#[test]
fn test_point_constraint_settings() {
    let settings = ConstraintSettingsRef::point();
    settings.set_space(ConstraintSpace::LocalToBodyCom);
    settings.set_point1(DVec3::new(1.0, 0.0, 0.0));
    settings.set_point2(DVec3::new(-1.0, 0.0, 0.0));
    settings.set_constraint_priority(3);

    let shared = settings.try_clone();
    assert_eq!(settings.ref_count(), 2);
    assert_eq!(shared.point1(), DVec3::new(1.0, 0.0, 0.0));
    assert_eq!(shared.point2(), DVec3::new(-1.0, 0.0, 0.0));
    assert_eq!(shared.constraint_priority(), 3);
    assert_eq!(shared.space(), ConstraintSpace::LocalToBodyCom);
}

#[test]
fn test_scene_object_stream() {
    let scene = PhysicsSceneRef::new();
    scene.add_body(&floor_settings());
    scene.add_body(&ball_settings(DVec3::new(0.0, 3.0, 0.0)));

    for stream_type in [StreamType::Text, StreamType::Binary] {
        let bytes = scene
            .to_object_stream(stream_type)
            .expect("scene should encode");
        let restored = PhysicsSceneRef::from_object_stream(&bytes).expect("scene should decode");
        assert_eq!(restored.num_bodies(), 2, "{:?} stream lost bodies", stream_type);
        let ball = restored.body(1).unwrap();
        assert_eq!(ball.position(), DVec3::new(0.0, 3.0, 0.0));

        let system = PhysicsSystem::new(8);
        assert!(restored.create_bodies(&system));
        assert_eq!(system.num_bodies(), 2);
    }

    assert!(PhysicsSceneRef::from_object_stream(b"not a scene").is_none());
}

#[test]
fn test_bodies_from_shape_settings() {
    let shape_settings = ShapeSettingsRef::capsule(1.0, 0.5).to_const();
    let settings =
        BodyCreationSettings::from_shape_settings(&shape_settings, DVec3::ZERO, Quat::IDENTITY, MotionType::Dynamic, 1);

    let system = PhysicsSystem::new(2);
    let id = system
        .body_interface()
        .create_and_add_body(&settings, Activation::Activate);
    assert!(!id.is_invalid(), "shape settings should be converted on creation");
    let shape = system.body_interface().shape(id).unwrap();
    assert_eq!(shape.sub_type(), ShapeSubType::Capsule);
}

#[test]
fn test_body_limit() {
    let system = PhysicsSystem::new(1);
    let settings = ball_settings(DVec3::ZERO);
    let bodies = system.body_interface();
    assert!(!bodies
        .create_and_add_body(&settings, Activation::DontActivate)
        .is_invalid());
    assert!(bodies
        .create_and_add_body(&settings, Activation::DontActivate)
        .is_invalid());
    assert_eq!(system.max_bodies(), 1);
}
