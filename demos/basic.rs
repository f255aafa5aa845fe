//! Basic example: drop a stack of spheres onto a floor.
//!
//! Run with: cargo run --example basic

use glam::{DVec3, Quat, Vec3};
use rphys::{
    Activation, AllHitCollector, BodyCreationSettings, MotionType, PhysicsSceneRef, PhysicsSystem, ShapeRef,
    ShapeSettingsRef, StreamType,
};

fn main() -> rphys::Result<()> {
    println!("Version: {} ({})", rphys::version_string(), rphys::build_type());
    println!("Double precision: {}", rphys::is_double_precision());

    let system = PhysicsSystem::new(256);
    println!("Gravity: {:?}", system.gravity());

    println!("\n--- Creating Bodies ---");
    let bodies = system.body_interface();
    let floor = ShapeRef::cuboid(Vec3::new(20.0, 0.5, 20.0), 0.05)?.to_const();
    let floor_settings = BodyCreationSettings::from_shape(&floor, DVec3::ZERO, Quat::IDENTITY, MotionType::Static, 0);
    bodies.create_and_add_body(&floor_settings, Activation::DontActivate);

    let sphere = ShapeRef::sphere(0.5)?.to_const();
    let mut ids = Vec::new();
    for i in 0..5 {
        let position = DVec3::new(0.0, 2.0 + i as f64 * 1.5, 0.0);
        let mut settings = BodyCreationSettings::from_shape(&sphere, position, Quat::IDENTITY, MotionType::Dynamic, 1);
        settings.set_restitution(0.3);
        settings.set_user_data(i);
        ids.push(bodies.create_and_add_body(&settings, Activation::Activate));
    }
    println!("Bodies: {} / {}", system.num_bodies(), system.max_bodies());

    // A capsule whose shape is built from settings when the body is created
    let capsule = ShapeSettingsRef::capsule(0.5, 0.25).to_const();
    let capsule_settings = BodyCreationSettings::from_shape_settings(
        &capsule,
        DVec3::new(3.0, 4.0, 0.0),
        Quat::IDENTITY,
        MotionType::Dynamic,
        1,
    );
    bodies.create_and_add_body(&capsule_settings, Activation::Activate);

    println!("\n--- Simulating ---");
    for step in 0..180 {
        let errors = system.update(1.0 / 60.0, 1);
        if errors != 0 {
            println!("step {}: update errors {:#x}", step, errors);
        }
    }
    for id in &ids {
        let lock = system.lock_read(*id);
        if let Some(body) = lock.body() {
            println!(
                "  body {} at {:.2?}, active: {}",
                body.user_data(),
                body.position(),
                body.is_active()
            );
        }
    }

    println!("\n--- Querying ---");
    let mut hits = AllHitCollector::new();
    system
        .broad_phase_query()
        .collide_aa_box(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 3.0, 1.0), &mut hits);
    println!("Bodies near the floor centre: {:?}", hits.hits());

    println!("\n--- Saving a Scene ---");
    let scene = PhysicsSceneRef::new();
    scene.add_body(&floor_settings);
    scene.add_body(&capsule_settings);
    if let Some(text) = scene.to_object_stream(StreamType::Text) {
        println!("Text scene: {} bytes", text.len());
    }

    Ok(())
}
