//! Property tests for binary state and handle bookkeeping.

use glam::{DVec3, Quat, Vec3};
use proptest::prelude::*;
use rphys::{BodyCreationSettings, MotionQuality, MotionType, OverrideMassProperties, ShapeRef, StreamIn, StreamOut};

fn finite_f32() -> impl Strategy<Value = f32> {
    -1000.0f32..1000.0
}

fn motion_type() -> impl Strategy<Value = MotionType> {
    prop_oneof![
        Just(MotionType::Static),
        Just(MotionType::Kinematic),
        Just(MotionType::Dynamic)
    ]
}

fn motion_quality() -> impl Strategy<Value = MotionQuality> {
    prop_oneof![Just(MotionQuality::Discrete), Just(MotionQuality::LinearCast)]
}

fn override_mass_properties() -> impl Strategy<Value = OverrideMassProperties> {
    prop_oneof![
        Just(OverrideMassProperties::CalculateMassAndInertia),
        Just(OverrideMassProperties::CalculateInertia),
        Just(OverrideMassProperties::MassAndInertiaProvided)
    ]
}

fn vec3() -> impl Strategy<Value = Vec3> {
    (finite_f32(), finite_f32(), finite_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn body_settings_binary_state_round_trip(
        position in (-1.0e6f64..1.0e6, -1.0e6f64..1.0e6, -1.0e6f64..1.0e6),
        (yaw, pitch) in (-3.0f32..3.0, -1.5f32..1.5),
        (velocity, angular_velocity) in (vec3(), vec3()),
        (user_data, object_layer) in (any::<u64>(), any::<u16>()),
        (friction, restitution) in (0.0f32..1.0, 0.0f32..1.0),
        motion_type in motion_type(),
        motion_quality in motion_quality(),
        (allow_sleeping, is_sensor, allow_dynamic_or_kinematic) in (any::<bool>(), any::<bool>(), any::<bool>()),
        (velocity_steps, position_steps) in (0u32..20, 0u32..20),
        (linear_damping, angular_damping, gravity_factor) in (0.0f32..1.0, 0.0f32..1.0, -2.0f32..2.0),
        (max_linear_velocity, max_angular_velocity) in (0.0f32..1000.0, 0.0f32..100.0),
        (inertia_multiplier, mass_override, override_mass) in
            (0.1f32..10.0, 0.1f32..1000.0, override_mass_properties()),
    ) {
        let mut settings = BodyCreationSettings::new();
        settings.set_position(DVec3::new(position.0, position.1, position.2));
        settings.set_rotation(Quat::from_euler(glam::EulerRot::YXZ, yaw, pitch, 0.0));
        settings.set_linear_velocity(velocity);
        settings.set_angular_velocity(angular_velocity);
        settings.set_user_data(user_data);
        settings.set_object_layer(object_layer);
        settings.set_friction(friction);
        settings.set_restitution(restitution);
        settings.set_motion_type(motion_type);
        settings.set_motion_quality(motion_quality);
        settings.set_allow_sleeping(allow_sleeping);
        settings.set_num_velocity_steps_override(velocity_steps);
        settings.set_num_position_steps_override(position_steps);
        settings.set_is_sensor(is_sensor);
        settings.set_allow_dynamic_or_kinematic(allow_dynamic_or_kinematic);
        settings.set_linear_damping(linear_damping);
        settings.set_angular_damping(angular_damping);
        settings.set_gravity_factor(gravity_factor);
        settings.set_max_linear_velocity(max_linear_velocity);
        settings.set_max_angular_velocity(max_angular_velocity);
        settings.set_inertia_multiplier(inertia_multiplier);
        settings.set_mass_override(mass_override);
        settings.set_override_mass_properties(override_mass);

        let mut out = StreamOut::new();
        settings.save_binary_state(&mut out);
        prop_assert!(!out.is_failed());

        let mut restored = BodyCreationSettings::new();
        let mut input = StreamIn::from(&out);
        restored.restore_binary_state(&mut input);
        prop_assert!(!input.is_failed());

        prop_assert_eq!(restored.position(), settings.position());
        prop_assert_eq!(restored.rotation(), settings.rotation());
        prop_assert_eq!(restored.linear_velocity(), velocity);
        prop_assert_eq!(restored.angular_velocity(), angular_velocity);
        prop_assert_eq!(restored.user_data(), user_data);
        prop_assert_eq!(restored.object_layer(), object_layer);
        prop_assert_eq!(restored.friction(), friction);
        prop_assert_eq!(restored.restitution(), restitution);
        prop_assert_eq!(restored.motion_type(), motion_type);
        prop_assert_eq!(restored.motion_quality(), motion_quality);
        prop_assert_eq!(restored.allow_sleeping(), allow_sleeping);
        prop_assert_eq!(restored.num_velocity_steps_override(), velocity_steps);
        prop_assert_eq!(restored.num_position_steps_override(), position_steps);
        prop_assert_eq!(restored.is_sensor(), is_sensor);
        prop_assert_eq!(restored.allow_dynamic_or_kinematic(), allow_dynamic_or_kinematic);
        prop_assert_eq!(restored.linear_damping(), linear_damping);
        prop_assert_eq!(restored.angular_damping(), angular_damping);
        prop_assert_eq!(restored.gravity_factor(), gravity_factor);
        prop_assert_eq!(restored.max_linear_velocity(), max_linear_velocity);
        prop_assert_eq!(restored.max_angular_velocity(), max_angular_velocity);
        prop_assert_eq!(restored.inertia_multiplier(), inertia_multiplier);
        prop_assert_eq!(restored.mass_override(), mass_override);
        prop_assert_eq!(restored.override_mass_properties(), override_mass);
    }

    #[test]
    fn restore_keeps_shape(friction in 0.0f32..1.0) {
        let shape = ShapeRef::sphere(1.0).unwrap().to_const();
        let mut source = BodyCreationSettings::new();
        source.set_friction(friction);
        let mut out = StreamOut::new();
        source.save_binary_state(&mut out);

        let mut target =
            BodyCreationSettings::from_shape(&shape, DVec3::ZERO, Quat::IDENTITY, MotionType::Static, 0);
        target.restore_binary_state(&mut StreamIn::from(&out));
        prop_assert_eq!(target.friction(), friction);
        prop_assert!(target.shape().is_some(), "binary state does not carry the shape");
    }

    #[test]
    fn wrappers_release_everything(radii in prop::collection::vec(0.1f32..10.0, 1..8)) {
        let before = rphys::trace::live_allocations();
        {
            let shapes: Vec<_> = radii
                .iter()
                .map(|r| ShapeRef::sphere(*r).unwrap())
                .collect();
            let copies: Vec<_> = shapes.iter().map(|s| s.to_const()).collect();
            for (shape, copy) in shapes.iter().zip(&copies) {
                prop_assert_eq!(shape.ref_count(), 2);
                let settings =
                    BodyCreationSettings::from_shape(copy, DVec3::ZERO, Quat::IDENTITY, MotionType::Dynamic, 1);
                prop_assert_eq!(shape.ref_count(), 3);
                drop(settings);
            }
        }
        prop_assert_eq!(rphys::trace::live_allocations(), before);
    }
}
