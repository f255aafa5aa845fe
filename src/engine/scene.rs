//! A saved collection of body settings that can be instantiated into a
//! physics system.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::engine::body_settings::BodyCreationSettings;
use crate::engine::refcount::{Ref, RefConst};
use crate::engine::result::{PhysicsSceneResult, ShapeResult};
use crate::engine::shape::{Shape, ShapeDesc};
use crate::engine::stream::{StreamIn, StreamOut};
use crate::engine::system::PhysicsSystem;
use crate::types::Activation;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedShape {
    user_data: u64,
    desc: ShapeDesc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedBody {
    settings: BodyCreationSettings,
    shape: Option<u32>,
}

/// Serialized form of a scene. Shapes shared between bodies are written
/// once and shared again on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneState {
    bodies: Vec<SavedBody>,
    shapes: Vec<SavedShape>,
}

/// Body settings, kept in insertion order.
#[derive(Default)]
pub struct PhysicsScene {
    bodies: Mutex<Vec<BodyCreationSettings>>,
}

impl PhysicsScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a copy of `settings`.
    pub fn add_body(&self, settings: &BodyCreationSettings) {
        self.bodies.lock().push(settings.clone());
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.lock().len()
    }

    /// Copy of the settings at `index`.
    pub fn body(&self, index: usize) -> Option<BodyCreationSettings> {
        self.bodies.lock().get(index).cloned()
    }

    /// Address of the settings at `index`.
    ///
    /// Valid until the next [`add_body`](Self::add_body) or until the scene
    /// is destroyed.
    pub fn body_ptr(&self, index: usize) -> Option<*mut BodyCreationSettings> {
        self.bodies
            .lock()
            .get_mut(index)
            .map(|settings| settings as *mut BodyCreationSettings)
    }

    /// Create and add every body, stopping at the first failure.
    ///
    /// Bodies created before the failure stay in the system. Returns whether
    /// all bodies were created.
    pub fn create_bodies(&self, system: &PhysicsSystem) -> bool {
        let bodies = self.bodies.lock();
        let interface = system.body_interface();
        let mut created = 0;
        for settings in bodies.iter() {
            if interface
                .create_and_add_body(settings, Activation::Activate)
                .is_invalid()
            {
                log::warn!("scene stopped after {} of {} bodies", created, bodies.len());
                break;
            }
            created += 1;
        }
        created == bodies.len()
    }

    /// Snapshot of the scene, optionally with shapes.
    ///
    /// Bodies that only carry shape settings have them resolved to a shape
    /// first. Without `save_shapes` every body is saved shapeless.
    pub fn state(&self, save_shapes: bool) -> SceneState {
        let bodies = self.bodies.lock();
        let mut shapes: Vec<SavedShape> = Vec::new();
        let mut seen: Vec<*const Shape> = Vec::new();
        let saved = bodies
            .iter()
            .enumerate()
            .map(|(index, settings)| {
                let mut settings = settings.clone();
                let shape = if save_shapes { saved_shape(index, &settings) } else { None };
                settings.set_shape(None);
                let shape = shape.map(|shape| {
                    let ptr: *const Shape = &*shape;
                    let index = match seen.iter().position(|p| *p == ptr) {
                        Some(index) => index,
                        None => {
                            seen.push(ptr);
                            shapes.push(SavedShape {
                                user_data: shape.user_data(),
                                desc: shape.desc(),
                            });
                            shapes.len() - 1
                        }
                    };
                    index as u32
                });
                SavedBody { settings, shape }
            })
            .collect();
        SceneState {
            bodies: saved,
            shapes,
        }
    }

    /// Rebuild a scene from a snapshot.
    pub fn from_state(state: &SceneState) -> PhysicsSceneResult {
        let mut shapes: Vec<RefConst<Shape>> = Vec::with_capacity(state.shapes.len());
        for saved in &state.shapes {
            match Shape::from_desc(&saved.desc) {
                ShapeResult::Valid(shape) => {
                    shape.set_user_data(saved.user_data);
                    shapes.push(shape.to_const());
                }
                ShapeResult::Error(message) => return PhysicsSceneResult::error(message),
                ShapeResult::Empty => return PhysicsSceneResult::error("Error reading scene"),
            }
        }

        let scene = PhysicsScene::new();
        {
            let mut bodies = scene.bodies.lock();
            for saved in &state.bodies {
                let mut settings = saved.settings.clone();
                if let Some(index) = saved.shape {
                    let Some(shape) = shapes.get(index as usize) else {
                        return PhysicsSceneResult::error("Error reading scene");
                    };
                    settings.set_shape(Some(shape.clone()));
                }
                bodies.push(settings);
            }
        }
        PhysicsSceneResult::valid(Ref::new(scene))
    }

    pub fn save_binary_state(&self, stream: &mut StreamOut, save_shapes: bool) {
        stream.write_state(&self.state(save_shapes));
    }

    pub fn restore_from_binary_state(stream: &mut StreamIn) -> PhysicsSceneResult {
        match stream.read_state::<SceneState>() {
            Some(state) => Self::from_state(&state),
            None => PhysicsSceneResult::error("Error reading scene"),
        }
    }
}

/// The shape to save for body `index`, creating it from shape settings when
/// no shape is set yet.
fn saved_shape(index: usize, settings: &BodyCreationSettings) -> Option<RefConst<Shape>> {
    if let Some(shape) = settings.shape() {
        return Some(shape.clone());
    }
    let shape_settings = settings.shape_settings()?;
    match shape_settings.create() {
        ShapeResult::Valid(shape) => Some(shape.to_const()),
        other => {
            log::warn!(
                "body {} saved without a shape: {}",
                index,
                other.error_message()
            );
            None
        }
    }
}

impl fmt::Debug for PhysicsScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsScene")
            .field("num_bodies", &self.num_bodies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::shape::ShapeSettings;
    use crate::types::MotionType;
    use glam::{DVec3, Quat};

    fn scene_with_shared_shape() -> (PhysicsScene, RefConst<Shape>) {
        let shape = Shape::sphere(1.0).get().to_const();
        shape.set_user_data(12);
        let scene = PhysicsScene::new();
        for x in 0..3 {
            scene.add_body(&BodyCreationSettings::from_shape(
                shape.clone(),
                DVec3::new(x as f64 * 3.0, 0.0, 0.0),
                Quat::IDENTITY,
                MotionType::Dynamic,
                0,
            ));
        }
        (scene, shape)
    }

    #[test]
    fn test_binary_round_trip_shares_shapes() {
        let (scene, _shape) = scene_with_shared_shape();
        let mut out = StreamOut::new();
        scene.save_binary_state(&mut out, true);
        assert!(!out.is_failed());

        let result = PhysicsScene::restore_from_binary_state(&mut StreamIn::new(out.into_data()));
        assert!(result.is_valid());
        let restored = result.get();
        assert_eq!(restored.num_bodies(), 3);

        let first = restored.body(0).and_then(|b| b.shape().cloned()).unwrap();
        let last = restored.body(2).and_then(|b| b.shape().cloned()).unwrap();
        assert!(first.ptr_eq(&last));
        assert_eq!(first.user_data(), 12);
        assert_eq!(restored.body(2).unwrap().position.x, 6.0);
    }

    #[test]
    fn test_save_without_shapes() {
        let (scene, _shape) = scene_with_shared_shape();
        let state = scene.state(false);
        assert!(state.shapes.is_empty());
        let restored = PhysicsScene::from_state(&state);
        assert!(restored.get().body(0).unwrap().shape().is_none());
        assert!(scene.body(0).unwrap().shape().is_some(), "saving must not touch the scene");
    }

    #[test]
    fn test_shape_settings_are_resolved_on_save() {
        let sphere = Ref::new(ShapeSettings::sphere(0.5)).to_const();
        let scene = PhysicsScene::new();
        for x in 0..2 {
            scene.add_body(&BodyCreationSettings::from_shape_settings(
                sphere.clone(),
                DVec3::new(x as f64, 0.0, 0.0),
                Quat::IDENTITY,
                MotionType::Dynamic,
                0,
            ));
        }

        let state = scene.state(true);
        assert_eq!(state.shapes.len(), 1, "both bodies share the created shape");

        let mut out = StreamOut::new();
        scene.save_binary_state(&mut out, true);
        let result = PhysicsScene::restore_from_binary_state(&mut StreamIn::new(out.into_data()));
        let body = result.get().body(1).unwrap();
        assert!(body.shape_settings().is_none());
        assert_eq!(body.shape().unwrap().desc(), sphere.create().get().desc());
    }

    #[test]
    fn test_invalid_shape_settings_save_shapeless() {
        let scene = PhysicsScene::new();
        scene.add_body(&BodyCreationSettings::from_shape_settings(
            Ref::new(ShapeSettings::sphere(-1.0)).to_const(),
            DVec3::ZERO,
            Quat::IDENTITY,
            MotionType::Static,
            0,
        ));

        let state = scene.state(true);
        assert!(state.shapes.is_empty());
        assert!(PhysicsScene::from_state(&state).get().body(0).unwrap().shape().is_none());
    }

    #[test]
    fn test_restore_garbage() {
        let result = PhysicsScene::restore_from_binary_state(&mut StreamIn::new(vec![0xff; 3]));
        assert!(result.has_error());
        assert_eq!(result.error_message(), "Error reading scene");
    }

    #[test]
    fn test_create_bodies_respects_limit() {
        let (scene, _shape) = scene_with_shared_shape();
        let system = PhysicsSystem::with_max_bodies(2);
        assert!(!scene.create_bodies(&system));
        assert_eq!(system.num_bodies(), 2);

        let roomy = PhysicsSystem::default();
        assert!(scene.create_bodies(&roomy));
        assert_eq!(roomy.num_bodies(), 3);
    }
}
