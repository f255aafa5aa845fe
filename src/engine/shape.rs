//! Shapes and shape settings.
//!
//! [`ShapeSettings`] is the editable description; [`ShapeSettings::create`]
//! validates it and produces an immutable [`Shape`] (or, for mutable
//! compounds, a shape whose sub-shape list can still change). Both live in
//! [`RefTarget`](crate::engine::refcount::RefTarget) allocations and are
//! shared through `Ref` / `RefConst`.
//!
//! Collision geometry is delegated to parry through rapier: every shape
//! carries the `SharedShape` a collider is built from. Compounds flatten
//! nested compounds into a single parry compound, so sub-shape hierarchies
//! of any depth are accepted.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Quat, Vec3};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rapier3d::na::{Isometry3, Point3};
use rapier3d::parry::transformation;
use rapier3d::prelude::SharedShape;
use serde::{Deserialize, Serialize};

use crate::engine::math;
use crate::engine::refcount::{Ref, RefConst};
use crate::engine::result::ShapeResult;
use crate::engine::stream::{StreamIn, StreamOut};
use crate::types::{ShapeSubType, ShapeType};

/// Convex radius used when none is specified.
pub const DEFAULT_CONVEX_RADIUS: f32 = 0.05;

const PLANE_TOLERANCE: f32 = 1.0e-4;

// ============================================================================
// Serializable description
// ============================================================================

/// Complete geometric description of a shape, used for binary state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeDesc {
    Sphere {
        radius: f32,
    },
    Box {
        half_extent: Vec3,
        convex_radius: f32,
    },
    Capsule {
        half_height: f32,
        radius: f32,
    },
    ConvexHull {
        points: Vec<Vec3>,
        convex_radius: f32,
    },
    StaticCompound {
        children: Vec<ChildDesc>,
    },
    MutableCompound {
        children: Vec<ChildDesc>,
    },
}

/// One sub-shape of a compound description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub user_data: u32,
    pub shape: ShapeDesc,
}

#[derive(Serialize, Deserialize)]
struct ShapeState {
    user_data: u64,
    desc: ShapeDesc,
}

// ============================================================================
// Convex hull
// ============================================================================

/// A plane `normal · x + constant = 0`, normal pointing out of the shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub constant: f32,
}

impl Plane {
    /// The plane through `point` with the given unit normal.
    pub fn from_point_and_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            constant: -normal.dot(point),
        }
    }

    /// Signed distance of `point` from the plane.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }
}

/// Hull vertices, polygonal faces and face planes.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    points: Vec<Vec3>,
    faces: Vec<Vec<u32>>,
    planes: Vec<Plane>,
    convex_radius: f32,
}

impl ConvexHull {
    /// Number of hull vertices.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Hull vertices.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Vertex indices of a face, counter-clockwise seen from outside.
    pub fn face_vertices(&self, face: usize) -> &[u32] {
        &self.faces[face]
    }

    /// One plane per face, in face order.
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Convex radius actually used, never more than the requested maximum.
    pub fn convex_radius(&self) -> f32 {
        self.convex_radius
    }

    fn build(input: &[Vec3], max_convex_radius: f32) -> Result<(Self, SharedShape), String> {
        if input.len() < 4 {
            return Err("Too few points".to_string());
        }
        if max_convex_radius < 0.0 {
            return Err("Invalid convex radius".to_string());
        }
        let cloud: Vec<Point3<f32>> = input.iter().map(|p| math::to_point(*p)).collect();
        let (vertices, triangles) = transformation::try_convex_hull(&cloud)
            .map_err(|_| "Failed to create convex hull".to_string())?;
        if triangles.len() < 4 {
            return Err("Failed to create convex hull".to_string());
        }

        // Keep only the vertices the hull uses, in first-use order.
        let mut remap = vec![u32::MAX; vertices.len()];
        let mut points = Vec::new();
        let triangles: Vec<[u32; 3]> = triangles
            .iter()
            .map(|tri| {
                tri.map(|i| {
                    let slot = &mut remap[i as usize];
                    if *slot == u32::MAX {
                        *slot = points.len() as u32;
                        points.push(math::from_point(&vertices[i as usize]));
                    }
                    *slot
                })
            })
            .collect();

        let collider = SharedShape::convex_mesh(
            points.iter().map(|p| math::to_point(*p)).collect(),
            &triangles,
        )
        .ok_or_else(|| "Failed to create convex hull".to_string())?;

        let centroid = points.iter().fold(Vec3::ZERO, |acc, p| acc + *p) / points.len() as f32;
        let (faces, planes) = polygon_faces(&points, &triangles, centroid);
        let inner_radius = planes
            .iter()
            .map(|plane| -plane.signed_distance(centroid))
            .fold(f32::MAX, f32::min);
        let convex_radius = max_convex_radius.min(inner_radius.max(0.0));

        Ok((
            ConvexHull {
                points,
                faces,
                planes,
                convex_radius,
            },
            collider,
        ))
    }
}

/// Merge coplanar hull triangles into polygons.
fn polygon_faces(points: &[Vec3], triangles: &[[u32; 3]], centroid: Vec3) -> (Vec<Vec<u32>>, Vec<Plane>) {
    let mut faces: Vec<Vec<u32>> = Vec::new();
    let mut planes: Vec<Plane> = Vec::new();

    for tri in triangles {
        let [a, b, c] = tri.map(|i| points[i as usize]);
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        if normal == Vec3::ZERO {
            continue;
        }
        if normal.dot(a - centroid) < 0.0 {
            normal = -normal;
        }
        let plane = Plane::from_point_and_normal(a, normal);
        let existing = planes.iter().position(|p| {
            p.normal.dot(normal) > 1.0 - PLANE_TOLERANCE
                && (p.constant - plane.constant).abs() < PLANE_TOLERANCE
        });
        let index = match existing {
            Some(index) => index,
            None => {
                planes.push(plane);
                faces.push(Vec::new());
                faces.len() - 1
            }
        };
        for vertex in tri {
            if !faces[index].contains(vertex) {
                faces[index].push(*vertex);
            }
        }
    }

    for (face, plane) in faces.iter_mut().zip(&planes) {
        let center = face
            .iter()
            .fold(Vec3::ZERO, |acc, &i| acc + points[i as usize])
            / face.len() as f32;
        let u = (points[face[0] as usize] - center).normalize_or_zero();
        let w = plane.normal.cross(u);
        let angle = |i: u32| {
            let d = points[i as usize] - center;
            d.dot(w).atan2(d.dot(u))
        };
        face.sort_by(|&i, &j| angle(i).total_cmp(&angle(j)));
    }

    (faces, planes)
}

// ============================================================================
// Compounds
// ============================================================================

/// A shape placed inside a compound.
#[derive(Debug, Clone)]
pub struct SubShape {
    shape: RefConst<Shape>,
    position: Vec3,
    rotation: Quat,
    user_data: u32,
}

impl SubShape {
    /// Place `shape` at `position` / `rotation` relative to the compound.
    pub fn new(shape: RefConst<Shape>, position: Vec3, rotation: Quat, user_data: u32) -> Self {
        Self {
            shape,
            position,
            rotation,
            user_data,
        }
    }

    pub fn shape(&self) -> &RefConst<Shape> {
        &self.shape
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn user_data(&self) -> u32 {
        self.user_data
    }

    fn isometry(&self) -> Isometry3<f32> {
        math::to_isometry(self.position, self.rotation)
    }
}

/// Sub-shapes plus the flattened collision compound built from them.
pub struct Compound {
    sub_shapes: Vec<SubShape>,
    collider: Option<SharedShape>,
}

impl Compound {
    fn new(sub_shapes: Vec<SubShape>) -> Self {
        let mut compound = Compound {
            sub_shapes,
            collider: None,
        };
        compound.rebuild();
        compound
    }

    pub fn num_sub_shapes(&self) -> usize {
        self.sub_shapes.len()
    }

    pub fn sub_shape(&self, index: usize) -> &SubShape {
        &self.sub_shapes[index]
    }

    pub fn sub_shapes(&self) -> &[SubShape] {
        &self.sub_shapes
    }

    fn rebuild(&mut self) {
        let mut parts = Vec::new();
        self.collect_parts(Isometry3::identity(), &mut parts);
        self.collider = if parts.is_empty() {
            None
        } else {
            Some(SharedShape::compound(parts))
        };
    }

    fn collect_parts(&self, frame: Isometry3<f32>, out: &mut Vec<(Isometry3<f32>, SharedShape)>) {
        for sub in &self.sub_shapes {
            sub.shape.collect_parts(frame * sub.isometry(), out);
        }
    }

    fn desc(&self) -> Vec<ChildDesc> {
        self.sub_shapes
            .iter()
            .map(|sub| ChildDesc {
                position: sub.position,
                rotation: sub.rotation,
                user_data: sub.user_data,
                shape: sub.shape.desc(),
            })
            .collect()
    }
}

/// A compound whose sub-shapes can be added, removed and moved.
pub struct MutableCompound {
    inner: RwLock<Compound>,
}

impl MutableCompound {
    /// Append a sub-shape, returning its index.
    pub fn add_shape(&self, position: Vec3, rotation: Quat, shape: RefConst<Shape>, user_data: u32) -> u32 {
        let mut inner = self.inner.write();
        inner.sub_shapes.push(SubShape::new(shape, position, rotation, user_data));
        inner.rebuild();
        (inner.sub_shapes.len() - 1) as u32
    }

    /// Remove a sub-shape; later indices shift down by one.
    pub fn remove_shape(&self, index: u32) {
        let mut inner = self.inner.write();
        assert!((index as usize) < inner.sub_shapes.len(), "sub-shape index out of range");
        inner.sub_shapes.remove(index as usize);
        inner.rebuild();
    }

    /// Move a sub-shape.
    pub fn modify_shape(&self, index: u32, position: Vec3, rotation: Quat) {
        let mut inner = self.inner.write();
        let sub = &mut inner.sub_shapes[index as usize];
        sub.position = position;
        sub.rotation = rotation;
        inner.rebuild();
    }

    /// Shift all sub-shapes so that the center of mass is at the origin.
    pub fn adjust_center_of_mass(&self) {
        let mut inner = self.inner.write();
        let com = match &inner.collider {
            Some(collider) => math::from_point(&collider.mass_properties(1.0).local_com),
            None => return,
        };
        for sub in &mut inner.sub_shapes {
            sub.position -= com;
        }
        inner.rebuild();
    }

    /// Read access to the current sub-shapes.
    pub fn read(&self) -> RwLockReadGuard<'_, Compound> {
        self.inner.read()
    }
}

/// Read view of a static or mutable compound.
pub enum CompoundView<'a> {
    Static(&'a Compound),
    Mutable(RwLockReadGuard<'a, Compound>),
}

impl Deref for CompoundView<'_> {
    type Target = Compound;

    fn deref(&self) -> &Compound {
        match self {
            CompoundView::Static(compound) => compound,
            CompoundView::Mutable(guard) => guard,
        }
    }
}

// ============================================================================
// Shape
// ============================================================================

enum Geometry {
    Sphere {
        radius: f32,
        collider: SharedShape,
    },
    Box {
        half_extent: Vec3,
        convex_radius: f32,
        collider: SharedShape,
    },
    Capsule {
        half_height: f32,
        radius: f32,
        collider: SharedShape,
    },
    ConvexHull {
        hull: ConvexHull,
        collider: SharedShape,
    },
    StaticCompound(Compound),
    MutableCompound(MutableCompound),
}

/// An immutable (apart from mutable compounds) collision shape.
pub struct Shape {
    geometry: Geometry,
    user_data: AtomicU64,
}

impl Shape {
    fn from_geometry(geometry: Result<Geometry, String>) -> ShapeResult {
        match geometry {
            Ok(geometry) => ShapeResult::valid(Ref::new(Shape {
                geometry,
                user_data: AtomicU64::new(0),
            })),
            Err(message) => ShapeResult::error(message),
        }
    }

    /// A sphere around the origin.
    pub fn sphere(radius: f32) -> ShapeResult {
        Self::from_geometry(sphere_geometry(radius))
    }

    /// A box around the origin.
    pub fn cuboid(half_extent: Vec3, convex_radius: f32) -> ShapeResult {
        Self::from_geometry(box_geometry(half_extent, convex_radius))
    }

    /// A capsule along the Y axis.
    pub fn capsule(half_height: f32, radius: f32) -> ShapeResult {
        Self::from_geometry(capsule_geometry(half_height, radius))
    }

    /// The convex hull of a point cloud.
    pub fn convex_hull(points: &[Vec3], max_convex_radius: f32) -> ShapeResult {
        Self::from_geometry(
            ConvexHull::build(points, max_convex_radius)
                .map(|(hull, collider)| Geometry::ConvexHull { hull, collider }),
        )
    }

    /// An immutable compound of at least two sub-shapes.
    pub fn static_compound(sub_shapes: Vec<SubShape>) -> ShapeResult {
        Self::from_geometry(static_compound_geometry(sub_shapes))
    }

    /// A compound that can be edited after creation.
    pub fn mutable_compound(sub_shapes: Vec<SubShape>) -> ShapeResult {
        Self::from_geometry(Ok(mutable_compound_geometry(sub_shapes)))
    }

    /// Rebuild a shape from its description.
    pub fn from_desc(desc: &ShapeDesc) -> ShapeResult {
        Self::from_geometry(geometry_from_desc(desc))
    }

    pub fn sub_type(&self) -> ShapeSubType {
        match &self.geometry {
            Geometry::Sphere { .. } => ShapeSubType::Sphere,
            Geometry::Box { .. } => ShapeSubType::Box,
            Geometry::Capsule { .. } => ShapeSubType::Capsule,
            Geometry::ConvexHull { .. } => ShapeSubType::ConvexHull,
            Geometry::StaticCompound(_) => ShapeSubType::StaticCompound,
            Geometry::MutableCompound(_) => ShapeSubType::MutableCompound,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        self.sub_type().shape_type()
    }

    pub fn user_data(&self) -> u64 {
        self.user_data.load(Ordering::Relaxed)
    }

    pub fn set_user_data(&self, user_data: u64) {
        self.user_data.store(user_data, Ordering::Relaxed);
    }

    /// Collision geometry, `None` for an empty mutable compound.
    pub fn collision_shape(&self) -> Option<SharedShape> {
        match &self.geometry {
            Geometry::Sphere { collider, .. }
            | Geometry::Box { collider, .. }
            | Geometry::Capsule { collider, .. }
            | Geometry::ConvexHull { collider, .. } => Some(collider.clone()),
            Geometry::StaticCompound(compound) => compound.collider.clone(),
            Geometry::MutableCompound(mutable) => mutable.read().collider.clone(),
        }
    }

    /// Local bounding box as (min, max).
    pub fn local_bounds(&self) -> (Vec3, Vec3) {
        match self.collision_shape() {
            Some(collider) => {
                let aabb = collider.compute_local_aabb();
                (math::from_point(&aabb.mins), math::from_point(&aabb.maxs))
            }
            None => (Vec3::ZERO, Vec3::ZERO),
        }
    }

    pub fn volume(&self) -> f32 {
        self.collision_shape()
            .map(|collider| collider.mass_properties(1.0).mass())
            .unwrap_or(0.0)
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.collision_shape()
            .map(|collider| math::from_point(&collider.mass_properties(1.0).local_com))
            .unwrap_or(Vec3::ZERO)
    }

    /// Radius of a sphere or capsule.
    pub fn radius(&self) -> Option<f32> {
        match &self.geometry {
            Geometry::Sphere { radius, .. } | Geometry::Capsule { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    /// Half extent of a box.
    pub fn half_extent(&self) -> Option<Vec3> {
        match &self.geometry {
            Geometry::Box { half_extent, .. } => Some(*half_extent),
            _ => None,
        }
    }

    /// Half height of the cylindrical part of a capsule.
    pub fn half_height_of_cylinder(&self) -> Option<f32> {
        match &self.geometry {
            Geometry::Capsule { half_height, .. } => Some(*half_height),
            _ => None,
        }
    }

    /// Convex radius of a box or convex hull.
    pub fn convex_radius(&self) -> Option<f32> {
        match &self.geometry {
            Geometry::Box { convex_radius, .. } => Some(*convex_radius),
            Geometry::ConvexHull { hull, .. } => Some(hull.convex_radius),
            _ => None,
        }
    }

    pub fn as_convex_hull(&self) -> Option<&ConvexHull> {
        match &self.geometry {
            Geometry::ConvexHull { hull, .. } => Some(hull),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<CompoundView<'_>> {
        match &self.geometry {
            Geometry::StaticCompound(compound) => Some(CompoundView::Static(compound)),
            Geometry::MutableCompound(mutable) => Some(CompoundView::Mutable(mutable.read())),
            _ => None,
        }
    }

    pub fn as_mutable_compound(&self) -> Option<&MutableCompound> {
        match &self.geometry {
            Geometry::MutableCompound(mutable) => Some(mutable),
            _ => None,
        }
    }

    /// Address of a sub-shape record, valid until the compound changes or
    /// is destroyed.
    pub fn sub_shape_ptr(&self, index: usize) -> Option<*const SubShape> {
        self.as_compound()
            .map(|compound| compound.sub_shape(index) as *const SubShape)
    }

    /// Full description, including nested sub-shapes.
    pub fn desc(&self) -> ShapeDesc {
        match &self.geometry {
            Geometry::Sphere { radius, .. } => ShapeDesc::Sphere { radius: *radius },
            Geometry::Box {
                half_extent,
                convex_radius,
                ..
            } => ShapeDesc::Box {
                half_extent: *half_extent,
                convex_radius: *convex_radius,
            },
            Geometry::Capsule {
                half_height,
                radius,
                ..
            } => ShapeDesc::Capsule {
                half_height: *half_height,
                radius: *radius,
            },
            Geometry::ConvexHull { hull, .. } => ShapeDesc::ConvexHull {
                points: hull.points.clone(),
                convex_radius: hull.convex_radius,
            },
            Geometry::StaticCompound(compound) => ShapeDesc::StaticCompound {
                children: compound.desc(),
            },
            Geometry::MutableCompound(mutable) => ShapeDesc::MutableCompound {
                children: mutable.read().desc(),
            },
        }
    }

    /// Write the shape, sub-shapes included, to `stream`.
    pub fn save_binary_state(&self, stream: &mut StreamOut) {
        stream.write_state(&ShapeState {
            user_data: self.user_data(),
            desc: self.desc(),
        });
    }

    /// Read a shape written by [`Shape::save_binary_state`].
    pub fn restore_from_binary_state(stream: &mut StreamIn) -> ShapeResult {
        let Some(state) = stream.read_state::<ShapeState>() else {
            return ShapeResult::error("Error reading shape");
        };
        let result = Self::from_desc(&state.desc);
        if let ShapeResult::Valid(shape) = &result {
            shape.set_user_data(state.user_data);
        }
        result
    }

    fn collect_parts(&self, frame: Isometry3<f32>, out: &mut Vec<(Isometry3<f32>, SharedShape)>) {
        match &self.geometry {
            Geometry::StaticCompound(compound) => compound.collect_parts(frame, out),
            Geometry::MutableCompound(mutable) => mutable.read().collect_parts(frame, out),
            _ => {
                if let Some(collider) = self.collision_shape() {
                    out.push((frame, collider));
                }
            }
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("sub_type", &self.sub_type())
            .field("user_data", &self.user_data())
            .finish()
    }
}

fn sphere_geometry(radius: f32) -> Result<Geometry, String> {
    if radius <= 0.0 {
        return Err("Invalid radius".to_string());
    }
    Ok(Geometry::Sphere {
        radius,
        collider: SharedShape::ball(radius),
    })
}

fn box_geometry(half_extent: Vec3, convex_radius: f32) -> Result<Geometry, String> {
    if half_extent.min_element() <= 0.0 {
        return Err("Invalid half extent".to_string());
    }
    if convex_radius < 0.0 || convex_radius > half_extent.min_element() {
        return Err("Invalid convex radius".to_string());
    }
    let collider = if convex_radius > 0.0 {
        let core = half_extent - Vec3::splat(convex_radius);
        SharedShape::round_cuboid(core.x, core.y, core.z, convex_radius)
    } else {
        SharedShape::cuboid(half_extent.x, half_extent.y, half_extent.z)
    };
    Ok(Geometry::Box {
        half_extent,
        convex_radius,
        collider,
    })
}

fn capsule_geometry(half_height: f32, radius: f32) -> Result<Geometry, String> {
    if half_height <= 0.0 {
        return Err("Invalid height".to_string());
    }
    if radius <= 0.0 {
        return Err("Invalid radius".to_string());
    }
    Ok(Geometry::Capsule {
        half_height,
        radius,
        collider: SharedShape::capsule_y(half_height, radius),
    })
}

fn static_compound_geometry(sub_shapes: Vec<SubShape>) -> Result<Geometry, String> {
    if sub_shapes.len() < 2 {
        return Err("Compound needs at least 2 sub shapes".to_string());
    }
    Ok(Geometry::StaticCompound(Compound::new(sub_shapes)))
}

fn mutable_compound_geometry(sub_shapes: Vec<SubShape>) -> Geometry {
    Geometry::MutableCompound(MutableCompound {
        inner: RwLock::new(Compound::new(sub_shapes)),
    })
}

fn children_from_desc(children: &[ChildDesc]) -> Result<Vec<SubShape>, String> {
    children
        .iter()
        .map(|child| match Shape::from_desc(&child.shape) {
            ShapeResult::Valid(shape) => Ok(SubShape::new(
                shape.to_const(),
                child.position,
                child.rotation,
                child.user_data,
            )),
            other => Err(other.error_message().to_string()),
        })
        .collect()
}

fn geometry_from_desc(desc: &ShapeDesc) -> Result<Geometry, String> {
    match desc {
        ShapeDesc::Sphere { radius } => sphere_geometry(*radius),
        ShapeDesc::Box {
            half_extent,
            convex_radius,
        } => box_geometry(*half_extent, *convex_radius),
        ShapeDesc::Capsule {
            half_height,
            radius,
        } => capsule_geometry(*half_height, *radius),
        ShapeDesc::ConvexHull {
            points,
            convex_radius,
        } => ConvexHull::build(points, *convex_radius)
            .map(|(hull, collider)| Geometry::ConvexHull { hull, collider }),
        ShapeDesc::StaticCompound { children } => {
            static_compound_geometry(children_from_desc(children)?)
        }
        ShapeDesc::MutableCompound { children } => {
            Ok(mutable_compound_geometry(children_from_desc(children)?))
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Where a compound's sub-shape comes from.
#[derive(Debug, Clone)]
pub enum SubShapeSource {
    /// Settings, turned into a shape when the compound is created.
    Settings(RefConst<ShapeSettings>),
    /// An existing shape, shared with the compound.
    Shape(RefConst<Shape>),
}

/// A sub-shape entry in compound settings.
#[derive(Debug, Clone)]
pub struct SubShapeSettings {
    pub position: Vec3,
    pub rotation: Quat,
    pub user_data: u32,
    pub source: SubShapeSource,
}

/// Editable parameters of each shape kind.
#[derive(Debug, Clone)]
pub enum SettingsKind {
    Sphere {
        radius: f32,
    },
    Box {
        half_extent: Vec3,
        convex_radius: f32,
    },
    Capsule {
        half_height: f32,
        radius: f32,
    },
    ConvexHull {
        points: Vec<Vec3>,
        max_convex_radius: f32,
    },
    StaticCompound {
        sub_shapes: Vec<SubShapeSettings>,
    },
    MutableCompound {
        sub_shapes: Vec<SubShapeSettings>,
    },
}

struct SettingsState {
    kind: SettingsKind,
    user_data: u64,
    cached: Option<ShapeResult>,
}

/// Editable shape description.
///
/// [`ShapeSettings::create`] caches its result; any edit drops the cache.
pub struct ShapeSettings {
    state: Mutex<SettingsState>,
}

impl ShapeSettings {
    pub fn new(kind: SettingsKind) -> Self {
        Self {
            state: Mutex::new(SettingsState {
                kind,
                user_data: 0,
                cached: None,
            }),
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(SettingsKind::Sphere { radius })
    }

    pub fn cuboid(half_extent: Vec3, convex_radius: f32) -> Self {
        Self::new(SettingsKind::Box {
            half_extent,
            convex_radius,
        })
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(SettingsKind::Capsule {
            half_height,
            radius,
        })
    }

    pub fn convex_hull(points: Vec<Vec3>, max_convex_radius: f32) -> Self {
        Self::new(SettingsKind::ConvexHull {
            points,
            max_convex_radius,
        })
    }

    pub fn static_compound() -> Self {
        Self::new(SettingsKind::StaticCompound {
            sub_shapes: Vec::new(),
        })
    }

    pub fn mutable_compound() -> Self {
        Self::new(SettingsKind::MutableCompound {
            sub_shapes: Vec::new(),
        })
    }

    /// Kind of shape these settings create.
    pub fn sub_type(&self) -> ShapeSubType {
        match &self.state.lock().kind {
            SettingsKind::Sphere { .. } => ShapeSubType::Sphere,
            SettingsKind::Box { .. } => ShapeSubType::Box,
            SettingsKind::Capsule { .. } => ShapeSubType::Capsule,
            SettingsKind::ConvexHull { .. } => ShapeSubType::ConvexHull,
            SettingsKind::StaticCompound { .. } => ShapeSubType::StaticCompound,
            SettingsKind::MutableCompound { .. } => ShapeSubType::MutableCompound,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        self.sub_type().shape_type()
    }

    /// Snapshot of the current parameters.
    pub fn kind(&self) -> SettingsKind {
        self.state.lock().kind.clone()
    }

    pub fn user_data(&self) -> u64 {
        self.state.lock().user_data
    }

    pub fn set_user_data(&self, user_data: u64) {
        let mut state = self.state.lock();
        state.user_data = user_data;
        state.cached = None;
    }

    /// Edit the parameters in place and drop any cached shape.
    pub fn edit<R>(&self, f: impl FnOnce(&mut SettingsKind) -> R) -> R {
        let mut state = self.state.lock();
        state.cached = None;
        f(&mut state.kind)
    }

    /// Append a sub-shape to compound settings.
    ///
    /// # Panics
    ///
    /// Panics if these are not compound settings.
    pub fn add_shape(&self, position: Vec3, rotation: Quat, source: SubShapeSource, user_data: u32) {
        self.edit(|kind| match kind {
            SettingsKind::StaticCompound { sub_shapes } | SettingsKind::MutableCompound { sub_shapes } => {
                sub_shapes.push(SubShapeSettings {
                    position,
                    rotation,
                    user_data,
                    source,
                });
            }
            other => panic!("add_shape on non-compound settings {:?}", other),
        })
    }

    /// Drop the cached result so the next [`create`](Self::create) rebuilds.
    pub fn clear_cached_result(&self) {
        self.state.lock().cached = None;
    }

    /// Create the shape, or return the result of an earlier call.
    pub fn create(&self) -> ShapeResult {
        let mut state = self.state.lock();
        if let Some(cached) = &state.cached {
            return cached.clone();
        }
        let result = build_from_kind(&state.kind);
        if let ShapeResult::Valid(shape) = &result {
            shape.set_user_data(state.user_data);
        }
        state.cached = Some(result.clone());
        result
    }
}

impl fmt::Debug for ShapeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeSettings")
            .field("sub_type", &self.sub_type())
            .finish()
    }
}

fn resolve_sub_shapes(entries: &[SubShapeSettings]) -> Result<Vec<SubShape>, String> {
    entries
        .iter()
        .map(|entry| {
            let shape = match &entry.source {
                SubShapeSource::Shape(shape) => shape.clone(),
                SubShapeSource::Settings(settings) => match settings.create() {
                    ShapeResult::Valid(shape) => shape.to_const(),
                    other => return Err(other.error_message().to_string()),
                },
            };
            Ok(SubShape::new(shape, entry.position, entry.rotation, entry.user_data))
        })
        .collect()
}

fn build_from_kind(kind: &SettingsKind) -> ShapeResult {
    match kind {
        SettingsKind::Sphere { radius } => Shape::sphere(*radius),
        SettingsKind::Box {
            half_extent,
            convex_radius,
        } => Shape::cuboid(*half_extent, *convex_radius),
        SettingsKind::Capsule {
            half_height,
            radius,
        } => Shape::capsule(*half_height, *radius),
        SettingsKind::ConvexHull {
            points,
            max_convex_radius,
        } => Shape::convex_hull(points, *max_convex_radius),
        SettingsKind::StaticCompound { sub_shapes } => match resolve_sub_shapes(sub_shapes) {
            Ok(subs) => Shape::static_compound(subs),
            Err(message) => ShapeResult::error(message),
        },
        SettingsKind::MutableCompound { sub_shapes } => match resolve_sub_shapes(sub_shapes) {
            Ok(subs) => Shape::mutable_compound(subs),
            Err(message) => ShapeResult::error(message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_points() -> Vec<Vec3> {
        let mut points = Vec::new();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    points.push(Vec3::new(x, y, z));
                }
            }
        }
        points
    }

    #[test]
    fn test_invalid_sphere_reports_error() {
        let result = Shape::sphere(-1.0);
        assert!(result.has_error());
        assert_eq!(result.error_message(), "Invalid radius");
    }

    #[test]
    fn test_box_convex_radius_bounds() {
        assert!(Shape::cuboid(Vec3::splat(1.0), 0.05).is_valid());
        let result = Shape::cuboid(Vec3::splat(0.1), 0.5);
        assert_eq!(result.error_message(), "Invalid convex radius");
    }

    #[test]
    fn test_cube_hull_has_quad_faces() {
        let result = Shape::convex_hull(&cube_points(), 0.0);
        let shape = result.get();
        let hull = shape.as_convex_hull().unwrap();
        assert_eq!(hull.num_points(), 8);
        assert_eq!(hull.num_faces(), 6);
        assert_eq!(hull.planes().len(), 6);
        for face in 0..hull.num_faces() {
            assert_eq!(hull.face_vertices(face).len(), 4);
        }
        for plane in hull.planes() {
            assert!((plane.constant + 1.0).abs() < 1e-4, "planes sit at distance 1");
            assert!(plane.signed_distance(Vec3::ZERO) < 0.0, "normals point outward");
        }
    }

    #[test]
    fn test_too_few_hull_points() {
        let result = Shape::convex_hull(&[Vec3::ZERO, Vec3::X, Vec3::Y], 0.0);
        assert_eq!(result.error_message(), "Too few points");
    }

    #[test]
    fn test_settings_cache_and_invalidate() {
        let settings = ShapeSettings::sphere(1.0);
        let a = settings.create();
        let b = settings.create();
        assert!(a.get().ptr_eq(b.get()), "second create returns the cached shape");

        settings.edit(|kind| {
            if let SettingsKind::Sphere { radius } = kind {
                *radius = 2.0;
            }
        });
        let c = settings.create();
        assert!(!a.get().ptr_eq(c.get()));
        assert_eq!(c.get().radius(), Some(2.0));
    }

    #[test]
    fn test_static_compound_needs_two() {
        let settings = ShapeSettings::static_compound();
        let sphere = Ref::new(ShapeSettings::sphere(0.5)).to_const();
        settings.add_shape(Vec3::ZERO, Quat::IDENTITY, SubShapeSource::Settings(sphere.clone()), 0);
        assert!(settings.create().has_error());

        settings.add_shape(Vec3::X, Quat::IDENTITY, SubShapeSource::Settings(sphere), 0);
        let result = settings.create();
        let compound = result.get();
        assert_eq!(compound.sub_type(), ShapeSubType::StaticCompound);
        assert_eq!(compound.as_compound().unwrap().num_sub_shapes(), 2);
    }

    #[test]
    fn test_child_error_propagates() {
        let settings = ShapeSettings::mutable_compound();
        let bad = Ref::new(ShapeSettings::capsule(0.0, 1.0)).to_const();
        settings.add_shape(Vec3::ZERO, Quat::IDENTITY, SubShapeSource::Settings(bad), 0);
        assert_eq!(settings.create().error_message(), "Invalid height");
    }

    #[test]
    fn test_mutable_compound_edits() {
        let result = Shape::mutable_compound(Vec::new());
        let shape = result.get();
        assert!(shape.collision_shape().is_none());

        let mutable = shape.as_mutable_compound().unwrap();
        let ball = Shape::sphere(1.0).get().to_const();
        assert_eq!(mutable.add_shape(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY, ball.clone(), 7), 0);
        assert_eq!(mutable.add_shape(Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY, ball.clone(), 8), 1);
        assert_eq!(ball.ref_count(), 3);

        mutable.adjust_center_of_mass();
        let com = shape.center_of_mass();
        assert!(com.length() < 1e-4, "center of mass moved to origin: {:?}", com);

        mutable.remove_shape(0);
        let view = shape.as_compound().unwrap();
        assert_eq!(view.num_sub_shapes(), 1);
        assert_eq!(view.sub_shape(0).user_data(), 8);
        drop(view);
        assert_eq!(ball.ref_count(), 2);
    }

    #[test]
    fn test_binary_state_round_trip() {
        let settings = ShapeSettings::static_compound();
        let ball = Shape::sphere(0.25).get().to_const();
        settings.add_shape(Vec3::X, Quat::IDENTITY, SubShapeSource::Shape(ball.clone()), 1);
        settings.add_shape(-Vec3::X, Quat::IDENTITY, SubShapeSource::Shape(ball), 2);
        let original = settings.create().get().clone();
        original.set_user_data(99);

        let mut out = StreamOut::new();
        original.save_binary_state(&mut out);
        let mut input = StreamIn::new(out.into_data());
        let restored = Shape::restore_from_binary_state(&mut input);
        let restored = restored.get();
        assert_eq!(restored.desc(), original.desc());
        assert_eq!(restored.user_data(), 99);
    }

    #[test]
    fn test_restore_from_garbage_fails() {
        let mut input = StreamIn::new(vec![0xff; 3]);
        let result = Shape::restore_from_binary_state(&mut input);
        assert!(result.has_error());
        assert!(!result.error_message().is_empty());
    }
}
