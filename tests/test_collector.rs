//! Broad-phase queries and host callbacks.
//!
//! The custom collector tests stand in for a managed runtime with a function
//! table whose state lives in thread locals, so every test sees its own
//! runtime. The cross-thread test uses a second table whose state is shared
//! behind a mutex and keyed by thread.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{c_char, c_void, CStr};
use std::thread::{self, ThreadId};

use glam::{DVec3, Quat, Vec3};
use parking_lot::Mutex;
use rphys::bridge::RphysHostRuntime;
use rphys::{
    Activation, AllHitCollector, AnyHitCollector, BodyCreationSettings, BodyId, CustomCollector, Error, MotionType,
    PhysicsSystem, ShapeRef,
};

#[derive(Default)]
struct Host {
    attached: bool,
    attach_count: u32,
    detach_count: u32,
    live_globals: Vec<u64>,
    missing_method: bool,
    refuse_attach: bool,
    throw: bool,
    calls: Vec<i32>,
}

thread_local! {
    static HOST: RefCell<Host> = RefCell::new(Host::default());
}

fn host<R>(f: impl FnOnce(&mut Host) -> R) -> R {
    HOST.with(|host| f(&mut host.borrow_mut()))
}

unsafe extern "C" fn get_env(_runtime: *mut c_void) -> u64 {
    host(|h| if h.attached { 1 } else { 0 })
}

unsafe extern "C" fn attach_current_thread(_runtime: *mut c_void) -> u64 {
    host(|h| {
        if h.refuse_attach {
            return 0;
        }
        h.attached = true;
        h.attach_count += 1;
        1
    })
}

unsafe extern "C" fn detach_current_thread(_runtime: *mut c_void) {
    host(|h| {
        h.attached = false;
        h.detach_count += 1;
    });
}

unsafe extern "C" fn new_global_ref(_env: u64, object: u64) -> u64 {
    let global = object + 0x1000;
    host(|h| h.live_globals.push(global));
    global
}

unsafe extern "C" fn delete_global_ref(_env: u64, global: u64) {
    host(|h| h.live_globals.retain(|g| *g != global));
}

unsafe extern "C" fn get_method_id(_env: u64, _object: u64, name: *const c_char, signature: *const c_char) -> u64 {
    let name = CStr::from_ptr(name).to_str().unwrap();
    let signature = CStr::from_ptr(signature).to_str().unwrap();
    let found = !host(|h| h.missing_method) && name == "addHit" && signature == "(I)V";
    if found {
        7
    } else {
        0
    }
}

unsafe extern "C" fn call_void_method_int(_env: u64, _object: u64, method: u64, arg: i32) {
    assert_eq!(method, 7, "called an unresolved method");
    host(|h| h.calls.push(arg));
}

unsafe extern "C" fn exception_check(_env: u64) -> bool {
    host(|h| h.throw)
}

fn runtime_table() -> RphysHostRuntime {
    RphysHostRuntime {
        runtime: std::ptr::null_mut(),
        get_env,
        attach_current_thread,
        detach_current_thread,
        new_global_ref,
        delete_global_ref,
        get_method_id,
        call_void_method_int,
        exception_check,
    }
}

/// Three spheres along the X axis, ten units apart.
fn system_with_row() -> (PhysicsSystem, [BodyId; 3]) {
    let system = PhysicsSystem::new(16);
    let shape = ShapeRef::sphere(0.5).unwrap().to_const();
    let bodies = system.body_interface();
    let ids = [0.0, 10.0, 20.0].map(|x| {
        let settings =
            BodyCreationSettings::from_shape(&shape, DVec3::new(x, 0.0, 0.0), Quat::IDENTITY, MotionType::Dynamic, 1);
        bodies.create_and_add_body(&settings, Activation::DontActivate)
    });
    (system, ids)
}

#[test]
fn test_all_hit_collector() {
    let (system, ids) = system_with_row();
    let query = system.broad_phase_query();

    let mut hits = AllHitCollector::new();
    query.collide_aa_box(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(11.0, 1.0, 1.0), &mut hits);
    let mut found = hits.hits();
    found.sort();
    let mut expected = vec![ids[0], ids[1]];
    expected.sort();
    assert_eq!(found, expected, "the box covers the first two spheres");

    hits.reset();
    assert!(hits.is_empty(), "reset should clear the hits");
    query.collide_sphere(Vec3::new(20.0, 0.0, 0.0), 0.1, &mut hits);
    assert_eq!(hits.hits(), vec![ids[2]]);
}

#[test]
fn test_any_hit_collector() {
    let (system, ids) = system_with_row();
    let query = system.broad_phase_query();

    let mut any = AnyHitCollector::new();
    query.collide_point(Vec3::new(5.0, 0.0, 0.0), &mut any);
    assert_eq!(any.hit(), None, "nothing between the spheres");

    query.collide_point(Vec3::new(10.0, 0.0, 0.0), &mut any);
    assert_eq!(any.hit(), Some(ids[1]));
}

#[test]
fn test_custom_collector_calls_in_order() {
    let (system, [a, b, c]) = system_with_row();
    let query = system.broad_phase_query();
    let table = runtime_table();

    let mut collector = unsafe { CustomCollector::new(&table, 0x42) }.expect("addHit should resolve");
    assert_eq!(host(|h| h.live_globals.clone()), vec![0x1042], "the host object should be pinned");

    query.collide_point(Vec3::new(0.0, 0.0, 0.0), &mut collector);
    query.collide_point(Vec3::new(10.0, 0.0, 0.0), &mut collector);
    collector.reset();
    query.collide_point(Vec3::new(20.0, 0.0, 0.0), &mut collector);

    let expected: Vec<i32> = [a, b, c].iter().map(|id| id.raw() as i32).collect();
    assert_eq!(host(|h| h.calls.clone()), expected, "hits should arrive in query order");
    assert!(!collector.had_exception());

    // Each callback attached the unattached thread and detached it again.
    let (attached, attaches, detaches) = host(|h| (h.attached, h.attach_count, h.detach_count));
    assert!(!attached, "the thread should be left detached");
    assert_eq!(attaches, detaches);

    drop(collector);
    assert!(host(|h| h.live_globals.is_empty()), "dropping should release the host object");
}

#[test]
fn test_custom_collector_keeps_attached_thread() {
    let (system, [a, _, _]) = system_with_row();
    let table = runtime_table();
    host(|h| h.attached = true);

    let mut collector = unsafe { CustomCollector::new(&table, 1) }.unwrap();
    system
        .broad_phase_query()
        .collide_point(Vec3::ZERO, &mut collector);
    drop(collector);

    assert_eq!(host(|h| h.calls.clone()), vec![a.raw() as i32]);
    let (attached, detaches) = host(|h| (h.attached, h.detach_count));
    assert!(attached, "a thread attached by the host stays attached");
    assert_eq!(detaches, 0);
}

#[test]
fn test_custom_collector_exception() {
    let (system, _) = system_with_row();
    let table = runtime_table();
    let mut collector = unsafe { CustomCollector::new(&table, 1) }.unwrap();

    host(|h| h.throw = true);
    system
        .broad_phase_query()
        .collide_aa_box(Vec3::splat(-100.0), Vec3::splat(100.0), &mut collector);
    assert!(collector.had_exception(), "the exception should be recorded");
    assert!(collector.should_early_out(), "an exception ends the query");
    assert_eq!(host(|h| h.calls.len()), 1, "no calls after the exception");

    host(|h| h.throw = false);
    collector.reset();
    assert!(!collector.had_exception());
    assert!(!collector.should_early_out());
}

#[test]
fn test_custom_collector_missing_method() {
    let table = runtime_table();
    host(|h| h.missing_method = true);

    let result = unsafe { CustomCollector::new(&table, 1) };
    assert!(matches!(result, Err(Error::MethodNotFound { .. })), "got {:?}", result);
    assert!(host(|h| h.live_globals.is_empty()), "a failed lookup should release its pin");
}

#[test]
fn test_custom_collector_attach_refused() {
    let table = runtime_table();
    host(|h| h.refuse_attach = true);

    let result = unsafe { CustomCollector::new(&table, 1) };
    assert!(matches!(result, Err(Error::AttachFailed)), "got {:?}", result);
    assert!(host(|h| h.live_globals.is_empty()), "nothing should be pinned");
    assert!(host(|h| h.calls.is_empty()));
}

#[test]
fn test_custom_collector_matches_all_hit() {
    let (system, ids) = system_with_row();
    let query = system.broad_phase_query();
    let table = runtime_table();
    let (min, max) = (Vec3::new(-1.0, -1.0, -1.0), Vec3::new(21.0, 1.0, 1.0));

    let mut all = AllHitCollector::new();
    query.collide_aa_box(min, max, &mut all);
    assert_eq!(all.len(), ids.len(), "the box covers the whole row");

    let mut collector = unsafe { CustomCollector::new(&table, 3) }.unwrap();
    query.collide_aa_box(min, max, &mut collector);

    let expected: Vec<i32> = all.hits().iter().map(|id| id.raw() as i32).collect();
    assert_eq!(host(|h| h.calls.clone()), expected, "every hit should be forwarded in query order");
}

// ============================================================================
// Shared runtime
// ============================================================================

#[derive(Default)]
struct SharedHost {
    attached: Vec<ThreadId>,
    attaches: BTreeMap<String, u32>,
    detaches: BTreeMap<String, u32>,
    calls: Vec<(String, i32)>,
}

static SHARED: Mutex<Option<SharedHost>> = parking_lot::const_mutex(None);

fn shared<R>(f: impl FnOnce(&mut SharedHost) -> R) -> R {
    f(SHARED.lock().get_or_insert_with(SharedHost::default))
}

fn thread_key() -> String {
    format!("{:?}", thread::current().id())
}

unsafe extern "C" fn shared_get_env(_runtime: *mut c_void) -> u64 {
    let id = thread::current().id();
    shared(|h| if h.attached.contains(&id) { 1 } else { 0 })
}

unsafe extern "C" fn shared_attach(_runtime: *mut c_void) -> u64 {
    let id = thread::current().id();
    shared(|h| {
        h.attached.push(id);
        *h.attaches.entry(thread_key()).or_default() += 1;
    });
    1
}

unsafe extern "C" fn shared_detach(_runtime: *mut c_void) {
    let id = thread::current().id();
    shared(|h| {
        h.attached.retain(|t| *t != id);
        *h.detaches.entry(thread_key()).or_default() += 1;
    });
}

unsafe extern "C" fn shared_new_global_ref(_env: u64, object: u64) -> u64 {
    object
}

unsafe extern "C" fn shared_delete_global_ref(_env: u64, _global: u64) {}

unsafe extern "C" fn shared_get_method_id(_env: u64, _object: u64, _name: *const c_char, _sig: *const c_char) -> u64 {
    7
}

unsafe extern "C" fn shared_call(_env: u64, _object: u64, _method: u64, arg: i32) {
    shared(|h| h.calls.push((thread_key(), arg)));
}

unsafe extern "C" fn shared_exception_check(_env: u64) -> bool {
    false
}

fn shared_table() -> RphysHostRuntime {
    RphysHostRuntime {
        runtime: std::ptr::null_mut(),
        get_env: shared_get_env,
        attach_current_thread: shared_attach,
        detach_current_thread: shared_detach,
        new_global_ref: shared_new_global_ref,
        delete_global_ref: shared_delete_global_ref,
        get_method_id: shared_get_method_id,
        call_void_method_int: shared_call,
        exception_check: shared_exception_check,
    }
}

#[test]
fn test_custom_collector_on_spawned_thread() {
    let worker = thread::spawn(|| {
        let (system, ids) = system_with_row();
        let table = shared_table();
        let mut collector = unsafe { CustomCollector::new(&table, 9) }.unwrap();
        system
            .broad_phase_query()
            .collide_aa_box(Vec3::splat(-100.0), Vec3::splat(100.0), &mut collector);
        drop(collector);
        (thread_key(), ids.len())
    });
    let (key, bodies) = worker.join().expect("the query thread should not panic");

    shared(|h| {
        let calls = h.calls.iter().filter(|(thread, _)| *thread == key).count();
        assert_eq!(calls, bodies, "every hit should be reported from the query thread");

        let attaches = h.attaches.get(&key).copied().unwrap_or(0);
        let detaches = h.detaches.get(&key).copied().unwrap_or(0);
        assert!(attaches > 0, "the query thread was never attached");
        assert_eq!(attaches, detaches, "attach and detach should balance");
        assert!(h.attached.is_empty(), "no thread should be left attached");
    });
}
