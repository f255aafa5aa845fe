//! Calling back into the host runtime.
//!
//! Native code may run on threads the host runtime has never seen (worker
//! threads, or a host thread that detached). Every callback therefore
//! attaches the current thread for the duration of the call, and detaches
//! again only when it was the one that attached. Host objects are pinned
//! with a global reference for as long as native code holds them.
//!
//! The runtime is reached through [`HostRuntime`]. Foreign hosts pass a
//! [`RphysHostRuntime`] function table, wrapped by [`FfiHostRuntime`].

use std::ffi::{c_char, c_void, CStr};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A host runtime environment bound to one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEnv(pub u64);

/// A host object reference, local or global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostObject(pub u64);

/// A resolved host method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodId(pub u64);

/// The operations native code needs from a managed host runtime.
pub trait HostRuntime: Send + Sync {
    /// The environment of the current thread, if it is attached.
    fn env(&self) -> Option<HostEnv>;

    /// Attach the current thread. `None` if the runtime refuses.
    fn attach_current_thread(&self) -> Option<HostEnv>;

    fn detach_current_thread(&self);

    /// Pin `object` so it survives beyond the current host call.
    fn new_global_ref(&self, env: HostEnv, object: HostObject) -> HostObject;

    fn delete_global_ref(&self, env: HostEnv, global: HostObject);

    /// Resolve a method on the class of `object`.
    fn method_id(&self, env: HostEnv, object: HostObject, name: &CStr, signature: &CStr) -> Option<MethodId>;

    fn call_void_method_int(&self, env: HostEnv, object: HostObject, method: MethodId, arg: i32);

    /// Whether a host exception is pending on `env`.
    fn exception_check(&self, env: HostEnv) -> bool;
}

/// Function table through which a foreign host exposes its runtime.
///
/// A zero environment, object or method id means failure.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RphysHostRuntime {
    pub runtime: *mut c_void,
    pub get_env: unsafe extern "C" fn(runtime: *mut c_void) -> u64,
    pub attach_current_thread: unsafe extern "C" fn(runtime: *mut c_void) -> u64,
    pub detach_current_thread: unsafe extern "C" fn(runtime: *mut c_void),
    pub new_global_ref: unsafe extern "C" fn(env: u64, object: u64) -> u64,
    pub delete_global_ref: unsafe extern "C" fn(env: u64, global: u64),
    pub get_method_id: unsafe extern "C" fn(
        env: u64,
        object: u64,
        name: *const c_char,
        signature: *const c_char,
    ) -> u64,
    pub call_void_method_int: unsafe extern "C" fn(env: u64, object: u64, method: u64, arg: i32),
    pub exception_check: unsafe extern "C" fn(env: u64) -> bool,
}

impl fmt::Debug for RphysHostRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RphysHostRuntime")
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

/// [`HostRuntime`] over a host-provided function table.
#[derive(Debug)]
pub struct FfiHostRuntime {
    table: RphysHostRuntime,
}

impl FfiHostRuntime {
    /// # Safety
    ///
    /// Every function in `table` must be callable from any thread for as
    /// long as the returned value lives.
    pub unsafe fn new(table: RphysHostRuntime) -> Self {
        Self { table }
    }
}

// FfiHostRuntime is Send + Sync: the table is required to be thread-safe.
unsafe impl Send for FfiHostRuntime {}
unsafe impl Sync for FfiHostRuntime {}

fn non_zero(raw: u64) -> Option<u64> {
    (raw != 0).then_some(raw)
}

impl HostRuntime for FfiHostRuntime {
    fn env(&self) -> Option<HostEnv> {
        // SAFETY: see FfiHostRuntime::new.
        non_zero(unsafe { (self.table.get_env)(self.table.runtime) }).map(HostEnv)
    }

    fn attach_current_thread(&self) -> Option<HostEnv> {
        non_zero(unsafe { (self.table.attach_current_thread)(self.table.runtime) }).map(HostEnv)
    }

    fn detach_current_thread(&self) {
        unsafe { (self.table.detach_current_thread)(self.table.runtime) }
    }

    fn new_global_ref(&self, env: HostEnv, object: HostObject) -> HostObject {
        HostObject(unsafe { (self.table.new_global_ref)(env.0, object.0) })
    }

    fn delete_global_ref(&self, env: HostEnv, global: HostObject) {
        unsafe { (self.table.delete_global_ref)(env.0, global.0) }
    }

    fn method_id(&self, env: HostEnv, object: HostObject, name: &CStr, signature: &CStr) -> Option<MethodId> {
        non_zero(unsafe {
            (self.table.get_method_id)(env.0, object.0, name.as_ptr(), signature.as_ptr())
        })
        .map(MethodId)
    }

    fn call_void_method_int(&self, env: HostEnv, object: HostObject, method: MethodId, arg: i32) {
        unsafe { (self.table.call_void_method_int)(env.0, object.0, method.0, arg) }
    }

    fn exception_check(&self, env: HostEnv) -> bool {
        unsafe { (self.table.exception_check)(env.0) }
    }
}

/// The current thread, attached to the host runtime while this lives.
pub struct Attachment<'a> {
    runtime: &'a dyn HostRuntime,
    env: HostEnv,
    attached_here: bool,
}

impl<'a> Attachment<'a> {
    pub fn acquire(runtime: &'a dyn HostRuntime) -> Result<Self> {
        if let Some(env) = runtime.env() {
            return Ok(Self {
                runtime,
                env,
                attached_here: false,
            });
        }
        match runtime.attach_current_thread() {
            Some(env) => Ok(Self {
                runtime,
                env,
                attached_here: true,
            }),
            None => Err(Error::AttachFailed),
        }
    }

    pub fn env(&self) -> HostEnv {
        self.env
    }
}

impl Drop for Attachment<'_> {
    fn drop(&mut self) {
        if self.attached_here {
            self.runtime.detach_current_thread();
        }
    }
}

/// A host object pinned by a global reference, with one resolved callback
/// method taking an `int`.
///
/// Dropping the peer releases the global reference, attaching the calling
/// thread if needed.
pub struct CallbackPeer {
    runtime: Arc<dyn HostRuntime>,
    object: HostObject,
    method: MethodId,
}

impl CallbackPeer {
    /// Pin `object` and resolve `name` with `signature` on it.
    ///
    /// On a lookup failure the global reference is released again.
    pub fn new(
        runtime: Arc<dyn HostRuntime>,
        object: HostObject,
        name: &CStr,
        signature: &CStr,
    ) -> Result<Self> {
        let (global, method) = {
            let attachment = Attachment::acquire(&*runtime)?;
            let env = attachment.env();
            let global = runtime.new_global_ref(env, object);
            match runtime.method_id(env, global, name, signature) {
                Some(method) => (global, method),
                None => {
                    runtime.delete_global_ref(env, global);
                    return Err(Error::MethodNotFound {
                        name: name.to_string_lossy().into_owned(),
                        signature: signature.to_string_lossy().into_owned(),
                    });
                }
            }
        };
        log::debug!("pinned host object {:#x} for {:?}", global.0, name);
        Ok(Self {
            runtime,
            object: global,
            method,
        })
    }

    /// Invoke the method with `arg`.
    ///
    /// A host exception thrown by the method is left pending and reported as
    /// [`Error::HostException`].
    pub fn call_int(&self, arg: i32) -> Result<()> {
        let attachment = Attachment::acquire(&*self.runtime)?;
        let env = attachment.env();
        self.runtime
            .call_void_method_int(env, self.object, self.method, arg);
        if self.runtime.exception_check(env) {
            return Err(Error::HostException);
        }
        Ok(())
    }
}

impl Drop for CallbackPeer {
    fn drop(&mut self) {
        match Attachment::acquire(&*self.runtime) {
            Ok(attachment) => {
                self.runtime.delete_global_ref(attachment.env(), self.object);
                log::debug!("released host object {:#x}", self.object.0);
            }
            Err(err) => log::error!(
                "leaking host object {:#x}: {}",
                self.object.0,
                err
            ),
        }
    }
}

impl fmt::Debug for CallbackPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPeer")
            .field("object", &self.object)
            .field("method", &self.method)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockRuntime;
    use super::*;

    #[test]
    fn test_unresolvable_method_releases_reference() {
        let runtime = MockRuntime::with_method("other", "()V");
        let result = CallbackPeer::new(runtime.clone(), HostObject(7), c"addHit", c"(I)V");
        assert!(result.as_ref().is_err_and(Error::is_method_not_found));
        assert!(runtime.state.lock().live_globals.is_empty());
    }

    #[test]
    fn test_detaches_only_threads_it_attached() {
        let runtime = MockRuntime::with_method("addHit", "(I)V");
        let peer = CallbackPeer::new(runtime.clone(), HostObject(7), c"addHit", c"(I)V").unwrap();
        peer.call_int(3).unwrap();
        {
            let state = runtime.state.lock();
            assert_eq!(state.attach_count, 2);
            assert_eq!(state.detach_count, 2);
            assert!(!state.attached);
        }

        runtime.state.lock().attached = true;
        peer.call_int(4).unwrap();
        assert_eq!(runtime.state.lock().detach_count, 2);
        assert!(runtime.state.lock().attached);
    }

    #[test]
    fn test_exception_stays_pending() {
        let runtime = MockRuntime::with_method("addHit", "(I)V");
        runtime.state.lock().throw_on = Some(2);
        let peer = CallbackPeer::new(runtime.clone(), HostObject(7), c"addHit", c"(I)V").unwrap();
        assert!(peer.call_int(1).is_ok());
        assert!(peer.call_int(2).is_err_and(|e| e.is_host_exception()));
        assert!(runtime.state.lock().exception_pending);
    }

    #[test]
    fn test_drop_releases_global() {
        let runtime = MockRuntime::with_method("addHit", "(I)V");
        let peer = CallbackPeer::new(runtime.clone(), HostObject(7), c"addHit", c"(I)V").unwrap();
        assert_eq!(runtime.state.lock().live_globals.len(), 1);
        drop(peer);
        assert!(runtime.state.lock().live_globals.is_empty());
    }

    #[test]
    fn test_drop_without_attach_leaks() {
        let runtime = MockRuntime::with_method("addHit", "(I)V");
        let peer = CallbackPeer::new(runtime.clone(), HostObject(7), c"addHit", c"(I)V").unwrap();
        runtime.state.lock().refuse_attach = true;
        drop(peer);
        assert_eq!(runtime.state.lock().live_globals.len(), 1);
    }
}
