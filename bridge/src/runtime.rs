//! Engine runtime: module loading, configuration and execution.
//!
//! The `Vm` struct is the main entry point. It owns one engine instance
//! (and the library it came from) and provides `execute` for running code
//! against a caller-supplied `HostContext`.
//!
//! Lifecycle guarantees come from ownership: `execute` borrows the `Vm`
//! shared, `set_option` borrows it exclusively, and dropping it destroys
//! the instance before the library is unloaded.

use std::fmt;
use std::path::Path;
use std::ptr::{self, NonNull};

use evmlink_hostapi::HostContext;
use evmlink_primitives::buffer::OwnedResult;
use evmlink_primitives::codec::{decode_result, encode_message};
use evmlink_primitives::ffi::{
    CreateFn, DestroyFn, ExecuteFn, SetOptionFn, VmDescriptor, SET_OPTION_INVALID_NAME,
    SET_OPTION_INVALID_VALUE, SET_OPTION_SUCCESS,
};
use evmlink_primitives::{Capability, ExecutionResult, Message, Revision, StatusCode};
use libloading::Library;
use tracing::{debug, error, warn};

use crate::config::ModuleConfig;
use crate::dispatch::HOST_INTERFACE;
use crate::error::{BridgeError, ProtocolError};
use crate::loader;
use crate::registry;
use crate::validation::{discard, validate_descriptor};

/// A loaded engine instance.
pub struct Vm {
    instance: NonNull<VmDescriptor>,
    name: String,
    version: String,
    capabilities: u32,
    execute_fn: ExecuteFn,
    destroy_fn: DestroyFn,
    set_option_fn: Option<SetOptionFn>,
    // Unloaded after `instance` is destroyed (fields drop after `Drop::drop`).
    _library: Option<Library>,
}

// SAFETY: the contract requires `execute` to be callable concurrently on
// one instance; `set_option` and `destroy` need `&mut self` / ownership.
unsafe impl Send for Vm {}
unsafe impl Sync for Vm {}

impl Vm {
    /// Load the module at `path` and create an instance.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let (library, create) = loader::open(path)?;
        // SAFETY: `create` was resolved from `library`, which the Vm keeps
        // loaded for as long as the instance lives.
        let vm = unsafe { Self::instantiate(create, Some(library)) }?;
        debug!(
            path = %path.display(),
            name = %vm.name,
            version = %vm.version,
            "loaded engine module"
        );
        Ok(vm)
    }

    /// Load from a configuration string `<path>[,name[=value]]*`, applying
    /// each option in order.
    pub fn load_and_configure(config: &str) -> Result<Self, BridgeError> {
        let config: ModuleConfig = config.parse()?;
        Self::load_with_config(&config)
    }

    /// Load and apply an already parsed configuration. The instance is
    /// destroyed if any option is rejected.
    pub fn load_with_config(config: &ModuleConfig) -> Result<Self, BridgeError> {
        let mut vm = Self::load(&config.path)?;
        for (name, value) in &config.options {
            vm.set_option(name, value)?;
        }
        Ok(vm)
    }

    /// Create an instance from a create function linked into this process.
    ///
    /// # Safety
    ///
    /// `create` must honor the module contract: it returns null or a
    /// descriptor whose entry points behave as documented in
    /// `evmlink_primitives::ffi`.
    pub unsafe fn from_create_fn(create: CreateFn) -> Result<Self, BridgeError> {
        Self::instantiate(create, None)
    }

    unsafe fn instantiate(create: CreateFn, library: Option<Library>) -> Result<Self, BridgeError> {
        let instance = NonNull::new(create()).ok_or(BridgeError::InstanceCreationFailure)?;
        let desc = match validate_descriptor(instance) {
            Ok(desc) => desc,
            Err(err) => {
                warn!(%err, "rejecting engine module");
                discard(instance);
                return Err(err);
            }
        };
        Ok(Self {
            instance,
            name: desc.name,
            version: desc.version,
            capabilities: desc.capabilities,
            execute_fn: desc.execute,
            destroy_fn: desc.destroy,
            set_option_fn: desc.set_option,
            _library: library,
        })
    }

    /// Engine name as reported by the module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Engine version as reported by the module.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The advertised capability bitset.
    pub fn capabilities(&self) -> u32 {
        self.capabilities
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        capability.is_in(self.capabilities)
    }

    /// Set an engine option.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), BridgeError> {
        let unknown = || BridgeError::UnknownOption {
            name: name.to_owned(),
        };
        let invalid = || BridgeError::InvalidOptionValue {
            name: name.to_owned(),
            value: value.to_owned(),
        };

        let set_option = self.set_option_fn.ok_or_else(unknown)?;
        let c_name = std::ffi::CString::new(name).map_err(|_| unknown())?;
        let c_value = std::ffi::CString::new(value).map_err(|_| invalid())?;

        // SAFETY: both strings outlive the call; `&mut self` excludes any
        // concurrent execution on this instance.
        let code = unsafe { set_option(self.instance.as_ptr(), c_name.as_ptr(), c_value.as_ptr()) };
        match code {
            SET_OPTION_SUCCESS => {
                debug!(engine = %self.name, name, value, "option set");
                Ok(())
            }
            SET_OPTION_INVALID_NAME => {
                warn!(engine = %self.name, name, "unknown option");
                Err(unknown())
            }
            SET_OPTION_INVALID_VALUE => {
                warn!(engine = %self.name, name, value, "invalid option value");
                Err(invalid())
            }
            other => {
                warn!(engine = %self.name, name, code = other, "unexpected set_option result");
                Err(invalid())
            }
        }
    }

    /// Execute `msg.code` under `revision`, serving callbacks from `host`.
    ///
    /// Never fails: engine-level failures are reported through
    /// `ExecutionResult::status`. The host context is registered only for
    /// the duration of this call, and the engine's output is copied and
    /// released before returning.
    pub fn execute(
        &self,
        host: &mut dyn HostContext,
        revision: Revision,
        msg: &Message<'_>,
    ) -> ExecutionResult {
        // 1. Register the host context under a fresh token
        let registration = registry::global().register(host);
        let token = registration.token();

        // 2. Lay out the message
        let raw_msg = encode_message(msg);
        let code = if msg.code.is_empty() {
            ptr::null()
        } else {
            msg.code.as_ptr()
        };
        debug!(
            engine = %self.name,
            token = token.get(),
            ?revision,
            depth = msg.depth,
            gas = msg.gas,
            code_size = msg.code.len(),
            "execute"
        );

        // 3. Call the engine
        // SAFETY: the instance is live for `&self`; the message, code and
        // callback table outlive the call.
        let raw = unsafe {
            (self.execute_fn)(
                self.instance.as_ptr(),
                &HOST_INTERFACE,
                token.as_context_ptr(),
                revision.as_i32(),
                &raw_msg,
                code,
                msg.code.len(),
            )
        };

        // 4. Copy the result out and release the engine's buffer
        // SAFETY: `raw` is exactly what the engine returned.
        let owned = unsafe { OwnedResult::from_raw(raw) };
        let result = match decode_result(&owned, msg.kind) {
            Ok(result) => result,
            Err(err) => {
                let err = ProtocolError::from(err);
                error!(engine = %self.name, %err, "malformed execution result");
                ExecutionResult::with_status(StatusCode::INTERNAL_ERROR, 0)
            }
        };
        drop(owned);

        // 5. Release the token
        drop(registration);

        debug!(
            engine = %self.name,
            token = token.get(),
            status = %result.status,
            gas_left = result.gas_left,
            output_size = result.output.len(),
            "execute finished"
        );
        result
    }

    /// Destroy the instance now. Equivalent to dropping it.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        debug!(engine = %self.name, "destroying engine instance");
        // SAFETY: `instance` came from the module's create function and is
        // destroyed exactly once, here.
        unsafe { (self.destroy_fn)(self.instance.as_ptr()) };
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("capabilities", &self.capabilities)
            .field("dynamic", &self._library.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmlink_hostapi::MemHost;

    fn example_vm() -> Vm {
        unsafe { Vm::from_create_fn(example_vm::evmlink_create_example_vm) }
            .expect("example vm must load")
    }

    #[test]
    fn test_in_process_identity() {
        let vm = example_vm();
        assert_eq!(vm.name(), "example_vm");
        assert!(vm.version().starts_with(|c: char| c.is_ascii_digit()));
        assert!(vm.has_capability(Capability::Evm1));
        assert!(!vm.has_capability(Capability::Ewasm));
    }

    #[test]
    fn test_set_option_outcomes() {
        let mut vm = example_vm();
        assert!(vm.set_option("verbose", "1").is_ok());
        assert!(matches!(
            vm.set_option("verbose", "10"),
            Err(BridgeError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            vm.set_option("speed", "fast"),
            Err(BridgeError::UnknownOption { name }) if name == "speed"
        ));
        assert!(matches!(
            vm.set_option("nul\0name", "1"),
            Err(BridgeError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_execute_empty_code() {
        let vm = example_vm();
        let mut host = MemHost::new();
        let msg = Message {
            gas: 999,
            depth: 1,
            ..Message::default()
        };
        let result = vm.execute(&mut host, Revision::Homestead, &msg);
        assert_eq!(result.status, StatusCode::SUCCESS);
        assert_eq!(result.gas_left, 999);
        assert!(result.output.is_empty());
    }

    #[test]
    fn test_null_create_fn() {
        unsafe extern "C" fn create_null() -> *mut VmDescriptor {
            ptr::null_mut()
        }
        let err = unsafe { Vm::from_create_fn(create_null) }.unwrap_err();
        assert!(matches!(err, BridgeError::InstanceCreationFailure));
    }

    #[test]
    fn test_load_and_configure_bad_syntax() {
        assert!(matches!(
            Vm::load_and_configure(",verbose=1"),
            Err(BridgeError::InvalidConfigSyntax(_))
        ));
        assert!(matches!(
            Vm::load_and_configure("/nonexistent/libexample_vm.so,verbose=1"),
            Err(BridgeError::CannotOpen { .. })
        ));
    }
}
