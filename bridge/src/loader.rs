//! Module discovery: open a shared library and find its create function.
//!
//! The discovery symbol is derived from the file name:
//!
//! 1. Strip the directory, a leading `lib`, and everything from the first
//!    `.`; replace `-` with `_`. `libexample-vm.so` → `example_vm`.
//! 2. Try `evmlink_create_<name>`.
//! 3. Try `evmlink_create_<suffix>` where suffix follows the last `_`.
//! 4. Try the generic `evmlink_create`.

use std::path::Path;

use evmlink_primitives::ffi::{CreateFn, CREATE_SYMBOL_PREFIX, DEFAULT_CREATE_SYMBOL};
use libloading::Library;
use tracing::{debug, trace};

use crate::error::BridgeError;

/// Candidate discovery symbols for `path`, in lookup order.
pub fn create_symbol_candidates(path: &Path) -> Vec<String> {
    let mut candidates = Vec::with_capacity(3);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.strip_prefix("lib").unwrap_or(&file_name);
    let stem = stem.split('.').next().unwrap_or_default();
    let name = stem.replace('-', "_");

    if !name.is_empty() {
        candidates.push(format!("{CREATE_SYMBOL_PREFIX}{name}"));
        if let Some((_, short)) = name.rsplit_once('_') {
            if !short.is_empty() {
                candidates.push(format!("{CREATE_SYMBOL_PREFIX}{short}"));
            }
        }
    }
    candidates.push(DEFAULT_CREATE_SYMBOL.to_owned());
    candidates
}

/// Open the library at `path` and resolve its create function.
///
/// The returned function pointer is valid only while the library is loaded.
pub fn open(path: &Path) -> Result<(Library, CreateFn), BridgeError> {
    if path.as_os_str().is_empty() {
        return Err(BridgeError::InvalidArgument("empty module path".into()));
    }

    // SAFETY: loading runs the library's initializers. Callers opt into
    // trusting the module by asking to load it.
    let library = unsafe { Library::new(path) }.map_err(|source| BridgeError::CannotOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let candidates = create_symbol_candidates(path);
    for symbol in &candidates {
        trace!(symbol = %symbol, "looking up create function");
        // SAFETY: the symbol is assumed to have the `CreateFn` signature;
        // that is the contract for exporting it under this name.
        let found = unsafe { library.get::<CreateFn>(symbol.as_bytes()) }.map(|sym| *sym);
        if let Ok(create) = found {
            debug!(path = %path.display(), symbol = %symbol, "resolved create function");
            return Ok((library, create));
        }
    }

    Err(BridgeError::SymbolNotFound {
        path: path.to_path_buf(),
        tried: candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_from_lib_prefixed_name() {
        let candidates = create_symbol_candidates(Path::new("/usr/lib/libexample-vm.so"));
        assert_eq!(
            candidates,
            vec![
                "evmlink_create_example_vm".to_owned(),
                "evmlink_create_vm".to_owned(),
                "evmlink_create".to_owned(),
            ]
        );
    }

    #[test]
    fn test_candidates_without_prefix_or_underscore() {
        let candidates = create_symbol_candidates(Path::new("./interpreter.dll"));
        assert_eq!(
            candidates,
            vec!["evmlink_create_interpreter".to_owned(), "evmlink_create".to_owned()]
        );
    }

    #[test]
    fn test_candidates_versioned_suffix() {
        let candidates = create_symbol_candidates(Path::new("libfast_evm.so.1.2"));
        assert_eq!(candidates[0], "evmlink_create_fast_evm");
        assert_eq!(candidates[1], "evmlink_create_evm");
    }

    #[test]
    fn test_candidates_for_empty_path() {
        assert_eq!(create_symbol_candidates(Path::new("")), vec!["evmlink_create".to_owned()]);
    }

    #[test]
    fn test_open_empty_path() {
        assert!(matches!(
            open(Path::new("")),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = open(Path::new("/nonexistent/libnothing_here.so")).unwrap_err();
        assert!(matches!(err, BridgeError::CannotOpen { .. }), "got {err}");
    }
}
