//! Shared-library loading for the system module
//!
//! Cross-platform support for acquiring the module from a `.so`, `.dylib` or
//! `.dll` and resolving its exports.

use std::ffi::{c_void, CString};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use super::{LoadError, ModuleExports, ModuleLoader};

/// Cross-platform dynamic library handle
pub struct Library {
    handle: LibraryHandle,
    path: String,
}

impl Library {
    /// Load a dynamic library from the given path.
    ///
    /// # Platform-specific behavior
    ///
    /// - **Linux**: Loads `.so` files using `dlopen(RTLD_NOW | RTLD_LOCAL)`
    /// - **macOS**: Loads `.dylib` files using `dlopen(RTLD_NOW | RTLD_LOCAL)`
    /// - **Windows**: Loads `.dll` files using `LoadLibraryW`
    ///
    /// Loading the same library twice yields two handles onto one mapping;
    /// the platform keeps it mapped until every handle is dropped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path_ref)))?;

        let handle = LibraryHandle::load(path_str)?;

        Ok(Library {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Get a function pointer by name.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - The symbol name is correct
    /// - The function signature matches the type T
    /// - The library remains loaded while using the function
    pub unsafe fn get<T>(&self, symbol: &str) -> Result<T, LoadError> {
        self.handle.symbol(symbol, &self.path)
    }

    /// Get the path this library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ModuleExports for Library {
    fn find_export(&self, symbol: &str) -> Result<NonNull<c_void>, LoadError> {
        let raw: *mut c_void = unsafe { self.get(symbol)? };
        NonNull::new(raw).ok_or_else(|| LoadError::SymbolNotFound {
            symbol: symbol.to_string(),
            library: self.path.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Acquires the module from shared libraries on disk.
///
/// A name containing a path separator is opened as-is. Otherwise each search
/// path is tried with `{prefix}{name}{suffix}` and `{name}{suffix}`, and
/// finally `{prefix}{name}{suffix}` is handed to the system loader, which
/// applies its own search rules.
#[derive(Debug, Clone, Default)]
pub struct DynamicLoader {
    search_paths: Vec<PathBuf>,
}

impl DynamicLoader {
    /// Loader that only uses the system search rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that tries `search_paths` (in order) before the system rules.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Directories tried before the system loader.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Candidate files for `name`, in the order they are tried.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        if is_explicit_path(name) {
            return vec![PathBuf::from(name)];
        }

        let prefixed = format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            name,
            std::env::consts::DLL_SUFFIX
        );
        let bare = format!("{}{}", name, std::env::consts::DLL_SUFFIX);

        let mut candidates = Vec::with_capacity(self.search_paths.len() * 2 + 1);
        for dir in &self.search_paths {
            candidates.push(dir.join(&prefixed));
            if bare != prefixed {
                candidates.push(dir.join(&bare));
            }
        }
        candidates.push(PathBuf::from(prefixed));
        candidates
    }
}

impl ModuleLoader for DynamicLoader {
    type Module = Library;

    fn acquire(&self, name: &str) -> Result<Library, LoadError> {
        let mut last_error = None;

        for candidate in self.candidates(name) {
            // Files in search paths must exist; the bare name goes to the system loader.
            if candidate.components().count() > 1 && !candidate.exists() {
                tracing::debug!(candidate = %candidate.display(), "module candidate missing");
                continue;
            }
            match Library::open(&candidate) {
                Ok(library) => {
                    tracing::debug!(path = %library.path(), "module acquired");
                    return Ok(library);
                }
                Err(err) => {
                    tracing::debug!(
                        candidate = %candidate.display(),
                        error = %err,
                        "module candidate failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LoadError::NotFound {
            path: name.to_string(),
        }))
    }
}

fn is_explicit_path(name: &str) -> bool {
    name.contains('/') || name.contains(std::path::MAIN_SEPARATOR)
}

// Platform-specific implementations

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(windows)]
type LibraryHandle = WindowsLibrary;

// ============================================================================
// Unix Implementation (Linux, macOS, BSD)
// ============================================================================

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        use std::ffi::CStr;

        let c_path = CString::new(path)
            .map_err(|e| LoadError::PlatformError(format!("Invalid path: {}", e)))?;

        let handle = unsafe {
            // RTLD_NOW: Resolve all symbols immediately
            // RTLD_LOCAL: Symbols not available for subsequently loaded libraries
            libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL)
        };

        if handle.is_null() {
            let error = unsafe {
                let err_ptr = libc::dlerror();
                if err_ptr.is_null() {
                    "Unknown error".to_string()
                } else {
                    CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
                }
            };

            return Err(LoadError::NotFound {
                path: format!("{}: {}", path, error),
            });
        }

        Ok(UnixLibrary { handle })
    }

    unsafe fn symbol<T>(&self, name: &str, lib_path: &str) -> Result<T, LoadError> {
        use std::ffi::CStr;

        let c_name = CString::new(name)
            .map_err(|e| LoadError::PlatformError(format!("Invalid symbol name: {}", e)))?;

        // Clear any previous errors
        libc::dlerror();

        let symbol = libc::dlsym(self.handle, c_name.as_ptr());

        let err_ptr = libc::dlerror();
        if !err_ptr.is_null() {
            let error = CStr::from_ptr(err_ptr).to_string_lossy().into_owned();
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{}: {}", lib_path, error),
            });
        }

        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: lib_path.to_string(),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
struct WindowsLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(windows)]
impl WindowsLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };

        if handle.is_null() {
            let error = unsafe { GetLastError() };
            return Err(LoadError::NotFound {
                path: format!("{} (error code: {})", path, error),
            });
        }

        Ok(WindowsLibrary { handle })
    }

    unsafe fn symbol<T>(&self, name: &str, lib_path: &str) -> Result<T, LoadError> {
        let c_name = CString::new(name)
            .map_err(|e| LoadError::PlatformError(format!("Invalid symbol name: {}", e)))?;

        let symbol = GetProcAddress(self.handle, c_name.as_ptr());

        if symbol.is_null() {
            let error = GetLastError();
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{} (error code: {})", lib_path, error),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(windows)]
impl Drop for WindowsLibrary {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

#[cfg(windows)]
unsafe impl Send for WindowsLibrary {}
#[cfg(windows)]
unsafe impl Sync for WindowsLibrary {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(
        module: *mut std::ffi::c_void,
        procname: *const std::ffi::c_char,
    ) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
    fn GetLastError() -> u32;
}
