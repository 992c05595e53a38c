//! Passafari C FFI bindings.
//!
//! Provides a C-compatible API for the desktop app and the Safari
//! extension: open a store, search it, reveal an entry, build the page fill
//! payload, and import keys. Results are returned as JSON documents.
//!
#![allow(clippy::doc_overindented_list_items)]
//! # Memory contract
//!
//! - All `*mut c_char` output strings are heap-allocated via [`CString`] and
//!   **must** be freed by the caller using [`pf_free_string`], which wipes
//!   them before releasing the memory.
//! - Opaque store handles are heap-allocated Rust `Box`es and **must** be
//!   freed using [`pf_store_free`].
//! - The static string returned by [`pf_version`] must **not** be freed.
//!
//! # Concurrency
//!
//! A store handle may be shared between threads; calls on one handle are
//! serialized.
//!
//! # Error codes
//!
//! | Constant                | Value | Meaning                          |
//! |-------------------------|-------|----------------------------------|
//! | `PF_OK`                 | 0     | Success                          |
//! | `PF_ERR_NULL_PTR`       | -1    | A required pointer was null      |
//! | `PF_ERR_INVALID_UTF8`   | -2    | A string was not valid UTF-8     |
//! | `PF_ERR_IO`             | -3    | Filesystem or gpg failure        |
//! | `PF_ERR_SERIALIZATION`  | -4    | JSON serialization failure       |
//! | `PF_ERR_KEY_IMPORT`     | -5    | Key file unreadable or invalid   |
//! | `PF_ERR_CONFIG`         | -6    | Config file malformed            |
//!
//! Search and reveal failures are not error codes: they are reported in the
//! `status` field of the returned JSON.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use libc::{c_char, c_int, c_void};
use zeroize::{Zeroize, Zeroizing};

use passafari::{
    Config, PassError, Passphrase, Presenter, RevealResult, RevealStep, Store,
};

// ── Error codes ───────────────────────────────────────────────────────────────

/// Success.
pub const PF_OK: i32 = 0;
/// A required pointer argument was null.
pub const PF_ERR_NULL_PTR: i32 = -1;
/// A string argument contained invalid UTF-8.
pub const PF_ERR_INVALID_UTF8: i32 = -2;
/// A filesystem or key ring backend operation failed.
pub const PF_ERR_IO: i32 = -3;
/// A JSON serialization operation failed.
pub const PF_ERR_SERIALIZATION: i32 = -4;
/// A key file could not be imported.
pub const PF_ERR_KEY_IMPORT: i32 = -5;
/// The config file is malformed or unsupported.
pub const PF_ERR_CONFIG: i32 = -6;

/// Store handle behind the opaque pointer.
struct StoreHandle {
    store: Mutex<Store>,
    presenter: Presenter,
}

impl StoreHandle {
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Convert a `*const c_char` to a `&str`, returning an error code on failure.
///
/// # Safety
///
/// `ptr` must either be null (handled gracefully) or point to a valid,
/// null-terminated C string that remains valid for the duration of `'a`.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(PF_ERR_NULL_PTR);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| PF_ERR_INVALID_UTF8)
}

/// Like [`cstr_to_str`], but null means `None`.
unsafe fn optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, i32> {
    if ptr.is_null() {
        return Ok(None);
    }
    cstr_to_str(ptr).map(Some)
}

/// Borrow the handle behind an opaque store pointer.
unsafe fn handle<'a>(store: *mut c_void) -> Result<&'a StoreHandle, i32> {
    if store.is_null() {
        return Err(PF_ERR_NULL_PTR);
    }
    Ok(&*(store as *const StoreHandle))
}

/// Allocate a `CString` and write it into `*out`.
///
/// # Safety
///
/// `out` must be non-null.
unsafe fn write_string_out(s: &str, out: *mut *mut c_char) -> i32 {
    if out.is_null() {
        return PF_ERR_NULL_PTR;
    }
    match CString::new(s) {
        Ok(cs) => {
            *out = cs.into_raw();
            PF_OK
        }
        Err(_) => PF_ERR_SERIALIZATION,
    }
}

/// Serialize `value` into `*out`, wiping the intermediate buffer.
unsafe fn write_json_out<T: serde::Serialize>(value: &T, out: *mut *mut c_char) -> i32 {
    match serde_json::to_string(value) {
        Ok(json) => {
            let json = Zeroizing::new(json);
            write_string_out(&json, out)
        }
        Err(_) => PF_ERR_SERIALIZATION,
    }
}

/// Map a [`PassError`] to one of the `PF_ERR_*` constants.
fn map_error(e: &PassError) -> i32 {
    match e {
        PassError::KeyImportFailed(_) => PF_ERR_KEY_IMPORT,
        PassError::Config(_) => PF_ERR_CONFIG,
        PassError::SerializationError(_) => PF_ERR_SERIALIZATION,
        _ => PF_ERR_IO,
    }
}

/// Reveal `entry`, using `passphrase` only if the store asks for one.
fn reveal(store: &Store, entry: &str, passphrase: Option<&str>) -> RevealResult {
    match (store.begin_reveal(entry), passphrase) {
        (RevealStep::NeedsPassphrase(pending), Some(passphrase)) => {
            pending.resume(store, Some(Passphrase::new(passphrase)))
        }
        (step, _) => step.into_result(),
    }
}

// ── Version & logging ─────────────────────────────────────────────────────────

/// Return the library version string as a null-terminated C string.
///
/// The caller **must not** free this pointer.
#[no_mangle]
pub extern "C" fn pf_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Route library logging to stderr, filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
#[no_mangle]
pub extern "C" fn pf_init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("passafari logging initialised");
    }
}

// ── Store lifecycle ───────────────────────────────────────────────────────────

/// Open the password store described by a config file.
///
/// Configured key files that cannot be imported are logged and skipped.
///
/// # Parameters
///
/// - `config_path` — path of the JSON config; `NULL` for
///                   `~/.passafari/config.json`. A missing file means
///                   defaults. Environment overrides apply.
/// - `store_out`   — on success, receives an opaque handle that the caller
///                   must release with [`pf_store_free`].
///
/// # Returns
///
/// `PF_OK` on success; one of `PF_ERR_*` on failure.
///
/// # Safety
///
/// `store_out` must be non-null; `config_path` must be null or a valid C
/// string.
#[no_mangle]
pub unsafe extern "C" fn pf_store_open(
    config_path: *const c_char,
    store_out: *mut *mut c_void,
) -> i32 {
    let config_path = match optional_str(config_path) {
        Ok(path) => path.map(Path::new).map(Path::to_path_buf),
        Err(e) => return e,
    };
    if store_out.is_null() {
        return PF_ERR_NULL_PTR;
    }

    let path = config_path.unwrap_or_else(Config::default_path);
    let mut config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("could not load config {}: {e}", path.display());
            return map_error(&e);
        }
    };
    config.apply_env();

    match Store::open(&config) {
        Ok(store) => {
            let handle = StoreHandle {
                store: Mutex::new(store),
                presenter: Presenter::new(),
            };
            *store_out = Box::into_raw(Box::new(handle)) as *mut c_void;
            PF_OK
        }
        Err(e) => {
            log::error!("could not open password store: {e}");
            map_error(&e)
        }
    }
}

/// Free a store handle returned by [`pf_store_open`].
///
/// Passing `NULL` is a no-op.
///
/// # Safety
///
/// `store` must be null or a handle from [`pf_store_open`] that has not
/// already been freed.
#[no_mangle]
pub unsafe extern "C" fn pf_store_free(store: *mut c_void) {
    if !store.is_null() {
        drop(Box::from_raw(store as *mut StoreHandle));
    }
}

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Import the keys in `path` into the store's key ring.
///
/// # Parameters
///
/// - `store`       — handle from [`pf_store_open`].
/// - `path`        — key file (armored or binary).
/// - `summary_out` — optional; on success receives the import summary as
///                   JSON, to be freed with [`pf_free_string`]. Pass `NULL`
///                   to skip it.
///
/// # Returns
///
/// `PF_OK` on success, `PF_ERR_KEY_IMPORT` for unreadable or invalid key
/// files.
///
/// # Safety
///
/// `store` and `path` must be non-null.
#[no_mangle]
pub unsafe extern "C" fn pf_import_keys(
    store: *mut c_void,
    path: *const c_char,
    summary_out: *mut *mut c_char,
) -> i32 {
    let handle = match handle(store) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let path = match cstr_to_str(path) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let result = handle.lock().import_keys(Path::new(path));
    match result {
        Ok(summary) if summary_out.is_null() => {
            log::debug!("imported {} keys", summary.processed);
            PF_OK
        }
        Ok(summary) => write_json_out(&summary, summary_out),
        Err(e) => map_error(&e),
    }
}

// ── Search & reveal ───────────────────────────────────────────────────────────

/// Search entries whose path contains `query`.
///
/// Writes a `SearchResult` JSON document (`status`, `entries`, `error`)
/// into `*json_out`, to be freed with [`pf_free_string`]. An empty query or
/// an unreachable store is reported through `status`, not the return code.
///
/// # Safety
///
/// All pointer arguments must be non-null.
#[no_mangle]
pub unsafe extern "C" fn pf_search(
    store: *mut c_void,
    query: *const c_char,
    json_out: *mut *mut c_char,
) -> i32 {
    let handle = match handle(store) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let query = match cstr_to_str(query) {
        Ok(s) => s,
        Err(e) => return e,
    };
    if json_out.is_null() {
        return PF_ERR_NULL_PTR;
    }

    let result = handle.lock().search(query);
    write_json_out(&result, json_out)
}

/// Decrypt `entry`.
///
/// Writes a `RevealResult` JSON document (`status`, `password`, `login`,
/// `error_message`) into `*json_out`, to be freed with [`pf_free_string`].
///
/// With `passphrase = NULL` the result may have status `needs_passphrase`;
/// call again with the passphrase the user typed. A passphrase is only used
/// if cached and unlocked keys are not enough.
///
/// # Safety
///
/// `store`, `entry` and `json_out` must be non-null; `passphrase` may be
/// null.
#[no_mangle]
pub unsafe extern "C" fn pf_reveal(
    store: *mut c_void,
    entry: *const c_char,
    passphrase: *const c_char,
    json_out: *mut *mut c_char,
) -> i32 {
    let handle = match handle(store) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let entry = match cstr_to_str(entry) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let passphrase = match optional_str(passphrase) {
        Ok(p) => p,
        Err(e) => return e,
    };
    if json_out.is_null() {
        return PF_ERR_NULL_PTR;
    }

    let result = reveal(&handle.lock(), entry, passphrase);
    write_json_out(&result, json_out)
}

/// Decrypt `entry` and build the payload for the page's `credentials`
/// message.
///
/// Writes a `FillRequest` JSON document (`password`, `login`, `shortcut`,
/// `message`) into `*json_out`, to be freed with [`pf_free_string`].
/// `shortcut` is non-zero when the fill was triggered by the keyboard
/// shortcut. On failure the credentials are empty and `message` explains
/// why.
///
/// # Safety
///
/// `store`, `entry` and `json_out` must be non-null; `passphrase` may be
/// null.
#[no_mangle]
pub unsafe extern "C" fn pf_fill(
    store: *mut c_void,
    entry: *const c_char,
    passphrase: *const c_char,
    shortcut: c_int,
    json_out: *mut *mut c_char,
) -> i32 {
    let handle = match handle(store) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let entry = match cstr_to_str(entry) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let passphrase = match optional_str(passphrase) {
        Ok(p) => p,
        Err(e) => return e,
    };
    if json_out.is_null() {
        return PF_ERR_NULL_PTR;
    }

    let result = reveal(&handle.lock(), entry, passphrase);
    let request = handle.presenter.fill_request(&result, shortcut != 0);
    write_json_out(&request, json_out)
}

// ── Memory management ─────────────────────────────────────────────────────────

/// Wipe and free a string returned by any `pf_*` function.
///
/// Passing `NULL` is a no-op.
///
/// # Safety
///
/// `s` must be either null or a pointer returned by one of the `pf_*`
/// functions in this crate that has not already been freed.
#[no_mangle]
pub unsafe extern "C" fn pf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let mut bytes = CString::from_raw(s).into_bytes();
        bytes.zeroize();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
