//! Loading and invoking the native mesh description parser
//!
//! The parser ships as a prebuilt shared library with a detached signature
//! next to it. Loading it means: verify the signature (or take the loud,
//! double-gated unverified path), load the binary, and check its
//! self-reported version against the version this importer was written for.
//! An ABI drift behind an unchanged version string is exactly the bug this
//! guards against.

use crate::model::{MeshRecord, ModelSource};
use crate::trust::TrustVerifier;
use anyhow::{bail, ensure, Context};
use bridge::ReleaseGuard;
use libloading::{Library, Symbol};
use log::*;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::{CStr, CString};
use std::path::Path;
use std::{env, fs};
use wayfarer_utils::AnyResult;

pub mod abi;
pub(crate) mod bridge;

use abi::{FreeFn, ParseFn, VersionFn, FREE_SYMBOL, PARSE_SYMBOL, VERSION_SYMBOL};

/// Platform-independent stem of the parser binary.
pub const LIBRARY_STEM: &str = "journey_model_parser";

/// Environment variable forming the second gate of the unverified-load path.
pub const UNVERIFIED_ENV: &str = "WAYFARER_ALLOW_UNVERIFIED";

pub fn binary_file_name() -> String {
    format!("{DLL_PREFIX}{LIBRARY_STEM}{DLL_SUFFIX}")
}

pub fn signature_file_name() -> String {
    format!("{}.sig", binary_file_name())
}

/// How (or whether) the parser binary gets trust-checked before loading.
pub enum TrustPolicy<'a> {
    Verify(&'a dyn TrustVerifier),
    /// Skips verification. Only honored when [`UNVERIFIED_ENV`] is set to
    /// `1` as well; requesting this policy is gate one, the environment
    /// variable is gate two.
    DangerouslyUnverified,
}

/// The loaded, verified, version-checked parser library.
///
/// Loaded once per run and kept for the lifetime of the process; the
/// library has no unload contract.
pub struct NativeParser {
    library: Library,
}

impl NativeParser {
    pub fn load(dir: &Path, expected_version: &str, trust: TrustPolicy) -> AnyResult<Self> {
        let binary_path = dir.join(binary_file_name());

        match trust {
            TrustPolicy::Verify(verifier) => {
                let binary = fs::read(&binary_path).with_context(|| {
                    format!("couldn't read parser binary {}", binary_path.display())
                })?;
                let signature_path = dir.join(signature_file_name());
                let signature = fs::read(&signature_path).with_context(|| {
                    format!("couldn't read detached signature {}", signature_path.display())
                })?;

                verifier
                    .verify(&binary, &signature)
                    .with_context(|| format!("refusing to load {}", binary_path.display()))?;
            }
            TrustPolicy::DangerouslyUnverified => {
                ensure!(
                    env::var_os(UNVERIFIED_ENV).is_some_and(|v| v == "1"),
                    "unverified parser loading requires {UNVERIFIED_ENV}=1 in the environment"
                );
                warn!(
                    "Signature verification DISABLED, loading {} as-is",
                    binary_path.display()
                );
            }
        }

        let library = unsafe { Library::new(&binary_path) }
            .with_context(|| format!("couldn't load parser library {}", binary_path.display()))?;

        let parser = Self { library };
        let version = parser.version()?;
        ensure!(
            version == expected_version,
            "parser version mismatch: library reports `{version}`, this importer needs `{expected_version}`"
        );

        info!("Loaded parser {} (version {version})", binary_path.display());
        Ok(parser)
    }

    /// Queries the library's self-reported version string.
    pub fn version(&self) -> AnyResult<String> {
        let version_fn: Symbol<VersionFn> = unsafe { self.library.get(VERSION_SYMBOL)? };

        let ptr = unsafe { version_fn() };
        ensure!(!ptr.is_null(), "parser returned no version string");

        Ok(unsafe { CStr::from_ptr(ptr) }
            .to_str()
            .context("parser version string is not UTF-8")?
            .to_owned())
    }

    /// Parses one mesh description file. A native-side failure is not an
    /// error, just an empty result; the caller logs and moves on.
    pub fn parse(&self, path: &Path) -> AnyResult<Vec<MeshRecord>> {
        let parse_fn: Symbol<ParseFn> = unsafe { self.library.get(PARSE_SYMBOL)? };
        let free_fn: Symbol<FreeFn> = unsafe { self.library.get(FREE_SYMBOL)? };

        let Some(utf8) = path.to_str() else {
            bail!("mesh description path {} is not UTF-8", path.display());
        };
        let c_path = CString::new(utf8).context("mesh description path contains a NUL byte")?;

        let raw = unsafe { parse_fn(c_path.as_ptr()) };
        if raw.is_null() {
            warn!("Native parser failed on {}", path.display());
            return Ok(Vec::new());
        }

        // Freed exactly once, also if decoding panics below.
        let _guard = ReleaseGuard::new(|| unsafe { free_fn(raw) });

        let buffers = unsafe { bridge::view(&*raw) };
        Ok(bridge::decode_objects(&buffers, &path.display().to_string()))
    }
}

impl ModelSource for NativeParser {
    fn parse_models(&self, path: &Path) -> AnyResult<Vec<MeshRecord>> {
        self.parse(path)
    }
}
