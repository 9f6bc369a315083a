//! Module existence probe.
//!
//! Answers "could `require.resolve(name)` succeed from here?" by walking the
//! same candidates Node does: builtins, relative/absolute files with the
//! default extensions, directories via `package.json#main` or `index.*`, and
//! bare specifiers through every ancestor `node_modules`.
//!
//! A missing module is a normal `Ok(false)`. Anything else that goes wrong
//! while looking (unreadable directories, a broken `package.json`) is handed
//! back unchanged as an error.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{ResolveError, Result};

const EXTENSIONS: [&str; 3] = [".js", ".json", ".node"];

const BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "fs/promises",
    "http", "http2", "https", "inspector", "module", "net", "os", "path", "path/posix",
    "path/win32", "perf_hooks", "process", "punycode", "querystring", "readline", "repl",
    "stream", "stream/promises", "string_decoder", "timers", "tls", "trace_events", "tty",
    "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

/// Where a specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Builtin(String),
    File(PathBuf),
}

/// Resolves specifiers relative to a fixed base directory.
#[derive(Debug, Clone)]
pub struct ModuleProbe {
    base_dir: PathBuf,
}

impl ModuleProbe {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn from_current_dir() -> Result<Self> {
        let dir = std::env::current_dir().map_err(|source| ResolveError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Ok(Self::new(dir))
    }

    pub fn has_module(&self, name: &str) -> Result<bool> {
        Ok(self.resolve(name)?.is_some())
    }

    pub fn resolve(&self, name: &str) -> Result<Option<Resolved>> {
        if name.is_empty() {
            return Err(ResolveError::InvalidSpecifier(name.to_string()));
        }
        if let Some(builtin) = name.strip_prefix("node:") {
            // `node:` only ever names builtins; an unknown one is a hard error.
            return if BUILTINS.contains(&builtin) {
                Ok(Some(Resolved::Builtin(name.to_string())))
            } else {
                Err(ResolveError::InvalidSpecifier(name.to_string()))
            };
        }
        if BUILTINS.contains(&name) {
            return Ok(Some(Resolved::Builtin(name.to_string())));
        }

        let found = if is_relative(name) || Path::new(name).is_absolute() {
            resolve_path(&self.base_dir.join(name))?
        } else {
            self.resolve_package(name)?
        };
        match &found {
            Some(path) => tracing::debug!(module = name, path = %path.display(), "module resolved"),
            None => tracing::debug!(module = name, base = %self.base_dir.display(), "module not found"),
        }
        Ok(found.map(Resolved::File))
    }

    fn resolve_package(&self, name: &str) -> Result<Option<PathBuf>> {
        let (package, subpath) = split_package(name);
        for dir in self.base_dir.ancestors() {
            if dir.file_name().is_some_and(|n| n == "node_modules") {
                continue;
            }
            let package_dir = dir.join("node_modules").join(package);
            if !is_dir(&package_dir)? {
                continue;
            }
            tracing::trace!(dir = %package_dir.display(), "candidate package");
            let target = match subpath {
                Some(sub) => package_dir.join(sub),
                None => package_dir,
            };
            if let Some(found) = resolve_path(&target)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// Probe from the process working directory.
pub fn has_module(name: &str) -> Result<bool> {
    ModuleProbe::from_current_dir()?.has_module(name)
}

fn is_relative(name: &str) -> bool {
    name == "." || name == ".." || name.starts_with("./") || name.starts_with("../")
}

/// `@scope/pkg/sub/path` -> (`@scope/pkg`, Some(`sub/path`)).
fn split_package(name: &str) -> (&str, Option<&str>) {
    let segments = if name.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    for (seen, (idx, _)) in name.match_indices('/').enumerate() {
        if seen + 1 == segments {
            split_at = Some(idx);
            break;
        }
    }
    match split_at {
        Some(idx) => (&name[..idx], Some(&name[idx + 1..]).filter(|s| !s.is_empty())),
        None => (name, None),
    }
}

fn resolve_path(path: &Path) -> Result<Option<PathBuf>> {
    if let Some(file) = resolve_file(path)? {
        return Ok(Some(file));
    }
    if is_dir(path)? {
        return resolve_dir(path);
    }
    Ok(None)
}

fn resolve_file(path: &Path) -> Result<Option<PathBuf>> {
    if is_file(path)? {
        return Ok(Some(path.to_path_buf()));
    }
    for ext in EXTENSIONS {
        let mut candidate = OsString::from(path.as_os_str());
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if is_file(&candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn resolve_dir(dir: &Path) -> Result<Option<PathBuf>> {
    if let Some(main) = read_main(dir)? {
        let entry = dir.join(&main);
        if let Some(found) = resolve_file(&entry)? {
            return Ok(Some(found));
        }
        if let Some(found) = resolve_index(&entry)? {
            return Ok(Some(found));
        }
        tracing::debug!(dir = %dir.display(), main = %main, "package main missing, trying index");
    }
    resolve_index(dir)
}

fn resolve_index(dir: &Path) -> Result<Option<PathBuf>> {
    for ext in EXTENSIONS {
        let candidate = dir.join(format!("index{ext}"));
        if is_file(&candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// The `main` entry of `dir/package.json`, if there is one.
fn read_main(dir: &Path) -> Result<Option<String>> {
    let manifest = dir.join("package.json");
    if !is_file(&manifest)? {
        return Ok(None);
    }
    let raw = fs::read_to_string(&manifest).map_err(|source| ResolveError::Io {
        path: manifest.clone(),
        source,
    })?;
    let parsed: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| ResolveError::InvalidPackage {
            path: manifest.clone(),
            reason: e.to_string(),
        })?;
    Ok(parsed
        .get("main")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string))
}

fn is_file(path: &Path) -> Result<bool> {
    Ok(stat(path)?.is_some_and(|m| m.is_file()))
}

fn is_dir(path: &Path) -> Result<bool> {
    Ok(stat(path)?.is_some_and(|m| m.is_dir()))
}

fn stat(path: &Path) -> Result<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if is_missing(&e) => Ok(None),
        Err(source) => Err(ResolveError::Io { path: path.to_path_buf(), source }),
    }
}

fn is_missing(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}
