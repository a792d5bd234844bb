//! Static import extraction
//!
//! Walks Python source trees and collects the top-level module of every
//! absolute `import` / `from ... import` statement. Sources are never
//! executed; statements inside triple-quoted strings are ignored.

use crate::error::ScanError;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names never scanned
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "venv",
    ".venv",
    "build",
    "dist",
    "__pycache__",
    "site-packages",
    "node_modules",
];

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?P<names>[^#]+)").unwrap());

static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+(?P<module>\.*[A-Za-z_][\w.]*|\.+)\s+import\b").unwrap());

static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*").unwrap());

/// Collects top-level module names imported by one source file
pub fn extract_imports(source: &str) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    let mut open_quote: Option<&'static str> = None;

    for line in logical_lines(source) {
        if let Some(quote) = open_quote {
            if let Some(idx) = line.find(quote) {
                open_quote = unclosed_triple_quote(&line[idx + quote.len()..]);
            }
            continue;
        }

        for statement in line.split(';') {
            collect_statement(statement, &mut modules);
        }
        open_quote = unclosed_triple_quote(&line);
    }
    modules
}

/// Joins backslash continuations into single lines
fn logical_lines(source: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for raw in source.lines() {
        if let Some(stripped) = raw.strip_suffix('\\') {
            current.push_str(stripped);
            current.push(' ');
            continue;
        }
        current.push_str(raw);
        lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn collect_statement(statement: &str, modules: &mut BTreeSet<String>) {
    if let Some(caps) = FROM_RE.captures(statement) {
        let module = caps.name("module").map_or("", |m| m.as_str());
        if !module.starts_with('.') {
            if let Some(top) = top_level(module) {
                modules.insert(top);
            }
        }
        return;
    }
    if let Some(caps) = IMPORT_RE.captures(statement) {
        let names = caps.name("names").map_or("", |m| m.as_str());
        for name in names.trim_matches(|c| c == '(' || c == ')').split(',') {
            let dotted = name.split_whitespace().next().unwrap_or("");
            if let Some(top) = top_level(dotted) {
                modules.insert(top);
            }
        }
    }
}

fn top_level(dotted: &str) -> Option<String> {
    let first = dotted.split('.').next()?;
    MODULE_RE
        .find(first)
        .filter(|m| m.end() == first.len())
        .map(|m| m.as_str().to_string())
}

/// Returns the triple-quote delimiter left open at the end of `line`, if any
fn unclosed_triple_quote(line: &str) -> Option<&'static str> {
    let mut open: Option<&'static str> = None;
    let mut rest = line;
    loop {
        match open {
            Some(quote) => match rest.find(quote) {
                Some(idx) => {
                    rest = &rest[idx + quote.len()..];
                    open = None;
                }
                None => return open,
            },
            None => {
                let next = ["\"\"\"", "'''"]
                    .into_iter()
                    .filter_map(|q| rest.find(q).map(|idx| (idx, q)))
                    .min_by_key(|(idx, _)| *idx);
                match next {
                    Some((idx, quote)) => {
                        if rest[..idx].contains('#') {
                            return None;
                        }
                        rest = &rest[idx + quote.len()..];
                        open = Some(quote);
                    }
                    None => return None,
                }
            }
        }
    }
}

fn is_excluded(entry: &DirEntry, excluded: &BTreeSet<String>) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || excluded.contains(name.as_ref())
}

/// Lists the `.py` files under `root`, skipping hidden and excluded directories
pub fn python_files(root: &Path, exclude_dirs: &[String]) -> Vec<PathBuf> {
    let excluded: BTreeSet<String> = DEFAULT_EXCLUDED_DIRS
        .iter()
        .map(|s| s.to_string())
        .chain(exclude_dirs.iter().cloned())
        .collect();

    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e, &excluded))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "py"))
        .map(|e| e.into_path())
        .collect()
}

/// Scans source roots for imported top-level modules
///
/// Every root must be an existing directory.
pub fn scan_imports(roots: &[PathBuf], exclude_dirs: &[String]) -> Result<BTreeSet<String>, ScanError> {
    let mut modules = BTreeSet::new();
    for root in roots {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root.clone() });
        }
        for file in python_files(root, exclude_dirs) {
            let bytes = match fs::read(&file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let found = extract_imports(&String::from_utf8_lossy(&bytes));
            debug!(path = %file.display(), count = found.len(), "scanned");
            modules.extend(found);
        }
    }
    Ok(modules)
}

/// Finds the project's own top-level modules
///
/// Packages (directories with `__init__.py`) and single-file modules directly
/// under each base directory count; `tests` and `test` never do.
pub fn discover_local_modules(bases: &[PathBuf]) -> BTreeSet<String> {
    let mut local = BTreeSet::new();
    for base in bases {
        let Ok(entries) = fs::read_dir(base) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_dir() {
                if path.join("__init__.py").is_file() {
                    local.insert(name);
                }
            } else if let Some(stem) = name.strip_suffix(".py") {
                local.insert(stem.to_string());
            }
        }
    }
    local.remove("tests");
    local.remove("test");
    local
}
