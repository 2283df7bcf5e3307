//! Pathname expansion over the real filesystem.
//!
//! Walks directories segment by segment so that `dotglob`,
//! `globstar`, `nullglob`, and `nocaseglob` behave uniformly instead
//! of inheriting platform glob quirks. Patterns arrive
//! pattern-encoded (quoted metacharacters escaped).

use std::path::{Path, PathBuf};

use crate::shell::MatchOptions;

use super::glob::matches_full;
use super::quote::{has_unquoted_meta, unescape};

/// Expand one encoded pattern. `None` means no match (the caller
/// applies nullglob/failglob/literal policy). Matches come back
/// sorted.
pub fn expand_pathnames(encoded: &str, opts: &MatchOptions) -> Option<Vec<String>> {
    let absolute = encoded.starts_with('/');
    let trailing_dir = encoded.ends_with('/');
    let segments: Vec<&str> = encoded.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return if absolute {
            Some(vec!["/".to_string()])
        } else {
            None
        };
    }

    let mut candidates: Vec<PathBuf> = vec![if absolute {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    }];

    for (index, segment) in segments.iter().enumerate() {
        let last = index == segments.len() - 1;
        let mut next: Vec<PathBuf> = Vec::new();
        for base in &candidates {
            step(base, segment, last, trailing_dir, opts, &mut next);
        }
        candidates = next;
        if candidates.is_empty() {
            return None;
        }
    }

    let mut results: Vec<String> = candidates
        .into_iter()
        .map(|p| {
            let mut s = p.to_string_lossy().to_string();
            if trailing_dir {
                s.push('/');
            }
            s
        })
        .collect();
    results.sort();
    results.dedup();
    if results.is_empty() {
        None
    } else {
        Some(results)
    }
}

fn dir_path(base: &Path) -> PathBuf {
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base.to_path_buf()
    }
}

fn step(
    base: &Path,
    segment: &str,
    last: bool,
    trailing_dir: bool,
    opts: &MatchOptions,
    out: &mut Vec<PathBuf>,
) {
    // `**` with globstar: zero or more directory levels.
    if segment == "**" && opts.globstar {
        if last {
            collect_globstar_leaves(base, trailing_dir, opts, out);
        } else {
            out.push(base.to_path_buf());
            collect_globstar_dirs(base, opts, out);
        }
        return;
    }

    if !has_unquoted_meta(segment) {
        let name = unescape(segment);
        let candidate = if base.as_os_str().is_empty() {
            PathBuf::from(&name)
        } else {
            base.join(&name)
        };
        let exists = candidate.symlink_metadata().is_ok();
        if exists && (!last || !trailing_dir || candidate.is_dir()) {
            out.push(candidate);
        }
        return;
    }

    let entries = match std::fs::read_dir(dir_path(base)) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    // Dotfiles need an explicit leading dot unless dotglob is on;
    // `.` and `..` never match a pattern.
    let pattern_leading_dot = segment.starts_with('.');
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && !pattern_leading_dot && !opts.dotglob {
            continue;
        }
        if !matches_full(segment, &name, opts.nocaseglob) {
            continue;
        }
        let candidate = if base.as_os_str().is_empty() {
            PathBuf::from(&name)
        } else {
            base.join(&name)
        };
        if !last && !candidate.is_dir() {
            continue;
        }
        if last && trailing_dir && !candidate.is_dir() {
            continue;
        }
        out.push(candidate);
    }
}

/// All directories at any depth under `base` (inclusive handled by
/// the caller).
fn collect_globstar_dirs(base: &Path, opts: &MatchOptions, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir_path(base)) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && !opts.dotglob {
            continue;
        }
        let candidate = if base.as_os_str().is_empty() {
            PathBuf::from(&name)
        } else {
            base.join(&name)
        };
        if candidate.is_dir() && !candidate.symlink_metadata().map_or(false, |m| m.file_type().is_symlink()) {
            out.push(candidate.clone());
            collect_globstar_dirs(&candidate, opts, out);
        }
    }
}

/// Final `**`: every file and directory at any depth, plus the base
/// itself for the directory case.
fn collect_globstar_leaves(
    base: &Path,
    dirs_only: bool,
    opts: &MatchOptions,
    out: &mut Vec<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir_path(base)) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && !opts.dotglob {
            continue;
        }
        let candidate = if base.as_os_str().is_empty() {
            PathBuf::from(&name)
        } else {
            base.join(&name)
        };
        let is_dir = candidate.is_dir();
        if !dirs_only || is_dir {
            out.push(candidate.clone());
        }
        if is_dir && !candidate.symlink_metadata().map_or(false, |m| m.file_type().is_symlink()) {
            collect_globstar_leaves(&candidate, dirs_only, opts, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn opts() -> MatchOptions {
        MatchOptions::default()
    }

    fn in_dir(files: &[&str], dirs: &[&str]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        for d in dirs {
            fs::create_dir_all(tmp.path().join(d)).unwrap();
        }
        for f in files {
            fs::write(tmp.path().join(f), b"").unwrap();
        }
        tmp
    }

    fn expand_in(tmp: &tempfile::TempDir, pattern: &str, opts: &MatchOptions) -> Option<Vec<String>> {
        let encoded = format!("{}/{}", tmp.path().to_string_lossy(), pattern);
        expand_pathnames(&encoded, opts).map(|paths| {
            paths
                .into_iter()
                .map(|p| {
                    p.strip_prefix(&format!("{}/", tmp.path().to_string_lossy()))
                        .unwrap_or(&p)
                        .to_string()
                })
                .collect()
        })
    }

    #[test]
    fn star_matches_files() {
        let tmp = in_dir(&["a.rs", "b.rs", "c.txt"], &[]);
        let matches = expand_in(&tmp, "*.rs", &opts()).unwrap();
        assert_eq!(matches, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn no_match_returns_none() {
        let tmp = in_dir(&["a.rs"], &[]);
        assert!(expand_in(&tmp, "*.zip", &opts()).is_none());
    }

    #[test]
    fn dotfiles_hidden_by_default() {
        let tmp = in_dir(&[".hidden", "shown"], &[]);
        let matches = expand_in(&tmp, "*", &opts()).unwrap();
        assert_eq!(matches, vec!["shown"]);

        let mut dot = opts();
        dot.dotglob = true;
        let matches = expand_in(&tmp, "*", &dot).unwrap();
        assert_eq!(matches, vec![".hidden", "shown"]);

        // Explicit leading dot always matches.
        let matches = expand_in(&tmp, ".h*", &opts()).unwrap();
        assert_eq!(matches, vec![".hidden"]);
    }

    #[test]
    fn directory_walking() {
        let tmp = in_dir(&["src/main.rs", "src/lib.rs"], &["src", "doc"]);
        let matches = expand_in(&tmp, "*/*.rs", &opts()).unwrap();
        assert_eq!(matches, vec!["src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn trailing_slash_dirs_only() {
        let tmp = in_dir(&["file"], &["adir"]);
        let matches = expand_in(&tmp, "*/", &opts()).unwrap();
        assert_eq!(matches, vec!["adir/"]);
    }

    #[test]
    fn globstar_recursion() {
        let tmp = in_dir(&["a/b/deep.rs", "top.rs"], &["a/b"]);
        let mut gs = opts();
        gs.globstar = true;
        let matches = expand_in(&tmp, "**/*.rs", &gs).unwrap();
        assert_eq!(matches, vec!["a/b/deep.rs", "top.rs"]);
    }

    #[test]
    fn nocaseglob() {
        let tmp = in_dir(&["README"], &[]);
        let mut nc = opts();
        nc.nocaseglob = true;
        let matches = expand_in(&tmp, "read*", &nc).unwrap();
        assert_eq!(matches, vec!["README"]);
        assert!(expand_in(&tmp, "read*", &opts()).is_none());
    }

    #[test]
    fn escaped_meta_is_literal() {
        let tmp = in_dir(&["a*b", "axb"], &[]);
        let matches = expand_in(&tmp, "a\\*b", &opts()).unwrap();
        assert_eq!(matches, vec!["a*b"]);
    }
}
