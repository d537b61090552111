//! Wildcard expansion of argument vectors.
//!
//! An argument containing `*` or `?` is matched against the filesystem with
//! shell-glob rules: `/` is never matched by a wildcard and a leading `.` must
//! be written literally. Matches are produced in ascending byte order of their
//! file names, directory by directory, which is the order `glob` yields them.
//!
//! Diagnostics go through [`stage_diagnostic`] since expansion runs in a forked stage.

use crate::config::NoMatchPolicy;
use crate::error::GlobError;
use crate::logging::stage_diagnostic;
use crate::tokenize::ArgVector;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    // `true` makes the crate skip every dot entry, even for `.*`; see `literal_dots_kept`.
    require_literal_leading_dot: false,
};

pub fn has_wildcard(arg: &str) -> bool {
    arg.contains(['*', '?'])
}

#[derive(Debug, Clone)]
pub struct GlobExpander {
    no_match: NoMatchPolicy,
    max_args: usize,
    base: Option<PathBuf>,
}

impl GlobExpander {
    pub fn new(no_match: NoMatchPolicy, max_args: usize) -> Self {
        GlobExpander { no_match, max_args, base: None }
    }

    /// Match relative patterns against `dir` instead of the process working directory.
    /// Results stay relative to `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base = Some(dir.into());
        self
    }

    /// Fresh vector with every wildcard argument replaced by its matches.
    pub fn expand(&self, args: &[String]) -> Result<ArgVector, GlobError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            if has_wildcard(arg) {
                out.extend(self.expand_one(arg));
            } else {
                out.push(arg.clone());
            }
            if out.len() > self.max_args {
                return Err(GlobError::TooManyArgs { count: out.len(), limit: self.max_args });
            }
        }
        Ok(out)
    }

    fn expand_one(&self, arg: &str) -> Vec<String> {
        let pattern = match &self.base {
            Some(base) if Path::new(arg).is_relative() => {
                format!("{}/{}", Pattern::escape(&base.to_string_lossy()), arg)
            }
            _ => arg.to_string(),
        };
        let paths = match glob::glob_with(&pattern, MATCH_OPTIONS) {
            Ok(paths) => paths,
            Err(e) => {
                stage_diagnostic(&format!("glob {arg}: {e}"));
                return Vec::new();
            }
        };
        let mut matches = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if literal_dots_kept(&pattern, &path) => matches.push(self.display(path)),
                Ok(path) => log::trace!("glob {arg}: {} needs a literal leading dot", path.display()),
                Err(e) => log::debug!("glob {arg}: skipping unreadable entry: {e}"),
            }
        }
        if matches.is_empty() {
            match self.no_match {
                NoMatchPolicy::Drop => {
                    stage_diagnostic(&format!("glob {arg}: no matches"));
                }
                NoMatchPolicy::Literal => matches.push(arg.to_string()),
            }
        }
        matches
    }

    fn display(&self, path: PathBuf) -> String {
        let path = match &self.base {
            Some(base) => path.strip_prefix(base).map(Path::to_path_buf).unwrap_or(path),
            None => path,
        };
        path.into_os_string().into_string().unwrap_or_else(|raw| raw.to_string_lossy().into_owned())
    }
}

/// A path component starting with `.` only matches a pattern component that
/// starts with `.` too. Components are paired from the end.
fn literal_dots_kept(pattern: &str, path: &Path) -> bool {
    let path = path.to_string_lossy();
    let found = path.split('/').filter(|c| !c.is_empty()).rev();
    let wanted = pattern.split('/').filter(|c| !c.is_empty()).rev();
    found.zip(wanted).all(|(f, w)| !f.starts_with('.') || w.starts_with('.'))
}

/// Expand against the current working directory.
pub fn expand_globs(args: &[String], no_match: NoMatchPolicy, max_args: usize) -> Result<ArgVector, GlobError> {
    GlobExpander::new(no_match, max_args).expand(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.txt", "a.txt", "c.log", ".hidden.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn star_matches_in_lexicographic_order() {
        let dir = fixture();
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024).in_dir(dir.path());
        let out = ex.expand(&argv(&["ls", "*.txt", "-l"])).unwrap();
        assert_eq!(out, ["ls", "a.txt", "b.txt", "-l"]);
    }

    #[test]
    fn question_mark_matches_one_char() {
        let dir = fixture();
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024).in_dir(dir.path());
        assert_eq!(ex.expand(&argv(&["?.log"])).unwrap(), ["c.log"]);
        assert_eq!(ex.expand(&argv(&["??.log"])).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn no_match_drops_argument() {
        let dir = fixture();
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024).in_dir(dir.path());
        assert_eq!(ex.expand(&argv(&["cat", "*.nomatch", "a.txt"])).unwrap(), ["cat", "a.txt"]);
    }

    #[test]
    fn no_match_literal_keeps_pattern() {
        let dir = fixture();
        let ex = GlobExpander::new(NoMatchPolicy::Literal, 1024).in_dir(dir.path());
        assert_eq!(ex.expand(&argv(&["cat", "*.nomatch"])).unwrap(), ["cat", "*.nomatch"]);
    }

    #[test]
    fn plain_arguments_are_copied() {
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024);
        let args = argv(&["echo", "[x]", ">", "out"]);
        assert_eq!(ex.expand(&args).unwrap(), args);
    }

    #[test]
    fn hidden_files_need_literal_dot() {
        let dir = fixture();
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024).in_dir(dir.path());
        assert_eq!(ex.expand(&argv(&[".*.txt"])).unwrap(), [".hidden.txt"]);
        assert_eq!(ex.expand(&argv(&[".h*"])).unwrap(), [".hidden.txt"]);
        assert_eq!(ex.expand(&argv(&["*.txt"])).unwrap(), ["a.txt", "b.txt"]);
        assert_eq!(ex.expand(&argv(&["?hidden.txt"])).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn hidden_directories_need_literal_dot() {
        let dir = fixture();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), b"x").unwrap();
        fs::write(dir.path().join("src/HEAD"), b"x").unwrap();
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024).in_dir(dir.path());
        assert_eq!(ex.expand(&argv(&["*/HEAD"])).unwrap(), ["src/HEAD"]);
        assert_eq!(ex.expand(&argv(&[".g*/HEAD"])).unwrap(), [".git/HEAD"]);
    }

    #[test]
    fn literal_dot_pairing_by_component() {
        assert!(literal_dots_kept("/tmp/.cache/*.txt", Path::new("/tmp/.cache/a.txt")));
        assert!(!literal_dots_kept("/tmp/*/a.txt", Path::new("/tmp/.cache/a.txt")));
        assert!(literal_dots_kept("../*.txt", Path::new("../a.txt")));
    }

    #[test]
    fn absolute_patterns_ignore_base() {
        let dir = fixture();
        let pattern = format!("{}/a.*", dir.path().display());
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024).in_dir("/nonexistent");
        assert_eq!(ex.expand(&[pattern]).unwrap(), [format!("{}/a.txt", dir.path().display())]);
    }

    #[test]
    fn expansion_respects_arg_limit() {
        let dir = fixture();
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 2).in_dir(dir.path());
        let err = ex.expand(&argv(&["ls", "*"])).unwrap_err();
        assert!(matches!(err, GlobError::TooManyArgs { count: 4, limit: 2 }));
    }

    #[test]
    fn bad_pattern_contributes_nothing() {
        let ex = GlobExpander::new(NoMatchPolicy::Drop, 1024);
        assert_eq!(ex.expand(&argv(&["ls", "[*"])).unwrap(), ["ls"]);
    }
}
