// spec_parser.rs — CmdLineSpecParser: command-line specs to addresses.
//
// Supported spec forms:
//   src/app:bin   a single address
//   src/app       shorthand for src/app:app
//   src/app:      every target declared in src/app
//   src/app::     every target declared in src/app or any directory below it
//
// Wildcard expansions are filtered through --exclude-target-regexp (matched
// against the address string) and --spec-excludes (directories, as path
// prefixes or glob patterns). A single fully-qualified address is never
// filtered. The parser only reads declarations; it never touches the graph.

use std::path::Path;
use std::sync::Arc;

use glob::Pattern;
use regex::Regex;

use crate::address::{normalize_path, Address};
use crate::error::{GraphError, SpecError};
use crate::mapper::{is_under, AddressMapper};

/// A parsed command-line spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    Single(Address),
    /// All targets declared in one directory.
    Siblings(String),
    /// All targets declared in a directory and its subdirectories.
    Descendants(String),
}

impl Spec {
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        if let Some(dir) = raw.strip_suffix("::") {
            Ok(Spec::Descendants(normalize_path(raw, dir)?))
        } else if let Some(dir) = raw.strip_suffix(':') {
            Ok(Spec::Siblings(normalize_path(raw, dir)?))
        } else {
            Address::parse(raw, "").map(Spec::Single)
        }
    }
}

enum PathExclude {
    Prefix(String),
    Glob(Pattern),
}

impl PathExclude {
    fn matches(&self, dir: &str) -> bool {
        match self {
            PathExclude::Prefix(prefix) => is_under(dir, prefix),
            PathExclude::Glob(pattern) => pattern.matches(dir),
        }
    }
}

pub struct CmdLineSpecParser {
    mapper: Arc<dyn AddressMapper>,
    exclude_target_regexps: Vec<Regex>,
    spec_excludes: Vec<PathExclude>,
    errors: Vec<SpecError>,
}

impl CmdLineSpecParser {
    /// Create a parser. `spec_excludes` entries may be relative to
    /// `build_root` or absolute paths beneath it.
    pub fn new(
        build_root: &Path,
        mapper: Arc<dyn AddressMapper>,
        spec_excludes: &[String],
        exclude_target_regexps: &[String],
    ) -> Result<Self, SpecError> {
        let exclude_target_regexps = exclude_target_regexps
            .iter()
            .map(|re| {
                Regex::new(re).map_err(|e| SpecError::InvalidExcludePattern {
                    pattern: re.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let spec_excludes = spec_excludes
            .iter()
            .map(|raw| compile_path_exclude(build_root, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mapper,
            exclude_target_regexps,
            spec_excludes,
            errors: Vec::new(),
        })
    }

    /// Resolve one spec into addresses.
    ///
    /// With `fail_fast` the first error is returned. Otherwise errors are
    /// logged and collected (see [`Self::take_errors`]) and whatever did
    /// resolve is returned.
    pub fn parse_addresses(&mut self, spec: &str, fail_fast: bool) -> Result<Vec<Address>, SpecError> {
        let parsed = match Spec::parse(spec) {
            Ok(parsed) => parsed,
            Err(e) => return self.fail(e, fail_fast),
        };

        match parsed {
            Spec::Single(address) => match self.mapper.resolve(&address) {
                Ok(_) => Ok(vec![address]),
                Err(source) => self.fail(resolution(spec, source), fail_fast),
            },
            Spec::Siblings(dir) => {
                if self.is_excluded_dir(&dir) {
                    return Ok(Vec::new());
                }
                match self.mapper.addresses_in(&dir) {
                    Ok(addresses) => Ok(self.filter(addresses)),
                    Err(source) => self.fail(resolution(spec, source), fail_fast),
                }
            }
            Spec::Descendants(dir) => {
                let dirs = match self.mapper.build_dirs_under(&dir) {
                    Ok(dirs) if dirs.is_empty() => {
                        let source = GraphError::BuildFileNotFound { dir };
                        return self.fail(resolution(spec, source), fail_fast);
                    }
                    Ok(dirs) => dirs,
                    Err(source) => return self.fail(resolution(spec, source), fail_fast),
                };

                let dirs: Vec<String> = dirs
                    .into_iter()
                    .filter(|d| !self.is_excluded_dir(d))
                    .collect();
                let mut addresses = Vec::new();
                for dir in &dirs {
                    match self.mapper.addresses_in(dir) {
                        Ok(found) => addresses.extend(self.filter(found)),
                        Err(source) => {
                            self.fail(resolution(spec, source), fail_fast)?;
                        }
                    }
                }
                Ok(addresses)
            }
        }
    }

    /// Errors collected by non-fail-fast parsing so far.
    pub fn errors(&self) -> &[SpecError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<SpecError> {
        std::mem::take(&mut self.errors)
    }

    fn fail(&mut self, error: SpecError, fail_fast: bool) -> Result<Vec<Address>, SpecError> {
        if fail_fast {
            return Err(error);
        }
        tracing::error!("{}", error);
        self.errors.push(error);
        Ok(Vec::new())
    }

    fn is_excluded_dir(&self, dir: &str) -> bool {
        self.spec_excludes.iter().any(|e| e.matches(dir))
    }

    fn filter(&self, addresses: Vec<Address>) -> Vec<Address> {
        addresses
            .into_iter()
            .filter(|address| {
                let spec = address.spec();
                let excluded = self.exclude_target_regexps.iter().any(|re| re.is_match(&spec));
                if excluded {
                    tracing::debug!(address = %spec, "excluded by --exclude-target-regexp");
                }
                !excluded
            })
            .collect()
    }
}

fn resolution(spec: &str, source: GraphError) -> SpecError {
    SpecError::Resolution {
        spec: spec.to_string(),
        source,
    }
}

fn compile_path_exclude(build_root: &Path, raw: &str) -> Result<PathExclude, SpecError> {
    let invalid = |message: String| SpecError::InvalidExcludePattern {
        pattern: raw.to_string(),
        message,
    };

    let relative = match Path::new(raw).strip_prefix(build_root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) if Path::new(raw).is_absolute() => {
            return Err(invalid("absolute path outside the build root".to_string()));
        }
        Err(_) => raw.to_string(),
    };

    if relative.contains(['*', '?', '[']) {
        let trimmed = relative.trim_start_matches("./").trim_end_matches('/');
        Pattern::new(trimmed)
            .map(PathExclude::Glob)
            .map_err(|e| invalid(e.to_string()))
    } else {
        normalize_path(raw, &relative)
            .map(PathExclude::Prefix)
            .map_err(|e| invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::InMemoryAddressMapper;

    fn mapper() -> Arc<dyn AddressMapper> {
        let mut m = InMemoryAddressMapper::new();
        m.declare("src/app:bin", &[]).unwrap();
        m.declare("src/app:bin-test", &[]).unwrap();
        m.declare("src/util:util", &[]).unwrap();
        m.declare("src/gen/proto:proto", &[]).unwrap();
        m.declare("3rdparty:serde", &[]).unwrap();
        Arc::new(m)
    }

    fn parser(spec_excludes: &[&str], regexps: &[&str]) -> CmdLineSpecParser {
        let to_vec = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        CmdLineSpecParser::new(
            Path::new("/repo"),
            mapper(),
            &to_vec(spec_excludes),
            &to_vec(regexps),
        )
        .unwrap()
    }

    fn specs(addresses: &[Address]) -> Vec<String> {
        addresses.iter().map(Address::spec).collect()
    }

    #[test]
    fn spec_forms() {
        assert_eq!(Spec::parse("a/b::").unwrap(), Spec::Descendants("a/b".into()));
        assert_eq!(Spec::parse("//::").unwrap(), Spec::Descendants(String::new()));
        assert_eq!(Spec::parse("./a:").unwrap(), Spec::Siblings("a".into()));
        assert_eq!(
            Spec::parse("a:x").unwrap(),
            Spec::Single(Address::new("a", "x"))
        );
    }

    #[test]
    fn single_address() {
        let mut p = parser(&[], &[]);
        let found = p.parse_addresses("src/util", true).unwrap();
        assert_eq!(specs(&found), vec!["src/util:util"]);
    }

    #[test]
    fn siblings_and_descendants() {
        let mut p = parser(&[], &[]);
        assert_eq!(
            specs(&p.parse_addresses("src/app:", true).unwrap()),
            vec!["src/app:bin", "src/app:bin-test"]
        );
        assert_eq!(
            specs(&p.parse_addresses("src::", true).unwrap()),
            vec!["src/app:bin", "src/app:bin-test", "src/gen/proto:proto", "src/util:util"]
        );
    }

    #[test]
    fn regex_excludes_apply_to_wildcards_only() {
        let mut p = parser(&[], &["-test$"]);
        assert_eq!(
            specs(&p.parse_addresses("src/app:", true).unwrap()),
            vec!["src/app:bin"]
        );
        assert_eq!(
            specs(&p.parse_addresses("src/app:bin-test", true).unwrap()),
            vec!["src/app:bin-test"]
        );
    }

    #[test]
    fn path_excludes_prefix_absolute_and_glob() {
        let mut p = parser(&["/repo/src/gen", "src/ut*"], &[]);
        assert_eq!(
            specs(&p.parse_addresses("::", true).unwrap()),
            vec!["3rdparty:serde", "src/app:bin", "src/app:bin-test"]
        );
        assert!(p.parse_addresses("src/gen/proto:", true).unwrap().is_empty());
    }

    #[test]
    fn fail_fast_returns_first_error() {
        let mut p = parser(&[], &[]);
        let err = p.parse_addresses("src/app:nope", true).unwrap_err();
        assert!(matches!(
            err,
            SpecError::Resolution {
                source: GraphError::TargetNotFound { .. },
                ..
            }
        ));
        assert!(p.errors().is_empty());
    }

    #[test]
    fn collect_mode_records_errors_and_continues() {
        let mut p = parser(&[], &[]);
        assert!(p.parse_addresses("missing/dir:x", false).unwrap().is_empty());
        assert!(p.parse_addresses("../escape", false).unwrap().is_empty());
        assert_eq!(p.parse_addresses("3rdparty:serde", false).unwrap().len(), 1);
        assert_eq!(p.errors().len(), 2);
        assert_eq!(p.take_errors().len(), 2);
        assert!(p.errors().is_empty());
    }

    #[test]
    fn descendants_of_empty_tree_is_an_error() {
        let mut p = parser(&[], &[]);
        assert!(p.parse_addresses("docs::", true).is_err());
    }

    #[test]
    fn bad_patterns_are_rejected_up_front() {
        let bad_regex = CmdLineSpecParser::new(Path::new("/repo"), mapper(), &[], &["(".to_string()]);
        assert!(matches!(bad_regex, Err(SpecError::InvalidExcludePattern { .. })));

        let outside = CmdLineSpecParser::new(Path::new("/repo"), mapper(), &["/elsewhere".to_string()], &[]);
        assert!(matches!(outside, Err(SpecError::InvalidExcludePattern { .. })));
    }
}
