use serde::{Deserialize, Serialize};

/// Path convention a mapping rule's source side was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathFormat {
    #[serde(alias = "posix")]
    Posix,
    #[serde(alias = "windows")]
    Windows,
}

impl PathFormat {
    fn case_insensitive(self) -> bool {
        matches!(self, PathFormat::Windows)
    }
}

/// A single source-prefix to destination-prefix translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathMappingRule {
    pub source_path_format: PathFormat,
    pub source_path: String,
    pub destination_path: String,
}

impl PathMappingRule {
    /// True when this rule's source prefix covers `path`.
    ///
    /// Windows-format sources compare case-insensitively and accept either
    /// slash direction; the absolute/relative kind of both paths must agree.
    pub fn applies_to(&self, path: &str) -> bool {
        is_absolute(path) == is_absolute(&self.source_path)
            && is_component_prefix(
                &self.source_path,
                path,
                self.source_path_format.case_insensitive(),
            )
    }

    /// True when `path` is already under this rule's destination prefix,
    /// meaning a second application would map the path onto itself.
    pub fn already_mapped(&self, path: &str) -> bool {
        is_absolute(path) == is_absolute(&self.destination_path)
            && is_component_prefix(&self.destination_path, path, false)
    }

    /// Rewrite the source prefix of `path` to the destination prefix. The
    /// result always uses forward slashes; Nuke Write nodes reject
    /// backslashes in filenames.
    fn rewrite(&self, path: &str) -> String {
        let source_len = components(&self.source_path).count();
        let remainder: Vec<&str> = components(path).skip(source_len).collect();
        let mut mapped = normalize_separators(&self.destination_path);
        while mapped.len() > 1 && mapped.ends_with('/') {
            mapped.pop();
        }
        for part in remainder {
            if !mapped.ends_with('/') {
                mapped.push('/');
            }
            mapped.push_str(part);
        }
        mapped
    }
}

/// Ordered rule set; the first rule whose source prefix matches wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMappingRules {
    pub rules: Vec<PathMappingRule>,
}

impl PathMappingRules {
    pub fn new(rules: Vec<PathMappingRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule that applies to `path`, if any.
    pub fn which_rule_applies(&self, path: &str) -> Option<&PathMappingRule> {
        self.rules.iter().find(|rule| rule.applies_to(path))
    }

    /// Translate `path` between the submission and render environments.
    ///
    /// Unmatched paths pass through with separators normalized. A matched
    /// path that already sits under the rule's destination is returned
    /// unchanged, which stops `<a>/<b>` from mapping onto `<a>/<a>/<b>` when
    /// a filename filter runs more than once.
    pub fn map_path(&self, path: &str) -> String {
        match self.which_rule_applies(path) {
            Some(rule) if rule.already_mapped(path) => normalize_separators(path),
            Some(rule) => rule.rewrite(path),
            None => normalize_separators(path),
        }
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|part| !part.is_empty())
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    // Windows drive prefix, e.g. "C:\" or "C:/".
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn is_component_prefix(prefix: &str, path: &str, case_insensitive: bool) -> bool {
    let mut path_parts = components(path);
    for prefix_part in components(prefix) {
        let Some(path_part) = path_parts.next() else {
            return false;
        };
        let matches = if case_insensitive {
            prefix_part.eq_ignore_ascii_case(path_part)
        } else {
            prefix_part == path_part
        };
        if !matches {
            return false;
        }
    }
    true
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PathMappingRules {
        PathMappingRules::new(vec![
            PathMappingRule {
                source_path_format: PathFormat::Windows,
                source_path: r"Z:\projects".to_string(),
                destination_path: "/mnt/projects".to_string(),
            },
            PathMappingRule {
                source_path_format: PathFormat::Posix,
                source_path: "/shared/assets".to_string(),
                destination_path: "/mnt/assets".to_string(),
            },
        ])
    }

    #[test]
    fn deserializes_documented_rule_document() {
        let doc = "\
- source_path_format: POSIX
  source_path: /local/home/workstation
  destination_path: /mnt/render
";
        let rules: PathMappingRules = serde_yaml::from_str(doc).unwrap();
        assert_eq!(rules.rules.len(), 1);
        assert_eq!(rules.rules[0].source_path_format, PathFormat::Posix);
        assert_eq!(
            rules.map_path("/local/home/workstation/comp.nk"),
            "/mnt/render/comp.nk"
        );
    }

    #[test]
    fn windows_sources_match_case_insensitively_with_either_slash() {
        let rules = rules();
        assert_eq!(
            rules.map_path(r"z:\Projects\shot01\comp.nk"),
            "/mnt/projects/shot01/comp.nk"
        );
        assert_eq!(
            rules.map_path("Z:/projects/shot01/comp.nk"),
            "/mnt/projects/shot01/comp.nk"
        );
    }

    #[test]
    fn posix_sources_match_case_sensitively() {
        let rules = rules();
        assert_eq!(
            rules.map_path("/shared/Assets/tex.png"),
            "/shared/Assets/tex.png"
        );
        assert_eq!(rules.map_path("/shared/assets/tex.png"), "/mnt/assets/tex.png");
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = PathMappingRules::new(vec![
            PathMappingRule {
                source_path_format: PathFormat::Posix,
                source_path: "/a".to_string(),
                destination_path: "/first".to_string(),
            },
            PathMappingRule {
                source_path_format: PathFormat::Posix,
                source_path: "/a/b".to_string(),
                destination_path: "/second".to_string(),
            },
        ]);
        assert_eq!(rules.map_path("/a/b/c.exr"), "/first/b/c.exr");
    }

    #[test]
    fn already_mapped_paths_pass_through() {
        let rules = PathMappingRules::new(vec![PathMappingRule {
            source_path_format: PathFormat::Posix,
            source_path: "/mnt".to_string(),
            destination_path: "/mnt/projects".to_string(),
        }]);
        // The rule matches "/mnt/projects/comp.nk" but the path is already
        // under the destination; mapping again would nest the prefix.
        assert_eq!(rules.map_path("/mnt/projects/comp.nk"), "/mnt/projects/comp.nk");
    }

    #[test]
    fn partial_component_overlap_does_not_match() {
        let rules = PathMappingRules::new(vec![PathMappingRule {
            source_path_format: PathFormat::Posix,
            source_path: "/shared/asset".to_string(),
            destination_path: "/mnt/asset".to_string(),
        }]);
        assert_eq!(rules.map_path("/shared/assets/tex.png"), "/shared/assets/tex.png");
    }

    #[test]
    fn relative_paths_do_not_match_absolute_sources() {
        let rules = rules();
        assert_eq!(rules.map_path("shared/assets/tex.png"), "shared/assets/tex.png");
    }

    #[test]
    fn unmatched_backslash_paths_are_normalized() {
        let rules = rules();
        assert_eq!(rules.map_path(r"renders\out.exr"), "renders/out.exr");
    }
}
