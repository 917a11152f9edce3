//! Path based classification of watched files. First matching rule wins.

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Project,
    /// Widget definition; `name` is taken from the path, not the file.
    Pagelet { name: String },
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Project,
    Pagelet,
    Template,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    kind: RuleKind,
}

impl Rule {
    fn new(pattern: &str, kind: RuleKind) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid asset pattern"),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Rules for an application project directory.
    pub fn project() -> Self {
        Self {
            rules: vec![
                Rule::new(r"(?:^|/)project\.json$", RuleKind::Project),
                Rule::new(r"(?:^|/)pagelet/(.+)\.json$", RuleKind::Pagelet),
                Rule::new(r"(?:^|/)template/.+\.html$", RuleKind::Template),
            ],
        }
    }

    /// Rules for the standard assets directory: every html file plus the
    /// bundled script and stylesheets, all stored verbatim.
    pub fn standard_assets() -> Self {
        Self {
            rules: vec![
                Rule::new(r"^lynkui/main(?:-v2)?\.css$", RuleKind::Template),
                Rule::new(r"^lynkui/main\.js$", RuleKind::Template),
                Rule::new(r"\.html$", RuleKind::Template),
            ],
        }
    }

    /// Classify a root-relative path using `/` separators.
    pub fn classify(&self, rel: &str) -> Option<AssetKind> {
        self.rules.iter().find_map(|rule| {
            let caps = rule.pattern.captures(rel)?;
            Some(match rule.kind {
                RuleKind::Project => AssetKind::Project,
                RuleKind::Pagelet => AssetKind::Pagelet {
                    name: caps.get(1)?.as_str().to_string(),
                },
                RuleKind::Template => AssetKind::Template,
            })
        })
    }

    pub fn matches(&self, rel: &str) -> bool {
        self.classify(rel).is_some()
    }
}
