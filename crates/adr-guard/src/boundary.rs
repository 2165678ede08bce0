// boundary.rs — Architectural layer matching and import resolution.
//
// A layer is a path glob relative to the repository root. A file belongs to
// a layer when its path matches the glob. An import belongs to a layer when
// one of its resolved candidate paths does.
//
// Relative imports resolve to exactly one path. Absolute module paths are
// tried as written and anchored at each ancestor directory of the importing
// file, so `components.button` imported from `src/utils/x.py` also yields
// `src/components/button`.

use adr_core::{BoundaryPolicy, Layer};
use glob::{MatchOptions, Pattern};

use crate::imports::{ImportRef, Language};

/// A forbidden dependency found on one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryHit {
    pub rule: String,
    pub from_layer: String,
    pub to_layer: String,
    /// The resolved path that landed in `to_layer`.
    pub target: String,
}

/// Glob match with `/` treated literally. Invalid patterns never match.
fn glob_match(pattern: &str, target: &str) -> bool {
    let opts = MatchOptions {
        require_literal_separator: true,
        ..Default::default()
    };
    match Pattern::new(pattern) {
        Ok(p) => p.matches_with(target, opts),
        Err(_) => false,
    }
}

/// Whether `path` lies in the layer.
///
/// A pattern without glob characters is a directory prefix. A pattern
/// ending in `/**` also contains its base directory itself.
pub fn layer_contains(layer: &Layer, path: &str) -> bool {
    let pattern = layer.path.trim().trim_start_matches("./").trim_end_matches('/');
    let path = path.trim_start_matches("./");
    if pattern.is_empty() {
        return false;
    }
    if !pattern.contains(['*', '?', '[']) {
        return path == pattern || path.starts_with(&format!("{pattern}/"));
    }
    if glob_match(pattern, path) {
        return true;
    }
    if let Some(base) = pattern.strip_suffix("/**") {
        if path == base {
            return true;
        }
    }
    // `src/*/components` also covers the files below it.
    !pattern.ends_with("**") && glob_match(&format!("{pattern}/**"), path)
}

/// Candidate repository paths an import may refer to.
pub fn resolve_candidates(file: &str, import: &ImportRef) -> Vec<String> {
    let dir: Vec<&str> = parent_segments(file);
    let mut out: Vec<String> = Vec::new();

    if import.is_relative() {
        if let Some(path) = resolve_relative(file, &dir, import) {
            out.push(path);
        }
        return out;
    }

    let module = absolute_path(import);
    if module.is_empty() {
        return out;
    }
    out.push(module.clone());
    for depth in (1..=dir.len()).rev() {
        let candidate = format!("{}/{}", dir[..depth].join("/"), module);
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// Every rule of `policy` that `import` in `file` breaks.
pub fn check_import(policy: &BoundaryPolicy, file: &str, import: &ImportRef) -> Vec<BoundaryHit> {
    let mut hits = Vec::new();
    let mut candidates: Option<Vec<String>> = None;

    for rule in &policy.rules {
        let Some((from_name, to_name)) = rule.direction() else {
            continue;
        };
        let (Some(from), Some(to)) = (policy.layer(&from_name), policy.layer(&to_name)) else {
            continue;
        };
        if !layer_contains(from, file) {
            continue;
        }
        let candidates = candidates.get_or_insert_with(|| resolve_candidates(file, import));
        if let Some(target) = candidates.iter().find(|c| layer_contains(to, c)) {
            hits.push(BoundaryHit {
                rule: rule.forbid.clone(),
                from_layer: from.name.clone(),
                to_layer: to.name.clone(),
                target: target.clone(),
            });
        }
    }
    hits
}

fn parent_segments(file: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = file
        .trim_start_matches("./")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    segments.pop();
    segments
}

fn resolve_relative(file: &str, dir: &[&str], import: &ImportRef) -> Option<String> {
    let module = import.module.as_str();
    let mut base: Vec<String> = dir.iter().map(|s| s.to_string()).collect();

    let rest: Vec<&str> = match import.language {
        Language::Python => {
            let dots = module.chars().take_while(|&c| c == '.').count();
            // One dot is the current package; each further dot climbs one level.
            for _ in 1..dots {
                base.pop()?;
            }
            module[dots..].split('.').filter(|s| !s.is_empty()).collect()
        }
        Language::Rust => {
            // The importing file is itself a module unless it is a mod/lib/main root.
            let stem = file
                .rsplit('/')
                .next()
                .and_then(|name| name.strip_suffix(".rs"))
                .unwrap_or_default();
            if !matches!(stem, "mod" | "lib" | "main" | "") {
                base.push(stem.to_string());
            }
            let mut segments: Vec<&str> = Vec::new();
            for segment in module.split("::") {
                match segment {
                    "self" if segments.is_empty() => {}
                    "super" if segments.is_empty() => {
                        base.pop()?;
                    }
                    other => segments.push(other),
                }
            }
            segments
        }
        _ => module.split('/').collect(),
    };

    for segment in rest {
        match segment {
            "" | "." => {}
            ".." => {
                base.pop()?;
            }
            other => base.push(other.to_string()),
        }
    }
    Some(base.join("/"))
}

/// An absolute module written as a `/`-separated path.
fn absolute_path(import: &ImportRef) -> String {
    let module = import.module.as_str();
    match import.language {
        Language::Python | Language::Java => module.replace('.', "/"),
        Language::Rust => {
            let module = module.strip_prefix("crate::").unwrap_or(module);
            module.replace("::", "/")
        }
        Language::JavaScript | Language::TypeScript => {
            let module = module
                .strip_prefix("@/")
                .or_else(|| module.strip_prefix("~/"))
                .unwrap_or(module);
            module.trim_start_matches('/').to_string()
        }
        Language::Go => module.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::extract_imports;
    use adr_core::BoundaryRule;

    fn layer(name: &str, path: &str) -> Layer {
        Layer {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    fn import(language: Language, text: &str) -> ImportRef {
        extract_imports(language, text, 1).remove(0)
    }

    #[test]
    fn glob_layers() {
        let components = layer("components", "src/components/**");
        assert!(layer_contains(&components, "src/components/Button.tsx"));
        assert!(layer_contains(&components, "src/components/forms/Input.tsx"));
        assert!(layer_contains(&components, "src/components"));
        assert!(!layer_contains(&components, "src/utils/format.ts"));

        let single = layer("api", "src/*.py");
        assert!(layer_contains(&single, "src/app.py"));
        assert!(!layer_contains(&single, "src/api/app.py"));
    }

    #[test]
    fn plain_directory_layers_are_prefixes() {
        let utils = layer("utils", "src/utils/");
        assert!(layer_contains(&utils, "src/utils/format.ts"));
        assert!(!layer_contains(&utils, "src/utilsx/a.ts"));
    }

    #[test]
    fn invalid_glob_never_matches() {
        assert!(!layer_contains(&layer("bad", "src/[*"), "src/[a"));
    }

    #[test]
    fn resolves_js_relative_imports() {
        let i = import(Language::TypeScript, "import { Button } from '../components/Button';");
        assert_eq!(
            resolve_candidates("src/utils/format.ts", &i),
            vec!["src/components/Button"]
        );
        let escape = import(Language::TypeScript, "import x from '../../../x';");
        assert!(resolve_candidates("src/a.ts", &escape).is_empty());
    }

    #[test]
    fn resolves_python_relative_and_absolute() {
        let rel = import(Language::Python, "from ..components.button import Button");
        assert_eq!(
            resolve_candidates("src/utils/fmt.py", &rel),
            vec!["src/components/button"]
        );
        let abs = import(Language::Python, "from components.button import Button");
        assert_eq!(
            resolve_candidates("src/utils/fmt.py", &abs),
            vec![
                "components/button",
                "src/utils/components/button",
                "src/components/button"
            ]
        );
    }

    #[test]
    fn resolves_rust_paths() {
        let sup = import(Language::Rust, "use super::components::Button;");
        assert_eq!(
            resolve_candidates("src/utils/format.rs", &sup),
            vec!["src/utils/components/Button"]
        );
        let krate = import(Language::Rust, "use crate::components::Button;");
        assert!(resolve_candidates("src/utils/format.rs", &krate)
            .contains(&"src/components/Button".to_string()));
    }

    #[test]
    fn rule_check_finds_forbidden_direction() {
        let policy = BoundaryPolicy {
            layers: vec![
                layer("utils", "src/utils/**"),
                layer("components", "src/components/**"),
            ],
            rules: vec![BoundaryRule::new("utils", "components")],
        };
        let i = import(Language::TypeScript, "import { Button } from '../components/Button';");
        let hits = check_import(&policy, "src/utils/format.ts", &i);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].from_layer, "utils");
        assert_eq!(hits[0].to_layer, "components");

        // The reverse direction is allowed.
        let back = import(Language::TypeScript, "import { fmt } from '../utils/format';");
        assert!(check_import(&policy, "src/components/Button.tsx", &back).is_empty());
    }

    #[test]
    fn rules_with_unknown_layers_are_ignored() {
        let policy = BoundaryPolicy {
            layers: vec![layer("utils", "src/utils/**")],
            rules: vec![BoundaryRule::new("utils", "nowhere")],
        };
        let i = import(Language::TypeScript, "import x from '../components/x';");
        assert!(check_import(&policy, "src/utils/a.ts", &i).is_empty());
    }
}
