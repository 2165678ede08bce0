// imports.rs — Language detection and import extraction from source lines.
//
// Extraction works on single lines, which is all a diff offers. Multi-line
// constructs are covered where a line still carries the module name: a Go
// import block entry is a lone quoted path, and a JS `from '...'` clause
// closing a multi-line import still matches.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Java,
}

impl Language {
    /// Detect from a file path's extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "py" | "pyi" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
        }
    }

    /// Keys under which `language_rules` may hold rules for this language.
    /// TypeScript also honours JavaScript rules.
    pub fn rule_keys(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["python", "py"],
            Language::JavaScript => &["javascript", "js"],
            Language::TypeScript => &["typescript", "ts", "javascript", "js"],
            Language::Rust => &["rust", "rs"],
            Language::Go => &["go", "golang"],
            Language::Java => &["java"],
        }
    }

    /// Separator between module path segments as written in source.
    fn separator(self) -> &'static str {
        match self {
            Language::Python | Language::Java => ".",
            Language::Rust => "::",
            Language::JavaScript | Language::TypeScript | Language::Go => "/",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One import found on a line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRef {
    /// Module specifier as written (`flask.app`, `../components/Button`).
    pub module: String,
    /// Top-level package (`flask`, `@tanstack/react-query`); empty for
    /// relative imports.
    pub package: String,
    pub line: usize,
    pub language: Language,
}

impl ImportRef {
    pub fn is_relative(&self) -> bool {
        is_relative(self.language, &self.module)
    }

    /// Whether this import names `symbol`: the package itself, the module
    /// itself, or a submodule of it. Case-insensitive; `-` and `_` are
    /// equivalent for Rust crate names.
    pub fn matches(&self, symbol: &str) -> bool {
        let norm = |s: &str| {
            let lower = s.trim().to_ascii_lowercase();
            if self.language == Language::Rust {
                lower.replace('-', "_")
            } else {
                lower
            }
        };
        let symbol = norm(symbol);
        if symbol.is_empty() {
            return false;
        }
        let module = norm(&self.module);
        let package = norm(&self.package);
        if package == symbol || module == symbol {
            return true;
        }
        let sep = self.language.separator();
        if module.starts_with(&format!("{symbol}{sep}")) {
            return true;
        }
        // Go policies usually name the last path segment.
        self.language == Language::Go && module.rsplit('/').next() == Some(symbol.as_str())
    }
}

static PY_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").expect("static regex"));
static PY_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+(\.*[A-Za-z0-9_.]*)\s+import\b").expect("static regex")
});
static JS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bfrom\s+|^\s*import\s+|\brequire\s*\(\s*|\bimport\s*\(\s*)['"]([^'"]+)['"]"#)
        .expect("static regex")
});
static RUST_USE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?:::)?([A-Za-z0-9_]+(?:::[A-Za-z0-9_]+)*)")
        .expect("static regex")
});
static RUST_EXTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*extern\s+crate\s+([A-Za-z0-9_]+)").expect("static regex")
});
static GO_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import\s*\(?\s*)?(?:[A-Za-z0-9_.]+\s+)?"([^"]+)"\s*\)?\s*(?://.*)?$"#)
        .expect("static regex")
});
static JAVA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+(?:static\s+)?([A-Za-z0-9_.]+?)(?:\.\*)?\s*;").expect("static regex")
});

/// Extract the imports on one source line.
pub fn extract_imports(language: Language, text: &str, line: usize) -> Vec<ImportRef> {
    let modules: Vec<String> = match language {
        Language::Python => python_modules(text),
        Language::JavaScript | Language::TypeScript => JS_RE
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect(),
        Language::Rust => RUST_USE_RE
            .captures(text)
            .or_else(|| RUST_EXTERN_RE.captures(text))
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
            .into_iter()
            .collect(),
        Language::Go => GO_IMPORT_RE
            .captures(text)
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
            .into_iter()
            .collect(),
        Language::Java => JAVA_RE
            .captures(text)
            .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
            .into_iter()
            .collect(),
    };

    modules
        .into_iter()
        .filter(|m| !m.is_empty())
        .map(|module| ImportRef {
            package: package_of(language, &module),
            module,
            line,
            language,
        })
        .collect()
}

fn python_modules(text: &str) -> Vec<String> {
    // Strip a trailing comment.
    let code = text.split('#').next().unwrap_or(text);
    if let Some(caps) = PY_FROM_RE.captures(code) {
        return caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .into_iter()
            .collect();
    }
    let Some(caps) = PY_IMPORT_RE.captures(code) else {
        return Vec::new();
    };
    let Some(list) = caps.get(1) else {
        return Vec::new();
    };
    list.as_str()
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(|m| m.trim_matches(|c| c == '(' || c == ')').to_string())
        .filter(|m| m.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .collect()
}

/// Top-level package of a module specifier; empty for relative imports.
pub fn package_of(language: Language, module: &str) -> String {
    if is_relative(language, module) {
        return String::new();
    }
    match language {
        Language::Python => module.split('.').next().unwrap_or(module).to_string(),
        Language::Rust => module.split("::").next().unwrap_or(module).to_string(),
        Language::JavaScript | Language::TypeScript => {
            let module = module.strip_prefix("node:").unwrap_or(module);
            let mut parts = module.split('/');
            match (parts.next(), parts.next()) {
                (Some(scope), Some(name)) if scope.starts_with('@') && scope.len() > 1 => {
                    format!("{scope}/{name}")
                }
                (Some(first), _) => first.to_string(),
                _ => module.to_string(),
            }
        }
        Language::Go | Language::Java => module.to_string(),
    }
}

fn is_relative(language: Language, module: &str) -> bool {
    match language {
        Language::Python => module.starts_with('.'),
        Language::JavaScript | Language::TypeScript => {
            module.starts_with("./") || module.starts_with("../") || module == "." || module == ".."
        }
        Language::Rust => {
            module == "self" || module == "super" || module.starts_with("self::") || module.starts_with("super::")
        }
        Language::Go | Language::Java => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules(language: Language, text: &str) -> Vec<String> {
        extract_imports(language, text, 1)
            .into_iter()
            .map(|i| i.module)
            .collect()
    }

    #[test]
    fn detects_languages() {
        assert_eq!(Language::from_path("app/main.py"), Some(Language::Python));
        assert_eq!(Language::from_path("src/App.TSX"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("lib.rs"), Some(Language::Rust));
        assert_eq!(Language::from_path("README.md"), None);
        assert_eq!(Language::from_path("Makefile"), None);
    }

    #[test]
    fn python_forms() {
        assert_eq!(modules(Language::Python, "import flask"), vec!["flask"]);
        assert_eq!(
            modules(Language::Python, "import os, flask.app as fa"),
            vec!["os", "flask.app"]
        );
        assert_eq!(modules(Language::Python, "from flask import Flask"), vec!["flask"]);
        assert_eq!(modules(Language::Python, "    from ..utils import x"), vec!["..utils"]);
        assert!(modules(Language::Python, "# import flask").is_empty());
        assert!(modules(Language::Python, "x = 'import flask'").is_empty());
    }

    #[test]
    fn javascript_forms() {
        assert_eq!(
            modules(Language::TypeScript, "import { useQuery } from 'react-query';"),
            vec!["react-query"]
        );
        assert_eq!(modules(Language::JavaScript, "import './styles.css'"), vec!["./styles.css"]);
        assert_eq!(
            modules(Language::JavaScript, "const axios = require(\"axios\")"),
            vec!["axios"]
        );
        assert_eq!(
            modules(Language::TypeScript, "} from \"@tanstack/react-query/devtools\";"),
            vec!["@tanstack/react-query/devtools"]
        );
        assert_eq!(
            modules(Language::TypeScript, "export { x } from '../components/Button'"),
            vec!["../components/Button"]
        );
    }

    #[test]
    fn rust_go_java_forms() {
        assert_eq!(modules(Language::Rust, "use serde_json::Value;"), vec!["serde_json::Value"]);
        assert_eq!(modules(Language::Rust, "pub(crate) use crate::ui::Button;"), vec!["crate::ui::Button"]);
        assert_eq!(modules(Language::Rust, "extern crate libc;"), vec!["libc"]);
        assert_eq!(modules(Language::Go, "import \"github.com/pkg/errors\""), vec!["github.com/pkg/errors"]);
        assert_eq!(modules(Language::Go, "\tlog \"github.com/sirupsen/logrus\""), vec!["github.com/sirupsen/logrus"]);
        assert!(modules(Language::Go, "\tfmt.Println(\"hi\")").is_empty());
        assert_eq!(
            modules(Language::Java, "import org.springframework.web.bind.annotation.*;"),
            vec!["org.springframework.web.bind.annotation"]
        );
    }

    #[test]
    fn packages() {
        assert_eq!(package_of(Language::Python, "flask.app"), "flask");
        assert_eq!(package_of(Language::Python, ".utils"), "");
        assert_eq!(package_of(Language::TypeScript, "@tanstack/react-query/devtools"), "@tanstack/react-query");
        assert_eq!(package_of(Language::JavaScript, "lodash/fp"), "lodash");
        assert_eq!(package_of(Language::JavaScript, "node:fs"), "fs");
        assert_eq!(package_of(Language::Rust, "serde_json::Value"), "serde_json");
    }

    #[test]
    fn matching_is_case_insensitive_and_prefix_aware() {
        let flask = &extract_imports(Language::Python, "from Flask.app import X", 3)[0];
        assert!(flask.matches("flask"));
        assert!(flask.matches("flask.app"));
        assert!(!flask.matches("flask_login"));

        let serde = &extract_imports(Language::Rust, "use serde_json::Value;", 1)[0];
        assert!(serde.matches("serde-json"));
        assert!(!serde.matches("serde"));

        let go = &extract_imports(Language::Go, "import \"github.com/pkg/errors\"", 1)[0];
        assert!(go.matches("errors"));
        assert!(go.matches("github.com/pkg"));
    }
}
