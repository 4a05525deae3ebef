//! File role classification
//!
//! A priority-ordered decision tree over the syntax record; the first rule
//! that matches wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::FileSyntax;

/// What a file is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Test,
    EntryPoint,
    Interface,
    Constant,
    Exception,
    Model,
    Cli,
    Service,
    Migration,
    Utility,
    Config,
    #[default]
    Unknown,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Test,
        Role::EntryPoint,
        Role::Interface,
        Role::Constant,
        Role::Exception,
        Role::Model,
        Role::Cli,
        Role::Service,
        Role::Migration,
        Role::Utility,
        Role::Config,
        Role::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Test => "TEST",
            Role::EntryPoint => "ENTRY_POINT",
            Role::Interface => "INTERFACE",
            Role::Constant => "CONSTANT",
            Role::Exception => "EXCEPTION",
            Role::Model => "MODEL",
            Role::Cli => "CLI",
            Role::Service => "SERVICE",
            Role::Migration => "MIGRATION",
            Role::Utility => "UTILITY",
            Role::Config => "CONFIG",
            Role::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

const ENTRY_POINT_DECORATORS: &[&str] = &["click.command", "click.group", "app.command", "main", "typer.command"];
const INTERFACE_BASES: &[&str] = &["ABC", "Protocol", "ABCMeta"];
const INTERFACE_DECORATORS: &[&str] = &["abstractmethod", "abstractproperty"];
const CLI_DECORATORS: &[&str] = &[
    "app.route", "router.route", "app.get", "app.post", "app.put", "app.delete", "app.patch", "route",
];
const SERVICE_BASES: &[&str] = &[
    "BaseHTTPRequestHandler", "HTTPServer", "View", "APIView", "Resource", "Handler", "Controller",
];
const MODEL_INDICATORS: &[&str] = &["dataclass", "BaseModel", "Model", "Schema", "NamedTuple", "TypedDict"];
const EXCEPTION_BASES: &[&str] = &["Exception", "BaseException", "Error", "Warning"];

fn test_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|/)(test_|tests?/|spec/)|_test\.|_spec\.|\.test\.|\.spec\.").expect("valid regex"))
}

fn migration_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"migrations?/|alembic/versions|\d{4}_\w+\.py$").expect("valid regex"))
}

fn upper_snake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid regex"))
}

fn simple_name(base: &str) -> &str {
    base.rsplit('.').next().unwrap_or(base)
}

fn normalized_path(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

fn is_test_path(path_lower: &str) -> bool {
    test_path_re().is_match(path_lower)
}

fn is_migration_path(path_lower: &str) -> bool {
    migration_path_re().is_match(path_lower)
}

fn is_main_file(path_lower: &str) -> bool {
    Path::new(path_lower)
        .file_stem()
        .is_some_and(|s| s == "main" || s == "__main__")
}

fn has_entry_decorators(syntax: &FileSyntax) -> bool {
    syntax
        .functions
        .iter()
        .flat_map(|f| f.decorators.iter())
        .any(|d| ENTRY_POINT_DECORATORS.contains(&d.as_str()) || d.to_lowercase().contains("main"))
}

fn is_interface(syntax: &FileSyntax) -> bool {
    let class_abstract = syntax.classes.iter().any(|c| {
        c.is_abstract || c.bases.iter().any(|b| INTERFACE_BASES.contains(&simple_name(b)))
    });
    class_abstract || syntax.decorators().any(|d| INTERFACE_DECORATORS.contains(&d))
}

fn is_constants(syntax: &FileSyntax) -> bool {
    let mut names = syntax
        .functions
        .iter()
        .map(|f| f.name.as_str())
        .chain(syntax.classes.iter().map(|c| c.name.as_str()))
        .peekable();
    names.peek().is_some() && names.all(|n| upper_snake_re().is_match(n))
}

fn majority<F: Fn(&crate::models::ClassDef) -> bool>(syntax: &FileSyntax, pred: F) -> bool {
    if syntax.classes.is_empty() {
        return false;
    }
    let hits = syntax.classes.iter().filter(|c| pred(c)).count();
    hits * 2 > syntax.classes.len()
}

fn is_exception_module(syntax: &FileSyntax) -> bool {
    majority(syntax, |c| {
        c.bases.iter().map(|b| simple_name(b)).any(|b| {
            EXCEPTION_BASES.contains(&b) || b.contains("Error") || b.contains("Exception")
        })
    })
}

fn is_model_module(syntax: &FileSyntax) -> bool {
    majority(syntax, |c| {
        c.bases.iter().any(|b| MODEL_INDICATORS.iter().any(|m| b.contains(m)))
            || (c.fields.len() > 3 && c.methods.len() <= c.fields.len())
    })
}

fn has_cli_decorators(syntax: &FileSyntax) -> bool {
    syntax
        .functions
        .iter()
        .flat_map(|f| f.decorators.iter())
        .any(|d| CLI_DECORATORS.iter().any(|c| d.contains(c)))
}

fn is_service(syntax: &FileSyntax) -> bool {
    let handler_class = syntax.classes.iter().any(|c| {
        c.bases.iter().map(|b| simple_name(b)).any(|b| {
            SERVICE_BASES.contains(&b) || b.contains("Handler") || b.contains("View")
        })
    });
    handler_class
        || syntax
            .functions
            .iter()
            .flat_map(|f| f.decorators.iter())
            .any(|d| ["get", "post", "put", "delete", "route"].iter().any(|h| d.contains(h)))
}

fn has_stateful_classes(syntax: &FileSyntax) -> bool {
    syntax
        .classes
        .iter()
        .any(|c| c.methods.iter().any(|m| !m.name.starts_with("__")))
}

fn is_config(syntax: &FileSyntax, path_lower: &str) -> bool {
    let stem = Path::new(path_lower)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem == "__init__"
        || (!syntax.imports.is_empty() && syntax.functions.is_empty() && syntax.classes.is_empty())
        || ["config", "settings", "conf"].iter().any(|p| stem.contains(p))
}

/// Classifies one file. First matching rule wins.
pub fn classify_role(syntax: &FileSyntax) -> Role {
    let path = normalized_path(&syntax.path);

    if is_test_path(&path) {
        Role::Test
    } else if syntax.has_main_guard || has_entry_decorators(syntax) || is_main_file(&path) {
        Role::EntryPoint
    } else if is_interface(syntax) {
        Role::Interface
    } else if is_constants(syntax) {
        Role::Constant
    } else if is_exception_module(syntax) {
        Role::Exception
    } else if is_model_module(syntax) {
        Role::Model
    } else if has_cli_decorators(syntax) {
        Role::Cli
    } else if is_service(syntax) {
        Role::Service
    } else if is_migration_path(&path) {
        Role::Migration
    } else if has_stateful_classes(syntax) {
        Role::Service
    } else if !syntax.functions.is_empty() && syntax.classes.is_empty() {
        Role::Utility
    } else if is_config(syntax, &path) {
        Role::Config
    } else {
        Role::Unknown
    }
}

/// Path-only classification for files the scanner could not parse.
pub fn classify_path(path: &str) -> Role {
    let path = normalized_path(path);
    if is_test_path(&path) {
        Role::Test
    } else if is_main_file(&path) {
        Role::EntryPoint
    } else if is_migration_path(&path) {
        Role::Migration
    } else {
        Role::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassDef, FunctionDef, ImportDecl};

    fn syntax(path: &str) -> FileSyntax {
        FileSyntax {
            path: path.to_string(),
            ..Default::default()
        }
    }

    fn func(name: &str, decorators: &[&str]) -> FunctionDef {
        FunctionDef {
            name: name.to_string(),
            decorators: decorators.iter().map(|d| d.to_string()).collect(),
            body_tokens: 20,
            ..Default::default()
        }
    }

    fn class(name: &str, bases: &[&str]) -> ClassDef {
        ClassDef {
            name: name.to_string(),
            bases: bases.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_test_paths_win() {
        let mut s = syntax("tests/test_api.py");
        s.has_main_guard = true;
        assert_eq!(classify_role(&s), Role::Test);
        assert_eq!(classify_path("src/user_test.go"), Role::Test);
        assert_eq!(classify_path("web/app.spec.ts"), Role::Test);
    }

    #[test]
    fn test_entry_points() {
        let mut s = syntax("tool.py");
        s.has_main_guard = true;
        assert_eq!(classify_role(&s), Role::EntryPoint);

        let mut s = syntax("commands.py");
        s.functions.push(func("run", &["click.command"]));
        assert_eq!(classify_role(&s), Role::EntryPoint);

        assert_eq!(classify_role(&syntax("cmd/main.go")), Role::EntryPoint);
    }

    #[test]
    fn test_interface_and_exceptions() {
        let mut s = syntax("base.py");
        s.classes.push(class("Repo", &["ABC"]));
        assert_eq!(classify_role(&s), Role::Interface);

        let mut s = syntax("errors.py");
        s.classes.push(class("NotFound", &["errors.AppError"]));
        s.classes.push(class("Invalid", &["ValueError"]));
        assert_eq!(classify_role(&s), Role::Exception);
    }

    #[test]
    fn test_constants_models_utilities() {
        let mut s = syntax("limits.py");
        s.functions.push(func("MAX_SIZE", &[]));
        assert_eq!(classify_role(&s), Role::Constant);

        let mut s = syntax("schema.py");
        s.classes.push(class("User", &["pydantic.BaseModel"]));
        assert_eq!(classify_role(&s), Role::Model);

        let mut s = syntax("text.py");
        s.functions.push(func("slugify", &[]));
        assert_eq!(classify_role(&s), Role::Utility);
    }

    #[test]
    fn test_migration_and_config() {
        assert_eq!(classify_role(&syntax("app/migrations/0001_initial.py")), Role::Migration);

        let mut s = syntax("pkg/__init__.py");
        s.imports.push(ImportDecl {
            source: ".models".into(),
            ..Default::default()
        });
        assert_eq!(classify_role(&s), Role::Config);
        assert_eq!(classify_role(&syntax("data.py")), Role::Unknown);
    }

    #[test]
    fn test_role_string_round_trip() {
        assert_eq!("entry_point".parse::<Role>().unwrap(), Role::EntryPoint);
        assert_eq!(serde_json::to_string(&Role::EntryPoint).unwrap(), "\"ENTRY_POINT\"");
        assert!("widget".parse::<Role>().is_err());
    }
}
