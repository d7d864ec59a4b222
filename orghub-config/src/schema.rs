//! Declarative validation of environment variables and config sections.
//!
//! One JSON Schema (draft 7) per [`Section`], embedded at compile time and
//! compiled once. Validation never stops at the first failure: every
//! violation in the section is collected into a [`ValidationReport`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::env::{coerce, coerce_env, is_secret, spec_for, EnvKind, ENV_VARS};
use crate::error::ConfigError;

/// A named schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Env,
    Server,
    Github,
    Cache,
    Logging,
    Organization,
    ProjectTemplate,
    /// The whole merged tree.
    Config,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Env,
        Section::Server,
        Section::Github,
        Section::Cache,
        Section::Logging,
        Section::Organization,
        Section::ProjectTemplate,
        Section::Config,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Env => "env",
            Section::Server => "server",
            Section::Github => "github",
            Section::Cache => "cache",
            Section::Logging => "logging",
            Section::Organization => "organization",
            Section::ProjectTemplate => "projectTemplate",
            Section::Config => "config",
        }
    }

    /// Top-level tree key this schema applies to, for single-subtree sections.
    pub fn tree_key(self) -> Option<&'static str> {
        match self {
            Section::Env
            | Section::Server
            | Section::Github
            | Section::Cache
            | Section::Logging => Some(self.as_str()),
            Section::Organization | Section::ProjectTemplate | Section::Config => None,
        }
    }

    fn schema_source(self) -> &'static str {
        match self {
            Section::Env => include_str!("schemas/env.schema.json"),
            Section::Server => include_str!("schemas/server.schema.json"),
            Section::Github => include_str!("schemas/github.schema.json"),
            Section::Cache => include_str!("schemas/cache.schema.json"),
            Section::Logging => include_str!("schemas/logging.schema.json"),
            Section::Organization => include_str!("schemas/organization.schema.json"),
            Section::ProjectTemplate => include_str!("schemas/projectTemplate.schema.json"),
            Section::Config => include_str!("schemas/config.schema.json"),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownSection(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dotted path from the tree root, e.g. `cache.ttl`.
    pub path: String,
    pub message: String,
}

/// Every violation found in one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub section: String,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.violations.len();
        write!(
            f,
            "configuration section '{}' failed validation ({n} violation{})",
            self.section,
            if n == 1 { "" } else { "s" }
        )?;
        for v in &self.violations {
            write!(f, "\n  - {}: {}", v.path, v.message)?;
        }
        Ok(())
    }
}

/// `{ error, value }`: `value` is the normalized input and is returned even
/// when `error` is set.
#[derive(Debug, Clone)]
pub struct Validation {
    pub error: Option<ValidationReport>,
    pub value: Value,
}

impl Validation {
    fn from_violations(section: &str, violations: Vec<Violation>, value: Value) -> Self {
        let error = (!violations.is_empty()).then(|| ValidationReport {
            section: section.to_string(),
            violations,
        });
        Self { error, value }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, ConfigError> {
        match self.error {
            Some(report) => Err(ConfigError::Validation(report)),
            None => Ok(self.value),
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Compiled schemas for every [`Section`].
pub struct SchemaValidator {
    schemas: BTreeMap<Section, JSONSchema>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("sections", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaValidator {
    pub fn new() -> Result<Self, ConfigError> {
        let mut schemas = BTreeMap::new();
        for section in Section::ALL {
            let schema_err = |message: String| ConfigError::Schema {
                section: section.as_str().to_string(),
                message,
            };
            let raw: Value = serde_json::from_str(section.schema_source())
                .map_err(|e| schema_err(e.to_string()))?;
            let compiled = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&raw)
                .map_err(|e| schema_err(e.to_string()))?;
            schemas.insert(section, compiled);
        }
        Ok(Self { schemas })
    }

    /// Validate `config` against `section` (the whole tree when `None`).
    ///
    /// Data problems come back in [`Validation::error`]. Only an unrecognized
    /// section name is an `Err`.
    pub fn validate(
        &self,
        config: &Value,
        section: Option<&str>,
    ) -> Result<Validation, ConfigError> {
        let section = match section {
            Some(name) => name.parse::<Section>()?,
            None => Section::Config,
        };
        Ok(self.validate_section(section, config))
    }

    pub fn validate_section(&self, section: Section, value: &Value) -> Validation {
        match section {
            Section::Env => {
                let normalized = normalize_env(value);
                let violations = self.check(Section::Env, &normalized, "env");
                Validation::from_violations("env", violations, normalized)
            }
            Section::Config => self.validate_config(value),
            other => {
                let violations = self.check(other, value, other.as_str());
                Validation::from_violations(other.as_str(), violations, value.clone())
            }
        }
    }

    /// Raw environment variables: coerce, apply defaults, validate.
    /// Unrecognized keys are kept as strings.
    pub fn validate_env(&self, vars: &BTreeMap<String, String>) -> Validation {
        let value = Value::Object(coerce_env(vars, true));
        let violations = self.check(Section::Env, &value, "env");
        Validation::from_violations("env", violations, value)
    }

    fn validate_config(&self, tree: &Value) -> Validation {
        let mut violations = self.check(Section::Config, tree, "");

        for section in Section::ALL {
            if let Some(key) = section.tree_key() {
                if let Some(value) = tree.get(key) {
                    violations.extend(self.check(section, value, key));
                }
            }
        }
        if let Some(Value::Object(orgs)) = tree.get("organizations") {
            for (id, profile) in orgs {
                // `default` is a partial override, not a full profile.
                if id == "default" {
                    continue;
                }
                let prefix = format!("organizations.{id}");
                violations.extend(self.check(Section::Organization, profile, &prefix));
            }
        }
        if let Some(Value::Object(templates)) = tree.get("projectTemplates") {
            for (id, template) in templates {
                let prefix = format!("projectTemplates.{id}");
                violations.extend(self.check(Section::ProjectTemplate, template, &prefix));
            }
        }
        let required = tree
            .pointer("/validation/requiredSections")
            .and_then(Value::as_array);
        if let Some(required) = required {
            for name in required.iter().filter_map(Value::as_str) {
                if tree.get(name).is_none() {
                    violations.push(Violation {
                        path: name.to_string(),
                        message: format!("required section '{name}' is missing"),
                    });
                }
            }
        }

        Validation::from_violations("config", violations, tree.clone())
    }

    fn check(&self, section: Section, instance: &Value, prefix: &str) -> Vec<Violation> {
        let Some(schema) = self.schemas.get(&section) else {
            return Vec::new();
        };
        match schema.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|e| violation(prefix, &e)).collect(),
        }
    }
}

fn violation(prefix: &str, error: &ValidationError<'_>) -> Violation {
    let pointer = error.instance_path.to_string();
    let mut segments: Vec<String> = pointer
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect();
    if let ValidationErrorKind::Required { property } = &error.kind {
        if let Some(name) = property.as_str() {
            segments.push(name.to_string());
        }
    }

    let mut message = error.to_string();
    if let (Some(last), Value::String(_)) = (segments.last(), error.instance.as_ref()) {
        if is_secret(last) {
            message = message.replace(&error.instance.to_string(), "\"[redacted]\"");
        }
    }

    let path = std::iter::once(prefix.to_string())
        .chain(segments)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    let path = if path.is_empty() {
        "(root)".to_string()
    } else {
        path
    };
    Violation { path, message }
}

/// String values of recognized non-string variables are coerced and missing
/// defaults filled in. Non-object input is returned unchanged.
fn normalize_env(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut out: Map<String, Value> = map
        .iter()
        .map(|(key, v)| {
            let coerced = match (spec_for(key), v) {
                (Some(spec), Value::String(raw)) if spec.kind != EnvKind::String => {
                    coerce(spec.kind, raw)
                }
                _ => v.clone(),
            };
            (key.clone(), coerced)
        })
        .collect();
    for spec in ENV_VARS {
        if let (false, Some(default)) = (out.contains_key(spec.name), spec.default) {
            out.insert(spec.name.to_string(), coerce(spec.kind, default));
        }
    }
    Value::Object(out)
}
