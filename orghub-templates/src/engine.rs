//! Tera rendering engine for the generated project document.
//!
//! The embedded `project.md.tera` is always registered. A user template
//! directory may add templates or override the embedded one by name
//! (names are relative paths, lowercased, `/`-separated).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::DocumentContext;
use crate::error::TemplateError;

/// Name under which the project document template is registered.
pub const PROJECT_DOCUMENT: &str = "project.md.tera";

const TPLS: &[(&str, &str)] = &[(PROJECT_DOCUMENT, include_str!("templates/project.md.tera"))];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), TemplateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, TemplateError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, TemplateError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// DocumentRenderer
// ---------------------------------------------------------------------------

/// Renders the README-like project document. Create once and reuse.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    tera: Tera,
}

impl DocumentRenderer {
    /// Embedded templates plus any overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, TemplateError> {
        Ok(DocumentRenderer {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render the project document. Line endings are normalised to `\n`.
    pub fn render(&self, ctx: &DocumentContext) -> Result<String, TemplateError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(PROJECT_DOCUMENT, &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use orghub_core::{
        AutomationRules, FieldDef, FieldType, OrganizationType, ProjectTemplate, TemplateId,
        TemplateSettings, ViewDef,
    };

    fn template() -> ProjectTemplate {
        ProjectTemplate {
            id: TemplateId::from("t"),
            name: "Team Board".into(),
            description: "A board.".into(),
            organization_type: OrganizationType::Production,
            settings: TemplateSettings::default(),
            fields: vec![
                FieldDef::single_select("Status", &["Todo", "Done"]),
                FieldDef::plain("Estimate", FieldType::Number),
            ],
            views: vec![ViewDef::board("Board", "Status")],
            workflows: vec![],
            automation_rules: AutomationRules::default(),
        }
    }

    fn ctx() -> DocumentContext {
        let t = template();
        DocumentContext::new(&t, "repo - Org", "Described.", &t.fields, &t.views)
    }

    #[test]
    fn embedded_document_renders() {
        let renderer = DocumentRenderer::new(None).expect("embedded templates must parse");
        let doc = renderer.render(&ctx()).unwrap();
        assert!(doc.starts_with("# repo - Org\n"));
        assert!(doc.contains("Described."));
        assert!(doc.contains("- Status: single_select (Todo, Done)"));
        assert!(doc.contains("- Estimate: number\n"));
        assert!(doc.contains("- Board: board, grouped by Status"));
        assert!(!doc.contains("## Workflows"), "empty workflow list renders no section");
    }

    #[test]
    fn user_template_overrides_embedded() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("Project.md.tera"), "custom {{ title }}\r\n").unwrap();
        let renderer = DocumentRenderer::new(Some(dir.path())).unwrap();
        assert_eq!(renderer.render(&ctx()).unwrap(), "custom repo - Org\n");
    }

    #[test]
    fn missing_user_dir_is_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        let renderer = DocumentRenderer::new(Some(&dir.path().join("absent"))).unwrap();
        assert!(renderer.render(&ctx()).unwrap().contains("## Fields"));
    }

    #[test]
    fn broken_user_template_is_a_tera_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("project.md.tera"), "{% for x in %}").unwrap();
        let err = DocumentRenderer::new(Some(dir.path())).unwrap_err();
        assert!(matches!(err, TemplateError::Tera(_)));
    }
}
