//! Project template catalog and the template application engine.
//!
//! Same lifecycle as the organization registry: construct from a
//! [`TemplateSource`], [`initialize`](TemplateCatalog::initialize) once, then
//! query. Every query returns owned copies so callers cannot reach into the
//! catalog.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use orghub_core::registry::{ensure_unique_ids, load_yaml_at, parse_yaml, BUILTIN_ORIGIN};
use orghub_core::{OrganizationType, ProjectTemplate, RegistryError, TemplateSummary};

use crate::context::{AppliedProjectConfig, ApplyContext, DocumentContext};
use crate::customize::{PassThrough, ProjectCustomizer};
use crate::engine::DocumentRenderer;
use crate::error::TemplateError;

const BUILTIN_TEMPLATES: &str = include_str!("catalog/templates.yaml");

#[derive(Deserialize)]
struct TemplateCatalogFile {
    #[serde(default)]
    templates: Vec<ProjectTemplate>,
}

/// Where the catalog reads its templates from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Builtin,
    File(PathBuf),
    Templates(Vec<ProjectTemplate>),
}

impl TemplateSource {
    fn load(&self) -> Result<Vec<ProjectTemplate>, RegistryError> {
        match self {
            TemplateSource::Builtin => {
                let file: TemplateCatalogFile =
                    parse_yaml(BUILTIN_TEMPLATES, Path::new(BUILTIN_ORIGIN))?;
                Ok(file.templates)
            }
            TemplateSource::File(path) => {
                let file: TemplateCatalogFile = load_yaml_at(path)?;
                Ok(file.templates)
            }
            TemplateSource::Templates(templates) => Ok(templates.clone()),
        }
    }
}

#[derive(Clone)]
struct Loaded {
    templates: Vec<ProjectTemplate>,
    renderer: Arc<DocumentRenderer>,
}

/// In-memory catalog of project templates keyed by id (catalog order preserved).
#[derive(Clone)]
pub struct TemplateCatalog {
    source: TemplateSource,
    user_template_dir: Option<PathBuf>,
    customizer: Arc<dyn ProjectCustomizer>,
    loaded: Option<Loaded>,
}

fn check_templates(templates: &[ProjectTemplate]) -> Result<(), RegistryError> {
    ensure_unique_ids(templates.iter().map(|t| t.id.0.as_str()))?;
    for template in templates {
        template.check().map_err(|reason| RegistryError::Invalid {
            id: template.id.0.clone(),
            reason,
        })?;
    }
    Ok(())
}

impl fmt::Debug for TemplateCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCatalog")
            .field("source", &self.source)
            .field("user_template_dir", &self.user_template_dir)
            .field("templates", &self.loaded.as_ref().map(|l| l.templates.len()))
            .finish()
    }
}

impl TemplateCatalog {
    pub fn new(source: TemplateSource) -> Self {
        Self {
            source,
            user_template_dir: None,
            customizer: Arc::new(PassThrough),
            loaded: None,
        }
    }

    pub fn builtin() -> Self {
        Self::new(TemplateSource::Builtin)
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(TemplateSource::File(path.into()))
    }

    pub fn from_templates(templates: Vec<ProjectTemplate>) -> Self {
        Self::new(TemplateSource::Templates(templates))
    }

    /// Directory holding `.tera` overrides for the project document.
    pub fn with_user_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_template_dir = Some(dir.into());
        self
    }

    pub fn with_customizer(mut self, customizer: Arc<dyn ProjectCustomizer>) -> Self {
        self.customizer = customizer;
        self
    }

    /// Load and check every template, and compile the document renderer.
    pub fn initialize(&mut self) -> Result<(), TemplateError> {
        let templates = self.source.load()?;
        check_templates(&templates)?;
        let renderer = DocumentRenderer::new(self.user_template_dir.as_deref())?;
        self.loaded = Some(Loaded {
            templates,
            renderer: Arc::new(renderer),
        });
        Ok(())
    }

    /// Swap in `templates`, keeping the source, renderer and customizer.
    /// Runs the same checks as [`initialize`](Self::initialize), which must
    /// have succeeded first.
    pub fn replace_templates(
        &mut self,
        templates: Vec<ProjectTemplate>,
    ) -> Result<(), TemplateError> {
        check_templates(&templates)?;
        let loaded = self.loaded.as_mut().ok_or(TemplateError::NotInitialized)?;
        loaded.templates = templates;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_healthy(&self) -> bool {
        self.loaded.as_ref().is_some_and(|l| !l.templates.is_empty())
    }

    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            TemplateSource::File(path) => Some(path),
            _ => None,
        }
    }

    /// Copy of the template, `Ok(None)` when the id is not registered.
    pub fn get_template(&self, id: &str) -> Result<Option<ProjectTemplate>, TemplateError> {
        Ok(self.find(id)?.cloned())
    }

    /// Summary view of every template; never the template bodies.
    pub fn get_available_templates(&self) -> Result<Vec<TemplateSummary>, TemplateError> {
        Ok(self
            .loaded()?
            .templates
            .iter()
            .map(ProjectTemplate::summary)
            .collect())
    }

    /// Copies of every template in catalog order.
    pub fn templates(&self) -> Result<Vec<ProjectTemplate>, TemplateError> {
        Ok(self.loaded()?.templates.clone())
    }

    /// First template registered for `org_type`.
    pub fn template_for_organization_type(
        &self,
        org_type: OrganizationType,
    ) -> Result<Option<ProjectTemplate>, TemplateError> {
        Ok(self
            .loaded()?
            .templates
            .iter()
            .find(|t| t.organization_type == org_type)
            .cloned())
    }

    /// Realize template `id` for `ctx`.
    ///
    /// Everything except `applied_at` is a pure function of `(id, ctx)`.
    pub fn apply_template(
        &self,
        id: &str,
        ctx: &ApplyContext,
    ) -> Result<AppliedProjectConfig, TemplateError> {
        let loaded = self.loaded()?;
        let template = self
            .find(id)?
            .ok_or_else(|| TemplateError::NotFound { id: id.to_string() })?;

        let title = ctx.title_for(template);
        let description = ctx.description_for(template);
        let fields = self.customizer.customize_fields(&template.fields, ctx);
        let views = self.customizer.customize_views(&template.views, ctx);

        let doc_ctx = DocumentContext::new(template, &title, &description, &fields, &views);
        let document = loaded.renderer.render(&doc_ctx)?;

        Ok(AppliedProjectConfig {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            organization_type: template.organization_type,
            settings: template.settings.clone(),
            title,
            description,
            fields,
            views,
            workflows: template.workflows.clone(),
            automation_rules: template.automation_rules.clone(),
            document,
            context: ctx.clone(),
            applied_at: Utc::now(),
        })
    }

    fn loaded(&self) -> Result<&Loaded, TemplateError> {
        self.loaded.as_ref().ok_or(TemplateError::NotInitialized)
    }

    fn find(&self, id: &str) -> Result<Option<&ProjectTemplate>, TemplateError> {
        Ok(self.loaded()?.templates.iter().find(|t| t.id.0 == id))
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use orghub_core::{FieldDef, FieldType, ViewDef};

    fn ready() -> TemplateCatalog {
        let mut catalog = TemplateCatalog::builtin();
        catalog.initialize().expect("builtin catalog must load");
        catalog
    }

    #[test]
    fn queries_before_initialize_fail() {
        let catalog = TemplateCatalog::builtin();
        assert!(matches!(catalog.get_template("basic"), Err(TemplateError::NotInitialized)));
        assert!(matches!(
            catalog.apply_template("basic", &ApplyContext::new()),
            Err(TemplateError::NotInitialized)
        ));
        assert!(!catalog.is_healthy());
    }

    #[test]
    fn lookup_miss_is_none_but_apply_miss_is_error() {
        let catalog = ready();
        assert!(catalog.get_template("does-not-exist").unwrap().is_none());
        let err = catalog.apply_template("does-not-exist", &ApplyContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { ref id } if id == "does-not-exist"));
    }

    #[test]
    fn summaries_follow_catalog_order() {
        let ids: Vec<_> = ready()
            .get_available_templates()
            .unwrap()
            .into_iter()
            .map(|s| s.id.0)
            .collect();
        assert_eq!(
            ids,
            vec![
                "production-ready",
                "experimental-sandbox",
                "research-project",
                "infrastructure-ops",
                "basic"
            ]
        );
    }

    #[test]
    fn get_template_returns_copy() {
        let catalog = ready();
        let mut template = catalog.get_template("production-ready").unwrap().unwrap();
        template.fields.clear();
        template.name = "mutated".into();
        let again = catalog.get_template("production-ready").unwrap().unwrap();
        assert_eq!(again.name, "Production Ready");
        assert!(!again.fields.is_empty());
    }

    #[test]
    fn template_for_organization_type() {
        let catalog = ready();
        let t = catalog
            .template_for_organization_type(OrganizationType::Research)
            .unwrap()
            .unwrap();
        assert_eq!(t.id.0, "research-project");
    }

    #[test]
    fn templates_without_fields_are_rejected() {
        let mut template = ready().get_template("basic").unwrap().unwrap();
        template.fields.clear();
        let mut catalog = TemplateCatalog::from_templates(vec![template]);
        let err = catalog.initialize().unwrap_err();
        assert!(matches!(err, TemplateError::Catalog(RegistryError::Invalid { .. })));
    }

    struct AddRepoField;

    impl ProjectCustomizer for AddRepoField {
        fn customize_fields(&self, fields: &[FieldDef], ctx: &ApplyContext) -> Vec<FieldDef> {
            let mut out = fields.to_vec();
            if let Some(repo) = &ctx.repository {
                out.push(FieldDef::plain(format!("{repo} notes"), FieldType::Text));
            }
            out
        }

        fn customize_views(&self, views: &[ViewDef], _ctx: &ApplyContext) -> Vec<ViewDef> {
            views.iter().rev().cloned().collect()
        }
    }

    #[test]
    fn customizer_hook_shapes_fields_and_document() {
        let mut catalog = TemplateCatalog::builtin().with_customizer(Arc::new(AddRepoField));
        catalog.initialize().unwrap();
        let ctx = ApplyContext::for_repository("svc", "DevBusinessHub");
        let applied = catalog.apply_template("production-ready", &ctx).unwrap();
        assert_eq!(applied.fields.last().unwrap().name, "svc notes");
        assert_eq!(applied.views[0].name, "Releases");
        assert!(applied.document.contains("- svc notes: text"));
    }

    #[test]
    fn replaced_templates_keep_the_customizer() {
        let mut uninit = TemplateCatalog::builtin();
        let err = uninit.replace_templates(Vec::new()).unwrap_err();
        assert!(matches!(err, TemplateError::NotInitialized));

        let mut catalog = TemplateCatalog::builtin().with_customizer(Arc::new(AddRepoField));
        catalog.initialize().unwrap();
        let mut basic = catalog.get_template("basic").unwrap().unwrap();
        basic.id = "renamed".into();
        catalog.replace_templates(vec![basic]).unwrap();

        assert!(catalog.get_template("basic").unwrap().is_none());
        let ctx = ApplyContext::for_repository("svc", "o");
        let applied = catalog.apply_template("renamed", &ctx).unwrap();
        assert_eq!(applied.fields.last().unwrap().name, "svc notes");

        let mut empty = catalog.get_template("renamed").unwrap().unwrap();
        empty.views.clear();
        assert!(catalog.replace_templates(vec![empty]).is_err());
        assert!(catalog.get_template("renamed").unwrap().is_some());
    }
}
