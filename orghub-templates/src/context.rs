//! Application context, applied project configuration and the serializable
//! rendering payload handed to tera.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orghub_core::{
    AutomationRules, FieldDef, OrganizationType, ProjectTemplate, TemplateId, TemplateSettings,
    ViewDef,
};

use crate::error::TemplateError;

/// Where a template is being applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl ApplyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_repository(repository: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            repository: Some(repository.into()),
            organization: Some(organization.into()),
        }
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// `(repository, organization)` when both are present and non-empty.
    fn target(&self) -> Option<(&str, &str)> {
        match (self.repository.as_deref(), self.organization.as_deref()) {
            (Some(repo), Some(org)) if !repo.is_empty() && !org.is_empty() => Some((repo, org)),
            _ => None,
        }
    }

    /// `"{repository} - {organization}"`, or the template name when either is missing.
    pub fn title_for(&self, template: &ProjectTemplate) -> String {
        match self.target() {
            Some((repo, org)) => format!("{repo} - {org}"),
            None => template.name.clone(),
        }
    }

    pub fn description_for(&self, template: &ProjectTemplate) -> String {
        match self.target() {
            Some((repo, org)) => format!(
                "{} project board for {repo} in the {org} organization.",
                template.name
            ),
            None => template.description.clone(),
        }
    }
}

/// A template realized for one repository/organization context.
///
/// Built fresh on every application; nothing here is persisted by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedProjectConfig {
    pub template_id: TemplateId,
    pub template_name: String,
    pub organization_type: OrganizationType,
    pub settings: TemplateSettings,
    pub title: String,
    pub description: String,
    pub fields: Vec<FieldDef>,
    pub views: Vec<ViewDef>,
    pub workflows: Vec<String>,
    pub automation_rules: AutomationRules,
    /// Rendered README-like document describing the project.
    pub document: String,
    pub context: ApplyContext,
    pub applied_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Rendering payload
// ---------------------------------------------------------------------------

/// Flat rendering payload for the project document template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContext {
    pub title: String,
    pub description: String,
    pub template_id: String,
    pub template_name: String,
    pub organization_type: String,
    pub security_level: String,
    pub public: bool,
    /// Declaration order is preserved.
    pub fields: Vec<FieldCtx>,
    pub views: Vec<ViewCtx>,
    pub workflows: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCtx {
    pub name: String,
    pub kind: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewCtx {
    pub name: String,
    pub layout: String,
    pub group_by: Option<String>,
    pub sort_by: Option<String>,
}

impl DocumentContext {
    /// Build the payload from a template plus its already-customized fields and views.
    pub fn new(
        template: &ProjectTemplate,
        title: &str,
        description: &str,
        fields: &[FieldDef],
        views: &[ViewDef],
    ) -> Self {
        DocumentContext {
            title: title.to_string(),
            description: description.to_string(),
            template_id: template.id.0.clone(),
            template_name: template.name.clone(),
            organization_type: template.organization_type.to_string(),
            security_level: template.settings.security_level.to_string(),
            public: template.settings.public,
            fields: fields
                .iter()
                .map(|f| FieldCtx {
                    name: f.name.clone(),
                    kind: f.field_type.to_string(),
                    options: f.option_names().into_iter().map(str::to_string).collect(),
                })
                .collect(),
            views: views
                .iter()
                .map(|v| ViewCtx {
                    name: v.name.clone(),
                    layout: v.layout.to_string(),
                    group_by: v.group_by.clone(),
                    sort_by: v.sort_by.clone(),
                })
                .collect(),
            workflows: template.workflows.clone(),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, TemplateError> {
        tera::Context::from_serialize(self).map_err(TemplateError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orghub_core::{FieldType, ViewLayout};

    fn template() -> ProjectTemplate {
        ProjectTemplate {
            id: TemplateId::from("research-project"),
            name: "Research Project".into(),
            description: "Tracks research questions.".into(),
            organization_type: OrganizationType::Research,
            settings: TemplateSettings::default(),
            fields: vec![
                FieldDef::single_select("Status", &["Proposed", "Published"]),
                FieldDef::plain("Findings", FieldType::Text),
            ],
            views: vec![ViewDef::board("Tracks", "Status")],
            workflows: vec!["docs-build".into()],
            automation_rules: AutomationRules::default(),
        }
    }

    #[test]
    fn title_uses_repository_and_organization() {
        let ctx = ApplyContext::for_repository("my-app", "DevBusinessHub");
        assert_eq!(ctx.title_for(&template()), "my-app - DevBusinessHub");
        assert!(ctx.description_for(&template()).contains("my-app"));
    }

    #[test]
    fn title_falls_back_to_template_name() {
        let t = template();
        assert_eq!(ApplyContext::new().title_for(&t), "Research Project");
        assert_eq!(ApplyContext::new().repository("only-repo").title_for(&t), "Research Project");
        assert_eq!(
            ApplyContext::new().repository("").organization("Org").title_for(&t),
            "Research Project"
        );
        assert_eq!(ApplyContext::new().description_for(&t), t.description);
    }

    #[test]
    fn document_context_keeps_declaration_order() {
        let t = template();
        let ctx = DocumentContext::new(&t, "T", "D", &t.fields, &t.views);
        let names: Vec<_> = ctx.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Status", "Findings"]);
        assert_eq!(ctx.fields[0].kind, "single_select");
        assert_eq!(ctx.fields[0].options, vec!["Proposed", "Published"]);
        assert!(ctx.fields[1].options.is_empty());
        assert_eq!(ctx.views[0].layout, ViewLayout::Board.to_string());
        assert_eq!(ctx.views[0].group_by.as_deref(), Some("Status"));
        ctx.to_tera_context().expect("context conversion");
    }
}
