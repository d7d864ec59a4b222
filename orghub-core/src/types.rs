//! Domain types for organization profiles and project templates.
//!
//! All types are serializable/deserializable via serde + serde_yaml and use
//! camelCase keys, so the same shapes appear verbatim in the merged config
//! tree (`organizations.<id>.settings.securityLevel`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a GitHub organization (e.g. `DevBusinessHub`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OrganizationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a project template (e.g. `production-ready`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Governance category of an organization (and of the templates aimed at it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationType {
    Production,
    Experimental,
    Research,
    Infrastructure,
    #[default]
    Unknown,
}

impl fmt::Display for OrganizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationType::Production => write!(f, "production"),
            OrganizationType::Experimental => write!(f, "experimental"),
            OrganizationType::Research => write!(f, "research"),
            OrganizationType::Infrastructure => write!(f, "infrastructure"),
            OrganizationType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Low => write!(f, "low"),
            SecurityLevel::Medium => write!(f, "medium"),
            SecurityLevel::High => write!(f, "high"),
        }
    }
}

/// GitHub Projects (v2) field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    SingleSelect,
    Assignees,
    Iteration,
    Number,
    Date,
    Text,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::SingleSelect => write!(f, "single_select"),
            FieldType::Assignees => write!(f, "assignees"),
            FieldType::Iteration => write!(f, "iteration"),
            FieldType::Number => write!(f, "number"),
            FieldType::Date => write!(f, "date"),
            FieldType::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewLayout {
    Board,
    Table,
}

impl fmt::Display for ViewLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewLayout::Board => write!(f, "board"),
            ViewLayout::Table => write!(f, "table"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fields and views
// ---------------------------------------------------------------------------

/// One option of a `single_select` field.
///
/// Catalog files may spell an option as a bare string (`- Backlog`) or as a
/// mapping (`- { name: Backlog, color: GRAY }`); both deserialize to this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldOptionRepr")]
pub struct FieldOption {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl FieldOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldOptionRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        color: Option<String>,
    },
}

impl From<FieldOptionRepr> for FieldOption {
    fn from(repr: FieldOptionRepr) -> Self {
        match repr {
            FieldOptionRepr::Name(name) => FieldOption { name, color: None },
            FieldOptionRepr::Full { name, color } => FieldOption { name, color },
        }
    }
}

/// A project field definition. `options` is present iff the type is `single_select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

impl FieldDef {
    pub fn single_select(name: impl Into<String>, options: &[&str]) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::SingleSelect,
            options: Some(options.iter().map(|o| FieldOption::new(*o)).collect()),
        }
    }

    pub fn plain(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            options: None,
        }
    }

    /// Checks the options/type pairing. Returns a human-readable reason on failure.
    pub fn check(&self) -> Result<(), String> {
        match (&self.field_type, &self.options) {
            (FieldType::SingleSelect, None) => {
                Err(format!("field '{}' is single_select but has no options", self.name))
            }
            (FieldType::SingleSelect, Some(opts)) if opts.is_empty() => {
                Err(format!("field '{}' is single_select but its option list is empty", self.name))
            }
            (FieldType::SingleSelect, Some(_)) => Ok(()),
            (other, Some(_)) => Err(format!(
                "field '{}' has type {other} and must not declare options",
                self.name
            )),
            (_, None) => Ok(()),
        }
    }

    /// Option names in declaration order (empty for non-select fields).
    pub fn option_names(&self) -> Vec<&str> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDef {
    pub name: String,
    pub layout: ViewLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<String>,
}

impl ViewDef {
    pub fn board(name: impl Into<String>, group_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: ViewLayout::Board,
            group_by: Some(group_by.into()),
            sort_by: None,
            filter_by: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Organization profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettings {
    pub project_template: String,
    #[serde(default)]
    pub approval_required: bool,
    #[serde(default)]
    pub auto_deployment: bool,
    #[serde(default)]
    pub security_level: SecurityLevel,
    /// Ordered: gates run in declaration order.
    #[serde(default)]
    pub quality_gates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationAutomation {
    pub issue_labeling: bool,
    pub project_routing: bool,
    pub deployment_triggers: bool,
    pub notification_rules: bool,
}

/// Process and governance settings for one GitHub organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProfile {
    pub id: OrganizationId,
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    #[serde(default)]
    pub description: String,
    pub settings: OrganizationSettings,
    #[serde(default)]
    pub project_fields: Vec<FieldDef>,
    #[serde(default)]
    pub project_views: Vec<ViewDef>,
    #[serde(default)]
    pub workflows: Vec<String>,
    #[serde(default)]
    pub automation: OrganizationAutomation,
}

/// Workflow attached to the synthesized profile of an unregistered organization.
pub const FALLBACK_WORKFLOW: &str = "basic-ci";

impl OrganizationProfile {
    /// The deterministic profile returned for an unregistered organization:
    /// `type = unknown`, fields {Status, Priority, Assignee}, one board view and
    /// one generic workflow.
    pub fn unknown(id: impl Into<OrganizationId>) -> Self {
        let id = id.into();
        OrganizationProfile {
            name: id.0.clone(),
            id,
            org_type: OrganizationType::Unknown,
            description: "Unregistered organization (default profile)".to_string(),
            settings: OrganizationSettings {
                project_template: "basic".to_string(),
                approval_required: false,
                auto_deployment: false,
                security_level: SecurityLevel::Low,
                quality_gates: Vec::new(),
            },
            project_fields: vec![
                FieldDef::single_select("Status", &["Todo", "In Progress", "Done"]),
                FieldDef::single_select("Priority", &["High", "Medium", "Low"]),
                FieldDef::plain("Assignee", FieldType::Assignees),
            ],
            project_views: vec![ViewDef::board("Board", "Status")],
            workflows: vec![FALLBACK_WORKFLOW.to_string()],
            automation: OrganizationAutomation::default(),
        }
    }

    /// Structural checks that serde cannot express (select options, duplicate names).
    pub fn check(&self) -> Result<(), String> {
        check_fields(&self.project_fields)?;
        check_unique("view", self.project_views.iter().map(|v| v.name.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Project template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateSettings {
    pub public: bool,
    pub security_level: SecurityLevel,
    pub approval_required: bool,
    pub auto_deployment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationRules {
    pub auto_add_issues: bool,
    pub auto_add_pull_requests: bool,
    pub auto_archive_done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_after_days: Option<u32>,
}

/// A reusable bundle of field/view/workflow definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_type: OrganizationType,
    #[serde(default)]
    pub settings: TemplateSettings,
    pub fields: Vec<FieldDef>,
    pub views: Vec<ViewDef>,
    #[serde(default)]
    pub workflows: Vec<String>,
    #[serde(default)]
    pub automation_rules: AutomationRules,
}

impl ProjectTemplate {
    /// A template must declare at least one field and one view.
    pub fn check(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err(format!("template '{}' declares no fields", self.id));
        }
        if self.views.is_empty() {
            return Err(format!("template '{}' declares no views", self.id));
        }
        check_fields(&self.fields)?;
        check_unique("view", self.views.iter().map(|v| v.name.as_str()))
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            organization_type: self.organization_type,
        }
    }
}

/// Catalog listing entry: never carries the template body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub organization_type: OrganizationType,
}

fn check_fields(fields: &[FieldDef]) -> Result<(), String> {
    for field in fields {
        field.check()?;
    }
    check_unique("field", fields.iter().map(|f| f.name.as_str()))
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(format!("duplicate {kind} name '{name}'"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(OrganizationId::from("DevBusinessHub").to_string(), "DevBusinessHub");
        assert_eq!(TemplateId::from("production-ready").to_string(), "production-ready");
    }

    #[test]
    fn enum_display_matches_serde() {
        assert_eq!(OrganizationType::Infrastructure.to_string(), "infrastructure");
        assert_eq!(FieldType::SingleSelect.to_string(), "single_select");
        assert_eq!(
            serde_yaml::to_string(&FieldType::SingleSelect).unwrap().trim(),
            "single_select"
        );
        assert_eq!(ViewLayout::Table.to_string(), "table");
        assert_eq!(SecurityLevel::High.to_string(), "high");
    }

    #[test]
    fn field_option_accepts_bare_string_and_mapping() {
        let yaml = r#"
name: Status
type: single_select
options:
  - Backlog
  - { name: Done, color: GREEN }
"#;
        let field: FieldDef = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(field.option_names(), vec!["Backlog", "Done"]);
        let opts = field.options.as_ref().unwrap();
        assert_eq!(opts[0].color, None);
        assert_eq!(opts[1].color.as_deref(), Some("GREEN"));
    }

    #[test]
    fn single_select_without_options_fails_check() {
        let field = FieldDef {
            name: "Status".into(),
            field_type: FieldType::SingleSelect,
            options: None,
        };
        assert!(field.check().unwrap_err().contains("Status"));
    }

    #[test]
    fn options_on_non_select_fail_check() {
        let field = FieldDef {
            name: "Points".into(),
            field_type: FieldType::Number,
            options: Some(vec![FieldOption::new("1")]),
        };
        assert!(field.check().is_err());
    }

    #[test]
    fn unknown_profile_has_minimal_shape() {
        let profile = OrganizationProfile::unknown("NotARealOrg");
        assert_eq!(profile.org_type, OrganizationType::Unknown);
        let names: Vec<_> = profile.project_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Status", "Priority", "Assignee"]);
        assert_eq!(profile.project_views.len(), 1);
        assert_eq!(profile.project_views[0].layout, ViewLayout::Board);
        assert_eq!(profile.workflows, vec![FALLBACK_WORKFLOW.to_string()]);
        assert!(profile.check().is_ok());
    }

    #[test]
    fn template_without_views_fails_check() {
        let template = ProjectTemplate {
            id: TemplateId::from("t"),
            name: "T".into(),
            description: String::new(),
            organization_type: OrganizationType::Research,
            settings: TemplateSettings::default(),
            fields: vec![FieldDef::plain("Notes", FieldType::Text)],
            views: vec![],
            workflows: vec![],
            automation_rules: AutomationRules::default(),
        };
        assert!(template.check().unwrap_err().contains("no views"));
    }

    #[test]
    fn profile_keys_are_camel_case() {
        let yaml = serde_yaml::to_string(&OrganizationProfile::unknown("x")).unwrap();
        assert!(yaml.contains("projectFields:"));
        assert!(yaml.contains("securityLevel: low"));
        assert!(yaml.contains("type: unknown"));
    }
}
