//! File-backed registry: error messages, catalog parsing and the built-in set.

use assert_fs::prelude::*;
use orghub_core::{
    registry, FieldType, OrganizationRegistry, OrganizationType, RegistryError, SecurityLevel,
    ViewLayout,
};
use predicates::prelude::predicate;
use rstest::rstest;

const CUSTOM_CATALOG: &str = r#"
organizations:
  - id: AcmeCloud
    name: Acme Cloud
    type: infrastructure
    settings:
      projectTemplate: infrastructure-ops
      securityLevel: medium
      qualityGates: [plan-review]
    projectFields:
      - name: Status
        type: single_select
        options: [Todo, Done]
    projectViews:
      - { name: Board, layout: board, groupBy: Status }
    workflows: [terraform-plan]
"#;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn missing_catalog_message_contains_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let mut reg = OrganizationRegistry::from_file(dir.path().join("organizations.yaml"));
    let err = reg.initialize().unwrap_err();
    assert!(matches!(err, RegistryError::CatalogNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("organizations.yaml"));
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("organizations.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed").expect("write");

    let err = OrganizationRegistry::from_file(file.path()).initialize().unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("organizations.yaml"));
}

#[test]
fn select_field_without_options_is_invalid() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("organizations.yaml");
    file.write_str(&CUSTOM_CATALOG.replace("        options: [Todo, Done]\n", ""))
        .expect("write");

    let err = OrganizationRegistry::from_file(file.path()).initialize().unwrap_err();
    match err {
        RegistryError::Invalid { id, reason } => {
            assert_eq!(id, "AcmeCloud");
            assert!(reason.contains("Status"));
        }
        other => panic!("expected Invalid, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// 2. Custom catalog file
// ---------------------------------------------------------------------------

#[test]
fn custom_catalog_replaces_builtin_set() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("organizations.yaml");
    file.write_str(CUSTOM_CATALOG).expect("write");
    file.assert(predicate::path::exists());

    let mut reg = OrganizationRegistry::from_file(file.path());
    reg.initialize().expect("initialize");
    assert_eq!(reg.source_path(), Some(file.path()));
    assert!(reg.is_healthy());

    let acme = reg.get_organization_config("AcmeCloud").unwrap();
    assert_eq!(acme.org_type, OrganizationType::Infrastructure);
    // Omitted automation block defaults to all-off.
    assert!(!acme.automation.issue_labeling);

    // Built-in profiles are not merged in.
    let hub = reg.get_organization_config("DevBusinessHub").unwrap();
    assert_eq!(hub.org_type, OrganizationType::Unknown);
}

#[test]
fn load_yaml_at_is_generic() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("list.yaml");
    file.write_str("- a\n- b\n").expect("write");
    let items: Vec<String> = registry::load_yaml_at(file.path()).expect("load");
    assert_eq!(items, vec!["a", "b"]);
}

// ---------------------------------------------------------------------------
// 3. Built-in catalog
// ---------------------------------------------------------------------------

#[rstest]
#[case("DevBusinessHub", OrganizationType::Production, SecurityLevel::High, "production-ready")]
#[case(
    "DevLabsExperiments",
    OrganizationType::Experimental,
    SecurityLevel::Medium,
    "experimental-sandbox"
)]
#[case(
    "DevResearchCollective",
    OrganizationType::Research,
    SecurityLevel::Medium,
    "research-project"
)]
#[case("DevInfraOps", OrganizationType::Infrastructure, SecurityLevel::High, "infrastructure-ops")]
fn builtin_profiles(
    #[case] id: &str,
    #[case] org_type: OrganizationType,
    #[case] security: SecurityLevel,
    #[case] template: &str,
) {
    let mut reg = OrganizationRegistry::builtin();
    reg.initialize().expect("initialize");
    let profile = reg.get_organization_config(id).unwrap();
    assert_eq!(profile.id.0, id);
    assert_eq!(profile.org_type, org_type);
    assert_eq!(profile.settings.security_level, security);
    assert_eq!(profile.settings.project_template, template);
    assert_eq!(profile.project_fields[0].name, "Status");
    assert!(!profile.project_views.is_empty());
}

#[rstest]
#[case("NotARealOrg")]
#[case("")]
#[case("dev-business-hub")]
fn unknown_ids_get_minimal_profile(#[case] id: &str) {
    let mut reg = OrganizationRegistry::builtin();
    reg.initialize().expect("initialize");
    let profile = reg.get_organization_config(id).unwrap();
    assert_eq!(profile.org_type, OrganizationType::Unknown);
    let fields: Vec<_> = profile
        .project_fields
        .iter()
        .map(|f| (f.name.as_str(), f.field_type))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("Status", FieldType::SingleSelect),
            ("Priority", FieldType::SingleSelect),
            ("Assignee", FieldType::Assignees),
        ]
    );
    assert_eq!(profile.project_views.len(), 1);
    assert_eq!(profile.project_views[0].layout, ViewLayout::Board);
    assert_eq!(profile.workflows.len(), 1);
}

#[test]
fn replaced_profiles_keep_the_source_and_are_checked() {
    let file = assert_fs::NamedTempFile::new("organizations.yaml").unwrap();
    file.write_str(CUSTOM_CATALOG).unwrap();
    let mut reg = OrganizationRegistry::from_file(file.path());
    reg.initialize().expect("initialize");

    let mut acme = reg.get_organization_config("AcmeCloud").unwrap();
    acme.settings.security_level = SecurityLevel::High;
    let err = reg.replace_profiles(vec![acme.clone(), acme.clone()]).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateId { .. }), "{err}");

    reg.replace_profiles(vec![acme]).expect("replace");
    assert_eq!(reg.source_path(), Some(file.path()));
    let profile = reg.get_organization_config("AcmeCloud").unwrap();
    assert_eq!(profile.settings.security_level, SecurityLevel::High);
}
