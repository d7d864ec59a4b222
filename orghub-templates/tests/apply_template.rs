use orghub_templates::{ApplyContext, TemplateCatalog, TemplateError};
use rstest::rstest;
use tempfile::TempDir;

fn catalog() -> TemplateCatalog {
    let mut catalog = TemplateCatalog::builtin();
    catalog.initialize().expect("initialize builtin catalog");
    catalog
}

#[test]
fn production_ready_title_for_repository() {
    let ctx = ApplyContext::for_repository("my-app", "DevBusinessHub");
    let applied = catalog().apply_template("production-ready", &ctx).unwrap();
    assert_eq!(applied.title, "my-app - DevBusinessHub");
    assert_eq!(applied.template_id.0, "production-ready");
    assert_eq!(applied.context, ctx);
    assert!(applied.document.starts_with("# my-app - DevBusinessHub\n"));
}

#[test]
fn unknown_template_is_not_found() {
    let err = catalog()
        .apply_template("does-not-exist", &ApplyContext::new())
        .unwrap_err();
    assert!(matches!(err, TemplateError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("does-not-exist"));
}

#[test]
fn application_is_deterministic_except_timestamp() {
    let catalog = catalog();
    let ctx = ApplyContext::for_repository("svc", "DevInfraOps");
    let a = catalog.apply_template("infrastructure-ops", &ctx).unwrap();
    let b = catalog.apply_template("infrastructure-ops", &ctx).unwrap();
    assert_eq!(a.title, b.title);
    assert_eq!(a.description, b.description);
    assert_eq!(a.fields, b.fields);
    assert_eq!(a.views, b.views);
    assert_eq!(a.document, b.document);

    let mut b = b;
    b.applied_at = a.applied_at;
    assert_eq!(a, b);
}

#[test]
fn passthrough_keeps_template_fields_and_views() {
    let catalog = catalog();
    let template = catalog.get_template("research-project").unwrap().unwrap();
    let applied = catalog
        .apply_template("research-project", &ApplyContext::for_repository("paper", "Lab"))
        .unwrap();
    assert_eq!(applied.fields, template.fields);
    assert_eq!(applied.views, template.views);
    assert_eq!(applied.workflows, template.workflows);
}

#[test]
fn document_lists_fields_and_views_in_declaration_order() {
    let applied = catalog()
        .apply_template("production-ready", &ApplyContext::new())
        .unwrap();
    let doc = &applied.document;

    assert!(doc.contains("# Production Ready\n"));
    assert!(doc.contains("Release-gated delivery board"));

    let field_lines: Vec<usize> = [
        "- Status: single_select",
        "- Priority: single_select",
        "- Assignee: assignees",
        "- Sprint: iteration",
        "- Story Points: number",
        "- Release Date: date",
    ]
    .iter()
    .map(|line| doc.find(line).unwrap_or_else(|| panic!("missing {line:?} in\n{doc}")))
    .collect();
    assert!(field_lines.windows(2).all(|w| w[0] < w[1]), "field order:\n{doc}");

    let view_lines: Vec<usize> = [
        "- Sprint Board: board, grouped by Status",
        "- Backlog: table, sorted by Priority",
        "- Releases: table, grouped by Release Date",
    ]
    .iter()
    .map(|line| doc.find(line).unwrap_or_else(|| panic!("missing {line:?} in\n{doc}")))
    .collect();
    assert!(view_lines.windows(2).all(|w| w[0] < w[1]), "view order:\n{doc}");
    assert!(doc.contains("## Workflows"));
    assert!(!doc.contains('\r'));
}

#[rstest]
#[case("production-ready")]
#[case("experimental-sandbox")]
#[case("research-project")]
#[case("infrastructure-ops")]
#[case("basic")]
fn every_builtin_template_applies(#[case] id: &str) {
    let applied = catalog()
        .apply_template(id, &ApplyContext::for_repository("repo", "Org"))
        .unwrap();
    assert_eq!(applied.title, "repo - Org");
    assert!(!applied.fields.is_empty());
    assert!(!applied.views.is_empty());
    for field in &applied.fields {
        assert!(applied.document.contains(&format!("- {}: ", field.name)));
    }
}

#[test]
fn file_catalog_with_user_document_template() {
    let dir = TempDir::new().unwrap();
    let catalog_path = dir.path().join("project-templates.yaml");
    std::fs::write(
        &catalog_path,
        r#"
templates:
  - id: docs-only
    name: Docs Only
    organizationType: research
    fields:
      - { name: Notes, type: text }
    views:
      - { name: All, layout: table }
"#,
    )
    .unwrap();
    let tpl_dir = dir.path().join("templates");
    std::fs::create_dir_all(&tpl_dir).unwrap();
    std::fs::write(
        tpl_dir.join("project.md.tera"),
        "{{ title }}|{% for f in fields %}{{ f.name }}={{ f.kind }};{% endfor %}",
    )
    .unwrap();

    let mut catalog = TemplateCatalog::from_file(&catalog_path).with_user_template_dir(&tpl_dir);
    catalog.initialize().unwrap();
    assert_eq!(catalog.source_path(), Some(catalog_path.as_path()));

    let applied = catalog.apply_template("docs-only", &ApplyContext::new()).unwrap();
    assert_eq!(applied.document, "Docs Only|Notes=text;");
    assert!(catalog.get_template("production-ready").unwrap().is_none());
}
