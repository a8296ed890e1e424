//! Integration tests for prompts directories and configuration files

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use promptree::{discover, load_dir, Context, OverrideTable, PromptConfig, PromptError};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small prompts tree:
/// an entry point with a variant, a shared fragment with a variant, and a checklist
fn prompts_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "reviewer/analyze.md",
        "---\ndescription: Analyze a document\nmodel: large\n---\nAnalyze {{ doc }}.\n{% include \"shared/rubric.md\" %}",
    );
    write(
        root,
        "reviewer/analyze@brief.md",
        "---\ndescription: Short analysis\nmodel: small\n---\nSkim {{ doc }}.",
    );
    write(root, "shared/rubric.md", "---\nfragment: true\n---\nGrade fairly.");
    write(root, "shared/rubric@strict.md", "---\nfragment: true\n---\nGrade harshly.");
    write(
        root,
        "shared/checklist.yaml",
        "- {id: sources, label: Sources, priority: 2}\n- {id: clarity, label: Clarity, priority: 1}\n",
    );
    write(
        root,
        "reviewer/checklist.md",
        "---\nblocks: [shared.checklist]\n---\nChecklist:\n{{ blocks.checklist }}",
    );
    temp
}

#[test]
fn test_load_dir_lists_entry_points() {
    let temp = prompts_tree();
    let registry = load_dir(temp.path(), OverrideTable::new()).expect("Should load");

    assert_eq!(
        registry.list_visible(),
        vec!["reviewer.analyze", "reviewer.checklist"]
    );
    assert_eq!(
        registry.names(true),
        vec![
            "reviewer.analyze",
            "reviewer.checklist",
            "shared.checklist",
            "shared.rubric",
        ]
    );
}

#[test]
fn test_file_includes_and_overrides() {
    let temp = prompts_tree();
    let ctx = Context::new().with("doc", "the draft");

    let registry = load_dir(temp.path(), OverrideTable::new()).unwrap();
    assert_eq!(
        registry.render("reviewer.analyze", &ctx).unwrap(),
        "Analyze the draft.\nGrade fairly."
    );

    let strict = load_dir(temp.path(), OverrideTable::new().with("shared.rubric", "strict")).unwrap();
    assert_eq!(
        strict.render("reviewer.analyze", &ctx).unwrap(),
        "Analyze the draft.\nGrade harshly."
    );

    let brief = load_dir(temp.path(), OverrideTable::new().with("reviewer.analyze", "brief")).unwrap();
    assert_eq!(brief.render("reviewer.analyze", &ctx).unwrap(), "Skim the draft.");
}

#[test]
fn test_meta_reads_front_matter_of_active_variant() {
    let temp = prompts_tree();
    let registry = load_dir(temp.path(), OverrideTable::new().with("reviewer.analyze", "brief")).unwrap();

    let meta = registry.meta("reviewer.analyze").unwrap();
    assert_eq!(meta.get("model").and_then(|v| v.as_str()), Some("small"));
    assert_eq!(
        meta.get("description").and_then(|v| v.as_str()),
        Some("Short analysis")
    );
}

#[test]
fn test_yaml_items_as_block() {
    let temp = prompts_tree();
    let registry = load_dir(temp.path(), OverrideTable::new()).unwrap();
    assert_eq!(
        registry.render("reviewer.checklist", &Context::new()).unwrap(),
        "Checklist:\n1. **Sources**\n\n2. **Clarity**"
    );
}

#[test]
fn test_yaml_items_keep_file_order() {
    let temp = prompts_tree();
    let registry = load_dir(temp.path(), OverrideTable::new()).unwrap();
    assert_eq!(
        registry.render("shared.checklist", &Context::new()).unwrap(),
        "1. **Sources**\n\n2. **Clarity**"
    );
}

#[test]
fn test_config_file_drives_root_and_overrides() {
    let temp = prompts_tree();
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("promptree.toml");
    fs::write(
        &config_path,
        format!(
            "root = {:?}\n\n[overrides]\n\"shared.rubric\" = \"strict\"\n",
            temp.path().display().to_string()
        ),
    )
    .unwrap();

    let config = PromptConfig::from_file(&config_path).expect("Should load config");
    let mut builder = config.builder();
    let root = config.root.clone().expect("root is set");
    discover(&root, &mut builder).expect("Should discover");
    let registry = builder.build(config.overrides.clone());

    assert_eq!(
        registry
            .render("reviewer.analyze", &Context::new().with("doc", "it"))
            .unwrap(),
        "Analyze it.\nGrade harshly."
    );
}

#[test]
fn test_relative_config_root() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "prompts/hello.md", "Hello {{ name }}");
    write(temp.path(), "promptree.toml", "root = \"prompts\"\n");

    let config = PromptConfig::from_file(&temp.path().join("promptree.toml")).unwrap();
    let registry = load_dir(config.root.as_deref().unwrap(), config.overrides).unwrap();
    assert_eq!(
        registry
            .render("hello", &Context::new().with("name", "world"))
            .unwrap(),
        "Hello world"
    );
}

#[test]
fn test_file_edits_after_first_render_are_not_seen() {
    let temp = prompts_tree();
    let registry = load_dir(temp.path(), OverrideTable::new()).unwrap();
    let ctx = Context::new().with("doc", "x");
    let first = registry.render("reviewer.analyze", &ctx).unwrap();

    write(temp.path(), "shared/rubric.md", "---\nfragment: true\n---\nChanged.");
    assert_eq!(registry.render("reviewer.analyze", &ctx).unwrap(), first);
}

#[test]
fn test_missing_variable_in_file_template() {
    let temp = prompts_tree();
    let registry = load_dir(temp.path(), OverrideTable::new()).unwrap();
    let err = registry
        .render("reviewer.analyze", &Context::new())
        .unwrap_err();
    assert!(
        matches!(&err, PromptError::MissingVariable { prompt, .. } if prompt == "reviewer.analyze"),
        "unexpected error: {err:?}"
    );
}
