//! Include graph resolution and duplicate resolution across files

use pretty_assertions::assert_eq;
use reqsync_core::{FileRole, RunConfig, resolve_files, sync};
use reqsync_test_utils::{RequirementsTree, ScriptedEnvironment};

fn names_and_roles(tree: &RequirementsTree, root: &str) -> Vec<(String, FileRole)> {
    resolve_files(&tree.path(root), true)
        .unwrap()
        .into_iter()
        .map(|f| {
            (
                f.path.file_name().unwrap().to_string_lossy().into_owned(),
                f.role,
            )
        })
        .collect()
}

#[test]
fn breadth_first_order_is_stable() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r a.txt\n-r b.txt\n")
        .with_file("a.txt", "-r nested/c.txt\n")
        .with_file("b.txt", "flask\n")
        .with_file("nested/c.txt", "-r ../b.txt\nrequests\n");

    assert_eq!(
        names_and_roles(&tree, "requirements.txt"),
        vec![
            ("requirements.txt".to_string(), FileRole::Root),
            ("a.txt".to_string(), FileRole::Requirement),
            ("b.txt".to_string(), FileRole::Requirement),
            ("c.txt".to_string(), FileRole::Requirement),
        ]
    );
}

#[test]
fn constraint_reached_again_as_requirement_is_promoted() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-c shared.txt\n-r dev.txt\n")
        .with_file("dev.txt", "-r shared.txt\n")
        .with_file("shared.txt", "numpy\n");

    let roles = names_and_roles(&tree, "requirements.txt");

    assert_eq!(roles[1], ("shared.txt".to_string(), FileRole::Requirement));
}

#[test]
fn requirement_reached_again_as_constraint_stays_requirement() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r shared.txt\n-c shared.txt\n")
        .with_file("shared.txt", "numpy\n");

    let roles = names_and_roles(&tree, "requirements.txt");

    assert_eq!(roles, vec![
        ("requirements.txt".to_string(), FileRole::Root),
        ("shared.txt".to_string(), FileRole::Requirement),
    ]);
}

#[test]
fn missing_link_is_skipped_and_kept() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "-r missing.txt\npandas\n");
    let env = ScriptedEnvironment::new().with_version("pandas", "2.2.2");

    let result = sync(tree.config("requirements.txt"), &env).unwrap();

    assert_eq!(result.files.len(), 1);
    tree.assert_content("requirements.txt", "-r missing.txt\npandas>=2.2.2\n");
}

#[test]
fn cycles_terminate() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r a.txt\n")
        .with_file("a.txt", "-r requirements.txt\n-r a.txt\n");

    assert_eq!(names_and_roles(&tree, "requirements.txt").len(), 2);
}

#[test]
fn equals_and_quoted_forms_are_followed() {
    let tree = RequirementsTree::new()
        .with_file(
            "requirements.txt",
            "--requirement=base.txt\n-c \"pins.txt\"  # pinned\n",
        )
        .with_file("base.txt", "flask\n")
        .with_file("pins.txt", "flask<4\n");

    assert_eq!(
        names_and_roles(&tree, "requirements.txt"),
        vec![
            ("requirements.txt".to_string(), FileRole::Root),
            ("base.txt".to_string(), FileRole::Requirement),
            ("pins.txt".to_string(), FileRole::Constraint),
        ]
    );
}

#[test]
fn follow_disabled_rewrites_only_root() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r base.txt\nflask\n")
        .with_file("base.txt", "flask\n");
    let env = ScriptedEnvironment::new().with_version("flask", "3.0.3");
    let config = RunConfig {
        follow_includes: false,
        ..tree.config("requirements.txt")
    };

    let result = sync(config, &env).unwrap();

    assert_eq!(result.files.len(), 1);
    tree.assert_content("base.txt", "flask\n");
}

#[test]
fn last_wins_rewrites_only_final_occurrence() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r a.txt\n-r b.txt\n")
        .with_file("a.txt", "requests\nflask\nFoo>=1.0\n")
        .with_file("b.txt", "foo\n");
    let env = ScriptedEnvironment::new().with_versions(&[
        ("foo", "2.0.0"),
        ("flask", "3.0.3"),
        ("requests", "2.32.3"),
    ]);
    let config = RunConfig {
        last_wins: true,
        ..tree.config("requirements.txt")
    };

    sync(config, &env).unwrap();

    tree.assert_content("a.txt", "requests>=2.32.3\nflask>=3.0.3\nFoo>=1.0\n");
    tree.assert_content("b.txt", "foo>=2.0.0\n");
}

#[test]
fn without_last_wins_every_occurrence_is_rewritten() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r a.txt\nfoo\n")
        .with_file("a.txt", "foo>=1.0\n");
    let env = ScriptedEnvironment::new().with_version("foo", "2.0.0");

    sync(tree.config("requirements.txt"), &env).unwrap();

    tree.assert_content("requirements.txt", "-r a.txt\nfoo>=2.0.0\n");
    tree.assert_content("a.txt", "foo>=2.0.0\n");
}
