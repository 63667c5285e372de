//! Property tests over whole requirement trees.
//!
//! Each case builds a fresh temporary tree, so case counts are kept small.

use proptest::prelude::*;
use reqsync_core::{Policy, RunConfig, sync};
use reqsync_test_utils::{RequirementsTree, ScriptedEnvironment};

const PACKAGES: &[&str] = &["pandas", "numpy", "Flask", "requests", "zope.interface"];

fn package_line() -> impl Strategy<Value = String> {
    let spec = prop_oneof![
        Just(String::new()),
        "(>=|==|~=|<|!=)[0-9]\\.[0-9]{1,2}",
        "[0-9]\\.[0-9]".prop_map(|v| format!(">={v},<9")),
    ];
    (prop::sample::select(PACKAGES), spec, prop_oneof![Just(""), Just("  # note")])
        .prop_map(|(name, spec, comment)| format!("{name}{spec}{comment}"))
}

fn other_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("# comment".to_string()),
        Just(String::new()),
        Just("--index-url https://pypi.org/simple".to_string()),
        Just("-e ./local".to_string()),
        Just("git+https://example.com/repo.git".to_string()),
        Just("not a requirement!".to_string()),
    ]
}

fn file_text() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop_oneof![3 => package_line(), 1 => other_line()], 0..12),
        prop_oneof![Just("\n"), Just("\r\n")],
    )
        .prop_map(|(lines, eol)| lines.iter().map(|l| format!("{l}{eol}")).collect())
}

fn installed() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (prop::sample::select(PACKAGES), 0u32..12, 0u32..20),
        0..PACKAGES.len(),
    )
    .prop_map(|picks| {
        picks
            .into_iter()
            .map(|(name, major, minor)| (name.to_string(), format!("{major}.{minor}.0")))
            .collect()
    })
}

fn env_for(versions: &[(String, String)]) -> ScriptedEnvironment {
    versions
        .iter()
        .fold(ScriptedEnvironment::new(), |env, (n, v)| env.with_version(n, v))
}

fn policy() -> impl Strategy<Value = Policy> {
    prop::sample::select(Policy::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn second_run_changes_nothing(
        text in file_text(),
        versions in installed(),
        policy in policy(),
    ) {
        let tree = RequirementsTree::new().with_file("requirements.txt", &text);
        let env = env_for(&versions);
        let config = RunConfig {
            policy,
            ..tree.config("requirements.txt")
        };

        sync(config.clone(), &env).unwrap();
        let after_first = tree.read_bytes("requirements.txt");
        let second = sync(config, &env).unwrap();

        prop_assert!(!second.changed, "second run changed:\n{:?}", second.diff);
        prop_assert_eq!(tree.read_bytes("requirements.txt"), after_first);
    }

    #[test]
    fn floor_only_never_adds_a_floor(
        names in prop::collection::vec(prop::sample::select(PACKAGES), 1..6),
        upper in prop::option::of("<[0-9]"),
        versions in installed(),
    ) {
        let text: String = names
            .iter()
            .map(|n| format!("{n}{}\n", upper.clone().unwrap_or_default()))
            .collect();
        let tree = RequirementsTree::new().with_file("requirements.txt", &text);
        let config = RunConfig {
            policy: Policy::FloorOnly,
            ..tree.config("requirements.txt")
        };

        let result = sync(config, &env_for(&versions)).unwrap();

        prop_assert!(!result.changed);
        prop_assert_eq!(tree.read("requirements.txt"), text);
    }

    #[test]
    fn non_package_lines_survive_byte_for_byte(text in file_text(), versions in installed()) {
        let tree = RequirementsTree::new().with_file("requirements.txt", &text);

        sync(tree.config("requirements.txt"), &env_for(&versions)).unwrap();

        let after = tree.read("requirements.txt");
        prop_assert_eq!(after.lines().count(), text.lines().count());
        for (before, after) in text.lines().zip(after.lines()) {
            let is_package = PACKAGES.iter().any(|p| before.starts_with(p));
            if !is_package {
                prop_assert_eq!(before, after);
            }
        }
    }
}
