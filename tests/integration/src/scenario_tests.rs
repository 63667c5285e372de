//! End-to-end scenarios across reqsync-fs and reqsync-core.

use pretty_assertions::assert_eq;
use reqsync_core::{
    CapRule, CapStrategy, Error, FileRole, FileWriter, Policy, RunConfig, SyncEngine, VersionCache,
    resolve_files, sync, to_json, write_json_report,
};
use reqsync_fs::{TextEncoding, write_text_preserve};
use reqsync_test_utils::{RequirementsTree, ScriptedEnvironment};
use std::cell::Cell;
use std::path::Path;

#[test]
fn pandas_dry_run_reports_without_writing() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "pandas>=1.0.0\n");
    let env = ScriptedEnvironment::new().with_version("pandas", "2.2.2");
    let config = RunConfig {
        dry_run: true,
        ..tree.config("requirements.txt")
    };

    let result = sync(config, &env).unwrap();

    assert!(result.changed);
    let diff = result.diff.as_deref().unwrap();
    assert!(diff.contains("-pandas>=1.0.0"));
    assert!(diff.contains("+pandas>=2.2.2"));
    tree.assert_content("requirements.txt", "pandas>=1.0.0\n");
    assert!(tree.backups_of("requirements.txt", ".bak").is_empty());
}

#[test]
fn floor_and_cap_default_is_next_major() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "flask>=1.0\n");
    let env = ScriptedEnvironment::new().with_version("flask", "2.7.0");
    let config = RunConfig {
        policy: Policy::FloorAndCap,
        ..tree.config("requirements.txt")
    };

    sync(config, &env).unwrap();

    tree.assert_content("requirements.txt", "flask>=2.7.0,<3.0.0\n");
}

#[test]
fn floor_and_cap_override_applies_per_package() {
    let tree = RequirementsTree::new().with_file("requirements.txt", "flask\nDjango\n");
    let env = ScriptedEnvironment::new().with_versions(&[("flask", "2.7.0"), ("django", "4.2.11")]);
    let config = RunConfig {
        policy: Policy::FloorAndCap,
        cap: CapStrategy::new(CapRule::NextMajor).with_override("django", CapRule::NextMinor),
        ..tree.config("requirements.txt")
    };

    sync(config, &env).unwrap();

    tree.assert_content(
        "requirements.txt",
        "flask>=2.7.0,<3.0.0\nDjango>=4.2.11,<4.3.0\n",
    );
}

#[test]
fn duplicate_resolution_rewrites_only_later_file() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r a.txt\n-r b.txt\n")
        .with_file("a.txt", "numpy\nrequests\nFoo>=1.0\n")
        .with_file("b.txt", "foo>=1.0\n");
    let env = ScriptedEnvironment::new().with_version("foo", "1.5.0");
    let config = RunConfig {
        last_wins: true,
        ..tree.config("requirements.txt")
    };

    sync(config, &env).unwrap();

    tree.assert_content("a.txt", "numpy\nrequests\nFoo>=1.0\n");
    tree.assert_content("b.txt", "foo>=1.5.0\n");
}

#[test]
fn role_merge_promotes_constraint_to_requirement() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-c shared.txt\n-r shared.txt\n")
        .with_file("shared.txt", "numpy\n");

    let files = resolve_files(&tree.path("requirements.txt"), true).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[1].role, FileRole::Requirement);

    let env = ScriptedEnvironment::new().with_version("numpy", "2.0.0");
    sync(tree.config("requirements.txt"), &env).unwrap();
    tree.assert_content("shared.txt", "numpy>=2.0.0\n");
}

struct FailSecond {
    calls: Cell<usize>,
}

impl FileWriter for FailSecond {
    fn write(&self, path: &Path, text: &str, encoding: TextEncoding) -> reqsync_fs::Result<()> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == 1 {
            return Err(reqsync_fs::Error::io(path, std::io::Error::other("device full")));
        }
        write_text_preserve(path, text, encoding)
    }
}

#[test]
fn rollback_restores_every_file() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-r two.txt\n-r three.txt\none\n")
        .with_bytes("two.txt", b"\xEF\xBB\xBFtwo==0.1\r\n")
        .with_file("three.txt", "three<9\n");
    let originals: Vec<Vec<u8>> = ["requirements.txt", "two.txt", "three.txt"]
        .iter()
        .map(|f| tree.read_bytes(f))
        .collect();
    let env = ScriptedEnvironment::new().with_versions(&[("one", "1.0"), ("two", "2.0"), ("three", "3.0")]);
    let engine = SyncEngine::new(tree.config("requirements.txt")).with_writer(Box::new(FailSecond {
        calls: Cell::new(0),
    }));

    let err = engine.run(&env, &mut VersionCache::new()).unwrap_err();

    assert!(matches!(err, Error::WriteRolledBack { .. }));
    assert_eq!(err.exit_code().code(), 10);
    for (name, original) in ["requirements.txt", "two.txt", "three.txt"].iter().zip(&originals) {
        assert_eq!(&tree.read_bytes(name), original, "{name} not restored");
    }
    // Every file that was touched has a backup; the untouched one has none.
    assert_eq!(tree.backups_of("requirements.txt", ".bak").len(), 1);
    assert_eq!(tree.backups_of("two.txt", ".bak").len(), 1);
    assert!(tree.backups_of("three.txt", ".bak").is_empty());
}

#[test]
fn bom_and_crlf_survive_rewrite() {
    let tree = RequirementsTree::new().with_bytes(
        "requirements.txt",
        b"\xEF\xBB\xBFpandas>=1.0.0\r\n# keep\r\nnumpy\r\n",
    );
    let env = ScriptedEnvironment::new().with_versions(&[("pandas", "2.2.2"), ("numpy", "1.26.4")]);

    sync(tree.config("requirements.txt"), &env).unwrap();

    let bytes = tree.read_bytes("requirements.txt");
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let body = std::str::from_utf8(&bytes[3..]).unwrap();
    assert_eq!(body, "pandas>=2.2.2\r\n# keep\r\nnumpy>=1.26.4\r\n");
    assert!(!body.replace("\r\n", "").contains('\n'));
}

#[test]
fn json_report_matches_result() {
    let tree = RequirementsTree::new()
        .with_file("requirements.txt", "-c pins.txt\npandas>=1.0.0\r\n")
        .with_file("pins.txt", "pandas<3\n");
    let env = ScriptedEnvironment::new().with_version("pandas", "2.2.2");
    let config = RunConfig {
        check: true,
        ..tree.config("requirements.txt")
    };

    let result = sync(config, &env).unwrap();
    let path = write_json_report(&to_json(&result), tree.root()).unwrap();

    assert_eq!(path, tree.root().join("reqsync-report.json"));
    let json: serde_json::Value = serde_json::from_str(&tree.read("reqsync-report.json")).unwrap();
    assert_eq!(json["changed"], true);
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
    assert_eq!(json["files"][1]["role"], "constraint");
    assert_eq!(json["files"][1]["changed"], false);
    assert_eq!(json["changes"][0]["old_line"], "pandas>=1.0.0");
    assert_eq!(json["changes"][0]["new_line"], "pandas>=2.2.2");
    assert_eq!(json["backup_paths"].as_array().unwrap().len(), 0);
    tree.assert_content("requirements.txt", "-c pins.txt\npandas>=1.0.0\r\n");
}
