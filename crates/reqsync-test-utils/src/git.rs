//! Git repository fixtures at three realism levels.
//!
//! Choose the lowest-realism fixture that satisfies your test's needs.

use std::fs;
use std::path::Path;

/// Creates a minimal `.git` directory structure without initialising a real
/// repository.
///
/// Realism level: **FAKE**. `git2::Repository::discover` will not accept
/// it, so the dirty-repo gate treats the directory as "not a repository".
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn fake_git_dir(path: &Path) {
    fs::create_dir(path.join(".git"))
        .unwrap_or_else(|e| panic!("fake_git_dir: failed to create .git: {e}"));
    fs::write(path.join(".git/HEAD"), "ref: refs/heads/main\n")
        .unwrap_or_else(|e| panic!("fake_git_dir: failed to write HEAD: {e}"));
}

/// Initialises a real git repository using `git2` (no commits).
///
/// Realism level: **REAL**. Every file in the directory shows up as
/// untracked, so the repository is dirty as soon as it holds a file.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> git2::Repository {
    git2::Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Initialises a repository and commits everything currently in `path`.
///
/// Realism level: **REAL WITH HISTORY**. The working tree is clean right
/// after this returns.
///
/// # Panics
/// Panics if any git operation fails.
pub fn committed_git_repo(path: &Path) -> git2::Repository {
    let repo = real_git_repo(path);
    {
        let mut index = repo
            .index()
            .unwrap_or_else(|e| panic!("committed_git_repo: no index: {e}"));
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap_or_else(|e| panic!("committed_git_repo: add failed: {e}"));
        index
            .write()
            .unwrap_or_else(|e| panic!("committed_git_repo: index write failed: {e}"));
        let tree_id = index
            .write_tree()
            .unwrap_or_else(|e| panic!("committed_git_repo: write_tree failed: {e}"));
        let tree = repo
            .find_tree(tree_id)
            .unwrap_or_else(|e| panic!("committed_git_repo: find_tree failed: {e}"));
        let signature = git2::Signature::now("Test User", "test@test.com")
            .unwrap_or_else(|e| panic!("committed_git_repo: signature failed: {e}"));
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            "Initial commit",
            &tree,
            &[],
        )
        .unwrap_or_else(|e| panic!("committed_git_repo: commit failed: {e}"));
    }
    repo
}
