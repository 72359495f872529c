#![cfg(unix)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for linking with backups.
//!
//! These drive the link stages and the linker through the public API against
//! a scratch repository and home directory.

mod common;

use common::{TestContextBuilder, params};
use dotstrap::orchestrator::Orchestrator;
use dotstrap::resources::symlink::{LinkCategory, LinkOutcome, LinkSpec, Linker, discover};
use dotstrap::tasks::links::{LinkCore, LinkDiscovered};
use dotstrap::tasks::{self, Stage, StageOutcome};

fn link_stages() -> Orchestrator {
    Orchestrator::new(vec![
        Box::new(LinkCore) as Box<dyn Stage>,
        Box::new(LinkDiscovered),
    ])
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

/// A second run over an unchanged system links nothing and backs up nothing.
#[test]
fn second_run_is_a_no_op() {
    let ctx = TestContextBuilder::new()
        .with_core(&[".zshrc", ".vimrc"])
        .with_repo_file(".zshrc", "zsh")
        .with_repo_file(".vimrc", "vim")
        .build();

    let (first, _log) = ctx.context(None);
    assert_eq!(link_stages().run(&first).exit_code(), 0);
    assert!(first.backup.dir().is_none());

    let session = ctx.session();
    let specs: Vec<LinkSpec> = [".zshrc", ".vimrc"]
        .iter()
        .map(|n| LinkSpec::new(n, LinkCategory::Core, &ctx.root, &ctx.home))
        .collect();
    let report = Linker::new(&session).link_many(&specs);

    assert_eq!(report.linked(), 0);
    assert_eq!(report.skipped(), 2);
    assert!(session.dir().is_none());
    assert!(!ctx.backup_dir().exists());
}

// ---------------------------------------------------------------------------
// No data loss
// ---------------------------------------------------------------------------

/// A regular file in the way ends up in the backup session unchanged.
#[test]
fn displaced_file_is_backed_up_verbatim() {
    let ctx = TestContextBuilder::new()
        .with_core(&[".zshrc"])
        .with_repo_file(".zshrc", "new")
        .with_home_file(".zshrc", "precious local edits")
        .build();

    let (stage_ctx, _log) = ctx.context(None);
    assert_eq!(tasks::execute(&LinkCore, &stage_ctx), StageOutcome::Done);

    assert_eq!(ctx.read_home(".zshrc"), "new");
    assert_eq!(
        std::fs::read_to_string(ctx.backup_dir().join(".zshrc")).unwrap(),
        "precious local edits"
    );
}

/// A directory in the way is moved whole, contents intact.
#[test]
fn displaced_directory_is_backed_up_whole() {
    let ctx = TestContextBuilder::new()
        .with_core(&[".config"])
        .with_repo_file(".config/app.toml", "repo")
        .with_home_file(".config/app.toml", "local")
        .with_home_file(".config/nested/deep", "deep")
        .build();

    let (stage_ctx, _log) = ctx.context(None);
    assert_eq!(tasks::execute(&LinkCore, &stage_ctx), StageOutcome::Done);

    let backup = ctx.backup_dir().join(".config");
    assert_eq!(std::fs::read_to_string(backup.join("app.toml")).unwrap(), "local");
    assert_eq!(std::fs::read_to_string(backup.join("nested/deep")).unwrap(), "deep");
    assert_eq!(ctx.read_home(".config/app.toml"), "repo");
}

/// A link pointing elsewhere is itself backed up and replaced.
#[test]
fn wrong_symlink_is_replaced() {
    let ctx = TestContextBuilder::new()
        .with_repo_file(".vimrc", "ours")
        .with_home_file("elsewhere", "theirs")
        .build();
    std::os::unix::fs::symlink(ctx.home.join("elsewhere"), ctx.home.join(".vimrc")).unwrap();

    let session = ctx.session();
    let outcome = Linker::new(&session)
        .ensure_link(&ctx.root.join(".vimrc"), &ctx.home.join(".vimrc"))
        .unwrap();

    assert!(matches!(outcome, LinkOutcome::Linked { backup: Some(_) }));
    assert_eq!(ctx.read_home(".vimrc"), "ours");
    assert_eq!(
        std::fs::read_link(ctx.backup_dir().join(".vimrc")).unwrap(),
        ctx.home.join("elsewhere")
    );
    assert_eq!(ctx.read_home("elsewhere"), "theirs");
}

// ---------------------------------------------------------------------------
// Partial-failure isolation
// ---------------------------------------------------------------------------

/// One missing source fails only its own link.
#[test]
fn missing_source_does_not_block_others() {
    let ctx = TestContextBuilder::new()
        .with_core(&[".zshrc", ".missing", ".vimrc"])
        .with_repo_file(".zshrc", "zsh")
        .with_repo_file(".vimrc", "vim")
        .build();

    let (stage_ctx, _log) = ctx.context(None);
    let outcome = link_stages().run(&stage_ctx);

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(ctx.read_home(".zshrc"), "zsh");
    assert_eq!(ctx.read_home(".vimrc"), "vim");
    assert!(ctx.home.join(".missing").symlink_metadata().is_err());
}

// ---------------------------------------------------------------------------
// Discovery exclusion
// ---------------------------------------------------------------------------

/// Version-control entries, Finder metadata, core names and configured
/// exclusions are never offered.
#[test]
fn discovery_excludes_reserved_and_core_names() {
    let ctx = TestContextBuilder::new()
        .with_config_file(
            "links.toml",
            "core = [\".zshrc\"]\nexclude = [\".secret\"]\n",
        )
        .with_repo_file(".zshrc", "")
        .with_repo_file(".git/HEAD", "ref")
        .with_repo_file(".gitmodules", "")
        .with_repo_file(".DS_Store", "")
        .with_repo_file(".secret", "")
        .with_repo_file(".aliases", "")
        .with_repo_file(".inputrc", "")
        .with_repo_file("README.md", "")
        .build();
    let config = ctx.load_config();

    let found = discover(&ctx.root, &config.links.core(), &config.links.exclude).unwrap();

    assert_eq!(found, vec![".aliases", ".inputrc"]);
}

/// With the flag set, discovered entries are linked without prompting.
#[test]
fn discovered_entries_follow_the_flag() {
    let ctx = TestContextBuilder::new()
        .with_core(&[])
        .with_repo_file(".aliases", "alias ll='ls -l'")
        .build();

    let (declined, _log) = ctx.context(None);
    assert_eq!(tasks::execute(&LinkDiscovered, &declined), StageOutcome::Declined);
    assert!(ctx.home.join(".aliases").symlink_metadata().is_err());

    let (accepted, _log) = ctx.context(Some(params(r#"{"linkDiscovered": true}"#)));
    assert_eq!(tasks::execute(&LinkDiscovered, &accepted), StageOutcome::Done);
    assert_eq!(ctx.read_home(".aliases"), "alias ll='ls -l'");
}
