//! Command: report environment readiness and configuration problems.
use std::path::Path;

use anyhow::Result;

use crate::cli::{CheckOpts, GlobalOpts};
use crate::config::{Config, ParameterDocument};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::orchestrator::{FailureLog, RunOutcome};
use crate::platform::Platform;
use crate::resources::template::{
    DEFAULT_PREFIX_SEGMENTS, PlaceholderTable, Template, collect_templates,
};
use crate::tasks::StageOutcome;
use crate::validation::{self, CheckKind, Readiness};

/// Checks whose failure would abort a provisioning run.
const FATAL: [CheckKind; 3] = [CheckKind::Privilege, CheckKind::Os, CheckKind::Version];

/// Run the check command. Nothing is modified.
///
/// # Errors
///
/// Returns an error if the repository root cannot be resolved.
pub fn run(global: &GlobalOpts, opts: &CheckOpts, log: &Logger) -> Result<RunOutcome> {
    let executor = SystemExecutor;
    let platform = Platform::detect(&executor);

    log.stage("Environment");
    let readiness = validation::environment_readiness(
        &platform,
        &executor,
        !validation::not_privileged(),
        !opts.offline,
    );
    let mut failures = FailureLog::default().with_outcome(&report_readiness(&readiness, log));

    log.stage("Configuration");
    let root = super::resolve_root(global)?;
    log.info(&format!("repository: {}", root.display()));
    let config = match Config::load(&root) {
        Ok(config) => config,
        Err(e) => {
            log.error(&format!("{e:#}"));
            failures = failures.with_outcome(&StageOutcome::Failed(vec![format!("{e:#}")]));
            return Ok(finish(failures, log));
        }
    };
    failures = failures.with_outcome(&check_core_sources(&config, log));

    let params = match global.parameters.as_deref().map(ParameterDocument::load) {
        Some(Ok(params)) => Some(params),
        Some(Err(e)) => {
            log.error(&e.to_string());
            failures = failures.with_outcome(&StageOutcome::Failed(vec![e.to_string()]));
            None
        }
        None => None,
    };

    log.stage("Templates");
    let templates = check_templates(&config.templates_dir(), params.as_ref(), log);
    failures = failures.with_outcome(&templates);

    Ok(finish(failures, log))
}

fn finish(failures: FailureLog, log: &Logger) -> RunOutcome {
    log.print_summary(failures.entries(), None);
    RunOutcome::Completed { failures }
}

/// Log every readiness check; fatal ones that failed become failures.
fn report_readiness(readiness: &Readiness, log: &dyn Log) -> StageOutcome {
    let mut failures = Vec::new();
    for check in &readiness.checks {
        let line = format!("{:?}: {}", check.kind, check.detail);
        if check.passed {
            log.info(&format!("ok {line}"));
        } else if FATAL.contains(&check.kind) {
            log.error(&line);
            failures.push(format!("environment: {line}"));
        } else {
            log.warn(&line);
        }
    }
    if failures.is_empty() {
        StageOutcome::Done
    } else {
        StageOutcome::Failed(failures)
    }
}

/// Every core name must exist in the repository (rendered or committed).
fn check_core_sources(config: &Config, log: &dyn Log) -> StageOutcome {
    let missing: Vec<String> = config
        .links
        .core()
        .into_iter()
        .filter(|name| !validation::path_exists(&config.root.join(name)))
        .collect();
    for name in &missing {
        log.warn(&format!("core source missing: {name}"));
    }
    if missing.is_empty() {
        log.info(&format!("all {} core sources exist", config.links.core().len()));
        StageOutcome::Done
    } else {
        StageOutcome::Failed(
            missing
                .into_iter()
                .map(|name| format!("core source missing: {name}"))
                .collect(),
        )
    }
}

/// Load every template and, with a parameter document, list unresolved
/// placeholders.
fn check_templates(dir: &Path, params: Option<&ParameterDocument>, log: &dyn Log) -> StageOutcome {
    let paths = match collect_templates(dir) {
        Ok(paths) => paths,
        Err(e) => return StageOutcome::Failed(vec![format!("templates: {e}")]),
    };
    if paths.is_empty() {
        log.info("no templates");
        return StageOutcome::NotApplicable;
    }

    let mut failures = Vec::new();
    let mut templates = Vec::new();
    for path in &paths {
        match Template::load(path) {
            Ok(t) => templates.push(t),
            Err(e) => failures.push(format!("template: {e}")),
        }
    }
    let table = PlaceholderTable::build(&templates, DEFAULT_PREFIX_SEGMENTS);
    log.info(&format!(
        "{} template(s), {} placeholder(s)",
        templates.len(),
        table.bindings().len()
    ));

    if let Some(params) = params {
        let check = table.check(params);
        for scope in &check.missing_scopes {
            log.warn(&format!("no parameters for scope '{scope}'"));
        }
        for binding in &check.unresolved {
            log.warn(&format!(
                "unresolved placeholder {} in scope '{}'",
                binding.token, binding.scope
            ));
        }
    }

    if failures.is_empty() {
        StageOutcome::Done
    } else {
        StageOutcome::Failed(failures)
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::links::LinksConfig;
    use crate::config::packages::PackagesConfig;
    use crate::validation::Check;

    fn config(root: &Path, core: &[&str]) -> Config {
        Config {
            root: root.to_path_buf(),
            links: LinksConfig::with_core(core.iter().copied()),
            packages: PackagesConfig::default(),
            apps: Vec::new(),
        }
    }

    #[test]
    fn only_fatal_checks_fail_the_report() {
        let log = Logger::with_log_file(None);
        let readiness = Readiness {
            checks: vec![
                Check {
                    kind: CheckKind::Shell,
                    passed: false,
                    detail: "bash".to_string(),
                },
                Check {
                    kind: CheckKind::Os,
                    passed: false,
                    detail: "linux".to_string(),
                },
            ],
        };
        let StageOutcome::Failed(failures) = report_readiness(&readiness, &log) else {
            panic!("a failed OS check is fatal");
        };
        assert_eq!(failures, vec!["environment: Os: linux"]);
    }

    #[test]
    fn missing_core_sources_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".zshrc"), "").unwrap();
        let log = Logger::with_log_file(None);

        let outcome = check_core_sources(&config(dir.path(), &[".zshrc", ".vimrc"]), &log);
        assert_eq!(
            outcome,
            StageOutcome::Failed(vec!["core source missing: .vimrc".to_string()])
        );
    }

    #[test]
    fn templates_without_directory_are_not_applicable() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::with_log_file(None);
        assert_eq!(
            check_templates(&dir.path().join("templates"), None, &log),
            StageOutcome::NotApplicable
        );
    }

    #[test]
    fn unresolved_placeholders_only_warn() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("template.gitconfig"), "{{GITCONFIG_EMAIL}}").unwrap();
        let log = Logger::with_log_file(None);
        let params = ParameterDocument::empty();
        assert_eq!(
            check_templates(dir.path(), Some(&params), &log),
            StageOutcome::Done
        );
    }
}
