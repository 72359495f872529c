use anyhow::{Context as _, Result};

use super::{Context, Stage, StageOutcome};
use crate::resources::template::{
    DEFAULT_PREFIX_SEGMENTS, PlaceholderTable, Renderer, Template, collect_templates, output_path,
};

/// Render `templates/template.<scope>` into `<root>/.<scope>`.
#[derive(Debug)]
pub struct RenderTemplates;

impl Stage for RenderTemplates {
    fn name(&self) -> &str {
        "Render templates"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        collect_templates(&ctx.config.templates_dir()).map_or(true, |t| !t.is_empty())
    }

    fn run(&self, ctx: &Context) -> Result<StageOutcome> {
        if !ctx.confirm("Render configuration templates?", ctx.parameters_supplied)? {
            return Ok(StageOutcome::Declined);
        }

        let dir = ctx.config.templates_dir();
        let paths = collect_templates(&dir)
            .with_context(|| format!("reading templates from {}", dir.display()))?;

        let mut failures = Vec::new();
        let mut templates = Vec::new();
        for path in &paths {
            match Template::load(path) {
                Ok(template) => templates.push(template),
                Err(e) => {
                    ctx.log.error(&e.to_string());
                    failures.push(format!("template: {e}"));
                }
            }
        }

        let renderer = Renderer::new(DEFAULT_PREFIX_SEGMENTS, ctx.strict_templates());
        let check =
            PlaceholderTable::build(&templates, renderer.prefix_segments()).check(&ctx.params);
        let mut issues = Vec::new();
        for scope in &check.missing_scopes {
            issues.push(format!("no parameters for scope '{scope}'"));
        }
        for binding in &check.unresolved {
            issues.push(format!(
                "unresolved placeholder {} in scope '{}'",
                binding.token, binding.scope
            ));
        }

        if renderer.is_strict() && !issues.is_empty() {
            for issue in &issues {
                ctx.log.error(issue);
            }
            ctx.log.error("strict mode: no template was written");
            failures.extend(issues.into_iter().map(|issue| format!("template: {issue}")));
            return Ok(StageOutcome::Failed(failures));
        }
        for issue in &issues {
            ctx.log.warn(issue);
        }

        let mut rendered = 0usize;
        for template in &templates {
            if check.missing_scopes.contains(&template.scope) {
                ctx.log.debug(&format!("skipping {}", template.path.display()));
                continue;
            }
            let output = output_path(ctx.root(), &template.scope);
            match renderer.render(template, &output, &ctx.params) {
                Ok(written) => {
                    rendered += 1;
                    ctx.log.debug(&format!(
                        "rendered {} -> {} ({} unresolved)",
                        template.path.display(),
                        written.output.display(),
                        written.unresolved.len()
                    ));
                }
                Err(e) => {
                    ctx.log.error(&e.to_string());
                    failures.push(format!("template {}: {e}", template.scope));
                }
            }
        }

        ctx.log.info(&format!(
            "{rendered} rendered, {} with unresolved placeholders",
            check
                .unresolved
                .iter()
                .map(|b| &b.template)
                .collect::<std::collections::BTreeSet<_>>()
                .len()
        ));

        if failures.is_empty() {
            Ok(StageOutcome::Done)
        } else {
            Ok(StageOutcome::Failed(failures))
        }
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
    use crate::config::ParameterDocument;
    use crate::tasks::test_helpers::Sandbox;

    fn params(json: &str) -> ParameterDocument {
        ParameterDocument::from_json("test", json).unwrap()
    }

    #[test]
    fn not_applicable_without_templates() {
        let sandbox = Sandbox::new();
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        assert!(!RenderTemplates.should_run(&ctx));
    }

    #[test]
    fn declined_without_parameters_in_preset_mode() {
        let sandbox = Sandbox::new();
        sandbox.repo_file("templates/template.gitconfig", "{{GIT_USER_NAME}}");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));

        assert!(RenderTemplates.should_run(&ctx));
        assert_eq!(RenderTemplates.run(&ctx).unwrap(), StageOutcome::Declined);
        assert!(!sandbox.root.join(".gitconfig").exists());
    }

    #[test]
    fn renders_every_template_with_parameters() {
        let sandbox = Sandbox::new();
        sandbox.repo_file("templates/template.gitconfig", "name = {{GITCONFIG_USER_NAME}}\n");
        sandbox.repo_file("templates/template.zshrc", "export EDITOR={{ZSHRC_EDITOR}}\n");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx.with_parameters(params(
            r#"{"gitconfig": {"userName": "Ada"}, "zshrc": {"editor": "vim"}}"#,
        ));

        assert_eq!(RenderTemplates.run(&ctx).unwrap(), StageOutcome::Done);
        assert_eq!(
            std::fs::read_to_string(sandbox.root.join(".gitconfig")).unwrap(),
            "name = Ada\n"
        );
        assert_eq!(
            std::fs::read_to_string(sandbox.root.join(".zshrc")).unwrap(),
            "export EDITOR=vim\n"
        );
    }

    #[test]
    fn permissive_mode_writes_with_unresolved() {
        let sandbox = Sandbox::new();
        sandbox.repo_file("templates/template.gitconfig", "{{GITCONFIG_USER_EMAIL}}");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx.with_parameters(params(r#"{"gitconfig": {}}"#));

        assert_eq!(RenderTemplates.run(&ctx).unwrap(), StageOutcome::Done);
        assert_eq!(
            std::fs::read_to_string(sandbox.root.join(".gitconfig")).unwrap(),
            "{{GITCONFIG_USER_EMAIL}}"
        );
    }

    #[test]
    fn template_without_scope_is_skipped() {
        let sandbox = Sandbox::new();
        sandbox.repo_file("templates/template.gitconfig", "name = {{GITCONFIG_USER_NAME}}\n");
        sandbox.repo_file("templates/template.zshrc", "export EDITOR={{ZSHRC_EDITOR}}\n");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx.with_parameters(params(r#"{"zshrc": {"editor": "vim"}}"#));

        assert_eq!(RenderTemplates.run(&ctx).unwrap(), StageOutcome::Done);
        assert!(!sandbox.root.join(".gitconfig").exists());
        assert!(sandbox.root.join(".zshrc").exists());
    }

    #[test]
    fn strict_mode_fails_before_writing_anything() {
        let sandbox = Sandbox::new();
        sandbox.repo_file("templates/template.a", "{{A_OK}}");
        sandbox.repo_file("templates/template.b", "{{B_MISSING}}");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx
            .with_parameters(params(r#"{"a": {"ok": "1"}, "b": {}}"#))
            .with_strict(true);

        let StageOutcome::Failed(failures) = RenderTemplates.run(&ctx).unwrap() else {
            panic!("strict mode should fail");
        };
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("{{B_MISSING}}"));
        assert!(!sandbox.root.join(".a").exists());
        assert!(!sandbox.root.join(".b").exists());
    }

    #[test]
    fn strict_flag_in_parameters_enables_strict_mode() {
        let sandbox = Sandbox::new();
        sandbox.repo_file("templates/template.a", "{{A_X}}");
        let (ctx, _log) = sandbox.quiet_context(sandbox.config(&[]));
        let ctx = ctx.with_parameters(params(r#"{"strictTemplates": true}"#));

        assert!(matches!(RenderTemplates.run(&ctx).unwrap(), StageOutcome::Failed(_)));
    }
}
