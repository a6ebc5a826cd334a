//! External-process driver for declaratively authored CLI skills.
//!
//! Lets skills be shipped as JSON without new code in this crate, while
//! keeping the [`Driver`] contract. Argument templates are rendered with
//! `{{input}}`, `{{output}}` and `{{<param>}}` placeholders.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use atelier_skills::permissions::{PERM_TOOLS_EXEC, PERM_TOOLS_EXEC_ANY};
use atelier_skills::types::{ExecutorSpec, ParamMap, Skill, SkillSource};

use crate::errors::DriverError;
use crate::{Driver, ProgressFn};

/// Conservative default allowlist for untrusted community skills.
const DEFAULT_ALLOWED_COMMANDS: &[&str] = &["ffmpeg", "magick", "convert", "identify"];

/// Executes `cli`-type skills via `tokio::process::Command`.
pub struct CliDriver {
    /// Commands community skills may run under the base `tools.exec`
    /// permission. Anything else requires the elevated `tools.exec.any`.
    allowed_commands: Vec<String>,
}

impl Default for CliDriver {
    fn default() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl CliDriver {
    /// Driver with a custom community allowlist.
    pub fn with_allowlist(allowed_commands: Vec<String>) -> Self {
        Self { allowed_commands }
    }

    fn allowed(&self, command_base: &str) -> bool {
        self.allowed_commands
            .iter()
            .any(|a| a.eq_ignore_ascii_case(command_base))
    }
}

#[async_trait]
impl Driver for CliDriver {
    fn id(&self) -> &'static str {
        "cli"
    }

    fn supports(&self, skill: &Skill) -> bool {
        skill.driver == self.id() || matches!(skill.executor, ExecutorSpec::Cli { .. })
    }

    async fn execute(
        &self,
        input: &Path,
        output: &Path,
        skill: &Skill,
        params: &ParamMap,
        progress: Option<ProgressFn>,
    ) -> Result<(), DriverError> {
        let ExecutorSpec::Cli {
            command,
            args,
            timeout_ms,
            ..
        } = &skill.executor
        else {
            return Err(DriverError::Unsupported(
                "cli driver requires executor.type=cli".to_string(),
            ));
        };
        if command.trim().is_empty() {
            return Err(DriverError::Unsupported(
                "cli driver requires executor.command".to_string(),
            ));
        }
        if !skill.permissions.iter().any(|p| p == PERM_TOOLS_EXEC) {
            return Err(DriverError::MissingPermission(PERM_TOOLS_EXEC.to_string()));
        }

        let command_base = Path::new(command)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(command)
            .to_lowercase();
        let allow_any = skill.permissions.iter().any(|p| p == PERM_TOOLS_EXEC_ANY);
        if skill.source == SkillSource::Community && !allow_any && !self.allowed(&command_base) {
            return Err(DriverError::CommandNotAllowed {
                permission: PERM_TOOLS_EXEC_ANY.to_string(),
                command: command_base,
            });
        }

        let rendered: Vec<String> = args
            .iter()
            .map(|a| render_template(a, input, output, params))
            .collect();
        debug!(skill = %skill.id, command = %command, "Running cli skill");

        let mut cmd = tokio::process::Command::new(command);
        let _ = cmd
            .args(&rendered)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            // Dropping the in-flight future (timeout) must not leak the child.
            .kill_on_drop(true);

        if let Some(progress) = &progress {
            progress(0.2);
        }

        let run = cmd.output();
        let result = match timeout_ms {
            Some(ms) if *ms > 0 => match tokio::time::timeout(Duration::from_millis(*ms), run).await
            {
                Ok(result) => result,
                Err(_) => return Err(DriverError::Timeout { timeout_ms: *ms }),
            },
            _ => run.await,
        };
        let out = result?;

        if let Some(progress) = &progress {
            progress(1.0);
        }

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let stdout = String::from_utf8_lossy(&out.stdout);
            let mut text = stderr.trim();
            if text.is_empty() {
                text = stdout.trim();
            }
            let message = if text.is_empty() {
                out.status.to_string()
            } else {
                text.to_string()
            };
            return Err(DriverError::CommandFailed(message));
        }
        Ok(())
    }
}

/// Render one argument template.
fn render_template(template: &str, input: &Path, output: &Path, params: &ParamMap) -> String {
    let mut out = template
        .replace("{{input}}", &input.to_string_lossy())
        .replace("{{output}}", &output.to_string_lossy());
    for (key, value) in params {
        let placeholder = format!("{{{{{key}}}}}");
        if !out.contains(&placeholder) {
            continue;
        }
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&placeholder, &rendered);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_skills::types::ParamMap;
    use tempfile::TempDir;

    fn cli_skill(command: &str, args: &[&str], source: SkillSource, perms: &[&str]) -> Skill {
        Skill {
            id: "cli-test".into(),
            name: "Cli Test".into(),
            version: "1.0.0".into(),
            driver: "cli".into(),
            executor: ExecutorSpec::Cli {
                command: command.into(),
                args: args.iter().map(|a| (*a).to_string()).collect(),
                output_extension: None,
                timeout_ms: None,
            },
            permissions: perms.iter().map(|p| (*p).to_string()).collect(),
            source,
            ..Skill::default()
        }
    }

    fn params_with(key: &str, value: serde_json::Value) -> ParamMap {
        let mut params = ParamMap::new();
        let _ = params.insert(key.to_string(), value);
        params
    }

    #[test]
    fn test_render_template_substitutes_paths_and_params() {
        let params = params_with("percent", serde_json::json!(50));
        let rendered = render_template(
            "-resize={{percent}}%:{{input}}>{{output}}",
            Path::new("/in.png"),
            Path::new("/out.png"),
            &params,
        );
        assert_eq!(rendered, "-resize=50%:/in.png>/out.png");
    }

    #[test]
    fn test_render_template_string_param_unquoted() {
        let params = params_with("mode", serde_json::json!("fast"));
        let rendered = render_template("{{mode}}", Path::new("/i"), Path::new("/o"), &params);
        assert_eq!(rendered, "fast");
    }

    #[tokio::test]
    async fn test_execute_copies_via_external_command() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.txt");
        let output = tmp.path().join("out.txt");
        std::fs::write(&input, b"payload").unwrap();

        let skill = cli_skill(
            "cp",
            &["{{input}}", "{{output}}"],
            SkillSource::CoreEmbedded,
            &[PERM_TOOLS_EXEC],
        );
        CliDriver::default()
            .execute(&input, &output, &skill, &ParamMap::new(), None)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"payload");
        // Input must be untouched.
        assert_eq!(std::fs::read(&input).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_missing_tools_exec_permission_rejected() {
        let skill = cli_skill("cp", &[], SkillSource::CoreEmbedded, &[]);
        let err = CliDriver::default()
            .execute(Path::new("/i"), Path::new("/o"), &skill, &ParamMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::MissingPermission(_)));
    }

    #[tokio::test]
    async fn test_community_skill_outside_allowlist_rejected() {
        let skill = cli_skill("cp", &[], SkillSource::Community, &[PERM_TOOLS_EXEC]);
        let err = CliDriver::default()
            .execute(Path::new("/i"), Path::new("/o"), &skill, &ParamMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::CommandNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_community_skill_with_exec_any_allowed() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.txt");
        let output = tmp.path().join("out.txt");
        std::fs::write(&input, b"x").unwrap();

        let skill = cli_skill(
            "cp",
            &["{{input}}", "{{output}}"],
            SkillSource::Community,
            &[PERM_TOOLS_EXEC, PERM_TOOLS_EXEC_ANY],
        );
        CliDriver::default()
            .execute(&input, &output, &skill, &ParamMap::new(), None)
            .await
            .unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_failed_command_surfaces_stderr() {
        let skill = cli_skill(
            "cp",
            &["/definitely/not/there", "{{output}}"],
            SkillSource::CoreEmbedded,
            &[PERM_TOOLS_EXEC],
        );
        let err = CliDriver::default()
            .execute(Path::new("/i"), Path::new("/o/x"), &skill, &ParamMap::new(), None)
            .await
            .unwrap_err();
        match err {
            DriverError::CommandFailed(message) => assert!(!message.is_empty()),
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_slow_command() {
        let mut skill = cli_skill("sleep", &["5"], SkillSource::CoreEmbedded, &[PERM_TOOLS_EXEC]);
        if let ExecutorSpec::Cli { timeout_ms, .. } = &mut skill.executor {
            *timeout_ms = Some(100);
        }
        let start = std::time::Instant::now();
        let err = CliDriver::default()
            .execute(Path::new("/i"), Path::new("/o"), &skill, &ParamMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Timeout { timeout_ms: 100 }));
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
