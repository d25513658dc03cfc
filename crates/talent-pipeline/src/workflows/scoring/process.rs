use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ScoreProvider, ScoreReport, ScoreRequest, ScoringError};

/// Runs the scoring script as a child process and parses its JSON answer from stdout.
#[derive(Debug, Clone)]
pub struct ProcessScoreProvider {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl ProcessScoreProvider {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            timeout,
        }
    }

    pub(crate) fn arguments(&self, request: &ScoreRequest) -> Vec<String> {
        let mut args = vec![
            self.script.display().to_string(),
            "--cv".to_string(),
            request.profile_text.clone(),
            "--job-title".to_string(),
            request.title.clone(),
            "--job-description".to_string(),
            request.description.clone(),
        ];

        if let Some(requirements) = request
            .requirements
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            args.push("--job-requirements".to_string());
            args.push(requirements.to_string());
        }

        if !request.skills.is_empty() {
            args.push("--job-skills".to_string());
            args.push(request.skills.join(","));
        }

        if let Some(years) = request.experience_years {
            args.push("--experience".to_string());
            args.push(years.to_string());
        }

        args
    }
}

#[async_trait]
impl ScoreProvider for ProcessScoreProvider {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, ScoringError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|err| ScoringError::Spawn(err.to_string()))?;

        debug!(program = %self.program, title = %request.title, "scorer started");

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScoringError::Timeout(self.timeout))?
            .map_err(|err| ScoringError::Spawn(err.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(code = ?output.status.code(), %stderr, "scorer failed");
            return Err(ScoringError::Process {
                code: output.status.code(),
                stderr,
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|err| ScoringError::Parse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScoreRequest {
        ScoreRequest {
            profile_text: "Senior Rust engineer".to_string(),
            title: "Backend Engineer".to_string(),
            description: "Build services".to_string(),
            requirements: Some("5 years".to_string()),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            experience_years: Some(5),
        }
    }

    #[test]
    fn arguments_include_optional_flags_when_present() {
        let provider = ProcessScoreProvider::new("python3", "matcher.py", Duration::from_secs(5));
        let args = provider.arguments(&request());
        assert_eq!(args[0], "matcher.py");
        assert!(args.windows(2).any(|pair| pair == ["--job-skills", "Rust,SQL"]));
        assert!(args.windows(2).any(|pair| pair == ["--experience", "5"]));
        assert!(args.windows(2).any(|pair| pair == ["--job-requirements", "5 years"]));
    }

    #[test]
    fn arguments_skip_empty_optional_flags() {
        let provider = ProcessScoreProvider::new("python3", "matcher.py", Duration::from_secs(5));
        let mut request = request();
        request.requirements = Some("  ".to_string());
        request.skills.clear();
        request.experience_years = None;
        let args = provider.arguments(&request);
        assert_eq!(args.len(), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn parses_stdout_of_successful_process() {
        let dir = tempfile::tempdir().expect("temp dir");
        let script = dir.path().join("matcher.sh");
        std::fs::write(
            &script,
            "echo '{\"overall_match_percentage\": 72.5, \"strengths\": [\"Rust\"]}'\n",
        )
        .expect("script written");

        let provider = ProcessScoreProvider::new("sh", &script, Duration::from_secs(5));
        let report = provider.score(&request()).await.expect("scorer answers");
        assert_eq!(report.overall_match_percentage, 72.5);
        assert_eq!(report.strengths, vec!["Rust".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_non_zero_exit_codes() {
        let provider = ProcessScoreProvider::new("false", "", Duration::from_secs(5));
        match provider.score(&request()).await {
            Err(ScoringError::Process { .. }) => {}
            other => panic!("expected process failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reports_missing_programs_as_spawn_errors() {
        let provider = ProcessScoreProvider::new(
            "definitely-not-a-real-scorer-binary",
            "matcher.py",
            Duration::from_secs(5),
        );
        match provider.score(&request()).await {
            Err(ScoringError::Spawn(_)) => {}
            other => panic!("expected spawn failure, got {other:?}"),
        }
    }
}
