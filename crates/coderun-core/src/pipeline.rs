//! Execution pipeline
//!
//! `resolve -> workspace -> write source -> [compile] -> run -> classify -> release`
//!
//! Every failure becomes an [`ExecutionOutcome`]; nothing escapes as an error.
//! The workspace is released on every path, including a panicking phase.

use crate::language::{LanguageProfile, LanguageTable};
use crate::outcome::{classify, ExecutionOutcome};
use crate::runner::ProcessRunner;
use crate::workspace::Workspace;
use crate::{ExecutionConfig, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One request to compile and run a piece of source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Language identifier, matched case-insensitively
    pub language: String,
    /// Source text, written verbatim
    pub code: String,
    /// Standard input for the run phase
    #[serde(default)]
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            stdin: String::new(),
        }
    }

    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    config: Arc<ExecutionConfig>,
    languages: Arc<LanguageTable>,
    runner: ProcessRunner,
}

impl Executor {
    /// Executor over the built-in language table
    pub fn new(config: ExecutionConfig) -> Self {
        Self::with_languages(config, LanguageTable::builtin())
    }

    pub fn with_languages(config: ExecutionConfig, languages: Arc<LanguageTable>) -> Self {
        let runner = ProcessRunner::new(&config);
        Self {
            config: Arc::new(config),
            languages,
            runner,
        }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    /// Run `request` to completion and classify the result
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let language = request.language.clone();
        tracing::info!(
            language = %language,
            code_len = request.code.len(),
            stdin_len = request.stdin.len(),
            "execution requested"
        );

        let executor = self.clone();
        let outcome = match tokio::spawn(async move { executor.pipeline(&request).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(language = %language, error = %e, "execution task failed");
                ExecutionOutcome::internal_error(format!("Execution failed: {e}"))
            }
        };

        tracing::info!(
            language = %language,
            status = %outcome.status,
            elapsed_ms = outcome.execution_time_ms,
            "execution completed"
        );
        outcome
    }

    async fn pipeline(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        let profile = match self.languages.resolve(&request.language) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting request");
                return ExecutionOutcome::internal_error(format!(
                    "Unsupported language: {}",
                    request.language
                ));
            }
        };

        let workspace = match Workspace::acquire(&self.config.temp_root) {
            Ok(workspace) => workspace,
            Err(e) => {
                tracing::error!(error = %e, "cannot create workspace");
                return ExecutionOutcome::internal_error(format!("Execution failed: {e}"));
            }
        };

        let outcome = match self.phases(profile, &workspace, request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(language = %profile.id, error = %e, "execution error");
                ExecutionOutcome::internal_error(format!("Execution failed: {e}"))
            }
        };

        workspace.release();
        outcome
    }

    async fn phases(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
        request: &ExecutionRequest,
    ) -> Result<ExecutionOutcome> {
        let work_dir = workspace.root();
        let file_name = profile.file_name(&request.code);
        let source = workspace.write_source(&file_name, &request.code)?;

        if profile.requires_compilation {
            let compile = profile.compile_command(&source, work_dir);
            if !compile.is_empty() {
                let result = self
                    .runner
                    .run(&compile, work_dir, "", self.config.timeout)
                    .await?;

                if result.timed_out {
                    return Ok(ExecutionOutcome::compile_timeout(result.duration));
                }
                if result.exit_code != 0 {
                    // Some compilers (tsc) report diagnostics on stdout.
                    let diagnostics = if result.stderr.trim().is_empty() {
                        result.stdout
                    } else {
                        result.stderr
                    };
                    return Ok(ExecutionOutcome::compile_error(diagnostics, result.duration));
                }
            }
        }

        let run = profile.run_command(&source, work_dir, self.config.memory_limit)?;
        let result = self
            .runner
            .run(&run, work_dir, &request.stdin, self.config.timeout)
            .await?;

        Ok(classify(result, self.config.max_output_size))
    }
}
