//! Agent launcher.
//!
//! Starts the configured agent command in the worker's source directory and
//! feeds the prompt on stdin. The call returns as soon as the prompt is
//! written; a background task reaps the process and logs its exit.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use dispatch_runtime::{CollaboratorResult, InvokeResult, Invoker};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{IntegrationError, Result};

/// Environment variable carrying the worker slot id.
pub const WORKER_ID_ENV: &str = "AI_WORKER_ID";
/// Environment variable carrying the per-launch id.
pub const INVOCATION_ID_ENV: &str = "AI_INVOCATION_ID";

#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    args: Vec<String>,
}

impl CommandInvoker {
    /// Parses a whitespace-separated command line.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().ok_or(IntegrationError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawns the agent and returns its invocation id.
    pub async fn launch(&self, work_dir: &str, prompt: &str, worker_id: &str) -> Result<String> {
        if !Path::new(work_dir).is_dir() {
            return Err(IntegrationError::Launch {
                program: self.program.clone(),
                message: format!("work dir {} does not exist", work_dir),
            });
        }

        let invocation_id = Uuid::new_v4().to_string();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(work_dir)
            .env(WORKER_ID_ENV, worker_id)
            .env(INVOCATION_ID_ENV, &invocation_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| IntegrationError::Launch {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        // Dropping stdin closes the pipe so the agent sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                warn!(worker_id = %worker_id, error = %e, "failed to write prompt to agent");
            }
        }

        info!(
            worker_id = %worker_id,
            invocation_id = %invocation_id,
            program = %self.program,
            work_dir = %work_dir,
            "agent started"
        );

        let worker = worker_id.to_string();
        let id = invocation_id.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    debug!(worker_id = %worker, invocation_id = %id, status = %status, "agent exited")
                }
                Err(e) => warn!(worker_id = %worker, invocation_id = %id, error = %e, "agent wait failed"),
            }
        });

        Ok(invocation_id)
    }
}

#[async_trait]
impl Invoker for CommandInvoker {
    async fn invoke_plan(
        &self,
        work_dir: &str,
        prompt: &str,
        worker_id: &str,
    ) -> CollaboratorResult<InvokeResult> {
        self.launch(work_dir, prompt, worker_id).await?;
        Ok(InvokeResult::new(work_dir, prompt))
    }
}
