// SPDX-License-Identifier: MIT

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::adk::error::AdapterError;
use crate::adk::tool::{SearchOutput, SearchRequest, Searcher};

const QUERY_CHARS: usize = 100;

/// Web search through the `psearch` command line tool
///
/// Progress lines printed by the tool are logged as they arrive; the full
/// stdout is returned once the process exits.
#[derive(Debug, Clone)]
pub struct PsearchTool {
    program: String,
    result_count: u32,
    timeout: Duration,
    result_limit: usize,
}

impl Default for PsearchTool {
    fn default() -> Self {
        Self {
            program: "psearch".to_string(),
            result_count: 5,
            timeout: Duration::from_secs(120),
            result_limit: 2000,
        }
    }
}

impl PsearchTool {
    pub fn new(program: impl Into<String>, timeout: Duration, result_limit: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            result_limit,
            ..Self::default()
        }
    }

    /// Arguments passed to the program for `request`
    pub fn build_args(&self, request: &SearchRequest) -> Vec<String> {
        let query: String = request.query.chars().take(QUERY_CHARS).collect();
        let mut args = vec![
            "search".to_string(),
            query,
            "-n".to_string(),
            self.result_count.to_string(),
            "-c".to_string(),
            "--json".to_string(),
        ];

        if request.recent {
            args.push("-r".to_string());
            if request.days_limit > 30 {
                let months = (request.days_limit / 30).max(1);
                args.push("--months".to_string());
                args.push(months.to_string());
            }
            args.push("-s".to_string());
        }

        args
    }

    async fn execute(&self, args: &[String]) -> Result<(String, Option<i32>), AdapterError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::EmptyResponse(format!("{} stdout", self.program)))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AdapterError::EmptyResponse(format!("{} stderr", self.program)))?;

        let program = self.program.as_str();
        let read_stdout = async move {
            let mut reader = BufReader::new(stdout);
            let mut captured = String::new();
            let mut buf = Vec::new();
            while reader.read_until(b'\n', &mut buf).await? > 0 {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                log::info!("[{}] {}", program, line);
                captured.push_str(&line);
                captured.push('\n');
                buf.clear();
            }
            Ok::<_, std::io::Error>(captured)
        };
        let read_stderr = async move {
            let mut buf = Vec::new();
            BufReader::new(stderr).read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
        };

        let (out, err) = tokio::try_join!(read_stdout, read_stderr)?;
        let status = child.wait().await?;

        if !status.success() {
            return Err(AdapterError::ProcessFailed {
                command: self.program.clone(),
                code: status.code(),
                stderr: err.trim().to_string(),
            });
        }

        Ok((out, status.code()))
    }
}

#[async_trait]
impl Searcher for PsearchTool {
    fn name(&self) -> &str {
        &self.program
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchOutput, AdapterError> {
        let args = self.build_args(request);
        log::info!("Running {} {}", self.program, args.join(" "));

        let started = Instant::now();
        let (text, exit_code) = tokio::time::timeout(self.timeout, self.execute(&args))
            .await
            .map_err(|_| AdapterError::Timeout {
                command: self.program.clone(),
                secs: self.timeout.as_secs(),
            })??;

        let text = match text.char_indices().nth(self.result_limit) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text,
        };

        Ok(SearchOutput {
            text,
            exit_code,
            elapsed: started.elapsed(),
        })
    }
}
