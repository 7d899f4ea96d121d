//! Scripted collaborators for pipeline tests.

use crate::external::{CommandError, CommandExecutor, CommandOutput};
use crate::github::{
    CreatedRepository, GitHubError, GitTagObject, HostingApi, LabelSpec, OrganizationInfo,
    TagObjectRequest,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

struct Rule {
    pattern: String,
    response: Result<CommandOutput, CommandError>,
    delay: Option<Duration>,
}

/// Executor answering by the first rule whose pattern occurs in the command
/// line; unmatched commands succeed with empty output.
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, pattern: &str, response: Result<CommandOutput, CommandError>, delay: Option<Duration>) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            response,
            delay,
        });
    }

    pub fn respond(&self, pattern: &str, status_code: i32, stdout: &str, stderr: &str) {
        self.push(
            pattern,
            Ok(CommandOutput {
                status_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
            None,
        );
    }

    pub fn fail_with_not_found(&self, pattern: &str) {
        self.push(
            pattern,
            Err(CommandError::CommandNotFound {
                command: "git".to_string(),
            }),
            None,
        );
    }

    /// Succeed for `pattern`, but only after `delay`.
    pub fn stall(&self, pattern: &str, delay: Duration) {
        self.push(
            pattern,
            Ok(CommandOutput {
                status_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
            Some(delay),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let line = format!("{} {}", program, args.join(" "));
        self.calls.lock().unwrap().push(line.clone());

        let (response, delay) = {
            let rules = self.rules.lock().unwrap();
            match rules.iter().find(|rule| line.contains(&rule.pattern)) {
                Some(rule) => (rule.response.clone(), rule.delay),
                None => (
                    Ok(CommandOutput {
                        status_code: 0,
                        stdout: String::new(),
                        stderr: String::new(),
                    }),
                    None,
                ),
            }
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// In-memory hosting API that records every call by operation name.
#[derive(Default)]
pub struct FakeHostingApi {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    timing_out: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
}

impl FakeHostingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Report a client-side timeout for `operation` after recording the call.
    pub fn time_out(&self, operation: &'static str) {
        self.timing_out.lock().unwrap().insert(operation);
    }

    /// Answer `operation` only after `delay`.
    pub fn stall(&self, operation: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(operation, delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == operation).count()
    }

    async fn record(&self, operation: &'static str) -> Result<(), GitHubError> {
        self.calls.lock().unwrap().push(operation.to_string());
        let delay = self.delays.lock().unwrap().get(operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.timing_out.lock().unwrap().contains(operation) {
            return Err(GitHubError::Timeout {
                operation: operation.to_string(),
                duration_ms: 0,
            });
        }
        if self.failing.lock().unwrap().contains(operation) {
            return Err(GitHubError::UnexpectedResponse {
                operation: operation.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HostingApi for FakeHostingApi {
    async fn get_organization(&self, org: &str) -> Result<OrganizationInfo, GitHubError> {
        self.record("get_organization").await?;
        Ok(OrganizationInfo {
            login: org.to_string(),
            id: 1,
        })
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<CreatedRepository, GitHubError> {
        self.record("create_repository").await?;
        Ok(CreatedRepository {
            name: name.to_string(),
            full_name: format!("{org}/{name}"),
            html_url: Some(format!("https://github.com/{org}/{name}")),
            private,
        })
    }

    async fn delete_repository(&self, _owner: &str, _name: &str) -> Result<(), GitHubError> {
        self.record("delete_repository").await
    }

    async fn create_tag_object(&self, _owner: &str, _repo: &str, request: &TagObjectRequest) -> Result<GitTagObject, GitHubError> {
        self.record("create_tag_object").await?;
        Ok(GitTagObject {
            sha: "0123456789abcdef0123456789abcdef01234567".to_string(),
            tag: request.tag.clone(),
        })
    }

    async fn create_tag_ref(&self, _owner: &str, _repo: &str, _tag: &str, _sha: &str) -> Result<(), GitHubError> {
        self.record("create_tag_ref").await
    }

    async fn file_exists(&self, _owner: &str, _repo: &str, _path: &str) -> Result<bool, GitHubError> {
        self.record("file_exists").await?;
        Ok(false)
    }

    async fn create_file(&self, _owner: &str, _repo: &str, _path: &str, _message: &str, _content: &str) -> Result<(), GitHubError> {
        self.record("create_file").await
    }

    async fn delete_label(&self, _owner: &str, _repo: &str, _name: &str) -> Result<bool, GitHubError> {
        self.record("delete_label").await?;
        Ok(true)
    }

    async fn create_label(&self, _owner: &str, _repo: &str, _label: &LabelSpec) -> Result<(), GitHubError> {
        self.record("create_label").await
    }

    async fn graphql(&self, _query: &str, _variables: serde_json::Value) -> Result<serde_json::Value, GitHubError> {
        self.record("graphql").await?;
        Err(GitHubError::UnexpectedResponse {
            operation: "graphql".to_string(),
            message: "no scripted response".to_string(),
        })
    }
}
