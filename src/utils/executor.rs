//! Command execution abstraction for testability
//!
//! Helper commands (version probe, self-check, pre-command, log-apply,
//! server queries) go through [`CommandExecutor`] so jobs can be exercised
//! without the real tools installed.

use super::command::CommandOutput;
use crate::error::Result;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command with optional timeout
    fn run_command(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>;

    /// Run a shell command with extra environment variables
    fn run_shell_command(
        &self,
        command: &str,
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_command(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        super::command::run_command(program, args, &[], timeout)
    }

    fn run_shell_command(
        &self,
        command: &str,
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        super::command::run_shell_command(command, envs, timeout)
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use crate::error::BackupError;
    use crate::utils::command::ExitOutcome;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Exit {
            code: i32,
            stdout: String,
            stderr: String,
        },
        NotFound,
        Timeout,
    }

    impl MockResponse {
        pub fn success(stdout: &str) -> Self {
            MockResponse::Exit {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }
        }

        pub fn exit(code: i32, stdout: &str) -> Self {
            MockResponse::Exit {
                code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }
        }
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::success("")
        }
    }

    #[derive(Clone, Debug)]
    struct Expectation {
        program: String,
        arg: Option<String>,
        response: MockResponse,
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses, matched in insertion order
        expectations: Arc<Mutex<Vec<Expectation>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.push(program, None, response)
        }

        /// Configure a response for a program invoked with a given argument
        pub fn expect_with_arg(self, program: &str, arg: &str, response: MockResponse) -> Self {
            self.push(program, Some(arg.to_string()), response)
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.program == program)
        }

        /// Check if any call passed the given argument
        pub fn was_called_with(&self, arg: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.args.iter().any(|a| a == arg))
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn push(self, program: &str, arg: Option<String>, response: MockResponse) -> Self {
            self.expectations.lock().unwrap().push(Expectation {
                program: program.to_string(),
                arg,
                response,
            });
            self
        }

        fn record_call(&self, program: &str, args: &[String], envs: &[(String, String)]) {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.to_vec(),
                envs: envs.to_vec(),
            });
        }

        fn get_response(&self, program: &str, args: &[String]) -> MockResponse {
            let expectations = self.expectations.lock().unwrap();
            let with_arg = expectations.iter().find(|e| {
                e.program == program
                    && e.arg
                        .as_ref()
                        .map(|a| args.iter().any(|x| x == a))
                        .unwrap_or(false)
            });
            let program_only = || {
                expectations
                    .iter()
                    .find(|e| e.program == program && e.arg.is_none())
            };

            with_arg
                .or_else(program_only)
                .map(|e| e.response.clone())
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }

        fn execute_response(&self, program: &str, response: MockResponse) -> Result<CommandOutput> {
            match response {
                MockResponse::Exit {
                    code,
                    stdout,
                    stderr,
                } => Ok(CommandOutput {
                    outcome: ExitOutcome::Exited(code),
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                }),
                MockResponse::NotFound => Err(BackupError::ProcessLaunch {
                    program: program.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
                }),
                MockResponse::Timeout => Ok(CommandOutput {
                    outcome: ExitOutcome::TimedOut(Duration::from_secs(1)),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                }),
            }
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_command(
            &self,
            program: &str,
            args: &[String],
            _timeout: Option<Duration>,
        ) -> Result<CommandOutput> {
            self.record_call(program, args, &[]);
            let response = self.get_response(program, args);
            self.execute_response(program, response)
        }

        fn run_shell_command(
            &self,
            command: &str,
            envs: &[(String, String)],
            _timeout: Option<Duration>,
        ) -> Result<CommandOutput> {
            let args = vec!["-c".to_string(), command.to_string()];
            self.record_call("sh", &args, envs);
            let response = self.get_response("sh", &args);
            self.execute_response("sh", response)
        }
    }
}
