//! Remote command execution through the system `ssh` client.
//!
//! The engine only speaks to targets through the [`RemoteExecutor`] port;
//! this implementation delegates to the local `ssh` binary in batch mode,
//! so key-file and agent logins work and password prompts fail fast.
//! Windows targets need a WinRM-capable transport and are refused here;
//! scanner integrations for those bring their own executor.

use std::time::Duration;

use async_trait::async_trait;
use migrex_core::error::AssessError;
use migrex_core::ports::remote::{CommandOutput, RemoteExecutor};
use migrex_core::Result;
use migrex_model::ConnectionDescriptor;
use tokio::process::Command;
use tokio::time::timeout;

/// Exit code the ssh client reserves for its own failures, as opposed to
/// the remote command's.
const SSH_FAILURE_EXIT: i32 = 255;

/// Succeeds when the login is root or may escalate without a password.
const ADMIN_PROBE: &str = r#"[ "$(id -u)" = "0" ] || sudo -n true"#;

#[derive(Debug, Clone)]
pub struct OpenSshExecutor {
    command_timeout: Duration,
}

impl OpenSshExecutor {
    pub fn new(command_timeout_secs: u64) -> Self {
        OpenSshExecutor {
            command_timeout: Duration::from_secs(command_timeout_secs),
        }
    }

    fn destination(connection: &ConnectionDescriptor) -> String {
        let username = connection.username_or_empty();
        if username.is_empty() {
            connection.ip_address.clone()
        } else {
            format!("{username}@{}", connection.ip_address)
        }
    }

    fn build_command(connection: &ConnectionDescriptor, command: &str) -> Command {
        let mut ssh = Command::new("ssh");
        ssh.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new");
        if let Some(port) = connection.port {
            ssh.arg("-p").arg(port.to_string());
        }
        if let Some(key_file) = connection.key_file.as_deref() {
            ssh.arg("-i").arg(key_file);
        }
        ssh.arg(Self::destination(connection)).arg(command);
        ssh
    }
}

#[async_trait]
impl RemoteExecutor for OpenSshExecutor {
    async fn execute(
        &self,
        connection: &ConnectionDescriptor,
        command: &str,
    ) -> Result<CommandOutput> {
        if connection.windows {
            return Err(AssessError::Connection(
                "windows target requires a WinRM transport, none is configured".to_owned(),
            ));
        }

        let output = timeout(
            self.command_timeout,
            Self::build_command(connection, command).output(),
        )
        .await
        .map_err(|_| {
            AssessError::Command(format!(
                "remote command timed out after {}s",
                self.command_timeout.as_secs()
            ))
        })?
        .map_err(|error| AssessError::Connection(format!("ssh invocation failed: {error}")))?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if exit_code == SSH_FAILURE_EXIT {
            return Err(AssessError::Connection(stderr.trim().to_owned()));
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            exit_code,
        })
    }

    async fn probe_admin(&self, connection: &ConnectionDescriptor) -> Result<bool> {
        let output = self.execute(connection, ADMIN_PROBE).await?;
        Ok(output.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrex_model::Secret;

    fn connection() -> ConnectionDescriptor {
        ConnectionDescriptor {
            ip_address: "10.0.0.7".into(),
            port: Some(2222),
            username: Some("assess".into()),
            password: None,
            key_file: Some("/keys/assess.pem".into()),
            windows: false,
        }
    }

    #[test]
    fn destination_carries_the_login() {
        assert_eq!(OpenSshExecutor::destination(&connection()), "assess@10.0.0.7");

        let mut anonymous = connection();
        anonymous.username = None;
        assert_eq!(OpenSshExecutor::destination(&anonymous), "10.0.0.7");
    }

    #[tokio::test]
    async fn windows_targets_are_refused() {
        let executor = OpenSshExecutor::new(5);
        let connection = ConnectionDescriptor {
            windows: true,
            password: Some(Secret::new("hunter2")),
            ..connection()
        };
        let error = executor
            .execute(&connection, "hostname")
            .await
            .expect_err("windows must be refused");
        assert!(matches!(error, AssessError::Connection(_)));
    }
}
