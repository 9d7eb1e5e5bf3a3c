use async_trait::async_trait;

use migrex_model::{ConnectionDescriptor, WorkItem};

use crate::Result;

/// Captured output of one remote command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes commands on the assessed host, over SSH or WinRM depending on
/// the connection descriptor.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(
        &self,
        connection: &ConnectionDescriptor,
        command: &str,
    ) -> Result<CommandOutput>;

    /// Whether the connected account can act as administrator, probing
    /// root/su/sudo on Unix and the local administrator group on Windows.
    async fn probe_admin(
        &self,
        connection: &ConnectionDescriptor,
    ) -> Result<bool>;
}

/// Resolves the connection material for a work item.
///
/// The default resolver hands back what the item carries; deployments that
/// keep credentials elsewhere put their lookup behind this seam.
pub trait ConnectionResolver: Send + Sync {
    fn resolve(&self, item: &WorkItem) -> Result<ConnectionDescriptor>;
}

/// Resolver that uses the connection material embedded in the work item.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemConnectionResolver;

impl ConnectionResolver for ItemConnectionResolver {
    fn resolve(&self, item: &WorkItem) -> Result<ConnectionDescriptor> {
        Ok(item.connection.clone())
    }
}
