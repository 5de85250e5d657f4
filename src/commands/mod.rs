//! Scheduled commands
//!
//! Cron tasks name a command by its `base_command`; the registry resolves
//! that name to an in-process implementation.

pub mod builtin;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

pub use builtin::{MarkOverdueInvoices, Ping};

/// Error type for command lookup and execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command '{name}' is not registered")]
    NotFound { name: String },
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("{0}")]
    Failed(String),
}

/// Resources available to a running command.
#[derive(Clone)]
pub struct CommandContext {
    pub db: DatabaseConnection,
}

#[async_trait]
pub trait ScheduledCommand: Send + Sync {
    /// Registry key, e.g. `invoices:mark-overdue`.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Executes the command, returning text recorded as the task's last output.
    async fn run(&self, ctx: &CommandContext, params: Option<&str>) -> Result<String, CommandError>;
}

/// Listing entry for a registered command
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
}

/// Registry of commands that cron tasks may invoke
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Arc<dyn ScheduledCommand>>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in commands
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MarkOverdueInvoices));
        registry.register(Arc::new(Ping));
        registry
    }

    /// Register a command under its own name, replacing any previous entry
    pub fn register(&mut self, command: Arc<dyn ScheduledCommand>) {
        self.commands.insert(command.name(), command);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ScheduledCommand>, CommandError> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| CommandError::NotFound {
                name: name.to_string(),
            })
    }

    /// Registered commands sorted by name
    pub fn list(&self) -> Vec<CommandInfo> {
        self.commands
            .values()
            .map(|command| CommandInfo {
                name: command.name().to_string(),
                description: command.description().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ScheduledCommand for Echo {
        fn name(&self) -> &'static str {
            "test:echo"
        }

        fn description(&self) -> &'static str {
            "Echo parameters"
        }

        async fn run(
            &self,
            _ctx: &CommandContext,
            params: Option<&str>,
        ) -> Result<String, CommandError> {
            Ok(params.unwrap_or_default().to_string())
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = CommandRegistry::with_builtins();

        assert!(registry.contains("invoices:mark-overdue"));
        assert!(registry.contains("system:ping"));
        assert!(!registry.contains("db:archive"));

        let names: Vec<_> = registry.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["invoices:mark-overdue", "system:ping"]);
    }

    #[test]
    fn lookup_of_unknown_command_fails() {
        let registry = CommandRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(CommandError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn custom_commands_can_be_registered() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Echo));

        let ctx = CommandContext {
            db: DatabaseConnection::default(),
        };
        let output = registry
            .get("test:echo")
            .unwrap()
            .run(&ctx, Some("hello"))
            .await
            .unwrap();

        assert_eq!(output, "hello");
    }
}
