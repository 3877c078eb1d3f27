//! User-invocable commands.
//!
//! Hosts dispatch commands by identifier through a [`CommandRegistry`]. Each handler owns its
//! own state; the toggle command owns the [`HighlightSession`] it flips.

use crate::highlighter::{HighlightSession, HighlighterOptions, ToggleOutcome};
use crate::host::{DiagnosticsProvider, Window};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of the highlight toggle command.
pub const TOGGLE_HIGHLIGHT_COMMAND: &str = "extension.toggleHighlight";

/// Errors produced when registering or dispatching commands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    /// No handler is registered under this identifier.
    UnknownCommand(String),

    #[error("command '{0}' is already registered")]
    /// A handler is already registered under this identifier.
    AlreadyRegistered(String),
}

/// Host services available to a command while it runs.
pub struct CommandContext<'a> {
    /// The host window.
    pub window: &'a mut dyn Window,
    /// Source of the current diagnostics.
    pub diagnostics: &'a dyn DiagnosticsProvider,
}

impl<'a> CommandContext<'a> {
    /// Bundle a window and a diagnostics provider.
    pub fn new(window: &'a mut dyn Window, diagnostics: &'a dyn DiagnosticsProvider) -> Self {
        Self {
            window,
            diagnostics,
        }
    }
}

/// A command implementation.
pub trait CommandHandler {
    /// Run the command. Commands take no arguments and return nothing.
    fn execute(&mut self, ctx: &mut CommandContext<'_>);
}

/// `extension.toggleHighlight`: flips a [`HighlightSession`].
#[derive(Debug, Default)]
pub struct ToggleHighlightCommand {
    session: HighlightSession,
    last_outcome: Option<ToggleOutcome>,
}

impl ToggleHighlightCommand {
    /// Create the command with a fresh, inactive session.
    pub fn new(options: HighlighterOptions) -> Self {
        Self {
            session: HighlightSession::new(options),
            last_outcome: None,
        }
    }

    /// The session flipped by this command.
    pub fn session(&self) -> &HighlightSession {
        &self.session
    }

    /// Outcome of the most recent invocation.
    pub fn last_outcome(&self) -> Option<ToggleOutcome> {
        self.last_outcome
    }
}

impl CommandHandler for ToggleHighlightCommand {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) {
        let outcome = self.session.toggle(&mut *ctx.window, ctx.diagnostics);
        self.last_outcome = Some(outcome);
    }
}

/// Command identifier -> handler.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `id`.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        handler: Box<dyn CommandHandler>,
    ) -> Result<(), CommandError> {
        let id = id.into();
        if self.handlers.contains_key(&id) {
            return Err(CommandError::AlreadyRegistered(id));
        }
        tracing::debug!(command = %id, "Registered command");
        self.handlers.insert(id, handler);
        Ok(())
    }

    /// Returns `true` if a handler is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the command registered under `id`.
    pub fn execute(&mut self, id: &str, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let handler = self
            .handlers
            .get_mut(id)
            .ok_or_else(|| CommandError::UnknownCommand(id.to_string()))?;
        tracing::debug!(command = id, "Executing command");
        handler.execute(ctx);
        Ok(())
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
