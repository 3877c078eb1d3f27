//! Activation wiring: one language client plus the highlight toggle command.
//!
//! [`Extension::activate`] starts the configured server and registers
//! `extension.toggleHighlight`; [`Extension::deactivate`] stops the server. The toggle command
//! reads the diagnostics the client has collected.

use crate::config::HighlightConfig;
use crate::error::ClientError;
use crate::language_client::{ClientEvent, LanguageClient, StopHandle};
use crate::server_options::{LaunchMode, resolve_module};
use diag_highlight::{
    CommandContext, CommandRegistry, HighlighterOptions, TOGGLE_HIGHLIGHT_COMMAND,
    ToggleHighlightCommand, Window,
};
use std::path::{Path, PathBuf};

/// Where the extension is installed and how it was launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionContext {
    /// Installation root; relative server paths resolve against it.
    pub extension_path: PathBuf,
    /// Workspace folder opened by the host, if any.
    pub workspace_root: Option<PathBuf>,
    /// Run or debug launch, chosen by the host.
    pub mode: LaunchMode,
}

impl ExtensionContext {
    /// A run-mode context without a workspace.
    pub fn new(extension_path: impl Into<PathBuf>) -> Self {
        Self {
            extension_path: extension_path.into(),
            workspace_root: None,
            mode: LaunchMode::Run,
        }
    }

    /// Resolve a path shipped with the extension.
    pub fn as_absolute_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        resolve_module(&self.extension_path, relative)
    }
}

/// An activated extension.
#[derive(Debug)]
pub struct Extension {
    client: LanguageClient,
    commands: CommandRegistry,
}

impl Extension {
    /// Build the client from `config`, start it and register the toggle command.
    pub fn activate(
        config: &HighlightConfig,
        context: &ExtensionContext,
    ) -> Result<Self, ClientError> {
        let mut client = LanguageClient::new(
            config.client.id.clone(),
            config.client.name.clone(),
            config.server_options(&context.extension_path),
            config.client_options()?,
        );
        if let Some(root) = &context.workspace_root {
            client = client.with_workspace_root(root.clone());
        }

        let mut extension = Self::with_client(client, config.highlighter_options())?;
        extension.client.start(context.mode)?;
        Ok(extension)
    }

    /// Wrap an existing client (running or not) and register the toggle command.
    pub fn with_client(
        client: LanguageClient,
        options: HighlighterOptions,
    ) -> Result<Self, ClientError> {
        let mut commands = CommandRegistry::new();
        commands.register(
            TOGGLE_HIGHLIGHT_COMMAND,
            Box::new(ToggleHighlightCommand::new(options)),
        )?;
        Ok(Self { client, commands })
    }

    /// The language client.
    pub fn client(&self) -> &LanguageClient {
        &self.client
    }

    /// Mutable access to the language client (document sync, file events).
    pub fn client_mut(&mut self) -> &mut LanguageClient {
        &mut self.client
    }

    /// Registered commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Run a registered command against `window`.
    pub fn execute_command(&mut self, id: &str, window: &mut dyn Window) -> Result<(), ClientError> {
        let mut ctx = CommandContext::new(window, self.client.diagnostics());
        self.commands.execute(id, &mut ctx)?;
        Ok(())
    }

    /// Drain client events; `window/showMessage` notices are surfaced through `window`.
    pub fn poll(&mut self, window: &mut dyn Window) -> Vec<ClientEvent> {
        let events = self.client.poll();
        for event in &events {
            if let ClientEvent::ShowMessage(params) = event {
                window.show_information_message(&params.message);
            }
        }
        events
    }

    /// Stop the client. `None` when it was not running.
    pub fn deactivate(mut self) -> Option<StopHandle> {
        self.client.stop()
    }
}
