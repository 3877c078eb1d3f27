//! How to launch the language server: a "run" executable and a "debug" executable.
//!
//! Only one of the two is used per launch, chosen by the host through [`LaunchMode`]. The debug
//! executable differs by the runtime flags that open a remote inspector.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;

/// Runtime flags added in debug mode.
pub const DEBUG_EXEC_ARGS: [&str; 2] = ["--nolazy", "--inspect=6009"];

/// Environment variable that selects [`LaunchMode::Debug`] (`1` or `true`).
pub const DEBUG_ENV_VAR: &str = "DIAG_HIGHLIGHT_DEBUG";

/// Which executable to launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchMode {
    /// Normal operation.
    #[default]
    Run,
    /// Server runtime started with an inspector attached.
    Debug,
}

impl LaunchMode {
    /// Read the mode from [`DEBUG_ENV_VAR`].
    pub fn from_env() -> Self {
        Self::from_flag(env::var(DEBUG_ENV_VAR).ok().as_deref())
    }

    fn from_flag(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => Self::Debug,
            _ => Self::Run,
        }
    }
}

/// Channel used to talk to the server process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// JSON-RPC over the process's stdin/stdout (`--stdio`).
    #[default]
    Stdio,
}

/// A server process description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    /// Interpreter used to run `module` (e.g. `node`); `None` runs `module` directly.
    pub runtime: Option<String>,
    /// Absolute path of the server entry point.
    pub module: PathBuf,
    /// Arguments passed to the server after `module`.
    pub args: Vec<String>,
    /// Arguments passed to the runtime before `module`.
    pub exec_args: Vec<String>,
    /// Communication channel.
    pub transport: TransportKind,
}

impl Executable {
    /// An executable for `module` with no extra arguments.
    pub fn new(module: impl Into<PathBuf>, runtime: Option<String>) -> Self {
        Self {
            runtime,
            module: module.into(),
            args: Vec::new(),
            exec_args: Vec::new(),
            transport: TransportKind::Stdio,
        }
    }

    /// Runtime flags that [`Self::argv`] leaves out because there is no runtime to pass them to.
    pub fn ignored_exec_args(&self) -> &[String] {
        if self.runtime.is_some() {
            &[]
        } else {
            &self.exec_args
        }
    }

    /// Full argument vector, program first.
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = Vec::new();
        if let Some(runtime) = &self.runtime {
            argv.push(OsString::from(runtime));
            argv.extend(self.exec_args.iter().map(OsString::from));
        }
        argv.push(self.module.clone().into_os_string());
        argv.extend(self.args.iter().map(OsString::from));
        match self.transport {
            TransportKind::Stdio => argv.push(OsString::from("--stdio")),
        }
        argv
    }

    /// Build the process command.
    pub fn command(&self) -> ProcessCommand {
        let mut argv = self.argv().into_iter();
        // argv always holds at least the module path.
        let program = argv.next().unwrap_or_else(|| self.module.clone().into_os_string());
        let mut cmd = ProcessCommand::new(program);
        cmd.args(argv);
        cmd
    }
}

/// The run/debug executable pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Executable used in [`LaunchMode::Run`].
    pub run: Executable,
    /// Executable used in [`LaunchMode::Debug`].
    pub debug: Executable,
}

impl ServerOptions {
    /// Both executables for `module`; the debug one carries [`DEBUG_EXEC_ARGS`].
    pub fn for_module(module: impl Into<PathBuf>, runtime: Option<String>) -> Self {
        let run = Executable::new(module, runtime);
        let mut debug = run.clone();
        debug.exec_args = DEBUG_EXEC_ARGS.iter().map(|s| s.to_string()).collect();
        Self { run, debug }
    }

    /// The executable for `mode`.
    pub fn executable(&self, mode: LaunchMode) -> &Executable {
        match mode {
            LaunchMode::Run => &self.run,
            LaunchMode::Debug => {
                let ignored = self.debug.ignored_exec_args();
                if !ignored.is_empty() {
                    tracing::warn!(
                        module = %self.debug.module.display(),
                        ?ignored,
                        "Debug executable has no runtime; its runtime flags are not passed"
                    );
                }
                &self.debug
            }
        }
    }
}

/// Resolve a path shipped with the extension (e.g. `server/out/server.js`) against its root.
pub fn resolve_module(extension_root: &Path, relative: impl AsRef<Path>) -> PathBuf {
    let relative = relative.as_ref();
    if relative.is_absolute() {
        relative.to_path_buf()
    } else {
        extension_root.join(relative)
    }
}
