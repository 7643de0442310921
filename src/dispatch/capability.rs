//! Capabilities: named functions reachable from `[name path]` commands
//!
//! Hosts register capabilities up front. A name that is not registered may
//! still resolve to an executable plugin found next to the chain definition
//! or in a configured plugin directory.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::chain::split::{smart_split, unquote};
use crate::config::CapabilityConfig;
use crate::errors::ChainError;

/// What a capability hands back; absent fields take their defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityOutput {
    /// Defaults to `0`
    pub result: Option<JsonValue>,
    /// Defaults to `true`
    pub success: Option<bool>,
    pub error_message: Option<String>,
}

impl CapabilityOutput {
    pub fn ok(result: JsonValue) -> Self {
        Self {
            result: Some(result),
            success: Some(true),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: None,
            success: Some(false),
            error_message: Some(message.into()),
        }
    }

    pub fn result(&self) -> JsonValue {
        match &self.result {
            None | Some(JsonValue::Null) => JsonValue::from(0),
            Some(value) => value.clone(),
        }
    }

    pub fn success(&self) -> bool {
        self.success.unwrap_or(true)
    }
}

#[async_trait]
pub trait Capability: Send + Sync {
    async fn call(&self, args: Vec<JsonValue>) -> CapabilityOutput;
}

#[async_trait]
impl<F, Fut> Capability for F
where
    F: Fn(Vec<JsonValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CapabilityOutput> + Send + 'static,
{
    async fn call(&self, args: Vec<JsonValue>) -> CapabilityOutput {
        (self)(args).await
    }
}

/// A registered capability tree
#[derive(Clone)]
pub enum Export {
    Function(Arc<dyn Capability>),
    Namespace(HashMap<String, Export>),
}

impl Export {
    pub fn function(capability: impl Capability + 'static) -> Self {
        Export::Function(Arc::new(capability))
    }

    pub fn namespace() -> Self {
        Export::Namespace(HashMap::new())
    }

    /// Add a member to a namespace; no-op on a function
    pub fn with(mut self, name: impl Into<String>, export: Export) -> Self {
        if let Export::Namespace(members) = &mut self {
            members.insert(name.into(), export);
        }
        self
    }

    fn walk(&self, path: &[String]) -> Option<Arc<dyn Capability>> {
        let mut current = self;
        for segment in path {
            current = match current {
                Export::Namespace(members) => members.get(segment)?,
                Export::Function(_) => return None,
            };
        }
        match current {
            Export::Function(f) => Some(Arc::clone(f)),
            Export::Namespace(_) => None,
        }
    }
}

impl std::fmt::Debug for Export {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Export::Function(_) => write!(f, "Function"),
            Export::Namespace(members) => f.debug_map().entries(members.iter()).finish(),
        }
    }
}

/// A parsed `[name path.to.export]` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRef {
    pub name: String,
    pub path: Vec<String>,
}

impl CapabilityRef {
    /// Parse a bracketed command; `None` unless it is wrapped in `[...]`
    pub fn parse(command: &str) -> Option<Self> {
        let inner = command.strip_prefix('[')?.strip_suffix(']')?;
        let mut parts = smart_split(inner, " ")
            .into_iter()
            .map(|part| unquote(part.trim()).to_string())
            .filter(|part| !part.is_empty());
        let name = parts.next()?;
        let rest: Vec<String> = parts.collect();
        let path = if rest.is_empty() {
            Vec::new()
        } else {
            rest.join(" ").split('.').map(str::to_string).collect()
        };
        Some(Self { name, path })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    modules: HashMap<String, Export>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, export: Export) -> &mut Self {
        self.modules.insert(name.into(), export);
        self
    }

    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<JsonValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CapabilityOutput> + Send + 'static,
    {
        self.register(name, Export::function(f))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Resolve a bracketed command to a callable
    ///
    /// Registered names win. Otherwise an executable named after the
    /// capability is looked up in `cwd` and then in each plugin path.
    pub fn resolve(
        &self,
        command: &str,
        cwd: &Path,
        settings: &CapabilityConfig,
    ) -> Result<Arc<dyn Capability>, ChainError> {
        let unresolved = || ChainError::CapabilityResolution(command.to_string());
        let reference = CapabilityRef::parse(command).ok_or_else(unresolved)?;

        if let Some(export) = self.modules.get(&reference.name) {
            return export.walk(&reference.path).ok_or_else(unresolved);
        }

        let program = discover(&reference.name, cwd, settings).ok_or_else(unresolved)?;
        debug!(capability = %reference.name, program = %program.display(), "Using plugin executable");
        Ok(Arc::new(ProcessCapability {
            program,
            args: reference.path,
            cwd: cwd.to_path_buf(),
        }))
    }
}

fn discover(name: &str, cwd: &Path, settings: &CapabilityConfig) -> Option<PathBuf> {
    let relative = settings.discover_relative.then(|| cwd.join(name));
    relative
        .into_iter()
        .chain(settings.plugin_paths.iter().map(|dir| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Executable plugin speaking JSON over stdio
///
/// Receives the parameter list as a JSON array on stdin and the export path
/// as arguments. Stdout is the result, the exit status the success flag and
/// stderr the error message.
#[derive(Debug, Clone)]
pub struct ProcessCapability {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

#[async_trait]
impl Capability for ProcessCapability {
    async fn call(&self, args: Vec<JsonValue>) -> CapabilityOutput {
        let input = JsonValue::Array(args).to_string();

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return CapabilityOutput::failed(format!(
                    "failed to spawn {}: {}",
                    self.program.display(),
                    e
                ))
            }
        };

        let stdin = child.stdin.take();
        let feed = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(input.as_bytes()).await,
                None => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        // A plugin may exit without reading its input
        match fed {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!(program = %self.program.display(), "Plugin closed stdin early");
            }
            Err(e) => warn!(program = %self.program.display(), "Failed to write plugin stdin: {}", e),
            Ok(()) => {}
        }

        match output {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                CapabilityOutput {
                    result: Some(JsonValue::String(
                        String::from_utf8_lossy(&output.stdout).into_owned(),
                    )),
                    success: Some(output.status.success()),
                    error_message: (!stderr.is_empty()).then_some(stderr),
                }
            }
            Err(e) => CapabilityOutput::failed(format!("failed to wait: {}", e)),
        }
    }
}
