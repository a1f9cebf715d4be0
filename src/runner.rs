//! Generator runner: executes generator scripts and turns their output into
//! suggestions.
//!
//! Runs on the interactive completion path, so every failure (spawn error,
//! non-zero exit, timeout) degrades to an empty list plus a log event.
//! Successful results are cached per `(script, fragment, cwd)` for a short TTL.

use crate::config::EngineConfig;
use crate::generator::{Generator, GeneratorContext};
use crate::suggestion::Suggestion;
use crate::{slog_debug, slog_warn};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CACHE_TTL_MS: u64 = 30_000;

/// Environment variable carrying the word being completed into scripts
pub const FRAGMENT_ENV: &str = "COMPLETION_FRAGMENT";
/// Accepted tokens, command name first, space-separated
pub const TOKENS_ENV: &str = "COMPLETION_TOKENS";

#[derive(Debug, Error)]
enum RunFailure {
    #[error("failed to spawn shell: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed waiting for script: {0}")]
    Wait(#[source] std::io::Error),
    #[error("script exited with status {0:?}")]
    Exit(Option<i32>),
    #[error("script timed out after {0:?}")]
    Timeout(Duration),
}

/// Script, fragment and working directory
type CacheKey = (String, String, Option<PathBuf>);

#[derive(Debug, Clone)]
struct CacheEntry {
    items: Vec<Suggestion>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct GeneratorRunner {
    timeout: Duration,
    cache_ttl: Duration,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl GeneratorRunner {
    pub fn new(timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            timeout,
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Duration::from_millis(config.generator_timeout_ms),
            Duration::from_millis(config.cache_ttl_ms),
        )
    }

    /// Run a generator. Never fails: problems yield an empty list.
    pub async fn run(&self, generator: &Generator, ctx: &GeneratorContext) -> Vec<Suggestion> {
        let ttl = generator
            .cache_ttl_ms
            .map(Duration::from_millis)
            .unwrap_or(self.cache_ttl);
        let key = (generator.script.clone(), ctx.fragment.clone(), ctx.cwd.clone());

        if !ttl.is_zero() {
            if let Some(items) = self.cached(&key) {
                slog_debug!("RUNNER", "cache_hit", json!({ "script": generator.script }));
                return items;
            }
        }

        match self.execute(&generator.script, ctx).await {
            Ok(stdout) => {
                let items = generator.post_process.apply(&stdout);
                if !ttl.is_zero() {
                    self.store(key, items.clone(), ttl);
                }
                items
            }
            Err(failure) => {
                slog_warn!(
                    "RUNNER",
                    "generator_failed",
                    &failure.to_string(),
                    Some(json!({ "script": generator.script }))
                );
                Vec::new()
            }
        }
    }

    async fn execute(&self, script: &str, ctx: &GeneratorContext) -> Result<String, RunFailure> {
        let mut cmd = shell_command(script);
        cmd.env(FRAGMENT_ENV, &ctx.fragment)
            .env(TOKENS_ENV, ctx.tokens.join(" "))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &ctx.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(RunFailure::Spawn)?;

        // On timeout the future (and the child with it) is dropped, which kills it.
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RunFailure::Timeout(self.timeout))?
            .map_err(RunFailure::Wait)?;

        if !output.status.success() {
            return Err(RunFailure::Exit(output.status.code()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn cached(&self, key: &CacheKey) -> Option<Vec<Suggestion>> {
        let mut cache = self.cache.lock().ok()?;
        match cache.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.items.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: CacheKey, items: Vec<Suggestion>, ttl: Duration) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|_, entry| !entry.is_expired());
            cache.insert(
                key,
                CacheEntry {
                    items,
                    created_at: Instant::now(),
                    ttl,
                },
            );
        }
    }

    /// Drop every cached result, e.g. after the tool's catalog changed.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .map(|cache| cache.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }
}

impl Default for GeneratorRunner {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_CACHE_TTL_MS),
        )
    }
}

#[cfg(windows)]
fn shell_command(script: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(script);
    cmd
}

#[cfg(not(windows))]
fn shell_command(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}
