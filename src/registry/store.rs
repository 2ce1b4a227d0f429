//! Stream manager implementation
//!
//! The central orchestrator that owns every stream record and drives each
//! one through its lifecycle by coordinating the command builder, the
//! source resolver and the process supervisor.
//!
//! # Concurrency
//!
//! One `tokio::sync::Mutex` guards the whole stream map. Every mutating
//! operation — including start and stop, for their entire duration with
//! the resolver, spawn-with-grace and kill awaits inside — runs under it,
//! so two operations can never race on the same record or the key set. A
//! slow resolver or kill therefore serializes with other operations; with
//! the small number of streams a deployment manages, correctness wins over
//! throughput here.
//!
//! Each running stream additionally gets one monitor task that waits for
//! its transcoder to exit and re-acquires the lock before recording the
//! outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Mutex};

use crate::command::build_stream_command;
use crate::persist::ConfigStore;
use crate::resolver::Resolver;
use crate::supervisor::{ExitInfo, ProcessHandle, Supervisor};

use super::config::ManagerConfig;
use super::error::RegistryError;
use super::event::RegistryEvent;
use super::record::{Runtime, SourceKind, StreamConfig, StreamRecord, StreamSnapshot};

/// Orchestrates all managed streams
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct StreamManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    streams: Mutex<HashMap<String, StreamRecord>>,
    supervisor: Supervisor,
    resolver: Resolver,
    store: Option<ConfigStore>,
    events: broadcast::Sender<RegistryEvent>,
}

impl StreamManager {
    /// Manager with the resolver and config store described by `config`.
    pub fn new(config: ManagerConfig) -> Self {
        let resolver = match &config.resolver_path {
            Some(path) => Resolver::helper_with_timeout(path, config.resolve_timeout),
            None => Resolver::Disabled,
        };
        Self::with_resolver(config, resolver)
    }

    /// Manager with an explicitly constructed resolver.
    pub fn with_resolver(config: ManagerConfig, resolver: Resolver) -> Self {
        let supervisor = Supervisor::new(&config.transcoder_path)
            .spawn_grace(config.spawn_grace)
            .kill_timeout(config.kill_timeout)
            .diagnostic_capacity(config.diagnostic_capacity);
        let store = config.config_path.as_ref().map(ConfigStore::new);
        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            inner: Arc::new(Inner {
                streams: Mutex::new(HashMap::new()),
                supervisor,
                resolver,
                store,
                events,
            }),
        }
    }

    /// Subscribe to status-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    /// Register a new stream. Fails when the id is already taken.
    pub async fn add(&self, config: StreamConfig) -> Result<(), RegistryError> {
        let mut streams = self.inner.streams.lock().await;
        if streams.contains_key(&config.id) {
            return Err(RegistryError::DuplicateId(config.id));
        }

        let id = config.id.clone();
        let record = StreamRecord::new(config);
        let snapshot = record.snapshot();
        streams.insert(id.clone(), record);

        tracing::info!(stream = %id, "stream added");
        self.emit(RegistryEvent::StatusChanged { id, snapshot });
        self.persist_in_background(&streams);
        Ok(())
    }

    /// Replace a stream's configuration. A running stream is stopped first;
    /// the record comes back idle with any previous error cleared.
    pub async fn update(&self, config: StreamConfig) -> Result<(), RegistryError> {
        let mut streams = self.inner.streams.lock().await;
        let record = streams
            .get_mut(&config.id)
            .ok_or_else(|| RegistryError::NotFound(config.id.clone()))?;

        self.stop_record(record).await;

        let id = config.id.clone();
        record.config = config;
        record.runtime = Runtime::Idle;
        let snapshot = record.snapshot();

        tracing::info!(stream = %id, "stream updated");
        self.emit(RegistryEvent::StatusChanged { id, snapshot });
        self.persist_in_background(&streams);
        Ok(())
    }

    /// Remove a stream, stopping it first when running.
    pub async fn remove(&self, id: &str) -> Result<(), RegistryError> {
        let mut streams = self.inner.streams.lock().await;
        let record = streams
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        self.stop_record(record).await;
        streams.remove(id);

        tracing::info!(stream = %id, "stream removed");
        self.emit(RegistryEvent::Removed { id: id.to_string() });
        self.persist_in_background(&streams);
        Ok(())
    }

    /// Start a stream's transcoder.
    ///
    /// Returns `Ok(false)` when the stream is already running. The whole
    /// protocol runs under the registry lock, so concurrent starts for the
    /// same id serialize and exactly one of them spawns a process.
    pub async fn start(&self, id: &str) -> Result<bool, RegistryError> {
        let mut streams = self.inner.streams.lock().await;
        let record = streams
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if record.runtime.status().is_busy() {
            tracing::debug!(stream = %id, "start ignored, stream already running");
            return Ok(false);
        }

        record.runtime = Runtime::Starting;
        self.emit(RegistryEvent::StatusChanged {
            id: id.to_string(),
            snapshot: record.snapshot(),
        });

        let resolved = self.resolve_source(record).await;

        let args = match build_stream_command(
            &record.config.source,
            record.config.kind,
            &record.config.destination,
            &record.config.options,
            resolved.as_deref(),
        ) {
            Ok(args) => args,
            Err(e) => {
                self.fail_record(record, e.to_string());
                return Err(e.into());
            }
        };

        tracing::debug!(stream = %id, args = ?args, "built transcoder command");

        let handle = match self.inner.supervisor.spawn(&args).await {
            Ok(handle) => handle,
            Err(e) => {
                self.fail_record(record, e.to_string());
                return Err(e.into());
            }
        };

        let pid = handle.pid();
        record.runtime = Runtime::Running {
            handle: handle.clone(),
            started_at: Instant::now(),
        };
        tracing::info!(stream = %id, pid, "stream running");
        self.emit(RegistryEvent::StatusChanged {
            id: id.to_string(),
            snapshot: record.snapshot(),
        });

        self.spawn_monitor(id.to_string(), handle);
        Ok(true)
    }

    /// Stop a running stream. Returns `Ok(false)` when it is not running.
    pub async fn stop(&self, id: &str) -> Result<bool, RegistryError> {
        let mut streams = self.inner.streams.lock().await;
        let record = streams
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        Ok(self.stop_record(record).await)
    }

    /// Snapshot of one stream.
    pub async fn get(&self, id: &str) -> Option<StreamSnapshot> {
        let streams = self.inner.streams.lock().await;
        streams.get(id).map(StreamRecord::snapshot)
    }

    /// Snapshots of every stream, ordered by id.
    pub async fn list(&self) -> Vec<StreamSnapshot> {
        let streams = self.inner.streams.lock().await;
        let mut snapshots: Vec<_> = streams.values().map(StreamRecord::snapshot).collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    /// Merge the persisted stream set into the registry.
    ///
    /// Existing ids take the stored configuration (a busy record keeps its
    /// runtime untouched), new ids come back idle, nothing is deleted.
    /// Returns the number of entries loaded; a missing file loads zero.
    pub async fn load_persisted(&self) -> Result<usize, RegistryError> {
        let Some(store) = &self.inner.store else {
            return Ok(0);
        };
        let entries = store.load().await?;

        let mut streams = self.inner.streams.lock().await;
        let count = entries.len();
        for entry in entries {
            let id = entry.id.clone();
            match streams.get_mut(&id) {
                Some(record) => {
                    record.config = entry;
                    if !record.runtime.status().is_busy() {
                        record.runtime = Runtime::Idle;
                    }
                }
                None => {
                    streams.insert(id.clone(), StreamRecord::new(entry));
                }
            }
            if let Some(record) = streams.get(&id) {
                self.emit(RegistryEvent::StatusChanged {
                    id,
                    snapshot: record.snapshot(),
                });
            }
        }

        tracing::info!(count, "loaded persisted streams");
        Ok(count)
    }

    /// Write the whole current stream set to the config store now.
    ///
    /// The snapshot is taken under the lock; the disk write happens after
    /// releasing it.
    pub async fn persist_now(&self) -> Result<(), RegistryError> {
        let Some(store) = &self.inner.store else {
            return Ok(());
        };
        let entries = {
            let streams = self.inner.streams.lock().await;
            durable_entries(&streams)
        };
        store.save(&entries).await?;
        Ok(())
    }

    /// Running → Stopping → Stopped. Caller must hold the registry lock.
    async fn stop_record(&self, record: &mut StreamRecord) -> bool {
        let handle = match &record.runtime {
            Runtime::Running { handle, .. } => handle.clone(),
            _ => return false,
        };

        let id = record.config.id.clone();
        record.runtime = Runtime::Stopping {
            handle: handle.clone(),
        };
        self.emit(RegistryEvent::StatusChanged {
            id: id.clone(),
            snapshot: record.snapshot(),
        });

        handle.kill().await;

        record.runtime = Runtime::Stopped;
        tracing::info!(stream = %id, pid = handle.pid(), "stream stopped");
        self.emit(RegistryEvent::StatusChanged {
            id,
            snapshot: record.snapshot(),
        });
        true
    }

    /// Best-effort URL resolution for remote sources.
    async fn resolve_source(&self, record: &StreamRecord) -> Option<String> {
        if record.config.kind != SourceKind::RemoteVideo {
            return None;
        }
        if !self.inner.resolver.understands(&record.config.source) {
            return None;
        }

        let resolved = self.inner.resolver.resolve(&record.config.source).await;
        if resolved.is_none() {
            tracing::warn!(
                stream = %record.config.id,
                source = %record.config.source,
                "source resolution failed, streaming raw source in degraded mode"
            );
        }
        resolved
    }

    fn fail_record(&self, record: &mut StreamRecord, detail: String) {
        tracing::warn!(stream = %record.config.id, error = %detail, "stream failed to start");
        record.runtime = Runtime::Failed { detail };
        self.emit(RegistryEvent::StatusChanged {
            id: record.config.id.clone(),
            snapshot: record.snapshot(),
        });
    }

    /// Watch a running transcoder and record how it went away.
    fn spawn_monitor(&self, id: String, handle: ProcessHandle) {
        let manager = self.clone();
        tokio::spawn(async move {
            let exit = handle.wait().await;
            manager.on_process_exit(&id, &handle, exit).await;
        });
    }

    async fn on_process_exit(&self, id: &str, handle: &ProcessHandle, exit: ExitInfo) {
        let mut streams = self.inner.streams.lock().await;
        let Some(record) = streams.get_mut(id) else {
            return;
        };

        // Only react while the record still holds this exact process; a
        // stop or restart that won the lock first owns the state now.
        match &record.runtime {
            Runtime::Running { handle: current, .. } if current.pid() == handle.pid() => {}
            _ => return,
        }

        if exit.success() {
            tracing::info!(stream = %id, "transcoder exited cleanly");
            record.runtime = Runtime::Stopped;
        } else {
            let detail = unexpected_exit_detail(exit, &handle.diagnostics_tail());
            tracing::warn!(stream = %id, error = %detail, "transcoder exited unexpectedly");
            record.runtime = Runtime::Failed { detail };
        }

        self.emit(RegistryEvent::StatusChanged {
            id: id.to_string(),
            snapshot: record.snapshot(),
        });
    }

    fn emit(&self, event: RegistryEvent) {
        // send() only fails when nobody subscribed, which is fine
        let _ = self.inner.events.send(event);
    }

    /// Persist the durable subset without holding up the caller. Failures
    /// are logged and never abort the operation that triggered the save.
    fn persist_in_background(&self, streams: &HashMap<String, StreamRecord>) {
        let Some(store) = self.inner.store.clone() else {
            return;
        };
        let entries = durable_entries(streams);
        tokio::spawn(async move {
            if let Err(e) = store.save(&entries).await {
                tracing::warn!(error = %e, "failed to persist stream configuration");
            }
        });
    }
}

fn durable_entries(streams: &HashMap<String, StreamRecord>) -> Vec<StreamConfig> {
    let mut entries: Vec<_> = streams.values().map(|r| r.config.clone()).collect();
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    entries
}

fn unexpected_exit_detail(exit: ExitInfo, diagnostics: &str) -> String {
    let what = match exit.code {
        Some(code) => format!("transcoder exited unexpectedly with code {}", code),
        None => "transcoder was killed by a signal".to_string(),
    };
    if diagnostics.is_empty() {
        what
    } else {
        format!("{}: {}", what, diagnostics)
    }
}
