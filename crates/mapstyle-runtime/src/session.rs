//! Per-dataset composition sessions.
//!
//! Each dataset gets one [`DatasetSession`] task that owns the dataset and
//! processes commands in arrival order, so composition passes for a dataset
//! never interleave. Metadata refreshes are debounced and tagged with a
//! generation token; results for superseded requests are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use mapstyle_compose::{
    AttributeDomain, Composition, FragmentContext, compose, merge_into, removal_cleanse,
};
use mapstyle_model::{Dataset, Patch, StyleModule, TemplateLibrary};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::channel::Renderer;
use crate::config::RuntimeConfig;
use crate::debounce::DebounceTracker;
use crate::error::{Result, RuntimeError};
use crate::generation::{GenerationCounter, RequestToken};
use crate::metadata::{MetadataSource, parse_attribute_domains};

/// Commands accepted by a dataset session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Insert or replace a module, then recompose.
    UpsertModule(StyleModule),
    /// Remove a module, cleansing it in the next pass only.
    RemoveModule(String),
    /// Change the selected group, then recompose.
    SelectGroup(Option<String>),
    /// Change the selected data variant, then recompose.
    SelectVariant(String),
    /// Schedule a debounced metadata refresh.
    RefreshMetadata,
    /// Recompose now and report the result.
    Compose(oneshot::Sender<Composition>),
    /// Copy of the session's dataset.
    Snapshot(oneshot::Sender<Dataset>),
    /// Attribute domains currently in use.
    Attributes(oneshot::Sender<Vec<AttributeDomain>>),
    Shutdown,
}

struct MetadataLoaded {
    token: RequestToken,
    result: Result<String>,
}

/// Handle for sending commands to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    dataset_id: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| RuntimeError::SessionClosed {
                dataset_id: self.dataset_id.clone(),
            })
    }

    async fn ask<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(command(reply_tx))?;
        reply_rx.await.map_err(|_| RuntimeError::SessionClosed {
            dataset_id: self.dataset_id.clone(),
        })
    }

    pub fn upsert_module(&self, module: StyleModule) -> Result<()> {
        self.send(SessionCommand::UpsertModule(module))
    }

    pub fn remove_module(&self, id: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::RemoveModule(id.into()))
    }

    pub fn select_group(&self, group: Option<String>) -> Result<()> {
        self.send(SessionCommand::SelectGroup(group))
    }

    pub fn select_variant(&self, name: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SelectVariant(name.into()))
    }

    pub fn refresh_metadata(&self) -> Result<()> {
        self.send(SessionCommand::RefreshMetadata)
    }

    /// Recompose after every previously sent command has been handled.
    pub async fn compose(&self) -> Result<Composition> {
        self.ask(SessionCommand::Compose).await
    }

    pub async fn snapshot(&self) -> Result<Dataset> {
        self.ask(SessionCommand::Snapshot).await
    }

    pub async fn attributes(&self) -> Result<Vec<AttributeDomain>> {
        self.ask(SessionCommand::Attributes).await
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }
}

/// Actor owning one dataset.
pub struct DatasetSession<R, M> {
    dataset: Dataset,
    templates: Arc<TemplateLibrary>,
    renderer: Arc<R>,
    metadata: Arc<M>,
    config: RuntimeConfig,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    loaded_tx: mpsc::UnboundedSender<MetadataLoaded>,
    loaded_rx: mpsc::UnboundedReceiver<MetadataLoaded>,
    debounce: DebounceTracker,
    generations: GenerationCounter,
    attributes: Vec<AttributeDomain>,
    /// Cleanse fragment of removed modules, consumed by the next pass.
    carried: Option<Patch>,
}

impl<R: Renderer, M: MetadataSource> DatasetSession<R, M> {
    /// Spawn a session task and return its handle.
    pub fn spawn(
        dataset: Dataset,
        templates: Arc<TemplateLibrary>,
        renderer: Arc<R>,
        metadata: Arc<M>,
        config: RuntimeConfig,
    ) -> (SessionHandle, JoinHandle<Dataset>) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (loaded_tx, loaded_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            dataset_id: dataset.id.clone(),
            commands: commands_tx,
        };
        let session = Self {
            dataset,
            templates,
            renderer,
            metadata,
            config,
            commands,
            loaded_tx,
            loaded_rx,
            debounce: DebounceTracker::new(),
            generations: GenerationCounter::new(),
            attributes: Vec::new(),
            carried: None,
        };
        (handle, tokio::spawn(session.run()))
    }

    async fn run(mut self) -> Dataset {
        tracing::debug!(dataset = %self.dataset.id, "Session started");
        loop {
            let deadline = self.debounce.deadline(&self.config.debounce);
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle(command).await {
                        break;
                    }
                }
                Some(loaded) = self.loaded_rx.recv() => self.apply_metadata(loaded).await,
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.start_metadata_fetch();
                }
            }
        }
        tracing::debug!(dataset = %self.dataset.id, "Session stopped");
        self.dataset
    }

    /// Handle one command. Returns `false` to stop the session.
    async fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::UpsertModule(module) => {
                tracing::debug!(dataset = %self.dataset.id, module = %module.id, "Module updated");
                self.dataset.upsert_module(module);
                self.recompose().await;
            }
            SessionCommand::RemoveModule(id) => {
                let Some(module) = self.dataset.remove_module(&id) else {
                    tracing::debug!(dataset = %self.dataset.id, module = %id, "Removal of unknown module ignored");
                    return true;
                };
                if let Some(cleanse) = removal_cleanse(&module, &self.templates) {
                    match self.carried.as_mut() {
                        Some(carried) => merge_into(carried, &cleanse),
                        None => self.carried = Some(cleanse),
                    }
                }
                self.recompose().await;
            }
            SessionCommand::SelectGroup(group) => {
                self.dataset.selected_group = group;
                self.recompose().await;
            }
            SessionCommand::SelectVariant(name) => {
                self.dataset.select_variant(&name);
                if self.dataset.selected_dataset_variant.is_none() {
                    tracing::warn!(dataset = %self.dataset.id, variant = %name, "Unknown data variant");
                }
                self.recompose().await;
            }
            SessionCommand::RefreshMetadata => self.debounce.trigger(),
            SessionCommand::Compose(reply) => {
                let composition = self.recompose().await;
                let _ = reply.send(composition);
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.dataset.clone());
            }
            SessionCommand::Attributes(reply) => {
                let _ = reply.send(self.attributes.clone());
            }
            SessionCommand::Shutdown => return false,
        }
        true
    }

    fn start_metadata_fetch(&mut self) {
        self.debounce.clear();
        let token = self.generations.issue(&self.dataset.id);
        tracing::debug!(
            dataset = %self.dataset.id,
            generation = token.generation,
            "Fetching attribute metadata"
        );
        let metadata = Arc::clone(&self.metadata);
        let loaded_tx = self.loaded_tx.clone();
        tokio::spawn(async move {
            let result = metadata.fetch_metadata(&token.key).await;
            let _ = loaded_tx.send(MetadataLoaded { token, result });
        });
    }

    async fn apply_metadata(&mut self, loaded: MetadataLoaded) {
        if !self.generations.is_current(&loaded.token) {
            tracing::debug!(
                dataset = %self.dataset.id,
                generation = loaded.token.generation,
                "Discarding stale metadata"
            );
            return;
        }
        self.attributes = match loaded.result {
            Ok(json) => parse_attribute_domains(&json),
            Err(error) => {
                tracing::warn!(dataset = %self.dataset.id, error = %error, "Metadata fetch failed");
                Vec::new()
            }
        };
        self.recompose().await;
    }

    async fn recompose(&mut self) -> Composition {
        let existing = match self.renderer.fetch_override(&self.dataset.id).await {
            Ok(existing) => existing,
            Err(error) => {
                tracing::warn!(
                    dataset = %self.dataset.id,
                    error = %error,
                    "Renderer override unavailable, composing without it"
                );
                None
            }
        };
        let ctx = FragmentContext::new()
            .with_existing_override(existing)
            .with_attributes(self.attributes.clone());
        let carried = self.carried.take();
        let composition = compose(&self.dataset, &self.templates, &ctx, carried.as_ref());

        if let Some(patch) = &composition.patch
            && let Err(error) = self.renderer.apply_override(&self.dataset.id, patch.clone()).await
        {
            tracing::warn!(dataset = %self.dataset.id, error = %error, "Failed to apply override");
        }
        composition
    }
}

/// Running sessions keyed by dataset id.
pub struct SessionRegistry<R, M> {
    sessions: HashMap<String, SessionHandle>,
    tasks: HashMap<String, JoinHandle<Dataset>>,
    templates: Arc<TemplateLibrary>,
    renderer: Arc<R>,
    metadata: Arc<M>,
    config: RuntimeConfig,
}

impl<R: Renderer, M: MetadataSource> SessionRegistry<R, M> {
    pub fn new(
        templates: TemplateLibrary,
        renderer: Arc<R>,
        metadata: Arc<M>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            tasks: HashMap::new(),
            templates: Arc::new(templates),
            renderer,
            metadata,
            config,
        }
    }

    /// Handle for `dataset`, spawning a session when none is running.
    ///
    /// An already running session keeps its own copy of the dataset.
    pub fn open(&mut self, dataset: Dataset) -> SessionHandle {
        if let Some(handle) = self.sessions.get(&dataset.id).filter(|h| !h.is_closed()) {
            return handle.clone();
        }
        let dataset_id = dataset.id.clone();
        let (handle, task) = DatasetSession::spawn(
            dataset,
            Arc::clone(&self.templates),
            Arc::clone(&self.renderer),
            Arc::clone(&self.metadata),
            self.config.clone(),
        );
        self.sessions.insert(dataset_id.clone(), handle.clone());
        self.tasks.insert(dataset_id, task);
        handle
    }

    pub fn get(&self, dataset_id: &str) -> Option<&SessionHandle> {
        self.sessions.get(dataset_id)
    }

    /// Stop a session, returning its final dataset.
    pub async fn close(&mut self, dataset_id: &str) -> Result<Option<Dataset>> {
        let Some(handle) = self.sessions.remove(dataset_id) else {
            return Ok(None);
        };
        // A session that already stopped cannot take the command.
        let _ = handle.shutdown();
        let Some(task) = self.tasks.remove(dataset_id) else {
            return Ok(None);
        };
        task.await.map(Some).map_err(|_| RuntimeError::SessionClosed {
            dataset_id: dataset_id.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
