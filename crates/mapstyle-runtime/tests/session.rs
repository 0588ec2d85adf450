//! Session behavior against fake renderer and metadata collaborators.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mapstyle_model::{
    BuildingColorSettings, BuildingColorType, BuildingShadowSettings,
    BuildingTransparencySettings, ColorGradientSettings,
    Dataset, Facet, ModuleSettings, Patch, ShadowMode, StyleModule, TemplateLibrary, leaf_table,
};
use mapstyle_runtime::{
    DatasetSession, MetadataSource, Renderer, RendererChannel, RendererReply, RendererRequest,
    Result, RuntimeConfig, RuntimeError, SessionRegistry, StaticMetadata,
};
use serde_json::Value;

#[derive(Default)]
struct RecordingRenderer {
    applied: Mutex<Vec<Patch>>,
    fail_fetch: bool,
}

impl RecordingRenderer {
    fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    fn applied(&self) -> Vec<Patch> {
        self.applied.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    async fn fetch_override(&self, _dataset_id: &str) -> Result<Option<Patch>> {
        if self.fail_fetch {
            return Err(RuntimeError::Timeout {
                request_id: 0,
                timeout_ms: 0,
            });
        }
        Ok(self.applied.lock().unwrap().last().cloned())
    }

    async fn apply_override(&self, _dataset_id: &str, patch: Patch) -> Result<()> {
        self.applied.lock().unwrap().push(patch);
        Ok(())
    }
}

/// Replies with scripted documents after scripted delays, in call order.
struct ScriptedMetadata {
    calls: AtomicUsize,
    replies: Vec<(u64, &'static str)>,
}

impl ScriptedMetadata {
    fn new(replies: Vec<(u64, &'static str)>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            replies,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetadataSource for ScriptedMetadata {
    async fn fetch_metadata(&self, _dataset_id: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay_ms, json) = self.replies[call.min(self.replies.len() - 1)];
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(json.to_string())
    }
}

const DEPTH_TO_10: &str = r#"{"attributes": {"depth": {"min": 0, "max": 10}}}"#;
const DEPTH_TO_20: &str = r#"{"attributes": {"depth": {"min": 0, "max": 20}}}"#;

fn shadow(id: &str, shadow: ShadowMode) -> StyleModule {
    StyleModule::new(id, ModuleSettings::BuildingShadow(BuildingShadowSettings { shadow }))
}

fn height_color(id: &str) -> StyleModule {
    StyleModule::new(
        id,
        ModuleSettings::BuildingColor(BuildingColorSettings {
            color_type: BuildingColorType::Height,
            attribute: None,
        }),
    )
}

fn depth_gradient() -> StyleModule {
    StyleModule::new(
        "gradient",
        ModuleSettings::ColorGradient(ColorGradientSettings {
            facet: Facet::Polygon,
            attribute: "depth".to_string(),
            start_color: "#0000ff".to_string(),
            end_color: "#ff0000".to_string(),
            min: None,
            max: None,
            step: Some(10.0),
        }),
    )
}

#[tokio::test]
async fn removal_cleanse_is_carried_into_one_pass() {
    let renderer = Arc::new(RecordingRenderer::default());
    let dataset = Dataset::new("bldg").with_modules(vec![
        shadow("s", ShadowMode::CastOnly),
        height_color("c"),
    ]);
    let (handle, _task) = DatasetSession::spawn(
        dataset,
        Arc::new(TemplateLibrary::default()),
        Arc::clone(&renderer),
        Arc::new(StaticMetadata::new()),
        RuntimeConfig::default(),
    );

    handle.remove_module("c").unwrap();
    let after = handle.compose().await.unwrap();

    let applied = renderer.applied();
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].get(Facet::Tiles3d, "color"), Some(&Value::Null));
    assert!(applied[0].get(Facet::Tiles3d, "shadows").is_some());
    assert_eq!(applied[1].get(Facet::Tiles3d, "color"), None);
    assert_eq!(after.activation.active, vec!["s"]);
}

#[tokio::test]
async fn removed_color_stays_removed_under_transparency() {
    let renderer = Arc::new(RecordingRenderer::default());
    let usage = StyleModule::new(
        "usage",
        ModuleSettings::BuildingColor(BuildingColorSettings {
            color_type: BuildingColorType::Purpose,
            attribute: None,
        }),
    );
    let fade = StyleModule::new(
        "fade",
        ModuleSettings::BuildingTransparency(BuildingTransparencySettings { transparency: 40 }),
    );
    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("bldg").with_modules(vec![usage, fade]),
        Arc::new(TemplateLibrary::default()),
        Arc::clone(&renderer),
        Arc::new(StaticMetadata::new()),
        RuntimeConfig::default(),
    );

    let first = handle.compose().await.unwrap();
    let second = handle.compose().await.unwrap();
    assert_eq!(first.patch, second.patch);

    handle.remove_module("usage").unwrap();
    let after = handle.compose().await.unwrap();
    assert_eq!(after.activation.active, vec!["fade"]);

    let applied = renderer.applied();
    assert_eq!(applied.len(), 4);
    for patch in &applied[2..] {
        let color = patch.get(Facet::Tiles3d, "color").expect("color");
        assert!(leaf_table(color).is_none(), "purpose table still rendered: {color}");
        assert_eq!(color, &Value::String("color(\"#ffffff\", 0.4)".to_string()));
    }
}

#[tokio::test]
async fn commands_apply_in_arrival_order() {
    let renderer = Arc::new(RecordingRenderer::default());
    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("bldg"),
        Arc::new(TemplateLibrary::default()),
        Arc::clone(&renderer),
        Arc::new(StaticMetadata::new()),
        RuntimeConfig::default(),
    );

    handle.upsert_module(shadow("s", ShadowMode::Enabled)).unwrap();
    handle.upsert_module(shadow("s", ShadowMode::Disabled)).unwrap();
    handle.upsert_module(shadow("s", ShadowMode::ReceiveOnly)).unwrap();
    let composition = handle.compose().await.unwrap();

    let shadows: Vec<Value> = renderer
        .applied()
        .iter()
        .filter_map(|patch| patch.get(Facet::Tiles3d, "shadows").cloned())
        .collect();
    assert_eq!(
        shadows,
        vec!["enabled", "disabled", "receive_only", "receive_only"]
    );
    assert_eq!(composition.activation.active, vec!["s"]);
    assert_eq!(handle.snapshot().await.unwrap().modules.len(), 1);
}

#[tokio::test]
async fn renderer_query_failure_still_composes() {
    let renderer = Arc::new(RecordingRenderer::failing());
    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("bldg").with_modules(vec![shadow("s", ShadowMode::Disabled)]),
        Arc::new(TemplateLibrary::default()),
        Arc::clone(&renderer),
        Arc::new(StaticMetadata::new()),
        RuntimeConfig::default(),
    );
    let composition = handle.compose().await.unwrap();
    assert!(composition.patch.is_some());
    assert_eq!(renderer.applied().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn metadata_refreshes_coalesce() {
    let metadata = Arc::new(ScriptedMetadata::new(vec![(0, DEPTH_TO_20)]));
    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("flood").with_modules(vec![depth_gradient()]),
        Arc::new(TemplateLibrary::default()),
        Arc::new(RecordingRenderer::default()),
        Arc::clone(&metadata),
        RuntimeConfig::default(),
    );

    for _ in 0..5 {
        handle.refresh_metadata().unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(metadata.calls(), 1);
    let attributes = handle.attributes().await.unwrap();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].max, Some(20.0));
}

#[tokio::test(start_paused = true)]
async fn continuous_refreshes_fire_at_max_wait() {
    let metadata = Arc::new(ScriptedMetadata::new(vec![(0, DEPTH_TO_20)]));
    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("flood"),
        Arc::new(TemplateLibrary::default()),
        Arc::new(RecordingRenderer::default()),
        Arc::clone(&metadata),
        RuntimeConfig::default(),
    );

    // Triggers at 0, 150, ..., 900 ms never leave a 250 ms gap.
    for _ in 0..7 {
        handle.refresh_metadata().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    assert_eq!(metadata.calls(), 1);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(metadata.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_metadata_is_discarded() {
    // The first fetch resolves long after the second one.
    let metadata = Arc::new(ScriptedMetadata::new(vec![
        (2000, DEPTH_TO_10),
        (10, DEPTH_TO_20),
    ]));
    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("flood").with_modules(vec![depth_gradient()]),
        Arc::new(TemplateLibrary::default()),
        Arc::new(RecordingRenderer::default()),
        Arc::clone(&metadata),
        RuntimeConfig::default(),
    );

    handle.refresh_metadata().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.refresh_metadata().unwrap();
    tokio::time::sleep(Duration::from_millis(2700)).await;

    assert_eq!(metadata.calls(), 2);
    let attributes = handle.attributes().await.unwrap();
    assert_eq!(attributes[0].max, Some(20.0));

    let patch = handle.compose().await.unwrap().patch.expect("gradient patch");
    let fill = leaf_table(patch.get(Facet::Polygon, "fillColor").expect("fill")).expect("table");
    assert_eq!(fill.rows().len(), 3);
}

#[tokio::test]
async fn registry_reuses_running_sessions() {
    let mut registry = SessionRegistry::new(
        TemplateLibrary::default(),
        Arc::new(RecordingRenderer::default()),
        Arc::new(StaticMetadata::new()),
        RuntimeConfig::default(),
    );
    let first = registry.open(Dataset::new("bldg"));
    let second = registry.open(Dataset::new("bldg"));
    registry.open(Dataset::new("road"));
    assert_eq!(registry.len(), 2);

    first.upsert_module(shadow("s", ShadowMode::Enabled)).unwrap();
    assert_eq!(second.snapshot().await.unwrap().modules.len(), 1);

    let closed = registry.close("bldg").await.unwrap().expect("dataset");
    assert_eq!(closed.modules.len(), 1);
    assert!(registry.get("bldg").is_none());
    assert!(matches!(
        second.compose().await,
        Err(RuntimeError::SessionClosed { .. })
    ));
    assert_eq!(registry.close("missing").await.unwrap(), None);
}

#[tokio::test]
async fn session_talks_to_renderer_over_channel() {
    let config = RuntimeConfig::default();
    let (channel, mut requests) = RendererChannel::from_config(&config.renderer);
    let responder = channel.clone();
    let applied = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&applied);
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let reply = match request {
                RendererRequest::FetchOverride { request_id, .. } => {
                    RendererReply::Override { request_id, patch: None }
                }
                RendererRequest::ApplyOverride { request_id, patch, .. } => {
                    recorded.lock().unwrap().push(patch);
                    RendererReply::Applied { request_id }
                }
            };
            responder.resolve(reply);
        }
    });

    let (handle, _task) = DatasetSession::spawn(
        Dataset::new("bldg").with_modules(vec![shadow("s", ShadowMode::CastOnly)]),
        Arc::new(TemplateLibrary::default()),
        Arc::new(channel),
        Arc::new(StaticMetadata::new()),
        config,
    );
    handle.compose().await.unwrap();
    assert_eq!(applied.lock().unwrap().len(), 1);
}
