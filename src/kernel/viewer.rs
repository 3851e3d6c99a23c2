use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::Command;
use super::state::{SessionState, TransportState};
use super::sync::{ClipOutcome, DriftOutcome, SyncEngine};
use super::telemetry::Telemetry;
use super::transport::TransportController;
use crate::commentary::lookup::caption_index_at;
use crate::commentary::resolver;
use crate::commentary::types::{CommentaryPayload, CommentarySegment};
use crate::config::SyncConfig;
use crate::media::{MediaElement, MediaSet, SyncMode};

/// Everything a renderer needs for one frame of the viewer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerSnapshot {
    pub transport: TransportState,
    pub caption: Option<CommentarySegment>,
    pub caption_index: Option<usize>,
    pub active_segment: Option<usize>,
    pub version: u64,
}

/// Session driver: owns the transport and the sync engine, runs the
/// reconciliation timers and publishes a snapshot after every clip tick.
pub struct Viewer<M> {
    transport: Arc<TransportController<M>>,
    engine: SyncEngine<M>,
    captions: Vec<CommentarySegment>,
    config: SyncConfig,
    snapshots: watch::Sender<ViewerSnapshot>,
}

impl<M: MediaElement + 'static> Viewer<M> {
    pub fn new(media: MediaSet<M>, payload: &CommentaryPayload, config: SyncConfig) -> Self {
        let media = Arc::new(media);
        let state = SessionState::new();
        let telemetry = Telemetry::new();

        let captions = resolver::resolve(payload);
        let clip_segments = payload
            .clip_segments()
            .map(<[_]>::to_vec)
            .unwrap_or_default();

        let transport = Arc::new(TransportController::new(
            media.clone(),
            state.clone(),
            config.clone(),
            telemetry.clone(),
        ));
        let engine = SyncEngine::new(media, state, clip_segments, config.clone(), telemetry);
        info!(captions = captions.len(), mode = ?engine.mode(), "viewer session ready");

        let (snapshots, _) = watch::channel(ViewerSnapshot::default());
        let viewer = Self {
            transport,
            engine,
            captions,
            config,
            snapshots,
        };
        viewer.publish();
        viewer
    }

    pub fn transport(&self) -> Arc<TransportController<M>> {
        self.transport.clone()
    }

    pub fn captions(&self) -> &[CommentarySegment] {
        &self.captions
    }

    pub fn mode(&self) -> SyncMode {
        self.engine.mode()
    }

    pub fn telemetry(&self) -> &Telemetry {
        self.transport.telemetry()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshots.subscribe()
    }

    /// Clip tick: mirror the playhead, reconcile clips, publish.
    pub async fn tick_step(&mut self) -> (ClipOutcome, ViewerSnapshot) {
        self.transport.sync_time();
        let outcome = self.engine.on_clip_tick().await;
        (outcome, self.publish())
    }

    pub async fn drift_step(&mut self) -> DriftOutcome {
        self.engine.on_drift_tick().await
    }

    pub fn publish(&self) -> ViewerSnapshot {
        let shared = self.transport.state().snapshot();
        let transport = shared.transport().clone();
        let caption_index = caption_index_at(&self.captions, transport.current_time);
        let snapshot = ViewerSnapshot {
            caption: caption_index.map(|index| self.captions[index].clone()),
            caption_index,
            active_segment: shared.active_segment(),
            version: shared.version,
            transport,
        };

        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
        snapshot
    }

    /// Async driver loop. Ends when `shutdown` fires or every command
    /// sender is gone; media is paused on the way out.
    ///
    /// Commands are read on their own task, so a tick waiting on a slow
    /// media start never holds up a user gesture.
    pub async fn run(mut self, commands: mpsc::Receiver<Command>, shutdown: CancellationToken) {
        info!(
            drift_tick_ms = self.config.drift_tick_ms,
            segment_tick_ms = self.config.segment_tick_ms,
            "viewer loop started"
        );

        let session = shutdown.child_token();
        let reader = tokio::spawn(read_commands(
            self.transport.clone(),
            commands,
            session.clone(),
        ));

        let track_mode = self.engine.mode() == SyncMode::Track;
        let mut drift = interval(self.config.drift_tick());
        drift.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut segment = interval(self.config.segment_tick());
        segment.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = session.cancelled() => break,
                _ = drift.tick(), if track_mode => {
                    self.drift_step().await;
                }
                _ = segment.tick() => {
                    self.tick_step().await;
                }
            }
        }

        session.cancel();
        if let Err(e) = reader.await {
            warn!("command reader ended abnormally: {}", e);
        }
        self.transport.media().pause_all();
        info!("viewer loop stopped");
    }
}

async fn read_commands<M: MediaElement + 'static>(
    transport: Arc<TransportController<M>>,
    mut commands: mpsc::Receiver<Command>,
    session: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = session.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                // Not awaited here: overlapping gestures must meet the operation lock.
                let transport = transport.clone();
                tokio::spawn(async move {
                    let outcome = transport.dispatch(command).await;
                    debug!(?command, ?outcome, "command settled");
                });
            }
        }
    }
    session.cancel();
}
