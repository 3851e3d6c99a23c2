use std::sync::Arc;
use std::time::Duration;

use ball_knowledge::commentary::types::{AudioSegment, CommentaryPayload};
use ball_knowledge::config::SyncConfig;
use ball_knowledge::kernel::event::OpOutcome;
use ball_knowledge::kernel::state::{SessionState, StateDelta};
use ball_knowledge::kernel::sync::{ClipOutcome, DriftOutcome, SyncEngine};
use ball_knowledge::kernel::telemetry::Telemetry;
use ball_knowledge::kernel::transport::TransportController;
use ball_knowledge::media::sim::{SimulatedElement, SimulatedLoader};
use ball_knowledge::media::{AudioSource, MediaElement, MediaSet};

type Sim = SimulatedElement;

struct Rig {
    video: Arc<Sim>,
    media: Arc<MediaSet<Sim>>,
    transport: Arc<TransportController<Sim>>,
    engine: SyncEngine<Sim>,
    telemetry: Telemetry,
}

fn rig(media: MediaSet<Sim>, segments: Vec<AudioSegment>) -> Rig {
    let media = Arc::new(media);
    let state = SessionState::new();
    let telemetry = Telemetry::new();
    let config = SyncConfig::default();
    let transport = Arc::new(TransportController::new(
        media.clone(),
        state.clone(),
        config.clone(),
        telemetry.clone(),
    ));
    let engine = SyncEngine::new(media.clone(), state, segments, config, telemetry.clone());
    Rig {
        video: media.video().clone(),
        media,
        transport,
        engine,
        telemetry,
    }
}

fn track_rig(track_duration: f64) -> (Rig, Arc<Sim>) {
    let video = Arc::new(Sim::new("video", Some(60.0)));
    let track = Arc::new(Sim::new("track", Some(track_duration)));
    let rig = rig(MediaSet::new(video, AudioSource::Track(track.clone())), Vec::new());
    (rig, track)
}

fn segments() -> Vec<AudioSegment> {
    vec![
        AudioSegment::new(0.0, "Players ready", "a.mp3"),
        AudioSegment::new(5.0, "Big serve", "b.mp3"),
        AudioSegment::new(12.0, "What a rally!", "c.mp3"),
    ]
}

fn clip_rig(loader: SimulatedLoader) -> Rig {
    let payload = CommentaryPayload {
        audio_segments: Some(segments()),
        ..Default::default()
    };
    let video = Arc::new(Sim::new("video", Some(60.0)));
    let media = MediaSet::from_payload(video, &payload, &loader, str::to_string);
    rig(media, segments())
}

fn playing_clips(rig: &Rig) -> usize {
    rig.media
        .clips()
        .iter()
        .flatten()
        .filter(|clip| clip.is_playing())
        .count()
}

async fn advance(secs: f64) {
    tokio::time::advance(Duration::from_secs_f64(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn test_drift_beyond_threshold_snaps_track() {
    let (mut rig, track) = track_rig(60.0);
    rig.transport.toggle_play().await;

    // 1. First tick picks the paused track up
    assert_eq!(rig.engine.on_drift_tick().await, DriftOutcome::Resumed { drift: 0.0 });
    assert!(track.is_playing());

    // 2. Force 0.5s of drift
    advance(2.0).await;
    track.set_current_time(1.5);
    assert_eq!(rig.engine.on_drift_tick().await, DriftOutcome::Corrected { drift: 0.5 });
    assert_eq!(track.current_time(), rig.video.current_time());
    assert_eq!(rig.telemetry.snapshot().sync.max_drift_ms, 500);
}

#[tokio::test(start_paused = true)]
async fn test_drift_within_threshold_is_left_alone() {
    let (mut rig, track) = track_rig(60.0);
    rig.transport.toggle_play().await;
    rig.engine.on_drift_tick().await;

    advance(2.0).await;
    track.set_current_time(1.8);
    let outcome = rig.engine.on_drift_tick().await;
    assert!(matches!(outcome, DriftOutcome::InSync { .. }), "got {:?}", outcome);
    assert!((track.current_time() - 1.8).abs() < 1e-9);
    assert_eq!(rig.telemetry.snapshot().sync.drift_corrections, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drift_tick_idles_while_paused() {
    let (mut rig, track) = track_rig(60.0);
    assert_eq!(rig.engine.on_drift_tick().await, DriftOutcome::Idle);
    assert_eq!(track.play_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ended_track_is_not_touched() {
    let (mut rig, track) = track_rig(5.0);
    rig.transport.toggle_play().await;
    rig.engine.on_drift_tick().await;

    advance(6.0).await;
    assert!(track.has_ended());
    assert_eq!(rig.engine.on_drift_tick().await, DriftOutcome::Ended);
    assert_eq!(track.current_time(), 5.0);
    assert_eq!(track.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_track_rejoins_video_after_pause_and_seek() {
    let (mut rig, track) = track_rig(60.0);
    rig.transport.toggle_play().await;
    rig.engine.on_drift_tick().await;
    advance(3.0).await;

    rig.transport.toggle_play().await;
    assert!(track.is_paused());
    rig.transport.seek(10.0).await;
    rig.transport.toggle_play().await;

    assert!(matches!(rig.engine.on_drift_tick().await, DriftOutcome::Resumed { .. }));
    assert!(track.is_playing());
    assert_eq!(track.current_time(), 10.0);
    assert_eq!(rig.video.current_time(), 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_clip_activation_follows_segments() {
    let mut rig = clip_rig(SimulatedLoader::new(10.0));
    rig.transport.toggle_play().await;

    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Activated(0));
    assert_eq!(rig.transport.state().active_segment(), Some(0));
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Unchanged);

    advance(5.0).await;
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Activated(1));
    let first = rig.media.clip(0).unwrap();
    assert!(first.is_paused());
    assert_eq!(first.current_time(), 0.0);
    assert!(rig.media.clip(1).unwrap().is_playing());
    assert_eq!(rig.telemetry.snapshot().sync.clip_activations, 2);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_clip_plays_at_any_tick() {
    let mut rig = clip_rig(SimulatedLoader::new(10.0));
    rig.transport.toggle_play().await;

    for step in 0..200 {
        rig.transport.sync_time();
        rig.engine.on_clip_tick().await;
        assert!(playing_clips(&rig) <= 1, "two clips audible at step {}", step);
        if step == 80 {
            rig.transport.seek(2.0).await;
        }
        advance(0.1).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_clip_is_not_retried_until_pointer_moves() {
    let mut rig = clip_rig(SimulatedLoader::new(3.0));
    rig.media.clip(1).unwrap().reject_play("decode error");
    rig.transport.toggle_play().await;
    rig.engine.on_clip_tick().await;

    advance(5.5).await;
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Failed(1));
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Unchanged);
    assert_eq!(rig.media.clip(1).unwrap().play_calls(), 1);
    assert!(rig.transport.state().is_playing(), "video keeps playing");

    advance(7.0).await;
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Activated(2));
    assert_eq!(rig.telemetry.snapshot().sync.clip_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unloaded_clip_plays_silently() {
    let mut rig = clip_rig(SimulatedLoader::new(3.0).with_missing("b.mp3"));
    rig.transport.toggle_play().await;

    advance(6.0).await;
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Failed(1));
    assert_eq!(rig.transport.state().active_segment(), Some(1));
    assert_eq!(playing_clips(&rig), 0);
    assert!(rig.video.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_seek_resets_pointer_and_next_tick_reactivates() {
    let mut rig = clip_rig(SimulatedLoader::new(10.0));
    rig.transport.toggle_play().await;
    rig.engine.on_clip_tick().await;

    rig.transport.seek(13.0).await;
    assert_eq!(rig.transport.state().active_segment(), None);
    assert!(rig.media.clip(0).unwrap().is_paused());

    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Activated(2));
    assert!(rig.media.clip(2).unwrap().is_playing());
    assert_eq!(playing_clips(&rig), 1);
}

#[tokio::test(start_paused = true)]
async fn test_paused_clip_resumes_where_it_stopped() {
    let mut rig = clip_rig(SimulatedLoader::new(4.0));
    rig.transport.toggle_play().await;
    rig.engine.on_clip_tick().await;

    advance(1.0).await;
    rig.transport.toggle_play().await;
    let clip = rig.media.clip(0).unwrap().clone();
    assert!(clip.is_paused());
    assert_eq!(clip.current_time(), 1.0);

    rig.transport.toggle_play().await;
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Resumed(0));
    assert!(clip.is_playing());
    assert_eq!(clip.current_time(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_clip_starts_with_controller_volume_and_mute() {
    let mut rig = clip_rig(SimulatedLoader::new(4.0));
    rig.transport.set_volume(50);
    rig.transport.toggle_mute();
    rig.transport.toggle_play().await;

    rig.engine.on_clip_tick().await;
    let clip = rig.media.clip(0).unwrap();
    assert!((clip.volume() - 0.5).abs() < 1e-9);
    assert!(clip.is_muted());
}

#[tokio::test(start_paused = true)]
async fn test_clip_tick_idles_when_paused_or_without_clips() {
    let mut rig = clip_rig(SimulatedLoader::new(4.0));
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Idle);

    let (mut track, _) = track_rig(60.0);
    track.transport.toggle_play().await;
    assert_eq!(track.engine.on_clip_tick().await, ClipOutcome::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_clip_tick_mid_seek_leaves_audio_silent() {
    let mut rig = clip_rig(SimulatedLoader::new(10.0));
    rig.transport.toggle_play().await;
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Activated(0));

    // The video will not restart after the seek pauses it.
    rig.video.stall_play(true);
    let seek = {
        let transport = rig.transport.clone();
        tokio::spawn(async move { transport.seek(13.0).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!rig.transport.state().is_playing());
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Idle);
    assert_eq!(playing_clips(&rig), 0);

    assert_eq!(seek.await.unwrap(), OpOutcome::Degraded);
    assert!(rig.video.is_paused());
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Idle);
    assert_eq!(playing_clips(&rig), 0);

    rig.video.stall_play(false);
    assert_eq!(rig.transport.toggle_play().await, OpOutcome::Completed);
    assert_eq!(rig.engine.on_clip_tick().await, ClipOutcome::Activated(2));
    assert_eq!(playing_clips(&rig), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clip_started_after_transport_paused_is_silenced() {
    let mut rig = clip_rig(SimulatedLoader::new(10.0).with_play_latency(Duration::from_millis(500)));
    rig.transport.toggle_play().await;
    let state = rig.transport.state().clone();

    // Pause lands in session state while the clip start is still pending,
    // without touching the elements.
    let (outcome, ()) = tokio::join!(rig.engine.on_clip_tick(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        state.reduce(StateDelta::Paused);
    });

    assert_eq!(outcome, ClipOutcome::Unchanged);
    assert!(rig.media.clip(0).unwrap().is_paused());
    assert_eq!(playing_clips(&rig), 0);
    assert_eq!(rig.telemetry.snapshot().sync.clip_activations, 0);
}

#[tokio::test(start_paused = true)]
async fn test_track_started_after_transport_paused_is_silenced() {
    let video = Arc::new(Sim::new("video", Some(60.0)));
    let track = Arc::new(
        Sim::new("track", Some(60.0)).with_play_latency(Duration::from_millis(500)),
    );
    let mut rig = rig(MediaSet::new(video, AudioSource::Track(track.clone())), Vec::new());
    rig.transport.toggle_play().await;
    let state = rig.transport.state().clone();

    let (outcome, ()) = tokio::join!(rig.engine.on_drift_tick(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        state.reduce(StateDelta::Paused);
    });

    assert_eq!(outcome, DriftOutcome::Idle);
    assert!(track.is_paused());
}
