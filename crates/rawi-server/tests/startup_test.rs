use rawi_server::config::Config;
use rawi_server::{background, build_pipeline};
use rawi_types::{ProviderEngine, VoiceModelDescriptor};
use rawi_voice::{VoiceError, DELIVERABLE_MIME};
use std::time::Duration;

fn local_only_config(artifact_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.dialogue.webhook_url = "http://127.0.0.1:9/webhook".to_string();
    config.artifacts.dir = artifact_dir.to_path_buf();
    config.voices.default = "local".to_string();
    config.voices.models = vec![VoiceModelDescriptor::new(
        "local",
        "Local",
        "",
        ProviderEngine::Espeak,
    )];
    config
}

#[tokio::test]
async fn pipeline_builds_and_clears_previous_audio() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stale.mp3"), b"from the last process").unwrap();
    let config = local_only_config(dir.path());
    config.validate().unwrap();

    let pipeline = build_pipeline(&config).await.unwrap();

    assert!(!dir.path().join("stale.mp3").exists());
    assert!(dir.path().join("scratch").is_dir());
    let synthesizer = &pipeline.context().synthesizer;
    assert_eq!(synthesizer.default_id(), "local");
    assert_eq!(synthesizer.fallback_id(), "espeak");
}

#[tokio::test]
async fn remote_voices_without_credentials_fail_to_build() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = local_only_config(dir.path());
    config.voices.models.push(
        VoiceModelDescriptor::new("elevenlabs_adam", "Adam", "", ProviderEngine::ElevenLabs)
            .with_param("voice_id", "pNInz6obpgDQGcFmaJgB"),
    );

    assert!(config.validate().is_err());
    assert!(matches!(
        build_pipeline(&config).await,
        Err(VoiceError::Config(_))
    ));
}

#[tokio::test]
async fn sweep_task_removes_orphans_but_keeps_current() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_only_config(dir.path());
    let pipeline = build_pipeline(&config).await.unwrap();
    let artifacts = pipeline.context().artifacts.clone();

    let current = artifacts.publish(b"current", DELIVERABLE_MIME).await.unwrap();
    std::fs::write(dir.path().join("orphan.mp3"), b"orphan").unwrap();
    std::fs::write(artifacts.scratch_dir().join("orphan.wav"), b"orphan").unwrap();

    let task = tokio::spawn(background::start_sweep_task(artifacts.clone(), 1, 0));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    task.abort();

    assert!(current.path.exists());
    assert!(!dir.path().join("orphan.mp3").exists());
    assert!(!artifacts.scratch_dir().join("orphan.wav").exists());
    assert_eq!(artifacts.read_current().await.unwrap().1, b"current");
}

#[tokio::test]
async fn disabled_sweep_task_returns_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = build_pipeline(&local_only_config(dir.path())).await.unwrap();

    tokio::time::timeout(
        Duration::from_secs(1),
        background::start_sweep_task(pipeline.context().artifacts.clone(), 0, 600),
    )
    .await
    .expect("disabled task should return");
}
