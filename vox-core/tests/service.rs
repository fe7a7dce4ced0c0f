use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use vox_core::assets::ArchiveSource;
use vox_core::audio::codec;
use vox_core::{
    ClipRef, ConcatEngine, PhraseBuilder, PhraseDefinition, TargetFormat, VoxConfig, VoxError,
    VoxService,
};

struct OfflineSource {
    calls: Arc<AtomicUsize>,
}

impl ArchiveSource for OfflineSource {
    fn fetch(&self) -> Result<Vec<u8>, VoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VoxError::Other(anyhow::anyhow!("offline")))
    }

    fn describe(&self) -> String {
        "offline".into()
    }
}

/// Counts builds while delegating to the real engine.
struct CountingEngine {
    inner: ConcatEngine,
    builds: AtomicUsize,
}

impl PhraseBuilder for CountingEngine {
    fn build(&self, clip_paths: &[PathBuf], silence_ms: u32) -> Result<Vec<u8>, VoxError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.inner.build(clip_paths, silence_ms)
    }
}

fn write_clip(dir: &Path, name: &str, channels: u16, rate: u32, bits: u16, frames: usize) {
    let spec = WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: bits,
        sample_format: SampleFormat::Int,
    };
    let mut w = WavWriter::create(dir.join(format!("{name}.wav")), spec).unwrap();
    for i in 0..frames * channels as usize {
        if bits == 8 {
            w.write_sample(((i % 200) as i16 - 100) as i8).unwrap();
        } else {
            w.write_sample(((i % 2000) as i16 - 1000) * 8).unwrap();
        }
    }
    w.finalize().unwrap();
}

struct Fixture {
    _root: tempfile::TempDir,
    service: Arc<VoxService>,
    engine: Arc<CountingEngine>,
    fetches: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let mut config = VoxConfig::with_base_dir(root.path());
    std::fs::create_dir_all(&config.sounds_dir).unwrap();
    write_clip(&config.sounds_dir, "doop", 1, 11_025, 16, 1_000);
    write_clip(&config.sounds_dir, "beep", 1, 8_000, 8, 800);
    write_clip(&config.sounds_dir, "alert", 2, 22_050, 16, 2_205);

    let mut phrases = BTreeMap::new();
    phrases.insert(
        "intruder_alert".to_string(),
        vec![ClipRef::new("doop"), ClipRef::new("beep"), ClipRef::new("alert")],
    );
    phrases.insert("broken".to_string(), vec![ClipRef::new("doop"), ClipRef::new("ghost")]);
    config.phrases = phrases;

    let engine = Arc::new(CountingEngine {
        inner: ConcatEngine::default(),
        builds: AtomicUsize::new(0),
    });
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = OfflineSource {
        calls: Arc::clone(&fetches),
    };
    let service = VoxService::with_parts(config, engine.clone(), Box::new(source)).unwrap();

    Fixture {
        _root: root,
        service: Arc::new(service),
        engine,
        fetches,
    }
}

#[test]
fn mixed_clip_formats_render_as_target_format() {
    let fx = fixture();
    let bytes = fx.service.phrase_audio("intruder_alert").unwrap();
    let decoded = codec::decode(&bytes).unwrap();

    let fmt = TargetFormat::VOX;
    assert_eq!(decoded.channels, fmt.channels);
    assert_eq!(decoded.sample_width_bytes, fmt.sample_width_bytes);
    assert_eq!(decoded.sample_rate, fmt.sample_rate);
    // doop 1000, beep round(800*11025/8000)=1103, alert round(2205/2)=1103 (rounded)
    let gap = fmt.silence_frames(150);
    assert_eq!(decoded.samples.len(), 1_000 + 1_103 + 1_103 + 2 * gap);
}

#[test]
fn second_request_is_a_cache_hit() {
    let fx = fixture();
    let first = fx.service.phrase_audio("intruder_alert").unwrap();
    let second = fx.service.phrase_audio("intruder_alert").unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.engine.builds.load(Ordering::SeqCst), 1);
    assert!(fx.service.cache_entry("intruder_alert").is_some());
}

#[test]
fn unknown_phrase_is_not_found() {
    let fx = fixture();
    let err = fx.service.phrase_audio("nope").unwrap_err();
    assert!(matches!(err, VoxError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.public_message(), "Unknown phrase");
}

#[test]
fn missing_clip_names_the_clip_and_caches_nothing() {
    let fx = fixture();
    let err = fx.service.phrase_audio("broken").unwrap_err();
    match &err {
        VoxError::MissingClip { name } => assert_eq!(name, "ghost"),
        other => panic!("expected MissingClip, got {other:?}"),
    }
    assert_eq!(err.public_message(), "Missing clip: ghost");
    assert!(fx.service.cache_entry("broken").is_none());
    assert_eq!(fx.engine.builds.load(Ordering::SeqCst), 0);
}

#[test]
fn changing_a_definition_invalidates_only_that_phrase() {
    let fx = fixture();
    fx.service.phrase_audio("intruder_alert").unwrap();

    let defs = vec![
        PhraseDefinition::new("intruder_alert", vec![ClipRef::new("doop")]).unwrap(),
        PhraseDefinition::new("broken", vec![ClipRef::new("doop"), ClipRef::new("ghost")])
            .unwrap(),
    ];
    let stale = fx.service.set_phrases(defs).unwrap();
    assert_eq!(stale, vec!["intruder_alert".to_string()]);
    assert!(fx.service.cache_entry("intruder_alert").is_none());

    let bytes = fx.service.phrase_audio("intruder_alert").unwrap();
    assert_eq!(codec::decode(&bytes).unwrap().samples.len(), 1_000);
    assert_eq!(fx.engine.builds.load(Ordering::SeqCst), 2);
}

#[test]
fn remove_phrase_drops_definition_and_audio() {
    let fx = fixture();
    fx.service.phrase_audio("intruder_alert").unwrap();
    assert!(fx.service.remove_phrase("intruder_alert").unwrap());
    assert!(fx.service.cache_entry("intruder_alert").is_none());
    assert!(matches!(
        fx.service.phrase_audio("intruder_alert"),
        Err(VoxError::NotFound(_))
    ));
}

#[test]
fn ad_hoc_sequence_is_cached_under_its_id() {
    let fx = fixture();
    let clips = [ClipRef::new("beep"), ClipRef::new("beep")];
    let a = fx.service.get_or_build_phrase_audio("double_beep", &clips, 0).unwrap();
    let b = fx.service.get_or_build_phrase_audio("double_beep", &clips, 0).unwrap();
    assert_eq!(a, b);
    assert_eq!(fx.engine.builds.load(Ordering::SeqCst), 1);
    assert_eq!(codec::decode(&a).unwrap().samples.len(), 2 * 1_103);

    fx.service.invalidate_all_phrases().unwrap();
    assert!(fx.service.cache_entry("double_beep").is_none());
}

#[test]
fn populated_sounds_dir_skips_fetch() {
    let fx = fixture();
    assert!(fx.service.ensure_assets());
    assert_eq!(fx.fetches.load(Ordering::SeqCst), 0);

    let empty = tempfile::tempdir().unwrap();
    let target = empty.path().join("elsewhere");
    assert!(!fx.service.ensure_assets_in(&target, true));
    assert_eq!(fx.fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn browse_lists_sorted_titles_and_resolves_urls() {
    let fx = fixture();
    let listed: Vec<_> = fx
        .service
        .browse()
        .into_iter()
        .map(|m| (m.id, m.title))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("broken".to_string(), "Broken".to_string()),
            ("intruder_alert".to_string(), "Intruder Alert".to_string()),
        ]
    );
    assert_eq!(
        fx.service
            .resolve_media_url("http://ha.local:8123", "intruder_alert")
            .unwrap(),
        "http://ha.local:8123/api/hl_vox/audio/intruder_alert"
    );
    assert!(matches!(
        fx.service.resolve_media_url("http://ha.local:8123", "nope"),
        Err(VoxError::NotFound(_))
    ));
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let root = tempfile::tempdir().unwrap();
    let mut config = VoxConfig::with_base_dir(root.path());
    config
        .phrases
        .insert("Bad Id".into(), vec![ClipRef::new("doop")]);
    let source = OfflineSource {
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let err = VoxService::with_parts(config, Arc::new(ConcatEngine::default()), Box::new(source))
        .unwrap_err();
    assert!(matches!(err, VoxError::InvalidConfig(_)));
}

#[test]
fn replaced_definition_is_never_served_from_cache() {
    let fx = fixture();
    let beep_len = 1_103;
    for _ in 0..100 {
        fx.service
            .set_phrases(vec![
                PhraseDefinition::new("alarm", vec![ClipRef::new("doop")]).unwrap(),
            ])
            .unwrap();

        let racer = {
            let service = Arc::clone(&fx.service);
            std::thread::spawn(move || service.phrase_audio("alarm").unwrap())
        };
        fx.service
            .set_phrases(vec![
                PhraseDefinition::new("alarm", vec![ClipRef::new("beep")]).unwrap(),
            ])
            .unwrap();
        racer.join().unwrap();

        let bytes = fx.service.phrase_audio("alarm").unwrap();
        assert_eq!(codec::decode(&bytes).unwrap().samples.len(), beep_len);
    }
}

#[test]
fn ad_hoc_silence_is_capped() {
    let fx = fixture();
    let clips = [ClipRef::new("beep"), ClipRef::new("beep")];
    let bytes = fx
        .service
        .get_or_build_phrase_audio("long_gap", &clips, u32::MAX)
        .unwrap();
    let gap = TargetFormat::VOX.silence_frames(vox_core::config::MAX_SILENCE_MS);
    assert_eq!(codec::decode(&bytes).unwrap().samples.len(), 2 * 1_103 + gap);
}

#[cfg(feature = "fetch")]
#[tokio::test]
async fn service_with_http_source_builds_and_drops_inside_runtime() {
    let root = tempfile::tempdir().unwrap();
    let service = VoxService::new(VoxConfig::with_base_dir(root.path())).unwrap();
    assert!(service.browse().is_empty());
    drop(service);
}

#[tokio::test]
async fn async_wrappers_run_on_blocking_pool() {
    let fx = fixture();
    let bytes = fx
        .service
        .phrase_audio_async("intruder_alert".into())
        .await
        .unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert!(fx.service.ensure_assets_async(Duration::from_secs(5)).await);
}
