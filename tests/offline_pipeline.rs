//! End-to-end offline pipeline runs against an in-memory render server.

use std::sync::Mutex;

use videogen::{
    ANALYSIS_SAMPLE_RATE, AudioPcm, BackgroundSource, Fps, InitSession, NullProgress,
    OfflineRenderPipeline, RenderGeometry, RenderRequest, RenderService, VideogenError,
    VideogenResult,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Default)]
struct RecordedBatch {
    start_idx: u64,
    frames: Vec<String>,
}

#[derive(Default)]
struct FakeServer {
    fail_init: bool,
    batches: Mutex<Vec<RecordedBatch>>,
    finalized_title: Mutex<Option<String>>,
}

impl RenderService for FakeServer {
    fn init(&self, track_id: &str, _source: &str) -> VideogenResult<InitSession> {
        if self.fail_init {
            return Err(VideogenError::session("track not found"));
        }
        Ok(InitSession {
            session_id: format!("session-{track_id}"),
            audio_url: "http://unused.invalid/audio".to_owned(),
        })
    }

    fn fetch_audio(&self, _url: &str) -> VideogenResult<Vec<u8>> {
        panic!("tests feed decoded pcm directly");
    }

    fn upload_batch(
        &self,
        _session_id: &str,
        frames: &[String],
        start_idx: u64,
    ) -> VideogenResult<()> {
        self.batches.lock().unwrap().push(RecordedBatch {
            start_idx,
            frames: frames.to_vec(),
        });
        Ok(())
    }

    fn finalize(&self, _session_id: &str, title: &str) -> VideogenResult<String> {
        *self.finalized_title.lock().unwrap() = Some(title.to_owned());
        Ok("/dl/video.mp4".to_owned())
    }
}

fn silent_pcm(secs: f64) -> AudioPcm {
    AudioPcm {
        sample_rate: ANALYSIS_SAMPLE_RATE,
        samples: vec![0.0; (ANALYSIS_SAMPLE_RATE as f64 * secs) as usize],
    }
}

fn request() -> RenderRequest {
    RenderRequest {
        track_id: "42".to_owned(),
        source: "lib".to_owned(),
        name: "Song".to_owned(),
        artist: "Artist".to_owned(),
        background: BackgroundSource::None,
        lyrics: Vec::new(),
        fps: Fps::FIXED_30,
    }
}

// Tiny geometry keeps the per-frame raster cheap.
fn tiny_geometry() -> RenderGeometry {
    RenderGeometry::new(0.05).unwrap()
}

#[test]
fn uploads_contiguous_batches_and_finalizes() {
    init_logging();
    let server = FakeServer::default();
    let pipeline = OfflineRenderPipeline::new(server).with_geometry(tiny_geometry());

    // 2.5s at 30fps is 75 frames: two full batches and a 15-frame tail.
    let outcome = pipeline
        .run_with_decoded(&request(), &silent_pcm(2.5), &mut NullProgress)
        .unwrap();

    assert_eq!(outcome.url, "/dl/video.mp4");
    assert_eq!(outcome.frames_uploaded, 75);
}

#[test]
fn batches_arrive_in_order_with_the_expected_sizes() {
    let server = FakeServer::default();
    let pipeline = OfflineRenderPipeline::new(server).with_geometry(tiny_geometry());
    pipeline
        .run_with_decoded(&request(), &silent_pcm(2.5), &mut NullProgress)
        .unwrap();

    let batches = pipeline.service().batches.lock().unwrap();
    let starts: Vec<u64> = batches.iter().map(|b| b.start_idx).collect();
    let sizes: Vec<usize> = batches.iter().map(|b| b.frames.len()).collect();
    assert_eq!(starts, vec![0, 30, 60]);
    assert_eq!(sizes, vec![30, 30, 15]);

    for batch in batches.iter() {
        for frame in &batch.frames {
            assert!(
                frame.starts_with("data:image/jpeg;base64,"),
                "frames upload as jpeg data uris"
            );
        }
    }
}

#[test]
fn finalize_uses_the_name_artist_title() {
    let server = FakeServer::default();
    let pipeline = OfflineRenderPipeline::new(server).with_geometry(tiny_geometry());
    pipeline
        .run_with_decoded(&request(), &silent_pcm(1.0), &mut NullProgress)
        .unwrap();

    let title = pipeline.service().finalized_title.lock().unwrap();
    assert_eq!(title.as_deref(), Some("Song - Artist"));
}

#[test]
fn init_failure_aborts_before_any_upload() {
    init_logging();
    let server = FakeServer {
        fail_init: true,
        ..FakeServer::default()
    };
    let pipeline = OfflineRenderPipeline::new(server).with_geometry(tiny_geometry());
    let err = pipeline
        .run_with_decoded(&request(), &silent_pcm(1.0), &mut NullProgress)
        .unwrap_err();

    assert!(err.to_string().contains("track not found"));
    assert!(pipeline.service().batches.lock().unwrap().is_empty());
}

#[test]
fn audio_shorter_than_one_frame_is_rejected() {
    let server = FakeServer::default();
    let pipeline = OfflineRenderPipeline::new(server).with_geometry(tiny_geometry());
    let err = pipeline
        .run_with_decoded(&request(), &silent_pcm(0.01), &mut NullProgress)
        .unwrap_err();
    assert!(err.to_string().contains("shorter than one frame"));
}
