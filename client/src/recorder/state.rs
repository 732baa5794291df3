use crate::edit_service::FetchTransport;
use crate::recorder::{
    media_recorder::{BlobFragment, Recorder},
    media_streams::{add_screen_stop_listener, get_screen_stream, WebStream},
    ui,
    utils::{blob_bytes, concat_blobs, current_timestamp_utc, now_ms, ObjectUrl},
};
use common::{
    stop_tracks, CaptureConstraints, CaptureController, CaptureError, CaptureSettings,
    ClientConfig, EditClient, EditedArtifact, RecordedArtifact, RecorderOptions,
    RecordingConfiguration, RecordingSummary, TeardownPolicy, ZoomPoint,
};
use std::cell::RefCell;
use std::rc::Rc;

pub type WebController = CaptureController<WebStream, Recorder, BlobFragment>;

thread_local! {
    static RECORDER_STATE: Rc<RefCell<RecorderState>> =
        Rc::new(RefCell::new(RecorderState::new(ClientConfig::default())));
}

pub fn shared() -> Rc<RefCell<RecorderState>> {
    RECORDER_STATE.with(|state| state.clone())
}

/// The last finished recording and its playback reference
pub struct PublishedRecording {
    pub artifact: RecordedArtifact,
    pub summary: RecordingSummary,
    pub url: ObjectUrl,
}

pub struct PublishedEdit {
    pub artifact: EditedArtifact,
    pub url: ObjectUrl,
}

pub struct RecorderState {
    pub config: RecordingConfiguration,
    pub settings: CaptureSettings,
    pub zoom_points: Vec<ZoomPoint>,

    controller: WebController,
    edit_client: Rc<EditClient<FetchTransport>>,
    recording: Option<PublishedRecording>,
    edited: Option<PublishedEdit>,
    start_time: f64,
    start_time_utc: String,
}

impl RecorderState {
    pub fn new(client_config: ClientConfig) -> Self {
        Self {
            config: RecordingConfiguration::default(),
            controller: CaptureController::new(client_config.capture.teardown),
            settings: client_config.capture,
            zoom_points: Vec::new(),
            edit_client: Rc::new(EditClient::new(FetchTransport, client_config.edit)),
            recording: None,
            edited: None,
            start_time: 0.0,
            start_time_utc: String::new(),
        }
    }

    /// Apply a new client configuration; refused while capturing
    pub fn configure(&mut self, client_config: ClientConfig) -> Result<(), CaptureError> {
        self.controller.ensure_idle()?;
        self.controller = CaptureController::new(client_config.capture.teardown);
        self.settings = client_config.capture;
        self.edit_client = Rc::new(EditClient::new(FetchTransport, client_config.edit));
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.controller.is_active()
    }

    pub fn edit_client(&self) -> Rc<EditClient<FetchTransport>> {
        self.edit_client.clone()
    }

    pub fn recording(&self) -> Option<&PublishedRecording> {
        self.recording.as_ref()
    }

    pub fn edited(&self) -> Option<&PublishedEdit> {
        self.edited.as_ref()
    }

    /// Replaces, never merges; the superseded URL is revoked on drop
    fn publish_recording(&mut self, recording: PublishedRecording) {
        self.recording = Some(recording);
    }

    fn discard_recording(&mut self) -> Option<PublishedRecording> {
        self.recording.take()
    }

    /// What an edit submission needs: the client, the published video, zoom points
    fn edit_input(&self) -> (Rc<EditClient<FetchTransport>>, Option<RecordedArtifact>, Vec<ZoomPoint>) {
        (
            self.edit_client(),
            self.recording.as_ref().map(|r| r.artifact.clone()),
            self.zoom_points.clone(),
        )
    }

    fn publish_edit(&mut self, edit: PublishedEdit) {
        self.edited = Some(edit);
    }
}

fn with_state<R>(f: impl FnOnce(&mut RecorderState) -> R) -> R {
    RECORDER_STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Acquire a display stream and start recording it.
///
/// Capture refusals are returned to the caller as-is.
pub async fn start_recording() -> Result<(), CaptureError> {
    let (constraints, options, stop_on_ended) = {
        let state = shared();
        let state = state.borrow();
        state.controller.ensure_idle()?;
        (
            CaptureConstraints::from_config(&state.config),
            RecorderOptions::from_config(&state.config, &state.settings.mime_type),
            state.settings.stop_on_source_ended,
        )
    };

    log::info!(
        "[Recorder] Requesting {}x{} @ {} fps, audio: {}",
        constraints.video.width.ideal,
        constraints.video.height.ideal,
        constraints.video.frame_rate.ideal,
        constraints.audio
    );

    let stream = get_screen_stream(&constraints).await?;

    let recorder = Recorder::new(
        &stream,
        &options,
        Box::new(|fragment: BlobFragment| {
            with_state(|state| {
                state.controller.on_fragment(fragment);
            })
        }),
        Box::new(|| wasm_bindgen_futures::spawn_local(finish_recording())),
    );
    let mut recorder = match recorder {
        Ok(recorder) => recorder,
        Err(e) => {
            stop_tracks(&stream, TeardownPolicy::AllTracks);
            return Err(e);
        }
    };

    if stop_on_ended {
        let watched = add_screen_stop_listener(
            &stream,
            Box::new(|| {
                log::info!("[Recorder] Screen sharing ended by user");
                if let Err(e) = stop_recording() {
                    log::warn!("[Recorder] Stop after share ended failed: {}", e);
                }
            }),
        );
        match watched {
            Ok(Some(listener)) => recorder.watch_share_end(listener),
            Ok(None) => log::warn!("[Recorder] Stream has no video track to watch"),
            Err(e) => log::warn!("[Recorder] Could not watch for share end: {:?}", e),
        }
    }

    with_state(|state| {
        state.controller.start_capture(stream, recorder)?;
        state.start_time = now_ms();
        state.start_time_utc = current_timestamp_utc();
        Ok(())
    })
}

/// Ask the recorder to finalize; the artifact is published once it reports back
pub fn stop_recording() -> Result<(), CaptureError> {
    with_state(|state| state.controller.stop_recording())
}

/// Sink-stopped reaction: assemble, publish, release
async fn finish_recording() {
    let drained = with_state(|state| {
        let mime_type = state
            .controller
            .session()
            .map(|session| session.sink().mime_type().to_string())?;
        let fragments = state.controller.on_sink_stopped()?;
        Some((fragments, mime_type, state.start_time, state.start_time_utc.clone()))
    });
    let Some((fragments, mime_type, start_time, start_time_utc)) = drained else {
        return;
    };
    ui::update_recording_ui(false);

    match assemble(&fragments, &mime_type, start_time, start_time_utc).await {
        Ok(recording) => {
            log::info!(
                "[Recorder] Recording ready: {}",
                serde_json::to_string(&recording.summary).unwrap_or_default()
            );
            ui::show_recording(recording.url.as_str(), &recording.summary);
            with_state(|state| state.publish_recording(recording));
        }
        Err(e) => {
            log::error!("[Recorder] Failed to assemble recording: {:?}", e);
            // never leave an older video on offer for editing
            with_state(|state| state.discard_recording());
            ui::clear_recording();
        }
    }
}

/// Page is going away: release the capture without publishing anything
pub fn teardown() {
    if with_state(|state| state.controller.teardown()) {
        ui::update_recording_ui(false);
    }
}

async fn assemble(
    fragments: &[BlobFragment],
    mime_type: &str,
    start_time: f64,
    start_time_utc: String,
) -> Result<PublishedRecording, wasm_bindgen::JsValue> {
    let blobs: Vec<_> = fragments.iter().map(|fragment| fragment.0.clone()).collect();
    let blob = concat_blobs(&blobs, mime_type)?;
    let bytes = blob_bytes(&blob).await?;

    let artifact = RecordedArtifact::from_bytes(bytes, mime_type, fragments.len());
    let summary = RecordingSummary::new(
        &artifact,
        start_time,
        now_ms(),
        start_time_utc,
        current_timestamp_utc(),
    );
    let url = ObjectUrl::for_blob(&blob)?;

    Ok(PublishedRecording {
        artifact,
        summary,
        url,
    })
}

/// Send the published recording to the edit service.
///
/// Every failure ends in the log; the presentation only re-enables the button.
pub async fn edit_recording() {
    let (client, artifact, zoom_points) = with_state(|state| state.edit_input());

    let Some(edited) = client.submit_and_log(artifact.as_ref(), &zoom_points).await else {
        return;
    };

    match ObjectUrl::for_bytes(edited.bytes(), edited.mime_type()) {
        Ok(url) => {
            ui::show_edited(url.as_str());
            with_state(|state| {
                state.publish_edit(PublishedEdit {
                    artifact: edited,
                    url,
                })
            });
        }
        Err(e) => log::error!("[Recorder] Failed to publish edited video: {:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_offered_for_edit_after_discard() {
        let mut state = RecorderState::new(ClientConfig::default());
        state.zoom_points.push(ZoomPoint {
            start_time: 0.0,
            end_time: 1.0,
            start_zoom: 1.0,
            end_zoom: 2.0,
            x: 10.0,
            y: 20.0,
        });

        assert!(state.discard_recording().is_none());
        assert!(state.recording().is_none());

        let (client, artifact, zoom_points) = state.edit_input();
        assert!(artifact.is_none());
        assert_eq!(zoom_points.len(), 1);
        assert!(!client.is_editing());
        assert!(!state.is_recording());
    }
}
