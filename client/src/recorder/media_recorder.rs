use common::{CaptureError, Fragment, RecorderOptions, RecordingSink};
use wasm_bindgen::prelude::*;
use web_sys::{Blob, BlobEvent, MediaRecorder, MediaRecorderOptions};

use crate::recorder::media_streams::{ShareEndedListener, WebStream};
use crate::recorder::utils::js_error_message;

/// Encoded chunk delivered by `dataavailable`
#[derive(Clone)]
pub struct BlobFragment(pub Blob);

impl Fragment for BlobFragment {
    fn byte_len(&self) -> usize {
        self.0.size() as usize
    }
}

/// `MediaRecorder` bound to one capture stream.
///
/// The event closures live as long as the recorder; handlers are detached
/// when it drops so a late event cannot reach freed closures.
pub struct Recorder {
    inner: MediaRecorder,
    mime_type: String,
    _on_data: Closure<dyn FnMut(BlobEvent)>,
    _on_stop: Closure<dyn FnMut(web_sys::Event)>,
    share_ended: Option<ShareEndedListener>,
}

impl Recorder {
    pub fn new(
        stream: &WebStream,
        options: &RecorderOptions,
        mut on_fragment: Box<dyn FnMut(BlobFragment)>,
        mut on_stop: Box<dyn FnMut()>,
    ) -> Result<Self, CaptureError> {
        if !MediaRecorder::is_type_supported(&options.mime_type) {
            return Err(CaptureError::Recorder(format!(
                "Unsupported recording format: {}",
                options.mime_type
            )));
        }

        let recorder_options = MediaRecorderOptions::new();
        recorder_options.set_mime_type(&options.mime_type);
        recorder_options.set_video_bits_per_second(options.video_bits_per_second);

        let inner = MediaRecorder::new_with_media_stream_and_media_recorder_options(
            stream.inner(),
            &recorder_options,
        )
        .map_err(|e| CaptureError::Recorder(js_error_message(&e)))?;

        let on_data = Closure::wrap(Box::new(move |event: BlobEvent| {
            if let Some(blob) = event.data() {
                on_fragment(BlobFragment(blob));
            }
        }) as Box<dyn FnMut(BlobEvent)>);
        inner.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        let on_stop_closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            on_stop();
        }) as Box<dyn FnMut(web_sys::Event)>);
        inner.set_onstop(Some(on_stop_closure.as_ref().unchecked_ref()));

        log::info!(
            "MediaRecorder created: {} at {} bps",
            options.mime_type,
            options.video_bits_per_second
        );

        Ok(Self {
            inner,
            mime_type: options.container_type().to_string(),
            _on_data: on_data,
            _on_stop: on_stop_closure,
            share_ended: None,
        })
    }

    /// Keep the share-ended listener alive for exactly this recorder's lifetime
    pub fn watch_share_end(&mut self, listener: ShareEndedListener) {
        self.share_ended = Some(listener);
    }

    /// Container type the assembled artifact is labelled with
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

impl RecordingSink for Recorder {
    fn start(&self) -> common::error::Result<()> {
        self.inner
            .start()
            .map_err(|e| CaptureError::Recorder(js_error_message(&e)))
    }

    fn stop(&self) -> common::error::Result<()> {
        if self.inner.state() == web_sys::RecordingState::Inactive {
            return Ok(());
        }
        self.inner
            .stop()
            .map_err(|e| CaptureError::Recorder(js_error_message(&e)))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.inner.set_ondataavailable(None);
        self.inner.set_onstop(None);
        self.share_ended = None;
    }
}
