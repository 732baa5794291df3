use common::{CaptureConstraints, CaptureError, CaptureStream, MediaTrack, TrackKind};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaStream, MediaStreamTrack, MediaStreamTrackState};

use crate::recorder::utils::js_error_message;

/// Ask the user to pick a screen, window or tab to capture
pub async fn get_screen_stream(constraints: &CaptureConstraints) -> Result<WebStream, CaptureError> {
    let window = web_sys::window().ok_or_else(|| CaptureError::Platform("No window".to_string()))?;
    let media_devices = window
        .navigator()
        .media_devices()
        .map_err(|e| CaptureError::Platform(js_error_message(&e)))?;

    let video = serde_wasm_bindgen::to_value(&constraints.video)
        .map_err(|e| CaptureError::Platform(e.to_string()))?;

    let display_constraints = web_sys::DisplayMediaStreamConstraints::new();
    display_constraints.set_audio(&JsValue::from_bool(constraints.audio));
    display_constraints.set_video(&video);

    let promise = media_devices
        .get_display_media_with_constraints(&display_constraints)
        .map_err(|e| classify_rejection(&e))?;
    let stream_js = JsFuture::from(promise).await.map_err(|e| classify_rejection(&e))?;

    Ok(WebStream(MediaStream::from(stream_js)))
}

fn classify_rejection(value: &JsValue) -> CaptureError {
    match value.dyn_ref::<web_sys::DomException>() {
        Some(exception) => classify_capture_error(&exception.name(), &exception.message()),
        None => CaptureError::Platform(js_error_message(value)),
    }
}

/// Map a `getDisplayMedia` DOMException name onto the capture error taxonomy
pub fn classify_capture_error(name: &str, message: &str) -> CaptureError {
    match name {
        "NotAllowedError" | "SecurityError" => CaptureError::PermissionDenied(message.to_string()),
        "NotFoundError" | "AbortError" | "NotReadableError" | "InvalidStateError" => {
            CaptureError::NoSourceAvailable(message.to_string())
        }
        other => CaptureError::Platform(format!("{}: {}", other, message)),
    }
}

#[derive(Clone)]
pub struct WebTrack(pub MediaStreamTrack);

impl MediaTrack for WebTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::from_kind(&self.0.kind())
    }

    fn is_live(&self) -> bool {
        self.0.ready_state() == MediaStreamTrackState::Live
    }

    fn stop(&self) {
        log::debug!("Stopping {} track {}", self.0.kind(), self.0.label());
        self.0.stop();
    }
}

#[derive(Clone)]
pub struct WebStream(pub MediaStream);

impl WebStream {
    pub fn inner(&self) -> &MediaStream {
        &self.0
    }
}

impl CaptureStream for WebStream {
    type Track = WebTrack;

    fn tracks(&self) -> Vec<WebTrack> {
        self.0
            .get_tracks()
            .iter()
            .map(|track| WebTrack(MediaStreamTrack::from(track)))
            .collect()
    }
}

/// `ended` listener on the captured video track, detached when dropped
pub struct ShareEndedListener {
    track: MediaStreamTrack,
    closure: Closure<dyn Fn()>,
}

impl Drop for ShareEndedListener {
    fn drop(&mut self) {
        let _ = self
            .track
            .remove_event_listener_with_callback("ended", self.closure.as_ref().unchecked_ref());
    }
}

/// Invoke `callback` when the user ends sharing from the browser's own UI.
///
/// The listener lives as long as the returned handle.
pub fn add_screen_stop_listener(
    stream: &WebStream,
    callback: Box<dyn Fn()>,
) -> Result<Option<ShareEndedListener>, JsValue> {
    let tracks = stream.0.get_video_tracks();
    if tracks.length() == 0 {
        return Ok(None);
    }
    let track = MediaStreamTrack::from(tracks.get(0));
    let closure = Closure::wrap(callback);
    track.add_event_listener_with_callback("ended", closure.as_ref().unchecked_ref())?;
    Ok(Some(ShareEndedListener { track, closure }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_errors() {
        assert_eq!(
            classify_capture_error("NotAllowedError", "Permission denied by user"),
            CaptureError::PermissionDenied("Permission denied by user".to_string())
        );
        assert!(matches!(
            classify_capture_error("SecurityError", "insecure context"),
            CaptureError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_no_source_errors() {
        for name in ["NotFoundError", "AbortError", "NotReadableError", "InvalidStateError"] {
            assert!(matches!(
                classify_capture_error(name, "no source"),
                CaptureError::NoSourceAvailable(_)
            ));
        }
    }

    #[test]
    fn test_unknown_errors_keep_name() {
        let err = classify_capture_error("TypeError", "bad constraints");
        assert_eq!(
            err,
            CaptureError::Platform("TypeError: bad constraints".to_string())
        );
    }
}
