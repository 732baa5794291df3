//! Remote edit round-trip.
//!
//! The recorded video is uploaded as a single multipart file part and the
//! service answers with the edited video. There is exactly one request per
//! submission: no retries, no progress reporting.

use crate::artifact::{EditedArtifact, RecordedArtifact};
use crate::config::EditServiceConfig;
use crate::error::{EditError, EditResult, TransportError};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Zoom keyframe understood by the edit service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomPoint {
    /// Seconds from the start of the video
    pub start_time: f64,
    pub end_time: f64,
    pub start_zoom: f64,
    pub end_zoom: f64,
    /// Zoom centre in pixels
    pub x: f64,
    pub y: f64,
}

impl ZoomPoint {
    pub fn is_valid(&self) -> bool {
        self.end_time > self.start_time && self.start_zoom > 0.0 && self.end_zoom > 0.0
    }
}

/// Form field the service reads zoom points from
pub const ZOOM_POINTS_FIELD: &str = "zoomPoints";

/// Everything a transport needs to issue the upload
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub endpoint: String,
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub video: RecordedArtifact,
    pub zoom_points: Vec<ZoomPoint>,
    /// None means wait forever
    pub timeout: Option<Duration>,
}

impl EditRequest {
    pub fn new(config: &EditServiceConfig, video: RecordedArtifact, zoom_points: Vec<ZoomPoint>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            field_name: config.field_name.clone(),
            file_name: config.file_name.clone(),
            content_type: config.content_type.clone(),
            video,
            zoom_points,
            timeout: config.timeout(),
        }
    }

    /// Deadline in the unit browser timers take, never above `i32::MAX`
    pub fn timeout_millis(&self) -> Option<u32> {
        self.timeout
            .map(|timeout| timeout.as_millis().min(i32::MAX as u128) as u32)
    }

    /// JSON for the zoom points field; omitted when there are none
    pub fn zoom_points_json(&self) -> Option<String> {
        if self.zoom_points.is_empty() {
            return None;
        }
        serde_json::to_string(&self.zoom_points).ok()
    }
}

/// Raw HTTP answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl EditResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as diagnostic text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues the multipart POST
#[allow(async_fn_in_trait)]
pub trait EditTransport {
    async fn send(&self, request: &EditRequest) -> Result<EditResponse, TransportError>;
}

/// Shared "edit in progress" flag observed by the presentation layer
#[derive(Clone, Default)]
pub struct EditProgress(Rc<ProgressInner>);

#[derive(Default)]
struct ProgressInner {
    active: Cell<bool>,
    listener: RefCell<Option<Box<dyn Fn(bool)>>>,
}

impl EditProgress {
    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Called with the new value every time the flag flips
    pub fn set_listener(&self, listener: Box<dyn Fn(bool)>) {
        *self.0.listener.borrow_mut() = Some(listener);
    }

    fn set(&self, active: bool) {
        self.0.active.set(active);
        if let Some(listener) = self.0.listener.borrow().as_ref() {
            listener(active);
        }
    }

    /// Raise the flag until the guard drops; None if already raised
    fn acquire(&self) -> Option<ProgressGuard> {
        if self.is_active() {
            return None;
        }
        self.set(true);
        Some(ProgressGuard(self.clone()))
    }
}

struct ProgressGuard(EditProgress);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Sends recordings to the edit service
pub struct EditClient<T> {
    transport: T,
    config: EditServiceConfig,
    progress: EditProgress,
}

impl<T: EditTransport> EditClient<T> {
    pub fn new(transport: T, config: EditServiceConfig) -> Self {
        Self {
            transport,
            config,
            progress: EditProgress::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &EditServiceConfig {
        &self.config
    }

    pub fn progress(&self) -> EditProgress {
        self.progress.clone()
    }

    pub fn is_editing(&self) -> bool {
        self.progress.is_active()
    }

    /// Upload the artifact and wait for the edited result.
    ///
    /// Returns `Ok(None)` without touching the network when there is no
    /// artifact or another submission is still in flight.
    pub async fn submit_for_edit(
        &self,
        artifact: Option<&RecordedArtifact>,
        zoom_points: &[ZoomPoint],
    ) -> EditResult<Option<EditedArtifact>> {
        let Some(artifact) = artifact else {
            log::debug!("No recording to edit");
            return Ok(None);
        };
        let Some(_guard) = self.progress.acquire() else {
            log::warn!("Edit already in progress, ignoring submission");
            return Ok(None);
        };

        let request = EditRequest::new(&self.config, artifact.clone(), zoom_points.to_vec());
        log::info!(
            "Submitting {} bytes for edit to {}",
            artifact.len(),
            request.endpoint
        );

        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            return Err(EditError::Rejected {
                status: response.status,
                message: response.text(),
            });
        }

        let mime_type = response
            .content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(self.config.content_type.as_str())
            .to_string();
        log::info!("Received edited video: {} bytes", response.body.len());
        Ok(Some(EditedArtifact::new(response.body, &mime_type)))
    }

    /// Submission boundary: failures are logged, never propagated
    pub async fn submit_and_log(
        &self,
        artifact: Option<&RecordedArtifact>,
        zoom_points: &[ZoomPoint],
    ) -> Option<EditedArtifact> {
        match self.submit_for_edit(artifact, zoom_points).await {
            Ok(edited) => edited,
            Err(e) => {
                log::error!("Video edit failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CaptureLogger;

    static LOGGER: CaptureLogger = CaptureLogger;
    static RECORDS: Mutex<Vec<String>> = Mutex::new(Vec::new());

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            RECORDS
                .lock()
                .unwrap()
                .push(format!("{} {}", record.level(), record.args()));
        }

        fn flush(&self) {}
    }

    fn init_logger() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
    }

    fn logged(needle: &str) -> bool {
        RECORDS.lock().unwrap().iter().any(|line| line.contains(needle))
    }

    enum Reply {
        Respond(EditResponse),
        Fail(TransportError),
    }

    struct FakeTransport {
        reply: Reply,
        requests: RefCell<Vec<EditRequest>>,
        progress: RefCell<Option<EditProgress>>,
        progress_seen: RefCell<Vec<bool>>,
    }

    impl FakeTransport {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                requests: RefCell::new(Vec::new()),
                progress: RefCell::new(None),
                progress_seen: RefCell::new(Vec::new()),
            }
        }

        fn ok(body: &[u8]) -> Self {
            Self::new(Reply::Respond(EditResponse {
                status: 200,
                content_type: Some("video/webm".to_string()),
                body: body.to_vec(),
            }))
        }

        fn status(status: u16, body: &str) -> Self {
            Self::new(Reply::Respond(EditResponse {
                status,
                content_type: Some("text/html".to_string()),
                body: body.as_bytes().to_vec(),
            }))
        }
    }

    impl EditTransport for FakeTransport {
        async fn send(&self, request: &EditRequest) -> Result<EditResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            if let Some(progress) = self.progress.borrow().as_ref() {
                self.progress_seen.borrow_mut().push(progress.is_active());
            }
            match &self.reply {
                Reply::Respond(response) => Ok(response.clone()),
                Reply::Fail(error) => Err(error.clone()),
            }
        }
    }

    fn client(transport: FakeTransport) -> EditClient<FakeTransport> {
        let client = EditClient::new(transport, EditServiceConfig::default());
        *client.transport().progress.borrow_mut() = Some(client.progress());
        client
    }

    fn recording() -> RecordedArtifact {
        RecordedArtifact::assemble(vec![vec![1u8; 10], vec![2u8; 20]], "video/webm")
    }

    #[tokio::test]
    async fn test_submit_without_artifact_is_noop() {
        let client = client(FakeTransport::ok(b"edited"));
        let result = client.submit_for_edit(None, &[]).await;

        assert_eq!(result, Ok(None));
        assert!(client.transport().requests.borrow().is_empty());
        assert!(!client.is_editing());
    }

    #[tokio::test]
    async fn test_successful_edit_publishes_artifact() {
        let client = client(FakeTransport::ok(b"edited-video"));
        let artifact = recording();

        let edited = client
            .submit_for_edit(Some(&artifact), &[])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(edited.bytes(), b"edited-video");
        assert_eq!(edited.mime_type(), "video/webm");
        assert!(!client.is_editing());
        assert_eq!(*client.transport().progress_seen.borrow(), vec![true]);

        let requests = client.transport().requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, "http://127.0.0.1:5000/edit_video");
        assert_eq!(requests[0].field_name, "video");
        assert_eq!(requests[0].file_name, "screen_recording.webm");
        assert_eq!(requests[0].content_type, "video/webm");
        assert_eq!(requests[0].video.len(), 30);
        assert_eq!(requests[0].timeout, Some(Duration::from_secs(300)));
        assert!(requests[0].zoom_points_json().is_none());
    }

    #[tokio::test]
    async fn test_rejection_is_logged_and_not_published() {
        init_logger();
        let client = client(FakeTransport::status(500, "decode error"));
        let artifact = recording();

        let result = client.submit_for_edit(Some(&artifact), &[]).await;
        assert_eq!(
            result,
            Err(EditError::Rejected {
                status: 500,
                message: "decode error".to_string()
            })
        );
        assert!(!client.is_editing());

        let edited = client.submit_and_log(Some(&artifact), &[]).await;
        assert!(edited.is_none());
        assert!(!client.is_editing());
        assert!(logged("decode error"));
        assert_eq!(*client.transport().progress_seen.borrow(), vec![true, true]);
    }

    #[tokio::test]
    async fn test_transport_failure_clears_flag() {
        init_logger();
        let client = client(FakeTransport::new(Reply::Fail(TransportError::Network(
            "connection refused".to_string(),
        ))));
        let artifact = recording();

        let result = client.submit_for_edit(Some(&artifact), &[]).await;
        assert_eq!(
            result,
            Err(EditError::Transport("connection refused".to_string()))
        );
        assert!(!client.is_editing());

        assert!(client.submit_and_log(Some(&artifact), &[]).await.is_none());
        assert!(logged("connection refused"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let client = client(FakeTransport::new(Reply::Fail(TransportError::TimedOut(300))));
        let result = client.submit_for_edit(Some(&recording()), &[]).await;
        assert_eq!(result, Err(EditError::Timeout(300)));
        assert!(!client.is_editing());
    }

    #[tokio::test]
    async fn test_zero_timeout_means_unbounded() {
        let config = EditServiceConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        let client = EditClient::new(FakeTransport::ok(b"x"), config);
        client.submit_for_edit(Some(&recording()), &[]).await.unwrap();
        assert_eq!(client.transport().requests.borrow()[0].timeout, None);
    }

    #[tokio::test]
    async fn test_oversized_timeout_stays_a_positive_timer_delay() {
        let config = EditServiceConfig {
            timeout_secs: 3_000_000,
            ..Default::default()
        };
        let client = EditClient::new(FakeTransport::ok(b"x"), config);
        client.submit_for_edit(Some(&recording()), &[]).await.unwrap();

        let requests = client.transport().requests.borrow();
        let millis = requests[0].timeout_millis().unwrap();
        assert!(millis as i32 > 0);
        assert_eq!(millis, 2_147_483_000);
    }

    #[tokio::test]
    async fn test_submission_ignored_while_in_flight() {
        let client = client(FakeTransport::ok(b"x"));
        let guard = client.progress().acquire().unwrap();

        let result = client.submit_for_edit(Some(&recording()), &[]).await;
        assert_eq!(result, Ok(None));
        assert!(client.transport().requests.borrow().is_empty());

        drop(guard);
        assert!(!client.is_editing());
    }

    #[tokio::test]
    async fn test_listener_sees_every_transition() {
        let client = client(FakeTransport::status(502, "bad gateway"));
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let seen = transitions.clone();
        client
            .progress()
            .set_listener(Box::new(move |active| seen.borrow_mut().push(active)));

        client.submit_and_log(None, &[]).await;
        assert!(transitions.borrow().is_empty());

        client.submit_and_log(Some(&recording()), &[]).await;
        assert_eq!(*transitions.borrow(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_zoom_points_are_sent() {
        let client = client(FakeTransport::ok(b"x"));
        let points = vec![ZoomPoint {
            start_time: 1.0,
            end_time: 3.0,
            start_zoom: 1.0,
            end_zoom: 2.0,
            x: 640.0,
            y: 360.0,
        }];

        client
            .submit_for_edit(Some(&recording()), &points)
            .await
            .unwrap();

        let json = client.transport().requests.borrow()[0]
            .zoom_points_json()
            .unwrap();
        assert!(json.contains("\"startTime\":1.0"));
        assert!(json.contains("\"endZoom\":2.0"));
    }

    #[test]
    fn test_response_status_classification() {
        let mut response = EditResponse {
            status: 204,
            content_type: None,
            body: Vec::new(),
        };
        assert!(response.is_success());
        response.status = 302;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }

    #[test]
    fn test_zoom_point_validity() {
        let mut point = ZoomPoint {
            start_time: 2.0,
            end_time: 1.0,
            start_zoom: 1.0,
            end_zoom: 1.5,
            x: 0.0,
            y: 0.0,
        };
        assert!(!point.is_valid());
        point.end_time = 4.0;
        assert!(point.is_valid());
    }
}
