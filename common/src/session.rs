//! Capture session lifecycle.
//!
//! A session co-owns the capture stream and the recording sink bound to it.
//! Fragments emitted by the sink are buffered in order; when the sink reports
//! that it stopped, the buffer is drained and the stream released. The
//! platform guarantees the stop notification arrives after every fragment of
//! the session, so draining on stop never loses data.

use crate::config::TeardownPolicy;
use crate::error::{CaptureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

impl TrackKind {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "video" => TrackKind::Video,
            "audio" => TrackKind::Audio,
            _ => TrackKind::Other,
        }
    }
}

/// One track of a capture stream
pub trait MediaTrack {
    fn kind(&self) -> TrackKind;
    fn is_live(&self) -> bool;
    fn stop(&self);
}

/// A live capture stream
pub trait CaptureStream {
    type Track: MediaTrack;

    fn tracks(&self) -> Vec<Self::Track>;
}

/// Encoder bound to a capture stream
pub trait RecordingSink {
    fn start(&self) -> Result<()>;

    /// Ask the sink to finalize; completion is reported asynchronously
    fn stop(&self) -> Result<()>;
}

/// A chunk of encoded output
pub trait Fragment {
    fn byte_len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }
}

impl Fragment for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl Fragment for &[u8] {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

/// Emission-ordered fragment accumulator that drops empty fragments
#[derive(Debug)]
pub struct FragmentBuffer<F> {
    fragments: Vec<F>,
    byte_len: usize,
}

impl<F: Fragment> FragmentBuffer<F> {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            byte_len: 0,
        }
    }

    /// Returns false when the fragment was empty and skipped
    pub fn push(&mut self, fragment: F) -> bool {
        if fragment.is_empty() {
            return false;
        }
        self.byte_len += fragment.byte_len();
        self.fragments.push(fragment);
        true
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn take(&mut self) -> Vec<F> {
        self.byte_len = 0;
        std::mem::take(&mut self.fragments)
    }
}

impl<F: Fragment> Default for FragmentBuffer<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop the tracks the policy covers; returns how many were stopped
pub fn stop_tracks<S: CaptureStream>(stream: &S, policy: TeardownPolicy) -> usize {
    let mut stopped = 0;
    for track in stream.tracks() {
        let covered = match policy {
            TeardownPolicy::VideoOnly => track.kind() == TrackKind::Video,
            TeardownPolicy::AllTracks => true,
        };
        if covered && track.is_live() {
            track.stop();
            stopped += 1;
        }
    }
    stopped
}

/// An active capture: stream, sink, and the fragments emitted so far
pub struct CaptureSession<S, R, F> {
    stream: Option<S>,
    sink: R,
    fragments: FragmentBuffer<F>,
    teardown: TeardownPolicy,
    stop_requested: bool,
}

impl<S, R, F> CaptureSession<S, R, F>
where
    S: CaptureStream,
    R: RecordingSink,
    F: Fragment,
{
    pub fn new(stream: S, sink: R, teardown: TeardownPolicy) -> Self {
        Self {
            stream: Some(stream),
            sink,
            fragments: FragmentBuffer::new(),
            teardown,
            stop_requested: false,
        }
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn fragments(&self) -> &FragmentBuffer<F> {
        &self.fragments
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn push_fragment(&mut self, fragment: F) -> bool {
        self.fragments.push(fragment)
    }

    pub fn request_stop(&mut self) -> Result<()> {
        if self.stop_requested {
            return Ok(());
        }
        self.sink.stop()?;
        self.stop_requested = true;
        Ok(())
    }

    /// Release platform capture resources held by the stream
    pub fn stop_capture(&mut self) -> usize {
        match self.stream.take() {
            Some(stream) => stop_tracks(&stream, self.teardown),
            None => 0,
        }
    }

    pub fn take_fragments(&mut self) -> Vec<F> {
        self.fragments.take()
    }
}

/// Owns at most one capture session at a time
pub struct CaptureController<S, R, F> {
    session: Option<CaptureSession<S, R, F>>,
    teardown: TeardownPolicy,
}

impl<S, R, F> CaptureController<S, R, F>
where
    S: CaptureStream,
    R: RecordingSink,
    F: Fragment,
{
    pub fn new(teardown: TeardownPolicy) -> Self {
        Self {
            session: None,
            teardown,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&CaptureSession<S, R, F>> {
        self.session.as_ref()
    }

    /// Cheap pre-check callers use before negotiating a new stream
    pub fn ensure_idle(&self) -> Result<()> {
        if self.is_active() {
            return Err(CaptureError::Busy);
        }
        Ok(())
    }

    /// Bind a sink to a freshly acquired stream and start recording.
    ///
    /// When another session is active the new stream is released and
    /// `Busy` is returned; the running session is left untouched.
    pub fn start_capture(&mut self, stream: S, sink: R) -> Result<()> {
        if self.is_active() {
            stop_tracks(&stream, TeardownPolicy::AllTracks);
            return Err(CaptureError::Busy);
        }

        let mut session = CaptureSession::new(stream, sink, self.teardown);
        if let Err(e) = session.sink().start() {
            session.stop_capture();
            return Err(e);
        }

        log::info!("Capture session started");
        self.session = Some(session);
        Ok(())
    }

    /// Ask the sink to finalize. A no-op without an active session.
    pub fn stop_recording(&mut self) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => session.request_stop(),
            None => {
                log::debug!("Stop requested with no active session");
                Ok(())
            }
        }
    }

    /// Fragment-available reaction
    pub fn on_fragment(&mut self, fragment: F) -> bool {
        match self.session.as_mut() {
            Some(session) => session.push_fragment(fragment),
            None => {
                log::warn!("Dropping fragment emitted outside a capture session");
                false
            }
        }
    }

    /// Sink-stopped reaction: drain fragments in emission order and release
    /// the session. Returns `None` when no session was active.
    pub fn on_sink_stopped(&mut self) -> Option<Vec<F>> {
        let mut session = self.session.take()?;
        let fragments = session.take_fragments();
        let stopped = session.stop_capture();
        log::info!(
            "Capture session finished with {} fragments, {} tracks stopped",
            fragments.len(),
            stopped
        );
        Some(fragments)
    }

    /// Release the stream of the active session without waiting for the sink
    pub fn stop_capture_session(&mut self) -> usize {
        self.session
            .as_mut()
            .map(|session| session.stop_capture())
            .unwrap_or(0)
    }

    /// Drop the active session entirely, discarding buffered fragments.
    /// The sink is dropped with it, so its late events are never delivered.
    pub fn teardown(&mut self) -> bool {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.request_stop() {
                log::warn!("Sink refused to stop during teardown: {}", e);
            }
        }
        let stopped = self.stop_capture_session();
        match self.session.take() {
            Some(session) => {
                log::info!(
                    "Capture session torn down, {} tracks stopped, {} fragments discarded",
                    stopped,
                    session.fragments().len()
                );
                true
            }
            None => false,
        }
    }
}
