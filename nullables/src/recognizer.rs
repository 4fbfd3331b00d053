//! Nullable recognition engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use lifecert_recognition::{
    BindRequest, BoundFace, Recognition, RecognitionClient, RecognitionError, RecognizeRequest,
};

/// One recorded `bind` call.
#[derive(Clone, Debug, PartialEq)]
pub struct BindCall {
    pub label: String,
    pub external_ref: String,
    pub image_name: String,
    pub image_len: usize,
}

/// Scriptable recognition engine.
///
/// By default `bind` echoes the requested label and external reference back
/// (with id `"face-<label>"`) and `recognize` fails, so a test has to script
/// the match it expects.
pub struct NullRecognizer {
    bind_reply: Mutex<Option<Result<BoundFace, String>>>,
    recognize_reply: Mutex<Option<Result<Recognition, String>>>,
    bind_calls: Mutex<Vec<BindCall>>,
    recognize_calls: AtomicUsize,
}

impl NullRecognizer {
    pub fn new() -> Self {
        Self {
            bind_reply: Mutex::new(None),
            recognize_reply: Mutex::new(None),
            bind_calls: Mutex::new(Vec::new()),
            recognize_calls: AtomicUsize::new(0),
        }
    }

    /// Answer every `bind` with this face instead of echoing the request.
    pub fn with_bound_face(self, face: BoundFace) -> Self {
        *self.bind_reply.lock().unwrap() = Some(Ok(face));
        self
    }

    /// Fail every `bind` with a transport error.
    pub fn failing_bind(self, message: &str) -> Self {
        *self.bind_reply.lock().unwrap() = Some(Err(message.to_string()));
        self
    }

    /// Answer every `recognize` with this match.
    pub fn recognizing(self, label: &str, similarity: f64, distance: Option<f64>) -> Self {
        self.set_recognition(label, similarity, distance);
        self
    }

    /// Fail every `recognize` with a transport error.
    pub fn failing_recognize(self, message: &str) -> Self {
        *self.recognize_reply.lock().unwrap() = Some(Err(message.to_string()));
        self
    }

    pub fn set_recognition(&self, label: &str, similarity: f64, distance: Option<f64>) {
        *self.recognize_reply.lock().unwrap() = Some(Ok(Recognition {
            label: label.to_string(),
            similarity,
            distance,
        }));
    }

    pub fn bind_calls(&self) -> Vec<BindCall> {
        self.bind_calls.lock().unwrap().clone()
    }

    pub fn recognize_calls(&self) -> usize {
        self.recognize_calls.load(Ordering::SeqCst)
    }
}

impl Default for NullRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionClient for NullRecognizer {
    async fn bind(&self, request: BindRequest<'_>) -> Result<BoundFace, RecognitionError> {
        self.bind_calls.lock().unwrap().push(BindCall {
            label: request.label.to_string(),
            external_ref: request.external_ref.to_string(),
            image_name: request.image_name.to_string(),
            image_len: request.image.len(),
        });
        match self.bind_reply.lock().unwrap().clone() {
            Some(Ok(face)) => Ok(face),
            Some(Err(message)) => Err(RecognitionError::Transport(message)),
            None => Ok(BoundFace {
                id: format!("face-{}", request.label),
                label: request.label.to_string(),
                external_ref: request.external_ref.to_string(),
                image_path: format!("/faces/{}.jpg", request.label),
            }),
        }
    }

    async fn recognize(&self, _request: RecognizeRequest<'_>) -> Result<Recognition, RecognitionError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        match self.recognize_reply.lock().unwrap().clone() {
            Some(Ok(recognition)) => Ok(recognition),
            Some(Err(message)) => Err(RecognitionError::Transport(message)),
            None => Err(RecognitionError::Rejected("no recognition scripted".to_string())),
        }
    }
}
