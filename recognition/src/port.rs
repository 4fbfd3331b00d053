use std::future::Future;

use crate::RecognitionError;

/// Enroll one face image under a label.
#[derive(Clone, Copy, Debug)]
pub struct BindRequest<'a> {
    pub label: &'a str,
    /// Sent only when non-blank.
    pub external_ref: &'a str,
    pub image_name: &'a str,
    pub image: &'a [u8],
}

/// What the engine stored for a bind. Any field may come back blank.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundFace {
    pub id: String,
    pub label: String,
    pub external_ref: String,
    pub image_path: String,
}

#[derive(Clone, Copy, Debug)]
pub struct RecognizeRequest<'a> {
    pub image_name: &'a str,
    pub image: &'a [u8],
}

/// Best match reported by the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recognition {
    /// Untrimmed; may be blank when nothing matched.
    pub label: String,
    /// Percentage scale.
    pub similarity: f64,
    /// Lower is closer. Some engine configurations omit it.
    pub distance: Option<f64>,
}

pub trait RecognitionClient: Send + Sync {
    fn bind(
        &self,
        request: BindRequest<'_>,
    ) -> impl Future<Output = Result<BoundFace, RecognitionError>> + Send;

    fn recognize(
        &self,
        request: RecognizeRequest<'_>,
    ) -> impl Future<Output = Result<Recognition, RecognitionError>> + Send;
}
