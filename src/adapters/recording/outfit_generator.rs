//! Recording adapter for the `OutfitGenerator` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{Capabilities, GenerateFuture, OutfitGenerator, RawError};
use crate::request::{BodyData, GenerationRequest, RequestImage};

/// Port name used in cassettes.
pub const PORT: &str = "outfit_generator";

/// Records generation calls while delegating to a live generator.
///
/// Image bytes are not written to the cassette; only their names, types and
/// sizes are, next to the prompt.
pub struct RecordingOutfitGenerator {
    inner: Box<dyn OutfitGenerator>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingOutfitGenerator {
    /// Wrap `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn OutfitGenerator>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct ImageSummary<'a> {
    name: &'a str,
    mime_type: &'a str,
    size: usize,
}

impl<'a> From<&'a RequestImage> for ImageSummary<'a> {
    fn from(image: &'a RequestImage) -> Self {
        Self { name: &image.name, mime_type: &image.mime_type, size: image.data.len() }
    }
}

#[derive(Serialize)]
struct RecordedRequest<'a> {
    person_image: ImageSummary<'a>,
    clothing_image: ImageSummary<'a>,
    body_data: Option<&'a BodyData>,
    prompt: &'a str,
}

impl OutfitGenerator for RecordingOutfitGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
        let request = request.clone();
        let recorder = Arc::clone(&self.recorder);

        Box::pin(async move {
            let result = self.inner.generate(&request).await;
            let input = RecordedRequest {
                person_image: (&request.person_image).into(),
                clothing_image: (&request.clothing_image).into(),
                body_data: request.body_data.as_ref(),
                prompt: &request.prompt,
            };
            record_result(&recorder, PORT, "generate", &input, &result);
            result
        })
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn credentials(&self) -> Result<(), RawError> {
        self.inner.credentials()
    }
}
