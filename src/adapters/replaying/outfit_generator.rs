//! Replaying adapter for the `OutfitGenerator` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::adapters::recording::outfit_generator::PORT;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{Capabilities, GenerateFuture, OutfitGenerator, OutfitResponse, RawError};
use crate::request::GenerationRequest;

/// Serves recorded generation results from a cassette.
///
/// Needs no credentials. Capabilities are supplied by the caller so replayed
/// responses are checked the same way live ones are.
pub struct ReplayingOutfitGenerator {
    replayer: Arc<Mutex<CassetteReplayer>>,
    capabilities: Capabilities,
}

impl ReplayingOutfitGenerator {
    /// Create a replaying generator backed by `replayer`.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>, capabilities: Capabilities) -> Self {
        Self { replayer, capabilities }
    }
}

impl OutfitGenerator for ReplayingOutfitGenerator {
    fn generate(&self, _request: &GenerationRequest) -> GenerateFuture<'_> {
        let result = next_output(&self.replayer, PORT, "generate")
            .map_err(|e| RawError::transport(e.to_string()))
            .and_then(|output| replay_result::<OutfitResponse, RawError>(output, RawError::transport));
        Box::pin(async move { result })
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use crate::request::build_request;
    use crate::upload::UploadedImage;

    fn generator(outputs: Vec<serde_json::Value>) -> ReplayingOutfitGenerator {
        let interactions = outputs
            .into_iter()
            .enumerate()
            .map(|(seq, output)| Interaction {
                seq: seq as u64,
                port: PORT.into(),
                method: "generate".into(),
                input: json!({}),
                output,
            })
            .collect();
        let cassette = Cassette { name: "t".into(), recorded_at: Utc::now(), commit: "c".into(), interactions };
        ReplayingOutfitGenerator::new(Arc::new(Mutex::new(CassetteReplayer::new(&cassette))), Capabilities::default())
    }

    fn request() -> GenerationRequest {
        build_request(
            &UploadedImage::from_bytes("a.jpg", "image/jpeg", vec![1u8]),
            &UploadedImage::from_bytes("b.png", "image/png", vec![2u8]),
            None,
        )
    }

    #[tokio::test]
    async fn serves_recordings_then_reports_exhaustion() {
        let generator = generator(vec![
            json!({"Ok": {"description": "first"}}),
            json!({"Err": {"kind": "upstream", "status": 401, "message": "bad key"}}),
        ]);

        let first = generator.generate(&request()).await.unwrap();
        assert_eq!(first.description.as_deref(), Some("first"));

        let second = generator.generate(&request()).await.unwrap_err();
        assert_eq!(second, RawError::status(401, None, "bad key"));

        let third = generator.generate(&request()).await.unwrap_err();
        assert!(third.to_string().contains("cassette exhausted"));
        assert!(generator.credentials().is_ok());
    }
}
