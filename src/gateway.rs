//! Single-round-trip gateway in front of an [`OutfitGenerator`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ports::{Capabilities, OutfitGenerator, OutfitResponse, RawError};
use crate::request::GenerationRequest;

/// Result of one round trip, with its wall-clock duration.
#[derive(Debug)]
pub struct GatewayOutcome {
    /// Raw response or raw failure, unclassified.
    pub result: Result<OutfitResponse, RawError>,
    /// Time from dispatch to receipt or failure.
    pub elapsed: Duration,
}

/// Sends requests to the generation capability without retrying.
pub struct GenerationGateway {
    generator: Box<dyn OutfitGenerator>,
}

impl GenerationGateway {
    /// Wrap a generator.
    #[must_use]
    pub fn new(generator: Box<dyn OutfitGenerator>) -> Self {
        Self { generator }
    }

    /// Output capabilities of the underlying generator.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.generator.capabilities()
    }

    /// Check credentials without any network access.
    ///
    /// # Errors
    ///
    /// Returns [`RawError::MissingCredentials`] when none are configured.
    pub fn credentials(&self) -> Result<(), RawError> {
        self.generator.credentials()
    }

    /// Perform one round trip.
    ///
    /// Cancelling `cancel` drops the in-flight call and yields
    /// [`RawError::Cancelled`]. An image-capable generator that answers
    /// without an image is reported as an upstream failure.
    pub async fn send(&self, request: &GenerationRequest, cancel: &CancellationToken) -> GatewayOutcome {
        let started = Instant::now();
        debug!(
            person = %request.person_image.name,
            clothing = %request.clothing_image.name,
            "dispatching generation request"
        );

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RawError::Cancelled),
            result = self.generator.generate(request) => result,
        };
        let result = result.and_then(|response| self.check_shape(response));

        let elapsed = started.elapsed();
        match &result {
            Ok(_) => info!(elapsed_ms = %elapsed.as_millis(), "generation response received"),
            Err(e) => info!(elapsed_ms = %elapsed.as_millis(), error = %e, "generation failed"),
        }
        GatewayOutcome { result, elapsed }
    }

    fn check_shape(&self, response: OutfitResponse) -> Result<OutfitResponse, RawError> {
        if self.capabilities().image_output && !response.has_image() {
            return Err(RawError::status(200, None, "No image in response"));
        }
        Ok(response)
    }
}
