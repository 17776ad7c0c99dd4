//! Batch orchestration over many base64-encoded images.
//!
//! Every input index produces exactly one result, in input order. A failing
//! item is reported in place and never stops the rest of the batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::codec;
use crate::pipeline::ImageProcessor;

/// Outcome for one input image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemResult {
    Segments { segments: Vec<String> },
    Error { error: String, details: Option<String> },
}

impl BatchItemResult {
    pub fn error(error: impl Into<String>, details: Option<String>) -> Self {
        BatchItemResult::Error {
            error: error.into(),
            details,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, BatchItemResult::Error { .. })
    }

    pub fn segments(&self) -> Option<&[String]> {
        match self {
            BatchItemResult::Segments { segments } => Some(segments),
            BatchItemResult::Error { .. } => None,
        }
    }
}

/// Response body for a batch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResponse {
    Results { results: Vec<BatchItemResult> },
    /// The request itself was malformed
    Invalid { error: String },
}

/// Process each element of `images` in order.
pub fn process_batch<P: ImageProcessor + ?Sized>(processor: &mut P, images: &[Value]) -> Vec<BatchItemResult> {
    let request_id = Uuid::new_v4();
    let span = info_span!("batch", %request_id, size = images.len());
    let _guard = span.enter();

    info!("Received {} image(s) to process", images.len());
    let results: Vec<BatchItemResult> = images
        .iter()
        .enumerate()
        .map(|(index, item)| process_item(processor, index, item))
        .collect();

    let failed = results.iter().filter(|r| r.is_error()).count();
    info!(
        "Finished processing batch: {} succeeded, {} failed",
        results.len() - failed,
        failed
    );
    results
}

fn process_item<P: ImageProcessor + ?Sized>(processor: &mut P, index: usize, item: &Value) -> BatchItemResult {
    let span = info_span!("image", index);
    let _guard = span.enter();

    let Some(encoded) = item.as_str() else {
        warn!("Item at index {} is not a string (expected base64)", index);
        return BatchItemResult::error(format!("Item at index {} is not a base64 string.", index), None);
    };

    let bytes = match codec::decode_base64(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Invalid base64 string: {}", e);
            return BatchItemResult::error(
                format!("Invalid base64 string for image at index {}.", index),
                Some(e.to_string()),
            );
        }
    };

    match processor.process_image_at(index, &bytes) {
        Ok(segments) => {
            info!("Found {} segmented objects", segments.len());
            BatchItemResult::Segments { segments }
        }
        Err(e) => {
            error!(error = ?e, "Error processing image: {}", e);
            BatchItemResult::error(
                format!("Exception processing image at index {}.", index),
                Some(e.to_string()),
            )
        }
    }
}

/// Validate a `{"images": [...]}` request and process it
pub fn handle_request<P: ImageProcessor + ?Sized>(processor: &mut P, request: &Value) -> BatchResponse {
    let Some(images) = request.get("images") else {
        error!("No 'images' key found in input");
        return BatchResponse::Invalid {
            error: "Input JSON must contain an 'images' key with a list of base64 strings.".to_string(),
        };
    };

    let Some(images) = images.as_array() else {
        error!("'images' key does not contain a list");
        return BatchResponse::Invalid {
            error: "'images' key must contain a list of base64 strings.".to_string(),
        };
    };

    if images.is_empty() {
        warn!("Received an empty list under 'images' key");
    }

    BatchResponse::Results {
        results: process_batch(processor, images),
    }
}
