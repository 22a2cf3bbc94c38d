//! Queue message codec
//!
//! Body is UTF-8 JSON `{"job_id": "<uuid>"}`, content type `application/json`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: Uuid,
}

impl JobMessage {
    pub fn new(job_id: Uuid) -> Self {
        Self { job_id }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a delivery body; anything but a JSON object with a UUID `job_id` is rejected
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
