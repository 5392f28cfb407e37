//! Shape processing: the unit of work behind every tracked job.
//!
//! [`JobProcessor`] is the seam the executor runs; [`ShapeGenerator`] is the
//! production implementation, which simulates a slow analysis of the uploaded
//! recording and produces a pseudo-random vertex cloud sized by the file name.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Base number of vertices in a generated shape.
const BASE_VERTEX_COUNT: usize = 1000;

/// Exclusive upper bound on the extra vertices derived from the file name.
const VERTEX_COUNT_SPREAD: usize = 100;

/// Components per vertex (x, y, z).
const COMPONENTS_PER_VERTEX: usize = 3;

/// An uploaded file handed to the executor.
#[derive(Debug, Clone)]
pub struct JobPayload {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// Result of a successful job, delivered as `ShapeProcessingComplete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeData {
    pub source_file: String,
    pub vertices: Vec<f32>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("job panicked")]
    Panicked,
}

/// Work performed for a single submitted job.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    async fn process(&self, payload: JobPayload) -> Result<ShapeData, JobError>;
}

/// Production processor: simulated analysis producing a random vertex cloud.
#[derive(Debug, Clone)]
pub struct ShapeGenerator {
    latency: Duration,
}

impl ShapeGenerator {
    /// Create a generator that sleeps for `latency` before producing a shape.
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl JobProcessor for ShapeGenerator {
    async fn process(&self, payload: JobPayload) -> Result<ShapeData, JobError> {
        tracing::debug!(
            file_name = %payload.file_name,
            bytes = payload.contents.len(),
            latency_ms = self.latency.as_millis() as u64,
            "Generating shape",
        );

        tokio::time::sleep(self.latency).await;

        Ok(ShapeData {
            vertices: generate_vertices(vertex_count(&payload.file_name)),
            source_file: payload.file_name,
        })
    }
}

/// Number of vertices generated for a file with the given name.
pub fn vertex_count(file_name: &str) -> usize {
    BASE_VERTEX_COUNT + file_name.chars().count() % VERTEX_COUNT_SPREAD
}

/// Generate `count` vertices with every component uniformly in `[-1, 1)`.
fn generate_vertices(count: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..count * COMPONENTS_PER_VERTEX)
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count_depends_on_file_name_length() {
        assert_eq!(vertex_count("a.csv"), 1005);
        assert_eq!(vertex_count(""), 1000);
        assert_eq!(vertex_count(&"x".repeat(150)), 1050);
    }

    #[tokio::test(start_paused = true)]
    async fn generator_produces_bounded_vertex_cloud() {
        let generator = ShapeGenerator::new(Duration::from_secs(5));
        let payload = JobPayload {
            file_name: "session-01.edf".to_string(),
            contents: vec![1, 2, 3],
        };

        let shape = generator.process(payload).await.expect("generation succeeds");

        assert_eq!(shape.source_file, "session-01.edf");
        assert_eq!(shape.vertices.len(), vertex_count("session-01.edf") * 3);
        assert!(shape.vertices.iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn shape_data_serializes_with_camel_case_fields() {
        let shape = ShapeData {
            source_file: "a.csv".to_string(),
            vertices: vec![0.5, -0.25],
        };

        let json = serde_json::to_value(&shape).expect("serialization should succeed");

        assert_eq!(json["sourceFile"], "a.csv");
        assert_eq!(json["vertices"], serde_json::json!([0.5, -0.25]));
    }
}
