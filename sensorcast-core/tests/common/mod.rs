//! Common test utilities for integration tests
//!
//! This module provides:
//! - A deterministic noise generator for synthetic sensor series
//! - Builders for publishers wired to a recording transport
//! - Tolerance assertions for float comparisons

#![allow(dead_code)]

use sensorcast_core::testing::RecordingTransport;
use sensorcast_core::{FilterConstants, PublisherConfig, ThrottledPublisher};

/// Assert two floats agree within an absolute tolerance
#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tol:expr) => {
        let (actual, expected, tol) = ($actual as f32, $expected as f32, $tol as f32);
        assert!(
            (actual - expected).abs() <= tol,
            "expected {} ± {}, got {}",
            expected,
            tol,
            actual
        );
    };
}

/// Linear congruential generator; reproducible across platforms
pub struct TestRng {
    seed: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Uniform in `[0, 1)`
    pub fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.seed >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform in `[low, high)`
    pub fn gen_range(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }
}

/// `count` samples of `level` with uniform noise of `±amplitude`
pub fn noisy_series(rng: &mut TestRng, level: f32, amplitude: f32, count: usize) -> Vec<f32> {
    (0..count)
        .map(|_| level + rng.gen_range(-amplitude, amplitude))
        .collect()
}

/// Publisher on `topic` with the default filter constants
pub fn publisher<'a>(
    transport: &'a RecordingTransport,
    topic: &str,
    measurement_noise: f32,
    send_every_n: u32,
) -> ThrottledPublisher<&'a RecordingTransport> {
    publisher_with(transport, topic, measurement_noise, send_every_n, FilterConstants::default())
}

/// Publisher on `topic` with explicit filter constants
pub fn publisher_with<'a>(
    transport: &'a RecordingTransport,
    topic: &str,
    measurement_noise: f32,
    send_every_n: u32,
    constants: FilterConstants,
) -> ThrottledPublisher<&'a RecordingTransport> {
    let config = PublisherConfig::new(topic, measurement_noise, send_every_n)
        .expect("test config must be valid");
    ThrottledPublisher::new(transport, config, constants).expect("test constants must be valid")
}
