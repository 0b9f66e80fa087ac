//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use pixgraph::types::Color;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two colors are approximately equal channel by channel
pub fn assert_color_eq(a: Color, b: Color, epsilon: f32) {
    for (x, y) in a.to_array().into_iter().zip(b.to_array()) {
        assert!(
            (x - y).abs() < epsilon,
            "Expected {:?} to be approximately equal to {:?} (epsilon: {})",
            a,
            b,
            epsilon
        );
    }
}
