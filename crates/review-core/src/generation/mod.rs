//! Text generation with retry and provider failover

mod failover;

pub use failover::{FailoverGenerator, ProviderSlot, ProviderState};

use serde::{Deserialize, Serialize};

/// Sampling parameters for one generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: usize,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_output_tokens: usize) -> Self {
        Self {
            temperature,
            max_output_tokens,
        }
    }

    /// Market review defaults: 0.7 / 2048
    pub fn review() -> Self {
        Self::new(0.7, 2048)
    }

    /// Stock analysis defaults: 0.7 / 8192
    pub fn analysis() -> Self {
        Self::new(0.7, 8192)
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::review()
    }
}
