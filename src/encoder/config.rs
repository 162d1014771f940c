//! Encoder configuration.
//!
//! One [`EncodingConfig`] is fixed for a whole animation run: every frame is
//! compressed with the same quality and method.
//!
//! ```rust
//! use zensticker::EncodingConfig;
//!
//! let config = EncodingConfig::new().with_quality(60).with_method(6);
//! assert_eq!(config.quality, 60);
//! ```

use core::num::NonZeroU16;

use super::api::EncodeError;

/// How many times an animation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// The animation loops forever.
    Forever,
    /// The animation plays the given number of times.
    Times(NonZeroU16),
}

impl LoopCount {
    /// The value stored in the `ANIM` chunk, 0 meaning forever.
    pub fn to_chunk_value(self) -> u16 {
        match self {
            LoopCount::Forever => 0,
            LoopCount::Times(n) => n.get(),
        }
    }

    /// Inverse of [`to_chunk_value`](Self::to_chunk_value).
    pub fn from_chunk_value(value: u16) -> Self {
        NonZeroU16::new(value).map_or(LoopCount::Forever, LoopCount::Times)
    }
}

impl core::fmt::Display for LoopCount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoopCount::Forever => f.write_str("infinite"),
            LoopCount::Times(n) => write!(f, "{} time{}", n, if n.get() == 1 { "" } else { "s" }),
        }
    }
}

/// Configuration for lossy (VP8) sticker encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct EncodingConfig {
    /// Encoding quality (0 = smallest, 100 = best). Default: 75.
    pub quality: u8,
    /// Quality/speed tradeoff (0 = fast, 6 = slower but better). Default: 4.
    pub method: u8,
    /// Background color in BGRA byte order. Default: transparent black.
    pub background_color: [u8; 4],
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingConfig {
    /// Default: quality 75, method 4, transparent background.
    ///
    /// [`BudgetConfig`](crate::BudgetConfig) starts from method 1 instead, as
    /// it encodes the same frames several times.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quality: 75,
            method: 4,
            background_color: [0, 0, 0, 0],
        }
    }

    /// Set encoding quality (0 = smallest file, 100 = best quality).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    /// Set method (0 = fastest, 6 = slowest but best compression).
    #[must_use]
    pub fn with_method(mut self, method: u8) -> Self {
        self.method = method.min(6);
        self
    }

    /// Set the canvas background color (BGRA).
    #[must_use]
    pub fn with_background_color(mut self, bgra: [u8; 4]) -> Self {
        self.background_color = bgra;
        self
    }

    /// Stickers always loop forever.
    pub fn loop_count(&self) -> LoopCount {
        LoopCount::Forever
    }

    /// Checks fields that may have been set directly.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.quality > 100 {
            return Err(EncodeError::InvalidConfig("quality must be 0-100"));
        }
        if self.method > 6 {
            return Err(EncodeError::InvalidConfig("method must be 0-6"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EncodingConfig::default();
        assert_eq!(config.quality, 75);
        assert_eq!(config.method, 4);
        assert_eq!(config.loop_count(), LoopCount::Forever);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders_clamp() {
        let config = EncodingConfig::new().with_quality(250).with_method(9);
        assert_eq!(config.quality, 100);
        assert_eq!(config.method, 6);
    }

    #[test]
    fn test_direct_fields_are_validated() {
        let mut config = EncodingConfig::new();
        config.method = 7;
        assert!(matches!(
            config.validate(),
            Err(EncodeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_loop_count_chunk_values() {
        assert_eq!(LoopCount::Forever.to_chunk_value(), 0);
        assert_eq!(LoopCount::from_chunk_value(0), LoopCount::Forever);
        let three = LoopCount::from_chunk_value(3);
        assert_eq!(three.to_chunk_value(), 3);
        assert_eq!(alloc::format!("{three}"), "3 times");
    }
}
