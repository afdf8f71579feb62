//! Captured frame type.
//!
//! A `Frame` is a single RGB snapshot handed from the camera to the active
//! detection strategy. Frames live for exactly one sampling tick and are
//! dropped as soon as detection returns.

use anyhow::{anyhow, Result};

/// One captured frame, tightly-packed RGB (3 bytes per pixel).
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Validate the pixel buffer length against the declared dimensions.
    ///
    /// Strategies call this before touching the buffer; a short or oversized
    /// buffer is an inference fault, not a panic.
    pub fn ensure_rgb(&self) -> Result<()> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if self.pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected,
                self.pixels.len()
            ));
        }
        Ok(())
    }
}
