//! Camera frame source.
//!
//! `CameraSource` hands RGB frames to the sampler. A `stub://` device gets a
//! synthetic generator; anything else is reported as an acquisition failure
//! so no sampling ever starts against a device we cannot open.
//!
//! Release semantics matter here: `release` stops capture for good, is
//! idempotent, and also runs on drop, so every teardown path lets go of the
//! device.

use anyhow::{bail, Result};

use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device string (e.g. "stub://lobby").
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://lobby".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Camera source.
///
/// Real capture backends plug into `CameraBackend`; this build ships the
/// synthetic one only.
pub struct CameraSource {
    backend: CameraBackend,
    released: bool,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
}

impl CameraSource {
    /// Open the configured device.
    ///
    /// Failure here is the camera-acquisition error path: the caller reports
    /// it and must not start any sampling timer.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        if !config.device.starts_with("stub://") {
            bail!(
                "unable to acquire camera '{}': only stub:// devices are supported in this build",
                config.device
            );
        }
        log::info!("camera {}: capture started (synthetic)", config.device);
        Ok(Self {
            backend: CameraBackend::Synthetic(SyntheticCamera::new(config.clone())),
            released: false,
        })
    }

    /// Capture the next frame. Fails once the camera has been released.
    pub fn next_frame(&mut self) -> Result<Frame> {
        if self.released {
            bail!("camera has been released");
        }
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => Ok(camera.next_frame()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        if self.released {
            return false;
        }
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
        }
    }

    /// Stop capture and let go of the device. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let stats = self.stats();
        log::info!(
            "camera {}: capture stopped ({} frames)",
            stats.device,
            stats.frames_captured
        );
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    /// Simulated scene state; bumped occasionally so consecutive frames
    /// are not identical forever.
    scene_state: u8,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn next_frame(&mut self) -> Frame {
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        Frame::new(pixels, self.config.width, self.config.height)
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = self.config.width as usize * self.config.height as usize * 3;

        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}
