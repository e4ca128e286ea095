//! Typed error types for cellgrid-render.
//!
//! This module provides structured error types so callers at the crate
//! boundary can match on specific error variants instead of relying on
//! opaque `anyhow` strings.

use thiserror::Error;

/// Top-level error type for the GPU rendering engine.
///
/// Covers the failure categories that callers may want to distinguish:
/// - GPU initialisation (adapter, device, surface)
/// - Surface presentation
/// - Permanent context loss
#[derive(Debug, Error)]
pub enum RenderError {
    // -----------------------------------------------------------------------
    // GPU initialisation
    // -----------------------------------------------------------------------
    /// A suitable wgpu GPU adapter could not be found for the given surface.
    #[error("GPU adapter not found: no compatible GPU adapter available for this surface")]
    AdapterNotFound,

    /// The wgpu device could not be created or the device was lost.
    #[error("GPU device error: {0}")]
    DeviceError(String),

    /// The wgpu surface could not be created for the target.
    #[error("GPU surface creation failed: {0}")]
    SurfaceCreation(String),

    // -----------------------------------------------------------------------
    // Presentation
    // -----------------------------------------------------------------------
    /// A frame could not be acquired or presented.
    #[error("GPU surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// The GPU context stayed lost past the recovery grace window. The
    /// renderer stops issuing draw calls after returning this.
    #[error("GPU context lost and not restored within {grace_secs}s")]
    ContextLost {
        /// Length of the grace window that expired.
        grace_secs: u64,
    },
}
