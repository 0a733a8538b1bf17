//! Hyprland-specific implementations.
//!
//! This module provides concrete backends for the
//! [`Runtime`](crate::traits::Runtime) and
//! [`EventSource`](crate::traits::EventSource) traits, powered by
//! Hyprland's IPC sockets.
//!
//! Nothing outside this module should reference Hyprland directly.

pub mod events;
pub mod runtime;

use std::path::PathBuf;

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandError(String);

/// Resolve one of Hyprland's sockets (`.socket.sock`, `.socket2.sock`).
///
/// Hyprland ≥ 0.40 stores them at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/`.
fn socket_path(file: &str) -> Result<PathBuf, HyprlandError> {
    let runtime_dir = dirs::runtime_dir()
        .ok_or_else(|| HyprlandError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(runtime_dir.join("hypr").join(his).join(file))
}
