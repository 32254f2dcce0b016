use std::fmt;

use foundation::{GeoPoint, Handle};
use layers::{DecoratedFeature, FeatureKey};
use serde::{Deserialize, Serialize};

use crate::backend::MarkerId;
use crate::catalog::ProviderId;
use crate::error::AdapterError;

/// DOM-level mount point a map is created in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub center: GeoPoint,
    pub zoom: f64,
}

impl CameraState {
    pub fn new(center: GeoPoint, zoom: f64) -> Self {
        Self { center, zoom }
    }
}

/// Per-handle lifecycle: `Uninitialized -> Ready -> Disposed` (terminal).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AdapterState {
    Uninitialized,
    Ready,
    Disposed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlyOutcome {
    Completed,
    /// A later `fly_to` on the same handle took over the camera, or the
    /// move was cancelled.
    Superseded,
    /// The handle was disposed mid-flight.
    Cancelled,
}

/// Raw SDK notifications, already stripped of SDK-specific types.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    MarkerClicked(MarkerId),
    /// The camera settled after a user pan or zoom.
    MoveEnd(CameraState),
    /// The pending animated camera move finished.
    AnimationEnd,
}

pub type ActivateHandler = Box<dyn FnMut(FeatureKey)>;
pub type ViewportHandler = Box<dyn FnMut(CameraState)>;
pub type FlyCallback = Box<dyn FnOnce(FlyOutcome)>;

/// The uniform lifecycle every rendering backend is driven through.
///
/// Only `initialize` is valid before a handle exists and only `dispose`
/// (a no-op) after it is disposed; everything else returns
/// [`AdapterError::NotInitialized`] or [`AdapterError::Disposed`].
pub trait MapAdapter {
    fn provider(&self) -> ProviderId;

    /// Creates a map in `container`. A map already live in the same
    /// container is disposed first, so one container never holds two.
    fn initialize(
        &mut self,
        container: &ContainerId,
        camera: CameraState,
    ) -> Result<Handle, AdapterError>;

    /// Replaces the full rendered set. Diffing is internal.
    fn set_features(
        &mut self,
        handle: Handle,
        features: &[DecoratedFeature],
    ) -> Result<(), AdapterError>;

    /// Registers the single activation handler, replacing any previous one.
    fn on_feature_activate(
        &mut self,
        handle: Handle,
        handler: ActivateHandler,
    ) -> Result<(), AdapterError>;

    /// Registers the single handler for settled camera changes.
    fn on_viewport_change(
        &mut self,
        handle: Handle,
        handler: ViewportHandler,
    ) -> Result<(), AdapterError>;

    /// Moves the camera. `on_done` runs exactly once.
    fn fly_to(
        &mut self,
        handle: Handle,
        target: GeoPoint,
        zoom: f64,
        on_done: FlyCallback,
    ) -> Result<(), AdapterError>;

    /// Stops the pending camera move, if any. Its `on_done` resolves with
    /// `Superseded` and the viewport handler is not told about the target.
    /// Returns whether a move was pending.
    fn cancel_flight(&mut self, handle: Handle) -> Result<bool, AdapterError>;

    fn open_popup(&mut self, handle: Handle, key: &FeatureKey) -> Result<(), AdapterError>;

    /// Feeds a raw backend notification through the adapter.
    fn dispatch(&mut self, handle: Handle, event: BackendEvent) -> Result<(), AdapterError>;

    /// Releases the map. Safe to call any number of times.
    fn dispose(&mut self, handle: Handle);

    fn state(&self, handle: Handle) -> AdapterState;

    fn live_handles(&self) -> usize;
}
