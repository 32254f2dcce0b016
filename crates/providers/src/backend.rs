use std::fmt;

use layers::DecoratedFeature;

use crate::contract::{CameraState, ContainerId};
use crate::error::ProviderInitError;

/// SDK-side map instance id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeMap(pub u64);

/// SDK-side marker id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CameraMove {
    /// The camera is already at the target.
    Immediate,
    /// Completion arrives later as `BackendEvent::AnimationEnd`.
    Animating,
}

/// What a concrete map SDK has to offer. Implementations are thin
/// translations into SDK calls and keep no lifecycle state of their own.
pub trait MapBackend {
    fn create_map(
        &mut self,
        container: &ContainerId,
        camera: CameraState,
    ) -> Result<NativeMap, ProviderInitError>;

    fn destroy_map(&mut self, map: NativeMap);

    fn add_marker(&mut self, map: NativeMap, feature: &DecoratedFeature) -> MarkerId;

    fn update_marker(&mut self, map: NativeMap, marker: MarkerId, feature: &DecoratedFeature);

    fn remove_marker(&mut self, map: NativeMap, marker: MarkerId);

    fn move_camera(&mut self, map: NativeMap, camera: CameraState, animate: bool) -> CameraMove;

    /// Halts a running camera animation where it is. No `AnimationEnd`
    /// follows for the halted move.
    fn stop_camera(&mut self, map: NativeMap);

    fn open_popup(&mut self, map: NativeMap, marker: MarkerId, content: &str);
}
