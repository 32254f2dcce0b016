use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use layers::{DecoratedFeature, FeatureKey};

use crate::backend::{CameraMove, MapBackend, MarkerId, NativeMap};
use crate::catalog::ProviderId;
use crate::contract::{CameraState, ContainerId};
use crate::error::ProviderInitError;

/// One call the adapter made into the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateMap { container: ContainerId, map: NativeMap },
    DestroyMap(NativeMap),
    AddMarker { map: NativeMap, marker: MarkerId, key: FeatureKey },
    UpdateMarker { map: NativeMap, marker: MarkerId },
    RemoveMarker { map: NativeMap, marker: MarkerId },
    MoveCamera { map: NativeMap, camera: CameraState, animate: bool },
    StopCamera(NativeMap),
    OpenPopup { map: NativeMap, marker: MarkerId },
}

#[derive(Debug, Default)]
struct HeadlessMap {
    camera: Option<CameraState>,
    /// Where an animated move started; a stop puts the camera back there.
    animating_from: Option<CameraState>,
    markers: BTreeMap<MarkerId, DecoratedFeature>,
    popup: Option<(MarkerId, String)>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: u64,
    maps: BTreeMap<NativeMap, HeadlessMap>,
    calls: Vec<BackendCall>,
    fail_create: Option<String>,
}

impl HeadlessState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory backend that records every call.
///
/// Clones share state, so a test (or a host without a rendering surface)
/// can keep a clone to inspect what the adapter rendered.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `create_map` fails with `reason`.
    pub fn fail_next_create(&self, reason: impl Into<String>) {
        self.state.borrow_mut().fail_create = Some(reason.into());
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<BackendCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn live_maps(&self) -> usize {
        self.state.borrow().maps.len()
    }

    /// Markers across all live maps.
    pub fn marker_count(&self) -> usize {
        self.state.borrow().maps.values().map(|m| m.markers.len()).sum()
    }

    pub fn rendered_features(&self) -> Vec<DecoratedFeature> {
        self.state
            .borrow()
            .maps
            .values()
            .flat_map(|m| m.markers.values().cloned())
            .collect()
    }

    /// Open popup content, if any live map shows one.
    pub fn open_popup_content(&self) -> Option<String> {
        self.state
            .borrow()
            .maps
            .values()
            .filter_map(|m| m.popup.as_ref())
            .map(|(_, content)| content.clone())
            .next_back()
    }

    /// Camera of the last live map.
    pub fn camera(&self) -> Option<CameraState> {
        self.state
            .borrow()
            .maps
            .values()
            .filter_map(|m| m.camera)
            .next_back()
    }

    pub fn camera_moves(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::MoveCamera { .. }))
            .count()
    }
}

impl MapBackend for HeadlessBackend {
    fn create_map(
        &mut self,
        container: &ContainerId,
        camera: CameraState,
    ) -> Result<NativeMap, ProviderInitError> {
        let mut state = self.state.borrow_mut();
        if let Some(message) = state.fail_create.take() {
            return Err(ProviderInitError::Backend {
                provider: ProviderId::Raster,
                message,
            });
        }
        let map = NativeMap(state.next());
        state.maps.insert(
            map,
            HeadlessMap {
                camera: Some(camera),
                ..HeadlessMap::default()
            },
        );
        state.calls.push(BackendCall::CreateMap {
            container: container.clone(),
            map,
        });
        Ok(map)
    }

    fn destroy_map(&mut self, map: NativeMap) {
        let mut state = self.state.borrow_mut();
        state.maps.remove(&map);
        state.calls.push(BackendCall::DestroyMap(map));
    }

    fn add_marker(&mut self, map: NativeMap, feature: &DecoratedFeature) -> MarkerId {
        let mut state = self.state.borrow_mut();
        let marker = MarkerId(state.next());
        if let Some(m) = state.maps.get_mut(&map) {
            m.markers.insert(marker, feature.clone());
        }
        state.calls.push(BackendCall::AddMarker {
            map,
            marker,
            key: feature.key.clone(),
        });
        marker
    }

    fn update_marker(&mut self, map: NativeMap, marker: MarkerId, feature: &DecoratedFeature) {
        let mut state = self.state.borrow_mut();
        if let Some(m) = state.maps.get_mut(&map) {
            m.markers.insert(marker, feature.clone());
        }
        state.calls.push(BackendCall::UpdateMarker { map, marker });
    }

    fn remove_marker(&mut self, map: NativeMap, marker: MarkerId) {
        let mut state = self.state.borrow_mut();
        if let Some(m) = state.maps.get_mut(&map) {
            m.markers.remove(&marker);
        }
        state.calls.push(BackendCall::RemoveMarker { map, marker });
    }

    fn move_camera(&mut self, map: NativeMap, camera: CameraState, animate: bool) -> CameraMove {
        let mut state = self.state.borrow_mut();
        if let Some(m) = state.maps.get_mut(&map) {
            m.animating_from = if animate { m.camera } else { None };
            m.camera = Some(camera);
        }
        state.calls.push(BackendCall::MoveCamera {
            map,
            camera,
            animate,
        });
        if animate {
            CameraMove::Animating
        } else {
            CameraMove::Immediate
        }
    }

    fn stop_camera(&mut self, map: NativeMap) {
        let mut state = self.state.borrow_mut();
        if let Some(m) = state.maps.get_mut(&map) {
            if let Some(origin) = m.animating_from.take() {
                m.camera = Some(origin);
            }
        }
        state.calls.push(BackendCall::StopCamera(map));
    }

    fn open_popup(&mut self, map: NativeMap, marker: MarkerId, content: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(m) = state.maps.get_mut(&map) {
            m.popup = Some((marker, content.to_string()));
        }
        state.calls.push(BackendCall::OpenPopup { map, marker });
    }
}
