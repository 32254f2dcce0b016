use std::collections::BTreeMap;

use foundation::{GeoPoint, Handle};
use layers::{DecoratedFeature, FeatureKey};

use crate::backend::{CameraMove, MapBackend, MarkerId, NativeMap};
use crate::catalog::ProviderId;
use crate::contract::{
    ActivateHandler, AdapterState, BackendEvent, CameraState, ContainerId, FlyCallback,
    FlyOutcome, MapAdapter, ViewportHandler,
};
use crate::error::AdapterError;

struct RenderedMarker {
    id: MarkerId,
    feature: DecoratedFeature,
}

struct PendingFlight {
    target: CameraState,
    on_done: FlyCallback,
}

struct LiveMap {
    container: ContainerId,
    native: NativeMap,
    camera: CameraState,
    markers: BTreeMap<FeatureKey, RenderedMarker>,
    by_marker: BTreeMap<MarkerId, FeatureKey>,
    on_activate: Option<ActivateHandler>,
    on_viewport: Option<ViewportHandler>,
    flight: Option<PendingFlight>,
}

impl LiveMap {
    fn notify_viewport(&mut self) {
        let camera = self.camera;
        if let Some(handler) = self.on_viewport.as_mut() {
            handler(camera);
        }
    }
}

struct Slot {
    generation: u32,
    map: Option<LiveMap>,
}

/// Counts from one `set_features` pass.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FeatureDiff {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub kept: usize,
}

/// [`MapAdapter`] over any [`MapBackend`].
///
/// Handles are generational: a disposed slot is reused with a bumped
/// generation, so a stale handle reads as `Disposed` and never reaches the
/// map that replaced it.
pub struct BackendAdapter<B> {
    provider: ProviderId,
    animated: bool,
    backend: B,
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_container: BTreeMap<ContainerId, Handle>,
}

impl<B: MapBackend> BackendAdapter<B> {
    pub fn new(provider: ProviderId, backend: B) -> Self {
        Self {
            provider,
            animated: provider.spec().animated_camera,
            backend,
            slots: Vec::new(),
            free: Vec::new(),
            by_container: BTreeMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self, handle: Handle) -> Option<CameraState> {
        self.slot_map(handle).map(|m| m.camera)
    }

    /// Rendered marker keys in key order.
    pub fn rendered_keys(&self, handle: Handle) -> Vec<FeatureKey> {
        self.slot_map(handle)
            .map(|m| m.markers.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn marker_for(&self, handle: Handle, key: &FeatureKey) -> Option<MarkerId> {
        self.slot_map(handle)
            .and_then(|m| m.markers.get(key))
            .map(|r| r.id)
    }

    fn slot_map(&self, handle: Handle) -> Option<&LiveMap> {
        self.slots
            .get(handle.index() as usize)
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.map.as_ref())
    }

    fn live_mut(&mut self, handle: Handle) -> Result<&mut LiveMap, AdapterError> {
        match self.state(handle) {
            AdapterState::Uninitialized => return Err(AdapterError::NotInitialized(handle)),
            AdapterState::Disposed => return Err(AdapterError::Disposed(handle)),
            AdapterState::Ready => {}
        }
        self.slots
            .get_mut(handle.index() as usize)
            .and_then(|s| s.map.as_mut())
            .ok_or(AdapterError::Disposed(handle))
    }

    fn allocate(&mut self, map: LiveMap) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.map = Some(map);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            map: Some(map),
        });
        Handle::new(index, 0)
    }

    /// Replaces the rendered set and reports what changed.
    pub fn apply_features(
        &mut self,
        handle: Handle,
        features: &[DecoratedFeature],
    ) -> Result<FeatureDiff, AdapterError> {
        let mut wanted: BTreeMap<FeatureKey, &DecoratedFeature> = BTreeMap::new();
        for feature in features {
            if wanted.insert(feature.key.clone(), feature).is_some() {
                tracing::warn!(key = %feature.key, "duplicate feature key; last one wins");
            }
        }

        let map = self.live_mut(handle)?;
        let native = map.native;
        let mut diff = FeatureDiff::default();

        let stale: Vec<FeatureKey> = map
            .markers
            .keys()
            .filter(|k| !wanted.contains_key(*k))
            .cloned()
            .collect();
        let mut removals = Vec::with_capacity(stale.len());
        for key in stale {
            if let Some(marker) = map.markers.remove(&key) {
                map.by_marker.remove(&marker.id);
                removals.push(marker.id);
            }
        }

        let mut additions = Vec::new();
        let mut updates = Vec::new();
        for (key, feature) in wanted {
            match map.markers.get_mut(&key) {
                Some(existing) if existing.feature == *feature => diff.kept += 1,
                Some(existing) => {
                    existing.feature = feature.clone();
                    updates.push((existing.id, feature));
                }
                None => additions.push((key, feature)),
            }
        }

        for marker in removals {
            self.backend.remove_marker(native, marker);
            diff.removed += 1;
        }
        for (marker, feature) in updates {
            self.backend.update_marker(native, marker, feature);
            diff.updated += 1;
        }
        let mut created = Vec::with_capacity(additions.len());
        for (key, feature) in additions {
            let id = self.backend.add_marker(native, feature);
            created.push((key, id, feature.clone()));
            diff.added += 1;
        }

        let map = self.live_mut(handle)?;
        for (key, id, feature) in created {
            map.by_marker.insert(id, key.clone());
            map.markers.insert(key, RenderedMarker { id, feature });
        }

        tracing::debug!(
            provider = %self.provider,
            %handle,
            added = diff.added,
            updated = diff.updated,
            removed = diff.removed,
            kept = diff.kept,
            "features applied"
        );
        Ok(diff)
    }
}

impl<B: MapBackend> MapAdapter for BackendAdapter<B> {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn initialize(
        &mut self,
        container: &ContainerId,
        camera: CameraState,
    ) -> Result<Handle, AdapterError> {
        if let Some(previous) = self.by_container.get(container).copied() {
            tracing::info!(
                provider = %self.provider,
                %container,
                handle = %previous,
                "container already mounted; disposing previous map"
            );
            self.dispose(previous);
        }

        let provider = self.provider;
        let native = self
            .backend
            .create_map(container, camera)
            .map_err(|e| e.for_provider(provider))?;
        let handle = self.allocate(LiveMap {
            container: container.clone(),
            native,
            camera,
            markers: BTreeMap::new(),
            by_marker: BTreeMap::new(),
            on_activate: None,
            on_viewport: None,
            flight: None,
        });
        self.by_container.insert(container.clone(), handle);
        tracing::info!(provider = %self.provider, %container, %handle, "map initialized");
        Ok(handle)
    }

    fn set_features(
        &mut self,
        handle: Handle,
        features: &[DecoratedFeature],
    ) -> Result<(), AdapterError> {
        self.apply_features(handle, features).map(|_| ())
    }

    fn on_feature_activate(
        &mut self,
        handle: Handle,
        handler: ActivateHandler,
    ) -> Result<(), AdapterError> {
        self.live_mut(handle)?.on_activate = Some(handler);
        Ok(())
    }

    fn on_viewport_change(
        &mut self,
        handle: Handle,
        handler: ViewportHandler,
    ) -> Result<(), AdapterError> {
        self.live_mut(handle)?.on_viewport = Some(handler);
        Ok(())
    }

    fn fly_to(
        &mut self,
        handle: Handle,
        target: GeoPoint,
        zoom: f64,
        on_done: FlyCallback,
    ) -> Result<(), AdapterError> {
        let animated = self.animated;
        let map = self.live_mut(handle)?;
        let native = map.native;
        if let Some(previous) = map.flight.take() {
            (previous.on_done)(FlyOutcome::Superseded);
        }

        let target = CameraState::new(target, zoom);
        match self.backend.move_camera(native, target, animated) {
            CameraMove::Immediate => {
                let map = self.live_mut(handle)?;
                map.camera = target;
                on_done(FlyOutcome::Completed);
                map.notify_viewport();
            }
            CameraMove::Animating => {
                self.live_mut(handle)?.flight = Some(PendingFlight { target, on_done });
            }
        }
        Ok(())
    }

    fn cancel_flight(&mut self, handle: Handle) -> Result<bool, AdapterError> {
        let map = self.live_mut(handle)?;
        let native = map.native;
        let Some(flight) = map.flight.take() else {
            return Ok(false);
        };
        self.backend.stop_camera(native);
        (flight.on_done)(FlyOutcome::Superseded);
        tracing::debug!(provider = %self.provider, %handle, "camera move cancelled");
        Ok(true)
    }

    fn open_popup(&mut self, handle: Handle, key: &FeatureKey) -> Result<(), AdapterError> {
        let map = self.live_mut(handle)?;
        let native = map.native;
        let (marker, content) = match map.markers.get(key) {
            Some(rendered) => (rendered.id, rendered.feature.popup.clone()),
            None => return Err(AdapterError::UnknownFeature(key.clone())),
        };
        self.backend.open_popup(native, marker, &content);
        Ok(())
    }

    fn dispatch(&mut self, handle: Handle, event: BackendEvent) -> Result<(), AdapterError> {
        let map = self.live_mut(handle)?;
        match event {
            BackendEvent::MarkerClicked(marker) => {
                let Some(key) = map.by_marker.get(&marker).cloned() else {
                    tracing::debug!(%marker, "click on unknown marker ignored");
                    return Ok(());
                };
                if let Some(handler) = map.on_activate.as_mut() {
                    handler(key);
                }
            }
            BackendEvent::MoveEnd(camera) => {
                map.camera = camera;
                // Intermediate moves of a programmatic flight are reported on
                // AnimationEnd instead.
                if map.flight.is_none() {
                    map.notify_viewport();
                }
            }
            BackendEvent::AnimationEnd => {
                if let Some(flight) = map.flight.take() {
                    map.camera = flight.target;
                    (flight.on_done)(FlyOutcome::Completed);
                    map.notify_viewport();
                }
            }
        }
        Ok(())
    }

    fn dispose(&mut self, handle: Handle) {
        let Some(slot) = self.slots.get_mut(handle.index() as usize) else {
            return;
        };
        if slot.generation != handle.generation() {
            return;
        }
        let Some(map) = slot.map.take() else {
            return;
        };

        if let Some(flight) = map.flight {
            (flight.on_done)(FlyOutcome::Cancelled);
        }
        self.backend.destroy_map(map.native);
        if self.by_container.get(&map.container) == Some(&handle) {
            self.by_container.remove(&map.container);
        }
        self.free.push(handle.index());
        tracing::info!(
            provider = %self.provider,
            container = %map.container,
            %handle,
            "map disposed"
        );
    }

    fn state(&self, handle: Handle) -> AdapterState {
        match self.slots.get(handle.index() as usize) {
            None => AdapterState::Uninitialized,
            Some(slot) if handle.generation() > slot.generation => AdapterState::Uninitialized,
            Some(slot) if handle.generation() < slot.generation => AdapterState::Disposed,
            Some(slot) if slot.map.is_some() => AdapterState::Ready,
            Some(_) => AdapterState::Disposed,
        }
    }

    fn live_handles(&self) -> usize {
        self.slots.iter().filter(|s| s.map.is_some()).count()
    }
}
