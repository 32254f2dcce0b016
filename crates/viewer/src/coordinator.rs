//! Selection and viewport coordination.
//!
//! The [`Coordinator`] is the single owner of filter, selection, camera and
//! the mounted adapter. Adapter callbacks never touch that state directly:
//! they queue [`Inbound`] messages that [`Coordinator::pump`] applies, each
//! tagged with the mount generation that produced it so messages from a
//! disposed map are dropped.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use compute::DistrictAggregate;
use formats::DataFetchError;
use foundation::{GeoPoint, Handle};
use layers::{DecoratedFeature, FeatureKey, FilterState};
use listings::{Dataset, Listing, ListingId};
use providers::{
    AdapterError, BackendEvent, CameraState, ContainerId, FlyOutcome, MapAdapter, ProviderId,
    ProviderInitError, ProviderLoader,
};
use runtime::{Envelope, EventBus, Generation, Ticket};

use crate::config::{ConfigError, ViewerConfig};
use crate::error::SelectionError;
use crate::events::{DegradedNotice, MapEvent, NoticeKind, ProviderStatus};
use crate::pipeline::{Pipeline, navigation_order};
use crate::registry::ProviderRegistry;
use crate::viewport::MapViewport;

/// Zoom levels added when a cluster marker is activated.
const CLUSTER_ZOOM_STEP: f64 = 2.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FetchTicket(Ticket);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MountTicket {
    provider: ProviderId,
    ticket: Ticket,
}

impl MountTicket {
    pub fn provider(&self) -> ProviderId {
        self.provider
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Inbound {
    Activated {
        mount: Ticket,
        key: FeatureKey,
    },
    ViewportSettled {
        mount: Ticket,
        camera: CameraState,
    },
    FlightFinished {
        mount: Ticket,
        flight: Ticket,
        outcome: FlyOutcome,
    },
}

type Inbox = Rc<RefCell<VecDeque<Inbound>>>;

#[derive(Debug, Clone, PartialEq)]
enum AfterFlight {
    Nothing,
    OpenPopup(FeatureKey),
}

struct PendingFlight {
    ticket: Ticket,
    target: CameraState,
    after: AfterFlight,
}

struct Mounted {
    provider: ProviderId,
    adapter: Box<dyn MapAdapter>,
    handle: Handle,
    ticket: Ticket,
}

pub struct Coordinator {
    config: ViewerConfig,
    container: ContainerId,
    registry: ProviderRegistry,
    pipeline: Pipeline,

    dataset: Dataset,
    filter: FilterState,
    filtered: Vec<Listing>,
    features: Vec<DecoratedFeature>,
    aggregates: Vec<DistrictAggregate>,
    viewport: MapViewport,
    selected: Option<ListingId>,

    status: ProviderStatus,
    requested: Option<ProviderId>,
    mounted: Option<Mounted>,
    flight: Option<PendingFlight>,

    mounts: Generation,
    fetches: Generation,
    flights: Generation,

    inbox: Inbox,
    events: EventBus<MapEvent>,
}

impl Coordinator {
    /// Fails when `config` does not validate; nothing is mounted yet.
    pub fn new(
        config: ViewerConfig,
        registry: ProviderRegistry,
        container: ContainerId,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = Pipeline::new(config.cluster, config.price_scale.clone());
        let viewport = config.default_viewport();
        Ok(Self {
            config,
            container,
            registry,
            pipeline,
            dataset: Dataset::empty(),
            filter: FilterState::default(),
            filtered: Vec::new(),
            features: Vec::new(),
            aggregates: Vec::new(),
            viewport,
            selected: None,
            status: ProviderStatus::Unmounted,
            requested: None,
            mounted: None,
            flight: None,
            mounts: Generation::new(),
            fetches: Generation::new(),
            flights: Generation::new(),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            events: EventBus::new(),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn filtered(&self) -> &[Listing] {
        &self.filtered
    }

    pub fn features(&self) -> &[DecoratedFeature] {
        &self.features
    }

    pub fn aggregates(&self) -> &[DistrictAggregate] {
        &self.aggregates
    }

    pub fn viewport(&self) -> &MapViewport {
        &self.viewport
    }

    pub fn selected(&self) -> Option<&ListingId> {
        self.selected.as_ref()
    }

    pub fn status(&self) -> ProviderStatus {
        self.status
    }

    /// The provider mounted or being mounted.
    pub fn provider(&self) -> Option<ProviderId> {
        self.requested
    }

    pub fn map_handle(&self) -> Option<Handle> {
        self.mounted.as_ref().map(|m| m.handle)
    }

    pub fn events_mut(&mut self) -> &mut EventBus<MapEvent> {
        &mut self.events
    }

    pub fn drain_events(&mut self) -> Vec<Envelope<MapEvent>> {
        self.events.drain()
    }

    // ---- data -------------------------------------------------------------

    /// Starts a dataset fetch. Any fetch still in flight becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        FetchTicket(self.fetches.begin())
    }

    /// Applies a fetch result. Returns `false` when the result was stale and
    /// discarded.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Dataset, DataFetchError>,
    ) -> bool {
        if !self.fetches.is_current(ticket.0) {
            tracing::warn!(ticket = %ticket.0, "discarding stale dataset fetch");
            return false;
        }
        self.fetches.invalidate();

        self.dataset = match result {
            Ok(dataset) => {
                tracing::debug!(listings = dataset.len(), "dataset loaded");
                dataset
            }
            Err(err) => {
                tracing::warn!(error = %err, "listing feed unavailable; showing empty map");
                self.notice(NoticeKind::FeedUnavailable, err.to_string());
                Dataset::empty()
            }
        };
        self.refilter();
        self.pump();
        true
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.refilter();
        self.pump();
    }

    fn refilter(&mut self) {
        self.filtered = self.pipeline.filter(&self.dataset, &self.filter);
        self.aggregates = self.pipeline.aggregates(&self.filtered);
        self.events.emit(MapEvent::AggregatesReady {
            districts: self.aggregates.clone(),
        });

        if let Some(id) = self.selected.clone() {
            if self.position_of(&id).is_none() {
                tracing::debug!(%id, "selection no longer on the map; clearing");
                self.commit_selection(None);
                self.cancel_flight();
            }
        }
        self.render();
    }

    fn render(&mut self) {
        self.features = match self.pipeline.render(&self.filtered, self.viewport.zoom) {
            Ok(features) => features,
            Err(err) => {
                tracing::error!(error = %err, "price encoding failed; nothing rendered");
                self.notice(NoticeKind::InvalidData, err.to_string());
                Vec::new()
            }
        };
        if let Some(mounted) = self.mounted.as_mut() {
            if let Err(err) = mounted.adapter.set_features(mounted.handle, &self.features) {
                tracing::warn!(error = %err, "adapter rejected features");
            }
        }
        self.events.emit(MapEvent::FeaturesRendered {
            count: self.features.len(),
        });
    }

    // ---- selection --------------------------------------------------------

    /// Programmatic selection: commits immediately, then flies to the listing
    /// and opens its popup once the camera arrives. `None` clears.
    pub fn select_listing(&mut self, id: Option<&ListingId>) -> Result<(), SelectionError> {
        let Some(id) = id else {
            self.commit_selection(None);
            self.cancel_flight();
            return Ok(());
        };
        if self.dataset.get(id).is_none() {
            return Err(SelectionError::UnknownListing(id.clone()));
        }
        let position = self
            .position_of(id)
            .ok_or_else(|| SelectionError::NotOnMap(id.clone()))?;

        self.commit_selection(Some(id.clone()));
        let zoom = self.config.focus_zoom;
        self.fly(
            position,
            zoom,
            AfterFlight::OpenPopup(FeatureKey::Listing(id.clone())),
        );
        self.pump();
        Ok(())
    }

    pub fn select_next(&mut self) -> Option<ListingId> {
        self.step_selection(1)
    }

    pub fn select_prev(&mut self) -> Option<ListingId> {
        self.step_selection(-1)
    }

    fn step_selection(&mut self, step: isize) -> Option<ListingId> {
        let order = navigation_order(&self.filtered);
        if order.is_empty() {
            return None;
        }
        let len = order.len() as isize;
        let current = self
            .selected
            .as_ref()
            .and_then(|sel| order.iter().position(|(id, _)| id == sel));
        let next = match current {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        let id = order[next as usize].0.clone();
        self.select_listing(Some(&id)).ok()?;
        Some(id)
    }

    fn commit_selection(&mut self, id: Option<ListingId>) {
        if self.selected == id {
            return;
        }
        self.selected = id.clone();
        self.events.emit(MapEvent::SelectionChanged { id });
    }

    fn position_of(&self, id: &ListingId) -> Option<GeoPoint> {
        self.filtered
            .iter()
            .find(|l| &l.id == id)
            .and_then(|l| l.position().ok())
    }

    // ---- camera -----------------------------------------------------------

    pub fn reset_view(&mut self) {
        let (center, zoom) = (self.config.default_center, self.config.default_zoom);
        self.fly_to_point(center, Some(zoom));
    }

    /// Moves the camera without touching the selection. Keeps the current
    /// zoom when `zoom` is `None`.
    pub fn fly_to_point(&mut self, center: GeoPoint, zoom: Option<f64>) {
        let zoom = zoom.unwrap_or(self.viewport.zoom);
        self.fly(center, zoom, AfterFlight::Nothing);
        self.pump();
    }

    /// Issues a camera move, superseding any earlier one. Without a mounted
    /// map the viewport is updated directly.
    fn fly(&mut self, center: GeoPoint, zoom: f64, after: AfterFlight) {
        let target = CameraState::new(center, self.config.clamp_zoom(zoom));
        let ticket = self.flights.begin();

        let Some(mounted) = self.mounted.as_mut() else {
            self.flight = None;
            self.apply_camera(target);
            return;
        };

        self.flight = Some(PendingFlight {
            ticket,
            target,
            after,
        });
        let inbox = Rc::clone(&self.inbox);
        let mount = mounted.ticket;
        let on_done = Box::new(move |outcome| {
            inbox.borrow_mut().push_back(Inbound::FlightFinished {
                mount,
                flight: ticket,
                outcome,
            });
        });
        if let Err(err) = mounted
            .adapter
            .fly_to(mounted.handle, target.center, target.zoom, on_done)
        {
            tracing::warn!(error = %err, "camera move rejected");
            self.flight = None;
        }
    }

    /// Drops the pending camera move and halts it on the map, so its target
    /// never lands in the viewport.
    fn cancel_flight(&mut self) {
        self.flights.invalidate();
        if self.flight.take().is_none() {
            return;
        }
        if let Some(mounted) = self.mounted.as_mut() {
            if let Err(err) = mounted.adapter.cancel_flight(mounted.handle) {
                tracing::warn!(error = %err, "camera move could not be cancelled");
            }
        }
    }

    /// Adopts `camera` as the viewport; re-renders and notifies on change.
    fn apply_camera(&mut self, camera: CameraState) {
        let viewport = self.config.viewport(camera.center, camera.zoom);
        if viewport == self.viewport {
            return;
        }
        let zoom_changed = viewport.zoom != self.viewport.zoom;
        self.viewport = viewport;
        self.events.emit(MapEvent::ViewportChanged { viewport });
        if zoom_changed {
            self.render();
        }
    }

    // ---- provider lifecycle -----------------------------------------------

    /// Tears down the current map and marks `provider` as mounting. The host
    /// loads the provider and reports back through
    /// [`Coordinator::complete_switch_provider`].
    pub fn begin_switch_provider(&mut self, provider: ProviderId) -> MountTicket {
        self.unmount();
        let ticket = self.mounts.begin();
        self.requested = Some(provider);
        self.set_status(ProviderStatus::Mounting);
        MountTicket { provider, ticket }
    }

    /// Finishes a mount started by `begin_switch_provider`. A stale ticket
    /// (a newer switch or a teardown happened) is ignored.
    pub fn complete_switch_provider(
        &mut self,
        ticket: MountTicket,
        loaded: Result<(), ProviderInitError>,
    ) -> ProviderStatus {
        if !self.mounts.is_current(ticket.ticket) || self.mounted.is_some() {
            tracing::warn!(provider = %ticket.provider, "discarding stale provider mount");
            return self.status;
        }

        match loaded.and_then(|()| self.registry.create(ticket.provider)) {
            Ok(adapter) => self.mount(ticket, adapter),
            Err(err) => self.mark_unavailable(err.to_string()),
        }
        self.pump();
        self.status
    }

    /// Starts mounting `config.default_provider`.
    pub fn begin_default_provider(&mut self) -> MountTicket {
        self.begin_switch_provider(self.config.default_provider)
    }

    pub async fn mount_default_provider(&mut self, loader: &ProviderLoader) -> ProviderStatus {
        let provider = self.config.default_provider;
        self.switch_provider(loader, provider).await
    }

    /// Convenience for hosts that can await: load through `loader`, then
    /// mount.
    pub async fn switch_provider(
        &mut self,
        loader: &ProviderLoader,
        provider: ProviderId,
    ) -> ProviderStatus {
        let ticket = self.begin_switch_provider(provider);
        let loaded = loader.load(provider).await;
        self.complete_switch_provider(ticket, loaded)
    }

    fn mount(&mut self, ticket: MountTicket, mut adapter: Box<dyn MapAdapter>) {
        let camera = self.viewport.camera();
        let handle = match adapter.initialize(&self.container, camera) {
            Ok(handle) => handle,
            Err(err) => {
                self.mark_unavailable(err.to_string());
                return;
            }
        };

        let mount = ticket.ticket;
        let inbox = Rc::clone(&self.inbox);
        let registered = adapter
            .on_feature_activate(
                handle,
                Box::new(move |key| {
                    inbox
                        .borrow_mut()
                        .push_back(Inbound::Activated { mount, key });
                }),
            )
            .and_then(|()| {
                let inbox = Rc::clone(&self.inbox);
                adapter.on_viewport_change(
                    handle,
                    Box::new(move |camera| {
                        inbox
                            .borrow_mut()
                            .push_back(Inbound::ViewportSettled { mount, camera });
                    }),
                )
            })
            .and_then(|()| adapter.set_features(handle, &self.features));
        if let Err(err) = registered {
            adapter.dispose(handle);
            self.mark_unavailable(err.to_string());
            return;
        }

        tracing::info!(provider = %ticket.provider, %handle, "provider mounted");
        self.mounted = Some(Mounted {
            provider: ticket.provider,
            adapter,
            handle,
            ticket: mount,
        });
        self.set_status(ProviderStatus::Ready);
    }

    fn mark_unavailable(&mut self, reason: String) {
        tracing::warn!(provider = ?self.requested, %reason, "map unavailable");
        self.set_status(ProviderStatus::Unavailable);
        self.notice(NoticeKind::MapUnavailable, reason);
    }

    /// Disposes the mounted map, if any. Always runs before a new mount.
    fn unmount(&mut self) {
        self.flights.invalidate();
        self.flight = None;
        if let Some(mut mounted) = self.mounted.take() {
            mounted.adapter.dispose(mounted.handle);
            tracing::info!(provider = %mounted.provider, handle = %mounted.handle, "provider unmounted");
        }
        self.mounts.invalidate();
        self.inbox.borrow_mut().clear();
    }

    /// Component teardown: disposes the map and discards every result still
    /// in flight.
    pub fn teardown(&mut self) {
        self.unmount();
        self.fetches.invalidate();
        self.requested = None;
        self.set_status(ProviderStatus::Unmounted);
    }

    fn set_status(&mut self, status: ProviderStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.events.emit(MapEvent::ProviderStatusChanged {
            provider: self.requested,
            status,
        });
    }

    fn notice(&mut self, kind: NoticeKind, message: String) {
        self.events.emit(MapEvent::Notice {
            notice: DegradedNotice { kind, message },
        });
    }

    // ---- inbound ----------------------------------------------------------

    /// Routes a raw backend notification through the mounted adapter.
    pub fn handle_backend_event(&mut self, event: BackendEvent) -> Result<(), AdapterError> {
        let Some(mounted) = self.mounted.as_mut() else {
            tracing::debug!("backend event without a mounted map ignored");
            return Ok(());
        };
        mounted.adapter.dispatch(mounted.handle, event)?;
        self.pump();
        Ok(())
    }

    /// Applies queued adapter callbacks in arrival order.
    pub fn pump(&mut self) {
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            let Some(message) = next else {
                break;
            };
            let current = self.mounted.as_ref().map(|m| m.ticket);
            let mount = match &message {
                Inbound::Activated { mount, .. }
                | Inbound::ViewportSettled { mount, .. }
                | Inbound::FlightFinished { mount, .. } => *mount,
            };
            if current != Some(mount) {
                tracing::debug!("dropping callback from a disposed map");
                continue;
            }
            match message {
                Inbound::Activated { key, .. } => self.on_activated(key),
                Inbound::ViewportSettled { camera, .. } => self.apply_camera(camera),
                Inbound::FlightFinished {
                    flight, outcome, ..
                } => self.on_flight_finished(flight, outcome),
            }
        }
    }

    fn on_activated(&mut self, key: FeatureKey) {
        match key {
            FeatureKey::Listing(id) => {
                let Some(position) = self.position_of(&id) else {
                    tracing::debug!(%id, "activation for a listing not on the map");
                    return;
                };
                self.commit_selection(Some(id.clone()));
                let key = FeatureKey::Listing(id);
                if self.viewport.contains(position) {
                    self.cancel_flight();
                    self.open_popup(&key);
                } else {
                    let zoom = self.viewport.zoom;
                    self.fly(position, zoom, AfterFlight::OpenPopup(key));
                }
            }
            FeatureKey::Cluster(cluster) => {
                let Some(feature) = self
                    .features
                    .iter()
                    .find(|f| f.key == FeatureKey::Cluster(cluster))
                else {
                    return;
                };
                let center = feature.position;
                let zoom = (self.viewport.zoom.floor() + CLUSTER_ZOOM_STEP)
                    .min(self.pipeline.params().expand_zoom.max(self.viewport.zoom));
                self.fly(center, zoom, AfterFlight::Nothing);
            }
        }
    }

    fn on_flight_finished(&mut self, flight: Ticket, outcome: FlyOutcome) {
        if outcome != FlyOutcome::Completed || !self.flights.is_current(flight) {
            tracing::debug!(?outcome, "camera move superseded");
            return;
        }
        let pending = match self.flight.take() {
            Some(pending) if pending.ticket == flight => pending,
            other => {
                self.flight = other;
                return;
            }
        };
        self.apply_camera(pending.target);
        if let AfterFlight::OpenPopup(key) = pending.after {
            self.open_popup(&key);
        }
    }

    fn open_popup(&mut self, key: &FeatureKey) {
        if let Some(mounted) = self.mounted.as_mut() {
            if let Err(err) = mounted.adapter.open_popup(mounted.handle, key) {
                tracing::warn!(error = %err, "popup could not be opened");
            }
        }
    }
}
