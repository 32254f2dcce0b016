use compute::DistrictAggregate;
use listings::ListingId;
use providers::ProviderId;
use serde::Serialize;

use crate::viewport::MapViewport;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Unmounted,
    Mounting,
    Ready,
    /// Shown as a "map unavailable" placeholder.
    Unavailable,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    FeedUnavailable,
    MapUnavailable,
    InvalidData,
}

/// A non-modal degraded state the host should surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedNotice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Everything the viewer tells its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    SelectionChanged { id: Option<ListingId> },
    ViewportChanged { viewport: MapViewport },
    AggregatesReady { districts: Vec<DistrictAggregate> },
    FeaturesRendered { count: usize },
    ProviderStatusChanged { provider: Option<ProviderId>, status: ProviderStatus },
    Notice { notice: DegradedNotice },
}
