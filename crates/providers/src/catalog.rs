use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The rendering backends the viewer can mount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Raster tiles (Leaflet-style engine).
    Raster,
    /// Vector style engine (MapLibre-style).
    Vector,
    #[serde(rename = "2gis", alias = "two_gis")]
    TwoGis,
    Yandex,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::Raster,
        ProviderId::Vector,
        ProviderId::TwoGis,
        ProviderId::Yandex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Raster => "raster",
            ProviderId::Vector => "vector",
            ProviderId::TwoGis => "2gis",
            ProviderId::Yandex => "yandex",
        }
    }

    pub fn spec(self) -> &'static ProviderSpec {
        match self {
            ProviderId::Raster => &RASTER,
            ProviderId::Vector => &VECTOR,
            ProviderId::TwoGis => &TWO_GIS,
            ProviderId::Yandex => &YANDEX,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProviderError(pub String);

impl fmt::Display for UnknownProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown map provider {:?}", self.0)
    }
}

impl std::error::Error for UnknownProviderError {}

impl FromStr for ProviderId {
    type Err = UnknownProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" | "leaflet" | "osm" => Ok(ProviderId::Raster),
            "vector" | "maplibre" => Ok(ProviderId::Vector),
            "2gis" | "twogis" | "two_gis" => Ok(ProviderId::TwoGis),
            "yandex" => Ok(ProviderId::Yandex),
            _ => Err(UnknownProviderError(s.to_string())),
        }
    }
}

/// Static facts about one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub id: ProviderId,
    pub label: &'static str,
    /// SDK script injected before first use. `{api_key}` is substituted.
    pub script_url: Option<&'static str>,
    pub style_url: Option<&'static str>,
    pub tile_url: Option<&'static str>,
    /// Whether camera moves animate and complete asynchronously.
    pub animated_camera: bool,
    pub needs_credentials: bool,
}

impl ProviderSpec {
    pub fn needs_script(&self) -> bool {
        self.script_url.is_some()
    }

    pub fn resolved_script_url(&self, api_key: Option<&str>) -> Option<String> {
        self.script_url
            .map(|url| url.replace("{api_key}", api_key.unwrap_or_default()))
    }
}

const OSM_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

static RASTER: ProviderSpec = ProviderSpec {
    id: ProviderId::Raster,
    label: "OpenStreetMap",
    script_url: None,
    style_url: None,
    tile_url: Some(OSM_TILES),
    animated_camera: true,
    needs_credentials: false,
};

static VECTOR: ProviderSpec = ProviderSpec {
    id: ProviderId::Vector,
    label: "Vector",
    script_url: None,
    style_url: None,
    tile_url: Some(OSM_TILES),
    animated_camera: true,
    needs_credentials: false,
};

static TWO_GIS: ProviderSpec = ProviderSpec {
    id: ProviderId::TwoGis,
    label: "2GIS",
    script_url: Some("https://maps.api.2gis.ru/2.0/loader.js?pkg=full"),
    style_url: None,
    tile_url: None,
    animated_camera: false,
    needs_credentials: false,
};

static YANDEX: ProviderSpec = ProviderSpec {
    id: ProviderId::Yandex,
    label: "Yandex Maps",
    script_url: Some("https://api-maps.yandex.ru/2.1/?apikey={api_key}&lang=ru_RU"),
    style_url: None,
    tile_url: None,
    animated_camera: true,
    needs_credentials: true,
};
