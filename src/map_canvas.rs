use crate::Coordinate;
use geo_types::{LineString, Point};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};

/// Whole-country overview shown before any position is known.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 20.5937,
    lon: 78.9629,
};
pub const DEFAULT_ZOOM: u8 = 5;
/// Street-level zoom applied whenever the view centers on a position.
pub const FOCUS_ZOOM: u8 = 13;

pub static ROUTE_LINE_COLOR: &str = "blue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    User,
    MovingBike,
    Station,
}

impl MarkerKind {
    pub fn label(self) -> &'static str {
        match self {
            MarkerKind::User => "user",
            MarkerKind::MovingBike => "bike",
            MarkerKind::Station => "station",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: Coordinate,
    pub kind: MarkerKind,
    pub popup: Option<String>,
    pub popup_open: bool,
}

/// In-memory map view: center/zoom state plus marker overlays. The station
/// marker set is replaced wholesale on each render so repeated searches
/// never accumulate stale markers.
#[derive(Debug)]
pub struct MapCanvas {
    center: Coordinate,
    zoom: u8,
    user_marker: Option<Marker>,
    moving_marker: Option<Marker>,
    station_markers: Vec<Marker>,
    route_line: Option<(Coordinate, Coordinate)>,
    moving_marker_updates: u64,
}

impl MapCanvas {
    pub fn new() -> MapCanvas {
        MapCanvas {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            user_marker: None,
            moving_marker: None,
            station_markers: vec![],
            route_line: None,
            moving_marker_updates: 0,
        }
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_view(&mut self, center: Coordinate, zoom: u8) {
        self.center = center;
        self.zoom = zoom;
    }

    pub fn set_user_marker(&mut self, position: Coordinate, popup: &str) {
        self.user_marker = Some(Marker {
            position,
            kind: MarkerKind::User,
            popup: Some(popup.to_string()),
            popup_open: true,
        });
    }

    pub fn user_marker(&self) -> Option<&Marker> {
        self.user_marker.as_ref()
    }

    /// Replaces the moving marker. There is at most one live instance, a new
    /// route swaps it rather than adding another.
    pub fn place_moving_marker(&mut self, position: Coordinate) {
        self.moving_marker = Some(Marker {
            position,
            kind: MarkerKind::MovingBike,
            popup: None,
            popup_open: false,
        });
    }

    pub fn move_moving_marker(&mut self, position: Coordinate) {
        if let Some(marker) = self.moving_marker.as_mut() {
            marker.position = position;
            self.moving_marker_updates += 1;
        }
    }

    pub fn moving_marker(&self) -> Option<&Marker> {
        self.moving_marker.as_ref()
    }

    pub fn moving_marker_updates(&self) -> u64 {
        self.moving_marker_updates
    }

    pub fn clear_station_markers(&mut self) {
        self.station_markers.clear();
    }

    pub fn add_station_marker(&mut self, position: Coordinate, popup: String) {
        self.station_markers.push(Marker {
            position,
            kind: MarkerKind::Station,
            popup: Some(popup),
            popup_open: false,
        });
    }

    pub fn station_markers(&self) -> &[Marker] {
        &self.station_markers
    }

    pub fn set_route_line(&mut self, start: Coordinate, end: Coordinate) {
        self.route_line = Some((start, end));
    }

    pub fn route_line(&self) -> Option<(Coordinate, Coordinate)> {
        self.route_line
    }

    /// Exports the whole canvas as a GeoJSON feature collection: one point
    /// feature per marker and a line feature for the route.
    pub fn to_geojson(&self) -> GeoJson {
        let mut features: Vec<Feature> = vec![];

        let markers = self
            .user_marker
            .iter()
            .chain(self.moving_marker.iter())
            .chain(self.station_markers.iter());

        for marker in markers {
            features.push(marker_feature(marker));
        }

        if let Some((start, end)) = self.route_line {
            let line =
                LineString::from(vec![(start.lon, start.lat), (end.lon, end.lat)]);

            let mut properties = JsonObject::new();
            properties.insert("kind".to_string(), JsonValue::from("route"));
            properties.insert("color".to_string(), JsonValue::from(ROUTE_LINE_COLOR));

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry {
                    bbox: None,
                    value: Value::from(&line),
                    foreign_members: None,
                }),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }
}

fn marker_feature(marker: &Marker) -> Feature {
    let point = Point::new(marker.position.lon, marker.position.lat);

    let mut properties = JsonObject::new();
    properties.insert(
        "kind".to_string(),
        JsonValue::from(marker.kind.label()),
    );
    if let Some(popup) = &marker.popup {
        properties.insert("popup".to_string(), JsonValue::from(popup.clone()));
        properties.insert("popup_open".to_string(), JsonValue::from(marker.popup_open));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry {
            bbox: None,
            value: Value::from(&point),
            foreign_members: None,
        }),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
