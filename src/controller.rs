use crate::Coordinate;
use crate::battery::BatteryProvider;
use crate::distance::rank_stations_by_distance;
use crate::geocode::Geocoder;
use crate::geolocation::{GeolocationError, LocationProvider};
use crate::map_canvas::{FOCUS_ZOOM, MapCanvas};
use crate::route_animation::RouteAnimator;
use crate::station_directory::{StationDirectory, StationRecord};
use std::error::Error;
use std::sync::{Arc, Mutex};

pub static USER_POPUP: &str = "You are here";
pub static NOT_FOUND_ALERT: &str = "Location not found";
pub static PERMISSION_DENIED_STATUS: &str = "Permission denied.";
pub static UNSUPPORTED_STATUS: &str = "Geolocation not supported.";
pub static BATTERY_UNSUPPORTED_STATUS: &str = "Battery API not supported.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateState {
    Idle,
    AwaitingPermission,
    LocationGranted,
    LocationDenied,
    Unsupported,
}

/// Owns the map canvas, the network clients, the animator and the status
/// surfaces. All mutable state lives here, nothing is module level.
pub struct AppController<D, G> {
    canvas: Arc<Mutex<MapCanvas>>,
    directory: D,
    geocoder: G,
    animator: RouteAnimator,
    pub state: LocateState,
    pub current_coords: Option<Coordinate>,
    pub location_status: String,
    pub battery_status: String,
    pub last_alert: Option<String>,
}

impl<D: StationDirectory, G: Geocoder> AppController<D, G> {
    pub fn new(directory: D, geocoder: G) -> AppController<D, G> {
        AppController::with_animator(directory, geocoder, RouteAnimator::new())
    }

    pub fn with_animator(
        directory: D,
        geocoder: G,
        animator: RouteAnimator,
    ) -> AppController<D, G> {
        AppController {
            canvas: Arc::new(Mutex::new(MapCanvas::new())),
            directory,
            geocoder,
            animator,
            state: LocateState::Idle,
            current_coords: None,
            location_status: String::new(),
            battery_status: String::new(),
            last_alert: None,
        }
    }

    pub fn canvas(&self) -> Arc<Mutex<MapCanvas>> {
        Arc::clone(&self.canvas)
    }

    /// The position flow: resolve the position, center the view, fetch and
    /// render nearby stations, then animate toward the nearest one. The
    /// station list is fetched once and feeds both the marker pass and the
    /// ranking pass.
    pub async fn locate_and_route<L: LocationProvider>(
        &mut self,
        provider: &L,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.state = LocateState::AwaitingPermission;

        let position = match provider.current_position().await {
            Ok(position) => position,
            Err(GeolocationError::Unsupported) => {
                self.state = LocateState::Unsupported;
                self.location_status = UNSUPPORTED_STATUS.to_string();
                return Ok(());
            }
            Err(GeolocationError::PermissionDenied) => {
                self.state = LocateState::LocationDenied;
                self.location_status = PERMISSION_DENIED_STATUS.to_string();
                return Ok(());
            }
        };

        self.state = LocateState::LocationGranted;
        self.current_coords = Some(position);
        self.location_status = format!("Lat: {:.4}, Lng: {:.4}", position.lat, position.lon);
        self.canvas
            .lock()
            .unwrap()
            .set_user_marker(position, USER_POPUP);

        let mut stations = self.directory.stations_near(position).await?;

        self.render_stations(position, &stations);

        rank_stations_by_distance(position, &mut stations);
        if let Some(nearest) = stations.first().and_then(|station| station.coordinate()) {
            self.animator
                .start(Arc::clone(&self.canvas), position, nearest);
        }

        Ok(())
    }

    /// Centers the view on `center` and replaces the station marker set.
    /// Records without both coordinates are skipped.
    pub fn render_stations(&mut self, center: Coordinate, stations: &[StationRecord]) {
        let mut canvas = self.canvas.lock().unwrap();
        canvas.set_view(center, FOCUS_ZOOM);
        canvas.clear_station_markers();

        for station in stations {
            let Some(position) = station.coordinate() else {
                continue;
            };

            let popup = format!(
                "{}\n{}\n{}",
                station.title().unwrap_or_default(),
                station.address_line().unwrap_or_default(),
                station.connector_label()
            );

            canvas.add_station_marker(position, popup);
        }
    }

    /// Free-text place search: geocode, recenter on the first match and
    /// re-render stations there. No match raises the alert and leaves the
    /// view exactly as it was.
    pub async fn search_city(&mut self, query: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let matches = self.geocoder.geocode(query).await?;

        let Some(first) = matches.first() else {
            self.last_alert = Some(NOT_FOUND_ALERT.to_string());
            return Ok(());
        };

        let center = first.coordinate()?;
        let stations = self.directory.stations_near(center).await?;
        self.render_stations(center, &stations);

        Ok(())
    }

    pub fn read_battery<B: BatteryProvider>(&mut self, provider: &B) {
        self.battery_status = match provider.battery_level() {
            Some(level) => format!("Battery: {}%", (level * 100.0).round() as i64),
            None => BATTERY_UNSUPPORTED_STATUS.to_string(),
        };
    }

    pub fn animation_running(&self) -> bool {
        self.animator.is_running()
    }

    pub async fn finish_animation(&mut self) {
        self.animator.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::GeocodeMatch;
    use crate::geolocation::{FixedLocationProvider, UnsupportedLocationProvider};
    use crate::map_canvas::{DEFAULT_CENTER, DEFAULT_ZOOM, MarkerKind};
    use crate::station_directory::{AddressInfo, Connection, ConnectionType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedDirectory {
        stations: Vec<StationRecord>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedDirectory {
        fn new(stations: Vec<StationRecord>) -> FixedDirectory {
            FixedDirectory {
                stations,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl StationDirectory for FixedDirectory {
        async fn stations_near(
            &self,
            _center: Coordinate,
        ) -> Result<Vec<StationRecord>, Box<dyn Error + Send + Sync>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.stations.clone())
        }
    }

    struct FixedGeocoder {
        matches: Vec<GeocodeMatch>,
    }

    impl Geocoder for FixedGeocoder {
        async fn geocode(
            &self,
            _query: &str,
        ) -> Result<Vec<GeocodeMatch>, Box<dyn Error + Send + Sync>> {
            Ok(self.matches.clone())
        }
    }

    struct DeniedLocationProvider;

    impl LocationProvider for DeniedLocationProvider {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            Err(GeolocationError::PermissionDenied)
        }
    }

    fn station(title: &str, lat: f64, lon: f64, connector: &str) -> StationRecord {
        StationRecord {
            address_info: Some(AddressInfo {
                title: Some(title.to_string()),
                address_line1: Some(format!("{} road", title)),
                latitude: Some(lat),
                longitude: Some(lon),
            }),
            connections: Some(vec![Connection {
                connection_type: Some(ConnectionType {
                    title: Some(connector.to_string()),
                }),
            }]),
        }
    }

    fn test_controller(
        stations: Vec<StationRecord>,
        matches: Vec<GeocodeMatch>,
    ) -> AppController<FixedDirectory, FixedGeocoder> {
        AppController::with_animator(
            FixedDirectory::new(stations),
            FixedGeocoder { matches },
            RouteAnimator::with_tick(Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn routes_to_the_nearest_station_after_a_granted_position() {
        // roughly 1 km and 5 km north of Connaught Place, deliberately
        // listed far-first
        let delhi = Coordinate::new(28.6139, 77.2090);
        let far = station("Far hub", 28.6589, 77.2090, "CHAdeMO");
        let near = station("Near hub", 28.6229, 77.2090, "CCS (Type 2)");

        let mut controller = test_controller(vec![far, near], vec![]);
        let provider = FixedLocationProvider { position: delhi };

        controller.locate_and_route(&provider).await.unwrap();

        assert_eq!(controller.state, LocateState::LocationGranted);
        assert_eq!(controller.current_coords, Some(delhi));
        assert_eq!(controller.location_status, "Lat: 28.6139, Lng: 77.2090");

        let near_position = Coordinate::new(28.6229, 77.2090);
        {
            let canvas = controller.canvas();
            let canvas = canvas.lock().unwrap();

            let user = canvas.user_marker().unwrap();
            assert_eq!(user.position, delhi);
            assert_eq!(user.popup.as_deref(), Some(USER_POPUP));
            assert!(user.popup_open);

            assert_eq!(canvas.station_markers().len(), 2);
            assert_eq!(canvas.zoom(), FOCUS_ZOOM);
            assert_eq!(canvas.route_line(), Some((delhi, near_position)));
        }

        // one fetch feeds both rendering and ranking
        assert_eq!(controller.directory.calls.load(Ordering::SeqCst), 1);

        controller.finish_animation().await;

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert_eq!(
            canvas.moving_marker().unwrap().position,
            near_position
        );
        assert_eq!(canvas.moving_marker_updates(), 101);
    }

    #[tokio::test]
    async fn no_stations_means_no_route() {
        let mut controller = test_controller(vec![], vec![]);
        let provider = FixedLocationProvider {
            position: Coordinate::new(28.6139, 77.2090),
        };

        controller.locate_and_route(&provider).await.unwrap();

        assert_eq!(controller.state, LocateState::LocationGranted);
        assert!(!controller.animation_running());

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert!(canvas.moving_marker().is_none());
        assert!(canvas.route_line().is_none());
    }

    #[tokio::test]
    async fn stations_without_coordinates_are_rendered_as_nothing_and_never_targeted() {
        let bare = StationRecord {
            address_info: Some(AddressInfo {
                title: Some("No fix".to_string()),
                address_line1: None,
                latitude: None,
                longitude: None,
            }),
            connections: None,
        };
        let placed = station("Placed", 28.62, 77.21, "Type 2");

        let mut controller = test_controller(vec![bare, placed], vec![]);
        let provider = FixedLocationProvider {
            position: Coordinate::new(28.6139, 77.2090),
        };

        controller.locate_and_route(&provider).await.unwrap();

        let target = Coordinate::new(28.62, 77.21);
        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert_eq!(canvas.station_markers().len(), 1);
        assert_eq!(canvas.route_line().unwrap().1, target);
    }

    #[tokio::test]
    async fn popup_falls_back_for_missing_address_and_connector() {
        let sparse = StationRecord {
            address_info: Some(AddressInfo {
                title: Some("Sparse".to_string()),
                address_line1: None,
                latitude: Some(28.62),
                longitude: Some(77.21),
            }),
            connections: None,
        };

        let mut controller = test_controller(vec![], vec![]);
        controller.render_stations(Coordinate::new(28.6139, 77.2090), &[sparse]);

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        let marker = &canvas.station_markers()[0];
        assert_eq!(marker.kind, MarkerKind::Station);
        assert_eq!(marker.popup.as_deref(), Some("Sparse\n\nUnknown"));
    }

    #[tokio::test]
    async fn denied_permission_is_terminal_for_the_flow() {
        let mut controller = test_controller(
            vec![station("Hub", 28.62, 77.21, "Type 2")],
            vec![],
        );

        controller
            .locate_and_route(&DeniedLocationProvider)
            .await
            .unwrap();

        assert_eq!(controller.state, LocateState::LocationDenied);
        assert_eq!(controller.location_status, PERMISSION_DENIED_STATUS);
        assert_eq!(controller.directory.calls.load(Ordering::SeqCst), 0);

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert!(canvas.user_marker().is_none());
        assert!(canvas.station_markers().is_empty());
    }

    #[tokio::test]
    async fn missing_capability_sets_the_unsupported_status() {
        let mut controller = test_controller(vec![], vec![]);

        controller
            .locate_and_route(&UnsupportedLocationProvider)
            .await
            .unwrap();

        assert_eq!(controller.state, LocateState::Unsupported);
        assert_eq!(controller.location_status, UNSUPPORTED_STATUS);
    }

    #[tokio::test]
    async fn city_search_recenters_and_renders_on_the_first_match() {
        let mut controller = test_controller(
            vec![station("Paris hub", 48.86, 2.32, "Type 2")],
            vec![
                GeocodeMatch {
                    lat: "48.8588897".to_string(),
                    lon: "2.3200410".to_string(),
                    display_name: Some("Paris, France".to_string()),
                },
                GeocodeMatch {
                    lat: "33.66".to_string(),
                    lon: "-95.55".to_string(),
                    display_name: Some("Paris, Texas".to_string()),
                },
            ],
        );

        controller.search_city("Paris").await.unwrap();

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert_eq!(
            canvas.center(),
            Coordinate::new(48.8588897, 2.3200410)
        );
        assert_eq!(canvas.zoom(), FOCUS_ZOOM);
        assert_eq!(canvas.station_markers().len(), 1);
        assert!(controller.last_alert.is_none());
    }

    #[tokio::test]
    async fn city_search_with_no_match_alerts_and_leaves_the_view_alone() {
        let mut controller = test_controller(
            vec![station("Hub", 28.62, 77.21, "Type 2")],
            vec![],
        );

        controller.search_city("Nowhereville").await.unwrap();

        assert_eq!(controller.last_alert.as_deref(), Some(NOT_FOUND_ALERT));

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert_eq!(canvas.center(), DEFAULT_CENTER);
        assert_eq!(canvas.zoom(), DEFAULT_ZOOM);
        assert!(canvas.station_markers().is_empty());
        assert_eq!(controller.directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_renders_replace_the_station_marker_set() {
        let mut controller = test_controller(vec![], vec![]);
        let center = Coordinate::new(28.6139, 77.2090);

        let first = vec![
            station("A", 28.62, 77.21, "Type 2"),
            station("B", 28.63, 77.22, "Type 2"),
        ];
        let second = vec![station("C", 28.64, 77.23, "CHAdeMO")];

        controller.render_stations(center, &first);
        controller.render_stations(center, &second);

        let canvas = controller.canvas();
        let canvas = canvas.lock().unwrap();
        assert_eq!(canvas.station_markers().len(), 1);
        assert_eq!(
            canvas.station_markers()[0].popup.as_deref(),
            Some("C\nC road\nCHAdeMO")
        );
    }

    #[test]
    fn battery_status_reads_once_and_rounds() {
        struct HalfFull;
        impl BatteryProvider for HalfFull {
            fn battery_level(&self) -> Option<f64> {
                Some(0.496)
            }
        }

        struct NoBattery;
        impl BatteryProvider for NoBattery {
            fn battery_level(&self) -> Option<f64> {
                None
            }
        }

        let mut controller = test_controller(vec![], vec![]);

        controller.read_battery(&HalfFull);
        assert_eq!(controller.battery_status, "Battery: 50%");

        controller.read_battery(&NoBattery);
        assert_eq!(controller.battery_status, BATTERY_UNSUPPORTED_STATUS);
    }
}
