use crate::Coordinate;
use crate::station_directory::StationRecord;
use ordered_float::OrderedFloat;

/// Great-circle distance between two lat/lon pairs in kilometers.
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let r = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    r * c
}

/// Sorts stations ascending by distance from the origin. Records without a
/// usable coordinate sort last so they are never picked as a route target.
pub fn rank_stations_by_distance(origin: Coordinate, stations: &mut [StationRecord]) {
    stations.sort_by_key(|station| {
        OrderedFloat(match station.coordinate() {
            Some(position) => origin.distance_km(&position),
            None => f64::INFINITY,
        })
    });
}
