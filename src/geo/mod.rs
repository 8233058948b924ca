use crate::models::geo::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_km(a, b) * 1_000.0
}

/// Whether `b` has moved more than `threshold_deg` away from `a` on either
/// coordinate axis. This is the recalculation trigger: a cheap per-axis
/// comparison, not a great-circle distance.
pub fn displacement_exceeds(a: GeoPoint, b: GeoPoint, threshold_deg: f64) -> bool {
    (b.lat - a.lat).abs() > threshold_deg || (b.lng - a.lng).abs() > threshold_deg
}

#[cfg(test)]
mod tests {
    use super::{displacement_exceeds, haversine_km, haversine_m};
    use crate::models::geo::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 23.8103,
            lng: 90.4125,
        };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn dhaka_to_chittagong_is_around_215_km() {
        let dhaka = GeoPoint {
            lat: 23.8103,
            lng: 90.4125,
        };
        let chittagong = GeoPoint {
            lat: 22.3569,
            lng: 91.7832,
        };
        let distance = haversine_km(dhaka, chittagong);
        assert!((distance - 215.0).abs() < 10.0, "got {distance}");
    }

    #[test]
    fn half_millidegree_of_latitude_is_around_55_m() {
        let a = GeoPoint {
            lat: 23.8103,
            lng: 90.4125,
        };
        let b = GeoPoint {
            lat: 23.8108,
            lng: 90.4125,
        };
        let meters = haversine_m(a, b);
        assert!((meters - 55.0).abs() < 5.0, "got {meters}");
    }

    #[test]
    fn displacement_compares_each_axis() {
        let origin = GeoPoint {
            lat: 23.8103,
            lng: 90.4125,
        };
        let near = GeoPoint {
            lat: 23.8104,
            lng: 90.4126,
        };
        let far_lat = GeoPoint {
            lat: 23.8112,
            lng: 90.4125,
        };
        let far_lng = GeoPoint {
            lat: 23.8103,
            lng: 90.4134,
        };

        assert!(!displacement_exceeds(origin, near, 0.0005));
        assert!(displacement_exceeds(origin, far_lat, 0.0005));
        assert!(displacement_exceeds(origin, far_lng, 0.0005));
    }
}
