/**
 * GEO DISTANCE - Distance orthodromique entre deux coordonnées
 *
 * RÔLE : Calcul de la distance "à vol d'oiseau" entre la boutique et le client
 * via la formule de haversine (sphère de rayon 6371 km).
 *
 * FONCTIONNEMENT :
 * - Coordinate = valeur immuable validée à la construction (fail fast)
 * - distance_km = fonction pure, sans état, appelable depuis n'importe quel thread
 */

use serde::{Deserialize, Serialize};

/// Rayon terrestre moyen utilisé par la formule de haversine
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("Invalid coordinate: latitude {latitude} / longitude {longitude} out of range")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Coordonnée géographique en degrés décimaux.
///
/// Latitude dans [-90, 90], longitude dans [-180, 180]. Les valeurs hors
/// domaine sont rejetées, jamais ramenées dans l'intervalle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        // NaN échoue aussi les deux tests `contains`
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidCoordinate { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Distance haversine en kilomètres entre deux coordonnées déjà validées.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let sin_d_phi = (d_phi / 2.0).sin();
    let sin_d_lambda = (d_lambda / 2.0).sin();

    // h peut sortir légèrement de [0, 1] par arrondi flottant
    let h = (sin_d_phi * sin_d_phi + phi1.cos() * phi2.cos() * sin_d_lambda * sin_d_lambda)
        .clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Variante sur degrés bruts : valide les deux points avant tout calcul.
pub fn distance_km_between(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
) -> Result<f64, GeoError> {
    let a = Coordinate::new(lat1, lon1)?;
    let b = Coordinate::new(lat2, lon2)?;
    Ok(distance_km(&a, &b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Coordinate {
        Coordinate::new(-43.6167, -71.8000).unwrap()
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let s = store();
        assert_eq!(distance_km(&s, &s), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let points = [
            (-43.6167, -71.8000),
            (-43.5300, -71.7500),
            (0.0, 0.0),
            (89.9, 179.9),
            (-90.0, -180.0),
            (51.5074, -0.1278),
        ];
        for &(la1, lo1) in &points {
            for &(la2, lo2) in &points {
                let a = Coordinate::new(la1, lo1).unwrap();
                let b = Coordinate::new(la2, lo2).unwrap();
                assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
            }
        }
    }

    #[test]
    fn test_distance_near_store_matches_reference() {
        // ~0.09° de latitude au nord de la boutique ≈ 10 km
        let client = Coordinate::new(-43.5267, -71.8000).unwrap();
        let reference = EARTH_RADIUS_KM * 0.09_f64.to_radians();
        let d = distance_km(&store(), &client);
        assert!((d - reference).abs() / reference < 0.01, "got {d}, expected ~{reference}");
        assert!((d - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.0, 180.0).unwrap();
        let d = distance_km(&a, &b);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_coordinates_are_rejected() {
        assert!(Coordinate::new(90.01, 0.0).is_err());
        assert!(Coordinate::new(-90.01, 0.0).is_err());
        assert!(Coordinate::new(0.0, 180.5).is_err());
        assert!(Coordinate::new(0.0, -181.0).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn test_distance_between_validates_first() {
        let err = distance_km_between(-43.6, -71.8, 95.0, 0.0).unwrap_err();
        assert_eq!(err, GeoError::InvalidCoordinate { latitude: 95.0, longitude: 0.0 });
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude": -43.6, "longitude": -71.8}"#).unwrap();
        assert_eq!(ok.latitude(), -43.6);
        assert!(serde_json::from_str::<Coordinate>(r#"{"latitude": 120.0, "longitude": 0.0}"#).is_err());
    }
}
