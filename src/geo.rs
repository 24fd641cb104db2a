use crate::catalog::Cinema;
use crate::error::GeoError;
use serde::{Deserialize, Serialize};

/// Экваториальный радиус WGS-84, км.
const EARTH_RADIUS_KM: f64 = 6378.137;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let c = Self { latitude, longitude };
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        let lat_ok = (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate { latitude: self.latitude, longitude: self.longitude })
        }
    }

    /// Расстояние по большому кругу (haversine), км.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
    }
}

/// Кинотеатр с расстоянием до точки запроса; живёт только в пределах одного ответа.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub cinema: Cinema,
    pub distance_km: f64,
}

/// Округление до метра.
fn round_km(km: f64) -> f64 {
    (km * 1000.0).round() / 1000.0
}

pub fn rank(origin: Coordinate, cinemas: Vec<Cinema>) -> Result<Vec<Ranked>, GeoError> {
    origin.validate()?;
    let mut ranked: Vec<Ranked> = cinemas
        .into_iter()
        .map(|c| {
            let distance_km = round_km(origin.distance_km(&c.location));
            Ranked { cinema: c, distance_km }
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.cinema.uuid.cmp(&b.cinema.uuid))
    });
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cinema(uuid: &str, latitude: f64, longitude: f64) -> Cinema {
        Cinema {
            uuid: uuid.to_string(),
            name: format!("Кинотеатр {uuid}"),
            url: format!("https://example.org/{uuid}"),
            location: Coordinate { latitude, longitude },
            films: vec![],
        }
    }

    #[test]
    fn one_degree_on_equator() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.0, 1.0).unwrap();
        assert!((a.distance_km(&b) - 111.319).abs() < 0.01);
        assert_eq!(a.distance_km(&a), 0.0);
    }

    #[test]
    fn nearest_first() {
        let origin = Coordinate::new(55.75, 37.61).unwrap();
        let far = cinema("c2", 55.7986, 37.61);
        let near = cinema("c1", 55.7608, 37.61);
        let ranked = rank(origin, vec![far, near]).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].cinema.uuid, "c1");
        assert!((ranked[0].distance_km - 1.2).abs() < 0.05, "{}", ranked[0].distance_km);
        assert!((ranked[1].distance_km - 5.4).abs() < 0.05, "{}", ranked[1].distance_km);
    }

    #[test]
    fn ties_broken_by_uuid() {
        let origin = Coordinate::new(10.0, 10.0).unwrap();
        let input = vec![
            cinema("c9", 10.0, 10.5),
            cinema("c3", 10.0, 9.5),
            cinema("c5", 10.0, 10.5),
            cinema("c0", 10.0, 10.0),
        ];
        let ids: Vec<String> = rank(origin, input).unwrap().into_iter().map(|r| r.cinema.uuid).collect();
        assert_eq!(ids, ["c0", "c3", "c5", "c9"]);
    }

    #[test]
    fn output_sorted_and_same_length() {
        let origin = Coordinate::new(-12.5, 130.8).unwrap();
        let input: Vec<Cinema> = (0..25)
            .map(|i| cinema(&format!("c{i:02}"), -12.5 + (i % 7) as f64 * 0.3, 130.8 - (i % 5) as f64 * 0.2))
            .collect();
        let ranked = rank(origin, input).unwrap();
        assert_eq!(ranked.len(), 25);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn empty_input() {
        assert!(rank(Coordinate { latitude: 0.0, longitude: 0.0 }, vec![]).unwrap().is_empty());
    }

    #[test]
    fn invalid_origin() {
        for (lat, lon) in [(90.1, 0.0), (-91.0, 0.0), (0.0, 180.5), (0.0, -181.0), (f64::NAN, 0.0)] {
            let origin = Coordinate { latitude: lat, longitude: lon };
            assert!(matches!(rank(origin, vec![]), Err(GeoError::InvalidCoordinate { .. })));
            assert!(Coordinate::new(lat, lon).is_err());
        }
    }
}
