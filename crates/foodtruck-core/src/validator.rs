//! Location parameter validation.
//!
//! Request parameters arrive untyped. [`RawParam`] tags each one as absent,
//! text, or an already-numeric value; coercion to `f64` happens exactly once,
//! in [`GeoFilter::from_raw`], and everything past that point is typed.

use crate::geo::{GeoFilter, GeoPoint, InvalidLocation};

/// A single user-supplied parameter before coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawParam {
    #[default]
    Absent,
    Text(String),
    Number(f64),
}

impl RawParam {
    /// Wraps an optional query-string value. Blank strings count as absent.
    #[must_use]
    pub fn from_query(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self::Text(v),
            _ => Self::Absent,
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Numeric coercion. Only finite reals qualify; `NaN` and `inf` are
    /// rejected even though `f64::from_str` accepts them.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Absent => return None,
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawParam {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Option<String>> for RawParam {
    fn from(value: Option<String>) -> Self {
        Self::from_query(value)
    }
}

impl GeoFilter {
    /// Coerces and range-checks raw latitude, longitude and radius.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLocation::NotNumeric`] naming the first parameter
    /// that is absent or not a finite number, or a range error from
    /// [`GeoPoint::new`].
    pub fn from_raw(
        latitude: &RawParam,
        longitude: &RawParam,
        radius: &RawParam,
    ) -> Result<Self, InvalidLocation> {
        let latitude = latitude
            .to_f64()
            .ok_or(InvalidLocation::NotNumeric { param: "latitude" })?;
        let longitude = longitude
            .to_f64()
            .ok_or(InvalidLocation::NotNumeric { param: "longitude" })?;
        let radius_meters = radius
            .to_f64()
            .ok_or(InvalidLocation::NotNumeric { param: "radius" })?;

        Ok(Self {
            point: GeoPoint::new(latitude, longitude)?,
            radius_meters,
        })
    }
}

/// Returns `true` when a geo filter can be built from the three raw inputs.
///
/// Fails closed: anything non-numeric, missing, or out of range is `false`.
/// Radius is not range-checked.
#[must_use]
pub fn validate(latitude: &RawParam, longitude: &RawParam, radius: &RawParam) -> bool {
    GeoFilter::from_raw(latitude, longitude, radius).is_ok()
}

/// Splits the legacy `location=lat,lon` form into `(latitude, longitude)`.
///
/// Returns `None` unless there are exactly two comma-separated parts.
#[must_use]
pub fn split_location_pair(raw: &str) -> Option<(RawParam, RawParam)> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [lat, lon] => Some((RawParam::from(*lat), RawParam::from(*lon))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(
        lat: impl Into<RawParam>,
        lon: impl Into<RawParam>,
        radius: impl Into<RawParam>,
    ) -> bool {
        validate(&lat.into(), &lon.into(), &radius.into())
    }

    #[test]
    fn accepts_in_range_coordinates() {
        assert!(check(0.0, 0.0, 1000.0));
        assert!(check("37.7749", "-122.4194", "500"));
        assert!(check(90.0, 180.0, 1.0));
        assert!(check(-90.0, -180.0, 1.0));
    }

    #[test]
    fn rejects_latitude_out_of_range() {
        assert!(!check(-95.0, 0.0, 1000.0));
        assert!(!check(100.0, 0.0, 1000.0));
        assert!(!check("90.0001", "0", "10"));
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        assert!(!check(50.0, 300.0, 1000.0));
        assert!(!check(50.0, -200.0, 1000.0));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(!check("invalid", "invalid", "1000"));
        assert!(!check("10", "20", "far"));
        assert!(!check("NaN", "0", "10"));
        assert!(!check("0", "inf", "10"));
    }

    #[test]
    fn rejects_missing_or_blank_input() {
        assert!(!validate(
            &RawParam::Absent,
            &RawParam::from(0.0),
            &RawParam::from(10.0)
        ));
        assert!(!check(
            RawParam::from_query(Some("  ".to_string())),
            0.0,
            10.0
        ));
    }

    #[test]
    fn radius_is_not_range_checked() {
        assert!(check(0.0, 0.0, 0.0));
        assert!(check(0.0, 0.0, -25.0));
    }

    #[test]
    fn from_raw_names_the_offending_parameter() {
        let err = GeoFilter::from_raw(&"1".into(), &"x".into(), &"1".into()).unwrap_err();
        assert_eq!(err, InvalidLocation::NotNumeric { param: "longitude" });
    }

    #[test]
    fn from_raw_trims_whitespace() {
        let filter = GeoFilter::from_raw(&" 12.5 ".into(), &"-3".into(), &"75".into())
            .expect("valid filter");
        assert_eq!(filter.point.coordinates(), [-3.0, 12.5]);
        assert!((filter.radius_meters - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn split_location_pair_reads_latitude_first() {
        let (lat, lon) = split_location_pair("37.77, -122.41").expect("two parts");
        assert_eq!(lat, RawParam::from("37.77"));
        assert_eq!(lon, RawParam::from("-122.41"));

        let filter = GeoFilter::from_raw(&lat, &lon, &RawParam::from(100.0)).expect("valid");
        assert_eq!(filter.point.coordinates(), [-122.41, 37.77]);
    }

    #[test]
    fn split_location_pair_rejects_wrong_arity() {
        assert!(split_location_pair("37.77").is_none());
        assert!(split_location_pair("1,2,3").is_none());
    }

    #[test]
    fn split_location_pair_keeps_non_numeric_parts_for_validation() {
        let (lat, lon) = split_location_pair("north,west").expect("two parts");
        assert!(!validate(&lat, &lon, &RawParam::from(10.0)));
    }
}
