//! Row types for the `vendors` table.

use chrono::{DateTime, Utc};
use foodtruck_core::{
    FacilityType, GeoPoint, OpenHours, VendorMatch, VendorRecord, VendorStatus,
};
use sqlx::types::Json;

use crate::DbError;

/// A row from the `vendors` table plus the computed `distance` column
/// (meters, `NULL` when the query had no reference point).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorRow {
    pub id: i64,
    pub applicant: String,
    pub facility_type: String,
    pub location_description: String,
    pub address: String,
    pub status: String,
    pub food_items: Vec<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub longitude: f64,
    pub latitude: f64,
    pub open_hours: Json<OpenHours>,
    pub distance: Option<f64>,
}

impl VendorRow {
    /// Converts into the domain record, dropping `id` and `distance`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MalformedRow`] if a stored enum or coordinate does
    /// not parse.
    pub fn into_record(self) -> Result<VendorRecord, DbError> {
        let malformed = |reason: String| DbError::MalformedRow {
            applicant: self.applicant.clone(),
            reason,
        };

        let facility_type = self
            .facility_type
            .parse::<FacilityType>()
            .map_err(|e| malformed(e.to_string()))?;
        let status = self
            .status
            .parse::<VendorStatus>()
            .map_err(|e| malformed(e.to_string()))?;
        let location =
            GeoPoint::new(self.latitude, self.longitude).map_err(|e| malformed(e.to_string()))?;

        Ok(VendorRecord {
            applicant: self.applicant,
            facility_type,
            location_description: self.location_description,
            address: self.address,
            status,
            food_items: self.food_items,
            approved_at: self.approved_at,
            location,
            open_hours: self.open_hours.0,
        })
    }

    /// Converts into a plan result. The row id is not exposed.
    ///
    /// # Errors
    ///
    /// See [`VendorRow::into_record`].
    pub fn into_match(self) -> Result<VendorMatch, DbError> {
        let distance = self.distance;
        Ok(VendorMatch {
            record: self.into_record()?,
            distance,
        })
    }
}
