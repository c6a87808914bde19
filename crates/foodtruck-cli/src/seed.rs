//! `db seed`: load the permit CSV export into the vendor catalog.
//!
//! Rows that cannot become a [`VendorRecord`] are logged and skipped so one
//! bad permit does not abort the import.

use std::{io::Read, path::Path};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use foodtruck_core::{
    parse_open_hours, FacilityType, GeoPoint, OpenHours, VendorRecord, VendorStatus,
};
use serde::Deserialize;

const APPROVED_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// One row of the permit CSV. Only the columns the catalog uses are read.
#[derive(Debug, Deserialize)]
struct PermitRow {
    #[serde(rename = "Applicant", default)]
    applicant: String,
    #[serde(rename = "FacilityType", default)]
    facility_type: String,
    #[serde(rename = "LocationDescription", default)]
    location_description: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "FoodItems", default)]
    food_items: String,
    #[serde(rename = "Approved", default)]
    approved: String,
    #[serde(rename = "Latitude", default)]
    latitude: String,
    #[serde(rename = "Longitude", default)]
    longitude: String,
    #[serde(rename = "dayshours", default)]
    dayshours: String,
}

impl PermitRow {
    fn into_record(self) -> anyhow::Result<VendorRecord> {
        let applicant = self.applicant.trim().to_string();
        if applicant.is_empty() {
            anyhow::bail!("missing applicant");
        }

        let facility_type = if self.facility_type.trim().is_empty() {
            FacilityType::Unknown
        } else {
            self.facility_type.parse::<FacilityType>()?
        };
        let status = self.status.parse::<VendorStatus>()?;

        let latitude: f64 = self
            .latitude
            .trim()
            .parse()
            .with_context(|| format!("latitude {:?}", self.latitude))?;
        let longitude: f64 = self
            .longitude
            .trim()
            .parse()
            .with_context(|| format!("longitude {:?}", self.longitude))?;
        let location = GeoPoint::new(latitude, longitude)?;

        let open_hours = parse_open_hours(&self.dayshours).unwrap_or_else(|e| {
            tracing::warn!(
                applicant = %applicant,
                error = %e,
                "unparseable dayshours; storing no hours"
            );
            OpenHours::new()
        });
        let approved_at = parse_approved(&self.approved).unwrap_or_else(|e| {
            tracing::warn!(
                applicant = %applicant,
                error = %e,
                "unparseable approved date; storing none"
            );
            None
        });

        Ok(VendorRecord {
            facility_type,
            location_description: self.location_description.trim().to_string(),
            address: self.address.trim().to_string(),
            status,
            food_items: split_food_items(&self.food_items),
            approved_at,
            location,
            open_hours,
            applicant,
        })
    }
}

/// `"Tacos: Burritos:  :Soda"` → `["Tacos", "Burritos", "Soda"]`.
fn split_food_items(raw: &str) -> Vec<String> {
    raw.split(':')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_approved(raw: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let naive = NaiveDateTime::parse_from_str(raw, APPROVED_FORMAT)
        .with_context(|| format!("approved date {raw:?}"))?;
    Ok(Some(naive.and_utc()))
}

/// Parse permit rows from `reader`, returning the usable records and the
/// number of rows skipped.
///
/// # Errors
///
/// Returns an error only if the CSV header cannot be read.
pub(crate) fn read_vendors<R: Read>(reader: R) -> anyhow::Result<(Vec<VendorRecord>, usize)> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    rdr.headers().context("reading CSV header")?;

    let mut vendors = Vec::new();
    let mut skipped = 0;
    for (index, row) in rdr.deserialize::<PermitRow>().enumerate() {
        // +2: one-based, after the header line.
        let line = index + 2;
        match row
            .map_err(anyhow::Error::from)
            .and_then(PermitRow::into_record)
        {
            Ok(vendor) => vendors.push(vendor),
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping permit row");
                skipped += 1;
            }
        }
    }
    Ok((vendors, skipped))
}

/// Replace the catalog with the contents of the CSV at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the database write fails.
pub(crate) async fn run_db_seed(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening seed file {}", path.display()))?;
    let (vendors, skipped) = read_vendors(file)?;

    let summary = foodtruck_db::replace_catalog(pool, &vendors).await?;
    println!(
        "seeded {} vendors and {} foods from {} ({skipped} rows skipped)",
        summary.vendors,
        summary.foods,
        path.display()
    );
    Ok(())
}
