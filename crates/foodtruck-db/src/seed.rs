use std::collections::BTreeSet;

use foodtruck_core::VendorRecord;
use sqlx::{types::Json, PgPool};

use crate::DbError;

/// Counts written by [`replace_catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub vendors: usize,
    pub foods: usize,
}

/// Replace the vendor and food catalogs with `vendors`.
///
/// Both tables are cleared and refilled inside a single transaction, so
/// readers see either the old catalog or the new one. Duplicate applicants
/// collapse onto one row (last one wins). Food names are the distinct,
/// title-cased menu items across all vendors.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails; the
/// transaction is rolled back.
pub async fn replace_catalog(
    pool: &PgPool,
    vendors: &[VendorRecord],
) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM vendors").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM foods").execute(&mut *tx).await?;

    for vendor in vendors {
        sqlx::query(
            "INSERT INTO vendors (applicant, facility_type, location_description, address, status, \
                                  food_items, approved_at, longitude, latitude, open_hours) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (applicant) DO UPDATE SET \
                 facility_type = EXCLUDED.facility_type, \
                 location_description = EXCLUDED.location_description, \
                 address = EXCLUDED.address, \
                 status = EXCLUDED.status, \
                 food_items = EXCLUDED.food_items, \
                 approved_at = EXCLUDED.approved_at, \
                 longitude = EXCLUDED.longitude, \
                 latitude = EXCLUDED.latitude, \
                 open_hours = EXCLUDED.open_hours, \
                 updated_at = NOW()",
        )
        .bind(&vendor.applicant)
        .bind(vendor.facility_type.as_str())
        .bind(&vendor.location_description)
        .bind(&vendor.address)
        .bind(vendor.status.as_str())
        .bind(vendor.food_items.as_slice())
        .bind(vendor.approved_at)
        .bind(vendor.location.longitude())
        .bind(vendor.location.latitude())
        .bind(Json(&vendor.open_hours))
        .execute(&mut *tx)
        .await?;
    }

    let vendor_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vendors")
        .fetch_one(&mut *tx)
        .await?;

    let foods = catalog_food_names(vendors);
    for name in &foods {
        sqlx::query("INSERT INTO foods (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        vendors = vendor_count,
        foods = foods.len(),
        "vendor catalog replaced"
    );

    Ok(SeedSummary {
        vendors: usize::try_from(vendor_count).unwrap_or(0),
        foods: foods.len(),
    })
}

/// Distinct, title-cased food names across all vendors' menus.
#[must_use]
pub fn catalog_food_names(vendors: &[VendorRecord]) -> BTreeSet<String> {
    vendors
        .iter()
        .flat_map(|v| v.food_items.iter())
        .map(|item| title_case(item.trim()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the
/// rest: `"hot DOGS & chips"` becomes `"Hot Dogs & Chips"`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use foodtruck_core::{FacilityType, GeoPoint, OpenHours, VendorStatus};

    use super::*;

    fn vendor(applicant: &str, items: &[&str]) -> VendorRecord {
        VendorRecord {
            applicant: applicant.to_string(),
            facility_type: FacilityType::Truck,
            location_description: String::new(),
            address: String::new(),
            status: VendorStatus::Approved,
            food_items: items.iter().map(|s| (*s).to_string()).collect(),
            approved_at: None,
            location: GeoPoint::new(0.0, 0.0).expect("point"),
            open_hours: OpenHours::new(),
        }
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("hot DOGS & chips"), "Hot Dogs & Chips");
        assert_eq!(title_case("soda's"), "Soda'S");
        assert_eq!(title_case("2 tacos"), "2 Tacos");
    }

    #[test]
    fn catalog_food_names_dedupes_across_vendors() {
        let vendors = vec![
            vendor("A", &["tacos", " Burritos "]),
            vendor("B", &["TACOS", "", "coffee"]),
        ];
        let names: Vec<String> = catalog_food_names(&vendors).into_iter().collect();
        assert_eq!(names, vec!["Burritos", "Coffee", "Tacos"]);
    }
}
