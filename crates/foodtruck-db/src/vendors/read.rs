//! Read operations for the `vendors` table.
//!
//! Query plans are translated into a single SQL statement. The geo stage
//! becomes an inner select that computes a haversine `distance` column, so
//! the outer `WHERE` can filter on it alongside the match criteria and the
//! result can be ordered nearest-first.

use foodtruck_core::{
    FindFilter, GeoPoint, MatchStage, QueryPlan, Stage, TextField, VendorMatch, VendorRecord,
    EARTH_RADIUS_M,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::types::VendorRow;
use crate::{contains_pattern, DbError};

const VENDOR_COLUMNS: &str = "id, applicant, facility_type, location_description, \
     address, status, food_items, approved_at, longitude, latitude, open_hours";

/// Execute an aggregation plan and return matches in plan order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::MalformedRow`] if a stored row cannot be decoded.
pub async fn aggregate_vendors(
    pool: &PgPool,
    plan: &QueryPlan,
) -> Result<Vec<VendorMatch>, DbError> {
    let mut qb = build_plan_query(plan);
    let rows = qb.build_query_as::<VendorRow>().fetch_all(pool).await?;
    rows.into_iter().map(VendorRow::into_match).collect()
}

/// Execute a plain lookup: the whole collection, or everything within a
/// radius ordered nearest-first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::MalformedRow`] if a stored row cannot be decoded.
pub async fn find_vendors(pool: &PgPool, filter: FindFilter) -> Result<Vec<VendorRecord>, DbError> {
    let mut qb = build_find_query(filter);
    let rows = qb.build_query_as::<VendorRow>().fetch_all(pool).await?;
    rows.into_iter().map(VendorRow::into_record).collect()
}

fn build_plan_query(plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(VENDOR_COLUMNS).push(", distance FROM (");
    push_source(&mut qb, plan.geo_near().map(|g| g.near));
    qb.push(") v WHERE TRUE");

    for stage in plan.stages() {
        match stage {
            Stage::GeoNear(geo) => {
                qb.push(" AND v.distance <= ").push_bind(geo.max_distance);
            }
            Stage::Match(m) => push_match(&mut qb, m),
            // Selected columns are fixed; the id is dropped when rows are
            // converted to matches.
            Stage::Project(_) => {}
        }
    }

    if plan.geo_near().is_some() {
        qb.push(" ORDER BY v.distance ASC, v.id ASC");
    } else {
        qb.push(" ORDER BY v.id ASC");
    }
    qb
}

fn build_find_query(filter: FindFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(VENDOR_COLUMNS).push(", distance FROM (");
    match filter {
        FindFilter::All => {
            push_source(&mut qb, None);
            qb.push(") v ORDER BY v.id ASC");
        }
        FindFilter::Near(near) => {
            push_source(&mut qb, Some(near.point));
            qb.push(") v WHERE v.distance <= ")
                .push_bind(near.max_distance)
                .push(" ORDER BY v.distance ASC, v.id ASC");
        }
    }
    qb
}

/// Inner select over `vendors`, with `distance` in meters from `origin`.
fn push_source(qb: &mut QueryBuilder<'static, Postgres>, origin: Option<GeoPoint>) {
    qb.push("SELECT ").push(VENDOR_COLUMNS).push(", ");
    match origin {
        Some(point) => push_haversine(qb, point),
        None => {
            qb.push("NULL::float8");
        }
    }
    qb.push(" AS distance FROM vendors");
}

fn push_haversine(qb: &mut QueryBuilder<'static, Postgres>, point: GeoPoint) {
    let (lat, lon) = (point.latitude(), point.longitude());
    qb.push("(2.0::float8 * ")
        .push(EARTH_RADIUS_M)
        .push(" * asin(LEAST(1.0, sqrt(power(sin(radians(latitude - ")
        .push_bind(lat)
        .push(") / 2), 2) + cos(radians(")
        .push_bind(lat)
        .push(")) * cos(radians(latitude)) * power(sin(radians(longitude - ")
        .push_bind(lon)
        .push(") / 2), 2)))))");
}

fn push_match(qb: &mut QueryBuilder<'static, Postgres>, stage: &MatchStage) {
    if let Some(text) = &stage.text {
        // Postgres text cannot hold NUL, so such a search can never match.
        if text.text.contains('\0') {
            qb.push(" AND FALSE");
        } else {
            let pattern = contains_pattern(&text.text);
            qb.push(" AND (");
            for (i, field) in text.fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_text_clause(qb, *field, pattern.clone());
            }
            qb.push(")");
        }
    }
    if let Some(status) = stage.status {
        qb.push(" AND v.status = ").push_bind(status.as_str());
    }
    if let Some(facility_type) = stage.facility_type {
        qb.push(" AND v.facility_type = ")
            .push_bind(facility_type.as_str());
    }
}

fn push_text_clause(qb: &mut QueryBuilder<'static, Postgres>, field: TextField, pattern: String) {
    if field.is_array() {
        qb.push("EXISTS (SELECT 1 FROM unnest(v.")
            .push(field.name())
            .push(") AS item WHERE item ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    } else {
        qb.push("v.")
            .push(field.name())
            .push(" ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
    }
}

#[cfg(test)]
mod tests {
    use foodtruck_core::{
        plan, plan_all, plan_nearby, FacilityType, GeoFilter, QueryFilter, VendorStatus,
    };

    use super::*;

    fn geo(lat: f64, lon: f64, radius: f64) -> GeoFilter {
        GeoFilter {
            point: GeoPoint::new(lat, lon).expect("valid point"),
            radius_meters: radius,
        }
    }

    #[test]
    fn empty_plan_selects_everything_in_id_order() {
        let qb = build_plan_query(&plan(&QueryFilter::default()));
        let sql = qb.sql();
        assert!(sql.contains("NULL::float8 AS distance"), "{sql}");
        assert!(sql.ends_with("WHERE TRUE ORDER BY v.id ASC"), "{sql}");
        assert!(!sql.contains('$'), "no binds expected: {sql}");
    }

    #[test]
    fn text_search_covers_three_fields_with_escaped_ilike() {
        let filter = QueryFilter::new(Some("taco".to_string()), None, None, None);
        let qb = build_plan_query(&plan(&filter));
        let sql = qb.sql();
        assert!(sql.contains("v.applicant ILIKE $1 ESCAPE '\\'"), "{sql}");
        assert!(sql.contains(" OR v.address ILIKE $2"), "{sql}");
        assert!(
            sql.contains("EXISTS (SELECT 1 FROM unnest(v.food_items) AS item WHERE item ILIKE $3"),
            "{sql}"
        );
    }

    #[test]
    fn text_with_nul_matches_nothing_without_binding_it() {
        let filter = QueryFilter::new(Some("taco\0".to_string()), None, None, None);
        let qb = build_plan_query(&plan(&filter));
        let sql = qb.sql();
        assert!(sql.contains("WHERE TRUE AND FALSE ORDER BY"), "{sql}");
        assert!(!sql.contains("ILIKE"), "{sql}");
        assert!(!sql.contains('$'), "no binds expected: {sql}");
    }

    #[test]
    fn geo_plan_filters_and_orders_by_distance() {
        let filter = QueryFilter::new(
            None,
            Some(VendorStatus::Approved),
            Some(FacilityType::Truck),
            Some(geo(37.77, -122.41, 500.0)),
        );
        let qb = build_plan_query(&plan(&filter));
        let sql = qb.sql();
        assert!(sql.contains("asin(LEAST(1.0"), "{sql}");
        assert!(sql.contains("v.distance <= $4"), "{sql}");
        assert!(sql.contains("v.status = $5"), "{sql}");
        assert!(sql.contains("v.facility_type = $6"), "{sql}");
        assert!(sql.ends_with("ORDER BY v.distance ASC, v.id ASC"), "{sql}");
    }

    #[test]
    fn find_all_has_no_where_clause() {
        let qb = build_find_query(plan_all());
        assert!(!qb.sql().contains("WHERE"), "{}", qb.sql());
    }

    #[test]
    fn find_near_filters_by_radius() {
        let qb = build_find_query(plan_nearby(geo(0.0, 0.0, 1000.0)));
        let sql = qb.sql();
        assert!(sql.contains("WHERE v.distance <= $4"), "{sql}");
        assert!(sql.contains("ORDER BY v.distance ASC"), "{sql}");
    }
}
