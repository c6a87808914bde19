use axum::{
    extract::{Query, State},
    Extension, Json,
};
use foodtruck_core::{
    plan, plan_all, plan_nearby, split_location_pair, FacilityType, GeoFilter, QueryFilter,
    RawParam, VendorMatch, VendorRecord, VendorStatus,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const DEFAULT_RADIUS_METERS: f64 = 1000.0;
const INVALID_LOCATION: &str = "invalid location filter parameter";

#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub facility_type: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
    /// Legacy `lat,lon` pair; ignored when `latitude` and `longitude` are
    /// both given.
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct NearbyParams {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
}

pub(super) async fn search_foodtrucks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<VendorMatch>>, ApiError> {
    let geo = search_geo(
        &req_id,
        params.latitude,
        params.longitude,
        params.radius,
        params.location,
    )?;

    // No vendor carries an unrecognised category, so nothing can match.
    let (Some(status), Some(facility_type)) = (
        parse_choice::<VendorStatus>("status", params.status),
        parse_choice::<FacilityType>("facility_type", params.facility_type),
    ) else {
        return Ok(Json(ApiResponse::list(Vec::new(), req_id.0)));
    };

    let filter = QueryFilter::new(params.q, status, facility_type, geo);
    let plan = plan(&filter);

    let data = state
        .store
        .aggregate(&plan)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::list(data, req_id.0)))
}

pub(super) async fn nearby_foodtrucks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<ApiResponse<VendorRecord>>, ApiError> {
    let latitude = or_number(RawParam::from_query(params.latitude), 0.0);
    let longitude = or_number(RawParam::from_query(params.longitude), 0.0);
    let radius = or_number(RawParam::from_query(params.radius), DEFAULT_RADIUS_METERS);
    let geo = geo_filter(&req_id, &latitude, &longitude, &radius)?;

    let data = state
        .store
        .find(plan_nearby(geo))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::list(data, req_id.0)))
}

pub(super) async fn all_foodtrucks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<VendorRecord>>, ApiError> {
    let data = state
        .store
        .find(plan_all())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::list(data, req_id.0)))
}

/// Resolves the optional geo filter for `search`.
///
/// Explicit `latitude`/`longitude` win over `location`. With only one
/// coordinate supplied the geo stage is simply omitted.
fn search_geo(
    req_id: &RequestId,
    latitude: Option<String>,
    longitude: Option<String>,
    radius: Option<String>,
    location: Option<String>,
) -> Result<Option<GeoFilter>, ApiError> {
    let latitude = RawParam::from_query(latitude);
    let longitude = RawParam::from_query(longitude);
    let radius = or_number(RawParam::from_query(radius), DEFAULT_RADIUS_METERS);

    if latitude.is_present() && longitude.is_present() {
        return geo_filter(req_id, &latitude, &longitude, &radius).map(Some);
    }

    match location.filter(|l| !l.trim().is_empty()) {
        Some(raw) => {
            let Some((latitude, longitude)) = split_location_pair(&raw) else {
                tracing::debug!(location = %raw, "rejected location pair");
                return Err(bad_request(req_id, INVALID_LOCATION));
            };
            geo_filter(req_id, &latitude, &longitude, &radius).map(Some)
        }
        None => Ok(None),
    }
}

fn geo_filter(
    req_id: &RequestId,
    latitude: &RawParam,
    longitude: &RawParam,
    radius: &RawParam,
) -> Result<GeoFilter, ApiError> {
    GeoFilter::from_raw(latitude, longitude, radius).map_err(|e| {
        tracing::debug!(error = %e, "rejected location parameters");
        bad_request(req_id, INVALID_LOCATION)
    })
}

/// Parses an optional categorical filter. The outer `None` means the value
/// was given but is not a known category.
fn parse_choice<T: std::str::FromStr>(
    param: &'static str,
    value: Option<String>,
) -> Option<Option<T>> {
    match value.filter(|v| !v.trim().is_empty()) {
        None => Some(None),
        Some(raw) => match raw.parse::<T>() {
            Ok(choice) => Some(Some(choice)),
            Err(_) => {
                tracing::debug!(param, value = %raw, "unknown filter value; nothing can match");
                None
            }
        },
    }
}

fn or_number(param: RawParam, default: f64) -> RawParam {
    if param.is_present() {
        param
    } else {
        RawParam::Number(default)
    }
}

fn bad_request(req_id: &RequestId, message: impl Into<String>) -> ApiError {
    ApiError::new(req_id.0.clone(), "bad_request", message)
}
