mod foods;
mod foodtrucks;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use foodtruck_db::{DbError, VendorStore};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VendorStore>,
}

/// List envelope shared by every collection endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub count: usize,
    pub data: Vec<T>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error_message: String,
    pub code: String,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    data: HealthData,
    meta: ResponseMeta,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn list(data: Vec<T>, request_id: String) -> Self {
        Self {
            count: data.len(),
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_message: message.into(),
            code: code.into(),
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/foodtrucks/search",
            get(foodtrucks::search_foodtrucks),
        )
        .route(
            "/api/v1/foodtrucks/nearby",
            get(foodtrucks::nearby_foodtrucks),
        )
        .route("/api/v1/foodtrucks/all", get(foodtrucks::all_foodtrucks))
        .route("/api/v1/foods/search", get(foods::search_foods))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use foodtruck_core::{
        FacilityType, FindFilter, FoodQuery, FoodRecord, GeoPoint, OpenHours, QueryPlan, Stage,
        TextField, VendorMatch, VendorRecord, VendorStatus,
    };
    use tower::ServiceExt;

    use super::*;

    /// In-memory store that evaluates plans against a fixed vendor list and
    /// records what it was asked to run.
    #[derive(Default)]
    pub struct MockStore {
        pub vendors: Vec<VendorRecord>,
        pub foods: Vec<String>,
        pub fail: bool,
        pub plans: Mutex<Vec<QueryPlan>>,
        pub finds: Mutex<Vec<FindFilter>>,
    }

    impl MockStore {
        pub fn with_vendors(vendors: Vec<VendorRecord>) -> Self {
            Self {
                vendors,
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), DbError> {
            if self.fail {
                Err(DbError::MalformedRow {
                    applicant: "mock".to_string(),
                    reason: "store unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn contains(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    #[async_trait]
    impl VendorStore for MockStore {
        async fn aggregate(&self, plan: &QueryPlan) -> Result<Vec<VendorMatch>, DbError> {
            self.plans.lock().expect("lock").push(plan.clone());
            self.check()?;

            let mut hits: Vec<VendorMatch> = Vec::new();
            'vendors: for vendor in &self.vendors {
                let mut hit = VendorMatch::from(vendor.clone());
                for stage in plan.stages() {
                    match stage {
                        Stage::GeoNear(geo) => {
                            let d = geo.near.distance_to(&vendor.location);
                            if d > geo.max_distance {
                                continue 'vendors;
                            }
                            hit.distance = Some(d);
                        }
                        Stage::Match(m) => {
                            if let Some(text) = &m.text {
                                let found = text.fields.iter().any(|field| match field {
                                    TextField::Applicant => contains(&vendor.applicant, &text.text),
                                    TextField::Address => contains(&vendor.address, &text.text),
                                    TextField::FoodItems => vendor
                                        .food_items
                                        .iter()
                                        .any(|item| contains(item, &text.text)),
                                });
                                if !found {
                                    continue 'vendors;
                                }
                            }
                            if m.status.is_some_and(|s| s != vendor.status)
                                || m.facility_type.is_some_and(|f| f != vendor.facility_type)
                            {
                                continue 'vendors;
                            }
                        }
                        Stage::Project(_) => {}
                    }
                }
                hits.push(hit);
            }
            hits.sort_by(|a, b| a.distance.unwrap_or(0.0).total_cmp(&b.distance.unwrap_or(0.0)));
            Ok(hits)
        }

        async fn find(&self, filter: FindFilter) -> Result<Vec<VendorRecord>, DbError> {
            self.finds.lock().expect("lock").push(filter);
            self.check()?;

            Ok(match filter {
                FindFilter::All => self.vendors.clone(),
                FindFilter::Near(near) => self
                    .vendors
                    .iter()
                    .filter(|v| near.point.distance_to(&v.location) <= near.max_distance)
                    .cloned()
                    .collect(),
            })
        }

        async fn search_foods(&self, query: &FoodQuery) -> Result<Vec<FoodRecord>, DbError> {
            self.check()?;
            Ok(self
                .foods
                .iter()
                .filter(|name| query.name().is_none_or(|q| contains(name, q)))
                .map(|name| FoodRecord { name: name.clone() })
                .collect())
        }

        async fn health_check(&self) -> Result<(), DbError> {
            self.check()
        }
    }

    pub fn vendor(applicant: &str, lat: f64, lon: f64, items: &[&str]) -> VendorRecord {
        VendorRecord {
            applicant: applicant.to_string(),
            facility_type: FacilityType::Truck,
            location_description: String::new(),
            address: format!("{applicant} address"),
            status: VendorStatus::Approved,
            food_items: items.iter().map(|s| (*s).to_string()).collect(),
            approved_at: None,
            location: GeoPoint::new(lat, lon).expect("point"),
            open_hours: OpenHours::new(),
        }
    }

    pub async fn get_json(store: Arc<MockStore>, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = build_app(AppState { store });
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }
}
