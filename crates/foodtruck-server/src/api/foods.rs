use axum::{
    extract::{Query, State},
    Extension, Json,
};
use foodtruck_core::{FoodQuery, FoodRecord};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct FoodSearchParams {
    pub name: Option<String>,
}

pub(super) async fn search_foods(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<FoodSearchParams>,
) -> Result<Json<ApiResponse<FoodRecord>>, ApiError> {
    let query = FoodQuery::new(params.name);

    let data = state
        .store
        .search_foods(&query)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::list(data, req_id.0)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::super::test_support::{get_json, MockStore};

    fn store() -> Arc<MockStore> {
        Arc::new(MockStore {
            foods: vec!["Burritos".to_string(), "Hot Dogs".to_string(), "Tacos".to_string()],
            ..MockStore::default()
        })
    }

    #[tokio::test]
    async fn lists_all_foods_without_name() {
        let (status, json) = get_json(store(), "/api/v1/foods/search").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 3);
    }

    #[tokio::test]
    async fn blank_name_lists_all_foods() {
        let (_, json) = get_json(store(), "/api/v1/foods/search?name=").await;
        assert_eq!(json["count"], 3);
    }

    #[tokio::test]
    async fn filters_case_insensitively() {
        let (status, json) = get_json(store(), "/api/v1/foods/search?name=DOG").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["data"][0]["name"], "Hot Dogs");
    }

    #[tokio::test]
    async fn name_with_nul_byte_is_empty_not_an_error() {
        let (status, json) = get_json(store(), "/api/v1/foods/search?name=%00").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert_eq!(json["data"], serde_json::json!([]));
    }
}
