//! Query planning for vendor searches.
//!
//! [`plan`] turns a [`QueryFilter`] into an ordered [`QueryPlan`]. Stage order
//! is fixed: geo-proximity first (the store's proximity operator must precede
//! generic matching), then the field match, then the projection. The planner
//! never fails; every filter dimension may be absent.

use serde_json::{json, Value};

use crate::geo::{GeoFilter, GeoPoint};
use crate::vendor::{FacilityType, VendorStatus};

/// Name of the field the geo stage writes distances (meters) into.
pub const DISTANCE_FIELD: &str = "distance";

/// Request-scoped, immutable search criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    search_text: Option<String>,
    status: Option<VendorStatus>,
    facility_type: Option<FacilityType>,
    geo: Option<GeoFilter>,
}

impl QueryFilter {
    /// Builds a filter. Empty or whitespace-only search text is dropped.
    #[must_use]
    pub fn new(
        search_text: Option<String>,
        status: Option<VendorStatus>,
        facility_type: Option<FacilityType>,
        geo: Option<GeoFilter>,
    ) -> Self {
        Self {
            search_text: search_text.filter(|t| !t.trim().is_empty()),
            status,
            facility_type,
            geo,
        }
    }

    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> Option<VendorStatus> {
        self.status
    }

    #[must_use]
    pub fn facility_type(&self) -> Option<FacilityType> {
        self.facility_type
    }

    #[must_use]
    pub fn geo(&self) -> Option<&GeoFilter> {
        self.geo.as_ref()
    }
}

/// Restrict to a radius around a point, nearest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoNearStage {
    pub near: GeoPoint,
    pub max_distance: f64,
    pub distance_field: &'static str,
    pub spherical: bool,
}

/// Fields covered by free-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Applicant,
    Address,
    FoodItems,
}

impl TextField {
    pub const ALL: [TextField; 3] = [Self::Applicant, Self::Address, Self::FoodItems];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Address => "address",
            Self::FoodItems => "food_items",
        }
    }

    /// Array fields match when any element contains the text.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(self, Self::FoodItems)
    }
}

/// Case-insensitive literal substring match over any of `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub text: String,
    pub fields: [TextField; 3],
}

/// Conjunction of the optional match criteria. Never empty when present in
/// a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchStage {
    pub text: Option<TextSearch>,
    pub status: Option<VendorStatus>,
    pub facility_type: Option<FacilityType>,
}

/// Output shaping: the store's internal row id is never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection;

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    GeoNear(GeoNearStage),
    Match(MatchStage),
    Project(Projection),
}

impl Stage {
    /// Aggregation-pipeline rendering, used for logging and diagnostics.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Stage::GeoNear(geo) => json!({
                "$geoNear": {
                    "near": {"type": "Point", "coordinates": geo.near.coordinates()},
                    "distanceField": geo.distance_field,
                    "maxDistance": geo.max_distance,
                    "spherical": geo.spherical,
                }
            }),
            Stage::Match(m) => {
                let mut doc = serde_json::Map::new();
                if let Some(text) = &m.text {
                    let clauses: Vec<Value> = text
                        .fields
                        .iter()
                        .map(|field| {
                            let pattern =
                                json!({"$regex": escape_regex(&text.text), "$options": "i"});
                            if field.is_array() {
                                json!({ (field.name()): {"$elemMatch": pattern} })
                            } else {
                                json!({ (field.name()): pattern })
                            }
                        })
                        .collect();
                    doc.insert("$or".to_string(), Value::Array(clauses));
                }
                if let Some(status) = m.status {
                    doc.insert("status".to_string(), json!(status.as_str()));
                }
                if let Some(facility_type) = m.facility_type {
                    doc.insert("facility_type".to_string(), json!(facility_type.as_str()));
                }
                json!({ "$match": doc })
            }
            Stage::Project(Projection) => json!({ "$project": {"_id": 0} }),
        }
    }
}

/// Escapes regex metacharacters so the rendered `$regex` is a literal
/// substring match, like the store's escaped `ILIKE`.
fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Ordered stage list produced by [`plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    stages: Vec<Stage>,
}

impl QueryPlan {
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn geo_near(&self) -> Option<&GeoNearStage> {
        self.stages.iter().find_map(|s| match s {
            Stage::GeoNear(g) => Some(g),
            _ => None,
        })
    }

    #[must_use]
    pub fn match_stage(&self) -> Option<&MatchStage> {
        self.stages.iter().find_map(|s| match s {
            Stage::Match(m) => Some(m),
            _ => None,
        })
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_json).collect())
    }
}

/// Builds the aggregation plan for a search.
///
/// Invariant: when present, the geo stage is `stages()[0]`; the projection
/// is always last.
#[must_use]
pub fn plan(filter: &QueryFilter) -> QueryPlan {
    let mut stages = Vec::with_capacity(3);

    if let Some(geo) = filter.geo() {
        stages.push(Stage::GeoNear(GeoNearStage {
            near: geo.point,
            max_distance: geo.radius_meters,
            distance_field: DISTANCE_FIELD,
            spherical: true,
        }));
    }

    let text = filter.search_text().map(|t| TextSearch {
        text: t.to_string(),
        fields: TextField::ALL,
    });
    if text.is_some() || filter.status().is_some() || filter.facility_type().is_some() {
        stages.push(Stage::Match(MatchStage {
            text,
            status: filter.status(),
            facility_type: filter.facility_type(),
        }));
    }

    stages.push(Stage::Project(Projection));

    QueryPlan { stages }
}

/// Direct proximity filter: within `max_distance` meters of `point`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearQuery {
    pub point: GeoPoint,
    pub max_distance: f64,
}

/// Plain (non-aggregating) lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FindFilter {
    All,
    Near(NearQuery),
}

/// "Nearby only" mode: spherical point-radius filter, no annotation.
#[must_use]
pub fn plan_nearby(geo: GeoFilter) -> FindFilter {
    FindFilter::Near(NearQuery {
        point: geo.point,
        max_distance: geo.radius_meters,
    })
}

/// "List all" mode.
#[must_use]
pub fn plan_all() -> FindFilter {
    FindFilter::All
}

/// Food catalog lookup by case-insensitive name substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoodQuery {
    name: Option<String>,
}

impl FoodQuery {
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(lat: f64, lon: f64, radius: f64) -> GeoFilter {
        GeoFilter {
            point: GeoPoint::new(lat, lon).expect("valid point"),
            radius_meters: radius,
        }
    }

    #[test]
    fn text_only_plan_has_three_way_or_and_projection() {
        let filter = QueryFilter::new(Some("taco".to_string()), None, None, None);
        let plan = plan(&filter);

        assert_eq!(plan.stages().len(), 2);
        assert!(plan.geo_near().is_none());
        let m = plan.match_stage().expect("match stage");
        let text = m.text.as_ref().expect("text clause");
        assert_eq!(text.text, "taco");
        assert_eq!(
            text.fields.map(TextField::name),
            ["applicant", "address", "food_items"]
        );
        assert!(matches!(
            plan.stages().last(),
            Some(Stage::Project(Projection))
        ));
    }

    #[test]
    fn geo_only_plan_puts_geo_stage_first() {
        let filter = QueryFilter::new(None, None, None, Some(geo(0.0, 0.0, 50.0)));
        let plan = plan(&filter);

        assert_eq!(plan.stages().len(), 2);
        let Stage::GeoNear(g) = &plan.stages()[0] else {
            panic!("first stage should be geo, got {:?}", plan.stages()[0]);
        };
        assert_eq!(g.near.coordinates(), [0.0, 0.0]);
        assert!((g.max_distance - 50.0).abs() < f64::EPSILON);
        assert!(g.spherical);
        assert_eq!(g.distance_field, "distance");
        assert!(plan.match_stage().is_none());
    }

    #[test]
    fn combined_plan_orders_geo_match_project() {
        let filter = QueryFilter::new(
            Some("coffee".to_string()),
            Some(VendorStatus::Approved),
            Some(FacilityType::Truck),
            Some(geo(37.77, -122.41, 800.0)),
        );
        let plan = plan(&filter);

        assert!(matches!(
            plan.stages(),
            [Stage::GeoNear(_), Stage::Match(_), Stage::Project(_)]
        ));
        let m = plan.match_stage().expect("match");
        assert_eq!(m.status, Some(VendorStatus::Approved));
        assert_eq!(m.facility_type, Some(FacilityType::Truck));
    }

    #[test]
    fn geo_point_is_emitted_longitude_first() {
        let filter = QueryFilter::new(None, None, None, Some(geo(37.77, -122.41, 800.0)));
        let json = plan(&filter).to_json();
        assert_eq!(
            json[0]["$geoNear"]["near"]["coordinates"],
            json!([-122.41, 37.77])
        );
        assert_eq!(json[0]["$geoNear"]["maxDistance"], json!(800.0));
    }

    #[test]
    fn empty_filter_plans_projection_only() {
        let plan = plan(&QueryFilter::default());
        assert_eq!(
            plan.stages(),
            &[Stage::Project(Projection)]
        );
        assert_eq!(plan.to_json(), json!([{"$project": {"_id": 0}}]));
    }

    #[test]
    fn empty_search_text_is_absent() {
        let filter = QueryFilter::new(Some("   ".to_string()), None, None, None);
        assert!(filter.search_text().is_none());
        assert!(plan(&filter).match_stage().is_none());
    }

    #[test]
    fn categorical_filters_without_text_have_no_or_clause() {
        let filter = QueryFilter::new(None, Some(VendorStatus::Expired), None, None);
        let json = plan(&filter).to_json();
        assert_eq!(json[0], json!({"$match": {"status": "EXPIRED"}}));
    }

    #[test]
    fn match_json_uses_elem_match_for_food_items() {
        let filter = QueryFilter::new(Some("taco".to_string()), None, None, None);
        let json = plan(&filter).to_json();
        let or = json[0]["$match"]["$or"].as_array().expect("or clauses");
        assert_eq!(or.len(), 3);
        assert_eq!(
            or[2],
            json!({"food_items": {"$elemMatch": {"$regex": "taco", "$options": "i"}}})
        );
    }

    #[test]
    fn match_json_renders_text_as_literal_regex() {
        let filter = QueryFilter::new(Some("a.b (1+1)$".to_string()), None, None, None);
        let json = plan(&filter).to_json();
        assert_eq!(
            json[0]["$match"]["$or"][0]["applicant"]["$regex"],
            json!("a\\.b \\(1\\+1\\)\\$")
        );
    }

    #[test]
    fn nearby_and_all_modes() {
        assert_eq!(plan_all(), FindFilter::All);
        let FindFilter::Near(near) = plan_nearby(geo(1.0, 2.0, 1000.0)) else {
            panic!("expected near filter");
        };
        assert_eq!(near.point.coordinates(), [2.0, 1.0]);
        assert!((near.max_distance - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn food_query_drops_blank_name() {
        assert_eq!(FoodQuery::new(Some(String::new())).name(), None);
        assert_eq!(FoodQuery::new(Some("Taco".to_string())).name(), Some("Taco"));
    }
}
