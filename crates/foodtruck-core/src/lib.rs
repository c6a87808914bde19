pub mod app_config;
pub mod config;
pub mod geo;
pub mod open_hours;
pub mod planner;
pub mod validator;
pub mod vendor;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{GeoFilter, GeoPoint, InvalidLocation, EARTH_RADIUS_M};
pub use open_hours::{parse_open_hours, OpenHours, OpenHoursError, TimeSlot};
pub use planner::{
    plan, plan_all, plan_nearby, FindFilter, FoodQuery, GeoNearStage, MatchStage, NearQuery,
    Projection, QueryFilter, QueryPlan, Stage, TextField, TextSearch,
};
pub use validator::{split_location_pair, validate, RawParam};
pub use vendor::{FacilityType, FoodRecord, UnknownVariant, VendorMatch, VendorRecord, VendorStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
