/// Geographic and demographic reference data
use serde::Serialize;
use sqlx::FromRow;

pub const CITY_TYPE_PROVINCE: &str = "province";

/// A province or ward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i32,
    pub code: String,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub province_code: Option<String>,
    pub parent_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Gender {
    pub id: i32,
    pub name: String,
}
