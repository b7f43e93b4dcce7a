/// Reference data queries (cities and genders)
use crate::error::Result;
use crate::models::reference::CITY_TYPE_PROVINCE;
use crate::models::{City, Gender};
use sqlx::PgPool;

const CITY_COLUMNS: &str = "id, code, name, type, province_code, parent_code";

pub async fn find_city(pool: &PgPool, id: i32) -> Result<Option<City>> {
    let city = sqlx::query_as::<_, City>(&format!(
        "SELECT {CITY_COLUMNS} FROM cities WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(city)
}

pub async fn find_gender(pool: &PgPool, id: i32) -> Result<Option<Gender>> {
    let gender = sqlx::query_as::<_, Gender>("SELECT id, name FROM genders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(gender)
}

pub async fn list_provinces(pool: &PgPool) -> Result<Vec<City>> {
    let cities = sqlx::query_as::<_, City>(&format!(
        "SELECT {CITY_COLUMNS} FROM cities WHERE type = $1 ORDER BY name"
    ))
    .bind(CITY_TYPE_PROVINCE)
    .fetch_all(pool)
    .await?;

    Ok(cities)
}

pub async fn list_wards(pool: &PgPool, province_code: &str) -> Result<Vec<City>> {
    let cities = sqlx::query_as::<_, City>(&format!(
        "SELECT {CITY_COLUMNS} FROM cities WHERE province_code = $1 AND type <> $2 ORDER BY name"
    ))
    .bind(province_code)
    .bind(CITY_TYPE_PROVINCE)
    .fetch_all(pool)
    .await?;

    Ok(cities)
}
