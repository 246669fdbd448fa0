//! Zone model and repository.
//!
//! Zones are reference data seeded from an embedded CSV on first start.

use std::fmt;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::{Result, StudyOlleError};

/// Default zones as `city,local name,province` lines.
const ZONES_KR: &str = include_str!("zones_kr.csv");

/// A home region an account can pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Zone {
    pub id: i64,
    pub city: String,
    pub local_name_of_city: String,
    pub province: String,
}

impl fmt::Display for Zone {
    /// Renders as `city(localName)/province`, the form used by the settings UI.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})/{}", self.city, self.local_name_of_city, self.province)
    }
}

/// Repository for zones.
pub struct ZoneRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ZoneRepository<'a> {
    /// Create a new ZoneRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a zone.
    pub async fn create(
        &self,
        city: &str,
        local_name_of_city: &str,
        province: &str,
    ) -> Result<Zone> {
        let result =
            sqlx::query("INSERT INTO zones (city, local_name_of_city, province) VALUES (?, ?, ?)")
                .bind(city)
                .bind(local_name_of_city)
                .bind(province)
                .execute(self.pool)
                .await?;

        Ok(Zone {
            id: result.last_insert_rowid(),
            city: city.to_string(),
            local_name_of_city: local_name_of_city.to_string(),
            province: province.to_string(),
        })
    }

    /// Find a zone by city and province.
    pub async fn find_by_city_and_province(
        &self,
        city: &str,
        province: &str,
    ) -> Result<Option<Zone>> {
        let zone = sqlx::query_as::<_, Zone>(
            "SELECT id, city, local_name_of_city, province FROM zones
             WHERE city = ? AND province = ?",
        )
        .bind(city)
        .bind(province)
        .fetch_optional(self.pool)
        .await?;
        Ok(zone)
    }

    /// List all zones ordered by city.
    pub async fn list_all(&self) -> Result<Vec<Zone>> {
        let zones = sqlx::query_as::<_, Zone>(
            "SELECT id, city, local_name_of_city, province FROM zones ORDER BY city",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(zones)
    }

    /// Count zones.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Load the embedded zone list when the table is empty.
    ///
    /// Returns the number of zones inserted.
    pub async fn seed_defaults(&self) -> Result<usize> {
        if self.count().await? > 0 {
            return Ok(0);
        }

        let rows = parse_zone_csv(ZONES_KR)?;
        let mut tx = self.pool.begin().await?;
        for (city, local_name, province) in &rows {
            sqlx::query(
                "INSERT OR IGNORE INTO zones (city, local_name_of_city, province) VALUES (?, ?, ?)",
            )
            .bind(city)
            .bind(local_name)
            .bind(province)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(count = rows.len(), "Seeded default zones");
        Ok(rows.len())
    }
}

fn parse_zone_csv(data: &str) -> Result<Vec<(String, String, String)>> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.split(',').map(str::trim);
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(city), Some(local), Some(province), None) => {
                    Ok((city.to_string(), local.to_string(), province.to_string()))
                }
                _ => Err(StudyOlleError::Validation(format!(
                    "malformed zone line: {line}"
                ))),
            }
        })
        .collect()
}
