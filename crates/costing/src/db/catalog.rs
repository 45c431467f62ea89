//! Catalog queries: plants, materials, and the fallback price list.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use concreto_core::{MaterialId, PlantId, is_storable_price};

use super::RepositoryError;
use crate::models::catalog::{
    CreateMaterialInput, CreatePlantInput, CreatePriceInput, Material, Plant,
};

#[derive(Debug, sqlx::FromRow)]
struct PlantRow {
    id: i32,
    code: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<PlantRow> for Plant {
    fn from(row: PlantRow) -> Self {
        Self {
            id: PlantId::new(row.id),
            code: row.code,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MaterialRow {
    id: i32,
    code: String,
    name: String,
    category: String,
    unit_of_measure: String,
    created_at: DateTime<Utc>,
}

impl From<MaterialRow> for Material {
    fn from(row: MaterialRow) -> Self {
        Self {
            id: MaterialId::new(row.id),
            code: row.code,
            name: row.name,
            category: row.category,
            unit_of_measure: row.unit_of_measure,
            created_at: row.created_at,
        }
    }
}

/// Repository for catalog lookups and seeding.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a plant, or return the existing one with the same code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_plant(&self, input: &CreatePlantInput) -> Result<Plant, RepositoryError> {
        let row = sqlx::query_as::<_, PlantRow>(
            r"
            INSERT INTO inventory.plant (code, name)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, code, name, created_at
            ",
        )
        .bind(&input.code)
        .bind(&input.name)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Create a material, or return the existing one with the same code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_material(
        &self,
        input: &CreateMaterialInput,
    ) -> Result<Material, RepositoryError> {
        let row = sqlx::query_as::<_, MaterialRow>(
            r"
            INSERT INTO inventory.material (code, name, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name, category = EXCLUDED.category
            RETURNING id, code, name, category, unit_of_measure, created_at
            ",
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.category)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Look up a plant by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn plant_by_code(&self, code: &str) -> Result<Option<Plant>, RepositoryError> {
        let row = sqlx::query_as::<_, PlantRow>(
            "SELECT id, code, name, created_at FROM inventory.plant WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Look up a material by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn material_by_code(&self, code: &str) -> Result<Option<Material>, RepositoryError> {
        let row = sqlx::query_as::<_, MaterialRow>(
            r"
            SELECT id, code, name, category, unit_of_measure, created_at
            FROM inventory.material
            WHERE code = $1
            ",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Add a price-list row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidInput` if the price has more decimal
    /// places than the schema stores.
    /// Returns `RepositoryError::Conflict` if a check constraint rejects the row.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_price(&self, input: &CreatePriceInput) -> Result<(), RepositoryError> {
        if !is_storable_price(input.price_per_unit) {
            return Err(RepositoryError::InvalidInput(format!(
                "price_per_unit cannot be stored exactly: {}",
                input.price_per_unit
            )));
        }

        sqlx::query(
            r"
            INSERT INTO inventory.material_price
                (material_id, plant_id, price_per_unit, effective_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(input.material_id)
        .bind(input.plant_id)
        .bind(input.price_per_unit)
        .bind(input.effective_date)
        .bind(input.end_date)
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.constraint().is_some() => {
                RepositoryError::Conflict(db_err.message().to_string())
            }
            other => RepositoryError::from(other),
        })?;

        Ok(())
    }

    /// Whether both the material and the plant exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn material_and_plant_exist(
        &self,
        material_id: MaterialId,
        plant_id: PlantId,
    ) -> Result<(bool, bool), RepositoryError> {
        let exists: (bool, bool) = sqlx::query_as(
            r"
            SELECT
                EXISTS (SELECT 1 FROM inventory.material WHERE id = $1),
                EXISTS (SELECT 1 FROM inventory.plant WHERE id = $2)
            ",
        )
        .bind(material_id)
        .bind(plant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

/// Whether a material exists, inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn material_exists(
    conn: &mut PgConnection,
    material_id: MaterialId,
) -> Result<bool, RepositoryError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM inventory.material WHERE id = $1)")
            .bind(material_id)
            .fetch_one(conn)
            .await?;

    Ok(exists)
}

/// Price-list price of a material at a plant in effect on `as_of`.
///
/// Picks the most recent row whose `[effective_date, end_date]` window
/// contains `as_of`; an open `end_date` means still in effect.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn effective_price(
    conn: &mut PgConnection,
    material_id: MaterialId,
    plant_id: PlantId,
    as_of: NaiveDate,
) -> Result<Option<Decimal>, RepositoryError> {
    let price: Option<Decimal> = sqlx::query_scalar(
        r"
        SELECT price_per_unit
        FROM inventory.material_price
        WHERE material_id = $1
          AND plant_id = $2
          AND effective_date <= $3
          AND (end_date IS NULL OR end_date >= $3)
        ORDER BY effective_date DESC, id DESC
        LIMIT 1
        ",
    )
    .bind(material_id)
    .bind(plant_id)
    .bind(as_of)
    .fetch_optional(conn)
    .await?;

    Ok(price)
}
