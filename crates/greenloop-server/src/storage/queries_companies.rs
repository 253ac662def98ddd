//! Company registry queries.

use greenloop_core::db::{DatabaseError, unix_timestamp};

use super::db::MarketDatabase;
use super::models::Company;

/// Editable fields of a company row.
pub struct CompanyParams<'a> {
    pub company_name: &'a str,
    pub location: &'a str,
    pub contact_number: &'a str,
    /// Already normalized: lowercase, trimmed, deduplicated.
    pub waste_types: &'a [String],
    pub price_per_kg: f64,
    pub description: &'a str,
}

impl CompanyParams<'_> {
    fn waste_types_json(&self) -> Result<String, DatabaseError> {
        serde_json::to_string(self.waste_types).map_err(|e| DatabaseError::Query(e.to_string()))
    }
}

impl MarketDatabase {
    /// Insert a company owned by `buyer_id`. New companies are active.
    pub async fn create_company(
        &self,
        id: &str,
        buyer_id: &str,
        params: &CompanyParams<'_>,
    ) -> Result<Company, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO companies (id, company_name, location, contact_number, waste_types_accepted, price_per_kg, description, buyer_id, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id)
        .bind(params.company_name)
        .bind(params.location)
        .bind(params.contact_number)
        .bind(params.waste_types_json()?)
        .bind(params.price_per_kg)
        .bind(params.description)
        .bind(buyer_id)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_company(id).await
    }

    /// Get a company by ID.
    pub async fn get_company(&self, id: &str) -> Result<Company, DatabaseError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Company {id}")))
    }

    /// Replace the editable fields of a company.
    pub async fn update_company(
        &self,
        id: &str,
        params: &CompanyParams<'_>,
    ) -> Result<Company, DatabaseError> {
        let result = sqlx::query(
            "UPDATE companies SET company_name = ?, location = ?, contact_number = ?, waste_types_accepted = ?, price_per_kg = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(params.company_name)
        .bind(params.location)
        .bind(params.contact_number)
        .bind(params.waste_types_json()?)
        .bind(params.price_per_kg)
        .bind(params.description)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Company {id}")));
        }
        self.get_company(id).await
    }

    /// Toggle the soft-delete flag.
    pub async fn set_company_active(&self, id: &str, active: bool) -> Result<Company, DatabaseError> {
        let result = sqlx::query("UPDATE companies SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Company {id}")));
        }
        self.get_company(id).await
    }

    /// Hard-delete a company. Bookings naming it are kept.
    pub async fn delete_company(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Companies owned by a buyer, newest first.
    pub async fn list_companies_for_buyer(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<Company>, DatabaseError> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE buyer_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(buyer_id)
        .fetch_all(self.pool())
        .await?;

        Ok(companies)
    }

    /// Active companies, newest first, optionally only those accepting
    /// `waste_type` (matched against the lowercase stored names).
    pub async fn list_active_companies(
        &self,
        waste_type: Option<&str>,
    ) -> Result<Vec<Company>, DatabaseError> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE is_active = 1 AND (?1 IS NULL OR EXISTS (SELECT 1 FROM json_each(companies.waste_types_accepted) WHERE json_each.value = ?1)) ORDER BY created_at DESC, rowid DESC",
        )
        .bind(waste_type)
        .fetch_all(self.pool())
        .await?;

        Ok(companies)
    }

    /// Active companies listed under `company_name`.
    pub async fn active_companies_named(
        &self,
        company_name: &str,
    ) -> Result<Vec<Company>, DatabaseError> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE company_name = ? AND is_active = 1",
        )
        .bind(company_name)
        .fetch_all(self.pool())
        .await?;

        Ok(companies)
    }

    /// Whether `buyer_id` owns a company called `company_name`.
    pub async fn owns_company_named(
        &self,
        buyer_id: &str,
        company_name: &str,
    ) -> Result<bool, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM companies WHERE buyer_id = ? AND company_name = ?",
        )
        .bind(buyer_id)
        .bind(company_name)
        .fetch_one(self.pool())
        .await?;

        Ok(count > 0)
    }

    /// Owners of every company called `company_name`.
    pub async fn buyer_ids_for_company_name(
        &self,
        company_name: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT buyer_id FROM companies WHERE company_name = ?")
                .bind(company_name)
                .fetch_all(self.pool())
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
