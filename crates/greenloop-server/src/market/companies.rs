//! Buyer company listings.

use tracing::{info, instrument};

use super::{Market, MarketError, Result};
use crate::storage::{Company, CompanyParams, Role};

/// Company fields as submitted by a buyer.
#[derive(Debug, Clone, Default)]
pub struct CompanyForm {
    pub company_name: String,
    pub location: String,
    pub contact_number: String,
    pub waste_types_accepted: Vec<String>,
    pub price_per_kg: f64,
    pub description: String,
}

impl CompanyForm {
    /// Trim text fields and lowercase, trim and deduplicate waste types,
    /// keeping their first-seen order.
    fn normalized(&self) -> Result<Self> {
        let company_name = self.company_name.trim().to_string();
        let location = self.location.trim().to_string();
        if company_name.is_empty() {
            return Err(MarketError::InvalidArgument("Company name is required".into()));
        }
        if location.is_empty() {
            return Err(MarketError::InvalidArgument("Location is required".into()));
        }
        if !self.price_per_kg.is_finite() || self.price_per_kg < 0.0 {
            return Err(MarketError::InvalidArgument(
                "Price per kg must be zero or more".into(),
            ));
        }

        let mut waste_types: Vec<String> = Vec::new();
        for raw in &self.waste_types_accepted {
            let t = raw.trim().to_lowercase();
            if !t.is_empty() && !waste_types.contains(&t) {
                waste_types.push(t);
            }
        }

        Ok(Self {
            company_name,
            location,
            contact_number: self.contact_number.trim().to_string(),
            waste_types_accepted: waste_types,
            price_per_kg: self.price_per_kg,
            description: self.description.trim().to_string(),
        })
    }

    fn params(&self) -> CompanyParams<'_> {
        CompanyParams {
            company_name: &self.company_name,
            location: &self.location,
            contact_number: &self.contact_number,
            waste_types: &self.waste_types_accepted,
            price_per_kg: self.price_per_kg,
            description: &self.description,
        }
    }
}

impl Market {
    #[instrument(skip(self, form))]
    pub async fn create_company(&self, buyer_id: &str, form: &CompanyForm) -> Result<Company> {
        self.require_role(buyer_id, Role::Buyer).await?;
        let form = form.normalized()?;

        let id = uuid::Uuid::new_v4().to_string();
        let company = self.db.create_company(&id, buyer_id, &form.params()).await?;
        info!(company_id = %company.id, name = %company.company_name, "Company created");

        self.refresh_pickup_feed(buyer_id).await;
        Ok(company)
    }

    #[instrument(skip(self, form))]
    pub async fn update_company(
        &self,
        buyer_id: &str,
        company_id: &str,
        form: &CompanyForm,
    ) -> Result<Company> {
        self.owned_company(buyer_id, company_id).await?;
        let form = form.normalized()?;

        let company = self.db.update_company(company_id, &form.params()).await?;
        info!(company_id, name = %company.company_name, "Company updated");

        // A rename changes which requests the owner sees.
        self.refresh_pickup_feed(buyer_id).await;
        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn set_company_active(
        &self,
        buyer_id: &str,
        company_id: &str,
        active: bool,
    ) -> Result<Company> {
        self.owned_company(buyer_id, company_id).await?;
        let company = self.db.set_company_active(company_id, active).await?;
        info!(company_id, active, "Company visibility changed");
        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn delete_company(&self, buyer_id: &str, company_id: &str) -> Result<bool> {
        self.owned_company(buyer_id, company_id).await?;
        let deleted = self.db.delete_company(company_id).await?;
        info!(company_id, deleted, "Company deleted");

        self.refresh_pickup_feed(buyer_id).await;
        Ok(deleted)
    }

    pub async fn get_company(&self, company_id: &str) -> Result<Company> {
        Ok(self.db.get_company(company_id).await?)
    }

    pub async fn list_companies_for_buyer(&self, buyer_id: &str) -> Result<Vec<Company>> {
        Ok(self.db.list_companies_for_buyer(buyer_id).await?)
    }

    /// Active companies, optionally filtered by an accepted waste type.
    pub async fn list_active_companies(&self, waste_type: Option<&str>) -> Result<Vec<Company>> {
        let waste_type = waste_type
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        Ok(self.db.list_active_companies(waste_type.as_deref()).await?)
    }

    async fn owned_company(&self, buyer_id: &str, company_id: &str) -> Result<Company> {
        self.require_user(buyer_id).await?;
        let company = self.db.get_company(company_id).await?;
        if company.buyer_id != buyer_id {
            return Err(MarketError::Forbidden(format!(
                "Company {company_id} belongs to another buyer"
            )));
        }
        Ok(company)
    }
}
