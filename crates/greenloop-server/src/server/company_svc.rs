//! `CompanyService` gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::instrument;

use greenloop_proto::v1 as pb;
use greenloop_proto::v1::company_service_server::CompanyService;
use greenloop_proto::v1::{
    CompanyResponse, CreateCompanyRequest, DeleteCompanyRequest, DeleteCompanyResponse,
    GetCompanyRequest, ListActiveCompaniesRequest, ListCompaniesResponse, ListMyCompaniesRequest,
    SetCompanyActiveRequest, UpdateCompanyRequest,
};

use super::grpc_util::company_to_proto;
use super::interceptor::caller_id;
use crate::market::{CompanyForm, Market};
use crate::storage::Company;

pub struct CompanyServiceImpl {
    market: Arc<Market>,
}

impl CompanyServiceImpl {
    pub const fn new(market: Arc<Market>) -> Self {
        Self { market }
    }
}

#[allow(clippy::result_large_err)]
fn form_from_proto(form: Option<pb::CompanyForm>) -> Result<CompanyForm, Status> {
    let form = form.ok_or_else(|| Status::invalid_argument("Company form is required"))?;
    Ok(CompanyForm {
        company_name: form.company_name,
        location: form.location,
        contact_number: form.contact_number,
        waste_types_accepted: form.waste_types_accepted,
        price_per_kg: form.price_per_kg,
        description: form.description,
    })
}

fn company_response(company: Company) -> Response<CompanyResponse> {
    Response::new(CompanyResponse {
        company: Some(company_to_proto(company)),
    })
}

fn list_response(companies: Vec<Company>) -> Response<ListCompaniesResponse> {
    Response::new(ListCompaniesResponse {
        companies: companies.into_iter().map(company_to_proto).collect(),
    })
}

#[tonic::async_trait]
impl CompanyService for CompanyServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "CreateCompany"))]
    async fn create_company(
        &self,
        request: Request<CreateCompanyRequest>,
    ) -> Result<Response<CompanyResponse>, Status> {
        let user_id = caller_id(&request)?;
        let form = form_from_proto(request.into_inner().form)?;
        let company = self.market.create_company(&user_id, &form).await?;
        Ok(company_response(company))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateCompany"))]
    async fn update_company(
        &self,
        request: Request<UpdateCompanyRequest>,
    ) -> Result<Response<CompanyResponse>, Status> {
        let user_id = caller_id(&request)?;
        let req = request.into_inner();
        let form = form_from_proto(req.form)?;
        let company = self
            .market
            .update_company(&user_id, &req.company_id, &form)
            .await?;
        Ok(company_response(company))
    }

    #[instrument(skip(self, request), fields(rpc = "SetCompanyActive"))]
    async fn set_company_active(
        &self,
        request: Request<SetCompanyActiveRequest>,
    ) -> Result<Response<CompanyResponse>, Status> {
        let user_id = caller_id(&request)?;
        let req = request.into_inner();
        let company = self
            .market
            .set_company_active(&user_id, &req.company_id, req.active)
            .await?;
        Ok(company_response(company))
    }

    #[instrument(skip(self, request), fields(rpc = "DeleteCompany"))]
    async fn delete_company(
        &self,
        request: Request<DeleteCompanyRequest>,
    ) -> Result<Response<DeleteCompanyResponse>, Status> {
        let user_id = caller_id(&request)?;
        let req = request.into_inner();
        let deleted = self.market.delete_company(&user_id, &req.company_id).await?;
        Ok(Response::new(DeleteCompanyResponse { deleted }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetCompany"))]
    async fn get_company(
        &self,
        request: Request<GetCompanyRequest>,
    ) -> Result<Response<CompanyResponse>, Status> {
        let company = self
            .market
            .get_company(&request.into_inner().company_id)
            .await?;
        Ok(company_response(company))
    }

    #[instrument(skip(self, request), fields(rpc = "ListMyCompanies"))]
    async fn list_my_companies(
        &self,
        request: Request<ListMyCompaniesRequest>,
    ) -> Result<Response<ListCompaniesResponse>, Status> {
        let user_id = caller_id(&request)?;
        let companies = self.market.list_companies_for_buyer(&user_id).await?;
        Ok(list_response(companies))
    }

    #[instrument(skip(self, request), fields(rpc = "ListActiveCompanies"))]
    async fn list_active_companies(
        &self,
        request: Request<ListActiveCompaniesRequest>,
    ) -> Result<Response<ListCompaniesResponse>, Status> {
        let req = request.into_inner();
        let companies = self
            .market
            .list_active_companies(req.waste_type.as_deref())
            .await?;
        Ok(list_response(companies))
    }
}
