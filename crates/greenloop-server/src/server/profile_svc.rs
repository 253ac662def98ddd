//! `ProfileService` gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::instrument;

use greenloop_proto::v1::profile_service_server::ProfileService;
use greenloop_proto::v1::{GetProfileRequest, Profile, SetProfileImageRequest};

use super::grpc_util::user_to_profile;
use super::interceptor::caller_id;
use crate::market::Market;

pub struct ProfileServiceImpl {
    market: Arc<Market>,
}

impl ProfileServiceImpl {
    pub const fn new(market: Arc<Market>) -> Self {
        Self { market }
    }
}

#[tonic::async_trait]
impl ProfileService for ProfileServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "GetProfile"))]
    async fn get_profile(
        &self,
        request: Request<GetProfileRequest>,
    ) -> Result<Response<Profile>, Status> {
        let user_id = caller_id(&request)?;
        let user = self.market.require_user(&user_id).await?;
        Ok(Response::new(user_to_profile(user)))
    }

    #[instrument(skip(self, request), fields(rpc = "SetProfileImage"))]
    async fn set_profile_image(
        &self,
        request: Request<SetProfileImageRequest>,
    ) -> Result<Response<Profile>, Status> {
        let user_id = caller_id(&request)?;
        let req = request.into_inner();
        let user = self
            .market
            .set_profile_image(&user_id, &req.image_url)
            .await?;
        Ok(Response::new(user_to_profile(user)))
    }
}
