//! `WalletService` gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument};

use greenloop_core::rewards;
use greenloop_proto::v1::wallet_service_server::WalletService;
use greenloop_proto::v1::{
    BuyerStats, ExchangeRequest, ExchangeResponse, GetBuyerStatsRequest, GetSellerStatsRequest,
    GetWalletRequest, ListPurchasedVouchersRequest, ListPurchasedVouchersResponse,
    ListTransactionsRequest, ListTransactionsResponse, ListVoucherCatalogRequest,
    ListVoucherCatalogResponse, PurchaseVoucherRequest, PurchaseVoucherResponse, SellerStats,
    Wallet, WatchWalletRequest,
};

use super::grpc_util::{
    FeedStream, feed_stream, purchased_to_proto, status_counts_to_proto, transaction_to_proto,
    voucher_to_proto, wallet_to_proto, waste_totals_to_proto,
};
use super::interceptor::caller_id;
use crate::market::Market;

pub struct WalletServiceImpl {
    market: Arc<Market>,
}

impl WalletServiceImpl {
    pub const fn new(market: Arc<Market>) -> Self {
        Self { market }
    }
}

#[tonic::async_trait]
impl WalletService for WalletServiceImpl {
    type WatchWalletStream = FeedStream<Wallet>;

    #[instrument(skip(self, request), fields(rpc = "GetWallet"))]
    async fn get_wallet(
        &self,
        request: Request<GetWalletRequest>,
    ) -> Result<Response<Wallet>, Status> {
        let user_id = caller_id(&request)?;
        let wallet = self.market.wallet(&user_id).await?;
        Ok(Response::new(wallet_to_proto(wallet)))
    }

    #[instrument(skip(self, request), fields(rpc = "ListTransactions"))]
    async fn list_transactions(
        &self,
        request: Request<ListTransactionsRequest>,
    ) -> Result<Response<ListTransactionsResponse>, Status> {
        let user_id = caller_id(&request)?;
        let entries = self.market.transactions(&user_id).await?;
        Ok(Response::new(ListTransactionsResponse {
            transactions: entries.into_iter().map(transaction_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, _request), fields(rpc = "ListVoucherCatalog"))]
    async fn list_voucher_catalog(
        &self,
        _request: Request<ListVoucherCatalogRequest>,
    ) -> Result<Response<ListVoucherCatalogResponse>, Status> {
        Ok(Response::new(ListVoucherCatalogResponse {
            vouchers: rewards::catalog().iter().map(voucher_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "PurchaseVoucher"))]
    async fn purchase_voucher(
        &self,
        request: Request<PurchaseVoucherRequest>,
    ) -> Result<Response<PurchaseVoucherResponse>, Status> {
        let user_id = caller_id(&request)?;
        let req = request.into_inner();
        let (wallet, purchased) = self.market.purchase_voucher(&user_id, &req.title).await?;
        Ok(Response::new(PurchaseVoucherResponse {
            wallet: Some(wallet_to_proto(wallet)),
            voucher: Some(purchased_to_proto(purchased)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "ListPurchasedVouchers"))]
    async fn list_purchased_vouchers(
        &self,
        request: Request<ListPurchasedVouchersRequest>,
    ) -> Result<Response<ListPurchasedVouchersResponse>, Status> {
        let user_id = caller_id(&request)?;
        let vouchers = self.market.purchased_vouchers(&user_id).await?;
        Ok(Response::new(ListPurchasedVouchersResponse {
            vouchers: vouchers.into_iter().map(purchased_to_proto).collect(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "Exchange"))]
    async fn exchange(
        &self,
        request: Request<ExchangeRequest>,
    ) -> Result<Response<ExchangeResponse>, Status> {
        let user_id = caller_id(&request)?;
        let coins = request.into_inner().coins;
        let (wallet, cash_credited) = self.market.exchange(&user_id, coins).await?;
        Ok(Response::new(ExchangeResponse {
            wallet: Some(wallet_to_proto(wallet)),
            cash_credited,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "WatchWallet"))]
    async fn watch_wallet(
        &self,
        request: Request<WatchWalletRequest>,
    ) -> Result<Response<Self::WatchWalletStream>, Status> {
        let user_id = caller_id(&request)?;
        let sub = self.market.watch_wallet(&user_id).await?;
        info!(user_id = %user_id, "Wallet feed opened");
        Ok(Response::new(feed_stream(sub, wallet_to_proto)))
    }

    #[instrument(skip(self, request), fields(rpc = "GetSellerStats"))]
    async fn get_seller_stats(
        &self,
        request: Request<GetSellerStatsRequest>,
    ) -> Result<Response<SellerStats>, Status> {
        let user_id = caller_id(&request)?;
        let stats = self.market.seller_stats(&user_id).await?;
        Ok(Response::new(SellerStats {
            by_status: status_counts_to_proto(stats.by_status),
            completed_by_waste_type: waste_totals_to_proto(stats.completed_by_waste_type),
            coins_earned: stats.coins_earned,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetBuyerStats"))]
    async fn get_buyer_stats(
        &self,
        request: Request<GetBuyerStatsRequest>,
    ) -> Result<Response<BuyerStats>, Status> {
        let user_id = caller_id(&request)?;
        let stats = self.market.buyer_stats(&user_id).await?;
        Ok(Response::new(BuyerStats {
            by_status: status_counts_to_proto(stats.by_status),
            completed_by_waste_type: waste_totals_to_proto(stats.completed_by_waste_type),
        }))
    }
}
