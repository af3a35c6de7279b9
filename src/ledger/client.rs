use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use super::checkout::OrderReceipt;
use super::messages::{LedgerRequest, ServiceResponse};
use super::settings::PlatformStats;
use crate::catalog::DynProductCatalog;
use crate::domain::{
    Adjustment, Cart, CartLine, CommissionLog, Decision, EPin, LedgerSettings, Order, OrderItem, OrderStatus,
    ReferralLevel, Registration, TopUpRequest, User, WalletTransaction,
};
use crate::error::{LedgerError, LedgerResult};

macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                debug!("Sending request");
                self.request(|respond_to| $request::$variant {
                    $($param,)*
                    respond_to,
                })
                .await
            }
        }
    };
}

/// Handle to the ledger actor.
///
/// Product prices are looked up here, before the request reaches the actor.
#[derive(Clone)]
pub struct LedgerClient {
    sender: mpsc::Sender<LedgerRequest>,
    catalog: DynProductCatalog,
}

impl LedgerClient {
    pub fn new(sender: mpsc::Sender<LedgerRequest>, catalog: DynProductCatalog) -> Self {
        Self { sender, catalog }
    }

    async fn request<T>(&self, build: impl FnOnce(ServiceResponse<T>) -> LedgerRequest) -> LedgerResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| LedgerError::ActorCommunicationError("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| LedgerError::ActorCommunicationError("Actor dropped".to_string()))?
    }

    async fn snapshot_line(&self, line: &CartLine) -> LedgerResult<OrderItem> {
        let snapshot = self
            .catalog
            .lookup_product(&line.product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("product", line.product_id.as_str()))?;
        Ok(OrderItem::from_snapshot(snapshot, line.quantity))
    }

    /// Prices every line at the catalog's current price, then places the order.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn place_order(&self, actor_id: String, lines: Vec<CartLine>) -> LedgerResult<OrderReceipt> {
        debug!("Sending request");
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.snapshot_line(line).await?);
        }
        self.request(|respond_to| LedgerRequest::PlaceOrder {
            actor_id,
            items,
            respond_to,
        })
        .await
    }

    /// Places an order for everything in the caller's stored cart.
    #[instrument(skip(self))]
    pub async fn checkout_cart(&self, actor_id: String) -> LedgerResult<OrderReceipt> {
        let cart = self.cart(actor_id.clone()).await?;
        if cart.is_empty() {
            return Err(LedgerError::Validation("cart is empty".to_string()));
        }
        self.place_order(actor_id, cart.lines).await
    }

    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, actor_id: String, product_id: String, quantity: u32) -> LedgerResult<Cart> {
        debug!("Sending request");
        if self.catalog.lookup_product(&product_id).await?.is_none() {
            return Err(LedgerError::not_found("product", product_id));
        }
        self.request(|respond_to| LedgerRequest::AddToCart {
            actor_id,
            product_id,
            quantity,
            respond_to,
        })
        .await
    }

    pub async fn shutdown(&self) -> LedgerResult<()> {
        info!("Sending shutdown");
        self.sender
            .send(LedgerRequest::Shutdown)
            .await
            .map_err(|_| LedgerError::ActorCommunicationError("Actor closed".to_string()))
    }
}

client_method!(LedgerClient => fn register_user(registration: Registration) -> User as LedgerRequest::RegisterUser, Error = LedgerError);
client_method!(LedgerClient => fn ensure_admin(name: String, email: String) -> User as LedgerRequest::EnsureAdmin, Error = LedgerError);
client_method!(LedgerClient => fn get_user(user_id: String) -> User as LedgerRequest::GetUser, Error = LedgerError);
client_method!(LedgerClient => fn direct_referrals(user_id: String) -> Vec<User> as LedgerRequest::DirectReferrals, Error = LedgerError);
client_method!(LedgerClient => fn network_size(user_id: String) -> usize as LedgerRequest::NetworkSize, Error = LedgerError);
client_method!(LedgerClient => fn reassign_referrer(actor_id: String, user_id: String, referrer_id: Option<String>) -> User as LedgerRequest::ReassignReferrer, Error = LedgerError);
client_method!(LedgerClient => fn delete_user(actor_id: String, user_id: String) -> () as LedgerRequest::DeleteUser, Error = LedgerError);

client_method!(LedgerClient => fn balance(user_id: String) -> Decimal as LedgerRequest::Balance, Error = LedgerError);
client_method!(LedgerClient => fn history(user_id: String) -> Vec<WalletTransaction> as LedgerRequest::History, Error = LedgerError);
client_method!(LedgerClient => fn reconcile(user_id: String) -> Decimal as LedgerRequest::Reconcile, Error = LedgerError);
client_method!(LedgerClient => fn reconcile_all() -> usize as LedgerRequest::ReconcileAll, Error = LedgerError);
client_method!(LedgerClient => fn admin_adjust_wallet(actor_id: String, user_id: String, direction: Adjustment, amount: Decimal, description: String) -> WalletTransaction as LedgerRequest::AdminAdjustWallet, Error = LedgerError);

client_method!(LedgerClient => fn generate_epins(actor_id: String, amount: Decimal, count: u32, validity_days: Option<u32>) -> Vec<EPin> as LedgerRequest::GenerateEPins, Error = LedgerError);
client_method!(LedgerClient => fn redeem_epin(actor_id: String, code: String) -> WalletTransaction as LedgerRequest::RedeemEPin, Error = LedgerError);
client_method!(LedgerClient => fn list_epins(actor_id: String) -> Vec<EPin> as LedgerRequest::ListEPins, Error = LedgerError);

client_method!(LedgerClient => fn submit_top_up(actor_id: String, amount: Decimal, external_reference: String) -> TopUpRequest as LedgerRequest::SubmitTopUp, Error = LedgerError);
client_method!(LedgerClient => fn adjudicate_top_up(actor_id: String, request_id: String, decision: Decision) -> TopUpRequest as LedgerRequest::AdjudicateTopUp, Error = LedgerError);
client_method!(LedgerClient => fn pending_top_ups(actor_id: String) -> Vec<TopUpRequest> as LedgerRequest::PendingTopUps, Error = LedgerError);
client_method!(LedgerClient => fn my_top_ups(actor_id: String) -> Vec<TopUpRequest> as LedgerRequest::MyTopUps, Error = LedgerError);

client_method!(LedgerClient => fn remove_from_cart(actor_id: String, product_id: String) -> Cart as LedgerRequest::RemoveFromCart, Error = LedgerError);
client_method!(LedgerClient => fn clear_cart(actor_id: String) -> () as LedgerRequest::ClearCart, Error = LedgerError);
client_method!(LedgerClient => fn cart(actor_id: String) -> Cart as LedgerRequest::GetCart, Error = LedgerError);
client_method!(LedgerClient => fn get_order(order_id: String) -> Order as LedgerRequest::GetOrder, Error = LedgerError);
client_method!(LedgerClient => fn orders_for_user(user_id: String) -> Vec<Order> as LedgerRequest::OrdersForUser, Error = LedgerError);
client_method!(LedgerClient => fn update_order_status(actor_id: String, order_id: String, status: OrderStatus) -> Order as LedgerRequest::UpdateOrderStatus, Error = LedgerError);

client_method!(LedgerClient => fn commission_logs(user_id: String) -> Vec<CommissionLog> as LedgerRequest::CommissionLogs, Error = LedgerError);
client_method!(LedgerClient => fn order_commissions(order_id: String) -> Vec<CommissionLog> as LedgerRequest::OrderCommissions, Error = LedgerError);
client_method!(LedgerClient => fn total_earnings(user_id: String) -> Decimal as LedgerRequest::TotalEarnings, Error = LedgerError);

client_method!(LedgerClient => fn settings() -> LedgerSettings as LedgerRequest::GetSettings, Error = LedgerError);
client_method!(LedgerClient => fn update_referral_levels(actor_id: String, levels: Vec<ReferralLevel>) -> LedgerSettings as LedgerRequest::UpdateReferralLevels, Error = LedgerError);
client_method!(LedgerClient => fn set_registration_open(actor_id: String, open: bool) -> LedgerSettings as LedgerRequest::SetRegistrationOpen, Error = LedgerError);
client_method!(LedgerClient => fn stats(actor_id: String) -> PlatformStats as LedgerRequest::Stats, Error = LedgerError);
