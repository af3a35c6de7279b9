use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use super::client::LedgerClient;
use super::messages::{LedgerRequest, ServiceResponse};
use super::{checkout, commission, epin, settings, top_up, users, wallet, OrderReceipt, PlatformStats};
use crate::catalog::DynProductCatalog;
use crate::domain::{
    Adjustment, Cart, Decision, EPin, LedgerSettings, Order, OrderItem, OrderStatus, ReferralLevel,
    Registration, TopUpRequest, User, WalletTransaction,
};
use crate::error::LedgerResult;
use crate::store::{DynKeyValueStore, UnitOfWork};

/// The ledger actor.
///
/// Requests are handled strictly one after another. Each mutating request stages
/// its writes in a fresh [`UnitOfWork`] and commits once at the end, so a
/// rejected request leaves the store exactly as it found it.
pub struct LedgerService {
    receiver: mpsc::Receiver<LedgerRequest>,
    store: DynKeyValueStore,
    defaults: LedgerSettings,
}

fn reply<T>(respond_to: ServiceResponse<T>, result: LedgerResult<T>) {
    if let Err(e) = &result {
        if e.is_internal() {
            error!(error = %e, "Request failed");
        } else {
            debug!(error = %e, "Request rejected");
        }
    }
    let _ = respond_to.send(result);
}

impl LedgerService {
    pub fn new(
        buffer_size: usize,
        store: DynKeyValueStore,
        defaults: LedgerSettings,
        catalog: DynProductCatalog,
    ) -> (Self, LedgerClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            store,
            defaults,
        };
        (service, LedgerClient::new(sender, catalog))
    }

    #[instrument(name = "ledger_service", skip(self))]
    pub async fn run(mut self) {
        info!("LedgerService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                LedgerRequest::RegisterUser { registration, respond_to } => {
                    reply(respond_to, self.register_user(registration).await)
                }
                LedgerRequest::EnsureAdmin { name, email, respond_to } => {
                    reply(respond_to, self.ensure_admin(name, email).await)
                }
                LedgerRequest::GetUser { user_id, respond_to } => {
                    reply(respond_to, users::load_user(&self.unit(), &user_id).await)
                }
                LedgerRequest::DirectReferrals { user_id, respond_to } => {
                    reply(respond_to, users::direct_referrals(&self.unit(), &user_id).await)
                }
                LedgerRequest::NetworkSize { user_id, respond_to } => {
                    reply(respond_to, users::network_size(&self.unit(), &user_id).await)
                }
                LedgerRequest::ReassignReferrer {
                    actor_id,
                    user_id,
                    referrer_id,
                    respond_to,
                } => reply(respond_to, self.reassign_referrer(actor_id, user_id, referrer_id).await),
                LedgerRequest::DeleteUser {
                    actor_id,
                    user_id,
                    respond_to,
                } => reply(respond_to, self.delete_user(actor_id, user_id).await),

                LedgerRequest::Balance { user_id, respond_to } => {
                    reply(respond_to, wallet::balance(&self.unit(), &user_id).await)
                }
                LedgerRequest::History { user_id, respond_to } => {
                    reply(respond_to, wallet::history(&self.unit(), &user_id).await)
                }
                LedgerRequest::Reconcile { user_id, respond_to } => {
                    reply(respond_to, wallet::reconcile(&self.unit(), &user_id).await)
                }
                LedgerRequest::ReconcileAll { respond_to } => {
                    reply(respond_to, wallet::reconcile_all(&self.unit()).await)
                }
                LedgerRequest::AdminAdjustWallet {
                    actor_id,
                    user_id,
                    direction,
                    amount,
                    description,
                    respond_to,
                } => reply(
                    respond_to,
                    self.admin_adjust_wallet(actor_id, user_id, direction, amount, description)
                        .await,
                ),

                LedgerRequest::GenerateEPins {
                    actor_id,
                    amount,
                    count,
                    validity_days,
                    respond_to,
                } => reply(respond_to, self.generate_epins(actor_id, amount, count, validity_days).await),
                LedgerRequest::RedeemEPin {
                    actor_id,
                    code,
                    respond_to,
                } => reply(respond_to, self.redeem_epin(actor_id, code).await),
                LedgerRequest::ListEPins { actor_id, respond_to } => {
                    reply(respond_to, self.list_epins(actor_id).await)
                }

                LedgerRequest::SubmitTopUp {
                    actor_id,
                    amount,
                    external_reference,
                    respond_to,
                } => reply(respond_to, self.submit_top_up(actor_id, amount, external_reference).await),
                LedgerRequest::AdjudicateTopUp {
                    actor_id,
                    request_id,
                    decision,
                    respond_to,
                } => reply(respond_to, self.adjudicate_top_up(actor_id, request_id, decision).await),
                LedgerRequest::PendingTopUps { actor_id, respond_to } => {
                    reply(respond_to, self.pending_top_ups(actor_id).await)
                }
                LedgerRequest::MyTopUps { actor_id, respond_to } => {
                    reply(respond_to, top_up::for_user(&self.unit(), &actor_id).await)
                }

                LedgerRequest::AddToCart {
                    actor_id,
                    product_id,
                    quantity,
                    respond_to,
                } => reply(respond_to, self.add_to_cart(actor_id, product_id, quantity).await),
                LedgerRequest::RemoveFromCart {
                    actor_id,
                    product_id,
                    respond_to,
                } => reply(respond_to, self.remove_from_cart(actor_id, product_id).await),
                LedgerRequest::ClearCart { actor_id, respond_to } => {
                    reply(respond_to, self.clear_cart(actor_id).await)
                }
                LedgerRequest::GetCart { actor_id, respond_to } => {
                    reply(respond_to, checkout::cart(&self.unit(), &actor_id).await)
                }
                LedgerRequest::PlaceOrder {
                    actor_id,
                    items,
                    respond_to,
                } => reply(respond_to, self.place_order(actor_id, items).await),
                LedgerRequest::GetOrder { order_id, respond_to } => {
                    reply(respond_to, checkout::order(&self.unit(), &order_id).await)
                }
                LedgerRequest::OrdersForUser { user_id, respond_to } => {
                    reply(respond_to, checkout::orders_for_user(&self.unit(), &user_id).await)
                }
                LedgerRequest::UpdateOrderStatus {
                    actor_id,
                    order_id,
                    status,
                    respond_to,
                } => reply(respond_to, self.update_order_status(actor_id, order_id, status).await),

                LedgerRequest::CommissionLogs { user_id, respond_to } => {
                    reply(respond_to, commission::logs_for_beneficiary(&self.unit(), &user_id).await)
                }
                LedgerRequest::OrderCommissions { order_id, respond_to } => {
                    reply(respond_to, commission::logs_for_order(&self.unit(), &order_id).await)
                }
                LedgerRequest::TotalEarnings { user_id, respond_to } => {
                    reply(respond_to, commission::total_earnings(&self.unit(), &user_id).await)
                }

                LedgerRequest::GetSettings { respond_to } => {
                    reply(respond_to, settings::load(&self.unit(), &self.defaults).await)
                }
                LedgerRequest::UpdateReferralLevels {
                    actor_id,
                    levels,
                    respond_to,
                } => reply(respond_to, self.update_referral_levels(actor_id, levels).await),
                LedgerRequest::SetRegistrationOpen {
                    actor_id,
                    open,
                    respond_to,
                } => reply(respond_to, self.set_registration_open(actor_id, open).await),
                LedgerRequest::Stats { actor_id, respond_to } => reply(respond_to, self.stats(actor_id).await),

                LedgerRequest::Shutdown => {
                    info!("LedgerService shutting down");
                    break;
                }
            }
        }
        info!("LedgerService stopped");
    }

    fn unit(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self.store.as_ref())
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register_user(&self, registration: Registration) -> LedgerResult<User> {
        let mut uow = self.unit();
        let settings = settings::load(&uow, &self.defaults).await?;
        let user = users::register(&mut uow, registration, &settings).await?;
        uow.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn ensure_admin(&self, name: String, email: String) -> LedgerResult<User> {
        let mut uow = self.unit();
        let admin = users::ensure_admin(&mut uow, &name, &email).await?;
        uow.commit().await?;
        Ok(admin)
    }

    #[instrument(skip(self))]
    async fn reassign_referrer(
        &self,
        actor_id: String,
        user_id: String,
        referrer_id: Option<String>,
    ) -> LedgerResult<User> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let user = users::reassign_referrer(&mut uow, &user_id, referrer_id).await?;
        uow.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, actor_id: String, user_id: String) -> LedgerResult<()> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        users::delete_user(&mut uow, &actor_id, &user_id).await?;
        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, description))]
    async fn admin_adjust_wallet(
        &self,
        actor_id: String,
        user_id: String,
        direction: Adjustment,
        amount: Decimal,
        description: String,
    ) -> LedgerResult<WalletTransaction> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let entry = wallet::adjust(&mut uow, &user_id, direction, amount, description).await?;
        uow.commit().await?;
        info!(transaction_id = %entry.id, "Wallet adjusted");
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn generate_epins(
        &self,
        actor_id: String,
        amount: Decimal,
        count: u32,
        validity_days: Option<u32>,
    ) -> LedgerResult<Vec<EPin>> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let pins = epin::generate(&mut uow, amount, count, validity_days, &actor_id, Utc::now()).await?;
        uow.commit().await?;
        Ok(pins)
    }

    #[instrument(skip(self))]
    async fn redeem_epin(&self, actor_id: String, code: String) -> LedgerResult<WalletTransaction> {
        let mut uow = self.unit();
        let entry = epin::redeem(&mut uow, &code, &actor_id, Utc::now()).await?;
        uow.commit().await?;
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn list_epins(&self, actor_id: String) -> LedgerResult<Vec<EPin>> {
        let uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        epin::list(&uow).await
    }

    #[instrument(skip(self))]
    async fn submit_top_up(
        &self,
        actor_id: String,
        amount: Decimal,
        external_reference: String,
    ) -> LedgerResult<TopUpRequest> {
        let mut uow = self.unit();
        let request = top_up::submit(&mut uow, &actor_id, amount, &external_reference, Utc::now()).await?;
        uow.commit().await?;
        Ok(request)
    }

    #[instrument(skip(self))]
    async fn adjudicate_top_up(
        &self,
        actor_id: String,
        request_id: String,
        decision: Decision,
    ) -> LedgerResult<TopUpRequest> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let request = top_up::adjudicate(&mut uow, &request_id, decision).await?;
        uow.commit().await?;
        Ok(request)
    }

    #[instrument(skip(self))]
    async fn pending_top_ups(&self, actor_id: String) -> LedgerResult<Vec<TopUpRequest>> {
        let uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        top_up::pending(&uow).await
    }

    #[instrument(skip(self))]
    async fn add_to_cart(&self, actor_id: String, product_id: String, quantity: u32) -> LedgerResult<Cart> {
        let mut uow = self.unit();
        let cart = checkout::add_to_cart(&mut uow, &actor_id, &product_id, quantity).await?;
        uow.commit().await?;
        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn remove_from_cart(&self, actor_id: String, product_id: String) -> LedgerResult<Cart> {
        let mut uow = self.unit();
        let cart = checkout::remove_from_cart(&mut uow, &actor_id, &product_id).await?;
        uow.commit().await?;
        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, actor_id: String) -> LedgerResult<()> {
        let mut uow = self.unit();
        checkout::clear_cart(&mut uow, &actor_id).await?;
        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn place_order(&self, actor_id: String, items: Vec<OrderItem>) -> LedgerResult<OrderReceipt> {
        let mut uow = self.unit();
        let settings = settings::load(&uow, &self.defaults).await?;
        let receipt = checkout::place_order(&mut uow, &actor_id, items, &settings.referral_levels).await?;
        let writes = uow.commit().await?;
        debug!(writes, "Checkout committed");
        Ok(receipt)
    }

    #[instrument(skip(self))]
    async fn update_order_status(&self, actor_id: String, order_id: String, status: OrderStatus) -> LedgerResult<Order> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let order = checkout::update_order_status(&mut uow, &order_id, status).await?;
        uow.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn update_referral_levels(&self, actor_id: String, levels: Vec<ReferralLevel>) -> LedgerResult<LedgerSettings> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let updated = settings::update_referral_levels(&mut uow, &self.defaults, levels).await?;
        uow.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn set_registration_open(&self, actor_id: String, open: bool) -> LedgerResult<LedgerSettings> {
        let mut uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        let updated = settings::set_registration_open(&mut uow, &self.defaults, open).await?;
        uow.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn stats(&self, actor_id: String) -> LedgerResult<PlatformStats> {
        let uow = self.unit();
        users::require_admin(&uow, &actor_id).await?;
        settings::stats(&uow).await
    }
}
