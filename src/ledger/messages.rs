use rust_decimal::Decimal;
use tokio::sync::oneshot;

use super::checkout::OrderReceipt;
use super::settings::PlatformStats;
use crate::domain::{
    Adjustment, Cart, CommissionLog, Decision, EPin, LedgerSettings, Order, OrderItem, OrderStatus, ReferralLevel,
    Registration, TopUpRequest, User, WalletTransaction,
};
use crate::error::LedgerError;

/// Generic type aliases for service communication
pub type ServiceResult<T, E = LedgerError> = std::result::Result<T, E>;
pub type ServiceResponse<T, E = LedgerError> = oneshot::Sender<ServiceResult<T, E>>;

/// Requests handled by the ledger actor. `actor_id` is the authenticated caller.
#[derive(Debug)]
pub enum LedgerRequest {
    // Membership
    RegisterUser {
        registration: Registration,
        respond_to: ServiceResponse<User>,
    },
    EnsureAdmin {
        name: String,
        email: String,
        respond_to: ServiceResponse<User>,
    },
    GetUser {
        user_id: String,
        respond_to: ServiceResponse<User>,
    },
    DirectReferrals {
        user_id: String,
        respond_to: ServiceResponse<Vec<User>>,
    },
    NetworkSize {
        user_id: String,
        respond_to: ServiceResponse<usize>,
    },
    ReassignReferrer {
        actor_id: String,
        user_id: String,
        referrer_id: Option<String>,
        respond_to: ServiceResponse<User>,
    },
    DeleteUser {
        actor_id: String,
        user_id: String,
        respond_to: ServiceResponse<()>,
    },

    // Wallet
    Balance {
        user_id: String,
        respond_to: ServiceResponse<Decimal>,
    },
    History {
        user_id: String,
        respond_to: ServiceResponse<Vec<WalletTransaction>>,
    },
    Reconcile {
        user_id: String,
        respond_to: ServiceResponse<Decimal>,
    },
    ReconcileAll {
        respond_to: ServiceResponse<usize>,
    },
    AdminAdjustWallet {
        actor_id: String,
        user_id: String,
        direction: Adjustment,
        amount: Decimal,
        description: String,
        respond_to: ServiceResponse<WalletTransaction>,
    },

    // E-Pins
    GenerateEPins {
        actor_id: String,
        amount: Decimal,
        count: u32,
        validity_days: Option<u32>,
        respond_to: ServiceResponse<Vec<EPin>>,
    },
    RedeemEPin {
        actor_id: String,
        code: String,
        respond_to: ServiceResponse<WalletTransaction>,
    },
    ListEPins {
        actor_id: String,
        respond_to: ServiceResponse<Vec<EPin>>,
    },

    // Top-ups
    SubmitTopUp {
        actor_id: String,
        amount: Decimal,
        external_reference: String,
        respond_to: ServiceResponse<TopUpRequest>,
    },
    AdjudicateTopUp {
        actor_id: String,
        request_id: String,
        decision: Decision,
        respond_to: ServiceResponse<TopUpRequest>,
    },
    PendingTopUps {
        actor_id: String,
        respond_to: ServiceResponse<Vec<TopUpRequest>>,
    },
    MyTopUps {
        actor_id: String,
        respond_to: ServiceResponse<Vec<TopUpRequest>>,
    },

    // Cart and orders
    AddToCart {
        actor_id: String,
        product_id: String,
        quantity: u32,
        respond_to: ServiceResponse<Cart>,
    },
    RemoveFromCart {
        actor_id: String,
        product_id: String,
        respond_to: ServiceResponse<Cart>,
    },
    ClearCart {
        actor_id: String,
        respond_to: ServiceResponse<()>,
    },
    GetCart {
        actor_id: String,
        respond_to: ServiceResponse<Cart>,
    },
    PlaceOrder {
        actor_id: String,
        items: Vec<OrderItem>,
        respond_to: ServiceResponse<OrderReceipt>,
    },
    GetOrder {
        order_id: String,
        respond_to: ServiceResponse<Order>,
    },
    OrdersForUser {
        user_id: String,
        respond_to: ServiceResponse<Vec<Order>>,
    },
    UpdateOrderStatus {
        actor_id: String,
        order_id: String,
        status: OrderStatus,
        respond_to: ServiceResponse<Order>,
    },

    // Commission
    CommissionLogs {
        user_id: String,
        respond_to: ServiceResponse<Vec<CommissionLog>>,
    },
    OrderCommissions {
        order_id: String,
        respond_to: ServiceResponse<Vec<CommissionLog>>,
    },
    TotalEarnings {
        user_id: String,
        respond_to: ServiceResponse<Decimal>,
    },

    // Settings
    GetSettings {
        respond_to: ServiceResponse<LedgerSettings>,
    },
    UpdateReferralLevels {
        actor_id: String,
        levels: Vec<ReferralLevel>,
        respond_to: ServiceResponse<LedgerSettings>,
    },
    SetRegistrationOpen {
        actor_id: String,
        open: bool,
        respond_to: ServiceResponse<LedgerSettings>,
    },
    Stats {
        actor_id: String,
        respond_to: ServiceResponse<PlatformStats>,
    },

    Shutdown,
}
