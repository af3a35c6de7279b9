use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use referral_ledger::domain::{CartLine, Decision, ProductCreate, Registration};
use referral_ledger::{AppConfig, LedgerSystem, Logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load();
    let _guard = Logger::init(&config)?;

    info!(env = ?config.cargo_env, "Starting referral ledger");

    let system = LedgerSystem::start(&config).await?;
    let admin_id = system.admin.id.clone();

    // Stock the catalog
    let product_id = system
        .products
        .create_product(ProductCreate {
            name: "Wellness Kit".to_string(),
            category: "Health".to_string(),
            price: Decimal::from(500),
        })
        .await?;
    info!(product_id = %product_id, "Product created");

    // A two-level referral chain
    let span = tracing::info_span!("registration");
    let (sponsor, member, buyer) = async {
        let sponsor = system
            .ledger
            .register_user(Registration::new("Priya Sharma", "priya@example.com"))
            .await?;
        let member = system
            .ledger
            .register_user(Registration::new("Ravi Kumar", "ravi@example.com").referred_by(&sponsor.referral_code))
            .await?;
        let buyer = system
            .ledger
            .register_user(Registration::new("Anita Rao", "anita@example.com").referred_by(&member.referral_code))
            .await?;
        Ok::<_, referral_ledger::LedgerError>((sponsor, member, buyer))
    }
    .instrument(span)
    .await?;

    // Fund the buyer with an E-Pin and a manual top-up
    let pin = system
        .ledger
        .generate_epins(admin_id.clone(), Decimal::from(300), 1, Some(30))
        .await?
        .remove(0);
    system.ledger.redeem_epin(buyer.id.clone(), pin.code.clone()).await?;

    let request = system
        .ledger
        .submit_top_up(buyer.id.clone(), Decimal::from(200), "UTR20240101".to_string())
        .await?;
    system
        .ledger
        .adjudicate_top_up(admin_id.clone(), request.id, Decision::Approve)
        .await?;

    // Checkout
    let span = tracing::info_span!("order_processing");
    let result = async {
        system
            .ledger
            .place_order(buyer.id.clone(), vec![CartLine::new(product_id.clone(), 1)])
            .await
    }
    .instrument(span)
    .await;

    match result {
        Ok(receipt) => info!(
            order_id = %receipt.order.id,
            total = %receipt.order.total_amount,
            commissions = receipt.commissions.len(),
            "Order processed successfully"
        ),
        Err(e) => error!(error = %e, "Order processing failed"),
    }

    for user in [&sponsor, &member, &buyer] {
        let balance = system.ledger.balance(user.id.clone()).await?;
        info!(user = %user.name, balance = %balance, "Wallet");
    }

    let checked = system.ledger.reconcile_all().await?;
    let stats = system.ledger.stats(admin_id).await?;
    info!(checked, revenue = %stats.total_revenue, commission = %stats.total_commission, "Ledger reconciled");

    system.shutdown().await?;
    info!("Application completed successfully");
    Ok(())
}
