use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use standing_order_placement::alerting::{AlertLog, AlertSink, FanoutAlertSink, TracingAlertSink};
use standing_order_placement::config::PlacementConfig;
use standing_order_placement::domain::order::{OrderCommandHandler, PaymentMethodRef, ShipAddress, StandardCheckoutRules};
use standing_order_placement::domain::standing_order::{
    InMemoryProxyOrderRepository, OrderCycleId, ProxyOrder, StandingOrder, StandingOrderStatus, TemplateLineItem,
};
use standing_order_placement::event_sourcing::EventStore;
use standing_order_placement::inventory::InMemoryStock;
use standing_order_placement::messaging::{OutboxNotifier, ResilientNotifier};
use standing_order_placement::metrics::{self, PlacementMetrics};
use standing_order_placement::placement::PlacementOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,standing_order_placement=debug")),
        )
        .init();

    let config = PlacementConfig::from_env()?;
    tracing::info!(
        job_name = %config.job_name,
        max_concurrency = config.max_concurrency,
        "🚀 Starting standing order placement"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(PlacementMetrics::new()?);
    if let Some(port) = config.metrics_port {
        let registry = Arc::new(metrics.registry().clone());
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Metrics runtime error: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                if let Err(e) = metrics::start_metrics_server(registry, port).await {
                    tracing::error!("Metrics server error: {}", e);
                }
            });
        });
    }

    // === 2. Order store and collaborators ===
    let orders = Arc::new(OrderCommandHandler::new(
        Arc::new(EventStore::new("Order")),
        Arc::new(StandardCheckoutRules),
    ));
    let proxy_orders = Arc::new(InMemoryProxyOrderRepository::new(orders.clone()));
    let stock = Arc::new(InMemoryStock::new());

    let outbox = Arc::new(OutboxNotifier::new("placement-notifications"));
    let notifier = Arc::new(
        ResilientNotifier::new(outbox.clone(), config.notifier_retry.clone(), config.notifier_breaker.clone())
            .with_metrics(metrics.clone()),
    );

    let alert_log = Arc::new(AlertLog::new(500));
    let alerts: Arc<dyn AlertSink> = Arc::new(FanoutAlertSink::new(vec![
        Arc::new(TracingAlertSink),
        alert_log.clone(),
    ]));

    // === 3. Seed one order cycle ===
    let cycle = OrderCycleId::new();
    seed_demo_cycle(&proxy_orders, &stock, cycle).await?;

    // === 4. Close the cycle ===
    let orchestrator = PlacementOrchestrator::new(
        config.clone(),
        proxy_orders.clone(),
        orders.clone(),
        stock.clone(),
        notifier,
        alerts,
    )
    .with_metrics(metrics.clone());

    let report = orchestrator.place_standing_orders(cycle).await;
    tracing::info!("📋 Placement report:\n{}", serde_json::to_string_pretty(&report)?);

    for message in outbox.drain().await {
        tracing::info!(topic = %message.topic, key = %message.key, "📧 {}", message.payload);
    }

    let stats = alert_log.stats();
    tracing::info!(alerts = stats.total, "🚨 Alerts awaiting manual intervention");
    for alert in alert_log.recent(10) {
        tracing::info!(
            kind = %alert.kind,
            order_number = ?alert.order_number,
            errors = ?alert.validation_errors,
            "{}",
            alert.error_description
        );
    }

    if config.metrics_port.is_some() {
        tracing::info!("Serving metrics until Ctrl-C");
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("🎉 Placement run complete");
    Ok(())
}

/// Three subscribers: one short on stock, one without a stored card, one paused
async fn seed_demo_cycle(
    proxy_orders: &InMemoryProxyOrderRepository,
    stock: &InMemoryStock,
    cycle: OrderCycleId,
) -> anyhow::Result<()> {
    let apples = Uuid::new_v4();
    let eggs = Uuid::new_v4();
    stock.set(apples, 3).await;
    stock.set(eggs, 24).await;

    let address = ShipAddress {
        recipient: "Market Hall".to_string(),
        line1: "12 Harvest Street".to_string(),
        city: "Hobart".to_string(),
        postcode: "7000".to_string(),
        country: "AU".to_string(),
    };
    let card = PaymentMethodRef {
        id: Uuid::new_v4(),
        name: "Stored card".to_string(),
    };

    let subscribers = [
        ("short@example.com", StandingOrderStatus::Active, Some(card.clone()), 5),
        ("nocard@example.com", StandingOrderStatus::Active, None, 2),
        ("paused@example.com", StandingOrderStatus::Inactive, Some(card), 2),
    ];

    for (email, status, payment_method, apple_quantity) in subscribers {
        let standing_order = StandingOrder {
            id: Uuid::new_v4(),
            customer_email: email.to_string(),
            status,
            template: vec![
                TemplateLineItem { variant_id: apples, quantity: apple_quantity, price_cents: 350 },
                TemplateLineItem { variant_id: eggs, quantity: 12, price_cents: 80 },
            ],
            ship_address: Some(address.clone()),
            payment_method,
        };
        let proxy_order = ProxyOrder::new(standing_order.id, cycle);
        proxy_orders.add_standing_order(standing_order).await;
        proxy_orders.add_proxy_order(proxy_order).await?;
    }

    Ok(())
}
