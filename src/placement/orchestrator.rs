use std::sync::Arc;
use std::time::Instant;
use anyhow::{Result, bail};
use futures_util::stream::{self, StreamExt};
use uuid::Uuid;

use crate::alerting::{AlertKind, AlertSink, OperationalAlert};
use crate::config::PlacementConfig;
use crate::domain::order::{AdvanceOutcome, OrderAggregate, OrderCommandHandler, QuantityChanges};
use crate::domain::standing_order::{OrderCycleId, ProxyOrder, ProxyOrderRepository};
use crate::inventory::StockLevels;
use crate::messaging::{PlacementNotification, PlacementNotifier};
use crate::metrics::PlacementMetrics;

use super::locks::OrderLocks;
use super::reconciler::StockReconciler;
use super::report::{PlacementReport, PlacementResult, ProxyOrderOutcome};

// ============================================================================
// Placement Orchestrator
// ============================================================================
//
// Runs once per order cycle close. For every due proxy order:
//
//   lock → initialise → skip if complete → cap at stock → advance until
//   complete → notify customer (or alert operators and stop)
//
// Each proxy order is its own unit of work. Nothing a unit does can abort a
// sibling, and nothing escapes `place_standing_orders`.
//
// ============================================================================

const CANNOT_ADVANCE: &str = "Cannot process order due to errors";

pub struct PlacementOrchestrator {
    config: PlacementConfig,
    proxy_orders: Arc<dyn ProxyOrderRepository>,
    orders: Arc<OrderCommandHandler>,
    reconciler: StockReconciler,
    notifier: Arc<dyn PlacementNotifier>,
    alerts: Arc<dyn AlertSink>,
    locks: Arc<OrderLocks>,
    metrics: Option<Arc<PlacementMetrics>>,
}

/// What a unit has learned about its order so far, for alert context
#[derive(Default)]
struct UnitProgress {
    order_id: Option<Uuid>,
    order_number: Option<String>,
}

impl PlacementOrchestrator {
    pub fn new(
        config: PlacementConfig,
        proxy_orders: Arc<dyn ProxyOrderRepository>,
        orders: Arc<OrderCommandHandler>,
        stock: Arc<dyn StockLevels>,
        notifier: Arc<dyn PlacementNotifier>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            reconciler: StockReconciler::new(orders.clone(), stock),
            config,
            proxy_orders,
            orders,
            notifier,
            alerts,
            locks: Arc::new(OrderLocks::new()),
            metrics: None,
        }
    }

    /// Share one lock map between orchestrators that may run at the same time
    pub fn with_locks(mut self, locks: Arc<OrderLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PlacementMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Place every due standing order of `order_cycle_id`. Never fails;
    /// per-order problems are reported through alerts and the returned report.
    pub async fn place_standing_orders(&self, order_cycle_id: OrderCycleId) -> PlacementReport {
        let correlation_id = Uuid::now_v7();

        let candidates = match self.proxy_orders.due_for_placement(order_cycle_id).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.raise(OperationalAlert::new(
                    AlertKind::ProcessingFailed,
                    &self.config.job_name,
                    format!("Cannot load proxy orders for order cycle {}: {:#}", order_cycle_id, e),
                ));
                return PlacementReport::new(order_cycle_id, correlation_id, Vec::new());
            }
        };

        if candidates.is_empty() {
            tracing::debug!(order_cycle_id = %order_cycle_id, "No standing orders due");
            return PlacementReport::new(order_cycle_id, correlation_id, Vec::new());
        }

        tracing::info!(
            order_cycle_id = %order_cycle_id,
            correlation_id = %correlation_id,
            candidates = candidates.len(),
            "Placing standing orders"
        );

        let outcomes: Vec<ProxyOrderOutcome> = stream::iter(candidates)
            .map(|proxy_order| self.place_one(proxy_order, correlation_id))
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let report = PlacementReport::new(order_cycle_id, correlation_id, outcomes);

        tracing::info!(
            order_cycle_id = %order_cycle_id,
            placed = report.placed(),
            already_complete = report.already_complete(),
            stuck = report.stuck(),
            failed = report.failed(),
            "Standing order placement finished"
        );

        report
    }

    /// The failure boundary of one unit of work
    async fn place_one(&self, proxy_order: ProxyOrder, correlation_id: Uuid) -> ProxyOrderOutcome {
        let started = Instant::now();
        let mut progress = UnitProgress::default();

        let result = match self.process(&proxy_order, correlation_id, &mut progress).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    proxy_order_id = %proxy_order.id,
                    order_id = ?progress.order_id,
                    error = %e,
                    "Standing order placement failed"
                );

                let mut alert = OperationalAlert::new(
                    AlertKind::ProcessingFailed,
                    &self.config.job_name,
                    format!("Placement failed for proxy order {}: {:#}", proxy_order.id, e),
                );
                if let Some(number) = &progress.order_number {
                    alert = alert.with_order_number(number.clone());
                }
                self.raise(alert);

                PlacementResult::Failed { error: format!("{:#}", e) }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_order(result.label(), started.elapsed().as_secs_f64());
        }

        ProxyOrderOutcome {
            proxy_order_id: proxy_order.id,
            order_id: progress.order_id,
            order_number: progress.order_number,
            result,
        }
    }

    async fn process(
        &self,
        proxy_order: &ProxyOrder,
        correlation_id: Uuid,
        progress: &mut UnitProgress,
    ) -> Result<PlacementResult> {
        // A proxy order owns exactly one order, so its id keys the lock
        // from before the order exists until the unit is done.
        let _guard = self.locks.lock(proxy_order.id).await;

        let order_id = self.proxy_orders.initialise_order(proxy_order, correlation_id).await?;
        progress.order_id = Some(order_id);

        let order = self.orders.load(order_id).await?;
        progress.order_number = Some(order.number.clone());

        if order.is_complete() {
            tracing::debug!(order_id = %order_id, "Order already complete, skipping");
            if self.config.notify_already_complete {
                self.notify(&order, &QuantityChanges::new()).await;
            }
            return Ok(PlacementResult::AlreadyComplete);
        }

        let changes = self.reconciler.reconcile(order_id, correlation_id).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_capped(changes.len());
        }

        let mut state = order.state;
        while !state.is_complete() {
            match self.orders.advance(order_id, correlation_id).await? {
                AdvanceOutcome::Advanced(next) => state = next,
                AdvanceOutcome::Rejected(errors) => {
                    self.raise(
                        OperationalAlert::new(AlertKind::CannotAdvance, &self.config.job_name, CANNOT_ADVANCE)
                            .with_order_number(order.number.clone())
                            .with_validation_errors(errors.messages().to_vec()),
                    );
                    return Ok(PlacementResult::Stuck {
                        state,
                        errors: errors.into_messages(),
                    });
                }
            }
        }

        let placed = self.orders.load(order_id).await?;
        if !placed.is_complete() {
            bail!("Order {} reported complete but is in state {}", placed.number, placed.state);
        }

        let notified = self.notify(&placed, &changes).await;

        Ok(PlacementResult::Placed { changes, notified })
    }

    /// Fire-and-forget; a failed delivery is logged, never alerted
    async fn notify(&self, order: &OrderAggregate, changes: &QuantityChanges) -> bool {
        let notification = PlacementNotification::for_order(order, changes);

        let delivered = match self.notifier.send_placement(&notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    order_number = %order.number,
                    error = %e,
                    "Placement notification not delivered"
                );
                false
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_notification(delivered);
        }
        delivered
    }

    fn raise(&self, alert: OperationalAlert) {
        if let Some(metrics) = &self.metrics {
            metrics.record_alert(alert.kind.as_str());
        }
        self.alerts.raise(&alert);
    }
}
