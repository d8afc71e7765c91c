//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::{Aggregate, Money};

use super::{OrderError, OrderItem, OrderStatus, StatusChange, TransitionAction};

/// Order aggregate root.
///
/// Items and amounts are fixed when the order is placed. Only the status
/// changes afterwards, and every change is appended to `status_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    order_date: DateTime<Utc>,
    items: Vec<OrderItem>,

    /// Sum of item totals before any discount.
    original_amount: Money,
    discount_amount: Money,

    /// `original_amount - discount_amount`, floored at zero.
    total_amount: Money,

    coupon_code: Option<String>,
    status: OrderStatus,

    #[serde(default)]
    status_history: Vec<StatusChange>,
}

impl Order {
    /// Places a new order in `PENDING` status.
    pub fn place(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        discount_amount: Money,
        coupon_code: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let original_amount: Money = items.iter().map(|item| item.total_price).sum();
        let total_amount = (original_amount - discount_amount).floor_at_zero();

        Ok(Self {
            id,
            user_id,
            order_date: now,
            items,
            original_amount,
            discount_amount,
            total_amount,
            coupon_code,
            status: OrderStatus::Pending,
            status_history: Vec::new(),
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn original_amount(&self) -> Money {
        self.original_amount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    /// Moves a pending order to `CONFIRMED`.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<&StatusChange, OrderError> {
        self.guard(self.status.can_approve(), TransitionAction::Approve)?;
        Ok(self.record(OrderStatus::Confirmed, TransitionAction::Approve, now))
    }

    /// Moves a pending order to `CANCELLED`.
    ///
    /// The caller is responsible for restoring inventory in the same commit.
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<&StatusChange, OrderError> {
        self.guard(self.status.can_reject(), TransitionAction::Reject)?;
        Ok(self.record(OrderStatus::Cancelled, TransitionAction::Reject, now))
    }

    /// Moves a pending or confirmed order to `CANCELLED`.
    ///
    /// The caller is responsible for restoring inventory in the same commit.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<&StatusChange, OrderError> {
        self.guard(self.status.can_cancel(), TransitionAction::Cancel)?;
        Ok(self.record(OrderStatus::Cancelled, TransitionAction::Cancel, now))
    }

    /// Sets any status, bypassing the state machine.
    ///
    /// Never restores inventory, even when moving to `CANCELLED`.
    pub fn override_status(&mut self, status: OrderStatus, now: DateTime<Utc>) -> &StatusChange {
        self.record(status, TransitionAction::Override, now)
    }

    /// Applies the transition for `action`. `Override` requires a target.
    pub fn transition(
        &mut self,
        action: TransitionAction,
        target: Option<OrderStatus>,
        now: DateTime<Utc>,
    ) -> Result<&StatusChange, OrderError> {
        match (action, target) {
            (TransitionAction::Approve, _) => self.approve(now),
            (TransitionAction::Reject, _) => self.reject(now),
            (TransitionAction::Cancel, _) => self.cancel(now),
            (TransitionAction::Override, Some(status)) => Ok(self.override_status(status, now)),
            (TransitionAction::Override, None) => Err(OrderError::MissingTarget),
        }
    }

    fn guard(&self, allowed: bool, action: TransitionAction) -> Result<(), OrderError> {
        if allowed {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                current: self.status,
                action,
            })
        }
    }

    fn record(
        &mut self,
        to: OrderStatus,
        action: TransitionAction,
        now: DateTime<Utc>,
    ) -> &StatusChange {
        let change = StatusChange {
            from: self.status,
            to,
            at: now,
            action,
        };
        self.status = to;
        self.status_history.push(change);
        &self.status_history[self.status_history.len() - 1]
    }
}

impl Aggregate for Order {
    fn collection() -> &'static str {
        "orders"
    }

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::ProductId;

    use crate::CartItem;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn items() -> Vec<OrderItem> {
        [("SKU-A", 2, 30), ("SKU-B", 1, 40)]
            .into_iter()
            .map(|(sku, quantity, units)| {
                let line = CartItem::new(ProductId::new(sku), quantity, Money::from_units(units));
                OrderItem::from(&line.unwrap())
            })
            .collect()
    }

    fn pending() -> Order {
        Order::place(
            OrderId::new(),
            UserId::new(),
            items(),
            Money::zero(),
            None,
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_place_computes_amounts() {
        let order = Order::place(
            OrderId::new(),
            UserId::new(),
            items(),
            Money::from_units(20),
            Some("WELCOME20".to_string()),
            now(),
        )
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.original_amount(), Money::from_units(100));
        assert_eq!(order.discount_amount(), Money::from_units(20));
        assert_eq!(order.total_amount(), Money::from_units(80));
        assert_eq!(order.coupon_code(), Some("WELCOME20"));
        assert!(order.status_history().is_empty());
    }

    #[test]
    fn test_total_is_floored_at_zero() {
        let order = Order::place(
            OrderId::new(),
            UserId::new(),
            items(),
            Money::from_units(150),
            None,
            now(),
        )
        .unwrap();

        assert_eq!(order.total_amount(), Money::zero());
    }

    #[test]
    fn test_place_without_items_fails() {
        let result = Order::place(
            OrderId::new(),
            UserId::new(),
            Vec::new(),
            Money::zero(),
            None,
            now(),
        );
        assert_eq!(result.unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_approve_then_cancel() {
        let mut order = pending();

        order.approve(now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);

        let change = order.cancel(now()).unwrap().clone();
        assert_eq!(change.from, OrderStatus::Confirmed);
        assert_eq!(change.to, OrderStatus::Cancelled);
        assert_eq!(order.status_history().len(), 2);
    }

    #[test]
    fn test_cancel_twice_fails() {
        let mut order = pending();
        order.cancel(now()).unwrap();

        let err = order.cancel(now()).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                current: OrderStatus::Cancelled,
                action: TransitionAction::Cancel,
            }
        );
        assert_eq!(order.status_history().len(), 1);
    }

    #[test]
    fn test_reject_only_from_pending() {
        let mut order = pending();
        order.approve(now()).unwrap();

        assert!(matches!(
            order.reject(now()),
            Err(OrderError::InvalidTransition {
                current: OrderStatus::Confirmed,
                ..
            })
        ));
        assert!(order.approve(now()).is_err());

        let mut order = pending();
        order.reject(now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_override_bypasses_state_machine() {
        let mut order = pending();
        order.cancel(now()).unwrap();

        let change = order.override_status(OrderStatus::Shipped, now()).clone();
        assert_eq!(change.action, TransitionAction::Override);
        assert_eq!(change.from, OrderStatus::Cancelled);
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_transition_dispatch() {
        let mut order = pending();

        order
            .transition(TransitionAction::Approve, None, now())
            .unwrap();
        assert_eq!(
            order.transition(TransitionAction::Override, None, now()),
            Err(OrderError::MissingTarget)
        );
        order
            .transition(TransitionAction::Override, Some(OrderStatus::Delivered), now())
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut order = pending();
        order.approve(now()).unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "CONFIRMED");
        assert_eq!(json["user_id"], order.user_id().to_string());

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
