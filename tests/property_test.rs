use {
    paycore::domain::{
        error::CoreError,
        money::MoneyAmount,
        order::{Order, OrderStatus, PaymentMethod, PaymentStatus},
        refund::{RefundType, estimated_arrival},
    },
    proptest::prelude::*,
    uuid::Uuid,
};

fn arb_payment_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Processing),
        Just(PaymentStatus::Paid),
        Just(PaymentStatus::Failed),
        Just(PaymentStatus::Refunded),
        Just(PaymentStatus::PartiallyRefunded),
    ]
}

fn arb_method() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Razorpay),
        Just(PaymentMethod::Stripe),
        Just(PaymentMethod::Wallet),
        Just(PaymentMethod::Cod),
    ]
}

fn paid_order(paid: i64, refunded: i64, status: PaymentStatus) -> Order {
    Order {
        id: Uuid::now_v7(),
        order_number: "ORD-prop".into(),
        user_id: Uuid::now_v7(),
        status: OrderStatus::Delivered,
        payment_method: PaymentMethod::Cod,
        payment_status: status,
        transaction_id: None,
        paid_at: None,
        refund_id: None,
        refunded_at: None,
        total: MoneyAmount::new(paid).unwrap(),
        paid_amount: MoneyAmount::new(paid).unwrap(),
        refund_amount: MoneyAmount::new(refunded).unwrap(),
        currency: paycore::domain::money::Currency::Inr,
    }
}

proptest! {
    /// Refunded is terminal: nothing moves the payment status afterwards.
    #[test]
    fn refunded_rejects_all_transitions(target in arb_payment_status()) {
        prop_assert!(!PaymentStatus::Refunded.can_transition_to(&target));
    }

    /// A settled payment can only move along the refund axis.
    #[test]
    fn paid_only_advances_toward_refunds(target in arb_payment_status()) {
        let allowed = matches!(
            target,
            PaymentStatus::Refunded | PaymentStatus::PartiallyRefunded
        );
        prop_assert_eq!(PaymentStatus::Paid.can_transition_to(&target), allowed);
    }

    /// as_str → try_from roundtrip is identity for any status.
    #[test]
    fn payment_status_roundtrip(status in arb_payment_status()) {
        let roundtripped = PaymentStatus::try_from(status.as_str()).unwrap();
        prop_assert_eq!(roundtripped, status);
    }

    #[test]
    fn payment_method_roundtrip(method in arb_method()) {
        let roundtripped = PaymentMethod::try_from(method.as_str()).unwrap();
        prop_assert_eq!(roundtripped, method);
    }

    /// MoneyAmount construction rejects exactly the negatives.
    #[test]
    fn money_rejects_negatives(minor in i64::MIN..=i64::MAX) {
        match MoneyAmount::new(minor) {
            Ok(amount) => prop_assert!(minor >= 0 && amount.minor_units() == minor),
            Err(_) => prop_assert!(minor < 0),
        }
    }

    /// checked_add mirrors i64::checked_add, never silently overflowing.
    #[test]
    fn money_add_never_silently_overflows(a in 0i64..=i64::MAX, b in 0i64..=i64::MAX) {
        let sum = MoneyAmount::new(a).unwrap().checked_add(MoneyAmount::new(b).unwrap());
        match a.checked_add(b) {
            Some(expected) => prop_assert_eq!(sum.unwrap().minor_units(), expected),
            None => prop_assert!(sum.is_none()),
        }
    }

    /// checked_sub never goes below zero.
    #[test]
    fn money_sub_never_goes_negative(a in 0i64..=i64::MAX, b in 0i64..=i64::MAX) {
        let diff = MoneyAmount::new(a).unwrap().checked_sub(MoneyAmount::new(b).unwrap());
        match diff {
            Some(d) => prop_assert_eq!(d.minor_units(), a - b),
            None => prop_assert!(b > a),
        }
    }

    /// Eligibility accepts exactly the amounts within the refundable
    /// balance, and classifies by comparison against what was paid.
    #[test]
    fn eligibility_matches_the_balance_arithmetic(
        paid in 1i64..1_000_000,
        refunded_ratio in 0.0f64..1.0,
        amount in 0i64..2_000_000,
    ) {
        let refunded = ((paid as f64) * refunded_ratio) as i64;
        let status = if refunded == 0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PartiallyRefunded
        };
        let order = paid_order(paid, refunded, status);
        let amount = MoneyAmount::new(amount).unwrap();

        match order.check_refund_eligibility(amount) {
            Ok(kind) => {
                prop_assert!(!amount.is_zero());
                prop_assert!(amount <= order.refundable());
                let expect_partial = amount < order.paid_amount;
                prop_assert_eq!(kind == RefundType::Partial, expect_partial);
            }
            Err(CoreError::InvalidAmount) => prop_assert!(amount.is_zero()),
            Err(CoreError::InsufficientRefundable { .. }) => {
                prop_assert!(amount > order.refundable());
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Any sequence of accepted refunds keeps refund_amount within
    /// paid_amount, and the order ends refunded exactly when the balance
    /// is exhausted.
    #[test]
    fn refund_walk_never_overdraws(
        paid in 1i64..100_000,
        requests in prop::collection::vec(1i64..100_000, 1..12),
    ) {
        let mut order = paid_order(paid, 0, PaymentStatus::Paid);

        for request in requests {
            let amount = MoneyAmount::new(request).unwrap();
            if let Ok(_kind) = order.check_refund_eligibility(amount) {
                let new_total = order.refund_amount.checked_add(amount).unwrap();
                order.refund_amount = new_total;
                order.payment_status = if new_total == order.paid_amount {
                    PaymentStatus::Refunded
                } else {
                    PaymentStatus::PartiallyRefunded
                };
            }
            prop_assert!(order.refund_amount <= order.paid_amount);
        }

        let exhausted = order.refund_amount == order.paid_amount;
        prop_assert_eq!(order.payment_status == PaymentStatus::Refunded, exhausted);
    }

    /// Arrival estimates order the rails: instant wallet, short COD,
    /// longest for cards.
    #[test]
    fn arrival_estimates_are_ordered(method in arb_method()) {
        let now = chrono::Utc::now();
        let eta = estimated_arrival(method, now);
        let wallet = estimated_arrival(PaymentMethod::Wallet, now);
        let cod = estimated_arrival(PaymentMethod::Cod, now);
        prop_assert!(eta >= wallet);
        match method {
            PaymentMethod::Wallet => prop_assert_eq!(eta, now),
            PaymentMethod::Cod => prop_assert!(eta > now),
            _ => prop_assert!(eta > cod),
        }
    }
}
