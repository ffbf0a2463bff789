use std::sync::Arc;

use finserv_ledger::domain::{
    AccountKind, AccountLedger, LedgerError, PAYMENT_SPAN, TRANSFER_SPAN,
};
use finserv_ledger::observability::{NoopSink, RecordingSink};
use proptest::prelude::*;

fn ledger(checking: i64, savings: i64) -> AccountLedger {
    AccountLedger::new("ABCDE", checking, savings, Arc::new(NoopSink)).unwrap()
}

#[test]
fn test_transfer_checking_to_savings_scenario() {
    let mut ledger = AccountLedger::with_defaults();

    ledger
        .transfer_named("checking", "savings", 50_000)
        .expect("transfer should succeed");

    assert_eq!(ledger.checking(), 150_000);
    assert_eq!(ledger.savings(), 550_000);
}

#[test]
fn test_overdrawn_payment_scenario() {
    let mut ledger = ledger(150_000, 550_000);

    let result = ledger.debit_named("checking", 250_000);

    assert_eq!(
        result,
        Err(LedgerError::InsufficientFunds {
            account: AccountKind::Checking,
            balance: 150_000,
            required: 250_000,
        })
    );
    assert_eq!(ledger.checking(), 150_000);
    assert_eq!(ledger.savings(), 550_000);
}

fn account(checking: bool) -> AccountKind {
    if checking {
        AccountKind::Checking
    } else {
        AccountKind::Savings
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Any transfer the source can cover moves exactly `amount` and keeps
    /// the combined balance.
    #[test]
    fn valid_transfers_conserve_total(
        checking in 1i64..1_000_000_000_000,
        savings in 1i64..1_000_000_000_000,
        raw in any::<u64>(),
        from_checking in any::<bool>(),
    ) {
        let mut ledger = ledger(checking, savings);
        let from = account(from_checking);
        let to = from.counterpart();
        let (before_from, before_to) = (ledger.balance(from), ledger.balance(to));
        let amount = 1 + (raw % before_from as u64) as i64;

        ledger.transfer(from, to, amount).unwrap();

        prop_assert_eq!(ledger.balance(from), before_from - amount);
        prop_assert_eq!(ledger.balance(to), before_to + amount);
        prop_assert_eq!(ledger.total(), i128::from(checking) + i128::from(savings));
    }

    #[test]
    fn non_positive_amounts_are_rejected(
        checking in 0i64..1_000_000_000_000,
        savings in 0i64..1_000_000_000_000,
        amount in i64::MIN..=0,
        from_checking in any::<bool>(),
    ) {
        let mut ledger = ledger(checking, savings);
        let from = account(from_checking);

        prop_assert_eq!(
            ledger.transfer(from, from.counterpart(), amount),
            Err(LedgerError::InvalidAmount(amount))
        );
        prop_assert_eq!(ledger.debit(from, amount), Err(LedgerError::InvalidAmount(amount)));
        prop_assert_eq!((ledger.checking(), ledger.savings()), (checking, savings));
    }

    #[test]
    fn insufficient_funds_leave_balances_unchanged(
        checking in 0i64..1_000_000_000_000,
        savings in 0i64..1_000_000_000_000,
        excess in 1i64..1_000_000_000_000,
        from_checking in any::<bool>(),
    ) {
        let mut ledger = ledger(checking, savings);
        let from = account(from_checking);
        let balance = ledger.balance(from);
        let required = balance + excess;
        let expected = Err(LedgerError::InsufficientFunds {
            account: from,
            balance,
            required,
        });

        prop_assert_eq!(ledger.transfer(from, from.counterpart(), required), expected.clone());
        prop_assert_eq!(ledger.debit(from, required), expected);
        prop_assert_eq!((ledger.checking(), ledger.savings()), (checking, savings));
    }

    /// Over any mix of operations, balances stay non-negative and the total
    /// only drops by what successful debits took out.
    #[test]
    fn operation_sequences_keep_invariants(
        ops in prop::collection::vec(
            (any::<bool>(), any::<bool>(), -1_000i64..300_000),
            1..40,
        )
    ) {
        let mut ledger = ledger(200_000, 500_000);
        let mut expected_total = ledger.total();

        for (is_transfer, from_checking, amount) in ops {
            let from = account(from_checking);
            if is_transfer {
                let _ = ledger.transfer(from, from.counterpart(), amount);
            } else if ledger.debit(from, amount).is_ok() {
                expected_total -= i128::from(amount);
            }

            prop_assert!(ledger.checking() >= 0);
            prop_assert!(ledger.savings() >= 0);
            prop_assert_eq!(ledger.total(), expected_total);
        }
    }
}

#[test]
fn test_non_positive_edge_amounts_are_rejected() {
    for amount in [0, -1, i64::MIN] {
        let mut ledger = ledger(200_000, 500_000);

        assert_eq!(
            ledger.transfer(AccountKind::Checking, AccountKind::Savings, amount),
            Err(LedgerError::InvalidAmount(amount))
        );
        assert_eq!(
            ledger.debit(AccountKind::Savings, amount),
            Err(LedgerError::InvalidAmount(amount))
        );
        assert_eq!((ledger.checking(), ledger.savings()), (200_000, 500_000));
    }
}

#[test]
fn test_invalid_account_selection() {
    let mut ledger = ledger(200_000, 500_000);

    let cases = [
        ("checking", "checking"),
        ("Savings", "SAVINGS"),
        ("checking", "brokerage"),
        ("", "savings"),
    ];
    for (from, to) in cases {
        assert!(
            matches!(
                ledger.transfer_named(from, to, 100),
                Err(LedgerError::InvalidAccountSelection(_))
            ),
            "{} -> {} should be rejected",
            from,
            to
        );
    }
    assert!(matches!(
        ledger.debit_named("credit card", 100),
        Err(LedgerError::InvalidAccountSelection(_))
    ));

    assert_eq!((ledger.checking(), ledger.savings()), (200_000, 500_000));
}

#[test]
fn test_insufficient_funds_on_either_side() {
    let mut ledger = ledger(1_000, 2_000);

    assert!(matches!(
        ledger.transfer(AccountKind::Checking, AccountKind::Savings, 1_001),
        Err(LedgerError::InsufficientFunds { .. })
    ));
    assert!(matches!(
        ledger.transfer(AccountKind::Savings, AccountKind::Checking, 2_001),
        Err(LedgerError::InsufficientFunds { .. })
    ));
    assert!(matches!(
        ledger.debit(AccountKind::Savings, 2_001),
        Err(LedgerError::InsufficientFunds { .. })
    ));

    assert_eq!((ledger.checking(), ledger.savings()), (1_000, 2_000));
}

#[test]
fn test_every_span_is_ended_exactly_once() {
    let sink = RecordingSink::new();
    let mut ledger = AccountLedger::with_defaults().with_sink(Arc::new(sink.clone()));

    let _ = ledger.transfer_named("checking", "savings", 10_000);
    let _ = ledger.transfer_named("checking", "nowhere", 10_000);
    let _ = ledger.transfer(AccountKind::Savings, AccountKind::Checking, 0);
    let _ = ledger.debit_named("savings", 10_000_000);
    let _ = ledger.debit(AccountKind::Checking, 500);

    assert_eq!(sink.started(), 5);
    assert_eq!(sink.open_spans(), 0);
    assert_eq!(sink.events_named(TRANSFER_SPAN).len(), 3);
    assert_eq!(sink.events_named(PAYMENT_SPAN).len(), 2);
}

#[test]
fn test_noop_sink_has_no_behavioral_effect() {
    let sink = RecordingSink::new();
    let mut traced = AccountLedger::with_defaults().with_sink(Arc::new(sink));
    let mut silent = AccountLedger::with_defaults().with_sink(Arc::new(NoopSink));

    for ledger in [&mut traced, &mut silent] {
        ledger
            .transfer(AccountKind::Savings, AccountKind::Checking, 7_500)
            .unwrap();
        let _ = ledger.debit(AccountKind::Checking, 1_000_000);
        ledger.debit(AccountKind::Checking, 2_500).unwrap();
    }

    assert_eq!(traced.checking(), silent.checking());
    assert_eq!(traced.savings(), silent.savings());
}
