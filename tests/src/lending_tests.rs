use ledger::{
    error::ErrorKind,
    loan::LoanStatus,
    provider::ProviderError,
    testing::{self, BORROWER, LENDER},
};
use platform::message::Level;
use session::LoanForm;

use crate::common::{self, Setup};

#[tokio::test]
async fn fund_attaches_current_principal() {
    let setup = Setup::new(LENDER).post_loans(3).connect().await;
    let loan = testing::loan_id(3);
    assert_eq!(
        Some(common::eth("1")),
        setup.session.loans().get(loan).map(|record| record.principal)
    );
    setup
        .ledger
        .update_loan(loan, |record| record.principal = common::eth("2.5"));
    let refreshes = setup.ledger.counter_reads();

    setup.session.fund_loan("3").await.unwrap();

    let sent = setup.ledger.sent();
    assert_eq!(1, sent.len());
    assert_eq!(
        serde_json::json!("2500000000000000000"),
        serde_json::to_value(sent[0].value).unwrap()
    );
    assert_eq!(LENDER, sent[0].from);
    assert_eq!(refreshes + 1, setup.ledger.counter_reads());

    let funded = setup.session.loans().get(loan).cloned().unwrap();
    assert!(funded.is_funded());
    assert_eq!(LENDER, funded.lender);
    assert_eq!(Some(testing::GENESIS + testing::TERM), funded.due_at());
}

#[tokio::test]
async fn loan_lifecycle() {
    let setup = Setup::new(BORROWER).connect().await;
    let loan = testing::loan_id(1);

    setup
        .session
        .request_loan(LoanForm {
            principal: "1.5",
            collateral: "2",
            interest_rate: "10",
        })
        .await
        .unwrap();
    let requested = setup.session.loans().get(loan).cloned().unwrap();
    assert_eq!(LoanStatus::Pending, requested.status);
    assert_eq!(common::eth("1.65"), requested.total_repayment);
    assert!(!requested.is_funded());

    setup.ledger.switch_accounts(vec![LENDER]);
    setup
        .wait_for_state(|state| {
            state.identity().map(|identity| identity.account()) == Some(LENDER)
        })
        .await;
    setup.session.fund_loan("1").await.unwrap();
    assert_eq!(
        Some(LoanStatus::Active),
        setup.session.loans().get(loan).map(|record| record.status)
    );

    setup.ledger.switch_accounts(vec![BORROWER]);
    setup
        .wait_for_state(|state| {
            state.identity().map(|identity| identity.account()) == Some(BORROWER)
        })
        .await;
    setup.session.repay_loan("1").await.unwrap();

    assert_eq!(Some(common::eth("1.65")), setup.ledger.sent()[2].value);
    assert_eq!(
        Some(LoanStatus::Repaid),
        setup.session.loans().get(loan).map(|record| record.status)
    );
    let message = setup.session.message();
    assert_eq!("loan-repaid", message.event());
    assert_eq!(Some("1.65"), message.attribute("value"));
    assert_eq!(Some("ETH"), message.attribute("value-symbol"));
}

#[tokio::test]
async fn rejected_by_the_ledger() {
    let setup = Setup::new(BORROWER).post_loans(1).connect().await;
    let before = setup.session.loans();

    let err = setup.session.claim_collateral("1").await.unwrap_err();

    assert_eq!(Some(ErrorKind::TransactionRejected), err.kind());
    assert_eq!(before, setup.session.loans());
    let message = setup.session.message();
    assert_eq!(Level::Error, message.level());
    assert_eq!("claim-collateral-failed", message.event());
    assert_eq!(Some("1"), message.attribute("loan"));
}

#[tokio::test]
async fn partial_failure_is_visible() {
    let setup = Setup::new(BORROWER).post_loans(4).connect().await;
    setup.ledger.fail_loan(testing::loan_id(2));

    let collection = setup.session.refresh().await.unwrap();

    assert_eq!(
        vec![4, 3, 1],
        collection
            .iter()
            .map(|record| record.id.get())
            .collect::<Vec<_>>()
    );
    assert_eq!([testing::loan_id(2)], collection.skipped());
    let message = setup.session.message();
    assert_eq!("loans-refreshed", message.event());
    assert_eq!(Some("3"), message.attribute("loans"));
    assert_eq!(Some("1"), message.attribute("skipped"));
}

#[tokio::test]
async fn unavailable_ledger_keeps_loans() {
    let setup = Setup::new(BORROWER).post_loans(2).connect().await;
    setup.ledger.post_loan(BORROWER, common::eth("1"), common::eth("3"), 0);
    setup
        .ledger
        .fail_counter(Some(ProviderError::internal("header not found")));

    let err = setup.session.refresh().await.unwrap_err();

    assert_eq!(Some(ErrorKind::LedgerUnavailable), err.kind());
    assert_eq!(2, setup.session.loans().len());
    assert_eq!("refresh-failed", setup.session.message().event());

    setup.ledger.fail_counter(None);
    assert_eq!(3, setup.session.refresh().await.unwrap().len());
}
