use std::sync::Mutex;

use super::*;
use chrono::Duration;
use crates::{
    domain::{
        entities::{invoices::InvoiceEntity, plans::PlanEntity, users::UserEntity},
        repositories::{
            invoices::MockInvoiceRepository, listing_activation::MockListingActivationRepository,
            notification_outbox::MockNotificationOutboxRepository, payments::MockPaymentRepository,
            plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
            users::MockUserRepository, webhook_receipts::MockWebhookReceiptRepository,
        },
        value_objects::{enums::notification_kinds::NotificationKind, plans::PlanFeatures},
    },
    payments::mercado_pago_client::{CheckoutPreference, GatewayPayment},
};
use mockall::predicate::eq;

use crate::usecases::payment_gateway::MockPaymentGateway;

const OWNER: Uuid = Uuid::from_u128(7);

type TestUseCase = PaymentUseCase<
    MockPlanRepository,
    MockUserRepository,
    MockSubscriptionRepository,
    MockPaymentRepository,
    MockInvoiceRepository,
    MockListingActivationRepository,
    MockWebhookReceiptRepository,
    MockNotificationOutboxRepository,
    MockPaymentGateway,
>;

#[derive(Default)]
struct Mocks {
    plans: MockPlanRepository,
    users: MockUserRepository,
    subscriptions: MockSubscriptionRepository,
    payments: MockPaymentRepository,
    invoices: MockInvoiceRepository,
    listings: MockListingActivationRepository,
    receipts: MockWebhookReceiptRepository,
    outbox: MockNotificationOutboxRepository,
    gateway: MockPaymentGateway,
}

impl Mocks {
    fn into_usecase(self, eager_activation: bool) -> TestUseCase {
        PaymentUseCase::new(
            Arc::new(self.plans),
            Arc::new(self.users),
            Arc::new(self.subscriptions),
            Arc::new(self.payments),
            Arc::new(self.invoices),
            Arc::new(self.listings),
            Arc::new(self.receipts),
            Arc::new(self.outbox),
            Arc::new(self.gateway),
            PaymentSettings {
                eager_activation,
                notification_url: Some("https://api.example.com/api/v1/payments/webhook".into()),
                default_callback_url: "https://app.example.com/checkout/done".into(),
            },
        )
    }
}

fn plan(plan_type: PlanType, is_active: bool) -> PlanEntity {
    let now = Utc::now();
    PlanEntity {
        id: Uuid::new_v4(),
        name: "Destaque".to_string(),
        description: None,
        price_minor: 4_990,
        currency: "BRL".to_string(),
        duration_days: 30,
        plan_type,
        features: PlanFeatures::default(),
        is_active,
        created_at: now,
        updated_at: now,
    }
}

fn user(id: Uuid) -> UserEntity {
    user_with_role(id, "user")
}

fn user_with_role(id: Uuid, role: &str) -> UserEntity {
    let now = Utc::now();
    UserEntity {
        id,
        external_id: Some("user_ext".to_string()),
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        role: role.to_string(),
        status: "approved".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn subscription(user_id: Uuid, plan_id: Uuid, status: SubscriptionStatus) -> SubscriptionEntity {
    let now = Utc::now();
    SubscriptionEntity {
        id: Uuid::new_v4(),
        user_id,
        plan_id,
        business_id: Some(Uuid::new_v4()),
        professional_id: None,
        status: status.as_str().to_string(),
        starts_at: now - Duration::days(20),
        ends_at: now + Duration::days(10),
        auto_renew: true,
        canceled_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn payment(subscription: &SubscriptionEntity, status: PaymentStatus) -> PaymentEntity {
    let now = Utc::now();
    PaymentEntity {
        id: Uuid::new_v4(),
        subscription_id: subscription.id,
        user_id: subscription.user_id,
        amount_minor: 4_990,
        status: status.as_str().to_string(),
        payment_method: "pix".to_string(),
        preference_id: Some("pref-1".to_string()),
        external_reference: format!("sub_{}", subscription.id),
        provider_payment_id: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn invoice_from(insert: InsertInvoiceEntity) -> InvoiceEntity {
    InvoiceEntity {
        id: Uuid::new_v4(),
        payment_id: insert.payment_id,
        subscription_id: insert.subscription_id,
        user_id: insert.user_id,
        invoice_number: insert.invoice_number,
        amount_minor: insert.amount_minor,
        issued_at: insert.issued_at,
    }
}

fn command(plan_id: Uuid, user_id: Uuid, business_id: Option<Uuid>) -> CreatePreferenceCommand {
    CreatePreferenceCommand {
        plan_id,
        user_id,
        callback_url: "https://app.example.com/checkout/done".to_string(),
        payment_method: PaymentMethod::Pix,
        business_id,
        professional_id: None,
        card_token: None,
        coupon_code: None,
    }
}

fn notification(id: &str, status: &str, external_reference: String) -> PaymentNotification {
    PaymentNotification {
        id: id.to_string(),
        status: status.to_string(),
        external_reference,
    }
}

fn expect_fresh_receipt(mocks: &mut Mocks) {
    mocks.receipts.expect_exists().returning(|_, _| Ok(false));
    mocks.receipts.expect_record().times(1).returning(|_, _| Ok(()));
}

#[tokio::test]
async fn inactive_plan_is_rejected_without_creating_a_subscription() {
    let mut mocks = Mocks::default();
    let inactive = plan(PlanType::Business, false);
    let plan_id = inactive.id;
    mocks
        .plans
        .expect_find_by_id()
        .with(eq(plan_id))
        .returning(move |_| Ok(Some(inactive.clone())));
    mocks.subscriptions.expect_create().times(0);

    let err = mocks
        .into_usecase(false)
        .create_payment_preference(command(plan_id, Uuid::new_v4(), Some(Uuid::new_v4())))
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::BadRequest(_)));
}

#[tokio::test]
async fn business_plan_requires_a_business_id() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let user_id = Uuid::new_v4();
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks.subscriptions.expect_create().times(0);

    let err = mocks
        .into_usecase(false)
        .create_payment_preference(command(plan_id, user_id, None))
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::BadRequest(_)));
}

#[tokio::test]
async fn listing_with_open_subscription_conflicts() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let user_id = Uuid::new_v4();
    let business_id = Uuid::new_v4();
    let existing = subscription(user_id, plan_id, SubscriptionStatus::PendingPayment);

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .listings
        .expect_business_owner()
        .with(eq(business_id))
        .returning(move |_| Ok(Some(user_id)));
    mocks
        .subscriptions
        .expect_find_open_for_business()
        .with(eq(business_id))
        .returning(move |_| Ok(Some(existing.clone())));
    mocks.subscriptions.expect_create().times(0);

    let err = mocks
        .into_usecase(false)
        .create_payment_preference(command(plan_id, user_id, Some(business_id)))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn checkout_creates_pending_subscription_preference_and_payment() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let user_id = Uuid::new_v4();
    let business_id = Uuid::new_v4();
    let subscription_id = Uuid::new_v4();

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .listings
        .expect_business_owner()
        .returning(move |_| Ok(Some(user_id)));
    mocks
        .subscriptions
        .expect_find_open_for_business()
        .returning(|_| Ok(None));
    mocks
        .subscriptions
        .expect_create()
        .withf(move |insert| {
            insert.status == "pending_payment"
                && insert.business_id == Some(business_id)
                && insert.auto_renew
                && insert.ends_at - insert.starts_at == Duration::days(30)
        })
        .times(1)
        .returning(move |insert| {
            let mut created = subscription(insert.user_id, insert.plan_id, SubscriptionStatus::PendingPayment);
            created.id = subscription_id;
            Ok(created)
        });
    mocks
        .gateway
        .expect_create_preference()
        .withf(move |request| {
            request.external_reference == format!("sub_{subscription_id}")
                && request.payment_method == PaymentMethod::Pix
                && request.unit_price_minor == 4_990
                && request.payer_email.as_deref() == Some("ana@example.com")
        })
        .times(1)
        .returning(|_| {
            Ok(CheckoutPreference {
                id: "pref-123".to_string(),
                init_point: "https://gateway.example.com/checkout/pref-123".to_string(),
            })
        });
    mocks
        .payments
        .expect_create()
        .withf(move |insert| {
            insert.status == "pending"
                && insert.preference_id.as_deref() == Some("pref-123")
                && insert.subscription_id == subscription_id
                && insert.payment_method == "pix"
        })
        .times(1)
        .returning(|insert| {
            Ok(PaymentEntity {
                id: Uuid::new_v4(),
                subscription_id: insert.subscription_id,
                user_id: insert.user_id,
                amount_minor: insert.amount_minor,
                status: insert.status,
                payment_method: insert.payment_method,
                preference_id: insert.preference_id,
                external_reference: insert.external_reference,
                provider_payment_id: None,
                paid_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        });

    let dto = mocks
        .into_usecase(false)
        .create_payment_preference(command(plan_id, user_id, Some(business_id)))
        .await
        .unwrap();

    assert_eq!(dto.preference_id, "pref-123");
    assert_eq!(dto.subscription_id, subscription_id);
}

#[tokio::test]
async fn eager_activation_starts_active_and_failed_checkout_releases_the_slot() {
    let mut mocks = Mocks::default();
    let job_plan = plan(PlanType::Job, true);
    let plan_id = job_plan.id;

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(job_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .subscriptions
        .expect_create()
        .withf(|insert| insert.status == "active" && insert.business_id.is_none())
        .times(1)
        .returning(|insert| Ok(subscription(insert.user_id, insert.plan_id, SubscriptionStatus::Active)));
    mocks.gateway.expect_create_preference().returning(|_| {
        Ok(CheckoutPreference {
            id: "pref-9".to_string(),
            init_point: "https://gateway.example.com/checkout/pref-9".to_string(),
        })
    });
    mocks
        .payments
        .expect_create()
        .returning(|_| Err(anyhow::anyhow!("connection refused")));
    mocks.subscriptions.expect_cancel().times(1).returning(|_, _| Ok(()));

    let err = mocks
        .into_usecase(true)
        .create_payment_preference(command(plan_id, Uuid::new_v4(), None))
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::Internal(_)));
}

#[tokio::test]
async fn malformed_external_reference_is_rejected_without_mutation() {
    let mut mocks = Mocks::default();
    mocks.receipts.expect_exists().times(0);
    mocks.subscriptions.expect_find_by_id().times(0);
    mocks.payments.expect_update_status().times(0);
    mocks.subscriptions.expect_update_status().times(0);

    let err = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("77", "approved", "order_42".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::BadRequest(_)));
}

#[tokio::test]
async fn approved_payment_issues_one_invoice_and_activates_listing() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let sub = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::PendingPayment);
    let pending = payment(&sub, PaymentStatus::Pending);
    let sub_id = sub.id;
    let business_id = sub.business_id.unwrap();
    let payment_id = pending.id;

    expect_fresh_receipt(&mut mocks);
    mocks
        .subscriptions
        .expect_find_by_id()
        .with(eq(sub_id))
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(Some(pending.clone())));
    mocks
        .payments
        .expect_update_status()
        .withf(move |id, changes| {
            *id == payment_id
                && changes.status == "paid"
                && changes.provider_payment_id.as_deref() == Some("991")
                && changes.paid_at.is_some()
        })
        .times(1)
        .returning(|_, _| Ok(()));
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .invoices
        .expect_create()
        .withf(move |insert| insert.payment_id == payment_id && insert.amount_minor == 4_990)
        .times(1)
        .returning(|insert| Ok(invoice_from(insert)));
    mocks
        .listings
        .expect_activate_business()
        .with(eq(business_id))
        .times(1)
        .returning(|_| Ok(()));
    mocks.subscriptions.expect_extend_period().times(0);
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .outbox
        .expect_enqueue()
        .withf(|message| message.kind == NotificationKind::PaymentConfirmed.as_str())
        .times(1)
        .returning(|_| Ok(Uuid::new_v4()));
    mocks
        .subscriptions
        .expect_update_status()
        .with(eq(sub_id), eq(SubscriptionStatus::Active))
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("991", "approved", format!("sub_{sub_id}")))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        WebhookOutcome {
            success: true,
            duplicate: false
        }
    );
}

#[tokio::test]
async fn redelivered_notification_is_a_no_op() {
    let mut mocks = Mocks::default();
    mocks
        .receipts
        .expect_exists()
        .with(eq(MERCADO_PAGO_SOURCE.to_string()), eq("991:approved".to_string()))
        .returning(|_, _| Ok(true));
    mocks.subscriptions.expect_find_by_id().times(0);
    mocks.invoices.expect_create().times(0);

    let outcome = mocks
        .into_usecase(false)
        .process_payment_webhook(notification(
            "991",
            "approved",
            format!("sub_{}", Uuid::new_v4()),
        ))
        .await
        .unwrap();

    assert!(outcome.duplicate);
}

#[tokio::test]
async fn already_paid_payment_never_gets_a_second_invoice() {
    let mut mocks = Mocks::default();
    let sub = subscription(Uuid::new_v4(), Uuid::new_v4(), SubscriptionStatus::Active);
    let paid = payment(&sub, PaymentStatus::Paid);
    let sub_id = sub.id;

    expect_fresh_receipt(&mut mocks);
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(Some(paid.clone())));
    mocks.payments.expect_update_status().times(0);
    mocks.invoices.expect_create().times(0);

    let outcome = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("992", "approved", format!("sub_{sub_id}")))
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(outcome.duplicate);
}

#[tokio::test]
async fn pending_status_leaves_subscription_untouched() {
    let mut mocks = Mocks::default();
    let sub = subscription(Uuid::new_v4(), Uuid::new_v4(), SubscriptionStatus::PendingPayment);
    let pending = payment(&sub, PaymentStatus::Pending);
    let sub_id = sub.id;

    expect_fresh_receipt(&mut mocks);
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(Some(pending.clone())));
    mocks
        .payments
        .expect_update_status()
        .withf(|_, changes| changes.status == "pending" && changes.paid_at.is_none())
        .times(1)
        .returning(|_, _| Ok(()));
    mocks.subscriptions.expect_update_status().times(0);
    mocks.invoices.expect_create().times(0);

    let outcome = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("993", "in_process", format!("sub_{sub_id}")))
        .await
        .unwrap();

    assert!(!outcome.duplicate);
}

#[tokio::test]
async fn approved_renewal_extends_from_current_end() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let sub = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::Active);
    let pending = payment(&sub, PaymentStatus::Pending);
    let sub_id = sub.id;
    let expected_end = sub.ends_at + Duration::days(30);

    expect_fresh_receipt(&mut mocks);
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(Some(pending.clone())));
    mocks.payments.expect_update_status().returning(|_, _| Ok(()));
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .invoices
        .expect_create()
        .times(1)
        .returning(|insert| Ok(invoice_from(insert)));
    mocks.listings.expect_activate_business().returning(|_| Ok(()));
    mocks
        .subscriptions
        .expect_extend_period()
        .with(eq(sub_id), eq(expected_end))
        .times(1)
        .returning(|_, _| Ok(()));
    mocks.users.expect_find_by_id().returning(|_| Ok(None));
    mocks.subscriptions.expect_update_status().times(0);

    mocks
        .into_usecase(false)
        .process_payment_webhook(notification(
            "994",
            "approved",
            format!("renew_{sub_id}_1767225600"),
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancel_of_canceled_subscription_changes_nothing() {
    let mut mocks = Mocks::default();
    let owner = Uuid::new_v4();
    let sub = subscription(owner, Uuid::new_v4(), SubscriptionStatus::Canceled);
    let sub_id = sub.id;
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks.subscriptions.expect_cancel().times(0);
    mocks.subscriptions.expect_record_cancellation_reason().times(0);
    mocks.outbox.expect_enqueue().times(0);

    let err = mocks
        .into_usecase(false)
        .cancel_subscription(sub_id, owner, CancelSubscriptionModel::default())
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::BadRequest(_)));
}

#[tokio::test]
async fn cancel_by_another_user_is_forbidden() {
    let mut mocks = Mocks::default();
    let sub = subscription(Uuid::new_v4(), Uuid::new_v4(), SubscriptionStatus::Active);
    let sub_id = sub.id;
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks.subscriptions.expect_cancel().times(0);

    let err = mocks
        .into_usecase(false)
        .cancel_subscription(sub_id, Uuid::new_v4(), CancelSubscriptionModel::default())
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::Forbidden(_)));
}

#[tokio::test]
async fn cancel_records_reason_and_emails_owner() {
    let mut mocks = Mocks::default();
    let owner = Uuid::new_v4();
    let business_plan = plan(PlanType::Business, true);
    let sub = subscription(owner, business_plan.id, SubscriptionStatus::Active);
    let sub_id = sub.id;

    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .subscriptions
        .expect_cancel()
        .withf(move |id, _| *id == sub_id)
        .times(1)
        .returning(|_, _| Ok(()));
    mocks
        .subscriptions
        .expect_record_cancellation_reason()
        .withf(|reason| reason.reason == "too_expensive" && reason.feedback.is_none())
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .outbox
        .expect_enqueue()
        .withf(|message| message.kind == NotificationKind::SubscriptionCanceled.as_str())
        .times(1)
        .returning(|_| Ok(Uuid::new_v4()));

    let dto = mocks
        .into_usecase(false)
        .cancel_subscription(
            sub_id,
            owner,
            CancelSubscriptionModel {
                reason: Some("too_expensive".to_string()),
                feedback: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(dto.status, SubscriptionStatus::Canceled);
    assert!(!dto.auto_renew);
    assert!(dto.canceled_at.is_some());
}

#[tokio::test]
async fn renewal_requires_an_active_subscription() {
    let mut mocks = Mocks::default();
    let owner = Uuid::new_v4();
    let sub = subscription(owner, Uuid::new_v4(), SubscriptionStatus::PendingPayment);
    let sub_id = sub.id;
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks.gateway.expect_create_preference().times(0);

    let err = mocks
        .into_usecase(false)
        .renew_subscription(sub_id, Some(owner), PaymentMethod::Pix, None)
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::BadRequest(_)));
}

#[tokio::test]
async fn renewal_opens_checkout_without_moving_the_end_date() {
    let mut mocks = Mocks::default();
    let owner = Uuid::new_v4();
    let business_plan = plan(PlanType::Business, true);
    let sub = subscription(owner, business_plan.id, SubscriptionStatus::Active);
    let sub_id = sub.id;
    let projected = sub.ends_at + Duration::days(30);

    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .gateway
        .expect_create_preference()
        .withf(move |request| {
            request.external_reference.starts_with(&format!("renew_{sub_id}_"))
                && request.callback_url == "https://app.example.com/checkout/done"
                && request.payment_method == PaymentMethod::CreditCard
        })
        .times(1)
        .returning(|_| {
            Ok(CheckoutPreference {
                id: "pref-renew".to_string(),
                init_point: "https://gateway.example.com/checkout/pref-renew".to_string(),
            })
        });
    mocks
        .payments
        .expect_create()
        .withf(|insert| insert.external_reference.starts_with("renew_"))
        .times(1)
        .returning(|insert| {
            let sub = subscription(insert.user_id, Uuid::new_v4(), SubscriptionStatus::Active);
            Ok(payment(&sub, PaymentStatus::Pending))
        });
    mocks.subscriptions.expect_extend_period().times(0);

    let renewal = mocks
        .into_usecase(false)
        .renew_subscription(sub_id, Some(owner), PaymentMethod::CreditCard, None)
        .await
        .unwrap();

    assert_eq!(renewal.preference_id, "pref-renew");
    assert_eq!(renewal.projected_ends_at, projected);
}

#[tokio::test]
async fn expiring_check_only_enqueues_notices() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let first = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::Active);
    let second = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::Active);
    let expected = vec![first.id, second.id];
    let now = Utc::now();

    mocks
        .subscriptions
        .expect_list_active_ending_between()
        .with(eq(now), eq(now + Duration::days(7)))
        .returning(move |_, _| Ok(vec![first.clone(), second.clone()]));
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .outbox
        .expect_enqueue()
        .withf(|message| message.kind == NotificationKind::SubscriptionExpiring.as_str())
        .times(2)
        .returning(|_| Ok(Uuid::new_v4()));
    mocks.subscriptions.expect_update_status().times(0);
    mocks.subscriptions.expect_cancel().times(0);

    let report = mocks
        .into_usecase(false)
        .check_expiring_subscriptions(now)
        .await
        .unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.notified, expected);
}

#[tokio::test]
async fn auto_renewal_batch_collects_each_outcome() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let renewable = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::Active);
    let orphan = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::Active);
    let renewable_id = renewable.id;
    let orphan_id = orphan.id;
    let last_payment = payment(&renewable, PaymentStatus::Paid);

    let lookup = vec![renewable.clone(), orphan.clone()];
    mocks
        .subscriptions
        .expect_list_auto_renewals_ending_between()
        .withf(|from, to| *to - *from == Duration::days(1) && from.time() == NaiveTime::MIN)
        .returning(move |_, _| Ok(vec![renewable.clone(), orphan.clone()]));
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |id| Ok(lookup.iter().find(|sub| sub.id == id).cloned()));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |id| Ok((id == renewable_id).then(|| last_payment.clone())));
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .gateway
        .expect_create_preference()
        .withf(|request| request.payment_method == PaymentMethod::Pix)
        .times(1)
        .returning(|_| {
            Ok(CheckoutPreference {
                id: "pref-auto".to_string(),
                init_point: "https://gateway.example.com/checkout/pref-auto".to_string(),
            })
        });
    mocks.payments.expect_create().times(1).returning(|insert| {
        let sub = subscription(insert.user_id, Uuid::new_v4(), SubscriptionStatus::Active);
        Ok(payment(&sub, PaymentStatus::Pending))
    });

    let results = mocks
        .into_usecase(false)
        .process_auto_renewals(Utc::now())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0],
        AutoRenewalResult {
            subscription_id: renewable_id,
            outcome: AutoRenewalOutcome::Renewed {
                preference_id: "pref-auto".to_string()
            },
        }
    );
    assert_eq!(results[1].subscription_id, orphan_id);
    assert!(matches!(results[1].outcome, AutoRenewalOutcome::Error { .. }));
}

#[tokio::test]
async fn checkout_for_another_users_business_is_forbidden() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let business_id = Uuid::new_v4();

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .listings
        .expect_business_owner()
        .with(eq(business_id))
        .returning(|_| Ok(Some(OWNER)));
    mocks.subscriptions.expect_find_open_for_business().times(0);
    mocks.subscriptions.expect_create().times(0);
    mocks.gateway.expect_create_preference().times(0);

    let err = mocks
        .into_usecase(false)
        .create_payment_preference(command(plan_id, Uuid::new_v4(), Some(business_id)))
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::Forbidden(_)));
}

#[tokio::test]
async fn checkout_for_unknown_professional_is_not_found() {
    let mut mocks = Mocks::default();
    let professional_plan = plan(PlanType::Professional, true);
    let plan_id = professional_plan.id;

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(professional_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .listings
        .expect_professional_owner()
        .returning(|_| Ok(None));
    mocks.subscriptions.expect_create().times(0);

    let mut checkout = command(plan_id, OWNER, None);
    checkout.professional_id = Some(Uuid::new_v4());
    let err = mocks
        .into_usecase(false)
        .create_payment_preference(checkout)
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::NotFound("professional")));
}

#[tokio::test]
async fn admin_may_check_out_any_listing() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let admin_id = Uuid::new_v4();

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user_with_role(id, "admin"))));
    mocks
        .listings
        .expect_business_owner()
        .returning(|_| Ok(Some(OWNER)));
    mocks
        .subscriptions
        .expect_find_open_for_business()
        .returning(|_| Ok(None));
    mocks
        .subscriptions
        .expect_create()
        .times(1)
        .returning(|insert| Ok(subscription(insert.user_id, insert.plan_id, SubscriptionStatus::PendingPayment)));
    mocks.gateway.expect_create_preference().returning(|_| {
        Ok(CheckoutPreference {
            id: "pref-admin".to_string(),
            init_point: "https://gateway.example.com/checkout/pref-admin".to_string(),
        })
    });
    mocks.payments.expect_create().returning(|insert| {
        let sub = subscription(insert.user_id, Uuid::new_v4(), SubscriptionStatus::PendingPayment);
        Ok(payment(&sub, PaymentStatus::Pending))
    });

    let dto = mocks
        .into_usecase(false)
        .create_payment_preference(command(plan_id, admin_id, Some(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(dto.preference_id, "pref-admin");
}

#[tokio::test]
async fn late_notifications_never_reopen_a_paid_payment() {
    for status in ["rejected", "cancelled", "pending", "in_process"] {
        let mut mocks = Mocks::default();
        let sub = subscription(Uuid::new_v4(), Uuid::new_v4(), SubscriptionStatus::Active);
        let paid = payment(&sub, PaymentStatus::Paid);
        let sub_id = sub.id;

        expect_fresh_receipt(&mut mocks);
        mocks
            .subscriptions
            .expect_find_by_id()
            .returning(move |_| Ok(Some(sub.clone())));
        mocks
            .payments
            .expect_find_latest_for_subscription()
            .returning(move |_| Ok(Some(paid.clone())));
        mocks.payments.expect_update_status().times(0);
        mocks.subscriptions.expect_update_status().times(0);
        mocks.invoices.expect_create().times(0);

        let outcome = mocks
            .into_usecase(false)
            .process_payment_webhook(notification("993", status, format!("sub_{sub_id}")))
            .await
            .unwrap();

        assert!(outcome.success, "{status}");
        assert!(!outcome.duplicate, "{status}");
    }
}

#[tokio::test]
async fn refund_of_a_paid_payment_cancels_the_subscription() {
    let mut mocks = Mocks::default();
    let sub = subscription(Uuid::new_v4(), Uuid::new_v4(), SubscriptionStatus::Active);
    let paid = payment(&sub, PaymentStatus::Paid);
    let sub_id = sub.id;

    expect_fresh_receipt(&mut mocks);
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(Some(paid.clone())));
    mocks
        .payments
        .expect_update_status()
        .withf(|_, changes| changes.status == "refunded")
        .times(1)
        .returning(|_, _| Ok(()));
    mocks
        .subscriptions
        .expect_update_status()
        .with(eq(sub_id), eq(SubscriptionStatus::Canceled))
        .times(1)
        .returning(|_, _| Ok(()));
    mocks.invoices.expect_create().times(0);

    mocks
        .into_usecase(false)
        .process_payment_webhook(notification("995", "refunded", format!("sub_{sub_id}")))
        .await
        .unwrap();
}

fn expect_pending_payment_for(mocks: &mut Mocks, sub: SubscriptionEntity) -> Uuid {
    let pending = payment(&sub, PaymentStatus::Pending);
    let payment_id = pending.id;
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(sub.clone())));
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(Some(pending.clone())));
    mocks.payments.expect_update_status().returning(|_, _| Ok(()));
    payment_id
}

#[tokio::test]
async fn invoice_number_clash_fails_the_webhook_instead_of_dropping_the_invoice() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let sub = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::PendingPayment);
    let sub_id = sub.id;

    mocks.receipts.expect_exists().returning(|_, _| Ok(false));
    mocks.receipts.expect_record().times(0);
    expect_pending_payment_for(&mut mocks, sub);
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks.invoices.expect_create().times(1).returning(|_| {
        Err(anyhow::Error::new(ConstraintViolation::Unique(
            "invoices_invoice_number_key".to_string(),
        )))
    });
    mocks.listings.expect_activate_business().times(0);

    let err = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("996", "approved", format!("sub_{sub_id}")))
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::Internal(_)));
}

#[tokio::test]
async fn existing_invoice_for_the_payment_is_reused() {
    let mut mocks = Mocks::default();
    let business_plan = plan(PlanType::Business, true);
    let sub = subscription(Uuid::new_v4(), business_plan.id, SubscriptionStatus::PendingPayment);
    let sub_id = sub.id;

    expect_fresh_receipt(&mut mocks);
    expect_pending_payment_for(&mut mocks, sub);
    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(business_plan.clone())));
    mocks.invoices.expect_create().times(1).returning(|_| {
        Err(anyhow::Error::new(ConstraintViolation::Unique(
            ONE_INVOICE_PER_PAYMENT.to_string(),
        )))
    });
    mocks
        .listings
        .expect_activate_business()
        .times(1)
        .returning(|_| Ok(()));
    mocks.users.expect_find_by_id().returning(|_| Ok(None));
    mocks
        .subscriptions
        .expect_update_status()
        .returning(|_, _| Ok(()));

    let outcome = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("997", "approved", format!("sub_{sub_id}")))
        .await
        .unwrap();

    assert!(outcome.success);
}

#[tokio::test]
async fn approval_for_a_canceled_subscription_does_not_feature_the_listing() {
    let mut mocks = Mocks::default();
    let sub = subscription(Uuid::new_v4(), Uuid::new_v4(), SubscriptionStatus::Canceled);
    let sub_id = sub.id;

    expect_fresh_receipt(&mut mocks);
    let payment_id = expect_pending_payment_for(&mut mocks, sub);
    mocks
        .invoices
        .expect_create()
        .withf(move |insert| insert.payment_id == payment_id)
        .times(1)
        .returning(|insert| Ok(invoice_from(insert)));
    mocks.listings.expect_activate_business().times(0);
    mocks.listings.expect_activate_professional().times(0);
    mocks.subscriptions.expect_extend_period().times(0);
    mocks.subscriptions.expect_update_status().times(0);
    mocks.outbox.expect_enqueue().times(0);

    let outcome = mocks
        .into_usecase(false)
        .process_payment_webhook(notification("998", "approved", format!("sub_{sub_id}")))
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(!outcome.duplicate);
}

#[tokio::test]
async fn gateway_webhook_with_bad_signature_is_unauthorized() {
    let mut mocks = Mocks::default();
    mocks
        .gateway
        .expect_verify_webhook_signature()
        .returning(|_, _, _| Err(anyhow::anyhow!("signature mismatch")));
    mocks.gateway.expect_get_payment().times(0);

    let err = mocks
        .into_usecase(false)
        .handle_gateway_notification(GatewayWebhookRequest {
            topic: Some("payment".to_string()),
            data_id: Some("991".to_string()),
            signature: Some("ts=1,v1=00".to_string()),
            request_id: Some("req-1".to_string()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, UseCaseError::Unauthorized(_)));
}

#[tokio::test]
async fn gateway_webhook_ignores_other_topics() {
    let mut mocks = Mocks::default();
    mocks
        .gateway
        .expect_verify_webhook_signature()
        .returning(|_, _, _| Ok(()));
    mocks.gateway.expect_get_payment().times(0);

    let outcome = mocks
        .into_usecase(false)
        .handle_gateway_notification(GatewayWebhookRequest {
            topic: Some("merchant_order".to_string()),
            data_id: Some("5".to_string()),
            ..GatewayWebhookRequest::default()
        })
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(!outcome.duplicate);
}

/// Shared rows behind the stateful mocks used by the end-to-end scenarios.
#[derive(Default)]
struct Ledger {
    subscription: Mutex<Option<SubscriptionEntity>>,
    payment: Mutex<Option<PaymentEntity>>,
    invoices: Mutex<Vec<InvoiceEntity>>,
    receipts: Mutex<Vec<String>>,
    references: Mutex<Vec<String>>,
}

fn stateful_mocks(ledger: &Arc<Ledger>, listing_plan: PlanEntity) -> Mocks {
    let mut mocks = Mocks::default();

    mocks
        .plans
        .expect_find_by_id()
        .returning(move |_| Ok(Some(listing_plan.clone())));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id))));
    mocks
        .listings
        .expect_business_owner()
        .returning(|_| Ok(Some(OWNER)));
    mocks
        .subscriptions
        .expect_find_open_for_business()
        .returning(|_| Ok(None));

    let state = Arc::clone(ledger);
    mocks.subscriptions.expect_create().returning(move |insert| {
        let now = Utc::now();
        let created = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: insert.user_id,
            plan_id: insert.plan_id,
            business_id: insert.business_id,
            professional_id: insert.professional_id,
            status: insert.status,
            starts_at: insert.starts_at,
            ends_at: insert.ends_at,
            auto_renew: insert.auto_renew,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        };
        *state.subscription.lock().unwrap() = Some(created.clone());
        Ok(created)
    });
    let state = Arc::clone(ledger);
    mocks
        .subscriptions
        .expect_find_by_id()
        .returning(move |id| {
            Ok(state
                .subscription
                .lock()
                .unwrap()
                .clone()
                .filter(|sub| sub.id == id))
        });
    let state = Arc::clone(ledger);
    mocks
        .subscriptions
        .expect_update_status()
        .returning(move |_, status| {
            if let Some(sub) = state.subscription.lock().unwrap().as_mut() {
                sub.status = status.as_str().to_string();
            }
            Ok(())
        });

    let state = Arc::clone(ledger);
    mocks.gateway.expect_create_preference().returning(move |request| {
        state
            .references
            .lock()
            .unwrap()
            .push(request.external_reference);
        Ok(CheckoutPreference {
            id: "pref-e2e".to_string(),
            init_point: "https://gateway.example.com/checkout/pref-e2e".to_string(),
        })
    });

    let state = Arc::clone(ledger);
    mocks.payments.expect_create().returning(move |insert| {
        let now = Utc::now();
        let created = PaymentEntity {
            id: Uuid::new_v4(),
            subscription_id: insert.subscription_id,
            user_id: insert.user_id,
            amount_minor: insert.amount_minor,
            status: insert.status,
            payment_method: insert.payment_method,
            preference_id: insert.preference_id,
            external_reference: insert.external_reference,
            provider_payment_id: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        *state.payment.lock().unwrap() = Some(created.clone());
        Ok(created)
    });
    let state = Arc::clone(ledger);
    mocks
        .payments
        .expect_find_latest_for_subscription()
        .returning(move |_| Ok(state.payment.lock().unwrap().clone()));
    let state = Arc::clone(ledger);
    mocks
        .payments
        .expect_update_status()
        .returning(move |_, changes| {
            if let Some(payment) = state.payment.lock().unwrap().as_mut() {
                payment.status = changes.status;
                payment.provider_payment_id = changes.provider_payment_id;
                payment.paid_at = changes.paid_at;
            }
            Ok(())
        });

    let state = Arc::clone(ledger);
    mocks.invoices.expect_create().returning(move |insert| {
        let invoice = invoice_from(insert);
        state.invoices.lock().unwrap().push(invoice.clone());
        Ok(invoice)
    });
    mocks.listings.expect_activate_business().returning(|_| Ok(()));

    let state = Arc::clone(ledger);
    mocks.receipts.expect_exists().returning(move |_, key| {
        Ok(state.receipts.lock().unwrap().contains(&key))
    });
    let state = Arc::clone(ledger);
    mocks.receipts.expect_record().returning(move |_, key| {
        state.receipts.lock().unwrap().push(key);
        Ok(())
    });
    mocks.outbox.expect_enqueue().returning(|_| Ok(Uuid::new_v4()));

    mocks
}

#[tokio::test]
async fn checkout_then_approved_webhook_activates_once() {
    let ledger = Arc::new(Ledger::default());
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let mut mocks = stateful_mocks(&ledger, business_plan);
    mocks
        .gateway
        .expect_get_payment()
        .withf(|id| id == "5001")
        .returning({
            let ledger = Arc::clone(&ledger);
            move |_| {
                Ok(GatewayPayment {
                    id: "5001".to_string(),
                    status: "approved".to_string(),
                    external_reference: ledger.references.lock().unwrap().first().cloned(),
                })
            }
        });
    mocks
        .gateway
        .expect_verify_webhook_signature()
        .returning(|_, _, _| Ok(()));
    let usecase = mocks.into_usecase(false);

    let preference = usecase
        .create_payment_preference(command(plan_id, OWNER, Some(Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(
        ledger.subscription.lock().unwrap().as_ref().unwrap().status(),
        SubscriptionStatus::PendingPayment
    );

    let delivery = GatewayWebhookRequest {
        topic: Some("payment".to_string()),
        data_id: Some("5001".to_string()),
        signature: Some("ts=1,v1=ab".to_string()),
        request_id: Some("req-9".to_string()),
    };
    let first = usecase
        .handle_gateway_notification(delivery.clone())
        .await
        .unwrap();
    let second = usecase.handle_gateway_notification(delivery).await.unwrap();

    assert!(!first.duplicate);
    assert!(second.duplicate);
    assert_eq!(ledger.invoices.lock().unwrap().len(), 1);

    let subscription = ledger.subscription.lock().unwrap().clone().unwrap();
    assert_eq!(subscription.id, preference.subscription_id);
    assert_eq!(subscription.status(), SubscriptionStatus::Active);
    let payment = ledger.payment.lock().unwrap().clone().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Paid);
    assert_eq!(payment.provider_payment_id.as_deref(), Some("5001"));
}

#[tokio::test]
async fn checkout_then_rejected_webhook_cancels_without_invoice() {
    let ledger = Arc::new(Ledger::default());
    let business_plan = plan(PlanType::Business, true);
    let plan_id = business_plan.id;
    let usecase = stateful_mocks(&ledger, business_plan).into_usecase(false);

    usecase
        .create_payment_preference(command(plan_id, OWNER, Some(Uuid::new_v4())))
        .await
        .unwrap();
    let reference = ledger.references.lock().unwrap()[0].clone();

    let outcome = usecase
        .process_payment_webhook(notification("5002", "rejected", reference))
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(ledger.invoices.lock().unwrap().is_empty());
    let subscription = ledger.subscription.lock().unwrap().clone().unwrap();
    assert_eq!(subscription.status(), SubscriptionStatus::Canceled);
    let payment = ledger.payment.lock().unwrap().clone().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Failed);
    assert!(payment.paid_at.is_none());
}
