use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use crates::{
    domain::{
        entities::{
            cancellation_reasons::InsertCancellationReasonEntity,
            invoices::{InsertInvoiceEntity, ONE_INVOICE_PER_PAYMENT},
            payments::{InsertPaymentEntity, PaymentEntity, UpdatePaymentStatusEntity},
            plans::PlanEntity,
            subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
            users::UserEntity,
        },
        repositories::{
            constraint_violations::ConstraintViolation,
            invoices::InvoiceRepository, listing_activation::ListingActivationRepository,
            notification_outbox::NotificationOutboxRepository, payments::PaymentRepository,
            plans::PlanRepository, subscriptions::SubscriptionRepository,
            users::UserRepository, webhook_receipts::WebhookReceiptRepository,
        },
        value_objects::{
            enums::{
                gateway_payment_statuses::GatewayPaymentStatus, payment_methods::PaymentMethod,
                payment_statuses::PaymentStatus, plan_types::PlanType,
                subscription_statuses::SubscriptionStatus,
                user_roles::UserRole,
            },
            external_reference::ExternalReference,
            notifications::OutboundNotification,
            plans::PlanDto,
            subscriptions::{
                AutoRenewalOutcome, AutoRenewalResult, CancelSubscriptionModel,
                CreatePreferenceCommand, ExpiringSubscriptionsReport, InvoiceDto,
                PaymentNotification, PreferenceDto, RenewalDto, SubscriptionDto, WebhookOutcome,
            },
        },
    },
    payments::mercado_pago_client::{CheckoutPreference, CheckoutRequest},
    retry::{RetryOptions, with_retry},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    errors::{UseCaseError, UseCaseResult},
    payment_gateway::PaymentGateway,
};

/// Receipt source for gateway payment notifications.
pub const MERCADO_PAGO_SOURCE: &str = "mercado_pago";
const EXPIRY_NOTICE_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Subscriptions start `active` at checkout instead of `pending_payment`.
    pub eager_activation: bool,
    pub notification_url: Option<String>,
    pub default_callback_url: String,
}

/// Raw gateway webhook delivery as it arrives over HTTP.
#[derive(Debug, Clone, Default)]
pub struct GatewayWebhookRequest {
    pub topic: Option<String>,
    pub data_id: Option<String>,
    pub signature: Option<String>,
    pub request_id: Option<String>,
}

pub struct PaymentUseCase<P, U, S, Pay, Inv, L, R, O, G>
where
    P: PlanRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    L: ListingActivationRepository + Send + Sync + 'static,
    R: WebhookReceiptRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    plan_repo: Arc<P>,
    user_repo: Arc<U>,
    subscription_repo: Arc<S>,
    payment_repo: Arc<Pay>,
    invoice_repo: Arc<Inv>,
    listing_activation_repo: Arc<L>,
    receipt_repo: Arc<R>,
    outbox_repo: Arc<O>,
    gateway: Arc<G>,
    settings: PaymentSettings,
    read_retry: RetryOptions,
}

impl<P, U, S, Pay, Inv, L, R, O, G> PaymentUseCase<P, U, S, Pay, Inv, L, R, O, G>
where
    P: PlanRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    L: ListingActivationRepository + Send + Sync + 'static,
    R: WebhookReceiptRepository + Send + Sync + 'static,
    O: NotificationOutboxRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plan_repo: Arc<P>,
        user_repo: Arc<U>,
        subscription_repo: Arc<S>,
        payment_repo: Arc<Pay>,
        invoice_repo: Arc<Inv>,
        listing_activation_repo: Arc<L>,
        receipt_repo: Arc<R>,
        outbox_repo: Arc<O>,
        gateway: Arc<G>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            plan_repo,
            user_repo,
            subscription_repo,
            payment_repo,
            invoice_repo,
            listing_activation_repo,
            receipt_repo,
            outbox_repo,
            gateway,
            settings,
            read_retry: RetryOptions::default(),
        }
    }

    #[must_use]
    pub fn with_read_retry(mut self, options: RetryOptions) -> Self {
        self.read_retry = options;
        self
    }

    pub fn callback_or_default(&self, callback_url: Option<String>) -> String {
        callback_url.unwrap_or_else(|| self.settings.default_callback_url.clone())
    }

    pub async fn list_active_plans(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = with_retry(&self.read_retry, || self.plan_repo.list_active_plans())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to list active plans");
                UseCaseError::Internal(err)
            })?;

        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn list_subscriptions_for_user(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Vec<SubscriptionDto>> {
        let subscriptions = with_retry(&self.read_retry, || {
            self.subscription_repo.list_for_user(user_id)
        })
        .await
        .map_err(|err| {
            error!(%user_id, db_error = ?err, "payments: failed to list subscriptions");
            UseCaseError::Internal(err)
        })?;

        Ok(subscriptions.into_iter().map(SubscriptionDto::from).collect())
    }

    pub async fn list_invoices_for_user(&self, user_id: Uuid) -> UseCaseResult<Vec<InvoiceDto>> {
        let invoices = with_retry(&self.read_retry, || self.invoice_repo.list_for_user(user_id))
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "payments: failed to list invoices");
                UseCaseError::Internal(err)
            })?;

        Ok(invoices.into_iter().map(InvoiceDto::from).collect())
    }

    pub async fn create_payment_preference(
        &self,
        command: CreatePreferenceCommand,
    ) -> UseCaseResult<PreferenceDto> {
        let user_id = command.user_id;
        let plan_id = command.plan_id;
        info!(
            %user_id,
            %plan_id,
            payment_method = command.payment_method.as_str(),
            "payments: create preference requested"
        );

        let plan = self.load_plan(plan_id).await?;
        if !plan.is_active {
            warn!(%plan_id, "payments: checkout refused for inactive plan");
            return Err(UseCaseError::BadRequest("plan is not active".to_string()));
        }

        let user = self.load_user(user_id).await?;
        let (business_id, professional_id) =
            listing_target(plan.plan_type, command.business_id, command.professional_id)?;
        self.ensure_listing_owner(&user, business_id, professional_id)
            .await?;
        self.ensure_no_open_subscription(business_id, professional_id)
            .await?;

        let now = Utc::now();
        let status = SubscriptionStatus::initial(self.settings.eager_activation);
        let subscription = self
            .subscription_repo
            .create(InsertSubscriptionEntity {
                user_id,
                plan_id,
                business_id,
                professional_id,
                status: status.as_str().to_string(),
                starts_at: now,
                ends_at: now + plan_duration(&plan),
                auto_renew: true,
            })
            .await
            .map_err(|err| {
                error!(%user_id, %plan_id, db_error = ?err, "payments: failed to create subscription");
                UseCaseError::from_write(err, "listing already has an open subscription")
            })?;

        if command.card_token.is_some() {
            info!(subscription_id = %subscription.id, "payments: card token supplied, handled by hosted checkout");
        }

        let reference = ExternalReference::Subscription(subscription.id);
        let preference = match self
            .open_checkout(
                &plan,
                &user,
                subscription.id,
                reference,
                command.payment_method,
                command.callback_url,
                command.coupon_code.as_deref(),
            )
            .await
        {
            Ok(preference) => preference,
            Err(err) => {
                self.release_subscription(subscription.id).await;
                return Err(err);
            }
        };

        info!(
            subscription_id = %subscription.id,
            preference_id = %preference.id,
            status = %status,
            "payments: preference created"
        );

        Ok(PreferenceDto {
            preference_id: preference.id,
            init_point: preference.init_point,
            subscription_id: subscription.id,
        })
    }

    /// Verifies and unpacks a raw gateway delivery, then reconciles it.
    pub async fn handle_gateway_notification(
        &self,
        request: GatewayWebhookRequest,
    ) -> UseCaseResult<WebhookOutcome> {
        let GatewayWebhookRequest {
            topic,
            data_id,
            signature,
            request_id,
        } = request;

        self.gateway
            .verify_webhook_signature(
                signature.as_deref().unwrap_or_default(),
                request_id,
                data_id.clone(),
            )
            .map_err(|err| {
                warn!(error = %err, "payments: webhook signature rejected");
                UseCaseError::Unauthorized("invalid webhook signature".to_string())
            })?;

        if topic.as_deref() != Some("payment") {
            info!(topic = ?topic, "payments: ignoring non-payment notification");
            return Ok(WebhookOutcome {
                success: true,
                duplicate: false,
            });
        }

        let data_id = data_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| UseCaseError::BadRequest("missing payment id".to_string()))?;

        let payment = self.gateway.get_payment(&data_id).await.map_err(|err| {
            error!(payment_id = %data_id, error = ?err, "payments: failed to fetch gateway payment");
            UseCaseError::Internal(err)
        })?;

        let external_reference = payment.external_reference.ok_or_else(|| {
            warn!(payment_id = %payment.id, "payments: gateway payment has no external reference");
            UseCaseError::BadRequest("payment has no external reference".to_string())
        })?;

        self.process_payment_webhook(PaymentNotification {
            id: payment.id,
            status: payment.status,
            external_reference,
        })
        .await
    }

    pub async fn process_payment_webhook(
        &self,
        notification: PaymentNotification,
    ) -> UseCaseResult<WebhookOutcome> {
        let reference = ExternalReference::parse(&notification.external_reference).map_err(|err| {
            warn!(
                payment_id = %notification.id,
                external_reference = %notification.external_reference,
                "payments: malformed external reference"
            );
            UseCaseError::BadRequest(err.to_string())
        })?;

        let event_key = format!(
            "{}:{}",
            notification.id,
            notification.status.to_ascii_lowercase()
        );
        let already_seen = self
            .receipt_repo
            .exists(MERCADO_PAGO_SOURCE.to_string(), event_key.clone())
            .await
            .map_err(|err| {
                error!(%event_key, db_error = ?err, "payments: failed to check webhook receipt");
                UseCaseError::Internal(err)
            })?;
        if already_seen {
            info!(%event_key, "payments: duplicate webhook delivery");
            return Ok(WebhookOutcome {
                success: true,
                duplicate: true,
            });
        }

        let subscription = self.load_subscription(reference.subscription_id()).await?;
        let payment = self
            .payment_repo
            .find_latest_for_subscription(subscription.id)
            .await
            .map_err(|err| {
                error!(subscription_id = %subscription.id, db_error = ?err, "payments: failed to load payment");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("payment"))?;

        let gateway_status = GatewayPaymentStatus::parse(&notification.status);
        let next_status = gateway_status.payment_status();
        let current_status = payment.status();
        let settles = next_status == PaymentStatus::Paid;

        if !current_status.can_become(next_status) {
            info!(
                payment_id = %payment.id,
                provider_payment_id = %notification.id,
                from = %current_status,
                to = %next_status,
                "payments: notification ignored, payment already settled"
            );
            self.record_receipt(event_key).await?;
            return Ok(WebhookOutcome {
                success: true,
                duplicate: current_status == next_status,
            });
        }

        let now = Utc::now();
        self.payment_repo
            .update_status(
                payment.id,
                UpdatePaymentStatusEntity {
                    status: next_status.as_str().to_string(),
                    provider_payment_id: Some(notification.id.clone()),
                    paid_at: if settles { Some(now) } else { payment.paid_at },
                    updated_at: now,
                },
            )
            .await
            .map_err(|err| {
                error!(payment_id = %payment.id, db_error = ?err, "payments: failed to update payment");
                UseCaseError::Internal(err)
            })?;

        let current = subscription.status();
        if settles {
            if current.is_terminal() {
                self.record_orphan_payment(&subscription, &payment, now)
                    .await?;
            } else {
                self.settle(&subscription, &payment, reference, now).await?;
            }
        }

        if let Some(target) = gateway_status.subscription_status() {
            if target != current && !current.is_terminal() {
                self.subscription_repo
                    .update_status(subscription.id, target)
                    .await
                    .map_err(|err| {
                        error!(subscription_id = %subscription.id, db_error = ?err, "payments: failed to update subscription status");
                        UseCaseError::Internal(err)
                    })?;
                info!(
                    subscription_id = %subscription.id,
                    from = %current,
                    to = %target,
                    "payments: subscription status changed"
                );
            }
        }

        self.record_receipt(event_key).await?;

        info!(
            subscription_id = %subscription.id,
            payment_id = %payment.id,
            payment_status = next_status.as_str(),
            "payments: webhook processed"
        );

        Ok(WebhookOutcome {
            success: true,
            duplicate: false,
        })
    }

    /// `caller` is the requesting user for HTTP renewals and `None` for the
    /// scheduled sweep.
    pub async fn renew_subscription(
        &self,
        subscription_id: Uuid,
        caller: Option<Uuid>,
        payment_method: PaymentMethod,
        callback_url: Option<String>,
    ) -> UseCaseResult<RenewalDto> {
        let subscription = self.load_subscription(subscription_id).await?;
        if let Some(caller) = caller {
            if subscription.user_id != caller {
                warn!(%subscription_id, %caller, "payments: renewal by non-owner");
                return Err(UseCaseError::Forbidden(
                    "subscription belongs to another user".to_string(),
                ));
            }
        }
        if subscription.status() != SubscriptionStatus::Active {
            return Err(UseCaseError::BadRequest(
                "only active subscriptions can be renewed".to_string(),
            ));
        }

        let plan = self.load_plan(subscription.plan_id).await?;
        let user = self.load_user(subscription.user_id).await?;
        let projected_ends_at = subscription.ends_at + plan_duration(&plan);
        let reference = ExternalReference::Renewal {
            subscription_id,
            issued_at: Utc::now().timestamp(),
        };

        let preference = self
            .open_checkout(
                &plan,
                &user,
                subscription_id,
                reference,
                payment_method,
                self.callback_or_default(callback_url),
                None,
            )
            .await?;

        info!(
            %subscription_id,
            preference_id = %preference.id,
            %projected_ends_at,
            "payments: renewal preference created"
        );

        Ok(RenewalDto {
            preference_id: preference.id,
            init_point: preference.init_point,
            subscription_id,
            projected_ends_at,
        })
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        user_id: Uuid,
        model: CancelSubscriptionModel,
    ) -> UseCaseResult<SubscriptionDto> {
        let mut subscription = self.load_subscription(subscription_id).await?;
        if subscription.user_id != user_id {
            warn!(%subscription_id, %user_id, "payments: cancel by non-owner");
            return Err(UseCaseError::Forbidden(
                "subscription belongs to another user".to_string(),
            ));
        }
        if subscription.status() == SubscriptionStatus::Canceled {
            return Err(UseCaseError::BadRequest(
                "subscription is already canceled".to_string(),
            ));
        }

        let now = Utc::now();
        self.subscription_repo
            .cancel(subscription_id, now)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "payments: failed to cancel subscription");
                UseCaseError::Internal(err)
            })?;

        if let Some(reason) = model.reason {
            if let Err(err) = self
                .subscription_repo
                .record_cancellation_reason(InsertCancellationReasonEntity {
                    subscription_id,
                    user_id,
                    reason,
                    feedback: model.feedback,
                })
                .await
            {
                error!(%subscription_id, db_error = ?err, "payments: failed to record cancellation reason");
            }
        }

        match self.find_plan_and_user(&subscription).await {
            Some((plan, user)) => {
                self.notify(OutboundNotification::subscription_canceled(
                    &user.email,
                    &plan.name,
                ))
                .await
            }
            None => warn!(%subscription_id, "payments: cancellation email skipped"),
        }

        info!(%subscription_id, %user_id, "payments: subscription canceled");

        subscription.status = SubscriptionStatus::Canceled.as_str().to_string();
        subscription.auto_renew = false;
        subscription.canceled_at = Some(now);
        subscription.updated_at = now;
        Ok(SubscriptionDto::from(subscription))
    }

    /// Enqueues an expiry notice for each active subscription ending within
    /// the next week. Subscriptions themselves are left untouched.
    pub async fn check_expiring_subscriptions(
        &self,
        now: DateTime<Utc>,
    ) -> UseCaseResult<ExpiringSubscriptionsReport> {
        let until = now + Duration::days(EXPIRY_NOTICE_DAYS);
        let subscriptions = self
            .subscription_repo
            .list_active_ending_between(now, until)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to list expiring subscriptions");
                UseCaseError::Internal(err)
            })?;

        let checked = subscriptions.len();
        let mut notified = Vec::with_capacity(checked);
        for subscription in subscriptions {
            let Some((plan, user)) = self.find_plan_and_user(&subscription).await else {
                warn!(subscription_id = %subscription.id, "payments: expiry notice skipped");
                continue;
            };
            let notice = OutboundNotification::subscription_expiring(
                &user.email,
                &plan.name,
                subscription.ends_at,
            );
            match self.enqueue(notice).await {
                Ok(()) => notified.push(subscription.id),
                Err(err) => {
                    error!(subscription_id = %subscription.id, db_error = ?err, "payments: failed to enqueue expiry notice")
                }
            }
        }

        info!(checked, notified = notified.len(), "payments: expiring subscriptions checked");
        Ok(ExpiringSubscriptionsReport { checked, notified })
    }

    /// Renews every auto-renewing subscription ending today (UTC). One
    /// failure never aborts the rest of the batch.
    pub async fn process_auto_renewals(
        &self,
        now: DateTime<Utc>,
    ) -> UseCaseResult<Vec<AutoRenewalResult>> {
        let from = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let to = from + Duration::days(1);
        let subscriptions = self
            .subscription_repo
            .list_auto_renewals_ending_between(from, to)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to list auto renewals");
                UseCaseError::Internal(err)
            })?;

        let mut results = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let outcome = match self.auto_renew(&subscription).await {
                Ok(renewal) => AutoRenewalOutcome::Renewed {
                    preference_id: renewal.preference_id,
                },
                Err(err) => {
                    warn!(subscription_id = %subscription.id, error = %err, "payments: auto renewal failed");
                    AutoRenewalOutcome::Error {
                        message: err.to_string(),
                    }
                }
            };
            results.push(AutoRenewalResult {
                subscription_id: subscription.id,
                outcome,
            });
        }

        info!(processed = results.len(), "payments: auto renewals processed");
        Ok(results)
    }

    async fn auto_renew(&self, subscription: &SubscriptionEntity) -> UseCaseResult<RenewalDto> {
        let method = self
            .payment_repo
            .find_latest_for_subscription(subscription.id)
            .await
            .map_err(UseCaseError::Internal)?
            .as_ref()
            .and_then(PaymentEntity::payment_method)
            .ok_or_else(|| {
                UseCaseError::BadRequest("no previous payment method to renew with".to_string())
            })?;

        self.renew_subscription(subscription.id, None, method, None)
            .await
    }

    /// Invoice, listing activation, renewal extension and confirmation email
    /// for a payment that just became paid.
    async fn settle(
        &self,
        subscription: &SubscriptionEntity,
        payment: &PaymentEntity,
        reference: ExternalReference,
        now: DateTime<Utc>,
    ) -> UseCaseResult<()> {
        let plan = self.load_plan(subscription.plan_id).await?;

        let invoice_number = self.issue_invoice(subscription, payment, now).await?;

        if let Some(business_id) = subscription.business_id {
            self.listing_activation_repo
                .activate_business(business_id)
                .await
                .map_err(|err| {
                    error!(%business_id, db_error = ?err, "payments: failed to activate business");
                    UseCaseError::Internal(err)
                })?;
        }
        if let Some(professional_id) = subscription.professional_id {
            self.listing_activation_repo
                .activate_professional(professional_id)
                .await
                .map_err(|err| {
                    error!(%professional_id, db_error = ?err, "payments: failed to activate professional");
                    UseCaseError::Internal(err)
                })?;
        }

        if reference.is_renewal() {
            let ends_at = subscription.ends_at + plan_duration(&plan);
            self.subscription_repo
                .extend_period(subscription.id, ends_at)
                .await
                .map_err(|err| {
                    error!(subscription_id = %subscription.id, db_error = ?err, "payments: failed to extend subscription");
                    UseCaseError::Internal(err)
                })?;
            info!(subscription_id = %subscription.id, %ends_at, "payments: subscription extended");
        }

        match self.user_repo.find_by_id(subscription.user_id).await {
            Ok(Some(user)) => {
                self.notify(OutboundNotification::payment_confirmed(
                    &user.email,
                    &plan.name,
                    &invoice_number,
                    payment.amount_minor,
                    &plan.currency,
                ))
                .await
            }
            Ok(None) => warn!(user_id = %subscription.user_id, "payments: confirmation email skipped, user missing"),
            Err(err) => error!(db_error = ?err, "payments: failed to load user for confirmation email"),
        }

        Ok(())
    }

    /// A payment that cleared after its subscription was canceled is recorded
    /// and invoiced, but the listing is left alone so it can be refunded.
    async fn record_orphan_payment(
        &self,
        subscription: &SubscriptionEntity,
        payment: &PaymentEntity,
        now: DateTime<Utc>,
    ) -> UseCaseResult<()> {
        warn!(
            subscription_id = %subscription.id,
            payment_id = %payment.id,
            amount_minor = payment.amount_minor,
            "payments: payment approved for a canceled subscription, refund required"
        );
        self.issue_invoice(subscription, payment, now).await?;
        Ok(())
    }

    /// Only a repeat for the same payment counts as already invoiced; any
    /// other conflict fails the webhook so the gateway redelivers it.
    async fn issue_invoice(
        &self,
        subscription: &SubscriptionEntity,
        payment: &PaymentEntity,
        now: DateTime<Utc>,
    ) -> UseCaseResult<String> {
        let invoice_number = InsertInvoiceEntity::invoice_number(payment.id, now);
        match self
            .invoice_repo
            .create(InsertInvoiceEntity {
                payment_id: payment.id,
                subscription_id: subscription.id,
                user_id: subscription.user_id,
                invoice_number: invoice_number.clone(),
                amount_minor: payment.amount_minor,
                issued_at: now,
            })
            .await
        {
            Ok(invoice) => {
                info!(invoice_id = %invoice.id, %invoice_number, "payments: invoice issued");
            }
            Err(err) => match ConstraintViolation::find(&err) {
                Some(ConstraintViolation::Unique(constraint))
                    if constraint == ONE_INVOICE_PER_PAYMENT =>
                {
                    warn!(payment_id = %payment.id, "payments: payment already invoiced");
                }
                _ => {
                    error!(payment_id = %payment.id, db_error = ?err, "payments: failed to issue invoice");
                    return Err(UseCaseError::Internal(err));
                }
            },
        }
        Ok(invoice_number)
    }

    #[allow(clippy::too_many_arguments)]
    async fn open_checkout(
        &self,
        plan: &PlanEntity,
        user: &UserEntity,
        subscription_id: Uuid,
        reference: ExternalReference,
        payment_method: PaymentMethod,
        callback_url: String,
        coupon_code: Option<&str>,
    ) -> UseCaseResult<CheckoutPreference> {
        let amount_minor = (plan.price_minor - coupon_discount_minor(coupon_code)).max(0);
        let external_reference = reference.to_string();

        let mut metadata = HashMap::new();
        metadata.insert("subscription_id".to_string(), subscription_id.to_string());
        metadata.insert("plan_id".to_string(), plan.id.to_string());
        metadata.insert("user_id".to_string(), user.id.to_string());
        if let Some(code) = coupon_code {
            metadata.insert("coupon_code".to_string(), code.to_string());
        }

        let preference = self
            .gateway
            .create_preference(CheckoutRequest {
                item_id: plan.id.to_string(),
                title: plan.name.clone(),
                unit_price_minor: amount_minor,
                currency: plan.currency.clone(),
                payment_method,
                external_reference: external_reference.clone(),
                callback_url,
                notification_url: self.settings.notification_url.clone(),
                payer_email: Some(user.email.clone()),
                metadata,
            })
            .await
            .map_err(|err| {
                error!(%subscription_id, error = ?err, "payments: gateway rejected preference");
                UseCaseError::Internal(err)
            })?;

        self.payment_repo
            .create(InsertPaymentEntity {
                subscription_id,
                user_id: user.id,
                amount_minor,
                status: PaymentStatus::Pending.as_str().to_string(),
                payment_method: payment_method.as_str().to_string(),
                preference_id: Some(preference.id.clone()),
                external_reference,
            })
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "payments: failed to record pending payment");
                UseCaseError::Internal(err)
            })?;

        Ok(preference)
    }

    /// Only the listing owner or an admin may buy a plan for a listing.
    async fn ensure_listing_owner(
        &self,
        user: &UserEntity,
        business_id: Option<Uuid>,
        professional_id: Option<Uuid>,
    ) -> UseCaseResult<()> {
        let (owner, resource) = match (business_id, professional_id) {
            (Some(business_id), _) => (
                self.listing_activation_repo.business_owner(business_id).await,
                "business",
            ),
            (None, Some(professional_id)) => (
                self.listing_activation_repo
                    .professional_owner(professional_id)
                    .await,
                "professional",
            ),
            (None, None) => return Ok(()),
        };

        let owner = owner
            .map_err(|err| {
                error!(resource, db_error = ?err, "payments: failed to look up listing owner");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound(resource))?;

        if owner != user.id && user.role() != UserRole::Admin {
            warn!(user_id = %user.id, resource, "payments: checkout for a listing owned by someone else");
            return Err(UseCaseError::Forbidden(format!(
                "{resource} belongs to another user"
            )));
        }
        Ok(())
    }

    async fn ensure_no_open_subscription(
        &self,
        business_id: Option<Uuid>,
        professional_id: Option<Uuid>,
    ) -> UseCaseResult<()> {
        let open = match (business_id, professional_id) {
            (Some(business_id), _) => {
                self.subscription_repo
                    .find_open_for_business(business_id)
                    .await
            }
            (None, Some(professional_id)) => {
                self.subscription_repo
                    .find_open_for_professional(professional_id)
                    .await
            }
            (None, None) => return Ok(()),
        }
        .map_err(|err| {
            error!(db_error = ?err, "payments: failed to look up open subscriptions");
            UseCaseError::Internal(err)
        })?;

        match open {
            Some(existing) => {
                warn!(subscription_id = %existing.id, "payments: listing already subscribed");
                Err(UseCaseError::Conflict(
                    "listing already has an open subscription".to_string(),
                ))
            }
            None => Ok(()),
        }
    }

    /// Frees the listing slot when checkout could not be opened.
    async fn release_subscription(&self, subscription_id: Uuid) {
        if let Err(err) = self
            .subscription_repo
            .cancel(subscription_id, Utc::now())
            .await
        {
            error!(%subscription_id, db_error = ?err, "payments: failed to release subscription");
        }
    }

    async fn load_plan(&self, plan_id: Uuid) -> UseCaseResult<PlanEntity> {
        self.plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "payments: failed to load plan");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("plan"))
    }

    async fn load_user(&self, user_id: Uuid) -> UseCaseResult<UserEntity> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "payments: failed to load user");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("user"))
    }

    async fn load_subscription(&self, subscription_id: Uuid) -> UseCaseResult<SubscriptionEntity> {
        self.subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "payments: failed to load subscription");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("subscription"))
    }

    async fn find_plan_and_user(
        &self,
        subscription: &SubscriptionEntity,
    ) -> Option<(PlanEntity, UserEntity)> {
        let plan = self.load_plan(subscription.plan_id).await.ok()?;
        let user = self.load_user(subscription.user_id).await.ok()?;
        Some((plan, user))
    }

    async fn record_receipt(&self, event_key: String) -> UseCaseResult<()> {
        self.receipt_repo
            .record(MERCADO_PAGO_SOURCE.to_string(), event_key)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to record webhook receipt");
                UseCaseError::Internal(err)
            })
    }

    async fn enqueue(&self, notification: OutboundNotification) -> AnyResult<()> {
        self.outbox_repo
            .enqueue(notification.to_entity(Utc::now()))
            .await
            .map(|_| ())
    }

    async fn notify(&self, notification: OutboundNotification) {
        let kind = notification.kind.as_str();
        if let Err(err) = self.enqueue(notification).await {
            error!(kind, db_error = ?err, "payments: failed to enqueue notification");
        }
    }
}

fn plan_duration(plan: &PlanEntity) -> Duration {
    Duration::days(i64::from(plan.duration_days))
}

/// No coupon program exists yet, so every code is worth nothing.
fn coupon_discount_minor(_coupon_code: Option<&str>) -> i32 {
    0
}

fn listing_target(
    plan_type: PlanType,
    business_id: Option<Uuid>,
    professional_id: Option<Uuid>,
) -> UseCaseResult<(Option<Uuid>, Option<Uuid>)> {
    match plan_type {
        PlanType::Business => business_id
            .map(|id| (Some(id), None))
            .ok_or_else(|| UseCaseError::BadRequest("business plans require a business_id".to_string())),
        PlanType::Professional => professional_id.map(|id| (None, Some(id))).ok_or_else(|| {
            UseCaseError::BadRequest("professional plans require a professional_id".to_string())
        }),
        PlanType::Job => Ok((None, None)),
    }
}

#[cfg(test)]
mod tests;
