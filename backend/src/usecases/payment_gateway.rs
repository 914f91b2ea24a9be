use anyhow::Result;
use async_trait::async_trait;
use crates::payments::mercado_pago_client::{
    CheckoutPreference, CheckoutRequest, GatewayPayment, MercadoPagoClient,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, request: CheckoutRequest) -> Result<CheckoutPreference>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment>;

    fn verify_webhook_signature(
        &self,
        signature_header: &str,
        request_id: Option<String>,
        data_id: Option<String>,
    ) -> Result<()>;
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(&self, request: CheckoutRequest) -> Result<CheckoutPreference> {
        MercadoPagoClient::create_preference(self, &request).await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        MercadoPagoClient::get_payment(self, payment_id).await
    }

    fn verify_webhook_signature(
        &self,
        signature_header: &str,
        request_id: Option<String>,
        data_id: Option<String>,
    ) -> Result<()> {
        MercadoPagoClient::verify_webhook_signature(
            self,
            signature_header,
            request_id.as_deref(),
            data_id.as_deref(),
        )
    }
}
