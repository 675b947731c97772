//! Payment API tools. Registered only when an API key is configured.

use crate::service::KhipuMcpService;
use crate::validation::{self, InvalidArgument, optional};
use khipu_api_client::{ApiRequest, Method};
use khipu_openapi_nav::navigator::to_pretty_json;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::{ErrorData as McpError, tool, tool_router};
use serde::{Deserialize, Serialize};
use serde_json::Number;

const MAX_ID_CHARS: usize = 255;
const MAX_TEXT_CHARS: usize = 4096;

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct CreatePaymentRequest {
    /// Payment subject / description shown to the payer
    pub subject: String,
    /// Currency in ISO-4217 format, e.g. 'CLP'
    pub currency: String,
    /// Payment amount
    pub amount: Number,
    /// Your internal transaction ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Custom data associated with the payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    /// Additional payment details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Bank ID to pre-select for the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
    /// URL to redirect after successful payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    /// URL to redirect if the payer cancels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
    /// Webhook URL for payment status notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
    /// API version for notifications, e.g. '3.0'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_api_version: Option<String>,
    /// Payment expiry datetime in ISO-8601 format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_date: Option<String>,
    /// Whether to send a payment email to the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_email: Option<bool>,
    /// Name of the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_name: Option<String>,
    /// Email of the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    /// Whether to send payment reminder emails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_reminders: Option<bool>,
    /// Email of the responsible user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_user_email: Option<String>,
    /// Fixed national ID of the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_payer_personal_identifier: Option<String>,
    /// Integrator fee amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrator_fee: Option<Number>,
    /// UUID of the collection account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_account_uuid: Option<String>,
    /// Confirmation timeout datetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_timeout_date: Option<String>,
    /// Force a specific payment method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_payment_method: Option<String>,
    /// URL of an image to show in the payment page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

impl CreatePaymentRequest {
    fn validate(&self) -> validation::Checked {
        use validation::{email, exact_chars, max_chars, positive, url, uuid};

        max_chars("subject", &self.subject, MAX_ID_CHARS)?;
        exact_chars("currency", &self.currency, 3)?;
        positive("amount", &self.amount)?;
        optional(self.transaction_id.as_deref(), |v| {
            max_chars("transaction_id", v, MAX_ID_CHARS)
        })?;
        optional(self.custom.as_deref(), |v| max_chars("custom", v, MAX_TEXT_CHARS))?;
        optional(self.body.as_deref(), |v| max_chars("body", v, MAX_TEXT_CHARS))?;
        optional(self.bank_id.as_deref(), |v| max_chars("bank_id", v, MAX_ID_CHARS))?;
        optional(self.return_url.as_deref(), |v| url("return_url", v))?;
        optional(self.cancel_url.as_deref(), |v| url("cancel_url", v))?;
        optional(self.notify_url.as_deref(), |v| url("notify_url", v))?;
        optional(self.notify_api_version.as_deref(), |v| {
            max_chars("notify_api_version", v, MAX_ID_CHARS)
        })?;
        optional(self.payer_name.as_deref(), |v| max_chars("payer_name", v, MAX_ID_CHARS))?;
        optional(self.payer_email.as_deref(), |v| email("payer_email", v))?;
        optional(self.responsible_user_email.as_deref(), |v| {
            email("responsible_user_email", v)
        })?;
        optional(self.fixed_payer_personal_identifier.as_deref(), |v| {
            max_chars("fixed_payer_personal_identifier", v, MAX_ID_CHARS)
        })?;
        optional(self.collect_account_uuid.as_deref(), |v| {
            uuid("collect_account_uuid", v)
        })?;
        optional(self.picture_url.as_deref(), |v| url("picture_url", v))
    }
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PaymentIdRequest {
    /// Payment ID returned by khipu_create_payment
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct RefundPaymentRequest {
    /// Payment ID to refund
    pub id: String,
    /// Amount to refund. If omitted, the full payment amount is refunded.
    #[serde(default)]
    pub amount: Option<Number>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PredictPaymentRequest {
    /// Email address of the payer
    pub payer_email: String,
    /// Bank ID of the payer's bank
    pub bank_id: String,
    /// Payment amount as a string
    pub amount: String,
    /// Currency in ISO-4217 format, e.g. 'CLP'
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PaymentMethodsRequest {
    /// Merchant account (receiver) numeric ID
    pub id: u64,
}

fn invalid(err: &InvalidArgument) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
}

/// `/v3/payments/{id}[/suffix]` after checking the id.
fn payment_route(id: &str, suffix: Option<&str>) -> Result<Vec<String>, InvalidArgument> {
    validation::max_chars("id", id, MAX_ID_CHARS)?;
    let mut segments = vec!["v3".to_string(), "payments".to_string(), id.to_string()];
    segments.extend(suffix.map(str::to_string));
    Ok(segments)
}

impl KhipuMcpService {
    pub(crate) fn api_tools() -> ToolRouter<Self> {
        Self::api_tool_router()
    }

    async fn call_api(&self, tool: &str, request: ApiRequest) -> Result<CallToolResult, McpError> {
        let Some(client) = &self.api else {
            return Ok(CallToolResult::error(vec![Content::text(
                "KHIPU_API_KEY environment variable is not set",
            )]));
        };

        match client.invoke(&request).await {
            Ok(body) => Ok(CallToolResult::success(vec![Content::text(to_pretty_json(
                &body,
            ))])),
            Err(e) => {
                tracing::warn!(tool, method = %request.method, route = %request.route(), error = %e, "payment API call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

#[tool_router(router = api_tool_router)]
impl KhipuMcpService {
    #[tool(
        name = "khipu_get_banks",
        description = "Get the list of banks available for payments in your Khipu account. Returns bank IDs, names, minimum amounts, and logos.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn get_banks(&self) -> Result<CallToolResult, McpError> {
        self.call_api(
            "khipu_get_banks",
            ApiRequest::new(Method::GET, ["v3", "banks"]),
        )
        .await
    }

    #[tool(
        name = "khipu_create_payment",
        description = "Create a new Khipu payment and get the payment URLs to redirect the user. Returns payment_id, payment_url, simplified_transfer_url, and app_url.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false, open_world_hint = true)
    )]
    pub async fn create_payment(
        &self,
        Parameters(request): Parameters<CreatePaymentRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = request.validate() {
            return invalid(&e);
        }
        let body = serde_json::to_value(&request)
            .map_err(|e| McpError::internal_error(format!("encode payment: {e}"), None))?;
        self.call_api(
            "khipu_create_payment",
            ApiRequest::new(Method::POST, ["v3", "payments"]).body(body),
        )
        .await
    }

    #[tool(
        name = "khipu_get_payment",
        description = "Get full information and current status of a Khipu payment by its ID.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn get_payment(
        &self,
        Parameters(PaymentIdRequest { id }): Parameters<PaymentIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        match payment_route(&id, None) {
            Ok(segments) => {
                self.call_api(
                    "khipu_get_payment",
                    ApiRequest::new(Method::GET, segments),
                )
                .await
            }
            Err(e) => invalid(&e),
        }
    }

    #[tool(
        name = "khipu_delete_payment",
        description = "Delete a pending Khipu payment by its ID. Only payments with 'pending' status can be deleted. This action cannot be undone.",
        annotations(read_only_hint = false, destructive_hint = true, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn delete_payment(
        &self,
        Parameters(PaymentIdRequest { id }): Parameters<PaymentIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        match payment_route(&id, None) {
            Ok(segments) => {
                self.call_api(
                    "khipu_delete_payment",
                    ApiRequest::new(Method::DELETE, segments),
                )
                .await
            }
            Err(e) => invalid(&e),
        }
    }

    #[tool(
        name = "khipu_confirm_payment",
        description = "Confirm a Khipu payment by its ID. The payment will be settled on the next business day. This feature is only available for merchants who have contracted it separately.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false, open_world_hint = true)
    )]
    pub async fn confirm_payment(
        &self,
        Parameters(PaymentIdRequest { id }): Parameters<PaymentIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        match payment_route(&id, Some("confirm")) {
            Ok(segments) => {
                self.call_api(
                    "khipu_confirm_payment",
                    ApiRequest::new(Method::POST, segments),
                )
                .await
            }
            Err(e) => invalid(&e),
        }
    }

    #[tool(
        name = "khipu_refund_payment",
        description = "Refund a Khipu payment fully or partially. Only available for merchants collecting into a Khipu account and before fund settlement.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false, open_world_hint = true)
    )]
    pub async fn refund_payment(
        &self,
        Parameters(RefundPaymentRequest { id, amount }): Parameters<RefundPaymentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let segments = match payment_route(&id, Some("refunds")) {
            Ok(segments) => segments,
            Err(e) => return invalid(&e),
        };
        if let Err(e) = optional(amount.as_ref(), |a| validation::positive("amount", a)) {
            return invalid(&e);
        }

        let mut body = serde_json::Map::new();
        if let Some(amount) = amount {
            body.insert("amount".to_string(), amount.into());
        }
        self.call_api(
            "khipu_refund_payment",
            ApiRequest::new(Method::POST, segments).body(body.into()),
        )
        .await
    }

    #[tool(
        name = "khipu_predict_payment",
        description = "Get a prediction of whether a payment will succeed, given the payer's email, bank, amount, and currency. Also returns the maximum transferable amount to a new recipient.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn predict_payment(
        &self,
        Parameters(request): Parameters<PredictPaymentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let checked = validation::email("payer_email", &request.payer_email)
            .and_then(|()| validation::max_chars("bank_id", &request.bank_id, MAX_ID_CHARS))
            .and_then(|()| validation::max_chars("amount", &request.amount, MAX_ID_CHARS))
            .and_then(|()| validation::max_chars("currency", &request.currency, MAX_ID_CHARS));
        if let Err(e) = checked {
            return invalid(&e);
        }

        let api_request = ApiRequest::new(Method::GET, ["v3", "predict"])
            .query("payer_email", request.payer_email)
            .query("bank_id", request.bank_id)
            .query("amount", request.amount)
            .query("currency", request.currency);
        self.call_api("khipu_predict_payment", api_request).await
    }

    #[tool(
        name = "khipu_get_payment_methods",
        description = "Get the list of available payment methods for a specific Khipu merchant account by its numeric ID.",
        annotations(read_only_hint = true, destructive_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    pub async fn get_payment_methods(
        &self,
        Parameters(PaymentMethodsRequest { id }): Parameters<PaymentMethodsRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = validation::positive_int("id", id) {
            return invalid(&e);
        }
        self.call_api(
            "khipu_get_payment_methods",
            ApiRequest::new(
                Method::GET,
                ["v3".to_string(), "merchants".to_string(), id.to_string(), "paymentMethods".to_string()],
            ),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_util::{is_error, navigator, text};
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::routing::any;
    use khipu_api_client::{ApiClient, ApiClientConfig};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    struct EchoServer {
        base_url: String,
        _shutdown: oneshot::Sender<()>,
    }

    async fn echo(method: axum::http::Method, uri: Uri, body: Bytes) -> axum::response::Response {
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let echoed = json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "body": body,
        });
        if uri.path().ends_with("/rejected") {
            return (
                StatusCode::FORBIDDEN,
                axum::Json(json!({ "message": "forbidden" })),
            )
                .into_response();
        }
        axum::Json(echoed).into_response()
    }

    async fn spawn_echo() -> EchoServer {
        let app = Router::new().route("/{*path}", any(echo));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });
        EchoServer {
            base_url: format!("http://{addr}"),
            _shutdown: tx,
        }
    }

    fn service_for(server: &EchoServer) -> KhipuMcpService {
        let mut config = ApiClientConfig::new("test-key");
        config.base_url.clone_from(&server.base_url);
        KhipuMcpService::new(navigator(), Some(ApiClient::new(config).unwrap()))
    }

    fn echoed(result: &CallToolResult) -> Value {
        assert!(!is_error(result), "unexpected error: {}", text(result));
        serde_json::from_str(&text(result)).expect("JSON body")
    }

    fn payment(subject: &str, currency: &str, amount: Value) -> CreatePaymentRequest {
        serde_json::from_value(json!({
            "subject": subject,
            "currency": currency,
            "amount": amount,
        }))
        .expect("valid payment request")
    }

    #[tokio::test]
    async fn create_payment_omits_absent_fields() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let mut req = payment("Order 42", "CLP", json!(1000));
        req.payer_email = Some("payer@example.cl".to_string());
        req.send_email = Some(true);

        let v = echoed(&svc.create_payment(Parameters(req)).await.unwrap());
        assert_eq!(v["method"], json!("POST"));
        assert_eq!(v["path"], json!("/v3/payments"));
        assert_eq!(
            v["body"],
            json!({
                "subject": "Order 42",
                "currency": "CLP",
                "amount": 1000,
                "send_email": true,
                "payer_email": "payer@example.cl"
            })
        );
    }

    #[tokio::test]
    async fn amounts_keep_their_json_number_form() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let mut req = payment("Order 43", "CLP", json!(2500));
        req.integrator_fee = Some(Number::from(10));
        let v = echoed(&svc.create_payment(Parameters(req)).await.unwrap());
        assert!(v["body"]["amount"].is_u64(), "{}", v["body"]);
        assert_eq!(v["body"]["amount"], json!(2500));
        assert!(v["body"]["integrator_fee"].is_u64());

        let v = echoed(
            &svc.create_payment(Parameters(payment("Order 44", "USD", json!(19.99))))
                .await
                .unwrap(),
        );
        assert_eq!(v["body"]["amount"], json!(19.99));

        let v = echoed(
            &svc.refund_payment(Parameters(RefundPaymentRequest {
                id: "abc".to_string(),
                amount: Some(Number::from(1200)),
            }))
            .await
            .unwrap(),
        );
        assert!(v["body"]["amount"].is_u64());
    }

    #[tokio::test]
    async fn create_payment_validation_names_the_field() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        for (req, field) in [
            (payment("x", "CLPX", json!(10)), "currency"),
            (payment("x", "CLP", json!(0)), "amount"),
            (payment(&"s".repeat(256), "CLP", json!(10)), "subject"),
            (
                CreatePaymentRequest {
                    return_url: Some("::not a url".to_string()),
                    ..payment("x", "CLP", json!(10))
                },
                "return_url",
            ),
            (
                CreatePaymentRequest {
                    collect_account_uuid: Some("abc".to_string()),
                    ..payment("x", "CLP", json!(10))
                },
                "collect_account_uuid",
            ),
        ] {
            let res = svc.create_payment(Parameters(req)).await.unwrap();
            assert!(is_error(&res));
            assert!(
                text(&res).starts_with(&format!("Invalid argument '{field}'")),
                "{}",
                text(&res)
            );
        }
    }

    #[tokio::test]
    async fn payment_id_routes_are_encoded() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let v = echoed(
            &svc.get_payment(Parameters(PaymentIdRequest {
                id: "abc/def".to_string(),
            }))
            .await
            .unwrap(),
        );
        assert_eq!(v["method"], json!("GET"));
        assert_eq!(v["path"], json!("/v3/payments/abc%2Fdef"));

        let v = echoed(
            &svc.delete_payment(Parameters(PaymentIdRequest {
                id: "abc".to_string(),
            }))
            .await
            .unwrap(),
        );
        assert_eq!(v["method"], json!("DELETE"));

        let v = echoed(
            &svc.confirm_payment(Parameters(PaymentIdRequest {
                id: "abc".to_string(),
            }))
            .await
            .unwrap(),
        );
        assert_eq!(v["path"], json!("/v3/payments/abc/confirm"));
        assert_eq!(v["body"], Value::Null);
    }

    #[tokio::test]
    async fn refund_body_carries_optional_amount() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let full = echoed(
            &svc.refund_payment(Parameters(RefundPaymentRequest {
                id: "abc".to_string(),
                amount: None,
            }))
            .await
            .unwrap(),
        );
        assert_eq!(full["path"], json!("/v3/payments/abc/refunds"));
        assert_eq!(full["body"], json!({}));

        let partial = echoed(
            &svc.refund_payment(Parameters(RefundPaymentRequest {
                id: "abc".to_string(),
                amount: Some(Number::from(500)),
            }))
            .await
            .unwrap(),
        );
        assert_eq!(partial["body"], json!({ "amount": 500 }));

        let negative = svc
            .refund_payment(Parameters(RefundPaymentRequest {
                id: "abc".to_string(),
                amount: Some(Number::from(-1)),
            }))
            .await
            .unwrap();
        assert!(is_error(&negative));
    }

    #[tokio::test]
    async fn predict_sends_query_parameters() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let v = echoed(
            &svc.predict_payment(Parameters(PredictPaymentRequest {
                payer_email: "payer@example.cl".to_string(),
                bank_id: "Bawdf".to_string(),
                amount: "5000".to_string(),
                currency: "CLP".to_string(),
            }))
            .await
            .unwrap(),
        );
        assert_eq!(v["path"], json!("/v3/predict"));
        assert_eq!(
            v["query"],
            json!("payer_email=payer%40example.cl&bank_id=Bawdf&amount=5000&currency=CLP")
        );
    }

    #[tokio::test]
    async fn payment_methods_requires_positive_id() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let v = echoed(
            &svc.get_payment_methods(Parameters(PaymentMethodsRequest { id: 42 }))
                .await
                .unwrap(),
        );
        assert_eq!(v["path"], json!("/v3/merchants/42/paymentMethods"));

        let res = svc
            .get_payment_methods(Parameters(PaymentMethodsRequest { id: 0 }))
            .await
            .unwrap();
        assert!(is_error(&res));
    }

    #[tokio::test]
    async fn api_errors_become_error_results() {
        let server = spawn_echo().await;
        let svc = service_for(&server);

        let res = svc
            .get_payment(Parameters(PaymentIdRequest {
                id: "rejected".to_string(),
            }))
            .await
            .unwrap();
        assert!(is_error(&res));
        assert_eq!(
            text(&res),
            r#"Khipu API error 403: {"message":"forbidden"}"#
        );
    }

    #[tokio::test]
    async fn missing_client_reports_unset_key() {
        let svc = KhipuMcpService::new(navigator(), None);
        let res = svc.get_banks().await.unwrap();
        assert!(is_error(&res));
        assert!(text(&res).contains("KHIPU_API_KEY"));
    }

    #[test]
    fn annotations_follow_http_method() {
        let client = ApiClient::new(ApiClientConfig::new("k")).unwrap();
        let svc = KhipuMcpService::new(navigator(), Some(client));
        let tools = svc.tools();
        let hints = |name: &str| {
            let tool = tools.iter().find(|t| t.name == name).expect(name);
            let a = tool.annotations.clone().expect("annotations");
            (a.read_only_hint, a.destructive_hint, a.open_world_hint)
        };

        for read_only in [
            "khipu_get_banks",
            "khipu_get_payment",
            "khipu_predict_payment",
            "khipu_get_payment_methods",
        ] {
            assert_eq!(hints(read_only), (Some(true), Some(false), Some(true)));
        }
        assert_eq!(
            hints("khipu_delete_payment"),
            (Some(false), Some(true), Some(true))
        );
        assert_eq!(
            hints("khipu_create_payment"),
            (Some(false), Some(false), Some(true))
        );
    }
}
