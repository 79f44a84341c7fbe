use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(super) const OP_HELLO: u8 = 0;
pub(super) const OP_IDENTIFY: u8 = 1;
pub(super) const OP_IDENTIFIED: u8 = 2;
pub(super) const OP_EVENT: u8 = 5;
pub(super) const OP_REQUEST: u8 = 6;
pub(super) const OP_REQUEST_RESPONSE: u8 = 7;
pub(super) const OP_REQUEST_BATCH: u8 = 8;
pub(super) const OP_REQUEST_BATCH_RESPONSE: u8 = 9;

pub(super) const RPC_VERSION: u32 = 1;

/// Event categories the core listens to: scenes, transitions and outputs.
pub(super) const EVENT_SUBSCRIPTIONS: u32 = (1 << 2) | (1 << 4) | (1 << 6);

/// Requests in a batch run one after another on the mixer's request thread.
pub(super) const BATCH_EXECUTION_SERIAL_REALTIME: i32 = 0;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct Frame {
    pub(super) op: u8,
    #[serde(default)]
    pub(super) d: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HelloMessage {
    #[serde(default)]
    pub(super) obs_web_socket_version: Option<String>,
    pub(super) rpc_version: u32,
    #[serde(default)]
    pub(super) authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthChallenge {
    pub(super) challenge: String,
    pub(super) salt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IdentifyMessage {
    pub(super) rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) authentication: Option<String>,
    pub(super) event_subscriptions: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IdentifiedMessage {
    pub(super) negotiated_rpc_version: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RequestMessage<'a> {
    pub(super) request_type: &'a str,
    pub(super) request_id: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub(super) request_data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BatchRequestMessage<'a> {
    pub(super) request_id: &'a str,
    pub(super) halt_on_failure: bool,
    pub(super) execution_type: i32,
    pub(super) requests: Vec<BatchItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BatchItem<'a> {
    pub(super) request_type: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub(super) request_data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RequestStatus {
    pub(super) result: bool,
    pub(super) code: u16,
    #[serde(default)]
    pub(super) comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ResponseMessage {
    #[serde(default)]
    pub(super) request_id: Option<String>,
    pub(super) request_status: RequestStatus,
    #[serde(default)]
    pub(super) response_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BatchResponseMessage {
    pub(super) request_id: String,
    pub(super) results: Vec<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EventMessage {
    pub(super) event_type: String,
    #[serde(default)]
    pub(super) event_data: Value,
}
