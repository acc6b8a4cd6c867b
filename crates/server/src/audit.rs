//! JSON-lines request/response audit log (spec 6): two records per
//! request, emitted as structured `tracing` events on a dedicated
//! target so they land in the JSON-formatted log output (file and/or
//! stdout) alongside everything else, rather than a bespoke writer.

use serde_json::Value;
use uuid::Uuid;

pub const AUDIT_TARGET: &str = "gateway_audit";

pub fn log_request(request_id: Uuid, sid: &str, payload: &Value, headers: &Value) {
    tracing::info!(
        target: AUDIT_TARGET,
        request_id = %request_id,
        sid,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        r#type = "request",
        payload = %payload,
        headers = %headers,
    );
}

pub fn log_response(request_id: Uuid, sid: &str, response: &Value, status_code: u16) {
    tracing::info!(
        target: AUDIT_TARGET,
        request_id = %request_id,
        sid,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        r#type = "response",
        response = %response,
        status_code,
    );
}
