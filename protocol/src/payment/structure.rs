//! Structural verification of a shared payment proof.
//!
//! Runs on arbitrary JSON, before any typed parsing, so a malformed or
//! leaky artifact produces a readable list of problems instead of a single
//! deserialization error.

use serde::Serialize;
use serde_json::Value;

use crate::config::{PAYMENT_PROOF_TYPE, PAYMENT_PROOF_VERSION, SENSITIVE_FIELD_DENYLIST};

/// Keys every artifact must carry. `zkProofHash` is optional and, when
/// present, a string or `null`.
const REQUIRED_FIELDS: &[&str] = &[
    "version",
    "proofType",
    "zkPaymentHash",
    "amountVerified",
    "signatureVerified",
    "timestampVerified",
    "publicMetadata",
];

const FLAG_FIELDS: &[&str] = &["amountVerified", "signatureVerified", "timestampVerified"];

/// Outcome of [`verify_structure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Check required fields, literal values, field types and the sensitive-key
/// deny list. Every problem is reported, not just the first.
pub fn verify_structure(candidate: &Value) -> StructureReport {
    let mut errors = Vec::new();

    let Some(object) = candidate.as_object() else {
        return StructureReport {
            valid: false,
            errors: vec!["payment proof must be a JSON object".to_string()],
        };
    };

    for field in REQUIRED_FIELDS {
        if !object.contains_key(*field) {
            errors.push(format!("missing required field: {field}"));
        }
    }

    if let Some(version) = object.get("version") {
        if version.as_str() != Some(PAYMENT_PROOF_VERSION) {
            errors.push(format!(
                "unsupported version {version}, expected \"{PAYMENT_PROOF_VERSION}\""
            ));
        }
    }
    if let Some(proof_type) = object.get("proofType") {
        if proof_type.as_str() != Some(PAYMENT_PROOF_TYPE) {
            errors.push(format!(
                "invalid proofType {proof_type}, expected \"{PAYMENT_PROOF_TYPE}\""
            ));
        }
    }
    if let Some(hash) = object.get("zkPaymentHash") {
        if !hash.is_string() {
            errors.push("zkPaymentHash must be a string".to_string());
        }
    }
    if let Some(hash) = object.get("zkProofHash") {
        if !(hash.is_string() || hash.is_null()) {
            errors.push("zkProofHash must be a string or null".to_string());
        }
    }
    for flag in FLAG_FIELDS {
        if let Some(value) = object.get(*flag) {
            if !value.is_boolean() {
                errors.push(format!("{flag} must be a boolean"));
            }
        }
    }
    match object.get("publicMetadata") {
        Some(Value::Object(meta)) => {
            if !meta.contains_key("paymentMethod") {
                errors.push("missing required field: publicMetadata.paymentMethod".to_string());
            }
        }
        Some(_) => errors.push("publicMetadata must be an object".to_string()),
        None => {}
    }

    scan_denylist(candidate, "$", &mut errors);

    StructureReport {
        valid: errors.is_empty(),
        errors,
    }
}

fn scan_denylist(value: &Value, path: &str, errors: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                if SENSITIVE_FIELD_DENYLIST.contains(&key.as_str()) {
                    errors.push(format!("sensitive field must not be shared: {child_path}"));
                }
                scan_denylist(child, &child_path, errors);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                scan_denylist(child, &format!("{path}[{i}]"), errors);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "version": "1.0",
            "proofType": "payment",
            "zkPaymentHash": "0xabc",
            "zkProofHash": null,
            "amountVerified": true,
            "signatureVerified": true,
            "timestampVerified": true,
            "publicMetadata": { "requiredAmount": null, "paymentMethod": "crypto" }
        })
    }

    #[test]
    fn accepts_minimal_artifact() {
        let report = verify_structure(&minimal());
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn rejects_top_level_sensitive_key() {
        let mut candidate = minimal();
        candidate["recipient"] = json!("0xdead");
        let report = verify_structure(&candidate);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("$.recipient")));
    }

    #[test]
    fn rejects_nested_sensitive_key() {
        let mut candidate = minimal();
        candidate["publicMetadata"]["amount"] = json!(10);
        let report = verify_structure(&candidate);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("$.publicMetadata.amount")));
    }

    #[test]
    fn reports_every_problem() {
        let candidate = json!({
            "version": "2.0",
            "proofType": "invoice",
            "signature": "0x00",
        });
        let report = verify_structure(&candidate);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("version")));
        assert!(report.errors.iter().any(|e| e.contains("proofType")));
        assert!(report.errors.iter().any(|e| e.contains("zkPaymentHash")));
        assert!(report.errors.iter().any(|e| e.contains("$.signature")));
    }

    #[test]
    fn zk_proof_hash_key_is_optional() {
        let mut candidate = minimal();
        candidate.as_object_mut().unwrap().remove("zkProofHash");
        let report = verify_structure(&candidate);
        assert!(report.valid, "{:?}", report.errors);

        candidate["zkProofHash"] = json!("0xfeed");
        assert!(verify_structure(&candidate).valid);

        candidate["zkProofHash"] = json!(7);
        let report = verify_structure(&candidate);
        assert_eq!(report.errors, vec!["zkProofHash must be a string or null"]);
    }

    #[test]
    fn payment_method_required() {
        let mut candidate = minimal();
        candidate["publicMetadata"] = json!({});
        assert!(!verify_structure(&candidate).valid);
    }

    #[test]
    fn non_object_rejected() {
        assert!(!verify_structure(&json!([1, 2])).valid);
    }
}
