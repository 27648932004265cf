//! Wire schema of the bytecode analysis service (the ingestor).
//!
//! The service analyzes compiled class files and returns one record per
//! class; field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Request body for `POST /analyze`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub class_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    pub enhanced: bool,
    pub spring_analysis: bool,
    pub include_attributes: bool,
}

/// Response body for `POST /analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(default)]
    pub classes: Vec<ClassRecord>,
}

/// One analyzed class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassRecord {
    pub fqn: String,
    /// `class`, `interface`, ...
    #[serde(rename = "type")]
    pub class_type: Option<String>,
    pub line: Option<i64>,
    /// Class-level base path used to compose HTTP paths.
    pub class_base_path: Option<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub methods: Vec<MethodRecord>,
    pub fields: Vec<FieldRecord>,
    pub inheritance: Vec<InheritanceRecord>,
}

/// One analyzed method.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodRecord {
    pub fqn: String,
    pub line: Option<i64>,
    pub modifiers: Vec<String>,
    pub signature: Option<String>,
    pub annotations: Vec<String>,
    pub is_rest_endpoint: bool,
    pub is_entry_point: bool,
    pub entry_point_type: Option<String>,
    pub http_method: Option<String>,
    pub api_path: Option<String>,
    pub is_scheduled: bool,
    pub scheduled_cron: Option<String>,
    pub calls: Vec<CallRecord>,
    pub attributes: Option<serde_json::Value>,
}

/// One outgoing call observed in a method body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallRecord {
    pub to_fqn: String,
    pub kind: Option<String>,
    pub line: Option<i64>,
    pub is_mybatis_base_mapper_call: bool,
}

/// One field of a class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
}

/// One supertype relation of a class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InheritanceRecord {
    pub fqn: String,
    /// `extends` or `implements`.
    pub kind: Option<String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_record_parses_camel_case() {
        let json = r#"{
            "fqn": "com.example.OrderController",
            "type": "class",
            "classBasePath": "/api/orders",
            "annotations": ["@RestController"],
            "methods": [{
                "fqn": "com.example.OrderController.create(Order)",
                "isRestEndpoint": true,
                "httpMethod": "POST",
                "apiPath": "/create",
                "calls": [{"toFqn": "com.example.OrderService.create(Order)", "line": 42}]
            }]
        }"#;
        let record: ClassRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.class_base_path.as_deref(), Some("/api/orders"));
        assert!(record.methods[0].is_rest_endpoint);
        assert_eq!(
            record.methods[0].calls[0].to_fqn,
            "com.example.OrderService.create(Order)"
        );
        assert!(!record.methods[0].calls[0].is_mybatis_base_mapper_call);
    }
}
