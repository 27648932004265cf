//! Entry-point detection over analyzed class records: HTTP endpoints,
//! scheduled tasks, and message-queue consumers.

use ariadne_core::models::ingest::{ClassRecord, MethodRecord};
use ariadne_core::models::{EntryPoint, EntryType};

pub struct EntryDetector;

impl EntryDetector {
    /// Detect all entry points in a batch of class records.
    pub fn detect_entries(classes: &[ClassRecord]) -> Vec<EntryPoint> {
        let mut entries = Vec::new();

        for class in classes {
            let class_base_path = class.class_base_path.as_deref().unwrap_or("");

            for method in &class.methods {
                if method.is_rest_endpoint || method.is_entry_point {
                    let entry_type = method.entry_point_type.as_deref().unwrap_or("rest_endpoint");
                    if entry_type == "rest_endpoint" || entry_type == "http_api" {
                        entries.push(EntryPoint {
                            symbol_fqn: method.fqn.clone(),
                            entry_type: EntryType::HttpApi,
                            http_method: Some(
                                method.http_method.clone().unwrap_or_else(|| "GET".into()),
                            ),
                            http_path: Some(build_http_path(class_base_path, method)),
                            cron_expression: None,
                            mq_queue: None,
                        });
                    }
                }

                if method.is_scheduled {
                    let cron = method.scheduled_cron.clone().or_else(|| {
                        method
                            .attributes
                            .as_ref()
                            .and_then(|a| a.get("scheduled_cron"))
                            .and_then(|v| v.as_str())
                            .map(String::from)
                    });
                    entries.push(EntryPoint {
                        symbol_fqn: method.fqn.clone(),
                        entry_type: EntryType::Scheduled,
                        http_method: None,
                        http_path: None,
                        cron_expression: cron,
                        mq_queue: None,
                    });
                }

                let is_mq_listener = method.annotations.iter().any(|a| {
                    a.contains("RabbitListener")
                        || a.contains("KafkaListener")
                        || a.contains("JmsListener")
                });
                if is_mq_listener {
                    let queue = method
                        .attributes
                        .as_ref()
                        .and_then(|a| a.get("queue"))
                        .and_then(|v| v.as_str())
                        .map(String::from);
                    entries.push(EntryPoint {
                        symbol_fqn: method.fqn.clone(),
                        entry_type: EntryType::MqConsumer,
                        http_method: None,
                        http_path: None,
                        cron_expression: None,
                        mq_queue: queue,
                    });
                }
            }
        }

        entries
    }
}

/// Compose the class-level base path and the method path into one route.
fn build_http_path(class_base_path: &str, method: &MethodRecord) -> String {
    let method_path = method.api_path.as_deref().unwrap_or("");

    // The analyzer sometimes emits the full path on the method already.
    if !class_base_path.is_empty() && method_path.starts_with(class_base_path) {
        return method_path.to_string();
    }

    let base = class_base_path.trim_end_matches('/');
    let path = method_path.trim_start_matches('/');

    match (base.is_empty(), path.is_empty()) {
        (false, false) => format!("{base}/{path}"),
        (false, true) => base.to_string(),
        (true, false) => format!("/{path}"),
        (true, true) => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest_method(fqn: &str, http_method: &str, api_path: &str) -> MethodRecord {
        MethodRecord {
            fqn: fqn.to_string(),
            is_rest_endpoint: true,
            http_method: Some(http_method.to_string()),
            api_path: Some(api_path.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn detects_rest_endpoint_with_composed_path() {
        let class = ClassRecord {
            fqn: "com.example.OrderController".into(),
            class_base_path: Some("/api/orders".into()),
            methods: vec![rest_method(
                "com.example.OrderController.create(Order)",
                "POST",
                "/create",
            )],
            ..Default::default()
        };

        let entries = EntryDetector::detect_entries(&[class]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, EntryType::HttpApi);
        assert_eq!(entries[0].http_method.as_deref(), Some("POST"));
        assert_eq!(entries[0].http_path.as_deref(), Some("/api/orders/create"));
    }

    #[test]
    fn full_method_path_is_not_doubled() {
        let class = ClassRecord {
            fqn: "com.example.OrderController".into(),
            class_base_path: Some("/api/orders".into()),
            methods: vec![rest_method(
                "com.example.OrderController.list()",
                "GET",
                "/api/orders/list",
            )],
            ..Default::default()
        };

        let entries = EntryDetector::detect_entries(&[class]);
        assert_eq!(entries[0].http_path.as_deref(), Some("/api/orders/list"));
    }

    #[test]
    fn detects_scheduled_task() {
        let class = ClassRecord {
            fqn: "com.example.ReportJob".into(),
            methods: vec![MethodRecord {
                fqn: "com.example.ReportJob.run()".into(),
                is_scheduled: true,
                scheduled_cron: Some("0 0 * * * *".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let entries = EntryDetector::detect_entries(&[class]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, EntryType::Scheduled);
        assert_eq!(entries[0].cron_expression.as_deref(), Some("0 0 * * * *"));
    }

    #[test]
    fn detects_mq_consumer_via_annotation() {
        let class = ClassRecord {
            fqn: "com.example.OrderListener".into(),
            methods: vec![MethodRecord {
                fqn: "com.example.OrderListener.onMessage(Order)".into(),
                annotations: vec!["@RabbitListener(queues = \"orders\")".into()],
                attributes: Some(serde_json::json!({"queue": "orders"})),
                ..Default::default()
            }],
            ..Default::default()
        };

        let entries = EntryDetector::detect_entries(&[class]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, EntryType::MqConsumer);
        assert_eq!(entries[0].mq_queue.as_deref(), Some("orders"));
    }

    #[test]
    fn plain_method_yields_nothing() {
        let class = ClassRecord {
            fqn: "com.example.OrderService".into(),
            methods: vec![MethodRecord {
                fqn: "com.example.OrderService.create(Order)".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(EntryDetector::detect_entries(&[class]).is_empty());
    }
}
