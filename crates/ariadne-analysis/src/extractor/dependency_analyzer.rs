//! External-dependency classification over analyzed class records:
//! which infrastructure components (MySQL, Redis, MQ, HTTP, RPC) does each
//! method touch.

use std::collections::HashSet;

use ariadne_core::models::ingest::ClassRecord;
use ariadne_core::models::{DependencyStrength, DependencyType, ExternalDependency};

/// Well-known client-type prefixes per infrastructure kind.
const REDIS_PATTERNS: [&str; 9] = [
    "org.springframework.data.redis.core.RedisTemplate",
    "org.springframework.data.redis.core.StringRedisTemplate",
    "org.springframework.data.redis.core.ValueOperations",
    "org.springframework.data.redis.core.HashOperations",
    "org.springframework.data.redis.core.ListOperations",
    "org.springframework.data.redis.core.SetOperations",
    "org.springframework.data.redis.core.ZSetOperations",
    "redis.clients.jedis.Jedis",
    "io.lettuce.core.RedisClient",
];

const MQ_PATTERNS: [&str; 5] = [
    "org.springframework.amqp.core.AmqpTemplate",
    "org.springframework.amqp.rabbit.core.RabbitTemplate",
    "org.springframework.kafka.core.KafkaTemplate",
    "org.springframework.jms.core.JmsTemplate",
    "com.rabbitmq.client.Channel",
];

const HTTP_PATTERNS: [&str; 5] = [
    "org.springframework.web.client.RestTemplate",
    "org.springframework.web.reactive.function.client.WebClient",
    "org.apache.http.client.HttpClient",
    "okhttp3.OkHttpClient",
    "java.net.HttpURLConnection",
];

const RPC_PATTERNS: [&str; 3] = ["org.apache.dubbo", "io.grpc", "com.alibaba.dubbo"];

pub struct ExternalDependencyAnalyzer;

impl ExternalDependencyAnalyzer {
    /// Classify every outgoing call in the batch. Deduplicated by
    /// `(caller, type, target)`; HTTP client calls count as weak
    /// dependencies, everything else as strong.
    pub fn analyze(classes: &[ClassRecord]) -> Vec<ExternalDependency> {
        let mut deps = Vec::new();
        let mut seen: HashSet<(String, DependencyType, String)> = HashSet::new();

        for class in classes {
            for method in &class.methods {
                for call in &method.calls {
                    let target = &call.to_fqn;

                    // MyBatis mapper calls flagged by the analyzer itself.
                    let dep_type = if call.is_mybatis_base_mapper_call || is_mapper_call(target) {
                        DependencyType::Mysql
                    } else {
                        match match_pattern(target) {
                            Some(t) => t,
                            None => continue,
                        }
                    };

                    let key = (method.fqn.clone(), dep_type, target.clone());
                    if !seen.insert(key) {
                        continue;
                    }

                    let strength = if dep_type == DependencyType::Http {
                        DependencyStrength::Weak
                    } else {
                        DependencyStrength::Strong
                    };
                    deps.push(ExternalDependency {
                        caller_fqn: method.fqn.clone(),
                        dependency_type: dep_type,
                        target: target.clone(),
                        strength,
                    });
                }
            }
        }

        deps
    }
}

fn match_pattern(fqn: &str) -> Option<DependencyType> {
    if REDIS_PATTERNS.iter().any(|p| fqn.starts_with(p)) {
        return Some(DependencyType::Redis);
    }
    if MQ_PATTERNS.iter().any(|p| fqn.starts_with(p)) {
        return Some(DependencyType::Mq);
    }
    if HTTP_PATTERNS.iter().any(|p| fqn.starts_with(p)) {
        return Some(DependencyType::Http);
    }
    if RPC_PATTERNS.iter().any(|p| fqn.starts_with(p)) {
        return Some(DependencyType::Rpc);
    }
    None
}

/// Mapper-interface calls recognized by class-name convention
/// (`*Mapper`/`*Dao`/`*Repository`, framework `Base*` classes exempted).
fn is_mapper_call(fqn: &str) -> bool {
    let Some((class_fqn, _method)) = fqn.rsplit_once('.') else {
        return false;
    };
    let class_name = class_fqn.rsplit('.').next().unwrap_or(class_fqn);

    (class_name.ends_with("Mapper")
        || class_name.ends_with("Dao")
        || class_name.ends_with("Repository"))
        && !class_name.starts_with("Base")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ariadne_core::models::ingest::{CallRecord, MethodRecord};

    fn class_with_calls(calls: Vec<CallRecord>) -> ClassRecord {
        ClassRecord {
            fqn: "com.example.OrderService".into(),
            methods: vec![MethodRecord {
                fqn: "com.example.OrderService.create(Order)".into(),
                calls,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn call(to_fqn: &str) -> CallRecord {
        CallRecord {
            to_fqn: to_fqn.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn mapper_calls_classify_as_mysql() {
        let classes = [class_with_calls(vec![call(
            "com.example.mapper.OrderMapper.insert(Order)",
        )])];
        let deps = ExternalDependencyAnalyzer::analyze(&classes);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].dependency_type, DependencyType::Mysql);
        assert_eq!(deps[0].strength, DependencyStrength::Strong);
    }

    #[test]
    fn base_mapper_names_are_exempt() {
        let classes = [class_with_calls(vec![call(
            "com.example.mapper.BaseMapper.insert(Object)",
        )])];
        assert!(ExternalDependencyAnalyzer::analyze(&classes).is_empty());
    }

    #[test]
    fn mybatis_flag_wins_over_name() {
        let classes = [class_with_calls(vec![CallRecord {
            to_fqn: "com.example.mapper.BaseMapper.selectById(Long)".into(),
            is_mybatis_base_mapper_call: true,
            ..Default::default()
        }])];
        let deps = ExternalDependencyAnalyzer::analyze(&classes);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].dependency_type, DependencyType::Mysql);
    }

    #[test]
    fn redis_and_http_patterns_classify() {
        let classes = [class_with_calls(vec![
            call("org.springframework.data.redis.core.RedisTemplate.opsForValue()"),
            call("org.springframework.web.client.RestTemplate.getForObject(String)"),
        ])];
        let deps = ExternalDependencyAnalyzer::analyze(&classes);
        assert_eq!(deps.len(), 2);

        let redis = deps
            .iter()
            .find(|d| d.dependency_type == DependencyType::Redis)
            .unwrap();
        assert_eq!(redis.strength, DependencyStrength::Strong);

        let http = deps
            .iter()
            .find(|d| d.dependency_type == DependencyType::Http)
            .unwrap();
        assert_eq!(http.strength, DependencyStrength::Weak);
    }

    #[test]
    fn duplicates_are_collapsed() {
        let target = "com.example.mapper.OrderMapper.insert(Order)";
        let classes = [class_with_calls(vec![call(target), call(target)])];
        assert_eq!(ExternalDependencyAnalyzer::analyze(&classes).len(), 1);
    }

    #[test]
    fn ordinary_calls_are_ignored() {
        let classes = [class_with_calls(vec![call(
            "com.example.OrderValidator.validate(Order)",
        )])];
        assert!(ExternalDependencyAnalyzer::analyze(&classes).is_empty());
    }
}
