//! Alert message rendering.
//!
//! Templates use `{field}` placeholders filled from the [`AlertData`] a rule
//! fired on. Fields that do not exist for the data, or that have no value,
//! render as [`MISSING`]. Braces that do not enclose a field name are copied
//! through unchanged. Numbers are rendered with one decimal place.

use vigil_health::{ComponentHealth, SystemHealth};

use crate::types::AlertData;

/// Text substituted for absent fields.
pub const MISSING: &str = "n/a";

/// Fills `{field}` placeholders in `template` from `data`.
#[must_use]
pub fn render(template: &str, data: &AlertData) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_field_name(&after[..close]) => {
                let key = &after[..close];
                match field(data, key) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(MISSING),
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_field_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn field(data: &AlertData, key: &str) -> Option<String> {
    match data {
        AlertData::System(health) => system_field(health, key),
        AlertData::Component(health) => component_field(health, key),
        AlertData::Metrics(values) => values.get(key).map(|v| number(*v)),
    }
}

fn system_field(health: &SystemHealth, key: &str) -> Option<String> {
    let summary = &health.summary;
    let value = match key {
        "status" => health.status.to_string(),
        "total_count" => summary.total_components.to_string(),
        "healthy_count" => summary.healthy_components.to_string(),
        "degraded_count" => summary.degraded_components.to_string(),
        "unhealthy_count" => summary.unhealthy_components.to_string(),
        "unknown_count" => summary.unknown_components.to_string(),
        "health_percentage" => number(summary.health_percentage),
        "unhealthy_components" => {
            name_list(health.components_with_status(vigil_health::HealthStatus::Unhealthy))?
        }
        "degraded_components" => {
            name_list(health.components_with_status(vigil_health::HealthStatus::Degraded))?
        }
        _ => return None,
    };
    Some(value)
}

fn component_field(health: &ComponentHealth, key: &str) -> Option<String> {
    let value = match key {
        "component_name" => health.component_name.clone(),
        "component_type" => health.component_type.to_string(),
        "status" => health.status.to_string(),
        "response_time_ms" => number(health.response_time_ms),
        "success_rate" => number(health.success_rate),
        "error_rate" => number(health.error_rate),
        "error_message" => health.error_message.clone()?,
        other => match health.details.get(other)? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => return None,
            v => v.to_string(),
        },
    };
    Some(value)
}

fn name_list(names: Vec<String>) -> Option<String> {
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

fn number(value: f64) -> String {
    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use test_case::test_case;
    use vigil_health::{ComponentType, HealthStatus};

    fn component_data(error_message: Option<&str>) -> AlertData {
        AlertData::Component(ComponentHealth {
            status: HealthStatus::Unhealthy,
            response_time_ms: 1234.56,
            success_rate: 0.0,
            error_rate: 100.0,
            error_message: error_message.map(str::to_string),
            details: HashMap::from([
                ("region".to_string(), serde_json::json!("eu-west")),
                ("rooms".to_string(), serde_json::json!(12)),
            ]),
            ..ComponentHealth::unchecked("postgres", ComponentType::Database, Utc::now())
        })
    }

    fn system_data() -> AlertData {
        let components = [
            ("a", HealthStatus::Healthy),
            ("b", HealthStatus::Unhealthy),
            ("c", HealthStatus::Degraded),
            ("d", HealthStatus::Unhealthy),
        ]
        .into_iter()
        .map(|(name, status)| {
            let health = ComponentHealth {
                status,
                ..ComponentHealth::unchecked(name, ComponentType::Api, Utc::now())
            };
            (name.to_string(), health)
        })
        .collect();
        AlertData::System(SystemHealth::from_components(components, Utc::now()))
    }

    #[test]
    fn renders_system_fields() {
        let message = render(
            "{unhealthy_count}/{total_count} down ({health_percentage}% healthy): {unhealthy_components}",
            &system_data(),
        );
        assert_eq!(message, "2/4 down (25.0% healthy): b, d");
    }

    #[test]
    fn renders_component_fields() {
        let message = render(
            "{component_name} ({component_type}) is {status} after {response_time_ms}ms: {error_message}",
            &component_data(Some("connection refused")),
        );
        assert_eq!(
            message,
            "postgres (database) is unhealthy after 1234.6ms: connection refused"
        );
    }

    #[test]
    fn renders_component_details() {
        let message = render("{region} hosts {rooms} rooms", &component_data(None));
        assert_eq!(message, "eu-west hosts 12 rooms");
    }

    #[test]
    fn renders_metrics() {
        let data = AlertData::Metrics(HashMap::from([("queue.depth".to_string(), 150.0)]));
        assert_eq!(render("depth={queue.depth}", &data), "depth=150.0");
    }

    #[test_case("{error_message}", "n/a" ; "absent optional field")]
    #[test_case("{no_such_field}", "n/a" ; "unknown field")]
    #[test_case("{unhealthy_count}", "n/a" ; "system field on component data")]
    #[test_case("{ not a field }", "{ not a field }" ; "braces around non field")]
    #[test_case("open { only", "open { only" ; "unmatched open brace")]
    #[test_case("{}", "{}" ; "empty braces")]
    #[test_case("plain text", "plain text" ; "no placeholders")]
    fn missing_fields_render_safely(template: &str, expected: &str) {
        assert_eq!(render(template, &component_data(None)), expected);
    }

    #[test]
    fn empty_name_lists_render_missing() {
        let data = AlertData::System(SystemHealth::empty(Utc::now()));
        assert_eq!(render("{degraded_components}", &data), "n/a");
        assert_eq!(render("{status}", &data), "unknown");
    }

    #[test]
    fn rendering_is_deterministic() {
        let data = system_data();
        let template = "{status} {unhealthy_components} {degraded_components}";
        assert_eq!(render(template, &data), render(template, &data));
    }
}
