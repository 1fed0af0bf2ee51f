#[cfg(test)]
mod tests {
    use crate::message::*;
    use crate::event::*;
    use crate::tool::*;
    use crate::config::*;
    use crate::session::*;
    use crate::route::*;
    use crate::error::*;
    use serde_json::json;
    use std::collections::HashMap;

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("policy");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.as_text(), "policy");
        assert!(msg.tool_call_id.is_none());
        assert!(msg.tool_calls.is_empty());

        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hello").role, Role::Assistant);
    }

    #[test]
    fn test_message_tool_result() {
        let msg = Message::tool_result("call_123", r#"{"locations":[]}"#);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), r#""tool""#);
        let role: Role = serde_json::from_str(r#""assistant""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn test_message_skips_empty_tool_fields() {
        let json = serde_json::to_string(&Message::user("x")).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_turn_context_line() {
        assert_eq!(Turn::user("raise Ana's wage").context_line(), "user: raise Ana's wage");
        assert_eq!(Turn::assistant("done").context_line(), "assistant: done");
    }

    #[test]
    fn test_turn_into_message() {
        let msg: Message = (&Turn::assistant("ok")).into();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.as_text(), "ok");
    }

    #[test]
    fn test_pending_action_ids_are_unique() {
        let a = PendingAction::new("create item Latte");
        let b = PendingAction::new("create item Latte");
        assert!(!a.action_id.is_empty());
        assert_ne!(a.action_id, b.action_id);
        assert_eq!(a.normalized_request, "create item Latte");
    }

    #[test]
    fn test_session_default_is_empty() {
        let session = Session::default();
        assert!(session.turns.is_empty());
        assert!(session.pending.is_none());
    }

    // ─── Route Tests ─────────────────────────────────────────

    fn raw(value: serde_json::Value) -> RawRouteDecision {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_intent_parse_lenient() {
        assert_eq!(Intent::parse_lenient("write"), Intent::Write);
        assert_eq!(Intent::parse_lenient(" READ "), Intent::Read);
        assert_eq!(Intent::parse_lenient("clear"), Intent::Clear);
        assert_eq!(Intent::parse_lenient("delete"), Intent::Unknown);
        assert_eq!(Intent::parse_lenient(""), Intent::Unknown);
    }

    #[test]
    fn test_sanitize_forces_confirm_invariant() {
        let cases = [
            (json!({"intent": "write", "needs_confirm": false}), Intent::Write, true),
            (json!({"intent": "write"}), Intent::Write, true),
            (json!({"intent": "read", "needs_confirm": true}), Intent::Read, false),
            (json!({"intent": "clear", "needs_confirm": true}), Intent::Clear, false),
            (json!({"intent": "unknown", "needs_confirm": false}), Intent::Unknown, false),
            (json!({"intent": "banana", "needs_confirm": false}), Intent::Unknown, false),
            (json!({"intent": "banana", "needs_confirm": true}), Intent::Unknown, false),
            (json!({"intent": "unknown", "needs_confirm": "yes"}), Intent::Unknown, false),
            (json!({}), Intent::Unknown, false),
        ];
        for (value, intent, needs_confirm) in cases {
            let decision = RouteDecision::sanitized(raw(value.clone()), "msg");
            assert_eq!(decision.intent, intent, "case {value}");
            assert_eq!(decision.needs_confirm, needs_confirm, "case {value}");
        }
    }

    #[test]
    fn test_sanitize_write_iff_confirm() {
        for label in ["clear", "write", "read", "unknown", "other"] {
            for claimed in [json!(true), json!(false), json!("yes"), json!(null)] {
                let d = RouteDecision::sanitized(
                    raw(json!({"intent": label, "needs_confirm": claimed})),
                    "msg",
                );
                assert_eq!(d.needs_confirm, d.intent == Intent::Write, "{label} / {claimed}");
            }
        }
    }

    #[test]
    fn test_sanitize_caps_lengths() {
        let long_reason = "r".repeat(1000);
        let long_request = "é".repeat(1000);
        let d = RouteDecision::sanitized(
            raw(json!({
                "intent": "read",
                "reason": long_reason,
                "normalized_request": long_request,
            })),
            "msg",
        );
        assert_eq!(d.reason.chars().count(), MAX_REASON_CHARS);
        assert_eq!(d.normalized_request.chars().count(), MAX_REQUEST_CHARS);
    }

    #[test]
    fn test_sanitize_defaults_request_to_user_text() {
        let d = RouteDecision::sanitized(raw(json!({"intent": "write"})), "add a Latte for $4");
        assert_eq!(d.normalized_request, "add a Latte for $4");
        assert_eq!(d.reason, "");
    }

    #[test]
    fn test_parse_failed_is_read_without_confirm() {
        let d = RouteDecision::parse_failed("delete everything");
        assert_eq!(d.intent, Intent::Read);
        assert!(!d.needs_confirm);
        assert_eq!(d.reason, "parse failed");
        assert_eq!(d.normalized_request, "delete everything");
    }

    // ─── Tool Tests ──────────────────────────────────────────

    #[test]
    fn test_tool_parameters_from_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "service": {"type": "string"},
                "method": {"type": "string"},
                "request": {"type": "object"}
            },
            "required": ["service", "method"]
        });
        let params = ToolParameters::from_schema(schema.as_object().unwrap());
        assert_eq!(params.schema_type, "object");
        assert_eq!(params.properties.len(), 3);
        assert_eq!(params.required, vec!["service", "method"]);
    }

    #[test]
    fn test_api_request_serialization() {
        let req = ApiRequest::new("locations", "list", json!({}));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"service": "locations", "method": "list", "request": {}}));
    }

    // ─── Event Tests ─────────────────────────────────────────

    #[test]
    fn test_turn_event_serialization() {
        let event = TurnEvent::GuardTriggered { attempt: 2, guard: GuardKind::MissingChart };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("GuardTriggered"));
        assert!(json.contains("MissingChart"));
    }

    // ─── Config Tests ────────────────────────────────────────

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ConciergeConfig::default();
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.router_model(), "gpt-4.1");
        assert!(config.writes.disallow);
        assert!(config.provider.sandbox);
        assert_eq!(config.provider.api_tool_suffix, "make_api_request");
        assert_eq!(config.server.listen_addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_config_requires_access_token() {
        let err = ConciergeConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConciergeError::Config(_)));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ConciergeConfig::from_lookup(lookup(&[
            ("ACCESS_TOKEN", "sandbox-token"),
            ("CHAT_MODEL", "gpt-4o"),
            ("ROUTER_MODEL", "gpt-4o-mini"),
            ("DISALLOW_WRITES", "FALSE"),
            ("MCP_ARGS", "square-mcp-server start"),
            ("OPENAI_BASE_URL", "http://localhost:9999/"),
        ]))
        .unwrap();
        assert_eq!(config.provider.access_token, "sandbox-token");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.router_model(), "gpt-4o-mini");
        assert!(!config.writes.disallow);
        assert_eq!(config.provider.args, vec!["square-mcp-server", "start"]);
        assert_eq!(config.llm.api_base, "http://localhost:9999");
    }

    #[test]
    fn test_config_square_token_wins() {
        let config = ConciergeConfig::from_lookup(lookup(&[
            ("SQUARE_ACCESS_TOKEN", "primary"),
            ("ACCESS_TOKEN", "secondary"),
        ]))
        .unwrap();
        assert_eq!(config.provider.access_token, "primary");
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = ConciergeError::Llm("rate limit".to_string());
        assert_eq!(err.to_string(), "LLM error: rate limit");

        let err = ConciergeError::MissingTool { name: "make_api_request".to_string() };
        assert_eq!(err.to_string(), "Tool not found in provider catalog: make_api_request");

        assert!(ConciergeError::ToolCall("bad method".into()).is_tool_call());
        assert!(!ConciergeError::Network("down".into()).is_tool_call());
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{invalid}}").unwrap_err();
        let err: ConciergeError = serde_err.into();
        assert!(matches!(err, ConciergeError::Serialization(_)));
    }
}
