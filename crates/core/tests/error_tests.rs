// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError display and conversions
// ═══════════════════════════════════════════════════════════════════

use fund_tracker_core::errors::CoreError;

mod display {
    use super::*;

    #[test]
    fn variants_carry_context() {
        assert_eq!(
            CoreError::Storage("disk full".into()).to_string(),
            "Storage error: disk full"
        );
        assert_eq!(
            CoreError::Backend("no such action".into()).to_string(),
            "Backend error: no such action"
        );
        assert_eq!(
            CoreError::Timeout("deadline elapsed".into()).to_string(),
            "Request timed out: deadline elapsed"
        );
        assert_eq!(
            CoreError::AccountNotFound("ghost".into()).to_string(),
            "Account not found: ghost"
        );
    }

    #[test]
    fn upstream_names_the_source() {
        let err = CoreError::Upstream {
            source_name: "eastmoney-sector-list".into(),
            message: "board listing came back empty".into(),
        };
        let text = err.to_string();
        assert!(text.contains("eastmoney-sector-list"));
        assert!(text.contains("board listing came back empty"));
    }
}

mod conversions {
    use super::*;

    #[test]
    fn io_error_becomes_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn serde_error_becomes_deserialization() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: CoreError = parse_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }
}
