//! Integration tests for events

#[cfg(test)]
mod tests {
    use libstage_errors::StagingError;
    use libstage_events::*;

    #[tokio::test]
    async fn test_event_sender_emit() {
        let (tx, mut rx) = channel();

        tx.emit_operation_started("verify");
        tx.emit_warning_with_context("staged tree drifted", "out/metadata.txt");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::OperationStarted { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Info);
        assert_eq!(first.meta.source, EventSource::GENERAL);

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second.event,
            AppEvent::General(GeneralEvent::Warning { context: Some(_), .. })
        ));
        assert_eq!(second.meta.level, EventLevel::Warn);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_operation_completed("verify", false);
    }

    #[test]
    fn test_run_failed_is_error_level() {
        let failure = FailureContext::from_error(&StagingError::UnsupportedArchitecture {
            cpu_type: "sparc".into(),
        });
        assert_eq!(
            failure.code.as_deref(),
            Some("staging.unsupported_architecture")
        );

        let event = AppEvent::Staging(StagingEvent::RunFailed {
            module: "dex".into(),
            step: Some("copy_native_libraries".into()),
            failure,
        });
        assert_eq!(event.log_level(), tracing::Level::ERROR);
        assert_eq!(event.log_target(), "libstage::events::staging");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Staging(StagingEvent::StepCompleted {
            step: "hash_native_libs".into(),
            duration_ms: 3,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "staging");
        assert_eq!(json["event"]["type"], "step_completed");
    }
}
