//! Structured logging integration for events
//!
//! Converts engine events into tracing records with structured fields.

use libstage_events::{AppEvent, EventMessage, GeneralEvent, PlatformEvent, StagingEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an event message at its level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Staging(staging_event) => match staging_event {
            StagingEvent::RunStarted {
                module,
                target,
                scratch_dir,
                steps,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    module = %module,
                    target = %target,
                    scratch_dir = %scratch_dir.display(),
                    steps = steps,
                    "Staging started"
                );
            }
            StagingEvent::StepStarted { step, description } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    step = %step,
                    command = %description,
                    "Step started"
                );
            }
            StagingEvent::StepCompleted { step, duration_ms } => {
                debug!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    step = %step,
                    duration_ms = duration_ms,
                    "Step completed"
                );
            }
            StagingEvent::StepSkipped { step, reason } => {
                info!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    step = %step,
                    reason = %reason,
                    "Step skipped"
                );
            }
            StagingEvent::RunCompleted {
                module,
                artifacts,
                manifest_entries,
                duration_ms,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    module = %module,
                    artifacts = ?artifacts,
                    manifest_entries = manifest_entries,
                    duration_ms = duration_ms,
                    "Staging completed"
                );
            }
            StagingEvent::RunFailed {
                module,
                step,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    module = %module,
                    step = ?step,
                    code = ?failure.code,
                    message = %failure.message,
                    "Staging failed"
                );
            }
        },

        AppEvent::Platform(PlatformEvent::OperationFailed {
            context, failure, ..
        }) => {
            warn!(
                source = meta.source.as_str(),
                correlation = ?meta.correlation_id,
                operation = %context.operation,
                target = %context.target.display(),
                message = %failure.message,
                "Filesystem operation failed"
            );
        }
        AppEvent::Platform(PlatformEvent::OperationStarted { context }) => {
            trace!(
                source = meta.source.as_str(),
                correlation = ?meta.correlation_id,
                operation = %context.operation,
                target = %context.target.display(),
                "Filesystem operation started"
            );
        }
        AppEvent::Platform(PlatformEvent::OperationCompleted { context, metrics }) => {
            trace!(
                source = meta.source.as_str(),
                correlation = ?meta.correlation_id,
                operation = %context.operation,
                target = %context.target.display(),
                duration_ms = metrics.duration_ms,
                "Filesystem operation completed"
            );
        }

        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                message = %message,
                context = ?context,
                "Warning"
            );
        }
        AppEvent::General(GeneralEvent::OperationStarted { operation }) => {
            debug!(
                source = meta.source.as_str(),
                correlation = ?meta.correlation_id,
                operation = %operation,
                "Operation started"
            );
        }
        AppEvent::General(GeneralEvent::OperationCompleted { operation, success }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                operation = %operation,
                success = success,
                "Operation completed"
            );
        }
    }
}
