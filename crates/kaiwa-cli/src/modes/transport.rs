//! Runs one practice request and feeds the stream into the session.

use anyhow::Result;
use futures_util::StreamExt;
use kaiwa_core::practice::{PracticeSession, SessionEffect, SessionEvent};
use kaiwa_core::providers::gemini::GeminiClient;
use kaiwa_core::providers::{ProviderError, StreamEvent, failure_text};
use kaiwa_types::{MessageId, PracticeRequest};
use tracing::debug;

/// Streams the reply for `request` into `session`.
///
/// `on_fragment` runs after every text fragment so the caller can redraw.
/// A stream that ends without a finish reason counts as complete. Returns
/// the effects produced by completion or failure.
///
/// # Errors
/// Returns an error only if `on_fragment` fails.
pub async fn drive<F>(
    client: &GeminiClient,
    session: &mut PracticeSession,
    message_id: MessageId,
    request: &PracticeRequest,
    mut on_fragment: F,
) -> Result<Vec<SessionEffect>>
where
    F: FnMut(&PracticeSession) -> Result<()>,
{
    let mut effects = Vec::new();
    let mut stream = match client.stream_practice(request).await {
        Ok(stream) => stream,
        Err(err) => {
            effects.extend(session.update(SessionEvent::TransportFailed {
                message_id,
                message: failure_text(&err),
            }));
            return Ok(effects);
        }
    };

    while let Some(event) = stream.next().await {
        match event {
            Ok(StreamEvent::TextDelta { text }) => {
                effects.extend(session.update(SessionEvent::Fragment {
                    message_id: message_id.clone(),
                    text,
                }));
                on_fragment(session)?;
            }
            Ok(StreamEvent::Completed { finish_reason }) => {
                debug!(?finish_reason, "Reply stream finished");
                break;
            }
            Ok(StreamEvent::Error {
                error_type,
                message,
            }) => {
                let error = ProviderError::api_error(&error_type, &message);
                effects.extend(session.update(SessionEvent::TransportFailed {
                    message_id,
                    message: error.full_text(),
                }));
                return Ok(effects);
            }
            Err(error) => {
                effects.extend(session.update(SessionEvent::TransportFailed {
                    message_id,
                    message: error.full_text(),
                }));
                return Ok(effects);
            }
        }
    }

    effects.extend(session.update(SessionEvent::StreamCompleted { message_id }));
    Ok(effects)
}
