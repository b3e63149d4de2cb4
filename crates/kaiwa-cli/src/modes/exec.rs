//! Non-interactive exec mode.

use std::io::Write;

use anyhow::{Result, bail};
use kaiwa_core::practice::{
    Notification, PracticeSession, SessionEffect, SessionEvent, parse_response,
};
use kaiwa_core::providers::gemini::GeminiClient;
use kaiwa_types::{ApiErrorBody, StructuredFeedback};

use super::transport;

/// Sends `prompt` as a single free-mode turn and prints the reply.
///
/// With `json`, prints the structured reply, or the error body when the
/// request fails.
///
/// # Errors
/// Returns an error if the request fails or output cannot be written.
pub async fn run_exec<W: Write>(
    out: &mut W,
    client: &GeminiClient,
    prompt: &str,
    json: bool,
) -> Result<()> {
    let mut session = PracticeSession::free();
    let submitted = session.update(SessionEvent::Submit {
        text: prompt.to_string(),
    });
    let Some(SessionEffect::SendRequest {
        message_id,
        request,
    }) = submitted.into_iter().next()
    else {
        bail!("Nothing to send");
    };

    let effects = transport::drive(client, &mut session, message_id, &request, |_| Ok(())).await?;
    for effect in effects {
        match effect {
            SessionEffect::Notify(Notification::TransportFailed { code, message }) => {
                if json {
                    writeln!(out, "{}", serde_json::to_string(&ApiErrorBody { error: code })?)?;
                }
                bail!("{code}: {message}");
            }
            SessionEffect::Finalized { message_id, .. } => {
                let Some(reply) = session
                    .history()
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.id == message_id)
                else {
                    bail!("Reply {message_id} missing from history");
                };
                let parsed = parse_response::<StructuredFeedback>(&reply.text);
                if json {
                    let payload = parsed.structured.unwrap_or_else(|| StructuredFeedback {
                        reply: parsed.display_text,
                        corrections: Vec::new(),
                        new_vocabulary: Vec::new(),
                    });
                    writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
                } else {
                    writeln!(out, "{}", parsed.display_text)?;
                }
            }
            SessionEffect::Notify(_) | SessionEffect::SendRequest { .. } => {}
        }
    }

    out.flush()?;
    Ok(())
}
