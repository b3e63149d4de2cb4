//! Gemini SSE stream parser.

use std::collections::VecDeque;
use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde_json::Value;

use crate::providers::{ProviderError, ProviderErrorKind, ProviderResult, StreamEvent};

/// Gemini SSE stream parser.
///
/// Converts `streamGenerateContent?alt=sse` chunks into `StreamEvent`s.
/// Thought parts are skipped; only answer text is forwarded.
pub struct GeminiSseParser<S> {
    inner: EventStream<S>,
    pending: VecDeque<StreamEvent>,
    emitted_done: bool,
}

impl<S> GeminiSseParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
            pending: VecDeque::new(),
            emitted_done: false,
        }
    }

    fn handle_event_data(&mut self, data: &str) -> ProviderResult<()> {
        let trimmed = data.trim();
        if trimmed.is_empty() || trimmed == "[DONE]" {
            return Ok(());
        }

        let value = serde_json::from_str::<Value>(trimmed).map_err(|err| {
            ProviderError::new(
                ProviderErrorKind::Parse,
                format!("Failed to parse SSE JSON: {err}"),
            )
        })?;
        self.handle_chunk(&value);
        Ok(())
    }

    fn handle_chunk(&mut self, value: &Value) {
        let payload = value.get("response").unwrap_or(value);

        if let Some(error) = value.get("error").or_else(|| payload.get("error")) {
            let error_type = error
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| error.get("code").map(Value::to_string))
                .unwrap_or_else(|| "error".to_string());
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            self.pending.push_back(StreamEvent::Error {
                error_type,
                message,
            });
            return;
        }

        let Some(candidate) = payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
        else {
            return;
        };

        if let Some(parts) = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
        {
            let combined_text: String = parts
                .iter()
                .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();

            if !combined_text.is_empty() {
                self.pending
                    .push_back(StreamEvent::TextDelta { text: combined_text });
            }
        }

        if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str)
            && !self.emitted_done
        {
            self.emitted_done = true;
            self.pending.push_back(StreamEvent::Completed {
                finish_reason: Some(map_finish_reason(reason)),
            });
        }
    }
}

impl<S, E> Stream for GeminiSseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ProviderResult<StreamEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        loop {
            if let Some(event) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            let inner = Pin::new(&mut self.inner);
            match inner.poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if let Err(err) = self.handle_event_data(&event.data) {
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ProviderError::new(
                        ProviderErrorKind::Parse,
                        format!("SSE stream error: {e}"),
                    ))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Maps Gemini finish reasons to normalized stop reasons.
pub fn map_finish_reason(reason: &str) -> String {
    match reason {
        "MAX_TOKENS" | "max_tokens" => "max_tokens".to_string(),
        "STOP" | "stop" => "stop".to_string(),
        other => other.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::{StreamExt, stream};
    use serde_json::json;

    use super::*;

    fn create_test_parser() -> GeminiSseParser<impl Stream<Item = Result<Bytes, std::io::Error>>> {
        GeminiSseParser::new(stream::empty())
    }

    fn text_chunk(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn text_parts_emit_deltas() {
        let mut parser = create_test_parser();
        parser.handle_chunk(&text_chunk("{\"reply\":"));
        parser.handle_chunk(&text_chunk("\"はい\"}"));

        let texts: Vec<_> = parser
            .pending
            .iter()
            .map(|event| match event {
                StreamEvent::TextDelta { text } => text.as_str(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(texts, vec!["{\"reply\":", "\"はい\"}"]);
    }

    #[test]
    fn chunks_sharing_a_prefix_are_forwarded_whole() {
        let mut parser = create_test_parser();
        for chunk in ["{\"passed\":true,\"reply\":\"は", "は", "はい\"}"] {
            parser.handle_chunk(&text_chunk(chunk));
        }

        let text: String = parser
            .pending
            .iter()
            .map(|event| match event {
                StreamEvent::TextDelta { text } => text.as_str(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(text, "{\"passed\":true,\"reply\":\"はははい\"}");
    }

    #[test]
    fn thought_parts_are_skipped() {
        let mut parser = create_test_parser();
        parser.handle_chunk(&json!({
            "candidates": [{ "content": { "parts": [
                { "thought": true, "text": "thinking..." },
                { "text": "{}" }
            ] } }]
        }));
        assert_eq!(
            parser.pending.pop_front(),
            Some(StreamEvent::TextDelta {
                text: "{}".to_string()
            })
        );
        assert!(parser.pending.is_empty());
    }

    #[test]
    fn finish_reason_emits_single_completion() {
        let mut parser = create_test_parser();
        let chunk = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "done" }] },
                "finishReason": "STOP"
            }]
        });
        parser.handle_chunk(&chunk);
        parser.handle_chunk(&json!({ "candidates": [{ "finishReason": "STOP" }] }));

        assert_eq!(parser.pending.len(), 2);
        assert_eq!(
            parser.pending.back(),
            Some(&StreamEvent::Completed {
                finish_reason: Some("stop".to_string())
            })
        );
    }

    #[test]
    fn error_chunk_becomes_error_event() {
        let mut parser = create_test_parser();
        parser.handle_chunk(&json!({
            "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        }));
        assert_eq!(
            parser.pending.pop_front(),
            Some(StreamEvent::Error {
                error_type: "RESOURCE_EXHAUSTED".to_string(),
                message: "Quota exceeded".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn parses_byte_stream() {
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"{\\\"reply\\\":\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"\\\"ok\\\"}\"}]},\"finishReason\":\"STOP\"}]}\n\n",
        );
        let bytes = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(body))]);
        let events: Vec<_> = GeminiSseParser::new(bytes)
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta {
                    text: "{\"reply\":".to_string()
                },
                StreamEvent::TextDelta {
                    text: "\"ok\"}".to_string()
                },
                StreamEvent::Completed {
                    finish_reason: Some("stop".to_string())
                },
            ]
        );
    }

    #[test]
    fn maps_finish_reasons() {
        assert_eq!(map_finish_reason("MAX_TOKENS"), "max_tokens");
        assert_eq!(map_finish_reason("SAFETY"), "safety");
    }
}
