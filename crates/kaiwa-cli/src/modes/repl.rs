//! Line-based practice REPL.
//!
//! Reads one line at a time, feeds it to the practice session and executes
//! the effects it returns. Lines starting with `:` are commands.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use anyhow::Result;
use kaiwa_core::practice::{
    DisplayEntry, FeedbackView, LineStatus, ModeKind, Notification, PracticeSession,
    ScenarioPreview, SessionEffect, SessionEvent, SubmitError, TurnOutcome, Verdict,
};
use kaiwa_core::providers::gemini::GeminiClient;
use kaiwa_core::scenarios::ScenarioCatalog;
use kaiwa_types::{Correction, ErrorCode, MessageId, Role, Speaker, VocabEntry};
use tracing::info;

use super::transport;

const QUIT_COMMAND: &str = ":q";
const PROMPT_PREFIX: &str = "you> ";
const TUTOR_PREFIX: &str = "tutor> ";

const HELP_TEXT: &str = "\
Commands:
  :q               quit
  :scenario ID     start a scenario (keeps the current role)
  :role A|B        restart the scenario as the other role
  :script          show the scenario script and your position
  :feedback        show the latest corrections and vocabulary
  :history         show the conversation so far
  :help            show this help";

/// The scenario a session was started from, needed to restart it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveScenario {
    pub id: String,
    pub role: Speaker,
}

pub struct ReplSetup {
    pub catalog: ScenarioCatalog,
    pub session: PracticeSession,
    pub scenario: Option<ActiveScenario>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Scenario(&'a str),
    Role(&'a str),
    Script,
    Feedback,
    History,
    Help,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    if !line.starts_with(':') {
        return None;
    }
    if line == QUIT_COMMAND {
        return Some(Command::Quit);
    }
    let (name, arg) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(name, arg)| (name, arg.trim()));
    Some(match name {
        ":scenario" => Command::Scenario(arg),
        ":role" => Command::Role(arg),
        ":script" => Command::Script,
        ":feedback" => Command::Feedback,
        ":history" => Command::History,
        ":help" => Command::Help,
        _ => Command::Unknown(name),
    })
}

/// Runs the REPL until `:q` or end of input.
///
/// # Errors
/// Returns an error if reading input or writing output fails.
pub async fn run<R, W>(
    input: R,
    output: &mut W,
    client: &GeminiClient,
    setup: ReplSetup,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let ReplSetup {
        catalog,
        mut session,
        mut scenario,
    } = setup;

    write_banner(output, client.model(), &session)?;
    write!(output, "{PROMPT_PREFIX}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            write!(output, "{PROMPT_PREFIX}")?;
            output.flush()?;
            continue;
        }

        match parse_command(trimmed) {
            Some(Command::Quit) => {
                writeln!(output, "Goodbye!")?;
                return Ok(());
            }
            Some(Command::Scenario(id)) => {
                if id.is_empty() {
                    writeln!(output, "Usage: :scenario ID")?;
                } else {
                    let role = scenario.as_ref().map_or(Speaker::A, |s| s.role);
                    restart(output, client, &catalog, &mut session, &mut scenario, id, role)?;
                }
            }
            Some(Command::Role(arg)) => match (scenario.clone(), arg.parse::<Speaker>()) {
                (None, _) => writeln!(output, "No scenario active. Use :scenario ID first.")?,
                (Some(_), Err(e)) => writeln!(output, "Error: {e}")?,
                (Some(active), Ok(role)) => {
                    restart(
                        output,
                        client,
                        &catalog,
                        &mut session,
                        &mut scenario,
                        &active.id,
                        role,
                    )?;
                }
            },
            Some(Command::Script) => match session.preview() {
                Some(preview) => write_preview(output, &preview)?,
                None => writeln!(output, "No scenario active.")?,
            },
            Some(Command::Feedback) => write_feedback(output, session.feedback().view())?,
            Some(Command::History) => write_history(output, &session.display())?,
            Some(Command::Help) => writeln!(output, "{HELP_TEXT}")?,
            Some(Command::Unknown(name)) => {
                writeln!(output, "Unknown command: {name} (try :help)")?;
            }
            None => submit(output, client, &mut session, trimmed).await?,
        }

        write!(output, "{PROMPT_PREFIX}")?;
        output.flush()?;
    }

    Ok(())
}

/// Discards the session and starts `id` fresh as `role`.
fn restart<W: Write>(
    output: &mut W,
    client: &GeminiClient,
    catalog: &ScenarioCatalog,
    session: &mut PracticeSession,
    active: &mut Option<ActiveScenario>,
    id: &str,
    role: Speaker,
) -> Result<()> {
    let scenario = match catalog.require(id) {
        Ok(scenario) => scenario.clone(),
        Err(e) => {
            writeln!(output, "Error: {e:#}")?;
            return Ok(());
        }
    };
    info!(scenario = %scenario.id, %role, "Restarting practice session");
    *active = Some(ActiveScenario {
        id: scenario.id.clone(),
        role,
    });
    *session = PracticeSession::scenario(scenario, role);
    write_banner(output, client.model(), session)
}

async fn submit<W: Write>(
    output: &mut W,
    client: &GeminiClient,
    session: &mut PracticeSession,
    text: &str,
) -> Result<()> {
    let mut queue: VecDeque<SessionEffect> = session
        .update(SessionEvent::Submit {
            text: text.to_string(),
        })
        .into();

    while let Some(effect) = queue.pop_front() {
        match effect {
            SessionEffect::SendRequest {
                message_id,
                request,
            } => {
                let mut printer = StreamPrinter::default();
                let effects = transport::drive(client, session, message_id, &request, |s| {
                    printer.update(output, s.streaming_text())
                })
                .await?;
                printer.finish(output)?;
                queue.extend(effects);
            }
            SessionEffect::Notify(notification) => write_notification(output, &notification)?,
            SessionEffect::Finalized {
                message_id,
                outcome,
            } => {
                write_finalized(output, session, &message_id, outcome.as_ref())?;
            }
        }
    }
    Ok(())
}

/// Prints the growth of the parsed reply while it streams.
#[derive(Debug, Default)]
struct StreamPrinter {
    printed: String,
    latest: String,
    started: bool,
}

impl StreamPrinter {
    fn update<W: Write>(&mut self, output: &mut W, text: Option<String>) -> Result<()> {
        let Some(text) = text else {
            return Ok(());
        };
        if !self.started {
            write!(output, "{TUTOR_PREFIX}")?;
            self.started = true;
        }
        if let Some(suffix) = text.strip_prefix(self.printed.as_str()) {
            write!(output, "{suffix}")?;
            self.printed.clone_from(&text);
        }
        self.latest = text;
        output.flush()?;
        Ok(())
    }

    /// Ends the line; reprints the reply if it changed shape mid-stream.
    fn finish<W: Write>(&self, output: &mut W) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        writeln!(output)?;
        if self.printed != self.latest {
            writeln!(output, "{TUTOR_PREFIX}{}", self.latest)?;
        }
        Ok(())
    }
}

fn write_banner<W: Write>(output: &mut W, model: &str, session: &PracticeSession) -> Result<()> {
    match (session.mode_kind(), session.turns()) {
        (ModeKind::Scenario, Some(turns)) => {
            let scenario = turns.scenario();
            let role = turns.role();
            writeln!(
                output,
                "kaiwa scenario: {} ({}) [{model}]",
                scenario.title, scenario.id
            )?;
            writeln!(
                output,
                "You are {role}（{}）. Translate each of your lines into Japanese.",
                scenario.role_name(role)
            )?;
            writeln!(output, ":q to quit, :script to see the script, :help for commands")?;
            write_current_line(output, session)
        }
        _ => {
            writeln!(output, "kaiwa chat [{model}]")?;
            writeln!(output, "Write in Japanese. :q to quit, :help for commands")?;
            Ok(())
        }
    }
}

/// Prints the line the learner translates next, or the completion banner.
fn write_current_line<W: Write>(output: &mut W, session: &PracticeSession) -> Result<()> {
    let Some(turns) = session.turns() else {
        return Ok(());
    };
    let (done, total) = turns.progress();
    match turns.current_line() {
        Some((_, line)) if !turns.is_completed() => {
            let name = turns.scenario().role_name(line.speaker);
            writeln!(output, "[{done}/{total}] {name}: {}", line.text)?;
        }
        _ => writeln!(output, "Scenario complete! ({done}/{total})")?,
    }
    Ok(())
}

fn write_finalized<W: Write>(
    output: &mut W,
    session: &PracticeSession,
    message_id: &MessageId,
    outcome: Option<&TurnOutcome>,
) -> Result<()> {
    // A reply that never parsed leaves the previous turn's payload in place.
    let latest = session.feedback().latest_for(message_id);
    let Some(outcome) = outcome else {
        if let Some(latest) = latest {
            write_corrections(output, latest.corrections())?;
            write_vocabulary(output, latest.new_vocabulary())?;
        }
        return Ok(());
    };

    match &outcome.verdict {
        Verdict::Passed { partner_reply, .. } => {
            writeln!(output, "✓ Passed")?;
            if let (Some(reply), Some(turns)) = (partner_reply, session.turns()) {
                let partner = turns.scenario().role_name(turns.role().other());
                writeln!(output, "{partner}> {reply}")?;
            }
        }
        Verdict::Failed => {
            writeln!(output, "✗ Not quite. Try this line again.")?;
            if let Some(latest) = latest {
                write_corrections(output, latest.corrections())?;
            }
        }
    }
    write_current_line(output, session)
}

fn write_notification<W: Write>(output: &mut W, notification: &Notification) -> Result<()> {
    match notification {
        Notification::Rejected(SubmitError::Completed) => writeln!(
            output,
            "Input disabled: the scenario is complete. Use :scenario or :role to start again."
        )?,
        Notification::Rejected(err) => writeln!(output, "Error: {err}")?,
        Notification::TransportFailed {
            code: ErrorCode::RateLimit,
            ..
        } => writeln!(
            output,
            "Error [{}]: too many requests, wait a moment and try again.",
            ErrorCode::RateLimit
        )?,
        Notification::TransportFailed { code, message } => {
            writeln!(output, "Error [{code}]: {message}")?;
        }
        Notification::UnparseableVerdict => writeln!(
            output,
            "Could not read the verdict. Use :scenario or :role to restart."
        )?,
    }
    Ok(())
}

fn write_corrections<W: Write>(output: &mut W, corrections: &[Correction]) -> Result<()> {
    for correction in corrections {
        writeln!(
            output,
            "  ✎ {} → {}: {}",
            correction.original, correction.corrected, correction.explanation
        )?;
    }
    Ok(())
}

fn write_vocabulary<W: Write>(output: &mut W, vocabulary: &[VocabEntry]) -> Result<()> {
    for entry in vocabulary {
        if entry.headword() == entry.kana {
            writeln!(output, "  + {}: {}", entry.kana, entry.meaning)?;
        } else {
            writeln!(
                output,
                "  + {}（{}）: {}",
                entry.headword(),
                entry.kana,
                entry.meaning
            )?;
        }
    }
    Ok(())
}

fn write_feedback<W: Write>(output: &mut W, view: FeedbackView<'_>) -> Result<()> {
    match view {
        FeedbackView::Empty => writeln!(output, "No feedback yet.")?,
        FeedbackView::AllClear => writeln!(output, "No corrections. Nice work!")?,
        FeedbackView::Feedback {
            corrections,
            vocabulary,
            suggested_translation,
        } => {
            if let Some(suggestion) = suggested_translation {
                writeln!(output, "Suggested: {suggestion}")?;
            }
            if !corrections.is_empty() {
                writeln!(output, "Corrections:")?;
                write_corrections(output, corrections)?;
            }
            if !vocabulary.is_empty() {
                writeln!(output, "Vocabulary:")?;
                write_vocabulary(output, vocabulary)?;
            }
        }
    }
    Ok(())
}

fn write_preview<W: Write>(output: &mut W, preview: &ScenarioPreview) -> Result<()> {
    writeln!(output, "{}", preview.title)?;
    for line in &preview.lines {
        let marker = match line.status {
            LineStatus::Past => "✓",
            LineStatus::Active => "▶",
            LineStatus::Upcoming => " ",
        };
        let mine = if line.is_mine { "*" } else { " " };
        writeln!(
            output,
            "{marker}{mine} {}（{}）: {}",
            line.speaker, line.speaker_name, line.text
        )?;
    }
    Ok(())
}

fn write_history<W: Write>(output: &mut W, entries: &[DisplayEntry]) -> Result<()> {
    if entries.is_empty() {
        writeln!(output, "No messages yet.")?;
        return Ok(());
    }
    for entry in entries {
        let speaker = entry.label.as_deref().unwrap_or(match entry.role {
            Role::User => "you",
            Role::Assistant => "tutor",
        });
        let mut tags = String::new();
        if entry.badges.corrections {
            tags.push_str(" [corrections]");
        }
        if entry.badges.vocabulary {
            tags.push_str(" [vocabulary]");
        }
        if entry.streaming {
            tags.push_str(" …");
        }
        writeln!(output, "{speaker}> {}{tags}", entry.text)?;
    }
    Ok(())
}
