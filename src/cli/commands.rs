//! Running parsed CLI commands against the backend.

use std::io::Write;

use color_eyre::eyre::eyre;
use color_eyre::{Report, Result, Section};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::ChatError;
use crate::session::{QuerySessionController, SessionHandle, SessionNotice};
use crate::traits::HttpClient;

use super::output::{
    format_answer, format_conversation_line, format_message, format_payload, write_header,
};

/// Ask a question and stream the answer to `out`.
///
/// `notices` must be the receiving end of the controller's
/// [`crate::session::ChannelObserver`]. Returns the conversation the
/// answer landed in.
pub async fn run_ask<H, W>(
    controller: &mut QuerySessionController<H>,
    notices: &mut UnboundedReceiver<SessionNotice>,
    question: &str,
    conversation: Option<&str>,
    out: &mut W,
) -> Result<String>
where
    H: HttpClient + 'static,
    W: Write,
{
    if let Some(id) = conversation {
        controller.open_conversation(id).await.map_err(with_hint)?;
    }

    let handle = controller
        .submit(question, conversation)
        .await
        .map_err(with_hint)?;
    let mut streamed = false;

    loop {
        while let Ok(notice) = notices.try_recv() {
            if let Some(done) = print_notice(&handle, notice, &mut streamed, out)? {
                return done.map(|_| handle.conversation_id.clone());
            }
        }
        if !controller.process_next().await {
            return Err(eyre!("answer stream closed unexpectedly"));
        }
    }
}

/// Print one notice. Returns `Some` once the session is over.
fn print_notice<W: Write>(
    handle: &SessionHandle,
    notice: SessionNotice,
    streamed: &mut bool,
    out: &mut W,
) -> Result<Option<Result<()>>> {
    match notice {
        SessionNotice::Token { session_id, text } if session_id == handle.session_id => {
            write!(out, "{}", text)?;
            out.flush()?;
            *streamed = true;
            Ok(None)
        }
        SessionNotice::Completed(completion) if completion.session_id == handle.session_id => {
            if *streamed {
                writeln!(out)?;
                if let Some(payload) = &completion.message.payload {
                    for line in format_payload(payload) {
                        writeln!(out, "{}", line)?;
                    }
                }
            } else {
                for line in format_answer(&completion.message) {
                    writeln!(out, "{}", line)?;
                }
            }
            Ok(Some(Ok(())))
        }
        SessionNotice::Failed {
            session_id,
            message,
        } if session_id == handle.session_id => {
            if *streamed {
                writeln!(out)?;
            }
            Ok(Some(Err(eyre!(message))))
        }
        _ => Ok(None),
    }
}

/// Wrap a failure for the terminal, suggesting what to do next.
fn with_hint(err: ChatError) -> Report {
    let hint = err.recovery_hint();
    Report::new(err).suggestion(hint)
}

/// Print the conversation list.
pub async fn run_list<H, W>(controller: &mut QuerySessionController<H>, out: &mut W) -> Result<()>
where
    H: HttpClient + 'static,
    W: Write,
{
    controller.refresh_conversations().await.map_err(with_hint)?;
    let conversations = controller.store().conversations();
    if conversations.is_empty() {
        writeln!(out, "No conversations yet.")?;
    }
    for conversation in conversations {
        writeln!(out, "{}", format_conversation_line(conversation))?;
    }
    Ok(())
}

/// Print a conversation's history.
pub async fn run_show<H, W>(
    controller: &mut QuerySessionController<H>,
    id: &str,
    out: &mut W,
) -> Result<()>
where
    H: HttpClient + 'static,
    W: Write,
{
    let id = controller.open_conversation(id).await.map_err(with_hint)?;
    if let Some(conversation) = controller.store().conversation(&id) {
        write_header(out, &conversation.title)?;
    }
    for message in controller.store().messages(&id) {
        for line in format_message(message) {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

pub async fn run_delete<H, W>(
    controller: &mut QuerySessionController<H>,
    id: &str,
    out: &mut W,
) -> Result<()>
where
    H: HttpClient + 'static,
    W: Write,
{
    controller.delete_conversation(id).await.map_err(with_hint)?;
    writeln!(out, "Deleted conversation {}", id)?;
    Ok(())
}

pub async fn run_health<H, W>(controller: &QuerySessionController<H>, out: &mut W) -> Result<()>
where
    H: HttpClient + 'static,
    W: Write,
{
    let url = controller.backend().base_url.clone();
    if controller.backend().health().await.map_err(with_hint)? {
        writeln!(out, "{} is healthy", url)?;
        Ok(())
    } else {
        Err(eyre!("{} reported unhealthy", url))
    }
}
