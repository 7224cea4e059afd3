//! Chat worker: one thread per request, feeding chunks back to the event loop.

use super::controller::{ChatEvent, ChatEventKind};
use super::reply::{CancelToken, ReplyId};
use crate::api::{ApiError, ChatBody, ControlApi};
use crate::utf8_safe::Utf8Reassembler;
use crate::{log_debug, log_debug_content};
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const READ_CHUNK_BYTES: usize = 1024;

/// Run one chat request on a worker thread.
pub fn spawn_chat_job(
    api: Arc<dyn ControlApi>,
    reply: ReplyId,
    message: String,
    cancel: CancelToken,
    events: Sender<ChatEvent>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("sortpanel-chat-{reply}"))
        .spawn(move || run_chat(api.as_ref(), reply, &message, &cancel, &events))
        .context("failed to spawn chat worker")
}

fn run_chat(
    api: &dyn ControlApi,
    reply: ReplyId,
    message: &str,
    cancel: &CancelToken,
    events: &Sender<ChatEvent>,
) {
    let started = Instant::now();
    let emit = |kind: ChatEventKind| events.send(ChatEvent { reply, kind }).is_ok();

    let outcome = api
        .chat(message)
        .and_then(|body| deliver_body(body, cancel, &emit));

    match outcome {
        Ok(Delivery::Reply(bytes)) => {
            log_debug(&format!(
                "chat reply {reply} answered: {bytes} bytes in {} ms",
                started.elapsed().as_millis()
            ));
        }
        Ok(Delivery::Stream(_)) | Err(_) if cancel.is_cancelled() => {
            log_debug(&format!("chat reply {reply} abandoned"));
        }
        Ok(Delivery::Stream(bytes)) => {
            log_debug(&format!(
                "chat reply {reply} finished: {bytes} bytes in {} ms",
                started.elapsed().as_millis()
            ));
            emit(ChatEventKind::Finished);
        }
        Err(err) => {
            log_debug_content(&format!("chat reply {reply} failed: {err}"));
            emit(ChatEventKind::Failed(err.to_string()));
        }
    }
}

/// How a chat body reached the event loop, with the byte count delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// One `Reply` event; the reply stays pending for its continuation.
    Reply(usize),
    /// `Chunk` events in arrival order; the caller reports `Finished`.
    Stream(usize),
}

/// Push a chat body through `emit`. A `{reply}` body always goes out as one
/// `Reply` event, even after a continuation closed the reply, so its text is
/// never lost. A stream stops quietly once `cancel` trips or the receiver goes away.
fn deliver_body(
    body: ChatBody,
    cancel: &CancelToken,
    emit: impl Fn(ChatEventKind) -> bool,
) -> Result<Delivery, ApiError> {
    match body {
        ChatBody::Reply(text) => {
            let len = text.len();
            emit(ChatEventKind::Reply(text));
            Ok(Delivery::Reply(len))
        }
        ChatBody::Stream(mut reader) => {
            pump_stream(reader.as_mut(), cancel, |chunk| emit(ChatEventKind::Chunk(chunk)))
                .map(Delivery::Stream)
        }
    }
}

fn pump_stream(
    reader: &mut dyn Read,
    cancel: &CancelToken,
    mut on_chunk: impl FnMut(String) -> bool,
) -> Result<usize, ApiError> {
    let mut decoder = Utf8Reassembler::new();
    let mut buf = [0u8; READ_CHUNK_BYTES];
    let mut delivered = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Ok(delivered);
        }
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(ApiError::Stream(err)),
        };
        let text = decoder.push(&buf[..read]);
        if text.is_empty() {
            continue;
        }
        if cancel.is_cancelled() {
            return Ok(delivered);
        }
        delivered += text.len();
        if !on_chunk(text) {
            return Ok(delivered);
        }
    }
    let tail = decoder.finish();
    if !tail.is_empty() && !cancel.is_cancelled() {
        delivered += tail.len();
        on_chunk(tail);
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    /// Reader that hands out fixed slices, one per `read` call.
    struct Pieces(Vec<Vec<u8>>);

    impl Read for Pieces {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let piece = self.0.remove(0);
            buf[..piece.len()].copy_from_slice(&piece);
            Ok(piece.len())
        }
    }

    fn collect(body: ChatBody, cancel: &CancelToken) -> (Vec<String>, Result<Delivery, ApiError>) {
        let seen = RefCell::new(Vec::new());
        let result = deliver_body(body, cancel, |kind| {
            match kind {
                ChatEventKind::Chunk(text) | ChatEventKind::Reply(text) => {
                    seen.borrow_mut().push(text)
                }
                other => panic!("unexpected event {other:?}"),
            }
            true
        });
        (seen.into_inner(), result)
    }

    #[test]
    fn json_reply_is_one_reply_event() {
        let seen = RefCell::new(Vec::new());
        let result = deliver_body(ChatBody::Reply("Done.".into()), &CancelToken::new(), |kind| {
            seen.borrow_mut().push(kind);
            true
        });
        assert_eq!(
            seen.into_inner(),
            vec![ChatEventKind::Reply("Done.".into())]
        );
        assert_eq!(result.ok(), Some(Delivery::Reply(5)));
    }

    #[test]
    fn json_reply_survives_a_closed_reply() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (texts, result) = collect(ChatBody::Reply("Moving it.".into()), &cancel);
        assert_eq!(texts, vec!["Moving it."]);
        assert_eq!(result.ok(), Some(Delivery::Reply(10)));
    }

    #[test]
    fn stream_chunks_keep_order_and_characters_intact() {
        let text = "放入 1 号仓";
        let bytes = text.as_bytes();
        let pieces = Pieces(vec![bytes[..4].to_vec(), bytes[4..9].to_vec(), bytes[9..].to_vec()]);
        let (chunks, result) = collect(ChatBody::Stream(Box::new(pieces)), &CancelToken::new());
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|chunk| !chunk.contains('\u{fffd}')));
        assert_eq!(result.ok(), Some(Delivery::Stream(bytes.len())));
    }

    #[test]
    fn cancelled_stream_delivers_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let body = ChatBody::Stream(Box::new(Cursor::new(b"late text".to_vec())));
        let (chunks, _) = collect(body, &cancel);
        assert!(chunks.is_empty());
    }

    #[test]
    fn stream_stops_after_cancel_mid_way() {
        let cancel = CancelToken::new();
        let pieces = Pieces(vec![b"one ".to_vec(), b"two".to_vec()]);
        let seen = RefCell::new(Vec::new());
        let _ = deliver_body(ChatBody::Stream(Box::new(pieces)), &cancel, |kind| {
            seen.borrow_mut().push(kind);
            cancel.cancel();
            true
        });
        assert_eq!(
            seen.into_inner(),
            vec![ChatEventKind::Chunk("one ".into())]
        );
    }

    #[test]
    fn read_errors_surface() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"))
            }
        }
        let (_, result) = collect(ChatBody::Stream(Box::new(Broken)), &CancelToken::new());
        assert!(matches!(result, Err(ApiError::Stream(_))));
    }
}
