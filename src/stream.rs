use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Generous enough that a briefly slow UI loop never stalls the producer;
/// past this the producer blocks (backpressure) instead of dropping lines.
pub const LINE_CHANNEL_CAPACITY: usize = 128;

pub const DEFAULT_TAIL_LINES: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Line(String),
    Ended(StreamEnd),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The session requested cancellation; expected, never an error.
    Cancelled,
    /// The source closed cleanly (pod terminated, remote tail exited).
    Eof,
    /// The source failed with no cancellation pending.
    Failed(String),
}

/// Convert a byte source that may block indefinitely into a bounded channel of
/// discrete lines. The returned receiver yields zero or more `Line` events in
/// source order followed by exactly one `Ended` event.
pub fn spawn_line_stream<R>(source: R, cancel: CancellationToken) -> mpsc::Receiver<StreamEvent>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    tokio::spawn(read_lines(source, cancel, tx));
    rx
}

pub(crate) async fn read_lines<R>(
    source: R,
    cancel: CancellationToken,
    tx: mpsc::Sender<StreamEvent>,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Abandoning the read drops the source on return, which closes
                // the underlying connection and unblocks any pending I/O.
                let _ = tx.try_send(StreamEvent::Ended(StreamEnd::Cancelled));
                return;
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => {
                let _ = deliver(&tx, &cancel, StreamEvent::Ended(StreamEnd::Eof)).await;
                return;
            }
            Ok(_) => {
                // A final line without a trailing newline still arrives here;
                // the next read returns Ok(0) and ends the stream.
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                if deliver(&tx, &cancel, StreamEvent::Line(line)).await.is_err() {
                    return;
                }
            }
            Err(error) => {
                let end = if cancel.is_cancelled() {
                    StreamEnd::Cancelled
                } else {
                    StreamEnd::Failed(error.to_string())
                };
                let _ = deliver(&tx, &cancel, StreamEvent::Ended(end)).await;
                return;
            }
        }
    }
}

/// Send one event, racing the send against cancellation so a blocked consumer
/// can never keep the producer alive past a cancel request.
async fn deliver(
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    event: StreamEvent,
) -> Result<(), ()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            let _ = tx.try_send(StreamEvent::Ended(StreamEnd::Cancelled));
            Err(())
        }
        sent = tx.send(event) => sent.map_err(|_| ()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loaded,
    Streaming,
    Stopped,
}

/// Handed to the dispatcher when a stream starts: the generation identifies
/// events belonging to this stream, the token cancels it.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// What the reducer should do after feeding a stream event into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stale generation or irrelevant event; nothing to do.
    Ignored,
    /// A line was appended; redraw (and auto-scroll when following).
    Appended,
    /// The stream died while follow is on; start one replacement stream.
    Reconnect,
    /// The stream ended and nobody needs to hear about it.
    EndedQuietly,
    /// The stream ended for real; surface a transient notification.
    Failed(String),
}

/// Owns at most one active line stream for one target at a time, layered over
/// a one-shot tail fetch. Shared by the cluster-pod and remote-container log
/// views; only the target type differs.
#[derive(Debug)]
pub struct LogSession<T> {
    target: Option<T>,
    state: SessionState,
    lines: Vec<String>,
    follow: bool,
    timestamps: bool,
    generation: u64,
    cancel: Option<CancellationToken>,
    reconnect_spent: bool,
    search_query: String,
    search_matches: Vec<usize>,
    search_cursor: usize,
    pub tail_lines: i64,
}

impl<T: Clone + PartialEq> LogSession<T> {
    pub fn new() -> Self {
        Self {
            target: None,
            state: SessionState::Idle,
            lines: Vec::new(),
            follow: false,
            timestamps: false,
            generation: 0,
            cancel: None,
            reconnect_spent: false,
            search_query: String::new(),
            search_matches: Vec::new(),
            search_cursor: 0,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn following(&self) -> bool {
        self.follow
    }

    pub fn timestamps(&self) -> bool {
        self.timestamps
    }

    pub fn toggle_timestamps(&mut self) -> bool {
        self.timestamps = !self.timestamps;
        self.timestamps
    }

    /// True while a cancellation handle for a live stream exists.
    pub fn has_live_stream(&self) -> bool {
        self.cancel.is_some()
    }

    /// Attach to a new target: any active stream is cancelled first, the
    /// buffer is cleared, and the session returns to Idle awaiting a tail
    /// fetch.
    pub fn set_target(&mut self, target: T) {
        self.cancel_active();
        self.target = Some(target);
        self.lines.clear();
        self.state = SessionState::Idle;
        self.follow = false;
        self.reconnect_spent = false;
        self.refresh_search();
    }

    pub fn clear_target(&mut self) {
        self.cancel_active();
        self.target = None;
        self.lines.clear();
        self.state = SessionState::Idle;
        self.follow = false;
        self.reconnect_spent = false;
        self.search_query.clear();
        self.refresh_search();
    }

    /// Replace the buffer with a freshly fetched tail.
    pub fn set_tail(&mut self, content: &str) {
        self.lines = content
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        if self.state != SessionState::Streaming {
            self.state = SessionState::Loaded;
        }
        self.refresh_search();
    }

    /// Stop any active stream and invalidate in-flight events so the next
    /// tail fetch starts from a clean slate.
    pub fn prepare_refresh(&mut self) {
        self.stop_stream();
    }

    /// Arm a fresh stream: cancels a previous one, bumps the generation and
    /// hands back the ticket the dispatcher needs. Follow is on afterwards.
    pub fn begin_stream(&mut self) -> StreamTicket {
        self.cancel_active();
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        self.state = SessionState::Streaming;
        self.follow = true;
        StreamTicket {
            generation: self.generation,
            cancel: token,
        }
    }

    /// Cancel the active stream. The generation bump makes any events still
    /// queued from the old stream stale.
    pub fn stop_stream(&mut self) {
        self.cancel_active();
        self.follow = false;
        if self.state == SessionState::Streaming {
            self.state = SessionState::Stopped;
        }
    }

    /// Every teardown path advances the generation, so events that were
    /// already in flight when the old stream died can never touch the buffer.
    fn cancel_active(&mut self) {
        self.generation += 1;
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }

    pub fn apply_stream_event(&mut self, generation: u64, event: StreamEvent) -> SessionOutcome {
        if generation != self.generation {
            return SessionOutcome::Ignored;
        }

        match event {
            StreamEvent::Line(line) => {
                if self.state != SessionState::Streaming {
                    return SessionOutcome::Ignored;
                }
                // A delivered line proves the stream recovered; re-arm the
                // single-reconnect budget.
                self.reconnect_spent = false;
                self.append_line(line);
                SessionOutcome::Appended
            }
            StreamEvent::Ended(end) => {
                self.cancel = None;
                match end {
                    StreamEnd::Cancelled => {
                        if self.state == SessionState::Streaming {
                            self.state = SessionState::Stopped;
                        }
                        SessionOutcome::EndedQuietly
                    }
                    StreamEnd::Eof | StreamEnd::Failed(_) => {
                        let message = match end {
                            StreamEnd::Failed(message) => message,
                            _ => "log stream ended".to_string(),
                        };
                        if self.follow && !self.reconnect_spent {
                            self.reconnect_spent = true;
                            SessionOutcome::Reconnect
                        } else {
                            self.state = SessionState::Stopped;
                            self.follow = false;
                            SessionOutcome::Failed(message)
                        }
                    }
                }
            }
        }
    }

    fn append_line(&mut self, line: String) {
        if !self.search_query.is_empty() && line_matches(&line, &self.search_query) {
            self.search_matches.push(self.lines.len());
        }
        self.lines.push(line);
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.refresh_search();
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.refresh_search();
    }

    fn refresh_search(&mut self) {
        if self.search_query.is_empty() {
            self.search_matches.clear();
            self.search_cursor = 0;
            return;
        }
        self.search_matches = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line_matches(line, &self.search_query))
            .map(|(index, _)| index)
            .collect();
        self.search_cursor = self.search_cursor.min(self.search_matches.len().saturating_sub(1));
    }

    pub fn match_count(&self) -> usize {
        self.search_matches.len()
    }

    /// Line index of the current match, if any.
    pub fn current_match_line(&self) -> Option<usize> {
        self.search_matches.get(self.search_cursor).copied()
    }

    /// 1-based position of the current match for display.
    pub fn current_match(&self) -> usize {
        if self.search_matches.is_empty() {
            0
        } else {
            self.search_cursor + 1
        }
    }

    pub fn next_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        self.search_cursor = (self.search_cursor + 1) % self.search_matches.len();
    }

    pub fn prev_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        self.search_cursor = self
            .search_cursor
            .checked_sub(1)
            .unwrap_or(self.search_matches.len() - 1);
    }
}

impl<T: Clone + PartialEq> Default for LogSession<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn line_matches(line: &str, query: &str) -> bool {
    line.to_ascii_lowercase().contains(&query.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{
        LogSession, SessionOutcome, SessionState, StreamEnd, StreamEvent, read_lines,
        spawn_line_stream,
    };
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};
    use tokio_util::sync::CancellationToken;

    async fn next(rx: &mut mpsc::Receiver<StreamEvent>) -> StreamEvent {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event within deadline")
            .expect("channel open")
    }

    #[tokio::test]
    async fn lines_arrive_in_order_with_partial_tail() {
        let (mut writer, reader) = tokio::io::duplex(256);
        let cancel = CancellationToken::new();
        let mut rx = spawn_line_stream(reader, cancel);

        writer.write_all(b"one\ntwo\nthree").await.unwrap();
        drop(writer);

        assert_eq!(next(&mut rx).await, StreamEvent::Line("one".to_string()));
        assert_eq!(next(&mut rx).await, StreamEvent::Line("two".to_string()));
        assert_eq!(next(&mut rx).await, StreamEvent::Line("three".to_string()));
        assert_eq!(next(&mut rx).await, StreamEvent::Ended(StreamEnd::Eof));
    }

    #[tokio::test]
    async fn cancellation_ends_a_blocked_read() {
        let (mut writer, reader) = tokio::io::duplex(256);
        let cancel = CancellationToken::new();
        let mut rx = spawn_line_stream(reader, cancel.clone());

        writer.write_all(b"alpha\n").await.unwrap();
        assert_eq!(next(&mut rx).await, StreamEvent::Line("alpha".to_string()));

        cancel.cancel();
        assert_eq!(next(&mut rx).await, StreamEvent::Ended(StreamEnd::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_unblocks_a_full_channel() {
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(read_lines(reader, cancel.clone(), tx));

        // Far more lines than the channel holds; the producer must block.
        for _ in 0..64 {
            writer.write_all(b"spam\n").await.unwrap();
        }

        assert_eq!(next(&mut rx).await, StreamEvent::Line("spam".to_string()));
        cancel.cancel();
        timeout(Duration::from_secs(2), task)
            .await
            .expect("reader task must terminate after cancel")
            .unwrap();
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::other("connection reset")))
        }
    }

    #[tokio::test]
    async fn read_errors_without_cancellation_are_failures() {
        let cancel = CancellationToken::new();
        let mut rx = spawn_line_stream(FailingReader, cancel);
        match next(&mut rx).await {
            StreamEvent::Ended(StreamEnd::Failed(message)) => {
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn errors_after_cancellation_report_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut rx = spawn_line_stream(FailingReader, cancel);
        assert_eq!(next(&mut rx).await, StreamEvent::Ended(StreamEnd::Cancelled));
    }

    fn session() -> LogSession<String> {
        let mut session = LogSession::new();
        session.set_target("web-1".to_string());
        session
    }

    #[test]
    fn tail_fetch_moves_idle_to_loaded() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Idle);
        session.set_tail("a\nb\n");
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.lines().len(), 2);
    }

    #[test]
    fn at_most_one_cancellation_handle_is_live() {
        let mut session = session();
        let first = session.begin_stream();
        assert!(session.has_live_stream());
        let second = session.begin_stream();
        assert!(first.cancel.is_cancelled(), "starting a second stream must cancel the first");
        assert!(!second.cancel.is_cancelled());
        session.stop_stream();
        assert!(second.cancel.is_cancelled());
        assert!(!session.has_live_stream());
    }

    #[test]
    fn changing_target_cancels_before_anything_else() {
        let mut session = session();
        let ticket = session.begin_stream();
        session.set_target("web-2".to_string());
        assert!(ticket.cancel.is_cancelled());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.lines().is_empty());
    }

    #[test]
    fn stale_generation_events_are_ignored() {
        let mut session = session();
        let ticket = session.begin_stream();
        session.stop_stream();
        let outcome =
            session.apply_stream_event(ticket.generation, StreamEvent::Line("late".to_string()));
        assert_eq!(outcome, SessionOutcome::Ignored);
        assert!(session.lines().is_empty());
    }

    #[test]
    fn explicit_cancellation_is_never_an_error() {
        let mut session = session();
        let ticket = session.begin_stream();
        session.stop_stream();
        // The Ended(Cancelled) from the old stream is stale by then.
        let outcome = session
            .apply_stream_event(ticket.generation, StreamEvent::Ended(StreamEnd::Cancelled));
        assert_eq!(outcome, SessionOutcome::Ignored);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn unexpected_end_reconnects_exactly_once() {
        let mut session = session();
        let first = session.begin_stream();
        let outcome = session.apply_stream_event(
            first.generation,
            StreamEvent::Ended(StreamEnd::Failed("reset".to_string())),
        );
        assert_eq!(outcome, SessionOutcome::Reconnect);

        // The replacement stream dies again without delivering a line.
        let second = session.begin_stream();
        let outcome = session.apply_stream_event(
            second.generation,
            StreamEvent::Ended(StreamEnd::Failed("reset again".to_string())),
        );
        assert_eq!(outcome, SessionOutcome::Failed("reset again".to_string()));
        assert!(!session.following());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn a_delivered_line_rearms_the_reconnect_budget() {
        let mut session = session();
        let first = session.begin_stream();
        assert_eq!(
            session.apply_stream_event(
                first.generation,
                StreamEvent::Ended(StreamEnd::Failed("blip".to_string()))
            ),
            SessionOutcome::Reconnect
        );

        let second = session.begin_stream();
        assert_eq!(
            session.apply_stream_event(second.generation, StreamEvent::Line("ok".to_string())),
            SessionOutcome::Appended
        );
        assert_eq!(
            session.apply_stream_event(
                second.generation,
                StreamEvent::Ended(StreamEnd::Eof)
            ),
            SessionOutcome::Reconnect
        );
    }

    #[test]
    fn clearing_target_resets_everything() {
        let mut session = session();
        session.set_tail("a\nb\nc\n");
        session.begin_stream();
        session.clear_target();
        assert!(session.lines().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_live_stream());
        assert_eq!(session.match_count(), 0);
    }

    #[test]
    fn search_counts_match_buffer_contents() {
        let mut session = session();
        session.set_tail("GET /healthz\npost /api\nGET /metrics\n");
        session.set_search_query("get");
        assert_eq!(session.match_count(), 2);
        assert_eq!(session.current_match(), 1);

        session.next_match();
        assert_eq!(session.current_match(), 2);
        session.next_match();
        assert_eq!(session.current_match(), 1, "next wraps at the end");
        session.prev_match();
        assert_eq!(session.current_match(), 2, "prev wraps at the start");

        session.clear_search();
        assert_eq!(session.match_count(), 0);
        assert_eq!(session.lines().len(), 3, "clearing search keeps the buffer");
    }

    #[test]
    fn streamed_lines_join_the_search_projection() {
        let mut session = session();
        session.set_tail("error: disk full\n");
        session.set_search_query("error");
        assert_eq!(session.match_count(), 1);

        let ticket = session.begin_stream();
        session.apply_stream_event(ticket.generation, StreamEvent::Line("all good".to_string()));
        session.apply_stream_event(
            ticket.generation,
            StreamEvent::Line("ERROR: io timeout".to_string()),
        );
        assert_eq!(session.match_count(), 2);
    }
}
