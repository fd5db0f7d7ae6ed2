// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background key reader — forwards scan codes to the application.
//
// A dedicated thread reads one scan code at a time and sends it on a
// caller-owned channel. On the first read error the error goes out on the
// second channel and the thread exits. No coalescing, no de-duplication:
// codes arrive in exactly the order they were read. Both channels are
// `SyncSender`s, so a full key channel stalls the reader (back-pressure).
//
// Shutdown: the stdin source polls with a short timeout and the loop checks
// an `AtomicBool` stop flag between polls, so `stop()` does not leave the
// thread stuck in a blocking `read()`. The loop also ends quietly when the
// key receiver is dropped. Dropping the `KeyReadLoop` handle detaches the
// thread; only `stop()` cancels it.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scancode::{self, ScanCode};

/// How often the reader thread checks the stop flag (milliseconds).
const POLL_TIMEOUT_MS: u64 = 50;

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Where the read loop gets its scan codes from.
pub trait ScanSource: Send + 'static {
    /// Wait up to `timeout` for the next scan code.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Sources that cannot
    /// time out may block past `timeout`.
    ///
    /// # Errors
    ///
    /// Any read failure. The loop forwards it and stops.
    fn next_scan_code(&mut self, timeout: Duration) -> io::Result<Option<ScanCode>>;
}

/// Standard input, polled so the loop can notice a stop request.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinSource;

impl ScanSource for StdinSource {
    #[cfg(unix)]
    fn next_scan_code(&mut self, timeout: Duration) -> io::Result<Option<ScanCode>> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: libc::STDIN_FILENO,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, millis)
        };

        if ready < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(None)
            } else {
                Err(err)
            };
        }
        if ready == 0 {
            return Ok(None);
        }

        scancode::read_stdin().map(Some)
    }

    /// Non-unix fallback: blocking read, stop only takes effect after the
    /// next keypress.
    #[cfg(not(unix))]
    fn next_scan_code(&mut self, _timeout: Duration) -> io::Result<Option<ScanCode>> {
        scancode::read_stdin().map(Some)
    }
}

/// Any blocking reader; one `read` call per scan code.
///
/// The stop flag is only checked between reads.
#[derive(Debug)]
pub struct ReadSource<R>(pub R);

impl<R: Read + Send + 'static> ScanSource for ReadSource<R> {
    fn next_scan_code(&mut self, _timeout: Duration) -> io::Result<Option<ScanCode>> {
        scancode::read_scan_code_from(&mut self.0).map(Some)
    }
}

// ─── KeyReadLoop ─────────────────────────────────────────────────────────────

/// Handle to the background read thread.
///
/// The thread runs until a read fails, the key receiver is dropped, or
/// [`stop`](Self::stop) is called. Dropping the handle detaches the thread;
/// it keeps reading. Keep draining the key channel while stopping: a reader
/// blocked on a full channel cannot see the stop flag.
///
/// # Example
///
/// ```no_run
/// use std::sync::mpsc;
/// use termo::reader::start_key_read_loop;
///
/// let (keys_tx, keys) = mpsc::sync_channel(16);
/// let (errors_tx, errors) = mpsc::sync_channel(1);
/// let _reader = start_key_read_loop(keys_tx, errors_tx)?;
///
/// while let Ok(code) = keys.recv() {
///     if code.rune() == 'q' {
///         break;
///     }
/// }
/// # let _ = errors;
/// # Ok::<(), termo::Error>(())
/// ```
pub struct KeyReadLoop {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

/// Start reading scan codes from standard input in the background.
///
/// # Errors
///
/// Returns an error if the OS cannot spawn the thread.
pub fn start_key_read_loop(
    keys: SyncSender<ScanCode>,
    errors: SyncSender<Error>,
) -> Result<KeyReadLoop> {
    KeyReadLoop::spawn_with(StdinSource, keys, errors)
}

impl KeyReadLoop {
    /// Start the read loop over an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot spawn the thread.
    pub fn spawn_with<S: ScanSource>(
        source: S,
        keys: SyncSender<ScanCode>,
        errors: SyncSender<Error>,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("termo-keys".into())
            .spawn(move || Self::read_loop(source, &keys, &errors, &stop_flag))?;

        tracing::debug!("key read loop started");
        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Whether the thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signal the thread to stop and wait for it to exit.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn read_loop<S: ScanSource>(
        mut source: S,
        keys: &SyncSender<ScanCode>,
        errors: &SyncSender<Error>,
        stop: &AtomicBool,
    ) {
        let timeout = Duration::from_millis(POLL_TIMEOUT_MS);

        while !stop.load(Ordering::Relaxed) {
            match source.next_scan_code(timeout) {
                Ok(None) => {}
                Ok(Some(code)) => {
                    tracing::trace!(?code, "scan code");
                    if keys.send(code).is_err() {
                        tracing::debug!("key receiver dropped, read loop exiting");
                        return;
                    }
                }
                Err(err) => {
                    tracing::debug!(%err, "key read loop stopped on read error");
                    let _ = errors.send(Error::Io(err));
                    return;
                }
            }
        }

        tracing::debug!("key read loop stopped");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::mpsc::{self, TryRecvError};

    /// Replays a fixed script, then reports end of input.
    struct Scripted(VecDeque<io::Result<Option<ScanCode>>>);

    impl Scripted {
        fn keys(chunks: &[&[u8]]) -> Self {
            Self(
                chunks
                    .iter()
                    .map(|c| Ok(Some(ScanCode::from_bytes(c))))
                    .collect(),
            )
        }
    }

    impl ScanSource for Scripted {
        fn next_scan_code(&mut self, _timeout: Duration) -> io::Result<Option<ScanCode>> {
            self.0.pop_front().unwrap_or_else(|| {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script done"))
            })
        }
    }

    /// Never produces anything.
    struct Idle;

    impl ScanSource for Idle {
        fn next_scan_code(&mut self, timeout: Duration) -> io::Result<Option<ScanCode>> {
            thread::sleep(timeout.min(Duration::from_millis(5)));
            Ok(None)
        }
    }

    /// Produces the same key forever.
    struct Repeat;

    impl ScanSource for Repeat {
        fn next_scan_code(&mut self, _timeout: Duration) -> io::Result<Option<ScanCode>> {
            Ok(Some(ScanCode::from_bytes(b"x")))
        }
    }

    #[test]
    fn poll_timeout_reasonable() {
        assert!(POLL_TIMEOUT_MS >= 10);
        assert!(POLL_TIMEOUT_MS <= 500);
    }

    #[test]
    fn forwards_codes_in_order_then_error() {
        let (keys_tx, keys) = mpsc::sync_channel(1);
        let (errors_tx, errors) = mpsc::sync_channel(1);
        let mut reader =
            KeyReadLoop::spawn_with(Scripted::keys(&[b"a", b"\x1b[A", b"b"]), keys_tx, errors_tx)
                .unwrap();

        let got: Vec<ScanCode> = keys.iter().collect();
        assert_eq!(
            got,
            [
                ScanCode::from_bytes(b"a"),
                ScanCode::from_bytes(b"\x1b[A"),
                ScanCode::from_bytes(b"b"),
            ]
        );

        let err = errors.recv().unwrap();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        reader.stop();
        assert!(reader.is_finished());
    }

    #[test]
    fn timeouts_are_not_forwarded() {
        let mut script = Scripted::keys(&[b"a"]);
        script.0.push_front(Ok(None));
        script.0.push_back(Ok(None));
        script.0.push_back(Ok(Some(ScanCode::from_bytes(b"b"))));

        let (keys_tx, keys) = mpsc::sync_channel(4);
        let (errors_tx, _errors) = mpsc::sync_channel(1);
        let _reader = KeyReadLoop::spawn_with(script, keys_tx, errors_tx).unwrap();

        let got: Vec<char> = keys.iter().map(|c| c.rune()).collect();
        assert_eq!(got, ['a', 'b']);
    }

    #[test]
    fn read_error_is_forwarded() {
        let script = Scripted(VecDeque::from([Err(io::Error::other("tty gone"))]));
        let (keys_tx, keys) = mpsc::sync_channel(1);
        let (errors_tx, errors) = mpsc::sync_channel(1);
        let _reader = KeyReadLoop::spawn_with(script, keys_tx, errors_tx).unwrap();

        assert_eq!(errors.recv().unwrap().to_string(), "tty gone");
        assert!(keys.recv().is_err(), "key channel closes after the error");
    }

    #[test]
    fn stop_ends_idle_loop() {
        let (keys_tx, keys) = mpsc::sync_channel(1);
        let (errors_tx, errors) = mpsc::sync_channel(1);
        let mut reader = KeyReadLoop::spawn_with(Idle, keys_tx, errors_tx).unwrap();

        reader.stop();
        assert!(reader.is_finished());
        assert_eq!(keys.try_recv(), Err(TryRecvError::Disconnected));
        assert!(matches!(errors.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn stop_is_idempotent() {
        let (keys_tx, _keys) = mpsc::sync_channel(1);
        let (errors_tx, _errors) = mpsc::sync_channel(1);
        let mut reader = KeyReadLoop::spawn_with(Idle, keys_tx, errors_tx).unwrap();
        reader.stop();
        reader.stop();
    }

    #[test]
    fn dropped_receiver_ends_loop_without_error() {
        let (keys_tx, keys) = mpsc::sync_channel(1);
        let (errors_tx, errors) = mpsc::sync_channel(1);
        let mut reader = KeyReadLoop::spawn_with(Repeat, keys_tx, errors_tx).unwrap();

        assert_eq!(keys.recv().unwrap().rune(), 'x');
        drop(keys);
        reader.stop();
        assert!(matches!(errors.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn read_source_over_bytes() {
        let (keys_tx, keys) = mpsc::sync_channel(4);
        let (errors_tx, errors) = mpsc::sync_channel(1);
        let source = ReadSource(Cursor::new(b"ab".to_vec()));
        let _reader = KeyReadLoop::spawn_with(source, keys_tx, errors_tx).unwrap();

        assert_eq!(keys.recv().unwrap().as_bytes(), b"ab");
        assert!(matches!(errors.recv().unwrap(), Error::Io(_)));
    }

    /// Yields `n` keys with a short pause before each, then fails.
    struct Slow(u8);

    impl ScanSource for Slow {
        fn next_scan_code(&mut self, _timeout: Duration) -> io::Result<Option<ScanCode>> {
            thread::sleep(Duration::from_millis(5));
            if self.0 == 0 {
                return Err(io::Error::other("input closed"));
            }
            self.0 -= 1;
            Ok(Some(ScanCode::from_bytes(b"k")))
        }
    }

    #[test]
    fn dropped_handle_keeps_reading() {
        let (keys_tx, keys) = mpsc::sync_channel(1);
        let (errors_tx, errors) = mpsc::sync_channel(1);
        drop(KeyReadLoop::spawn_with(Slow(3), keys_tx, errors_tx).unwrap());

        assert_eq!(keys.iter().count(), 3);
        assert_eq!(errors.recv().unwrap().to_string(), "input closed");
    }

    #[test]
    fn stdin_loop_spawns_and_stops() {
        // Stdin is not a terminal under the test harness; the loop either
        // idles or reports end of input. Either way it must not hang.
        let (keys_tx, _keys) = mpsc::sync_channel(16);
        let (errors_tx, _errors) = mpsc::sync_channel(1);
        let mut reader = start_key_read_loop(keys_tx, errors_tx).unwrap();
        reader.stop();
        assert!(reader.is_finished());
    }
}
