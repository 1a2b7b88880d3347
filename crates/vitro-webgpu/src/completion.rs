//! Async completion plumbing.
//!
//! Asynchronous boundary operations register a continuation and return
//! immediately. When the external API resolves, it hands the payload to a
//! [`CompletionSender`], which enqueues the continuation on the owning
//! [`CompletionQueue`]. Nothing runs at resolve time: delivery happens when
//! the event loop drains the queue via [`CompletionQueue::dispatch`], so
//! completions always resume on the thread driving the loop.
//!
//! `CompletionSender::resolve` consumes the sender, which makes the
//! exactly-once delivery contract structural rather than checked. The
//! standing registrations (uncaptured-error sink) use [`ErrorSink`] instead,
//! which can report any number of times.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Thunk = Box<dyn FnOnce()>;
type SharedQueue = Rc<RefCell<VecDeque<Thunk>>>;

/// Classified error/status code crossing the boundary.
///
/// `None` doubles as the success status: the same callback channel carries
/// success and failure, distinguished by this code.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    None = 0,
    OutOfMemory = 1,
    Validation = 2,
    /// Internal errors and anything the external API reports that we cannot
    /// classify.
    Internal = 3,
}

impl ErrorKind {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ErrorKind::None,
            1 => ErrorKind::OutOfMemory,
            2 => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }
}

/// A classified error with its human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GpuError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfMemory, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Reason delivered with the terminal device-lost notification.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceLostReason {
    Unknown = 0,
    Destroyed = 1,
}

/// Opaque token the caller passes at registration time and receives back,
/// unchanged, in the callback.
pub type UserData = u64;

/// Single-threaded completion queue.
#[derive(Clone, Default)]
pub struct CompletionQueue {
    ready: SharedQueue,
}

impl CompletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a single-shot sender that will run `continuation` with the
    /// resolved payload on the next [`dispatch`](Self::dispatch).
    pub fn sender<T: 'static>(
        &self,
        continuation: impl FnOnce(T) + 'static,
    ) -> CompletionSender<T> {
        CompletionSender {
            ready: Rc::clone(&self.ready),
            continuation: Box::new(continuation),
        }
    }

    /// Creates a standing sink that runs `handler` once per reported error.
    pub fn error_sink(&self, handler: impl FnMut(GpuError) + 'static) -> ErrorSink {
        ErrorSink {
            ready: Rc::clone(&self.ready),
            handler: Rc::new(RefCell::new(handler)),
        }
    }

    /// Delivers every queued completion, in arrival order, and returns how
    /// many ran. Continuations may themselves enqueue further completions;
    /// those are delivered in the same pass.
    pub fn dispatch(&self) -> usize {
        let mut dispatched = 0;
        loop {
            // Pop before running so a re-entrant dispatch cannot double-run.
            let next = self.ready.borrow_mut().pop_front();
            match next {
                Some(thunk) => {
                    thunk();
                    dispatched += 1;
                }
                None => return dispatched,
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.ready.borrow().len()
    }
}

/// One-shot completion handle given to the external API.
pub struct CompletionSender<T> {
    ready: SharedQueue,
    continuation: Box<dyn FnOnce(T)>,
}

impl<T: 'static> CompletionSender<T> {
    /// Queues the continuation with `value`. Consuming `self` makes a second
    /// resolution unrepresentable.
    pub fn resolve(self, value: T) {
        let CompletionSender {
            ready,
            continuation,
        } = self;
        ready
            .borrow_mut()
            .push_back(Box::new(move || continuation(value)));
    }
}

/// Standing error channel for a device's uncaptured-error sink. May report
/// an unbounded number of times for the life of the registration.
#[derive(Clone)]
pub struct ErrorSink {
    ready: SharedQueue,
    handler: Rc<RefCell<dyn FnMut(GpuError)>>,
}

impl ErrorSink {
    pub fn report(&self, error: GpuError) {
        let handler = Rc::clone(&self.handler);
        self.ready
            .borrow_mut()
            .push_back(Box::new(move || (&mut *handler.borrow_mut())(error)));
    }
}
