use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Receiver of a single reply to a platform message. Implementations must
/// tolerate being completed from any context and ignore anything after the
/// first completion.
pub trait PlatformMessageResponse: Send + Sync {
    fn complete(&self, data: Vec<u8>);

    fn complete_empty(&self);

    fn is_complete(&self) -> bool;
}

type ReplyFn = Box<dyn FnOnce(Option<Vec<u8>>) + Send + 'static>;

/// [`PlatformMessageResponse`] backed by a one-shot closure. `None` signals an
/// empty reply.
pub struct CallbackResponse {
    callback: Mutex<Option<ReplyFn>>,
    completed: AtomicBool,
}

impl CallbackResponse {
    pub fn new<F>(callback: F) -> Arc<Self>
    where
        F: FnOnce(Option<Vec<u8>>) + Send + 'static,
    {
        Arc::new(Self {
            callback: Mutex::new(Some(Box::new(callback))),
            completed: AtomicBool::new(false),
        })
    }

    fn finish(&self, data: Option<Vec<u8>>) {
        if self.completed.swap(true, Ordering::AcqRel) {
            return;
        }
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(data);
        }
    }
}

impl PlatformMessageResponse for CallbackResponse {
    fn complete(&self, data: Vec<u8>) {
        self.finish(Some(data));
    }

    fn complete_empty(&self) {
        self.finish(None);
    }

    fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

/// Immutable message crossing the platform boundary in either direction.
#[derive(Clone)]
pub struct PlatformMessage {
    channel: String,
    data: Arc<[u8]>,
    response: Option<Arc<dyn PlatformMessageResponse>>,
}

impl PlatformMessage {
    pub fn new(
        channel: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
        response: Option<Arc<dyn PlatformMessageResponse>>,
    ) -> Self {
        Self {
            channel: channel.into(),
            data: data.into(),
            response,
        }
    }

    /// A message nobody will reply to.
    pub fn fire_and_forget(
        channel: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self::new(channel, data, None)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn response(&self) -> Option<&Arc<dyn PlatformMessageResponse>> {
        self.response.as_ref()
    }

    pub fn expects_response(&self) -> bool {
        self.response.is_some()
    }
}

impl fmt::Debug for PlatformMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformMessage")
            .field("channel", &self.channel)
            .field("len", &self.data.len())
            .field("expects_response", &self.expects_response())
            .finish()
    }
}
