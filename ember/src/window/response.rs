use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use super::platform_message::PlatformMessageResponse;
use crate::error::CorrelationError;
use crate::framework::util::HashMap;

/// Correlates an inbound platform message with the logic context's reply.
/// Zero is reserved for "no reply expected" and is never allocated.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResponseHandle(u64);

impl ResponseHandle {
    pub const NONE: ResponseHandle = ResponseHandle(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandleState {
    Unallocated,
    AwaitingNativeReply,
    /// Completed or discarded; either way the handle is never matched again.
    Resolved,
}

/// Pending platform replies owned by one window. Only ever touched from UI.
pub struct ResponseCorrelator {
    next: u64,
    pending: HashMap<ResponseHandle, Arc<dyn PlatformMessageResponse>>,
    completed: u64,
    discarded: u64,
}

impl Default for ResponseCorrelator {
    fn default() -> Self {
        Self {
            next: 1,
            pending: HashMap::default(),
            completed: 0,
            discarded: 0,
        }
    }
}

impl ResponseCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(
        &mut self,
        response: Arc<dyn PlatformMessageResponse>,
    ) -> ResponseHandle {
        let handle = ResponseHandle(self.next);
        self.next += 1;
        self.pending.insert(handle, response);
        handle
    }

    /// Delivers `data` to the native reply for `handle`. Handle zero is a
    /// fire-and-forget reply and succeeds without doing anything.
    pub fn complete(
        &mut self,
        handle: ResponseHandle,
        data: Vec<u8>,
    ) -> Result<(), CorrelationError> {
        if handle.is_none() {
            return Ok(());
        }

        let response = self
            .pending
            .remove(&handle)
            .ok_or(CorrelationError::UnknownHandle(handle))?;

        self.completed += 1;
        if data.is_empty() {
            response.complete_empty();
        } else {
            response.complete(data);
        }
        Ok(())
    }

    /// Drops the reply for `handle` without delivering anything.
    pub fn discard(&mut self, handle: ResponseHandle) -> bool {
        if self.pending.remove(&handle).is_some() {
            self.discarded += 1;
            true
        } else {
            false
        }
    }

    pub fn discard_all(&mut self) -> usize {
        let count = self.pending.len();
        if count > 0 {
            debug!("discarding {} pending platform response(s)", count);
        }
        self.pending.clear();
        self.discarded += count as u64;
        count
    }

    pub fn state(&self, handle: ResponseHandle) -> HandleState {
        if self.pending.contains_key(&handle) {
            HandleState::AwaitingNativeReply
        } else if !handle.is_none() && handle.0 < self.next {
            HandleState::Resolved
        } else {
            HandleState::Unallocated
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded
    }
}

impl Drop for ResponseCorrelator {
    fn drop(&mut self) {
        let count = self.discard_all();
        if count > 0 {
            warn!("{} platform response(s) outlived their window", count);
        }
    }
}
