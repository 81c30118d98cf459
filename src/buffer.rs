//! Owned document buffers and the allocator they come from.
//!
//! Request documents and response buffers are obtained through a
//! [`BufferAllocator`] so that allocation failure is an ordinary error
//! (`JobsError::NoMemory`) instead of an abort. [`HeapAllocator`] is the
//! default and uses `Vec::try_reserve_exact`.
//!
//! A [`ResponseBuffer`] is handed to exactly one owner on completion. It is
//! released by dropping it or by calling [`ResponseBuffer::release`]; since
//! both consume the buffer, releasing twice does not compile.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::json;
use crate::request::JobState;

/// Source of document buffers.
pub trait BufferAllocator: Send + Sync {
    /// Return an empty vector able to hold at least `len` bytes without
    /// reallocating.
    fn allocate(&self, len: usize) -> Result<Vec<u8>>;
}

/// Allocator backed by the global heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)?;
        Ok(buf)
    }
}

/// Shared handle to an allocator.
pub type SharedAllocator = Arc<dyn BufferAllocator>;

/// The default shared allocator.
pub fn default_allocator() -> SharedAllocator {
    Arc::new(HeapAllocator)
}

/// A response document owned by the caller.
///
/// Holds a verbatim copy of the accepted response. Fields can be located
/// with [`find`](Self::find) without parsing the document.
#[derive(PartialEq, Eq)]
pub struct ResponseBuffer {
    data: Vec<u8>,
}

impl ResponseBuffer {
    /// Copy `payload` into a buffer obtained from `allocator`.
    pub fn copy_from(payload: &[u8], allocator: &dyn BufferAllocator) -> Result<Self> {
        let mut data = allocator.allocate(payload.len())?;
        data.extend_from_slice(payload);
        Ok(Self { data })
    }

    /// The document bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Document length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the document is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Verbatim value of `key`, e.g. `"execution"` or `"queuedJobs"`.
    pub fn find(&self, key: &str) -> Option<&[u8]> {
        json::find_value_slice(&self.data, key.as_bytes())
    }

    /// First `status` in the document, e.g. of the `execution` returned by
    /// Start-Next or Describe, or the `executionState` returned by Update.
    pub fn job_status(&self) -> Option<JobState> {
        self.find("status").and_then(JobState::from_wire)
    }

    /// Take the bytes out of the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Convert into `Bytes` without copying.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.data)
    }

    /// Release the buffer.
    pub fn release(self) {
        drop(self);
    }
}

impl AsRef<[u8]> for ResponseBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.data.len())
            .field("data", &String::from_utf8_lossy(&self.data))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobsError;

    struct NoMemory;

    impl BufferAllocator for NoMemory {
        fn allocate(&self, _len: usize) -> Result<Vec<u8>> {
            Err(JobsError::NoMemory)
        }
    }

    #[test]
    fn test_heap_allocator_reserves() {
        let buf = HeapAllocator.allocate(128).unwrap();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 128);
    }

    #[test]
    fn test_heap_allocator_reports_exhaustion() {
        assert_eq!(HeapAllocator.allocate(usize::MAX), Err(JobsError::NoMemory));
    }

    #[test]
    fn test_job_status() {
        let payload = br#"{"execution":{"jobId":"j1","status":"IN_PROGRESS"},"clientToken":"t"}"#;
        let buf = ResponseBuffer::copy_from(payload, &HeapAllocator).unwrap();
        assert_eq!(buf.job_status(), Some(JobState::InProgress));

        let buf = ResponseBuffer::copy_from(br#"{"queuedJobs":[]}"#, &HeapAllocator).unwrap();
        assert_eq!(buf.job_status(), None);

        let buf = ResponseBuffer::copy_from(br#"{"status":"PAUSED"}"#, &HeapAllocator).unwrap();
        assert_eq!(buf.job_status(), None);
    }

    #[test]
    fn test_copy_is_verbatim() {
        let payload = br#"{"execution": {"jobId":"j1"} ,"clientToken":"t"}"#;
        let buf = ResponseBuffer::copy_from(payload, &HeapAllocator).unwrap();
        assert_eq!(buf.as_bytes(), payload);
        assert_eq!(buf.len(), payload.len());
        assert_eq!(buf.find("execution"), Some(&br#"{"jobId":"j1"}"#[..]));
        assert_eq!(buf.find("missing"), None);
    }

    #[test]
    fn test_copy_with_failing_allocator() {
        let result = ResponseBuffer::copy_from(b"{}", &NoMemory);
        assert_eq!(result, Err(JobsError::NoMemory));
    }

    #[test]
    fn test_into_bytes() {
        let buf = ResponseBuffer::copy_from(b"{}", &HeapAllocator).unwrap();
        assert_eq!(buf.into_bytes(), Bytes::from_static(b"{}"));

        let buf = ResponseBuffer::copy_from(b"[]", &HeapAllocator).unwrap();
        assert_eq!(buf.into_vec(), b"[]");
    }
}
