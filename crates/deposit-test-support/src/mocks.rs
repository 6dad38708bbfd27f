//! Collaborator doubles for actor and worker tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use deposit_core::{
    ContentDescriptor, DescriptorId, FileSet, FileSetId, QueueError, QueueResult, ResourceStore,
    StoreError, StoreResult, Task, TaskHandle, TaskQueue, Work, WorkId,
};

/// Queue that records tasks instead of running them.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<Task>>,
    closed: AtomicBool,
}

impl RecordingQueue {
    /// Empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every further enqueue with `QueueError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Tasks accepted so far, in enqueue order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, task: Task) -> QueueResult<TaskHandle> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed { kind: task.kind() });
        }
        let handle = TaskHandle::for_task(&task);
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
        Ok(handle)
    }
}

/// Store wrapper that injects failures and latency and counts work writes.
pub struct FaultyStore {
    inner: Arc<dyn ResourceStore>,
    fail_file_set_saves: AtomicBool,
    fail_work_saves: AtomicBool,
    fail_descriptor_saves: AtomicBool,
    work_read_delay_ms: AtomicU64,
    work_saves: AtomicUsize,
}

impl FaultyStore {
    /// Wrap a working store; no faults are active initially.
    #[must_use]
    pub fn new(inner: Arc<dyn ResourceStore>) -> Self {
        Self {
            inner,
            fail_file_set_saves: AtomicBool::new(false),
            fail_work_saves: AtomicBool::new(false),
            fail_descriptor_saves: AtomicBool::new(false),
            work_read_delay_ms: AtomicU64::new(0),
            work_saves: AtomicUsize::new(0),
        }
    }

    /// Toggle failure of `save_file_set`.
    pub fn fail_file_set_saves(&self, fail: bool) {
        self.fail_file_set_saves.store(fail, Ordering::SeqCst);
    }

    /// Toggle failure of `save_work`.
    pub fn fail_work_saves(&self, fail: bool) {
        self.fail_work_saves.store(fail, Ordering::SeqCst);
    }

    /// Toggle failure of `save_descriptor`.
    pub fn fail_descriptor_saves(&self, fail: bool) {
        self.fail_descriptor_saves.store(fail, Ordering::SeqCst);
    }

    /// Sleep after every `find_work` read, widening read-modify-write windows.
    pub fn delay_work_reads(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.work_read_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// `save_work` calls that reached the wrapped store.
    #[must_use]
    pub fn work_saves(&self) -> usize {
        self.work_saves.load(Ordering::SeqCst)
    }

    fn injected(operation: &'static str) -> StoreError {
        StoreError::Unavailable {
            operation,
            detail: "injected fault".to_string(),
        }
    }
}

#[async_trait]
impl ResourceStore for FaultyStore {
    async fn save_file_set(&self, file_set: &FileSet) -> StoreResult<FileSet> {
        if self.fail_file_set_saves.load(Ordering::SeqCst) {
            return Err(Self::injected("save_file_set"));
        }
        self.inner.save_file_set(file_set).await
    }

    async fn find_file_set(&self, id: FileSetId) -> StoreResult<FileSet> {
        self.inner.find_file_set(id).await
    }

    async fn delete_file_set(&self, id: FileSetId) -> StoreResult<()> {
        self.inner.delete_file_set(id).await
    }

    async fn save_work(&self, work: &Work) -> StoreResult<Work> {
        if self.fail_work_saves.load(Ordering::SeqCst) {
            return Err(Self::injected("save_work"));
        }
        self.work_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_work(work).await
    }

    async fn find_work(&self, id: WorkId) -> StoreResult<Work> {
        let delay = self.work_read_delay_ms.load(Ordering::SeqCst);
        let work = self.inner.find_work(id).await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        work
    }

    async fn find_parent(&self, file_set_id: FileSetId) -> StoreResult<Option<Work>> {
        self.inner.find_parent(file_set_id).await
    }

    async fn find_members(&self, work_id: WorkId) -> StoreResult<Vec<FileSet>> {
        self.inner.find_members(work_id).await
    }

    async fn save_descriptor(
        &self,
        descriptor: &ContentDescriptor,
    ) -> StoreResult<ContentDescriptor> {
        if self.fail_descriptor_saves.load(Ordering::SeqCst) {
            return Err(Self::injected("save_descriptor"));
        }
        self.inner.save_descriptor(descriptor).await
    }

    async fn find_descriptor(&self, id: DescriptorId) -> StoreResult<ContentDescriptor> {
        self.inner.find_descriptor(id).await
    }
}
