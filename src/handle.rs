//! Public API: `SharedMemory`, `Record`, and the platform region glue.

use std::collections::HashMap;
use std::ops::Index;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::error::{ShmError, ShmResult};
use crate::ring::RingMetadata;
use crate::schema::{Layout, Schema};
use crate::slot;
use crate::value::{Field, FieldValue};

#[cfg(unix)]
use crate::unix as platform;
#[cfg(windows)]
use crate::windows as platform;

const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// A decoded record: one `(value, freshness)` pair per field, keyed by name.
#[derive(Debug, Clone)]
pub struct Record {
    fields: HashMap<String, Field>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }
}

impl Index<&str> for Record {
    type Output = Field;

    fn index(&self, name: &str) -> &Field {
        &self.fields[name]
    }
}

/// A handle to a named shared-memory region holding typed records.
///
/// Single-threaded per handle: callers must not share a `SharedMemory`
/// across threads without external synchronization.
pub struct SharedMemory {
    schema: Schema,
    layout: Layout,
    name: String,
    platform_name: String,
    slots: u64,
    ptr: *mut u8,
    fd: i32,
    region_size: usize,
    owns_region: bool,
    staging: HashMap<String, FieldValue>,
}

// SAFETY: the handle owns its mapping outright; the mapping's cross-process
// consistency is governed by the seqlock, not by Rust's aliasing rules. The
// caller is responsible for not using one handle from multiple threads
// concurrently (single-writer / single-reader per handle).
unsafe impl Send for SharedMemory {}

impl SharedMemory {
    /// Construct or open a handle. `slots` defaults conceptually to 1
    /// (single-slot mode); pass more to get a ring buffer.
    pub fn new(
        schema: Schema,
        name: Option<&str>,
        slots: usize,
        create: bool,
    ) -> ShmResult<Self> {
        if slots < 1 {
            return Err(ShmError::Mode(format!("slots must be >= 1, got {slots}")));
        }

        let layout = schema.compile();
        let resolved_name = name.map(str::to_string).unwrap_or_else(generate_name);
        let platform_name = platform::region_name(&resolved_name);
        let region_size = layout.region_size(slots);

        info!(
            name = %resolved_name,
            slots = %slots,
            region_size = %region_size,
            create = %create,
            "Opening shared memory region"
        );

        let (ptr, fd) = if create {
            platform::create_region(&platform_name, region_size)?
        } else {
            platform::open_region(&platform_name, region_size)?
        };

        if create {
            unsafe {
                if slots > 1 {
                    let meta = RingMetadata::at(ptr);
                    meta.init();
                    for i in 0..slots {
                        let slot_ptr = ptr.add(Layout::metadata_size(slots) + i * layout.slot_size);
                        slot::init_slot(slot_ptr, &layout);
                    }
                } else {
                    slot::init_slot(ptr, &layout);
                }
            }
        }

        debug!(name = %resolved_name, "Shared memory region ready");

        Ok(Self {
            schema,
            layout,
            name: resolved_name,
            platform_name,
            slots: slots as u64,
            ptr,
            fd,
            region_size,
            owns_region: create,
            staging: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> usize {
        self.slots as usize
    }

    pub fn is_ring(&self) -> bool {
        self.slots > 1
    }

    fn metadata_size(&self) -> usize {
        Layout::metadata_size(self.slots as usize)
    }

    unsafe fn slot_ptr(&self, index: u64) -> *mut u8 {
        self.ptr.add(self.metadata_size() + (index as usize) * self.layout.slot_size)
    }

    unsafe fn ring(&self) -> RingMetadata {
        RingMetadata::at(self.ptr)
    }

    /// Stage field updates for the next publish (ring mode) or commit them
    /// immediately against slot 0 (single-slot mode).
    pub fn publish<'a>(
        &mut self,
        updates: impl IntoIterator<Item = (&'a str, FieldValue)>,
    ) -> ShmResult<()> {
        for (name, value) in updates {
            if self.schema.field_index(name).is_none() {
                warn!(field = %name, "publish() referenced a field not in the schema, ignoring");
                continue;
            }
            self.staging.insert(name.to_string(), value);
        }

        if !self.is_ring() {
            unsafe {
                slot::write_slot(self.ptr, &self.layout, &self.schema, &self.staging);
            }
            trace!(name = %self.name, "Committed single-slot publish");
            self.staging.clear();
        }

        Ok(())
    }

    /// Commit the staged fields into the next ring slot. Fails with
    /// `ModeError` on a single-slot handle.
    pub fn finalize(&mut self) -> ShmResult<()> {
        if !self.is_ring() {
            return Err(ShmError::Mode("finalize() requires slots > 1".into()));
        }

        let target = unsafe { self.ring().commit_write(self.slots) };
        unsafe {
            let slot_ptr = self.slot_ptr(target);
            slot::write_slot(slot_ptr, &self.layout, &self.schema, &self.staging);
        }
        trace!(name = %self.name, slot = %target, "Finalized ring publish");
        self.staging.clear();
        Ok(())
    }

    /// Consume the next available record, blocking up to `timeout` for one
    /// to arrive. `latest` skips any backlog in ring mode; `reset_modified`
    /// clears the `MODIFIED` bit as a side effect of a "consuming" read
    /// (single-slot mode only).
    pub fn consume(
        &mut self,
        timeout: Duration,
        latest: bool,
        reset_modified: bool,
    ) -> ShmResult<Option<Record>> {
        if reset_modified && self.is_ring() {
            return Err(ShmError::Mode(
                "reset_modified is only valid in single-slot mode".into(),
            ));
        }

        let deadline = Instant::now() + timeout;

        if !self.is_ring() {
            loop {
                let result = unsafe { slot::read_slot(self.ptr, &self.layout, &self.schema, reset_modified) };
                if let Some(fields) = result {
                    return Ok(Some(Record { fields }));
                }
                trace!(name = %self.name, "Torn read on single slot, retrying");
            }
        }

        loop {
            let slot_index = unsafe { self.ring().prepare_read(self.slots, latest) };

            let Some(slot_index) = slot_index else {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                std::thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
                continue;
            };

            let result = unsafe {
                let slot_ptr = self.slot_ptr(slot_index);
                slot::read_slot(slot_ptr, &self.layout, &self.schema, false)
            };

            match result {
                Some(fields) => {
                    unsafe { self.ring().advance_read() };
                    return Ok(Some(Record { fields }));
                }
                None => {
                    trace!(name = %self.name, slot = %slot_index, "Torn read in ring, retrying");
                }
            }
        }
    }

    /// Release this handle without destroying the region.
    pub fn close(&mut self) {
        if self.fd < 0 {
            return;
        }
        debug!(name = %self.name, "Closing shared memory handle");
        unsafe {
            platform::close_region(self.ptr, self.region_size, self.fd);
        }
        self.fd = -1;
    }

    /// Destroy the named region. Should only be called by the creator/owner.
    pub fn unlink(&mut self) -> ShmResult<()> {
        info!(name = %self.name, "Unlinking shared memory region");
        Ok(platform::unlink_region(&self.platform_name)?)
    }
}

impl Drop for SharedMemory {
    fn drop(&mut self) {
        self.close();
        if self.owns_region {
            if let Err(e) = self.unlink() {
                warn!(name = %self.name, error = %e, "Failed to unlink shared memory on drop");
            }
        }
    }
}

fn generate_name() -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("shmrec_{suffix}")
}
