//! VersionScan: lazy, restartable keyset scans over version chains.

use std::collections::VecDeque;
use std::sync::Arc;

use topograph_core::models::{EntityType, TenantShardKey, VersionedEntity};
use topograph_core::traits::ITopologyStore;
use topograph_core::TopologyResult;

#[derive(Debug, Clone)]
enum ScanKind {
    /// One version per proxy, valid at `at`, keyed on `proxy_id`.
    ValidAt {
        entity_type: Option<EntityType>,
        at: i64,
    },
    /// One proxy's versions overlapping `[from, to)`, keyed on `created`.
    Overlapping { proxy_id: String, from: i64, to: i64 },
}

#[derive(Debug, Clone)]
enum Cursor {
    Start,
    AfterProxy(String),
    AfterCreated(i64),
}

/// A finite scan description. Nothing is read until [`VersionScan::iter`]
/// is driven, and every call to `iter` starts again from the first page.
#[derive(Clone)]
pub struct VersionScan {
    store: Arc<dyn ITopologyStore>,
    tenant: TenantShardKey,
    kind: ScanKind,
    page_size: usize,
}

impl VersionScan {
    pub(crate) fn valid_at(
        store: Arc<dyn ITopologyStore>,
        tenant: TenantShardKey,
        entity_type: Option<EntityType>,
        at: i64,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            tenant,
            kind: ScanKind::ValidAt { entity_type, at },
            page_size: page_size.max(1),
        }
    }

    pub(crate) fn overlapping(
        store: Arc<dyn ITopologyStore>,
        tenant: TenantShardKey,
        proxy_id: String,
        from: i64,
        to: i64,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            tenant,
            kind: ScanKind::Overlapping { proxy_id, from, to },
            page_size: page_size.max(1),
        }
    }

    /// A scan that yields nothing.
    pub(crate) fn empty(store: Arc<dyn ITopologyStore>, tenant: TenantShardKey) -> Self {
        Self {
            store,
            tenant,
            kind: ScanKind::Overlapping {
                proxy_id: String::new(),
                from: 0,
                to: 0,
            },
            page_size: 1,
        }
    }

    pub fn iter(&self) -> VersionScanIter<'_> {
        VersionScanIter {
            scan: self,
            buffer: VecDeque::new(),
            cursor: Cursor::Start,
            exhausted: matches!(self.kind, ScanKind::Overlapping { from, to, .. } if from >= to),
        }
    }

    /// Drain the scan into memory, stopping at the first page error.
    pub fn collect_all(&self) -> TopologyResult<Vec<VersionedEntity>> {
        self.iter().collect()
    }

    fn fetch(&self, cursor: &Cursor) -> TopologyResult<Vec<VersionedEntity>> {
        match &self.kind {
            ScanKind::ValidAt { entity_type, at } => {
                let after = match cursor {
                    Cursor::AfterProxy(p) => Some(p.as_str()),
                    _ => None,
                };
                self.store.versions_valid_at_page(
                    &self.tenant,
                    *entity_type,
                    *at,
                    after,
                    self.page_size,
                )
            }
            ScanKind::Overlapping { proxy_id, from, to } => {
                let after = match cursor {
                    Cursor::AfterCreated(c) => Some(*c),
                    _ => None,
                };
                self.store.versions_overlapping_page(
                    &self.tenant,
                    proxy_id,
                    *from,
                    *to,
                    after,
                    self.page_size,
                )
            }
        }
    }

    fn cursor_after(&self, last: &VersionedEntity) -> Cursor {
        match self.kind {
            ScanKind::ValidAt { .. } => Cursor::AfterProxy(last.proxy_id.clone()),
            ScanKind::Overlapping { .. } => Cursor::AfterCreated(last.created()),
        }
    }
}

/// Page-at-a-time iterator over a [`VersionScan`]. A page error is yielded
/// once and ends the iteration.
pub struct VersionScanIter<'a> {
    scan: &'a VersionScan,
    buffer: VecDeque<VersionedEntity>,
    cursor: Cursor,
    exhausted: bool,
}

impl Iterator for VersionScanIter<'_> {
    type Item = TopologyResult<VersionedEntity>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.buffer.pop_front() {
            return Some(Ok(v));
        }
        if self.exhausted {
            return None;
        }
        match self.scan.fetch(&self.cursor) {
            Ok(page) => {
                if page.len() < self.scan.page_size {
                    self.exhausted = true;
                }
                if let Some(last) = page.last() {
                    self.cursor = self.scan.cursor_after(last);
                }
                self.buffer.extend(page);
                self.buffer.pop_front().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}
