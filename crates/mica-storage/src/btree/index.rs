//! B+Tree index engine over the buffer pool.

use super::key::{IndexKey, KeyValue, StrKey};
use super::meta::{IndexMeta, MAX_RELATION_NAME, META_PAGE_NUM};
use super::node::{write_level, InternalMut, InternalRef, LeafMut, LeafRef};
use crate::disk::DiskManager;
use crate::relation::RelationSource;
use mica_buffer::{BufferFrame, BufferPool};
use mica_common::{KeyType, MicaError, PageId, RecordId, Result, INVALID_PAGE_NUM};
use std::cmp::Ordering;
use std::sync::Arc;

/// Comparison operators accepted by `start_scan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Less than. Valid as a high-bound operator only.
    Lt,
    /// Less than or equal. Valid as a high-bound operator only.
    Lte,
    /// Greater than or equal. Valid as a low-bound operator only.
    Gte,
    /// Greater than. Valid as a low-bound operator only.
    Gt,
}

/// State of the single active range scan.
struct ScanState {
    low: KeyValue,
    high: KeyValue,
    low_op: Operator,
    high_op: Operator,
    /// Leaf currently pinned by the scan (0 once the chain is exhausted).
    current_page_num: u32,
    /// Next slot to inspect in the current leaf.
    next_entry: usize,
}

/// Disk-backed B+Tree index over one attribute of a base relation.
///
/// Every node read, write, and allocation goes through the buffer pool; the
/// engine itself never touches storage. The index supports one active scan
/// at a time and no deletion; pages orphaned by splits are never reclaimed.
pub struct BTreeIndex {
    store: Arc<DiskManager>,
    pool: Arc<BufferPool>,
    file_id: u32,
    index_name: String,
    relation_name: String,
    attr_byte_offset: usize,
    key_type: KeyType,
    root_page_num: u32,
    scan: Option<ScanState>,
}

impl std::fmt::Debug for BTreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTreeIndex")
            .field("file_id", &self.file_id)
            .field("index_name", &self.index_name)
            .field("relation_name", &self.relation_name)
            .field("attr_byte_offset", &self.attr_byte_offset)
            .field("key_type", &self.key_type)
            .field("root_page_num", &self.root_page_num)
            .finish_non_exhaustive()
    }
}

impl BTreeIndex {
    /// Derives the canonical index file name for a relation and attribute.
    pub fn index_file_name(relation_name: &str, attr_byte_offset: usize) -> String {
        format!("{}.{}.idx", relation_name, attr_byte_offset)
    }

    /// Opens an index over `relation_name`'s attribute at `attr_byte_offset`.
    ///
    /// If the index file already exists, its meta page must agree with every
    /// requested parameter (`BadIndexInfo` lists each mismatch) and the
    /// stored root is adopted without touching the base relation. Otherwise
    /// the file is created with a meta page and an empty root, and every
    /// tuple of `base` is inserted through the standard insert path.
    pub fn open(
        store: Arc<DiskManager>,
        pool: Arc<BufferPool>,
        relation_name: &str,
        attr_byte_offset: usize,
        key_type: KeyType,
        base: &mut dyn RelationSource,
    ) -> Result<Self> {
        if relation_name.len() > MAX_RELATION_NAME {
            return Err(MicaError::BadIndexInfo {
                reason: format!(
                    "relation name longer than {} bytes: {:?}",
                    MAX_RELATION_NAME, relation_name
                ),
            });
        }

        let index_name = Self::index_file_name(relation_name, attr_byte_offset);
        let existed = store.file_exists(&index_name);
        let file_id = store.open_file(&index_name)?;

        let mut index = Self {
            store,
            pool,
            file_id,
            index_name,
            relation_name: relation_name.to_string(),
            attr_byte_offset,
            key_type,
            root_page_num: INVALID_PAGE_NUM,
            scan: None,
        };

        if existed {
            index.load_meta()?;
        } else {
            index.initialize()?;
            index.bulk_load(base)?;
        }
        Ok(index)
    }

    /// Returns the name of the index file.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Returns the file id of the index file.
    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    /// Returns the attribute type the index is built over.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the current root page number.
    pub fn root_page_num(&self) -> u32 {
        self.root_page_num
    }

    /// Validates the meta page of an existing index file and adopts its root.
    fn load_meta(&mut self) -> Result<()> {
        let pid = PageId::new(self.file_id, META_PAGE_NUM);
        let frame = self.pool.fetch_page(pid)?;
        let meta = {
            let data = frame.read_data();
            IndexMeta::read_from(&data[..], pid)
        };
        let meta = match meta {
            Ok(meta) => meta,
            Err(err) => {
                self.pool.unpin_page_best_effort(pid);
                return Err(err);
            }
        };

        let mut mismatches = Vec::new();
        if meta.relation_name != self.relation_name {
            mismatches.push(format!(
                "relation name: stored {:?}, requested {:?}",
                meta.relation_name, self.relation_name
            ));
        }
        if meta.attr_byte_offset as usize != self.attr_byte_offset {
            mismatches.push(format!(
                "attribute byte offset: stored {}, requested {}",
                meta.attr_byte_offset, self.attr_byte_offset
            ));
        }
        if meta.key_type != self.key_type {
            mismatches.push(format!(
                "attribute type: stored {}, requested {}",
                meta.key_type, self.key_type
            ));
        }
        if !mismatches.is_empty() {
            self.pool.unpin_page_best_effort(pid);
            return Err(MicaError::BadIndexInfo {
                reason: mismatches.join("; "),
            });
        }

        self.root_page_num = meta.root_page_num;
        self.pool.unpin_page(pid, false)
    }

    /// Creates the meta page and an empty root for a fresh index file.
    ///
    /// The root starts as a level-1 internal node with all child pointers
    /// zeroed; the first insert hangs the first leaf off it.
    fn initialize(&mut self) -> Result<()> {
        let (meta_pid, meta_frame) = self.pool.alloc_page(self.file_id)?;
        if meta_pid.page_num != META_PAGE_NUM {
            self.pool.unpin_page_best_effort(meta_pid);
            return Err(MicaError::Internal(format!(
                "index file {} is not empty",
                self.index_name
            )));
        }

        let (root_pid, root_frame) = self.pool.alloc_page(self.file_id)?;
        {
            let mut data = root_frame.write_data();
            write_level(&mut data[..], 1);
        }
        self.pool.unpin_page(root_pid, true)?;
        self.root_page_num = root_pid.page_num;

        let meta = IndexMeta {
            relation_name: self.relation_name.clone(),
            attr_byte_offset: self.attr_byte_offset as u32,
            key_type: self.key_type,
            root_page_num: self.root_page_num,
        };
        {
            let mut data = meta_frame.write_data();
            meta.write_to(&mut data[..]);
        }
        self.pool.unpin_page(meta_pid, true)
    }

    /// Inserts every tuple of the base relation through the insert path.
    fn bulk_load(&mut self, base: &mut dyn RelationSource) -> Result<()> {
        loop {
            match base.scan_next() {
                Ok((rid, record)) => {
                    let key = KeyValue::from_record(&record, self.attr_byte_offset, self.key_type)?;
                    self.insert_entry(key, rid)?;
                }
                Err(MicaError::EndOfRelation) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    /// Inserts a key / record-id pair.
    pub fn insert_entry(&mut self, key: KeyValue, rid: RecordId) -> Result<()> {
        match self.key_type {
            KeyType::Int32 => {
                let key = i32::from_value(&key)?;
                self.insert_typed(key, rid)
            }
            KeyType::Float64 => {
                let key = f64::from_value(&key)?;
                self.insert_typed(key, rid)
            }
            KeyType::FixedStr => {
                let key = StrKey::from_value(&key)?;
                self.insert_typed(key, rid)
            }
        }
    }

    fn insert_typed<K: IndexKey>(&mut self, key: K, rid: RecordId) -> Result<()> {
        let root = self.root_page_num;
        if let Some((separator, new_page)) = self.insert_recursive::<K>(root, false, key, rid)? {
            self.grow_root::<K>(separator, new_page)?;
        }
        Ok(())
    }

    /// Recursive descent: the caller tells us whether `page_num` is a leaf.
    ///
    /// Returns the separator and sibling page of a split at this level, if
    /// one happened, for the caller to absorb.
    fn insert_recursive<K: IndexKey>(
        &self,
        page_num: u32,
        is_leaf: bool,
        key: K,
        rid: RecordId,
    ) -> Result<Option<(K, u32)>> {
        if is_leaf {
            self.insert_into_leaf::<K>(page_num, key, rid)
        } else {
            self.insert_into_internal::<K>(page_num, key, rid)
        }
    }

    fn insert_into_leaf<K: IndexKey>(
        &self,
        page_num: u32,
        key: K,
        rid: RecordId,
    ) -> Result<Option<(K, u32)>> {
        let pid = PageId::new(self.file_id, page_num);
        let frame = self.pool.fetch_page(pid)?;

        // Duplicates go after existing equal keys so they scan back in
        // insertion order.
        let (pos, full) = {
            let data = frame.read_data();
            let leaf = LeafRef::<K>::new(&data[..]);
            let used = leaf.occupancy();
            let mut pos = 0;
            while pos < used && leaf.key(pos).cmp_key(&key) != Ordering::Greater {
                pos += 1;
            }
            (pos, used == LeafRef::<K>::capacity())
        };

        let split = if full {
            Some(self.split_leaf::<K>(frame, pos, key, rid)?)
        } else {
            let mut data = frame.write_data();
            let mut leaf = LeafMut::<K>::new(&mut data[..]);
            leaf.insert_at(pos, &key, rid);
            None
        };

        self.pool.unpin_page(pid, true)?;
        Ok(split)
    }

    /// Splits a full leaf around an insertion at `pos`.
    ///
    /// The first ceil((N+1)/2) entries stay, the rest move to a freshly
    /// allocated right sibling spliced into the chain; the sibling's first
    /// key is pushed up as the separator.
    fn split_leaf<K: IndexKey>(
        &self,
        frame: &BufferFrame,
        pos: usize,
        key: K,
        rid: RecordId,
    ) -> Result<(K, u32)> {
        let cap = LeafRef::<K>::capacity();
        let mut keys: Vec<K> = Vec::with_capacity(cap + 1);
        let mut rids: Vec<RecordId> = Vec::with_capacity(cap + 1);
        let old_sibling;
        {
            let data = frame.read_data();
            let leaf = LeafRef::<K>::new(&data[..]);
            for slot in 0..cap {
                keys.push(leaf.key(slot));
                rids.push(leaf.rid(slot));
            }
            old_sibling = leaf.right_sibling();
        }
        keys.insert(pos, key);
        rids.insert(pos, rid);

        let keep = (cap + 2) / 2;
        let (new_pid, new_frame) = self.pool.alloc_page(self.file_id)?;
        {
            let mut data = new_frame.write_data();
            let mut new_leaf = LeafMut::<K>::new(&mut data[..]);
            for slot in keep..cap + 1 {
                new_leaf.set_entry(slot - keep, &keys[slot], rids[slot]);
            }
            new_leaf.set_right_sibling(old_sibling);
        }
        {
            let mut data = frame.write_data();
            let mut leaf = LeafMut::<K>::new(&mut data[..]);
            leaf.clear_slots_from(0);
            for slot in 0..keep {
                leaf.set_entry(slot, &keys[slot], rids[slot]);
            }
            leaf.set_right_sibling(new_pid.page_num);
        }

        let separator = keys[keep];
        self.pool.unpin_page(new_pid, true)?;
        Ok((separator, new_pid.page_num))
    }

    fn insert_into_internal<K: IndexKey>(
        &self,
        page_num: u32,
        key: K,
        rid: RecordId,
    ) -> Result<Option<(K, u32)>> {
        let pid = PageId::new(self.file_id, page_num);
        let frame = self.pool.fetch_page(pid)?;
        let cap = InternalRef::<K>::capacity();

        // Equal keys route right so duplicates stay clustered.
        let (child, child_is_leaf) = {
            let data = frame.read_data();
            let node = InternalRef::<K>::new(&data[..]);
            let mut pos = 0;
            while pos < cap
                && node.child(pos + 1) != INVALID_PAGE_NUM
                && key.cmp_key(&node.key(pos)) != Ordering::Less
            {
                pos += 1;
            }
            (node.child(pos), node.level() == 1)
        };

        if child == INVALID_PAGE_NUM {
            // Empty tree: hang the very first leaf off this node
            let (leaf_pid, leaf_frame) = self.pool.alloc_page(self.file_id)?;
            {
                let mut data = leaf_frame.write_data();
                let mut leaf = LeafMut::<K>::new(&mut data[..]);
                leaf.set_entry(0, &key, rid);
                leaf.set_right_sibling(INVALID_PAGE_NUM);
            }
            self.pool.unpin_page(leaf_pid, true)?;
            {
                let mut data = frame.write_data();
                let mut node = InternalMut::<K>::new(&mut data[..]);
                node.set_child(0, leaf_pid.page_num);
            }
            self.pool.unpin_page(pid, true)?;
            return Ok(None);
        }

        // Release this node before descending; peak pin usage stays bounded
        // by tree height.
        self.pool.unpin_page(pid, false)?;
        let Some((separator, new_child)) = self.insert_recursive::<K>(child, child_is_leaf, key, rid)?
        else {
            return Ok(None);
        };

        // The child split: re-read this node and absorb the separator
        let frame = self.pool.fetch_page(pid)?;
        let (pos, full) = {
            let data = frame.read_data();
            let node = InternalRef::<K>::new(&data[..]);
            let used = node.num_keys();
            let mut pos = 0;
            while pos < used && separator.cmp_key(&node.key(pos)) != Ordering::Less {
                pos += 1;
            }
            (pos, used == cap)
        };

        let split = if full {
            Some(self.split_internal::<K>(frame, pos, separator, new_child)?)
        } else {
            let mut data = frame.write_data();
            let mut node = InternalMut::<K>::new(&mut data[..]);
            node.insert_at(pos, &separator, new_child);
            None
        };

        self.pool.unpin_page(pid, true)?;
        Ok(split)
    }

    /// Splits a full internal node around a separator insertion at `pos`.
    ///
    /// The median key moves up to the caller; the new right sibling takes
    /// the upper half and inherits the level flag.
    fn split_internal<K: IndexKey>(
        &self,
        frame: &BufferFrame,
        pos: usize,
        separator: K,
        new_child: u32,
    ) -> Result<(K, u32)> {
        let cap = InternalRef::<K>::capacity();
        let mut keys: Vec<K> = Vec::with_capacity(cap + 1);
        let mut children: Vec<u32> = Vec::with_capacity(cap + 2);
        let level;
        {
            let data = frame.read_data();
            let node = InternalRef::<K>::new(&data[..]);
            for slot in 0..cap {
                keys.push(node.key(slot));
            }
            for slot in 0..=cap {
                children.push(node.child(slot));
            }
            level = node.level();
        }
        keys.insert(pos, separator);
        children.insert(pos + 1, new_child);

        let mid = (cap + 1) / 2;
        let push_up = keys[mid];

        let (new_pid, new_frame) = self.pool.alloc_page(self.file_id)?;
        {
            let mut data = new_frame.write_data();
            let mut right = InternalMut::<K>::new(&mut data[..]);
            right.set_level(level);
            for (slot, child) in children[mid + 1..].iter().enumerate() {
                right.set_child(slot, *child);
            }
            for (slot, key) in keys[mid + 1..].iter().enumerate() {
                right.set_key(slot, key);
            }
        }
        {
            let mut data = frame.write_data();
            let mut left = InternalMut::<K>::new(&mut data[..]);
            left.clear_children();
            for (slot, child) in children[..=mid].iter().enumerate() {
                left.set_child(slot, *child);
            }
            for (slot, key) in keys[..mid].iter().enumerate() {
                left.set_key(slot, key);
            }
        }

        self.pool.unpin_page(new_pid, true)?;
        Ok((push_up, new_pid.page_num))
    }

    /// Replaces the root after it split: a new level-0 internal node with
    /// the old root and the new sibling as its two children. The meta page
    /// is rewritten so the new root survives reopening.
    fn grow_root<K: IndexKey>(&mut self, separator: K, new_page: u32) -> Result<()> {
        let (root_pid, frame) = self.pool.alloc_page(self.file_id)?;
        {
            let mut data = frame.write_data();
            let mut node = InternalMut::<K>::new(&mut data[..]);
            node.set_level(0);
            node.set_key(0, &separator);
            node.set_child(0, self.root_page_num);
            node.set_child(1, new_page);
        }
        self.pool.unpin_page(root_pid, true)?;

        self.root_page_num = root_pid.page_num;
        self.persist_root()
    }

    /// Rewrites the meta page with the current root page number.
    fn persist_root(&self) -> Result<()> {
        let pid = PageId::new(self.file_id, META_PAGE_NUM);
        let frame = self.pool.fetch_page(pid)?;
        let result = {
            let mut data = frame.write_data();
            IndexMeta::read_from(&data[..], pid).map(|mut meta| {
                meta.root_page_num = self.root_page_num;
                meta.write_to(&mut data[..]);
            })
        };
        match result {
            Ok(()) => self.pool.unpin_page(pid, true),
            Err(err) => {
                self.pool.unpin_page_best_effort(pid);
                Err(err)
            }
        }
    }

    /// Begins a range scan bounded by `[low, high]` under the given
    /// operators.
    ///
    /// `low_op` must be GT or GTE and `high_op` LT or LTE (`BadOpcodes`
    /// otherwise); the low bound must not exceed the high bound
    /// (`BadScanrange`). An already-active scan is torn down first. On
    /// success the leaf that could contain the low bound is pinned and the
    /// cursor sits at its first slot, pending filtering.
    pub fn start_scan(
        &mut self,
        low: KeyValue,
        low_op: Operator,
        high: KeyValue,
        high_op: Operator,
    ) -> Result<()> {
        if !matches!(low_op, Operator::Gt | Operator::Gte)
            || !matches!(high_op, Operator::Lt | Operator::Lte)
        {
            return Err(MicaError::BadOpcodes);
        }

        match self.key_type {
            KeyType::Int32 => {
                let l = i32::from_value(&low)?;
                let h = i32::from_value(&high)?;
                if l.cmp_key(&h) == Ordering::Greater {
                    return Err(MicaError::BadScanrange);
                }
            }
            KeyType::Float64 => {
                let l = f64::from_value(&low)?;
                let h = f64::from_value(&high)?;
                if l.cmp_key(&h) == Ordering::Greater {
                    return Err(MicaError::BadScanrange);
                }
            }
            KeyType::FixedStr => {
                let l = StrKey::from_value(&low)?;
                let h = StrKey::from_value(&high)?;
                if l.cmp_key(&h) == Ordering::Greater {
                    return Err(MicaError::BadScanrange);
                }
            }
        }

        if self.scan.is_some() {
            self.end_scan()?;
        }

        let current_page_num = match self.key_type {
            KeyType::Int32 => self.find_scan_leaf::<i32>(i32::from_value(&low)?)?,
            KeyType::Float64 => self.find_scan_leaf::<f64>(f64::from_value(&low)?)?,
            KeyType::FixedStr => self.find_scan_leaf::<StrKey>(StrKey::from_value(&low)?)?,
        };

        self.scan = Some(ScanState {
            low,
            high,
            low_op,
            high_op,
            current_page_num,
            next_entry: 0,
        });
        Ok(())
    }

    /// Descends from the root to the leaf whose range could hold `low`.
    ///
    /// The chosen leaf is left pinned for the scan. Returns 0 when the tree
    /// has no leaves yet.
    fn find_scan_leaf<K: IndexKey>(&self, low: K) -> Result<u32> {
        let cap = InternalRef::<K>::capacity();
        let mut current = self.root_page_num;

        loop {
            let pid = PageId::new(self.file_id, current);
            let frame = self.pool.fetch_page(pid)?;
            let (level, next) = {
                let data = frame.read_data();
                let node = InternalRef::<K>::new(&data[..]);
                let mut pos = 0;
                while pos < cap
                    && node.child(pos + 1) != INVALID_PAGE_NUM
                    && low.cmp_key(&node.key(pos)) != Ordering::Less
                {
                    pos += 1;
                }
                (node.level(), node.child(pos))
            };
            self.pool.unpin_page(pid, false)?;

            if level == 1 {
                if next != INVALID_PAGE_NUM {
                    self.pool.fetch_page(PageId::new(self.file_id, next))?;
                }
                return Ok(next);
            }
            if next == INVALID_PAGE_NUM {
                return Err(MicaError::Internal(format!(
                    "missing child below internal page {}",
                    current
                )));
            }
            current = next;
        }
    }

    /// Returns the record id of the next entry satisfying the scan bounds.
    ///
    /// Walks the sibling chain, skipping entries below the low bound; the
    /// first entry above the high bound ends the scan, as no later entry in
    /// the ordered chain can qualify.
    pub fn scan_next(&mut self) -> Result<RecordId> {
        match self.key_type {
            KeyType::Int32 => self.scan_next_typed::<i32>(),
            KeyType::Float64 => self.scan_next_typed::<f64>(),
            KeyType::FixedStr => self.scan_next_typed::<StrKey>(),
        }
    }

    fn scan_next_typed<K: IndexKey>(&mut self) -> Result<RecordId> {
        let file_id = self.file_id;
        let pool = Arc::clone(&self.pool);
        let state = self.scan.as_mut().ok_or(MicaError::ScanNotInitialized)?;
        let low = K::from_value(&state.low)?;
        let high = K::from_value(&state.high)?;
        let cap = LeafRef::<K>::capacity();

        loop {
            if state.current_page_num == INVALID_PAGE_NUM {
                return Err(MicaError::IndexScanCompleted);
            }
            let pid = PageId::new(file_id, state.current_page_num);
            let frame = pool.peek_frame(pid).ok_or_else(|| {
                MicaError::Internal(format!("scan page {} not resident", pid))
            })?;

            let (entry, right_sibling) = {
                let data = frame.read_data();
                let leaf = LeafRef::<K>::new(&data[..]);
                if state.next_entry >= cap || !leaf.rid(state.next_entry).is_valid() {
                    (None, leaf.right_sibling())
                } else {
                    (
                        Some((leaf.key(state.next_entry), leaf.rid(state.next_entry))),
                        INVALID_PAGE_NUM,
                    )
                }
            };

            match entry {
                None => {
                    // Current leaf exhausted: move to the right sibling
                    pool.unpin_page(pid, false)?;
                    if right_sibling == INVALID_PAGE_NUM {
                        state.current_page_num = INVALID_PAGE_NUM;
                        return Err(MicaError::IndexScanCompleted);
                    }
                    pool.fetch_page(PageId::new(file_id, right_sibling))?;
                    state.current_page_num = right_sibling;
                    state.next_entry = 0;
                }
                Some((key, rid)) => {
                    let below_low = match state.low_op {
                        Operator::Gt => key.cmp_key(&low) != Ordering::Greater,
                        Operator::Gte => key.cmp_key(&low) == Ordering::Less,
                        _ => false,
                    };
                    if below_low {
                        state.next_entry += 1;
                        continue;
                    }

                    let above_high = match state.high_op {
                        Operator::Lt => key.cmp_key(&high) != Ordering::Less,
                        Operator::Lte => key.cmp_key(&high) == Ordering::Greater,
                        _ => false,
                    };
                    if above_high {
                        return Err(MicaError::IndexScanCompleted);
                    }

                    state.next_entry += 1;
                    return Ok(rid);
                }
            }
        }
    }

    /// Ends the active scan, releasing its leaf pin best-effort.
    pub fn end_scan(&mut self) -> Result<()> {
        let state = self.scan.take().ok_or(MicaError::ScanNotInitialized)?;
        if state.current_page_num != INVALID_PAGE_NUM {
            self.pool
                .unpin_page_best_effort(PageId::new(self.file_id, state.current_page_num));
        }
        Ok(())
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        // Teardown must not propagate: release any scan pin, flush the index
        // file, and give the file handle back.
        if self.scan.is_some() {
            let _ = self.end_scan();
        }
        let _ = self.pool.flush_file(self.file_id);
        let _ = self.store.close_file(self.file_id);
    }
}
