//! 块缓存实现
//!
//! 固定容量、按字节预算的 LRU 块缓存。槽位数组在初始化时一次性分配，
//! 之后不再扩容；只有每个块的数据副本会通过内存池分配和释放。
//!
//! # 结构
//!
//! ```text
//! slots:     [ 0 ][ 1 ][ 2 ][ 3 ][ 4 ]
//! committed: LRU 2 <-> 0 <-> 4 MRU
//! free:      head 1 <-> 3 tail
//! ```
//!
//! 两个链表共用槽位的 `next`/`prev` 字段。每个槽位任意时刻只属于其中一个，
//! 释放过程中会短暂地不属于任何一个。
//!
//! # 不变量
//!
//! - `committed_count + free.len() == slot_limit`
//! - `allocated` 等于所有已提交槽位 `size` 之和
//! - 链表端点的 `prev`/`next` 为空
//!
//! `FreePolicy::Legacy` 下释放过期句柄会让 `committed_count` 少计一次，
//! 这是兼容行为，见 [`BlockCache::free_block`]。

use crate::{
    consts::MAX_SLOT_LIMIT,
    error::{Error, ErrorKind, Result},
    pool::MemPool,
};

use super::config::{CacheConfig, FreePolicy};
use super::destroy::BlockDestructor;
use super::list::SlotList;
use super::slot::{Slot, SlotId, SlotIndex};
use alloc::vec::Vec;

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// 已提交块数量
    pub committed: usize,
    /// 空闲槽位数量
    pub free: usize,
    /// 槽位总数
    pub slot_limit: usize,
    /// 已提交块的总字节数
    pub allocated: usize,
    /// 字节预算
    pub allocation_limit: usize,
    /// 因准入而触发驱逐的插入次数
    pub misses: u64,
    /// 对已提交块的修改次数（提交 + 准入驱逐）
    pub age: u64,
}

impl CacheStats {
    /// 计算字节预算使用率
    pub fn byte_utilization(&self) -> f64 {
        if self.allocation_limit == 0 {
            0.0
        } else {
            self.allocated as f64 / self.allocation_limit as f64
        }
    }
}

/// LRU 块缓存
///
/// # 类型参数
///
/// - `S`: 来源引用类型，传给销毁回调
/// - `P`: 内存池
/// - `D`: 块销毁回调
///
/// # 示例
///
/// ```rust,ignore
/// use lrucache_core::{BlockCache, GlobalPool, NoopDestructor};
///
/// let mut cache: BlockCache<u32, _, _> =
///     BlockCache::new(GlobalPool::new(), 4096, NoopDestructor, 8)?;
///
/// let a = cache.insert(b"hello", Some(1))?;
/// let b = cache.insert(b"world", None)?;
///
/// // 访问 a，使 b 成为 LRU
/// cache.touch(a)?;
///
/// // 驱逐 LRU（b）
/// cache.free_block(None)?;
/// assert!(!cache.contains(b));
/// ```
pub struct BlockCache<S, P: MemPool, D: BlockDestructor<S>> {
    /// 所有分配都经过的内存池
    pool: P,

    /// 字节预算
    allocation_limit: usize,

    /// 已提交块的总字节数
    allocated: usize,

    /// 槽位数量，初始化后不变
    slot_limit: usize,

    /// 已提交块数量
    committed_count: usize,

    /// 槽位数组，teardown 后为空
    slots: Vec<Slot<S>>,

    /// 已提交链表：头为 LRU，尾为 MRU
    committed: SlotList,

    /// 空闲链表（FIFO）
    free: SlotList,

    /// 块销毁回调
    destroy_fn: D,

    /// 释放策略
    free_policy: FreePolicy,

    /// 因准入而触发驱逐的插入次数
    miss_count: u64,

    /// 对已提交块的修改次数：提交，以及 `insert` 准入时的驱逐
    ///
    /// 直接调用 `free_block` 不计入，由调用方自行记账
    op_count: u64,
}

impl<S, P: MemPool, D: BlockDestructor<S>> BlockCache<S, P, D> {
    /// 创建新的块缓存
    ///
    /// # 参数
    ///
    /// * `pool` - 内存池
    /// * `allocation_limit` - 字节预算
    /// * `destroy_fn` - 块销毁回调
    /// * `slot_limit` - 槽位数量（至少为 1）
    ///
    /// 使用 `FreePolicy::Legacy`。
    pub fn new(pool: P, allocation_limit: usize, destroy_fn: D, slot_limit: usize) -> Result<Self> {
        let config = CacheConfig {
            allocation_limit,
            slot_limit,
            free_policy: FreePolicy::Legacy,
        };
        Self::with_config(pool, destroy_fn, config)
    }

    /// 使用配置创建块缓存
    ///
    /// 槽位数组通过内存池一次性分配，全部槽位按数组顺序串入空闲链表，
    /// 槽位 0 为空闲链表头。
    pub fn with_config(mut pool: P, destroy_fn: D, config: CacheConfig) -> Result<Self> {
        if config.slot_limit == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Slot limit must be at least 1",
            ));
        }
        if config.slot_limit > MAX_SLOT_LIMIT {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Slot limit exceeds maximum slot index",
            ));
        }

        let mut slots: Vec<Slot<S>> = pool.alloc_array(config.slot_limit)?;
        let free = SlotList::threaded(&mut slots);

        log::debug!(
            "[LRU] init slots={} allocation_limit={} policy={:?}",
            config.slot_limit,
            config.allocation_limit,
            config.free_policy
        );

        Ok(Self {
            pool,
            allocation_limit: config.allocation_limit,
            allocated: 0,
            slot_limit: config.slot_limit,
            committed_count: 0,
            slots,
            committed: SlotList::new(),
            free,
            destroy_fn,
            free_policy: config.free_policy,
            miss_count: 0,
            op_count: 0,
        })
    }

    /// 提交一个块
    ///
    /// 取空闲链表头的槽位，通过内存池复制 `data`，并放到 MRU 端。
    /// 不做准入控制：不检查字节预算，没有空闲槽位时返回 `NoSpace`。
    ///
    /// # 返回
    ///
    /// 新块的句柄
    pub fn commit(&mut self, data: &[u8], source: Option<S>) -> Result<SlotId> {
        self.ensure_live()?;

        let index = self
            .free
            .head()
            .ok_or(Error::new(ErrorKind::NoSpace, "No free slot to commit"))?;

        // 先分配，失败时缓存状态不变
        let mut buf = self.pool.alloc(data.len())?;
        if buf.len() != data.len() {
            self.pool.free(buf);
            return Err(Error::new(
                ErrorKind::OutOfMemory,
                "Memory pool returned a buffer of the wrong size",
            ));
        }
        buf.copy_from_slice(data);

        self.free.unlink(&mut self.slots, index);

        let slot = &mut self.slots[index as usize];
        slot.data = Some(buf);
        slot.size = data.len();
        slot.source = source;
        slot.generation = slot.generation.wrapping_add(1);
        slot.mark_committed();
        let id = SlotId::new(index, slot.generation);

        self.committed.link_back(&mut self.slots, index);
        self.allocated += data.len();
        self.committed_count += 1;
        self.op_count += 1;

        log::debug!(
            "[LRU] commit slot={} size={} allocated={}/{} committed={}/{}",
            index,
            data.len(),
            self.allocated,
            self.allocation_limit,
            self.committed_count,
            self.slot_limit
        );

        Ok(id)
    }

    /// 插入一个块（带准入控制）
    ///
    /// 没有空闲槽位或字节预算不足时，从 LRU 端逐个驱逐，直到能够容纳新块。
    /// 只要发生过驱逐，`miss_count` 加一；每次驱逐和最终的提交都计入 `op_count`。
    ///
    /// 驱逐直接沿已提交链表进行，不依赖 `committed_count`，
    /// 因此 `FreePolicy::Legacy` 少计之后仍然能腾出空间。
    ///
    /// # 错误
    ///
    /// - `InvalidInput`: 块大小超过整个字节预算
    /// - `NoSpace`: 已提交链表为空仍无法容纳新块
    /// - `InvalidState`: 缓存已 teardown
    pub fn insert(&mut self, data: &[u8], source: Option<S>) -> Result<SlotId> {
        self.ensure_live()?;

        if data.len() > self.allocation_limit {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Block is larger than the allocation limit",
            ));
        }

        let mut evicted = 0usize;
        while self.free.is_empty()
            || self.allocated.saturating_add(data.len()) > self.allocation_limit
        {
            let Some(head) = self.committed.head() else {
                break;
            };
            self.decommit(head);
            // Legacy 少计后计数可能已经为 0
            self.committed_count = self.committed_count.saturating_sub(1);
            evicted += 1;
        }

        if self.allocated.saturating_add(data.len()) > self.allocation_limit {
            return Err(Error::new(
                ErrorKind::NoSpace,
                "Cannot admit block within the allocation limit",
            ));
        }

        if evicted > 0 {
            self.miss_count += 1;
            self.op_count += evicted as u64;
            log::debug!(
                "[LRU] insert size={} evicted {} block(s), misses={}",
                data.len(),
                evicted,
                self.miss_count
            );
        }

        self.commit(data, source)
    }

    /// 释放（驱逐）一个已提交块
    ///
    /// `target` 为 `None` 时释放 LRU 块，否则释放指定块。
    /// 块的数据副本通过内存池释放；如果有来源引用，先调用销毁回调。
    /// 槽位随后追加到空闲链表尾部。
    ///
    /// 缓存为空时直接返回 `Ok(false)`，不改变任何计数。
    ///
    /// 指定的句柄不再有效时：
    /// - `FreePolicy::Strict` 返回 `NotCommitted`（索引越界时返回 `InvalidInput`），状态不变
    /// - `FreePolicy::Legacy` 不动链表，但 `committed_count` 仍然减一
    ///
    /// # 返回
    ///
    /// 是否真的释放了一个槽位
    pub fn free_block(&mut self, target: Option<SlotId>) -> Result<bool> {
        if self.committed_count == 0 {
            return Ok(false);
        }

        let index = match target {
            None => self.committed.head(),
            Some(id) => self.resolve(id)?,
        };

        let released = match index {
            Some(index) => {
                self.decommit(index);
                true
            }
            None => {
                log::warn!(
                    "[LRU] free_block: target {:?} is not committed, committed count still decremented",
                    target
                );
                false
            }
        };

        self.committed_count -= 1;
        Ok(released)
    }

    /// 拆除缓存
    ///
    /// 从 LRU 端逐个释放全部已提交块，然后通过内存池释放槽位数组。
    /// 重复调用是空操作。
    pub fn teardown(&mut self) {
        if self.slots.is_empty() {
            return;
        }

        let mut released = 0usize;
        while let Some(head) = self.committed.head() {
            self.decommit(head);
            released += 1;
        }

        self.committed_count = 0;
        self.free.reset();

        let slots = core::mem::take(&mut self.slots);
        self.pool.free_array(slots);

        log::debug!("[LRU] teardown released {} block(s)", released);
    }

    /// 将块提升为 MRU
    pub fn touch(&mut self, id: SlotId) -> Result<()> {
        let index = self.live_index(id)?;
        self.promote(index);
        Ok(())
    }

    /// 获取块数据，并将块提升为 MRU
    pub fn get(&mut self, id: SlotId) -> Option<&[u8]> {
        let index = self.live_index(id).ok()?;
        self.promote(index);
        self.slots[index as usize].data()
    }

    /// 获取块数据，不改变访问顺序
    pub fn peek(&self, id: SlotId) -> Option<&[u8]> {
        self.slot(id)?.data()
    }

    /// 获取句柄对应的槽位
    pub fn slot(&self, id: SlotId) -> Option<&Slot<S>> {
        self.slots.get(id.index()).filter(|slot| slot.matches(id))
    }

    /// 检查句柄是否仍然有效
    pub fn contains(&self, id: SlotId) -> bool {
        self.slot(id).is_some()
    }

    /// 按来源查找块，从 MRU 端开始
    pub fn find(&self, source: &S) -> Option<SlotId>
    where
        S: PartialEq,
    {
        self.committed
            .iter_rev(&self.slots)
            .find(|&index| self.slots[index as usize].source() == Some(source))
            .map(|index| self.id_of(index))
    }

    /// LRU 块
    pub fn lru(&self) -> Option<SlotId> {
        self.committed.head().map(|index| self.id_of(index))
    }

    /// MRU 块
    pub fn mru(&self) -> Option<SlotId> {
        self.committed.tail().map(|index| self.id_of(index))
    }

    /// 按 LRU 到 MRU 的顺序遍历已提交块
    pub fn committed_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.committed
            .iter(&self.slots)
            .map(move |index| self.id_of(index))
    }

    /// 按空闲链表顺序遍历空闲槽位索引
    pub fn free_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.free.iter(&self.slots).map(|index| index as usize)
    }

    /// 获取字节预算
    pub fn allocation_limit(&self) -> usize {
        self.allocation_limit
    }

    /// 获取已提交块的总字节数
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// 获取槽位数量
    pub fn slot_limit(&self) -> usize {
        self.slot_limit
    }

    /// 获取已提交块数量
    pub fn len(&self) -> usize {
        self.committed_count
    }

    /// 检查缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.committed_count == 0
    }

    /// 获取空闲槽位数量
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// 获取槽位数组长度（teardown 后为 0）
    pub fn slots_len(&self) -> usize {
        self.slots.len()
    }

    /// 获取未命中计数
    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    /// 获取修改计数
    pub fn op_count(&self) -> u64 {
        self.op_count
    }

    /// 获取释放策略
    pub fn free_policy(&self) -> FreePolicy {
        self.free_policy
    }

    /// 获取内存池引用
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// 获取内存池可变引用
    pub fn pool_mut(&mut self) -> &mut P {
        &mut self.pool
    }

    /// 获取缓存统计信息
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            committed: self.committed_count,
            free: self.free.len(),
            slot_limit: self.slot_limit,
            allocated: self.allocated,
            allocation_limit: self.allocation_limit,
            misses: self.miss_count,
            age: self.op_count,
        }
    }

    /// 校验内部不变量
    ///
    /// 遍历两个链表，检查成员互斥、链接对称、计数和字节统计一致。
    pub fn check_invariants(&self) -> Result<()> {
        let corrupted = |message| Err(Error::new(ErrorKind::InvalidState, message));

        let mut seen = alloc::vec![false; self.slots.len()];
        let mut bytes = 0usize;

        for (list, committed) in [(&self.committed, true), (&self.free, false)] {
            let mut prev: Option<SlotIndex> = None;
            let mut walked = 0usize;

            for index in list.iter(&self.slots) {
                let i = index as usize;
                if seen[i] {
                    return corrupted("Slot linked more than once");
                }
                seen[i] = true;
                walked += 1;

                let slot = &self.slots[i];
                if slot.prev != prev {
                    return corrupted("Slot back link does not match list order");
                }
                if slot.is_committed() != committed {
                    return corrupted("Slot state does not match its list");
                }
                if committed {
                    bytes += slot.size;
                } else if slot.data.is_some() || slot.size != 0 || slot.source.is_some() {
                    return corrupted("Free slot still holds data");
                }
                prev = Some(index);
            }

            if list.tail() != prev {
                return corrupted("List tail does not match last slot");
            }
            if walked != list.len() {
                return corrupted("List length does not match its links");
            }
        }

        if self.committed.len() != self.committed_count {
            return corrupted("Committed count does not match committed list");
        }
        if self.committed.len() + self.free.len() != self.slots.len() {
            return corrupted("Slots missing from both lists");
        }
        if bytes != self.allocated {
            return corrupted("Allocated bytes do not match committed sizes");
        }
        Ok(())
    }

    // 内部辅助方法

    fn ensure_live(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "Cache has been torn down",
            ));
        }
        Ok(())
    }

    fn id_of(&self, index: SlotIndex) -> SlotId {
        SlotId::new(index, self.slots[index as usize].generation)
    }

    /// 解析句柄，不论释放策略，无效时返回 `NotCommitted`
    fn live_index(&self, id: SlotId) -> Result<SlotIndex> {
        match self.slot(id) {
            Some(_) => Ok(id.index() as SlotIndex),
            None => Err(Error::new(ErrorKind::NotCommitted, "Slot is not committed")),
        }
    }

    /// 按释放策略解析句柄
    fn resolve(&self, id: SlotId) -> Result<Option<SlotIndex>> {
        let strict = self.free_policy == FreePolicy::Strict;
        match self.slots.get(id.index()) {
            Some(slot) if slot.matches(id) => Ok(Some(id.index() as SlotIndex)),
            Some(_) if strict => Err(Error::new(ErrorKind::NotCommitted, "Slot is not committed")),
            None if strict => Err(Error::new(ErrorKind::InvalidInput, "Slot index out of range")),
            _ => Ok(None),
        }
    }

    fn promote(&mut self, index: SlotIndex) {
        if self.committed.tail() == Some(index) {
            return;
        }
        self.committed.unlink(&mut self.slots, index);
        self.committed.link_back(&mut self.slots, index);
        log::trace!("[LRU] touch slot={} -> MRU", index);
    }

    /// 从已提交链表摘除槽位，释放数据，放回空闲链表
    ///
    /// 不修改 `committed_count`，由调用方负责。
    fn decommit(&mut self, index: SlotIndex) {
        self.committed.unlink(&mut self.slots, index);

        let slot = &mut self.slots[index as usize];
        debug_assert!(self.allocated >= slot.size, "allocated bytes underflow");
        self.allocated -= slot.size;

        // 销毁回调在数据释放前调用
        if slot.source.is_some() {
            self.destroy_fn.destroy(slot);
        }
        if let Some(data) = slot.data.take() {
            self.pool.free(data);
        }
        log::debug!("[LRU] evict slot={} size={}", index, slot.size);

        slot.size = 0;
        slot.source = None;
        slot.clear_committed();

        self.free.link_back(&mut self.slots, index);
    }
}

impl<S, P: MemPool, D: BlockDestructor<S>> Drop for BlockCache<S, P, D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<S, P: MemPool, D: BlockDestructor<S>> core::fmt::Debug for BlockCache<S, P, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockCache")
            .field("slot_limit", &self.slot_limit)
            .field("committed", &self.committed_count)
            .field("free", &self.free.len())
            .field("allocated", &self.allocated)
            .field("allocation_limit", &self.allocation_limit)
            .field("free_policy", &self.free_policy)
            .field("miss_count", &self.miss_count)
            .field("op_count", &self.op_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::destroy::NoopDestructor;
    use crate::pool::GlobalPool;
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    type TestCache = BlockCache<u32, GlobalPool, NoopDestructor>;

    fn new_cache(slots: usize, bytes: usize) -> TestCache {
        BlockCache::new(GlobalPool::new(), bytes, NoopDestructor, slots).unwrap()
    }

    fn strict_cache(slots: usize) -> TestCache {
        let config = CacheConfig::default()
            .with_slot_limit(slots)
            .with_free_policy(FreePolicy::Strict);
        BlockCache::with_config(GlobalPool::new(), NoopDestructor, config).unwrap()
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Alloc(usize),
        Free(usize),
        Destroy(u32),
    }

    /// 把分配和释放事件写入共享日志的内存池
    struct RecordingPool {
        log: Rc<RefCell<Vec<Event>>>,
    }

    impl MemPool for RecordingPool {
        fn alloc(&mut self, size: usize) -> Result<Box<[u8]>> {
            self.log.borrow_mut().push(Event::Alloc(size));
            Ok(alloc::vec![0u8; size].into_boxed_slice())
        }

        fn free(&mut self, buf: Box<[u8]>) {
            self.log.borrow_mut().push(Event::Free(buf.len()));
        }
    }

    #[test]
    fn test_cache_creation() {
        let cache = new_cache(4, 1024);
        assert_eq!(cache.slot_limit(), 4);
        assert_eq!(cache.slots_len(), 4);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.allocated(), 0);
        assert_eq!(cache.miss_count(), 0);
        assert_eq!(cache.op_count(), 0);
        assert!(cache.lru().is_none());
        assert!(cache.mru().is_none());
        assert_eq!(cache.free_indices().collect::<Vec<_>>(), [0, 1, 2, 3]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_zero_slot_limit_rejected() {
        let err = TestCache::new(GlobalPool::new(), 1024, NoopDestructor, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_commit_takes_free_head() {
        let mut cache = new_cache(3, 1024);

        let a = cache.commit(b"aaaa", Some(1)).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(cache.peek(a), Some(&b"aaaa"[..]));
        assert_eq!(cache.allocated(), 4);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.op_count(), 1);
        assert_eq!(cache.free_indices().collect::<Vec<_>>(), [1, 2]);
        assert_eq!(cache.pool().bytes_in_use(), 4);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_commit_without_free_slot() {
        let mut cache = new_cache(1, 1024);
        cache.commit(b"a", None).unwrap();

        let err = cache.commit(b"b", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSpace);
        assert_eq!(cache.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_lru_selection_order() {
        let mut cache = new_cache(3, 1024);
        let a = cache.commit(b"a", None).unwrap();
        let b = cache.commit(b"b", None).unwrap();
        let c = cache.commit(b"c", None).unwrap();

        assert_eq!(cache.lru(), Some(a));
        assert_eq!(cache.mru(), Some(c));

        assert!(cache.free_block(None).unwrap());
        assert!(!cache.contains(a));
        assert!(cache.free_block(None).unwrap());
        assert!(!cache.contains(b));
        assert!(cache.free_block(None).unwrap());
        assert!(!cache.contains(c));
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_touch_updates_recency() {
        let mut cache = new_cache(3, 1024);
        let a = cache.commit(b"a", None).unwrap();
        let b = cache.commit(b"b", None).unwrap();
        let c = cache.commit(b"c", None).unwrap();

        // 访问 a，使 b 成为 LRU
        cache.touch(a).unwrap();
        assert_eq!(cache.committed_ids().collect::<Vec<_>>(), [b, c, a]);

        // get 同样更新顺序
        assert_eq!(cache.get(b), Some(&b"b"[..]));
        assert_eq!(cache.committed_ids().collect::<Vec<_>>(), [c, a, b]);

        // peek 不更新顺序
        assert_eq!(cache.peek(c), Some(&b"c"[..]));
        assert_eq!(cache.lru(), Some(c));

        cache.free_block(None).unwrap();
        assert!(!cache.contains(c));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_evict_scenario_bytes() {
        let mut cache = new_cache(3, 1024);
        let a = cache.commit(&[1u8; 10], None).unwrap();
        let _b = cache.commit(&[2u8; 20], None).unwrap();
        let _c = cache.commit(&[3u8; 30], None).unwrap();
        assert_eq!(cache.allocated(), 60);
        assert_eq!(cache.free_len(), 0);

        assert!(cache.free_block(None).unwrap());

        assert!(!cache.contains(a));
        assert_eq!(cache.allocated(), 50);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.free_indices().collect::<Vec<_>>(), [a.index()]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_single_slot_double_evict() {
        let mut cache = new_cache(1, 1024);
        cache.commit(b"a", Some(7)).unwrap();

        assert!(cache.free_block(None).unwrap());
        assert_eq!(cache.len(), 0);

        // 空缓存上再次驱逐是空操作
        assert!(!cache.free_block(None).unwrap());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.free_len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_free_list_is_fifo() {
        let mut cache = new_cache(4, 1024);
        let ids: Vec<SlotId> = (0..4).map(|i| cache.commit(&[i as u8], None).unwrap()).collect();

        cache.free_block(Some(ids[2])).unwrap();
        cache.free_block(Some(ids[0])).unwrap();
        assert_eq!(cache.free_indices().collect::<Vec<_>>(), [2, 0]);

        // 下一次提交复用最早释放的槽位
        let d = cache.commit(b"d", None).unwrap();
        assert_eq!(d.index(), 2);
        assert_eq!(cache.free_indices().collect::<Vec<_>>(), [0]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_free_named_slots() {
        let mut cache = new_cache(5, 1024);
        let ids: Vec<SlotId> = (0..5).map(|i| cache.commit(&[i as u8], None).unwrap()).collect();

        // 中间节点
        cache.free_block(Some(ids[2])).unwrap();
        assert_eq!(cache.committed_ids().collect::<Vec<_>>(), [ids[0], ids[1], ids[3], ids[4]]);
        cache.check_invariants().unwrap();

        // MRU
        cache.free_block(Some(ids[4])).unwrap();
        assert_eq!(cache.mru(), Some(ids[3]));
        cache.check_invariants().unwrap();

        // LRU
        cache.free_block(Some(ids[0])).unwrap();
        assert_eq!(cache.lru(), Some(ids[1]));
        assert_eq!(cache.len(), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_destructor_called_before_release() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pool = RecordingPool { log: log.clone() };
        let destroy_log = log.clone();
        let destructor = move |slot: &Slot<u32>| {
            // 回调时数据副本仍然有效
            assert!(slot.data().is_some());
            let source = *slot.source().unwrap();
            destroy_log.borrow_mut().push(Event::Destroy(source));
        };

        let mut cache: BlockCache<u32, _, _> = BlockCache::new(pool, 1024, destructor, 2).unwrap();
        let a = cache.commit(&[0u8; 3], Some(42)).unwrap();
        let b = cache.commit(&[0u8; 5], None).unwrap();
        log.borrow_mut().clear();

        cache.free_block(Some(a)).unwrap();
        assert_eq!(*log.borrow(), [Event::Destroy(42), Event::Free(3)]);

        log.borrow_mut().clear();
        cache.free_block(Some(b)).unwrap();
        // 没有来源引用，不调用回调
        assert_eq!(*log.borrow(), [Event::Free(5)]);
    }

    #[test]
    fn test_destructor_called_once_per_sourced_slot() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let recorded = calls.clone();
        let destructor = move |slot: &Slot<u32>| recorded.borrow_mut().push(*slot.source().unwrap());

        let mut cache: BlockCache<u32, _, _> =
            BlockCache::new(GlobalPool::new(), 1024, destructor, 3).unwrap();
        cache.commit(b"a", Some(1)).unwrap();
        cache.commit(b"b", None).unwrap();
        cache.commit(b"c", Some(3)).unwrap();

        cache.teardown();
        assert_eq!(*calls.borrow(), [1, 3]);
    }

    #[test]
    fn test_strict_policy_rejects_stale_handle() {
        let mut cache = strict_cache(2);
        let a = cache.commit(b"a", None).unwrap();
        let _b = cache.commit(b"b", None).unwrap();
        cache.free_block(Some(a)).unwrap();

        let err = cache.free_block(Some(a)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotCommitted);
        assert_eq!(cache.len(), 1);

        let err = cache.free_block(Some(SlotId::new(9, 1))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(cache.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_legacy_policy_undercounts_stale_handle() {
        let mut cache = new_cache(3, 1024);
        let a = cache.commit(b"a", None).unwrap();
        let _b = cache.commit(b"b", None).unwrap();
        let _c = cache.commit(b"c", None).unwrap();
        cache.free_block(Some(a)).unwrap();
        assert_eq!(cache.len(), 2);

        // 链表不变，但计数仍然减一
        assert!(!cache.free_block(Some(a)).unwrap());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.committed_ids().count(), 2);
        assert_eq!(cache.free_len(), 1);
        assert_eq!(cache.allocated(), 2);

        let err = cache.check_invariants().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // teardown 仍然释放全部数据
        cache.teardown();
        assert_eq!(cache.pool().outstanding(), 0);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_free_on_empty_cache_is_noop() {
        let mut cache = strict_cache(2);
        let a = cache.commit(b"a", None).unwrap();
        cache.free_block(None).unwrap();
        let ops = cache.op_count();

        // 空缓存优先于句柄校验
        assert!(!cache.free_block(Some(a)).unwrap());
        assert!(!cache.free_block(None).unwrap());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.op_count(), ops);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut cache = strict_cache(1);
        let a = cache.commit(b"a", None).unwrap();
        cache.free_block(None).unwrap();
        let b = cache.commit(b"b", None).unwrap();

        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!cache.contains(a));
        assert!(cache.peek(a).is_none());
        assert_eq!(cache.touch(a).unwrap_err().kind(), ErrorKind::NotCommitted);
        assert_eq!(cache.free_block(Some(a)).unwrap_err().kind(), ErrorKind::NotCommitted);
        assert!(cache.contains(b));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut cache = new_cache(3, 1024);
        cache.commit(b"abc", Some(1)).unwrap();
        cache.commit(b"de", Some(2)).unwrap();

        cache.teardown();
        assert_eq!(cache.slots_len(), 0);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.allocated(), 0);
        assert_eq!(cache.free_len(), 0);
        assert_eq!(cache.pool().outstanding(), 0);

        cache.teardown();
        assert_eq!(cache.slots_len(), 0);
        cache.check_invariants().unwrap();

        let err = cache.commit(b"x", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(!cache.free_block(None).unwrap());
    }

    #[test]
    fn test_teardown_empty_cache() {
        let mut cache = new_cache(2, 1024);
        cache.teardown();
        assert_eq!(cache.slots_len(), 0);
    }

    #[test]
    fn test_drop_releases_blocks() {
        let mut pool = GlobalPool::new();
        {
            let mut cache: BlockCache<u32, _, _> =
                BlockCache::new(&mut pool, 1024, NoopDestructor, 4).unwrap();
            cache.commit(b"abcd", None).unwrap();
            cache.commit(b"ef", None).unwrap();
        }
        assert_eq!(pool.alloc_count(), 2);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.bytes_in_use(), 0);
    }

    #[test]
    fn test_insert_evicts_by_bytes() {
        let mut cache = new_cache(8, 50);
        let a = cache.insert(&[0u8; 20], None).unwrap();
        let b = cache.insert(&[0u8; 20], None).unwrap();
        assert_eq!(cache.miss_count(), 0);

        let c = cache.insert(&[0u8; 20], None).unwrap();
        assert!(!cache.contains(a));
        assert!(cache.contains(b));
        assert!(cache.contains(c));
        assert_eq!(cache.allocated(), 40);
        assert_eq!(cache.miss_count(), 1);
        // 三次提交 + 一次驱逐
        assert_eq!(cache.op_count(), 4);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_evicts_by_slots() {
        let mut cache = new_cache(2, 1024);
        let a = cache.insert(b"a", None).unwrap();
        let b = cache.insert(b"b", None).unwrap();
        cache.touch(a).unwrap();

        let c = cache.insert(b"c", None).unwrap();
        assert!(cache.contains(a));
        assert!(!cache.contains(b));
        assert!(cache.contains(c));
        assert_eq!(cache.miss_count(), 1);
    }

    #[test]
    fn test_insert_evicts_several_blocks_counts_one_miss() {
        let mut cache = new_cache(4, 30);
        for _ in 0..3 {
            cache.insert(&[0u8; 10], None).unwrap();
        }

        cache.insert(&[0u8; 25], None).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.allocated(), 25);
        assert_eq!(cache.miss_count(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_after_legacy_undercount() {
        let mut cache = new_cache(4, 30);
        let a = cache.insert(&[0u8; 10], None).unwrap();
        let b = cache.insert(&[0u8; 10], None).unwrap();
        cache.free_block(Some(a)).unwrap();
        // 过期句柄：计数归零，但 b 仍在已提交链表中
        assert!(!cache.free_block(Some(a)).unwrap());
        assert_eq!(cache.len(), 0);
        assert!(cache.contains(b));

        let c = cache.insert(&[0u8; 25], None).unwrap();
        assert!(!cache.contains(b));
        assert!(cache.contains(c));
        assert_eq!(cache.allocated(), 25);
        assert!(cache.allocated() <= cache.allocation_limit());
        assert_eq!(cache.miss_count(), 1);
        assert_eq!(cache.committed_ids().collect::<Vec<_>>(), [c]);
    }

    #[test]
    fn test_insert_counts_evictions_as_ops() {
        let mut cache = new_cache(2, 1024);
        cache.insert(b"a", None).unwrap();
        cache.insert(b"b", None).unwrap();
        assert_eq!(cache.op_count(), 2);

        cache.insert(b"c", None).unwrap();
        assert_eq!(cache.op_count(), 4);

        // free_block 本身不记账
        cache.free_block(None).unwrap();
        assert_eq!(cache.op_count(), 4);
        assert_eq!(cache.stats().age, 4);
    }

    #[test]
    fn test_insert_oversized_block() {
        let mut cache = new_cache(2, 8);
        let err = cache.insert(&[0u8; 9], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_find_by_source() {
        let mut cache = new_cache(4, 1024);
        let a = cache.commit(b"a", Some(10)).unwrap();
        let _b = cache.commit(b"b", None).unwrap();
        let c = cache.commit(b"c", Some(30)).unwrap();

        assert_eq!(cache.find(&10), Some(a));
        assert_eq!(cache.find(&30), Some(c));
        assert_eq!(cache.find(&20), None);

        cache.free_block(Some(a)).unwrap();
        assert_eq!(cache.find(&10), None);
    }

    #[test]
    fn test_stats() {
        let mut cache = new_cache(4, 100);
        cache.commit(&[0u8; 25], None).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.free, 3);
        assert_eq!(stats.slot_limit, 4);
        assert_eq!(stats.allocated, 25);
        assert_eq!(stats.age, 1);
        assert_eq!(stats.byte_utilization(), 0.25);
    }

    #[test]
    fn test_invariants_hold_under_mixed_workload() {
        let mut cache = new_cache(6, 200);
        let mut live: Vec<SlotId> = Vec::new();
        let mut seed: u32 = 0x1234_5678;

        for step in 0..500 {
            // 简单的线性同余序列
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let choice = (seed >> 16) % 4;
            let size = ((seed >> 8) % 40) as usize + 1;

            match choice {
                0 | 1 => {
                    let id = cache.insert(&alloc::vec![step as u8; size], Some(step)).unwrap();
                    live.push(id);
                }
                2 => {
                    cache.free_block(None).unwrap();
                }
                _ => {
                    if let Some(&id) = live.get((seed as usize) % live.len().max(1)) {
                        if cache.contains(id) {
                            cache.free_block(Some(id)).unwrap();
                        }
                    }
                }
            }

            live.retain(|&id| cache.contains(id));
            cache.check_invariants().unwrap();
            assert_eq!(cache.len() + cache.free_len(), cache.slot_limit());
            assert!(cache.allocated() <= cache.allocation_limit());
        }
    }
}
