//! 缓存槽位结构
//!
//! 槽位是预分配槽位数组中的一个元素，最多持有一个数据块的副本。
//! 链接字段 `next`/`prev` 保存数组索引而不是指针，
//! 由当前包含该槽位的链表（已提交链表或空闲链表）复用。

use alloc::boxed::Box;
use bitflags::bitflags;

/// 槽位数组索引
pub type SlotIndex = u32;

bitflags! {
    /// 槽位状态标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// 槽位持有有效数据，位于已提交链表中
        const COMMITTED = 0x01;
    }
}

/// 槽位句柄
///
/// 由索引和代数组成。槽位每次被提交时代数加一，
/// 因此旧句柄在槽位被复用后不会再匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    index: SlotIndex,
    generation: u32,
}

impl SlotId {
    pub(crate) const fn new(index: SlotIndex, generation: u32) -> Self {
        Self { index, generation }
    }

    /// 槽位在数组中的索引
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// 提交时的代数
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// 缓存槽位
///
/// `S` 是来源引用的类型：它标识数据副本来自哪个外部值，
/// 只作为销毁回调的输入，缓存不拥有它指向的东西。
///
/// # 字段说明
///
/// - `data`: 数据副本，空闲时为 `None`
/// - `size`: 数据字节数，空闲时为 0
/// - `source`: 来源引用，可以为空
/// - `next`/`prev`: 所在链表中的相邻槽位索引
/// - `flags`: 槽位状态
/// - `generation`: 提交代数
pub struct Slot<S> {
    pub(crate) data: Option<Box<[u8]>>,
    pub(crate) size: usize,
    pub(crate) source: Option<S>,
    pub(crate) next: Option<SlotIndex>,
    pub(crate) prev: Option<SlotIndex>,
    pub(crate) flags: SlotFlags,
    pub(crate) generation: u32,
}

impl<S> Default for Slot<S> {
    fn default() -> Self {
        Self {
            data: None,
            size: 0,
            source: None,
            next: None,
            prev: None,
            flags: SlotFlags::empty(),
            generation: 0,
        }
    }
}

impl<S: core::fmt::Debug> core::fmt::Debug for Slot<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Slot")
            .field("size", &self.size)
            .field("source", &self.source)
            .field("next", &self.next)
            .field("prev", &self.prev)
            .field("flags", &self.flags)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<S> Slot<S> {
    /// 数据副本
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// 数据字节数
    pub fn size(&self) -> usize {
        self.size
    }

    /// 来源引用
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// 检查是否已提交
    pub fn is_committed(&self) -> bool {
        self.flags.contains(SlotFlags::COMMITTED)
    }

    /// 当前代数
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// 检查句柄是否指向本槽位当前的提交
    pub(crate) fn matches(&self, id: SlotId) -> bool {
        self.is_committed() && self.generation == id.generation
    }

    pub(crate) fn mark_committed(&mut self) {
        self.flags.insert(SlotFlags::COMMITTED);
    }

    pub(crate) fn clear_committed(&mut self) {
        self.flags.remove(SlotFlags::COMMITTED);
    }
}
