//! 槽位数组上的索引链表
//!
//! 已提交链表和空闲链表都是 [`SlotList`]，共用同一个槽位数组，
//! 通过槽位的 `next`/`prev` 字段串联。链表本身只记录头、尾和长度。
//!
//! 同一个 `SlotList` 必须始终配合同一个槽位数组使用，
//! 并且一个槽位同一时刻只能属于一个链表，这由调用方保证。

use super::slot::{Slot, SlotIndex};

/// 双向索引链表
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SlotList {
    head: Option<SlotIndex>,
    tail: Option<SlotIndex>,
    len: usize,
}

impl SlotList {
    /// 创建空链表
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// 按数组顺序串联全部槽位，槽位 0 为链表头
    ///
    /// 要求槽位的链接字段已清空。
    pub(crate) fn threaded<S>(slots: &mut [Slot<S>]) -> Self {
        let count = slots.len();
        for (i, slot) in slots.iter_mut().enumerate() {
            if i + 1 < count {
                slot.next = Some((i + 1) as SlotIndex);
            }
            if i > 0 {
                slot.prev = Some((i - 1) as SlotIndex);
            }
        }

        if count == 0 {
            return Self::new();
        }

        Self {
            head: Some(0),
            tail: Some((count - 1) as SlotIndex),
            len: count,
        }
    }

    pub(crate) fn head(&self) -> Option<SlotIndex> {
        self.head
    }

    pub(crate) fn tail(&self) -> Option<SlotIndex> {
        self.tail
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// 追加到链表尾部
    ///
    /// 槽位必须不在任何链表中。
    pub(crate) fn link_back<S>(&mut self, slots: &mut [Slot<S>], index: SlotIndex) {
        let i = index as usize;
        slots[i].next = None;
        slots[i].prev = self.tail;

        match self.tail {
            Some(tail) => slots[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    /// 从链表中摘除槽位，并清空它的链接
    ///
    /// 槽位必须是本链表的成员。
    pub(crate) fn unlink<S>(&mut self, slots: &mut [Slot<S>], index: SlotIndex) {
        let i = index as usize;
        let next = slots[i].next;
        let prev = slots[i].prev;

        if self.head == Some(index) {
            self.head = next;
            match next {
                Some(n) => slots[n as usize].prev = None,
                // 链表已空
                None => self.tail = None,
            }
        } else if self.tail == Some(index) {
            self.tail = prev;
            if let Some(p) = prev {
                slots[p as usize].next = None;
            }
        } else {
            if let Some(p) = prev {
                slots[p as usize].next = next;
            }
            if let Some(n) = next {
                slots[n as usize].prev = prev;
            }
        }

        slots[i].next = None;
        slots[i].prev = None;
        debug_assert!(self.len > 0, "unlink from empty list");
        self.len -= 1;
    }

    /// 清空链表记录（不触碰槽位）
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// 从头到尾遍历
    pub(crate) fn iter<'a, S>(&self, slots: &'a [Slot<S>]) -> Iter<'a, S> {
        Iter {
            slots,
            cursor: self.head,
            forward: true,
        }
    }

    /// 从尾到头遍历
    pub(crate) fn iter_rev<'a, S>(&self, slots: &'a [Slot<S>]) -> Iter<'a, S> {
        Iter {
            slots,
            cursor: self.tail,
            forward: false,
        }
    }
}

/// 链表迭代器，产出槽位索引
pub(crate) struct Iter<'a, S> {
    slots: &'a [Slot<S>],
    cursor: Option<SlotIndex>,
    forward: bool,
}

impl<'a, S> Iterator for Iter<'a, S> {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        let slot = self.slots.get(current as usize)?;
        self.cursor = if self.forward { slot.next } else { slot.prev };
        Some(current)
    }
}
