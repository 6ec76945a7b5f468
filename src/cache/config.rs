//! 缓存配置

use crate::consts::{DEFAULT_ALLOCATION_LIMIT, DEFAULT_SLOT_LIMIT};

/// 释放策略
///
/// 决定 `free_block` 在收到未提交（或已过期）句柄时的行为。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreePolicy {
    /// 兼容行为：不做任何链表操作，但已提交计数仍然减一
    #[default]
    Legacy,
    /// 严格行为：返回 `NotCommitted` 错误，状态不变
    Strict,
}

/// 缓存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 所有已提交块的总字节预算
    ///
    /// 只有 `insert` 路径会据此驱逐，`commit` 不检查
    pub allocation_limit: usize,
    /// 槽位数量（至少为 1）
    pub slot_limit: usize,
    /// 释放策略
    pub free_policy: FreePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            allocation_limit: DEFAULT_ALLOCATION_LIMIT,
            slot_limit: DEFAULT_SLOT_LIMIT,
            free_policy: FreePolicy::Legacy,
        }
    }
}

impl CacheConfig {
    /// 设置字节预算
    pub fn with_allocation_limit(mut self, limit: usize) -> Self {
        self.allocation_limit = limit;
        self
    }

    /// 设置槽位数量
    pub fn with_slot_limit(mut self, limit: usize) -> Self {
        self.slot_limit = limit;
        self
    }

    /// 设置释放策略
    pub fn with_free_policy(mut self, policy: FreePolicy) -> Self {
        self.free_policy = policy;
        self
    }
}
