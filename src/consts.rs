//! 块缓存常量定义

/// 默认槽位数量
pub const DEFAULT_SLOT_LIMIT: usize = 256;

/// 默认总字节预算（1 MiB）
pub const DEFAULT_ALLOCATION_LIMIT: usize = 1024 * 1024;

/// 槽位索引的上限
///
/// `SlotId` 使用 u32 保存索引，槽位数量不能超过这个值
pub const MAX_SLOT_LIMIT: usize = u32::MAX as usize;
