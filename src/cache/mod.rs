//! 块缓存模块
//!
//! 固定容量、按字节预算的 LRU 块缓存。
//!
//! # 主要组件
//!
//! - [`BlockCache`] - 缓存本体：槽位数组 + 已提交链表 + 空闲链表
//! - [`Slot`] - 槽位，持有一个数据块副本
//! - [`SlotId`] - 带代数的槽位句柄，槽位复用后旧句柄失效
//! - [`BlockDestructor`] - 驱逐带来源引用的块时调用的回调
//! - [`CacheConfig`] / [`FreePolicy`] - 构造参数
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 设计原理
//!
//! 槽位数组只在初始化时分配一次，两个双向链表都用数组索引串联在同一个数组上：
//!
//! 1. **已提交链表**：按访问时间排序，头为 LRU，尾为 MRU
//! 2. **空闲链表**：FIFO 队列，提交时取头，释放时追加到尾
//!
//! 链接是 `Option<u32>` 索引而不是指针，摘除和插入都是 O(1)，
//! 并且不需要 unsafe。
//!
//! # 两个容量约束
//!
//! - `slot_limit`: 槽位数量，固定
//! - `allocation_limit`: 已提交数据的总字节预算
//!
//! [`BlockCache::commit`] 只受槽位约束；[`BlockCache::insert`] 在两个约束
//! 任一不满足时从 LRU 端驱逐。
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use lrucache_core::cache::{BlockCache, CacheConfig, FreePolicy, Slot};
//! use lrucache_core::GlobalPool;
//!
//! let config = CacheConfig::default()
//!     .with_slot_limit(64)
//!     .with_allocation_limit(64 * 1024)
//!     .with_free_policy(FreePolicy::Strict);
//!
//! let destroy = |slot: &Slot<u64>| {
//!     log::info!("release source {:?}", slot.source());
//! };
//! let mut cache = BlockCache::with_config(GlobalPool::new(), destroy, config)?;
//!
//! let id = cache.insert(&[0u8; 512], Some(1))?;
//! if let Some(data) = cache.get(id) {
//!     // 使用 data...
//! }
//!
//! // 释放指定块
//! cache.free_block(Some(id))?;
//!
//! // 查看统计信息
//! let stats = cache.stats();
//! println!("Cache: {}/{} slots, {}/{} bytes",
//!          stats.committed, stats.slot_limit, stats.allocated, stats.allocation_limit);
//! ```
//!
//! # 性能特性
//!
//! - **提交**: O(1) - 空闲链表取头 + 一次内存池分配
//! - **驱逐**: O(1) - 链表摘除 + 一次内存池释放
//! - **访问提升**: O(1)
//! - **按来源查找**: O(n)
//!
//! # 并发
//!
//! 缓存只支持单线程、单所有者访问。需要共享时由调用方在外部加锁。

mod block_cache;
mod config;
mod destroy;
mod list;
mod slot;

pub use block_cache::{BlockCache, CacheStats};
pub use config::{CacheConfig, FreePolicy};
pub use destroy::{BlockDestructor, NoopDestructor};
pub use slot::{Slot, SlotFlags, SlotId, SlotIndex};
