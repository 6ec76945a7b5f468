//! lrucache_core: 固定容量的 LRU 块缓存
//!
//! 这是一个纯 Rust 实现的块缓存库，旨在提供：
//! - **零 unsafe 代码**
//! - **预分配的槽位数组**，槽位元数据不做逐块堆分配
//! - **双重容量约束**：槽位数量 + 字节预算
//! - **可替换的内存池**和块销毁回调
//!
//! # 示例
//!
//! ```rust,ignore
//! use lrucache_core::{BlockCache, GlobalPool, NoopDestructor, Result};
//!
//! fn main() -> Result<()> {
//!     let mut cache: BlockCache<u32, _, _> =
//!         BlockCache::new(GlobalPool::new(), 1024, NoopDestructor, 3)?;
//!
//!     let a = cache.insert(&[1u8; 10], Some(1))?;
//!     let _b = cache.insert(&[2u8; 20], Some(2))?;
//!
//!     // 驱逐 LRU 块
//!     cache.free_block(None)?;
//!     assert!(!cache.contains(a));
//!
//!     cache.teardown();
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`pool`] - 内存池抽象
//! - [`cache`] - 块缓存

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 内存池
pub mod pool;

/// 块缓存
pub mod cache;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 内存池
pub use pool::{GlobalPool, MemPool};

// Cache
pub use cache::{
    BlockCache, BlockDestructor, CacheConfig, CacheStats, FreePolicy, NoopDestructor, Slot,
    SlotId,
};

// 默认配置
pub use consts::{DEFAULT_ALLOCATION_LIMIT, DEFAULT_SLOT_LIMIT};
