//! 内存池抽象
//!
//! 缓存中的所有分配（槽位数组和每个块的数据副本）都通过 [`MemPool`] 完成。
//! 内存池本身是外部协作者，缓存只调用它的分配/释放接口。

use crate::error::Result;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// 内存池接口
///
/// 实现此 trait 以接管缓存的内存分配。
///
/// # 示例
///
/// ```rust,ignore
/// use lrucache_core::{MemPool, Result};
///
/// struct ArenaPool {
///     // ...
/// }
///
/// impl MemPool for ArenaPool {
///     fn alloc(&mut self, size: usize) -> Result<Box<[u8]>> {
///         // 从 arena 中切出 size 字节
///         Ok(vec![0u8; size].into_boxed_slice())
///     }
///
///     fn free(&mut self, buf: Box<[u8]>) {
///         // 归还给 arena
///     }
/// }
/// ```
pub trait MemPool {
    /// 分配 `size` 字节的缓冲区
    ///
    /// 返回的内存必须已清零。
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>>;

    /// 释放之前由 [`MemPool::alloc`] 返回的缓冲区
    fn free(&mut self, buf: Box<[u8]>);

    /// 分配长度为 `len` 的数组，每个元素为 `T::default()`
    ///
    /// 缓存用它分配一次性的槽位数组。默认实现使用全局分配器，
    /// 分配失败时返回 `OutOfMemory` 而不是 abort。
    fn alloc_array<T: Default>(&mut self, len: usize) -> Result<Vec<T>> {
        let mut array = Vec::new();
        array.try_reserve_exact(len)?;
        array.resize_with(len, T::default);
        Ok(array)
    }

    /// 释放之前由 [`MemPool::alloc_array`] 返回的数组
    fn free_array<T>(&mut self, array: Vec<T>) {
        drop(array);
    }
}

impl<P: MemPool> MemPool for &mut P {
    #[inline]
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>> {
        (**self).alloc(size)
    }

    #[inline]
    fn free(&mut self, buf: Box<[u8]>) {
        (**self).free(buf)
    }

    #[inline]
    fn alloc_array<T: Default>(&mut self, len: usize) -> Result<Vec<T>> {
        (**self).alloc_array(len)
    }

    #[inline]
    fn free_array<T>(&mut self, array: Vec<T>) {
        (**self).free_array(array)
    }
}

/// 基于全局分配器的默认内存池
///
/// 记录当前占用的数据字节数和分配/释放次数，便于观察缓存的内存行为。
/// 槽位数组不计入 `bytes_in_use`。
#[derive(Debug, Default, Clone)]
pub struct GlobalPool {
    /// 当前未释放的数据字节数
    bytes_in_use: usize,
    /// 数据缓冲区分配次数
    alloc_count: u64,
    /// 数据缓冲区释放次数
    free_count: u64,
}

impl GlobalPool {
    /// 创建新的内存池
    pub const fn new() -> Self {
        Self {
            bytes_in_use: 0,
            alloc_count: 0,
            free_count: 0,
        }
    }

    /// 获取当前未释放的字节数
    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use
    }

    /// 获取分配次数
    pub fn alloc_count(&self) -> u64 {
        self.alloc_count
    }

    /// 获取释放次数
    pub fn free_count(&self) -> u64 {
        self.free_count
    }

    /// 获取尚未释放的缓冲区数量
    pub fn outstanding(&self) -> u64 {
        self.alloc_count.saturating_sub(self.free_count)
    }
}

impl MemPool for GlobalPool {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)?;
        buf.resize(size, 0u8);

        self.bytes_in_use += size;
        self.alloc_count += 1;
        Ok(buf.into_boxed_slice())
    }

    fn free(&mut self, buf: Box<[u8]>) {
        self.bytes_in_use = self.bytes_in_use.saturating_sub(buf.len());
        self.free_count += 1;
    }
}
