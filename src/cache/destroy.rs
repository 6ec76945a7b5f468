//! 块销毁回调接口

use super::slot::Slot;

/// 块销毁回调 trait
///
/// 缓存在释放一个带来源引用的槽位之前调用它，
/// 让外部拥有者清理来源引用关联的状态。调用时槽位的数据副本仍然有效。
///
/// 回调不能重入缓存：它只拿到槽位的只读引用，借用检查器保证这一点。
///
/// # 示例
///
/// ```rust,ignore
/// // 闭包
/// let cache = BlockCache::new(pool, 4096, |slot: &Slot<u32>| {
///     registry.release(*slot.source().unwrap());
/// }, 16)?;
///
/// // 不需要清理
/// let cache = BlockCache::new(pool, 4096, NoopDestructor, 16)?;
/// ```
pub trait BlockDestructor<S> {
    /// 销毁槽位来源关联的外部状态
    fn destroy(&mut self, slot: &Slot<S>);
}

/// 空实现（默认）
///
/// 用于来源引用不需要额外清理的场景
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDestructor;

impl<S> BlockDestructor<S> for NoopDestructor {
    #[inline]
    fn destroy(&mut self, _slot: &Slot<S>) {}
}

impl<S, F> BlockDestructor<S> for F
where
    F: FnMut(&Slot<S>),
{
    #[inline]
    fn destroy(&mut self, slot: &Slot<S>) {
        self(slot)
    }
}
