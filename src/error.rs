//! 错误类型定义
//!
//! 提供块缓存操作的错误类型。
//!
//! 缓存的大多数"失败"情形（空缓存上释放、重复 teardown）是静默的空操作，
//! 不会产生错误。这里只覆盖调用方可以合理处理的情况。

use core::fmt;

/// 块缓存操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 无效参数
    InvalidInput,
    /// 槽位未提交（句柄已过期或从未提交）
    NotCommitted,
    /// 没有空闲槽位
    NoSpace,
    /// 内存池分配失败
    OutOfMemory,
    /// 无效状态（例如 teardown 之后继续使用）
    InvalidState,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<alloc::collections::TryReserveError> for Error {
    fn from(_err: alloc::collections::TryReserveError) -> Self {
        Error::new(ErrorKind::OutOfMemory, "Memory pool allocation failed")
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
