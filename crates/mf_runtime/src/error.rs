// crates/mf_runtime/src/error.rs

//! 统一错误类型
//!
//! 整个工作空间共用一个可失败返回类型 [`MfResult`]。
//! 内循环的步长拒绝不是错误路径，由控制数比较驱动普通控制流。

use thiserror::Error;

/// 统一结果类型
pub type MfResult<T> = Result<T, MfError>;

/// mflow 错误
#[derive(Error, Debug)]
pub enum MfError {
    /// 配置错误：缺少必需键、未知枚举值、冲突的初始条件
    #[error("配置错误: {message}")]
    Configuration {
        /// 错误描述信息
        message: String,
    },

    /// 场运算操作数不匹配（网格或映射不一致）
    #[error("操作数组合无效: {message}")]
    InvalidCombination {
        /// 错误描述信息
        message: String,
    },

    /// 不支持的几何：带洞多边形、不支持的几何类型或栅格网格
    #[error("不支持的几何: {message}")]
    UnsupportedGeometry {
        /// 错误描述信息
        message: String,
    },

    /// inverted 选择只允许单个多边形
    #[error("无效的反选: {message}")]
    InvalidInversion {
        /// 错误描述信息
        message: String,
    },

    /// I/O 失败：配置/栅格/时间序列读取、输出目录创建、截断的二进制文件
    #[error("I/O 失败: {message}")]
    Io {
        /// 错误描述信息
        message: String,
        /// 底层 I/O 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 一个同步区间内重复步数达到上限
    #[error("收敛失败: {message}")]
    Convergence {
        /// 错误描述信息
        message: String,
    },

    /// 已识别但未实现的功能
    #[error("未实现: {message}")]
    NotImplemented {
        /// 错误描述信息
        message: String,
    },
}

// 便捷构造方法

impl MfError {
    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// 创建操作数组合错误
    pub fn invalid_combination(message: impl Into<String>) -> Self {
        Self::InvalidCombination {
            message: message.into(),
        }
    }

    /// 创建几何不支持错误
    pub fn unsupported_geometry(message: impl Into<String>) -> Self {
        Self::UnsupportedGeometry {
            message: message.into(),
        }
    }

    /// 创建反选错误
    pub fn invalid_inversion(message: impl Into<String>) -> Self {
        Self::InvalidInversion {
            message: message.into(),
        }
    }

    /// 创建 I/O 错误（无底层来源）
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带底层来源的 I/O 错误
    pub fn io_with(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 创建收敛失败错误
    pub fn convergence(message: impl Into<String>) -> Self {
        Self::Convergence {
            message: message.into(),
        }
    }

    /// 创建未实现错误
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    /// 进程退出码（全部非零）
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } => 2,
            Self::InvalidCombination { .. } => 3,
            Self::UnsupportedGeometry { .. } => 4,
            Self::InvalidInversion { .. } => 5,
            Self::Io { .. } => 6,
            Self::Convergence { .. } => 7,
            Self::NotImplemented { .. } => 8,
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
