// crates/mf_runtime/src/array.rs

//! DataArray - 数据数组
//!
//! 每个数组在任意时刻恰好存在一个"活"副本：宿主缓冲或设备缓冲。
//! 搬移是所有权转移，字节级精确；克隆复制整个存储。
//!
//! 内核通过 [`DataArray::slice`] / [`DataArray::slice_mut`] 借用当前
//! 驻留侧的数据，一次提交内独占可写借用由借用检查器保证。

use crate::error::{MfError, MfResult};
use crate::queue::DeviceQueue;
use bytemuck::Pod;
use std::sync::Arc;

enum Storage<T> {
    Host(Vec<T>),
    Device(Vec<T>),
}

/// 数据数组（主机/设备单一驻留）
pub struct DataArray<T: Pod> {
    queue: Arc<DeviceQueue>,
    storage: Storage<T>,
}

impl<T: Pod> DataArray<T> {
    /// 创建填充 `init` 的数组
    pub fn new(queue: Arc<DeviceQueue>, len: usize, init: T, on_device: bool) -> Self {
        let buf = vec![init; len];
        let storage = if on_device {
            Storage::Device(buf)
        } else {
            Storage::Host(buf)
        };
        Self { queue, storage }
    }

    /// 从宿主向量创建（初始驻留宿主）
    pub fn from_vec(queue: Arc<DeviceQueue>, data: Vec<T>) -> Self {
        Self {
            queue,
            storage: Storage::Host(data),
        }
    }

    /// 元素个数
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Host(v) | Storage::Device(v) => v.len(),
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前是否驻留设备
    pub fn is_on_device(&self) -> bool {
        matches!(self.storage, Storage::Device(_))
    }

    /// 搬移到设备（已在设备则为空操作）
    pub fn move_to_device(&mut self) {
        if let Storage::Host(v) = &mut self.storage {
            let data = std::mem::take(v);
            self.storage = Storage::Device(data);
        }
    }

    /// 搬移到宿主（已在宿主则为空操作）
    pub fn move_to_host(&mut self) {
        if let Storage::Device(v) = &mut self.storage {
            let data = std::mem::take(v);
            self.storage = Storage::Host(data);
        }
    }

    /// 借用当前驻留侧的只读切片
    pub fn slice(&self) -> &[T] {
        match &self.storage {
            Storage::Host(v) | Storage::Device(v) => v,
        }
    }

    /// 借用当前驻留侧的可写切片
    pub fn slice_mut(&mut self) -> &mut [T] {
        match &mut self.storage {
            Storage::Host(v) | Storage::Device(v) => v,
        }
    }

    /// 宿主侧只读访问；驻留设备时失败
    pub fn host_slice(&self) -> MfResult<&[T]> {
        match &self.storage {
            Storage::Host(v) => Ok(v),
            Storage::Device(_) => Err(MfError::invalid_combination(
                "数组驻留设备，无法在宿主侧访问",
            )),
        }
    }

    /// 宿主侧可写访问；驻留设备时失败
    pub fn host_slice_mut(&mut self) -> MfResult<&mut [T]> {
        match &mut self.storage {
            Storage::Host(v) => Ok(v),
            Storage::Device(_) => Err(MfError::invalid_combination(
                "数组驻留设备，无法在宿主侧访问",
            )),
        }
    }

    /// 用指定值填充
    pub fn fill(&mut self, value: T) {
        for x in self.slice_mut() {
            *x = value;
        }
    }

    /// 所属队列
    pub fn queue(&self) -> &Arc<DeviceQueue> {
        &self.queue
    }
}

impl<T: Pod> Clone for DataArray<T> {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Host(v) => Storage::Host(v.clone()),
            Storage::Device(v) => Storage::Device(v.clone()),
        };
        Self {
            queue: Arc::clone(&self.queue),
            storage,
        }
    }
}

impl<T: Pod + std::fmt::Debug> std::fmt::Debug for DataArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataArray")
            .field("len", &self.len())
            .field("on_device", &self.is_on_device())
            .finish()
    }
}
