// crates/mf_runtime/src/queue.rs

//! DeviceQueue - 计算队列
//!
//! 数据并行内核的唯一提交点。一次提交是一个对索引空间的闭包，
//! 在队列自己的线程池上并行执行；提交之间严格串行，因此引用
//! 同一缓冲区的提交自动满足 happens-before。
//!
//! 宿主线程只在两处挂起：标量归约读回与主机/设备间搬移。

use crate::error::{MfError, MfResult};
use std::sync::atomic::{AtomicU64, Ordering};

/// 计算设备描述
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// 平台序号
    pub platform_id: usize,
    /// 平台内设备序号
    pub device_id: usize,
    /// 设备名称
    pub name: String,
    /// 工作线程数（0 = 由运行时决定）
    pub threads: usize,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            platform_id: 0,
            device_id: 0,
            name: "host".to_string(),
            threads: 0,
        }
    }
}

/// 计算队列
///
/// 持有一个专属 rayon 线程池。所有场内核、场修改器与归约都经由
/// 此队列执行。
pub struct DeviceQueue {
    pool: rayon::ThreadPool,
    info: DeviceInfo,
}

impl std::fmt::Debug for DeviceQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceQueue")
            .field("info", &self.info)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl DeviceQueue {
    /// 按设备描述创建队列
    pub fn new(info: DeviceInfo) -> MfResult<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if info.threads > 0 {
            builder = builder.num_threads(info.threads);
        }
        let pool = builder
            .build()
            .map_err(|e| MfError::configuration(format!("无法创建计算队列: {}", e)))?;
        tracing::info!(
            device = %info.name,
            threads = pool.current_num_threads(),
            "计算队列已初始化"
        );
        Ok(Self { pool, info })
    }

    /// 使用默认设备创建队列
    pub fn default_device() -> MfResult<Self> {
        Self::new(DeviceInfo::default())
    }

    /// 设备描述
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// 提交一个遍历 `0..n` 的数据并行内核
    ///
    /// 返回时内核已完成；下一次提交自然观察到全部写入。
    pub fn parallel_for<F>(&self, n: usize, kernel: F)
    where
        F: Fn(usize) + Sync,
    {
        use rayon::prelude::*;
        self.pool.install(|| {
            (0..n).into_par_iter().for_each(|i| kernel(i));
        });
    }

    /// 提交一个写满 `dst` 的数据并行内核，`dst[i] = f(i)`
    pub fn parallel_fill<T, F>(&self, dst: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        use rayon::prelude::*;
        self.pool.install(|| {
            dst.par_iter_mut().enumerate().for_each(|(i, x)| *x = f(i));
        });
    }

    /// 提交一个就地更新 `dst` 的数据并行内核
    pub fn parallel_update<T, F>(&self, dst: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        use rayon::prelude::*;
        self.pool.install(|| {
            dst.par_iter_mut().enumerate().for_each(|(i, x)| f(i, x));
        });
    }

    /// 提交一个同时更新三个等长缓冲的数据并行内核
    pub fn parallel_zip3<T, F>(&self, a: &mut [T], b: &mut [T], c: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T, &mut T, &mut T) + Sync,
    {
        use rayon::prelude::*;
        self.pool.install(|| {
            a.par_iter_mut()
                .zip(b.par_iter_mut())
                .zip(c.par_iter_mut())
                .enumerate()
                .for_each(|(i, ((x, y), z))| f(i, x, y, z));
        });
    }

    /// 提交一个同时更新四个等长缓冲的数据并行内核
    pub fn parallel_zip4<T, F>(&self, a: &mut [T], b: &mut [T], c: &mut [T], d: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T, &mut T, &mut T, &mut T) + Sync,
    {
        use rayon::prelude::*;
        self.pool.install(|| {
            a.par_iter_mut()
                .zip(b.par_iter_mut())
                .zip(c.par_iter_mut())
                .zip(d.par_iter_mut())
                .enumerate()
                .for_each(|(i, (((x, y), z), w))| f(i, x, y, z, w));
        });
    }

    /// 逐元素取最大值的并行归约，返回读回宿主的标量
    ///
    /// 仅对非负值正确：非负 f64 的位表示保持与数值一致的全序，
    /// 可用原子位比较收集最大值。
    pub fn max_reduce<F>(&self, n: usize, value: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync,
    {
        use rayon::prelude::*;
        let max_bits = AtomicU64::new(0f64.to_bits());
        self.pool.install(|| {
            (0..n).into_par_iter().for_each(|i| {
                let v = value(i);
                if v.is_finite() && v > 0.0 {
                    max_bits.fetch_max(v.to_bits(), Ordering::Relaxed);
                }
            });
        });
        f64::from_bits(max_bits.load(Ordering::Relaxed))
    }

    /// 求和归约（宿主侧分块求和）
    pub fn sum_reduce<F>(&self, n: usize, value: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync,
    {
        use rayon::prelude::*;
        self.pool.install(|| (0..n).into_par_iter().map(|i| value(i)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_for_covers_range() {
        let q = DeviceQueue::default_device().unwrap();
        let hits: Vec<AtomicU64> = (0..100).map(|_| AtomicU64::new(0)).collect();
        q.parallel_for(100, |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn test_max_reduce() {
        let q = DeviceQueue::default_device().unwrap();
        let data: Vec<f64> = (0..1000).map(|i| (i as f64) * 0.01).collect();
        let max = q.max_reduce(data.len(), |i| data[i]);
        assert!((max - 9.99).abs() < 1e-12);
    }

    #[test]
    fn test_max_reduce_ignores_nan() {
        let q = DeviceQueue::default_device().unwrap();
        let data = [1.0, f64::NAN, 3.0, f64::NAN];
        let max = q.max_reduce(data.len(), |i| data[i]);
        assert_eq!(max, 3.0);
    }

    #[test]
    fn test_max_reduce_empty_is_zero() {
        let q = DeviceQueue::default_device().unwrap();
        assert_eq!(q.max_reduce(0, |_| 1.0), 0.0);
    }

    #[test]
    fn test_sum_reduce() {
        let q = DeviceQueue::default_device().unwrap();
        let sum = q.sum_reduce(100, |i| i as f64);
        assert_eq!(sum, 4950.0);
    }
}
