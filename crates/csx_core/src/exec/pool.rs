//! Barrier-synchronised, CPU-pinned worker pool, per spec.md §5.
//!
//! Grounded on the pinning helper pattern used elsewhere in this
//! retrieval pack (`set_thread_affinity`): `libc::sched_setaffinity` on
//! Linux behind a `cfg(target_os = "linux")` gate, a no-op hint elsewhere.

use std::sync::{Arc, Barrier, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::{CsxError, CsxResult};

#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        let ret = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if ret != 0 {
            log::warn!("sched_setaffinity({cpu}) failed, continuing unpinned");
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_cpu(cpu: usize) {
    log::debug!("CPU pinning requested for cpu {cpu} but not supported on this platform");
}

/// The NUMA node a CPU is attached to, so a persisted `TunedImage` records
/// where each worker was actually pinned (spec.md §5's per-partition
/// cpu/id/node triple). The source resolves this through libnuma's
/// `numa_node_of_cpu`; this crate reads the same topology straight out of
/// `/sys/devices/system/node` instead of binding a separate NUMA library,
/// since the only thing needed is "which node lists this cpu".
#[cfg(target_os = "linux")]
pub fn numa_node_of_cpu(cpu: usize) -> u32 {
    let Ok(entries) = std::fs::read_dir("/sys/devices/system/node") else {
        log::debug!("NUMA topology unavailable, assuming node 0 for cpu {cpu}");
        return 0;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(node_str) = name.to_str().and_then(|n| n.strip_prefix("node")) else {
            continue;
        };
        let Ok(node) = node_str.parse::<u32>() else {
            continue;
        };
        let cpulist_path = entry.path().join("cpulist");
        let Ok(cpulist) = std::fs::read_to_string(&cpulist_path) else {
            continue;
        };
        if cpulist_contains(cpulist.trim(), cpu) {
            return node;
        }
    }
    log::debug!("cpu {cpu} not found in any NUMA node's cpulist, assuming node 0");
    0
}

#[cfg(not(target_os = "linux"))]
pub fn numa_node_of_cpu(cpu: usize) -> u32 {
    log::debug!("NUMA node lookup requested for cpu {cpu} but not supported on this platform");
    0
}

/// Parses a Linux `cpulist` range string (`"0-3,8,10-11"`) and checks
/// whether `cpu` falls in it.
#[cfg(target_os = "linux")]
fn cpulist_contains(cpulist: &str, cpu: usize) -> bool {
    for range in cpulist.split(',') {
        let range = range.trim();
        if range.is_empty() {
            continue;
        }
        match range.split_once('-') {
            Some((lo, hi)) => {
                let (Ok(lo), Ok(hi)) = (lo.parse::<usize>(), hi.parse::<usize>()) else {
                    continue;
                };
                if (lo..=hi).contains(&cpu) {
                    return true;
                }
            }
            None => {
                if range.parse::<usize>() == Ok(cpu) {
                    return true;
                }
            }
        }
    }
    false
}

pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

/// One worker per partition, created once and pinned for its lifetime
/// (spec.md §5's "Scheduling model"). `barrier` separates preprocessing
/// from execution and each SpMV call's Barrier 0/Barrier 1 pair.
pub struct WorkerPool {
    senders: Vec<Sender<Message>>,
    handles: Vec<JoinHandle<()>>,
    panicked: Arc<Mutex<bool>>,
}

impl WorkerPool {
    /// `affinity` maps worker index to a CPU id; if shorter than
    /// `nr_workers`, remaining workers run unpinned with a logged warning
    /// (spec.md §5's "more workers than remaining in the pool").
    pub fn new(nr_workers: usize, affinity: &[usize]) -> Self {
        let panicked = Arc::new(Mutex::new(false));
        let mut senders = Vec::with_capacity(nr_workers);
        let mut handles = Vec::with_capacity(nr_workers);

        for idx in 0..nr_workers {
            let (tx, rx): (Sender<Message>, Receiver<Message>) = unbounded();
            let cpu = affinity.get(idx).copied();
            if cpu.is_none() && !affinity.is_empty() {
                log::warn!("worker {idx} has no CPU affinity entry; running unpinned");
            }
            let panicked = Arc::clone(&panicked);
            let handle = std::thread::Builder::new()
                .name(format!("csx-worker-{idx}"))
                .spawn(move || {
                    if let Some(cpu) = cpu {
                        pin_to_cpu(cpu);
                    }
                    worker_loop(rx, &panicked);
                })
                .expect("failed to spawn csx worker thread");
            senders.push(tx);
            handles.push(handle);
        }

        Self {
            senders,
            handles,
            panicked,
        }
    }

    pub fn nr_workers(&self) -> usize {
        self.senders.len()
    }

    /// Run `job_for(worker_idx)` on every worker and wait for all of them
    /// to finish (spec.md §5's bulk-synchronous Barrier 0 / Barrier 1
    /// pair, modelled as a dispatch-and-join round since each `spmv` call
    /// is already a single synchronous round from the caller's view).
    pub fn run_round<F>(&self, job_for: F) -> CsxResult<()>
    where
        F: Fn(usize) -> Job,
    {
        let barrier = Arc::new(Barrier::new(self.senders.len() + 1));
        for (idx, tx) in self.senders.iter().enumerate() {
            let barrier = Arc::clone(&barrier);
            let job = job_for(idx);
            let wrapped: Job = Box::new(move || {
                job();
                barrier.wait();
            });
            tx.send(Message::Run(wrapped)).expect("worker channel closed unexpectedly");
        }
        barrier.wait();

        if *self.panicked.lock().unwrap() {
            return Err(CsxError::WorkerPanicked);
        }
        Ok(())
    }
}

fn worker_loop(rx: Receiver<Message>, panicked: &Arc<Mutex<bool>>) {
    for msg in rx {
        match msg {
            Message::Run(job) => {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job));
                if result.is_err() {
                    *panicked.lock().unwrap() = true;
                }
            }
            Message::Stop => break,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for tx in &self.senders {
            let _ = tx.send(Message::Stop);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn run_round_executes_every_worker() {
        let pool = WorkerPool::new(4, &[]);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        pool.run_round(move |_idx| {
            let c = Arc::clone(&c);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn worker_panic_is_surfaced_as_error() {
        let pool = WorkerPool::new(1, &[]);
        let result = pool.run_round(|_idx| Box::new(|| panic!("boom")));
        assert!(matches!(result, Err(CsxError::WorkerPanicked)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn cpulist_parses_ranges_and_singletons() {
        assert!(cpulist_contains("0-3,8,10-11", 2));
        assert!(cpulist_contains("0-3,8,10-11", 8));
        assert!(cpulist_contains("0-3,8,10-11", 11));
        assert!(!cpulist_contains("0-3,8,10-11", 9));
    }

    #[test]
    fn numa_node_of_cpu_never_panics() {
        // The real NUMA topology is whatever the host happens to have; this
        // just checks the lookup degrades to a value rather than panicking
        // on hosts without `/sys/devices/system/node`.
        let _ = numa_node_of_cpu(0);
    }
}
