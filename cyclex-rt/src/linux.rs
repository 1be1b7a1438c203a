use std::io;

use nix::sched::{sched_setaffinity, CpuSet};
use nix::sys::mman::{mlockall, MlockAllFlags};
use nix::unistd::Pid;

use crate::RtError;

pub(crate) fn lock_memory() -> Result<(), RtError> {
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(|errno| RtError::MemoryLock(io::Error::from(errno)))
}

pub(crate) fn pin_to_cpu(cpu: usize) -> Result<(), RtError> {
    let affinity = |errno| RtError::CpuAffinity {
        cpu,
        source: io::Error::from(errno),
    };

    let mut cpuset = CpuSet::new();
    cpuset.set(cpu).map_err(affinity)?;
    sched_setaffinity(Pid::from_raw(0), &cpuset).map_err(affinity)
}

pub(crate) fn set_round_robin_priority(priority: i32) -> Result<(), RtError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid, initialised sched_param that outlives the call;
    // pid 0 addresses the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_RR, &param) };
    if ret != 0 {
        return Err(RtError::SchedulingPolicy {
            priority,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
