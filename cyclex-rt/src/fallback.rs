use crate::RtError;

pub(crate) fn lock_memory() -> Result<(), RtError> {
    Err(RtError::Unsupported("mlockall"))
}

pub(crate) fn pin_to_cpu(_cpu: usize) -> Result<(), RtError> {
    Err(RtError::Unsupported("sched_setaffinity"))
}

pub(crate) fn set_round_robin_priority(_priority: i32) -> Result<(), RtError> {
    Err(RtError::Unsupported("SCHED_RR"))
}
