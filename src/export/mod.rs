pub(crate) mod animated;
pub(crate) mod archive;
pub(crate) mod artifact;
pub(crate) mod job;
pub(crate) mod sched;
pub(crate) mod snapshot;
