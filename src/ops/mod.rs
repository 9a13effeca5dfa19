pub mod access;
pub mod aggregate;
pub mod task_ops;
pub mod time_math;
