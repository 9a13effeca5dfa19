pub mod task_json;

pub use task_json::{DecodeError, WireTask, parse_tasks, serialize_tasks};
