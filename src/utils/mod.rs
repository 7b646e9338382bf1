pub mod clock;
pub mod helper;
pub mod task_supervisor;
