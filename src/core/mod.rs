pub mod context;
pub mod task_graph;

pub use crate::domain::model::{TaskOutput, TaskReport};
pub use crate::domain::ports::{Renderer, Storage, Task};
pub use crate::utils::error::Result;
pub use context::BuildContext;
pub use task_graph::{TaskNode, TaskRunner};
