pub mod graphs;
pub mod packager;
pub mod tasks;
pub mod watch;

pub use graphs::graph_for;
pub use packager::{Packager, PackingTask, PhpRenderer};
pub use watch::{WatchPlan, WatchTask, Watcher};
