use crate::app::packager::PackingTask;
use crate::app::tasks::{
    CleanMinifyTask, ComposerTask, ConnectTask, MinifyCssTask, MinifyJsTask, SassTask,
    ServiceWorkerTask, TypeScriptTask, VendorFontsTask,
};
use crate::app::watch::WatchTask;
use crate::core::TaskNode;
use crate::utils::error::{BuildError, Result};

/// 可以從命令列直接呼叫的任務名稱
pub const TASK_NAMES: &[&str] = &[
    "connect",
    "sass",
    "typescript",
    "serviceWorker",
    "vendor_dependencies",
    "cleanMinify",
    "minify",
    "composerInstall",
    "composerUpdate",
    "watch",
    "one-file",
    "init",
    "build",
];

pub fn front_compile() -> TaskNode {
    TaskNode::parallel(
        "front-compile",
        vec![
            TaskNode::task(SassTask),
            TaskNode::task(VendorFontsTask),
            TaskNode::task(TypeScriptTask),
            TaskNode::task(ServiceWorkerTask),
        ],
    )
}

/// 先清掉舊的 min 檔並重新編譯，再同時壓縮 JS 與 CSS
pub fn minify() -> TaskNode {
    TaskNode::series(
        "minify",
        vec![
            TaskNode::parallel(
                "prepare",
                vec![TaskNode::task(CleanMinifyTask), front_compile()],
            ),
            TaskNode::parallel(
                "compress",
                vec![TaskNode::task(MinifyJsTask), TaskNode::task(MinifyCssTask)],
            ),
        ],
    )
}

pub fn one_file() -> TaskNode {
    TaskNode::series("one-file", vec![minify(), TaskNode::task(PackingTask)])
}

pub fn build() -> TaskNode {
    TaskNode::parallel(
        "build",
        vec![
            TaskNode::task(ConnectTask),
            front_compile(),
            TaskNode::task(WatchTask::default()),
        ],
    )
}

pub fn graph_for(name: &str) -> Result<TaskNode> {
    let node = match name {
        "connect" => TaskNode::task(ConnectTask),
        "sass" => TaskNode::task(SassTask),
        "typescript" => TaskNode::task(TypeScriptTask),
        "serviceWorker" => TaskNode::task(ServiceWorkerTask),
        "vendor_dependencies" => TaskNode::task(VendorFontsTask),
        "cleanMinify" => TaskNode::task(CleanMinifyTask),
        "minify" => minify(),
        "composerInstall" => TaskNode::task(ComposerTask::install()),
        "composerUpdate" => TaskNode::task(ComposerTask::update()),
        "watch" => TaskNode::task(WatchTask::default()),
        "one-file" | "oneFile" => one_file(),
        "init" => TaskNode::task(ComposerTask::create_project()),
        "build" | "default" => build(),
        other => {
            return Err(BuildError::UnknownTask {
                name: other.to_string(),
            })
        }
    };
    Ok(node)
}
