//! logging utilities

// 初始化日志
//
// 宿主可能多次创建脚本对象, try_init 重复调用时忽略错误
pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_ansi(true)
        .with_max_level(tracing::Level::DEBUG)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .try_init();
}
