use tracing_subscriber::EnvFilter;

use crate::shell::start_shell;

mod shell;

fn main() {
    // 日志写到 stderr，默认只输出警告，RUST_LOG 可覆盖
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    start_shell();
}
