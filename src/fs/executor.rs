/// 执行文件内容的外部能力。
///
/// 文件系统只负责读出并解码内容，如何执行（沙箱解释器等）由调用方注入，
/// 核心代码不会自行求值任何内容。
pub trait Executor {
    fn execute(&mut self, name: &str, source: &str) -> Result<(), String>;
}
