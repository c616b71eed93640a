//! Commands scheduled onto a connection's driver task.
//! 调度到连接驱动任务上的命令。

/// Commands sent to the driver task, the connection's own execution context.
///
/// Any mutation of a live channel (cancel, close) goes through the driver
/// rather than being performed from an arbitrary caller thread.
///
/// 发送到驱动任务（连接自己的执行上下文）的命令。
///
/// 对存活通道的任何变更（取消、关闭）都经由驱动执行，而不是在任意调用者
/// 线程上直接进行。
#[derive(Debug)]
pub enum DriverCommand {
    /// Cancel whatever stage is in flight, or close the established channel
    /// outright.
    ///
    /// 取消正在进行的任何阶段，或直接关闭已建立的通道。
    ShutdownImmediately,
}
