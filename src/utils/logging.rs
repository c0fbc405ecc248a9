// 日志工具模块
//
// 封装 flexi_logger 的初始化和关闭操作，确保异步日志正确 flush

use crate::config::LogConfig;
use crate::core::error::{DRResult, DataRecyclerError};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use parking_lot::Mutex;

/// 日志系统状态
///
/// `log` 的全局日志器每个进程只能设置一次，关闭后不能回到未初始化状态
enum LoggerState {
    Uninitialized,
    Running(LoggerHandle),
    ShutDown,
}

/// 全局日志句柄，用于程序退出时 flush
static LOGGER_STATE: Mutex<LoggerState> = Mutex::new(LoggerState::Uninitialized);

/// 初始化日志系统
///
/// 日志按大小轮转，异步写入。
///
/// # Errors
///
/// - 日志系统已在运行时返回错误
/// - 调用过 [`shutdown`] 后返回错误：全局日志器在同一进程内只能设置一次
/// - 日志级别无效或日志文件无法创建时返回错误
///
/// # Examples
/// ```no_run
/// use datarecycler::config::Config;
/// use datarecycler::utils::logging;
///
/// let config = Config::default();
/// logging::init(&config.log).expect("日志初始化失败");
/// ```
pub fn init(config: &LogConfig) -> DRResult<()> {
    let mut state = LOGGER_STATE.lock();
    match *state {
        LoggerState::Running(_) => {
            return Err(DataRecyclerError::Config("日志系统已初始化".to_string()));
        }
        LoggerState::ShutDown => {
            return Err(DataRecyclerError::Config(
                "日志系统已关闭，同一进程内不能重新初始化".to_string(),
            ));
        }
        LoggerState::Uninitialized => {}
    }

    let handle = Logger::try_with_str(&config.level)
        .map_err(|e| DataRecyclerError::Config(format!("日志级别无效: {}", e)))?
        .log_to_file(
            FileSpec::default()
                .basename(&config.file)
                .directory(&config.dir),
        )
        .rotate(
            Criterion::Size(config.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .write_mode(WriteMode::Async)
        .append()
        .start()
        .map_err(|e| DataRecyclerError::Config(format!("日志启动失败: {}", e)))?;

    *state = LoggerState::Running(handle);
    drop(state);

    log::info!("日志系统初始化完成: {}/{}", config.dir, config.file);
    Ok(())
}

/// 刷新并关闭日志系统
///
/// 在程序退出前调用，确保所有异步日志都已写入文件。
/// 关闭后 [`init`] 不能再次成功；未初始化时调用不产生任何效果。
pub fn shutdown() {
    let mut state = LOGGER_STATE.lock();
    if matches!(*state, LoggerState::Running(_)) {
        if let LoggerState::Running(handle) = std::mem::replace(&mut *state, LoggerState::ShutDown) {
            handle.flush();
        }
    }
}

/// 检查日志系统是否正在运行
pub fn is_initialized() -> bool {
    matches!(*LOGGER_STATE.lock(), LoggerState::Running(_))
}

/// 检查日志系统是否已被关闭
pub fn is_shut_down() -> bool {
    matches!(*LOGGER_STATE.lock(), LoggerState::ShutDown)
}
