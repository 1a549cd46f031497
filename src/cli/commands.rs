//! 控制台命令处理
//!
//! 处理以 : 开头的控制台命令，并持有一个会话的状态：
//! 已加载的图、环境变量、查询引擎和 tee 文件

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::cli::printer::{PrintMode, Printer};
use crate::error::Result;
use crate::graph::Graph;
use crate::metrics::{global_metrics, ExecutionMode};
use crate::query::{Environment, QueryEngine};
use crate::types::Value;
use crate::validation::GraphValidator;

/// 控制台命令执行结果
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// 继续运行
    Continue,
    /// 退出程序
    Exit,
    /// 显示消息
    Message(String),
    /// 错误
    Error(String),
}

/// 控制台状态
pub struct ConsoleState {
    /// 输出到文件
    pub tee_file: Option<File>,
    /// 查询所针对的图
    pub graph: Option<Graph>,
    /// `using` / `store as` 共享的环境
    pub env: Environment,
    pub engine: QueryEngine,
}

impl ConsoleState {
    pub fn new(engine: QueryEngine, graph: Option<Graph>) -> Self {
        Self {
            tee_file: None,
            graph,
            env: Environment::new(),
            engine,
        }
    }

    /// 写入输出（同时写入 stdout 和 tee 文件）
    pub fn write_output(&mut self, content: &str) {
        print!("{}", content);
        if let Some(ref mut file) = self.tee_file {
            let _ = file.write_all(content.as_bytes());
        }
    }

    /// 按当前执行方式求值，返回结果和耗时
    pub fn run_query(&mut self, text: &str) -> Result<(Value, Duration)> {
        let start = Instant::now();
        let value = self.engine.evaluate(text, self.graph.as_ref(), &mut self.env)?;
        Ok((value, start.elapsed()))
    }
}

/// 解析并执行控制台命令
pub fn execute_console_command(input: &str, state: &mut ConsoleState) -> CommandResult {
    let input = input.trim();
    let cmd_line = input.strip_prefix(':').unwrap_or(input);

    let mut parts = cmd_line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().unwrap_or("").trim();

    match cmd.as_str() {
        "help" | "h" => CommandResult::Message(get_help_text()),

        "quit" | "q" | "exit" => CommandResult::Exit,

        "mode" => match args {
            "" => CommandResult::Message(format!("Execution mode: {}", state.engine.config().mode)),
            "interpreted" | "i" => {
                state.engine.set_mode(ExecutionMode::Interpreted);
                CommandResult::Message("Execution mode: interpreted".to_string())
            }
            "compiled" | "c" => {
                state.engine.set_mode(ExecutionMode::Compiled);
                CommandResult::Message("Execution mode: compiled".to_string())
            }
            _ => CommandResult::Error("Usage: :mode [interpreted|compiled]".to_string()),
        },

        "timeout" => {
            if args.is_empty() || args == "0" {
                state.engine.set_timeout(None);
                CommandResult::Message("Timeout disabled".to_string())
            } else if let Ok(ms) = args.parse::<u64>() {
                state.engine.set_timeout(Some(Duration::from_millis(ms)));
                CommandResult::Message(format!("Timeout set to {} ms", ms))
            } else {
                CommandResult::Error("Usage: :timeout <milliseconds>".to_string())
            }
        }

        "env" => match args {
            "" => CommandResult::Message(Printer::default().print_env(&state.env)),
            "clear" => {
                state.env.clear();
                CommandResult::Message("Environment cleared".to_string())
            }
            name => match state.env.remove(name) {
                Some(_) => CommandResult::Message(format!("Removed {}", name)),
                None => CommandResult::Error(format!("{} is not bound", name)),
            },
        },

        "stats" => {
            let snapshot = global_metrics().snapshot();
            CommandResult::Message(Printer::new(PrintMode::Table).print_stats(&snapshot))
        }

        "validate" => match &state.graph {
            Some(graph) => {
                let report = GraphValidator::new(graph).validate();
                CommandResult::Message(Printer::default().print_validation(&report))
            }
            None => CommandResult::Error("No graph loaded".to_string()),
        },

        "tee" => {
            let args_parts: Vec<&str> = args.split_whitespace().collect();
            let (overwrite, filename) = if args_parts.first() == Some(&"-o") {
                (true, args_parts.get(1).copied())
            } else {
                (false, args_parts.first().copied())
            };

            if let Some(filename) = filename {
                let path = PathBuf::from(filename);
                let file = if overwrite {
                    File::create(&path)
                } else {
                    File::options().create(true).append(true).open(&path)
                };

                match file {
                    Ok(f) => {
                        state.tee_file = Some(f);
                        CommandResult::Message(format!("Logging to {}", filename))
                    }
                    Err(e) => CommandResult::Error(format!("Cannot open file: {}", e)),
                }
            } else {
                CommandResult::Error("Usage: :tee [-o] <filename>".to_string())
            }
        }

        "notee" => {
            if state.tee_file.take().is_some() {
                CommandResult::Message("Stopped logging".to_string())
            } else {
                CommandResult::Message("No active logging".to_string())
            }
        }

        "clear" => {
            print!("\x1B[2J\x1B[1;1H");
            CommandResult::Continue
        }

        _ => CommandResult::Error(format!("Unknown command: {}. Type :help for help.", cmd)),
    }
}

/// 检查输入是否是控制台命令
pub fn is_console_command(input: &str) -> bool {
    input.trim().starts_with(':')
}

fn get_help_text() -> String {
    r#"
╔═══════════════════════════════════════════════════════════════╗
║                    Console Commands                           ║
╠═══════════════════════════════════════════════════════════════╣
║ :help, :h                  Show this help                     ║
║ :quit, :q, :exit           Exit the program                   ║
║ :mode [interpreted|compiled]  Show or set the execution mode  ║
║ :timeout <ms>              Set query timeout (0 to disable)   ║
║ :env [clear|<name>]        Show, clear or unbind variables    ║
║ :stats                     Show query metrics                 ║
║ :validate                  Check multiplicities/constraints   ║
║ :tee [-o] <filename>       Log output to file (-o: overwrite) ║
║ :notee                     Stop logging to file               ║
║ :clear                     Clear the screen                   ║
╠═══════════════════════════════════════════════════════════════╣
║ Queries:                                                      ║
║   count(V{Town})                                              ║
║   from v : V{Town} with getVertex(1) -->* v report v.name end ║
║   let x := 3 in x * x store as nine                           ║
║ Tip: Use \G at end of query for vertical result display       ║
╚═══════════════════════════════════════════════════════════════╝
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn state() -> ConsoleState {
        ConsoleState::new(QueryEngine::new(EngineConfig::default()), None)
    }

    #[test]
    fn test_mode_and_timeout() {
        let mut state = state();
        assert!(matches!(
            execute_console_command(":mode compiled", &mut state),
            CommandResult::Message(_)
        ));
        assert_eq!(state.engine.config().mode, ExecutionMode::Compiled);
        assert!(matches!(
            execute_console_command(":mode fast", &mut state),
            CommandResult::Error(_)
        ));

        execute_console_command(":timeout 500", &mut state);
        assert_eq!(state.engine.config().timeout_ms, Some(500));
        execute_console_command(":timeout 0", &mut state);
        assert_eq!(state.engine.config().timeout_ms, None);
    }

    #[test]
    fn test_env_commands() {
        let mut state = state();
        state.run_query("let x := 2 in x * 21 store as answer").unwrap();
        assert_eq!(state.env.get("answer"), Some(&Value::Int(42)));

        match execute_console_command(":env", &mut state) {
            CommandResult::Message(text) => assert!(text.contains("answer")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            execute_console_command(":env answer", &mut state),
            CommandResult::Message(_)
        ));
        assert!(state.env.is_empty());
        assert!(matches!(
            execute_console_command(":env answer", &mut state),
            CommandResult::Error(_)
        ));
    }

    #[test]
    fn test_misc_commands() {
        let mut state = state();
        assert_eq!(execute_console_command(":q", &mut state), CommandResult::Exit);
        assert!(matches!(
            execute_console_command(":validate", &mut state),
            CommandResult::Error(_)
        ));
        assert!(matches!(
            execute_console_command(":bogus", &mut state),
            CommandResult::Error(_)
        ));
        assert!(is_console_command("  :help"));
        assert!(!is_console_command("count(V)"));
    }

    #[test]
    fn test_tee() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut state = state();
        execute_console_command(&format!(":tee -o {}", path.display()), &mut state);
        state.write_output("hello\n");
        execute_console_command(":notee", &mut state);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
