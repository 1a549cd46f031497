//! GReQL 关键字补全器
//!
//! 基于 rustyline 实现 Tab 补全功能：关键字、构造器、函数库中的函数名和控制台命令

use crate::query::functions;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// GReQL 关键字列表
const GREQL_KEYWORDS: &[&str] = &[
    // 表达式
    "let", "in", "where", "on", "and", "or", "xor", "not", "true", "false", "null",
    // 量词
    "forall", "exists", "exists!",
    // 推导式
    "from", "with", "report", "reportList", "reportSet", "reportMap", "end",
    // 前导
    "import", "using", "store", "as",
    // 构造器
    "list", "set", "tup", "rec", "map", "V", "E",
    // 路径
    "pathSystem", "reachableVertices", "isReachable",
];

/// 控制台命令列表
const CONSOLE_COMMANDS: &[&str] = &[
    ":help", ":h",
    ":quit", ":q",
    ":exit",
    ":mode",
    ":timeout",
    ":env",
    ":stats",
    ":validate",
    ":tee",
    ":notee",
    ":clear",
];

/// `:mode` 的参数
const MODES: &[&str] = &["interpreted", "compiled"];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '!'
}

/// 计算补全：返回替换起点和候选词
pub fn candidates(line: &str, pos: usize) -> (usize, Vec<String>) {
    let line_to_cursor = &line[..pos];

    // 控制台命令
    if line_to_cursor.starts_with(':') {
        if let Some(rest) = line_to_cursor.strip_prefix(":mode ") {
            let start = pos - rest.len();
            let modes = MODES
                .iter()
                .filter(|m| m.starts_with(rest))
                .map(|m| m.to_string())
                .collect();
            return (start, modes);
        }
        let commands = CONSOLE_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line_to_cursor))
            .map(|cmd| cmd.to_string())
            .collect();
        return (0, commands);
    }

    let start = line_to_cursor
        .char_indices()
        .rev()
        .find(|(_, c)| !is_word_char(*c))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let word = &line_to_cursor[start..];
    if word.is_empty() {
        return (pos, Vec::new());
    }

    let mut completions: Vec<String> = GREQL_KEYWORDS
        .iter()
        .copied()
        .chain(functions::names())
        .filter(|kw| kw.starts_with(word))
        .map(|kw| kw.to_string())
        .collect();
    completions.sort();
    completions.dedup();
    (start, completions)
}

/// greql CLI 补全器
#[derive(Default)]
pub struct GreqlCompleter;

impl GreqlCompleter {
    pub fn new() -> Self {
        Self
    }
}

impl Completer for GreqlCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = candidates(line, pos);
        let pairs = words
            .into_iter()
            .map(|w| Pair {
                display: w.clone(),
                replacement: w,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for GreqlCompleter {
    type Hint = String;
}

impl Highlighter for GreqlCompleter {}

impl Validator for GreqlCompleter {}

impl Helper for GreqlCompleter {}
