//! デバッガコマンド

use std::fmt;

/// リプレイエンジン内のデバッガ（GDB）に送るコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCommand {
    /// ページングの切り替え
    SetPagination(bool),
    /// 画面の高さ（0で無制限）
    SetHeight(u32),
    /// 記録の先頭からクラッシュ地点まで実行
    Run,
    /// バックトレース表示
    Backtrace,
    /// 現在のフレーム表示
    Frame,
    /// 指定したソース行数だけ逆方向に実行
    ReverseNext(u32),
    /// 次の行へ
    Next,
    /// 次の命令へ
    NextInstruction,
    /// ソース表示
    List,
    /// ローカル変数表示
    InfoLocals,
    /// レジスタ表示
    InfoRegisters,
    /// 現在の関数の逆アセンブル
    Disassemble,
    /// ステップ実行ごとに次の行の逆アセンブルを表示するか
    SetDisassembleNextLine(bool),
    /// テキストの出力
    Echo(String),
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn parse_on_off(s: &str) -> Option<bool> {
    match s {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

/// `echo` の引数用に改行とバックスラッシュをエスケープする
fn escape_echo(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape_echo(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

impl DebuggerCommand {
    /// `echo` コマンドを作成する
    pub fn echo(text: impl Into<String>) -> Self {
        DebuggerCommand::Echo(text.into())
    }

    /// ステップ実行コマンドかどうか
    pub fn is_step(&self) -> bool {
        matches!(self, DebuggerCommand::Next | DebuggerCommand::NextInstruction)
    }

    /// 逆方向実行コマンドかどうか
    pub fn is_reverse(&self) -> bool {
        matches!(self, DebuggerCommand::ReverseNext(_))
    }

    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Some(text) = input.strip_prefix("echo ") {
            return Some(DebuggerCommand::Echo(unescape_echo(text)));
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        match parts.as_slice() {
            ["set", "pagination", flag] => parse_on_off(flag).map(DebuggerCommand::SetPagination),
            ["set", "height", n] => n.parse().ok().map(DebuggerCommand::SetHeight),
            ["set", "disassemble-next-line", flag] => {
                parse_on_off(flag).map(DebuggerCommand::SetDisassembleNextLine)
            }
            ["run"] | ["r"] => Some(DebuggerCommand::Run),
            ["bt"] | ["backtrace"] => Some(DebuggerCommand::Backtrace),
            ["frame"] | ["f"] => Some(DebuggerCommand::Frame),
            ["reverse-next", n] | ["rn", n] => n.parse().ok().map(DebuggerCommand::ReverseNext),
            ["reverse-next"] | ["rn"] => Some(DebuggerCommand::ReverseNext(1)),
            ["next"] | ["n"] => Some(DebuggerCommand::Next),
            ["nexti"] | ["ni"] => Some(DebuggerCommand::NextInstruction),
            ["list"] | ["l"] => Some(DebuggerCommand::List),
            ["info", "locals"] => Some(DebuggerCommand::InfoLocals),
            ["info", "registers"] => Some(DebuggerCommand::InfoRegisters),
            ["disassemble"] => Some(DebuggerCommand::Disassemble),
            _ => None,
        }
    }
}

impl fmt::Display for DebuggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebuggerCommand::SetPagination(flag) => write!(f, "set pagination {}", on_off(*flag)),
            DebuggerCommand::SetHeight(n) => write!(f, "set height {}", n),
            DebuggerCommand::Run => write!(f, "run"),
            DebuggerCommand::Backtrace => write!(f, "bt"),
            DebuggerCommand::Frame => write!(f, "frame"),
            DebuggerCommand::ReverseNext(n) => write!(f, "reverse-next {}", n),
            DebuggerCommand::Next => write!(f, "next"),
            DebuggerCommand::NextInstruction => write!(f, "nexti"),
            DebuggerCommand::List => write!(f, "list"),
            DebuggerCommand::InfoLocals => write!(f, "info locals"),
            DebuggerCommand::InfoRegisters => write!(f, "info registers"),
            DebuggerCommand::Disassemble => write!(f, "disassemble"),
            DebuggerCommand::SetDisassembleNextLine(flag) => {
                write!(f, "set disassemble-next-line {}", on_off(*flag))
            }
            DebuggerCommand::Echo(text) => write!(f, "echo {}", escape_echo(text)),
        }
    }
}
