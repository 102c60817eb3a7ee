//! デバッガ用バッチスクリプトの生成
//!
//! トレース要求から、リプレイエンジンの標準入力に流し込むコマンド列を組み立てます。
//! スクリプトは次の順に構成されます。
//!
//! 1. 非対話実行のための環境設定（ページング無効、高さ無制限）
//! 2. `run` でクラッシュ地点まで実行
//! 3. 通常のクラッシュなら `reverse-next N` で巻き戻し、
//!    サニタイザーのクラッシュならバックトレースと手動操作の案内
//! 4. アセンブリ表示なら `set disassemble-next-line on`
//! 5. 前進トレースの開始マーカーと、N個のステップブロック

use crate::command::DebuggerCommand;
use crate::request::{FaultMode, OutputMode, TraceRequest};

/// 前進トレース開始のマーカー
pub const TRACE_MARKER: &str = "\n=== Execution trace (step forward to crash) ===\n";

/// サニタイザーモードでの手動操作の案内
///
/// サニタイザーのランタイムのフレームとアプリケーションのフレームの境界は
/// 固定の規則では決まらないため、自動では移動しない。
pub const ASAN_NAVIGATION_MARKER: &str =
    "\n=== Navigate up to last app frame before ASAN runtime ===\n";

/// ステップブロックの見出し
pub fn step_marker(index: u32) -> String {
    format!("\n--- Step {} ---\n", index)
}

/// デバッガに送るコマンド列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScript {
    commands: Vec<DebuggerCommand>,
    step_blocks: u32,
}

impl CommandScript {
    /// トレース要求からスクリプトを組み立てる
    pub fn build(request: &TraceRequest) -> Self {
        let steps = request.steps();
        let per_block = 5;
        let mut commands = Vec::with_capacity(8 + steps as usize * per_block);

        commands.push(DebuggerCommand::SetPagination(false));
        commands.push(DebuggerCommand::SetHeight(0));
        commands.push(DebuggerCommand::Run);

        match request.fault() {
            FaultMode::Plain => {
                commands.push(DebuggerCommand::ReverseNext(steps));
            }
            FaultMode::Sanitizer => {
                commands.push(DebuggerCommand::Backtrace);
                commands.push(DebuggerCommand::echo(ASAN_NAVIGATION_MARKER));
                commands.push(DebuggerCommand::Frame);
            }
        }

        if request.output() == OutputMode::Assembly {
            commands.push(DebuggerCommand::SetDisassembleNextLine(true));
        }

        commands.push(DebuggerCommand::echo(TRACE_MARKER));

        for index in 1..=steps {
            commands.push(DebuggerCommand::echo(step_marker(index)));
            commands.push(DebuggerCommand::Frame);
            match request.output() {
                OutputMode::Source => commands.extend([
                    DebuggerCommand::List,
                    DebuggerCommand::InfoLocals,
                    DebuggerCommand::Next,
                ]),
                OutputMode::Assembly => commands.extend([
                    DebuggerCommand::Disassemble,
                    DebuggerCommand::InfoRegisters,
                    DebuggerCommand::NextInstruction,
                ]),
            }
        }

        Self {
            commands,
            step_blocks: steps,
        }
    }

    /// コマンド列を取得する
    pub fn commands(&self) -> &[DebuggerCommand] {
        &self.commands
    }

    /// 前進トレースのステップブロック数
    pub fn step_blocks(&self) -> u32 {
        self.step_blocks
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 改行区切りのバッチスクリプトにする
    pub fn render(&self) -> String {
        self.commands
            .iter()
            .map(|cmd| cmd.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(steps: u32, output: OutputMode, fault: FaultMode) -> TraceRequest {
        TraceRequest::new(steps)
            .unwrap()
            .with_output(output)
            .with_fault(fault)
    }

    fn count(script: &CommandScript, cmd: &DebuggerCommand) -> usize {
        script.commands().iter().filter(|c| *c == cmd).count()
    }

    /// 前進トレース部分（マーカー以降）を返す
    fn trace_section(script: &CommandScript) -> &[DebuggerCommand] {
        let marker = DebuggerCommand::echo(TRACE_MARKER);
        let pos = script
            .commands()
            .iter()
            .position(|c| *c == marker)
            .expect("trace marker missing");
        &script.commands()[pos + 1..]
    }

    #[test]
    fn test_plain_source_three_steps() {
        let script = CommandScript::build(&request(3, OutputMode::Source, FaultMode::Plain));

        let expected = "set pagination off\n\
                        set height 0\n\
                        run\n\
                        reverse-next 3\n\
                        echo \\n=== Execution trace (step forward to crash) ===\\n\n\
                        echo \\n--- Step 1 ---\\n\nframe\nlist\ninfo locals\nnext\n\
                        echo \\n--- Step 2 ---\\n\nframe\nlist\ninfo locals\nnext\n\
                        echo \\n--- Step 3 ---\\n\nframe\nlist\ninfo locals\nnext";
        assert_eq!(script.render(), expected);
        assert_eq!(script.step_blocks(), 3);
    }

    #[test]
    fn test_step_blocks_are_numbered() {
        for output in [OutputMode::Source, OutputMode::Assembly] {
            for fault in [FaultMode::Plain, FaultMode::Sanitizer] {
                for steps in [1, 2, 7, 100] {
                    let script = CommandScript::build(&request(steps, output, fault));
                    let section = trace_section(&script);
                    assert_eq!(section.len(), steps as usize * 5);

                    for (i, block) in section.chunks(5).enumerate() {
                        assert_eq!(block[0], DebuggerCommand::echo(step_marker(i as u32 + 1)));
                        assert_eq!(block[1], DebuggerCommand::Frame);
                        assert!(block[4].is_step());
                    }
                }
            }
        }
    }

    #[test]
    fn test_plain_has_single_reverse_step() {
        let script = CommandScript::build(&request(42, OutputMode::Source, FaultMode::Plain));
        let reverse: Vec<_> = script.commands().iter().filter(|c| c.is_reverse()).collect();
        assert_eq!(reverse, vec![&DebuggerCommand::ReverseNext(42)]);
        assert_eq!(count(&script, &DebuggerCommand::Backtrace), 0);
    }

    #[test]
    fn test_sanitizer_never_reverses() {
        let script = CommandScript::build(&request(10, OutputMode::Assembly, FaultMode::Sanitizer));
        assert!(!script.commands().iter().any(|c| c.is_reverse()));
        assert_eq!(count(&script, &DebuggerCommand::Backtrace), 1);
        assert_eq!(count(&script, &DebuggerCommand::echo(ASAN_NAVIGATION_MARKER)), 1);

        let rendered = script.render();
        assert!(rendered.contains("=== Navigate up to last app frame before ASAN runtime ==="));
        assert!(!rendered.contains("reverse-"));
    }

    #[test]
    fn test_assembly_enables_disassembly_once() {
        let script = CommandScript::build(&request(4, OutputMode::Assembly, FaultMode::Plain));
        let toggle = DebuggerCommand::SetDisassembleNextLine(true);
        assert_eq!(count(&script, &toggle), 1);

        let toggle_pos = script.commands().iter().position(|c| *c == toggle).unwrap();
        let marker_pos = script
            .commands()
            .iter()
            .position(|c| *c == DebuggerCommand::echo(TRACE_MARKER))
            .unwrap();
        assert!(toggle_pos < marker_pos);

        for block in trace_section(&script).chunks(5) {
            assert_eq!(
                &block[2..],
                &[
                    DebuggerCommand::Disassemble,
                    DebuggerCommand::InfoRegisters,
                    DebuggerCommand::NextInstruction,
                ]
            );
        }
        assert_eq!(count(&script, &DebuggerCommand::Next), 0);
    }

    #[test]
    fn test_source_has_no_disassembly_toggle() {
        let script = CommandScript::build(&request(4, OutputMode::Source, FaultMode::Sanitizer));
        assert_eq!(count(&script, &DebuggerCommand::SetDisassembleNextLine(true)), 0);
        for block in trace_section(&script).chunks(5) {
            assert_eq!(
                &block[2..],
                &[DebuggerCommand::List, DebuggerCommand::InfoLocals, DebuggerCommand::Next]
            );
        }
    }

    #[test]
    fn test_rendered_lines_parse_back() {
        let script = CommandScript::build(&request(2, OutputMode::Assembly, FaultMode::Sanitizer));
        let parsed: Vec<_> = script
            .render()
            .lines()
            .map(|line| DebuggerCommand::parse(line).expect("unparseable line"))
            .collect();
        assert_eq!(parsed, script.commands());
    }
}
