pub mod command;
pub mod parse;

use crate::shell::{
    command::{execute_command, Command},
    parse::parse_command,
};
use blockfs::{
    disk::init::{perform_disk_initialization, BootProgress},
    FileDisk, FileSystem, FsConfig,
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::{io::stdout, path::PathBuf, sync::mpsc, thread};

const CONFIG_PATH: &str = "blockfs.toml";

pub fn start_shell() {
    let config = match FsConfig::load(CONFIG_PATH) {
        Ok(c) => c,
        Err(e) => {
            println!("{} {}", "❌ Fatal:".red().bold(), e);
            return;
        }
    };

    let Some(mut fs) = boot(config) else {
        return;
    };

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blockfs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => tracing::warn!(error = %e, "command history unavailable"),
    }

    // 命令补全
    let commands = vec![
        "help", "dir", "ls", "pwd", "mkdir", "rmdir", "cd", "cdup", "create", "delete", "rename",
        "read", "copy", "find", "stat", "df", "compress", "decompress", "format", "exit",
    ]
    .into_iter()
    .map(String::from)
    .collect::<Vec<String>>();
    let completer = reedline::DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let full_prompt = format!(
            "{}:{}",
            format!("{}@{}", username, hostname).green(),
            fs.pwd().blue()
        );
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(full_prompt),
            DefaultPromptSegment::Basic("BlockFS".bright_blue().bold().to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut fs) {
                            println!("{} {}: {}", "❌ Error:".red().bold(), cmd.name(), e);
                        }
                        if matches!(cmd, Command::Exit) {
                            println!("{}", "👋 Bye!".bright_yellow());
                            return;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Invalid command or arguments. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting BlockFS...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    if let Err(e) = fs.shutdown() {
        println!("{} shutdown: {}", "❌ Error:".red().bold(), e);
    }
    println!("{}", "GoodBye!".bright_yellow());
}

/// 后台线程打开磁盘，前台显示进度条
fn boot(config: FsConfig) -> Option<FileSystem<FileDisk>> {
    let mut out = stdout();
    let _ = execute!(out, Clear(ClearType::All), cursor::MoveTo(0, 0));
    println!("{}", "[BlockFS Booting...]".bright_yellow().bold());

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || perform_disk_initialization(config, tx));

    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut outcome = None;
    for msg in rx {
        match msg {
            BootProgress::Step(step) => pb.println(step),
            BootProgress::Progress(p) => pb.set_position(p),
            BootProgress::Finished(result) => outcome = Some(result),
        }
    }
    let _ = worker.join();

    match outcome {
        Some(Ok(fs)) => {
            pb.finish_with_message("✅ Ready!");
            let _ = execute!(
                out,
                SetForegroundColor(Color::Cyan),
                Print(format!("Welcome to BlockFS v{}\n", env!("CARGO_PKG_VERSION"))),
                ResetColor
            );
            Some(fs)
        }
        Some(Err(e)) => {
            pb.abandon_with_message("failed");
            println!("{} {}", "❌ Fatal: could not open disk:".red().bold(), e);
            None
        }
        None => {
            pb.abandon_with_message("failed");
            println!("{}", "❌ Fatal: disk initialization aborted".red().bold());
            None
        }
    }
}
