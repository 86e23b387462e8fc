use blockfs::{
    fs::{NodeInfo, StorageUsage},
    utils::{format_size, format_timestamp},
    BlockDevice, FileSystem, FsError,
};
use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Dir,
    Pwd,
    Mkdir(String),
    Rmdir(String),
    Cd(String),
    Cdup,
    Create(String, String),
    Delete(String),
    Rename(String, String),
    Read(String),
    Copy(String, String),
    Find(String),
    Stat(String),
    Df,
    Compress(String),
    Decompress(String),
    Format,
    Exit,
}

impl Command {
    /// 出错时显示的操作名
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Dir => "dir",
            Command::Pwd => "pwd",
            Command::Mkdir(_) => "mkdir",
            Command::Rmdir(_) => "rmdir",
            Command::Cd(_) => "cd",
            Command::Cdup => "cdup",
            Command::Create(..) => "create",
            Command::Delete(_) => "delete",
            Command::Rename(..) => "rename",
            Command::Read(_) => "read",
            Command::Copy(..) => "copy",
            Command::Find(_) => "find",
            Command::Stat(_) => "stat",
            Command::Df => "df",
            Command::Compress(_) => "compress",
            Command::Decompress(_) => "decompress",
            Command::Format => "format",
            Command::Exit => "exit",
        }
    }
}

pub fn execute_command<D: BlockDevice>(
    cmd: &Command,
    fs: &mut FileSystem<D>,
) -> Result<(), FsError> {
    match cmd {
        Command::Help => print_help(),
        Command::Dir => {
            println!("📂 {}", fs.pwd().cyan());
            for name in fs.list() {
                match fs.stat(&name)? {
                    NodeInfo::Directory { .. } => println!("📁  {}", name.blue().bold()),
                    NodeInfo::File(record) => println!(
                        "📄  {} {}",
                        name,
                        format_size(record.size).bright_black()
                    ),
                }
            }
        }
        Command::Pwd => println!("📍 {}", fs.pwd().cyan()),
        Command::Mkdir(name) => {
            fs.make_dir(name)?;
            println!("✅ Created directory: {}", name.green());
        }
        Command::Rmdir(name) => {
            fs.remove_dir(name)?;
            println!("🗑️ Removed directory: {}", name.red());
        }
        Command::Cd(name) => {
            fs.change_dir(name)?;
            println!("📂 Moved to {}", fs.pwd().blue());
        }
        Command::Cdup => {
            if fs.move_to_parent() {
                println!("📂 Moved to {}", fs.pwd().blue());
            } else {
                println!("{}", "Already in the root directory.".yellow());
            }
        }
        Command::Create(name, content) => {
            fs.create(name, content.as_bytes())?;
            println!(
                "📝 Created file: {} ({})",
                name.green(),
                format_size(content.len() as u64)
            );
        }
        Command::Delete(name) => {
            fs.delete(name)?;
            println!("❌ Deleted file: {}", name.red());
        }
        Command::Rename(old, new) => {
            fs.rename(old, new)?;
            println!("✏️  Renamed {} -> {}", old.cyan(), new.green());
        }
        Command::Read(name) => {
            println!("{}", fs.read_text(name)?);
        }
        Command::Copy(src, dest) => {
            fs.copy(src, dest)?;
            println!("📋 Copied {} -> {}", src.cyan(), dest.green());
        }
        Command::Find(keyword) => {
            let found = fs.find(keyword);
            if found.is_empty() {
                println!("{}", "No matches.".bright_black());
            }
            for path in found {
                println!("🔎 {}", path);
            }
        }
        Command::Stat(name) => match fs.stat(name)? {
            NodeInfo::File(record) => println!(
                "{}\n{}: {}\n{}: File\n{}: {} bytes\n{}: {:?}",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                name,
                "Type".blue(),
                "Size".blue(),
                record.size,
                "Blocks".blue(),
                record.block_chain
            ),
            NodeInfo::Directory { children } => println!(
                "{}\n{}: {}\n{}: Directory\n{}: {}",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                name,
                "Type".blue(),
                "Entries".blue(),
                children
            ),
        },
        Command::Df => print_storage(fs),
        Command::Compress(name) => {
            let report = fs.compress(name)?;
            println!(
                "🗜️  {} -> {} ({} -> {})",
                report.source.cyan(),
                report.target.green(),
                format_size(report.original_size),
                format_size(report.compressed_size)
            );
            if !report.is_smaller() {
                println!("{}", "Compressed file is not smaller than the original.".yellow());
            }
        }
        Command::Decompress(name) => {
            let report = fs.decompress(name)?;
            println!(
                "📦 {} -> {} ({})",
                report.source.cyan(),
                report.restored.green(),
                format_size(report.size)
            );
        }
        Command::Format => {
            let confirmed = Confirm::new()
                .with_prompt("Format the disk? All files will be lost")
                .default(false)
                .interact()
                .unwrap_or(false);
            if !confirmed {
                println!("{}", "Format cancelled.".bright_black());
                return Ok(());
            }

            println!("💾 Formatting virtual disk...");
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
                spinner.set_style(style);
            }
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner.set_message("zeroing blocks");
            let result = fs.format();
            spinner.finish_and_clear();
            result?;
            println!("✅ Disk formatted successfully!");
        }
        Command::Exit => {
            fs.shutdown()?;
            println!("{}", "👋 Exiting BlockFS shell...".yellow().bold());
        }
    }

    Ok(())
}

fn print_storage<D: BlockDevice>(fs: &FileSystem<D>) {
    let StorageUsage {
        free_bytes,
        total_bytes,
    } = fs.check_storage();
    let sb = fs.super_block();
    println!("{}", "💽 Storage".bright_yellow().bold());
    println!("{}: {}", "Volume".blue(), sb.volume_id);
    println!("{}: {}", "Formatted".blue(), format_timestamp(sb.formatted_at));
    println!("{}: {}", "Total".blue(), format_size(total_bytes));
    println!("{}: {}", "Used".blue(), format_size(total_bytes - free_bytes));
    println!("{}: {}", "Free".blue(), format_size(free_bytes).green());
    println!(
        "{}: {} of {}",
        "Free blocks".blue(),
        fs.allocation().free_blocks(),
        fs.allocation().total_blocks()
    );
}

fn print_help() {
    println!("{}", "📘 BlockFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  format                 Format the disk
  create <file> <data>   Create a file with the given text
  delete <file>          Delete a file
  rename <old> <new>     Rename a file or directory
  read <file>            Print a file's content
  dir | ls               List the current directory
  copy <src> <dest>      Copy a file
  find <keyword>         Search all paths by name
  stat <name>            Show file info
  df                     Show storage usage
  mkdir <dir>            Create a directory
  rmdir <dir>            Remove an empty directory
  cd <dir>               Change directory (.. for parent)
  cdup                   Move to the parent directory
  pwd                    Print current path
  compress <file>        Compress a file into <name>.lz4
  decompress <file.lz4>  Restore a compressed file
  help                   Show this help message
  exit                   Save and quit
"
        .bright_black()
    );
}
