use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0].to_ascii_lowercase();
    let args = &tokens[1..];
    let one = |f: fn(String) -> Command| match args {
        [name] => Some(f(name.to_string())),
        _ => None,
    };
    let two = |f: fn(String, String) -> Command| match args {
        [a, b] => Some(f(a.to_string(), b.to_string())),
        _ => None,
    };

    match cmd.as_str() {
        "help" => Some(Command::Help),
        "dir" | "ls" => Some(Command::Dir),
        "pwd" => Some(Command::Pwd),
        "cdup" => Some(Command::Cdup),
        "df" => Some(Command::Df),
        "format" => Some(Command::Format),
        "exit" => Some(Command::Exit),
        "mkdir" => one(Command::Mkdir),
        "rmdir" => one(Command::Rmdir),
        "cd" => one(Command::Cd),
        "delete" | "rm" => one(Command::Delete),
        "read" => one(Command::Read),
        "find" => one(Command::Find),
        "stat" => one(Command::Stat),
        "compress" => one(Command::Compress),
        "decompress" => one(Command::Decompress),
        "rename" => two(Command::Rename),
        "copy" => two(Command::Copy),
        // 内容可以包含空格
        "create" if args.len() >= 2 => {
            Some(Command::Create(args[0].to_string(), args[1..].join(" ")))
        }
        _ => None,
    }
}
