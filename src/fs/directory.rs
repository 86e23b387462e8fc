use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::fs::error::{FsError, Result};

/// 文件记录：块链 + 精确字节数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub block_chain: Vec<u64>, // 按顺序保存文件内容的块号
    pub size: u64,             // 逻辑大小（字节）
}

impl FileRecord {
    /// 块链长度恰好够用：`(n-1)*bs < size <= n*bs`，空文件没有块
    pub fn is_tight(&self, block_size: usize) -> bool {
        let n = self.block_chain.len() as u64;
        let bs = block_size as u64;
        if n == 0 {
            return self.size == 0;
        }
        self.size <= n * bs && self.size > (n - 1) * bs
    }
}

// 目录项：子目录或文件
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(Directory),
    File(FileRecord),
}

// 一个目录项
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub node: Node,
}

// 目录结构
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirEntry>,
    #[serde(skip)]
    index_map: HashMap<String, usize>, // name -> entries 索引
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 反序列化后递归重建 index_map
    pub fn rebuild_index_map(&mut self) {
        self.index_map.clear();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            self.index_map.insert(entry.name.clone(), i);
            if let Node::Directory(dir) = &mut entry.node {
                dir.rebuild_index_map();
            }
        }
    }

    // 添加目录项
    pub fn add(&mut self, name: &str, node: Node) -> Result<()> {
        if self.index_map.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        self.entries.push(DirEntry {
            name: name.to_string(),
            node,
        });
        self.index_map
            .insert(name.to_string(), self.entries.len() - 1);
        Ok(())
    }

    // 删除目录项
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        let idx = self.index_map.get(name).copied()?;
        let entry = self.entries.remove(idx);
        self.index_map.remove(name);
        // 后面的目录项整体前移一位
        for i in self.index_map.values_mut() {
            if *i > idx {
                *i -= 1;
            }
        }
        Some(entry.node)
    }

    /// 原地改名，位置不变
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self
            .index_map
            .get(old)
            .copied()
            .ok_or_else(|| FsError::NotFound(old.to_string()))?;
        if self.index_map.contains_key(new) {
            return Err(FsError::AlreadyExists(new.to_string()));
        }
        self.entries[idx].name = new.to_string();
        self.index_map.remove(old);
        self.index_map.insert(new.to_string(), idx);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index_map.get(name).map(|&idx| &self.entries[idx].node)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        let idx = self.index_map.get(name).copied()?;
        Some(&mut self.entries[idx].node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_map.contains_key(name)
    }

    /// 按插入顺序列出名字
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 深度优先先序遍历，回调参数为绝对路径和节点
    pub fn walk<'a>(&'a self, prefix: &str, visit: &mut dyn FnMut(&str, &'a Node)) {
        for entry in &self.entries {
            let path = format!("{}/{}", prefix, entry.name);
            visit(&path, &entry.node);
            if let Node::Directory(dir) = &entry.node {
                dir.walk(&path, visit);
            }
        }
    }
}

/// 解析结果：目录或文件的只读引用
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Directory(&'a Directory),
    File(&'a FileRecord),
}

/// 名字校验：非空，不含 `/`，不能是 `.` 或 `..`
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// 目录树 + 当前工作目录游标
#[derive(Debug, Clone, Default)]
pub struct DirectoryTree {
    root: Directory,
    cursor: Vec<String>, // 从根开始的路径分量
    detached: Directory, // 游标失效时返回的空目录
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_root(mut root: Directory) -> Self {
        root.rebuild_index_map();
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// 从根开始逐级解析路径
    pub fn resolve(&self, path: &str) -> Result<Entry<'_>> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let mut dir = &self.root;
        for (i, part) in parts.iter().enumerate() {
            match dir.get(part) {
                Some(Node::Directory(child)) => dir = child,
                Some(Node::File(record)) if i + 1 == parts.len() => {
                    return Ok(Entry::File(record));
                }
                _ => return Err(FsError::NotFound(path.to_string())),
            }
        }
        Ok(Entry::Directory(dir))
    }

    /// 当前目录；游标无法解析时返回空目录而不是报错
    pub fn current(&self) -> &Directory {
        match Self::descend(&self.root, &self.cursor) {
            Some(dir) => dir,
            None => {
                warn!(cwd = %self.pwd(), "working directory no longer resolves");
                &self.detached
            }
        }
    }

    /// 修改操作需要真实的当前目录，游标失效时返回 `NotFound`
    pub fn current_mut(&mut self) -> Result<&mut Directory> {
        let pwd = self.pwd();
        let mut dir = &mut self.root;
        for part in &self.cursor {
            dir = match dir.get_mut(part) {
                Some(Node::Directory(child)) => child,
                _ => return Err(FsError::NotFound(pwd)),
            };
        }
        Ok(dir)
    }

    pub fn make_dir(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.current_mut()?.add(name, Node::Directory(Directory::new()))
    }

    pub fn remove_dir(&mut self, name: &str) -> Result<()> {
        let dir = self.current_mut()?;
        let is_empty = match dir.get(name) {
            Some(Node::Directory(child)) => child.is_empty(),
            _ => return Err(FsError::NotFound(name.to_string())),
        };
        if !is_empty {
            return Err(FsError::NotEmpty(name.to_string()));
        }
        dir.remove(name);
        Ok(())
    }

    pub fn change_dir(&mut self, name: &str) -> Result<()> {
        if name == ".." {
            self.move_to_parent();
            return Ok(());
        }
        match self.current().get(name) {
            Some(Node::Directory(_)) => {}
            Some(Node::File(_)) => return Err(FsError::NotADirectory(name.to_string())),
            None => return Err(FsError::NotFound(name.to_string())),
        }
        self.cursor.push(name.to_string());
        Ok(())
    }

    /// 返回 false 表示已经在根目录
    pub fn move_to_parent(&mut self) -> bool {
        self.cursor.pop().is_some()
    }

    pub fn list_children(&self) -> Vec<String> {
        self.current().names()
    }

    /// 名字包含关键字的所有节点的绝对路径，先序
    pub fn find(&self, keyword: &str) -> Vec<String> {
        let mut found = Vec::new();
        self.root.walk("", &mut |path, _| {
            let name = path.rsplit('/').next().unwrap_or(path);
            if name.contains(keyword) {
                found.push(path.to_string());
            }
        });
        found
    }

    /// 整棵树中所有文件记录
    pub fn files(&self) -> Vec<(String, &FileRecord)> {
        let mut files = Vec::new();
        self.root.walk("", &mut |path, node| {
            if let Node::File(record) = node {
                files.push((path.to_string(), record));
            }
        });
        files
    }

    pub fn pwd(&self) -> String {
        format!("/{}", self.cursor.join("/"))
    }

    pub fn reset_cursor(&mut self) {
        self.cursor.clear();
    }

    fn descend<'a>(root: &'a Directory, path: &[String]) -> Option<&'a Directory> {
        let mut dir = root;
        for part in path {
            match dir.get(part) {
                Some(Node::Directory(child)) => dir = child,
                _ => return None,
            }
        }
        Some(dir)
    }
}
