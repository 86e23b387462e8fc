mod common;

use blockfs::{
    fs::{directory::Entry, executor::Executor, NodeInfo},
    FsError,
};
use common::{assert_invariants, assert_no_leaks, formatted_fs, mem_fs};

#[test]
fn test_round_trip_at_block_boundaries() {
    let mut fs = formatted_fs();
    let bs = fs.config().block_size;

    for len in [0, 1, bs - 1, bs, bs + 1, 3 * bs] {
        let name = format!("f{}", len);
        let content: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        fs.create(&name, &content).unwrap();
        assert_eq!(fs.read(&name).unwrap(), content, "length {}", len);

        match fs.stat(&name).unwrap() {
            NodeInfo::File(record) => {
                assert_eq!(record.size, len as u64);
                assert_eq!(record.block_chain.len(), len.div_ceil(bs));
            }
            other => panic!("expected file, got {:?}", other),
        }
    }
    assert_invariants(&fs);
    assert_no_leaks(&fs);
}

#[test]
fn test_trailing_zero_bytes_survive() {
    let mut fs = formatted_fs();
    fs.create("zeros", b"abc\0\0\0").unwrap();
    assert_eq!(fs.read("zeros").unwrap(), b"abc\0\0\0");
}

#[test]
fn test_end_to_end_tiny_disk() {
    // 4 块 x 8 字节，块 0 是元数据区。
    // 8 字节放不下快照，format() 会返回 MetadataOverflow，
    // 所以这里直接用新建（未格式化）的卷，它本来就是全空的。
    let mut fs = mem_fs(8, 4, 1);

    fs.create("a", &[b'a'; 10]).unwrap();
    match fs.stat("a").unwrap() {
        NodeInfo::File(record) => {
            assert_eq!(record.block_chain, vec![1, 2]);
            assert_eq!(record.size, 10);
        }
        other => panic!("unexpected {:?}", other),
    }

    fs.create("b", &[b'b'; 8]).unwrap();
    assert!(matches!(fs.create("c", &[b'c'; 8]), Err(FsError::DeviceFull)));

    fs.delete("a").unwrap();
    assert_eq!(fs.allocation().free_blocks(), 2);
    fs.create("c", &[b'c'; 8]).unwrap();

    assert_eq!(fs.read("b").unwrap(), vec![b'b'; 8]);
    assert_eq!(fs.read("c").unwrap(), vec![b'c'; 8]);
    assert_invariants(&fs);
    assert_no_leaks(&fs);
}

#[test]
fn test_create_existing_name_fails() {
    let mut fs = formatted_fs();
    fs.create("x", b"1").unwrap();
    fs.make_dir("d").unwrap();
    let free = fs.allocation().free_blocks();

    assert!(matches!(fs.create("x", b"2"), Err(FsError::AlreadyExists(_))));
    assert!(matches!(fs.create("d", b"2"), Err(FsError::AlreadyExists(_))));
    assert_eq!(fs.allocation().free_blocks(), free);
    assert_eq!(fs.read("x").unwrap(), b"1");
}

#[test]
fn test_delete_frees_chain() {
    let mut fs = formatted_fs();
    let before = fs.allocation().free_blocks();
    fs.create("big", &vec![7u8; 2000]).unwrap();
    assert_eq!(fs.allocation().free_blocks(), before - 4);

    fs.delete("big").unwrap();
    assert_eq!(fs.allocation().free_blocks(), before);
    assert!(matches!(fs.read("big"), Err(FsError::NotFound(_))));
    assert!(matches!(fs.delete("big"), Err(FsError::NotFound(_))));
}

#[test]
fn test_delete_directory_is_rejected() {
    let mut fs = formatted_fs();
    fs.make_dir("docs").unwrap();
    assert!(matches!(fs.delete("docs"), Err(FsError::IsADirectory(_))));
    assert!(matches!(fs.read("docs"), Err(FsError::IsADirectory(_))));
}

#[test]
fn test_rename_rekeys_without_touching_record() {
    let mut fs = formatted_fs();
    fs.create("a", &vec![1u8; 700]).unwrap();
    fs.create("other", b"o").unwrap();
    let before = fs.stat("a").unwrap();

    fs.rename("a", "b").unwrap();
    assert!(matches!(fs.stat("a"), Err(FsError::NotFound(_))));
    assert_eq!(fs.stat("b").unwrap(), before);
    assert_eq!(fs.read("b").unwrap(), vec![1u8; 700]);

    assert!(matches!(fs.rename("a", "c"), Err(FsError::NotFound(_))));
    assert!(matches!(
        fs.rename("b", "other"),
        Err(FsError::AlreadyExists(_))
    ));
    assert!(matches!(fs.rename("b", "x/y"), Err(FsError::InvalidName(_))));
}

#[test]
fn test_copy_uses_fresh_blocks() {
    let mut fs = formatted_fs();
    let content: Vec<u8> = (0..1100u32).map(|i| (i * 7) as u8).collect();
    fs.create("src", &content).unwrap();
    fs.copy("src", "dst").unwrap();

    assert_eq!(fs.read("dst").unwrap(), content);
    let (NodeInfo::File(src), NodeInfo::File(dst)) = (fs.stat("src").unwrap(), fs.stat("dst").unwrap())
    else {
        panic!("expected files");
    };
    assert_eq!(src.size, dst.size);
    assert_eq!(src.block_chain.len(), dst.block_chain.len());
    assert!(src.block_chain.iter().all(|b| !dst.block_chain.contains(b)));

    // 删除源文件不影响副本
    fs.delete("src").unwrap();
    assert_eq!(fs.read("dst").unwrap(), content);

    assert!(matches!(fs.copy("ghost", "x"), Err(FsError::NotFound(_))));
    assert!(matches!(fs.copy("dst", "dst"), Err(FsError::AlreadyExists(_))));
    assert_invariants(&fs);
    assert_no_leaks(&fs);
}

#[test]
fn test_storage_accounting_uses_logical_size() {
    let mut fs = formatted_fs();
    let total = 1024 * 512;
    assert_eq!(fs.check_storage().total_bytes, total);
    assert_eq!(fs.check_storage().free_bytes, total);

    fs.create("a", &[1u8; 10]).unwrap();
    assert_eq!(fs.check_storage().free_bytes, total - 10);

    // 子目录中的文件同样计入
    fs.make_dir("sub").unwrap();
    fs.change_dir("sub").unwrap();
    fs.create("b", &[2u8; 513]).unwrap();
    fs.move_to_parent();
    assert_eq!(fs.check_storage().free_bytes, total - 523);
    assert_eq!(fs.check_storage().used_bytes(), 523);

    fs.delete("a").unwrap();
    assert_eq!(fs.check_storage().free_bytes, total - 513);
}

#[test]
fn test_full_disk_keeps_existing_files_readable() {
    // 6 块 x 16 字节，1 块元数据，5 个数据块
    let mut fs = mem_fs(16, 6, 1);
    fs.create("fill", &[9u8; 80]).unwrap();
    assert_eq!(fs.allocation().free_blocks(), 0);

    assert!(matches!(fs.create("x", b"1"), Err(FsError::DeviceFull)));
    assert!(matches!(fs.copy("fill", "copy"), Err(FsError::DeviceFull)));
    assert_eq!(fs.read("fill").unwrap(), vec![9u8; 80]);

    // 空文件不需要块
    fs.create("empty", b"").unwrap();
    assert!(fs.read("empty").unwrap().is_empty());
    assert_invariants(&fs);
}

#[test]
fn test_failed_multi_block_create_leaks_allocated_blocks() {
    let mut fs = mem_fs(8, 4, 1);
    fs.create("a", &[1u8; 16]).unwrap();

    // 需要 2 块，只剩 1 块：第一块分配后失败，不回滚
    assert!(matches!(fs.create("b", &[2u8; 16]), Err(FsError::DeviceFull)));
    assert!(matches!(fs.stat("b"), Err(FsError::NotFound(_))));
    assert_eq!(fs.allocation().free_blocks(), 0);
    assert!(fs.allocation().is_used(3));
    assert_invariants(&fs);
}

#[test]
fn test_files_are_scoped_to_current_directory() {
    let mut fs = formatted_fs();
    fs.create("top", b"t").unwrap();
    fs.make_dir("d").unwrap();
    fs.change_dir("d").unwrap();

    assert!(fs.list().is_empty());
    assert!(matches!(fs.read("top"), Err(FsError::NotFound(_))));
    fs.create("top", b"inner").unwrap();
    assert_eq!(fs.pwd(), "/d");

    fs.change_dir("..").unwrap();
    assert_eq!(fs.read("top").unwrap(), b"t");
    assert_eq!(fs.list(), vec!["top", "d"]);

    match fs.resolve("/d/top").unwrap() {
        Entry::File(record) => assert_eq!(record.size, 5),
        Entry::Directory(_) => panic!("expected file"),
    }
    assert_eq!(fs.find("top"), vec!["/top", "/d/top"]);
}

#[test]
fn test_remove_dir_through_file_system() {
    let mut fs = formatted_fs();
    fs.make_dir("d").unwrap();
    fs.change_dir("d").unwrap();
    fs.create("f", b"x").unwrap();
    fs.move_to_parent();

    assert!(matches!(fs.remove_dir("d"), Err(FsError::NotEmpty(_))));
    fs.change_dir("d").unwrap();
    fs.delete("f").unwrap();
    fs.move_to_parent();
    fs.remove_dir("d").unwrap();
    assert!(fs.list().is_empty());
    assert!(!fs.move_to_parent());
}

#[test]
fn test_read_text_rejects_invalid_utf8() {
    let mut fs = formatted_fs();
    fs.create("bin", &[0xC3, 0x28]).unwrap();
    fs.create("txt", "héllo".as_bytes()).unwrap();

    assert!(matches!(fs.read_text("bin"), Err(FsError::InvalidEncoding(_))));
    assert_eq!(fs.read_text("txt").unwrap(), "héllo");
}

#[derive(Default)]
struct Recorder {
    runs: Vec<(String, String)>,
    fail: bool,
}

impl Executor for Recorder {
    fn execute(&mut self, name: &str, source: &str) -> Result<(), String> {
        if self.fail {
            return Err("boom".into());
        }
        self.runs.push((name.to_string(), source.to_string()));
        Ok(())
    }
}

#[test]
fn test_run_file_hands_content_to_executor() {
    let mut fs = formatted_fs();
    fs.create("script", b"print('hi')").unwrap();
    fs.create("bin", &[0xFF, 0xFE]).unwrap();

    let mut recorder = Recorder::default();
    fs.run_file("script", &mut recorder).unwrap();
    assert_eq!(
        recorder.runs,
        vec![("script".to_string(), "print('hi')".to_string())]
    );

    assert!(matches!(
        fs.run_file("bin", &mut recorder),
        Err(FsError::InvalidEncoding(_))
    ));
    assert!(matches!(
        fs.run_file("ghost", &mut recorder),
        Err(FsError::NotFound(_))
    ));

    let mut failing = Recorder {
        fail: true,
        ..Default::default()
    };
    assert!(matches!(
        fs.run_file("script", &mut failing),
        Err(FsError::Execution(_))
    ));
}
