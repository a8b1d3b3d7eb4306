use ecsfs::layout::{DirEntry, SuperBlock};
use ecsfs::{BLOCK_SIZE, FILE_MAX_COUNT};

#[test]
fn volume() {
    assert_eq!(17, SuperBlock::SIZE);
    assert_eq!(32, DirEntry::SIZE);
    assert_eq!(BLOCK_SIZE, FILE_MAX_COUNT * DirEntry::SIZE);
}
