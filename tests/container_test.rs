use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use diskcat::container::{
    self, classify, ContainerKind, ContainerOptions, NullVfs, PartitionContainer, ReadStrategy,
    VirtualFs,
};
use diskcat::CatalogError;
use tempfile::tempdir;

// ---------- helpers ----------

fn write_file(path: &Path, bytes: &[u8]) {
    File::create(path).unwrap().write_all(bytes).unwrap();
}

/// A partclone header: 16 bytes of NUL-padded magic followed by some payload.
fn partclone_bytes() -> Vec<u8> {
    let mut bytes = b"partclone-image\0".to_vec();
    bytes.extend_from_slice(b"0.3.2\0\0\0\0\0\0\0\0\0\0\0EXTFS");
    bytes
}

fn clonezilla_folder(root: &Path) -> PathBuf {
    let dir = root.join("2024-05-01-10-img");
    fs::create_dir(&dir).unwrap();
    write_file(&dir.join("clonezilla-img"), b"This image was saved by Clonezilla\n");
    write_file(&dir.join("parts"), b"sda1 sda2\n");
    write_file(&dir.join("sda1.ext4-ptcl-img.gz.aa"), b"chunk");
    write_file(&dir.join("sda1.ext4-ptcl-img.gz.ab"), b"chunk");
    write_file(&dir.join("sda2.ntfs-ptcl-img.gz.aa"), b"chunk");
    write_file(&dir.join("sda-pt.sf"), b"label: dos\n");
    dir
}

#[derive(Default)]
struct RecordingVfs {
    attached: Mutex<Vec<(String, PathBuf)>>,
}

impl VirtualFs for RecordingVfs {
    fn attach(&self, container_name: &str, source: &Path) -> diskcat::Result<()> {
        self.attached
            .lock()
            .unwrap()
            .push((container_name.to_string(), source.to_path_buf()));
        Ok(())
    }
}

// ---------- classification ----------

#[test]
fn folder_with_sentinel_is_clonezilla() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    assert_eq!(classify(&dir).unwrap(), ContainerKind::ClonezillaImage);
}

#[test]
fn folder_without_sentinel_fails() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    fs::remove_file(dir.join("clonezilla-img")).unwrap();

    match classify(&dir) {
        Err(CatalogError::Unclassified { path }) => assert_eq!(path, dir),
        other => panic!("expected classification failure, got {other:?}"),
    }
}

#[test]
fn sentinel_must_be_a_file() {
    let root = tempdir().unwrap();
    let dir = root.path().join("img");
    fs::create_dir_all(dir.join("clonezilla-img")).unwrap();
    assert!(classify(&dir).is_err());
}

#[test]
fn partclone_magic_regardless_of_extension() {
    let root = tempdir().unwrap();
    let file = root.path().join("backup.iso");
    write_file(&file, &partclone_bytes());
    assert_eq!(classify(&file).unwrap(), ContainerKind::PartcloneFile);
}

#[test]
fn one_changed_magic_byte_gives_image_file() {
    let root = tempdir().unwrap();
    let file = root.path().join("sda1.ext4-ptcl-img");
    let mut bytes = partclone_bytes();
    bytes[3] = b'T';
    write_file(&file, &bytes);
    assert_eq!(classify(&file).unwrap(), ContainerKind::ImageFile);
}

#[test]
fn short_and_empty_files_are_image_files() {
    let root = tempdir().unwrap();
    let empty = root.path().join("empty.img");
    write_file(&empty, b"");
    let short = root.path().join("short.img");
    write_file(&short, b"partclone");
    assert_eq!(classify(&empty).unwrap(), ContainerKind::ImageFile);
    assert_eq!(classify(&short).unwrap(), ContainerKind::ImageFile);
}

#[test]
fn missing_path_fails() {
    let root = tempdir().unwrap();
    let missing = root.path().join("nothing-here");
    assert!(matches!(classify(&missing), Err(CatalogError::Unclassified { .. })));
}

#[test]
fn classification_is_repeatable() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    let file = root.path().join("p.img");
    write_file(&file, &partclone_bytes());
    for _ in 0..3 {
        assert_eq!(classify(&dir).unwrap(), ContainerKind::ClonezillaImage);
        assert_eq!(classify(&file).unwrap(), ContainerKind::PartcloneFile);
    }
}

// ---------- construction ----------

#[test]
fn clonezilla_container_uses_cache_and_parts_file() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    let cache = root.path().join("cache");
    let mut options = ContainerOptions::new(&cache);
    options.random_seek = true;

    let container = container::open(&dir, &options, &NullVfs).unwrap();
    let PartitionContainer::Clonezilla(image) = &container else {
        panic!("expected a Clonezilla image, got {:?}", container.kind());
    };

    assert_eq!(container.name(), "2024-05-01-10-img");
    assert!(image.cache.cache_dir().is_dir());
    assert!(image.cache.cache_dir().starts_with(&cache));

    let names: Vec<&str> = container.partitions().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["sda1", "sda2"]);

    let sda1 = &container.partitions()[0];
    assert_eq!(sda1.sources.len(), 2);
    assert!(sda1.sources[0].ends_with("sda1.ext4-ptcl-img.gz.aa"));
    assert!(sda1.sources[1].ends_with("sda1.ext4-ptcl-img.gz.ab"));
    assert_eq!(sda1.read_strategy, ReadStrategy::RandomAccess);
    assert_eq!(sda1.cache_file.as_deref(), Some(image.cache.partition_cache_file("sda1").as_path()));
}

#[test]
fn partition_filter_limits_what_is_loaded() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    let mut options = ContainerOptions::new(root.path().join("cache"));
    options.partitions_to_load = vec!["sda2".to_string()];

    let container = container::open(&dir, &options, &NullVfs).unwrap();
    assert_eq!(container.partitions().len(), 1);
    assert_eq!(container.partitions()[0].name, "sda2");
}

#[test]
fn clonezilla_without_parts_file_has_no_partitions() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    fs::remove_file(dir.join("parts")).unwrap();

    let options = ContainerOptions::new(root.path().join("cache"));
    let container = container::open(&dir, &options, &NullVfs).unwrap();
    assert_eq!(container.kind(), ContainerKind::ClonezillaImage);
    assert!(container.partitions().is_empty());
}

#[test]
fn single_file_containers() {
    let root = tempdir().unwrap();
    let partclone = root.path().join("sda3.btrfs-ptcl-img");
    write_file(&partclone, &partclone_bytes());
    let image = root.path().join("disk.img");
    write_file(&image, &[0u8; 512]);

    let cache = root.path().join("cache");
    let options = ContainerOptions::new(&cache);
    let vfs = RecordingVfs::default();

    let pc = container::open(&partclone, &options, &vfs).unwrap();
    assert!(matches!(pc, PartitionContainer::Partclone(_)));
    assert_eq!(pc.partitions()[0].name, "sda3");
    assert_eq!(pc.partitions()[0].sources, vec![partclone.clone()]);
    assert_eq!(pc.partitions()[0].read_strategy, ReadStrategy::Sequential);
    assert_eq!(pc.partitions()[0].cache_file, None);

    let img = container::open(&image, &options, &vfs).unwrap();
    assert!(matches!(img, PartitionContainer::Image(_)));
    assert_eq!(img.name(), "disk.img");

    // Only the plain image file goes through the virtual filesystem, and no cache is created.
    let attached = vfs.attached.lock().unwrap();
    assert_eq!(*attached, vec![("disk.img".to_string(), image.clone())]);
    assert!(!cache.exists());
}

#[test]
fn batch_fails_when_one_path_fails() {
    let root = tempdir().unwrap();
    let good = root.path().join("good.img");
    write_file(&good, b"data");
    let bad = root.path().join("plain-folder");
    fs::create_dir(&bad).unwrap();

    let options = ContainerOptions::new(root.path().join("cache"));
    let err = container::open_all(&[good.clone(), bad.clone()], &options, &NullVfs).unwrap_err();
    match err {
        CatalogError::Unclassified { path } => assert_eq!(path, bad),
        other => panic!("unexpected error {other}"),
    }

    assert!(container::open_all_parallel(&[good, bad], &options, &NullVfs).is_err());
}

#[test]
fn parallel_batch_keeps_input_order() {
    let root = tempdir().unwrap();
    let dir = clonezilla_folder(root.path());
    let mut paths = vec![dir];
    for i in 0..8 {
        let p = root.path().join(format!("disk{i}.img"));
        write_file(&p, b"raw");
        paths.push(p);
    }

    let options = ContainerOptions::new(root.path().join("cache"));
    let sequential = container::open_all(&paths, &options, &NullVfs).unwrap();
    let parallel = container::open_all_parallel(&paths, &options, &NullVfs).unwrap();

    let seq: Vec<_> = sequential.iter().map(|c| c.summary()).collect();
    let par: Vec<_> = parallel.iter().map(|c| c.summary()).collect();
    assert_eq!(seq, par);
    assert_eq!(par[0].kind, ContainerKind::ClonezillaImage);
    assert_eq!(par[8].name, "disk7.img");
}
