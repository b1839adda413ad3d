use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use tgi_codec::{encode_container, infer_metadata, StringEntry, StringTable};
use tgi_model::ResourceKey;
use tgi_project::{materialize_folder, ProjectConfig, ResolvedConfig};

const BUFF_TYPE: u32 = 0x6017_E896;
const SIMDATA_TYPE: u32 = 0x545A_C67A;
const BUFF_SIMDATA_GROUP: u32 = 0x0017_E8F6;
const STRING_TABLE_TYPE: u32 = 0x2205_57DA;
const INSTANCE: u64 = 0x00AB_CDEF_0123_4567;

fn buff_tuning(name: &str, instance: u64) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<I c=\"Buff\" i=\"buff\" m=\"buffs.buff\" n=\"{name}\" s=\"{instance}\">\n  <T n=\"visible\">True</T>\n</I>"
    )
    .into_bytes()
}

fn simdata(name: &str) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<SimData version=\"0x00000101\" u=\"0x00000000\">\n  <Instances>\n    <I name=\"{name}\" schema=\"Buff\" type=\"Object\">\n    </I>\n  </Instances>\n</SimData>"
    )
    .into_bytes()
}

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    dest: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("source");
        let dest = dir.path().join("project");
        std::fs::create_dir_all(&source).expect("source dir");
        Self {
            _dir: dir,
            source,
            dest,
        }
    }

    fn add(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.source.join(name);
        std::fs::write(&path, bytes).expect("write source");
        path
    }

    fn pattern(&self) -> String {
        format!("{}/**/*", self.source.display())
    }

    fn dest(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.dest.clone(), |path, part| path.join(part))
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

#[tokio::test]
async fn simdata_lands_beside_its_tuning() {
    let fixture = Fixture::new();
    // SimData comes first in the index; tuning is still processed first.
    let package = encode_container(
        &[
            (
                ResourceKey::new(SIMDATA_TYPE, BUFF_SIMDATA_GROUP, INSTANCE),
                simdata("something_else"),
            ),
            (ResourceKey::new(BUFF_TYPE, 0, INSTANCE), buff_tuning("Buff", INSTANCE)),
        ],
        true,
    )
    .expect("package");
    fixture.add("Mod.package", &package);

    let report = materialize_folder(&fixture.pattern(), &fixture.dest, ResolvedConfig::default())
        .await
        .expect("convert");
    assert_eq!(report.written(), 2);
    assert_eq!(report.warnings(), 0);

    let tuning = fixture.dest("Packages/Mod/Buff/Buff.xml");
    let companion = fixture.dest("Packages/Mod/Buff/Buff.SimData.xml");
    assert!(tuning.is_file());
    assert!(companion.is_file());
    assert_eq!(tuning.parent(), companion.parent());
    assert!(read(&companion).contains("name=\"Buff_SimData\""));

    // Key matches what the tuning declares, so no override comment.
    assert!(!read(&tuning).contains("<!--"));
}

#[tokio::test]
async fn unrecognized_loose_names_are_skipped() {
    let fixture = Fixture::new();
    let odd = fixture.add("00B2D882-00000000.binary", b"\x00\x01");
    fixture.add("readme.txt", b"hello");

    let report = materialize_folder(&fixture.pattern(), &fixture.dest, ResolvedConfig::default())
        .await
        .expect("convert");

    let source = report.source(&odd).expect("reported");
    assert!(source.written.is_empty());
    assert!(source.skipped.is_some());
    assert_eq!(report.written(), 0);
}

#[tokio::test]
async fn loose_files_are_classified() {
    let fixture = Fixture::new();
    fixture.add(
        "6017E896-80000000-00ABCDEF01234567.xml",
        &buff_tuning("creator:buff_Loose", INSTANCE),
    );
    let table = StringTable {
        entries: vec![StringEntry {
            key: 0xDEAD_BEEF,
            value: "Loose text".to_string(),
        }],
    }
    .to_bytes()
    .expect("stbl");
    fixture.add("220557DA_80000000_0000000000000001.stbl", &table);
    fixture.add("12345678-00000000-0000000000000001.bin", b"opaque");
    fixture.add("00B2D882-00000000-0000000000000002.dds", b"DDS ");

    let report = materialize_folder(&fixture.pattern(), &fixture.dest, ResolvedConfig::default())
        .await
        .expect("convert");
    assert_eq!(report.written(), 4);

    let tuning = read(&fixture.dest("Loose Files/Buff/buff_Loose.xml"));
    let metadata = infer_metadata(&tuning);
    assert_eq!(metadata.explicit_group, Some(0x8000_0000));
    assert_eq!(metadata.explicit_type, None);
    assert_eq!(metadata.explicit_instance, None);

    let json: serde_json::Value =
        serde_json::from_str(&read(&fixture.dest("Loose Files/StringTable/English.stbl.json")))
            .expect("json");
    assert_eq!(json["entries"][0]["key"], "0xDEADBEEF");
    assert_eq!(json["entries"][0]["value"], "Loose text");

    assert!(fixture
        .dest("Loose Files/Unsupported/12345678/12345678_00000000_0000000000000001.binary")
        .is_file());
    assert!(fixture
        .dest("Loose Files/DdsImage/00B2D882_00000000_0000000000000002.dds")
        .is_file());
}

#[tokio::test]
async fn unreadable_package_does_not_stop_the_run() {
    let fixture = Fixture::new();
    let broken = fixture.add("Broken.package", b"this is not a package");
    fixture.add(
        "6017E896-00000000-00ABCDEF01234567.xml",
        &buff_tuning("buff_Fine", INSTANCE),
    );

    let report = materialize_folder(&fixture.pattern(), &fixture.dest, ResolvedConfig::default())
        .await
        .expect("convert");

    assert!(report.source(&broken).expect("reported").skipped.is_some());
    assert!(fixture.dest("Loose Files/Buff/buff_Fine.xml").is_file());
}

#[tokio::test]
async fn existing_files_are_never_overwritten() {
    let fixture = Fixture::new();
    let package = encode_container(
        &[
            (ResourceKey::new(BUFF_TYPE, 0, INSTANCE), buff_tuning("Buff", INSTANCE)),
            (
                ResourceKey::new(SIMDATA_TYPE, BUFF_SIMDATA_GROUP, INSTANCE),
                simdata("Buff"),
            ),
        ],
        false,
    )
    .expect("package");
    fixture.add("Mod.package", &package);

    let buff_dir = fixture.dest("Packages/Mod/Buff");
    std::fs::create_dir_all(&buff_dir).expect("dest dir");
    std::fs::write(buff_dir.join("Buff.SimData.xml"), "keep me").expect("existing");

    materialize_folder(&fixture.pattern(), &fixture.dest, ResolvedConfig::default())
        .await
        .expect("convert");

    assert_eq!(read(&buff_dir.join("Buff.SimData.xml")), "keep me");
    assert!(buff_dir.join("Buff.xml").is_file());
    let fallback = buff_dir.join("Buff_SimData.SimData.xml");
    assert!(read(&fallback).contains("name=\"Buff_SimData\""));
}

#[tokio::test]
async fn config_renames_top_level_folders() {
    let fixture = Fixture::new();
    fixture.add("12345678-00000000-0000000000000001.bin", b"opaque");

    let config = ProjectConfig {
        loose_files_folder: Some("Loose".to_string()),
        unsupported_folder: Some("Other".to_string()),
        ..ProjectConfig::default()
    }
    .apply_defaults();
    materialize_folder(&fixture.pattern(), &fixture.dest, config)
        .await
        .expect("convert");

    assert!(fixture
        .dest("Loose/Other/12345678/12345678_00000000_0000000000000001.binary")
        .is_file());
}
