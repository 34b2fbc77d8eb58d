use std::fs::File;
use std::io::Cursor;

use bytelock_bundle::{
    BundleError, EncryptionPipeline, EntrySink, MemoryBundle, PipelineConfig, SealedBundle,
    ZipBundleReader, ZipBundleWriter,
};
use bytelock_crypto::{CipherError, DecryptionError};

const PASSWORD: &str = "correct-horse";

fn plain_zip() -> Vec<u8> {
    let mut writer = ZipBundleWriter::new(Cursor::new(Vec::new()));
    writer.write_directory("META-INF/").unwrap();
    writer
        .write_file("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n")
        .unwrap();
    writer.write_directory("com/").unwrap();
    writer.write_directory("com/example/").unwrap();
    writer
        .write_file("com/example/Main.class", b"\xCA\xFE\xBA\xBEmain")
        .unwrap();
    writer
        .write_file("com/example/Helper.class", b"\xCA\xFE\xBA\xBEhelper")
        .unwrap();
    writer.write_file("config.yml", b"a: 1").unwrap();
    writer.finish().unwrap().into_inner()
}

fn sealed_zip(config: &PipelineConfig) -> Vec<u8> {
    let pipeline = EncryptionPipeline::new(config.clone()).unwrap();
    let (out, report) = pipeline
        .seal_zip(Cursor::new(plain_zip()), Cursor::new(Vec::new()), PASSWORD)
        .unwrap();
    assert_eq!(report.sealed, 2);
    out.into_inner()
}

fn open(bytes: Vec<u8>, password: &str) -> SealedBundle<ZipBundleReader<Cursor<Vec<u8>>>> {
    let reader = ZipBundleReader::new(Cursor::new(bytes)).unwrap();
    SealedBundle::open(reader, password, &PipelineConfig::default()).unwrap()
}

// ── Zip round trip ───────────────────────────────────────────────

#[test]
fn load_artifact_from_sealed_zip() {
    let mut bundle = open(sealed_zip(&PipelineConfig::default()), PASSWORD);

    assert!(bundle.is_sealed("com.example.Main"));
    assert_eq!(
        bundle.artifact_ids().collect::<Vec<_>>(),
        vec!["com.example.Helper", "com.example.Main"]
    );
    assert_eq!(
        &*bundle.load_artifact("com.example.Main").unwrap(),
        b"\xCA\xFE\xBA\xBEmain"
    );
    assert_eq!(
        &*bundle.load_shadow("com.example.Helper").unwrap(),
        b"\xCA\xFE\xBA\xBEhelper"
    );
}

#[test]
fn loads_are_cached() {
    let mut bundle = open(sealed_zip(&PipelineConfig::default()), PASSWORD);
    bundle.load_artifact("com.example.Main").unwrap();
    bundle.load_artifact("com.example.Main").unwrap();
    assert_eq!(bundle.engine().cache_size(), 1);
}

#[test]
fn sealed_zip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("app.jar");
    let output = dir.path().join("app-sealed.jar");
    std::fs::write(&input, plain_zip()).unwrap();

    let pipeline = EncryptionPipeline::default();
    let (_, report) = pipeline
        .seal_zip(
            File::open(&input).unwrap(),
            File::create(&output).unwrap(),
            PASSWORD,
        )
        .unwrap();
    assert_eq!(report.manifest.total_classes, 2);

    let reader = ZipBundleReader::new(File::open(&output).unwrap()).unwrap();
    let mut bundle = SealedBundle::open(reader, PASSWORD, &PipelineConfig::default()).unwrap();
    assert_eq!(
        &*bundle.load_artifact("com.example.Helper").unwrap(),
        b"\xCA\xFE\xBA\xBEhelper"
    );
}

#[test]
fn decrypt_accepts_bytes_from_interception_layer() {
    let bytes = sealed_zip(&PipelineConfig::default());
    let mut raw = ZipBundleReader::new(Cursor::new(bytes.clone())).unwrap();
    let sealed = bytelock_bundle::EntryLookup::read_entry(&mut raw, "com/example/Main.class")
        .unwrap()
        .unwrap();

    let bundle = open(bytes, PASSWORD);
    assert_eq!(
        &*bundle.decrypt("com.example.Main", &sealed).unwrap(),
        b"\xCA\xFE\xBA\xBEmain"
    );
}

#[test]
fn custom_layout_is_honored() {
    let config = PipelineConfig::from_toml_str(
        r#"
[pipeline]
shadow-prefix = "META-INF/shadow/"
manifest-path = "META-INF/sealed.json"
cache-capacity = 1
"#,
    )
    .unwrap();

    let reader = ZipBundleReader::new(Cursor::new(sealed_zip(&config))).unwrap();
    let mut bundle = SealedBundle::open(reader, PASSWORD, &config).unwrap();
    assert_eq!(
        bundle.manifest().entry("com.example.Main").unwrap().encrypted_path,
        "META-INF/shadow/com/example/Main.class"
    );
    bundle.load_shadow("com.example.Main").unwrap();
    bundle.load_shadow("com.example.Helper").unwrap();
    assert_eq!(bundle.engine().cache_size(), 1);
}

// ── Failures ─────────────────────────────────────────────────────

#[test]
fn wrong_password_fails_on_first_load() {
    let mut bundle = open(sealed_zip(&PipelineConfig::default()), "not-the-password");
    let err = bundle.load_artifact("com.example.Main").unwrap_err();
    assert!(matches!(
        err,
        BundleError::Decryption(DecryptionError::Cipher {
            source: CipherError::Authentication,
            ..
        })
    ));
}

#[test]
fn unknown_artifact_is_reported() {
    let mut bundle = open(sealed_zip(&PipelineConfig::default()), PASSWORD);
    assert!(matches!(
        bundle.load_artifact("com.example.Missing"),
        Err(BundleError::UnknownArtifact(id)) if id == "com.example.Missing"
    ));
    assert!(matches!(
        bundle.decrypt("com.example.Missing", &[0u8; 40]),
        Err(BundleError::UnknownArtifact(_))
    ));
}

#[test]
fn unsealed_bundle_has_no_manifest() {
    let reader = ZipBundleReader::new(Cursor::new(plain_zip())).unwrap();
    let err = SealedBundle::open(reader, PASSWORD, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, BundleError::MissingManifest(_)));
}

#[test]
fn corrupt_manifest_is_rejected() {
    let bundle = MemoryBundle::new()
        .with_file("META-INF/.bytelock/manifest.json", b"{\"version\":\"1.0\"}".to_vec());
    let err = SealedBundle::open(bundle, PASSWORD, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, BundleError::Json(_)));
}

#[test]
fn missing_sealed_entry_is_reported() {
    let mut sealed = MemoryBundle::new();
    EncryptionPipeline::default()
        .run(
            &mut MemoryBundle::new().with_file("A.class", b"a".to_vec()),
            &mut sealed,
            PASSWORD,
        )
        .unwrap();

    // Keep only the manifest.
    let manifest_only: MemoryBundle = sealed
        .entries()
        .iter()
        .filter(|e| e.name.ends_with("manifest.json"))
        .cloned()
        .collect();

    let mut bundle = SealedBundle::open(manifest_only, PASSWORD, &PipelineConfig::default()).unwrap();
    assert!(matches!(
        bundle.load_artifact("A"),
        Err(BundleError::MissingEntry(path)) if path == "A.class"
    ));
}
