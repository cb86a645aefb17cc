//! Integration tests for RPM packages and the cpio archives they carry.

mod common;

use common::{cpio_archive, rpm_header, rpm_package, Tag};
use structer::formats::cpio::Archive;
use structer::formats::rpm::{enums, Rpm, RpmHeader, TagValue};
use structer::StructerError;

#[test]
fn test_rpm_lead_and_headers() {
    let data = rpm_package("hello", b"\xfd7zXZ\x00payload");
    let rpm = Rpm::parse(&data).unwrap();

    assert_eq!(rpm.lead().text("name").unwrap(), "hello");
    assert!(rpm.lead().symbol("type").unwrap().is("binary"));
    assert_eq!(rpm.nevr().unwrap(), "hello-1.0-3.el9");
    assert_eq!(rpm.payload_format().unwrap(), "cpio");
    assert_eq!(rpm.payload_compressor().unwrap(), "xz");
    assert_eq!(rpm.payload(), b"\xfd7zXZ\x00payload");

    let signature = rpm.signature();
    assert_eq!(signature.get("size").unwrap().as_u64(), Some(13));
    assert_eq!(signature.get("md5").unwrap().as_bytes(), Some(&[0x11u8; 16][..]));
    assert!(!signature.contains("sha256"));
}

#[test]
fn test_rpm_tag_values() {
    let data = rpm_package("hello", b"");
    let rpm = Rpm::parse(&data).unwrap();
    let header = rpm.header();

    assert_eq!(header.entries().len(), 7);
    assert!(header.contains("basenames"));
    assert!(!header.contains("license"));

    let basenames = header.get("basenames").unwrap();
    let names: Vec<&str> = basenames
        .as_strings()
        .unwrap()
        .iter()
        .map(|s| s.as_ref())
        .collect();
    assert_eq!(names, ["app", "libfoo.so"]);

    match header.get("size").unwrap() {
        TagValue::Ints(values) => {
            assert_eq!(values.len(), 1);
            assert_eq!(values.get(0).unwrap().as_u64(), Some(4096));
        }
        other => panic!("unexpected {:?}", other),
    }

    // Values are decoded once and kept.
    let first = header.get("name").unwrap() as *const TagValue;
    let second = header.get("name").unwrap() as *const TagValue;
    assert_eq!(first, second);

    assert!(matches!(
        header.get("license"),
        Err(StructerError::UnknownField { .. })
    ));
    assert!(matches!(
        header.get("no-such-tag"),
        Err(StructerError::UnrecognizedEnumValue { .. })
    ));
}

#[test]
fn test_rpm_bad_magic() {
    let mut data = rpm_package("hello", b"");
    data[0] = 0;
    assert!(matches!(
        Rpm::parse(&data).err(),
        Some(StructerError::SchemaViolation { ref field, .. }) if field == "Lead.magic"
    ));

    let mut data = rpm_package("hello", b"");
    data[96 + 3] = 2;
    match Rpm::parse(&data).err() {
        Some(StructerError::SchemaViolation { field, expected, actual }) => {
            assert_eq!(field, "Header.version");
            assert_eq!(expected, "0x1");
            assert_eq!(actual, "0x2");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        Rpm::parse(&data[..50]).err(),
        Some(StructerError::Truncated { .. })
    ));
}

#[test]
fn test_rpm_header_store_bounds() {
    let mut data = rpm_header(&[(1000, Tag::Str("x"))]);
    // Point the only entry's offset past the end of the store.
    data[24..28].copy_from_slice(&100u32.to_be_bytes());
    let header = RpmHeader::decode_at(&data, 0, enums::header_tag().unwrap()).unwrap();
    assert!(matches!(
        header.get("name"),
        Err(StructerError::Truncated { .. })
    ));
}

#[test]
fn test_cpio_payload_members() {
    let data = cpio_archive(&[
        ("usr", 0o040755, &b""[..]),
        ("usr/bin/app", 0o100755, &b"\x7fELF app"[..]),
        ("usr/lib/libfoo.so", 0o120777, &b"libfoo.so.1"[..]),
    ]);
    let archive = Archive::new(&data);

    let names: Vec<String> = archive
        .members()
        .unwrap()
        .map(|m| m.map(|m| m.name().to_string()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(names, ["usr", "usr/bin/app", "usr/lib/libfoo.so"]);

    let app = archive.find("usr/bin/app").unwrap().unwrap();
    assert!(app.is_file());
    assert_eq!(app.mode() & 0o777, 0o755);
    assert_eq!(app.contents(), b"\x7fELF app");
    assert_eq!(app.mtime().unwrap().timestamp(), 1_600_000_000);

    let link = archive.find("usr/lib/libfoo.so").unwrap().unwrap();
    assert!(link.file_type().unwrap().is("Symlink"));
    assert!(archive.find("etc/passwd").unwrap().is_none());
}

#[test]
fn test_cpio_truncated_member() {
    let data = cpio_archive(&[("big", 0o100644, &[7u8; 64][..])]);
    let cut = &data[..150];
    let results: Vec<_> = Archive::new(cut).members().unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(StructerError::Truncated { .. })));
}
