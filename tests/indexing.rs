//! Indexer properties over whole documents

use std::io::Cursor;

use xmledit::{Config, ErrorCollector, ErrorKind, Session, StructuralIndexer};

fn single_unit(body_len: usize) -> Vec<u8> {
    let mut doc = b"<root><u>".to_vec();
    doc.extend(std::iter::repeat(b'x').take(body_len));
    doc.extend_from_slice(b"</u></root>");
    doc
}

#[test]
fn test_fragmentation_bound() {
    const THRESHOLD: u64 = 100;
    let indexer = StructuralIndexer::new(&Config::default()).with_max_fragment_size(THRESHOLD);

    // Unit length is 3 + body + 4 bytes
    for (unit_len, expected) in [(50u64, 1usize), (100, 1), (101, 2), (300, 3), (350, 4), (1000, 10)] {
        let doc = single_unit((unit_len - 7) as usize);
        let report = indexer.index(Cursor::new(doc));
        let fragments = report.index.fragments();

        assert_eq!(fragments.len(), expected, "unit of {unit_len} bytes");
        assert!(fragments.iter().all(|f| f.len() <= THRESHOLD));
        assert!(!fragments[0].is_continuation());
        assert!(fragments[1..].iter().all(|f| f.is_continuation()));
        assert!(fragments.windows(2).all(|w| w[0].end == w[1].start));
        assert_eq!(fragments[0].start, 6);
        assert_eq!(fragments[expected - 1].end, 6 + unit_len);
        assert_eq!(report.error_count(), 0);
    }
}

#[test]
fn test_reindex_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.xml");
    let mut text = String::from("<?xml version=\"1.0\"?>\n<catalog>\n");
    for i in 0..500 {
        text.push_str(&format!(
            "  <book id=\"b{i}\"><title>T{i}</title><!-- <not a tag> --><![CDATA[</book>]]></book>\n"
        ));
    }
    text.push_str("</catalog>\n");
    std::fs::write(&path, &text).unwrap();

    let config = Config {
        read_buffer_size: 1024,
        journal: false,
        ..Config::default()
    };
    let session = Session::open(&path, config).unwrap();
    let first = session.index();
    let second = session.reindex().unwrap();

    assert_eq!(first.len(), 500);
    assert_eq!(first.fragments(), second.fragments());
    assert_eq!(first.strings().len(), second.strings().len());
    assert!(session.index_errors().is_empty());
}

#[test]
fn test_collector_dedup_and_limit() {
    let collector = ErrorCollector::with_limit(10);
    for _ in 0..100 {
        collector.add("same", 3, ErrorKind::Syntax);
    }
    assert_eq!(collector.len(), 1);

    let collector = ErrorCollector::with_limit(10);
    for i in 0..60u32 {
        collector.add(format!("error {i}"), i + 1, ErrorKind::Structure);
    }
    assert_eq!(collector.len(), 11);
    assert!(collector.is_limit_reached());
    let errors = collector.errors();
    assert_eq!(errors.last().unwrap().kind, ErrorKind::LimitReached);
}

#[test]
fn test_garbage_does_not_exhaust_collector() {
    let mut doc = b"<root>".to_vec();
    for _ in 0..5000 {
        doc.extend_from_slice(b"<a <b </c>\n");
    }
    let config = Config {
        max_errors: 50,
        ..Config::default()
    };
    let report = StructuralIndexer::new(&config).index(Cursor::new(doc));
    assert!(report.completed);
    assert!(report.limit_reached);
    assert_eq!(report.errors.len(), 51);
}
