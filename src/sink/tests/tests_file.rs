#[cfg(test)]
mod file_tests {
    use crate::record::{BatchKey, Record};
    use crate::sink::file::{decode_line, encode_line, file_belongs_to};
    use crate::sink::tests::helpers::*;
    use crate::sink::{DataSink, FileStore, Predicate, SinkError, SinkFactory, WriteMode};
    use std::fs;
    use tempfile::TempDir;

    const EVENTS: BatchKey = BatchKey::from_static("events");

    #[test]
    fn test_sync_batch_reaches_disk() {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();

        sink.write_batch(&EVENTS, (0..3).map(record).collect(), WriteMode::Sync)
            .unwrap();

        let contents = fs::read_to_string(tmp.path().join("events-0000.tsv")).unwrap();
        assert_eq!(contents, "0\tpayload-0\n1\tpayload-1\n2\tpayload-2\n");
        sink.close().unwrap();
    }

    #[test]
    fn test_async_batch_flushed_on_close() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();

        sink.write_batch(&EVENTS, vec![record(7)], WriteMode::Async)
            .unwrap();
        sink.close().unwrap();

        let contents = fs::read_to_string(tmp.path().join("events-0000.tsv")).unwrap();
        assert_eq!(contents, "7\tpayload-7\n");
    }

    #[test]
    fn test_count_and_read_across_handles() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut a = store.open().unwrap();
        let mut b = store.open().unwrap();

        a.write_batch(&EVENTS, (0..4).map(record).collect(), WriteMode::Sync)
            .unwrap();
        b.write_batch(&EVENTS, (4..10).map(record).collect(), WriteMode::Async)
            .unwrap();
        b.close().unwrap();

        assert_eq!(a.count(&EVENTS).unwrap(), 10);
        let found = a
            .read_one(
                &EVENTS,
                &Predicate::FieldEquals {
                    field: 0,
                    value: "8".into(),
                },
            )
            .unwrap();
        assert_eq!(found, Some(record(8)));
        assert_eq!(a.count(&BatchKey::from("other")).unwrap(), 0);
    }

    #[test]
    fn test_reads_see_own_async_writes() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();

        sink.write_batch(&EVENTS, vec![record(1)], WriteMode::Async)
            .unwrap();
        assert_eq!(sink.count(&EVENTS).unwrap(), 1);
    }

    #[test]
    fn test_destination_prefix_is_exact() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();

        sink.write_batch(&EVENTS, vec![record(1)], WriteMode::Sync)
            .unwrap();
        sink.write_batch(
            &BatchKey::from("events_archive"),
            vec![record(2), record(3)],
            WriteMode::Sync,
        )
        .unwrap();

        assert_eq!(sink.count(&EVENTS).unwrap(), 1);
    }

    #[test]
    fn test_hyphenated_destination_not_counted_as_prefix() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();
        let archive = BatchKey::from("events-archive");

        sink.write_batch(&EVENTS, vec![record(1)], WriteMode::Sync)
            .unwrap();
        sink.write_batch(&archive, vec![record(2), record(3)], WriteMode::Sync)
            .unwrap();

        assert_eq!(sink.count(&EVENTS).unwrap(), 1);
        assert_eq!(sink.count(&archive).unwrap(), 2);
        let miss = sink
            .read_one(
                &EVENTS,
                &Predicate::FieldEquals {
                    field: 0,
                    value: "2".into(),
                },
            )
            .unwrap();
        assert_eq!(miss, None);
    }

    #[test]
    fn test_file_name_matching() {
        let events = BatchKey::from("events");
        let archive = BatchKey::from("events-archive");

        assert!(file_belongs_to("events-0000.tsv", &events));
        assert!(file_belongs_to("events-12345.tsv", &events));
        assert!(file_belongs_to("events-archive-0003.tsv", &archive));

        assert!(!file_belongs_to("events-archive-0000.tsv", &events));
        assert!(!file_belongs_to("events-0000.tsv", &archive));
        assert!(!file_belongs_to("events-.tsv", &events));
        assert!(!file_belongs_to("events-00a0.tsv", &events));
        assert!(!file_belongs_to("events-0000.csv", &events));
        assert!(!file_belongs_to("events-0000tsv", &events));
        assert!(!file_belongs_to("events.tsv", &events));
    }

    #[test]
    fn test_closed_handle_rejects_operations() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(matches!(
            sink.write_batch(&EVENTS, vec![record(0)], WriteMode::Sync),
            Err(SinkError::Closed)
        ));
        assert!(matches!(sink.count(&EVENTS), Err(SinkError::Closed)));
    }

    #[test]
    fn test_open_fails_when_directory_removed() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("store");
        let store = FileStore::open(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(store.open(), Err(SinkError::Unavailable(_))));
    }

    #[test]
    fn test_line_codec_escapes() {
        let rec = Record::from_iter(["a\tb", "line\nbreak", "back\\slash", ""]);
        let line = encode_line(&rec);
        assert_eq!(line, "a\\tb\tline\\nbreak\tback\\\\slash\t\n");
        assert_eq!(decode_line(line.trim_end_matches('\n')), rec);
    }

    #[test]
    fn test_line_codec_carriage_return_and_empty_record() {
        let rec = Record::from_iter(["0", "line\r", "\r\nmid"]);
        let line = encode_line(&rec);
        assert_eq!(line, "0\tline\\r\t\\r\\nmid\n");
        assert_eq!(decode_line(line.trim_end_matches('\n')), rec);

        let empty = Record::new(Vec::new());
        let one_blank = Record::from_iter([""]);
        assert_ne!(encode_line(&empty), encode_line(&one_blank));
        assert_eq!(decode_line(encode_line(&empty).trim_end_matches('\n')), empty);
        assert_eq!(decode_line(encode_line(&one_blank).trim_end_matches('\n')), one_blank);

        let marker_text = Record::from_iter(["\\."]);
        assert_eq!(decode_line(encode_line(&marker_text).trim_end_matches('\n')), marker_text);
    }

    #[test]
    fn test_trailing_carriage_return_survives_disk() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let mut sink = store.open().unwrap();
        let rows = vec![
            Record::from_iter(["0", "line\r"]),
            Record::new(Vec::new()),
            Record::from_iter(["2", "\r"]),
        ];

        sink.write_batch(&EVENTS, rows, WriteMode::Sync).unwrap();

        assert_eq!(sink.count(&EVENTS).unwrap(), 3);
        let found = sink
            .read_one(
                &EVENTS,
                &Predicate::FieldEquals {
                    field: 0,
                    value: "0".into(),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(found.field(1), Some("line\r"));
        let found = sink
            .read_one(
                &EVENTS,
                &Predicate::FieldEquals {
                    field: 0,
                    value: "2".into(),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(found.field(1), Some("\r"));
        sink.close().unwrap();
    }
}
