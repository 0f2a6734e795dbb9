#[cfg(test)]
mod basic_tests {
    use crate::BenchError;
    use crate::read::{ReadBenchmark, ReadConfig};
    use crate::record::{BatchKey, Record};
    use crate::sink::tests::helpers::*;
    use crate::sink::{
        DataSink, MemoryStore, NullStore, Predicate, SinkError, SinkFactory, WriteMode,
    };

    fn seeded_store(n: u64) -> MemoryStore {
        init_tracing();
        let store = MemoryStore::new();
        let mut sink = store.open().unwrap();
        sink.write_batch(
            &BatchKey::from_static("events"),
            (0..n).map(record).collect(),
            WriteMode::Sync,
        )
        .unwrap();
        sink.close().unwrap();
        store
    }

    #[test]
    fn test_every_read_hits_dense_ids() {
        let store = seeded_store(200);
        let bench = ReadBenchmark::new(
            &store,
            ReadConfig {
                operations: 500,
                ..ReadConfig::default()
            },
        )
        .unwrap();

        let report = bench.run().unwrap();

        assert_eq!(report.documents, 200);
        assert_eq!(report.operations, 500);
        assert_eq!(report.hits, 500);
        assert_eq!(report.misses, 0);
        let latency = report.latency.unwrap();
        assert!(latency.min <= latency.p50 && latency.p50 <= latency.max);
        assert!(report.to_string().starts_with("500 reads over 200 documents"));
    }

    #[test]
    fn test_empty_destination_returns_early() {
        let store = NullStore::new();
        let bench = ReadBenchmark::new(&store, ReadConfig::default()).unwrap();

        let report = bench.run().unwrap();

        assert_eq!(report.documents, 0);
        assert_eq!(report.operations, 0);
        assert!(report.latency.is_none());
    }

    #[test]
    fn test_wrong_key_field_misses() {
        let store = seeded_store(50);
        let bench = ReadBenchmark::new(
            &store,
            ReadConfig {
                operations: 20,
                key_field: 7,
                ..ReadConfig::default()
            },
        )
        .unwrap();

        let report = bench.run().unwrap();
        assert_eq!(report.hits, 0);
        assert_eq!(report.misses, 20);
    }

    #[test]
    fn test_handle_closed_once() {
        let store = RecordingStore::new();
        {
            let mut sink = store.open().unwrap();
            sink.write_batch(
                &BatchKey::from_static("events"),
                (0..10).map(record).collect(),
                WriteMode::Sync,
            )
            .unwrap();
        }
        let bench = ReadBenchmark::new(
            &store,
            ReadConfig {
                operations: 5,
                ..ReadConfig::default()
            },
        )
        .unwrap();

        bench.run().unwrap();
        assert_eq!(store.close_calls(), vec![1]);
    }

    #[test]
    fn test_zero_operations_rejected() {
        let store = MemoryStore::new();
        let err = ReadBenchmark::new(
            &store,
            ReadConfig {
                operations: 0,
                ..ReadConfig::default()
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    /// One document; lookups fail after `reads_allowed` calls.
    struct ExhaustingStore {
        reads_allowed: u64,
    }

    struct ExhaustingSink {
        reads_left: u64,
    }

    impl SinkFactory for ExhaustingStore {
        fn open(&self) -> Result<Box<dyn DataSink>, SinkError> {
            Ok(Box::new(ExhaustingSink {
                reads_left: self.reads_allowed,
            }))
        }

        fn name(&self) -> &str {
            "exhausting"
        }
    }

    impl DataSink for ExhaustingSink {
        fn write_batch(
            &mut self,
            _destination: &BatchKey,
            _records: Vec<Record>,
            _mode: WriteMode,
        ) -> Result<(), SinkError> {
            Ok(())
        }

        fn count(&mut self, _destination: &BatchKey) -> Result<u64, SinkError> {
            Ok(1)
        }

        fn read_one(
            &mut self,
            _destination: &BatchKey,
            _predicate: &Predicate,
        ) -> Result<Option<Record>, SinkError> {
            if self.reads_left == 0 {
                return Err(SinkError::Unavailable("read budget spent".into()));
            }
            self.reads_left -= 1;
            Ok(Some(record(0)))
        }

        fn close(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn test_huge_operation_count_starts_reading() {
        init_tracing();
        let store = ExhaustingStore { reads_allowed: 3 };
        let bench = ReadBenchmark::new(
            &store,
            ReadConfig {
                operations: u64::MAX,
                ..ReadConfig::default()
            },
        )
        .unwrap();

        let err = bench.run().err().unwrap();
        assert!(matches!(err, BenchError::Sink(SinkError::Unavailable(_))));
    }
}
