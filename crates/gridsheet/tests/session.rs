//! End-to-end tests of the editing session: load, edit, switch, export

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridsheet::prelude::*;
use gridsheet::{
    DefaultCodec, Operation, PreconditionError, XlsbReader, XlsxReader, XlsxWriter, PARSE_TIMEOUT,
};
use pretty_assertions::assert_eq;

/// Payload the test parser refuses to finish until cancelled
const SLOW: &[u8] = b"slow";

fn two_sheets() -> Workbook {
    let mut first = Worksheet::new("Sheet1");
    first.set_value_at(0, 0, "a").unwrap();
    first.set_value_at(0, 1, 1.0).unwrap();
    first.set_value_at(2, 0, true).unwrap();
    let mut second = Worksheet::new("Sheet2");
    second.set_value_at(0, 0, "b").unwrap();
    second.set_value_at(1, 3, 2.5).unwrap();

    let mut wb = Workbook::new();
    wb.add_worksheet(first).unwrap();
    wb.add_worksheet(second).unwrap();
    wb
}

fn xlsx_bytes(workbook: &Workbook) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    XlsxWriter::write(workbook, &mut cursor).unwrap();
    cursor.into_inner()
}

/// Default parsing, except for [`SLOW`], which runs until cancelled
fn slow_session() -> Session {
    let codec = DefaultCodec::new();
    let parser = Arc::new(
        move |bytes: &[u8], cancel: &CancellationFlag| -> Result<Workbook, ParseError> {
            if bytes == SLOW {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(1));
                }
                return Err(ParseError::Cancelled);
            }
            codec.parse(bytes, cancel)
        },
    );
    Session::with_codec(SessionConfig::default(), parser, Arc::new(DefaultCodec::new()))
}

/// A session whose parser blocks until the returned sender fires, then
/// yields one empty sheet named after the payload
fn gated_session() -> (Session, mpsc::Sender<()>) {
    let (open, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let parser = Arc::new(
        move |bytes: &[u8], _: &CancellationFlag| -> Result<Workbook, ParseError> {
            gate.lock()
                .unwrap()
                .recv()
                .map_err(|_| ParseError::Cancelled)?;
            let mut wb = Workbook::new();
            wb.add_worksheet(Worksheet::new(std::str::from_utf8(bytes).unwrap()))
                .unwrap();
            Ok(wb)
        },
    );
    let session =
        Session::with_codec(SessionConfig::default(), parser, Arc::new(DefaultCodec::new()));
    (session, open)
}

fn busy(err: SessionError) -> Option<Operation> {
    match err {
        SessionError::Precondition(PreconditionError::Busy(op)) => Some(op),
        _ => None,
    }
}

#[tokio::test]
async fn edit_survives_switch_and_reaches_every_export() {
    let mut session = Session::new();
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();
    assert_eq!(session.sheet_names(), vec!["Sheet1", "Sheet2"]);
    assert_eq!(session.current_sheet(), Some("Sheet1"));

    session.set_cell(0, 0, "X").unwrap();
    session.select_sheet("Sheet2").unwrap();
    assert_eq!(session.grid().unwrap().cell(0, 0), &CellValue::from("b"));
    session.select_sheet("Sheet1").unwrap();
    assert_eq!(session.grid().unwrap().cell(0, 0), &CellValue::from("X"));

    let xlsx = session.export(ExportFormat::Xlsx).unwrap();
    assert_eq!(xlsx.file_name, "sheet.xlsx");
    let back = XlsxReader::read(Cursor::new(xlsx.bytes)).unwrap();
    assert_eq!(back.sheet_names().collect::<Vec<_>>(), vec!["Sheet1", "Sheet2"]);
    assert_eq!(
        back.worksheet(0).unwrap().value("A1").unwrap(),
        CellValue::from("X")
    );

    let xlsb = session.export(ExportFormat::Xlsb).unwrap();
    assert_eq!(xlsb.file_name, "sheet.xlsb");
    let back = XlsbReader::read(Cursor::new(xlsb.bytes)).unwrap();
    assert_eq!(back.sheet_names().collect::<Vec<_>>(), vec!["Sheet1", "Sheet2"]);
    assert_eq!(back.worksheet(0).unwrap().value_at(0, 0), CellValue::from("X"));
    assert_eq!(back.worksheet(1).unwrap(), two_sheets().worksheet(1).unwrap());
}

#[tokio::test]
async fn switching_away_and_back_preserves_edits() {
    let mut session = Session::new();
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();

    let edits = [(0, 0, CellValue::from("X")), (1, 1, CellValue::Number(7.0)), (2, 0, CellValue::Empty)];
    for (row, col, value) in &edits {
        session.set_cell(*row, *col, value.clone()).unwrap();
    }
    session.select_sheet_index(1).unwrap();
    session.select_sheet_index(0).unwrap();

    let grid = session.grid().unwrap();
    for (row, col, value) in &edits {
        assert_eq!(grid.cell(*row, *col), value);
    }
    let sheet = session.workbook().unwrap().worksheet(0).unwrap();
    assert_eq!(sheet.value_at(1, 1), CellValue::Number(7.0));
    assert_eq!(sheet.value_at(2, 0), CellValue::Empty);
}

#[tokio::test]
async fn export_order_ignores_the_active_sheet() {
    let mut session = Session::with_config(SessionConfig {
        single_sheet_policy: SingleSheetPolicy::Concatenate,
        ..SessionConfig::default()
    });
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();
    session.select_sheet("Sheet2").unwrap();

    let back = XlsxReader::read(Cursor::new(session.export(ExportFormat::Xlsx).unwrap().bytes)).unwrap();
    assert_eq!(back.sheet_names().collect::<Vec<_>>(), vec!["Sheet1", "Sheet2"]);

    let html = String::from_utf8(session.export(ExportFormat::Html).unwrap().bytes).unwrap();
    let first = html.find("<caption>Sheet1</caption>").unwrap();
    let second = html.find("<caption>Sheet2</caption>").unwrap();
    assert!(first < second);

    let csv = String::from_utf8(session.export(ExportFormat::Csv).unwrap().bytes).unwrap();
    assert!(csv.starts_with("a,1\n"));
    assert!(csv.find("\n\nb,,,\n").is_some());
}

#[tokio::test]
async fn single_sheet_formats_follow_the_active_sheet() {
    let mut session = Session::new();
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();
    session.select_sheet("Sheet2").unwrap();
    session.set_cell(0, 0, "edited").unwrap();

    let csv = session.export(ExportFormat::Csv).unwrap();
    assert_eq!(csv.file_name, "sheet.csv");
    assert_eq!(String::from_utf8(csv.bytes).unwrap(), "edited,,,\n,,,2.5\n");
}

#[tokio::test]
async fn out_of_range_edits_are_rejected_and_the_session_keeps_working() {
    let mut session = Session::new();
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();
    session.set_cell(1, 1, "kept").unwrap();

    for (row, col) in [(0, usize::MAX), (0, 20_000), (usize::MAX, 0), (1_048_576, 0)] {
        let err = session.set_cell(row, col, "x").unwrap_err();
        assert!(matches!(err, SessionError::Grid(_)), "{row},{col}: {err}");
        assert_eq!(err.diagnostic().title, "Edit rejected");
    }
    let mut wide = vec![CellValue::Empty; 20_001];
    wide[20_000] = CellValue::from("x");
    assert!(matches!(
        session.edit_grid(vec![wide]),
        Err(SessionError::Grid(_))
    ));

    session.select_sheet("Sheet2").unwrap();
    session.select_sheet("Sheet1").unwrap();
    assert_eq!(session.grid().unwrap().cell(1, 1), &CellValue::from("kept"));

    let back = XlsxReader::read(Cursor::new(session.export(ExportFormat::Xlsx).unwrap().bytes)).unwrap();
    assert_eq!(back.worksheet(0).unwrap().value_at(1, 1), CellValue::from("kept"));
}

#[tokio::test]
async fn second_load_is_rejected_while_busy() {
    let (mut session, open) = gated_session();

    session.submit_file(b"First".to_vec()).unwrap();
    assert_eq!(session.state(), SessionState::Busy);

    let err = session.submit_file(b"Second".to_vec()).unwrap_err();
    assert_eq!(busy(err), Some(Operation::LoadFile));

    open.send(()).unwrap();
    session.finish_load().await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.sheet_names(), vec!["First"]);
}

#[tokio::test]
async fn busy_session_refuses_other_operations() {
    let (mut session, _open) = gated_session();
    session.submit_file(b"First".to_vec()).unwrap();

    assert_eq!(busy(session.select_sheet("First").unwrap_err()), Some(Operation::SelectSheet));
    assert_eq!(busy(session.edit_grid(Vec::new()).unwrap_err()), Some(Operation::EditGrid));
    assert_eq!(busy(session.export(ExportFormat::Csv).unwrap_err()), Some(Operation::Export));

    session.cancel_load().unwrap();
    let err = session.finish_load().await.unwrap_err();
    assert_eq!(err.parse_error(), Some(&ParseError::Cancelled));
    assert_eq!(session.state(), SessionState::Empty);
}

#[tokio::test(start_paused = true)]
async fn timeout_from_empty_returns_to_empty() {
    let mut session = slow_session();
    let started = tokio::time::Instant::now();

    let err = session.load_file(SLOW.to_vec()).await.unwrap_err();

    assert!(started.elapsed() >= PARSE_TIMEOUT);
    assert_eq!(
        err.parse_error(),
        Some(&ParseError::Timeout {
            after: Duration::from_secs(10)
        })
    );
    assert_eq!(session.state(), SessionState::Empty);

    let diag = err.diagnostic();
    assert_eq!(diag.title, "Timeout");
    assert_eq!(diag.message, "Stopped reading after 10 seconds");
    assert_eq!(diag.report.unwrap().body, "Timeout on file of size 4 bytes");
}

#[tokio::test]
async fn timeout_keeps_the_previous_workbook() {
    let mut session = slow_session();
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();
    session.select_sheet("Sheet2").unwrap();
    session.set_cell(0, 0, "unsaved").unwrap();
    let before = session.workbook().unwrap().clone();

    tokio::time::pause();
    let err = session.load_file(SLOW.to_vec()).await.unwrap_err();
    assert!(matches!(err.parse_error(), Some(ParseError::Timeout { .. })));

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.workbook().unwrap(), &before);
    assert_eq!(session.current_sheet(), Some("Sheet2"));
    assert_eq!(session.grid().unwrap().cell(0, 0), &CellValue::from("unsaved"));
}

#[tokio::test]
async fn unreadable_file_keeps_the_previous_workbook() {
    let mut session = Session::new();
    session.load_file(b"x;y\n1;2\n".to_vec()).await.unwrap();
    assert_eq!(session.grid().unwrap().cell(1, 1), &CellValue::Number(2.0));

    let err = session.load_file(vec![0xFF, 0x00, 0xFE]).await.unwrap_err();
    assert!(matches!(err.parse_error(), Some(ParseError::Malformed(_))));
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.sheet_names(), vec!["Sheet1"]);

    let diag = err.diagnostic();
    assert_eq!(diag.title, "This file does not appear to be a valid spreadsheet");
    assert!(diag.message.starts_with("Library Error: "));
}

#[tokio::test]
async fn finish_without_submit_is_refused() {
    let mut session = Session::new();
    let err = session.finish_load().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Precondition(PreconditionError::NoPendingLoad)
    ));
}

#[tokio::test]
async fn artifacts_can_be_saved() {
    let mut session = Session::new();
    session.load_file(xlsx_bytes(&two_sheets())).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    for format in ExportFormat::ALL {
        let artifact = session.export(format).unwrap();
        let path = artifact.save_in(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("sheet.{format}"));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
    }
}

#[test]
fn large_files_get_an_advisory() {
    let session = Session::new();
    assert!(session.size_advisory(1_048_576).is_none());
    let advisory = session.size_advisory(3 * 1_048_576).unwrap();
    assert_eq!(
        advisory.message(),
        "File is 3 MB and reading may be slow.  Should we proceed?"
    );
}
