//! The remaining formats, loaded end to end from the curated samples and
//! from compressed files.

use corpus2sql::corpus::formats::{amazon, clusters, json_lines, memes, Format};
use corpus2sql::corpus::pipeline::{ingest, ingest_file, IngestOptions, IngestReport};
use corpus2sql::corpus::schema::ColumnType;
use corpus2sql::corpus::sink::SqliteSink;
use corpus2sql::corpus::source::{Compression, InputSpec};
use corpus2sql::corpus::testing::{render_table, row_count, samples, write_bz2, write_gzip};
use std::fs;

fn load(format: &Format, text: &str) -> (SqliteSink, IngestReport) {
    let mut sink = SqliteSink::in_memory().unwrap();
    let report = ingest(
        format,
        &mut sink,
        format.reader(text.as_bytes()),
        &IngestOptions::default(),
    )
    .unwrap();
    (sink, report)
}

#[test]
fn test_cluster_scenario() {
    let (sink, report) = load(&clusters::format("c", 0), samples::CLUSTER_SCENARIO);

    assert_eq!(report.blocks_read, 1);
    let conn = sink.connection();
    insta::assert_snapshot!(render_table(conn, "c_roots").unwrap(), @"2 | 50 | 'root' | '1'");
    insta::assert_snapshot!(render_table(conn, "c_derivatives").unwrap(), @r"
    1 | 30 | 1 | 'first phrase' | 11
    1 | 20 | 1 | 'second phrase' | 12
    ");
    insta::assert_snapshot!(render_table(conn, "c_phrase_info").unwrap(), @r"
    1 | 11 | 3 | '2008-08-01 00:00:00' | 'B' | 'http://a.example'
    1 | 12 | 1 | '2008-08-02 00:00:00' | 'M' | 'http://b.example'
    ");
}

#[test]
fn test_cluster_header_is_skipped() {
    let text = format!("{}{}", samples::CLUSTER_HEADER, samples::CLUSTER_SCENARIO);
    let (sink, report) = load(&clusters::format("c", 6), &text);

    assert_eq!(report.blocks_read, 1);
    assert_eq!(row_count(sink.connection(), "c_phrase_info").unwrap(), 2);
}

#[test]
fn test_cluster_final_separator_may_be_missing() {
    let text = samples::CLUSTER_SCENARIO.trim_end_matches('\n');
    let (sink, _) = load(&clusters::format("c", 0), text);
    assert_eq!(row_count(sink.connection(), "c_derivatives").unwrap(), 2);
}

#[test]
fn test_memes() {
    let (sink, report) = load(&memes::format("m"), samples::MEMES);

    assert_eq!(report.blocks_loaded, 2);
    let conn = sink.connection();
    insta::assert_snapshot!(render_table(conn, "m_times").unwrap(), @r"
    'http://blog.example/post' | '2008-08-01 00:00:16'
    'http://blog.example/other' | '2008-08-01 00:00:19'
    ");
    insta::assert_snapshot!(render_table(conn, "m_quotes").unwrap(), @r"
    'http://blog.example/post' | 'that's not change you can believe in'
    'http://blog.example/post' | 'lipstick on a pig'
    ");
    insta::assert_snapshot!(render_table(conn, "m_links").unwrap(), @r"
    'http://blog.example/post' | 'http://news.example/a'
    'http://blog.example/other' | 'http://news.example/b'
    'http://blog.example/other' | 'http://news.example/c'
    ");
}

#[test]
fn test_amazon() {
    let (sink, report) = load(&amazon::format(), samples::AMAZON);

    assert_eq!(report.blocks_loaded, 2);
    let conn = sink.connection();
    insta::assert_snapshot!(render_table(conn, "amz_metadata").unwrap(), @r"
    '0000031852' | 'http://ecx.images-amazon.com/images/I/51fAmVkTbyL._SY300_.jpg' | 'Girls Ballet Tutu Zebra Hot Pink' | NULL | 3.17 | NULL
    '0000032069' | NULL | 'Adult Ballet Tutu Cheetah Pink' | NULL | 7.89 | NULL
    ");
    insta::assert_snapshot!(render_table(conn, "amz_also_bought").unwrap(), @r"
    '0000031852' | 'B00JHONN1S'
    '0000031852' | 'B002BZX8Z6'
    ");
    insta::assert_snapshot!(render_table(conn, "amz_bought_together").unwrap(), @"'0000031852' | 'B002BZX8Z6'");
    insta::assert_snapshot!(render_table(conn, "amz_sales_rank").unwrap(), @"'0000031852' | 'Toys & Games' | 211836");
    insta::assert_snapshot!(render_table(conn, "amz_categories").unwrap(), @r"
    '0000031852' | 'Sports & Outdoors'
    '0000031852' | 'Other Sports'
    '0000031852' | 'Dance'
    ");
    assert_eq!(row_count(conn, "amz_also_viewed").unwrap(), 0);
    assert_eq!(row_count(conn, "amz_buy_after_viewing").unwrap(), 0);
}

#[test]
fn test_json_lines_with_guessed_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.json");
    fs::write(&path, samples::JSON_LINES).unwrap();
    let input = InputSpec::new(&path, Compression::None);

    let format = json_lines::prepare(&input, "items", None, 100).unwrap();
    let columns: Vec<(String, ColumnType)> = format.schema.tables[0]
        .columns
        .iter()
        .map(|column| (column.name.clone(), column.ty))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("count".to_string(), ColumnType::Integer),
            ("name".to_string(), ColumnType::Text),
            ("price".to_string(), ColumnType::Real),
        ]
    );

    let mut sink = SqliteSink::in_memory().unwrap();
    ingest_file(&format, &mut sink, &input, &IngestOptions::default()).unwrap();
    insta::assert_snapshot!(render_table(sink.connection(), "items").unwrap(), @r"
    3 | 'widget' | 1250.5
    12 | 'gadget' | 9.99
    NULL | 'doohickey' | NULL
    ");
}

#[test]
fn test_json_lines_headers_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.json");
    let headers_path = dir.path().join("headers.txt");
    fs::write(&path, samples::JSON_LINES).unwrap();
    fs::write(&headers_path, "price\nname\n").unwrap();
    let input = InputSpec::new(&path, Compression::None);

    let headers = json_lines::read_headers(&headers_path).unwrap();
    let format = json_lines::prepare(&input, "priced", Some(headers), 100).unwrap();
    let mut sink = SqliteSink::in_memory().unwrap();
    ingest_file(&format, &mut sink, &input, &IngestOptions::default()).unwrap();
    insta::assert_snapshot!(render_table(sink.connection(), "priced").unwrap(), @r"
    'widget' | 1250.5
    'gadget' | 9.99
    'doohickey' | NULL
    ");
}

#[test]
fn test_compressed_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let gz = dir.path().join("memes.txt.gz");
    let bz = dir.path().join("memes.txt.bz2");
    write_gzip(&gz, samples::MEMES).unwrap();
    write_bz2(&bz, samples::MEMES).unwrap();

    let format = memes::format("m");
    let mut sink = SqliteSink::in_memory().unwrap();
    for input in [
        InputSpec::new(&gz, Compression::Gzip),
        InputSpec::new(&bz, Compression::Bz2),
    ] {
        let report = ingest_file(&format, &mut sink, &input, &IngestOptions::default()).unwrap();
        assert_eq!(report.blocks_loaded, 2, "{}", input.compression);
    }
    assert_eq!(row_count(sink.connection(), "m_links").unwrap(), 6);
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = InputSpec::new(dir.path().join("absent.txt"), Compression::None);
    let mut sink = SqliteSink::in_memory().unwrap();
    let error = ingest_file(&memes::format("m"), &mut sink, &input, &IngestOptions::default())
        .unwrap_err();
    assert!(error.to_string().starts_with("cannot open"));
}
