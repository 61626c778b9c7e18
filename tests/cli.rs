use assert_cmd::cargo::cargo_bin_cmd;
use corpus2sql::corpus::testing::{render_table, row_count, samples, write_bz2, write_gzip};
use predicates::prelude::*;
use rusqlite::Connection;
use std::fs;

#[test]
fn load_gzipped_wiki_via_cli() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("revisions.txt.gz");
    let db = dir.path().join("wiki.db");
    write_gzip(&input, samples::WIKI_SCENARIO).unwrap();

    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.arg("--gzip").arg("wiki").arg(&input).arg(&db).arg("enwiki");
    cmd.assert().success();

    let conn = Connection::open(&db).unwrap();
    assert_eq!(render_table(&conn, "enwiki_category").unwrap(), "20 | 'Foo'");
}

#[test]
fn min_date_via_cli() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("revisions.txt");
    let db = dir.path().join("wiki.db");
    fs::write(&input, samples::WIKI_SCENARIO).unwrap();

    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.arg("wiki")
        .arg(&input)
        .arg(&db)
        .arg("w")
        .arg("--min-date")
        .arg("2020-06-01");
    cmd.assert().success();

    let conn = Connection::open(&db).unwrap();
    assert_eq!(row_count(&conn, "w_revision").unwrap(), 0);
}

#[test]
fn load_bzipped_clusters_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clusters.txt.bz2");
    let db = dir.path().join("clusters.db");
    let config = dir.path().join("corpus2sql.toml");
    write_bz2(&input, samples::CLUSTER_SCENARIO).unwrap();
    fs::write(&config, "[clusters]\nheader_lines = 0\n").unwrap();

    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.arg("--config")
        .arg(&config)
        .arg("--bz2")
        .arg("clusters")
        .arg(&input)
        .arg(&db)
        .arg("mc");
    cmd.assert().success();

    let conn = Connection::open(&db).unwrap();
    assert_eq!(row_count(&conn, "mc_roots").unwrap(), 1);
    assert_eq!(row_count(&conn, "mc_phrase_info").unwrap(), 2);
}

#[test]
fn json_with_headers_via_cli() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("items.json");
    let headers = dir.path().join("headers.txt");
    let db = dir.path().join("items.db");
    fs::write(&input, samples::JSON_LINES).unwrap();
    fs::write(&headers, "name\n").unwrap();

    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.arg("json")
        .arg(&input)
        .arg(&db)
        .arg("items")
        .arg("--headers")
        .arg(&headers);
    cmd.assert().success();

    let conn = Connection::open(&db).unwrap();
    assert_eq!(
        render_table(&conn, "items").unwrap(),
        "'widget'\n'gadget'\n'doohickey'"
    );
}

#[test]
fn corrupt_input_fails_and_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("revisions.txt");
    let db = dir.path().join("wiki.db");
    fs::write(&input, samples::WIKI_CORRUPT_THIRD).unwrap();

    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.arg("wiki").arg(&input).arg(&db).arg("w");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("rolled back").and(predicate::str::contains("REVISON")));

    let conn = Connection::open(&db).unwrap();
    assert_eq!(row_count(&conn, "w_revision").unwrap(), 0);
}

#[test]
fn missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.arg("memes")
        .arg(dir.path().join("absent.txt"))
        .arg(dir.path().join("memes.db"))
        .arg("m");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot open"));
}

#[test]
fn exclusive_compression_flags() {
    let mut cmd = cargo_bin_cmd!("corpus2sql");
    cmd.args(["--gzip", "--bz2", "amazon", "in", "out.db"]);
    cmd.assert().failure();
}
