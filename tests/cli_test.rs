use std::fs;
use std::process::Command;

fn tweetstats() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tweetstats"))
}

#[test]
fn test_stats_writes_both_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("a.txt"), "a b a\nc\n").unwrap();
    fs::write(input.join("b.txt"), "a a b b c\n").unwrap();

    let result = tweetstats()
        .arg("stats")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .output()
        .expect("failed to run tweetstats");
    assert!(
        result.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let medians = fs::read_to_string(output.join("ft2.txt")).unwrap();
    assert_eq!(medians, "2.00\n1.50\n2.00\n");
    let words = fs::read_to_string(output.join("ft1.txt")).unwrap();
    let rows: Vec<&str> = words.lines().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], format!("a{} 4", " ".repeat(26)));
    assert_eq!(rows[1], format!("b{} 3", " ".repeat(26)));
    assert_eq!(rows[2], format!("c{} 2", " ".repeat(26)));
}

#[test]
fn test_count_cleans_with_stop_words() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tweets.txt");
    let stop = dir.path().join("stop.txt");
    let output = dir.path().join("out");
    fs::write(&input, "The cat, THE hat!\n2015 cats\n").unwrap();
    fs::write(&stop, "the\n").unwrap();

    let result = tweetstats()
        .arg("count")
        .arg(&input)
        .arg("-s")
        .arg(&stop)
        .arg("-u")
        .arg("-o")
        .arg(&output)
        .output()
        .expect("failed to run tweetstats");
    assert!(result.status.success());

    let words = fs::read_to_string(output.join("ft1.txt")).unwrap();
    let names: Vec<&str> = words.lines().filter_map(|row| row.split_whitespace().next()).collect();
    assert_eq!(names, vec!["cat", "cats", "hat"]);
    assert!(!output.join("ft2.txt").exists());
}

#[test]
fn test_median_reads_stdin_when_no_inputs() {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = tweetstats()
        .arg("median")
        .arg("-u")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run tweetstats");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"one two three\n42\nfour five\n")
        .unwrap();
    let result = child.wait_with_output().unwrap();
    assert!(result.status.success());
    assert_eq!(String::from_utf8(result.stdout).unwrap(), "3.00\n1.50\n2.00\n");
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = tweetstats()
        .arg("stats")
        .arg(dir.path().join("missing.txt"))
        .output()
        .expect("failed to run tweetstats");
    assert!(!result.status.success());
}

#[test]
fn test_out_of_domain_count_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("wide.txt");
    let config = dir.path().join("config.json");
    fs::write(&input, "a b c d e\n").unwrap();
    fs::write(&config, r#"{"median": {"kind": "histogram", "min": 0, "max": 2, "step": 1}}"#).unwrap();

    let result = tweetstats()
        .arg("stats")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .arg("-o")
        .arg(dir.path().join("out"))
        .output()
        .expect("failed to run tweetstats");
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("outside the median domain"));
}
