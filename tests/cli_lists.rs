use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn lists_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("c3d-lists"))
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read list")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn generate_help_includes_sampling_flags() {
    let output = lists_cmd()
        .arg("generate")
        .arg("--help")
        .output()
        .expect("generate --help runs");

    assert!(output.status.success());
    let text = combined_output(&output);
    for flag in [
        "--stride",
        "--window-length",
        "--frame-count",
        "--trailing",
        "--pad-width",
        "--input-prefix",
        "--output-prefix",
        "--progress",
    ] {
        assert!(text.contains(flag), "help text missing {flag}: {text}");
    }
}

#[test]
fn generate_writes_dense_windows_in_manifest_order() {
    let tmp = TempDir::new().expect("tempdir");
    let manifest = tmp.path().join("videos.txt");
    let input_list = tmp.path().join("input.lst");
    let output_list = tmp.path().join("output.lst");
    fs::write(&manifest, "frames/v_a 50\nframes/tiny 10\nframes/v_b 16\n").expect("manifest");

    let output = lists_cmd()
        .arg("generate")
        .arg(&manifest)
        .arg("--input-list")
        .arg(&input_list)
        .arg("--output-list")
        .arg(&output_list)
        .args(["--stride", "8", "--window-length", "16", "--progress", "plain"])
        .output()
        .expect("generate runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    assert_eq!(
        read_lines(&input_list),
        vec![
            "frames/v_a 0",
            "frames/v_a 8",
            "frames/v_a 16",
            "frames/v_a 24",
            "frames/v_a 32",
            "frames/v_b 0",
        ]
    );
    assert_eq!(
        read_lines(&output_list),
        vec![
            "frames/v_a/000000",
            "frames/v_a/000001",
            "frames/v_a/000002",
            "frames/v_a/000003",
            "frames/v_a/000004",
            "frames/v_b/000000",
        ]
    );

    let text = combined_output(&output);
    assert!(text.contains("Generate summary:"), "missing summary: {text}");
    assert!(text.contains("windows=6"), "wrong window count: {text}");
    assert!(text.contains("skipped=1"), "short video not reported: {text}");
}

#[test]
fn generate_applies_prefixes_label_and_partial_tail() {
    let tmp = TempDir::new().expect("tempdir");
    let manifest = tmp.path().join("videos.txt");
    let input_list = tmp.path().join("lists/input.lst");
    let output_list = tmp.path().join("lists/output.lst");
    fs::write(&manifest, "v 40\n").expect("manifest");

    let output = lists_cmd()
        .arg("generate")
        .arg(&manifest)
        .arg("--input-list")
        .arg(&input_list)
        .arg("--output-list")
        .arg(&output_list)
        .args([
            "--trailing",
            "partial",
            "--first-frame",
            "1",
            "--label",
            "0",
            "--pad-width",
            "4",
            "--input-prefix",
            "/data/frames/",
            "--output-prefix",
            "/data/c3d/",
            "--progress",
            "quiet",
        ])
        .output()
        .expect("generate runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    assert_eq!(
        read_lines(&input_list),
        vec!["/data/frames/v 1 0", "/data/frames/v 17 0", "/data/frames/v 33 0"]
    );
    assert_eq!(
        read_lines(&output_list),
        vec!["/data/c3d/v/0000", "/data/c3d/v/0001", "/data/c3d/v/0002"]
    );
}

#[test]
fn frame_count_override_takes_whole_lines_as_paths() {
    let tmp = TempDir::new().expect("tempdir");
    let manifest = tmp.path().join("videos.txt");
    let input_list = tmp.path().join("input.lst");
    let output_list = tmp.path().join("output.lst");
    fs::write(&manifest, "a\nseason 2\n").expect("manifest");

    let output = lists_cmd()
        .arg("generate")
        .arg(&manifest)
        .arg("--input-list")
        .arg(&input_list)
        .arg("--output-list")
        .arg(&output_list)
        .args(["--frame-count", "32", "--progress", "quiet"])
        .output()
        .expect("generate runs");
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        read_lines(&input_list),
        vec!["a 0", "a 16", "season 2 0", "season 2 16"]
    );
}

#[test]
fn annotations_label_windows_by_overlap_and_drop_unannotated_videos() {
    let tmp = TempDir::new().expect("tempdir");
    let manifest = tmp.path().join("videos.txt");
    let annotations = tmp.path().join("segments.txt");
    let input_list = tmp.path().join("input.lst");
    let output_list = tmp.path().join("output.lst");
    fs::write(&manifest, "a 48\nunlabelled 32\nb 16\n").expect("manifest");
    fs::write(&annotations, "a 10 30 7\nb 0 7 3\n").expect("annotations");

    let output = lists_cmd()
        .arg("generate")
        .arg(&manifest)
        .arg("--input-list")
        .arg(&input_list)
        .arg("--output-list")
        .arg(&output_list)
        .arg("--annotations")
        .arg(&annotations)
        .args(["--progress", "plain"])
        .output()
        .expect("generate runs");
    assert!(output.status.success(), "{}", combined_output(&output));

    assert_eq!(
        read_lines(&input_list),
        vec!["a 0 201", "a 16 7", "a 32 201", "b 0 3"]
    );
    assert_eq!(
        read_lines(&output_list),
        vec!["a/000000", "a/000001", "a/000002", "b/000000"]
    );
    let text = combined_output(&output);
    assert!(text.contains("unannotated=1"), "dropped video not reported: {text}");

    let output = lists_cmd()
        .arg("generate")
        .arg(&manifest)
        .arg("--input-list")
        .arg(&input_list)
        .arg("--output-list")
        .arg(&output_list)
        .arg("--annotations")
        .arg(&annotations)
        .args(["--keep-unannotated", "--background-label", "0", "--progress", "quiet"])
        .output()
        .expect("generate runs");
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        read_lines(&input_list),
        vec!["a 0 0", "a 16 7", "a 32 0", "unlabelled 0 0", "unlabelled 16 0", "b 0 3"]
    );
}

#[test]
fn annotations_and_constant_label_conflict() {
    let tmp = TempDir::new().expect("tempdir");
    let output = lists_cmd()
        .arg("generate")
        .arg(tmp.path().join("videos.txt"))
        .arg("--input-list")
        .arg(tmp.path().join("in.lst"))
        .arg("--output-list")
        .arg(tmp.path().join("out.lst"))
        .arg("--annotations")
        .arg(tmp.path().join("segments.txt"))
        .args(["--label", "0"])
        .output()
        .expect("generate runs");
    assert!(!output.status.success());
    assert!(!tmp.path().join("in.lst").exists());
}

#[test]
fn non_positive_stride_fails_before_any_io() {
    let tmp = TempDir::new().expect("tempdir");
    let input_list = tmp.path().join("input.lst");
    let output_list = tmp.path().join("output.lst");

    for stride in ["--stride=0", "--stride=-4"] {
        let output = lists_cmd()
            .arg("generate")
            .arg(tmp.path().join("no-such-manifest.txt"))
            .arg("--input-list")
            .arg(&input_list)
            .arg("--output-list")
            .arg(&output_list)
            .arg(stride)
            .output()
            .expect("generate runs");

        assert!(!output.status.success());
        let text = combined_output(&output);
        assert!(
            text.contains("invalid configuration"),
            "expected configuration error for {stride}: {text}"
        );
        assert!(!input_list.exists());
        assert!(!output_list.exists());
    }
}

#[test]
fn malformed_manifest_is_fatal() {
    let tmp = TempDir::new().expect("tempdir");
    let manifest = tmp.path().join("videos.txt");
    fs::write(&manifest, "ok 32\nbroken many\n").expect("manifest");

    let output = lists_cmd()
        .arg("generate")
        .arg(&manifest)
        .arg("--input-list")
        .arg(tmp.path().join("in.lst"))
        .arg("--output-list")
        .arg(tmp.path().join("out.lst"))
        .output()
        .expect("generate runs");

    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("manifest line 2"), "missing line number: {text}");
}

#[test]
fn prefix_twice_doubles_the_prefix() {
    let tmp = TempDir::new().expect("tempdir");
    let input_list = tmp.path().join("input.lst");
    let output_list = tmp.path().join("output.lst");
    fs::write(&input_list, "v 0\nv 16\n").expect("input list");
    fs::write(&output_list, "v/000000\nv/000001\n").expect("output list");

    for _ in 0..2 {
        let output = lists_cmd()
            .arg("prefix")
            .arg(&input_list)
            .arg(&output_list)
            .args(["--prefix-in", "in/", "--prefix-out", "out/"])
            .output()
            .expect("prefix runs");
        assert!(output.status.success(), "{}", combined_output(&output));
    }

    assert_eq!(read_lines(&input_list), vec!["in/in/v 0", "in/in/v 16"]);
    assert_eq!(
        read_lines(&output_list),
        vec!["out/out/v/000000", "out/out/v/000001"]
    );
}

#[test]
fn check_reports_missing_blobs_with_failure_exit() {
    let tmp = TempDir::new().expect("tempdir");
    let video = tmp.path().join("v");
    fs::create_dir_all(&video).expect("video dir");
    fs::write(video.join("000000.fc6-1"), b"blob").expect("blob");

    let list = tmp.path().join("output.lst");
    fs::write(
        &list,
        format!(
            "{}\n{}\n",
            video.join("000000").display(),
            video.join("000001").display()
        ),
    )
    .expect("list");

    let output = lists_cmd()
        .arg("check")
        .arg(&list)
        .args(["--outputs", "--feature", "fc6-1", "--no-stop"])
        .output()
        .expect("check runs");

    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("000001.fc6-1"), "missing path not printed: {text}");
    assert!(text.contains("missing=1"), "missing count absent: {text}");

    fs::write(video.join("000001.fc6-1"), b"blob").expect("blob");
    let output = lists_cmd()
        .arg("check")
        .arg(&list)
        .args(["--outputs", "--feature", "fc6-1"])
        .output()
        .expect("check runs");
    assert!(output.status.success(), "{}", combined_output(&output));
}

#[test]
fn check_inputs_verifies_frames_by_default() {
    let tmp = TempDir::new().expect("tempdir");
    let video = tmp.path().join("my videos").join("clip one");
    fs::create_dir_all(&video).expect("video dir");
    for frame in 0..3 {
        fs::write(video.join(format!("{:06}.png", frame)), b"").expect("frame");
    }
    let list = tmp.path().join("input.lst");
    fs::write(&list, format!("{} 0 5\n", video.display())).expect("list");

    let output = lists_cmd()
        .arg("check")
        .arg(&list)
        .args(["--labelled", "--window-length", "4"])
        .output()
        .expect("check runs");
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("000003.png"), "missing frame not printed: {text}");
    assert!(text.contains("lines_checked=1"), "{text}");

    let output = lists_cmd()
        .arg("check")
        .arg(&list)
        .args(["--labelled", "--window-length", "4", "--skip-frames"])
        .output()
        .expect("check runs");
    assert!(output.status.success(), "{}", combined_output(&output));
}
