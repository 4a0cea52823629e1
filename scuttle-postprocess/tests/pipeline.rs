use std::io::Write;
use std::os::unix::fs::PermissionsExt;

use scuttle_postprocess::PostProcessor;
use tempfile::tempdir;

/// A fake ffmpeg: the loudnorm measure pass (`-f null -`) prints the stats JSON to
/// stderr; every other invocation just copies its input (the argument right after
/// `-i`) to its last argument (the output path), simulating a lossless passthrough.
fn write_fake_ffmpeg(dir: &std::path::Path) -> std::path::PathBuf {
    let script_path = dir.join("fake_ffmpeg.sh");
    let script = r#"#!/bin/bash
set -e
input=""
for i in "$@"; do
    if [ "$prev" = "-i" ]; then
        input="$i"
    fi
    prev="$i"
done
last="${@: -1}"
if [ "$last" = "-" ]; then
    echo '{"input_i":"-25.0","input_tp":"-6.0","input_lra":"3.0","input_thresh":"-35.0","target_offset":"0.5"}' >&2
else
    cp "$input" "$last"
fi
"#;
    let mut f = std::fs::File::create(&script_path).unwrap();
    f.write_all(script.as_bytes()).unwrap();
    let mut perms = f.metadata().unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script_path, perms).unwrap();
    script_path
}

#[tokio::test]
async fn default_pipeline_produces_final_compressed_file() {
    let dir = tempdir().unwrap();
    let ffmpeg = write_fake_ffmpeg(dir.path());
    let input = dir.path().join("song.wav");
    std::fs::write(&input, b"not really audio").unwrap();

    let processor = PostProcessor::new(ffmpeg);
    let result = processor.run_default_pipeline(&input, "opus").await.unwrap();

    assert_eq!(result, dir.path().join("song.opus"));
    assert!(result.exists());
    assert!(!input.exists());
}
