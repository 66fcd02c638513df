use std::fs;
use std::path::Path;

#[test]
fn test_all_sample_registries() {
  let samples_dir = Path::new("./tests/samples");
  let expected_dir = Path::new("./tests/expected");

  // Iterate through all .log files in the samples directory
  for entry in fs::read_dir(samples_dir).expect("Could not read samples directory") {
    let entry = entry.expect("Invalid entry in samples directory");
    let path = entry.path();
    if path.extension().and_then(|e| e.to_str()) == Some("log") {
      let file_stem = path.file_stem().and_then(|s| s.to_str()).expect("No file stem");
      let log = fs::File::open(&path).expect("Could not open sample file");

      let expected_file = expected_dir.join(format!("{}.txt", file_stem));
      assert!(
        expected_file.exists(),
        "Expected file {:?} does not exist for sample {:?}",
        expected_file,
        path
      );
      let expected_output = fs::read_to_string(&expected_file).expect("Could not read expected file");

      let registry = runcmd::programs_from_log(log, Path::new("/home/dev"))
        .unwrap_or_else(|err| panic!("Failed to read build log {:?}: {}", file_stem, err));
      let actual_output = registry.listing(false);

      assert_eq!(
        expected_output.trim(),
        actual_output.trim(),
        "Registry mismatch for sample {:?}",
        file_stem
      );
    }
  }
}

#[test]
fn test_filter_arguments_property() {
  let args: Vec<String> = ["--strict", "run", "X", "a", "b", "c"].iter().map(|s| s.to_string()).collect();
  let filtered = runcmd::filter_arguments(&args).unwrap();

  assert_eq!(filtered.host_args, vec!["--strict"]);
  let request = filtered.request.unwrap();
  assert_eq!(request.program, "X");
  assert_eq!(request.args, vec!["a", "b", "c"]);
}

#[cfg(unix)]
mod end_to_end {
  use std::fs;
  use std::os::unix::fs::PermissionsExt;
  use std::path::Path;
  use std::process::{Command, Output};
  use tempfile::TempDir;

  const HOST_SCRIPT: &str = r#"echo "Waf: Entering directory"
printf '{"reason":"program-linked","target":"server","outputs":["%s/out/server"]}\n' "$(pwd -P)"
echo "Waf: Leaving directory"
"#;

  const SERVER_SCRIPT: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/../args.txt"
exit 7
"#;

  fn project(host_script: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("Runcmd.toml"), "tool = \"sh host.sh\"\nrequires = [\"opendht/1.3.0@paulobrizolara/stable\"]\n").unwrap();
    fs::write(root.join("host.sh"), host_script).unwrap();
    fs::create_dir_all(root.join("out")).unwrap();
    let server = root.join("out/server");
    fs::write(&server, SERVER_SCRIPT).unwrap();
    fs::set_permissions(&server, fs::Permissions::from_mode(0o755)).unwrap();
    temp_dir
  }

  fn runcmd(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_runcmd"))
      .args(args)
      .current_dir(cwd)
      .env_remove("RUNCMD_TOOL")
      .env_remove("RUST_LOG")
      .output()
      .expect("Failed to launch runcmd")
  }

  #[test]
  fn test_run_registered_program() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["run", "server", "--port", "8080"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Waf: Entering directory"));
    assert!(stdout.contains("Run: out/server --port 8080"));
    assert_eq!(fs::read_to_string(project.path().join("args.txt")).unwrap(), "--port\n8080\n");
  }

  #[test]
  fn test_run_quotes_spaced_argument() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["run", "server", "--msg", "hello world"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run: out/server --msg 'hello world'"));
    assert_eq!(fs::read_to_string(project.path().join("args.txt")).unwrap(), "--msg\nhello world\n");
  }

  #[test]
  fn test_strict_mode_propagates_exit_code() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["--strict", "run", "server"]);

    assert_eq!(output.status.code(), Some(7));
  }

  #[test]
  fn test_unknown_program_uses_shell_lookup() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["run", "echo", "from", "path"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Run: echo from path"));
    assert!(stdout.contains("\nfrom path\n"));
  }

  #[test]
  fn test_missing_program_name() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["run"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Missing program name"));
  }

  #[test]
  fn test_failed_build_skips_run() {
    let project = project("echo broken >&2\nexit 1\n");
    let output = runcmd(project.path(), &["run", "server"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Build failed with exit code: 1"));
    assert!(!project.path().join("args.txt").exists());
  }

  #[test]
  fn test_run_from_subdirectory() {
    let project = project(HOST_SCRIPT);
    let nested = project.path().join("src");
    fs::create_dir_all(&nested).unwrap();

    let output = runcmd(&nested, &["run", "server", "x"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Run: ../out/server x"));
    assert_eq!(fs::read_to_string(project.path().join("args.txt")).unwrap(), "x\n");
  }

  #[test]
  fn test_relative_output_run_from_subdirectory() {
    let host = r#"printf '{"reason":"program-linked","target":"server","outputs":["out/server"]}\n'
"#;
    let project = project(host);
    let nested = project.path().join("src");
    fs::create_dir_all(&nested).unwrap();

    let output = runcmd(&nested, &["run", "server", "x"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Run: ../out/server x"));
    assert_eq!(fs::read_to_string(project.path().join("args.txt")).unwrap(), "x\n");
  }

  #[test]
  fn test_non_utf8_build_output_is_echoed() {
    let host = format!("printf 'compiling caf\\351\\n'\n{}", HOST_SCRIPT);
    let project = project(&host);

    let output = runcmd(project.path(), &["run", "server"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.starts_with(b"compiling caf\xe9\n"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Run: out/server"));
    assert!(project.path().join("args.txt").exists());
  }

  #[test]
  fn test_build_prefix_is_relative_to_caller() {
    let host = "printf '%s\\n' \"$@\" > \"$(dirname \"$0\")/host-args.txt\"\n";
    let project = project(host);
    let nested = project.path().join("src");
    fs::create_dir_all(&nested).unwrap();

    let output = runcmd(&nested, &["build", "--prefix", "dist"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let host_args = fs::read_to_string(project.path().join("host-args.txt")).unwrap();
    let expected = format!("--prefix={}", nested.join("dist").display());
    assert!(host_args.lines().any(|line| line == expected), "host args: {}", host_args);
  }

  #[test]
  fn test_requires_listing() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["requires"]);

    assert!(output.status.success());
    assert_eq!(
      String::from_utf8_lossy(&output.stdout),
      "requires\n  opendht/1.3.0@paulobrizolara/stable\n"
    );
  }

  #[test]
  fn test_programs_listing() {
    let project = project(HOST_SCRIPT);
    let output = runcmd(project.path(), &["programs"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("server  "));
    assert!(stdout.trim_end().ends_with("/out/server"));
  }
}
