use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

/// Runs one line through the shell inside `dir`.
fn run_in(dir: &Path, line: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tinysh"))
        .arg("-c")
        .arg(line)
        .current_dir(dir)
        .output()
        .expect("failed to start the shell")
}

/// Feeds `input` to an interactive session with an empty prompt.
fn run_lines(dir: &Path, input: &str, envs: &[(&str, &Path)]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tinysh"))
        .args(["--prompt", "", "--no-completion"])
        .current_dir(dir)
        .envs(envs.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start the shell");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn echo_preserves_quoted_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), r#"echo "a  b" c"#);
    assert_eq!(stdout(&output), "a  b c\n");
    assert!(output.status.success());
}

#[test]
fn redirected_echo_writes_the_file_and_restores_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "echo one two three > out.txt & echo after");
    let written = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(written, "one two three\n");
    assert_eq!(stdout(&output), "after\n");

    let output = run_in(dir.path(), "echo one two three > out.txt");
    assert_eq!(stdout(&output), "");
    let output = run_in(dir.path(), "echo again >> out.txt");
    assert_eq!(stdout(&output), "");
    let written = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(written, "one two three\nagain\n");
}

#[test]
fn foreground_builtin_redirection_is_undone_for_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_lines(dir.path(), "pwd>where.txt\necho visible\n", &[]);
    assert_eq!(stdout(&output), "visible\n");
    assert!(output.status.success());

    let cwd = fs::canonicalize(dir.path()).unwrap();
    let written = fs::read_to_string(dir.path().join("where.txt")).unwrap();
    assert_eq!(written, format!("{}\n", cwd.display()));
}

#[test]
fn session_ends_at_end_of_input_or_exit() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_lines(dir.path(), "echo one\n\n   \necho two\n", &[]);
    assert_eq!(stdout(&output), "one\ntwo\n");
    assert_eq!(output.status.code(), Some(0));

    let output = run_lines(dir.path(), "exit 7\necho never\n", &[]);
    assert_eq!(stdout(&output), "");
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn external_commands_honor_redirections() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.txt"), "from a file\n").unwrap();
    let output = run_in(dir.path(), "cat < in.txt > copy.txt");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        fs::read_to_string(dir.path().join("copy.txt")).unwrap(),
        "from a file\n"
    );
}

#[test]
fn missing_input_file_abandons_only_that_command() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "cat < absent.txt & echo still here");
    assert_eq!(stdout(&output), "still here\n");
    assert!(stderr(&output).contains("absent.txt"));

    let output = run_in(dir.path(), "echo hidden < absent.txt");
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("absent.txt"));
}

#[test]
fn type_reports_builtins_paths_and_misses() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "type cd nonexistent_binary_xyz sh");
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "cd is a shell builtin");
    assert_eq!(lines[1], "nonexistent_binary_xyz: not found");
    assert!(lines[2].starts_with("sh is /"), "{}", lines[2]);
    assert!(lines[2].ends_with("/sh"), "{}", lines[2]);
}

#[test]
fn unknown_commands_do_not_stop_the_line() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "nonexistent_binary_xyz & echo next");
    assert_eq!(stdout(&output), "next\n");
    assert!(stderr(&output).contains("nonexistent_binary_xyz: command not found"));
    assert!(output.status.success());
}

#[test]
fn argument_count_errors_skip_the_command() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "pwd extra & echo ok");
    assert_eq!(stdout(&output), "ok\n");
    assert!(stderr(&output).contains("pwd: too many arguments"));

    let output = run_in(dir.path(), "exit 1 2");
    assert!(output.status.success());
    assert!(stderr(&output).contains("exit: too many arguments"));
}

#[test]
fn unterminated_quote_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), r#"echo first & echo "second"#);
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("unterminated quote"));
    assert!(output.status.success());
}

#[test]
fn missing_redirect_target_is_reported_but_command_runs() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "echo hi >");
    assert_eq!(stdout(&output), "hi\n");
    assert!(stderr(&output).contains("expected filename after '>'"));
}

#[test]
fn background_work_is_reaped_before_the_line_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let started = Instant::now();
    let output = run_in(dir.path(), "sleep 1 & pwd");
    let elapsed = started.elapsed();

    let cwd = fs::canonicalize(dir.path()).unwrap();
    assert_eq!(stdout(&output).trim_end(), cwd.display().to_string());
    assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
}

#[test]
fn background_output_lands_before_the_shell_exits() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "echo bg > bg.txt & sleep 0.2 & echo fg");
    assert_eq!(stdout(&output), "fg\n");
    assert_eq!(fs::read_to_string(dir.path().join("bg.txt")).unwrap(), "bg\n");
}

#[test]
fn exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_in(dir.path(), "exit").status.code(), Some(0));
    assert_eq!(run_in(dir.path(), "exit 3").status.code(), Some(3));

    let output = run_in(dir.path(), "exit abc");
    assert_ne!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("numeric argument required"));
}

#[test]
fn backgrounded_exit_only_ends_its_child() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "echo before & exit 4 & echo after");
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("before\n"), "{text}");
    assert!(text.contains("after\n"), "{text}");
}

#[test]
fn exit_waits_for_background_work_first() {
    let dir = tempfile::tempdir().unwrap();
    let started = Instant::now();
    let output = run_in(dir.path(), "sleep 1 & exit 4");
    let elapsed = started.elapsed();

    assert_eq!(output.status.code(), Some(4));
    assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
}

#[test]
fn fatal_exit_waits_for_background_work_first() {
    let dir = tempfile::tempdir().unwrap();
    let started = Instant::now();
    let output = run_in(dir.path(), "sleep 1 & exit abc");
    let elapsed = started.elapsed();

    assert_ne!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("numeric argument required"));
    assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let output = run_in(dir.path(), "cd sub & pwd");
    // A backgrounded `cd` only moves its own child.
    let cwd = fs::canonicalize(dir.path()).unwrap();
    assert_eq!(stdout(&output).trim_end(), cwd.display().to_string());

    let output = run_in(dir.path(), "cd missing_dir");
    assert!(stderr(&output).contains("cd: missing_dir"));
    assert!(output.status.success());
}

#[test]
fn cd_defaults_to_home_and_expands_tilde() {
    let dir = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    fs::create_dir(home.path().join("projects")).unwrap();
    let home_cwd = fs::canonicalize(home.path()).unwrap();

    let output = run_lines(dir.path(), "cd\npwd\ncd ~/projects\npwd\n", &[("HOME", home.path())]);
    assert_eq!(stderr(&output), "");
    assert_eq!(
        stdout(&output),
        format!("{}\n{}\n", home_cwd.display(), home_cwd.join("projects").display())
    );
}

#[test]
fn scripts_resolve_through_path_and_by_slash() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    let tool = bin.join("greet");
    fs::write(&tool, "#!/bin/sh\necho \"hello $1\"\n").unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    let path = format!("{}:/usr/bin:/bin", bin.display());
    let output = Command::new(env!("CARGO_BIN_EXE_tinysh"))
        .arg("-c")
        .arg("greet world & type greet")
        .current_dir(dir.path())
        .env("PATH", &path)
        .output()
        .unwrap();
    let text = stdout(&output);
    assert!(text.contains("hello world\n"), "{text}");
    assert!(text.contains(&format!("greet is {}\n", tool.display())), "{text}");

    let output = run_in(dir.path(), "./bin/greet there");
    assert_eq!(stdout(&output), "hello there\n");
}

#[test]
fn pipes_are_reported_and_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "echo a | b");
    assert_eq!(stdout(&output), "a b\n");
    assert!(stderr(&output).contains("pipelines are not supported"));
}
