use super::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use denver_core::{error_kind, Action, ActionChain, ErrorKind, InstanceState};
use denver_provider::{ArtifactUpdater, StopOutcome, VmProvider};
use denver_remote::RemoteShell;

use crate::config::{config_search_paths, DenverConfig, CONFIG_FILE_NAME};
use crate::flows::Session;
use crate::prompt::{parse_answer, Confirm};
use crate::render::{
    download_progress, render_status_line, resolve_output_style, OutputStyle, Status,
};
use crate::term::{TerminalLaunch, TerminalSettings};
use crate::user::{set_git_user, set_user_key, shell_quote, GuestUser};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "denver-cli-tests-{label}-{}-{}-{}",
        std::process::id(),
        nanos,
        TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&path).expect("must create test dir");
    path
}

const CONFIG: &str = r#"
[config]
channel = "stable"
rbi_url = "https://images.example.test/rbi/"
update_url = "https://releases.example.test/denver"

[instance]
name = "dev"
provider = "vbox"
vmem = 4096
vcpu = 2
local_ip = "192.168.56.10"

[user]
name = "Jo Dev"
email = "jo@example.test"
pubkey = "/home/jo/.ssh/id_rsa.pub"
privkey = "/home/jo/.ssh/id_rsa"
user_data_size = 20

[providers.vbox]
name = "VirtualBox"
location = "/usr/bin"
hypervisor = "virtualbox"
"#;

#[derive(Default)]
struct FakeProvider {
    state: Mutex<InstanceState>,
    calls: Mutex<Vec<&'static str>>,
    stale: bool,
    state_after_start: Option<InstanceState>,
}

impl FakeProvider {
    fn with_state(state: InstanceState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl VmProvider for FakeProvider {
    fn init(&self) -> Result<()> {
        self.record("init");
        Ok(())
    }

    fn start(&self) -> Result<()> {
        self.record("start");
        if let Some(state) = self.state_after_start {
            *self.state.lock().expect("state lock") = state;
        }
        Ok(())
    }

    fn stop(&self) -> Result<StopOutcome> {
        self.record("stop");
        *self.state.lock().expect("state lock") = InstanceState::powered_off();
        Ok(StopOutcome::ShutdownRequested)
    }

    fn unregister(&self) -> Result<()> {
        self.record("unregister");
        Ok(())
    }

    fn update(&self) -> Result<bool> {
        self.record("update");
        Ok(true)
    }

    fn check_is_updated(&self) -> Result<bool> {
        Ok(!self.stale)
    }

    fn state(&self) -> InstanceState {
        *self.state.lock().expect("state lock")
    }

    fn add_post_start_action(&mut self, _action: Action) {}

    fn add_pre_stop_action(&mut self, _action: Action) {}

    fn check_if_running(&self) -> Result<bool> {
        Ok(self.state().live)
    }

    fn set_state(&self, state: InstanceState) -> Result<()> {
        *self.state.lock().expect("state lock") = state;
        Ok(())
    }
}

#[derive(Default)]
struct FakeRelease {
    stale: bool,
    updated: Mutex<bool>,
}

impl ArtifactUpdater for FakeRelease {
    fn check_is_updated(&self) -> Result<bool> {
        Ok(!self.stale)
    }

    fn update(&self) -> Result<()> {
        *self.updated.lock().expect("updated lock") = true;
        Ok(())
    }
}

struct ScriptedConfirm {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.asked
            .lock()
            .expect("asked lock")
            .push(question.to_string());
        Ok(self.answer)
    }
}

#[derive(Default)]
struct RecordingRemote {
    commands: Mutex<Vec<String>>,
    copies: Mutex<Vec<(PathBuf, String, u32)>>,
    terminal_opened: Mutex<bool>,
}

impl RemoteShell for RecordingRemote {
    fn cmd(&self, command: &str) -> Result<String> {
        self.commands
            .lock()
            .expect("commands lock")
            .push(command.to_string());
        Ok(String::new())
    }

    fn copy(&self, local_file: &Path, remote_path: &str, mode: u32) -> Result<()> {
        self.copies.lock().expect("copies lock").push((
            local_file.to_path_buf(),
            remote_path.to_string(),
            mode,
        ));
        Ok(())
    }

    fn terminal(&self) -> Result<()> {
        *self.terminal_opened.lock().expect("terminal lock") = true;
        Ok(())
    }
}

struct Harness {
    provider: FakeProvider,
    release: FakeRelease,
    remote: RecordingRemote,
    confirm: ScriptedConfirm,
    cancel: CancelToken,
}

impl Harness {
    fn new(provider: FakeProvider) -> Self {
        Self {
            provider,
            release: FakeRelease::default(),
            remote: RecordingRemote::default(),
            confirm: ScriptedConfirm::answering(false),
            cancel: CancelToken::new(),
        }
    }

    fn session(&self) -> Session<'_> {
        Session {
            provider: &self.provider,
            release: &self.release,
            remote: &self.remote,
            confirm: &self.confirm,
            cancel: &self.cancel,
            style: OutputStyle::Plain,
            poll_interval: Duration::from_millis(5),
        }
    }
}

fn ready() -> InstanceState {
    InstanceState {
        live: true,
        os_ready: true,
        all_systems_ready: true,
    }
}

fn output(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).expect("utf8 output")
}

#[test]
fn cli_parses_subcommands_and_global_config_flag() {
    let cli = Cli::try_parse_from(["denver", "check-version", "--config", "/tmp/denver.toml"])
        .expect("must parse");
    assert_eq!(cli.command, Commands::CheckVersion);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/denver.toml")));

    let cli = Cli::try_parse_from(["denver", "ssh"]).expect("must parse");
    assert_eq!(cli.command, Commands::Ssh);
    assert_eq!(cli.config, None);
}

#[test]
fn cli_rejects_unknown_subcommand() {
    let err = Cli::try_parse_from(["denver", "console"]).expect_err("console is not a command");
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);

    let cli = Cli::try_parse_from(["denver", "term"]).expect("must parse");
    assert_eq!(cli.command, Commands::Term);
}

#[test]
fn config_parses_all_sections_and_defaults_ssh_user() {
    let config = DenverConfig::parse(CONFIG).expect("must parse");
    assert_eq!(config.config.channel, "stable");
    assert_eq!(config.instance.vmem, 4096);
    assert_eq!(config.instance.vcpu, 2);
    assert_eq!(config.user.ssh_user, "ldevuser");
    assert_eq!(config.user.terminal, "default");
    assert!(config.user.terminal_arguments.is_empty());
    assert_eq!(config.user.privkey, PathBuf::from("/home/jo/.ssh/id_rsa"));

    let provider = config.provider().expect("provider must resolve");
    assert_eq!(provider.hypervisor, "virtualbox");

    let settings = config.instance_settings();
    assert_eq!(settings.user_data_size_gb, 20);
    assert_eq!(settings.local_ip, "192.168.56.10");

    assert_eq!(
        config.image_source().manifest_url("virtualbox"),
        "https://images.example.test/rbi/stable/virtualbox/manifest.json"
    );
}

#[test]
fn config_rejects_unknown_keys() {
    let raw = CONFIG.replace("vcpu = 2", "vcpu = 2\nterminal = \"xterm\"");
    let err = DenverConfig::parse(&raw).expect_err("unknown key must fail");
    assert_eq!(error_kind(&err), Some(ErrorKind::Malformed));
}

#[test]
fn config_reports_missing_provider_by_name() {
    let raw = CONFIG.replace("provider = \"vbox\"", "provider = \"qemu\"");
    let config = DenverConfig::parse(&raw).expect("must parse");
    let err = config.provider().expect_err("qemu is not configured");
    assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));
    assert_eq!(err.to_string(), "VM Provider qemu not found");
}

#[test]
fn release_manifest_url_is_per_platform() {
    let config = DenverConfig::parse(CONFIG).expect("must parse");
    assert_eq!(
        config.release_manifest_url(),
        format!(
            "https://releases.example.test/denver/{}/manifest.json",
            crate::config::release_os()
        )
    );
}

#[test]
fn config_search_paths_cover_each_root_and_its_conf_dir() {
    let paths = config_search_paths(Path::new("/opt/denver"), Some(Path::new("/home/jo")));
    assert_eq!(
        paths,
        vec![
            PathBuf::from(".").join(CONFIG_FILE_NAME),
            PathBuf::from(".").join("conf").join(CONFIG_FILE_NAME),
            PathBuf::from("/opt/denver").join(CONFIG_FILE_NAME),
            PathBuf::from("/opt/denver/conf").join(CONFIG_FILE_NAME),
            PathBuf::from("/home/jo").join(CONFIG_FILE_NAME),
            PathBuf::from("/home/jo/conf").join(CONFIG_FILE_NAME),
        ]
    );
}

#[test]
fn config_load_finds_file_under_working_dir_conf() {
    let working_dir = test_dir("config-load");
    let conf_dir = working_dir.join("conf");
    std::fs::create_dir_all(&conf_dir).expect("must create conf dir");
    std::fs::write(conf_dir.join(CONFIG_FILE_NAME), CONFIG).expect("must write config");

    let config = DenverConfig::load(None, &working_dir, None).expect("must load");
    assert_eq!(config.instance.name, "dev");

    let _ = std::fs::remove_dir_all(&working_dir);
}

#[test]
fn config_load_reads_explicit_path() {
    let dir = test_dir("config-explicit");
    let path = dir.join("custom.toml");
    std::fs::write(&path, CONFIG).expect("must write config");

    let config = DenverConfig::load(Some(&path), Path::new("/nonexistent"), None)
        .expect("must load explicit file");
    assert_eq!(config.config.update_url, "https://releases.example.test/denver");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn resolve_output_style_follows_stdout_tty() {
    assert_eq!(resolve_output_style(true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false), OutputStyle::Plain);
}

#[test]
fn plain_status_lines_have_bare_badges() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, Status::Ok, "VM has been started"),
        "[OK] VM has been started"
    );
    assert_eq!(
        render_status_line(OutputStyle::Plain, Status::Skip, "VM already stopped"),
        "[SKIP] VM already stopped"
    );
}

#[test]
fn rich_status_lines_color_the_badge_only() {
    let line = render_status_line(OutputStyle::Rich, Status::Ko, "boom");
    assert!(line.contains("[KO]"));
    assert!(line.contains('\u{1b}'));
    assert!(line.ends_with(" boom"));
}

#[test]
fn download_progress_is_silent_for_plain_output() {
    assert!(download_progress(OutputStyle::Plain).is_none());
}

#[test]
fn download_progress_accepts_streamed_then_completed_reports() {
    let progress = download_progress(OutputStyle::Rich).expect("rich output shows progress");
    progress(4, None);
    progress(9, None);
    progress(9, Some(9));
    progress(2, Some(5));
    progress(5, Some(5));
}

#[test]
fn prompt_answers_default_to_no() {
    assert!(parse_answer("y\n"));
    assert!(parse_answer(" YES "));
    assert!(!parse_answer("\n"));
    assert!(!parse_answer("n"));
    assert!(!parse_answer("yep"));
}

#[test]
fn shell_quote_escapes_single_quotes() {
    assert_eq!(shell_quote("Jo Dev"), "'Jo Dev'");
    assert_eq!(shell_quote("O'Neil"), "'O'\\''Neil'");
}

#[test]
fn git_user_is_configured_on_the_guest() {
    let remote = RecordingRemote::default();
    set_git_user(&remote, "Jo Dev", "jo@example.test").expect("must configure");
    assert_eq!(
        *remote.commands.lock().expect("commands lock"),
        vec![
            "git config --global user.name 'Jo Dev'".to_string(),
            "git config --global user.email 'jo@example.test'".to_string(),
        ]
    );
}

#[test]
fn git_user_requires_a_name() {
    let remote = RecordingRemote::default();
    let err = set_git_user(&remote, "", "jo@example.test").expect_err("empty name must fail");
    assert_eq!(err.to_string(), "no name configured");
    assert!(remote.commands.lock().expect("commands lock").is_empty());
}

#[test]
fn git_user_requires_an_email() {
    let remote = RecordingRemote::default();
    let err = set_git_user(&remote, "Jo Dev", "").expect_err("empty email must fail");
    assert_eq!(err.to_string(), "no email configured");
    assert_eq!(remote.commands.lock().expect("commands lock").len(), 1);
}

#[test]
fn user_key_is_pushed_with_modes_then_authorized() {
    let remote = RecordingRemote::default();
    set_user_key(
        &remote,
        Path::new("/home/jo/.ssh/id_rsa.pub"),
        Path::new("/home/jo/.ssh/id_rsa"),
    )
    .expect("must push keys");

    assert_eq!(
        *remote.copies.lock().expect("copies lock"),
        vec![
            (
                PathBuf::from("/home/jo/.ssh/id_rsa.pub"),
                ".ssh/id_rsa.pub".to_string(),
                0o644
            ),
            (
                PathBuf::from("/home/jo/.ssh/id_rsa"),
                ".ssh/id_rsa".to_string(),
                0o600
            ),
        ]
    );
    let commands = remote.commands.lock().expect("commands lock");
    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains(">> .ssh/authorized_keys"));
}

#[test]
fn guest_user_actions_run_through_an_action_chain() {
    let remote: Arc<dyn RemoteShell> = Arc::new(RecordingRemote::default());
    let user = GuestUser {
        name: String::new(),
        email: "jo@example.test".to_string(),
        pubkey: PathBuf::from("/k.pub"),
        privkey: PathBuf::from("/k"),
    };
    let mut chain = ActionChain::new();
    chain.push(user.user_key_action(Arc::clone(&remote)));
    chain.push(user.git_user_action(Arc::clone(&remote)));

    let err = chain.run().expect_err("missing name must stop the chain");
    assert!(format!("{err:#}").contains("no name configured"));
}

#[test]
fn stop_skips_when_not_live() {
    let harness = Harness::new(FakeProvider::default());
    let mut out = Vec::new();
    harness.session().stop(&mut out).expect("stop must succeed");

    assert_eq!(output(out), "[SKIP] VM already stopped\n");
    assert!(harness.provider.calls().is_empty());
}

#[test]
fn stop_waits_until_the_instance_is_off() {
    let harness = Harness::new(FakeProvider::with_state(ready()));
    let mut out = Vec::new();
    harness.session().stop(&mut out).expect("stop must succeed");

    assert_eq!(
        output(out),
        "[INFO] VM is stopping...\n[OK] VM has been stopped\n"
    );
    assert_eq!(harness.provider.calls(), vec!["stop"]);
}

#[test]
fn start_reports_once_all_systems_are_ready() {
    let harness = Harness::new(FakeProvider {
        state_after_start: Some(ready()),
        ..FakeProvider::default()
    });
    let mut out = Vec::new();
    harness.session().start(&mut out).expect("start must succeed");

    assert_eq!(
        output(out),
        "[INFO] VM is starting...\n[OK] VM has been started\n"
    );
}

#[test]
fn start_wait_returns_quietly_on_cancellation() {
    let harness = Harness::new(FakeProvider::default());
    harness.cancel.cancel();
    let mut out = Vec::new();
    harness
        .session()
        .start(&mut out)
        .expect("cancelled wait is not an error");

    assert_eq!(output(out), "[INFO] VM is starting...\n");
    assert_eq!(harness.provider.calls(), vec!["start"]);
}

#[test]
fn unregister_rejects_a_live_instance() {
    let harness = Harness::new(FakeProvider::with_state(InstanceState {
        live: true,
        ..InstanceState::default()
    }));
    let mut out = Vec::new();
    let err = harness
        .session()
        .unregister(&mut out)
        .expect_err("live instance must be rejected");

    assert_eq!(error_kind(&err), Some(ErrorKind::Conflict));
    assert_eq!(err.to_string(), "VM is started, stop it first");
    assert!(harness.provider.calls().is_empty());
}

#[test]
fn unregister_reports_success() {
    let harness = Harness::new(FakeProvider::default());
    let mut out = Vec::new();
    harness
        .session()
        .unregister(&mut out)
        .expect("must unregister");
    assert_eq!(output(out), "[OK] VM has been unregistered\n");
    assert_eq!(harness.provider.calls(), vec!["unregister"]);
}

#[test]
fn status_prints_one_line_per_readiness_level() {
    let harness = Harness::new(FakeProvider::with_state(InstanceState {
        live: true,
        os_ready: false,
        all_systems_ready: false,
    }));
    let mut out = Vec::new();
    harness.session().status(&mut out).expect("status must succeed");

    assert_eq!(
        output(out),
        concat!(
            "[OK] Virtual machine state is power on\n",
            "[KO] SSH on Virtual machine OS isn't ready\n",
            "[KO] At least one of the Virtual machine systems is down\n",
        )
    );
}

#[test]
fn check_version_reports_up_to_date_without_prompting() {
    let harness = Harness::new(FakeProvider::default());
    let mut out = Vec::new();
    harness
        .session()
        .check_version(&mut out)
        .expect("must check");

    assert_eq!(output(out), "[OK] Your versions are up to date\n");
    assert!(harness.confirm.asked.lock().expect("asked lock").is_empty());
}

#[test]
fn declined_updates_are_not_applied() {
    let mut harness = Harness::new(FakeProvider {
        stale: true,
        ..FakeProvider::default()
    });
    harness.release.stale = true;
    let mut out = Vec::new();
    harness
        .session()
        .check_version(&mut out)
        .expect("must check");

    assert!(output(out).is_empty());
    assert_eq!(harness.confirm.asked.lock().expect("asked lock").len(), 2);
    assert!(!*harness.release.updated.lock().expect("updated lock"));
    assert!(harness.provider.calls().is_empty());
}

#[test]
fn accepted_updates_run_release_then_image() {
    let mut harness = Harness::new(FakeProvider {
        stale: true,
        ..FakeProvider::default()
    });
    harness.release.stale = true;
    harness.confirm = ScriptedConfirm::answering(true);
    let mut out = Vec::new();
    harness
        .session()
        .init(&mut out)
        .expect("init must succeed");

    assert!(*harness.release.updated.lock().expect("updated lock"));
    assert_eq!(harness.provider.calls(), vec!["update", "init"]);
    assert_eq!(output(out), "[OK] VM has been installed\n");
}

#[test]
fn ssh_requires_a_ready_instance() {
    let harness = Harness::new(FakeProvider::with_state(InstanceState {
        live: true,
        os_ready: true,
        all_systems_ready: false,
    }));
    let err = harness.session().ssh().expect_err("not ready");
    assert_eq!(err.to_string(), "VM not ready");
    assert!(!*harness.remote.terminal_opened.lock().expect("terminal lock"));

    harness.provider.set_state(ready()).expect("set state");
    harness.session().ssh().expect("must open terminal");
    assert!(*harness.remote.terminal_opened.lock().expect("terminal lock"));
}

#[test]
fn failing_release_check_stops_before_the_image_check() {
    struct BrokenRelease;

    impl ArtifactUpdater for BrokenRelease {
        fn check_is_updated(&self) -> Result<bool> {
            Err(anyhow!("manifest unreachable"))
        }

        fn update(&self) -> Result<()> {
            Ok(())
        }
    }

    let harness = Harness::new(FakeProvider::default());
    let broken = BrokenRelease;
    let session = Session {
        release: &broken,
        ..harness.session()
    };
    let err = session.check_for_updates().expect_err("must fail");
    assert_eq!(err.to_string(), "manifest unreachable");
    assert!(harness.provider.calls().is_empty());
}

fn terminal_settings(terminal: &str, terminal_arguments: &str) -> TerminalSettings {
    TerminalSettings {
        terminal: terminal.to_string(),
        terminal_arguments: terminal_arguments.to_string(),
        working_dir: PathBuf::from("/opt/denver"),
        ssh_key: PathBuf::from("/opt/denver/.ssh/id_rsa"),
        ssh_user: "ldevuser".to_string(),
        host: "192.168.56.10".to_string(),
    }
}

const SSH_TAIL: [&str; 8] = [
    "ssh",
    "-i",
    "/opt/denver/.ssh/id_rsa",
    "-o",
    "StrictHostKeyChecking=no",
    "-o",
    "UserKnownHostsFile=/dev/null",
    "ldevuser@192.168.56.10",
];

#[test]
fn default_terminal_runs_the_bundled_emulator() {
    let launch = TerminalLaunch::resolve(&terminal_settings("default", ""), "linux")
        .expect("must resolve");
    assert_eq!(
        launch.program,
        PathBuf::from("/opt/denver/tools/alacritty-linux-0.4.1")
    );

    let mut expected: Vec<String> = vec![
        "--config-file".to_string(),
        "/opt/denver/tools/alacritty.yml".to_string(),
        "--working-directory".to_string(),
        "/opt/denver".to_string(),
        "-e".to_string(),
    ];
    expected.extend(SSH_TAIL.iter().map(|arg| arg.to_string()));
    assert_eq!(launch.args, expected);
    assert_eq!(launch.working_dir, PathBuf::from("/opt/denver"));
}

#[test]
fn custom_terminal_gets_its_arguments_before_ssh() {
    let launch = TerminalLaunch::resolve(&terminal_settings("xterm", "-fa Mono -e"), "linux")
        .expect("must resolve");
    assert_eq!(launch.program, PathBuf::from("xterm"));

    let mut expected: Vec<String> = vec!["-fa".to_string(), "Mono".to_string(), "-e".to_string()];
    expected.extend(SSH_TAIL.iter().map(|arg| arg.to_string()));
    assert_eq!(launch.args, expected);
}

#[test]
fn iterm2_is_only_available_on_macos() {
    let err = TerminalLaunch::resolve(&terminal_settings("iterm2", ""), "linux")
        .expect_err("iterm2 needs macos");
    assert_eq!(err.to_string(), "not supported on this system");

    let launch = TerminalLaunch::resolve(&terminal_settings("iterm2", ""), "macos")
        .expect("must resolve");
    assert_eq!(launch.program, PathBuf::from("/opt/denver/tools/iterm2.sh"));
}

#[cfg(unix)]
#[test]
fn terminal_launch_runs_the_configured_program() {
    let dir = test_dir("term-run");
    let script = dir.join("fake-terminal.sh");
    let recorded = dir.join("args.txt");
    std::fs::write(
        &script,
        format!("printf '%s\\n' \"$@\" > '{}'\n", recorded.display()),
    )
    .expect("must write fake terminal");

    let settings = TerminalSettings {
        working_dir: dir.clone(),
        ..terminal_settings("/bin/sh", &script.display().to_string())
    };
    let launch = TerminalLaunch::resolve(&settings, "linux").expect("must resolve");
    launch.run().expect("fake terminal must succeed");

    let args = std::fs::read_to_string(&recorded).expect("must read recorded args");
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args, SSH_TAIL.to_vec());

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn failing_terminal_is_a_transport_error() {
    let dir = test_dir("term-fail");
    let settings = TerminalSettings {
        working_dir: dir.clone(),
        ..terminal_settings("/bin/sh", "-c false")
    };
    let launch = TerminalLaunch::resolve(&settings, "linux").expect("must resolve");
    let err = launch.run().expect_err("exit status 1 must fail");
    assert_eq!(error_kind(&err), Some(ErrorKind::Transport));
    assert!(err.to_string().contains("failed to run terminal /bin/sh"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn term_requires_a_ready_instance() {
    let harness = Harness::new(FakeProvider::with_state(InstanceState {
        live: true,
        os_ready: true,
        all_systems_ready: false,
    }));
    let settings = terminal_settings("/nonexistent/terminal", "");
    let err = harness
        .session()
        .term(&settings, "linux")
        .expect_err("not ready");
    assert_eq!(err.to_string(), "VM not ready");
}
