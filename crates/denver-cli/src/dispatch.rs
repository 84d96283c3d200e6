use std::io;
use std::sync::Arc;

use anyhow::Result;
use denver_core::CancelToken;
use denver_provider::{provider_for, StateProbe, VmProvider};
use denver_remote::{RemoteShell, SshClient};
use denver_storage::{storage_for, HttpStorage, Storage};
use denver_updater::{MultiDecompressor, ReleasePolicy, UpdateEngine, WorkingLayout};
use tracing::debug;

use crate::config::{home_dir, resolve_working_dir, DenverConfig};
use crate::flows::{Session, WAIT_INTERVAL};
use crate::prompt::StdinConfirm;
use crate::render::{current_output_style, download_progress, OutputStyle};
use crate::term::TerminalSettings;
use crate::user::GuestUser;
use crate::{Cli, Commands};

/// Release build stamp, compared against the published manifest.
const BUILD_VERSION: &str = match option_env!("DENVER_BUILD_TS") {
    Some(version) => version,
    None => "0",
};

pub(crate) fn run_cli(cli: Cli, cancel: CancelToken) -> Result<()> {
    let working_dir = resolve_working_dir()?;
    let layout = WorkingLayout::new(&working_dir);
    let home = home_dir();
    let config = DenverConfig::load(cli.config.as_deref(), &working_dir, home.as_deref())?;
    let style = current_output_style();

    let provider_config = config.provider()?;
    debug!(
        provider = %provider_config.name,
        location = %provider_config.location,
        hypervisor = %provider_config.hypervisor,
        working_dir = %working_dir.display(),
        "resolved configuration"
    );

    let remote: Arc<dyn RemoteShell> = Arc::new(SshClient::new(
        config.instance.local_ip.clone(),
        config.user.ssh_user.clone(),
        &layout.ssh_dir(),
    )?);

    let mut provider = provider_for(
        &provider_config.hypervisor,
        config.instance_settings(),
        &config.image_source(),
        &layout,
        storage_with_progress(&config.config.rbi_url, style)?,
        cancel.clone(),
    )?;
    let user = GuestUser {
        name: config.user.name.clone(),
        email: config.user.email.clone(),
        pubkey: config.user.pubkey.clone(),
        privkey: config.user.privkey.clone(),
    };
    provider.add_post_start_action(user.git_user_action(Arc::clone(&remote)));
    provider.add_post_start_action(user.user_key_action(Arc::clone(&remote)));
    let provider: Arc<dyn VmProvider> = Arc::from(provider);

    let probe = StateProbe::new(Arc::clone(&remote), cancel.clone()).start(Arc::clone(&provider))?;

    let release_manifest_url = config.release_manifest_url();
    let release = UpdateEngine::new(
        layout.root(),
        release_manifest_url.clone(),
        storage_with_progress(&release_manifest_url, style)?,
        Arc::new(MultiDecompressor),
        cancel.clone(),
        ReleasePolicy::new(BUILD_VERSION, layout.root()),
    );

    let confirm = StdinConfirm;
    let session = Session {
        provider: provider.as_ref(),
        release: &release,
        remote: remote.as_ref(),
        confirm: &confirm,
        cancel: &cancel,
        style,
        poll_interval: WAIT_INTERVAL,
    };

    let mut stdout = io::stdout();
    let result = match cli.command {
        Commands::Init => session.init(&mut stdout),
        Commands::Start => session.start(&mut stdout),
        Commands::Stop => session.stop(&mut stdout),
        Commands::Status => session.status(&mut stdout),
        Commands::Unregister => session.unregister(&mut stdout),
        Commands::CheckVersion => session.check_version(&mut stdout),
        Commands::Ssh => session.ssh(),
        Commands::Term => session.term(
            &TerminalSettings {
                terminal: config.user.terminal.clone(),
                terminal_arguments: config.user.terminal_arguments.clone(),
                working_dir: working_dir.clone(),
                ssh_key: layout.ssh_private_key_path(),
                ssh_user: config.user.ssh_user.clone(),
                host: config.instance.local_ip.clone(),
            },
            std::env::consts::OS,
        ),
    };
    probe.stop();
    result
}

fn storage_with_progress(url: &str, style: OutputStyle) -> Result<Arc<dyn Storage>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let storage = HttpStorage::new()?;
        return Ok(match download_progress(style) {
            Some(progress) => Arc::new(storage.with_progress(progress)),
            None => Arc::new(storage),
        });
    }
    storage_for(url)
}
