//! Share command - Open a MyCare share link
//!
//! Provides the `mycare share` CLI commands:
//! - `open`: walks the email → OTP → files wizard, then downloads files
//! - `info`: prints the share descriptor without verifying access
//!
//! Ctrl-C cancels the flow: in-flight requests and pending prompts resolve
//! immediately and the command exits without touching the server again.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mycare_api::client::ApiClient;
use mycare_api::opener::BrowserUrlOpener;
use mycare_api::share::ShareLinkClient;
use mycare_core::config::Config;
use mycare_core::domain::format::{
    exam_count_label, format_date_ddmmyyyy, format_file_size, format_timestamp_ddmmyyyy,
    NO_FILES_LABEL,
};
use mycare_core::domain::{
    LinkAvailability, MediaId, ShareCode, ShareError, ShareExam, ShareInfo, StepKind,
    UnavailableReason,
};
use mycare_core::ports::DownloadedFile;
use mycare_core::usecases::{DownloadOutcome, ShareAccessFlow};

use crate::output::{get_formatter, prompt, OutputFormat, OutputFormatter};

/// Typed at the OTP prompt to go back and request a new code
const RESEND_KEYWORD: &str = "r";

/// Share subcommands
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Verify access to a share link and download its files
    Open {
        /// Share code or share URL (e.g. https://mycare.app/s/ABC123)
        link: String,
        /// E-mail the share was sent to (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// 6-digit code received by e-mail (prompted if omitted)
        #[arg(long)]
        otp: Option<String>,
        /// Directory to save files to (defaults to downloads.directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Download every file as a single zip archive
        #[arg(long)]
        all: bool,
        /// Download only the file with this media ID (repeatable)
        #[arg(long = "file", value_name = "MEDIA_ID", conflicts_with = "all")]
        files: Vec<String>,
        /// List files without downloading anything
        #[arg(long, conflicts_with_all = ["all", "files"])]
        no_download: bool,
    },
    /// Show what a share link contains and whether it is still usable
    Info {
        /// Share code or share URL
        link: String,
    },
}

impl ShareCommand {
    /// Execute the share command
    pub async fn execute(&self, format: OutputFormat, quiet: bool, config: &Config) -> Result<()> {
        let formatter = get_formatter(format, quiet);
        match self {
            ShareCommand::Open {
                link,
                email,
                otp,
                output,
                all,
                files,
                no_download,
            } => {
                let code = match parse_code(link) {
                    Ok(code) => code,
                    Err(e) => {
                        formatter.error(&e.user_message());
                        return Err(e.into());
                    }
                };
                let plan = DownloadPlan::from_flags(*all, files, *no_download);
                let dir = output.clone().unwrap_or_else(|| config.download_dir());
                let options = OpenOptions {
                    email: email.clone(),
                    otp: otp.clone(),
                    plan,
                    dir,
                };
                run_open(code, options, config, format, formatter.as_ref()).await
            }
            ShareCommand::Info { link } => {
                let code = match parse_code(link) {
                    Ok(code) => code,
                    Err(e) => {
                        formatter.error(&e.user_message());
                        return Err(e.into());
                    }
                };
                run_info(code, config, format, formatter.as_ref()).await
            }
        }
    }
}

fn parse_code(link: &str) -> Result<ShareCode, ShareError> {
    ShareCode::from_link(link).map_err(ShareError::from)
}

/// What to download once the files step is reached
#[derive(Debug, Clone, PartialEq, Eq)]
enum DownloadPlan {
    /// Ask interactively
    Prompt,
    /// Zip archive of everything
    All,
    /// These media IDs
    Files(Vec<String>),
    /// Nothing
    Skip,
}

impl DownloadPlan {
    fn from_flags(all: bool, files: &[String], no_download: bool) -> Self {
        if no_download {
            DownloadPlan::Skip
        } else if all {
            DownloadPlan::All
        } else if !files.is_empty() {
            DownloadPlan::Files(files.to_vec())
        } else {
            DownloadPlan::Prompt
        }
    }
}

struct OpenOptions {
    email: Option<String>,
    otp: Option<String>,
    plan: DownloadPlan,
    dir: PathBuf,
}

fn build_flow(code: ShareCode, config: &Config) -> Result<ShareAccessFlow> {
    let client = ApiClient::from_config(&config.api).context("Failed to create API client")?;
    let api = Arc::new(ShareLinkClient::new(client));
    Ok(ShareAccessFlow::new(api, Arc::new(BrowserUrlOpener), code)
        .with_open_fallback(config.downloads.open_fallback))
}

/// Cancels `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, cancelling share flow");
            token.cancel();
        }
    });
}

async fn run_info(
    code: ShareCode,
    config: &Config,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let mut flow = build_flow(code, config)?;
    cancel_on_ctrl_c(flow.cancellation_token());

    let availability = match flow.load_share_info().await {
        Ok(availability) => availability,
        Err(ShareError::Unavailable(reason)) => {
            render_unavailable(formatter, reason);
            return Err(ShareError::Unavailable(reason).into());
        }
        Err(e) => return Err(report(formatter, e)),
    };
    let Some(info) = flow.share_info() else {
        anyhow::bail!("Share descriptor missing after a successful load");
    };

    if format.is_json() {
        formatter.print_json(&descriptor_json(info, availability));
        return Ok(());
    }

    formatter.success(&format!("Compartilhamento {}", info.code));
    for line in summary_lines(info) {
        formatter.info(&line);
    }
    match availability {
        LinkAvailability::Available => formatter.info("Status: disponível"),
        LinkAvailability::Unavailable(reason) => render_unavailable(formatter, reason),
    }
    Ok(())
}

async fn run_open(
    code: ShareCode,
    options: OpenOptions,
    config: &Config,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let OpenOptions {
        email,
        otp,
        plan,
        dir,
    } = options;

    let mut flow = build_flow(code, config)?;
    let cancel = flow.cancellation_token();
    cancel_on_ctrl_c(cancel.clone());
    let mut input = Prompter::stdin(cancel);

    info!(code = %flow.code(), "Opening share link");
    match flow.load_share_info().await {
        Ok(LinkAvailability::Available) => {}
        Ok(LinkAvailability::Unavailable(reason)) => {
            if format.is_json() {
                if let Some(info) = flow.share_info() {
                    formatter.print_json(&descriptor_json(info, flow.availability()));
                }
            }
            render_unavailable(formatter, reason);
            return Err(ShareError::Unavailable(reason).into());
        }
        Err(ShareError::Unavailable(reason)) => {
            render_unavailable(formatter, reason);
            return Err(ShareError::Unavailable(reason).into());
        }
        Err(e) => return Err(report(formatter, e)),
    }

    if let Some(info) = flow.share_info() {
        formatter.info(&exam_count_label(info.exams.len()));
        formatter.info("Para acessar os arquivos, confirme o e-mail que recebeu o compartilhamento.");
    }

    run_wizard(&mut flow, &mut input, email, otp, formatter).await?;

    let Some(info) = flow.share_info().cloned() else {
        anyhow::bail!("Share descriptor missing in the files step");
    };

    if format.is_json() {
        formatter.print_json(&descriptor_json(&info, flow.availability()));
    } else {
        render_files(formatter, &info);
    }

    let targets = match plan {
        DownloadPlan::Skip => return Ok(()),
        DownloadPlan::All => vec![Target::All],
        DownloadPlan::Files(ids) => ids.into_iter().map(Target::File).collect(),
        DownloadPlan::Prompt => {
            if !info.has_files() {
                return Ok(());
            }
            let answer = input
                .ask("Baixar arquivos (números separados por vírgula, 't' para todos, Enter para sair): ")
                .await?;
            match parse_selection(&answer, &info) {
                Ok(targets) => targets,
                Err(e) => {
                    formatter.error(&e.to_string());
                    return Err(e);
                }
            }
        }
    };

    let mut failures = 0usize;
    for target in targets {
        let result = match &target {
            Target::All => flow.download_all().await,
            Target::File(id) => flow.download_file(id).await,
        };
        match result {
            Ok(outcome) => {
                if let Err(e) = handle_outcome(formatter, outcome, &target, &info, &dir).await {
                    warn!(error = %e, "Failed to save download");
                    formatter.error(&format!("{e:#}"));
                    failures += 1;
                }
            }
            Err(ShareError::Cancelled) => return Err(ShareError::Cancelled.into()),
            Err(ShareError::Unavailable(reason)) => {
                render_unavailable(formatter, reason);
                return Err(ShareError::Unavailable(reason).into());
            }
            Err(e) => {
                formatter.error(&e.user_message());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} download(s) failed");
    }
    Ok(())
}

/// Walks the email and OTP steps until the flow reaches the files step
///
/// Values passed on the command line are used first. Retryable failures are
/// shown and prompted for again; typing `r` at the OTP prompt goes back to
/// the email step.
async fn run_wizard(
    flow: &mut ShareAccessFlow,
    input: &mut Prompter,
    mut email: Option<String>,
    mut otp: Option<String>,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    loop {
        match flow.step().kind() {
            StepKind::Email => {
                let value = match email.take() {
                    Some(value) => value,
                    None => input.ask("E-mail: ").await?,
                };
                match flow.request_access(&value).await {
                    Ok(()) => formatter.success(
                        "Código enviado. Verifique seu e-mail para o código de verificação",
                    ),
                    Err(e) => retry_or_fail(formatter, e)?,
                }
            }
            StepKind::Otp => {
                let value = match otp.take() {
                    Some(value) => value,
                    None => {
                        input
                            .ask(&format!(
                                "Código de 6 dígitos ('{RESEND_KEYWORD}' para reenviar): "
                            ))
                            .await?
                    }
                };
                if value.trim().eq_ignore_ascii_case(RESEND_KEYWORD) {
                    flow.resend_code()?;
                    continue;
                }
                match flow.validate_otp(&value).await {
                    Ok(()) => formatter.success("Acesso liberado"),
                    Err(e) => retry_or_fail(formatter, e)?,
                }
            }
            StepKind::Files => return Ok(()),
        }
    }
}

/// Shows a retryable error and returns, or converts a fatal one
fn retry_or_fail(formatter: &dyn OutputFormatter, err: ShareError) -> Result<()> {
    match err {
        ShareError::Unavailable(reason) => {
            render_unavailable(formatter, reason);
            Err(err.into())
        }
        err if err.is_retryable() => {
            formatter.error(&err.user_message());
            Ok(())
        }
        err => Err(report(formatter, err)),
    }
}

fn report(formatter: &dyn OutputFormatter, err: ShareError) -> anyhow::Error {
    if err != ShareError::Cancelled {
        formatter.error(&err.user_message());
    }
    err.into()
}

fn render_unavailable(formatter: &dyn OutputFormatter, reason: UnavailableReason) {
    formatter.error(UnavailableReason::TITLE);
    formatter.warn(reason.message());
}

fn summary_lines(info: &ShareInfo) -> Vec<String> {
    let mut lines = vec![exam_count_label(info.exams.len())];
    if let Some(expires_at) = &info.expires_at {
        lines.push(format!("Expira em: {}", format_timestamp_ddmmyyyy(expires_at)));
    }
    match info.max_uses {
        Some(max) => lines.push(format!("Usos: {}/{}", info.times_used, max)),
        None => lines.push(format!("Usos: {}", info.times_used)),
    }
    lines
}

fn exam_lines(exam: &ShareExam) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(date) = exam.exam_date.as_deref() {
        lines.push(format!("Data: {}", format_date_ddmmyyyy(date)));
    }
    if let Some(notes) = exam.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Observações: {notes}"));
    }
    if !exam.tags.is_empty() {
        lines.push(format!("Tags: {}", exam.tags.join(", ")));
    }
    lines
}

fn render_files(formatter: &dyn OutputFormatter, info: &ShareInfo) {
    let mut index = 0usize;
    for exam in &info.exams {
        formatter.heading(&exam.name);
        for line in exam_lines(exam) {
            formatter.info(&line);
        }
        if exam.files.is_empty() {
            formatter.info(NO_FILES_LABEL);
        }
        for file in &exam.files {
            index += 1;
            formatter.info(&format!(
                "[{index}] {} ({}) id={}",
                file.file_name,
                format_file_size(file.file_size),
                file.id
            ));
        }
    }
    if info.has_files() {
        formatter.info("");
        formatter.info("[t] Baixar todos (zip)");
    }
}

fn descriptor_json(info: &ShareInfo, availability: LinkAvailability) -> serde_json::Value {
    let (available, reason) = match availability {
        LinkAvailability::Available => (true, None),
        LinkAvailability::Unavailable(reason) => (false, Some(reason.to_string())),
    };
    serde_json::json!({
        "share": info,
        "available": available,
        "unavailable_reason": reason,
        "file_count": info.file_count(),
    })
}

/// One download to perform
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    All,
    File(String),
}

/// Parses the interactive download selection
///
/// Accepts 1-based file numbers separated by commas or spaces, `t` for
/// everything, or an empty answer for nothing.
fn parse_selection(answer: &str, info: &ShareInfo) -> Result<Vec<Target>> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(Vec::new());
    }
    if answer.eq_ignore_ascii_case("t") {
        return Ok(vec![Target::All]);
    }

    let files: Vec<_> = info.files().map(|(_, file)| file).collect();
    let mut targets = Vec::new();
    for part in answer
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
    {
        let number: usize = part
            .parse()
            .with_context(|| format!("Seleção inválida: '{part}'"))?;
        let file = number
            .checked_sub(1)
            .and_then(|i| files.get(i))
            .with_context(|| format!("Arquivo {number} não existe"))?;
        let target = Target::File(file.id.to_string());
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}

async fn handle_outcome(
    formatter: &dyn OutputFormatter,
    outcome: DownloadOutcome,
    target: &Target,
    info: &ShareInfo,
    dir: &Path,
) -> Result<()> {
    match outcome {
        DownloadOutcome::Fetched(file) => {
            let fallback = default_file_name(target, info);
            let path = save_download(dir, &file, &fallback).await?;
            formatter.success(&format!("Salvo em {}", path.display()));
        }
        DownloadOutcome::Opened { url } => {
            formatter.warn(&format!(
                "Download autenticado falhou; link aberto no navegador: {url}"
            ));
        }
    }
    Ok(())
}

fn default_file_name(target: &Target, info: &ShareInfo) -> String {
    match target {
        Target::All => format!("mycare-{}.zip", info.code),
        Target::File(id) => MediaId::new(id.clone())
            .ok()
            .and_then(|media_id| info.find_file(&media_id))
            .map(|file| file.file_name.clone())
            .unwrap_or_else(|| id.clone()),
    }
}

/// Writes a fetched download into `dir` without overwriting existing files
async fn save_download(dir: &Path, file: &DownloadedFile, fallback_name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let name = file
        .file_name
        .as_deref()
        .map(sanitize_file_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| sanitize_file_name(fallback_name));
    let name = if name.is_empty() {
        "download".to_string()
    } else {
        name
    };

    let path = unique_path(dir, &name).await;
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = file.bytes.len(), "Saved download");
    Ok(path)
}

/// Strips path separators and control characters from a server-sent name
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim().trim_start_matches('.').trim().to_string()
}

/// Returns `dir/name`, or `dir/stem (n).ext` if that already exists
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1u32;
    loop {
        let numbered = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dir.join(numbered);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

/// Line-based prompts that give up when the flow is cancelled
///
/// Stdin is read on a dedicated thread that feeds a channel. A blocking read
/// cannot be interrupted, so it stays off the runtime and a cancelled prompt
/// leaves nothing for shutdown to wait on.
struct Prompter {
    lines: Option<mpsc::Receiver<io::Result<String>>>,
    cancel: CancellationToken,
}

impl Prompter {
    /// Prompts on stdin; the reader thread starts with the first question
    fn stdin(cancel: CancellationToken) -> Self {
        Self {
            lines: None,
            cancel,
        }
    }

    #[cfg(test)]
    fn from_channel(lines: mpsc::Receiver<io::Result<String>>, cancel: CancellationToken) -> Self {
        Self {
            lines: Some(lines),
            cancel,
        }
    }

    async fn ask(&mut self, label: &str) -> Result<String> {
        prompt(label);
        let lines = self.lines.get_or_insert_with(spawn_stdin_reader);
        let line = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ShareError::Cancelled.into()),
            line = lines.recv() => line,
        };
        match line {
            Some(Ok(line)) => Ok(line.trim().to_string()),
            Some(Err(e)) => Err(anyhow::Error::new(e).context("Failed to read from stdin")),
            None => anyhow::bail!("Entrada encerrada antes da conclusão"),
        }
    }
}

/// Forwards stdin lines into a channel until EOF or the receiver is gone
fn spawn_stdin_reader() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    let spawned = std::thread::Builder::new()
        .name("mycare-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        // A closed channel reads as end of input
        warn!(error = %e, "Failed to start stdin reader");
    }
    rx
}
