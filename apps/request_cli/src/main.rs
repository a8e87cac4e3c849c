mod console;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{step_ribbon, ConsoleNotifier};
use shared::{
    catalog,
    domain::{Answers, BuildKind, Locale},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wizard_core::{
    config::{load_settings, load_settings_from},
    fallback::FileDraftStore,
    i18n::fill,
    validation::validate_step,
    Catalog, Collaborators, DraftStore, FieldUpdate, IncomingFile, ProfileKind, Settings,
    SubmitOutcome, Translator, WizardController, WizardOptions, DRAFT_KEY,
};

#[derive(Parser, Debug)]
#[command(about = "Prepare and send project requests")]
struct Cli {
    /// Settings file, `wizard.toml` in the working directory by default.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    profile: Option<ProfileKind>,
    #[arg(long)]
    locale: Option<Locale>,
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the features offered for a build kind.
    Features {
        #[arg(long)]
        build_kind: Option<BuildKind>,
    },
    /// Check saved answers against every step.
    Validate {
        #[arg(long)]
        answers: PathBuf,
    },
    /// Walk the wizard and submit. Falls back to a local draft and an email
    /// when the backend does not accept the request.
    Submit {
        #[arg(long)]
        answers: Option<PathBuf>,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
        /// `field=value`, applied after the answers file.
        #[arg(long = "set", value_parser = parse_assignment)]
        assignments: Vec<FieldUpdate>,
        #[arg(long)]
        from_draft: bool,
    },
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand, Debug)]
enum DraftAction {
    Show,
    Clear,
}

fn parse_assignment(raw: &str) -> Result<FieldUpdate, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    FieldUpdate::parse(name.trim(), value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok()),
        None => load_settings(),
    };
    if let Some(profile) = cli.profile {
        settings.profile = profile;
    }
    if let Some(locale) = cli.locale {
        settings.locale = locale;
    }
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    info!(
        profile = settings.profile.profile().name,
        base_url = %settings.base_url,
        "loaded settings"
    );

    match cli.command {
        Command::Features { build_kind } => list_features(&settings, build_kind),
        Command::Validate { answers } => validate_answers(&settings, &answers),
        Command::Submit {
            answers,
            attachments,
            assignments,
            from_draft,
        } => {
            submit(
                &settings,
                answers.as_deref(),
                &attachments,
                assignments,
                from_draft,
            )
            .await
        }
        Command::Draft { action } => manage_draft(&settings, action),
    }
}

fn read_answers(path: &Path) -> Result<Answers> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers from '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("'{}' does not contain valid answers", path.display()))
}

fn list_features(settings: &Settings, build_kind: Option<BuildKind>) -> Result<()> {
    let translations = Catalog::with_overrides(settings.translations_path.as_deref())?;
    for feature in catalog::available_features(build_kind) {
        let label = translations.text(settings.locale, &feature.label_key, &feature.label);
        println!("{}\t{label}", feature.id);
    }
    Ok(())
}

fn validate_answers(settings: &Settings, path: &Path) -> Result<()> {
    let answers = read_answers(path)?;
    let translations = Catalog::with_overrides(settings.translations_path.as_deref())?;
    let profile = settings.profile.profile();

    let mut blocked = 0;
    for (idx, kind) in profile.steps.iter().enumerate() {
        let step = idx + 1;
        let title = translations.text(settings.locale, kind.title_key(), kind.title());
        match validate_step(profile, step, &answers) {
            Ok(()) => println!("{step}. {title}: ok"),
            Err(err) => {
                blocked += 1;
                let message = fill(
                    &translations.text(settings.locale, err.message_key(), &err.to_string()),
                    &err.args(),
                );
                println!("{step}. {title}: {message} ({})", err.field());
            }
        }
    }
    if blocked > 0 {
        bail!("{blocked} step(s) incomplete");
    }
    Ok(())
}

async fn submit(
    settings: &Settings,
    answers: Option<&Path>,
    attachments: &[PathBuf],
    assignments: Vec<FieldUpdate>,
    from_draft: bool,
) -> Result<()> {
    let mut deps = Collaborators::from_settings(settings)?;
    deps.notifier = Arc::new(ConsoleNotifier);
    let mut wizard = WizardController::open(WizardOptions::from_settings(settings), deps);

    if from_draft && !wizard.restore_draft()? {
        bail!("no saved draft for '{}'", wizard.profile().name);
    }
    if let Some(path) = answers {
        wizard.prefill(read_answers(path)?);
    }
    for update in assignments {
        wizard.set_field(update);
    }

    if !attachments.is_empty() {
        let mut files = Vec::with_capacity(attachments.len());
        for path in attachments {
            files.push(IncomingFile::from_path(path).await?);
        }
        let batch = wizard.add_attachments(files)?;
        for accepted in &batch.accepted {
            println!("attached {} ({} bytes)", accepted.file_name, accepted.size_bytes);
        }
    }

    while wizard.current_step() < wizard.step_count() {
        println!("{}", step_ribbon(&wizard));
        wizard.go_next().with_context(|| {
            format!(
                "'{}' is incomplete",
                wizard.step_title(wizard.current_step_kind())
            )
        })?;
    }
    println!("{}", step_ribbon(&wizard));

    match wizard.submit().await? {
        SubmitOutcome::Submitted(receipt) => {
            match receipt.id {
                Some(id) => println!("submitted as {id}"),
                None => println!("submitted"),
            }
            wizard.close();
            Ok(())
        }
        SubmitOutcome::PreservedLocally(report) => {
            if report.draft_saved {
                println!(
                    "answers saved as '{DRAFT_KEY}' in {}",
                    settings.draft_dir.display()
                );
            }
            if !report.mail_opened {
                println!("send the request by email instead:\n{}", report.mailto.to_uri());
            }
            wizard.close();
            Err(anyhow::Error::new(report.error)
                .context("request was not delivered, retry later with --from-draft"))
        }
    }
}

fn manage_draft(settings: &Settings, action: DraftAction) -> Result<()> {
    let store = FileDraftStore::new(&settings.draft_dir);
    match action {
        DraftAction::Show => match store.load(DRAFT_KEY)? {
            Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            None => println!("no draft saved"),
        },
        DraftAction::Clear => {
            if store.clear(DRAFT_KEY)? {
                println!("draft removed");
            } else {
                println!("no draft saved");
            }
        }
    }
    Ok(())
}
