// crates/cli/src/main.rs
//! QPeptide command-line client.
//!
//! Submits protein digest jobs, watches them to completion, and manages the
//! locally tracked digest. Tracking state survives restarts: `watch` picks up
//! whatever `submit` left behind, even across processes.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use qpeptide_api::{ApiError, DigestApi, DigestClient};
use qpeptide_tracker::{
    AccountGateway, DeleteCoordinator, DeleteKind, DigestDraft, DigestInput, DigestTracker,
    DraftStore, ErrorSink, Phase, PollConfig, TrackedDigestStore, TrackerSnapshot,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Parser)]
#[command(name = "qpeptide", version, about = "Track protein digest jobs on the QPeptide service")]
struct Cli {
    /// Service base URL; defaults to $QPEPTIDE_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Account id; defaults to $QPEPTIDE_USER_ID.
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a new digest and watch it to completion.
    Submit {
        /// Protein name.
        #[arg(long)]
        name: Option<String>,
        /// Amino acid sequence (whitespace and line numbers are ignored).
        #[arg(long)]
        sequence: Option<String>,
        /// Read the sequence from a file instead.
        #[arg(long, value_name = "FILE", conflicts_with = "sequence")]
        sequence_file: Option<PathBuf>,
        /// Return right after submission instead of watching.
        #[arg(long)]
        no_watch: bool,
    },
    /// Resume the tracked digest and watch it to completion.
    Watch,
    /// One-shot status check of the tracked digest.
    Status,
    /// Fetch and print the peptides of the tracked digest.
    Results,
    /// Manage the saved submission draft.
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Delete one or more digests by id.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Delete the account and every digest it owns, then sign out.
    DeleteAccount {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Stop tracking and clear local state.
    Reset,
}

#[derive(Subcommand)]
enum DraftAction {
    /// Save a draft submission.
    Set {
        #[arg(long)]
        name: String,
        #[arg(long)]
        sequence: String,
    },
    /// Print the saved draft.
    Show,
    /// Discard the saved draft.
    Clear,
}

fn api_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("QPEPTIDE_API_URL").ok())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

fn user_id(flag: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var("QPEPTIDE_USER_ID").ok())
        .filter(|id| !id.is_empty())
}

/// Everything a command needs, wired once at startup.
struct Session {
    errors: Arc<ErrorSink>,
    client: Arc<DigestClient>,
    tracker: DigestTracker,
    store: TrackedDigestStore,
    drafts: DraftStore,
    owner: Option<String>,
}

impl Session {
    fn build(api_url: String, owner: Option<String>) -> Result<Self> {
        let store = TrackedDigestStore::open_default()
            .ok_or_else(|| anyhow!("could not resolve a state directory; set QPEPTIDE_STATE_DIR"))?;
        let drafts = DraftStore::open_default()
            .ok_or_else(|| anyhow!("could not resolve a state directory; set QPEPTIDE_STATE_DIR"))?;
        let errors = Arc::new(ErrorSink::new());
        let client = Arc::new(DigestClient::new(api_url));
        let tracker = DigestTracker::new(
            client.clone(),
            errors.clone(),
            store.clone(),
            owner.clone(),
            PollConfig::default(),
        );
        Ok(Self {
            errors,
            client,
            tracker,
            store,
            drafts,
            owner,
        })
    }

    fn owner(&self) -> Result<&str> {
        self.owner
            .as_deref()
            .ok_or_else(|| anyhow!("no account id; pass --user or set QPEPTIDE_USER_ID"))
    }

    fn coordinator(&self) -> DeleteCoordinator {
        let gateway = ApiAccountGateway {
            client: self.client.clone(),
            owner: self.owner.clone().unwrap_or_default(),
        };
        DeleteCoordinator::new(
            self.client.clone(),
            self.errors.clone(),
            self.tracker.clone(),
            Arc::new(gateway),
            self.owner.clone(),
        )
    }

    /// Surface the sink error, if any, as the command's failure.
    fn fail_from_sink(&self, fallback: &str) -> anyhow::Error {
        match self.errors.take() {
            Some(err) => anyhow!("{err}"),
            None => anyhow!("{fallback}"),
        }
    }
}

/// Account deletion delegates to the service and signs the session out;
/// local tracking is reset by the coordinator.
struct ApiAccountGateway {
    client: Arc<DigestClient>,
    owner: String,
}

#[async_trait]
impl AccountGateway for ApiAccountGateway {
    async fn delete_account_and_sign_out(&self) -> Result<(), ApiError> {
        self.client.delete_user(&self.owner).await?;
        tracing::info!("account deleted; signed out");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Quiet by default; RUST_LOG opts into more.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let session = Session::build(api_url(cli.api_url.clone()), user_id(cli.user.clone()))?;

    match cli.command {
        Command::Submit {
            name,
            sequence,
            sequence_file,
            no_watch,
        } => submit(&session, name, sequence, sequence_file, no_watch).await,
        Command::Watch | Command::Results => watch(&session).await,
        Command::Status => status(&session).await,
        Command::Draft { action } => draft(&session, action),
        Command::Delete { ids, yes } => delete_digests(&session, ids, yes).await,
        Command::DeleteAccount { yes } => delete_account(&session, yes).await,
        Command::Reset => {
            session.tracker.reset();
            eprintln!("Tracking state cleared.");
            Ok(())
        }
    }
}

async fn submit(
    session: &Session,
    name: Option<String>,
    sequence: Option<String>,
    sequence_file: Option<PathBuf>,
    no_watch: bool,
) -> Result<()> {
    session.owner()?;

    let sequence = match (sequence, sequence_file) {
        (Some(seq), _) => Some(seq),
        (None, Some(path)) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("reading sequence from {}", path.display()))?,
        ),
        (None, None) => None,
    };

    // Fall back to the saved draft when nothing was given inline.
    let input = match (name, sequence) {
        (Some(name), Some(sequence)) => DigestInput {
            protein_name: name,
            sequence,
        },
        (name, sequence) => {
            let draft = session.drafts.load().unwrap_or_default();
            DigestInput {
                protein_name: name.unwrap_or(draft.protein_name),
                sequence: sequence.unwrap_or(draft.sequence),
            }
        }
    };

    session.tracker.submit(input).await;
    if session.tracker.phase() == Phase::Idle {
        return Err(session.fail_from_sink("submission failed"));
    }

    let digest_id = session.tracker.digest_id().unwrap_or_default();
    eprintln!("Submitted digest {digest_id}");
    if no_watch {
        return Ok(());
    }
    watch_tracked(session).await
}

async fn watch(session: &Session) -> Result<()> {
    session.owner()?;
    if !session.tracker.resume() {
        eprintln!("No digest is being tracked.");
        return Ok(());
    }
    watch_tracked(session).await
}

/// Spin until the tracker reaches a terminal phase, then print the outcome.
async fn watch_tracked(session: &Session) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .expect("valid spinner template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    loop {
        let snapshot = session.tracker.snapshot();
        match snapshot.phase {
            Phase::Submitting => pb.set_message("Submitting\u{2026}"),
            Phase::Polling => pb.set_message("Digesting\u{2026}"),
            Phase::FetchingPeptides => pb.set_message("Fetching peptides\u{2026}"),
            Phase::Completed => {
                pb.finish_and_clear();
                print_results(&snapshot);
                return Ok(());
            }
            Phase::Idle => {
                pb.finish_and_clear();
                return Err(session.fail_from_sink("digest tracking ended without a result"));
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn status(session: &Session) -> Result<()> {
    let owner = session.owner()?;
    let Some(record) = session.store.load() else {
        eprintln!("No digest is being tracked.");
        return Ok(());
    };

    match session.client.get_digest(owner, &record.digest_id).await {
        Ok(digest) => {
            println!(
                "{}  {}  {}",
                digest.id,
                digest.status,
                digest.protein_name.as_deref().unwrap_or("-"),
            );
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

fn draft(session: &Session, action: DraftAction) -> Result<()> {
    match action {
        DraftAction::Set { name, sequence } => {
            session.drafts.save(&DigestDraft {
                protein_name: name,
                sequence,
            });
            eprintln!("Draft saved.");
        }
        DraftAction::Show => match session.drafts.load() {
            Some(draft) => {
                println!("name:     {}", draft.protein_name);
                println!("sequence: {} residues", draft.sequence.len());
            }
            None => eprintln!("No draft saved."),
        },
        DraftAction::Clear => {
            session.drafts.clear();
            eprintln!("Draft cleared.");
        }
    }
    Ok(())
}

async fn delete_digests(session: &Session, ids: Vec<String>, yes: bool) -> Result<()> {
    session.owner()?;
    let coordinator = session.coordinator();
    coordinator.request(ids.clone(), DeleteKind::Digest);

    if !yes && !confirm_prompt(&format!("Delete {} digest(s)?", ids.len()))? {
        coordinator.cancel();
        eprintln!("Cancelled.");
        return Ok(());
    }

    if coordinator.confirm().await {
        eprintln!("Deleted {} digest(s).", ids.len());
        Ok(())
    } else {
        Err(session.fail_from_sink("delete failed"))
    }
}

async fn delete_account(session: &Session, yes: bool) -> Result<()> {
    let owner = session.owner()?.to_string();
    let coordinator = session.coordinator();
    coordinator.request(vec![owner], DeleteKind::User);

    if !yes && !confirm_prompt("Delete the account and ALL of its digests?")? {
        coordinator.cancel();
        eprintln!("Cancelled.");
        return Ok(());
    }

    if coordinator.confirm().await {
        eprintln!("Account deleted; signed out.");
        Ok(())
    } else {
        Err(session.fail_from_sink("account deletion failed"))
    }
}

fn confirm_prompt(question: &str) -> Result<bool> {
    eprint!("{question} [y/N] ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

fn print_results(snapshot: &TrackerSnapshot) {
    let Some(results) = &snapshot.peptides else {
        return;
    };

    if let Some(digest) = &snapshot.digest {
        eprintln!(
            "\u{2713} Digest {} complete \u{2014} {}",
            digest.id,
            digest.protein_name.as_deref().unwrap_or("(unnamed)"),
        );
    }

    if results.peptides.is_empty() {
        println!("No candidate peptides found.");
        return;
    }

    println!(
        "{:<4} {:<8} {:<20} {:>6} {:>7} {:>7}  criteria",
        "#", "POS", "SEQUENCE", "PI", "CHARGE", "MAX KD"
    );
    for peptide in &results.peptides {
        let flags: String = results
            .criteria
            .iter()
            .map(|c| {
                if peptide.criteria_ranks.contains(&c.rank) {
                    '+'
                } else {
                    '.'
                }
            })
            .collect();
        println!(
            "{:<4} {:<8} {:<20} {:>6} {:>7} {:>7}  {}",
            peptide.rank,
            peptide.position,
            peptide.sequence,
            fmt_opt(peptide.pi),
            fmt_opt(peptide.charge_state),
            fmt_opt(peptide.max_kd_score),
            flags,
        );
    }

    println!();
    for criterion in &results.criteria {
        println!("  [{}] {} \u{2014} {}", criterion.rank, criterion.code, criterion.goal);
    }
}
