use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rustfolio::collection::ReorderOutcome;
use rustfolio::core::system_clock;
use rustfolio::editor::{FooterList, SyncState};
use rustfolio::{
    ActivityLog, ChangeNotifier, CmsConfig, CmsError, CollectionEditor, ContactsInbox, ContentKind,
    FooterEditor, InMemoryCredentials, InMemoryStore, RecordKey, SessionContext, SharedStore,
    SnapshotFile, TelegramSink,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_SNAPSHOT: &str = "rustfolio.json";
const DEFAULT_OPERATOR: &str = "operator";

#[derive(Parser)]
#[command(name = "rustfolio")]
#[command(about = "Operator tool for the studio site's content")]
pub struct Cli {
    /// Snapshot file holding the site's data
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Administrator recorded as the author of changes
    #[arg(long, global = true)]
    admin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a collection in display order
    List { domain: ContentKind },
    /// Append a record with the collection's defaults
    Add { domain: ContentKind },
    /// Edit one field of a record
    Set {
        domain: ContentKind,
        key: String,
        field: String,
        value: String,
    },
    /// Move the record at position FROM to position TO
    Move {
        domain: ContentKind,
        from: usize,
        to: usize,
    },
    Delete {
        domain: ContentKind,
        key: String,
        #[arg(long)]
        yes: bool,
    },
    /// Contact submissions, newest first
    Contacts {
        #[arg(long)]
        delete: Option<String>,
        #[arg(long)]
        yes: bool,
    },
    /// Recent admin activity
    Logs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Footer {
        #[command(subcommand)]
        action: Option<FooterCommand>,
    },
}

#[derive(Subcommand)]
enum FooterCommand {
    Text { text: String },
    Add { list: FooterListArg },
    Set {
        list: FooterListArg,
        key: String,
        field: String,
        value: String,
    },
    Delete {
        list: FooterListArg,
        key: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FooterListArg {
    Links,
    Social,
}

impl From<FooterListArg> for FooterList {
    fn from(arg: FooterListArg) -> Self {
        match arg {
            FooterListArg::Links => FooterList::Links,
            FooterListArg::Social => FooterList::Social,
        }
    }
}

/// Everything one command runs against.
struct Workspace {
    store: InMemoryStore,
    snapshot: SnapshotFile,
    notifier: ChangeNotifier,
    session: SessionContext,
}

impl Workspace {
    async fn open(config: CmsConfig) -> Result<Self> {
        let snapshot = SnapshotFile::new(
            config
                .snapshot_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT)),
        );
        let store = InMemoryStore::open_snapshot(&snapshot)
            .await
            .with_context(|| format!("Failed to load snapshot '{}'", snapshot.path().display()))?;
        let shared: SharedStore = Arc::new(store.clone());

        let mut notifier = match (&config.telegram, config.notifications_enabled) {
            (Some(telegram), true) => ChangeNotifier::new(Arc::new(TelegramSink::new(telegram)?)),
            _ => ChangeNotifier::disabled(),
        };
        notifier = notifier.with_activity_log(ActivityLog::new(shared, system_clock())?);

        let credentials = Arc::new(InMemoryCredentials::new());
        let principal = credentials.assume(
            config
                .admin_identifier
                .as_deref()
                .unwrap_or(DEFAULT_OPERATOR),
        );
        tracing::debug!(admin = %principal, "operator session");

        Ok(Self {
            store,
            snapshot,
            session: SessionContext::new(credentials, notifier.clone()),
            notifier,
        })
    }

    fn shared(&self) -> SharedStore {
        Arc::new(self.store.clone())
    }

    async fn editor(&self, kind: ContentKind) -> Result<CollectionEditor> {
        Ok(CollectionEditor::open(kind, self.shared(), &self.session, self.notifier.clone()).await?)
    }

    /// Run one command. Returns whether it changed stored data.
    async fn execute(&self, command: Command) -> Result<bool> {
        match command {
            Command::List { domain } => {
                let editor = self.editor(domain).await?;
                print_records(&editor);
                editor.close();
                Ok(false)
            }
            Command::Add { domain } => {
                let mut editor = self.editor(domain).await?;
                let key = editor.add().await?;
                println!("Added {} {}", domain, key);
                Ok(true)
            }
            Command::Set {
                domain,
                key,
                field,
                value,
            } => {
                let mut editor = self.editor(domain).await?;
                let key = RecordKey::new(key)?;
                editor.update_field(&key, &field, parse_value(value)).await?;
                println!("Updated {}.{}", key, field);
                Ok(true)
            }
            Command::Move { domain, from, to } => {
                let mut editor = self.editor(domain).await?;
                match editor.reorder(from, Some(to)).await? {
                    ReorderOutcome::Applied { writes } => {
                        editor.refresh();
                        if editor.sync_state() == SyncState::Synced {
                            print_records(&editor);
                        }
                        println!("Moved {} -> {} ({} order writes)", from, to, writes);
                        Ok(true)
                    }
                    ReorderOutcome::Unchanged | ReorderOutcome::Cancelled => {
                        println!("Nothing to move");
                        Ok(false)
                    }
                }
            }
            Command::Delete { domain, key, yes } => {
                let mut editor = self.editor(domain).await?;
                let key = RecordKey::new(key)?;
                if !yes {
                    return Err(CmsError::ConfirmationRequired(key.to_string()).into());
                }
                let deleted = editor.delete(&key, |_| yes).await?;
                println!("Deleted {}", key);
                Ok(deleted)
            }
            Command::Contacts { delete, yes } => {
                let mut inbox = ContactsInbox::open(self.shared(), &self.session).await?;
                if let Some(key) = delete {
                    let key = RecordKey::new(key)?;
                    if !yes {
                        return Err(CmsError::ConfirmationRequired(key.to_string()).into());
                    }
                    inbox.delete(&key, |_| yes).await?;
                    println!("Deleted {}", key);
                    return Ok(true);
                }
                for message in inbox.messages() {
                    println!(
                        "{}\t{}\t{} <{}>\t{}\t{}",
                        message.key,
                        format_time(message.timestamp),
                        message.name,
                        message.email,
                        message.phone,
                        message.description
                    );
                }
                Ok(false)
            }
            Command::Logs { limit } => {
                let log = ActivityLog::new(self.shared(), system_clock())?;
                for entry in log.entries().await?.into_iter().take(limit) {
                    println!(
                        "{}\t{}\t{}",
                        format_time(entry.timestamp),
                        entry.section,
                        entry.action
                    );
                }
                Ok(false)
            }
            Command::Footer { action } => {
                let mut footer =
                    FooterEditor::open(self.shared(), &self.session, self.notifier.clone()).await?;
                let mutated = match action {
                    None => false,
                    Some(FooterCommand::Text { text }) => {
                        footer.set_text(&text).await?;
                        true
                    }
                    Some(FooterCommand::Add { list }) => {
                        let key = footer.add(list.into()).await?;
                        println!("Added {}", key);
                        true
                    }
                    Some(FooterCommand::Set {
                        list,
                        key,
                        field,
                        value,
                    }) => {
                        footer
                            .update(list.into(), &RecordKey::new(key)?, &field, &value)
                            .await?;
                        true
                    }
                    Some(FooterCommand::Delete { list, key, yes }) => {
                        let key = RecordKey::new(key)?;
                        if !yes {
                            return Err(CmsError::ConfirmationRequired(key.to_string()).into());
                        }
                        footer.delete(list.into(), &key, |_| yes).await?
                    }
                };
                footer.refresh();
                let content = footer.content();
                println!("{}", content.text);
                for link in &content.links {
                    println!("link\t{}\t{}\t{}", link.key, link.label, link.url);
                }
                for social in &content.social {
                    println!("social\t{}\t{}\t{}", social.key, social.platform, social.url);
                }
                Ok(mutated)
            }
        }
    }

    async fn save(&self) -> Result<()> {
        self.store
            .save_snapshot(&self.snapshot)
            .await
            .with_context(|| format!("Failed to save snapshot '{}'", self.snapshot.path().display()))
    }
}

fn print_records(editor: &CollectionEditor) {
    let title = editor.kind().title_field();
    for (position, record) in editor.records().iter().enumerate() {
        let order = record
            .order
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{}",
            position,
            record.key,
            order,
            record.text(title).unwrap_or("")
        );
    }
}

/// Whole numbers go in as numbers, everything else as text.
fn parse_value(raw: String) -> Value {
    match raw.trim().parse::<i64>() {
        Ok(number) => Value::from(number),
        Err(_) => Value::String(raw),
    }
}

fn format_time(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|at| at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = CmsConfig::from_env().context("Invalid configuration")?;
    if let Some(path) = cli.snapshot {
        config = config.snapshot_path(path);
    }
    if let Some(admin) = cli.admin {
        config = config.admin_identifier(&admin);
    }

    let workspace = Workspace::open(config).await?;
    let mutated = workspace.execute(cli.command).await?;
    workspace.notifier.flush().await;
    if mutated {
        workspace.save().await?;
    }
    Ok(())
}
