//! Command-line surface and the handlers behind each subcommand.
//!
//! ```text
//! kim [--config PATH] [--debug] [-i]
//!  ├── topic    list | describe | create | delete
//!  ├── group    list | describe | delete
//!  ├── message  produce | consume
//!  └── profile  list | add | use | delete
//! ```
//!
//! Without a subcommand (or with `-i`) kim starts interactive mode.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use kim_types::{ConsumeRequest, CreateTopicRequest, ListOptions, ProduceRequest, SortOrder};

use crate::config::{Config, Profile, ProfileKind, ProfileStore};
use crate::connection::{Connection, ConnectionManager};
use crate::data::duration::{format_duration, parse_duration};
use crate::data::views;
use crate::manager::{GroupManager, MessageManager, TopicManager};
use crate::output::{self, OutputFormat};
use crate::session::{consume_batch, BatchEnd, BatchLimits};

#[derive(Parser, Debug)]
#[command(name = "kim")]
#[command(version, about = "Operator CLI and interactive terminal client for Kafka and MSK clusters")]
pub struct Cli {
    /// Path to the config file (default: ~/.kim/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Start interactive mode
    #[arg(short, long)]
    pub interactive: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        self.interactive || self.command.is_none()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommand),
    /// Manage consumer groups
    #[command(subcommand)]
    Group(GroupCommand),
    /// Produce and consume messages
    #[command(subcommand)]
    Message(MessageCommand),
    /// Manage connection profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
}

/// Filtering, sorting and paging flags shared by the listings.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive name filter (`*` wildcards are ignored)
    #[arg(long)]
    pub pattern: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Items per page (default from settings)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Field to sort by
    #[arg(long)]
    pub sort_by: Option<String>,

    /// asc or desc
    #[arg(long, default_value = "asc")]
    pub order: String,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl ListArgs {
    fn options(&self, default_sort: &str, default_page_size: usize) -> ListOptions {
        let mut opts = ListOptions::default()
            .page(self.page)
            .page_size(self.page_size.unwrap_or(default_page_size))
            .sort_by(self.sort_by.as_deref().unwrap_or(default_sort))
            .order(SortOrder::parse(&self.order));
        if let Some(pattern) = &self.pattern {
            opts = opts.pattern(pattern.clone());
        }
        opts
    }
}

#[derive(Subcommand, Debug)]
pub enum TopicCommand {
    /// List topics
    List(ListArgs),
    /// Show partitions and configuration of a topic
    Describe {
        name: String,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Create a topic
    Create {
        name: String,
        #[arg(long)]
        partitions: i32,
        #[arg(long)]
        replication_factor: i32,
        /// Topic configuration entry (repeatable)
        #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        configs: Vec<(String, String)>,
    },
    /// Delete a topic
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// List consumer groups
    List(ListArgs),
    /// Show members, assignments and lag of a group
    Describe {
        group_id: String,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Delete a consumer group
    Delete {
        group_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
    /// Send one message
    Produce {
        topic: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        partition: Option<i32>,
        /// Message header (repeatable)
        #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        headers: Vec<(String, String)>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Read messages from one partition
    Consume {
        topic: String,
        #[arg(long)]
        group_id: String,
        #[arg(long, default_value_t = 0)]
        partition: i32,
        /// Start at the oldest retained message instead of the newest
        #[arg(long)]
        from_beginning: bool,
        /// Stop after this many messages
        #[arg(long)]
        max_messages: Option<usize>,
        /// Stop after this long (e.g. "30s", "2m"); 0 means no timeout
        #[arg(long)]
        timeout: Option<String>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List profiles
    List {
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Add a profile
    Add(ProfileArgs),
    /// Make a profile the active one
    Use { name: String },
    /// Delete a profile (asks first when it is the active one)
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    pub name: String,

    /// kafka or msk
    #[arg(long = "type", default_value = "kafka")]
    pub kind: String,

    #[arg(long)]
    pub bootstrap_servers: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub cluster_arn: Option<String>,

    /// IAM or SASL_SCRAM (msk)
    #[arg(long)]
    pub auth_method: Option<String>,

    #[arg(long)]
    pub security_protocol: Option<String>,

    #[arg(long)]
    pub sasl_mechanism: Option<String>,

    #[arg(long)]
    pub sasl_username: Option<String>,

    #[arg(long)]
    pub sasl_password: Option<String>,

    #[arg(long)]
    pub ssl_ca_file: Option<String>,

    #[arg(long)]
    pub ssl_cert_file: Option<String>,

    #[arg(long)]
    pub ssl_key_file: Option<String>,

    #[arg(long)]
    pub ssl_password: Option<String>,

    #[arg(long)]
    pub ssl_check_hostname: bool,

    /// Make the new profile active
    #[arg(long)]
    pub activate: bool,
}

impl ProfileArgs {
    fn into_profile(self) -> Result<Profile> {
        let kind = ProfileKind::parse(&self.kind)?;
        Ok(Profile {
            name: self.name,
            kind,
            bootstrap_servers: self.bootstrap_servers,
            region: self.region,
            cluster_arn: self.cluster_arn,
            auth_method: self.auth_method,
            security_protocol: self.security_protocol,
            sasl_mechanism: self.sasl_mechanism,
            sasl_username: self.sasl_username,
            sasl_password: self.sasl_password,
            ssl_ca_file: self.ssl_ca_file,
            ssl_cert_file: self.ssl_cert_file,
            ssl_key_file: self.ssl_key_file,
            ssl_password: self.ssl_password,
            ssl_check_hostname: self.ssl_check_hostname,
            extra: Default::default(),
        })
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Run one non-interactive command, reading confirmations from stdin.
pub async fn run(command: Commands, config: &mut Config, connections: &ConnectionManager) -> Result<()> {
    let mut stdin = io::stdin().lock();
    run_with_input(command, config, connections, &mut stdin).await
}

/// Run one command; destructive ones read their confirmation from `input`.
pub async fn run_with_input(
    command: Commands,
    config: &mut Config,
    connections: &ConnectionManager,
    input: &mut dyn BufRead,
) -> Result<()> {
    if let Some((question, cancelled)) = delete_confirmation(&command, config) {
        if !confirm(&question, input)? {
            println!("{cancelled}");
            return Ok(());
        }
    }

    let default_format = OutputFormat::from_setting(&config.settings.default_format);
    let page_size = config.settings.page_size;

    match command {
        Commands::Profile(cmd) => run_profile(cmd, config, default_format),
        Commands::Topic(cmd) => {
            let conn = connect(config, connections).await?;
            run_topic(cmd, &conn, default_format, page_size).await
        }
        Commands::Group(cmd) => {
            let conn = connect(config, connections).await?;
            run_group(cmd, &conn, default_format, page_size).await
        }
        Commands::Message(cmd) => {
            let conn = connect(config, connections).await?;
            run_message(cmd, &conn, default_format).await
        }
    }
}

/// The question to ask before a delete, and what to print when the answer is no.
fn delete_confirmation(command: &Commands, config: &Config) -> Option<(String, &'static str)> {
    match command {
        Commands::Topic(TopicCommand::Delete { name, force: false }) => Some((
            format!("Are you sure you want to delete topic '{name}'? This operation is irreversible."),
            "Topic deletion cancelled",
        )),
        Commands::Group(GroupCommand::Delete {
            group_id,
            force: false,
        }) => Some((
            format!("Are you sure you want to delete consumer group '{group_id}'?"),
            "Consumer group deletion cancelled",
        )),
        Commands::Profile(ProfileCommand::Delete { name, force: false })
            if config.active_profile.as_deref() == Some(name.as_str()) =>
        {
            Some((
                format!("Profile '{name}' is currently active. Are you sure you want to delete it?"),
                "Profile deletion cancelled",
            ))
        }
        _ => None,
    }
}

/// Ask a y/N question; only "y" or "yes" (any case) confirms.
fn confirm(question: &str, input: &mut dyn BufRead) -> Result<bool> {
    print!("{question} (y/N): ");
    io::stdout().flush().context("failed to write prompt")?;

    let mut answer = String::new();
    input.read_line(&mut answer).context("failed to read answer")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn connect(config: &Config, connections: &ConnectionManager) -> Result<Connection> {
    let profile = config
        .active_profile()
        .context("no usable profile (add one with `kim profile add`)")?;
    connections
        .connect(profile)
        .await
        .with_context(|| format!("failed to connect with profile '{}'", profile.name))
}

async fn run_topic(
    cmd: TopicCommand,
    conn: &Connection,
    default_format: OutputFormat,
    page_size: usize,
) -> Result<()> {
    let manager = TopicManager::new(conn.client.clone());
    match cmd {
        TopicCommand::List(args) => {
            let list = manager.list_topics(&args.options("name", page_size)).await?;
            output::print(args.format.unwrap_or(default_format), &list, views::topic_table)
        }
        TopicCommand::Describe { name, format } => {
            let details = manager.describe_topic(&name).await?;
            output::print(format.unwrap_or(default_format), &details, views::topic_details)
        }
        TopicCommand::Create {
            name,
            partitions,
            replication_factor,
            configs,
        } => {
            let mut request = CreateTopicRequest::new(&name, partitions, replication_factor);
            for (key, value) in configs {
                request = request.with_config(key, value);
            }
            manager.create_topic(&request).await?;
            println!("Topic '{name}' created");
            Ok(())
        }
        TopicCommand::Delete { name, .. } => {
            manager.delete_topic(&name).await?;
            println!("Topic '{name}' deleted");
            Ok(())
        }
    }
}

async fn run_group(
    cmd: GroupCommand,
    conn: &Connection,
    default_format: OutputFormat,
    page_size: usize,
) -> Result<()> {
    let manager = GroupManager::new(conn.client.clone());
    match cmd {
        GroupCommand::List(args) => {
            let list = manager.list_groups(&args.options("group_id", page_size)).await?;
            output::print(args.format.unwrap_or(default_format), &list, views::group_table)
        }
        GroupCommand::Describe { group_id, format } => {
            let details = manager.describe_group(&group_id).await?;
            output::print(format.unwrap_or(default_format), &details, views::group_details)
        }
        GroupCommand::Delete { group_id, .. } => {
            manager.delete_group(&group_id).await?;
            println!("Consumer group '{group_id}' deleted");
            Ok(())
        }
    }
}

async fn run_message(cmd: MessageCommand, conn: &Connection, default_format: OutputFormat) -> Result<()> {
    match cmd {
        MessageCommand::Produce {
            topic,
            value,
            key,
            partition,
            headers,
            format,
        } => {
            let mut request = ProduceRequest::new(topic, value);
            if let Some(key) = key {
                request = request.with_key(key);
            }
            if let Some(partition) = partition {
                request = request.with_partition(partition);
            }
            for (name, value) in headers {
                request = request.with_header(name, value);
            }
            let response = MessageManager::new(conn.client.clone()).produce(&request).await?;
            output::print(format.unwrap_or(default_format), &response, views::produce_lines)
        }
        MessageCommand::Consume {
            topic,
            group_id,
            partition,
            from_beginning,
            max_messages,
            timeout,
            format,
        } => {
            let format = format.unwrap_or(default_format);
            let request =
                ConsumeRequest::new(topic, partition, group_id).from_beginning(from_beginning);

            let mut limits = BatchLimits::default();
            if let Some(max) = max_messages {
                limits = limits.max_messages(max);
            }
            if let Some(raw) = timeout {
                limits = limits.timeout(parse_duration(&raw)?);
            }

            eprintln!(
                "Consuming {} partition {} (group {}), press Ctrl+C to stop",
                request.topic, request.partition, request.group_id
            );

            let interrupt = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            let started = std::time::Instant::now();
            let mut print_error = None;
            let outcome = consume_batch(&conn.sessions, &request, limits, interrupt, |message| {
                if print_error.is_some() {
                    return;
                }
                if let Err(err) = output::print(format, message, views::message_lines) {
                    print_error = Some(err);
                }
            })
            .await?;

            if let Some(err) = print_error {
                return Err(err);
            }
            for err in &outcome.errors {
                tracing::warn!(error = %err, "error while consuming");
                eprintln!("! {err}");
            }

            let reason = match outcome.end {
                BatchEnd::Limit => "message limit reached",
                BatchEnd::Timeout => "timeout",
                BatchEnd::StreamClosed => "stream closed",
                BatchEnd::Interrupted => "interrupted",
            };
            eprintln!(
                "Consumed {} messages in {} ({reason})",
                outcome.received,
                format_duration(started.elapsed())
            );
            Ok(())
        }
    }
}

fn run_profile(cmd: ProfileCommand, config: &mut Config, default_format: OutputFormat) -> Result<()> {
    match cmd {
        ProfileCommand::List { format } => {
            let active = config.active_profile.clone();
            output::print(
                format.unwrap_or(default_format),
                config.all_profiles(),
                |profiles| views::profile_table(profiles, active.as_deref()),
            )
        }
        ProfileCommand::Add(args) => {
            let activate = args.activate;
            let profile = args.into_profile()?;
            let name = profile.name.clone();
            config.add_profile(profile)?;
            if activate || config.active_profile.is_none() {
                config.set_active_profile(&name)?;
            }
            config.save()?;
            println!("Profile '{name}' added");
            Ok(())
        }
        ProfileCommand::Use { name } => {
            config.set_active_profile(&name)?;
            config.save()?;
            println!("Switched to profile: {name}");
            Ok(())
        }
        ProfileCommand::Delete { name, .. } => {
            config.remove_profile(&name)?;
            config.save()?;
            println!("Profile '{name}' deleted");
            Ok(())
        }
    }
}

/// Reject flag combinations clap cannot express.
pub fn validate(cli: &Cli) -> Result<()> {
    if cli.interactive && cli.command.is_some() {
        bail!("--interactive cannot be combined with a subcommand");
    }
    if let Some(Commands::Message(MessageCommand::Consume {
        max_messages: Some(0),
        ..
    })) = &cli.command
    {
        bail!("--max-messages must be at least 1");
    }
    if let Some(Commands::Topic(TopicCommand::Create {
        partitions,
        replication_factor,
        ..
    })) = &cli.command
    {
        if *partitions < 1 || *replication_factor < 1 {
            return Err(anyhow!("partitions and replication factor must be at least 1"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::FixedConnector;
    use kim_adapters::memory::MemoryBroker;
    use std::sync::Arc;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn no_subcommand_is_interactive() {
        assert!(parse(&["kim"]).is_interactive());
        assert!(parse(&["kim", "-i"]).is_interactive());
        assert!(!parse(&["kim", "topic", "list"]).is_interactive());
        assert!(validate(&parse(&["kim", "-i", "topic", "list"])).is_err());
    }

    #[test]
    fn listing_flags() {
        let cli = parse(&[
            "kim", "topic", "list", "--pattern", "ord*", "--page", "2", "--sort-by",
            "partitions", "--order", "desc", "--format", "json",
        ]);
        let Some(Commands::Topic(TopicCommand::List(args))) = cli.command else {
            panic!("expected topic list");
        };
        assert_eq!(args.format, Some(OutputFormat::Json));

        let opts = args.options("name", 20);
        assert_eq!(opts.page, 2);
        assert_eq!(opts.page_size, 20);
        assert_eq!(opts.pattern.as_deref(), Some("ord*"));
        assert_eq!(opts.sort_by, "partitions");
        assert_eq!(opts.order, SortOrder::Desc);
    }

    #[test]
    fn repeated_key_value_flags() {
        let cli = parse(&[
            "kim", "message", "produce", "orders", "--value", "v", "--header", "a=1",
            "--header", "b=x=y",
        ]);
        let Some(Commands::Message(MessageCommand::Produce { headers, .. })) = cli.command else {
            panic!("expected produce");
        };
        assert_eq!(
            headers,
            vec![("a".into(), "1".into()), ("b".into(), "x=y".into())]
        );

        assert!(Cli::try_parse_from(["kim", "topic", "create", "t", "--partitions", "1",
            "--replication-factor", "1", "--config", "novalue"])
        .is_err());
    }

    #[test]
    fn consume_flags() {
        let cli = parse(&[
            "kim", "message", "consume", "orders", "--group-id", "g1", "--from-beginning",
            "--max-messages", "5", "--timeout", "30s",
        ]);
        let Some(Commands::Message(MessageCommand::Consume {
            partition,
            from_beginning,
            max_messages,
            timeout,
            ..
        })) = &cli.command
        else {
            panic!("expected consume");
        };
        assert_eq!(*partition, 0);
        assert!(*from_beginning);
        assert_eq!(*max_messages, Some(5));
        assert_eq!(timeout.as_deref(), Some("30s"));
        assert!(validate(&cli).is_ok());

        let zero = parse(&["kim", "message", "consume", "o", "--group-id", "g", "--max-messages", "0"]);
        assert!(validate(&zero).is_err());
    }

    #[test]
    fn profile_add_builds_profile() {
        let cli = parse(&[
            "kim", "profile", "add", "prod", "--bootstrap-servers", "b:9092",
            "--security-protocol", "SASL_SSL", "--sasl-mechanism", "PLAIN",
        ]);
        let Some(Commands::Profile(ProfileCommand::Add(args))) = cli.command else {
            panic!("expected profile add");
        };
        let profile = args.into_profile().unwrap();
        assert_eq!(profile.kind, ProfileKind::Kafka);
        assert_eq!(profile.bootstrap_servers.as_deref(), Some("b:9092"));
        assert!(profile.validate().is_ok());
    }

    #[tokio::test]
    async fn profile_commands_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::with_path(&path);
        let connections = ConnectionManager::new(Arc::new(FixedConnector::new(Arc::new(
            MemoryBroker::new(),
        ))));

        let add = parse(&["kim", "profile", "add", "local", "--bootstrap-servers", "localhost:9092"]);
        run(add.command.unwrap(), &mut config, &connections).await.unwrap();
        let add = parse(&["kim", "profile", "add", "prod", "--bootstrap-servers", "prod:9092"]);
        run(add.command.unwrap(), &mut config, &connections).await.unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.all_profiles().len(), 2);
        assert_eq!(loaded.active_profile.as_deref(), Some("local"));

        let switch = parse(&["kim", "profile", "use", "prod"]);
        run(switch.command.unwrap(), &mut config, &connections).await.unwrap();
        assert_eq!(Config::load(&path).unwrap().active_profile.as_deref(), Some("prod"));

        let missing = parse(&["kim", "profile", "use", "ghost"]);
        assert!(run(missing.command.unwrap(), &mut config, &connections).await.is_err());
        assert_eq!(config.active_profile.as_deref(), Some("prod"));
    }

    #[tokio::test]
    async fn cluster_commands_need_a_profile() {
        let mut config = Config::default();
        let connections = ConnectionManager::new(Arc::new(FixedConnector::new(Arc::new(
            MemoryBroker::new(),
        ))));
        let cli = parse(&["kim", "topic", "list"]);
        assert!(run(cli.command.unwrap(), &mut config, &connections).await.is_err());
    }

    #[tokio::test]
    async fn consume_fails_on_missing_topic() {
        let mut config = Config::default();
        config
            .add_profile(Profile::kafka("local", "localhost:9092"))
            .unwrap();
        config.set_active_profile("local").unwrap();
        let broker = MemoryBroker::new();
        broker.add_topic("orders", 1);
        let connections =
            ConnectionManager::new(Arc::new(FixedConnector::new(Arc::new(broker.clone()))));

        let cli = parse(&["kim", "message", "consume", "nope", "--group-id", "g", "--timeout", "100ms"]);
        assert!(run(cli.command.unwrap(), &mut config, &connections).await.is_err());

        let cli = parse(&[
            "kim", "message", "produce", "orders", "--value", "hello", "--key", "k1",
        ]);
        run(cli.command.unwrap(), &mut config, &connections).await.unwrap();

        let cli = parse(&[
            "kim", "message", "consume", "orders", "--group-id", "g", "--from-beginning",
            "--max-messages", "1", "--timeout", "2s",
        ]);
        run(cli.command.unwrap(), &mut config, &connections).await.unwrap();
    }

    fn group(id: &str) -> kim_types::GroupDetails {
        kim_types::GroupDetails {
            group_id: id.to_string(),
            state: "Empty".to_string(),
            protocol_type: "consumer".to_string(),
            protocol: String::new(),
            members: Vec::new(),
        }
    }

    async fn group_exists(broker: &MemoryBroker, id: &str) -> bool {
        GroupManager::new(Arc::new(broker.clone()))
            .describe_group(id)
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn group_delete_asks_first() {
        let mut config = Config::default();
        config
            .add_profile(Profile::kafka("local", "localhost:9092"))
            .unwrap();
        config.set_active_profile("local").unwrap();
        let broker = MemoryBroker::new();
        broker.add_group(group("billing"));
        broker.add_group(group("audit"));
        let connections =
            ConnectionManager::new(Arc::new(FixedConnector::new(Arc::new(broker.clone()))));

        for answer in ["\n", "n\n", "maybe\n"] {
            let cli = parse(&["kim", "group", "delete", "billing"]);
            let mut input = answer.as_bytes();
            run_with_input(cli.command.unwrap(), &mut config, &connections, &mut input)
                .await
                .unwrap();
            assert!(group_exists(&broker, "billing").await, "deleted after {answer:?}");
        }

        let cli = parse(&["kim", "group", "delete", "billing"]);
        let mut input = "Yes\n".as_bytes();
        run_with_input(cli.command.unwrap(), &mut config, &connections, &mut input)
            .await
            .unwrap();
        assert!(!group_exists(&broker, "billing").await);

        // --force never reads the input.
        let cli = parse(&["kim", "group", "delete", "audit", "--force"]);
        let mut input = "n\n".as_bytes();
        run_with_input(cli.command.unwrap(), &mut config, &connections, &mut input)
            .await
            .unwrap();
        assert!(!group_exists(&broker, "audit").await);
        assert_eq!(input, b"n\n");
    }

    #[test]
    fn only_destructive_commands_ask() {
        let mut config = Config::default();
        config
            .add_profile(Profile::kafka("local", "localhost:9092"))
            .unwrap();
        config
            .add_profile(Profile::kafka("prod", "prod:9092"))
            .unwrap();
        config.set_active_profile("local").unwrap();

        let asks = |args: &[&str]| delete_confirmation(&parse(args).command.unwrap(), &config);

        let (question, _) = asks(&["kim", "topic", "delete", "orders"]).unwrap();
        assert!(question.contains("'orders'"));
        assert!(asks(&["kim", "topic", "delete", "orders", "--force"]).is_none());
        assert!(asks(&["kim", "profile", "delete", "local"]).is_some());
        assert!(asks(&["kim", "profile", "delete", "local", "--force"]).is_none());
        assert!(asks(&["kim", "profile", "delete", "prod"]).is_none());
        assert!(asks(&["kim", "topic", "list"]).is_none());
    }

    #[tokio::test]
    async fn cancelled_profile_delete_keeps_the_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_path(dir.path().join("config.toml"));
        config
            .add_profile(Profile::kafka("local", "localhost:9092"))
            .unwrap();
        config.set_active_profile("local").unwrap();
        let connections = ConnectionManager::new(Arc::new(FixedConnector::new(Arc::new(
            MemoryBroker::new(),
        ))));

        let cli = parse(&["kim", "profile", "delete", "local"]);
        let mut input = "no\n".as_bytes();
        run_with_input(cli.command.unwrap(), &mut config, &connections, &mut input)
            .await
            .unwrap();
        assert_eq!(config.active_profile.as_deref(), Some("local"));

        let cli = parse(&["kim", "profile", "delete", "local", "--force"]);
        let mut input = "".as_bytes();
        run_with_input(cli.command.unwrap(), &mut config, &connections, &mut input)
            .await
            .unwrap();
        assert!(config.all_profiles().is_empty());
        assert_eq!(config.active_profile, None);
    }
}
