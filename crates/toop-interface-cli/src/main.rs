// crates/toop-interface-cli/src/main.rs
// ============================================================================
// Module: TOOP Interface CLI Entry Point
// Description: Command dispatcher for the TOOP interface adapter.
// Purpose: Serve inbound routes, send envelopes, search, and inspect containers.
// Dependencies: clap, toop-interface-core, toop-interface-config,
//               toop-interface-client, toop-interface-server, tokio, thiserror.
// ============================================================================

//! ## Overview
//! Thin command surface over the adapter crates. Every command reads the
//! properties configuration once (explicit `--config` path, environment
//! override, or the default file names in the working directory) and reports
//! failures on stderr with a non-zero exit code. Input files are untrusted and
//! read with hard size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ed25519_dalek::VerifyingKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use toop_interface_client::ToopInterfaceClient;
use toop_interface_config::ConfigLoader;
use toop_interface_config::ConfigProvider;
use toop_interface_config::InterfaceConfig;
use toop_interface_config::ReloadOutcome;
use toop_interface_core::AuditSink;
use toop_interface_core::BundleMessageBuilder;
use toop_interface_core::BundleSlot;
use toop_interface_core::FileAuditSink;
use toop_interface_core::Keystore;
use toop_interface_core::KeystoreError;
use toop_interface_core::MessageBundleBuilder;
use toop_interface_core::SignedContainerReader;
use toop_interface_core::SignedMessageBuilder;
use toop_interface_core::StderrAuditSink;
use toop_interface_core::ToopRequest;
use toop_interface_core::ToopResponse;
use toop_interface_core::VerificationReport;
use toop_interface_core::core::search::RESULT_LIST_ROOT;
use toop_interface_core::core::xml::from_xml_bytes;
use toop_interface_core::core::xml::to_xml_bytes;
use toop_interface_core::runtime::container::MAX_CONTAINER_BYTES;
use toop_interface_core::runtime::exchange::TOOP_REQUEST_ENTRY;
use toop_interface_core::runtime::exchange::TOOP_RESPONSE_ENTRY;
use toop_interface_server::CallbackError;
use toop_interface_server::DataConsumerCallback;
use toop_interface_server::DataProviderCallback;
use toop_interface_server::InboundServer;
use toop_interface_server::ResponseContainerHandler;
use toop_interface_server::ServerSettings;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of an XML envelope read from disk.
const MAX_ENVELOPE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "toop-interface", version, disable_help_subcommand = true)]
struct Cli {
    /// Properties file (overrides `TOOP_INTERFACE_PROPERTIES_PATH`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the inbound `/to-dp` and data-consumer routes.
    Serve(ServeCommand),
    /// Sign a request envelope and deliver it.
    SendRequest(SendCommand),
    /// Sign a response envelope and deliver it.
    SendResponse(SendCommand),
    /// Query the connector for data providers.
    Search(SearchCommand),
    /// Signed container utilities.
    Container {
        /// Selected container subcommand.
        #[command(subcommand)]
        command: ContainerCommand,
    },
    /// Keystore utilities.
    Keystore {
        /// Selected keystore subcommand.
        #[command(subcommand)]
        command: KeystoreCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Directory receiving inbound envelopes as XML files.
    #[arg(long, value_name = "DIR")]
    spool_dir: Option<PathBuf>,
}

/// Configuration for the send commands.
#[derive(Args, Debug)]
struct SendCommand {
    /// XML envelope to send.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Target URL (defaults to the configured connector URL).
    #[arg(long, value_name = "URL")]
    to: Option<String>,
    /// Use the legacy bundle layout (`TOOPDataRequest` / `TOOPDataResponse`).
    #[arg(long)]
    legacy: bool,
}

/// Configuration for the `search` command.
#[derive(Args, Debug)]
struct SearchCommand {
    /// ISO 3166-1 alpha-2 country code.
    #[arg(long, value_name = "CODE")]
    country: String,
    /// Optional document type code.
    #[arg(long, value_name = "CODE")]
    doc_type: Option<String>,
}

/// Container subcommands.
#[derive(Subcommand, Debug)]
enum ContainerCommand {
    /// Verify a container and print its entries as JSON.
    Inspect(InspectCommand),
}

/// Configuration for `container inspect`.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Container file.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Base64 verifying key the signer must match.
    #[arg(long, value_name = "BASE64")]
    trusted_key: Option<String>,
}

/// Keystore subcommands.
#[derive(Subcommand, Debug)]
enum KeystoreCommand {
    /// Generate a signing key and store it under an alias.
    Generate(KeystoreGenerateCommand),
}

/// Configuration for `keystore generate`.
#[derive(Args, Debug)]
struct KeystoreGenerateCommand {
    /// Keystore file; created when missing.
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
    /// Key alias.
    #[arg(long, value_name = "ALIAS")]
    alias: String,
    /// Keystore password.
    #[arg(long, value_name = "PASSWORD")]
    store_password: String,
    /// Key password.
    #[arg(long, value_name = "PASSWORD")]
    key_password: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.config;
    match cli.command {
        Commands::Serve(command) => command_serve(config.as_deref(), &command),
        Commands::SendRequest(command) => command_send_request(config.as_deref(), &command),
        Commands::SendResponse(command) => command_send_response(config.as_deref(), &command),
        Commands::Search(command) => command_search(config.as_deref(), &command),
        Commands::Container {
            command: ContainerCommand::Inspect(command),
        } => command_container_inspect(&command),
        Commands::Keystore {
            command: KeystoreCommand::Generate(command),
        } => command_keystore_generate(&command),
    }
}

/// Builds the configuration provider for the selected source.
fn load_provider(config: Option<&Path>, audit: Arc<dyn AuditSink>) -> Arc<ConfigProvider> {
    let loader = match config {
        Some(path) => ConfigLoader::from_env().with_override_path(path),
        None => ConfigLoader::from_env(),
    };
    Arc::new(ConfigProvider::with_audit(loader, audit))
}

/// Selects the audit sink named by the configuration.
fn audit_sink(config: &InterfaceConfig) -> CliResult<Arc<dyn AuditSink>> {
    match config.audit_path() {
        Some(path) => {
            let sink = FileAuditSink::new(&path).map_err(|err| {
                CliError::new(format!("failed to open audit log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
fn command_serve(config: Option<&Path>, command: &ServeCommand) -> CliResult<ExitCode> {
    let provider = load_provider(config, Arc::new(StderrAuditSink));
    if let ReloadOutcome::Loaded {
        source,
        keys,
    } = provider.last_outcome()
    {
        write_stderr_line(&format!("configuration: {} ({keys} keys)", source.display()))?;
    } else {
        write_stderr_line("configuration: none loaded, using defaults")?;
    }
    let snapshot = provider.current();
    let audit = audit_sink(&snapshot)?;
    let settings = ServerSettings::from_config(&snapshot)
        .map_err(|err| CliError::new(format!("invalid server settings: {err}")))?;
    if let Some(dir) = &command.spool_dir {
        fs::create_dir_all(dir).map_err(|err| {
            CliError::new(format!("failed to create spool dir {}: {err}", dir.display()))
        })?;
    }
    let spool = Arc::new(SpoolCallback {
        dir: command.spool_dir.clone(),
    });
    let consumer = Arc::new(
        ResponseContainerHandler::new(spool.clone())
            .with_signature_check(settings.signature.clone()),
    );
    let bind = settings.bind;
    let server = InboundServer::new(settings, spool, consumer)
        .map_err(|err| CliError::new(err.to_string()))?
        .with_audit(audit);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(format!("failed to start runtime: {err}")))?;
    write_stderr_line(&format!("toop-interface listening on {bind}"))?;
    runtime.block_on(server.serve()).map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Writes inbound envelopes to a spool directory and reports them on stdout.
struct SpoolCallback {
    /// Spool directory; `None` only reports.
    dir: Option<PathBuf>,
}

impl SpoolCallback {
    /// Serializes and stores one envelope.
    fn store<T: Serialize>(
        &self,
        kind: &str,
        root: &str,
        id: &str,
        value: &T,
    ) -> Result<(), CallbackError> {
        if let Some(dir) = &self.dir {
            let bytes =
                to_xml_bytes(root, value).map_err(|err| CallbackError::new(err.to_string()))?;
            let path = dir.join(format!("{kind}-{}.xml", spool_file_stem(id)));
            fs::write(&path, bytes).map_err(|err| CallbackError::new(err.to_string()))?;
        }
        write_stdout_line(&format!("received {kind} {id}"))
            .map_err(|err| CallbackError::new(err.to_string()))
    }
}

impl DataProviderCallback for SpoolCallback {
    fn on_request(&self, request: ToopRequest) -> Result<(), CallbackError> {
        self.store("request", TOOP_REQUEST_ENTRY, request.request_id.as_str(), &request)
    }
}

impl DataConsumerCallback for SpoolCallback {
    fn on_response(&self, response: ToopResponse) -> Result<(), CallbackError> {
        self.store("response", TOOP_RESPONSE_ENTRY, response.request.request_id.as_str(), &response)
    }
}

/// Maps an untrusted identifier onto a safe file name stem.
fn spool_file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .take(64)
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if stem.is_empty() { "unnamed".to_string() } else { stem }
}

// ============================================================================
// SECTION: Send Commands
// ============================================================================

/// Executes the `send-request` command.
fn command_send_request(config: Option<&Path>, command: &SendCommand) -> CliResult<ExitCode> {
    let request: ToopRequest = read_xml(&command.input, "request")?;
    let client = build_client(config, command.legacy)?;
    let result = match &command.to {
        Some(url) => client.send_request_to(&request, url),
        None => client.send_request(&request),
    };
    result.map_err(|err| CliError::new(format!("send failed: {err}")))?;
    write_stdout_line(&format!("sent request {}", request.request_id))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `send-response` command.
fn command_send_response(config: Option<&Path>, command: &SendCommand) -> CliResult<ExitCode> {
    let response: ToopResponse = read_xml(&command.input, "response")?;
    let client = build_client(config, command.legacy)?;
    let result = match &command.to {
        Some(url) => client.send_response_to(&response, url),
        None => client.send_response(&response),
    };
    result.map_err(|err| CliError::new(format!("send failed: {err}")))?;
    write_stdout_line(&format!("sent response {}", response.request.request_id))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the outbound client from configuration.
fn build_client(config: Option<&Path>, legacy: bool) -> CliResult<ToopInterfaceClient> {
    let provider = load_provider(config, Arc::new(StderrAuditSink));
    let audit = audit_sink(&provider.current())?;
    let mut client = ToopInterfaceClient::new(provider)
        .map_err(|err| CliError::new(format!("failed to build client: {err}")))?
        .with_audit(audit);
    if legacy {
        let builder: Arc<dyn SignedMessageBuilder> = Arc::new(BundleMessageBuilder);
        client = client.with_builder(builder);
    }
    Ok(client)
}

// ============================================================================
// SECTION: Search Command
// ============================================================================

/// Executes the `search` command.
fn command_search(config: Option<&Path>, command: &SearchCommand) -> CliResult<ExitCode> {
    let client = build_client(config, false)?;
    let result = client
        .search_data_provider(&command.country, command.doc_type.as_deref())
        .map_err(|err| CliError::new(format!("search failed: {err}")))?;
    match result {
        Some(list) => {
            let bytes = to_xml_bytes(RESULT_LIST_ROOT, &list)
                .map_err(|err| CliError::new(format!("failed to render result list: {err}")))?;
            write_stdout_bytes_with_newline(&bytes)?;
        }
        None => write_stdout_line("no result")?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Container Command
// ============================================================================

/// Inspection output for `container inspect`.
#[derive(Debug, Serialize)]
struct InspectReport {
    /// Payload entries in archive order.
    entries: Vec<InspectEntry>,
    /// Populated message bundle slots.
    slots: Vec<&'static str>,
    /// Verification result.
    verification: VerificationReport,
}

/// One payload entry in the inspection output.
#[derive(Debug, Serialize)]
struct InspectEntry {
    /// Entry name.
    name: String,
    /// Entry size in bytes.
    size: usize,
}

/// Executes `container inspect`.
fn command_container_inspect(command: &InspectCommand) -> CliResult<ExitCode> {
    let trusted = command.trusted_key.as_deref().map(parse_verifying_key).transpose()?;
    let limit = usize::try_from(MAX_CONTAINER_BYTES).unwrap_or(usize::MAX);
    let bytes = read_bytes_with_limit(&command.input, limit)
        .map_err(|err| input_error(&command.input, "container", &err))?;
    let reader = SignedContainerReader::open(bytes.as_slice())
        .map_err(|err| CliError::new(format!("failed to open container: {err}")))?;
    let report = inspect(&reader, trusted.as_ref());
    let passed = report.verification.is_pass();
    let mut output = serde_jcs::to_vec(&report)
        .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
    output.push(b'\n');
    write_stdout_bytes(&output)?;
    Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Builds the inspection report for an opened container.
fn inspect(reader: &SignedContainerReader, trusted: Option<&VerifyingKey>) -> InspectReport {
    let entries = reader
        .entries()
        .iter()
        .map(|entry| InspectEntry {
            name: entry.name.clone(),
            size: entry.bytes.len(),
        })
        .collect();
    let slots = match MessageBundleBuilder::parse_reader(reader) {
        Ok(bundle) => bundle.populated_slots().into_iter().map(BundleSlot::entry_name).collect(),
        Err(_) => Vec::new(),
    };
    InspectReport {
        entries,
        slots,
        verification: reader.verify(trusted),
    }
}

/// Decodes a base64 verifying key.
fn parse_verifying_key(value: &str) -> CliResult<VerifyingKey> {
    let bytes = BASE64
        .decode(value.trim())
        .map_err(|err| CliError::new(format!("invalid trusted key: {err}")))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CliError::new("invalid trusted key: expected 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|err| CliError::new(format!("invalid trusted key: {err}")))
}

// ============================================================================
// SECTION: Keystore Command
// ============================================================================

/// Executes `keystore generate`.
fn command_keystore_generate(command: &KeystoreGenerateCommand) -> CliResult<ExitCode> {
    let mut keystore = if command.output.exists() {
        Keystore::load(&command.output, &command.store_password).map_err(keystore_error)?
    } else {
        Keystore::new(&command.store_password).map_err(keystore_error)?
    };
    let verifying =
        keystore.generate_key(&command.alias, &command.key_password).map_err(keystore_error)?;
    keystore.save(&command.output).map_err(keystore_error)?;
    write_stdout_line(&BASE64.encode(verifying.as_bytes()))?;
    Ok(ExitCode::SUCCESS)
}

/// Maps keystore failures to CLI errors.
fn keystore_error(err: KeystoreError) -> CliError {
    CliError::new(format!("keystore error: {err}"))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors raised while reading size-limited inputs.
#[derive(Debug)]
enum ReadLimitError {
    /// I/O failure while reading.
    Io(std::io::Error),
    /// Input exceeded the configured size limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Formats a read failure.
fn input_error(path: &Path, kind: &str, err: &ReadLimitError) -> CliError {
    match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {kind} {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{kind} {} is too large ({size} bytes, limit {limit})",
            path.display()
        )),
    }
}

/// Reads and decodes an XML envelope.
fn read_xml<T: DeserializeOwned>(path: &Path, kind: &str) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, MAX_ENVELOPE_BYTES)
        .map_err(|err| input_error(path, kind, &err))?;
    from_xml_bytes(&bytes)
        .map_err(|err| CliError::new(format!("invalid {kind} {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout with a trailing newline.
fn write_stdout_bytes_with_newline(bytes: &[u8]) -> CliResult<()> {
    let mut buffer = bytes.to_vec();
    buffer.push(b'\n');
    write_stdout_bytes(&buffer)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| CliError::new(output_error("stderr", &err)))
}

/// Formats an output stream failure.
fn output_error(stream: &str, err: &std::io::Error) -> String {
    format!("failed to write to {stream}: {err}")
}

/// Reports an error on stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::FAILURE
}
